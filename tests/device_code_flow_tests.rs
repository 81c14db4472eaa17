//! Device-code flow against a mock authority: session start, poll-state
//! mapping, and the prompt-then-poll driver.

use std::sync::{Arc, Mutex};

use chrono::{Duration, Utc};
use serde_json::json;
use wiremock::matchers::{body_string_contains, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use signon::config::AuthRequest;
use signon::error::AuthError;
use signon::flows::device_code::{DeviceCodeFlow, DeviceCodePoll, DeviceCodeSession};

fn flow(server: &MockServer) -> DeviceCodeFlow {
    DeviceCodeFlow::new(&AuthRequest::new())
        .with_device_code_url(format!("{}/common/oauth2/v2.0/devicecode", server.uri()))
        .with_token_url(format!("{}/common/oauth2/v2.0/token", server.uri()))
}

fn active_session(interval_secs: u64) -> DeviceCodeSession {
    DeviceCodeSession {
        device_code: "device-code-1".to_string(),
        user_code: "ABCD-EFGH".to_string(),
        verification_url: "https://microsoft.com/devicelogin".to_string(),
        message: "To sign in, visit https://microsoft.com/devicelogin and enter ABCD-EFGH."
            .to_string(),
        interval_secs,
        expires_at: Utc::now() + Duration::minutes(10),
    }
}

#[tokio::test]
async fn start_returns_session_with_authority_message() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/common/oauth2/v2.0/devicecode"))
        .and(body_string_contains("client_id="))
        .and(body_string_contains("scope=user.read"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "device_code": "device-123",
            "user_code": "ABCD-EFGH",
            "verification_uri": "https://microsoft.com/devicelogin",
            "expires_in": 900,
            "interval": 5,
            "message": "To sign in, use a web browser to open the page https://microsoft.com/devicelogin and enter the code ABCD-EFGH to authenticate."
        })))
        .expect(1)
        .mount(&server)
        .await;

    let session = flow(&server).start().await.expect("start device code");

    assert_eq!(session.device_code, "device-123");
    assert_eq!(session.user_code, "ABCD-EFGH");
    assert_eq!(session.interval_secs, 5);
    assert!(session.message.contains("ABCD-EFGH"));
    assert!(session.expires_at > Utc::now());
}

#[tokio::test]
async fn start_synthesizes_message_when_authority_omits_it() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/common/oauth2/v2.0/devicecode"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "device_code": "device-123",
            "user_code": "ABCD-EFGH",
            "verification_uri": "https://microsoft.com/devicelogin",
            "expires_in": 900
        })))
        .mount(&server)
        .await;

    let session = flow(&server).start().await.expect("start device code");

    assert!(session.message.contains("https://microsoft.com/devicelogin"));
    assert!(session.message.contains("ABCD-EFGH"));
    assert_eq!(session.interval_secs, 5); // default when omitted
}

#[tokio::test]
async fn start_rejects_out_of_range_expiry() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/common/oauth2/v2.0/devicecode"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "device_code": "device-123",
            "user_code": "ABCD-EFGH",
            "verification_uri": "https://microsoft.com/devicelogin",
            "expires_in": u64::MAX
        })))
        .mount(&server)
        .await;

    let err = flow(&server)
        .start()
        .await
        .expect_err("expiry past any representable deadline");

    assert!(matches!(err, AuthError::InvalidResponse(_)));
}

#[tokio::test]
async fn poll_pending_returns_pending_with_session_interval() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/common/oauth2/v2.0/token"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "error": "authorization_pending"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let result = flow(&server).poll(&active_session(7)).await.expect("poll");

    assert!(matches!(
        result,
        DeviceCodePoll::Pending { interval_secs: 7 }
    ));
}

#[tokio::test]
async fn poll_slow_down_adds_two_seconds() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/common/oauth2/v2.0/token"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "error": "slow_down"
        })))
        .mount(&server)
        .await;

    let result = flow(&server).poll(&active_session(5)).await.expect("poll");

    assert!(matches!(
        result,
        DeviceCodePoll::SlowDown { interval_secs: 7 }
    ));
}

#[tokio::test]
async fn poll_declined_maps_to_access_denied() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/common/oauth2/v2.0/token"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "error": "authorization_declined"
        })))
        .mount(&server)
        .await;

    let result = flow(&server).poll(&active_session(5)).await.expect("poll");

    assert!(matches!(result, DeviceCodePoll::AccessDenied));
}

#[tokio::test]
async fn poll_expired_token_maps_to_expired() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/common/oauth2/v2.0/token"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "error": "expired_token"
        })))
        .mount(&server)
        .await;

    let result = flow(&server).poll(&active_session(5)).await.expect("poll");

    assert!(matches!(result, DeviceCodePoll::Expired));
}

#[tokio::test]
async fn poll_past_session_expiry_short_circuits_without_network() {
    let server = MockServer::start().await;
    // No token mock mounted: a request would fail the test via 404.
    let mut session = active_session(5);
    session.expires_at = Utc::now() - Duration::seconds(1);

    let result = flow(&server).poll(&session).await.expect("poll");

    assert!(matches!(result, DeviceCodePoll::Expired));
}

#[tokio::test]
async fn poll_unknown_error_is_invalid_response() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/common/oauth2/v2.0/token"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "error": "bad_verification_code"
        })))
        .mount(&server)
        .await;

    let err = flow(&server)
        .poll(&active_session(5))
        .await
        .expect_err("unknown error code");

    assert!(matches!(err, AuthError::InvalidResponse(_)));
}

#[tokio::test]
async fn poll_success_yields_token_with_scopes_and_expiry() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/common/oauth2/v2.0/token"))
        .and(body_string_contains(
            "grant_type=urn%3Aietf%3Aparams%3Aoauth%3Agrant-type%3Adevice_code",
        ))
        .and(body_string_contains("device_code=device-code-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "token_type": "Bearer",
            "access_token": "access-token-1",
            "refresh_token": "refresh-token-1",
            "expires_in": 3600,
            "scope": "user.read"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let result = flow(&server).poll(&active_session(5)).await.expect("poll");

    match result {
        DeviceCodePoll::Authorized { token } => {
            assert_eq!(token.access_token, "access-token-1");
            assert_eq!(token.refresh_token.as_deref(), Some("refresh-token-1"));
            assert_eq!(token.scopes, Some(vec!["user.read".to_string()]));
            assert!(token.expires_at.unwrap() > Utc::now());
        }
        other => panic!("expected authorized, got {other:?}"),
    }
}

#[tokio::test]
async fn run_prompts_once_then_polls_to_completion() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/common/oauth2/v2.0/devicecode"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "device_code": "device-123",
            "user_code": "ABCD-EFGH",
            "verification_uri": "https://microsoft.com/devicelogin",
            "expires_in": 900,
            "interval": 0,
            "message": "visit https://microsoft.com/devicelogin, code ABCD-EFGH"
        })))
        .expect(1)
        .mount(&server)
        .await;
    // First poll is pending, second succeeds.
    Mock::given(method("POST"))
        .and(path("/common/oauth2/v2.0/token"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "error": "authorization_pending"
        })))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/common/oauth2/v2.0/token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "access-token-2",
            "expires_in": 3600
        })))
        .mount(&server)
        .await;

    let prompts = Arc::new(Mutex::new(Vec::new()));
    let sink = prompts.clone();
    let token = flow(&server)
        .run(Arc::new(move |prompt| {
            sink.lock().unwrap().push(prompt.clone());
        }))
        .await
        .expect("run to completion");

    assert_eq!(token.access_token, "access-token-2");
    let prompts = prompts.lock().unwrap();
    assert_eq!(prompts.len(), 1);
    assert_eq!(prompts[0].user_code, "ABCD-EFGH");
}

#[tokio::test]
async fn run_surfaces_denial_as_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/common/oauth2/v2.0/devicecode"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "device_code": "device-123",
            "user_code": "ABCD-EFGH",
            "verification_uri": "https://microsoft.com/devicelogin",
            "expires_in": 900,
            "interval": 0
        })))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/common/oauth2/v2.0/token"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "error": "authorization_declined"
        })))
        .mount(&server)
        .await;

    let err = flow(&server)
        .run(Arc::new(|_| {}))
        .await
        .expect_err("declined");

    assert!(matches!(err, AuthError::AccessDenied));
}
