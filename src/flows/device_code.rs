use chrono::{DateTime, Duration, Utc};
use serde::Deserialize;

use crate::backend::{DeviceCodeCallback, DeviceCodePrompt};
use crate::config::AuthRequest;
use crate::error::AuthError;
use crate::token::Token;

use super::{token_from_response, TokenResponse, DEFAULT_AUTHORITY_BASE};

/// Device-code session details returned by the authority.
#[derive(Debug, Clone)]
pub struct DeviceCodeSession {
    pub device_code: String,
    pub user_code: String,
    pub verification_url: String,
    /// Ready-to-display instruction text from the authority.
    pub message: String,
    pub interval_secs: u64,
    pub expires_at: DateTime<Utc>,
}

/// Polling outcome for a device-code session.
#[derive(Debug, Clone)]
pub enum DeviceCodePoll {
    Pending { interval_secs: u64 },
    SlowDown { interval_secs: u64 },
    Authorized { token: Token },
    AccessDenied,
    Expired,
}

/// Device-code grant against the identity platform v2.0 endpoints.
///
/// # Example
/// ```no_run
/// use signon::config::AuthRequest;
/// use signon::flows::device_code::DeviceCodeFlow;
///
/// # async fn example() -> Result<(), signon::error::AuthError> {
/// let request = AuthRequest::new();
/// let flow = DeviceCodeFlow::new(&request);
/// let session = flow.start().await?;
/// println!("{}", session.message);
/// # Ok(())
/// # }
/// ```
pub struct DeviceCodeFlow {
    client: reqwest::Client,
    client_id: String,
    scope: String,
    device_code_url: String,
    token_url: String,
}

impl DeviceCodeFlow {
    pub fn new(request: &AuthRequest) -> Self {
        Self {
            client: reqwest::Client::new(),
            client_id: request.client_id.clone(),
            scope: request.scope_param(),
            device_code_url: format!(
                "{DEFAULT_AUTHORITY_BASE}/{}/oauth2/v2.0/devicecode",
                request.tenant
            ),
            token_url: format!(
                "{DEFAULT_AUTHORITY_BASE}/{}/oauth2/v2.0/token",
                request.tenant
            ),
        }
    }

    pub fn with_device_code_url(mut self, url: impl Into<String>) -> Self {
        self.device_code_url = url.into();
        self
    }

    pub fn with_token_url(mut self, url: impl Into<String>) -> Self {
        self.token_url = url.into();
        self
    }

    /// Request a new device code from the authority.
    pub async fn start(&self) -> Result<DeviceCodeSession, AuthError> {
        let resp = self
            .client
            .post(&self.device_code_url)
            .header("Accept", "application/json")
            .form(&[
                ("client_id", self.client_id.as_str()),
                ("scope", self.scope.as_str()),
            ])
            .send()
            .await?;
        if !resp.status().is_success() {
            return Err(AuthError::InvalidResponse(format!(
                "Device code request failed with status {}",
                resp.status()
            )));
        }
        let payload: DeviceCodeResponse = resp.json().await?;
        let expires_at = i64::try_from(payload.expires_in)
            .ok()
            .and_then(Duration::try_seconds)
            .and_then(|ttl| Utc::now().checked_add_signed(ttl))
            .ok_or_else(|| {
                AuthError::InvalidResponse(format!(
                    "Device code expires_in out of range: {}",
                    payload.expires_in
                ))
            })?;
        let message = payload.message.unwrap_or_else(|| {
            format!(
                "To sign in, visit {} and enter the code {}.",
                payload.verification_uri, payload.user_code
            )
        });
        Ok(DeviceCodeSession {
            device_code: payload.device_code,
            user_code: payload.user_code,
            verification_url: payload.verification_uri,
            message,
            interval_secs: payload.interval.unwrap_or(5),
            expires_at,
        })
    }

    /// Ask the token endpoint once whether the user has finished.
    pub async fn poll(&self, session: &DeviceCodeSession) -> Result<DeviceCodePoll, AuthError> {
        if Utc::now() >= session.expires_at {
            return Ok(DeviceCodePoll::Expired);
        }
        let resp = self
            .client
            .post(&self.token_url)
            .header("Accept", "application/json")
            .form(&[
                ("grant_type", "urn:ietf:params:oauth:grant-type:device_code"),
                ("client_id", self.client_id.as_str()),
                ("device_code", session.device_code.as_str()),
            ])
            .send()
            .await?;
        // The authority reports pending/denied as 400 with an error body,
        // so the body has to be parsed regardless of status.
        let status = resp.status();
        let payload: DeviceTokenResponse = resp.json().await?;
        if let Some(access_token) = payload.access_token {
            return Ok(DeviceCodePoll::Authorized {
                token: token_from_response(TokenResponse {
                    access_token,
                    refresh_token: payload.refresh_token,
                    id_token: payload.id_token,
                    expires_in: payload.expires_in,
                    scope: payload.scope,
                }),
            });
        }
        match payload.error.as_deref() {
            Some("authorization_pending") => Ok(DeviceCodePoll::Pending {
                interval_secs: session.interval_secs,
            }),
            Some("slow_down") => Ok(DeviceCodePoll::SlowDown {
                interval_secs: session.interval_secs + 2,
            }),
            Some("expired_token") => Ok(DeviceCodePoll::Expired),
            Some("authorization_declined") | Some("access_denied") => {
                Ok(DeviceCodePoll::AccessDenied)
            }
            Some(other) => Err(AuthError::InvalidResponse(format!(
                "Device code error: {other}"
            ))),
            None => Err(AuthError::InvalidResponse(format!(
                "Device token response (status {status}) missing token and error"
            ))),
        }
    }

    /// Drive the full flow: prompt once, then poll until a terminal state.
    ///
    /// The prompt callback runs before the first poll and must return
    /// promptly; it performs no polling itself.
    pub async fn run(&self, on_prompt: DeviceCodeCallback) -> Result<Token, AuthError> {
        let session = self.start().await?;
        let prompt = DeviceCodePrompt {
            message: session.message.clone(),
            verification_url: session.verification_url.clone(),
            user_code: session.user_code.clone(),
        };
        on_prompt(&prompt);

        let mut interval_secs = session.interval_secs;
        loop {
            tokio::time::sleep(std::time::Duration::from_secs(interval_secs)).await;
            match self.poll(&session).await? {
                DeviceCodePoll::Authorized { token } => return Ok(token),
                DeviceCodePoll::Pending { interval_secs: s } => interval_secs = s,
                DeviceCodePoll::SlowDown { interval_secs: s } => interval_secs = s,
                DeviceCodePoll::AccessDenied => return Err(AuthError::AccessDenied),
                DeviceCodePoll::Expired => return Err(AuthError::ExpiredOrInvalidGrant),
            }
        }
    }
}

#[derive(Debug, Deserialize)]
struct DeviceCodeResponse {
    device_code: String,
    user_code: String,
    verification_uri: String,
    expires_in: u64,
    interval: Option<u64>,
    message: Option<String>,
}

/// Token endpoint response that may instead carry a poll-state error.
#[derive(Debug, Deserialize)]
struct DeviceTokenResponse {
    access_token: Option<String>,
    refresh_token: Option<String>,
    id_token: Option<String>,
    expires_in: Option<i64>,
    scope: Option<String>,
    error: Option<String>,
}
