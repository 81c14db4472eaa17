use std::net::{IpAddr, Ipv4Addr};
use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tracing::debug;
use url::{Host, Url};

use crate::backend::SystemBrowserOptions;
use crate::config::AuthRequest;
use crate::error::AuthError;
use crate::token::Token;

use super::pkce;
use super::{token_from_response, TokenResponse, DEFAULT_AUTHORITY_BASE};

const DEFAULT_WAIT_SECS: u64 = 300;

/// Sink for the authorize URL the user must open. Defaults to stdout.
pub type AuthorizeUrlSink = Arc<dyn Fn(&str) + Send + Sync>;

/// Authorization-code + PKCE flow through the user's default browser.
///
/// Binds a one-shot loopback listener for the redirect, hands the authorize
/// URL to the user, serves the success/error page from
/// [`SystemBrowserOptions`], and exchanges the returned code for tokens.
pub struct SystemBrowserFlow {
    client: reqwest::Client,
    client_id: String,
    scope: String,
    redirect_uri: Url,
    authorize_url: String,
    token_url: String,
    wait: Duration,
    on_authorize_url: AuthorizeUrlSink,
}

impl SystemBrowserFlow {
    pub fn new(request: &AuthRequest) -> Self {
        Self {
            client: reqwest::Client::new(),
            client_id: request.client_id.clone(),
            scope: request.scope_param(),
            redirect_uri: request.redirect_uri.clone(),
            authorize_url: format!(
                "{DEFAULT_AUTHORITY_BASE}/{}/oauth2/v2.0/authorize",
                request.tenant
            ),
            token_url: format!(
                "{DEFAULT_AUTHORITY_BASE}/{}/oauth2/v2.0/token",
                request.tenant
            ),
            wait: Duration::from_secs(DEFAULT_WAIT_SECS),
            on_authorize_url: Arc::new(|url| {
                println!("To sign in, open this URL in your browser:\n{url}");
            }),
        }
    }

    pub fn with_authorize_url(mut self, url: impl Into<String>) -> Self {
        self.authorize_url = url.into();
        self
    }

    pub fn with_token_url(mut self, url: impl Into<String>) -> Self {
        self.token_url = url.into();
        self
    }

    pub fn with_wait(mut self, wait: Duration) -> Self {
        self.wait = wait;
        self
    }

    pub fn with_authorize_url_sink(mut self, sink: AuthorizeUrlSink) -> Self {
        self.on_authorize_url = sink;
        self
    }

    /// Drive the full flow: listen, prompt, await the redirect, exchange.
    pub async fn run(&self, options: &SystemBrowserOptions) -> Result<Token, AuthError> {
        let (bind_addr, host_label) = loopback_bind_target(&self.redirect_uri);
        let port = self.redirect_uri.port().unwrap_or(0);
        let listener = TcpListener::bind((bind_addr, port)).await?;
        let local_port = listener.local_addr()?.port();

        let path = self.redirect_uri.path();
        let redirect = format!("http://{host_label}:{local_port}{path}");

        let state = pkce::random_state(16);
        let code_verifier = pkce::generate_code_verifier();
        let code_challenge = pkce::compute_code_challenge(&code_verifier);

        let mut authorize = Url::parse(&self.authorize_url)?;
        authorize
            .query_pairs_mut()
            .append_pair("client_id", &self.client_id)
            .append_pair("response_type", "code")
            .append_pair("redirect_uri", &redirect)
            .append_pair("response_mode", "query")
            .append_pair("scope", &self.scope)
            .append_pair("state", &state)
            .append_pair("code_challenge", &code_challenge)
            .append_pair("code_challenge_method", "S256");

        debug!(%redirect, "listening for authorization redirect");
        (self.on_authorize_url)(authorize.as_str());

        let callback = tokio::time::timeout(self.wait, wait_for_callback(&listener, options))
            .await
            .map_err(|_| AuthError::Timeout(self.wait.as_secs()))??;

        if callback.state.as_deref() != Some(state.as_str()) {
            return Err(AuthError::StateMismatch {
                expected: state,
                got: callback.state.unwrap_or_default(),
            });
        }
        let code = match (callback.code, callback.error) {
            (Some(code), _) => code,
            (None, Some(error)) if error == "access_denied" => {
                return Err(AuthError::AccessDenied)
            }
            (None, Some(error)) => {
                return Err(AuthError::InvalidResponse(format!(
                    "Authorization failed: {error}"
                )))
            }
            (None, None) => {
                return Err(AuthError::InvalidResponse(
                    "Redirect carried neither code nor error".to_string(),
                ))
            }
        };

        self.exchange_code(&code, &code_verifier, &redirect).await
    }

    /// Exchange an authorization code for tokens.
    pub async fn exchange_code(
        &self,
        code: &str,
        code_verifier: &str,
        redirect_uri: &str,
    ) -> Result<Token, AuthError> {
        let resp = self
            .client
            .post(&self.token_url)
            .header("Accept", "application/json")
            .form(&[
                ("grant_type", "authorization_code"),
                ("client_id", self.client_id.as_str()),
                ("code", code),
                ("redirect_uri", redirect_uri),
                ("code_verifier", code_verifier),
                ("scope", self.scope.as_str()),
            ])
            .send()
            .await?;
        if !resp.status().is_success() {
            return Err(AuthError::InvalidResponse(format!(
                "Token exchange failed with status {}",
                resp.status()
            )));
        }
        let payload: TokenResponse = resp.json().await?;
        Ok(token_from_response(payload))
    }
}

/// Bind address and advertised host for the configured redirect. The
/// authority matches redirect URIs by host, so the configured host is kept
/// verbatim; only an unset or zero port gets substituted with the bound one.
fn loopback_bind_target(redirect: &Url) -> (IpAddr, String) {
    match redirect.host() {
        Some(Host::Ipv4(addr)) => (IpAddr::V4(addr), addr.to_string()),
        Some(Host::Ipv6(addr)) => (IpAddr::V6(addr), format!("[{addr}]")),
        Some(Host::Domain(domain)) => (IpAddr::V4(Ipv4Addr::LOCALHOST), domain.to_string()),
        None => (IpAddr::V4(Ipv4Addr::LOCALHOST), "localhost".to_string()),
    }
}

/// Query parameters delivered back on the loopback redirect.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct CallbackParams {
    pub code: Option<String>,
    pub state: Option<String>,
    pub error: Option<String>,
}

/// Accept connections until one carries an authorization response; anything
/// else (favicon probes and the like) gets a 404 and another round.
async fn wait_for_callback(
    listener: &TcpListener,
    options: &SystemBrowserOptions,
) -> Result<CallbackParams, AuthError> {
    loop {
        let (mut stream, _) = listener.accept().await?;
        let request_line = read_request_line(&mut stream).await?;
        match parse_callback(&request_line) {
            Some(params) if params.code.is_some() || params.error.is_some() => {
                let body = if params.code.is_some() {
                    options.html_message_success.as_str()
                } else {
                    options.html_message_error.as_str()
                };
                write_response(&mut stream, 200, body).await?;
                return Ok(params);
            }
            _ => {
                write_response(&mut stream, 404, "Not found").await?;
            }
        }
    }
}

async fn read_request_line(stream: &mut TcpStream) -> Result<String, AuthError> {
    let mut buf = Vec::with_capacity(1024);
    let mut chunk = [0u8; 1024];
    loop {
        let n = stream.read(&mut chunk).await?;
        if n == 0 {
            break;
        }
        buf.extend_from_slice(&chunk[..n]);
        // Read to the end of the headers before answering.
        if buf.windows(4).any(|w| w == b"\r\n\r\n") || buf.len() > 8192 {
            break;
        }
    }
    let text = String::from_utf8_lossy(&buf);
    Ok(text.lines().next().unwrap_or_default().to_string())
}

async fn write_response(stream: &mut TcpStream, status: u16, body: &str) -> Result<(), AuthError> {
    let reason = if status == 200 { "OK" } else { "Not Found" };
    let response = format!(
        "HTTP/1.1 {status} {reason}\r\nContent-Type: text/html; charset=utf-8\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
        body.len()
    );
    stream.write_all(response.as_bytes()).await?;
    stream.shutdown().await?;
    Ok(())
}

/// Parse `GET /path?query HTTP/1.1` into the OAuth callback parameters.
fn parse_callback(request_line: &str) -> Option<CallbackParams> {
    let mut parts = request_line.split_whitespace();
    if parts.next() != Some("GET") {
        return None;
    }
    let target = parts.next()?;
    let url = Url::parse(&format!("http://localhost{target}")).ok()?;
    let mut params = CallbackParams::default();
    for (key, value) in url.query_pairs() {
        match key.as_ref() {
            "code" => params.code = Some(value.into_owned()),
            "state" => params.state = Some(value.into_owned()),
            "error" => params.error = Some(value.into_owned()),
            _ => {}
        }
    }
    Some(params)
}
