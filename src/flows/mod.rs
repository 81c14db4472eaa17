//! Native flow implementations over the identity platform v2.0 endpoints.

pub mod browser;
pub mod device_code;
pub mod pkce;

use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use serde::Deserialize;

use crate::backend::{
    AcquireContext, AuthBackend, DeviceCodeCallback, SystemBrowserOptions, WebViewOptions,
};
use crate::config::AuthRequest;
use crate::error::AuthError;
use crate::token::Token;

use browser::SystemBrowserFlow;
use device_code::DeviceCodeFlow;

pub(crate) const DEFAULT_AUTHORITY_BASE: &str = "https://login.microsoftonline.com";

/// Success payload common to the token endpoints.
#[derive(Debug, Deserialize)]
pub(crate) struct TokenResponse {
    pub access_token: String,
    pub refresh_token: Option<String>,
    pub id_token: Option<String>,
    pub expires_in: Option<i64>,
    pub scope: Option<String>,
}

pub(crate) fn token_from_response(payload: TokenResponse) -> Token {
    Token {
        access_token: payload.access_token,
        refresh_token: payload.refresh_token,
        id_token: payload.id_token,
        // Out-of-range lifetimes from a misbehaving endpoint leave the
        // expiry unknown instead of aborting.
        expires_at: payload
            .expires_in
            .and_then(chrono::Duration::try_seconds)
            .and_then(|ttl| Utc::now().checked_add_signed(ttl)),
        scopes: payload
            .scope
            .map(|s| s.split_whitespace().map(|v| v.to_string()).collect()),
    }
}

/// HTTP-only [`AuthBackend`].
///
/// Device-code and system-browser acquisitions are performed natively; the
/// broker and embedded web view flows need an OS integration and are
/// reported as unsupported here. Desktop hosts supply those by implementing
/// [`AuthBackend`] themselves.
pub struct HttpAuthBackend {
    authority_base: String,
    browser_wait: Duration,
}

impl Default for HttpAuthBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl HttpAuthBackend {
    pub fn new() -> Self {
        Self {
            authority_base: DEFAULT_AUTHORITY_BASE.to_string(),
            browser_wait: Duration::from_secs(300),
        }
    }

    /// Override the authority base URL (tests point this at a mock server).
    pub fn with_authority_base(mut self, base: impl Into<String>) -> Self {
        self.authority_base = base.into();
        self
    }

    pub fn with_browser_wait(mut self, wait: Duration) -> Self {
        self.browser_wait = wait;
        self
    }

    fn device_flow(&self, request: &AuthRequest) -> DeviceCodeFlow {
        DeviceCodeFlow::new(request)
            .with_device_code_url(format!(
                "{}/{}/oauth2/v2.0/devicecode",
                self.authority_base, request.tenant
            ))
            .with_token_url(format!(
                "{}/{}/oauth2/v2.0/token",
                self.authority_base, request.tenant
            ))
    }

    fn browser_flow(&self, request: &AuthRequest) -> SystemBrowserFlow {
        SystemBrowserFlow::new(request)
            .with_authorize_url(format!(
                "{}/{}/oauth2/v2.0/authorize",
                self.authority_base, request.tenant
            ))
            .with_token_url(format!(
                "{}/{}/oauth2/v2.0/token",
                self.authority_base, request.tenant
            ))
            .with_wait(self.browser_wait)
    }
}

#[async_trait]
impl AuthBackend for HttpAuthBackend {
    async fn acquire_broker(&self, _ctx: AcquireContext<'_>) -> Result<Token, AuthError> {
        Err(AuthError::Unsupported(
            "broker login needs an OS broker integration".to_string(),
        ))
    }

    async fn acquire_embedded_webview2(
        &self,
        _ctx: AcquireContext<'_>,
        _options: &WebViewOptions,
    ) -> Result<Token, AuthError> {
        Err(AuthError::Unsupported(
            "embedded WebView2 login needs a desktop integration".to_string(),
        ))
    }

    async fn acquire_embedded_legacy(&self, _ctx: AcquireContext<'_>) -> Result<Token, AuthError> {
        Err(AuthError::Unsupported(
            "legacy embedded browser login needs a desktop integration".to_string(),
        ))
    }

    async fn acquire_system_browser(
        &self,
        ctx: AcquireContext<'_>,
        options: &SystemBrowserOptions,
    ) -> Result<Token, AuthError> {
        self.browser_flow(ctx.request).run(options).await
    }

    async fn acquire_device_code(
        &self,
        ctx: AcquireContext<'_>,
        on_prompt: DeviceCodeCallback,
    ) -> Result<Token, AuthError> {
        self.device_flow(ctx.request).run(on_prompt).await
    }
}
