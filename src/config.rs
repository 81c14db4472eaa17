//! Login request configuration (code > env > built-in sample defaults).

use std::path::PathBuf;

use url::{Host, Url};

use crate::error::AuthError;

/// Well-known public client id used by the sample configuration.
const DEFAULT_CLIENT_ID: &str = "872cd9fa-d31f-45e0-9eab-6e460a02d1f1";
const DEFAULT_TENANT: &str = "common";
const DEFAULT_REDIRECT_URI: &str = "http://localhost";
const DEFAULT_SCOPE: &str = "user.read";

/// Immutable configuration for one token acquisition.
///
/// # Example
/// ```
/// use signon::config::AuthRequest;
///
/// let request = AuthRequest::new()
///     .with_scopes(["user.read"])
///     .with_prefer_broker(true);
/// assert!(request.prefer_broker);
/// ```
#[derive(Debug, Clone)]
pub struct AuthRequest {
    pub client_id: String,
    pub tenant: String,
    pub redirect_uri: Url,
    pub scopes: Vec<String>,
    pub prefer_broker: bool,
    /// Directory expected to contain a WebView2 runtime, if any.
    pub webview2_runtime_dir: Option<PathBuf>,
}

impl Default for AuthRequest {
    fn default() -> Self {
        Self::new()
    }
}

impl AuthRequest {
    /// Create a request with the sample defaults.
    pub fn new() -> Self {
        Self {
            client_id: DEFAULT_CLIENT_ID.to_string(),
            tenant: DEFAULT_TENANT.to_string(),
            redirect_uri: Url::parse(DEFAULT_REDIRECT_URI).expect("default redirect URI is valid"),
            scopes: vec![DEFAULT_SCOPE.to_string()],
            prefer_broker: false,
            webview2_runtime_dir: None,
        }
    }

    /// Load overrides from environment variables (and `.env` if present).
    ///
    /// Recognized: `SIGNON_CLIENT_ID`, `SIGNON_TENANT`,
    /// `SIGNON_REDIRECT_URI`, `SIGNON_SCOPES` (space-separated),
    /// `SIGNON_PREFER_BROKER` (`1`/`true`), `SIGNON_WEBVIEW2_DIR`.
    pub fn from_env() -> Result<Self, AuthError> {
        let _ = dotenvy::dotenv(); // load .env if present, ignore error
        let mut request = Self::new();

        if let Ok(client_id) = std::env::var("SIGNON_CLIENT_ID") {
            request.client_id = client_id;
        }
        if let Ok(tenant) = std::env::var("SIGNON_TENANT") {
            request.tenant = tenant;
        }
        if let Ok(raw) = std::env::var("SIGNON_REDIRECT_URI") {
            request.redirect_uri = Url::parse(&raw).map_err(|err| {
                AuthError::Configuration(format!("SIGNON_REDIRECT_URI invalid: {err}"))
            })?;
        }
        if let Ok(raw) = std::env::var("SIGNON_SCOPES") {
            let scopes: Vec<String> = raw
                .split_whitespace()
                .map(|scope| scope.to_string())
                .collect();
            if !scopes.is_empty() {
                request.scopes = scopes;
            }
        }
        if let Ok(raw) = std::env::var("SIGNON_PREFER_BROKER") {
            request.prefer_broker = parse_bool_flag(&raw);
        }
        if let Ok(dir) = std::env::var("SIGNON_WEBVIEW2_DIR") {
            if !dir.trim().is_empty() {
                request.webview2_runtime_dir = Some(PathBuf::from(dir));
            }
        }

        Ok(request)
    }

    pub fn with_client_id(mut self, client_id: impl Into<String>) -> Self {
        self.client_id = client_id.into();
        self
    }

    pub fn with_tenant(mut self, tenant: impl Into<String>) -> Self {
        self.tenant = tenant.into();
        self
    }

    pub fn with_redirect_uri(mut self, redirect_uri: Url) -> Self {
        self.redirect_uri = redirect_uri;
        self
    }

    pub fn with_scopes<I, S>(mut self, scopes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.scopes = scopes.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_prefer_broker(mut self, prefer_broker: bool) -> Self {
        self.prefer_broker = prefer_broker;
        self
    }

    pub fn with_webview2_runtime_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.webview2_runtime_dir = Some(dir.into());
        self
    }

    /// Whether the configured redirect URI points back to this machine.
    ///
    /// The system-browser flow is only eligible for loopback redirects.
    pub fn redirect_is_loopback(&self) -> bool {
        match self.redirect_uri.host() {
            Some(Host::Domain(domain)) => domain.eq_ignore_ascii_case("localhost"),
            Some(Host::Ipv4(addr)) => addr.is_loopback(),
            Some(Host::Ipv6(addr)) => addr.is_loopback(),
            None => false,
        }
    }

    /// Space-joined scope string as sent to the authorization endpoints.
    pub fn scope_param(&self) -> String {
        self.scopes.join(" ")
    }
}

fn parse_bool_flag(raw: &str) -> bool {
    matches!(
        raw.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}
