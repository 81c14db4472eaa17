//! Flow selection: an ordered rule list mapping the host environment to
//! exactly one login flow.

use std::sync::Arc;

use tracing::info;

use crate::backend::{
    AcquireContext, AuthBackend, DeviceCodeCallback, SystemBrowserOptions, WebViewOptions,
};
use crate::config::AuthRequest;
use crate::environment::{EnvironmentSnapshot, OsFamily};
use crate::error::AuthError;
use crate::token::Token;

const DEFAULT_WEBVIEW_TITLE: &str = "Hello, World!";

/// The five mutually exclusive login flows, in priority order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlowKind {
    Broker,
    EmbeddedWebView2,
    EmbeddedLegacy,
    SystemBrowser,
    DeviceCode,
}

/// Platform capabilities layered onto the client before dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Capabilities {
    /// Desktop integration, enabled on the supported OS family.
    pub desktop: bool,
    /// Broker integration, enabled only on desktop + version 10 + explicit
    /// preference.
    pub broker: bool,
}

impl Capabilities {
    pub fn for_environment(snapshot: &EnvironmentSnapshot, request: &AuthRequest) -> Self {
        let desktop = snapshot.os == OsFamily::Windows;
        let broker = desktop && snapshot.os_major_version == Some(10) && request.prefer_broker;
        Self { desktop, broker }
    }
}

/// One entry of the decision list: a flow and its eligibility predicate.
pub struct FlowRule {
    pub kind: FlowKind,
    pub eligible: fn(&EnvironmentSnapshot, &AuthRequest) -> bool,
}

/// The decision list, first match wins. `DeviceCode` is the unconditional
/// fallback and must stay last.
pub const FLOW_RULES: &[FlowRule] = &[
    FlowRule {
        kind: FlowKind::Broker,
        eligible: |_, request| request.prefer_broker,
    },
    FlowRule {
        kind: FlowKind::EmbeddedWebView2,
        eligible: |snapshot, _| {
            snapshot.os == OsFamily::Windows && snapshot.webview2_runtime.is_some()
        },
    },
    FlowRule {
        kind: FlowKind::EmbeddedLegacy,
        eligible: |snapshot, _| snapshot.legacy_webview,
    },
    FlowRule {
        kind: FlowKind::SystemBrowser,
        eligible: |_, request| request.redirect_is_loopback(),
    },
    FlowRule {
        kind: FlowKind::DeviceCode,
        eligible: |_, _| true,
    },
];

/// Pick the first eligible flow for this environment and request.
pub fn select_flow(snapshot: &EnvironmentSnapshot, request: &AuthRequest) -> FlowKind {
    FLOW_RULES
        .iter()
        .find(|rule| (rule.eligible)(snapshot, request))
        .map(|rule| rule.kind)
        .unwrap_or(FlowKind::DeviceCode)
}

/// Selects a flow and dispatches it through an [`AuthBackend`].
///
/// # Example
/// ```no_run
/// use std::sync::Arc;
/// use signon::config::AuthRequest;
/// use signon::environment::EnvironmentSnapshot;
/// use signon::flows::HttpAuthBackend;
/// use signon::selector::FlowSelector;
///
/// # async fn example() -> Result<(), signon::error::AuthError> {
/// let request = AuthRequest::from_env()?;
/// let snapshot = EnvironmentSnapshot::probe(&request);
/// let selector = FlowSelector::new(Arc::new(HttpAuthBackend::new()));
/// let token = selector.acquire(&snapshot, &request).await?;
/// println!("{}", token.access_token);
/// # Ok(())
/// # }
/// ```
pub struct FlowSelector {
    backend: Arc<dyn AuthBackend>,
    webview_title: String,
    browser_options: SystemBrowserOptions,
    device_code_callback: DeviceCodeCallback,
}

impl FlowSelector {
    pub fn new(backend: Arc<dyn AuthBackend>) -> Self {
        Self {
            backend,
            webview_title: DEFAULT_WEBVIEW_TITLE.to_string(),
            browser_options: SystemBrowserOptions::default(),
            device_code_callback: Arc::new(|prompt| println!("{}", prompt.message)),
        }
    }

    pub fn with_webview_title(mut self, title: impl Into<String>) -> Self {
        self.webview_title = title.into();
        self
    }

    pub fn with_browser_options(mut self, options: SystemBrowserOptions) -> Self {
        self.browser_options = options;
        self
    }

    pub fn with_device_code_callback(mut self, callback: DeviceCodeCallback) -> Self {
        self.device_code_callback = callback;
        self
    }

    /// Select and run exactly one flow. Backend failures propagate
    /// unchanged; there is no retry on a different branch.
    pub async fn acquire(
        &self,
        snapshot: &EnvironmentSnapshot,
        request: &AuthRequest,
    ) -> Result<Token, AuthError> {
        let capabilities = Capabilities::for_environment(snapshot, request);
        let flow = select_flow(snapshot, request);
        info!(?flow, ?capabilities, os = ?snapshot.os, "selected login flow");

        let ctx = AcquireContext {
            request,
            capabilities,
        };
        match flow {
            FlowKind::Broker => self.backend.acquire_broker(ctx).await,
            FlowKind::EmbeddedWebView2 => {
                let dir = snapshot
                    .webview2_runtime
                    .clone()
                    .ok_or_else(|| {
                        AuthError::Configuration(
                            "WebView2 flow selected without a runtime directory".to_string(),
                        )
                    })?;
                let options = WebViewOptions {
                    title: self.webview_title.clone(),
                    browser_executable_dir: dir,
                };
                self.backend.acquire_embedded_webview2(ctx, &options).await
            }
            FlowKind::EmbeddedLegacy => self.backend.acquire_embedded_legacy(ctx).await,
            FlowKind::SystemBrowser => {
                self.backend
                    .acquire_system_browser(ctx, &self.browser_options)
                    .await
            }
            FlowKind::DeviceCode => {
                self.backend
                    .acquire_device_code(ctx, self.device_code_callback.clone())
                    .await
            }
        }
    }
}
