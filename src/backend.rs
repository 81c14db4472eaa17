//! Capability trait dispatched to by the flow selector.

use std::sync::Arc;

use async_trait::async_trait;

use crate::config::AuthRequest;
use crate::error::AuthError;
use crate::selector::Capabilities;
use crate::token::Token;

/// Borrowed view of one acquisition, handed to every backend operation.
#[derive(Debug, Clone, Copy)]
pub struct AcquireContext<'a> {
    pub request: &'a AuthRequest,
    pub capabilities: Capabilities,
}

/// Static UI options for the embedded WebView2 flow.
#[derive(Debug, Clone)]
pub struct WebViewOptions {
    pub title: String,
    pub browser_executable_dir: std::path::PathBuf,
}

/// Static pages served back to the system browser after the redirect.
#[derive(Debug, Clone)]
pub struct SystemBrowserOptions {
    pub html_message_success: String,
    pub html_message_error: String,
}

impl Default for SystemBrowserOptions {
    fn default() -> Self {
        Self {
            html_message_success: "It worked! :)".to_string(),
            html_message_error: "It failed! :(".to_string(),
        }
    }
}

/// User-facing instructions delivered once at the start of a device-code
/// login.
#[derive(Debug, Clone)]
pub struct DeviceCodePrompt {
    /// Ready-to-display message ("go to ..., enter code ...").
    pub message: String,
    pub verification_url: String,
    pub user_code: String,
}

/// Prompt sink for the device-code flow. Must return promptly: polling is
/// driven by the backend and does not start until the callback returns.
pub type DeviceCodeCallback = Arc<dyn Fn(&DeviceCodePrompt) + Send + Sync>;

/// One token-acquisition operation per login flow.
///
/// The selector picks exactly one of these per run. Implementations perform
/// the actual network or UI exchange; fakes make the selection logic
/// testable without either.
#[async_trait]
pub trait AuthBackend: Send + Sync {
    /// Acquire through the OS authentication broker.
    async fn acquire_broker(&self, ctx: AcquireContext<'_>) -> Result<Token, AuthError>;

    /// Acquire through an embedded WebView2 window.
    async fn acquire_embedded_webview2(
        &self,
        ctx: AcquireContext<'_>,
        options: &WebViewOptions,
    ) -> Result<Token, AuthError>;

    /// Acquire through the legacy OS-provided embedded browser.
    async fn acquire_embedded_legacy(&self, ctx: AcquireContext<'_>) -> Result<Token, AuthError>;

    /// Acquire through the user's default browser with a loopback redirect.
    async fn acquire_system_browser(
        &self,
        ctx: AcquireContext<'_>,
        options: &SystemBrowserOptions,
    ) -> Result<Token, AuthError>;

    /// Acquire through the device-code grant, prompting via `on_prompt`.
    async fn acquire_device_code(
        &self,
        ctx: AcquireContext<'_>,
        on_prompt: DeviceCodeCallback,
    ) -> Result<Token, AuthError>;
}
