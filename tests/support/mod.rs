#![allow(dead_code)]

use std::path::PathBuf;
use std::sync::Mutex;

use async_trait::async_trait;

use signon::backend::{
    AcquireContext, AuthBackend, DeviceCodeCallback, DeviceCodePrompt, SystemBrowserOptions,
    WebViewOptions,
};
use signon::error::AuthError;
use signon::selector::Capabilities;
use signon::token::Token;

/// One recorded backend dispatch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Invocation {
    Broker {
        capabilities: Capabilities,
    },
    EmbeddedWebView2 {
        capabilities: Capabilities,
        title: String,
        browser_executable_dir: PathBuf,
    },
    EmbeddedLegacy {
        capabilities: Capabilities,
    },
    SystemBrowser {
        capabilities: Capabilities,
        html_message_success: String,
        html_message_error: String,
    },
    DeviceCode {
        capabilities: Capabilities,
    },
}

/// Fake backend that records every dispatch and returns a canned result.
#[derive(Default)]
pub struct RecordingBackend {
    calls: Mutex<Vec<Invocation>>,
    fail: bool,
}

impl RecordingBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Backend whose operations all fail with `AccessDenied`.
    pub fn failing() -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            fail: true,
        }
    }

    pub fn calls(&self) -> Vec<Invocation> {
        self.calls.lock().expect("calls lock poisoned").clone()
    }

    fn record(&self, invocation: Invocation) -> Result<Token, AuthError> {
        self.calls
            .lock()
            .expect("calls lock poisoned")
            .push(invocation);
        if self.fail {
            Err(AuthError::AccessDenied)
        } else {
            Ok(token("fake-access-token"))
        }
    }
}

#[async_trait]
impl AuthBackend for RecordingBackend {
    async fn acquire_broker(&self, ctx: AcquireContext<'_>) -> Result<Token, AuthError> {
        self.record(Invocation::Broker {
            capabilities: ctx.capabilities,
        })
    }

    async fn acquire_embedded_webview2(
        &self,
        ctx: AcquireContext<'_>,
        options: &WebViewOptions,
    ) -> Result<Token, AuthError> {
        self.record(Invocation::EmbeddedWebView2 {
            capabilities: ctx.capabilities,
            title: options.title.clone(),
            browser_executable_dir: options.browser_executable_dir.clone(),
        })
    }

    async fn acquire_embedded_legacy(&self, ctx: AcquireContext<'_>) -> Result<Token, AuthError> {
        self.record(Invocation::EmbeddedLegacy {
            capabilities: ctx.capabilities,
        })
    }

    async fn acquire_system_browser(
        &self,
        ctx: AcquireContext<'_>,
        options: &SystemBrowserOptions,
    ) -> Result<Token, AuthError> {
        self.record(Invocation::SystemBrowser {
            capabilities: ctx.capabilities,
            html_message_success: options.html_message_success.clone(),
            html_message_error: options.html_message_error.clone(),
        })
    }

    async fn acquire_device_code(
        &self,
        ctx: AcquireContext<'_>,
        on_prompt: DeviceCodeCallback,
    ) -> Result<Token, AuthError> {
        on_prompt(&DeviceCodePrompt {
            message: "To sign in, visit https://example.test/device and enter FAKE-CODE."
                .to_string(),
            verification_url: "https://example.test/device".to_string(),
            user_code: "FAKE-CODE".to_string(),
        });
        self.record(Invocation::DeviceCode {
            capabilities: ctx.capabilities,
        })
    }
}

pub fn token(access_token: &str) -> Token {
    Token {
        access_token: access_token.to_string(),
        refresh_token: None,
        id_token: None,
        expires_at: None,
        scopes: None,
    }
}
