//! Signon — interactive OAuth2 sign-on with automatic flow selection.
//!
//! Picks exactly one login flow (OS broker, embedded WebView2, legacy
//! embedded browser, system browser, or device code) from the host
//! environment, then acquires a token through a pluggable
//! [`backend::AuthBackend`]. Device-code and system-browser flows ship
//! natively over HTTP.
//!
//! # Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//! use signon::config::AuthRequest;
//! use signon::environment::EnvironmentSnapshot;
//! use signon::flows::HttpAuthBackend;
//! use signon::selector::FlowSelector;
//!
//! # async fn example() -> Result<(), signon::error::AuthError> {
//! let request = AuthRequest::from_env()?;
//! let snapshot = EnvironmentSnapshot::probe(&request);
//! let selector = FlowSelector::new(Arc::new(HttpAuthBackend::new()));
//! let token = selector.acquire(&snapshot, &request).await?;
//! println!("{}", token.access_token);
//! # Ok(())
//! # }
//! ```

pub mod backend;
pub mod config;
pub mod environment;
pub mod error;
pub mod flows;
pub mod selector;
pub mod token;

pub use backend::{AuthBackend, DeviceCodePrompt, SystemBrowserOptions, WebViewOptions};
pub use config::AuthRequest;
pub use environment::{EnvironmentSnapshot, OsFamily};
pub use error::AuthError;
pub use flows::HttpAuthBackend;
pub use selector::{select_flow, FlowKind, FlowSelector};
pub use token::Token;
