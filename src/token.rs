use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Token payload returned by a completed login flow.
///
/// Tokens are handed back to the caller as-is; this crate performs no
/// persistence or silent refresh.
///
/// # Example
/// ```no_run
/// use signon::token::Token;
///
/// let token = Token {
///     access_token: "access".to_string(),
///     refresh_token: Some("refresh".to_string()),
///     id_token: None,
///     expires_at: None,
///     scopes: Some(vec!["user.read".to_string()]),
/// };
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Token {
    pub access_token: String,
    pub refresh_token: Option<String>,
    pub id_token: Option<String>,
    pub expires_at: Option<DateTime<Utc>>,
    pub scopes: Option<Vec<String>>,
}
