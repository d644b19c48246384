//! Credentials issued by a successful login.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Access and refresh tokens returned by the login OTP endpoint.
///
/// Field names on the wire follow the backend (`accesstoken`, `refreshToken`).
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthTokens {
    #[serde(rename = "accesstoken")]
    access_token: String,
    #[serde(rename = "refreshToken")]
    refresh_token: String,
}

impl AuthTokens {
    #[must_use]
    pub fn new(access_token: impl Into<String>, refresh_token: impl Into<String>) -> Self {
        Self {
            access_token: access_token.into(),
            refresh_token: refresh_token.into(),
        }
    }

    #[must_use]
    pub fn access_token(&self) -> &str {
        &self.access_token
    }

    #[must_use]
    pub fn refresh_token(&self) -> &str {
        &self.refresh_token
    }

    /// Both tokens present and non-blank.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        !self.access_token.trim().is_empty() && !self.refresh_token.trim().is_empty()
    }
}

// Manual Debug impl to prevent leaking tokens in logs.
impl fmt::Debug for AuthTokens {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthTokens")
            .field("access_token", &"[REDACTED]")
            .field("refresh_token", &"[REDACTED]")
            .finish()
    }
}
