//! Email confirmation-link token.

use std::fmt;

use url::{Url, form_urlencoded};

use crate::NonEmptyString;

const CODE_PARAM: &str = "code";

/// Opaque code carried by an email confirmation link.
///
/// Extracted once per mount; `consume` hands the code out a single time so a
/// re-render cannot issue a second verification call.
#[derive(Clone, PartialEq, Eq)]
pub struct EmailToken {
    code: NonEmptyString,
    consumed: bool,
}

impl EmailToken {
    #[must_use]
    pub fn new(code: NonEmptyString) -> Self {
        Self {
            code,
            consumed: false,
        }
    }

    /// Extract the `code` query parameter from an inbound link.
    ///
    /// Accepts a full URL (`https://shop/verify-email?code=..`), a bare query
    /// (`?code=..`) or the query without the leading `?`. Returns `None` when
    /// the parameter is missing or blank.
    #[must_use]
    pub fn from_link(link: &str) -> Option<Self> {
        let link = link.trim();
        let code = match Url::parse(link) {
            Ok(url) => url
                .query_pairs()
                .find(|(key, _)| key == CODE_PARAM)
                .map(|(_, value)| value.into_owned()),
            Err(_) => {
                let query = link
                    .split_once('?')
                    .map_or(link, |(_, query)| query);
                let query = query.split('#').next().unwrap_or_default();
                form_urlencoded::parse(query.as_bytes())
                    .find(|(key, _)| key == CODE_PARAM)
                    .map(|(_, value)| value.into_owned())
            }
        }?;
        NonEmptyString::new(code).ok().map(Self::new)
    }

    #[must_use]
    pub fn code(&self) -> &str {
        self.code.as_str()
    }

    #[must_use]
    pub fn is_consumed(&self) -> bool {
        self.consumed
    }

    /// Take the code for a verification call. Returns `None` after the first call.
    pub fn consume(&mut self) -> Option<&str> {
        if self.consumed {
            return None;
        }
        self.consumed = true;
        Some(self.code.as_str())
    }
}

impl fmt::Debug for EmailToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EmailToken")
            .field("code", &"[REDACTED]")
            .field("consumed", &self.consumed)
            .finish()
    }
}
