//! Failure taxonomy shared by the verification flows.
//!
//! Results that arrive after a controller is torn down are not represented
//! here: they are dropped inside the request slot and never surfaced.

use thiserror::Error;

use shopfront_api::ApiError;
use shopfront_types::{OTP_LENGTH, OtpLengthError};

pub(crate) const TRANSPORT_FAILURE_MESSAGE: &str = "Something went wrong. Please try again.";

/// Input a flow cannot start without.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum MissingContext {
    #[error("Mobile number not found. Please register again.")]
    Target,
    #[error("Invalid verification link")]
    Code,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VerificationError {
    /// Fatal to the flow; the user is redirected or shown a terminal error.
    #[error(transparent)]
    MissingContext(#[from] MissingContext),
    /// Local input problem; no request was made.
    #[error("Please enter the {}-digit code", OTP_LENGTH)]
    InvalidLength { len: usize },
    /// The backend answered `{success: false}`.
    #[error("{message}")]
    ServerRejected { message: String },
    /// The backend could not be reached or answered nonsense.
    #[error("{}", TRANSPORT_FAILURE_MESSAGE)]
    Transport { detail: String },
}

impl VerificationError {
    pub(crate) fn rejected(message: Option<String>, fallback: &str) -> Self {
        Self::ServerRejected {
            message: message.unwrap_or_else(|| fallback.to_string()),
        }
    }

    /// Whether the user can try again from the same screen.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        !matches!(self, Self::MissingContext(_))
    }
}

impl From<OtpLengthError> for VerificationError {
    fn from(err: OtpLengthError) -> Self {
        Self::InvalidLength { len: err.len }
    }
}

impl From<ApiError> for VerificationError {
    fn from(err: ApiError) -> Self {
        Self::Transport {
            detail: err.to_string(),
        }
    }
}
