//! Backend client for the identity verification endpoints.
//!
//! # Architecture
//!
//! - [`VerificationApi`] - object-safe trait the engine talks to; one method
//!   per backend operation
//! - [`HttpVerificationApi`] - reqwest implementation posting JSON to the
//!   storefront backend
//! - [`ApiResponse`] / [`ApiOutcome`] - the `{success, error, message, data}`
//!   envelope every endpoint answers with, and the sum type callers match on
//!
//! # Error Handling
//!
//! A structured `{success: false}` answer is not an error: it is returned as
//! [`ApiOutcome::Rejected`] so callers can surface the server's message.
//! [`ApiError`] is reserved for transport failures and answers that cannot be
//! understood at all.

mod envelope;
mod http;

use std::future::Future;
use std::pin::Pin;

use thiserror::Error;

pub use envelope::{ApiOutcome, ApiResponse};
pub use http::{Endpoint, HttpVerificationApi};
pub use shopfront_types;

use shopfront_types::{AuthTokens, MobileNumber, OtpCode};

/// Verification call future type alias.
pub type ApiFut<'a, T> = Pin<Box<dyn Future<Output = Result<ApiOutcome<T>, ApiError>> + Send + 'a>>;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("unexpected HTTP status {status}")]
    Status { status: u16, body: String },
    #[error("malformed response: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("invalid backend URL: {0}")]
    Url(#[from] url::ParseError),
}

/// The backend operations the verification flows depend on.
pub trait VerificationApi: Send + Sync {
    /// Confirm a registration code for `mobile`.
    fn verify_mobile_otp<'a>(&'a self, mobile: &'a MobileNumber, otp: &'a OtpCode)
    -> ApiFut<'a, ()>;

    /// Confirm a login code for `mobile`; success carries the issued credentials.
    fn verify_mobile_login_otp<'a>(
        &'a self,
        mobile: &'a MobileNumber,
        otp: &'a OtpCode,
    ) -> ApiFut<'a, AuthTokens>;

    /// Send a fresh registration code.
    fn resend_mobile_otp<'a>(&'a self, mobile: &'a MobileNumber) -> ApiFut<'a, ()>;

    /// Send a fresh login code.
    fn mobile_otp_login<'a>(&'a self, mobile: &'a MobileNumber) -> ApiFut<'a, ()>;

    /// Confirm an email address with the code from its confirmation link.
    fn verify_email<'a>(&'a self, code: &'a str) -> ApiFut<'a, ()>;
}
