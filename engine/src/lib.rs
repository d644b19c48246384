//! Core engine for Shopfront - verification state machines and orchestration.
//!
//! Everything here runs on one cooperative context: the host calls
//! [`Storefront::tick`] with the current time, and timers and finished
//! network requests are applied synchronously on that call. Network calls
//! themselves run as Tokio tasks and report back over channels.

use std::fmt;
use std::sync::Arc;

pub use shopfront_api::{self, VerificationApi};
pub use shopfront_config::VerificationSettings;
pub use shopfront_types::{
    AuthTokens, ChannelKind, ChannelState, ChannelTransitionError, MobileNumber, NonEmptyString,
    OtpPurpose, Route, VerificationChannel, VerificationStatus,
};

mod email;
mod error;
mod gate;
mod otp;
mod request;
mod session;
mod storefront;
mod timer;
mod toast;

#[cfg(test)]
mod test_support;

pub use email::{EmailLinkVerifier, EmailVerifyState};
pub use error::{MissingContext, VerificationError};
pub use gate::{GateContext, GateDecision, VerificationGate};
pub use otp::{OtpChallenge, OtpContext, OtpPhase, ResendStart, ResendState, SubmitStart};
pub use session::{FileSessionStore, MemorySessionStore, SessionError, SessionStore};
pub use storefront::{Screen, Storefront};
pub use timer::{Countdown, OneShotTimer};
pub use toast::{Effect, Toast, ToastLevel, ToastQueue};

/// Collaborators injected into every controller.
#[derive(Clone)]
pub struct Services {
    pub(crate) api: Arc<dyn VerificationApi>,
    pub(crate) sessions: Arc<dyn SessionStore>,
}

impl Services {
    pub fn new(api: Arc<dyn VerificationApi>, sessions: Arc<dyn SessionStore>) -> Self {
        Self { api, sessions }
    }

    #[must_use]
    pub fn api(&self) -> &Arc<dyn VerificationApi> {
        &self.api
    }

    #[must_use]
    pub fn sessions(&self) -> &Arc<dyn SessionStore> {
        &self.sessions
    }
}

impl fmt::Debug for Services {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Services").finish_non_exhaustive()
    }
}
