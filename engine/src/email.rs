//! Email confirmation-link verifier.
//!
//! `Loading` resolves to `Success` or `Error` and stays there. A success
//! schedules a one-shot redirect to the login page; teardown cancels it.

use std::sync::Arc;
use std::time::{Duration, Instant};

use shopfront_api::{ApiError, ApiOutcome};
use shopfront_config::VerificationSettings;
use shopfront_types::{ChannelKind, EmailToken, Route};

use crate::Services;
use crate::error::{MissingContext, VerificationError};
use crate::request::RequestSlot;
use crate::timer::OneShotTimer;
use crate::toast::{Effect, Effects};

const VERIFIED_MESSAGE: &str = "Email verified successfully";
const FAILED_MESSAGE: &str = "Email verification failed";

type EmailResult = Result<ApiOutcome<()>, ApiError>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EmailVerifyState {
    Loading,
    Success { message: String },
    Error { message: String },
}

impl EmailVerifyState {
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        !matches!(self, EmailVerifyState::Loading)
    }
}

#[derive(Debug)]
pub struct EmailLinkVerifier {
    token: Option<EmailToken>,
    state: EmailVerifyState,
    request: RequestSlot<EmailResult>,
    redirect: OneShotTimer,
    redirect_delay: Duration,
    services: Services,
    effects: Effects,
    closed: bool,
}

impl EmailLinkVerifier {
    /// Extract the code from `link` and issue the single verification call.
    /// A link without a code resolves to `Error` immediately.
    pub fn mount(link: &str, services: Services, settings: VerificationSettings) -> Self {
        let mut verifier = Self {
            token: EmailToken::from_link(link),
            state: EmailVerifyState::Loading,
            request: RequestSlot::new("email-verify"),
            redirect: OneShotTimer::new(),
            redirect_delay: settings.email_redirect_delay,
            services,
            effects: Effects::default(),
            closed: false,
        };
        verifier.start();
        verifier
    }

    fn start(&mut self) {
        let Some(code) = self
            .token
            .as_mut()
            .and_then(EmailToken::consume)
            .map(str::to_string)
        else {
            tracing::info!("Email link has no verification code");
            self.state = EmailVerifyState::Error {
                message: VerificationError::from(MissingContext::Code).to_string(),
            };
            return;
        };

        let api = Arc::clone(&self.services.api);
        self.request
            .start(async move { api.verify_email(&code).await });
        tracing::info!("Verifying email link");
    }

    #[must_use]
    pub fn state(&self) -> &EmailVerifyState {
        &self.state
    }

    #[must_use]
    pub fn is_in_flight(&self) -> bool {
        self.request.is_in_flight()
    }

    #[must_use]
    pub fn is_redirect_pending(&self) -> bool {
        self.redirect.is_pending()
    }

    /// Apply a finished verification and fire the redirect once it is due.
    pub fn poll(&mut self, now: Instant) {
        if self.closed {
            return;
        }
        if let Some(result) = self.request.poll() {
            self.finish(result, now);
        }
        if self.redirect.poll(now) {
            tracing::debug!("Leaving verified email link for login");
            self.effects.navigate(Route::Login);
        }
    }

    fn finish(&mut self, result: EmailResult, now: Instant) {
        self.state = match result {
            Ok(ApiOutcome::Accepted { message, .. }) => {
                tracing::info!("Email verified");
                self.effects.channel_verified(ChannelKind::Email, None);
                self.redirect.schedule(self.redirect_delay, now);
                EmailVerifyState::Success {
                    message: if message.trim().is_empty() {
                        VERIFIED_MESSAGE.to_string()
                    } else {
                        message
                    },
                }
            }
            Ok(ApiOutcome::Rejected { message }) => {
                let err = VerificationError::rejected(message, FAILED_MESSAGE);
                tracing::info!(error = %err, "Email verification rejected");
                EmailVerifyState::Error {
                    message: err.to_string(),
                }
            }
            Err(err) => {
                tracing::warn!(error = %err, "Email verification request failed");
                EmailVerifyState::Error {
                    message: VerificationError::from(err).to_string(),
                }
            }
        };
    }

    /// Re-render with a possibly different link. The same code never issues
    /// a second call; a different code restarts from `Loading`.
    pub fn refresh(&mut self, link: &str) {
        let next = EmailToken::from_link(link);
        let current = self.token.as_ref().map(EmailToken::code);
        if next.as_ref().map(EmailToken::code) == current {
            return;
        }

        tracing::debug!("Email link changed; restarting verification");
        self.request.cancel();
        self.redirect.cancel();
        self.effects.clear();
        self.token = next;
        self.state = EmailVerifyState::Loading;
        self.closed = false;
        self.start();
    }

    pub fn take_effects(&mut self) -> Vec<Effect> {
        self.effects.take()
    }

    pub fn teardown(&mut self) {
        self.request.cancel();
        self.redirect.cancel();
        self.effects.clear();
        self.closed = true;
    }
}
