//! Mobile OTP challenge: code entry, submission, and a cooldown-gated resend.
//!
//! The controller owns two independent [`RequestSlot`]s (verify and resend)
//! so a verification can proceed while a resend is pending and vice versa.
//! Both are aborted on teardown; late results are dropped.

use std::future::Future;
use std::sync::Arc;
use std::time::Instant;

use shopfront_api::{ApiError, ApiOutcome, VerificationApi};
use shopfront_config::VerificationSettings;
use shopfront_types::{
    AuthTokens, ChannelKind, MobileNumber, OtpBuffer, OtpCode, OtpPurpose, Route,
};

use crate::Services;
use crate::error::{MissingContext, VerificationError};
use crate::request::{RequestSlot, SlotStart};
use crate::timer::Countdown;
use crate::toast::{Effect, Effects, ToastLevel};

const VERIFIED_MESSAGE: &str = "Mobile number verified successfully";
const REJECTED_MESSAGE: &str = "Invalid OTP. Please try again.";
const RESENT_MESSAGE: &str = "OTP resent successfully";
const RESEND_FAILED_MESSAGE: &str = "Failed to resend OTP";

type VerifyResult = Result<ApiOutcome<AuthTokens>, ApiError>;
type ResendResult = Result<ApiOutcome<()>, ApiError>;

/// Navigation context handed to the OTP screen.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OtpContext {
    pub mobile: Option<String>,
    pub purpose: OtpPurpose,
}

impl OtpContext {
    pub fn new(mobile: impl Into<String>, purpose: OtpPurpose) -> Self {
        Self {
            mobile: Some(mobile.into()),
            purpose,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OtpPhase {
    Entering,
    Submitting,
    Verified,
    Closed,
}

/// What the resend control should show.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResendState {
    Cooldown(u32),
    Ready,
    Sending,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitStart {
    Started,
    AlreadySubmitting,
    Closed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResendStart {
    Started,
    CoolingDown { remaining: u32 },
    AlreadySending,
    Closed,
}

/// Endpoint pair and landing page for each purpose.
trait PurposeFlow {
    fn verify(
        self,
        api: Arc<dyn VerificationApi>,
        mobile: MobileNumber,
        code: OtpCode,
    ) -> impl Future<Output = VerifyResult> + Send + 'static;

    fn resend(
        self,
        api: Arc<dyn VerificationApi>,
        mobile: MobileNumber,
    ) -> impl Future<Output = ResendResult> + Send + 'static;

    /// Whether a successful verification must carry credentials to persist.
    fn issues_credentials(self) -> bool;

    fn landing(self) -> Route;
}

impl PurposeFlow for OtpPurpose {
    fn verify(
        self,
        api: Arc<dyn VerificationApi>,
        mobile: MobileNumber,
        code: OtpCode,
    ) -> impl Future<Output = VerifyResult> + Send + 'static {
        async move {
            match self {
                OtpPurpose::Registration => api
                    .verify_mobile_otp(&mobile, &code)
                    .await
                    .map(ApiOutcome::without_data),
                OtpPurpose::Login => api.verify_mobile_login_otp(&mobile, &code).await,
            }
        }
    }

    fn resend(
        self,
        api: Arc<dyn VerificationApi>,
        mobile: MobileNumber,
    ) -> impl Future<Output = ResendResult> + Send + 'static {
        async move {
            match self {
                OtpPurpose::Registration => api.resend_mobile_otp(&mobile).await,
                OtpPurpose::Login => api.mobile_otp_login(&mobile).await,
            }
        }
    }

    fn issues_credentials(self) -> bool {
        matches!(self, OtpPurpose::Login)
    }

    fn landing(self) -> Route {
        match self {
            OtpPurpose::Registration => Route::Login,
            OtpPurpose::Login => Route::Home,
        }
    }
}

#[derive(Debug)]
struct OtpSession {
    target: MobileNumber,
    purpose: OtpPurpose,
    code: OtpBuffer,
    code_rejected: bool,
    /// Code carried by the in-flight verify request.
    submitted: Option<OtpBuffer>,
}

#[derive(Debug)]
pub struct OtpChallenge {
    session: OtpSession,
    phase: OtpPhase,
    cooldown: Countdown,
    cooldown_secs: u32,
    verify: RequestSlot<VerifyResult>,
    resend: RequestSlot<ResendResult>,
    services: Services,
    effects: Effects,
}

impl OtpChallenge {
    /// Open a challenge for the number in `context`. The resend cooldown
    /// starts immediately, since a code was just sent.
    pub fn mount(
        context: OtpContext,
        services: Services,
        settings: VerificationSettings,
        now: Instant,
    ) -> Result<Self, VerificationError> {
        let target = context
            .mobile
            .and_then(|raw| MobileNumber::new(raw).ok())
            .ok_or(MissingContext::Target)?;

        let mut cooldown = Countdown::new();
        cooldown.start(settings.resend_cooldown_secs, now);

        tracing::info!(
            mobile = %target.masked(),
            purpose = %context.purpose,
            "OTP challenge opened"
        );

        Ok(Self {
            session: OtpSession {
                target,
                purpose: context.purpose,
                code: OtpBuffer::new(),
                code_rejected: false,
                submitted: None,
            },
            phase: OtpPhase::Entering,
            cooldown,
            cooldown_secs: settings.resend_cooldown_secs,
            verify: RequestSlot::new("otp-verify"),
            resend: RequestSlot::new("otp-resend"),
            services,
            effects: Effects::default(),
        })
    }

    #[must_use]
    pub fn phase(&self) -> OtpPhase {
        self.phase
    }

    #[must_use]
    pub fn target(&self) -> &MobileNumber {
        &self.session.target
    }

    #[must_use]
    pub fn purpose(&self) -> OtpPurpose {
        self.session.purpose
    }

    #[must_use]
    pub fn code(&self) -> &str {
        self.session.code.as_str()
    }

    /// Set after the server rejects the current code; cleared on the next edit.
    #[must_use]
    pub fn is_code_rejected(&self) -> bool {
        self.session.code_rejected
    }

    #[must_use]
    pub fn cooldown_remaining(&self) -> u32 {
        self.cooldown.remaining()
    }

    #[must_use]
    pub fn resend_state(&self) -> ResendState {
        if self.resend.is_in_flight() {
            ResendState::Sending
        } else if self.cooldown.remaining() > 0 {
            ResendState::Cooldown(self.cooldown.remaining())
        } else {
            ResendState::Ready
        }
    }

    #[must_use]
    pub fn is_verify_in_flight(&self) -> bool {
        self.verify.is_in_flight()
    }

    #[must_use]
    pub fn is_resend_in_flight(&self) -> bool {
        self.resend.is_in_flight()
    }

    fn is_open(&self) -> bool {
        matches!(self.phase, OtpPhase::Entering | OtpPhase::Submitting)
    }

    /// Replace the code with the digits in `raw`, truncated to the code length.
    pub fn on_code_input(&mut self, raw: &str) {
        if !self.is_open() {
            return;
        }
        self.session.code = OtpBuffer::from_input(raw);
        self.session.code_rejected = false;
    }

    /// Submit the current code. An incomplete code is reported as a toast and
    /// returned as [`VerificationError::InvalidLength`] without any request.
    pub fn submit(&mut self) -> Result<SubmitStart, VerificationError> {
        if !self.is_open() {
            return Ok(SubmitStart::Closed);
        }
        if self.verify.is_in_flight() {
            return Ok(SubmitStart::AlreadySubmitting);
        }

        let code = match self.session.code.to_code() {
            Ok(code) => code,
            Err(err) => {
                let err = VerificationError::from(err);
                self.effects.toast(ToastLevel::Error, err.to_string());
                return Err(err);
            }
        };

        let purpose = self.session.purpose;
        let request = purpose.verify(
            Arc::clone(&self.services.api),
            self.session.target.clone(),
            code,
        );
        match self.verify.start(request) {
            SlotStart::Started => {
                self.phase = OtpPhase::Submitting;
                self.session.submitted = Some(self.session.code.clone());
                tracing::info!(
                    mobile = %self.session.target.masked(),
                    purpose = %purpose,
                    "Submitting OTP"
                );
                Ok(SubmitStart::Started)
            }
            SlotStart::Busy => Ok(SubmitStart::AlreadySubmitting),
        }
    }

    /// Ask for a fresh code. Refused while cooling down or already sending.
    pub fn resend(&mut self) -> ResendStart {
        if !self.is_open() {
            return ResendStart::Closed;
        }
        if self.resend.is_in_flight() {
            return ResendStart::AlreadySending;
        }
        let remaining = self.cooldown.remaining();
        if remaining > 0 {
            return ResendStart::CoolingDown { remaining };
        }

        let purpose = self.session.purpose;
        let request = purpose.resend(
            Arc::clone(&self.services.api),
            self.session.target.clone(),
        );
        match self.resend.start(request) {
            SlotStart::Started => {
                tracing::info!(
                    mobile = %self.session.target.masked(),
                    purpose = %purpose,
                    "Requesting new OTP"
                );
                ResendStart::Started
            }
            SlotStart::Busy => ResendStart::AlreadySending,
        }
    }

    /// Advance the cooldown and apply any finished requests.
    pub fn poll(&mut self, now: Instant) {
        if self.phase == OtpPhase::Closed {
            return;
        }

        self.cooldown.poll(now, |remaining| {
            if remaining == 0 {
                tracing::debug!("Resend cooldown elapsed");
            }
        });

        if let Some(result) = self.verify.poll() {
            self.finish_verify(result);
        }
        if let Some(result) = self.resend.poll() {
            self.finish_resend(result, now);
        }
    }

    fn finish_verify(&mut self, result: VerifyResult) {
        let submitted = self.session.submitted.take();
        let outcome = match result {
            Ok(ApiOutcome::Accepted { message, data }) => self.complete(message, data),
            Ok(ApiOutcome::Rejected { message }) => {
                Err(VerificationError::rejected(message, REJECTED_MESSAGE))
            }
            Err(err) => {
                tracing::warn!(error = %err, "OTP verification request failed");
                Err(err.into())
            }
        };

        if let Err(err) = outcome {
            self.phase = OtpPhase::Entering;
            // Only the code that was sent is known bad, not one typed since.
            if matches!(err, VerificationError::ServerRejected { .. })
                && submitted.as_ref() == Some(&self.session.code)
            {
                self.session.code_rejected = true;
            }
            tracing::info!(
                mobile = %self.session.target.masked(),
                error = %err,
                "OTP not accepted"
            );
            self.effects.toast(ToastLevel::Error, err.to_string());
        }
    }

    fn complete(
        &mut self,
        message: String,
        tokens: Option<AuthTokens>,
    ) -> Result<(), VerificationError> {
        let purpose = self.session.purpose;
        if purpose.issues_credentials() {
            let tokens = tokens
                .filter(AuthTokens::is_complete)
                .ok_or_else(|| VerificationError::Transport {
                    detail: "login response carried no credentials".to_string(),
                })?;
            self.services.sessions.set(&tokens).map_err(|err| {
                tracing::warn!(error = %err, "Failed to persist session");
                VerificationError::Transport {
                    detail: err.to_string(),
                }
            })?;
        }

        self.phase = OtpPhase::Verified;
        self.cooldown.cancel();
        self.resend.cancel();
        self.session.code.clear();

        tracing::info!(
            mobile = %self.session.target.masked(),
            purpose = %purpose,
            "Mobile number verified"
        );
        let message = if message.trim().is_empty() {
            VERIFIED_MESSAGE.to_string()
        } else {
            message
        };
        self.effects.toast(ToastLevel::Success, message);
        self.effects.channel_verified(
            ChannelKind::Mobile,
            Some(self.session.target.as_str().to_string()),
        );
        self.effects.navigate(purpose.landing());
        Ok(())
    }

    fn finish_resend(&mut self, result: ResendResult, now: Instant) {
        match result {
            Ok(ApiOutcome::Accepted { message, .. }) => {
                self.session.code.clear();
                self.session.code_rejected = false;
                self.cooldown.start(self.cooldown_secs, now);
                tracing::info!(mobile = %self.session.target.masked(), "OTP resent");
                let message = if message.trim().is_empty() {
                    RESENT_MESSAGE.to_string()
                } else {
                    message
                };
                self.effects.toast(ToastLevel::Success, message);
            }
            Ok(ApiOutcome::Rejected { message }) => {
                let err = VerificationError::rejected(message, RESEND_FAILED_MESSAGE);
                self.effects.toast(ToastLevel::Error, err.to_string());
            }
            Err(err) => {
                tracing::warn!(error = %err, "OTP resend request failed");
                self.effects
                    .toast(ToastLevel::Error, VerificationError::from(err).to_string());
            }
        }
    }

    /// Effects produced since the last call, in order.
    pub fn take_effects(&mut self) -> Vec<Effect> {
        self.effects.take()
    }

    /// Stop the cooldown and abandon in-flight requests. Nothing this
    /// controller does afterwards reaches the user.
    pub fn teardown(&mut self) {
        if self.phase == OtpPhase::Closed {
            return;
        }
        self.cooldown.cancel();
        self.verify.cancel();
        self.resend.cancel();
        self.effects.clear();
        self.phase = OtpPhase::Closed;
        tracing::debug!(mobile = %self.session.target.masked(), "OTP challenge closed");
    }
}
