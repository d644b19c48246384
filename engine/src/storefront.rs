//! The storefront's single cooperative UI context.
//!
//! The host owns a [`Storefront`] and calls [`Storefront::tick`] from its
//! loop. Controllers never touch navigation, toasts or the status model
//! directly: they return [`Effect`]s which are applied here after every
//! controller call. Navigation always tears down the mounted controller
//! first.

use std::time::Instant;

use shopfront_config::VerificationSettings;
use shopfront_types::{ChannelKind, ChannelTransitionError, Route, VerificationStatus};

use crate::Services;
use crate::email::EmailLinkVerifier;
use crate::error::{TRANSPORT_FAILURE_MESSAGE, VerificationError};
use crate::gate::{GateContext, VerificationGate};
use crate::otp::{OtpChallenge, OtpContext, ResendStart, SubmitStart};
use crate::session::SessionError;
use crate::toast::{Effect, Toast, ToastLevel, ToastQueue};

const LOGGED_OUT_MESSAGE: &str = "Logged out successfully";

// ============================================================================
// Screen - what is mounted on the current route
// ============================================================================

#[derive(Debug)]
pub enum Screen {
    /// A route with no verification controller.
    Page(Route),
    OtpVerify(Box<OtpChallenge>),
    EmailVerify(Box<EmailLinkVerifier>),
}

impl Screen {
    fn teardown(&mut self) {
        match self {
            Screen::Page(_) => {}
            Screen::OtpVerify(otp) => otp.teardown(),
            Screen::EmailVerify(verifier) => verifier.teardown(),
        }
    }

    fn poll(&mut self, now: Instant) {
        match self {
            Screen::Page(_) => {}
            Screen::OtpVerify(otp) => otp.poll(now),
            Screen::EmailVerify(verifier) => verifier.poll(now),
        }
    }

    fn take_effects(&mut self) -> Vec<Effect> {
        match self {
            Screen::Page(_) => Vec::new(),
            Screen::OtpVerify(otp) => otp.take_effects(),
            Screen::EmailVerify(verifier) => verifier.take_effects(),
        }
    }
}

// ============================================================================
// Storefront
// ============================================================================

#[derive(Debug)]
pub struct Storefront {
    services: Services,
    settings: VerificationSettings,
    route: Route,
    screen: Screen,
    status: VerificationStatus,
    toasts: ToastQueue,
    gate_prompt: Option<GateContext>,
}

impl Storefront {
    #[must_use]
    pub fn new(services: Services, settings: VerificationSettings) -> Self {
        Self {
            services,
            settings,
            route: Route::Home,
            screen: Screen::Page(Route::Home),
            status: VerificationStatus::new(),
            toasts: ToastQueue::new(),
            gate_prompt: None,
        }
    }

    /// Start from a known profile, e.g. one loaded from the backend.
    #[must_use]
    pub fn with_status(mut self, status: VerificationStatus) -> Self {
        self.status = status;
        self
    }

    #[must_use]
    pub fn route(&self) -> Route {
        self.route
    }

    #[must_use]
    pub fn screen(&self) -> &Screen {
        &self.screen
    }

    #[must_use]
    pub fn otp(&self) -> Option<&OtpChallenge> {
        match &self.screen {
            Screen::OtpVerify(otp) => Some(otp),
            _ => None,
        }
    }

    #[must_use]
    pub fn email(&self) -> Option<&EmailLinkVerifier> {
        match &self.screen {
            Screen::EmailVerify(verifier) => Some(verifier),
            _ => None,
        }
    }

    #[must_use]
    pub fn status(&self) -> &VerificationStatus {
        &self.status
    }

    /// The blocked-checkout prompt awaiting confirm or dismiss.
    #[must_use]
    pub fn gate_prompt(&self) -> Option<&GateContext> {
        self.gate_prompt.as_ref()
    }

    #[must_use]
    pub fn services(&self) -> &Services {
        &self.services
    }

    pub fn take_toasts(&mut self) -> Vec<Toast> {
        self.toasts.take()
    }

    fn push_toast(&mut self, level: ToastLevel, message: impl Into<String>) {
        if let Some(toast) = Toast::new(level, message) {
            self.toasts.push(toast);
        }
    }

    fn replace_screen(&mut self, route: Route, screen: Screen) {
        self.screen.teardown();
        self.screen = screen;
        if self.route != route {
            tracing::info!(from = %self.route, route = %route, "Navigate");
        }
        self.route = route;
    }

    /// Leave the current screen for a plain route.
    pub fn navigate(&mut self, route: Route) {
        self.replace_screen(route, Screen::Page(route));
    }

    /// Mount the OTP screen. Without a mobile number the user is sent back
    /// to registration with an error toast.
    pub fn open_otp(&mut self, context: OtpContext, now: Instant) -> Result<(), VerificationError> {
        self.screen.teardown();
        match OtpChallenge::mount(context, self.services.clone(), self.settings, now) {
            Ok(otp) => {
                self.replace_screen(Route::VerifyOtp, Screen::OtpVerify(Box::new(otp)));
                Ok(())
            }
            Err(err) => {
                tracing::warn!(error = %err, "Cannot open OTP screen");
                self.push_toast(ToastLevel::Error, err.to_string());
                self.navigate(Route::Register);
                Err(err)
            }
        }
    }

    /// Mount the email-link screen, or re-render it if it is already mounted.
    pub fn open_email_link(&mut self, link: &str) {
        if let Screen::EmailVerify(verifier) = &mut self.screen {
            verifier.refresh(link);
            self.apply_effects();
            return;
        }
        let verifier = EmailLinkVerifier::mount(link, self.services.clone(), self.settings);
        self.replace_screen(Route::VerifyEmail, Screen::EmailVerify(Box::new(verifier)));
        self.apply_effects();
    }

    /// Advance timers and apply finished requests on the mounted screen.
    pub fn tick(&mut self, now: Instant) {
        self.screen.poll(now);
        self.apply_effects();
    }

    pub fn input_otp(&mut self, raw: &str) {
        if let Screen::OtpVerify(otp) = &mut self.screen {
            otp.on_code_input(raw);
        }
    }

    /// `None` when no OTP screen is mounted.
    pub fn submit_otp(&mut self) -> Option<Result<SubmitStart, VerificationError>> {
        let Screen::OtpVerify(otp) = &mut self.screen else {
            return None;
        };
        let result = otp.submit();
        self.apply_effects();
        Some(result)
    }

    /// `None` when no OTP screen is mounted.
    pub fn resend_otp(&mut self) -> Option<ResendStart> {
        let Screen::OtpVerify(otp) = &mut self.screen else {
            return None;
        };
        let result = otp.resend();
        self.apply_effects();
        Some(result)
    }

    /// Run `action` behind the verification gate. When blocked, the gate
    /// prompt is raised and `None` returned.
    pub fn checkout<T>(&mut self, action: impl FnOnce() -> T) -> Option<T> {
        match VerificationGate::guard(&self.status, action) {
            Ok(value) => {
                self.gate_prompt = None;
                Some(value)
            }
            Err(context) => {
                tracing::info!(
                    required = ?context.required_channels(),
                    "Checkout blocked pending verification"
                );
                self.gate_prompt = Some(context);
                None
            }
        }
    }

    /// Accept the gate prompt and go to the profile page. Returns `false` if
    /// no prompt was raised.
    pub fn confirm_gate(&mut self) -> bool {
        if self.gate_prompt.take().is_none() {
            return false;
        }
        self.navigate(VerificationGate::RESOLVE_ROUTE);
        true
    }

    pub fn dismiss_gate(&mut self) {
        self.gate_prompt = None;
    }

    /// Record a channel on the profile as registered but unverified.
    pub fn register_channel(
        &mut self,
        kind: ChannelKind,
        value: &str,
    ) -> Result<(), ChannelTransitionError> {
        self.status.channel_mut(kind).register(value)?;
        tracing::info!(channel = %kind, "Channel registered");
        Ok(())
    }

    /// Clear stored credentials and the profile, then land on login.
    pub fn logout(&mut self) -> Result<(), SessionError> {
        if let Err(err) = self.services.sessions.clear() {
            tracing::warn!(error = %err, "Failed to clear session");
            self.push_toast(ToastLevel::Error, TRANSPORT_FAILURE_MESSAGE);
            return Err(err);
        }
        self.status = VerificationStatus::new();
        self.gate_prompt = None;
        self.push_toast(ToastLevel::Info, LOGGED_OUT_MESSAGE);
        self.navigate(Route::Login);
        tracing::info!("Logged out");
        Ok(())
    }

    fn apply_effects(&mut self) {
        for effect in self.screen.take_effects() {
            match effect {
                Effect::Toast(toast) => self.toasts.push(toast),
                Effect::Navigate(route) => self.navigate(route),
                Effect::ChannelVerified { kind, value } => self.record_verified(kind, value),
            }
        }
    }

    fn record_verified(&mut self, kind: ChannelKind, value: Option<String>) {
        let channel = self.status.channel_mut(kind);
        if !channel.state().is_verified()
            && let Some(value) = value
            && let Err(err) = channel.register(value)
        {
            tracing::warn!(channel = %kind, error = %err, "Could not record verified value");
        }
        match channel.mark_verified() {
            Ok(()) => tracing::info!(channel = %kind, "Channel verified"),
            Err(err) => tracing::warn!(channel = %kind, error = %err, "Could not mark channel verified"),
        }
    }
}
