//! User-facing notifications and the effects controllers hand back to the host.

use std::collections::VecDeque;

use shopfront_types::{ChannelKind, NonEmptyString, Route};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToastLevel {
    Success,
    Error,
    Info,
}

impl ToastLevel {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            ToastLevel::Success => "success",
            ToastLevel::Error => "error",
            ToastLevel::Info => "info",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Toast {
    level: ToastLevel,
    message: NonEmptyString,
}

impl Toast {
    /// Returns `None` for blank messages; there is nothing to show.
    pub fn new(level: ToastLevel, message: impl Into<String>) -> Option<Self> {
        NonEmptyString::new(message)
            .ok()
            .map(|message| Self { level, message })
    }

    #[must_use]
    pub fn level(&self) -> ToastLevel {
        self.level
    }

    #[must_use]
    pub fn message(&self) -> &str {
        self.message.as_str()
    }
}

/// Pending toasts, oldest first. The host drains them each frame.
#[derive(Debug, Default)]
pub struct ToastQueue {
    pending: VecDeque<Toast>,
}

impl ToastQueue {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, toast: Toast) {
        self.pending.push_back(toast);
    }

    /// Take all pending toasts, clearing the queue.
    pub fn take(&mut self) -> Vec<Toast> {
        self.pending.drain(..).collect()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.pending.len()
    }
}

/// Side effects requested by a controller. The orchestrator applies them in
/// order after every controller call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    Toast(Toast),
    Navigate(Route),
    /// A channel was proven. `value` is the verified number or address when
    /// the flow knows it; an email link only carries an opaque code.
    ChannelVerified {
        kind: ChannelKind,
        value: Option<String>,
    },
}

/// Effect buffer owned by each controller.
#[derive(Debug, Default)]
pub(crate) struct Effects {
    pending: Vec<Effect>,
}

impl Effects {
    pub(crate) fn toast(&mut self, level: ToastLevel, message: impl Into<String>) {
        if let Some(toast) = Toast::new(level, message) {
            self.pending.push(Effect::Toast(toast));
        }
    }

    pub(crate) fn navigate(&mut self, route: Route) {
        self.pending.push(Effect::Navigate(route));
    }

    pub(crate) fn channel_verified(&mut self, kind: ChannelKind, value: Option<String>) {
        self.pending
            .push(Effect::ChannelVerified { kind, value });
    }

    pub(crate) fn take(&mut self) -> Vec<Effect> {
        std::mem::take(&mut self.pending)
    }

    pub(crate) fn clear(&mut self) {
        self.pending.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_toasts_are_dropped() {
        assert!(Toast::new(ToastLevel::Error, "  ").is_none());
        let mut effects = Effects::default();
        effects.toast(ToastLevel::Info, "");
        assert!(effects.take().is_empty());
    }

    #[test]
    fn queue_preserves_order_and_drains() {
        let mut queue = ToastQueue::new();
        assert!(queue.is_empty());

        queue.push(Toast::new(ToastLevel::Error, "Invalid OTP").unwrap());
        queue.push(Toast::new(ToastLevel::Error, "Invalid OTP").unwrap());
        queue.push(Toast::new(ToastLevel::Success, "OTP resent").unwrap());
        assert_eq!(queue.len(), 3);

        let toasts = queue.take();
        assert_eq!(toasts[0].message(), "Invalid OTP");
        assert_eq!(toasts[2].level(), ToastLevel::Success);
        assert!(queue.is_empty());
    }
}
