//! Guard for actions that need a proven identity channel.
//!
//! The gate is pure: it reads the status it is handed and never caches a
//! decision, so calling it repeatedly before the user resolves a channel is
//! always safe.

use std::collections::{BTreeMap, BTreeSet};

use shopfront_types::{ChannelKind, ChannelState, Route, VerificationStatus};

/// Why a protected action was blocked, computed fresh on every evaluation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GateContext {
    required_channels: BTreeSet<ChannelKind>,
    statuses: BTreeMap<ChannelKind, ChannelState>,
}

impl GateContext {
    fn from_status(status: &VerificationStatus) -> Self {
        let statuses: BTreeMap<_, _> = ChannelKind::ALL
            .iter()
            .map(|kind| (*kind, status.state(*kind)))
            .collect();
        let required_channels = statuses
            .iter()
            .filter(|(_, state)| !state.is_verified())
            .map(|(kind, _)| *kind)
            .collect();
        Self {
            required_channels,
            statuses,
        }
    }

    /// Channels that are absent or unverified.
    #[must_use]
    pub fn required_channels(&self) -> &BTreeSet<ChannelKind> {
        &self.required_channels
    }

    #[must_use]
    pub fn statuses(&self) -> &BTreeMap<ChannelKind, ChannelState> {
        &self.statuses
    }

    /// One line per channel still to resolve, e.g. `Email address: not added`.
    #[must_use]
    pub fn describe(&self) -> Vec<String> {
        self.required_channels
            .iter()
            .map(|kind| {
                let state = match self.statuses.get(kind) {
                    Some(ChannelState::Unverified) => "not verified",
                    Some(ChannelState::Verified) => "verified",
                    Some(ChannelState::Absent) | None => "not added",
                };
                format!("{}: {state}", kind.display_name())
            })
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateDecision {
    Proceed,
    Blocked(GateContext),
}

pub struct VerificationGate;

impl VerificationGate {
    /// Where the user resolves a channel after confirming the prompt.
    pub const RESOLVE_ROUTE: Route = Route::Profile;

    /// At least one channel is verified.
    #[must_use]
    pub fn can_proceed(status: &VerificationStatus) -> bool {
        status.any_verified()
    }

    #[must_use]
    pub fn evaluate(status: &VerificationStatus) -> GateDecision {
        if Self::can_proceed(status) {
            GateDecision::Proceed
        } else {
            GateDecision::Blocked(GateContext::from_status(status))
        }
    }

    /// Run `action` if the gate is open; otherwise hand back what blocked it.
    pub fn guard<T>(
        status: &VerificationStatus,
        action: impl FnOnce() -> T,
    ) -> Result<T, GateContext> {
        match Self::evaluate(status) {
            GateDecision::Proceed => Ok(action()),
            GateDecision::Blocked(context) => Err(context),
        }
    }
}
