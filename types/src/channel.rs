//! Per-channel verification state.
//!
//! A channel moves `absent -> unverified -> verified` and never regresses.
//! The only way to change a channel's state is through the transition
//! methods below, which reject backwards moves.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Identity proof mechanism.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChannelKind {
    Mobile,
    Email,
}

impl ChannelKind {
    pub const ALL: [ChannelKind; 2] = [ChannelKind::Mobile, ChannelKind::Email];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            ChannelKind::Mobile => "mobile",
            ChannelKind::Email => "email",
        }
    }

    #[must_use]
    pub const fn display_name(self) -> &'static str {
        match self {
            ChannelKind::Mobile => "Mobile number",
            ChannelKind::Email => "Email address",
        }
    }
}

impl fmt::Display for ChannelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChannelState {
    /// Not registered on the profile.
    #[default]
    Absent,
    /// Registered but not confirmed.
    Unverified,
    /// Terminal.
    Verified,
}

impl ChannelState {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            ChannelState::Absent => "absent",
            ChannelState::Unverified => "unverified",
            ChannelState::Verified => "verified",
        }
    }

    #[must_use]
    pub const fn is_verified(self) -> bool {
        matches!(self, ChannelState::Verified)
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "absent" | "none" | "missing" => Some(ChannelState::Absent),
            "unverified" | "pending" => Some(ChannelState::Unverified),
            "verified" => Some(ChannelState::Verified),
            _ => None,
        }
    }
}

impl fmt::Display for ChannelState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ChannelTransitionError {
    #[error("{kind} channel is not registered")]
    NotRegistered { kind: ChannelKind },
    #[error("{kind} channel is already verified")]
    AlreadyVerified { kind: ChannelKind },
    #[error("{kind} channel value must not be empty")]
    EmptyValue { kind: ChannelKind },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerificationChannel {
    kind: ChannelKind,
    value: String,
    state: ChannelState,
}

impl VerificationChannel {
    #[must_use]
    pub fn absent(kind: ChannelKind) -> Self {
        Self {
            kind,
            value: String::new(),
            state: ChannelState::Absent,
        }
    }

    #[must_use]
    pub fn kind(&self) -> ChannelKind {
        self.kind
    }

    #[must_use]
    pub fn value(&self) -> &str {
        &self.value
    }

    #[must_use]
    pub fn state(&self) -> ChannelState {
        self.state
    }

    /// `absent -> unverified`. Re-registering an unverified channel replaces
    /// its value; a verified channel cannot be re-registered.
    pub fn register(&mut self, value: impl Into<String>) -> Result<(), ChannelTransitionError> {
        let value = value.into();
        if value.trim().is_empty() {
            return Err(ChannelTransitionError::EmptyValue { kind: self.kind });
        }
        match self.state {
            ChannelState::Verified => {
                Err(ChannelTransitionError::AlreadyVerified { kind: self.kind })
            }
            ChannelState::Absent | ChannelState::Unverified => {
                self.value = value.trim().to_string();
                self.state = ChannelState::Unverified;
                Ok(())
            }
        }
    }

    /// `unverified -> verified`. Idempotent once verified.
    pub fn mark_verified(&mut self) -> Result<(), ChannelTransitionError> {
        match self.state {
            ChannelState::Absent => Err(ChannelTransitionError::NotRegistered { kind: self.kind }),
            ChannelState::Unverified | ChannelState::Verified => {
                self.state = ChannelState::Verified;
                Ok(())
            }
        }
    }
}

/// Verification state of every channel on a customer profile.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerificationStatus {
    mobile: VerificationChannel,
    email: VerificationChannel,
}

impl Default for VerificationStatus {
    fn default() -> Self {
        Self {
            mobile: VerificationChannel::absent(ChannelKind::Mobile),
            email: VerificationChannel::absent(ChannelKind::Email),
        }
    }
}

impl VerificationStatus {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn channel(&self, kind: ChannelKind) -> &VerificationChannel {
        match kind {
            ChannelKind::Mobile => &self.mobile,
            ChannelKind::Email => &self.email,
        }
    }

    pub fn channel_mut(&mut self, kind: ChannelKind) -> &mut VerificationChannel {
        match kind {
            ChannelKind::Mobile => &mut self.mobile,
            ChannelKind::Email => &mut self.email,
        }
    }

    #[must_use]
    pub fn state(&self, kind: ChannelKind) -> ChannelState {
        self.channel(kind).state()
    }

    #[must_use]
    pub fn any_verified(&self) -> bool {
        ChannelKind::ALL
            .iter()
            .any(|kind| self.state(*kind).is_verified())
    }
}
