//! Mobile one-time code types.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Number of digits in a mobile one-time code.
pub const OTP_LENGTH: usize = 6;

/// Text typed into the OTP field.
///
/// Always holds ASCII digits only, at most [`OTP_LENGTH`] of them.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct OtpBuffer(String);

impl OtpBuffer {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a buffer from raw input: non-digits are dropped, then the
    /// result is cut to [`OTP_LENGTH`] characters.
    #[must_use]
    pub fn from_input(raw: &str) -> Self {
        Self(
            raw.chars()
                .filter(char::is_ascii_digit)
                .take(OTP_LENGTH)
                .collect(),
        )
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn clear(&mut self) {
        self.0.clear();
    }

    pub fn to_code(&self) -> Result<OtpCode, OtpLengthError> {
        OtpCode::parse(&self.0)
    }
}

// Codes are short-lived secrets; keep them out of logs.
impl fmt::Debug for OtpBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "OtpBuffer({} digits)", self.0.len())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("code must be exactly {} digits (got {len})", OTP_LENGTH)]
pub struct OtpLengthError {
    pub len: usize,
}

/// A complete six-digit code, ready to send.
#[derive(Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct OtpCode(String);

impl OtpCode {
    pub fn parse(raw: &str) -> Result<Self, OtpLengthError> {
        let digits = raw.chars().filter(char::is_ascii_digit).count();
        if digits != OTP_LENGTH || raw.chars().count() != OTP_LENGTH {
            return Err(OtpLengthError { len: digits });
        }
        Ok(Self(raw.to_string()))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for OtpCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("OtpCode([REDACTED])")
    }
}

/// Why the OTP screen was opened.
///
/// Registration and login differ only in which endpoint pair they call and
/// where the user lands afterwards. Screens opened without an explicit
/// purpose are treated as registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OtpPurpose {
    #[default]
    Registration,
    Login,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown verification type: {0}")]
pub struct UnknownPurposeError(pub String);

impl OtpPurpose {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            OtpPurpose::Registration => "registration",
            OtpPurpose::Login => "login",
        }
    }
}

impl FromStr for OtpPurpose {
    type Err = UnknownPurposeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "registration" | "register" | "signup" => Ok(OtpPurpose::Registration),
            "login" | "signin" => Ok(OtpPurpose::Login),
            other => Err(UnknownPurposeError(other.to_string())),
        }
    }
}

impl fmt::Display for OtpPurpose {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("mobile number must not be empty")]
pub struct InvalidMobileError;

/// Target number of an OTP challenge.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct MobileNumber(String);

impl MobileNumber {
    pub fn new(raw: impl Into<String>) -> Result<Self, InvalidMobileError> {
        let raw = raw.into();
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(InvalidMobileError);
        }
        Ok(Self(trimmed.to_string()))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Number with everything but the last four characters hidden, for logs
    /// and on-screen hints.
    #[must_use]
    pub fn masked(&self) -> String {
        let count = self.0.chars().count();
        let visible = count.min(4);
        let hidden = count - visible;
        let mut out = "*".repeat(hidden);
        out.extend(self.0.chars().skip(hidden));
        out
    }
}

impl TryFrom<String> for MobileNumber {
    type Error = InvalidMobileError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<MobileNumber> for String {
    fn from(value: MobileNumber) -> Self {
        value.0
    }
}

impl fmt::Debug for MobileNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "MobileNumber({})", self.masked())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn buffer_strips_non_digits() {
        assert_eq!(OtpBuffer::from_input("12a3456").as_str(), "123456");
        assert_eq!(OtpBuffer::from_input("1 2-3").as_str(), "123");
        assert_eq!(OtpBuffer::from_input("abc").as_str(), "");
    }

    #[test]
    fn buffer_truncates_to_six() {
        let buffer = OtpBuffer::from_input("123456789");
        assert_eq!(buffer.as_str(), "123456");
        assert!(buffer.to_code().is_ok());
    }

    #[test]
    fn buffer_ignores_non_ascii_digits() {
        // Arabic-Indic digits are numeric but not ASCII
        assert_eq!(OtpBuffer::from_input("١٢٣456").as_str(), "456");
    }

    #[test]
    fn buffer_invariant_holds_for_assorted_input() {
        let inputs = [
            "",
            "0",
            "000000",
            "0000000",
            "x9y8z7w6v5u4t3",
            "  12 34 56 78 ",
            "\u{0}1\u{7f}2",
        ];
        for raw in inputs {
            let buffer = OtpBuffer::from_input(raw);
            assert!(buffer.as_str().len() <= OTP_LENGTH, "{raw:?}");
            assert!(buffer.as_str().chars().all(|c| c.is_ascii_digit()), "{raw:?}");
        }
    }

    #[test]
    fn to_code_requires_six_digits() {
        assert_eq!(
            OtpBuffer::from_input("12345").to_code(),
            Err(OtpLengthError { len: 5 })
        );
        let code = OtpBuffer::from_input("000000").to_code().unwrap();
        assert_eq!(code.as_str(), "000000");
    }

    #[test]
    fn code_debug_is_redacted() {
        let code = OtpCode::parse("123456").unwrap();
        assert!(!format!("{code:?}").contains("123456"));
        let buffer = OtpBuffer::from_input("123456");
        assert!(!format!("{buffer:?}").contains("123456"));
    }

    #[test]
    fn purpose_parse() {
        assert_eq!("login".parse::<OtpPurpose>(), Ok(OtpPurpose::Login));
        assert_eq!(
            "Registration".parse::<OtpPurpose>(),
            Ok(OtpPurpose::Registration)
        );
        assert!("reset".parse::<OtpPurpose>().is_err());
    }

    #[test]
    fn purpose_serde_lowercase() {
        let json = serde_json::to_string(&OtpPurpose::Registration).unwrap();
        assert_eq!(json, "\"registration\"");
    }

    #[test]
    fn mobile_masking() {
        let mobile = MobileNumber::new(" 9876543210 ").unwrap();
        assert_eq!(mobile.as_str(), "9876543210");
        assert_eq!(mobile.masked(), "******3210");
        assert_eq!(MobileNumber::new("12").unwrap().masked(), "12");
        assert!(MobileNumber::new("  ").is_err());
    }
}
