//! Phone number normalization and validation.
//!
//! Numbering-plan rule: after stripping every non-digit character, a
//! number is valid iff it starts with `010` and has exactly 11 digits,
//! or starts with one of `011`, `016`, `017`, `018`, `019` and has 10
//! or 11 digits.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

const LEGACY_PREFIXES: [&str; 5] = ["011", "016", "017", "018", "019"];

/// A validated, normalized (digits-only) phone number.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PhoneNumber(String);

impl PhoneNumber {
    /// Normalize and validate raw input.
    pub fn parse(raw: &str) -> Result<Self> {
        let digits = normalize(raw);
        if is_valid(&digits) {
            Ok(Self(digits))
        } else {
            Err(Error::Validation(format!(
                "not a valid phone number: {} digits",
                digits.len()
            )))
        }
    }

    /// The normalized digit string.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Hyphenated display form (3-4-4 for 11 digits, 3-3-4 for 10).
    pub fn formatted(&self) -> String {
        let s = &self.0;
        match s.len() {
            11 => format!("{}-{}-{}", &s[..3], &s[3..7], &s[7..]),
            10 => format!("{}-{}-{}", &s[..3], &s[3..6], &s[6..]),
            _ => s.clone(),
        }
    }
}

impl fmt::Display for PhoneNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Strip everything but ASCII digits.
pub fn normalize(raw: &str) -> String {
    raw.chars().filter(|c| c.is_ascii_digit()).collect()
}

/// Check a normalized digit string against the numbering plan.
pub fn is_valid(digits: &str) -> bool {
    if digits.starts_with("010") {
        return digits.len() == 11;
    }
    LEGACY_PREFIXES.iter().any(|p| digits.starts_with(p))
        && (digits.len() == 10 || digits.len() == 11)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_strips_non_digits() {
        assert_eq!(normalize("010-1234-5678"), "01012345678");
        assert_eq!(normalize(" 010 1234 5678 "), "01012345678");
        assert_eq!(normalize("(010)1234.5678"), "01012345678");
    }

    #[test]
    fn test_mobile_prefix_requires_11_digits() {
        assert!(is_valid("01012345678"));
        assert!(!is_valid("0101234567")); // 10 digits
        assert!(!is_valid("010123456789")); // 12 digits
    }

    #[test]
    fn test_legacy_prefixes_allow_10_or_11() {
        assert!(is_valid("0111234567"));
        assert!(is_valid("01112345678"));
        assert!(is_valid("0191234567"));
        assert!(!is_valid("011123456")); // 9 digits
    }

    #[test]
    fn test_unknown_prefix_rejected() {
        assert!(!is_valid("02012345678"));
        assert!(!is_valid("01512345678"));
        assert!(!is_valid(""));
    }

    #[test]
    fn test_parse_roundtrip() {
        let phone = PhoneNumber::parse("010-1234-5678").expect("should parse");
        assert_eq!(phone.as_str(), "01012345678");
        assert_eq!(phone.formatted(), "010-1234-5678");

        let legacy = PhoneNumber::parse("0111234567").expect("should parse");
        assert_eq!(legacy.formatted(), "011-123-4567");

        assert!(PhoneNumber::parse("02012345678").is_err());
        assert!(PhoneNumber::parse("hello").is_err());
    }
}
