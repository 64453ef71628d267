//! Teletext page identities.
//!
//! A page identity is the five-character token `mppss` used by the XTP620
//! `P` command:
//!
//! - `m`: magazine, `1`-`8`
//! - `pp`: page number, two hex digits
//! - `ss`: subpage, two decimal digits
//!
//! Any position may be the wildcard `*`. Trailing characters may be omitted
//! and default to `0`, so `P1*` selects `1*000` and `P12` selects `12000`.

use std::fmt;
use std::str::FromStr;

/// Number of characters in a canonical page identity.
pub const PAGE_ID_LEN: usize = 5;

/// The wildcard character, accepted in every position.
pub const WILDCARD: u8 = b'*';

/// Character class expected at one position of a page identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DigitClass {
    Magazine,
    Hex,
    Decimal,
}

/// Per-position classes for `mppss`.
const LAYOUT: [DigitClass; PAGE_ID_LEN] = [
    DigitClass::Magazine,
    DigitClass::Hex,
    DigitClass::Hex,
    DigitClass::Decimal,
    DigitClass::Decimal,
];

impl DigitClass {
    fn accepts(self, byte: u8) -> bool {
        if byte == WILDCARD {
            return true;
        }
        match self {
            DigitClass::Magazine => (b'1'..=b'8').contains(&byte),
            DigitClass::Hex => byte.is_ascii_hexdigit(),
            DigitClass::Decimal => byte.is_ascii_digit(),
        }
    }

    fn describe(self) -> &'static str {
        match self {
            DigitClass::Magazine => "magazine digit (1-8)",
            DigitClass::Hex => "page digit (0-9, a-f)",
            DigitClass::Decimal => "subpage digit (0-9)",
        }
    }
}

/// Error returned when a page identity fails validation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid page identity: byte {byte:#04x} at position {position} is not a {expected}")]
pub struct PageIdError {
    /// Zero-based position of the offending character.
    pub position: usize,
    /// The byte found there (a defaulted `0` when the source was too short).
    pub byte: u8,
    /// Human-readable description of what the position accepts.
    pub expected: &'static str,
}

/// A validated, fully expanded page identity.
///
/// Always exactly [`PAGE_ID_LEN`] bytes, each either a valid digit for its
/// position or [`WILDCARD`]. Hex letter case is kept as supplied.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct PageId([u8; PAGE_ID_LEN]);

impl PageId {
    /// Validate and normalize a page identity.
    ///
    /// At most [`PAGE_ID_LEN`] bytes of `src` are examined; anything after
    /// the fifth byte is ignored. Missing trailing bytes are defaulted to
    /// `'0'`, which means an empty source fails on the magazine position.
    ///
    /// ```
    /// use vbit_core::PageId;
    ///
    /// assert_eq!(PageId::validate(b"1*").unwrap().as_str(), "1*000");
    /// assert_eq!(PageId::validate(b"12").unwrap().as_str(), "12000");
    /// assert!(PageId::validate(b"z1234").is_err());
    /// ```
    pub fn validate(src: &[u8]) -> Result<Self, PageIdError> {
        let mut digits = [b'0'; PAGE_ID_LEN];

        for (position, (slot, class)) in digits.iter_mut().zip(LAYOUT).enumerate() {
            let byte = src.get(position).copied().unwrap_or(b'0');
            if !class.accepts(byte) {
                return Err(PageIdError {
                    position,
                    byte,
                    expected: class.describe(),
                });
            }
            *slot = byte;
        }

        Ok(PageId(digits))
    }

    /// The canonical five-character form.
    pub fn as_str(&self) -> &str {
        // Every stored byte passed an ASCII class check.
        std::str::from_utf8(&self.0).unwrap_or_default()
    }

    /// The canonical form as raw bytes.
    pub fn as_bytes(&self) -> &[u8; PAGE_ID_LEN] {
        &self.0
    }

    /// Whether any position is the wildcard.
    pub fn has_wildcard(&self) -> bool {
        self.0.contains(&WILDCARD)
    }
}

impl FromStr for PageId {
    type Err = PageIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        PageId::validate(s.as_bytes())
    }
}

impl fmt::Display for PageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Debug for PageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PageId({})", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn expand(src: &str) -> String {
        PageId::validate(src.as_bytes())
            .map(|id| id.to_string())
            .unwrap_or_else(|e| panic!("{src:?} should validate: {e}"))
    }

    // ---------------------------------------------------------------
    // Defaulting and wildcards
    // ---------------------------------------------------------------

    #[test]
    fn wildcard_page_is_padded() {
        assert_eq!(expand("1*"), "1*000");
    }

    #[test]
    fn short_identity_is_padded_with_zeros() {
        assert_eq!(expand("12"), "12000");
        assert_eq!(expand("1"), "10000");
        assert_eq!(expand("8ff"), "8ff00");
        assert_eq!(expand("1234"), "12340");
    }

    #[test]
    fn full_identity_is_unchanged() {
        assert_eq!(expand("12345"), "12345");
        assert_eq!(expand("8FF99"), "8FF99");
    }

    #[test]
    fn wildcards_are_kept_in_every_position() {
        assert_eq!(expand("*****"), "*****");
        assert_eq!(expand("1a*9*"), "1a*9*");
        assert_eq!(expand("*"), "*0000");
    }

    #[test]
    fn every_valid_prefix_pads_to_five() {
        let full = "3c*47";
        for k in 1..=PAGE_ID_LEN {
            let prefix = &full[..k];
            let expected = format!("{prefix:0<5}");
            assert_eq!(expand(prefix), expected, "prefix {prefix:?}");
        }
    }

    #[test]
    fn bytes_after_the_fifth_are_ignored() {
        assert_eq!(expand("123456"), "12345");
    }

    #[test]
    fn hex_case_is_preserved() {
        assert_eq!(expand("1aB"), "1aB00");
    }

    // ---------------------------------------------------------------
    // Rejections
    // ---------------------------------------------------------------

    #[test]
    fn invalid_magazine_is_rejected() {
        let err = PageId::validate(b"z1234").unwrap_err();
        assert_eq!(err.position, 0);
        assert_eq!(err.byte, b'z');

        assert!(PageId::validate(b"9").is_err());
        assert!(PageId::validate(b"0").is_err());
    }

    #[test]
    fn empty_source_fails_on_defaulted_magazine() {
        let err = PageId::validate(b"").unwrap_err();
        assert_eq!(err.position, 0);
        assert_eq!(err.byte, b'0');
    }

    #[test]
    fn non_hex_page_digit_is_rejected() {
        let err = PageId::validate(b"1g").unwrap_err();
        assert_eq!(err.position, 1);
    }

    #[test]
    fn letter_in_subpage_is_rejected() {
        let err = PageId::validate(b"100a").unwrap_err();
        assert_eq!(err.position, 3);
        assert!(PageId::validate(b"1000f").is_err());
    }

    #[test]
    fn nul_byte_is_rejected() {
        assert!(PageId::validate(b"1\x00").is_err());
    }

    #[test]
    fn whitespace_is_rejected() {
        assert!(PageId::validate(b" 100").is_err());
    }

    // ---------------------------------------------------------------
    // Conversions
    // ---------------------------------------------------------------

    #[test]
    fn from_str_matches_validate() {
        let id: PageId = "4".parse().unwrap();
        assert_eq!(id.as_bytes(), b"40000");
        assert!("9".parse::<PageId>().is_err());
    }

    #[test]
    fn has_wildcard() {
        assert!(expand("1*").parse::<PageId>().unwrap().has_wildcard());
        assert!(!"100".parse::<PageId>().unwrap().has_wildcard());
    }

    #[test]
    fn error_message_names_position() {
        let err = PageId::validate(b"9").unwrap_err();
        assert_eq!(
            err.to_string(),
            "invalid page identity: byte 0x39 at position 0 is not a magazine digit (1-8)"
        );
    }

    #[test]
    fn debug_shows_canonical_form() {
        let id: PageId = "2".parse().unwrap();
        assert_eq!(format!("{id:?}"), "PageId(20000)");
    }
}
