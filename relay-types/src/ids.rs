//! Session and code identifiers for the pairing handshake.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::{KeyGenError, ValidationError};

/// Shortest accepted session identifier.
const SESSION_MIN_LEN: usize = 16;
/// Longest accepted session identifier.
const SESSION_MAX_LEN: usize = 64;
/// Shortest accepted code.
const CODE_MIN_LEN: usize = 6;
/// Longest accepted code.
const CODE_MAX_LEN: usize = 20;

/// Shared secret correlating a submitted code with the poller waiting for it.
///
/// 16 to 64 characters from `[A-Za-z0-9_-]`. The `Debug` output only shows
/// the first 8 characters so keys can be logged without leaking them.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct SessionKey(String);

impl SessionKey {
    /// Validate a raw session identifier.
    ///
    /// The whole string must match `^[A-Za-z0-9_-]{16,64}$`; nothing is
    /// trimmed or rewritten.
    pub fn parse(raw: &str) -> Result<Self, ValidationError> {
        let len_ok = (SESSION_MIN_LEN..=SESSION_MAX_LEN).contains(&raw.len());
        let chars_ok = raw
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'_' || b == b'-');

        if len_ok && chars_ok {
            Ok(Self(raw.to_owned()))
        } else {
            Err(ValidationError::InvalidSession)
        }
    }

    /// Create a fresh random session identifier.
    ///
    /// 32 random bytes as URL-safe base64 without padding (43 characters).
    /// Only scanning clients mint keys; the relay never does.
    pub fn generate() -> Result<Self, KeyGenError> {
        let mut bytes = [0u8; 32];
        getrandom::getrandom(&mut bytes)?;
        Ok(Self(URL_SAFE_NO_PAD.encode(bytes)))
    }

    /// Get the identifier as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for SessionKey {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for SessionKey {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<SessionKey> for String {
    fn from(key: SessionKey) -> Self {
        key.0
    }
}

impl fmt::Display for SessionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Debug for SessionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SessionKey({}…)", &self.0[..8])
    }
}

/// The short numeric payload being relayed.
///
/// 6 to 20 ASCII digits. Any other character anywhere is a hard rejection;
/// separators are never stripped.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Code(String);

impl Code {
    /// Validate a raw code against `^[0-9]{6,20}$`.
    pub fn parse(raw: &str) -> Result<Self, ValidationError> {
        let len_ok = (CODE_MIN_LEN..=CODE_MAX_LEN).contains(&raw.len());

        if len_ok && raw.bytes().all(|b| b.is_ascii_digit()) {
            Ok(Self(raw.to_owned()))
        } else {
            Err(ValidationError::InvalidCode)
        }
    }

    /// Get the digits as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for Code {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for Code {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<Code> for String {
    fn from(code: Code) -> Self {
        code.0
    }
}

impl fmt::Display for Code {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Debug for Code {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Code({} digits)", self.0.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn session_key_accepts_alphanumeric_16() {
        let key = SessionKey::parse("abcEFGH12345678x").unwrap();
        assert_eq!(key.as_str(), "abcEFGH12345678x");
    }

    #[test]
    fn session_key_rejects_fifteen_alphanumerics() {
        let raw = "abcEFGH12345678";
        assert_eq!(raw.len(), 15);
        assert_eq!(SessionKey::parse(raw), Err(ValidationError::InvalidSession));
    }

    #[test]
    fn session_key_accepts_underscore_and_dash() {
        assert!(SessionKey::parse("scan_session-0001").is_ok());
    }

    #[test]
    fn session_key_length_bounds() {
        assert!(SessionKey::parse(&"a".repeat(15)).is_err());
        assert!(SessionKey::parse(&"a".repeat(16)).is_ok());
        assert!(SessionKey::parse(&"a".repeat(64)).is_ok());
        assert!(SessionKey::parse(&"a".repeat(65)).is_err());
    }

    #[test]
    fn session_key_rejects_short() {
        assert_eq!(
            SessionKey::parse("short"),
            Err(ValidationError::InvalidSession)
        );
    }

    #[test]
    fn session_key_is_not_trimmed() {
        assert!(SessionKey::parse(" s1234567890123456").is_err());
        assert!(SessionKey::parse("s1234567890123456\n").is_err());
    }

    #[test]
    fn session_key_rejects_path_characters() {
        assert!(SessionKey::parse("../../etc/passwd00").is_err());
        assert!(SessionKey::parse("s1234567890123456.txt").is_err());
    }

    #[test]
    fn session_key_rejects_non_ascii() {
        // 16 chars, but 'é' is not in the allowed alphabet
        assert!(SessionKey::parse("s123456789012345é").is_err());
    }

    #[test]
    fn generated_session_key_is_valid() {
        let key = SessionKey::generate().unwrap();
        assert_eq!(key.as_str().len(), 43);
        assert!(SessionKey::parse(key.as_str()).is_ok());
    }

    #[test]
    fn generated_session_keys_differ() {
        let a = SessionKey::generate().unwrap();
        let b = SessionKey::generate().unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn session_key_debug_is_redacted() {
        let key = SessionKey::parse("s1234567890123456").unwrap();
        let debug = format!("{:?}", key);
        assert_eq!(debug, "SessionKey(s1234567…)");
        assert!(!debug.contains("890123456"));
    }

    #[test]
    fn code_accepts_digits() {
        assert_eq!(Code::parse("482913").unwrap().as_str(), "482913");
        assert!(Code::parse(&"9".repeat(20)).is_ok());
    }

    #[test]
    fn code_length_bounds() {
        assert!(Code::parse("12345").is_err());
        assert!(Code::parse("123456").is_ok());
        assert!(Code::parse(&"1".repeat(21)).is_err());
    }

    #[test]
    fn code_rejects_separators() {
        assert_eq!(Code::parse("123-456"), Err(ValidationError::InvalidCode));
        assert!(Code::parse("12a3456").is_err());
        assert!(Code::parse("123 456").is_err());
        assert!(Code::parse(" 123456").is_err());
    }

    #[test]
    fn code_rejects_unicode_digits() {
        // Arabic-Indic digits are digits, but not ASCII ones
        assert!(Code::parse("١٢٣٤٥٦").is_err());
    }

    #[test]
    fn code_debug_hides_digits() {
        let code = Code::parse("482913").unwrap();
        assert_eq!(format!("{:?}", code), "Code(6 digits)");
    }

    #[test]
    fn serde_validates_on_deserialize() {
        let key: SessionKey = serde_json::from_str("\"s1234567890123456\"").unwrap();
        assert_eq!(key.as_str(), "s1234567890123456");

        assert!(serde_json::from_str::<SessionKey>("\"short\"").is_err());
        assert!(serde_json::from_str::<Code>("\"12a3456\"").is_err());
    }

    #[test]
    fn serde_serializes_as_plain_string() {
        let code = Code::parse("482913").unwrap();
        assert_eq!(serde_json::to_string(&code).unwrap(), "\"482913\"");
    }
}
