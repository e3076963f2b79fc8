//! Error types for scan-relay input validation.

use thiserror::Error;

/// A raw input was refused.
///
/// Carries no detail about which rule failed so that error text cannot be
/// used to probe the accepted formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// The session identifier is malformed.
    #[error("invalid session")]
    InvalidSession,

    /// The code is malformed.
    #[error("invalid code")]
    InvalidCode,
}

/// The system random source could not produce a session key.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("random source unavailable: {reason}")]
pub struct KeyGenError {
    reason: String,
}

impl From<getrandom::Error> for KeyGenError {
    fn from(e: getrandom::Error) -> Self {
        Self {
            reason: e.to_string(),
        }
    }
}
