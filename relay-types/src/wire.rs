//! Plain-text response vocabulary.
//!
//! Every relay response body is a single line:
//!
//! ```text
//! OK <code>     submit accepted (echo) / pull delivered
//! OK            submit accepted (no echo)
//! WAIT          pull: nothing to deliver yet
//! OK <name>     lookup hit
//! NO            lookup miss
//! ERR <reason>  request refused
//! ```
//!
//! `OK` is overloaded between endpoints, so parsing is per endpoint.

use std::fmt;

use crate::Code;

const OK: &str = "OK";
const WAIT: &str = "WAIT";
const NO: &str = "NO";
const ERR: &str = "ERR";

/// A response body from the relay.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    /// Submit accepted, optionally echoing the stored code.
    Accepted(Option<Code>),
    /// Pull found a code.
    Delivered(Code),
    /// Pull found nothing (yet).
    Wait,
    /// Lookup matched a display name.
    Name(String),
    /// Lookup matched nothing.
    NoMatch,
    /// Request refused, with a generic reason.
    Error(String),
}

impl Reply {
    /// Parse a submit response body.
    pub fn parse_submit(body: &str) -> Option<Self> {
        let body = body.trim();
        if body == OK {
            return Some(Self::Accepted(None));
        }
        if let Some(rest) = body.strip_prefix("OK ") {
            return Code::parse(rest).ok().map(|c| Self::Accepted(Some(c)));
        }
        Self::parse_error(body)
    }

    /// Parse a pull response body.
    pub fn parse_pull(body: &str) -> Option<Self> {
        let body = body.trim();
        if body == WAIT {
            return Some(Self::Wait);
        }
        if let Some(rest) = body.strip_prefix("OK ") {
            return Code::parse(rest).ok().map(Self::Delivered);
        }
        Self::parse_error(body)
    }

    /// Parse a lookup response body.
    pub fn parse_lookup(body: &str) -> Option<Self> {
        let body = body.trim();
        if body == NO {
            return Some(Self::NoMatch);
        }
        if let Some(rest) = body.strip_prefix("OK ") {
            return Some(Self::Name(rest.to_owned()));
        }
        Self::parse_error(body)
    }

    fn parse_error(body: &str) -> Option<Self> {
        body.strip_prefix("ERR ")
            .map(|reason| Self::Error(reason.to_owned()))
    }
}

impl fmt::Display for Reply {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Accepted(None) => f.write_str(OK),
            Self::Accepted(Some(code)) | Self::Delivered(code) => write!(f, "{OK} {code}"),
            Self::Wait => f.write_str(WAIT),
            Self::Name(name) => write!(f, "{OK} {name}"),
            Self::NoMatch => f.write_str(NO),
            Self::Error(reason) => write!(f, "{ERR} {reason}"),
        }
    }
}

/// Keep only ASCII digits.
///
/// Used by the read-only name lookup, which matches ids regardless of
/// formatting. The relay itself never normalizes codes this way.
pub fn digits_only(raw: &str) -> String {
    raw.chars().filter(char::is_ascii_digit).collect()
}
