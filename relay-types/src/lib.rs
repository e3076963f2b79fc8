//! # relay-types
//!
//! Types shared by the scan-relay server and its clients.
//!
//! - [`SessionKey`], [`Code`] - validated identifiers for the pairing handshake
//! - [`Reply`] - the plain-text response vocabulary spoken over HTTP
//! - [`ValidationError`] - why a raw string was refused (deliberately vague)
//! - [`KeyGenError`] - the random source failed while minting a key

#![warn(missing_docs)]
#![warn(clippy::all)]

mod error;
mod ids;
mod wire;

pub use error::{KeyGenError, ValidationError};
pub use ids::{Code, SessionKey};
pub use wire::{digits_only, Reply};
