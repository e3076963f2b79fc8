//! CLI command implementations.

pub mod lookup;
pub mod pull;
pub mod session;
pub mod submit;
