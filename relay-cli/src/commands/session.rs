//! Generate a session key.

use anyhow::{Context, Result};
use relay_types::SessionKey;

/// Run the session command.
pub fn run() -> Result<()> {
    let key = SessionKey::generate().context("Failed to gather randomness for session key")?;
    println!("{key}");
    Ok(())
}
