//! Look up a display name.

use anyhow::{Context, Result};
use relay_types::Reply;

use crate::client::RelayClient;

/// Run the lookup command.
pub async fn run(client: &RelayClient, code: &str) -> Result<()> {
    match client.lookup(code).await.context("Failed to look up id")? {
        Reply::Name(name) => println!("{name}"),
        Reply::NoMatch => anyhow::bail!("No name found for {code}"),
        other => anyhow::bail!("Unexpected reply: {other}"),
    }
    Ok(())
}
