//! Submit a scanned code.

use anyhow::{Context, Result};
use relay_types::{Code, Reply, SessionKey};

use crate::client::RelayClient;

/// Run the submit command.
///
/// Both values are checked locally first so a typo never leaves the device.
pub async fn run(client: &RelayClient, session: &str, code: &str) -> Result<()> {
    let session = SessionKey::parse(session).context("Session key is not valid")?;
    let code = Code::parse(code).context("Code must be 6-20 digits")?;

    match client
        .submit(&session, &code)
        .await
        .context("Failed to submit code")?
    {
        Reply::Accepted(Some(echoed)) if echoed != code => {
            anyhow::bail!("Relay stored {echoed}, expected {code}")
        }
        Reply::Accepted(_) => println!("Submitted {code}"),
        other => anyhow::bail!("Unexpected reply: {other}"),
    }

    Ok(())
}
