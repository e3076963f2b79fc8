//! Pull a code, optionally polling until it arrives.

use anyhow::{Context, Result};
use relay_types::{Code, Reply, SessionKey};
use std::time::Duration;
use tokio::time::Instant;

use crate::client::{ClientError, RelayClient};

/// Longest delay between polls while the relay keeps answering 429.
const MAX_BACKOFF: Duration = Duration::from_secs(30);

/// How to pull.
#[derive(Debug, Clone)]
pub struct PullOptions {
    /// Consume the code on delivery.
    pub ack: bool,
    /// Poll until delivered or `timeout`.
    pub wait: bool,
    /// Delay between polls.
    pub interval: Duration,
    /// Overall polling deadline.
    pub timeout: Duration,
}

/// Run the pull command.
///
/// Prints the code on delivery. Without `--wait`, an empty session prints
/// `WAIT`.
pub async fn run(client: &RelayClient, session: &str, options: &PullOptions) -> Result<()> {
    let session = SessionKey::parse(session).context("Session key is not valid")?;

    match poll(client, &session, options).await? {
        Some(code) => println!("{code}"),
        None if options.wait => anyhow::bail!(
            "No code arrived within {}s",
            options.timeout.as_secs()
        ),
        None => println!("WAIT"),
    }
    Ok(())
}

async fn poll(
    client: &RelayClient,
    session: &SessionKey,
    options: &PullOptions,
) -> Result<Option<Code>> {
    // None when the timeout is too large to represent: wait indefinitely
    let deadline = Instant::now().checked_add(options.timeout);
    let mut delay = options.interval;

    loop {
        let throttled = match client.pull(session, options.ack).await {
            Ok(Reply::Delivered(code)) => return Ok(Some(code)),
            Ok(Reply::Wait) => false,
            Ok(other) => anyhow::bail!("Unexpected reply: {other}"),
            Err(e) if options.wait && e.is_rate_limited() => true,
            Err(e) => return Err(pull_error(e)),
        };

        if !options.wait {
            return Ok(None);
        }

        delay = next_delay(delay, options.interval, throttled);
        if !wakes_before(deadline, delay) {
            return Ok(None);
        }
        tokio::time::sleep(delay).await;
    }
}

/// Double the delay after each 429, up to [`MAX_BACKOFF`]; otherwise poll at
/// the configured interval.
fn next_delay(current: Duration, interval: Duration, throttled: bool) -> Duration {
    if throttled {
        current.saturating_mul(2).min(MAX_BACKOFF.max(interval))
    } else {
        interval
    }
}

fn wakes_before(deadline: Option<Instant>, delay: Duration) -> bool {
    match deadline {
        None => true,
        Some(deadline) => Instant::now()
            .checked_add(delay)
            .is_some_and(|wake| wake <= deadline),
    }
}

fn pull_error(e: ClientError) -> anyhow::Error {
    anyhow::Error::new(e).context("Failed to pull code")
}
