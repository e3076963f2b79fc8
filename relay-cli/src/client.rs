//! HTTP client for the relay endpoints.

use relay_types::{Code, Reply, SessionKey};
use reqwest::StatusCode;
use std::time::Duration;
use thiserror::Error;

/// Per-request timeout. Pulls are short; long waits are client-side polling.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Errors talking to the relay.
#[derive(Debug, Error)]
pub enum ClientError {
    /// Transport failure (connect, timeout, body read).
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The relay answered with `ERR <reason>`.
    #[error("relay refused request ({status}): {reason}")]
    Refused {
        /// HTTP status of the refusal.
        status: StatusCode,
        /// Reason text from the body.
        reason: String,
    },

    /// The body was not a reply this endpoint can produce.
    #[error("unexpected response ({status}): {body:?}")]
    Unexpected {
        /// HTTP status.
        status: StatusCode,
        /// Raw body.
        body: String,
    },
}

impl ClientError {
    /// Whether the relay throttled this request.
    pub fn is_rate_limited(&self) -> bool {
        matches!(self, Self::Refused { status, .. } if *status == StatusCode::TOO_MANY_REQUESTS)
    }
}

/// Client for one relay base URL.
pub struct RelayClient {
    http: reqwest::Client,
    base: String,
}

impl RelayClient {
    /// Create a client for `base` (e.g. `http://127.0.0.1:8080`).
    pub fn new(base: &str) -> Result<Self, ClientError> {
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()?;
        Ok(Self {
            http,
            base: base.trim_end_matches('/').to_string(),
        })
    }

    /// Store `code` under `session`.
    pub async fn submit(&self, session: &SessionKey, code: &Code) -> Result<Reply, ClientError> {
        let response = self
            .http
            .post(self.url("submit"))
            .form(&[("session", session.as_str()), ("code", code.as_str())])
            .send()
            .await?;
        read_reply(response, Reply::parse_submit).await
    }

    /// Ask for the code under `session`, consuming it when `ack` is set.
    pub async fn pull(&self, session: &SessionKey, ack: bool) -> Result<Reply, ClientError> {
        let ack = if ack { "1" } else { "0" };
        let response = self
            .http
            .get(self.url("pull"))
            .query(&[("session", session.as_str()), ("ack", ack)])
            .send()
            .await?;
        read_reply(response, Reply::parse_pull).await
    }

    /// Resolve a scanned id to a display name.
    pub async fn lookup(&self, code: &str) -> Result<Reply, ClientError> {
        let response = self
            .http
            .get(self.url("lookup"))
            .query(&[("code", code)])
            .send()
            .await?;
        read_reply(response, Reply::parse_lookup).await
    }

    fn url(&self, endpoint: &str) -> String {
        format!("{}/{}", self.base, endpoint)
    }
}

async fn read_reply(
    response: reqwest::Response,
    parse: fn(&str) -> Option<Reply>,
) -> Result<Reply, ClientError> {
    let status = response.status();
    let body = response.text().await?;
    interpret(status, &body, parse)
}

/// Turn a status and body into a reply, surfacing refusals as errors.
fn interpret(
    status: StatusCode,
    body: &str,
    parse: fn(&str) -> Option<Reply>,
) -> Result<Reply, ClientError> {
    match parse(body) {
        Some(Reply::Error(reason)) => Err(ClientError::Refused { status, reason }),
        Some(reply) if status.is_success() => Ok(reply),
        _ => Err(ClientError::Unexpected {
            status,
            body: body.to_string(),
        }),
    }
}
