//! Submit, pull and lookup handlers.
//!
//! Every response is `text/plain` and uncacheable. Malformed sessions and
//! malformed codes produce the same body so a client cannot tell which field
//! was wrong, and a pull body never carries anything but the code itself.

use crate::error::RelayError;
use crate::server::CodeRelay;
use crate::service::PullOutcome;
use axum::extract::rejection::{FormRejection, QueryRejection};
use axum::extract::{ConnectInfo, Form, Query};
use axum::http::header::{CACHE_CONTROL, CONTENT_TYPE, EXPIRES, PRAGMA};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Extension;
use relay_types::Reply;
use serde::Deserialize;
use std::net::SocketAddr;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use thiserror::Error;

/// Errors as a client sees them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ApiError {
    /// Malformed session, code, or request.
    #[error("invalid request")]
    InvalidInput,
    /// The code could not be stored.
    #[error("storage")]
    StorageWrite,
    /// The store could not be read.
    #[error("storage")]
    StorageRead,
    /// Too many requests.
    #[error("rate limited")]
    RateLimited,
}

impl From<RelayError> for ApiError {
    fn from(e: RelayError) -> Self {
        match e {
            RelayError::InvalidSession | RelayError::InvalidCode => Self::InvalidInput,
            RelayError::WriteFailed(_) => Self::StorageWrite,
            RelayError::StorageUnavailable(_) => Self::StorageRead,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match self {
            Self::InvalidInput => StatusCode::BAD_REQUEST,
            Self::StorageWrite => StatusCode::INTERNAL_SERVER_ERROR,
            Self::StorageRead => StatusCode::SERVICE_UNAVAILABLE,
            Self::RateLimited => StatusCode::TOO_MANY_REQUESTS,
        };

        plain(status, Reply::Error(self.to_string()))
    }
}

/// Render a reply with no-cache headers.
fn plain(status: StatusCode, reply: Reply) -> Response {
    (
        status,
        [
            (CONTENT_TYPE, "text/plain; charset=utf-8"),
            (CACHE_CONTROL, "no-store, no-cache, must-revalidate, max-age=0"),
            (PRAGMA, "no-cache"),
            (EXPIRES, "0"),
        ],
        reply.to_string(),
    )
        .into_response()
}

/// Submit parameters, from the query string or a form body.
///
/// Fields are optional so a form body and a query string can be merged
/// field by field.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct SubmitParams {
    session: Option<String>,
    code: Option<String>,
}

impl SubmitParams {
    /// Fill fields missing here from `fallback`.
    fn or(self, fallback: SubmitParams) -> SubmitParams {
        SubmitParams {
            session: self.session.or(fallback.session),
            code: self.code.or(fallback.code),
        }
    }
}

/// Pull parameters.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct PullParams {
    session: String,
    ack: Option<String>,
}

/// Lookup parameters.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct LookupParams {
    code: String,
}

/// Interpret the `ack` flag. `None` means the value is not understood.
fn parse_ack(raw: &str) -> Option<bool> {
    match raw.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" => Some(true),
        "0" | "false" | "no" => Some(false),
        _ => None,
    }
}

/// `GET /submit?session=&code=`
pub async fn submit_query(
    Extension(relay): Extension<Arc<CodeRelay>>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    params: Result<Query<SubmitParams>, QueryRejection>,
) -> Result<Response, ApiError> {
    let Query(params) = params.map_err(|_| ApiError::InvalidInput)?;
    submit(&relay, addr, params).await
}

/// `POST /submit`
///
/// Each field is taken from the form body when present there, otherwise
/// from the query string. A missing or unreadable body counts as empty.
pub async fn submit_form(
    Extension(relay): Extension<Arc<CodeRelay>>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    query: Result<Query<SubmitParams>, QueryRejection>,
    form: Result<Form<SubmitParams>, FormRejection>,
) -> Result<Response, ApiError> {
    let query = query.map(|Query(p)| p).unwrap_or_default();
    let form = form.map(|Form(p)| p).unwrap_or_default();
    submit(&relay, addr, form.or(query)).await
}

async fn submit(
    relay: &CodeRelay,
    addr: SocketAddr,
    params: SubmitParams,
) -> Result<Response, ApiError> {
    check_rate(relay, relay.rate_limits().check_submit(addr.ip()))?;

    let session = params.session.unwrap_or_default();
    let code = params.code.unwrap_or_default();
    let code = relay.submit(&session, &code).await?;

    let echo = relay.config().relay.echo_code.then_some(code);
    Ok(plain(StatusCode::OK, Reply::Accepted(echo)))
}

/// `GET /pull?session=&ack=`
pub async fn pull(
    Extension(relay): Extension<Arc<CodeRelay>>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    params: Result<Query<PullParams>, QueryRejection>,
) -> Result<Response, ApiError> {
    let Query(params) = params.map_err(|_| ApiError::InvalidInput)?;
    check_rate(&relay, relay.rate_limits().check_pull(addr.ip()))?;

    let ack = match params.ack.as_deref() {
        None | Some("") => None,
        Some(raw) => Some(parse_ack(raw).ok_or(ApiError::InvalidInput)?),
    };

    let reply = match relay.pull(&params.session, ack).await? {
        PullOutcome::Delivered(code) => Reply::Delivered(code),
        PullOutcome::Pending => Reply::Wait,
    };
    Ok(plain(StatusCode::OK, reply))
}

/// `GET /lookup?code=`
pub async fn lookup(
    Extension(relay): Extension<Arc<CodeRelay>>,
    params: Result<Query<LookupParams>, QueryRejection>,
) -> Result<Response, ApiError> {
    check_rate(&relay, relay.rate_limits().check_global())?;

    // Anything unparseable is simply a miss
    let code = params.map(|Query(p)| p.code).unwrap_or_default();

    let reply = match relay.lookup(&code) {
        Some(name) => Reply::Name(name.to_string()),
        None => Reply::NoMatch,
    };
    Ok(plain(StatusCode::OK, reply))
}

fn check_rate(
    relay: &CodeRelay,
    result: Result<(), crate::limits::RateLimitError>,
) -> Result<(), ApiError> {
    result.map_err(|e| {
        relay.metrics().rate_limit_hits.fetch_add(1, Ordering::Relaxed);
        tracing::debug!("Request rate limited: {}", e);
        ApiError::RateLimited
    })
}
