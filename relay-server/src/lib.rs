//! # scan-relay
//!
//! One-shot code relay for device pairing.
//!
//! A scanning device submits a short numeric code under a session key; a
//! second device polls the same session key until the code shows up, takes
//! it, and the record is gone.
//!
//! ## Architecture
//!
//! ```text
//! Scanner ──┐                      ┌── Poller
//!           │ GET/POST /submit     │ GET /pull (repeat)
//!           ▼                      ▼
//!        ┌─────────────────────────────┐
//!        │   http (axum handlers)      │
//!        │   CodeRelay: limits/metrics │
//!        │   RelayService: validation  │
//!        │  ┌───────────────────────┐  │
//!        │  │ RecordStore           │  │
//!        │  │ (memory | SQLite)     │  │
//!        │  └───────────────────────┘  │
//!        └─────────────────────────────┘
//! ```
//!
//! ## Guarantees
//!
//! - A consuming pull hands a code to exactly one caller.
//! - A later submit for the same session replaces the waiting code.
//! - Nothing is retrievable once its TTL (at most 24 hours) has elapsed.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod cleanup;
pub mod config;
pub mod error;
pub mod http;
pub mod limits;
pub mod lookup;
pub mod server;
pub mod service;
pub mod storage;
