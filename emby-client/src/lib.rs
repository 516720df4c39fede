//! HTTP client for the Emby server API
//!
//! This crate issues one authenticated GET per logical query (system info,
//! library counts, sessions, devices, tasks, users, ...) and classifies every
//! failure into a [`FetchErrorKind`]. It never retries on its own: the next
//! polling tick is the retry.
//!
//! ```rust,no_run
//! use emby_client::{ConnectionConfig, EmbyClient, QueryKind, UpstreamApi};
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let client = EmbyClient::new(&ConnectionConfig::new("192.168.1.20", "api-key"))?;
//! let sessions = client.fetch(QueryKind::Sessions).await?;
//! println!("{}", sessions);
//! # Ok(())
//! # }
//! ```

mod client;
mod error;
pub mod models;
mod query;

pub use client::{
    decode, ConnectionConfig, EmbyClient, UpstreamApi, DEFAULT_PORT, DEFAULT_REQUEST_TIMEOUT,
};
pub use error::{ClientError, FetchError, FetchErrorKind};
pub use query::{QueryKind, DEFAULT_ACTIVITY_LIMIT};
