//! Async HTTP client for Maven-layout artifact registries.
//!
//! [`EnvgeneClient`] wraps a `reqwest` client with optional transient-retry
//! middleware and exposes the handful of calls artifact resolution needs:
//! existence probes, metadata and JSON fetches, streamed downloads, and
//! Artifactory AQL searches.

mod api;
mod auth;
mod client;
mod error;

pub use api::aql::AqlResult;
pub use auth::AuthHeader;
pub use client::{
    EnvgeneClient, EnvgeneClientBuilder, DEFAULT_CONNECTION_LIMIT, DEFAULT_REQUEST_TIMEOUT,
};
pub use error::{ClientError, IoContext, Result};
pub use reqwest::{Method, StatusCode};
