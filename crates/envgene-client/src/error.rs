use std::path::PathBuf;

use miette::Diagnostic;
use reqwest::StatusCode;
use thiserror::Error;

#[derive(Debug, Error, Diagnostic)]
pub enum ClientError {
    #[error(transparent)]
    #[diagnostic(code(envgene_client::url_parse_error))]
    UrlParseError(#[from] url::ParseError),

    /// The registry answered 404 for the requested resource.
    #[error("Resource was not found in registry: {0}")]
    #[diagnostic(code(envgene_client::not_found))]
    NotFound(String),

    /// The registry answered with a non-success status other than 404.
    #[error("Request to {url} failed with status {status}.")]
    #[diagnostic(code(envgene_client::bad_status))]
    BadStatus { url: String, status: StatusCode },

    #[error("Request failed: {0}")]
    #[diagnostic(code(envgene_client::request_error))]
    RequestError(#[from] reqwest::Error),

    #[error("Request failed: {0}")]
    #[diagnostic(code(envgene_client::middleware_error))]
    MiddlewareError(#[from] reqwest_middleware::Error),

    /// A response body was not the JSON document the caller expected.
    #[error("Received invalid JSON from {url}: {source}")]
    #[diagnostic(code(envgene_client::bad_json))]
    BadJson {
        #[source]
        source: serde_json::Error,
        url: String,
    },

    /// An authorization header value contained characters HTTP does not
    /// allow.
    #[error("Invalid authorization header value.")]
    #[diagnostic(code(envgene_client::invalid_header))]
    InvalidHeader(#[from] reqwest::header::InvalidHeaderValue),

    #[error("Failed to write {}: {source}", .path.display())]
    #[diagnostic(code(envgene_client::io_error))]
    IoError {
        #[source]
        source: std::io::Error,
        path: PathBuf,
    },

    /// The request did not finish within its deadline.
    #[error("Request to {0} timed out.")]
    #[diagnostic(code(envgene_client::timeout))]
    Timeout(String),
}

impl ClientError {
    /// HTTP status carried by this error, if any.
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            ClientError::NotFound(_) => Some(StatusCode::NOT_FOUND),
            ClientError::BadStatus { status, .. } => Some(*status),
            ClientError::RequestError(err) => err.status(),
            ClientError::MiddlewareError(reqwest_middleware::Error::Reqwest(err)) => err.status(),
            _ => None,
        }
    }

    /// Whether retrying the same request may succeed: timeouts, dropped
    /// connections, and auth rejections caused by expired tokens.
    pub fn is_transient(&self) -> bool {
        if matches!(
            self.status(),
            Some(StatusCode::UNAUTHORIZED) | Some(StatusCode::FORBIDDEN)
        ) {
            return true;
        }
        match self {
            ClientError::Timeout(_) => true,
            ClientError::RequestError(err) => err.is_timeout() || err.is_connect(),
            ClientError::MiddlewareError(reqwest_middleware::Error::Reqwest(err)) => {
                err.is_timeout() || err.is_connect()
            }
            ClientError::MiddlewareError(err) => {
                let msg = err.to_string().to_lowercase();
                msg.contains("timeout") || msg.contains("expired")
            }
            _ => false,
        }
    }
}

pub type Result<T> = std::result::Result<T, ClientError>;

pub trait IoContext {
    type T;

    fn io_context(self, path: impl FnOnce() -> PathBuf) -> Result<Self::T>;
}

impl<T> IoContext for std::result::Result<T, std::io::Error> {
    type T = T;

    fn io_context(self, path: impl FnOnce() -> PathBuf) -> Result<Self::T> {
        self.map_err(|source| ClientError::IoError {
            source,
            path: path(),
        })
    }
}
