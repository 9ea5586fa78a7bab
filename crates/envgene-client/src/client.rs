use std::time::Duration;

use reqwest::header::AUTHORIZATION;
use reqwest::{Client, ClientBuilder, Method};
use reqwest_middleware::{ClientWithMiddleware, RequestBuilder};
use reqwest_retry::policies::ExponentialBackoff;
use reqwest_retry::RetryTransientMiddleware;
use url::Url;

use crate::error::{ClientError, Result};
use crate::AuthHeader;

pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
pub const DEFAULT_CONNECTION_LIMIT: usize = 100;

/// Configures an [`EnvgeneClient`].
#[derive(Clone, Debug)]
pub struct EnvgeneClientBuilder {
    user_agent: String,
    timeout: Duration,
    connect_timeout: Option<Duration>,
    connection_limit: usize,
    retries: u32,
}

impl Default for EnvgeneClientBuilder {
    fn default() -> Self {
        Self {
            user_agent: concat!("envgene-artifacts/", env!("CARGO_PKG_VERSION")).into(),
            timeout: DEFAULT_REQUEST_TIMEOUT,
            connect_timeout: None,
            connection_limit: DEFAULT_CONNECTION_LIMIT,
            retries: 0,
        }
    }
}

impl EnvgeneClientBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    /// Per-request deadline.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Deadline for establishing a connection, separate from the overall
    /// request deadline.
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = Some(timeout);
        self
    }

    /// Maximum number of pooled connections kept per host.
    pub fn connection_limit(mut self, limit: usize) -> Self {
        self.connection_limit = limit;
        self
    }

    /// Number of times transient HTTP failures are retried by the
    /// transport. Probes default to none.
    pub fn retries(mut self, retries: u32) -> Self {
        self.retries = retries;
        self
    }

    pub fn build(self) -> Result<EnvgeneClient> {
        let mut inner = ClientBuilder::new()
            .user_agent(self.user_agent)
            .pool_max_idle_per_host(self.connection_limit)
            .timeout(self.timeout);
        if let Some(connect_timeout) = self.connect_timeout {
            inner = inner.connect_timeout(connect_timeout);
        }
        let inner = inner.build()?;
        Ok(EnvgeneClient::from_client(inner, self.retries, self.timeout))
    }
}

/// Async HTTP client shared by every resolver. Cheap to clone.
#[derive(Clone, Debug)]
pub struct EnvgeneClient {
    pub(crate) client: ClientWithMiddleware,
    pub(crate) timeout: Duration,
}

impl EnvgeneClient {
    pub fn builder() -> EnvgeneClientBuilder {
        EnvgeneClientBuilder::new()
    }

    /// Client with default settings.
    pub fn new() -> Result<Self> {
        EnvgeneClientBuilder::new().build()
    }

    fn from_client(inner: Client, retries: u32, timeout: Duration) -> Self {
        let mut client = reqwest_middleware::ClientBuilder::new(inner);
        if retries > 0 {
            let policy = ExponentialBackoff::builder().build_with_max_retries(retries);
            client = client.with(RetryTransientMiddleware::new_with_policy(policy));
        }
        Self {
            client: client.build(),
            timeout,
        }
    }

    /// The configured per-request deadline.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Underlying middleware client, for requests the helpers here don't
    /// cover (signed cloud API calls, form posts).
    pub fn http(&self) -> &ClientWithMiddleware {
        &self.client
    }

    /// Starts a request, attaching `auth` when given.
    pub fn request(
        &self,
        method: Method,
        url: Url,
        auth: Option<&AuthHeader>,
    ) -> Result<RequestBuilder> {
        let req = self.client.request(method, url);
        Ok(match auth {
            Some(auth) => req.header(AUTHORIZATION, auth.header_value()?),
            None => req,
        })
    }

    /// Maps a response to [`ClientError::NotFound`] or
    /// [`ClientError::BadStatus`] unless it succeeded.
    pub fn check_status(
        url: &Url,
        res: reqwest::Response,
    ) -> Result<reqwest::Response> {
        let status = res.status();
        if status.is_success() {
            Ok(res)
        } else if status == reqwest::StatusCode::NOT_FOUND {
            Err(ClientError::NotFound(url.to_string()))
        } else {
            Err(ClientError::BadStatus {
                url: url.to_string(),
                status,
            })
        }
    }
}
