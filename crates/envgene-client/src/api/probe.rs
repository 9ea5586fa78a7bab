use reqwest::{Method, StatusCode};
use url::Url;

use crate::error::Result;
use crate::{AuthHeader, EnvgeneClient};

pub(crate) const NEXUS_STATUS_PATH: &str = "service/rest/v1/status";

impl EnvgeneClient {
    /// Sends a `HEAD` request and returns the response status.
    pub async fn head_status(&self, url: &Url, auth: Option<&AuthHeader>) -> Result<StatusCode> {
        let res = self
            .request(Method::HEAD, url.clone(), auth)?
            .send()
            .await?;
        Ok(res.status())
    }

    /// Whether `url` answers a `HEAD` request with 200.
    pub async fn exists(&self, url: &Url, auth: Option<&AuthHeader>) -> Result<bool> {
        Ok(self.head_status(url, auth).await? == StatusCode::OK)
    }

    /// Whether `repository_domain` is served by a Nexus instance, judged by
    /// its `/service/rest/v1/status` endpoint answering 200. Any failure
    /// counts as "no".
    pub async fn is_nexus(&self, repository_domain: &Url) -> bool {
        let status_url = match nexus_status_url(repository_domain) {
            Ok(url) => url,
            Err(e) => {
                tracing::debug!("Could not build Nexus status URL for {repository_domain}: {e}");
                return false;
            }
        };
        match self.client.get(status_url.clone()).send().await {
            Ok(res) => res.status() == StatusCode::OK,
            Err(e) => {
                tracing::debug!("Nexus status probe {status_url} failed: {e}");
                false
            }
        }
    }
}

/// Status endpoint of the Nexus instance a repository domain lives on:
/// `https://host/nexus/repository/` maps to
/// `https://host/nexus/service/rest/v1/status`.
pub(crate) fn nexus_status_url(repository_domain: &Url) -> Result<Url> {
    let mut base = repository_domain.clone();
    let path = base.path().trim_end_matches('/');
    let prefix = path.strip_suffix("/repository").unwrap_or(path).to_string();
    base.set_path(&format!("{prefix}/"));
    base.set_query(None);
    Ok(base.join(NEXUS_STATUS_PATH)?)
}
