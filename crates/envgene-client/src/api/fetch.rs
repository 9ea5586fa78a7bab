use reqwest::Method;
use serde::de::DeserializeOwned;
use url::Url;

use crate::error::{ClientError, Result};
use crate::{AuthHeader, EnvgeneClient};

impl EnvgeneClient {
    /// Fetches `url` as text. 404 maps to [`ClientError::NotFound`], other
    /// failures to [`ClientError::BadStatus`].
    pub async fn get_text(&self, url: &Url, auth: Option<&AuthHeader>) -> Result<String> {
        let res = self.request(Method::GET, url.clone(), auth)?.send().await?;
        Ok(Self::check_status(url, res)?.text().await?)
    }

    /// Fetches and parses a JSON document.
    pub async fn get_json<T: DeserializeOwned>(
        &self,
        url: &Url,
        auth: Option<&AuthHeader>,
    ) -> Result<T> {
        let text = self.get_text(url, auth).await?;
        let parsed = serde_json::from_str(&text).map_err(|source| ClientError::BadJson {
            source,
            url: url.to_string(),
        })?;
        tracing::debug!("Got the json data by url {url}");
        Ok(parsed)
    }
}
