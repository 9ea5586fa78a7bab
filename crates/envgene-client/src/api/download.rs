use std::path::Path;

use async_std::io::WriteExt;
use futures::StreamExt;
use reqwest::Method;
use url::Url;

use crate::error::{IoContext, Result};
use crate::{AuthHeader, EnvgeneClient};

impl EnvgeneClient {
    /// Streams the body of `url` into `dest`, creating parent directories as
    /// needed. Returns the number of bytes written.
    pub async fn download_to(
        &self,
        url: &Url,
        auth: Option<&AuthHeader>,
        dest: &Path,
    ) -> Result<u64> {
        let res = self.request(Method::GET, url.clone(), auth)?.send().await?;
        let res = Self::check_status(url, res)?;

        if let Some(parent) = dest.parent() {
            async_std::fs::create_dir_all(parent)
                .await
                .io_context(|| parent.to_owned())?;
        }
        let mut file = async_std::fs::File::create(dest)
            .await
            .io_context(|| dest.to_owned())?;
        let mut written = 0u64;
        let mut body = res.bytes_stream();
        while let Some(chunk) = body.next().await {
            let chunk = chunk?;
            file.write_all(&chunk)
                .await
                .io_context(|| dest.to_owned())?;
            written += chunk.len() as u64;
        }
        file.flush().await.io_context(|| dest.to_owned())?;
        tracing::info!("Downloaded: {}", dest.display());
        Ok(written)
    }
}
