use std::path::Path;

use async_trait::async_trait;
use envgene_client::{AuthHeader, EnvgeneClient};
use envgene_common::Provider;
use serde::Deserialize;
use url::Url;

use crate::error::Result;
use crate::searcher::{as_directory, download_with, ArtifactQuery, MavenSearcher};

const STORAGE_SEGMENT: &str = "/api/storage/";

#[derive(Debug, Deserialize)]
struct GavcResponse {
    #[serde(default)]
    results: Vec<GavcResult>,
}

#[derive(Debug, Deserialize)]
struct GavcResult {
    uri: String,
}

/// Searches Artifactory with its GAVC search API.
#[derive(Debug)]
pub struct ArtifactorySearcher {
    client: EnvgeneClient,
    base: Url,
    auth: Option<AuthHeader>,
}

impl ArtifactorySearcher {
    pub fn new(client: EnvgeneClient, base: Url, auth: Option<AuthHeader>) -> Self {
        Self {
            client,
            base: as_directory(base),
            auth,
        }
    }
}

/// `.../api/storage/<repo>/<path>` -> `.../<repo>/<path>`
fn storage_to_download(uri: &str) -> String {
    uri.replacen(STORAGE_SEGMENT, "/", 1)
}

#[async_trait]
impl MavenSearcher for ArtifactorySearcher {
    fn provider(&self) -> Provider {
        Provider::Artifactory
    }

    async fn find_artifact_urls(&self, query: &ArtifactQuery) -> Result<Vec<String>> {
        let mut url = self.base.join("api/search/gavc")?;
        {
            let mut params = url.query_pairs_mut();
            params
                .append_pair("g", &query.group_id)
                .append_pair("a", &query.artifact_id)
                .append_pair("v", &query.version);
            if let Some(classifier) = &query.classifier {
                params.append_pair("c", classifier);
            }
        }
        let res: GavcResponse = self.client.get_json(&url, self.auth.as_ref()).await?;
        let suffix = query.file_suffix();
        let mut urls: Vec<String> = res
            .results
            .into_iter()
            .map(|r| storage_to_download(&r.uri))
            .filter(|uri| uri.ends_with(&suffix))
            .collect();
        urls.sort_by(|a, b| b.cmp(a));
        tracing::debug!("Artifactory search for {query} found {} file(s)", urls.len());
        Ok(urls)
    }

    async fn download_artifact(&self, url: &str, dest: &Path) -> Result<u64> {
        download_with(&self.client, url, self.auth.as_ref(), dest).await
    }
}
