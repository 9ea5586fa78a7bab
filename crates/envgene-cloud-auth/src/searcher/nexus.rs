use std::path::Path;

use async_trait::async_trait;
use envgene_client::{AuthHeader, ClientError, EnvgeneClient};
use envgene_common::Provider;
use serde::Deserialize;
use url::Url;

use crate::error::{CloudAuthError, Result};
use crate::searcher::{download_with, ArtifactQuery, MavenSearcher};

const SEARCH_ASSETS_PATH: &str = "service/rest/v1/search/assets";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SearchPage {
    #[serde(default)]
    items: Vec<Asset>,
    #[serde(default)]
    continuation_token: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Asset {
    download_url: String,
    #[serde(default)]
    maven2: Option<Maven2>,
}

#[derive(Debug, Deserialize)]
struct Maven2 {
    #[serde(default)]
    classifier: Option<String>,
}

/// Searches a Nexus 3 instance through its asset search API.
#[derive(Debug)]
pub struct NexusSearcher {
    client: EnvgeneClient,
    base: Url,
    auth: Option<AuthHeader>,
}

impl NexusSearcher {
    pub fn new(client: EnvgeneClient, base: Url, auth: Option<AuthHeader>) -> Self {
        Self { client, base, auth }
    }

    /// `https://host/nexus/repository/maven/` searches at
    /// `https://host/nexus/service/rest/v1/search/assets`.
    fn search_url(&self) -> Result<Url> {
        let mut root = self.base.clone();
        let path = root.path().to_string();
        let prefix = match path.find("/repository") {
            Some(idx) => &path[..idx],
            None => path.trim_end_matches('/'),
        };
        root.set_path(&format!("{prefix}/"));
        root.set_query(None);
        Ok(root.join(SEARCH_ASSETS_PATH)?)
    }

    fn page_url(&self, query: &ArtifactQuery, continuation: Option<&str>) -> Result<Url> {
        let mut url = self.search_url()?;
        {
            let mut params = url.query_pairs_mut();
            params
                .append_pair("maven.groupId", &query.group_id)
                .append_pair("maven.artifactId", &query.artifact_id);
            if query.is_snapshot() {
                params.append_pair("maven.baseVersion", &query.version);
            } else {
                params.append_pair("version", &query.version);
            }
            params.append_pair("maven.extension", query.extension.as_str());
            if let Some(classifier) = &query.classifier {
                params.append_pair("maven.classifier", classifier);
            }
            if let Some(token) = continuation {
                params.append_pair("continuationToken", token);
            }
        }
        Ok(url)
    }
}

#[async_trait]
impl MavenSearcher for NexusSearcher {
    fn provider(&self) -> Provider {
        Provider::Nexus
    }

    async fn find_artifact_urls(&self, query: &ArtifactQuery) -> Result<Vec<String>> {
        let mut urls = Vec::new();
        let mut continuation: Option<String> = None;
        loop {
            let url = self.page_url(query, continuation.as_deref())?;
            let page: SearchPage = match self.client.get_json(&url, self.auth.as_ref()).await {
                Ok(page) => page,
                Err(ClientError::NotFound(_)) => {
                    return Err(CloudAuthError::SearchIndexMiss(query.to_string()))
                }
                Err(e) => return Err(e.into()),
            };
            urls.extend(
                page.items
                    .into_iter()
                    .filter(|asset| {
                        let classifier = asset
                            .maven2
                            .as_ref()
                            .and_then(|m| m.classifier.as_deref())
                            .filter(|c| !c.is_empty());
                        classifier == query.classifier.as_deref()
                    })
                    .map(|asset| asset.download_url),
            );
            match page.continuation_token {
                Some(token) => continuation = Some(token),
                None => break,
            }
        }
        urls.sort_by(|a, b| b.cmp(a));
        tracing::debug!("Nexus search for {query} found {} asset(s)", urls.len());
        Ok(urls)
    }

    async fn download_artifact(&self, url: &str, dest: &Path) -> Result<u64> {
        download_with(&self.client, url, self.auth.as_ref(), dest).await
    }
}

#[cfg(test)]
mod tests {
    use envgene_common::FileExtension;
    use miette::{IntoDiagnostic, Result};
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use wiremock::matchers::{header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    fn searcher(server: &MockServer, auth: Option<AuthHeader>) -> Result<NexusSearcher> {
        let base: Url = format!("{}/repository/maven-public/", server.uri())
            .parse()
            .into_diagnostic()?;
        Ok(NexusSearcher::new(EnvgeneClient::new()?, base, auth))
    }

    #[async_std::test]
    async fn snapshot_search() -> Result<()> {
        let mock_server = MockServer::start().await;
        let base = mock_server.uri();

        Mock::given(method("GET"))
            .and(path("/service/rest/v1/search/assets"))
            .and(query_param("maven.groupId", "com.example"))
            .and(query_param("maven.artifactId", "app"))
            .and(query_param("maven.baseVersion", "1.0.0-SNAPSHOT"))
            .and(query_param("maven.extension", "json"))
            .and(header("authorization", "Basic dXNlcjpwYXNz"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "items": [
                    {
                        "downloadUrl": format!("{base}/repository/snapshots/com/example/app/1.0.0-SNAPSHOT/app-1.0.0-20240701.101010-1.json"),
                        "maven2": { "extension": "json" }
                    },
                    {
                        "downloadUrl": format!("{base}/repository/snapshots/com/example/app/1.0.0-SNAPSHOT/app-1.0.0-20240702.123456-2.json"),
                        "maven2": { "extension": "json" }
                    },
                    {
                        "downloadUrl": format!("{base}/repository/snapshots/com/example/app/1.0.0-SNAPSHOT/app-1.0.0-20240702.123456-2-sources.json"),
                        "maven2": { "extension": "json", "classifier": "sources" }
                    }
                ],
                "continuationToken": null
            })))
            .expect(1)
            .mount(&mock_server)
            .await;

        let urls = searcher(&mock_server, Some(AuthHeader::basic("user", "pass")))?
            .find_artifact_urls(&ArtifactQuery::new(
                "com.example",
                "app",
                "1.0.0-SNAPSHOT",
                FileExtension::Json,
            ))
            .await?;
        assert_eq!(
            urls,
            vec![
                format!("{base}/repository/snapshots/com/example/app/1.0.0-SNAPSHOT/app-1.0.0-20240702.123456-2.json"),
                format!("{base}/repository/snapshots/com/example/app/1.0.0-SNAPSHOT/app-1.0.0-20240701.101010-1.json"),
            ]
        );
        Ok(())
    }

    #[async_std::test]
    async fn index_miss() -> Result<()> {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/service/rest/v1/search/assets"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&mock_server)
            .await;

        let err = searcher(&mock_server, None)?
            .find_artifact_urls(&ArtifactQuery::new("com.example", "app", "1.0.0", FileExtension::Zip))
            .await
            .unwrap_err();
        assert!(matches!(err, CloudAuthError::SearchIndexMiss(_)));
        assert!(!err.is_transient());
        Ok(())
    }

    #[async_std::test]
    async fn follows_continuation_tokens() -> Result<()> {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/service/rest/v1/search/assets"))
            .and(query_param("continuationToken", "next"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "items": [{ "downloadUrl": "https://nexus/b.zip" }]
            })))
            .with_priority(1)
            .mount(&mock_server)
            .await;
        Mock::given(method("GET"))
            .and(path("/service/rest/v1/search/assets"))
            .and(query_param("version", "1.0.0"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "items": [{ "downloadUrl": "https://nexus/a.zip" }],
                "continuationToken": "next"
            })))
            .mount(&mock_server)
            .await;

        let urls = searcher(&mock_server, None)?
            .find_artifact_urls(&ArtifactQuery::new("com.example", "app", "1.0.0", FileExtension::Zip))
            .await?;
        assert_eq!(urls, vec!["https://nexus/b.zip", "https://nexus/a.zip"]);
        Ok(())
    }

    #[test]
    fn search_url_strips_repository_path() -> Result<()> {
        let base: Url = "https://host/nexus/repository/maven/".parse().into_diagnostic()?;
        let searcher = NexusSearcher::new(EnvgeneClient::new()?, base, None);
        assert_eq!(
            searcher.search_url()?.as_str(),
            "https://host/nexus/service/rest/v1/search/assets"
        );
        Ok(())
    }
}
