use std::path::Path;
use std::sync::Arc;

use async_std::sync::Mutex;
use async_trait::async_trait;
use envgene_client::{AuthHeader, EnvgeneClient};
use envgene_common::{artifact_dir_path, version_to_folder_name, Provider, SNAPSHOT_SUFFIX};
use serde::Deserialize;
use url::Url;

use crate::aws::{codeartifact_endpoint, signed_post, AwsCredentials};
use crate::error::{CloudAuthError, Result};
use crate::searcher::{as_directory, download_with, ArtifactQuery, MavenSearcher};
use crate::token::CloudTokenSource;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AssetsPage {
    #[serde(default)]
    assets: Vec<AssetSummary>,
    #[serde(default)]
    next_token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AssetSummary {
    name: String,
}

/// Where a CodeArtifact Maven repository lives.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CodeArtifactRepository {
    pub domain: String,
    pub domain_owner: Option<String>,
    pub region: String,
    pub repository: String,
}

impl CodeArtifactRepository {
    pub fn new(
        domain: impl Into<String>,
        region: impl Into<String>,
        repository: impl Into<String>,
    ) -> Self {
        Self {
            domain: domain.into(),
            domain_owner: None,
            region: region.into(),
            repository: repository.into(),
        }
    }

    /// Account id owning the domain. Left out of API calls when unset.
    pub fn domain_owner(mut self, owner: Option<String>) -> Self {
        self.domain_owner = owner;
        self
    }
}

/// Searches an AWS CodeArtifact Maven repository. CodeArtifact lists asset
/// names only, so download URLs are rebuilt from the registry URL.
#[derive(Debug)]
pub struct AwsCodeArtifactSearcher {
    client: EnvgeneClient,
    tokens: Arc<dyn CloudTokenSource>,
    registry_url: Url,
    endpoint: Url,
    credentials: AwsCredentials,
    repo: CodeArtifactRepository,
    token: Mutex<Option<String>>,
}

impl AwsCodeArtifactSearcher {
    pub fn new(
        client: EnvgeneClient,
        tokens: Arc<dyn CloudTokenSource>,
        registry_url: Url,
        credentials: AwsCredentials,
        repo: CodeArtifactRepository,
    ) -> Result<Self> {
        Ok(Self {
            client,
            tokens,
            registry_url: as_directory(registry_url),
            endpoint: codeartifact_endpoint(&repo.region)?,
            credentials,
            repo,
            token: Mutex::new(None),
        })
    }

    /// Sends CodeArtifact API calls to `endpoint` instead of the regional
    /// AWS endpoint.
    pub fn with_endpoint(mut self, endpoint: Url) -> Self {
        self.endpoint = endpoint;
        self
    }

    fn assets_url(&self, query: &ArtifactQuery, version: &str, next: Option<&str>) -> Result<Url> {
        let mut url = self.endpoint.join("v1/package/version/assets")?;
        {
            let mut params = url.query_pairs_mut();
            params.append_pair("domain", &self.repo.domain);
            if let Some(owner) = &self.repo.domain_owner {
                params.append_pair("domain-owner", owner);
            }
            params
                .append_pair("repository", &self.repo.repository)
                .append_pair("format", "maven")
                .append_pair("namespace", &query.group_id)
                .append_pair("package", &query.artifact_id)
                .append_pair("version", version);
            if let Some(next) = next {
                params.append_pair("next-token", next);
            }
        }
        Ok(url)
    }

    async fn list_assets(&self, query: &ArtifactQuery) -> Result<Vec<String>> {
        let mut names = Vec::new();
        let mut next: Option<String> = None;
        loop {
            let url = self.assets_url(query, &query.version, next.as_deref())?;
            let body = signed_post(&self.client, &self.credentials, &self.repo.region, &url).await?;
            let page: AssetsPage =
                serde_json::from_str(&body).map_err(|e| CloudAuthError::BadSearchResponse {
                    url: url.to_string(),
                    message: e.to_string(),
                })?;
            names.extend(page.assets.into_iter().map(|a| a.name));
            match page.next_token {
                Some(token) => next = Some(token),
                None => break,
            }
        }
        Ok(names)
    }

    async fn bearer(&self) -> Result<AuthHeader> {
        let mut token = self.token.lock().await;
        if let Some(token) = token.as_ref() {
            return Ok(AuthHeader::bearer(token.clone()));
        }
        let fresh = self
            .tokens
            .aws_authorization_token(
                &self.credentials,
                &self.repo.region,
                &self.repo.domain,
                self.repo.domain_owner.as_deref(),
            )
            .await?;
        *token = Some(fresh.clone());
        Ok(AuthHeader::bearer(fresh))
    }
}

/// Concrete version an asset name stands for, if it is a file of `query`:
/// `<artifactId>-<version>[-<classifier>].<ext>`. Snapshot queries accept
/// any timestamped build of the snapshot.
fn matching_version(query: &ArtifactQuery, name: &str) -> Option<String> {
    let version = name
        .strip_prefix(&format!("{}-", query.artifact_id))?
        .strip_suffix(&query.file_suffix())?;
    if version == query.version {
        return Some(version.to_string());
    }
    let base = query.version.strip_suffix(SNAPSHOT_SUFFIX)?;
    (version.starts_with(&format!("{base}-")) && version_to_folder_name(version) == query.version)
        .then(|| version.to_string())
}

#[async_trait]
impl MavenSearcher for AwsCodeArtifactSearcher {
    fn provider(&self) -> Provider {
        Provider::Aws
    }

    async fn find_artifact_urls(&self, query: &ArtifactQuery) -> Result<Vec<String>> {
        let dir = artifact_dir_path(&query.group_id, &query.artifact_id, &query.version);
        let mut names: Vec<String> = self
            .list_assets(query)
            .await?
            .into_iter()
            .filter(|name| matching_version(query, name).is_some())
            .collect();
        names.sort_by(|a, b| b.cmp(a));
        let urls = names
            .iter()
            .map(|name| -> Result<String> {
                Ok(self.registry_url.join(&format!("{dir}/{name}"))?.to_string())
            })
            .collect::<Result<Vec<_>>>()?;
        tracing::debug!("CodeArtifact search for {query} found {} asset(s)", urls.len());
        Ok(urls)
    }

    async fn download_artifact(&self, url: &str, dest: &Path) -> Result<u64> {
        let auth = self.bearer().await?;
        download_with(&self.client, url, Some(&auth), dest).await
    }
}

#[cfg(test)]
mod tests {
    use async_std::sync::Mutex as AsyncMutex;
    use envgene_common::FileExtension;
    use miette::{IntoDiagnostic, Result};
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use wiremock::matchers::{header, header_exists, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    #[derive(Debug, Default)]
    struct FixedToken {
        calls: AsyncMutex<usize>,
    }

    #[async_trait]
    impl CloudTokenSource for FixedToken {
        async fn aws_authorization_token(
            &self,
            _credentials: &AwsCredentials,
            _region: &str,
            _domain: &str,
            _domain_owner: Option<&str>,
        ) -> crate::Result<String> {
            *self.calls.lock().await += 1;
            Ok("aws_token_123".into())
        }

        async fn gcp_access_token(&self, _service_account_json: &str) -> crate::Result<String> {
            unreachable!("AWS searcher never asks for GCP tokens")
        }
    }

    fn searcher(server: &MockServer, tokens: Arc<FixedToken>) -> Result<AwsCodeArtifactSearcher> {
        let registry: Url = format!("{}/maven/releases/", server.uri())
            .parse()
            .into_diagnostic()?;
        let endpoint: Url = format!("{}/", server.uri()).parse().into_diagnostic()?;
        Ok(AwsCodeArtifactSearcher::new(
            EnvgeneClient::new()?,
            tokens,
            registry,
            AwsCredentials::new("AKIA_ACCESS_KEY", "secret_key_value"),
            CodeArtifactRepository::new("my-domain", "us-east-1", "releases")
                .domain_owner(Some("123456789012".into())),
        )?
        .with_endpoint(endpoint))
    }

    #[test]
    fn asset_name_matching() {
        let release = ArtifactQuery::new("com.example", "app", "1.0.0", FileExtension::Json);
        assert_eq!(matching_version(&release, "app-1.0.0.json"), Some("1.0.0".into()));
        assert_eq!(matching_version(&release, "app-1.0.0.pom"), None);
        assert_eq!(matching_version(&release, "app-1.0.0-sources.json"), None);

        let snapshot = ArtifactQuery::new("com.example", "app", "1.0.0-SNAPSHOT", FileExtension::Zip)
            .classifier("dist");
        assert_eq!(
            matching_version(&snapshot, "app-1.0.0-20240702.123456-1-dist.zip"),
            Some("1.0.0-20240702.123456-1".into())
        );
        assert_eq!(matching_version(&snapshot, "app-1.0.0-20240702.123456-1.zip"), None);
        assert_eq!(matching_version(&snapshot, "app-1.1.0-20240702.123456-1-dist.zip"), None);
    }

    #[test]
    fn timestamped_builds_match_their_snapshot() {
        let snapshot = ArtifactQuery::new("com.example", "app", "1.0.0-SNAPSHOT", FileExtension::Json);
        assert_eq!(
            matching_version(&snapshot, "app-1.0.0-20240702.123456-2.json"),
            Some("1.0.0-20240702.123456-2".into())
        );
        assert_eq!(
            matching_version(&snapshot, "app-1.0.0-SNAPSHOT.json"),
            Some("1.0.0-SNAPSHOT".into())
        );
        assert_eq!(matching_version(&snapshot, "app-1.0.0-rc1.json"), None);
        assert_eq!(matching_version(&snapshot, "app-1.0.0-20240702.json"), None);
    }

    #[async_std::test]
    async fn lists_assets_and_rebuilds_urls() -> Result<()> {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/v1/package/version/assets"))
            .and(query_param("domain", "my-domain"))
            .and(query_param("domain-owner", "123456789012"))
            .and(query_param("repository", "releases"))
            .and(query_param("format", "maven"))
            .and(query_param("namespace", "com.example"))
            .and(query_param("package", "app"))
            .and(query_param("version", "1.0.0-SNAPSHOT"))
            .and(header_exists("authorization"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "assets": [
                    { "name": "app-1.0.0-20240701.101010-1.json" },
                    { "name": "app-1.0.0-20240702.123456-2.json" },
                    { "name": "app-1.0.0-20240702.123456-2.pom" },
                    { "name": "maven-metadata.xml" }
                ]
            })))
            .expect(1)
            .mount(&mock_server)
            .await;

        let urls = searcher(&mock_server, Arc::new(FixedToken::default()))?
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
                format!(
                    "{}/maven/releases/com/example/app/1.0.0-SNAPSHOT/app-1.0.0-20240702.123456-2.json",
                    mock_server.uri()
                ),
                format!(
                    "{}/maven/releases/com/example/app/1.0.0-SNAPSHOT/app-1.0.0-20240701.101010-1.json",
                    mock_server.uri()
                ),
            ]
        );
        Ok(())
    }

    #[async_std::test]
    async fn downloads_with_cached_bearer_token() -> Result<()> {
        let mock_server = MockServer::start().await;
        let tmp = tempfile::tempdir().into_diagnostic()?;

        Mock::given(method("GET"))
            .and(path("/maven/releases/com/example/app/1.0.0/app-1.0.0.json"))
            .and(header("authorization", "Bearer aws_token_123"))
            .respond_with(ResponseTemplate::new(200).set_body_string("{}"))
            .expect(2)
            .mount(&mock_server)
            .await;

        let tokens = Arc::new(FixedToken::default());
        let searcher = searcher(&mock_server, tokens.clone())?;
        let url = format!(
            "{}/maven/releases/com/example/app/1.0.0/app-1.0.0.json",
            mock_server.uri()
        );
        searcher
            .download_artifact(&url, &tmp.path().join("a.json"))
            .await?;
        let written = searcher
            .download_artifact(&url, &tmp.path().join("b.json"))
            .await?;
        assert_eq!(written, 2);
        assert_eq!(*tokens.calls.lock().await, 1);
        Ok(())
    }
}
