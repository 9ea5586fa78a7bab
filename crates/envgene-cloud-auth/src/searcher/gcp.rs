use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use envgene_client::{AuthHeader, ClientError, EnvgeneClient};
use envgene_common::{artifact_dir_path, artifact_file_name, parse_snapshot_version, Provider, METADATA_XML};
use url::Url;

use crate::error::Result;
use crate::searcher::{as_directory, download_with, ArtifactQuery, MavenSearcher};
use crate::token::CloudTokenSource;

/// Searches a GCP Artifact Registry Maven repository by walking its Maven
/// layout with a service account bearer token.
#[derive(Debug)]
pub struct GcpArtifactRegistrySearcher {
    client: EnvgeneClient,
    tokens: Arc<dyn CloudTokenSource>,
    service_account_json: String,
    base: Url,
}

impl GcpArtifactRegistrySearcher {
    pub fn new(
        client: EnvgeneClient,
        tokens: Arc<dyn CloudTokenSource>,
        service_account_json: String,
        project: &str,
        region: &str,
        repository: &str,
    ) -> Result<Self> {
        let base = format!("https://{region}-maven.pkg.dev/{project}/{repository}/").parse()?;
        Ok(Self {
            client,
            tokens,
            service_account_json,
            base,
        })
    }

    /// Serves the repository from `base` instead of `pkg.dev`.
    pub fn with_base_url(mut self, base: Url) -> Self {
        self.base = as_directory(base);
        self
    }

    async fn bearer(&self) -> Result<AuthHeader> {
        let token = self
            .tokens
            .gcp_access_token(&self.service_account_json)
            .await?;
        Ok(AuthHeader::bearer(token))
    }

    async fn resolve_version(&self, query: &ArtifactQuery, dir: &str, auth: &AuthHeader) -> Result<Option<String>> {
        if !query.is_snapshot() {
            return Ok(Some(query.version.clone()));
        }
        let metadata_url = self.base.join(&format!("{dir}/{METADATA_XML}"))?;
        let xml = match self.client.get_text(&metadata_url, Some(auth)).await {
            Ok(xml) => xml,
            Err(ClientError::NotFound(_)) => {
                tracing::debug!("No snapshot metadata at {metadata_url}");
                return Ok(None);
            }
            Err(e) => return Err(e.into()),
        };
        Ok(parse_snapshot_version(
            &xml,
            query.extension,
            query.classifier.as_deref(),
            &query.version,
        ))
    }
}

#[async_trait]
impl MavenSearcher for GcpArtifactRegistrySearcher {
    fn provider(&self) -> Provider {
        Provider::Gcp
    }

    async fn find_artifact_urls(&self, query: &ArtifactQuery) -> Result<Vec<String>> {
        let auth = self.bearer().await?;
        let dir = artifact_dir_path(&query.group_id, &query.artifact_id, &query.version);
        let version = match self.resolve_version(query, &dir, &auth).await? {
            Some(version) => version,
            None => return Ok(Vec::new()),
        };
        let file = artifact_file_name(
            &query.artifact_id,
            &version,
            query.classifier.as_deref(),
            query.extension,
        );
        let url = self.base.join(&format!("{dir}/{file}"))?;
        if self.client.exists(&url, Some(&auth)).await? {
            Ok(vec![url.to_string()])
        } else {
            tracing::debug!("GCP artifact not present at {url}");
            Ok(Vec::new())
        }
    }

    async fn download_artifact(&self, url: &str, dest: &Path) -> Result<u64> {
        let auth = self.bearer().await?;
        download_with(&self.client, url, Some(&auth), dest).await
    }
}

#[cfg(test)]
mod tests {
    use envgene_common::FileExtension;
    use miette::{IntoDiagnostic, Result};
    use pretty_assertions::assert_eq;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;
    use crate::aws::AwsCredentials;

    #[derive(Debug)]
    struct FixedToken;

    #[async_trait]
    impl CloudTokenSource for FixedToken {
        async fn aws_authorization_token(
            &self,
            _credentials: &AwsCredentials,
            _region: &str,
            _domain: &str,
            _domain_owner: Option<&str>,
        ) -> crate::Result<String> {
            unreachable!("GCP searcher never asks for AWS tokens")
        }

        async fn gcp_access_token(&self, _service_account_json: &str) -> crate::Result<String> {
            Ok("gcp_token_123".into())
        }
    }

    fn searcher(server: &MockServer) -> Result<GcpArtifactRegistrySearcher> {
        let searcher = GcpArtifactRegistrySearcher::new(
            EnvgeneClient::new()?,
            Arc::new(FixedToken),
            "{}".into(),
            "my-project",
            "europe-west1",
            "my-repo",
        )?;
        assert_eq!(
            searcher.base.as_str(),
            "https://europe-west1-maven.pkg.dev/my-project/my-repo/"
        );
        Ok(searcher.with_base_url(
            format!("{}/my-project/my-repo", server.uri())
                .parse()
                .into_diagnostic()?,
        ))
    }

    #[async_std::test]
    async fn snapshot_resolved_through_metadata() -> Result<()> {
        let mock_server = MockServer::start().await;
        let dir = "/my-project/my-repo/com/example/app/1.0.0-SNAPSHOT";

        Mock::given(method("GET"))
            .and(path(format!("{dir}/maven-metadata.xml")))
            .and(header("authorization", "Bearer gcp_token_123"))
            .respond_with(ResponseTemplate::new(200).set_body_string(
                r#"<metadata><versioning><snapshotVersions>
                    <snapshotVersion><extension>json</extension><value>1.0.0-20240702.123456-1</value></snapshotVersion>
                </snapshotVersions></versioning></metadata>"#,
            ))
            .mount(&mock_server)
            .await;
        Mock::given(method("HEAD"))
            .and(path(format!("{dir}/app-1.0.0-20240702.123456-1.json")))
            .and(header("authorization", "Bearer gcp_token_123"))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&mock_server)
            .await;

        let urls = searcher(&mock_server)?
            .find_artifact_urls(&ArtifactQuery::new(
                "com.example",
                "app",
                "1.0.0-SNAPSHOT",
                FileExtension::Json,
            ))
            .await?;
        assert_eq!(
            urls,
            vec![format!(
                "{}{dir}/app-1.0.0-20240702.123456-1.json",
                mock_server.uri()
            )]
        );
        Ok(())
    }

    #[async_std::test]
    async fn missing_release_is_empty() -> Result<()> {
        let mock_server = MockServer::start().await;

        Mock::given(method("HEAD"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&mock_server)
            .await;

        let urls = searcher(&mock_server)?
            .find_artifact_urls(&ArtifactQuery::new("com.example", "app", "2.0.0", FileExtension::Zip))
            .await?;
        assert!(urls.is_empty());
        Ok(())
    }
}
