use std::path::{Path, PathBuf};

use envgene_client::{AuthHeader, EnvgeneClient, DEFAULT_CONNECTION_LIMIT};
use envgene_common::ArtifactInfo;
use futures::stream::{self, StreamExt};
use url::Url;

use crate::error::{IoContext, Result, SearchError};

pub const WORKSPACE_ENV: &str = "WORKSPACE";
pub const TCP_CONNECTION_LIMIT_ENV: &str = "TCP_CONNECTION_LIMIT";

/// Directory downloads and extracted files land in, laid out as
/// `<root>/<app_name>/<app_version>/`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Workspace {
    root: PathBuf,
}

impl Default for Workspace {
    fn default() -> Self {
        Self::from_env()
    }
}

impl Workspace {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// `$WORKSPACE`, or `zips` under the system temp directory.
    pub fn from_env() -> Self {
        match std::env::var_os(WORKSPACE_ENV) {
            Some(root) if !root.is_empty() => Self::new(root),
            _ => Self::new(std::env::temp_dir().join("zips")),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn app_dir(&self, app_name: &str, app_version: &str) -> PathBuf {
        self.root.join(app_name).join(app_version)
    }

    /// Empties the workspace, leaving the (re-created) root directory.
    pub async fn clean(&self) -> Result<()> {
        if async_std::path::Path::new(&self.root).exists().await {
            async_std::fs::remove_dir_all(&self.root)
                .await
                .io_context(|| format!("Failed to remove workspace {}", self.root.display()))?;
        }
        async_std::fs::create_dir_all(&self.root)
            .await
            .io_context(|| format!("Failed to create workspace {}", self.root.display()))
    }
}

/// Last path segment of an artifact URL.
pub(crate) fn file_name_of(url: &str) -> Result<String> {
    let parsed: Url = url.parse()?;
    parsed
        .path_segments()
        .and_then(|mut segments| segments.next_back())
        .filter(|name| !name.is_empty())
        .map(String::from)
        .ok_or_else(|| SearchError::NoFileName(url.into()))
}

/// Downloads a resolved artifact to
/// `<workspace>/<app_name>/<app_version>/<file name>` and records where it
/// went in `local_path`.
pub async fn download(
    client: &EnvgeneClient,
    workspace: &Workspace,
    mut info: ArtifactInfo,
    auth: Option<&AuthHeader>,
) -> Result<ArtifactInfo> {
    let dir = workspace.app_dir(
        info.app_name.as_deref().unwrap_or_default(),
        info.app_version.as_deref().unwrap_or_default(),
    );
    let dest = dir.join(file_name_of(&info.url)?);
    let url: Url = info.url.parse()?;
    client.download_to(&url, auth, &dest).await?;
    info.local_path = Some(dest);
    Ok(info)
}

/// Concurrency limit for batch downloads: `$TCP_CONNECTION_LIMIT`, or
/// [`DEFAULT_CONNECTION_LIMIT`].
pub fn tcp_connection_limit() -> usize {
    std::env::var(TCP_CONNECTION_LIMIT_ENV)
        .ok()
        .and_then(|limit| limit.parse().ok())
        .filter(|limit| *limit > 0)
        .unwrap_or(DEFAULT_CONNECTION_LIMIT)
}

/// Downloads every artifact concurrently, at most `limit` at a time.
///
/// Results keep the input order. If any download fails the whole batch
/// fails with one error listing every failed task.
pub async fn download_all_async(
    client: &EnvgeneClient,
    workspace: &Workspace,
    infos: Vec<ArtifactInfo>,
    auth: Option<&AuthHeader>,
    limit: usize,
) -> Result<Vec<ArtifactInfo>> {
    let outcomes: Vec<Result<ArtifactInfo>> = stream::iter(infos)
        .map(|info| download(client, workspace, info, auth))
        .buffered(limit.max(1))
        .collect()
        .await;

    let mut downloaded = Vec::with_capacity(outcomes.len());
    let mut errors = Vec::new();
    for (i, outcome) in outcomes.into_iter().enumerate() {
        match outcome {
            Ok(info) if info.local_path.is_some() => downloaded.push(info),
            Ok(_) => errors.push(format!("Task {i}: artifact was not downloaded")),
            Err(e) => {
                tracing::error!("Download process with exception: {e}");
                errors.push(format!("Task {i}: artifact was not downloaded"));
            }
        }
    }
    if errors.is_empty() {
        Ok(downloaded)
    } else {
        Err(SearchError::DownloadsFailed(errors))
    }
}

/// Fetches and parses a JSON document, such as a deployment descriptor.
pub async fn download_json_content(
    client: &EnvgeneClient,
    url: &str,
    auth: Option<&AuthHeader>,
) -> Result<serde_json::Value> {
    let url: Url = url.parse()?;
    Ok(client.get_json(&url, auth).await?)
}

#[cfg(test)]
mod tests {
    use miette::{IntoDiagnostic, Result};
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    fn info(url: String, app: &str) -> ArtifactInfo {
        ArtifactInfo::new(url).for_app(app, "1.0.0")
    }

    #[test]
    fn file_names() -> Result<()> {
        assert_eq!(file_name_of("https://h/r/com/app/1.0/app-1.0.zip")?, "app-1.0.zip");
        assert!(file_name_of("https://h/r/").is_err());
        Ok(())
    }

    #[async_std::test]
    async fn batch_download_keeps_order() -> Result<()> {
        let mock_server = MockServer::start().await;
        let tmp = tempfile::tempdir().into_diagnostic()?;
        let workspace = Workspace::new(tmp.path());

        Mock::given(method("GET"))
            .and(path("/r/a-1.0.0.json"))
            .respond_with(ResponseTemplate::new(200).set_body_string("a"))
            .mount(&mock_server)
            .await;
        Mock::given(method("GET"))
            .and(path("/r/b-1.0.0.json"))
            .respond_with(ResponseTemplate::new(200).set_body_string("bb"))
            .mount(&mock_server)
            .await;

        let client = EnvgeneClient::new()?;
        let infos = vec![
            info(format!("{}/r/a-1.0.0.json", mock_server.uri()), "a"),
            info(format!("{}/r/b-1.0.0.json", mock_server.uri()), "b"),
        ];
        let done = download_all_async(&client, &workspace, infos, None, 1).await?;
        assert_eq!(
            done.iter().map(|i| i.local_path.clone().unwrap()).collect::<Vec<_>>(),
            vec![
                tmp.path().join("a").join("1.0.0").join("a-1.0.0.json"),
                tmp.path().join("b").join("1.0.0").join("b-1.0.0.json"),
            ]
        );
        assert_eq!(
            std::fs::read_to_string(tmp.path().join("b/1.0.0/b-1.0.0.json")).into_diagnostic()?,
            "bb"
        );
        Ok(())
    }

    #[async_std::test]
    async fn batch_failures_are_aggregated() -> Result<()> {
        let mock_server = MockServer::start().await;
        let tmp = tempfile::tempdir().into_diagnostic()?;

        Mock::given(method("GET"))
            .and(path("/r/ok-1.0.0.json"))
            .respond_with(ResponseTemplate::new(200).set_body_string("{}"))
            .mount(&mock_server)
            .await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&mock_server)
            .await;

        let infos = vec![
            info(format!("{}/r/missing-1.0.0.json", mock_server.uri()), "x"),
            info(format!("{}/r/ok-1.0.0.json", mock_server.uri()), "ok"),
            info(format!("{}/r/gone-1.0.0.json", mock_server.uri()), "y"),
        ];
        let err = download_all_async(
            &EnvgeneClient::new()?,
            &Workspace::new(tmp.path()),
            infos,
            None,
            tcp_connection_limit(),
        )
        .await
        .unwrap_err();
        assert_eq!(
            err.to_string(),
            "Some tasks failed:\nTask 0: artifact was not downloaded\nTask 2: artifact was not downloaded"
        );
        Ok(())
    }

    #[async_std::test]
    async fn json_content() -> Result<()> {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/dd.json"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "applications": [] })))
            .mount(&mock_server)
            .await;

        let value = download_json_content(
            &EnvgeneClient::new()?,
            &format!("{}/dd.json", mock_server.uri()),
            None,
        )
        .await?;
        assert_eq!(value, json!({ "applications": [] }));
        Ok(())
    }

    #[async_std::test]
    async fn clean_recreates_root() -> Result<()> {
        let tmp = tempfile::tempdir().into_diagnostic()?;
        let workspace = Workspace::new(tmp.path().join("zips"));
        std::fs::create_dir_all(workspace.app_dir("app", "1.0")).into_diagnostic()?;
        std::fs::write(workspace.app_dir("app", "1.0").join("f"), "x").into_diagnostic()?;

        workspace.clean().await?;
        assert!(workspace.root().exists());
        assert_eq!(std::fs::read_dir(workspace.root()).into_diagnostic()?.count(), 0);
        Ok(())
    }
}
