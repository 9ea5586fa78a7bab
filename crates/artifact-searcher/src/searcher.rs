use std::path::Path;
use std::sync::Arc;

use envgene_client::{AuthHeader, EnvgeneClient};
use envgene_cloud_auth::{CloudTokenSource, HttpTokenSource};
use envgene_common::ArtifactInfo;

use crate::download::{self, Workspace};
use crate::error::{Result, SearchError};
use crate::extract;
use crate::request::{ArtifactRequest, ResolvedArtifact};
use crate::strategy::{
    CloudSearch, CloudSearchOpts, DirectProbe, ProviderSearchers, SearcherFactory, StrategyChain,
    DEFAULT_PROBE_CONCURRENCY,
};

/// Build a new [`ArtifactSearcher`] with specified options.
#[derive(Clone, Debug, Default)]
pub struct ArtifactSearcherOpts {
    client: Option<EnvgeneClient>,
    tokens: Option<Arc<dyn CloudTokenSource>>,
    searchers: Option<Arc<dyn SearcherFactory>>,
    workspace: Option<Workspace>,
    cloud: CloudSearchOpts,
    connection_limit: Option<usize>,
    probe_concurrency: Option<usize>,
}

impl ArtifactSearcherOpts {
    pub fn new() -> Self {
        Default::default()
    }

    pub fn client(mut self, client: EnvgeneClient) -> Self {
        self.client = Some(client);
        self
    }

    /// Source of AWS and GCP access tokens. Defaults to the providers' HTTP
    /// APIs.
    pub fn tokens(mut self, tokens: Arc<dyn CloudTokenSource>) -> Self {
        self.tokens = Some(tokens);
        self
    }

    /// Builds the provider searchers used for V2 registries.
    pub fn searchers(mut self, searchers: Arc<dyn SearcherFactory>) -> Self {
        self.searchers = Some(searchers);
        self
    }

    pub fn workspace(mut self, workspace: Workspace) -> Self {
        self.workspace = Some(workspace);
        self
    }

    pub fn cloud(mut self, cloud: CloudSearchOpts) -> Self {
        self.cloud = cloud;
        self
    }

    pub fn connection_limit(mut self, limit: usize) -> Self {
        self.connection_limit = Some(limit);
        self
    }

    /// Number of repositories probed at once when checking a registry
    /// directly.
    pub fn probe_concurrency(mut self, concurrency: usize) -> Self {
        self.probe_concurrency = Some(concurrency);
        self
    }

    pub fn build(self) -> Result<ArtifactSearcher> {
        let client = match self.client {
            Some(client) => client,
            None => EnvgeneClient::new()?,
        };
        let tokens = self
            .tokens
            .unwrap_or_else(|| Arc::new(HttpTokenSource::new(client.clone())));
        let searchers = self
            .searchers
            .unwrap_or_else(|| Arc::new(ProviderSearchers::new(client.clone(), tokens.clone())));
        let workspace = self.workspace.unwrap_or_else(Workspace::from_env);
        let chain = StrategyChain::new()
            .then(CloudSearch::new(
                client.clone(),
                tokens,
                searchers,
                workspace.clone(),
                self.cloud,
            ))
            .then(
                DirectProbe::new(client.clone())
                    .concurrency(self.probe_concurrency.unwrap_or(DEFAULT_PROBE_CONCURRENCY)),
            );
        Ok(ArtifactSearcher {
            client,
            workspace,
            chain,
            connection_limit: self
                .connection_limit
                .unwrap_or_else(download::tcp_connection_limit),
        })
    }
}

/// Toplevel entry point for locating and fetching application artifacts.
///
/// Resolution tries cloud-aware search first (V2 registries only) and falls
/// back to probing the registry's repositories directly.
#[derive(Clone, Debug)]
pub struct ArtifactSearcher {
    client: EnvgeneClient,
    workspace: Workspace,
    chain: StrategyChain,
    connection_limit: usize,
}

impl ArtifactSearcher {
    /// Creates a searcher with default settings. To configure it, use
    /// [`ArtifactSearcherOpts`].
    pub fn new() -> Result<Self> {
        ArtifactSearcherOpts::new().build()
    }

    pub fn client(&self) -> &EnvgeneClient {
        &self.client
    }

    pub fn workspace(&self) -> &Workspace {
        &self.workspace
    }

    /// Names of the resolution strategies, in the order they are tried.
    pub fn strategies(&self) -> Vec<&'static str> {
        self.chain.names()
    }

    /// Locates an artifact. Every failure along the way is logged, and
    /// `None` means no strategy found it.
    pub async fn check_artifact_async(&self, request: &ArtifactRequest) -> Option<ResolvedArtifact> {
        let resolved = self.chain.resolve(request).await;
        if resolved.is_none() {
            tracing::warn!("Artifact not found: {request}");
        }
        resolved
    }

    /// Like [`ArtifactSearcher::check_artifact_async`], but a miss is an
    /// error.
    pub async fn require_artifact(&self, request: &ArtifactRequest) -> Result<ResolvedArtifact> {
        self.check_artifact_async(request)
            .await
            .ok_or_else(|| SearchError::ArtifactNotFound(request.to_string()))
    }

    /// Makes sure a resolved artifact exists in the workspace, downloading
    /// it unless resolution already did.
    pub async fn fetch(
        &self,
        request: &ArtifactRequest,
        resolved: &ResolvedArtifact,
    ) -> Result<ArtifactInfo> {
        let mut info = ArtifactInfo::new(&resolved.url).for_app(&request.app.name, &request.version);
        if let Some(local_path) = &resolved.local_path {
            info.local_path = Some(local_path.clone());
            return Ok(info);
        }
        download::download(&self.client, &self.workspace, info, request.basic_auth().as_ref()).await
    }

    pub async fn download(
        &self,
        info: ArtifactInfo,
        auth: Option<&AuthHeader>,
    ) -> Result<ArtifactInfo> {
        download::download(&self.client, &self.workspace, info, auth).await
    }

    pub async fn download_all_async(
        &self,
        infos: Vec<ArtifactInfo>,
        auth: Option<&AuthHeader>,
    ) -> Result<Vec<ArtifactInfo>> {
        download::download_all_async(
            &self.client,
            &self.workspace,
            infos,
            auth,
            self.connection_limit,
        )
        .await
    }

    pub async fn download_json_content(
        &self,
        url: &str,
        auth: Option<&AuthHeader>,
    ) -> Result<serde_json::Value> {
        download::download_json_content(&self.client, url, auth).await
    }

    pub async fn unzip_file(
        &self,
        artifact_id: &str,
        app_name: &str,
        app_version: &str,
        zip_path: impl AsRef<Path>,
    ) -> Result<usize> {
        extract::unzip_file(&self.workspace, artifact_id, app_name, app_version, zip_path).await
    }

    pub async fn clean_temp_dir(&self) -> Result<()> {
        self.workspace.clean().await
    }
}
