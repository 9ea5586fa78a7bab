use std::fmt::Debug;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use backon::{ConstantBuilder, Retryable};
use envgene_client::{AuthHeader, EnvgeneClient};
use envgene_cloud_auth::{
    create_maven_searcher, get_gcp_access_token, get_gcp_credentials_from_registry,
    resolve_auth_config, resolve_v2_auth_headers, CloudAuthError, CloudTokenSource,
    MavenSearcher,
};
use envgene_common::{EnvCreds, Provider, Registry};
use url::Url;

use crate::download::{file_name_of, Workspace};
use crate::error::{Result, SearchError};
use crate::request::{ArtifactRequest, ResolvedArtifact};
use crate::strategy::ResolutionStrategy;

pub const DEFAULT_SEARCH_TIMEOUT: Duration = Duration::from_secs(60);
pub const DEFAULT_DOWNLOAD_TIMEOUT: Duration = Duration::from_secs(120);
pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_secs(5);
pub const DEFAULT_MAX_RETRIES: usize = 2;

/// Builds the provider searcher for a V2 registry.
pub trait SearcherFactory: Debug + Send + Sync {
    fn create(
        &self,
        registry: &Registry,
        env_creds: Option<&EnvCreds>,
    ) -> envgene_cloud_auth::Result<Box<dyn MavenSearcher>>;
}

/// Searchers talking to the real provider APIs.
#[derive(Debug)]
pub struct ProviderSearchers {
    client: EnvgeneClient,
    tokens: Arc<dyn CloudTokenSource>,
}

impl ProviderSearchers {
    pub fn new(client: EnvgeneClient, tokens: Arc<dyn CloudTokenSource>) -> Self {
        Self { client, tokens }
    }
}

impl SearcherFactory for ProviderSearchers {
    fn create(
        &self,
        registry: &Registry,
        env_creds: Option<&EnvCreds>,
    ) -> envgene_cloud_auth::Result<Box<dyn MavenSearcher>> {
        create_maven_searcher(registry, env_creds, self.client.clone(), self.tokens.clone())
    }
}

/// Deadlines and retry policy of [`CloudSearch`].
#[derive(Clone, Debug)]
pub struct CloudSearchOpts {
    pub search_timeout: Duration,
    pub download_timeout: Duration,
    pub retry_delay: Duration,
    pub max_retries: usize,
}

impl Default for CloudSearchOpts {
    fn default() -> Self {
        Self {
            search_timeout: DEFAULT_SEARCH_TIMEOUT,
            download_timeout: DEFAULT_DOWNLOAD_TIMEOUT,
            retry_delay: DEFAULT_RETRY_DELAY,
            max_retries: DEFAULT_MAX_RETRIES,
        }
    }
}

/// Cloud-aware resolution for V2 registries: searches with the registry's
/// provider searcher and downloads the newest match into the workspace.
///
/// Fails (so the chain can fall back) for V1 registries, registries without
/// a resolvable auth config, requests without a credential store, and any
/// search or download error that survives the retries.
#[derive(Debug)]
pub struct CloudSearch {
    client: EnvgeneClient,
    tokens: Arc<dyn CloudTokenSource>,
    searchers: Arc<dyn SearcherFactory>,
    workspace: Workspace,
    opts: CloudSearchOpts,
}

impl CloudSearch {
    pub fn new(
        client: EnvgeneClient,
        tokens: Arc<dyn CloudTokenSource>,
        searchers: Arc<dyn SearcherFactory>,
        workspace: Workspace,
        opts: CloudSearchOpts,
    ) -> Self {
        Self {
            client,
            tokens,
            searchers,
            workspace,
            opts,
        }
    }

    fn backoff(&self) -> ConstantBuilder {
        ConstantBuilder::default()
            .with_delay(self.opts.retry_delay)
            .with_max_times(self.opts.max_retries)
    }

    /// Runs `op` under `limit`, retrying transient failures.
    async fn bounded<T, F, Fut>(
        &self,
        what: &'static str,
        limit: Duration,
        mut op: F,
    ) -> envgene_cloud_auth::Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = envgene_cloud_auth::Result<T>>,
    {
        let attempt = || {
            let fut = op();
            async move {
                match async_std::future::timeout(limit, fut).await {
                    Ok(res) => res,
                    Err(_) => Err(CloudAuthError::Timeout(what, limit.as_secs())),
                }
            }
        };
        attempt
            .retry(&self.backoff())
            .when(|e: &CloudAuthError| {
                let transient = e.is_transient();
                if transient {
                    tracing::warn!("Retrying {what} after transient error: {e}");
                }
                transient
            })
            .await
    }

    async fn direct_download(
        &self,
        registry: &Registry,
        env_creds: &EnvCreds,
        url: &str,
        dest: &Path,
    ) -> Result<u64> {
        let auth = self.fallback_auth(registry, env_creds).await?;
        let url: Url = url.parse()?;
        Ok(self.client.download_to(&url, auth.as_ref(), dest).await?)
    }

    /// Headers for the direct download fallback. GCP gets a freshly minted
    /// token since the searcher's may be what just expired.
    async fn fallback_auth(
        &self,
        registry: &Registry,
        env_creds: &EnvCreds,
    ) -> Result<Option<AuthHeader>> {
        let is_gcp = resolve_auth_config(registry, "maven")
            .map(|cfg| cfg.provider == Some(Provider::Gcp))
            .unwrap_or(false);
        if is_gcp {
            if let Some(sa_json) = get_gcp_credentials_from_registry(registry, Some(env_creds)) {
                if let Some(token) = get_gcp_access_token(self.tokens.as_ref(), &sa_json).await {
                    return Ok(Some(AuthHeader::bearer(token)));
                }
            }
        }
        Ok(resolve_v2_auth_headers(registry, Some(env_creds), self.tokens.as_ref()).await?)
    }
}

#[async_trait]
impl ResolutionStrategy for CloudSearch {
    fn name(&self) -> &'static str {
        "cloud"
    }

    async fn resolve(&self, request: &ArtifactRequest) -> Result<ResolvedArtifact> {
        let registry = &request.app.registry;
        if !registry.is_v2() {
            return Err(SearchError::NotApplicable(format!(
                "registry '{}' is version {}",
                registry.name, registry.version
            )));
        }
        if resolve_auth_config(registry, "maven").is_none() {
            return Err(SearchError::NotApplicable(format!(
                "no authConfig resolved for registry '{}'",
                registry.name
            )));
        }
        let env_creds = request.env_creds.as_ref().ok_or_else(|| {
            SearchError::NotApplicable(format!(
                "no credentials supplied for V2 registry '{}'",
                registry.name
            ))
        })?;

        let searcher = self.searchers.create(registry, Some(env_creds))?;
        tracing::info!(
            "Searching {request} with {} searcher",
            searcher.provider()
        );

        let query = request.query();
        let (searcher_ref, query_ref) = (searcher.as_ref(), &query);
        let urls = self
            .bounded("search", self.opts.search_timeout, || async move {
                searcher_ref.find_artifact_urls(query_ref).await
            })
            .await?;
        let url = urls
            .into_iter()
            .next()
            .ok_or_else(|| SearchError::NoSearchResults(request.to_string()))?;

        let dest: PathBuf = self
            .workspace
            .app_dir(&request.app.name, &request.version)
            .join(file_name_of(&url)?);
        let (url_ref, dest_ref) = (url.as_str(), dest.as_path());
        let downloaded = self
            .bounded("download", self.opts.download_timeout, || async move {
                searcher_ref.download_artifact(url_ref, dest_ref).await
            })
            .await;
        if let Err(e) = downloaded {
            tracing::warn!("Searcher download of {url} failed ({e}), trying direct download");
            self.direct_download(registry, env_creds, &url, &dest).await?;
        }

        Ok(ResolvedArtifact {
            url,
            repository: None,
            local_path: Some(dest),
            strategy: self.name(),
        })
    }
}
