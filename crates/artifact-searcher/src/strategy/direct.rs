use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use envgene_client::{AuthHeader, EnvgeneClient};
use envgene_common::{
    artifact_relative_path, metadata_relative_path, parse_snapshot_version,
    version_to_folder_name, Application, FileExtension, RepositoryRef, SNAPSHOT_SUFFIX,
};
use futures::stream::{self, StreamExt};
use url::Url;

use crate::error::{Result, SearchError};
use crate::request::{ArtifactRequest, ResolvedArtifact};
use crate::strategy::ResolutionStrategy;

const BROWSE_SEGMENTS: [&str; 4] = ["service", "rest", "repository", "browse"];

/// Rewrites a Nexus download base (`.../repository/`) to its browse index
/// view (`.../service/rest/repository/browse/`). Other URLs come back
/// unchanged.
pub fn convert_nexus_repo_url_to_index_view(url: &str) -> String {
    let mut parsed = match Url::parse(url) {
        Ok(parsed) => parsed,
        Err(_) => return url.to_string(),
    };
    let mut parts: Vec<&str> = parsed.path().trim_end_matches('/').split('/').collect();
    if parts.last() != Some(&"repository") {
        return url.to_string();
    }
    parts.pop();
    parts.extend(BROWSE_SEGMENTS);
    let path = format!("{}/", parts.join("/"));
    parsed.set_path(&path);
    parsed.to_string()
}

/// Artifact URL inside `repository`, joined onto the registry domain with
/// RFC 3986 reference resolution.
pub fn create_full_url(
    domain: &Url,
    app: &Application,
    version: &str,
    repository: &str,
    extension: FileExtension,
    classifier: Option<&str>,
    folder: &str,
) -> Result<Url> {
    let path = artifact_relative_path(
        repository,
        &app.group_id,
        &app.artifact_id,
        folder,
        version,
        classifier,
        extension,
    );
    Ok(domain.join(&path)?)
}

/// Repositories probed at once unless configured otherwise; one per role.
pub const DEFAULT_PROBE_CONCURRENCY: usize = 4;

/// Probes every configured repository of the registry over plain HTTP.
///
/// SNAPSHOT versions are first resolved through each repository's
/// `maven-metadata.xml`; then every repository gets a `HEAD` for the
/// artifact. Up to `concurrency` probes of a phase run at once and the first
/// hit in role order wins; probes that have not started by then are
/// skipped. Nexus registries get a second pass through the browse index
/// when the download view finds nothing.
#[derive(Clone, Debug)]
pub struct DirectProbe {
    client: EnvgeneClient,
    concurrency: usize,
}

impl DirectProbe {
    pub fn new(client: EnvgeneClient) -> Self {
        Self {
            client,
            concurrency: DEFAULT_PROBE_CONCURRENCY,
        }
    }

    /// Maximum number of repositories probed at the same time.
    pub fn concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    async fn attempt(
        &self,
        request: &ArtifactRequest,
        domain: &Url,
        auth: Option<&AuthHeader>,
    ) -> Option<(Url, RepositoryRef)> {
        let repos = request.app.registry.maven_config.repositories();
        let probe = Probe {
            client: &self.client,
            request,
            domain,
            auth,
            stop: AtomicBool::new(false),
        };
        let mut version = request.version.clone();

        if version.ends_with(SNAPSHOT_SUFFIX) {
            let probes: Vec<_> = repos.iter().map(|repo| probe.resolve_snapshot(repo)).collect();
            let resolved: Vec<Option<String>> = stream::iter(probes)
                .buffered(self.concurrency)
                .collect()
                .await;
            if let Some(concrete) = resolved.into_iter().flatten().next() {
                tracing::info!("Using resolved snapshot version: {concrete}");
                version = concrete;
            }
            probe.stop.store(false, Ordering::SeqCst);
        }
        let folder = version_to_folder_name(&version);

        let checks: Vec<_> = repos
            .iter()
            .map(|repo| probe.check_url(repo, &version, &folder))
            .collect();
        let found: Vec<Option<(Url, RepositoryRef)>> = stream::iter(checks)
            .buffered(self.concurrency)
            .collect()
            .await;
        found.into_iter().flatten().next()
    }

    async fn is_nexus(&self, request: &ArtifactRequest, domain: &Url) -> bool {
        match request.app.registry.maven_config.is_nexus {
            Some(is_nexus) => is_nexus,
            None => self.client.is_nexus(domain).await,
        }
    }
}

/// One pass of probes against a single repository domain.
struct Probe<'a> {
    client: &'a EnvgeneClient,
    request: &'a ArtifactRequest,
    domain: &'a Url,
    auth: Option<&'a AuthHeader>,
    /// Set by the first hit of the current phase.
    stop: AtomicBool,
}

impl Probe<'_> {
    async fn resolve_snapshot(&self, repo: &RepositoryRef) -> Option<String> {
        if self.stop.load(Ordering::SeqCst) {
            return None;
        }
        let repo_name = repo.name.as_deref()?;
        let request = self.request;
        let app = &request.app;
        let metadata_url = match self.domain.join(&metadata_relative_path(
            repo_name,
            &app.group_id,
            &app.artifact_id,
            &request.version,
        )) {
            Ok(url) => url,
            Err(e) => {
                tracing::warn!("Cannot build metadata URL for {repo_name}: {e}");
                return None;
            }
        };
        let xml = match self.client.get_text(&metadata_url, self.auth).await {
            Ok(xml) => xml,
            Err(e) => {
                tracing::warn!("Failed to fetch maven-metadata.xml: {metadata_url}, {e}");
                return None;
            }
        };
        let resolved = parse_snapshot_version(
            &xml,
            request.extension,
            request.classifier.as_deref(),
            &request.version,
        );
        match &resolved {
            Some(concrete) => {
                self.stop.store(true, Ordering::SeqCst);
                tracing::info!("Resolved snapshot version {} to {concrete}", request.version);
            }
            None => tracing::warn!(
                "No matching snapshotVersion found for {} in {metadata_url}",
                app.artifact_id
            ),
        }
        resolved
    }

    async fn check_url(
        &self,
        repo: &RepositoryRef,
        version: &str,
        folder: &str,
    ) -> Option<(Url, RepositoryRef)> {
        if self.stop.load(Ordering::SeqCst) {
            tracing::debug!("Skipping {} probe, artifact already found", repo.role);
            return None;
        }
        let request = self.request;
        let repo_name = match repo.name.as_deref() {
            Some(name) => name,
            None => {
                tracing::warn!(
                    "Repository {} is not configured for registry {}",
                    repo.role,
                    request.app.registry.name
                );
                return None;
            }
        };
        let full_url = match create_full_url(
            self.domain,
            &request.app,
            version,
            repo_name,
            request.extension,
            request.classifier.as_deref(),
            folder,
        ) {
            Ok(url) => url,
            Err(e) => {
                tracing::warn!("Cannot build artifact URL in {repo_name}: {e}");
                return None;
            }
        };
        match self.client.head_status(&full_url, self.auth).await {
            Ok(status) if status == envgene_client::StatusCode::OK => {
                self.stop.store(true, Ordering::SeqCst);
                tracing::info!(
                    "Successful while checking if artifact is present with URL {full_url}"
                );
                Some((full_url, repo.clone()))
            }
            Ok(status) => {
                tracing::warn!(
                    "Failed while checking if artifact is present with URL {full_url}, {status}"
                );
                None
            }
            Err(e) => {
                tracing::warn!(
                    "Failed while checking if artifact is present with URL {full_url}, {e}"
                );
                None
            }
        }
    }
}

#[async_trait]
impl ResolutionStrategy for DirectProbe {
    fn name(&self) -> &'static str {
        "direct"
    }

    async fn resolve(&self, request: &ArtifactRequest) -> Result<ResolvedArtifact> {
        let original = &request.app.registry.maven_config.repository_domain_name;
        let domain: Url = original.parse()?;
        let auth = request.basic_auth();

        let mut found = self.attempt(request, &domain, auth.as_ref()).await;
        if found.is_none() && self.is_nexus(request, &domain).await {
            let index_view = convert_nexus_repo_url_to_index_view(original);
            if &index_view != original {
                tracing::info!("Retrying artifact check with edited domain: {index_view}");
                found = self
                    .attempt(request, &index_view.parse()?, auth.as_ref())
                    .await;
            } else {
                tracing::debug!("Domain is same after editing, skipping retry");
            }
        }

        match found {
            Some((url, repo)) => Ok(ResolvedArtifact {
                url: url.to_string(),
                repository: Some(repo),
                local_path: None,
                strategy: self.name(),
            }),
            None => Err(SearchError::NoRepositoryMatch {
                registry: request.app.registry.name.clone(),
                coordinate: request.to_string(),
            }),
        }
    }
}
