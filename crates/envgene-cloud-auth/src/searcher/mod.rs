use std::fmt::{self, Debug};
use std::path::Path;

use async_trait::async_trait;
use envgene_client::{AuthHeader, EnvgeneClient};
use envgene_common::{FileExtension, Provider, SNAPSHOT_SUFFIX};
use url::Url;

use crate::error::Result;

pub use artifactory::ArtifactorySearcher;
pub use aws::{AwsCodeArtifactSearcher, CodeArtifactRepository};
pub use gcp::GcpArtifactRegistrySearcher;
pub use nexus::NexusSearcher;

mod artifactory;
mod aws;
mod gcp;
mod nexus;

/// A Maven coordinate plus the file wanted from it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ArtifactQuery {
    pub group_id: String,
    pub artifact_id: String,
    pub version: String,
    pub extension: FileExtension,
    pub classifier: Option<String>,
}

impl ArtifactQuery {
    pub fn new(
        group_id: impl Into<String>,
        artifact_id: impl Into<String>,
        version: impl Into<String>,
        extension: FileExtension,
    ) -> Self {
        Self {
            group_id: group_id.into(),
            artifact_id: artifact_id.into(),
            version: version.into(),
            extension,
            classifier: None,
        }
    }

    pub fn classifier(mut self, classifier: impl Into<String>) -> Self {
        self.classifier = Some(classifier.into()).filter(|c: &String| !c.is_empty());
        self
    }

    pub fn is_snapshot(&self) -> bool {
        self.version.ends_with(SNAPSHOT_SUFFIX)
    }

    /// File name suffix every matching asset ends with: `-<classifier>.<ext>`
    /// or `.<ext>`.
    pub(crate) fn file_suffix(&self) -> String {
        match &self.classifier {
            Some(classifier) => format!("-{classifier}.{}", self.extension),
            None => format!(".{}", self.extension),
        }
    }
}

impl fmt::Display for ArtifactQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.group_id, self.artifact_id, self.version)?;
        if let Some(classifier) = &self.classifier {
            write!(f, ":{classifier}")?;
        }
        write!(f, "@{}", self.extension)
    }
}

/// Provider-aware artifact search against one registry.
#[async_trait]
pub trait MavenSearcher: Debug + Send + Sync {
    fn provider(&self) -> Provider;

    /// Download URLs (or, for CodeArtifact, URLs rebuilt from asset names)
    /// of files matching `query`, newest first. Empty when nothing matches.
    async fn find_artifact_urls(&self, query: &ArtifactQuery) -> Result<Vec<String>>;

    /// Downloads `url` to `dest` with the searcher's own credentials.
    async fn download_artifact(&self, url: &str, dest: &Path) -> Result<u64>;
}

pub(crate) async fn download_with(
    client: &EnvgeneClient,
    url: &str,
    auth: Option<&AuthHeader>,
    dest: &Path,
) -> Result<u64> {
    let url: Url = url.parse()?;
    Ok(client.download_to(&url, auth, dest).await?)
}

/// Ensures `url` ends in `/` so relative joins append rather than replace
/// its last segment.
pub(crate) fn as_directory(mut url: Url) -> Url {
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    url
}
