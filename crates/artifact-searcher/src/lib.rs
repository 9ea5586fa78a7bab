//! Locates and fetches EnvGene application artifacts in Maven registries.
//!
//! An [`ArtifactSearcher`] takes an [`ArtifactRequest`] (application,
//! version, extension, optional classifier and credentials) and walks its
//! resolution strategies in order:
//!
//! 1. [`CloudSearch`]: for V2 registries, search with the registry
//!    provider's API (AWS CodeArtifact, GCP Artifact Registry, Nexus or
//!    Artifactory) and download the newest match into the [`Workspace`].
//! 2. [`DirectProbe`]: `HEAD` the artifact in every configured repository,
//!    resolving `-SNAPSHOT` versions through `maven-metadata.xml` first.
//!
//! ```no_run
//! # use artifact_searcher::{ArtifactRequest, ArtifactSearcher};
//! # use envgene_common::{Application, FileExtension};
//! # async fn example(app: Application) -> artifact_searcher::Result<()> {
//! let searcher = ArtifactSearcher::new()?;
//! let request = ArtifactRequest::new(app, FileExtension::Json, "1.0.0-SNAPSHOT");
//! let resolved = searcher.require_artifact(&request).await?;
//! println!("{}", resolved.url);
//! # Ok(())
//! # }
//! ```

pub use aql::{check_artifacts_by_aql, create_aql_artifact, create_aql_artifacts};
pub use download::{
    download, download_all_async, download_json_content, tcp_connection_limit, Workspace,
    TCP_CONNECTION_LIMIT_ENV, WORKSPACE_ENV,
};
pub use error::{Result, SearchError};
pub use extract::unzip_file;
pub use request::{ArtifactRequest, ResolvedArtifact};
pub use searcher::{ArtifactSearcher, ArtifactSearcherOpts};
pub use strategy::*;

mod aql;
mod download;
mod error;
mod extract;
mod request;
mod searcher;
mod strategy;
