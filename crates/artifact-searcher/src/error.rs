use std::path::PathBuf;

use miette::Diagnostic;
use thiserror::Error;

/// Error type returned by artifact resolution and download calls.
#[derive(Debug, Error, Diagnostic)]
pub enum SearchError {
    /// No resolution strategy found the artifact.
    ///
    /// Check that the version exists in one of the registry's repositories
    /// and that the supplied credentials can read it.
    #[error("Artifact `{0}` was not found in any configured repository.")]
    #[diagnostic(
        code(artifact_searcher::not_found),
        help("Check the registry's targetSnapshot/targetStaging/targetRelease/snapshotGroup settings.")
    )]
    ArtifactNotFound(String),

    /// Direct probing found nothing in any repository.
    #[error("No repository of registry '{registry}' serves `{coordinate}`.")]
    #[diagnostic(code(artifact_searcher::v1::not_found))]
    NoRepositoryMatch { registry: String, coordinate: String },

    /// A strategy does not apply to the registry at hand.
    #[error("{0}")]
    #[diagnostic(code(artifact_searcher::not_applicable))]
    NotApplicable(String),

    /// A cloud search succeeded but matched no files.
    #[error("Search returned no artifacts for `{0}`.")]
    #[diagnostic(code(artifact_searcher::v2::no_results))]
    NoSearchResults(String),

    /// Some downloads of a batch did not produce a file.
    #[error("Some tasks failed:\n{}", .0.join("\n"))]
    #[diagnostic(code(artifact_searcher::download::batch))]
    DownloadsFailed(Vec<String>),

    /// An artifact URL has no file name to save it under.
    #[error("Cannot derive a file name from `{0}`.")]
    #[diagnostic(code(artifact_searcher::download::file_name))]
    NoFileName(String),

    #[error("Failed to read zip archive {}", .1.display())]
    #[diagnostic(code(artifact_searcher::zip))]
    ZipError(#[source] zip::result::ZipError, PathBuf),

    #[error("{0}")]
    #[diagnostic(code(artifact_searcher::io::generic))]
    IoError(String, #[source] std::io::Error),

    #[error(transparent)]
    #[diagnostic(transparent)]
    CloudAuthError(#[from] envgene_cloud_auth::CloudAuthError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    ClientError(#[from] envgene_client::ClientError),

    #[error(transparent)]
    #[diagnostic(code(artifact_searcher::bad_url))]
    UrlError(#[from] url::ParseError),
}

/// The result type returned by calls to this library
pub type Result<T> = std::result::Result<T, SearchError>;

pub trait IoContext {
    type T;

    fn io_context(self, context: impl FnOnce() -> String) -> Result<Self::T>;
}

impl<T> IoContext for std::result::Result<T, std::io::Error> {
    type T = T;

    fn io_context(self, context: impl FnOnce() -> String) -> Result<Self::T> {
        self.map_err(|err| SearchError::IoError(context(), err))
    }
}
