use std::path::PathBuf;

use envgene_common::FileExtension;
use miette::Diagnostic;
use thiserror::Error;

#[derive(Debug, Error, Diagnostic)]
pub enum EnvgeneArtifactsError {
    /// `--unzip` only makes sense for zip archives.
    #[error("Cannot unzip a `{0}` artifact.")]
    #[diagnostic(
        code(envgene_artifact::download::not_a_zip),
        help("Pass `--extension zip`, or drop `--unzip`.")
    )]
    NotAnArchive(FileExtension),

    /// A definition file could not be parsed.
    #[error("Failed to parse {}: {message}", .path.display())]
    #[diagnostic(
        code(envgene_artifact::bad_definition),
        help("Application, registry and credential files are YAML (or JSON) documents.")
    )]
    BadDefinition { path: PathBuf, message: String },
}
