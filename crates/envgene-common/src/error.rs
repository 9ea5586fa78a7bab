use miette::Diagnostic;
use thiserror::Error;

#[derive(Debug, Error, Diagnostic)]
pub enum CommonError {
    /// A credential entry could not be decoded into a known shape.
    #[error("Credential '{0}' has an unsupported shape: {1}")]
    #[diagnostic(
        code(envgene_common::invalid_credential),
        help("Credential entries carry a `type` of usernamePassword or secret, and a `data` payload.")
    )]
    InvalidCredential(String, String),

    /// Unknown file extension requested for an artifact.
    #[error("Unsupported artifact extension `{0}`.")]
    #[diagnostic(code(envgene_common::unsupported_extension))]
    UnsupportedExtension(String),

    /// Unknown registry provider name.
    #[error("Unsupported provider: {0}")]
    #[diagnostic(code(envgene_common::unsupported_provider))]
    UnsupportedProvider(String),
}
