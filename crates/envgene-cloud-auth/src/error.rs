use envgene_client::{ClientError, StatusCode};
use miette::Diagnostic;
use thiserror::Error;

/// Error type returned by header resolution, token acquisition, and
/// provider searches.
#[derive(Debug, Error, Diagnostic)]
pub enum CloudAuthError {
    /// The registry's maven config references an auth config it does not
    /// define.
    #[error("AuthConfig '{reference}' not found in registry '{registry}'. Available: {available:?}")]
    #[diagnostic(code(envgene_cloud_auth::missing_auth_config))]
    MissingAuthConfig {
        reference: String,
        registry: String,
        available: Vec<String>,
    },

    /// No usable auth config could be resolved for a cloud search.
    #[error("Could not resolve authConfig for maven artifacts")]
    #[diagnostic(code(envgene_cloud_auth::no_auth_config))]
    NoAuthConfig,

    #[error("Credential '{0}' not found in decrypted credentials")]
    #[diagnostic(
        code(envgene_cloud_auth::credential_not_found),
        help("Check that the credentialsId of the authConfig is present in the credential store.")
    )]
    CredentialNotFound(String),

    #[error("AWS provider requires authMethod='secret' or 'assume_role', got '{0}'")]
    #[diagnostic(code(envgene_cloud_auth::aws::auth_method))]
    InvalidAwsAuthMethod(String),

    #[error("AWS authConfig must specify 'awsRegion'")]
    #[diagnostic(code(envgene_cloud_auth::aws::missing_region))]
    MissingAwsRegion,

    #[error("AWS authConfig must specify 'awsDomain'")]
    #[diagnostic(code(envgene_cloud_auth::aws::missing_domain))]
    MissingAwsDomain,

    #[error("AWS auth requires both username (access key) and password (secret key) in credentials")]
    #[diagnostic(code(envgene_cloud_auth::aws::missing_keys))]
    MissingAwsKeys,

    #[error("GCP federation (OIDC) is not yet implemented for registry '{0}'")]
    #[diagnostic(code(envgene_cloud_auth::gcp::federation))]
    GcpFederationNotImplemented(String),

    #[error("GCP provider requires authMethod='service_account' or 'federation', got '{0}'")]
    #[diagnostic(code(envgene_cloud_auth::gcp::auth_method))]
    InvalidGcpAuthMethod(String),

    #[error("GCP service_account requires credential with 'secret' field containing SA JSON key")]
    #[diagnostic(code(envgene_cloud_auth::gcp::missing_secret))]
    MissingGcpSecret,

    #[error("GCP service account key must be valid JSON")]
    #[diagnostic(code(envgene_cloud_auth::gcp::invalid_key))]
    InvalidServiceAccountKey(#[source] serde_json::Error),

    #[error("GCP auth requires gcpRegProject in authConfig")]
    #[diagnostic(code(envgene_cloud_auth::gcp::missing_project))]
    MissingGcpProject,

    #[error("Azure auth is not yet implemented for registry '{0}'")]
    #[diagnostic(code(envgene_cloud_auth::azure::not_implemented))]
    AzureNotImplemented(String),

    #[error("Basic auth requires both username and password in credentials")]
    #[diagnostic(code(envgene_cloud_auth::basic::missing_credentials))]
    MissingBasicCredentials,

    #[error("Provider field is required in authConfig for registry '{0}'")]
    #[diagnostic(code(envgene_cloud_auth::missing_provider))]
    MissingProvider(String),

    #[error("Unsupported provider: {0}")]
    #[diagnostic(code(envgene_cloud_auth::unsupported_provider))]
    UnsupportedProvider(String),

    /// AWS and GCP searches cannot run without credentials.
    #[error("{0} requires credentials - anonymous access not supported")]
    #[diagnostic(code(envgene_cloud_auth::anonymous_cloud_access))]
    AnonymousCloudAccess(String),

    /// A cloud token endpoint rejected the request or answered with
    /// something unexpected.
    #[error("{provider} token request failed{}: {message}", .status.map(|s| format!(" ({s})")).unwrap_or_default())]
    #[diagnostic(code(envgene_cloud_auth::token_request))]
    TokenRequest {
        provider: &'static str,
        status: Option<StatusCode>,
        message: String,
    },

    /// Signing a service-account assertion failed.
    #[error(transparent)]
    #[diagnostic(code(envgene_cloud_auth::gcp::jwt))]
    JwtError(#[from] jsonwebtoken::errors::Error),

    /// The Nexus search index does not know about the requested coordinate.
    #[error("Search index returned 404 for {0}")]
    #[diagnostic(code(envgene_cloud_auth::search::index_miss))]
    SearchIndexMiss(String),

    /// A provider search answered with a body that could not be understood.
    #[error("Unexpected search response from {url}: {message}")]
    #[diagnostic(code(envgene_cloud_auth::search::bad_response))]
    BadSearchResponse { url: String, message: String },

    #[error("{0} timed out after {1}s")]
    #[diagnostic(code(envgene_cloud_auth::timeout))]
    Timeout(&'static str, u64),

    #[error(transparent)]
    #[diagnostic(code(envgene_cloud_auth::bad_url))]
    UrlError(#[from] url::ParseError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    ClientError(#[from] ClientError),
}

impl CloudAuthError {
    /// Whether the failed operation may succeed when retried: timeouts,
    /// 401/403 responses, and expired tokens.
    pub fn is_transient(&self) -> bool {
        match self {
            CloudAuthError::Timeout(..) => true,
            CloudAuthError::ClientError(err) => err.is_transient(),
            CloudAuthError::TokenRequest {
                status, message, ..
            } => {
                matches!(
                    status,
                    Some(StatusCode::UNAUTHORIZED) | Some(StatusCode::FORBIDDEN)
                ) || message.to_lowercase().contains("expired")
            }
            _ => false,
        }
    }
}

/// The result type returned by calls to this library
pub type Result<T> = std::result::Result<T, CloudAuthError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transient_classification() {
        assert!(CloudAuthError::Timeout("search", 60).is_transient());
        assert!(CloudAuthError::TokenRequest {
            provider: "AWS",
            status: Some(StatusCode::FORBIDDEN),
            message: "denied".into(),
        }
        .is_transient());
        assert!(CloudAuthError::TokenRequest {
            provider: "GCP",
            status: Some(StatusCode::BAD_REQUEST),
            message: "Token has Expired".into(),
        }
        .is_transient());
        assert!(CloudAuthError::ClientError(ClientError::BadStatus {
            url: "https://example.com".into(),
            status: StatusCode::UNAUTHORIZED,
        })
        .is_transient());
        assert!(!CloudAuthError::SearchIndexMiss("x".into()).is_transient());
        assert!(!CloudAuthError::MissingAwsRegion.is_transient());
    }
}
