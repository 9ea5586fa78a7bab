//! Auth config and credential resolution shared by header resolution and
//! cloud searches.

use std::sync::Arc;
use std::time::Duration;

use envgene_client::EnvgeneClient;
use envgene_common::{AuthConfig, AuthMethod, Credentials, EnvCreds, Provider, Registry};
use once_cell::sync::Lazy;
use regex::Regex;

use crate::aws::AwsCredentials;
use crate::error::{CloudAuthError, Result};
use crate::searcher::{
    ArtifactorySearcher, AwsCodeArtifactSearcher, CodeArtifactRepository,
    GcpArtifactRegistrySearcher, MavenSearcher, NexusSearcher,
};
use crate::token::CloudTokenSource;

/// Connect and read deadlines of the client used by cloud searches.
pub const DEFAULT_SEARCHER_TIMEOUT: (Duration, Duration) =
    (Duration::from_secs(30), Duration::from_secs(60));

pub const DEFAULT_AWS_REGION: &str = "us-east-1";

static AWS_REGION: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\.([a-z0-9-]+)\.amazonaws\.com").expect("valid regex"));
static GCP_REGION: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"([a-z0-9-]+)-maven\.pkg\.dev").expect("valid regex"));

/// The auth config a registry's maven settings point at. Only `maven`
/// artifacts carry auth config references.
pub fn resolve_auth_config<'a>(registry: &'a Registry, artifact_type: &str) -> Option<&'a AuthConfig> {
    if artifact_type != "maven" {
        return None;
    }
    let auth_ref = registry
        .maven_config
        .auth_config
        .as_deref()
        .filter(|r| !r.is_empty())?;
    if registry.auth_config.is_empty() {
        tracing::warn!("No authConfig dict but maven config references '{auth_ref}'");
        return None;
    }
    match registry.auth_config.get(auth_ref) {
        Some(auth_config) => {
            tracing::info!(
                "Resolved authConfig '{auth_ref}' -> provider: {}",
                auth_config
                    .provider
                    .map(|p| p.to_string())
                    .unwrap_or_else(|| "none".into())
            );
            Some(auth_config)
        }
        None => {
            let mut available: Vec<&String> = registry.auth_config.keys().collect();
            available.sort();
            tracing::error!("AuthConfig '{auth_ref}' not found. Available: {available:?}");
            None
        }
    }
}

/// Decodes the credential an auth config refers to. A config without a
/// credentials id is anonymous.
pub(crate) fn lookup_credentials(
    auth_config: &AuthConfig,
    env_creds: Option<&EnvCreds>,
) -> Result<Credentials> {
    let cred_id = match auth_config.credentials_id.as_deref().filter(|c| !c.is_empty()) {
        Some(cred_id) => cred_id,
        None => {
            tracing::info!("No credentialsId specified, using anonymous access");
            return Ok(Credentials::Anonymous);
        }
    };
    env_creds
        .and_then(|creds| creds.get(cred_id))
        .ok_or_else(|| CloudAuthError::CredentialNotFound(cred_id.into()))
}

/// Resolves the credentials of `auth_config`, checking that they have the
/// shape its provider needs. Anonymous credentials are returned as-is.
pub fn resolve_credentials(
    auth_config: &AuthConfig,
    env_creds: Option<&EnvCreds>,
) -> Result<Credentials> {
    let creds = lookup_credentials(auth_config, env_creds)?;
    if creds.is_anonymous() {
        return Ok(creds);
    }
    match (auth_config.provider, &auth_config.auth_method) {
        (Some(Provider::Aws), _) if !matches!(creds, Credentials::UsernamePassword { .. }) => {
            Err(CloudAuthError::MissingAwsKeys)
        }
        (Some(Provider::Gcp), Some(AuthMethod::ServiceAccount)) if creds.secret().is_none() => {
            Err(CloudAuthError::MissingGcpSecret)
        }
        _ => Ok(creds),
    }
}

/// Repository name encoded in a registry URL: CodeArtifact
/// `.../maven/<repo>/`, Artifact Registry `<region>-maven.pkg.dev/<project>/<repo>`,
/// otherwise the last path segment.
pub fn extract_repository_name(url: &str) -> String {
    let url = url.trim_end_matches('/');
    if url.contains("codeartifact") {
        if let Some((_, rest)) = url.split_once("/maven/") {
            return rest.split('/').next().unwrap_or_default().to_string();
        }
    }
    if url.contains("pkg.dev") {
        if let Some(repo) = url.split('/').nth(4) {
            return repo.to_string();
        }
    }
    url.rsplit('/').next().unwrap_or_default().to_string()
}

/// Region of a registry. An explicit `awsRegion` wins for AWS configs,
/// then the region embedded in AWS or Artifact Registry host names.
pub fn extract_region(url: &str, auth_config: &AuthConfig) -> String {
    if auth_config.provider == Some(Provider::Aws) {
        if let Some(region) = auth_config.aws_region.as_deref().filter(|r| !r.is_empty()) {
            return region.to_string();
        }
    }
    if let Some(m) = AWS_REGION.captures(url).and_then(|c| c.get(1)) {
        return m.as_str().to_string();
    }
    if let Some(m) = GCP_REGION.captures(url).and_then(|c| c.get(1)) {
        return m.as_str().to_string();
    }
    tracing::warn!("Could not extract region from URL '{url}', using default '{DEFAULT_AWS_REGION}'");
    DEFAULT_AWS_REGION.into()
}

/// Account id of a CodeArtifact domain, from a repository host of the form
/// `<domain>-<owner>.d.codeartifact.<region>.amazonaws.com`.
pub fn extract_domain_owner(url: &str, domain: &str) -> Option<String> {
    let host = url::Url::parse(url).ok()?.host_str()?.to_string();
    let rest = host.strip_prefix(domain)?.strip_prefix('-')?;
    let (owner, _) = rest.split_once(".d.codeartifact.")?;
    (!owner.is_empty() && owner.chars().all(|c| c.is_ascii_digit())).then(|| owner.to_string())
}

/// Builds the provider searcher for a V2 registry.
pub fn create_maven_searcher(
    registry: &Registry,
    env_creds: Option<&EnvCreds>,
    client: EnvgeneClient,
    tokens: Arc<dyn CloudTokenSource>,
) -> Result<Box<dyn MavenSearcher>> {
    let auth_config = resolve_auth_config(registry, "maven").ok_or(CloudAuthError::NoAuthConfig)?;
    let registry_url = registry.maven_config.repository_domain_name.as_str();

    let provider = match auth_config.provider {
        Some(provider) => provider,
        None => {
            tracing::error!(
                "V2 fallback: provider field is required in authConfig for registry '{}'",
                registry.name
            );
            return Err(CloudAuthError::MissingProvider(registry.name.clone()));
        }
    };
    if provider == Provider::Azure {
        return Err(CloudAuthError::UnsupportedProvider(provider.to_string()));
    }

    let creds = resolve_credentials(auth_config, env_creds)?;
    if matches!(provider, Provider::Aws | Provider::Gcp) && creds.is_anonymous() {
        return Err(CloudAuthError::AnonymousCloudAccess(
            provider.as_str().to_uppercase(),
        ));
    }
    let base = url::Url::parse(registry_url)?;

    Ok(match provider {
        Provider::Aws => {
            let domain = auth_config
                .aws_domain
                .as_deref()
                .filter(|d| !d.is_empty())
                .ok_or(CloudAuthError::MissingAwsDomain)?;
            let (access_key, secret_key) =
                creds.username_password().ok_or(CloudAuthError::MissingAwsKeys)?;
            let region = extract_region(registry_url, auth_config);
            let repository = extract_repository_name(registry_url);
            let owner = auth_config
                .aws_domain_owner
                .clone()
                .or_else(|| extract_domain_owner(registry_url, domain));
            tracing::info!("Configuring AWS CodeArtifact: domain={domain}, region={region}");
            Box::new(AwsCodeArtifactSearcher::new(
                client,
                tokens,
                base,
                AwsCredentials::new(access_key, secret_key),
                CodeArtifactRepository::new(domain, region, repository).domain_owner(owner),
            )?)
        }
        Provider::Gcp => {
            if auth_config.auth_method != Some(AuthMethod::ServiceAccount) {
                return Err(CloudAuthError::InvalidGcpAuthMethod(
                    auth_config.method_name().into(),
                ));
            }
            let project = auth_config
                .gcp_reg_project
                .as_deref()
                .filter(|p| !p.is_empty())
                .ok_or(CloudAuthError::MissingGcpProject)?;
            let sa_json = creds
                .secret()
                .map(|s| s.as_json_string())
                .ok_or(CloudAuthError::MissingGcpSecret)?;
            let region = extract_region(registry_url, auth_config);
            let repository = extract_repository_name(registry_url);
            tracing::info!("Configuring GCP Artifact Registry: project={project}, region={region}");
            Box::new(GcpArtifactRegistrySearcher::new(
                client, tokens, sa_json, project, &region, &repository,
            )?)
        }
        Provider::Artifactory => {
            if creds.is_anonymous() {
                tracing::info!("Configuring Artifactory with anonymous access (no credentials)");
            }
            Box::new(ArtifactorySearcher::new(client, base, basic_from(&creds)))
        }
        Provider::Nexus | Provider::Azure => {
            if creds.is_anonymous() {
                tracing::info!("Configuring Nexus with anonymous access (no credentials)");
            }
            Box::new(NexusSearcher::new(client, base, basic_from(&creds)))
        }
    })
}

fn basic_from(creds: &Credentials) -> Option<envgene_client::AuthHeader> {
    match creds {
        Credentials::UsernamePassword { username, password } => {
            Some(envgene_client::AuthHeader::basic(username, password))
        }
        _ => None,
    }
}

/// Fresh access token for a service account JSON key, or `None` (logged)
/// if the exchange fails.
pub async fn get_gcp_access_token(
    tokens: &dyn CloudTokenSource,
    service_account_json: &str,
) -> Option<String> {
    match tokens.gcp_access_token(service_account_json).await {
        Ok(token) => Some(token),
        Err(e) => {
            tracing::error!("Failed to generate GCP access token: {e}");
            None
        }
    }
}

/// Service account JSON of a GCP registry, if it has one.
pub fn get_gcp_credentials_from_registry(
    registry: &Registry,
    env_creds: Option<&EnvCreds>,
) -> Option<String> {
    let auth_config = resolve_auth_config(registry, "maven")?;
    if auth_config.provider != Some(Provider::Gcp) {
        return None;
    }
    resolve_credentials(auth_config, env_creds)
        .ok()?
        .secret()
        .map(|s| s.as_json_string())
}
