use envgene_client::AuthHeader;
use envgene_common::{AuthConfig, AuthMethod, Credentials, EnvCreds, Provider, Registry};

use crate::aws::AwsCredentials;
use crate::error::{CloudAuthError, Result};
use crate::helper::{extract_domain_owner, lookup_credentials};
use crate::token::CloudTokenSource;

/// Resolves the `Authorization` header for plain HTTP requests against a
/// V2 registry, or `None` for anonymous access.
///
/// Nexus, Artifactory, and registries without a provider use Basic auth
/// whatever their auth method says. AWS and GCP exchange their credentials
/// for a bearer token through `tokens`.
pub async fn resolve_v2_auth_headers(
    registry: &Registry,
    env_creds: Option<&EnvCreds>,
    tokens: &dyn CloudTokenSource,
) -> Result<Option<AuthHeader>> {
    let auth_ref = match registry
        .maven_config
        .auth_config
        .as_deref()
        .filter(|r| !r.is_empty())
    {
        Some(auth_ref) => auth_ref,
        None => {
            tracing::info!(
                "No authConfig for registry '{}', using anonymous",
                registry.name
            );
            return Ok(None);
        }
    };

    let auth_cfg = registry.auth_config.get(auth_ref).ok_or_else(|| {
        let mut available: Vec<String> = registry.auth_config.keys().cloned().collect();
        available.sort();
        CloudAuthError::MissingAuthConfig {
            reference: auth_ref.into(),
            registry: registry.name.clone(),
            available,
        }
    })?;

    let creds = lookup_credentials(auth_cfg, env_creds)?;
    if creds.is_anonymous() {
        tracing::info!("Anonymous credentials for registry '{}'", registry.name);
        return Ok(None);
    }

    match auth_cfg.provider {
        Some(Provider::Aws) => {
            if !matches!(
                auth_cfg.auth_method,
                Some(AuthMethod::Secret) | Some(AuthMethod::AssumeRole)
            ) {
                return Err(CloudAuthError::InvalidAwsAuthMethod(
                    auth_cfg.method_name().into(),
                ));
            }
            tracing::info!("Resolving AWS auth for registry '{}'", registry.name);
            aws_bearer(registry, auth_cfg, &creds, tokens).await.map(Some)
        }
        Some(Provider::Gcp) => {
            match auth_cfg.auth_method {
                Some(AuthMethod::Federation) => {
                    return Err(CloudAuthError::GcpFederationNotImplemented(
                        registry.name.clone(),
                    ))
                }
                Some(AuthMethod::ServiceAccount) => {}
                _ => {
                    return Err(CloudAuthError::InvalidGcpAuthMethod(
                        auth_cfg.method_name().into(),
                    ))
                }
            }
            tracing::info!("Resolving GCP auth for registry '{}'", registry.name);
            gcp_bearer(auth_cfg, &creds, tokens).await.map(Some)
        }
        Some(Provider::Azure) => Err(CloudAuthError::AzureNotImplemented(registry.name.clone())),
        Some(provider @ (Provider::Nexus | Provider::Artifactory)) => {
            tracing::info!(
                "Resolving basic auth for {provider} registry '{}'",
                registry.name
            );
            basic_auth(&creds).map(Some)
        }
        None => {
            tracing::info!("Resolving basic auth for registry '{}'", registry.name);
            basic_auth(&creds).map(Some)
        }
    }
}

async fn aws_bearer(
    registry: &Registry,
    auth_cfg: &AuthConfig,
    creds: &Credentials,
    tokens: &dyn CloudTokenSource,
) -> Result<AuthHeader> {
    let region = auth_cfg
        .aws_region
        .as_deref()
        .filter(|r| !r.is_empty())
        .ok_or(CloudAuthError::MissingAwsRegion)?;
    let domain = auth_cfg
        .aws_domain
        .as_deref()
        .filter(|d| !d.is_empty())
        .ok_or(CloudAuthError::MissingAwsDomain)?;
    let (access_key, secret_key) = creds
        .username_password()
        .ok_or(CloudAuthError::MissingAwsKeys)?;

    // TODO: exchange `awsRoleArn` through STS for assume_role configs once
    // a registry needs a role distinct from its key pair.
    let owner = auth_cfg.aws_domain_owner.clone().or_else(|| {
        extract_domain_owner(&registry.maven_config.repository_domain_name, domain)
    });
    let token = tokens
        .aws_authorization_token(
            &AwsCredentials::new(access_key, secret_key),
            region,
            domain,
            owner.as_deref(),
        )
        .await?;
    Ok(AuthHeader::bearer(token))
}

async fn gcp_bearer(
    auth_cfg: &AuthConfig,
    creds: &Credentials,
    tokens: &dyn CloudTokenSource,
) -> Result<AuthHeader> {
    let sa_key = creds
        .secret()
        .map(|s| s.as_json_string())
        .filter(|s| !s.is_empty())
        .ok_or(CloudAuthError::MissingGcpSecret)?;
    serde_json::from_str::<serde_json::Value>(&sa_key)
        .map_err(CloudAuthError::InvalidServiceAccountKey)?;

    let token = tokens.gcp_access_token(&sa_key).await?;
    tracing::info!(
        "GCP token obtained for registry '{}'",
        auth_cfg.gcp_reg_project.as_deref().unwrap_or_default()
    );
    Ok(AuthHeader::bearer(token))
}

fn basic_auth(creds: &Credentials) -> Result<AuthHeader> {
    let (username, password) = creds
        .username_password()
        .ok_or(CloudAuthError::MissingBasicCredentials)?;
    Ok(AuthHeader::basic(username, password))
}
