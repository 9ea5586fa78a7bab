use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize};

use crate::CommonError;

/// Artifact registry vendor backing an [`AuthConfig`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    Aws,
    Gcp,
    Artifactory,
    Nexus,
    Azure,
}

impl Provider {
    pub fn as_str(&self) -> &'static str {
        match self {
            Provider::Aws => "aws",
            Provider::Gcp => "gcp",
            Provider::Artifactory => "artifactory",
            Provider::Nexus => "nexus",
            Provider::Azure => "azure",
        }
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Provider {
    type Err = CommonError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "aws" => Ok(Provider::Aws),
            "gcp" => Ok(Provider::Gcp),
            "artifactory" => Ok(Provider::Artifactory),
            "nexus" => Ok(Provider::Nexus),
            "azure" => Ok(Provider::Azure),
            _ => Err(CommonError::UnsupportedProvider(s.into())),
        }
    }
}

/// How credentials are presented to a provider.
///
/// Unknown methods are kept verbatim so that validation errors can report
/// exactly what was configured.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum AuthMethod {
    UserPass,
    Secret,
    ServiceAccount,
    AssumeRole,
    Federation,
    Other(String),
}

impl AuthMethod {
    pub fn as_str(&self) -> &str {
        match self {
            AuthMethod::UserPass => "user_pass",
            AuthMethod::Secret => "secret",
            AuthMethod::ServiceAccount => "service_account",
            AuthMethod::AssumeRole => "assume_role",
            AuthMethod::Federation => "federation",
            AuthMethod::Other(other) => other,
        }
    }
}

impl From<String> for AuthMethod {
    fn from(value: String) -> Self {
        match value.as_str() {
            "user_pass" => AuthMethod::UserPass,
            "secret" => AuthMethod::Secret,
            "service_account" => AuthMethod::ServiceAccount,
            "assume_role" => AuthMethod::AssumeRole,
            "federation" => AuthMethod::Federation,
            _ => AuthMethod::Other(value),
        }
    }
}

impl From<&str> for AuthMethod {
    fn from(value: &str) -> Self {
        value.to_string().into()
    }
}

impl From<AuthMethod> for String {
    fn from(value: AuthMethod) -> Self {
        value.as_str().to_string()
    }
}

impl fmt::Display for AuthMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A named authentication entry of a V2 [`crate::Registry`].
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthConfig {
    /// Key into the caller-supplied credential store.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub credentials_id: Option<String>,
    #[serde(
        default,
        deserialize_with = "provider_or_none",
        skip_serializing_if = "Option::is_none"
    )]
    pub provider: Option<Provider>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auth_method: Option<AuthMethod>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aws_region: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aws_domain: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aws_domain_owner: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aws_role_arn: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gcp_reg_project: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gcp_oidc_provider: Option<String>,
}

impl AuthConfig {
    pub fn new(credentials_id: impl Into<String>) -> Self {
        Self {
            credentials_id: Some(credentials_id.into()),
            ..Default::default()
        }
    }

    pub fn provider(mut self, provider: Provider) -> Self {
        self.provider = Some(provider);
        self
    }

    pub fn auth_method(mut self, method: impl Into<AuthMethod>) -> Self {
        self.auth_method = Some(method.into());
        self
    }

    pub fn aws(mut self, region: impl Into<String>, domain: impl Into<String>) -> Self {
        self.aws_region = Some(region.into());
        self.aws_domain = Some(domain.into());
        self
    }

    pub fn gcp_project(mut self, project: impl Into<String>) -> Self {
        self.gcp_reg_project = Some(project.into());
        self
    }

    /// The configured method, or an empty string when none was given. Used
    /// in error messages.
    pub fn method_name(&self) -> &str {
        self.auth_method.as_ref().map(|m| m.as_str()).unwrap_or("")
    }
}

fn provider_or_none<'de, D>(deserializer: D) -> Result<Option<Provider>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<String>::deserialize(deserializer)?;
    match raw.as_deref().map(str::trim) {
        None | Some("") | Some("none") => Ok(None),
        Some(name) => name.parse().map(Some).map_err(serde::de::Error::custom),
    }
}
