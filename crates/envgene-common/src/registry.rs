use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};

use crate::AuthConfig;

/// Version tag of registries that support cloud-aware (V2) resolution.
pub const REGISTRY_V2: &str = "2.0";

/// A registry definition: where artifacts live, and how to authenticate
/// against it.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Registry {
    pub name: String,
    #[serde(default = "default_version", deserialize_with = "string_or_number")]
    pub version: String,
    pub maven_config: MavenConfig,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub docker_config: Option<DockerConfig>,
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub auth_config: HashMap<String, AuthConfig>,
}

impl Registry {
    /// Whether this registry uses the cloud-aware (V2) definition format.
    pub fn is_v2(&self) -> bool {
        self.version.trim() == REGISTRY_V2
    }
}

fn default_version() -> String {
    "1.0".into()
}

// `version: 2.0` is a float as far as YAML is concerned.
fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum StringOrNumber {
        String(String),
        Float(f64),
        Int(i64),
    }

    Ok(match StringOrNumber::deserialize(deserializer)? {
        StringOrNumber::String(s) => s,
        StringOrNumber::Float(f) => format!("{f:.1}"),
        StringOrNumber::Int(i) => format!("{i}.0"),
    })
}

/// Maven repository settings of a [`Registry`].
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MavenConfig {
    pub repository_domain_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_snapshot: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_staging: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_release: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub snapshot_group: Option<String>,
    /// Name of the [`AuthConfig`] entry used for V2 lookups.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auth_config: Option<String>,
    /// Whether the repository domain is served by Nexus. Probed from the
    /// registry's status endpoint when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_nexus: Option<bool>,
}

impl MavenConfig {
    /// The permanent set of repositories searched for artifacts.
    ///
    /// Repositories are keyed by name: when several roles point at the same
    /// repository it is only probed once, under the last role naming it.
    /// Unset roles are kept (with no name) so callers can report them.
    pub fn repositories(&self) -> Vec<RepositoryRef> {
        let mut repos: Vec<RepositoryRef> = Vec::with_capacity(4);
        for (name, role) in [
            (&self.target_snapshot, RepositoryRole::TargetSnapshot),
            (&self.target_staging, RepositoryRole::TargetStaging),
            (&self.target_release, RepositoryRole::TargetRelease),
            (&self.snapshot_group, RepositoryRole::SnapshotGroup),
        ] {
            if let Some(existing) = repos.iter_mut().find(|r| &r.name == name) {
                existing.role = role;
            } else {
                repos.push(RepositoryRef {
                    name: name.clone(),
                    role,
                });
            }
        }
        repos
    }

    /// Looks up which role a repository name is registered under.
    pub fn repository_role(&self, repository: &str) -> Option<RepositoryRole> {
        self.repositories()
            .into_iter()
            .find(|r| r.name.as_deref() == Some(repository))
            .map(|r| r.role)
    }
}

/// The role a repository plays in a registry definition.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum RepositoryRole {
    TargetSnapshot,
    TargetStaging,
    TargetRelease,
    SnapshotGroup,
}

impl RepositoryRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            RepositoryRole::TargetSnapshot => "targetSnapshot",
            RepositoryRole::TargetStaging => "targetStaging",
            RepositoryRole::TargetRelease => "targetRelease",
            RepositoryRole::SnapshotGroup => "snapshotGroup",
        }
    }
}

impl fmt::Display for RepositoryRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A repository name paired with the role it was configured under.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct RepositoryRef {
    pub name: Option<String>,
    pub role: RepositoryRole,
}

/// Docker settings of a [`Registry`]. Only carried through; artifact
/// resolution never reads them.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DockerConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub snapshot_uri: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub staging_uri: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub release_uri: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group_uri: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub snapshot_repo_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub staging_repo_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub release_repo_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auth_config: Option<String>,
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::Provider;

    #[test]
    fn repositories_collapse_shared_names() {
        let maven = MavenConfig {
            repository_domain_name: "https://nexus.example.com/repository/".into(),
            target_snapshot: Some("repo".into()),
            target_staging: Some("repo".into()),
            target_release: Some("repo".into()),
            snapshot_group: None,
            auth_config: None,
            is_nexus: None,
        };
        assert_eq!(
            maven.repositories(),
            vec![
                RepositoryRef {
                    name: Some("repo".into()),
                    role: RepositoryRole::TargetRelease,
                },
                RepositoryRef {
                    name: None,
                    role: RepositoryRole::SnapshotGroup,
                },
            ]
        );
        assert_eq!(
            maven.repository_role("repo"),
            Some(RepositoryRole::TargetRelease)
        );
        assert_eq!(maven.repository_role("other"), None);
    }

    #[test]
    fn registry_from_yaml() {
        let registry: Registry = serde_yaml::from_str(
            r#"
name: cloud
version: 2.0
mavenConfig:
  repositoryDomainName: https://my-domain-123456789012.d.codeartifact.us-east-1.amazonaws.com/maven/releases/
  targetSnapshot: snapshots
  targetRelease: releases
  authConfig: aws-main
authConfig:
  aws-main:
    credentialsId: aws-cred
    provider: aws
    authMethod: secret
    awsRegion: us-east-1
    awsDomain: my-domain
"#,
        )
        .unwrap();
        assert!(registry.is_v2());
        assert_eq!(registry.maven_config.auth_config.as_deref(), Some("aws-main"));
        let auth = &registry.auth_config["aws-main"];
        assert_eq!(auth.provider, Some(Provider::Aws));
        assert_eq!(auth.aws_domain.as_deref(), Some("my-domain"));
    }

    #[test]
    fn registry_version_defaults_to_v1() {
        let registry: Registry = serde_yaml::from_str(
            r#"
name: legacy
mavenConfig:
  repositoryDomainName: https://nexus.example.com/repository/
"#,
        )
        .unwrap();
        assert_eq!(registry.version, "1.0");
        assert!(!registry.is_v2());
        assert!(registry.docker_config.is_none());
    }
}
