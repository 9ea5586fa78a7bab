use std::path::{Path, PathBuf};

use artifact_searcher::ArtifactRequest;
use clap::Args;
use envgene_cloud_auth::{resolve_auth_config, resolve_credentials};
use envgene_common::{ApplicationDefinition, EnvCreds, FileExtension, Registry};
use miette::{IntoDiagnostic, Result, WrapErr};
use serde::de::DeserializeOwned;

use crate::error::EnvgeneArtifactsError;

#[derive(Debug, Args)]
pub struct ArtifactArgs {
    /// Application definition file (YAML): name, groupId and artifactId.
    #[arg(long)]
    pub app: PathBuf,

    /// Registry definition file (YAML) the application is published to.
    #[arg(long)]
    pub registry: PathBuf,

    /// Credential store (YAML or JSON), keyed by credential id.
    #[arg(long)]
    pub creds: Option<PathBuf>,

    /// Version to look up. `-SNAPSHOT` versions resolve to their newest
    /// timestamped build.
    #[arg(long = "version", id = "app_version")]
    pub app_version: String,

    /// File type of the artifact.
    #[arg(long, default_value = "json")]
    pub extension: FileExtension,

    /// Maven classifier of the artifact.
    #[arg(long)]
    pub classifier: Option<String>,
}

impl ArtifactArgs {
    pub async fn to_request(&self) -> Result<ArtifactRequest> {
        let registry: Registry = read_definition(&self.registry).await?;
        let app: ApplicationDefinition = read_definition(&self.app).await?;
        let env_creds: Option<EnvCreds> = match &self.creds {
            Some(path) => Some(read_definition(path).await?),
            None => None,
        };

        let credentials = match (resolve_auth_config(&registry, "maven"), &env_creds) {
            (Some(auth_config), Some(env_creds)) => {
                match resolve_credentials(auth_config, Some(env_creds)) {
                    Ok(credentials) => Some(credentials),
                    Err(e) => {
                        tracing::warn!("Probing without credentials: {e}");
                        None
                    }
                }
            }
            _ => None,
        };

        let mut request = ArtifactRequest::new(
            app.into_application(registry),
            self.extension,
            &self.app_version,
        );
        if let Some(classifier) = &self.classifier {
            request = request.classifier(classifier);
        }
        if let Some(credentials) = credentials {
            request = request.credentials(credentials);
        }
        if let Some(env_creds) = env_creds {
            request = request.env_creds(env_creds);
        }
        Ok(request)
    }
}

async fn read_definition<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let text = async_std::fs::read_to_string(path)
        .await
        .into_diagnostic()
        .wrap_err_with(|| format!("Failed to read {}", path.display()))?;
    serde_yaml::from_str(&text).map_err(|e| {
        EnvgeneArtifactsError::BadDefinition {
            path: path.into(),
            message: e.to_string(),
        }
        .into()
    })
}

#[cfg(test)]
mod tests {
    use std::fs;

    use envgene_common::Credentials;
    use pretty_assertions::assert_eq;

    use super::*;

    const REGISTRY: &str = r#"
name: sandbox-nexus
version: "1.0"
mavenConfig:
  repositoryDomainName: https://nexus.example.com/repository/
  targetSnapshot: maven-snapshots
  targetRelease: maven-releases
  authConfig: nexus-maven
authConfig:
  nexus-maven:
    credentialsId: nexus-cred
    provider: nexus
"#;

    const APP: &str = r#"
name: my-app
groupId: com.example
artifactId: app
"#;

    const CREDS: &str = r#"{
  "nexus-cred": { "type": "usernamePassword", "data": { "username": "user", "password": "pass" } }
}"#;

    #[async_std::test]
    async fn builds_request_from_definition_files() -> Result<()> {
        let dir = tempfile::tempdir().into_diagnostic()?;
        fs::write(dir.path().join("registry.yaml"), REGISTRY).into_diagnostic()?;
        fs::write(dir.path().join("app.yaml"), APP).into_diagnostic()?;
        fs::write(dir.path().join("creds.json"), CREDS).into_diagnostic()?;

        let args = ArtifactArgs {
            app: dir.path().join("app.yaml"),
            registry: dir.path().join("registry.yaml"),
            creds: Some(dir.path().join("creds.json")),
            app_version: "1.0.0-SNAPSHOT".into(),
            extension: FileExtension::Zip,
            classifier: Some("dist".into()),
        };
        let request = args.to_request().await?;
        assert_eq!(request.to_string(), "com.example:app:1.0.0-SNAPSHOT:dist@zip");
        assert_eq!(
            request.app.registry.maven_config.target_release.as_deref(),
            Some("maven-releases")
        );
        assert_eq!(request.credentials, Some(Credentials::basic("user", "pass")));
        assert!(request.env_creds.is_some());
        Ok(())
    }

    #[async_std::test]
    async fn bad_yaml_is_reported() -> Result<()> {
        let dir = tempfile::tempdir().into_diagnostic()?;
        fs::write(dir.path().join("registry.yaml"), "name: [unterminated").into_diagnostic()?;
        let err = read_definition::<Registry>(&dir.path().join("registry.yaml"))
            .await
            .unwrap_err();
        assert!(err.to_string().starts_with("Failed to parse"));
        Ok(())
    }
}
