use std::fmt;
use std::path::PathBuf;

use envgene_client::AuthHeader;
use envgene_cloud_auth::ArtifactQuery;
use envgene_common::{Application, Credentials, EnvCreds, FileExtension, RepositoryRef};

/// Everything needed to locate one artifact of an application.
#[derive(Clone, Debug)]
pub struct ArtifactRequest {
    pub app: Application,
    pub extension: FileExtension,
    pub version: String,
    pub classifier: Option<String>,
    /// Credentials for direct repository probing.
    pub credentials: Option<Credentials>,
    /// Credential store consulted for V2 registries.
    pub env_creds: Option<EnvCreds>,
}

impl ArtifactRequest {
    pub fn new(app: Application, extension: FileExtension, version: impl Into<String>) -> Self {
        Self {
            app,
            extension,
            version: version.into(),
            classifier: None,
            credentials: None,
            env_creds: None,
        }
    }

    pub fn classifier(mut self, classifier: impl Into<String>) -> Self {
        self.classifier = Some(classifier.into()).filter(|c: &String| !c.is_empty());
        self
    }

    pub fn credentials(mut self, credentials: Credentials) -> Self {
        self.credentials = Some(credentials);
        self
    }

    pub fn env_creds(mut self, env_creds: EnvCreds) -> Self {
        self.env_creds = Some(env_creds);
        self
    }

    /// Basic auth header for direct probing, when username/password
    /// credentials were supplied.
    pub(crate) fn basic_auth(&self) -> Option<AuthHeader> {
        self.credentials
            .as_ref()
            .and_then(Credentials::username_password)
            .map(|(username, password)| AuthHeader::basic(username, password))
    }

    pub(crate) fn query(&self) -> ArtifactQuery {
        let query = ArtifactQuery::new(
            &self.app.group_id,
            &self.app.artifact_id,
            &self.version,
            self.extension,
        );
        match &self.classifier {
            Some(classifier) => query.classifier(classifier),
            None => query,
        }
    }
}

impl fmt::Display for ArtifactRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}:{}",
            self.app.group_id, self.app.artifact_id, self.version
        )?;
        if let Some(classifier) = &self.classifier {
            write!(f, ":{classifier}")?;
        }
        write!(f, "@{}", self.extension)
    }
}

/// Where an artifact was found.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ResolvedArtifact {
    pub url: String,
    /// Repository and role that answered, for direct probing hits.
    pub repository: Option<RepositoryRef>,
    /// Local copy, for cloud search hits (which download as part of
    /// resolution).
    pub local_path: Option<PathBuf>,
    /// Name of the strategy that produced this result.
    pub strategy: &'static str,
}
