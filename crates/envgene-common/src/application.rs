use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::{CommonError, Registry};

/// File types artifacts are published as.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileExtension {
    #[default]
    Json,
    Zip,
    Yaml,
    Xml,
    Pom,
    Jar,
}

impl FileExtension {
    pub fn as_str(&self) -> &'static str {
        match self {
            FileExtension::Json => "json",
            FileExtension::Zip => "zip",
            FileExtension::Yaml => "yaml",
            FileExtension::Xml => "xml",
            FileExtension::Pom => "pom",
            FileExtension::Jar => "jar",
        }
    }
}

impl fmt::Display for FileExtension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FileExtension {
    type Err = CommonError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim_start_matches('.').to_lowercase().as_str() {
            "json" => Ok(FileExtension::Json),
            "zip" => Ok(FileExtension::Zip),
            "yaml" | "yml" => Ok(FileExtension::Yaml),
            "xml" => Ok(FileExtension::Xml),
            "pom" => Ok(FileExtension::Pom),
            "jar" => Ok(FileExtension::Jar),
            _ => Err(CommonError::UnsupportedExtension(s.into())),
        }
    }
}

/// An application whose artifacts are published to one [`Registry`].
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Application {
    pub name: String,
    pub group_id: String,
    pub artifact_id: String,
    pub registry: Registry,
    /// Whether the artifact is a solution (deployment) descriptor.
    #[serde(default)]
    pub solution_descriptor: bool,
}

impl Application {
    /// The group id as a repository path, `com.example` -> `com/example`.
    pub fn group_path(&self) -> String {
        self.group_id.replace('.', "/")
    }
}

/// An application definition as stored on disk, which references its
/// registry by name instead of embedding it.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApplicationDefinition {
    pub name: String,
    pub group_id: String,
    pub artifact_id: String,
    #[serde(default)]
    pub registry_name: Option<String>,
    #[serde(default)]
    pub solution_descriptor: bool,
}

impl ApplicationDefinition {
    pub fn into_application(self, registry: Registry) -> Application {
        Application {
            name: self.name,
            group_id: self.group_id,
            artifact_id: self.artifact_id,
            registry,
            solution_descriptor: self.solution_descriptor,
        }
    }
}

/// Where an artifact was found, and where it ended up locally.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArtifactInfo {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub repo: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub app_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub app_version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub local_path: Option<PathBuf>,
}

impl ArtifactInfo {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Default::default()
        }
    }

    /// Associates this artifact with the application version it belongs
    /// to, which decides its download location.
    pub fn for_app(mut self, app_name: impl Into<String>, app_version: impl Into<String>) -> Self {
        self.app_name = Some(app_name.into());
        self.app_version = Some(app_version.into());
        self
    }
}
