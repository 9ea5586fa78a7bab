//! Maven repository layout: artifact paths, snapshot folders, and
//! `maven-metadata.xml` snapshot resolution.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;

use crate::FileExtension;

pub const SNAPSHOT_SUFFIX: &str = "-SNAPSHOT";
pub const METADATA_XML: &str = "maven-metadata.xml";

static TIMESTAMPED_SNAPSHOT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"-\d{8}\.\d{6}-\d+$").expect("valid regex"));

pub fn is_snapshot(version: &str) -> bool {
    version.ends_with(SNAPSHOT_SUFFIX)
}

/// Normalizes a version into the folder it is stored under.
///
/// Timestamped snapshots (`1.0.0-20240702.123456-1`) live in their
/// `-SNAPSHOT` folder; every other version is its own folder.
pub fn version_to_folder_name(version: &str) -> String {
    TIMESTAMPED_SNAPSHOT
        .replace(version, SNAPSHOT_SUFFIX)
        .into_owned()
}

/// `<artifactId>-<version>[-<classifier>].<ext>`
pub fn artifact_file_name(
    artifact_id: &str,
    version: &str,
    classifier: Option<&str>,
    extension: FileExtension,
) -> String {
    match classifier.filter(|c| !c.is_empty()) {
        Some(classifier) => format!("{artifact_id}-{version}-{classifier}.{extension}"),
        None => format!("{artifact_id}-{version}.{extension}"),
    }
}

/// `<group/path>/<artifactId>/<folder>`, the directory holding every file
/// of one artifact version.
pub fn artifact_dir_path(group_id: &str, artifact_id: &str, version: &str) -> String {
    format!(
        "{}/{artifact_id}/{}",
        group_id.replace('.', "/"),
        version_to_folder_name(version)
    )
}

/// Path of an artifact file relative to the registry domain, starting with
/// the repository name.
pub fn artifact_relative_path(
    repository: &str,
    group_id: &str,
    artifact_id: &str,
    folder: &str,
    version: &str,
    classifier: Option<&str>,
    extension: FileExtension,
) -> String {
    format!(
        "{repository}/{}/{artifact_id}/{folder}/{}",
        group_id.replace('.', "/"),
        artifact_file_name(artifact_id, version, classifier, extension)
    )
}

/// Path of the version-level `maven-metadata.xml` relative to the registry
/// domain.
pub fn metadata_relative_path(
    repository: &str,
    group_id: &str,
    artifact_id: &str,
    version: &str,
) -> String {
    format!(
        "{repository}/{}/{artifact_id}/{version}/{METADATA_XML}",
        group_id.replace('.', "/")
    )
}

#[derive(Debug, Default, Deserialize)]
struct Metadata {
    #[serde(default)]
    versioning: Option<Versioning>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Versioning {
    #[serde(default)]
    snapshot: Option<Snapshot>,
    #[serde(default)]
    snapshot_versions: Option<SnapshotVersions>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Snapshot {
    #[serde(default)]
    timestamp: Option<String>,
    #[serde(default)]
    build_number: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct SnapshotVersions {
    #[serde(default, rename = "snapshotVersion")]
    entries: Vec<SnapshotVersion>,
}

#[derive(Debug, Default, Deserialize)]
struct SnapshotVersion {
    #[serde(default)]
    classifier: Option<String>,
    #[serde(default)]
    extension: Option<String>,
    #[serde(default)]
    value: Option<String>,
}

fn text(field: &Option<String>) -> &str {
    field.as_deref().map(str::trim).unwrap_or_default()
}

/// Resolves a `-SNAPSHOT` version to the concrete build described by a
/// version-level `maven-metadata.xml`.
///
/// An entry of `<snapshotVersions>` matching both `classifier` and
/// `extension` wins. Otherwise the legacy `<snapshot>` block is used, and
/// needs both its timestamp and build number. Anything else resolves to
/// `None`.
pub fn parse_snapshot_version(
    metadata_xml: &str,
    extension: FileExtension,
    classifier: Option<&str>,
    version: &str,
) -> Option<String> {
    let metadata: Metadata = match quick_xml::de::from_str(metadata_xml) {
        Ok(metadata) => metadata,
        Err(e) => {
            tracing::warn!("Failed to parse {METADATA_XML} for {version}: {e}");
            return None;
        }
    };
    let versioning = metadata.versioning?;
    let classifier = classifier.unwrap_or_default();

    if let Some(list) = versioning
        .snapshot_versions
        .filter(|list| !list.entries.is_empty())
    {
        let found = list
            .entries
            .iter()
            .find(|entry| {
                text(&entry.classifier) == classifier
                    && text(&entry.extension) == extension.as_str()
            })
            .map(|entry| text(&entry.value).to_string())
            .filter(|value| !value.is_empty());
        if found.is_some() {
            return found;
        }
        tracing::debug!(
            "No <snapshotVersion> matches classifier {classifier:?} and extension {extension} for {version}"
        );
    }

    let snapshot = versioning.snapshot?;
    let (timestamp, build) = (text(&snapshot.timestamp), text(&snapshot.build_number));
    if timestamp.is_empty() || build.is_empty() {
        return None;
    }
    let base = version.strip_suffix(SNAPSHOT_SUFFIX).unwrap_or(version);
    Some(format!("{base}-{timestamp}-{build}"))
}
