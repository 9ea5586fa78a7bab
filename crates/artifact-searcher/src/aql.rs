//! Artifactory Query Language helpers, for looking several artifacts up in
//! one round trip.

use envgene_client::{AuthHeader, EnvgeneClient};
use envgene_common::{
    artifact_dir_path, artifact_file_name, Application, ArtifactInfo, Credentials, FileExtension,
};
use url::Url;

use crate::error::Result;

/// AQL clause matching one artifact by file name and folder.
pub fn create_aql_artifact(app: &Application, extension: FileExtension, version: &str) -> String {
    let path = artifact_dir_path(&app.group_id, &app.artifact_id, version);
    let name = artifact_file_name(&app.artifact_id, version, None, extension);
    format!(r#"{{"$and": [{{"name": "{name}"}},{{"path":"{path}"}}]}}"#)
}

/// Combines clauses from [`create_aql_artifact`] into one `items.find` query
/// matching any of them.
pub fn create_aql_artifacts(aqls: &[String]) -> String {
    format!(r#"items.find({{"$or":  [{}]}})"#, aqls.join(", "))
}

/// Runs `aql` against the Artifactory instance at `url` and turns every hit
/// into an [`ArtifactInfo`] whose URL is `<url>/<repo>/<path>/<name>`.
pub async fn check_artifacts_by_aql(
    client: &EnvgeneClient,
    aql: &str,
    cred: &Credentials,
    url: &Url,
) -> Result<Vec<ArtifactInfo>> {
    let auth = cred
        .username_password()
        .map(|(username, password)| AuthHeader::basic(username, password));
    let base = url.as_str().trim_end_matches('/');
    let hits = client.search_aql(url, aql, auth.as_ref()).await?;
    Ok(hits
        .into_iter()
        .map(|hit| {
            let mut info =
                ArtifactInfo::new(format!("{base}/{}/{}/{}", hit.repo, hit.path, hit.name));
            info.repo = Some(hit.repo);
            info.path = Some(hit.path);
            info.name = Some(hit.name);
            info
        })
        .collect())
}
