use std::fs::File;
use std::path::{Path, PathBuf};

use crate::download::Workspace;
use crate::error::{IoContext, Result, SearchError};

/// Extracts the `<artifact_id>/` subtree of a downloaded archive into
/// `<workspace>/<app_name>/<app_version>/`, returning how many entries were
/// written. Everything outside that subtree is ignored.
pub async fn unzip_file(
    workspace: &Workspace,
    artifact_id: &str,
    app_name: &str,
    app_version: &str,
    zip_path: impl AsRef<Path>,
) -> Result<usize> {
    let zip_path = zip_path.as_ref().to_path_buf();
    let dest = workspace.app_dir(app_name, app_version);
    let prefix = format!("{artifact_id}/");
    let extracted =
        async_std::task::spawn_blocking(move || extract_prefix(&zip_path, &prefix, &dest)).await?;
    if extracted == 0 {
        tracing::warn!("No files were extracted for application {app_name}:{app_version}");
    } else {
        tracing::debug!("Extracted {extracted} entries for {app_name}:{app_version}");
    }
    Ok(extracted)
}

fn extract_prefix(zip_path: &Path, prefix: &str, dest: &Path) -> Result<usize> {
    let file = File::open(zip_path)
        .io_context(|| format!("Failed to open archive {}", zip_path.display()))?;
    let mut archive =
        zip::ZipArchive::new(file).map_err(|e| SearchError::ZipError(e, zip_path.into()))?;

    let mut extracted = 0;
    for i in 0..archive.len() {
        let mut entry = archive
            .by_index(i)
            .map_err(|e| SearchError::ZipError(e, zip_path.into()))?;
        if !entry.name().starts_with(prefix) {
            continue;
        }
        let relative: PathBuf = match entry.enclosed_name() {
            Some(path) => path,
            None => {
                tracing::warn!("Skipping unsafe archive entry {}", entry.name());
                continue;
            }
        };
        let target = dest.join(relative);
        if entry.is_dir() {
            std::fs::create_dir_all(&target)
                .io_context(|| format!("Failed to create {}", target.display()))?;
        } else {
            if let Some(parent) = target.parent() {
                std::fs::create_dir_all(parent)
                    .io_context(|| format!("Failed to create {}", parent.display()))?;
            }
            let mut out = File::create(&target)
                .io_context(|| format!("Failed to create {}", target.display()))?;
            std::io::copy(&mut entry, &mut out)
                .io_context(|| format!("Failed to extract {}", target.display()))?;
        }
        extracted += 1;
    }
    Ok(extracted)
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use miette::{IntoDiagnostic, Result};
    use pretty_assertions::assert_eq;
    use zip::write::SimpleFileOptions;

    use super::*;

    fn write_zip(path: &Path, entries: &[(&str, &str)]) -> Result<()> {
        let mut writer = zip::ZipWriter::new(File::create(path).into_diagnostic()?);
        for (name, contents) in entries {
            writer
                .start_file(*name, SimpleFileOptions::default())
                .into_diagnostic()?;
            writer.write_all(contents.as_bytes()).into_diagnostic()?;
        }
        writer.finish().into_diagnostic()?;
        Ok(())
    }

    #[async_std::test]
    async fn extracts_only_the_artifact_subtree() -> Result<()> {
        let tmp = tempfile::tempdir().into_diagnostic()?;
        let archive = tmp.path().join("app.zip");
        write_zip(
            &archive,
            &[
                ("app/deployment/values.yaml", "replicas: 1"),
                ("app/sd.json", "{}"),
                ("other/readme.txt", "ignored"),
                ("app-extra/x", "ignored"),
            ],
        )?;

        let workspace = Workspace::new(tmp.path().join("ws"));
        let count = unzip_file(&workspace, "app", "my-app", "1.0", &archive).await?;
        assert_eq!(count, 2);

        let dir = workspace.app_dir("my-app", "1.0");
        assert_eq!(
            std::fs::read_to_string(dir.join("app/deployment/values.yaml")).into_diagnostic()?,
            "replicas: 1"
        );
        assert!(dir.join("app/sd.json").exists());
        assert!(!dir.join("other").exists());
        assert!(!dir.join("app-extra").exists());
        Ok(())
    }

    #[async_std::test]
    async fn nothing_to_extract() -> Result<()> {
        let tmp = tempfile::tempdir().into_diagnostic()?;
        let archive = tmp.path().join("app.zip");
        write_zip(&archive, &[("unrelated/file", "x")])?;

        let workspace = Workspace::new(tmp.path().join("ws"));
        assert_eq!(unzip_file(&workspace, "app", "a", "1", &archive).await?, 0);
        Ok(())
    }

    #[async_std::test]
    async fn broken_archive_is_an_error() -> Result<()> {
        let tmp = tempfile::tempdir().into_diagnostic()?;
        let archive = tmp.path().join("broken.zip");
        std::fs::write(&archive, "not a zip").into_diagnostic()?;

        let workspace = Workspace::new(tmp.path().join("ws"));
        let err = unzip_file(&workspace, "app", "a", "1", &archive)
            .await
            .unwrap_err();
        assert!(matches!(err, SearchError::ZipError(..)));
        Ok(())
    }
}
