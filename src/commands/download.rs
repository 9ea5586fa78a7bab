use async_trait::async_trait;
use clap::Args;
use envgene_common::FileExtension;
use envgene_config::{ArgMatches, ConfigLayer, EnvgeneConfig};
use miette::{IntoDiagnostic, Result, WrapErr};
use serde_json::json;

use crate::artifact_args::ArtifactArgs;
use crate::commands::EnvgeneCommand;
use crate::error::EnvgeneArtifactsError;
use crate::searcher_args::SearcherArgs;

/// Resolve an artifact and download it into the workspace.
#[derive(Debug, Args)]
pub struct DownloadCmd {
    #[command(flatten)]
    artifact: ArtifactArgs,

    /// Extract the artifact's `<artifactId>/` folder next to the archive.
    #[arg(long)]
    unzip: bool,

    /// Empty the workspace before downloading.
    #[arg(long)]
    clean: bool,

    #[command(flatten)]
    searcher_args: SearcherArgs,

    #[arg(from_global)]
    json: bool,
}

#[async_trait]
impl EnvgeneCommand for DownloadCmd {
    async fn execute(self) -> Result<()> {
        if self.unzip && self.artifact.extension != FileExtension::Zip {
            return Err(EnvgeneArtifactsError::NotAnArchive(self.artifact.extension).into());
        }
        let searcher = self.searcher_args.to_searcher()?;
        if self.clean {
            searcher.clean_temp_dir().await?;
        }
        let request = self.artifact.to_request().await?;
        let resolved = searcher.require_artifact(&request).await?;
        let info = searcher.fetch(&request, &resolved).await?;
        let local_path = info.local_path.clone().unwrap_or_default();
        tracing::info!("Downloaded {} to {}", resolved.url, local_path.display());

        let extracted = if self.unzip {
            Some(
                searcher
                    .unzip_file(
                        &request.app.artifact_id,
                        &request.app.name,
                        &request.version,
                        &local_path,
                    )
                    .await?,
            )
        } else {
            None
        };

        if self.json {
            let output = serde_json::to_string_pretty(&json!({
                "artifact": info,
                "strategy": resolved.strategy,
                "extracted": extracted,
            }))
            .into_diagnostic()
            .wrap_err("download::serialize")?;
            println!("{output}");
        } else {
            println!("{}", local_path.display());
        }
        Ok(())
    }
}

impl ConfigLayer for DownloadCmd {
    fn layer_config(&mut self, matches: &ArgMatches, config: &EnvgeneConfig) -> Result<()> {
        self.searcher_args.layer("download", matches, config)
    }
}
