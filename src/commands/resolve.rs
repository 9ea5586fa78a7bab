use async_trait::async_trait;
use clap::Args;
use envgene_config::{ArgMatches, ConfigLayer, EnvgeneConfig};
use miette::{IntoDiagnostic, Result, WrapErr};
use serde_json::json;

use crate::artifact_args::ArtifactArgs;
use crate::commands::EnvgeneCommand;
use crate::searcher_args::SearcherArgs;

/// Find the URL an artifact is served from. Cloud registries also download
/// it into the workspace as part of the search.
#[derive(Debug, Args)]
pub struct ResolveCmd {
    #[command(flatten)]
    artifact: ArtifactArgs,

    #[command(flatten)]
    searcher_args: SearcherArgs,

    #[arg(from_global)]
    json: bool,
}

#[async_trait]
impl EnvgeneCommand for ResolveCmd {
    async fn execute(self) -> Result<()> {
        let searcher = self.searcher_args.to_searcher()?;
        let request = self.artifact.to_request().await?;
        let resolved = searcher.require_artifact(&request).await?;
        if self.json {
            let output = serde_json::to_string_pretty(&json!({
                "coordinate": request.to_string(),
                "url": resolved.url,
                "repository": resolved.repository.as_ref().and_then(|r| r.name.clone()),
                "role": resolved.repository.as_ref().map(|r| r.role.to_string()),
                "strategy": resolved.strategy,
                "localPath": resolved.local_path,
            }))
            .into_diagnostic()
            .wrap_err("resolve::serialize")?;
            println!("{output}");
        } else {
            println!("{}", resolved.url);
        }
        Ok(())
    }
}

impl ConfigLayer for ResolveCmd {
    fn layer_config(&mut self, matches: &ArgMatches, config: &EnvgeneConfig) -> Result<()> {
        self.searcher_args.layer("resolve", matches, config)
    }
}
