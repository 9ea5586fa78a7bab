use std::path::PathBuf;
use std::time::Duration;

use artifact_searcher::{ArtifactSearcher, ArtifactSearcherOpts, Workspace};
use clap::Args;
use envgene_client::EnvgeneClient;
use envgene_config::{layered, ArgMatches, EnvgeneConfig};
use miette::Result;

#[derive(Debug, Args)]
pub struct SearcherArgs {
    #[arg(from_global)]
    pub workspace: Option<PathBuf>,

    #[arg(from_global)]
    pub request_timeout: u64,

    #[arg(from_global)]
    pub tcp_connection_limit: usize,

    #[arg(from_global)]
    pub retries: u32,
}

impl SearcherArgs {
    /// Fills options not given on the command line from `config`.
    pub(crate) fn layer(
        &mut self,
        command: &str,
        matches: &ArgMatches,
        config: &EnvgeneConfig,
    ) -> Result<()> {
        if let Some(workspace) = layered(matches, config, command, "workspace")? {
            self.workspace = Some(workspace);
        }
        if let Some(timeout) = layered(matches, config, command, "request_timeout")? {
            self.request_timeout = timeout;
        }
        if let Some(limit) = layered(matches, config, command, "tcp_connection_limit")? {
            self.tcp_connection_limit = limit;
        }
        if let Some(retries) = layered(matches, config, command, "retries")? {
            self.retries = retries;
        }
        Ok(())
    }

    pub fn to_searcher(&self) -> Result<ArtifactSearcher> {
        let client = EnvgeneClient::builder()
            .timeout(Duration::from_secs(self.request_timeout))
            .connection_limit(self.tcp_connection_limit)
            .retries(self.retries)
            .build()?;
        let mut opts = ArtifactSearcherOpts::new()
            .client(client)
            .connection_limit(self.tcp_connection_limit);
        if let Some(workspace) = &self.workspace {
            opts = opts.workspace(Workspace::new(workspace));
        }
        Ok(opts.build()?)
    }
}
