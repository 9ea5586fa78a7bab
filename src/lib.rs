use std::path::PathBuf;

use async_trait::async_trait;
use clap::{CommandFactory, FromArgMatches as _, Parser, Subcommand};
use directories::ProjectDirs;
use envgene_config::{ArgMatches, ConfigLayer, EnvgeneConfig, EnvgeneConfigOptions, CONFIG_FILE_NAME};
use miette::{IntoDiagnostic, Result};
use tracing_subscriber::{filter::LevelFilter, fmt, prelude::*, EnvFilter};

use commands::download::DownloadCmd;
use commands::resolve::ResolveCmd;
use commands::EnvgeneCommand;

mod artifact_args;
mod commands;
mod error;
mod searcher_args;

pub use error::EnvgeneArtifactsError;

#[derive(Debug, Parser)]
#[command(author, version, about, long_about = None)]
pub struct EnvgeneArtifacts {
    /// Project directory searched for envgenerc.toml files.
    #[arg(global = true, long = "root")]
    root: Option<PathBuf>,

    /// File to read configuration values from.
    #[arg(global = true, long)]
    config: Option<PathBuf>,

    /// Log output level/directive. Supports plain loglevels (off, error,
    /// warn, info, debug, trace) as well as more advanced directives in the
    /// format `target[span{field=value}]=level`.
    #[clap(global = true, long, default_value = "warn")]
    loglevel: String,

    /// Disable all output
    #[arg(global = true, long, short)]
    quiet: bool,

    /// Format output as JSON.
    #[arg(global = true, long)]
    json: bool,

    /// Directory artifacts are downloaded and extracted into. Defaults to
    /// `zips` under the system temp directory.
    #[arg(global = true, long, env = "WORKSPACE")]
    workspace: Option<PathBuf>,

    /// Per-request HTTP timeout, in seconds.
    #[arg(global = true, long, default_value_t = 30)]
    request_timeout: u64,

    /// Maximum number of concurrent downloads and pooled connections.
    #[arg(global = true, long, env = "TCP_CONNECTION_LIMIT", default_value_t = 100)]
    tcp_connection_limit: usize,

    /// Number of times transient HTTP failures are retried.
    #[arg(global = true, long, default_value_t = 0)]
    retries: u32,

    #[command(subcommand)]
    subcommand: EnvgeneCmd,
}

impl EnvgeneArtifacts {
    fn setup_logging(&self) -> Result<()> {
        tracing_subscriber::registry()
            .with(fmt::layer().with_writer(std::io::stderr))
            .with(
                EnvFilter::builder()
                    .with_default_directive(if self.quiet {
                        LevelFilter::OFF.into()
                    } else {
                        self.loglevel.parse().into_diagnostic()?
                    })
                    .from_env_lossy(),
            )
            .init();
        Ok(())
    }

    pub async fn load() -> Result<()> {
        let start = std::time::Instant::now();
        let matches = EnvgeneArtifacts::command().get_matches();
        let mut envgene = EnvgeneArtifacts::from_arg_matches(&matches).into_diagnostic()?;
        let cfg = if let Some(file) = &envgene.config {
            EnvgeneConfigOptions::new()
                .global_config_file(Some(file.clone()))
                .root(envgene.root.clone())
                .load()?
        } else {
            EnvgeneConfigOptions::new()
                .global_config_file(
                    ProjectDirs::from("", "", "envgene")
                        .map(|d| d.config_dir().to_owned().join(CONFIG_FILE_NAME)),
                )
                .root(envgene.root.clone())
                .load()?
        };
        envgene.layer_config(&matches, &cfg)?;
        envgene.setup_logging()?;
        envgene.execute().await?;
        tracing::info!("Ran in {}s", start.elapsed().as_millis() as f32 / 1000.0);
        Ok(())
    }
}

#[derive(Debug, Subcommand)]
pub enum EnvgeneCmd {
    /// Find the URL an artifact is served from.
    Resolve(ResolveCmd),

    /// Resolve an artifact and download it into the workspace.
    Download(DownloadCmd),
}

#[async_trait]
impl EnvgeneCommand for EnvgeneArtifacts {
    async fn execute(self) -> Result<()> {
        tracing::debug!("Running command: {:#?}", self.subcommand);
        match self.subcommand {
            EnvgeneCmd::Resolve(resolve) => resolve.execute().await,
            EnvgeneCmd::Download(download) => download.execute().await,
        }
    }
}

impl ConfigLayer for EnvgeneArtifacts {
    fn layer_config(&mut self, args: &ArgMatches, conf: &EnvgeneConfig) -> Result<()> {
        let command = self.subcommand.name();
        if let Some(loglevel) = envgene_config::layered(args, conf, command, "loglevel")? {
            self.loglevel = loglevel;
        }
        let sub_args = args
            .subcommand_matches(command)
            .unwrap_or(args);
        match self.subcommand {
            EnvgeneCmd::Resolve(ref mut resolve) => resolve.layer_config(sub_args, conf),
            EnvgeneCmd::Download(ref mut download) => download.layer_config(sub_args, conf),
        }
    }
}

impl EnvgeneCmd {
    fn name(&self) -> &'static str {
        match self {
            EnvgeneCmd::Resolve(_) => "resolve",
            EnvgeneCmd::Download(_) => "download",
        }
    }
}
