use std::fmt::Display;
use std::path::PathBuf;
use std::str::FromStr;

pub use clap::ArgMatches;
use clap::parser::ValueSource;
pub use config::Config as EnvgeneConfig;
use config::{Environment, File, FileFormat};
use miette::Result;

pub use error::EnvgeneConfigError;

mod error;

pub const ENV_PREFIX: &str = "envgene";
pub const CONFIG_FILE_NAME: &str = "envgenerc.toml";

/// Fills in command options that were not given on the command line from
/// loaded configuration.
pub trait ConfigLayer {
    fn layer_config(&mut self, _matches: &ArgMatches, _config: &EnvgeneConfig) -> Result<()> {
        Ok(())
    }
}

/// Configured value for option `field` of `command`, unless the user passed
/// it on the command line or through the option's own environment variable.
/// `commands.<command>.<field>` beats a bare `<field>`.
pub fn layered<T>(
    matches: &ArgMatches,
    config: &EnvgeneConfig,
    command: &str,
    field: &str,
) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: Display,
{
    if matches!(
        matches.value_source(field),
        Some(ValueSource::CommandLine | ValueSource::EnvVariable)
    ) {
        return Ok(None);
    }
    let scoped = format!("commands.{command}.{field}");
    let (key, value) = match config.get_string(&scoped) {
        Ok(value) => (scoped, value),
        Err(_) => match config.get_string(field) {
            Ok(value) => (field.to_string(), value),
            Err(_) => return Ok(None),
        },
    };
    let parsed = value
        .parse()
        .map_err(|e: T::Err| EnvgeneConfigError::InvalidValue {
            key,
            value: value.clone(),
            message: e.to_string(),
        })?;
    Ok(Some(parsed))
}

pub struct EnvgeneConfigOptions {
    global: bool,
    env: bool,
    root: Option<PathBuf>,
    global_config_file: Option<PathBuf>,
}

impl Default for EnvgeneConfigOptions {
    fn default() -> Self {
        EnvgeneConfigOptions {
            global: true,
            env: true,
            root: None,
            global_config_file: None,
        }
    }
}

impl EnvgeneConfigOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn global(mut self, global: bool) -> Self {
        self.global = global;
        self
    }

    pub fn env(mut self, env: bool) -> Self {
        self.env = env;
        self
    }

    /// Directory searched for `envgenerc.toml` and `.envgenerc.toml`.
    pub fn root(mut self, root: Option<PathBuf>) -> Self {
        self.root = root;
        self
    }

    pub fn global_config_file(mut self, file: Option<PathBuf>) -> Self {
        self.global_config_file = file;
        self
    }

    /// Loads the global file, then `ENVGENE_*` variables, then project
    /// files. Later sources win; missing files are skipped.
    pub fn load(self) -> Result<EnvgeneConfig> {
        let mut builder = EnvgeneConfig::builder();
        if self.global {
            if let Some(config_file) = self.global_config_file {
                builder = builder.add_source(
                    File::new(&config_file.display().to_string(), FileFormat::Toml)
                        .required(false),
                );
            }
        }
        if self.env {
            builder = builder.add_source(Environment::with_prefix(ENV_PREFIX));
        }
        if let Some(root) = self.root {
            for name in [CONFIG_FILE_NAME.to_string(), format!(".{CONFIG_FILE_NAME}")] {
                builder = builder.add_source(
                    File::new(&root.join(name).display().to_string(), FileFormat::Toml)
                        .required(false),
                );
            }
        }
        Ok(builder.build().map_err(EnvgeneConfigError::ConfigError)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::env;
    use std::fs;

    use clap::{Arg, Command};
    use miette::{IntoDiagnostic, Result};
    use pretty_assertions::assert_eq;
    use tempfile::tempdir;

    #[test]
    fn env_configs() -> Result<()> {
        let dir = tempdir().into_diagnostic()?;
        env::set_var("ENVGENE_WORKSPACE", dir.path().display().to_string());
        let config = EnvgeneConfigOptions::new().global(false).load()?;
        env::remove_var("ENVGENE_WORKSPACE");
        assert_eq!(
            config.get_string("workspace").into_diagnostic()?,
            dir.path().display().to_string()
        );
        Ok(())
    }

    #[test]
    fn global_config() -> Result<()> {
        let dir = tempdir().into_diagnostic()?;
        let file = dir.path().join("envgenerc.toml");
        fs::write(&file, "request_timeout = 45").into_diagnostic()?;
        let config = EnvgeneConfigOptions::new()
            .env(false)
            .global_config_file(Some(file))
            .load()?;
        assert_eq!(config.get_int("request_timeout").into_diagnostic()?, 45);
        Ok(())
    }

    #[test]
    fn project_files_beat_global() -> Result<()> {
        let global = tempdir().into_diagnostic()?;
        let project = tempdir().into_diagnostic()?;
        let global_file = global.path().join("envgenerc.toml");
        fs::write(&global_file, "retries = 1\ntcp_connection_limit = 10").into_diagnostic()?;
        fs::write(project.path().join(".envgenerc.toml"), "retries = 3").into_diagnostic()?;
        let config = EnvgeneConfigOptions::new()
            .env(false)
            .global_config_file(Some(global_file))
            .root(Some(project.path().to_path_buf()))
            .load()?;
        assert_eq!(config.get_int("retries").into_diagnostic()?, 3);
        assert_eq!(config.get_int("tcp_connection_limit").into_diagnostic()?, 10);
        Ok(())
    }

    #[test]
    fn missing_config() -> Result<()> {
        let config = EnvgeneConfigOptions::new().global(false).env(false).load()?;
        assert!(config.get_string("workspace").is_err());
        Ok(())
    }

    #[test]
    fn layering() -> Result<()> {
        let dir = tempdir().into_diagnostic()?;
        fs::write(
            dir.path().join("envgenerc.toml"),
            "retries = 1\nrequest_timeout = 10\n\n[commands.download]\nretries = 4",
        )
        .into_diagnostic()?;
        let config = EnvgeneConfigOptions::new()
            .global(false)
            .env(false)
            .root(Some(dir.path().to_path_buf()))
            .load()?;

        let cmd = Command::new("download")
            .arg(Arg::new("retries").long("retries"))
            .arg(Arg::new("request_timeout").long("request-timeout"));
        let matches = cmd
            .clone()
            .try_get_matches_from(["download"])
            .into_diagnostic()?;
        assert_eq!(layered::<u32>(&matches, &config, "download", "retries")?, Some(4));
        assert_eq!(
            layered::<u64>(&matches, &config, "download", "request_timeout")?,
            Some(10)
        );

        let matches = cmd
            .try_get_matches_from(["download", "--retries", "7"])
            .into_diagnostic()?;
        assert_eq!(layered::<u32>(&matches, &config, "download", "retries")?, None);
        Ok(())
    }

    #[test]
    fn bad_values_are_reported() -> Result<()> {
        let dir = tempdir().into_diagnostic()?;
        fs::write(dir.path().join("envgenerc.toml"), "retries = \"lots\"").into_diagnostic()?;
        let config = EnvgeneConfigOptions::new()
            .global(false)
            .env(false)
            .root(Some(dir.path().to_path_buf()))
            .load()?;
        let matches = Command::new("resolve")
            .arg(Arg::new("retries").long("retries"))
            .try_get_matches_from(["resolve"])
            .into_diagnostic()?;
        let err = layered::<u32>(&matches, &config, "resolve", "retries").unwrap_err();
        assert!(err.to_string().starts_with("Invalid value for `retries`"));
        Ok(())
    }
}
