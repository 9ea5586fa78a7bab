use miette::Diagnostic;
use thiserror::Error;

#[derive(Debug, Error, Diagnostic)]
pub enum EnvgeneConfigError {
    #[error(transparent)]
    #[diagnostic(code(config::error))]
    ConfigError(#[from] config::ConfigError),

    /// A configured value could not be parsed into the type the option
    /// expects.
    #[error("Invalid value for `{key}`: {value:?} ({message})")]
    #[diagnostic(
        code(config::invalid_value),
        help("Check the value in your envgenerc.toml or ENVGENE_* environment variables.")
    )]
    InvalidValue {
        key: String,
        value: String,
        message: String,
    },
}
