use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum CliError {
    #[error("failed to read configuration file {path}: {source}")]
    ReadConfig { path: PathBuf, #[source] source: std::io::Error },

    #[error("failed to parse configuration file {path}: {source}")]
    ParseConfig { path: PathBuf, #[source] source: toml::de::Error },

    #[error("a configuration document may declare at most one mark source")]
    DuplicateMarkSource,

    #[error("failed to compile configuration: {0}")]
    Compile(#[from] logpipe_core::error::ConfigError),
}
