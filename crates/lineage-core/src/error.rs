use thiserror::Error;

/// Errors raised by the in-process half of the lineage pipeline.
#[derive(Error, Debug)]
pub enum LineageError {
    #[error("Configuration error: {0}")]
    Config(#[from] ::config::ConfigError),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
}

pub type Result<T> = std::result::Result<T, LineageError>;
