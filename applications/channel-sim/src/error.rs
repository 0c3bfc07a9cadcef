/// Simulator error types
use thiserror::Error;

pub type Result<T> = std::result::Result<T, SimError>;

#[derive(Debug, Error)]
pub enum SimError {
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("Invalid run settings: {0}")]
    Run(String),

    #[error("Script step at {at_ms} ms: {message}")]
    Script { at_ms: f64, message: String },

    #[error("Unknown sound name: '{0}'")]
    UnknownName(String),

    #[error("Duplicate sound name: '{0}'")]
    DuplicateName(String),

    #[error("Channel error: {0}")]
    Channel(#[from] soul_channels::ChannelError),
}
