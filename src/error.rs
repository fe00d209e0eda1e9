//! Error types for MadhuNav

use thiserror::Error;

/// MadhuNav error type
#[derive(Error, Debug)]
pub enum MadhuError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    /// Malformed or unavailable world sample. Recoverable by skipping the cycle.
    #[error("World snapshot unavailable: {0}")]
    Snapshot(String),

    #[error("Robot {0} is not registered with either team")]
    NotCompeting(u32),
}

impl MadhuError {
    /// Whether the control loop may retry on the next cycle.
    pub fn is_transient(&self) -> bool {
        matches!(self, MadhuError::Snapshot(_))
    }
}

impl From<toml::de::Error> for MadhuError {
    fn from(e: toml::de::Error) -> Self {
        MadhuError::Config(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, MadhuError>;
