//! Configuration errors.
//!
//! The touch path itself never fails; refusals and dropped timers are
//! recorded as decisions instead.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read gesture config: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse gesture config TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid gesture config: {0}")]
    Validation(String),
}

pub type Result<T, E = ConfigError> = std::result::Result<T, E>;
