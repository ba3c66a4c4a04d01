//! Error types for verify-config.

use miette::Diagnostic;
use thiserror::Error;

/// Result type for configuration operations.
pub type Result<T> = std::result::Result<T, ConfigError>;

/// Errors that can occur while loading or validating configuration.
#[derive(Error, Debug, Diagnostic)]
pub enum ConfigError {
    /// Failed to read configuration file.
    #[error("Failed to read config file: {0}")]
    #[diagnostic(code(verify::config::read))]
    ReadConfig(#[from] std::io::Error),

    /// Failed to parse TOML configuration.
    #[error("Failed to parse TOML config: {0}")]
    #[diagnostic(code(verify::config::toml))]
    ParseToml(#[from] toml::de::Error),

    /// A check or comment prefix is not usable.
    #[error("Invalid {role} prefix '{prefix}': {reason}")]
    #[diagnostic(code(verify::config::invalid_prefix))]
    InvalidPrefix {
        role: &'static str,
        prefix: String,
        reason: &'static str,
    },

    /// The same prefix was supplied more than once.
    #[error("Duplicate {role} prefix '{prefix}'")]
    #[diagnostic(code(verify::config::duplicate_prefix))]
    DuplicatePrefix { role: &'static str, prefix: String },

    /// Configuration validation error.
    #[error("Config validation error: {0}")]
    #[diagnostic(code(verify::config::validation))]
    Validation(String),
}
