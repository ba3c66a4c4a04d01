//! Configuration for the verify pattern checker.
//!
//! This crate provides:
//! - The `verify.toml` configuration format
//! - Command-line overrides layered on top of the file
//! - Validation of check and comment prefixes
//!
//! # Example
//!
//! ```toml
//! # verify.toml
//! [prefixes]
//! check = ["CHECK", "SIL"]
//! comment = ["//"]
//!
//! [matching]
//! strict_whitespace = false
//! implicit_check_not = ["error:"]
//! ```

mod config;
mod error;

pub use config::{Config, ConfigOverrides, MatchingConfig, PrefixConfig, CONFIG_FILE_NAME};
pub use error::{ConfigError, Result};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_basic_config() {
        let toml = r#"
[prefixes]
check = ["SIL"]
        "#;

        let config: Config = toml::from_str(toml).expect("Failed to parse config");
        assert_eq!(config.prefixes.check, vec!["SIL"]);
        assert_eq!(config.prefixes.comment, vec!["//", "#", ";"]);
        assert!(!config.matching.strict_whitespace);
    }
}
