//! Checker configuration types (verify.toml format).

use crate::error::{ConfigError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;

/// File looked up in the working directory when no `--config` is given.
pub const CONFIG_FILE_NAME: &str = "verify.toml";

/// Root checker configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Directive and comment prefixes.
    #[serde(default)]
    pub prefixes: PrefixConfig,

    /// Matching behaviour.
    #[serde(default)]
    pub matching: MatchingConfig,
}

/// Which prefixes introduce directives.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PrefixConfig {
    /// Check prefixes (e.g. `CHECK` in `// CHECK-NOT: foo`).
    #[serde(default = "default_check_prefixes")]
    pub check: Vec<String>,

    /// Comment markers a directive must follow.
    #[serde(default = "default_comment_prefixes")]
    pub comment: Vec<String>,
}

impl Default for PrefixConfig {
    fn default() -> Self {
        Self {
            check: default_check_prefixes(),
            comment: default_comment_prefixes(),
        }
    }
}

fn default_check_prefixes() -> Vec<String> {
    vec!["CHECK".to_string()]
}

fn default_comment_prefixes() -> Vec<String> {
    vec!["//".to_string(), "#".to_string(), ";".to_string()]
}

/// Matching behaviour.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MatchingConfig {
    /// Match horizontal whitespace exactly instead of as `[ \t]+`.
    #[serde(default)]
    pub strict_whitespace: bool,

    /// Every positive pattern must match a whole line.
    #[serde(default)]
    pub match_full_lines: bool,

    /// Accept an empty input.
    #[serde(default)]
    pub allow_empty: bool,

    /// Patterns that must not appear anywhere between positive matches.
    #[serde(default)]
    pub implicit_check_not: Vec<String>,
}

/// Values supplied on the command line. `None`/empty leaves the file value.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub check_prefixes: Vec<String>,
    pub comment_prefixes: Vec<String>,
    pub implicit_check_not: Vec<String>,
    pub strict_whitespace: Option<bool>,
    pub match_full_lines: Option<bool>,
    pub allow_empty: Option<bool>,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        debug!(path = %path.display(), "loaded configuration");
        Ok(config)
    }

    /// Load `path` if given, otherwise `verify.toml` in `dir` if it exists,
    /// otherwise the defaults.
    pub fn load(path: Option<&Path>, dir: &Path) -> Result<Self> {
        if let Some(path) = path {
            return Self::from_file(path);
        }
        let candidate: PathBuf = dir.join(CONFIG_FILE_NAME);
        if candidate.is_file() {
            Self::from_file(&candidate)
        } else {
            Ok(Self::default())
        }
    }

    /// Layer command-line values on top of this configuration.
    ///
    /// Prefix lists given on the command line replace the file's lists;
    /// implicit NOT patterns are appended.
    pub fn apply(mut self, overrides: ConfigOverrides) -> Self {
        if !overrides.check_prefixes.is_empty() {
            self.prefixes.check = overrides.check_prefixes;
        }
        if !overrides.comment_prefixes.is_empty() {
            self.prefixes.comment = overrides.comment_prefixes;
        }
        self.matching
            .implicit_check_not
            .extend(overrides.implicit_check_not);
        if let Some(v) = overrides.strict_whitespace {
            self.matching.strict_whitespace = v;
        }
        if let Some(v) = overrides.match_full_lines {
            self.matching.match_full_lines = v;
        }
        if let Some(v) = overrides.allow_empty {
            self.matching.allow_empty = v;
        }
        self
    }

    /// Check prefix rules. Must be called before the config is used.
    pub fn validate(&self) -> Result<()> {
        if self.prefixes.check.is_empty() {
            return Err(ConfigError::Validation(
                "at least one check prefix is required".to_string(),
            ));
        }
        if self.prefixes.comment.is_empty() {
            return Err(ConfigError::Validation(
                "at least one comment prefix is required".to_string(),
            ));
        }

        for (i, prefix) in self.prefixes.check.iter().enumerate() {
            validate_check_prefix(prefix)?;
            if self.prefixes.check[..i].contains(prefix) {
                return Err(ConfigError::DuplicatePrefix {
                    role: "check",
                    prefix: prefix.clone(),
                });
            }
        }

        for (i, prefix) in self.prefixes.comment.iter().enumerate() {
            if prefix.is_empty() {
                return Err(invalid("comment", prefix, "must not be empty"));
            }
            if prefix.chars().any(char::is_whitespace) {
                return Err(invalid("comment", prefix, "must not contain whitespace"));
            }
            if self.prefixes.comment[..i].contains(prefix) {
                return Err(ConfigError::DuplicatePrefix {
                    role: "comment",
                    prefix: prefix.clone(),
                });
            }
        }

        if self
            .matching
            .implicit_check_not
            .iter()
            .any(|p| p.trim().is_empty())
        {
            return Err(ConfigError::Validation(
                "implicit-check-not patterns must not be empty".to_string(),
            ));
        }

        Ok(())
    }
}

fn validate_check_prefix(prefix: &str) -> Result<()> {
    let mut chars = prefix.chars();
    match chars.next() {
        None => return Err(invalid("check", prefix, "must not be empty")),
        Some(c) if !c.is_ascii_alphabetic() => {
            return Err(invalid("check", prefix, "must start with a letter"))
        }
        Some(_) => {}
    }
    if !chars.all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_') {
        return Err(invalid(
            "check",
            prefix,
            "may only contain letters, digits, '-' and '_'",
        ));
    }
    Ok(())
}

fn invalid(role: &'static str, prefix: &str, reason: &'static str) -> ConfigError {
    ConfigError::InvalidPrefix {
        role,
        prefix: prefix.to_string(),
        reason,
    }
}
