use crate::error::VerifyError;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};
use verify_common::{SourceFile, SourceKind, SourceMap, SymbolInterner};
use verify_config::Config;
use verify_directive::{CheckFile, Scanner};
use verify_matcher::{MatchOptions, MatchReport, SequentialMatcher};
use verify_pattern::{PatternOptions, PatternSet};

const STDIN_NAME: &str = "<stdin>";
const IMPLICIT_NAME: &str = "<implicit-check-not>";

/// The text being verified.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Target {
    File(PathBuf),
    Stdin,
}

impl Target {
    /// `-` means standard input.
    pub fn from_arg(arg: impl Into<PathBuf>) -> Self {
        let path = arg.into();
        if path.as_os_str() == "-" {
            Target::Stdin
        } else {
            Target::File(path)
        }
    }

    /// Name used in diagnostics.
    pub fn name(&self) -> PathBuf {
        match self {
            Target::File(path) => path.clone(),
            Target::Stdin => PathBuf::from(STDIN_NAME),
        }
    }

    fn read(&self) -> Result<String, VerifyError> {
        match self {
            Target::File(path) => read_file(path),
            Target::Stdin => {
                let mut content = String::new();
                std::io::stdin()
                    .read_to_string(&mut content)
                    .map_err(|source| VerifyError::Io {
                        path: PathBuf::from(STDIN_NAME),
                        source,
                    })?;
                Ok(content)
            }
        }
    }
}

/// A successful verification and everything needed to report on it.
#[derive(Debug)]
pub struct Verified {
    pub directives: Arc<SourceFile>,
    pub input: Arc<SourceFile>,
    pub check: CheckFile,
    pub report: MatchReport,
}

/// Process-scoped state shared by every verification run.
///
/// Holds the resolved configuration, the files of the most recent run and
/// the variable-name interner. Callers create one and pass it to each run.
pub struct Session {
    config: Config,
    source_map: SourceMap,
    interner: SymbolInterner,
}

impl Session {
    /// Create a session; the configuration is validated first.
    pub fn new(config: Config) -> Result<Self, VerifyError> {
        config.validate()?;
        Ok(Self {
            config,
            source_map: SourceMap::new(),
            interner: SymbolInterner::new(),
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn source_map(&self) -> &SourceMap {
        &self.source_map
    }

    pub fn interner(&self) -> &SymbolInterner {
        &self.interner
    }

    /// Verify `target` against the directives in the file at `directives`.
    pub fn verify(&mut self, directives: &Path, target: &Target) -> Result<Verified, VerifyError> {
        let directives_text = read_file(directives)?;
        let input = target.read()?;
        self.verify_text(directives, directives_text, &target.name(), input)
    }

    /// Verify in-memory text. The paths are only used for diagnostics.
    pub fn verify_text(
        &mut self,
        directives_path: &Path,
        directives: String,
        input_path: &Path,
        input: String,
    ) -> Result<Verified, VerifyError> {
        // Earlier runs keep their files alive through `Verified` and their
        // diagnostics, not through the session.
        self.source_map.clear();
        let directives = self
            .source_map
            .add_file(directives_path, directives, SourceKind::Directives);
        let check = Scanner::new(&self.config.prefixes).scan(&directives)?;

        let options = PatternOptions::from(&self.config.matching);
        let mut patterns = PatternSet::compile(&check, &directives, options, &mut self.interner)?;

        let implicit = if self.config.matching.implicit_check_not.is_empty() {
            None
        } else {
            let mut content = self.config.matching.implicit_check_not.join("\n");
            content.push('\n');
            let file = self
                .source_map
                .add_file(IMPLICIT_NAME, content, SourceKind::Directives);
            patterns = patterns.with_implicit_not(&file, options, &mut self.interner)?;
            Some(file)
        };

        let input = self
            .source_map
            .add_file(input_path, input, SourceKind::Input);
        info!(
            directives = %directives.display_name(),
            input = %input.display_name(),
            count = check.len(),
            "verifying"
        );

        let mut matcher =
            SequentialMatcher::new(&check, &patterns, &directives, &input, &self.interner)
                .with_options(MatchOptions::from(&self.config.matching));
        if let Some(file) = implicit.as_deref() {
            matcher = matcher.with_implicit_source(file);
        }
        let report = matcher.run()?;

        info!(matches = report.matches.len(), "verification passed");
        Ok(Verified {
            directives,
            input,
            check,
            report,
        })
    }
}

fn read_file(path: &Path) -> Result<String, VerifyError> {
    debug!(path = %path.display(), "reading");
    std::fs::read_to_string(path).map_err(|source| VerifyError::Io {
        path: path.to_path_buf(),
        source,
    })
}
