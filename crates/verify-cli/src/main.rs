use clap::{ArgAction, Parser, ValueEnum};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::debug;
use tracing_subscriber::{fmt, EnvFilter};
use verify_config::{Config, ConfigOverrides};
use verify_driver::{JsonReport, Session, Target, VerifyError};

#[derive(Parser)]
#[command(name = "verify")]
#[command(author, version, about = "Check text against directives embedded in comments")]
struct Cli {
    /// File carrying the check directives
    directives: PathBuf,

    /// Output to verify, or `-` for standard input
    input: PathBuf,

    /// Check prefix to look for (repeatable, replaces the configured list)
    #[arg(long = "check-prefix", value_name = "PREFIX")]
    check_prefixes: Vec<String>,

    /// Comment prefix that introduces directives (repeatable)
    #[arg(long = "comment-prefix", value_name = "PREFIX")]
    comment_prefixes: Vec<String>,

    /// Pattern that must not occur between any two matches (repeatable)
    #[arg(long = "implicit-check-not", value_name = "PATTERN")]
    implicit_check_not: Vec<String>,

    /// Match whitespace exactly instead of treating runs as one blank
    #[arg(long)]
    strict_whitespace: bool,

    /// Require positive patterns to match whole lines
    #[arg(long)]
    match_full_lines: bool,

    /// Accept an empty input
    #[arg(long)]
    allow_empty: bool,

    /// Configuration file (defaults to ./verify.toml when present)
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Output format
    #[arg(long, value_enum, default_value = "text")]
    format: Format,

    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,
}

#[derive(Clone, Copy, ValueEnum)]
enum Format {
    /// Diagnostics on stderr, silent on success
    Text,
    /// A JSON report on stdout
    Json,
}

impl Cli {
    fn overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            check_prefixes: self.check_prefixes.clone(),
            comment_prefixes: self.comment_prefixes.clone(),
            implicit_check_not: self.implicit_check_not.clone(),
            strict_whitespace: self.strict_whitespace.then_some(true),
            match_full_lines: self.match_full_lines.then_some(true),
            allow_empty: self.allow_empty.then_some(true),
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    setup_logging(cli.verbose);

    // Only fails if a hook is already installed.
    let _ = miette::set_hook(Box::new(|_| {
        Box::new(
            miette::MietteHandlerOpts::new()
                .terminal_links(true)
                .unicode(true)
                .context_lines(3)
                .build(),
        )
    }));

    ExitCode::from(run(&cli))
}

fn run(cli: &Cli) -> u8 {
    let target = Target::from_arg(&cli.input);
    let result = Config::load(cli.config.as_deref(), Path::new("."))
        .map_err(VerifyError::from)
        .and_then(|config| {
            let config = config.apply(cli.overrides());
            debug!(?config, "resolved configuration");
            let mut session = Session::new(config)?;
            let verified = session.verify(&cli.directives, &target)?;
            Ok((session, verified))
        });

    match (cli.format, result) {
        (Format::Text, Ok((_, verified))) => {
            if cli.verbose > 0 {
                eprintln!("{}", verified.summary());
            }
            0
        }
        (Format::Text, Err(err)) => {
            let code = err.exit_code();
            eprintln!("{:?}", miette::Report::new(err));
            code
        }
        (Format::Json, Ok((session, verified))) => {
            print_json(&JsonReport::pass(&session, &verified), 0)
        }
        (Format::Json, Err(err)) => print_json(
            &JsonReport::fail(&cli.directives, &target.name(), &err),
            err.exit_code(),
        ),
    }
}

fn print_json(report: &JsonReport, code: u8) -> u8 {
    match report.to_json() {
        Ok(json) => {
            println!("{json}");
            code
        }
        Err(e) => {
            eprintln!("Failed to serialize report: {e}");
            2
        }
    }
}

fn setup_logging(verbose: u8) {
    let default_level = match verbose {
        0 => "warn",
        1 => "debug",
        _ => "trace",
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    fmt::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .init();
}
