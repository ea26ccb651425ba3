//! CLI argument definitions for the formkit harness.

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use clap_verbosity_flag::{Verbosity, WarnLevel};
use colorchoice_clap::Color;

#[derive(Parser)]
#[command(
    name = "formkit",
    version,
    about = "Validate form schemas against value sets",
    long_about = "Build a form from a declarative schema, apply a value set and run \
                  submission.\n\n\
                  Schemas and values may be JSON or TOML. The exit code is 1 when \
                  submission is suppressed by validation errors."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Adjust log verbosity (-v for debug, -vv for trace, -q for errors only).
    #[command(flatten)]
    pub verbosity: Verbosity<WarnLevel>,

    /// Control ANSI color output (auto, always, never).
    #[command(flatten)]
    pub color: Color,

    /// Explicit log level (overrides -v/-q flags).
    #[arg(long = "log-level", value_enum, global = true)]
    pub log_level: Option<LogLevelArg>,

    /// Log output format (pretty for human, json for machine parsing).
    #[arg(
        long = "log-format",
        value_enum,
        default_value = "pretty",
        global = true
    )]
    pub log_format: LogFormatArg,

    /// Write logs to a file instead of stderr.
    #[arg(long = "log-file", value_name = "PATH", global = true)]
    pub log_file: Option<PathBuf>,

    /// Allow field values to appear in logs.
    #[arg(long = "log-data", global = true)]
    pub log_data: bool,
}

#[derive(Subcommand)]
pub enum Command {
    /// Build a form from a schema, apply values and submit it.
    Validate(ValidateArgs),

    /// List every rule in the rule library.
    Rules,
}

#[derive(Parser)]
pub struct ValidateArgs {
    /// Form schema: a list of field declarations (JSON or TOML).
    #[arg(value_name = "SCHEMA")]
    pub schema: PathBuf,

    /// Initial values for the form (JSON or TOML object).
    #[arg(long = "values", value_name = "FILE")]
    pub values: Option<PathBuf>,

    /// Form settings (TOML): id prefix, locale, error visibility, messages.
    #[arg(long = "config", value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Report format.
    #[arg(long = "format", value_enum, default_value = "table")]
    pub format: ReportFormatArg,
}

#[derive(Clone, Copy, ValueEnum)]
pub enum ReportFormatArg {
    Table,
    Json,
}

/// CLI log level choices.
#[derive(Clone, Copy, ValueEnum)]
pub enum LogLevelArg {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// CLI log format choices.
#[derive(Clone, Copy, ValueEnum)]
pub enum LogFormatArg {
    Pretty,
    Compact,
    Json,
}
