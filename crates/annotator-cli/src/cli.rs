//! CLI argument definitions for the metadata annotator.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};
use clap_verbosity_flag::{Verbosity, WarnLevel};
use colorchoice_clap::Color;

#[derive(Parser)]
#[command(
    name = "metadata-annotator",
    version,
    about = "Correct metadata attributes of gridded science files from a rule set",
    long_about = "Correct metadata attributes of gridded science files from a rule set.\n\n\
                  Reads a metadata tree document (groups, variables, attributes and\n\
                  dimension sizes), applies the overrides matching the file's collection,\n\
                  synthesizes projected x/y coordinates from grid-mapping geotransforms,\n\
                  and writes the corrected tree."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Adjust log verbosity (-v for info, -vv for debug, -q for errors only).
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
}

#[derive(Subcommand)]
pub enum Command {
    /// Apply the rule set to a metadata tree document.
    Annotate(AnnotateArgs),

    /// Print the collection short name and mission of a tree without changing it.
    Resolve(ResolveArgs),

    /// List the overrides that apply to a collection.
    Overrides(OverridesArgs),
}

#[derive(Args)]
pub struct RulesArg {
    /// Rule set document (default: $METADATA_ANNOTATOR_RULES, then the bundled rules).
    #[arg(long = "rules", value_name = "PATH")]
    pub rules: Option<PathBuf>,
}

#[derive(Parser)]
pub struct AnnotateArgs {
    /// Metadata tree document to annotate ("-" reads stdin).
    #[arg(value_name = "TREE")]
    pub input: PathBuf,

    /// Where to write the annotated tree (default: stdout).
    #[arg(long = "output", short = 'o', value_name = "PATH")]
    pub output: Option<PathBuf>,

    #[command(flatten)]
    pub rules: RulesArg,

    /// Collection short name, skipping the attribute lookup.
    #[arg(long = "short-name", value_name = "NAME")]
    pub short_name: Option<String>,

    /// Do not append a provenance line to the history attribute.
    #[arg(long = "no-history")]
    pub no_history: bool,

    /// Fail when no mission pattern matches the collection.
    ///
    /// By default such files pass through unchanged.
    #[arg(long = "strict")]
    pub strict: bool,

    /// Report what would change without writing the tree.
    #[arg(long = "dry-run")]
    pub dry_run: bool,
}

#[derive(Parser)]
pub struct ResolveArgs {
    /// Metadata tree document ("-" reads stdin).
    #[arg(value_name = "TREE")]
    pub input: PathBuf,

    #[command(flatten)]
    pub rules: RulesArg,
}

#[derive(Parser)]
pub struct OverridesArgs {
    /// Collection short name to match against.
    #[arg(value_name = "SHORT_NAME")]
    pub short_name: String,

    /// Only list overrides whose variable pattern matches this path.
    #[arg(long = "path", value_name = "PATH")]
    pub path: Option<String>,

    #[command(flatten)]
    pub rules: RulesArg,
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
