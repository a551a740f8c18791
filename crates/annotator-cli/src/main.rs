//! Metadata annotator CLI.

use std::io::{self, IsTerminal};

use clap::{ColorChoice, Parser};
use tracing::level_filters::LevelFilter;

use annotator_cli::commands::{
    AnnotateRequest, exit_code, load_rules, run_annotate, run_resolve, select_overrides,
};
use annotator_cli::logging::{LogConfig, LogFormat, init_logging};

mod cli;
mod summary;

use crate::cli::{Cli, Command, LogFormatArg, LogLevelArg};
use crate::summary::{print_identity, print_overrides, print_report};

fn main() {
    let cli = Cli::parse();
    cli.color.write_global();
    let log_config = log_config_from_cli(&cli);
    if let Err(error) = init_logging(&log_config) {
        eprintln!("error: failed to initialize logging: {error}");
        std::process::exit(1);
    }
    let result = match cli.command {
        Command::Annotate(args) => {
            let request = AnnotateRequest {
                input: args.input,
                output: args.output,
                rules: args.rules.rules,
                short_name: args.short_name,
                record_history: !args.no_history,
                strict: args.strict,
                dry_run: args.dry_run,
            };
            run_annotate(&request).map(|report| print_report(&report))
        }
        Command::Resolve(args) => run_resolve(&args.input, args.rules.rules.as_deref())
            .map(|identity| print_identity(&identity)),
        Command::Overrides(args) => load_rules(args.rules.rules.as_deref()).and_then(|rules| {
            let (identity, overrides) =
                select_overrides(&rules, &args.short_name, args.path.as_deref())?;
            print_overrides(&rules, &identity, &overrides);
            Ok(())
        }),
    };
    let exit_code = match result {
        Ok(()) => 0,
        Err(error) => {
            eprintln!("error: {error:#}");
            exit_code(&error)
        }
    };
    std::process::exit(exit_code);
}

/// Build logging configuration from CLI flags with consistent precedence.
fn log_config_from_cli(cli: &Cli) -> LogConfig {
    let mut config = LogConfig {
        level_filter: cli.verbosity.tracing_level_filter(),
        ..LogConfig::default()
    };
    config.use_env_filter = !(cli.verbosity.is_present() || cli.log_level.is_some());
    if let Some(level) = cli.log_level {
        config.level_filter = match level {
            LogLevelArg::Error => LevelFilter::ERROR,
            LogLevelArg::Warn => LevelFilter::WARN,
            LogLevelArg::Info => LevelFilter::INFO,
            LogLevelArg::Debug => LevelFilter::DEBUG,
            LogLevelArg::Trace => LevelFilter::TRACE,
        };
    }
    config.format = match cli.log_format {
        LogFormatArg::Pretty => LogFormat::Pretty,
        LogFormatArg::Compact => LogFormat::Compact,
        LogFormatArg::Json => LogFormat::Json,
    };
    config.log_file = cli.log_file.clone();
    config.with_ansi = match cli.color.color {
        ColorChoice::Always => true,
        ColorChoice::Never => false,
        ColorChoice::Auto => cli.log_file.is_none() && io::stderr().is_terminal(),
    };
    config
}
