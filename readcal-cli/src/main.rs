//! readcal CLI
//!
//! Command-line interface for reconciling manga release metadata and
//! browsing the resulting release calendar.

mod cli_types;
mod commands;
mod error;

use std::io::Write;
use std::path::PathBuf;

use clap::Parser;
use owo_colors::OwoColorize;
use owo_colors::Stream::Stderr;

use readcal_lib::Settings;
use readcal_lib::settings::settings_path;

use cli_types::{CacheAction, Cli, Commands, ProviderAction};
use error::CliError;

fn main() {
    let cli = Cli::parse();
    init_logging(cli.quiet, cli.verbose);

    if let Err(e) = run(cli) {
        log::error!(
            "{} {}",
            "\u{2718}".if_supports_color(Stderr, |t| t.red()),
            e
        );
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<(), CliError> {
    let config_path: PathBuf = cli.config.unwrap_or_else(settings_path);
    let settings = Settings::load_from(&config_path)?;

    match cli.command {
        Commands::Search { query, source } => commands::search::run_search(&settings, &query, source),
        Commands::Resolve {
            source,
            id,
            refresh,
        } => commands::resolve::run_resolve(&settings, &source, &id, refresh),
        Commands::Calendar { from, to, work } => {
            commands::calendar::run_calendar(&settings, from, to, work)
        }
        Commands::Refresh => commands::calendar::run_refresh(&settings),
        Commands::Latest { source } => commands::search::run_latest(&settings, source),
        Commands::Cache { action } => match action {
            CacheAction::Clear { source } => commands::cache::run_cache_clear(&settings, source),
            CacheAction::Stats => commands::cache::run_cache_stats(&settings),
        },
        Commands::Providers { action } => match action {
            None => commands::providers::run_providers_list(&settings),
            Some(ProviderAction::Enable { name }) => {
                commands::providers::run_set_enabled(settings, &config_path, &name, true)
            }
            Some(ProviderAction::Disable { name }) => {
                commands::providers::run_set_enabled(settings, &config_path, &name, false)
            }
        },
    }
}

/// Plain messages at `info`, `warn` with `--quiet`, timestamps and `debug`
/// with `--verbose`. `RUST_LOG` overrides the level.
fn init_logging(quiet: bool, verbose: bool) {
    let level = if verbose {
        log::LevelFilter::Debug
    } else if quiet {
        log::LevelFilter::Warn
    } else {
        log::LevelFilter::Info
    };

    let mut builder = env_logger::Builder::new();
    builder.filter_level(level).parse_default_env();
    if !verbose {
        builder.format(|buf, record| writeln!(buf, "{}", record.args()));
    }
    builder.init();
}
