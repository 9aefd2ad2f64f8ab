use owo_colors::OwoColorize;
use owo_colors::Stream::Stdout;

use readcal_lib::{EngineError, Settings};

use super::open_engine;
use crate::error::CliError;

/// Clear cached payloads for one source, or everything.
pub(crate) fn run_cache_clear(settings: &Settings, source: Option<String>) -> Result<(), CliError> {
    let engine = open_engine(settings)?;
    let removed = engine.invalidate_cache(source.as_deref())?;
    let scope = match &source {
        Some(name) => format!(" for {name}"),
        None => String::new(),
    };
    log::info!(
        "{} Cache cleared{} ({} entries removed)",
        "\u{2714}".if_supports_color(Stdout, |t| t.green()),
        scope,
        removed,
    );
    Ok(())
}

/// Row counts per table.
pub(crate) fn run_cache_stats(settings: &Settings) -> Result<(), CliError> {
    let engine = open_engine(settings)?;
    let stats = engine
        .store()
        .execute_with_retry(readcal_db::store_stats)
        .map_err(EngineError::from)?;

    log::info!(
        "{} {}",
        "Database".if_supports_color(Stdout, |t| t.bold()),
        settings.database_path().display(),
    );
    log::info!("  Works:           {}", stats.works);
    log::info!("  Chapters:        {}", stats.chapters);
    log::info!("  Volumes:         {}", stats.volumes);
    log::info!("  Cache entries:   {}", stats.cache_entries);
    log::info!("  Calendar events: {}", stats.events);
    Ok(())
}
