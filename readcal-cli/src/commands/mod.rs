pub(crate) mod cache;
pub(crate) mod calendar;
pub(crate) mod providers;
pub(crate) mod resolve;
pub(crate) mod search;

use owo_colors::OwoColorize;
use owo_colors::Stream::Stdout;

use readcal_core::Work;
use readcal_lib::{CalendarMaterializer, Engine, Settings};

use crate::error::CliError;

pub(crate) fn runtime() -> Result<tokio::runtime::Runtime, CliError> {
    tokio::runtime::Runtime::new()
        .map_err(|e| CliError::runtime(format!("Failed to create tokio runtime: {e}")))
}

pub(crate) fn open_engine(settings: &Settings) -> Result<Engine, CliError> {
    Ok(Engine::from_settings(settings)?)
}

pub(crate) fn materializer(engine: &Engine, settings: &Settings) -> CalendarMaterializer {
    CalendarMaterializer::new(
        engine.store().clone(),
        engine.clock().clone(),
        settings.calendar_range_days,
    )
}

/// One-line summary: `anilist:30013  One Piece  [ONGOING, 1112 ch]`.
pub(crate) fn print_work_line(work: &Work) {
    let mut extra = vec![work.status.to_string()];
    if let Some(n) = work.chapter_count {
        extra.push(format!("{n} ch"));
    }
    log::info!(
        "  {}  {}  [{}]",
        work.work_ref()
            .to_string()
            .if_supports_color(Stdout, |t| t.dimmed()),
        work.title.if_supports_color(Stdout, |t| t.bold()),
        extra.join(", "),
    );
}
