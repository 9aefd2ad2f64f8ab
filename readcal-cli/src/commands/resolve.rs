use owo_colors::OwoColorize;
use owo_colors::Stream::Stdout;

use readcal_core::{Chapter, Clock};
use readcal_lib::{Resolved, Settings};

use super::{materializer, open_engine, runtime};
use crate::error::CliError;

/// How many chapters to show on each side of today.
const PREVIEW: usize = 3;

pub(crate) fn run_resolve(
    settings: &Settings,
    source: &str,
    id: &str,
    refresh: bool,
) -> Result<(), CliError> {
    let engine = open_engine(settings)?;
    let rt = runtime()?;
    let resolved = rt.block_on(engine.resolve(source, id, refresh))?;

    let stats = materializer(&engine, settings).materialize_work(&resolved.work.work_ref())?;
    print_resolved(&resolved, engine.clock().today());
    log::info!(
        "{} {} calendar events added",
        "\u{2714}".if_supports_color(Stdout, |t| t.green()),
        stats.inserted,
    );
    Ok(())
}

fn print_resolved(resolved: &Resolved, today: chrono::NaiveDate) {
    let work = &resolved.work;
    if resolved.degraded {
        log::warn!(
            "{} {} is unreachable; showing cached data",
            "\u{26A0}".if_supports_color(Stdout, |t| t.yellow()),
            work.source,
        );
    }

    log::info!(
        "{} [{}]",
        work.title.if_supports_color(Stdout, |t| t.bold()),
        work.work_ref().to_string().if_supports_color(Stdout, |t| t.cyan()),
    );
    if !work.alternate_titles.is_empty() {
        log::info!("  Also known as: {}", work.alternate_titles.join(", "));
    }
    log::info!("  Status: {}", work.status);
    if !work.authors.is_empty() {
        log::info!("  Authors: {}", work.authors.join(", "));
    }
    if !work.genres.is_empty() {
        log::info!("  Genres: {}", work.genres.join(", "));
    }
    log::info!(
        "  Chapters: {}  Volumes: {}",
        resolved.chapters.len(),
        resolved.volumes.len()
    );
    if let Some(estimate) = &resolved.estimate {
        log::info!(
            "  {}",
            format!("Release dates estimated (count from {})", estimate.source)
                .if_supports_color(Stdout, |t| t.dimmed()),
        );
    }

    let split = resolved
        .chapters
        .iter()
        .position(|c| c.release_date.is_some_and(|d| d >= today))
        .unwrap_or(resolved.chapters.len());
    let (released, upcoming) = resolved.chapters.split_at(split);

    if !released.is_empty() {
        log::info!("");
        log::info!("  Latest:");
        for ch in &released[released.len().saturating_sub(PREVIEW)..] {
            print_chapter(ch);
        }
    }
    if !upcoming.is_empty() {
        log::info!("");
        log::info!("  Upcoming:");
        for ch in upcoming.iter().take(PREVIEW) {
            print_chapter(ch);
        }
    }
}

fn print_chapter(ch: &Chapter) {
    let date = ch
        .release_date
        .map(|d| d.to_string())
        .unwrap_or_else(|| "unknown".to_string());
    let marker = if ch.is_date_confirmed { "" } else { " (projected)" };
    log::info!(
        "    {:>8}  {}{}",
        ch.number_label(),
        date,
        marker.if_supports_color(Stdout, |t| t.dimmed()),
    );
}
