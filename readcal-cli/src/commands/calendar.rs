use owo_colors::OwoColorize;
use owo_colors::Stream::Stdout;

use chrono::NaiveDate;
use readcal_core::{EventType, WorkRef};
use readcal_lib::Settings;

use super::{materializer, open_engine};
use crate::error::CliError;

pub(crate) fn run_calendar(
    settings: &Settings,
    from: Option<NaiveDate>,
    to: Option<NaiveDate>,
    work: Option<String>,
) -> Result<(), CliError> {
    let work_ref = match work {
        Some(raw) => {
            let work_ref = WorkRef::from(raw);
            if work_ref.parts().is_none() {
                return Err(CliError::usage(format!(
                    "'{work_ref}' is not a work reference; expected source:id"
                )));
            }
            Some(work_ref)
        }
        None => None,
    };

    let engine = open_engine(settings)?;
    let materializer = materializer(&engine, settings);
    let (window_start, window_end) = materializer.window();
    let from = from.unwrap_or(window_start);
    let to = to.unwrap_or(window_end);
    if from > to {
        return Err(CliError::usage(format!("--from {from} is after --to {to}")));
    }

    let events = materializer.get_calendar_events(from, to, work_ref.as_ref())?;
    log::info!(
        "{} {} to {}",
        "Releases".if_supports_color(Stdout, |t| t.bold()),
        from,
        to
    );
    if events.is_empty() {
        log::info!(
            "{}",
            "Nothing scheduled. Run 'readcal refresh' after resolving works."
                .if_supports_color(Stdout, |t| t.dimmed()),
        );
        return Ok(());
    }

    let mut current: Option<NaiveDate> = None;
    for event in &events {
        if current != Some(event.event_date) {
            current = Some(event.event_date);
            log::info!("");
            log::info!(
                "{}",
                event
                    .event_date
                    .format("%a %Y-%m-%d")
                    .to_string()
                    .if_supports_color(Stdout, |t| t.cyan()),
            );
        }
        let glyph = match event.event_type() {
            EventType::ChapterRelease => "\u{25CF}",
            EventType::VolumeRelease => "\u{25A0}",
        };
        log::info!("  {} {}", glyph, event.title);
    }
    Ok(())
}

pub(crate) fn run_refresh(settings: &Settings) -> Result<(), CliError> {
    let engine = open_engine(settings)?;
    let stats = materializer(&engine, settings).refresh_calendar()?;
    log::info!(
        "{} {} works: {} new events, {} already present, {} pruned",
        "\u{2714}".if_supports_color(Stdout, |t| t.green()),
        stats.works,
        stats.inserted,
        stats.skipped,
        stats.pruned,
    );
    Ok(())
}
