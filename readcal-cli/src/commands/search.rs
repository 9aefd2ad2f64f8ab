use owo_colors::OwoColorize;
use owo_colors::Stream::Stdout;

use readcal_core::Work;
use readcal_lib::Settings;

use super::{open_engine, print_work_line, runtime};
use crate::error::CliError;

pub(crate) fn run_search(
    settings: &Settings,
    query: &str,
    source: Option<String>,
) -> Result<(), CliError> {
    let engine = open_engine(settings)?;
    let rt = runtime()?;
    let works = rt.block_on(engine.search(query, source.as_deref()))?;
    print_works(&format!("Results for '{query}'"), &works);
    Ok(())
}

pub(crate) fn run_latest(settings: &Settings, source: Option<String>) -> Result<(), CliError> {
    let engine = open_engine(settings)?;
    let rt = runtime()?;
    let works = rt.block_on(engine.latest(source.as_deref()))?;
    print_works("Recently updated", &works);
    Ok(())
}

fn print_works(heading: &str, works: &[Work]) {
    if works.is_empty() {
        log::info!(
            "{}",
            "No works found.".if_supports_color(Stdout, |t| t.dimmed()),
        );
        return;
    }
    log::info!(
        "{} ({})",
        heading.if_supports_color(Stdout, |t| t.bold()),
        works.len()
    );
    for work in works {
        print_work_line(work);
    }
    log::info!("");
    log::info!("Run 'readcal resolve <source> <id>' to track a work.");
}
