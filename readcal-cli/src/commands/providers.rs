use std::path::Path;

use owo_colors::OwoColorize;
use owo_colors::Stream::Stdout;

use readcal_lib::{EngineError, Settings};
use readcal_providers::ProviderRegistry;

use super::open_engine;
use crate::error::CliError;

/// List providers in priority order with their flags.
pub(crate) fn run_providers_list(settings: &Settings) -> Result<(), CliError> {
    let engine = open_engine(settings)?;
    log::info!(
        "{}",
        "Metadata sources (priority order):".if_supports_color(Stdout, |t| t.bold()),
    );
    for info in engine.registry().info() {
        let state = if info.enabled {
            format!("{}", "enabled".if_supports_color(Stdout, |t| t.green()))
        } else {
            format!("{}", "disabled".if_supports_color(Stdout, |t| t.red()))
        };
        let mut notes = Vec::new();
        if info.chapter_data_poor {
            notes.push("dates estimated");
        }
        if info.counts {
            notes.push("chapter counts");
        }
        log::info!(
            "  {:<10} {}  {}",
            info.name,
            state,
            notes.join(", ").if_supports_color(Stdout, |t| t.dimmed()),
        );
    }
    Ok(())
}

/// Flip one provider's flag in the settings file.
pub(crate) fn run_set_enabled(
    mut settings: Settings,
    config_path: &Path,
    name: &str,
    enabled: bool,
) -> Result<(), CliError> {
    let registry = ProviderRegistry::with_defaults().map_err(EngineError::from)?;
    if !registry.names().iter().any(|n| *n == name) {
        return Err(EngineError::UnknownProvider(name.to_string()).into());
    }

    settings.provider_enabled.insert(name.to_string(), enabled);
    settings.save_to(config_path)?;
    log::info!(
        "{} {} {} (saved to {})",
        "\u{2714}".if_supports_color(Stdout, |t| t.green()),
        name.if_supports_color(Stdout, |t| t.bold()),
        if enabled { "enabled" } else { "disabled" },
        config_path.display(),
    );
    Ok(())
}
