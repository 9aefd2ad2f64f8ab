//! Application settings (calendar range, cache ttl, provider flags, database
//! location).
//!
//! The settings file is always `~/.config/readcal/settings.toml`. A missing
//! file means defaults; a partial file merges over them.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::SettingsError;

pub const DEFAULT_CALENDAR_RANGE_DAYS: u32 = 14;
pub const DEFAULT_CACHE_TTL_DAYS: u32 = 7;
pub const DEFAULT_RACE_CONCURRENCY: usize = 4;
pub const DEFAULT_PROVIDER_TIMEOUT_SECS: u64 = 10;

/// Canonical path to the settings file: `~/.config/readcal/settings.toml`.
pub fn settings_path() -> PathBuf {
    let config = dirs::config_dir().unwrap_or_else(|| PathBuf::from("."));
    config.join("readcal").join("settings.toml")
}

/// Default database location: `~/.local/share/readcal/readcal.db` on Linux.
pub fn default_database_path() -> PathBuf {
    let data = dirs::data_dir().unwrap_or_else(|| PathBuf::from("."));
    data.join("readcal").join("readcal.db")
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// How many days ahead of today the calendar is materialized.
    pub calendar_range_days: u32,
    pub cache_ttl_days: u32,
    /// Provider name to enabled flag. Providers not listed stay enabled.
    pub provider_enabled: BTreeMap<String, bool>,
    /// Worker count for chapter-count races.
    pub race_concurrency: usize,
    pub provider_timeout_secs: u64,
    pub database_path: Option<PathBuf>,
}

impl Default for Settings {
    fn default() -> Self {
        let provider_enabled = ["anilist", "mangadex", "jikan"]
            .into_iter()
            .map(|name| (name.to_string(), true))
            .collect();
        Self {
            calendar_range_days: DEFAULT_CALENDAR_RANGE_DAYS,
            cache_ttl_days: DEFAULT_CACHE_TTL_DAYS,
            provider_enabled,
            race_concurrency: DEFAULT_RACE_CONCURRENCY,
            provider_timeout_secs: DEFAULT_PROVIDER_TIMEOUT_SECS,
            database_path: None,
        }
    }
}

impl Settings {
    /// Load from the canonical settings path.
    pub fn load() -> Result<Self, SettingsError> {
        Self::load_from(&settings_path())
    }

    /// Load from `path`. A missing file yields defaults.
    pub fn load_from(path: &Path) -> Result<Self, SettingsError> {
        let contents = match std::fs::read_to_string(path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                log::debug!("No settings at {}, using defaults", path.display());
                return Ok(Self::default());
            }
            Err(source) => {
                return Err(SettingsError::Io {
                    path: path.display().to_string(),
                    source,
                });
            }
        };
        Self::parse(&contents).map_err(|source| SettingsError::Parse {
            path: path.display().to_string(),
            source,
        })
    }

    pub fn parse(contents: &str) -> Result<Self, toml::de::Error> {
        let mut settings: Settings = toml::from_str(contents)?;
        // A partial provider table only overrides the names it lists.
        for (name, enabled) in Settings::default().provider_enabled {
            settings.provider_enabled.entry(name).or_insert(enabled);
        }
        Ok(settings)
    }

    /// Write atomically to `path`, creating parent directories.
    pub fn save_to(&self, path: &Path) -> Result<(), SettingsError> {
        let io_err = |source| SettingsError::Io {
            path: path.display().to_string(),
            source,
        };
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(io_err)?;
        }
        let serialized = toml::to_string_pretty(self)?;
        let tmp = path.with_extension("toml.tmp");
        std::fs::write(&tmp, &serialized).map_err(io_err)?;
        std::fs::rename(&tmp, path).map_err(io_err)?;
        Ok(())
    }

    pub fn cache_ttl(&self) -> chrono::Duration {
        chrono::Duration::days(i64::from(self.cache_ttl_days))
    }

    pub fn provider_timeout(&self) -> Duration {
        Duration::from_secs(self.provider_timeout_secs)
    }

    /// Concurrency of at least one worker.
    pub fn race_workers(&self) -> usize {
        self.race_concurrency.max(1)
    }

    pub fn database_path(&self) -> PathBuf {
        self.database_path
            .clone()
            .unwrap_or_else(default_database_path)
    }

    /// Flags as the provider registry consumes them.
    pub fn provider_flags(&self) -> std::collections::HashMap<String, bool> {
        self.provider_enabled
            .iter()
            .map(|(k, v)| (k.clone(), *v))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let settings = Settings::load_from(&dir.path().join("nope.toml")).unwrap();
        assert_eq!(settings, Settings::default());
        assert_eq!(settings.calendar_range_days, 14);
        assert_eq!(settings.cache_ttl(), chrono::Duration::days(7));
    }

    #[test]
    fn partial_file_merges_over_defaults() {
        let settings = Settings::parse(
            r#"
            calendar_range_days = 30
            unknown_key = "ignored"

            [provider_enabled]
            jikan = false
            "#,
        )
        .unwrap();
        assert_eq!(settings.calendar_range_days, 30);
        assert_eq!(settings.cache_ttl_days, 7);
        assert_eq!(settings.provider_enabled.get("jikan"), Some(&false));
        assert_eq!(settings.provider_enabled.get("anilist"), Some(&true));
        assert_eq!(settings.race_concurrency, 4);
    }

    #[test]
    fn invalid_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.toml");
        std::fs::write(&path, "calendar_range_days = \"soon\"").unwrap();
        assert!(matches!(
            Settings::load_from(&path),
            Err(SettingsError::Parse { .. })
        ));
    }

    #[test]
    fn save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("readcal").join("settings.toml");
        let mut settings = Settings::default();
        settings.provider_enabled.insert("mangadex".to_string(), false);
        settings.database_path = Some(dir.path().join("db.sqlite"));
        settings.save_to(&path).unwrap();

        assert_eq!(Settings::load_from(&path).unwrap(), settings);
    }
}
