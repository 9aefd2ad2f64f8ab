use std::collections::HashMap;
use std::sync::Arc;

use readcal_core::ProviderError;

use crate::provider::{CountProvider, MetadataProvider};
use crate::{AniListProvider, JikanProvider, MangaDexProvider};

struct Entry {
    provider: Arc<dyn MetadataProvider>,
    counts: Option<Arc<dyn CountProvider>>,
    enabled: bool,
}

/// Summary row for listing providers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderInfo {
    pub name: &'static str,
    pub enabled: bool,
    pub chapter_data_poor: bool,
    pub counts: bool,
}

/// Registered providers in declared priority order.
///
/// The set of providers is fixed once built; only the enabled flags change.
#[derive(Default)]
pub struct ProviderRegistry {
    entries: Vec<Entry>,
}

impl ProviderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// The three built-in sources, priority `anilist`, `mangadex`, `jikan`.
    pub fn with_defaults() -> Result<Self, ProviderError> {
        let anilist = Arc::new(AniListProvider::new()?);
        let mangadex = Arc::new(MangaDexProvider::new()?);
        let jikan = Arc::new(JikanProvider::new()?);

        let mut registry = Self::new();
        registry.register_with_counts(anilist.clone(), anilist);
        registry.register_with_counts(mangadex.clone(), mangadex);
        registry.register_with_counts(jikan.clone(), jikan);
        Ok(registry)
    }

    /// Append a provider at the lowest priority.
    pub fn register(&mut self, provider: Arc<dyn MetadataProvider>) {
        self.entries.push(Entry {
            provider,
            counts: None,
            enabled: true,
        });
    }

    /// Append a provider that also takes part in chapter-count races.
    pub fn register_with_counts(
        &mut self,
        provider: Arc<dyn MetadataProvider>,
        counts: Arc<dyn CountProvider>,
    ) {
        self.entries.push(Entry {
            provider,
            counts: Some(counts),
            enabled: true,
        });
    }

    /// Returns false if no provider has that name.
    pub fn set_enabled(&mut self, name: &str, enabled: bool) -> bool {
        match self.entries.iter_mut().find(|e| e.provider.name() == name) {
            Some(entry) => {
                entry.enabled = enabled;
                true
            }
            None => false,
        }
    }

    /// Apply a `name -> enabled` map. Names not in the map keep their flag.
    pub fn apply_enabled(&mut self, flags: &HashMap<String, bool>) {
        for (name, enabled) in flags {
            if !self.set_enabled(name, *enabled) {
                log::warn!("Ignoring enable flag for unknown provider '{name}'");
            }
        }
    }

    /// Look up an enabled provider by name.
    pub fn get(&self, name: &str) -> Option<Arc<dyn MetadataProvider>> {
        self.entries
            .iter()
            .find(|e| e.enabled && e.provider.name() == name)
            .map(|e| e.provider.clone())
    }

    /// Enabled metadata providers in priority order.
    pub fn enabled(&self) -> Vec<Arc<dyn MetadataProvider>> {
        self.entries
            .iter()
            .filter(|e| e.enabled)
            .map(|e| e.provider.clone())
            .collect()
    }

    /// Enabled count providers in priority order.
    pub fn count_providers(&self) -> Vec<Arc<dyn CountProvider>> {
        self.entries
            .iter()
            .filter(|e| e.enabled)
            .filter_map(|e| e.counts.clone())
            .collect()
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.entries.iter().map(|e| e.provider.name()).collect()
    }

    pub fn info(&self) -> Vec<ProviderInfo> {
        self.entries
            .iter()
            .map(|e| ProviderInfo {
                name: e.provider.name(),
                enabled: e.enabled,
                chapter_data_poor: e.provider.chapter_data_poor(),
                counts: e.counts.is_some(),
            })
            .collect()
    }
}
