//! Jikan (unofficial MyAnimeList) adapter.

use std::time::Duration;

use async_trait::async_trait;
use readcal_core::{Chapter, CountCandidate, ProviderError, Work, WorkStatus};
use serde::Deserialize;

use crate::client::{HttpClient, parse_date_prefix};
use crate::provider::{CountProvider, MetadataProvider};

const NAME: &str = "jikan";
const API_URL: &str = "https://api.jikan.moe/v4";
const MIN_REQUEST_INTERVAL: Duration = Duration::from_millis(400);
const SEARCH_LIMIT: u32 = 10;

pub struct JikanProvider {
    client: HttpClient,
}

impl JikanProvider {
    pub fn new() -> Result<Self, ProviderError> {
        Ok(Self {
            client: HttpClient::new(NAME, MIN_REQUEST_INTERVAL)?,
        })
    }

    async fn search_raw(&self, query: &str, limit: u32) -> Result<Vec<JikanManga>, ProviderError> {
        let params = [("q", query.to_string()), ("limit", limit.to_string())];
        let resp: JikanList = self
            .client
            .get_json(&format!("{API_URL}/manga"), &params)
            .await?;
        Ok(resp.data)
    }
}

#[async_trait]
impl MetadataProvider for JikanProvider {
    fn name(&self) -> &'static str {
        NAME
    }

    fn chapter_data_poor(&self) -> bool {
        true
    }

    async fn search(&self, query: &str) -> Result<Vec<Work>, ProviderError> {
        let found = self.search_raw(query, SEARCH_LIMIT).await?;
        Ok(found.into_iter().map(manga_to_work).collect())
    }

    async fn fetch_details(&self, source_id: &str) -> Result<Work, ProviderError> {
        if source_id.parse::<u64>().is_err() {
            return Err(ProviderError::not_found(format!("MyAnimeList id '{source_id}'")));
        }
        let resp: JikanEntity = self
            .client
            .get_json(&format!("{API_URL}/manga/{source_id}"), &[] as &[(&str, &str)])
            .await?;
        Ok(manga_to_work(resp.data))
    }

    async fn fetch_chapters(&self, _source_id: &str) -> Result<Vec<Chapter>, ProviderError> {
        Ok(Vec::new())
    }

    async fn fetch_latest(&self) -> Result<Vec<Work>, ProviderError> {
        let params = [("filter", "publishing"), ("limit", "10")];
        let resp: JikanList = self
            .client
            .get_json(&format!("{API_URL}/top/manga"), &params)
            .await?;
        Ok(resp.data.into_iter().map(manga_to_work).collect())
    }
}

#[async_trait]
impl CountProvider for JikanProvider {
    fn name(&self) -> &'static str {
        NAME
    }

    async fn count(&self, title: &str) -> Result<Option<CountCandidate>, ProviderError> {
        let found = self.search_raw(title, 1).await?;
        Ok(found.first().and_then(manga_counts))
    }
}

// -- Wire types --

#[derive(Debug, Deserialize)]
struct JikanList {
    #[serde(default)]
    data: Vec<JikanManga>,
}

#[derive(Debug, Deserialize)]
struct JikanEntity {
    data: JikanManga,
}

#[derive(Debug, Deserialize)]
pub(crate) struct JikanManga {
    pub mal_id: u64,
    pub title: String,
    pub title_english: Option<String>,
    pub title_japanese: Option<String>,
    #[serde(default)]
    pub title_synonyms: Vec<String>,
    pub status: Option<String>,
    pub chapters: Option<u32>,
    pub volumes: Option<u32>,
    #[serde(default)]
    pub genres: Vec<Named>,
    #[serde(default)]
    pub demographics: Vec<Named>,
    #[serde(default)]
    pub authors: Vec<Named>,
    pub published: Option<Published>,
    pub synopsis: Option<String>,
    pub images: Option<Images>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct Named {
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct Published {
    pub from: Option<String>,
    pub to: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct Images {
    pub jpg: Option<ImageSet>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ImageSet {
    pub large_image_url: Option<String>,
}

// -- Mapping --

/// Demographics (Shounen, Seinen, ...) are folded into genres so cadence
/// rules can see them.
pub(crate) fn manga_to_work(manga: JikanManga) -> Work {
    let title = manga.title_english.clone().unwrap_or_else(|| manga.title.clone());
    let mut work = Work::new(NAME, manga.mal_id.to_string(), title.clone());

    let mut alternates = Vec::new();
    let candidates = std::iter::once(manga.title)
        .chain(manga.title_japanese)
        .chain(manga.title_synonyms);
    for alt in candidates {
        if alt != title && !alternates.contains(&alt) {
            alternates.push(alt);
        }
    }
    work.alternate_titles = alternates;
    work.status = manga
        .status
        .as_deref()
        .map(WorkStatus::from_source)
        .unwrap_or_default();
    work.genres = manga
        .genres
        .into_iter()
        .chain(manga.demographics)
        .map(|g| g.name)
        .collect();
    work.authors = manga.authors.into_iter().map(|a| a.name).collect();
    if let Some(published) = manga.published {
        work.start_date = published.from.as_deref().and_then(parse_date_prefix);
        work.end_date = published.to.as_deref().and_then(parse_date_prefix);
    }
    work.chapter_count = manga.chapters.filter(|&c| c > 0);
    work.volume_count = manga.volumes.filter(|&v| v > 0);
    work.description = manga.synopsis;
    work.cover_url = manga
        .images
        .and_then(|i| i.jpg)
        .and_then(|j| j.large_image_url);
    work
}

pub(crate) fn manga_counts(manga: &JikanManga) -> Option<CountCandidate> {
    let chapters = manga.chapters.unwrap_or(0);
    if chapters == 0 {
        return None;
    }
    Some(CountCandidate::new(NAME, chapters, manga.volumes.unwrap_or(0)))
}

#[cfg(test)]
#[path = "tests/jikan_tests.rs"]
mod tests;
