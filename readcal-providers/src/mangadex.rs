//! MangaDex REST adapter. The only built-in source with a real chapter feed.

use std::collections::{BTreeSet, HashMap};
use std::time::Duration;

use async_trait::async_trait;
use chrono::NaiveDate;
use readcal_core::{
    Chapter, CountCandidate, ProviderError, Work, WorkRef, WorkStatus, format_chapter_number,
};
use serde::Deserialize;

use crate::client::{HttpClient, parse_date_prefix};
use crate::provider::{CountProvider, MetadataProvider};

const NAME: &str = "mangadex";
const API_URL: &str = "https://api.mangadex.org";
const COVER_URL: &str = "https://uploads.mangadex.org/covers";
const MIN_REQUEST_INTERVAL: Duration = Duration::from_millis(250);
const SEARCH_LIMIT: u32 = 10;
const FEED_PAGE: u32 = 500;
/// MangaDex rejects `offset + limit` beyond this.
const FEED_WINDOW: u32 = 10_000;

pub struct MangaDexProvider {
    client: HttpClient,
}

impl MangaDexProvider {
    pub fn new() -> Result<Self, ProviderError> {
        Ok(Self {
            client: HttpClient::new(NAME, MIN_REQUEST_INTERVAL)?,
        })
    }

    async fn list(&self, mut query: Vec<(&str, String)>) -> Result<Vec<Work>, ProviderError> {
        query.push(("includes[]", "author".to_string()));
        query.push(("includes[]", "cover_art".to_string()));
        let resp: ListResponse<Manga> = self
            .client
            .get_json(&format!("{API_URL}/manga"), &query)
            .await?;
        Ok(resp.data.into_iter().map(manga_to_work).collect())
    }

    async fn aggregate(&self, source_id: &str) -> Result<serde_json::Value, ProviderError> {
        let query = [("translatedLanguage[]", "en")];
        self.client
            .get_json(&format!("{API_URL}/manga/{source_id}/aggregate"), &query)
            .await
    }
}

#[async_trait]
impl MetadataProvider for MangaDexProvider {
    fn name(&self) -> &'static str {
        NAME
    }

    async fn search(&self, query: &str) -> Result<Vec<Work>, ProviderError> {
        self.list(vec![
            ("title", query.to_string()),
            ("limit", SEARCH_LIMIT.to_string()),
            ("order[relevance]", "desc".to_string()),
        ])
        .await
    }

    async fn fetch_details(&self, source_id: &str) -> Result<Work, ProviderError> {
        let query = [("includes[]", "author"), ("includes[]", "cover_art")];
        let resp: EntityResponse<Manga> = self
            .client
            .get_json(&format!("{API_URL}/manga/{source_id}"), &query)
            .await?;
        let mut work = manga_to_work(resp.data);

        // Totals come from the aggregate; a failure here only loses the counts.
        match self.aggregate(source_id).await {
            Ok(agg) => {
                if let Some(counts) = aggregate_counts(&agg) {
                    work.chapter_count = Some(counts.chapter_count);
                    work.volume_count = Some(counts.volume_count).filter(|&v| v > 0);
                }
            }
            Err(e) => log::debug!("MangaDex aggregate for {source_id} failed: {e}"),
        }
        Ok(work)
    }

    async fn fetch_chapters(&self, source_id: &str) -> Result<Vec<Chapter>, ProviderError> {
        let url = format!("{API_URL}/manga/{source_id}/feed");
        let mut entries = Vec::new();
        let mut offset = 0;
        loop {
            let query = [
                ("translatedLanguage[]", "en".to_string()),
                ("order[chapter]", "asc".to_string()),
                ("limit", FEED_PAGE.to_string()),
                ("offset", offset.to_string()),
            ];
            let page: ListResponse<FeedChapter> = self.client.get_json(&url, &query).await?;
            let fetched = page.data.len() as u32;
            entries.extend(page.data);
            offset += fetched;
            if fetched == 0 || offset >= page.total || offset + FEED_PAGE > FEED_WINDOW {
                break;
            }
        }
        log::debug!("MangaDex feed for {source_id}: {} entries", entries.len());
        Ok(feed_to_chapters(&WorkRef::new(NAME, source_id), entries))
    }

    async fn fetch_latest(&self) -> Result<Vec<Work>, ProviderError> {
        self.list(vec![
            ("limit", SEARCH_LIMIT.to_string()),
            ("order[latestUploadedChapter]", "desc".to_string()),
            ("hasAvailableChapters", "true".to_string()),
        ])
        .await
    }
}

#[async_trait]
impl CountProvider for MangaDexProvider {
    fn name(&self) -> &'static str {
        NAME
    }

    async fn count(&self, title: &str) -> Result<Option<CountCandidate>, ProviderError> {
        let found = self
            .list(vec![
                ("title", title.to_string()),
                ("limit", "1".to_string()),
                ("order[relevance]", "desc".to_string()),
            ])
            .await?;
        let Some(work) = found.first() else {
            return Ok(None);
        };
        let agg = self.aggregate(&work.source_id).await?;
        Ok(aggregate_counts(&agg))
    }
}

// -- Wire types --

#[derive(Debug, Deserialize)]
pub(crate) struct ListResponse<T> {
    #[serde(default = "Vec::new")]
    pub data: Vec<T>,
    #[serde(default)]
    pub total: u32,
}

#[derive(Debug, Deserialize)]
struct EntityResponse<T> {
    data: T,
}

#[derive(Debug, Deserialize)]
pub(crate) struct Manga {
    pub id: String,
    pub attributes: MangaAttributes,
    #[serde(default)]
    pub relationships: Vec<Relationship>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct MangaAttributes {
    #[serde(default)]
    pub title: HashMap<String, String>,
    #[serde(default)]
    pub alt_titles: Vec<HashMap<String, String>>,
    #[serde(default)]
    pub description: HashMap<String, String>,
    pub status: Option<String>,
    pub year: Option<i32>,
    pub publication_demographic: Option<String>,
    #[serde(default)]
    pub tags: Vec<Tag>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct Tag {
    pub attributes: TagAttributes,
}

#[derive(Debug, Deserialize)]
pub(crate) struct TagAttributes {
    #[serde(default)]
    pub name: HashMap<String, String>,
    pub group: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct Relationship {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub attributes: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct FeedChapter {
    pub attributes: FeedAttributes,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct FeedAttributes {
    pub chapter: Option<String>,
    pub title: Option<String>,
    pub publish_at: Option<String>,
}

// -- Mapping --

fn english_or_first(map: &HashMap<String, String>) -> Option<String> {
    // HashMap order is arbitrary; fall back to the smallest key for stability.
    map.get("en")
        .or_else(|| map.keys().min().and_then(|k| map.get(k)))
        .cloned()
}

pub(crate) fn manga_to_work(manga: Manga) -> Work {
    let Manga {
        id,
        attributes,
        relationships,
    } = manga;

    let title = english_or_first(&attributes.title).unwrap_or_else(|| format!("MangaDex {id}"));
    let mut work = Work::new(NAME, id.clone(), title.clone());

    let mut alternates: Vec<String> = Vec::new();
    for alt in &attributes.alt_titles {
        let mut langs: Vec<_> = alt.iter().collect();
        langs.sort();
        for (_, t) in langs {
            if *t != title && !alternates.contains(t) {
                alternates.push(t.clone());
            }
        }
    }
    work.alternate_titles = alternates;

    work.status = attributes
        .status
        .as_deref()
        .map(WorkStatus::from_source)
        .unwrap_or_default();

    let mut genres: Vec<String> = attributes
        .tags
        .iter()
        .filter(|t| t.attributes.group.as_deref() == Some("genre"))
        .filter_map(|t| t.attributes.name.get("en").cloned())
        .collect();
    if let Some(demo) = attributes.publication_demographic {
        genres.push(demo);
    }
    work.genres = genres;

    work.start_date = attributes
        .year
        .and_then(|y| NaiveDate::from_ymd_opt(y, 1, 1));
    work.description = attributes.description.get("en").cloned();

    for rel in relationships {
        let attr_str = |key: &str| {
            rel.attributes
                .as_ref()
                .and_then(|a| a.get(key))
                .and_then(|v| v.as_str())
                .map(str::to_string)
        };
        match rel.kind.as_str() {
            "author" | "artist" => {
                match attr_str("name") {
                    Some(name) if !work.authors.contains(&name) => work.authors.push(name),
                    _ => {}
                }
            }
            "cover_art" => {
                if let Some(file) = attr_str("fileName") {
                    work.cover_url = Some(format!("{COVER_URL}/{id}/{file}.512.jpg"));
                }
            }
            _ => {}
        }
    }
    work
}

/// Turn feed entries into chapters: one per number (earliest publication
/// wins), ascending. Entries without a numeric chapter are dropped.
pub(crate) fn feed_to_chapters(
    work_ref: &WorkRef,
    entries: Vec<FeedChapter>,
) -> Vec<Chapter> {
    let mut by_number: Vec<(f64, Option<String>, Option<NaiveDate>)> = Vec::new();
    for entry in entries {
        let FeedAttributes {
            chapter,
            title,
            publish_at,
        } = entry.attributes;
        let Some(number) = chapter.and_then(|c| c.trim().parse::<f64>().ok()) else {
            continue;
        };
        if !number.is_finite() {
            continue;
        }
        let date = publish_at.as_deref().and_then(parse_date_prefix);
        let title = title.filter(|t| !t.trim().is_empty());

        match by_number.iter_mut().find(|(n, _, _)| *n == number) {
            Some(existing) => {
                let earlier = match (date, existing.2) {
                    (Some(new), Some(old)) => new < old,
                    (Some(_), None) => true,
                    _ => false,
                };
                if earlier {
                    existing.2 = date;
                    if title.is_some() {
                        existing.1 = title;
                    }
                }
            }
            None => by_number.push((number, title, date)),
        }
    }

    by_number.sort_by(|a, b| a.0.total_cmp(&b.0));
    by_number
        .into_iter()
        .map(|(number, title, date)| Chapter {
            work_ref: work_ref.clone(),
            number,
            title: title.unwrap_or_else(|| format!("Chapter {}", format_chapter_number(number))),
            release_date: date,
            is_date_confirmed: date.is_some(),
            synthesized: false,
        })
        .collect()
}

/// Chapter and volume totals from an `/aggregate` response.
///
/// The `"none"` volume bucket holds unassigned chapters; it is not a volume.
/// `volumes` is an object normally but an empty array when nothing exists.
pub(crate) fn aggregate_counts(agg: &serde_json::Value) -> Option<CountCandidate> {
    let volumes = agg.get("volumes")?.as_object()?;
    let mut chapters = BTreeSet::new();
    let mut volume_count = 0;
    for (key, volume) in volumes {
        if key != "none" {
            volume_count += 1;
        }
        let Some(chs) = volume.get("chapters").and_then(|c| c.as_object()) else {
            continue;
        };
        for (ch_key, ch) in chs {
            let label = ch
                .get("chapter")
                .and_then(|v| v.as_str())
                .unwrap_or(ch_key);
            if label != "none" {
                chapters.insert(label.to_string());
            }
        }
    }
    if chapters.is_empty() {
        return None;
    }
    Some(CountCandidate::new(NAME, chapters.len() as u32, volume_count))
}

#[cfg(test)]
#[path = "tests/mangadex_tests.rs"]
mod tests;
