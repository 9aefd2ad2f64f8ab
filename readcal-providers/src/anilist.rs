//! AniList GraphQL adapter.
//!
//! AniList knows chapter and volume totals plus publication date ranges, but
//! never lists individual chapters.

use std::time::Duration;

use async_trait::async_trait;
use chrono::NaiveDate;
use readcal_core::{Chapter, CountCandidate, ProviderError, Work, WorkStatus};
use serde::Deserialize;
use serde_json::json;

use crate::client::HttpClient;
use crate::provider::{CountProvider, MetadataProvider};

const NAME: &str = "anilist";
const API_URL: &str = "https://graphql.anilist.co";
const MIN_REQUEST_INTERVAL: Duration = Duration::from_millis(700);
const PER_PAGE: u32 = 10;

const MEDIA_FIELDS: &str = r#"
    id
    title { romaji english native }
    synonyms
    status
    genres
    chapters
    volumes
    description(asHtml: false)
    startDate { year month day }
    endDate { year month day }
    coverImage { large }
    staff(perPage: 6) { edges { role node { name { full } } } }
"#;

pub struct AniListProvider {
    client: HttpClient,
}

impl AniListProvider {
    pub fn new() -> Result<Self, ProviderError> {
        Ok(Self {
            client: HttpClient::new(NAME, MIN_REQUEST_INTERVAL)?,
        })
    }

    async fn query<T>(&self, query: &str, variables: serde_json::Value) -> Result<T, ProviderError>
    where
        T: for<'de> Deserialize<'de>,
    {
        let body = json!({ "query": query, "variables": variables });
        let resp: GraphQlResponse<T> = self.client.post_json(API_URL, &body).await?;
        unwrap_graphql(resp)
    }

    async fn page(&self, filter: &str, variables: serde_json::Value) -> Result<Vec<Media>, ProviderError> {
        let query = format!(
            "query ($search: String, $perPage: Int) {{ Page(page: 1, perPage: $perPage) {{ media({filter}) {{ {MEDIA_FIELDS} }} }} }}"
        );
        let data: PageData = self.query(&query, variables).await?;
        Ok(data.page.media)
    }
}

#[async_trait]
impl MetadataProvider for AniListProvider {
    fn name(&self) -> &'static str {
        NAME
    }

    fn chapter_data_poor(&self) -> bool {
        true
    }

    async fn search(&self, query: &str) -> Result<Vec<Work>, ProviderError> {
        let media = self
            .page(
                "search: $search, type: MANGA",
                json!({ "search": query, "perPage": PER_PAGE }),
            )
            .await?;
        Ok(media.into_iter().map(media_to_work).collect())
    }

    async fn fetch_details(&self, source_id: &str) -> Result<Work, ProviderError> {
        let id: i64 = source_id
            .parse()
            .map_err(|_| ProviderError::not_found(format!("AniList id '{source_id}'")))?;
        let query = format!("query ($id: Int) {{ Media(id: $id, type: MANGA) {{ {MEDIA_FIELDS} }} }}");
        let data: MediaData = self.query(&query, json!({ "id": id })).await?;
        data.media
            .map(media_to_work)
            .ok_or_else(|| ProviderError::not_found(format!("AniList manga {source_id}")))
    }

    async fn fetch_chapters(&self, _source_id: &str) -> Result<Vec<Chapter>, ProviderError> {
        Ok(Vec::new())
    }

    async fn fetch_latest(&self) -> Result<Vec<Work>, ProviderError> {
        let media = self
            .page(
                "type: MANGA, status: RELEASING, sort: UPDATED_AT_DESC",
                json!({ "perPage": PER_PAGE }),
            )
            .await?;
        Ok(media.into_iter().map(media_to_work).collect())
    }
}

#[async_trait]
impl CountProvider for AniListProvider {
    fn name(&self) -> &'static str {
        NAME
    }

    async fn count(&self, title: &str) -> Result<Option<CountCandidate>, ProviderError> {
        let media = self
            .page(
                "search: $search, type: MANGA, sort: SEARCH_MATCH",
                json!({ "search": title, "perPage": 1 }),
            )
            .await?;
        Ok(media.first().and_then(media_counts))
    }
}

// -- Wire types --

#[derive(Debug, Deserialize)]
pub(crate) struct GraphQlResponse<T> {
    pub data: Option<T>,
    #[serde(default)]
    pub errors: Vec<GraphQlError>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct GraphQlError {
    pub message: String,
    #[serde(default)]
    pub status: Option<u16>,
}

#[derive(Debug, Deserialize)]
struct PageData {
    #[serde(rename = "Page")]
    page: PageMedia,
}

#[derive(Debug, Deserialize)]
struct PageMedia {
    #[serde(default)]
    media: Vec<Media>,
}

#[derive(Debug, Deserialize)]
struct MediaData {
    #[serde(rename = "Media")]
    media: Option<Media>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct Media {
    pub id: i64,
    #[serde(default)]
    pub title: MediaTitle,
    #[serde(default)]
    pub synonyms: Vec<String>,
    pub status: Option<String>,
    #[serde(default)]
    pub genres: Vec<String>,
    pub chapters: Option<u32>,
    pub volumes: Option<u32>,
    pub description: Option<String>,
    pub start_date: Option<FuzzyDate>,
    pub end_date: Option<FuzzyDate>,
    pub cover_image: Option<CoverImage>,
    pub staff: Option<StaffConnection>,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct MediaTitle {
    pub romaji: Option<String>,
    pub english: Option<String>,
    pub native: Option<String>,
}

/// AniList dates may be partial; only complete dates are used.
#[derive(Debug, Default, Deserialize)]
pub(crate) struct FuzzyDate {
    pub year: Option<i32>,
    pub month: Option<u32>,
    pub day: Option<u32>,
}

impl FuzzyDate {
    pub fn to_date(&self) -> Option<NaiveDate> {
        NaiveDate::from_ymd_opt(self.year?, self.month?, self.day?)
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct CoverImage {
    pub large: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct StaffConnection {
    #[serde(default)]
    pub edges: Vec<StaffEdge>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct StaffEdge {
    pub role: Option<String>,
    pub node: StaffNode,
}

#[derive(Debug, Deserialize)]
pub(crate) struct StaffNode {
    pub name: StaffName,
}

#[derive(Debug, Deserialize)]
pub(crate) struct StaffName {
    pub full: Option<String>,
}

// -- Mapping --

pub(crate) fn unwrap_graphql<T>(resp: GraphQlResponse<T>) -> Result<T, ProviderError> {
    if let Some(err) = resp.errors.first() {
        if err.status == Some(404) {
            return Err(ProviderError::not_found(err.message.clone()));
        }
        if resp.data.is_none() {
            return Err(ProviderError::malformed(format!("GraphQL error: {}", err.message)));
        }
        log::debug!("AniList returned partial data with error: {}", err.message);
    }
    resp.data
        .ok_or_else(|| ProviderError::malformed("GraphQL response without data"))
}

pub(crate) fn media_to_work(media: Media) -> Work {
    let Media {
        id,
        title,
        synonyms,
        status,
        genres,
        chapters,
        volumes,
        description,
        start_date,
        end_date,
        cover_image,
        staff,
    } = media;

    let MediaTitle {
        romaji,
        english,
        native,
    } = title;
    let primary = english
        .clone()
        .or_else(|| romaji.clone())
        .or_else(|| native.clone())
        .unwrap_or_else(|| format!("AniList {id}"));

    let mut work = Work::new(NAME, id.to_string(), primary.clone());
    work.alternate_titles = [romaji, english, native]
        .into_iter()
        .flatten()
        .chain(synonyms)
        .filter(|t| *t != primary)
        .fold(Vec::new(), |mut acc, t| {
            if !acc.contains(&t) {
                acc.push(t);
            }
            acc
        });
    work.status = status
        .as_deref()
        .map(WorkStatus::from_source)
        .unwrap_or_default();
    work.genres = genres;
    work.authors = staff.map(staff_authors).unwrap_or_default();
    work.start_date = start_date.as_ref().and_then(FuzzyDate::to_date);
    work.end_date = end_date.as_ref().and_then(FuzzyDate::to_date);
    work.chapter_count = chapters.filter(|&c| c > 0);
    work.volume_count = volumes.filter(|&v| v > 0);
    work.description = description;
    work.cover_url = cover_image.and_then(|c| c.large);
    work
}

/// Story and art staff, deduplicated, in credit order.
fn staff_authors(staff: StaffConnection) -> Vec<String> {
    let mut authors = Vec::new();
    for edge in staff.edges {
        let is_author = edge
            .role
            .as_deref()
            .is_some_and(|r| r.starts_with("Story") || r.starts_with("Art"));
        if !is_author {
            continue;
        }
        match edge.node.name.full {
            Some(name) if !authors.contains(&name) => authors.push(name),
            _ => {}
        }
    }
    authors
}

pub(crate) fn media_counts(media: &Media) -> Option<CountCandidate> {
    let chapters = media.chapters.unwrap_or(0);
    if chapters == 0 {
        return None;
    }
    Some(CountCandidate::new(NAME, chapters, media.volumes.unwrap_or(0)))
}

#[cfg(test)]
#[path = "tests/anilist_tests.rs"]
mod tests;
