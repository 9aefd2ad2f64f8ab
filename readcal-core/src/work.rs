//! Works, chapters, volumes, and chapter-count estimates.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::util::format_chapter_number;

// ── Status ──────────────────────────────────────────────────────────────────

/// Publication status of a work, normalized across sources.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WorkStatus {
    Ongoing,
    Completed,
    Announced,
    Cancelled,
    #[default]
    Unknown,
}

pub const ALL_STATUSES: &[WorkStatus] = &[
    WorkStatus::Ongoing,
    WorkStatus::Completed,
    WorkStatus::Announced,
    WorkStatus::Cancelled,
    WorkStatus::Unknown,
];

impl WorkStatus {
    /// Canonical upper-case name, as stored in the database.
    pub fn as_str(&self) -> &'static str {
        match self {
            WorkStatus::Ongoing => "ONGOING",
            WorkStatus::Completed => "COMPLETED",
            WorkStatus::Announced => "ANNOUNCED",
            WorkStatus::Cancelled => "CANCELLED",
            WorkStatus::Unknown => "UNKNOWN",
        }
    }

    /// Map a source's free-form status string onto the canonical set.
    ///
    /// AniList says `RELEASING`/`FINISHED`/`NOT_YET_RELEASED`, MangaDex says
    /// `ongoing`/`completed`/`hiatus`, Jikan says `Publishing`/`Finished`.
    /// A hiatus is still an ongoing series for scheduling purposes.
    pub fn from_source(raw: &str) -> Self {
        let lower = raw.trim().to_lowercase().replace([' ', '-'], "_");
        match lower.as_str() {
            "ongoing" | "releasing" | "publishing" | "hiatus" | "on_hiatus" => WorkStatus::Ongoing,
            "completed" | "finished" | "complete" => WorkStatus::Completed,
            "announced" | "not_yet_released" | "not_yet_published" | "upcoming" => {
                WorkStatus::Announced
            }
            "cancelled" | "canceled" | "discontinued" => WorkStatus::Cancelled,
            _ => WorkStatus::Unknown,
        }
    }
}

impl std::fmt::Display for WorkStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Error returned when a string is not one of the canonical status names.
#[derive(Debug, Clone)]
pub struct WorkStatusParseError(pub String);

impl std::fmt::Display for WorkStatusParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "unknown work status: '{}'", self.0)
    }
}

impl std::error::Error for WorkStatusParseError {}

impl std::str::FromStr for WorkStatus {
    type Err = WorkStatusParseError;

    /// Strict parse of the canonical names (case-insensitive).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let upper = s.to_uppercase();
        ALL_STATUSES
            .iter()
            .copied()
            .find(|status| status.as_str() == upper)
            .ok_or_else(|| WorkStatusParseError(s.to_string()))
    }
}

// ── Work ────────────────────────────────────────────────────────────────────

/// Stable reference to a work: `"{source}:{source_id}"`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WorkRef(String);

impl WorkRef {
    pub fn new(source: &str, source_id: &str) -> Self {
        Self(format!("{source}:{source_id}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Split back into `(source, source_id)`. The id may itself contain ':'.
    pub fn parts(&self) -> Option<(&str, &str)> {
        self.0.split_once(':')
    }
}

impl std::fmt::Display for WorkRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for WorkRef {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// A series or book reconciled from a metadata source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Work {
    /// Provider name this record came from (e.g., "anilist").
    pub source: String,
    /// The provider's own identifier.
    pub source_id: String,
    pub title: String,
    #[serde(default)]
    pub alternate_titles: Vec<String>,
    #[serde(default)]
    pub status: WorkStatus,
    #[serde(default)]
    pub genres: Vec<String>,
    #[serde(default)]
    pub authors: Vec<String>,
    #[serde(default)]
    pub start_date: Option<NaiveDate>,
    #[serde(default)]
    pub end_date: Option<NaiveDate>,
    /// Chapter count as reported by the source, if any.
    #[serde(default)]
    pub chapter_count: Option<u32>,
    #[serde(default)]
    pub volume_count: Option<u32>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub cover_url: Option<String>,
}

impl Work {
    pub fn new(
        source: impl Into<String>,
        source_id: impl Into<String>,
        title: impl Into<String>,
    ) -> Self {
        Self {
            source: source.into(),
            source_id: source_id.into(),
            title: title.into(),
            alternate_titles: Vec::new(),
            status: WorkStatus::Unknown,
            genres: Vec::new(),
            authors: Vec::new(),
            start_date: None,
            end_date: None,
            chapter_count: None,
            volume_count: None,
            description: None,
            cover_url: None,
        }
    }

    pub fn work_ref(&self) -> WorkRef {
        WorkRef::new(&self.source, &self.source_id)
    }

    /// Replace descriptive fields with a fresher copy of the same work.
    ///
    /// Identity (`source`, `source_id`) is never touched.
    pub fn refresh_from(&mut self, fresh: Work) {
        let Work {
            title,
            alternate_titles,
            status,
            genres,
            authors,
            start_date,
            end_date,
            chapter_count,
            volume_count,
            description,
            cover_url,
            ..
        } = fresh;
        self.title = title;
        self.alternate_titles = alternate_titles;
        self.status = status;
        self.genres = genres;
        self.authors = authors;
        self.start_date = start_date;
        self.end_date = end_date;
        self.chapter_count = chapter_count;
        self.volume_count = volume_count;
        self.description = description;
        self.cover_url = cover_url;
    }

    /// Case-insensitive genre membership test.
    pub fn has_genre(&self, genre: &str) -> bool {
        self.genres.iter().any(|g| g.eq_ignore_ascii_case(genre))
    }
}

// ── Chapter / Volume ────────────────────────────────────────────────────────

/// A single chapter of a work.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chapter {
    pub work_ref: WorkRef,
    /// Ordered chapter number; side chapters may be fractional (e.g., 10.5).
    pub number: f64,
    pub title: String,
    #[serde(default)]
    pub release_date: Option<NaiveDate>,
    #[serde(default)]
    pub is_date_confirmed: bool,
    /// True when `release_date` was computed rather than reported by a source.
    #[serde(default)]
    pub synthesized: bool,
}

impl Chapter {
    /// Display/storage form of the chapter number ("42", "10.5").
    pub fn number_label(&self) -> String {
        format_chapter_number(self.number)
    }
}

/// A collected volume of a work.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Volume {
    pub work_ref: WorkRef,
    pub number: u32,
    pub title: String,
    #[serde(default)]
    pub release_date: Option<NaiveDate>,
}

// ── Chapter counts ──────────────────────────────────────────────────────────

/// One provider's answer during a chapter-count race. Never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CountCandidate {
    pub source: String,
    pub chapter_count: u32,
    pub volume_count: u32,
}

impl CountCandidate {
    pub fn new(source: impl Into<String>, chapter_count: u32, volume_count: u32) -> Self {
        Self {
            source: source.into(),
            chapter_count,
            volume_count,
        }
    }
}

/// The winning chapter/volume count for a work.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChapterCountEstimate {
    /// Set once the estimate is attached to a reconciled work.
    #[serde(default)]
    pub work_ref: Option<WorkRef>,
    pub chapter_count: u32,
    pub volume_count: u32,
    /// Where the numbers came from: a provider name, "known", "heuristic" or "floor".
    pub source: String,
    pub obtained_at: DateTime<Utc>,
}

#[cfg(test)]
#[path = "tests/work_tests.rs"]
mod tests;
