//! Calendar events derived from chapter and volume release dates.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::work::WorkRef;

/// What an event announces. Exactly one of chapter or volume, by construction.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "number", rename_all = "snake_case")]
pub enum EventTarget {
    /// Chapter number label, e.g. "42" or "10.5".
    Chapter(String),
    Volume(u32),
}

impl EventTarget {
    pub fn event_type(&self) -> EventType {
        match self {
            EventTarget::Chapter(_) => EventType::ChapterRelease,
            EventTarget::Volume(_) => EventType::VolumeRelease,
        }
    }

    /// The chapter-or-volume reference as stored in the database.
    pub fn reference(&self) -> String {
        match self {
            EventTarget::Chapter(label) => label.clone(),
            EventTarget::Volume(n) => n.to_string(),
        }
    }

    /// Rebuild a target from its stored `(event_type, reference)` pair.
    pub fn from_parts(event_type: EventType, reference: &str) -> Option<Self> {
        match event_type {
            EventType::ChapterRelease => Some(EventTarget::Chapter(reference.to_string())),
            EventType::VolumeRelease => reference.parse().ok().map(EventTarget::Volume),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EventType {
    ChapterRelease,
    VolumeRelease,
}

impl EventType {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventType::ChapterRelease => "CHAPTER_RELEASE",
            EventType::VolumeRelease => "VOLUME_RELEASE",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "CHAPTER_RELEASE" => Some(EventType::ChapterRelease),
            "VOLUME_RELEASE" => Some(EventType::VolumeRelease),
            _ => None,
        }
    }
}

impl std::fmt::Display for EventType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A release on the calendar. Unique on `(work_ref, target, event_date)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalendarEvent {
    pub work_ref: WorkRef,
    pub target: EventTarget,
    pub event_date: NaiveDate,
    /// Display title, e.g. "Chapter 42 - One Piece".
    pub title: String,
}

impl CalendarEvent {
    pub fn new(work_ref: WorkRef, target: EventTarget, event_date: NaiveDate, work_title: &str) -> Self {
        let title = match &target {
            EventTarget::Chapter(label) => format!("Chapter {label} - {work_title}"),
            EventTarget::Volume(n) => format!("Volume {n} - {work_title}"),
        };
        Self {
            work_ref,
            target,
            event_date,
            title,
        }
    }

    pub fn event_type(&self) -> EventType {
        self.target.event_type()
    }
}
