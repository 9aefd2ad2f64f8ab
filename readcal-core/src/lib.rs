//! Shared domain model for readcal.
//!
//! Every other crate speaks in these types: works reconciled from metadata
//! sources, their chapters and volumes, chapter-count estimates, and the
//! calendar events derived from release dates.

pub mod clock;
pub mod error;
pub mod event;
pub mod util;
pub mod work;

pub use clock::{Clock, FixedClock, SystemClock};
pub use error::ProviderError;
pub use event::{CalendarEvent, EventTarget, EventType};
pub use util::{format_chapter_number, normalize_title};
pub use work::{
    Chapter, ChapterCountEstimate, CountCandidate, Volume, Work, WorkRef, WorkStatus,
    WorkStatusParseError,
};
