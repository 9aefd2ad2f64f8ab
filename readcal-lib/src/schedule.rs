//! Release-date synthesis for works whose sources report counts but no
//! per-chapter dates.
//!
//! Everything here is pure: `today` is an argument, so identical inputs
//! always produce identical dates.

use chrono::{Datelike, Days, NaiveDate, Weekday};
use readcal_core::{Chapter, Volume, Work, WorkRef, WorkStatus, normalize_title};

/// Days assumed between a missing start date and today.
const DEFAULT_HISTORY_DAYS: u64 = 365;
const MIN_FUTURE_CHAPTERS: u32 = 3;

/// Longest chapter list synthesized for one work. Counts come from
/// provider payloads and are clamped to this.
pub const MAX_SYNTHESIZED_CHAPTERS: u32 = 10_000;

/// Inferred release rhythm.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cadence {
    /// Name of the rule that matched.
    pub rule: &'static str,
    pub weekday: Weekday,
    pub interval_days: u64,
}

struct CadenceInput {
    title: String,
    genres: Vec<String>,
    status: WorkStatus,
}

impl CadenceInput {
    fn title_has_any(&self, patterns: &[&str]) -> bool {
        patterns.iter().any(|p| self.title.contains(p))
    }

    fn has_any_genre(&self, genres: &[&str]) -> bool {
        self.genres.iter().any(|g| genres.contains(&g.as_str()))
    }
}

struct CadenceRule {
    name: &'static str,
    weekday: Weekday,
    interval_days: u64,
    matches: fn(&CadenceInput) -> bool,
}

const WEEKLY_FLAGSHIPS: &[&str] = &[
    "one piece",
    "my hero academia",
    "black clover",
    "jujutsu kaisen",
    "chainsaw man",
];
const KNOWN_MONTHLIES: &[&str] = &["berserk", "vinland saga", "vagabond"];
const WEEKLY_IMPORTS: &[&str] = &["solo leveling", "tower of god", "god of high school"];

/// Evaluated top-down; the first match wins and the last rule always matches.
const CADENCE_RULES: &[CadenceRule] = &[
    CadenceRule {
        name: "weekly-flagship",
        weekday: Weekday::Mon,
        interval_days: 7,
        matches: |w| w.title_has_any(WEEKLY_FLAGSHIPS),
    },
    CadenceRule {
        name: "monthly-seinen",
        weekday: Weekday::Thu,
        interval_days: 30,
        matches: |w| w.title_has_any(KNOWN_MONTHLIES) || w.has_any_genre(&["seinen"]),
    },
    CadenceRule {
        name: "weekly-import",
        weekday: Weekday::Wed,
        interval_days: 7,
        matches: |w| w.title_has_any(WEEKLY_IMPORTS),
    },
    CadenceRule {
        name: "weekly-shounen",
        weekday: Weekday::Sun,
        interval_days: 7,
        matches: |w| {
            w.status == WorkStatus::Ongoing && w.has_any_genre(&["shounen", "action", "adventure"])
        },
    },
    CadenceRule {
        name: "monthly-mature",
        weekday: Weekday::Fri,
        interval_days: 30,
        matches: |w| w.has_any_genre(&["seinen", "josei"]) || w.title.contains("monthly"),
    },
    CadenceRule {
        name: "biweekly-default",
        weekday: Weekday::Mon,
        interval_days: 14,
        matches: |_| true,
    },
];

/// Pick the release rhythm for a work from its title, genres and status.
pub fn infer_cadence(work: &Work) -> Cadence {
    let input = CadenceInput {
        title: normalize_title(&work.title),
        genres: work.genres.iter().map(|g| g.to_lowercase()).collect(),
        status: work.status,
    };
    let rule = CADENCE_RULES
        .iter()
        .find(|r| (r.matches)(&input))
        .unwrap_or(&CADENCE_RULES[CADENCE_RULES.len() - 1]);
    Cadence {
        rule: rule.name,
        weekday: rule.weekday,
        interval_days: rule.interval_days,
    }
}

/// The first date on or after `date` that falls on `weekday`.
pub fn snap_forward(date: NaiveDate, weekday: Weekday) -> NaiveDate {
    date + Days::new(days_until(date, weekday))
}

fn days_until(date: NaiveDate, weekday: Weekday) -> u64 {
    u64::from((7 + weekday.num_days_from_monday() - date.weekday().num_days_from_monday()) % 7)
}

/// `base + offset_days`, snapped forward to `weekday`. `None` once the
/// result would fall past the last representable date.
fn project(base: NaiveDate, offset_days: u64, weekday: Weekday) -> Option<NaiveDate> {
    let date = base.checked_add_days(Days::new(offset_days))?;
    date.checked_add_days(Days::new(days_until(date, weekday)))
}

/// `start + span * num / den` days, in integer arithmetic.
fn interpolate(start: NaiveDate, span_days: i64, num: i64, den: i64) -> NaiveDate {
    let offset = span_days.max(0) * num / den;
    start + Days::new(offset as u64)
}

/// Synthesize `count` chapters for `work`.
///
/// Works that are not ongoing and have a known end date are spread evenly
/// over `[start, end)` and all dates count as confirmed history. Otherwise
/// the most recent tenth (at least three) are projected into the future on
/// the inferred cadence and left unconfirmed; the rest are spread over
/// `[start, today)`.
///
/// At most [`MAX_SYNTHESIZED_CHAPTERS`] are produced, and projection stops
/// early if it runs off the end of the calendar.
pub fn synthesize_chapters(work: &Work, count: u32, today: NaiveDate) -> Vec<Chapter> {
    if count == 0 {
        return Vec::new();
    }
    let work_ref = work.work_ref();
    if count > MAX_SYNTHESIZED_CHAPTERS {
        log::warn!(
            "{work_ref} reports {count} chapters; synthesizing the first {MAX_SYNTHESIZED_CHAPTERS}"
        );
    }
    let count = count.min(MAX_SYNTHESIZED_CHAPTERS);
    let start = work.start_date.unwrap_or_else(|| {
        today
            .checked_sub_days(Days::new(DEFAULT_HISTORY_DAYS))
            .unwrap_or(today)
    });
    let n = i64::from(count);

    let dates: Vec<(NaiveDate, bool)> = match work.end_date {
        Some(end) if work.status != WorkStatus::Ongoing => {
            let span = (end - start).num_days();
            (0..n)
                .map(|i| (interpolate(start, span, i, n), true))
                .collect()
        }
        _ => ongoing_dates(work, count, start, today),
    };

    dates
        .into_iter()
        .enumerate()
        .map(|(i, (date, confirmed))| chapter(&work_ref, i as u32 + 1, date, confirmed))
        .collect()
}

fn ongoing_dates(work: &Work, count: u32, start: NaiveDate, today: NaiveDate) -> Vec<(NaiveDate, bool)> {
    let cadence = infer_cadence(work);
    let interval = cadence.interval_days;

    // Not started yet: everything is a projection from the start date.
    if start > today {
        let dates: Vec<_> = (0..u64::from(count))
            .map_while(|k| project(start, k * interval, cadence.weekday))
            .map(|d| (d, false))
            .collect();
        if dates.len() < count as usize {
            log::warn!("Projection for '{}' ran past the calendar range", work.title);
        }
        return dates;
    }

    let future = count.min(MIN_FUTURE_CHAPTERS.max(count / 10));
    let past = count - future;
    let span = (today - start).num_days();

    let mut dates = Vec::with_capacity(count as usize);
    for i in 0..i64::from(past) {
        dates.push((interpolate(start, span, i, i64::from(past)), true));
    }
    for j in 1..=u64::from(future) {
        match project(today, j * interval, cadence.weekday) {
            Some(date) => dates.push((date, false)),
            None => {
                log::warn!("Projection for '{}' ran past the calendar range", work.title);
                break;
            }
        }
    }
    dates
}

fn chapter(work_ref: &WorkRef, number: u32, date: NaiveDate, confirmed: bool) -> Chapter {
    Chapter {
        work_ref: work_ref.clone(),
        number: f64::from(number),
        title: format!("Chapter {number}"),
        release_date: Some(date),
        is_date_confirmed: confirmed,
        synthesized: true,
    }
}

/// Split `chapters` evenly into `count` volumes. Volume k releases with
/// chapter ⌈k·N/V⌉, the last chapter it contains.
pub fn synthesize_volumes(work_ref: &WorkRef, chapters: &[Chapter], count: u32) -> Vec<Volume> {
    let n = chapters.len() as u64;
    let v = u64::from(count);
    (1..=count)
        .map(|k| {
            let release_date = if n == 0 {
                None
            } else {
                let last = (u64::from(k) * n).div_ceil(v) - 1;
                chapters[last as usize].release_date
            };
            Volume {
                work_ref: work_ref.clone(),
                number: k,
                title: format!("Volume {k}"),
                release_date,
            }
        })
        .collect()
}

#[cfg(test)]
#[path = "tests/schedule_tests.rs"]
mod tests;
