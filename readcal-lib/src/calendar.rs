//! Calendar materialization.
//!
//! Turns chapter and volume release dates inside a rolling window into
//! `calendar_events` rows and prunes rows that fell out of the window.
//! All passes share one lock, so there is only ever one writer.

use std::sync::{Arc, Mutex};

use chrono::{Days, NaiveDate};
use readcal_core::{CalendarEvent, Clock, EventTarget, Work, WorkRef};
use readcal_db::Store;

use crate::error::EngineError;

/// How far back the window reaches. Older events are pruned.
pub const PAST_DAYS: u64 = 7;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MaterializeStats {
    pub works: usize,
    pub inserted: usize,
    /// Events already present.
    pub skipped: usize,
    pub pruned: usize,
}

pub struct CalendarMaterializer {
    store: Arc<Store>,
    clock: Arc<dyn Clock>,
    range_days: u32,
    lock: Mutex<()>,
}

impl CalendarMaterializer {
    pub fn new(store: Arc<Store>, clock: Arc<dyn Clock>, range_days: u32) -> Self {
        Self {
            store,
            clock,
            range_days,
            lock: Mutex::new(()),
        }
    }

    /// `[today - 7d, today + range_days]`, both ends inclusive.
    pub fn window(&self) -> (NaiveDate, NaiveDate) {
        let today = self.clock.today();
        (
            today - Days::new(PAST_DAYS),
            today + Days::new(u64::from(self.range_days)),
        )
    }

    /// Materialize every tracked work, then prune.
    pub fn refresh_calendar(&self) -> Result<MaterializeStats, EngineError> {
        let _guard = self.lock.lock().unwrap_or_else(|e| e.into_inner());
        let (from, to) = self.window();

        let works = self.store.execute_with_retry(readcal_db::list_works)?;
        let mut stats = MaterializeStats::default();
        for work in &works {
            let (inserted, skipped) = self.insert_events(work, from, to)?;
            stats.works += 1;
            stats.inserted += inserted;
            stats.skipped += skipped;
        }
        stats.pruned = self.prune(from)?;

        log::info!(
            "Calendar refreshed for {} works: {} new, {} existing, {} pruned",
            stats.works,
            stats.inserted,
            stats.skipped,
            stats.pruned
        );
        Ok(stats)
    }

    /// Materialize a single work, then prune. An untracked work is a no-op.
    pub fn materialize_work(&self, work_ref: &WorkRef) -> Result<MaterializeStats, EngineError> {
        let _guard = self.lock.lock().unwrap_or_else(|e| e.into_inner());
        let (from, to) = self.window();

        let mut stats = MaterializeStats::default();
        match self
            .store
            .execute_with_retry(|conn| readcal_db::get_work(conn, work_ref))?
        {
            Some(work) => {
                let (inserted, skipped) = self.insert_events(&work, from, to)?;
                stats.works = 1;
                stats.inserted = inserted;
                stats.skipped = skipped;
            }
            None => log::warn!("{work_ref} is not tracked; nothing to materialize"),
        }
        stats.pruned = self.prune(from)?;
        Ok(stats)
    }

    /// Stored events with `start <= event_date <= end`.
    pub fn get_calendar_events(
        &self,
        start: NaiveDate,
        end: NaiveDate,
        work_ref: Option<&WorkRef>,
    ) -> Result<Vec<CalendarEvent>, EngineError> {
        Ok(self
            .store
            .execute_with_retry(|conn| readcal_db::events_between(conn, start, end, work_ref))?)
    }

    /// Returns `(inserted, skipped)`.
    fn insert_events(
        &self,
        work: &Work,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<(usize, usize), EngineError> {
        let work_ref = work.work_ref();
        let in_window = |d: &Option<NaiveDate>| match d {
            Some(date) if *date >= from && *date <= to => Some(*date),
            _ => None,
        };

        Ok(self.store.execute_with_retry(|conn| {
            let mut events = Vec::new();
            for ch in readcal_db::chapters_for_work(conn, &work_ref)? {
                if let Some(date) = in_window(&ch.release_date) {
                    let target = EventTarget::Chapter(ch.number_label());
                    events.push(CalendarEvent::new(work_ref.clone(), target, date, &work.title));
                }
            }
            for vol in readcal_db::volumes_for_work(conn, &work_ref)? {
                if let Some(date) = in_window(&vol.release_date) {
                    let target = EventTarget::Volume(vol.number);
                    events.push(CalendarEvent::new(work_ref.clone(), target, date, &work.title));
                }
            }

            let mut inserted = 0;
            for event in &events {
                if readcal_db::insert_event(conn, event)? {
                    inserted += 1;
                }
            }
            Ok((inserted, events.len() - inserted))
        })?)
    }

    fn prune(&self, cutoff: NaiveDate) -> Result<usize, EngineError> {
        let pruned = self
            .store
            .execute_with_retry(|conn| readcal_db::prune_events_before(conn, cutoff))?;
        if pruned > 0 {
            log::debug!("Pruned {pruned} events before {cutoff}");
        }
        Ok(pruned)
    }
}

#[cfg(test)]
#[path = "tests/calendar_tests.rs"]
mod tests;
