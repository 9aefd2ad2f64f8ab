use chrono::Duration;
use readcal_core::{Chapter, FixedClock, Volume};

use super::*;

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn today() -> NaiveDate {
    date(2024, 5, 1)
}

struct Harness {
    materializer: CalendarMaterializer,
    store: Arc<Store>,
    clock: Arc<FixedClock>,
}

fn harness() -> Harness {
    let store = Arc::new(Store::open_memory().unwrap());
    let clock = Arc::new(FixedClock::at_date(today()));
    let materializer = CalendarMaterializer::new(store.clone(), clock.clone(), 14);
    Harness {
        materializer,
        store,
        clock,
    }
}

fn chapter(work_ref: &WorkRef, number: f64, release: NaiveDate) -> Chapter {
    Chapter {
        work_ref: work_ref.clone(),
        number,
        title: format!("Chapter {number}"),
        release_date: Some(release),
        is_date_confirmed: true,
        synthesized: false,
    }
}

/// Track a work with chapters on the given dates (numbered from 1).
fn track(store: &Store, id: &str, title: &str, dates: &[NaiveDate]) -> WorkRef {
    let work = Work::new("anilist", id, title);
    let work_ref = work.work_ref();
    let chapters: Vec<Chapter> = dates
        .iter()
        .enumerate()
        .map(|(i, d)| chapter(&work_ref, (i + 1) as f64, *d))
        .collect();
    store
        .execute_with_retry(|conn| {
            readcal_db::upsert_work(conn, &work)?;
            readcal_db::replace_chapters(conn, &work_ref, &chapters)?;
            Ok(())
        })
        .unwrap();
    work_ref
}

fn event_count(store: &Store) -> i64 {
    store.execute_with_retry(readcal_db::count_events).unwrap()
}

#[test]
fn window_spans_a_week_back_and_range_forward() {
    let h = harness();
    assert_eq!(h.materializer.window(), (date(2024, 4, 24), date(2024, 5, 15)));
}

#[test]
fn repeated_passes_do_not_duplicate() {
    let h = harness();
    let work = Work::new("anilist", "1", "One Piece");
    let work_ref = work.work_ref();
    h.store
        .execute_with_retry(|conn| {
            readcal_db::upsert_work(conn, &work)?;
            readcal_db::replace_chapters(conn, &work_ref, &[chapter(&work_ref, 42.0, today())])?;
            Ok(())
        })
        .unwrap();

    let first = h.materializer.refresh_calendar().unwrap();
    let second = h.materializer.refresh_calendar().unwrap();
    assert_eq!((first.inserted, first.skipped), (1, 0));
    assert_eq!((second.inserted, second.skipped), (0, 1));
    assert_eq!(event_count(&h.store), 1);

    let events = h
        .materializer
        .get_calendar_events(today(), today(), None)
        .unwrap();
    assert_eq!(events[0].title, "Chapter 42 - One Piece");
    assert_eq!(events[0].target, EventTarget::Chapter("42".to_string()));
}

#[test]
fn only_dates_inside_window_are_materialized() {
    let h = harness();
    track(
        &h.store,
        "1",
        "Edges",
        &[
            date(2024, 4, 23), // 8 days back
            date(2024, 4, 24), // 7 days back
            date(2024, 5, 15), // range end
            date(2024, 5, 16), // past range
        ],
    );

    let stats = h.materializer.refresh_calendar().unwrap();
    assert_eq!(stats.inserted, 2);
    let events = h
        .materializer
        .get_calendar_events(date(2024, 1, 1), date(2024, 12, 31), None)
        .unwrap();
    let dates: Vec<_> = events.iter().map(|e| e.event_date).collect();
    assert_eq!(dates, vec![date(2024, 4, 24), date(2024, 5, 15)]);
}

#[test]
fn old_events_are_pruned() {
    let h = harness();
    let work_ref = track(&h.store, "1", "Weekly", &[today()]);
    h.materializer.refresh_calendar().unwrap();

    // A week later, the event is exactly at the cutoff and survives.
    h.clock.advance(Duration::days(7));
    let stats = h.materializer.refresh_calendar().unwrap();
    assert_eq!(stats.pruned, 0);

    h.clock.advance(Duration::days(1));
    let stats = h.materializer.refresh_calendar().unwrap();
    assert_eq!(stats.pruned, 1);
    assert_eq!(event_count(&h.store), 0);

    // An event inserted from elsewhere is also pruned.
    let stale = CalendarEvent::new(
        work_ref,
        EventTarget::Chapter("1".to_string()),
        date(2023, 1, 1),
        "Weekly",
    );
    h.store
        .execute_with_retry(|conn| readcal_db::insert_event(conn, &stale))
        .unwrap();
    assert_eq!(h.materializer.refresh_calendar().unwrap().pruned, 1);
}

#[test]
fn volumes_become_events() {
    let h = harness();
    let work_ref = track(&h.store, "1", "Collected", &[]);
    let volume = Volume {
        work_ref: work_ref.clone(),
        number: 3,
        title: "Volume 3".to_string(),
        release_date: Some(date(2024, 5, 3)),
    };
    h.store
        .execute_with_retry(|conn| readcal_db::replace_volumes(conn, &work_ref, &[volume.clone()]))
        .unwrap();

    h.materializer.refresh_calendar().unwrap();
    let events = h
        .materializer
        .get_calendar_events(today(), date(2024, 5, 31), Some(&work_ref))
        .unwrap();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].target, EventTarget::Volume(3));
    assert_eq!(events[0].title, "Volume 3 - Collected");
}

#[test]
fn materialize_single_work() {
    let h = harness();
    let a = track(&h.store, "1", "A", &[date(2024, 5, 2)]);
    let b = track(&h.store, "2", "B", &[date(2024, 5, 2)]);

    let stats = h.materializer.materialize_work(&a).unwrap();
    assert_eq!((stats.works, stats.inserted), (1, 1));
    assert!(
        h.materializer
            .get_calendar_events(today(), date(2024, 5, 31), Some(&b))
            .unwrap()
            .is_empty()
    );

    let stats = h
        .materializer
        .materialize_work(&WorkRef::new("anilist", "404"))
        .unwrap();
    assert_eq!(stats, MaterializeStats::default());
}

#[test]
fn refresh_covers_all_works_and_filters_by_work() {
    let h = harness();
    let a = track(&h.store, "1", "A", &[date(2024, 5, 2), date(2024, 5, 9)]);
    track(&h.store, "2", "B", &[date(2024, 5, 3)]);

    let stats = h.materializer.refresh_calendar().unwrap();
    assert_eq!((stats.works, stats.inserted), (2, 3));

    let all = h
        .materializer
        .get_calendar_events(today(), date(2024, 5, 31), None)
        .unwrap();
    let dates: Vec<_> = all.iter().map(|e| e.event_date).collect();
    assert_eq!(dates, vec![date(2024, 5, 2), date(2024, 5, 3), date(2024, 5, 9)]);

    let only_a = h
        .materializer
        .get_calendar_events(today(), date(2024, 5, 31), Some(&a))
        .unwrap();
    assert_eq!(only_a.len(), 2);
}
