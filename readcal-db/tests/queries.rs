use chrono::NaiveDate;
use readcal_core::{CalendarEvent, EventTarget, Work};
use readcal_db::*;

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn seeded() -> rusqlite::Connection {
    let conn = open_memory().unwrap();
    let a = Work::new("anilist", "1", "Berserk");
    let b = Work::new("mangadex", "abc", "Vinland Saga");
    upsert_work(&conn, &a).unwrap();
    upsert_work(&conn, &b).unwrap();

    let events = [
        CalendarEvent::new(a.work_ref(), EventTarget::Chapter("375".into()), date(2024, 5, 2), &a.title),
        CalendarEvent::new(b.work_ref(), EventTarget::Chapter("208".into()), date(2024, 5, 1), &b.title),
        CalendarEvent::new(b.work_ref(), EventTarget::Volume(26), date(2024, 5, 20), &b.title),
    ];
    for e in &events {
        insert_event(&conn, e).unwrap();
    }
    conn
}

#[test]
fn events_between_orders_by_date() {
    let conn = seeded();
    let events = events_between(&conn, date(2024, 5, 1), date(2024, 5, 31), None).unwrap();
    let titles: Vec<_> = events.iter().map(|e| e.title.as_str()).collect();
    assert_eq!(
        titles,
        vec![
            "Chapter 208 - Vinland Saga",
            "Chapter 375 - Berserk",
            "Volume 26 - Vinland Saga"
        ]
    );
    assert_eq!(events[2].target, EventTarget::Volume(26));
}

#[test]
fn events_between_is_inclusive_and_filters_work() {
    let conn = seeded();
    let events = events_between(&conn, date(2024, 5, 2), date(2024, 5, 20), None).unwrap();
    assert_eq!(events.len(), 2);

    let vinland = Work::new("mangadex", "abc", "").work_ref();
    let only = events_between(&conn, date(2024, 1, 1), date(2024, 12, 31), Some(&vinland)).unwrap();
    assert_eq!(only.len(), 2);
    assert!(only.iter().all(|e| e.work_ref == vinland));
}

#[test]
fn list_works_sorted_by_title() {
    let conn = seeded();
    let titles: Vec<_> = list_works(&conn).unwrap().into_iter().map(|w| w.title).collect();
    assert_eq!(titles, vec!["Berserk", "Vinland Saga"]);
}

#[test]
fn missing_rows_are_none() {
    let conn = open_memory().unwrap();
    assert!(get_work(&conn, &Work::new("x", "y", "z").work_ref()).unwrap().is_none());
    assert!(cache_get(&conn, "x", "y", "z").unwrap().is_none());
}

#[test]
fn store_executes_operations() {
    let store = Store::open_memory().unwrap();
    let work = Work::new("jikan", "2", "Berserk");
    store.execute_with_retry(|c| upsert_work(c, &work)).unwrap();
    let stats = store.execute_with_retry(store_stats).unwrap();
    assert_eq!(stats.works, 1);
}
