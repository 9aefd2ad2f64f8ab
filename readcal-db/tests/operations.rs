use chrono::{NaiveDate, TimeZone, Utc};
use readcal_core::{CalendarEvent, Chapter, EventTarget, Volume, Work, WorkRef, WorkStatus};
use readcal_db::*;

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn test_work() -> Work {
    let mut work = Work::new("anilist", "30013", "One Piece");
    work.status = WorkStatus::Ongoing;
    work.genres = vec!["Action".to_string(), "Adventure".to_string()];
    work.authors = vec!["Eiichiro Oda".to_string()];
    work.start_date = Some(date(1997, 7, 22));
    work
}

fn chapter(work_ref: &WorkRef, number: f64, release: Option<NaiveDate>) -> Chapter {
    Chapter {
        work_ref: work_ref.clone(),
        number,
        title: format!("Chapter {number}"),
        release_date: release,
        is_date_confirmed: release.is_some(),
        synthesized: false,
    }
}

#[test]
fn upsert_and_get_work() {
    let conn = open_memory().unwrap();
    let work = test_work();
    upsert_work(&conn, &work).unwrap();

    let loaded = get_work(&conn, &work.work_ref()).unwrap().unwrap();
    assert_eq!(loaded, work);
}

#[test]
fn upsert_work_refreshes_descriptive_fields() {
    let conn = open_memory().unwrap();
    let mut work = test_work();
    upsert_work(&conn, &work).unwrap();

    work.title = "ONE PIECE".to_string();
    work.status = WorkStatus::Completed;
    upsert_work(&conn, &work).unwrap();

    let all = list_works(&conn).unwrap();
    assert_eq!(all.len(), 1);
    assert_eq!(all[0].title, "ONE PIECE");
    assert_eq!(all[0].status, WorkStatus::Completed);
}

#[test]
fn replace_chapters_overwrites_previous_set() {
    let conn = open_memory().unwrap();
    let work = test_work();
    let r = work.work_ref();
    upsert_work(&conn, &work).unwrap();

    replace_chapters(&conn, &r, &[chapter(&r, 1.0, None), chapter(&r, 2.0, None)]).unwrap();
    replace_chapters(&conn, &r, &[chapter(&r, 3.0, Some(date(2024, 5, 1)))]).unwrap();

    let loaded = chapters_for_work(&conn, &r).unwrap();
    assert_eq!(loaded.len(), 1);
    assert_eq!(loaded[0].number, 3.0);
    assert_eq!(loaded[0].release_date, Some(date(2024, 5, 1)));
    assert!(loaded[0].is_date_confirmed);
}

#[test]
fn chapters_require_existing_work() {
    let conn = open_memory().unwrap();
    let r = WorkRef::new("anilist", "missing");
    assert!(replace_chapters(&conn, &r, &[chapter(&r, 1.0, None)]).is_err());
}

#[test]
fn replace_volumes_round_trip() {
    let conn = open_memory().unwrap();
    let work = test_work();
    let r = work.work_ref();
    upsert_work(&conn, &work).unwrap();

    let volumes = vec![
        Volume {
            work_ref: r.clone(),
            number: 1,
            title: "Volume 1".to_string(),
            release_date: Some(date(1997, 12, 24)),
        },
        Volume {
            work_ref: r.clone(),
            number: 2,
            title: "Volume 2".to_string(),
            release_date: None,
        },
    ];
    replace_volumes(&conn, &r, &volumes).unwrap();
    assert_eq!(volumes_for_work(&conn, &r).unwrap(), volumes);
}

#[test]
fn cache_put_replaces_whole_entry() {
    let conn = open_memory().unwrap();
    let t0 = Utc.with_ymd_and_hms(2024, 5, 1, 0, 0, 0).unwrap();
    let t1 = Utc.with_ymd_and_hms(2024, 5, 2, 0, 0, 0).unwrap();

    cache_put(&conn, "anilist", "resolved", "1", "{\"a\":1}", t0, 60).unwrap();
    cache_put(&conn, "anilist", "resolved", "1", "{\"a\":2}", t1, 120).unwrap();

    let row = cache_get(&conn, "anilist", "resolved", "1").unwrap().unwrap();
    assert_eq!(row.payload, "{\"a\":2}");
    assert_eq!(row.cached_at, t1);
    assert_eq!(row.ttl_secs, 120);
}

#[test]
fn cache_delete_matching_filters() {
    let conn = open_memory().unwrap();
    let now = Utc::now();
    cache_put(&conn, "anilist", "resolved", "1", "{}", now, 60).unwrap();
    cache_put(&conn, "jikan", "resolved", "2", "{}", now, 60).unwrap();
    cache_put(&conn, "estimator", "chapter_count", "berserk", "{}", now, 60).unwrap();

    assert_eq!(cache_delete_matching(&conn, Some("jikan"), None).unwrap(), 1);
    assert_eq!(cache_delete_matching(&conn, None, Some("resolved")).unwrap(), 1);
    assert!(cache_get(&conn, "estimator", "chapter_count", "berserk").unwrap().is_some());
    assert!(cache_delete(&conn, "estimator", "chapter_count", "berserk").unwrap());
    assert!(!cache_delete(&conn, "estimator", "chapter_count", "berserk").unwrap());
}

#[test]
fn conditional_cache_delete_spares_rewritten_entry() {
    let conn = open_memory().unwrap();
    let old = Utc.with_ymd_and_hms(2024, 4, 1, 0, 0, 0).unwrap();
    let fresh = Utc.with_ymd_and_hms(2024, 5, 10, 0, 0, 0).unwrap();

    cache_put(&conn, "anilist", "resolved", "1", "old", old, 60).unwrap();
    // Someone rewrites the key after the expired row was read.
    cache_put(&conn, "anilist", "resolved", "1", "fresh", fresh, 60).unwrap();

    assert!(!cache_delete_if_unchanged(&conn, "anilist", "resolved", "1", old).unwrap());
    let row = cache_get(&conn, "anilist", "resolved", "1").unwrap().unwrap();
    assert_eq!(row.payload, "fresh");

    assert!(cache_delete_if_unchanged(&conn, "anilist", "resolved", "1", fresh).unwrap());
    assert!(cache_get(&conn, "anilist", "resolved", "1").unwrap().is_none());
}

#[test]
fn insert_event_is_idempotent() {
    let conn = open_memory().unwrap();
    let work = test_work();
    upsert_work(&conn, &work).unwrap();

    let event = CalendarEvent::new(
        work.work_ref(),
        EventTarget::Chapter("42".to_string()),
        date(2024, 5, 1),
        &work.title,
    );
    assert!(insert_event(&conn, &event).unwrap());
    assert!(!insert_event(&conn, &event).unwrap());
    assert_eq!(count_events(&conn).unwrap(), 1);
}

#[test]
fn prune_removes_only_older_events() {
    let conn = open_memory().unwrap();
    let work = test_work();
    upsert_work(&conn, &work).unwrap();

    for (n, d) in [(1, date(2024, 4, 1)), (2, date(2024, 4, 24)), (3, date(2024, 5, 10))] {
        let event = CalendarEvent::new(work.work_ref(), EventTarget::Volume(n), d, &work.title);
        insert_event(&conn, &event).unwrap();
    }

    assert_eq!(prune_events_before(&conn, date(2024, 4, 24)).unwrap(), 1);
    assert_eq!(count_events(&conn).unwrap(), 2);
}

#[test]
fn deleting_work_cascades() {
    let conn = open_memory().unwrap();
    let work = test_work();
    let r = work.work_ref();
    upsert_work(&conn, &work).unwrap();
    replace_chapters(&conn, &r, &[chapter(&r, 1.0, Some(date(2024, 5, 1)))]).unwrap();
    let event = CalendarEvent::new(r.clone(), EventTarget::Chapter("1".into()), date(2024, 5, 1), "x");
    insert_event(&conn, &event).unwrap();

    assert!(delete_work(&conn, &r).unwrap());
    let stats = store_stats(&conn).unwrap();
    assert_eq!(stats.works, 0);
    assert_eq!(stats.chapters, 0);
    assert_eq!(stats.events, 0);
}
