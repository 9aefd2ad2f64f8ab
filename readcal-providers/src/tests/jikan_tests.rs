use chrono::NaiveDate;

use super::*;

const BERSERK: &str = r#"{
    "mal_id": 2,
    "title": "Berserk",
    "title_english": "Berserk",
    "title_japanese": "ベルセルク",
    "title_synonyms": [],
    "status": "Publishing",
    "chapters": null,
    "volumes": null,
    "genres": [{ "mal_id": 1, "name": "Action" }],
    "demographics": [{ "mal_id": 42, "name": "Seinen" }],
    "authors": [{ "mal_id": 1868, "name": "Miura, Kentarou" }],
    "published": { "from": "1989-08-25T00:00:00+00:00", "to": null },
    "synopsis": "Guts.",
    "images": { "jpg": { "large_image_url": "https://cdn.example/2l.jpg" } }
}"#;

#[test]
fn test_manga_to_work_folds_demographics() {
    let manga: JikanManga = serde_json::from_str(BERSERK).unwrap();
    let work = manga_to_work(manga);

    assert_eq!(work.source_id, "2");
    assert_eq!(work.title, "Berserk");
    assert_eq!(work.alternate_titles, vec!["ベルセルク"]);
    assert_eq!(work.status, WorkStatus::Ongoing);
    assert!(work.has_genre("seinen"));
    assert_eq!(work.authors, vec!["Miura, Kentarou"]);
    assert_eq!(work.start_date, NaiveDate::from_ymd_opt(1989, 8, 25));
    assert_eq!(work.end_date, None);
    assert_eq!(work.cover_url.as_deref(), Some("https://cdn.example/2l.jpg"));
}

#[test]
fn test_counts_absent_for_ongoing_series() {
    let manga: JikanManga = serde_json::from_str(BERSERK).unwrap();
    assert_eq!(manga_counts(&manga), None);
}

#[test]
fn test_counts_for_finished_series() {
    let json = r#"{"mal_id": 21, "title": "Death Note", "status": "Finished",
                   "chapters": 108, "volumes": 12}"#;
    let manga: JikanManga = serde_json::from_str(json).unwrap();
    assert_eq!(manga_counts(&manga), Some(CountCandidate::new("jikan", 108, 12)));
    assert_eq!(manga_to_work(manga).status, WorkStatus::Completed);
}
