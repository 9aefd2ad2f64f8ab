use super::*;

fn feed(entries: &[(Option<&str>, Option<&str>)]) -> Vec<FeedChapter> {
    entries
        .iter()
        .map(|(chapter, publish_at)| FeedChapter {
            attributes: FeedAttributes {
                chapter: chapter.map(str::to_string),
                title: None,
                publish_at: publish_at.map(str::to_string),
            },
        })
        .collect()
}

#[test]
fn test_manga_to_work() {
    let json = r#"{
        "id": "a1c7c817-4e59-43b7-9365-09675a149a6f",
        "attributes": {
            "title": { "en": "One Piece" },
            "altTitles": [{ "ja-ro": "Wan Pīsu" }, { "en": "One Piece" }],
            "description": { "en": "Pirates." },
            "status": "ongoing",
            "year": 1997,
            "publicationDemographic": "shounen",
            "tags": [
                { "attributes": { "name": { "en": "Action" }, "group": "genre" } },
                { "attributes": { "name": { "en": "Pirates" }, "group": "theme" } }
            ]
        },
        "relationships": [
            { "type": "author", "attributes": { "name": "Oda Eiichiro" } },
            { "type": "artist", "attributes": { "name": "Oda Eiichiro" } },
            { "type": "cover_art", "attributes": { "fileName": "cover.jpg" } }
        ]
    }"#;
    let manga: Manga = serde_json::from_str(json).unwrap();
    let work = manga_to_work(manga);

    assert_eq!(work.source, "mangadex");
    assert_eq!(work.title, "One Piece");
    assert_eq!(work.alternate_titles, vec!["Wan Pīsu"]);
    assert_eq!(work.status, WorkStatus::Ongoing);
    assert_eq!(work.genres, vec!["Action", "shounen"]);
    assert_eq!(work.authors, vec!["Oda Eiichiro"]);
    assert_eq!(work.start_date, NaiveDate::from_ymd_opt(1997, 1, 1));
    assert_eq!(
        work.cover_url.as_deref(),
        Some("https://uploads.mangadex.org/covers/a1c7c817-4e59-43b7-9365-09675a149a6f/cover.jpg.512.jpg")
    );
}

#[test]
fn test_feed_dedupes_and_sorts() {
    let work_ref = WorkRef::new("mangadex", "x");
    let entries = feed(&[
        (Some("2"), Some("2024-01-09T10:00:00+00:00")),
        (Some("1"), Some("2024-01-02T10:00:00+00:00")),
        (Some("2"), Some("2024-01-08T10:00:00+00:00")),
        (Some("1.5"), None),
        (None, Some("2024-01-01T00:00:00+00:00")),
        (Some("extra"), None),
    ]);

    let chapters = feed_to_chapters(&work_ref, entries);
    let numbers: Vec<f64> = chapters.iter().map(|c| c.number).collect();
    assert_eq!(numbers, vec![1.0, 1.5, 2.0]);

    assert_eq!(chapters[2].release_date, NaiveDate::from_ymd_opt(2024, 1, 8));
    assert!(chapters[2].is_date_confirmed);
    assert!(!chapters[1].is_date_confirmed);
    assert_eq!(chapters[1].title, "Chapter 1.5");
    assert!(chapters.iter().all(|c| !c.synthesized));
}

#[test]
fn test_aggregate_counts_skips_none_volume() {
    let agg: serde_json::Value = serde_json::from_str(
        r#"{
        "result": "ok",
        "volumes": {
            "none": { "volume": "none", "chapters": {
                "3": { "chapter": "3" }, "none": { "chapter": "none" }
            } },
            "1": { "volume": "1", "chapters": {
                "1": { "chapter": "1" }, "2": { "chapter": "2" }
            } }
        }
    }"#,
    )
    .unwrap();
    assert_eq!(aggregate_counts(&agg), Some(CountCandidate::new("mangadex", 3, 1)));
}

#[test]
fn test_aggregate_empty_array() {
    let agg: serde_json::Value = serde_json::from_str(r#"{"result":"ok","volumes":[]}"#).unwrap();
    assert_eq!(aggregate_counts(&agg), None);
}
