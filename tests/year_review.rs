use serde_json::json;
use time::macros::date;
use wrapped::model::ListeningHistory;
use wrapped::report::StatsDocument;
use wrapped::stats::StatsProcessor;
use wrapped::time_analysis::TimeAnalysis;

fn raw_play(title: &str, artist: &str, album: &str, duration_ms: u64, played_at: &str) -> serde_json::Value {
    json!({
        "title": title,
        "artist": artist,
        "album": album,
        "duration_ms": duration_ms,
        "played_at": played_at,
        "user": "alice",
        "genre": null,
        "thumb_url": format!("/library/metadata/{title}/thumb?X-Plex-Token=abc")
    })
}

fn history_from(plays: Vec<serde_json::Value>) -> ListeningHistory {
    let raw = json!({
        "user": "alice",
        "year": 2024,
        "tracks": plays,
        "avatar_url": null
    });
    serde_json::from_value(raw).expect("history")
}

#[test]
fn two_artists_end_to_end() {
    let mut plays = Vec::new();
    for day in 1..=10 {
        plays.push(raw_play("Song A", "Artist X", "Album 1", 180_000, &format!("2024-03-{day:02}T21:00:00")));
    }
    for day in 1..=5 {
        plays.push(raw_play("Song B", "Artist Y", "Album 2", 240_000, &format!("2024-04-{day:02}T02:30:00")));
    }
    let history = history_from(plays);
    let processor = StatsProcessor::new(&history);

    let artists = processor.top_artists(2);
    assert_eq!(
        artists
            .iter()
            .map(|item| (item.name.as_str(), item.plays, item.minutes))
            .collect::<Vec<_>>(),
        vec![("Artist X", 10, 30.0), ("Artist Y", 5, 20.0)]
    );

    let totals = processor.total_stats();
    assert_eq!(totals.total_tracks, 15);
    assert!((totals.total_minutes - 50.0).abs() < 1e-9);
    assert_eq!(totals.unique_artists, 2);
    assert_eq!(totals.unique_albums, 2);
    assert_eq!(totals.unique_tracks, 2);

    let analysis = TimeAnalysis::new(&history);
    assert_eq!(analysis.longest_streak(), 10);
    assert_eq!(analysis.peak_listening_hour(), 21);
    let anthem = analysis.late_night_anthem().expect("late night");
    assert_eq!(anthem.track, "Song B");
    assert_eq!(anthem.plays_after_midnight, 5);
}

#[test]
fn binge_day_beats_yearly_total() {
    let mut plays = Vec::new();
    for minute in 0..5 {
        plays.push(raw_play("Loop", "Band", "Album", 200_000, &format!("2024-09-14T18:{minute:02}:00")));
    }
    for month in ["01", "05", "11"] {
        plays.push(raw_play("Loop", "Band", "Album", 200_000, &format!("2024-{month}-03T10:00:00")));
    }
    let history = history_from(plays);

    let record = TimeAnalysis::new(&history)
        .most_repeated_single_day()
        .expect("record");
    assert_eq!(record.date, date!(2024-09-14));
    assert_eq!(record.plays, 5);
    assert_eq!(StatsProcessor::new(&history).top_tracks(1)[0].plays, 8);
}

#[test]
fn document_round_trips_through_json() {
    let plays = vec![
        raw_play("One", "Band", "Record", 201_337, "2024-01-01T00:15:00"),
        raw_play("Two", "Band", "Record", 187_001, "2024-01-02T13:45:10"),
        raw_play("One", "Band", "Record", 201_337, "2024-01-02T23:59:59"),
        raw_play("Three", "Other", "Split", 0, "2024-07-04T04:00:00"),
    ];
    let document = StatsDocument::build(&history_from(plays), 10);

    let text = serde_json::to_string_pretty(&document).expect("encode");
    let decoded: StatsDocument = serde_json::from_str(&text).expect("decode");
    assert_eq!(decoded, document);

    let value: serde_json::Value = serde_json::from_str(&text).expect("value");
    assert_eq!(value["total"]["total_tracks"], 4);
    assert_eq!(value["time_analysis"]["plays_by_hour"].as_array().map(Vec::len), Some(24));
    assert_eq!(value["time_analysis"]["peak_day_overall"]["date"], "2024-01-02");
    assert_eq!(value["time_analysis"]["most_repeated_single_day"]["date"], "2024-01-01");
    assert_eq!(value["top_tracks"][0]["image_url"], "/library/metadata/One/thumb?X-Plex-Token=abc");
}
