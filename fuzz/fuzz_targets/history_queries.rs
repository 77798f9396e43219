#![no_main]

use libfuzzer_sys::fuzz_target;
use time::{Duration, PrimitiveDateTime, macros::datetime};
use wrapped::model::{ListeningHistory, PlayEvent};
use wrapped::report::StatsDocument;

fuzz_target!(|data: &[u8]| {
    let start: PrimitiveDateTime = datetime!(2024-01-01 0:00);
    let tracks: Vec<PlayEvent> = data
        .chunks(4)
        .map(|chunk| {
            let byte = |n: usize| chunk.get(n).copied().unwrap_or(0);
            PlayEvent {
                title: format!("t{}", byte(0) % 7),
                artist: format!("a{}", byte(1) % 5),
                album: format!("al{}", byte(0) % 3),
                duration_ms: u64::from(byte(2)) * 1_000,
                played_at: start
                    + Duration::hours(i64::from(u16::from(byte(3)) * 37 % (366 * 24))),
                user: String::from("fuzz"),
                genre: None,
                image_url: None,
            }
        })
        .collect();
    let total = tracks.len() as u64;
    let history = ListeningHistory::new("fuzz", 2024, tracks);

    let document = StatsDocument::build(&history, usize::from(data.first().copied().unwrap_or(0) % 16));
    assert_eq!(document.total.total_tracks, total);
    assert_eq!(document.time_analysis.plays_by_hour.iter().sum::<u64>(), total);
    assert!(
        document
            .top_artists
            .windows(2)
            .all(|pair| pair[0].plays >= pair[1].plays)
    );

    let text = serde_json::to_string(&document).expect("encode");
    let decoded: StatsDocument = serde_json::from_str(&text).expect("decode");
    assert_eq!(decoded, document);
});
