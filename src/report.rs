use crate::model::ListeningHistory;
use crate::stats::{StatsProcessor, TopItem, TotalStats};
use crate::time_analysis::{DayAnthem, LateNightAnthem, PeakDay, RepeatRecord, TimeAnalysis};
use anyhow::{Context, Result};
use log::warn;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fs;
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeAnalysisSummary {
    pub plays_by_hour: [u64; 24],
    pub plays_by_day_of_week: [u64; 7],
    pub plays_by_month: [u64; 12],
    pub peak_listening_hour: u8,
    pub peak_listening_day: u8,
    /// False when the peaks above are defaults rather than observations.
    pub has_plays: bool,
    pub peak_day_overall: PeakDay,
    pub longest_streak: u32,
    pub late_night_anthem: Option<LateNightAnthem>,
    pub day_anthems: Vec<Option<DayAnthem>>,
    pub most_repeated_single_day: Option<RepeatRecord>,
}

/// Everything downstream consumers read about one user's year.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatsDocument {
    pub user: String,
    pub year: i32,
    pub total: TotalStats,
    pub top_artists: Vec<TopItem>,
    pub top_tracks: Vec<TopItem>,
    pub top_albums: Vec<TopItem>,
    pub time_analysis: TimeAnalysisSummary,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ai_content: Option<Map<String, Value>>,
}

impl StatsDocument {
    pub fn build(history: &ListeningHistory, top_limit: usize) -> Self {
        let stats = StatsProcessor::new(history);
        let time = TimeAnalysis::new(history);
        let peak_listening_hour = time.peak_listening_hour_checked();

        Self {
            user: history.user.clone(),
            year: history.year,
            total: stats.total_stats(),
            top_artists: stats.top_artists(top_limit),
            top_tracks: stats.top_tracks(top_limit),
            top_albums: stats.top_albums(top_limit),
            time_analysis: TimeAnalysisSummary {
                plays_by_hour: time.plays_by_hour(),
                plays_by_day_of_week: time.plays_by_day_of_week(),
                plays_by_month: time.plays_by_month(),
                peak_listening_hour: peak_listening_hour.unwrap_or(0),
                peak_listening_day: time.peak_listening_day(),
                has_plays: peak_listening_hour.is_some(),
                peak_day_overall: time.peak_day_overall(),
                longest_streak: time.longest_streak(),
                late_night_anthem: time.late_night_anthem(),
                day_anthems: time.day_anthems(),
                most_repeated_single_day: time.most_repeated_single_day(),
            },
            ai_content: None,
        }
    }

    /// Pretty JSON of the statistics alone, as handed to text generation.
    pub fn stats_json(&self) -> Result<String> {
        let mut value = serde_json::to_value(self).context("failed to encode statistics")?;
        if let Value::Object(fields) = &mut value {
            fields.remove("ai_content");
        }
        Ok(serde_json::to_string_pretty(&value)?)
    }
}

pub fn load_document(path: &Path) -> Result<StatsDocument> {
    let raw =
        fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))?;
    let document: StatsDocument = serde_json::from_str(&raw)
        .with_context(|| format!("failed to parse {}", path.display()))?;
    Ok(document)
}

pub fn save_document(path: &Path, document: &StatsDocument) -> Result<()> {
    if path.exists() {
        let backup = path.with_extension("json.bak");
        if let Err(err) = fs::copy(path, &backup) {
            warn!("failed to back up {} to {}: {err}", path.display(), backup.display());
        }
    }
    let json = serde_json::to_string_pretty(document)?;
    fs::write(path, json).with_context(|| format!("failed to write {}", path.display()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::PlayEvent;
    use tempfile::tempdir;
    use time::Duration;
    use time::macros::datetime;

    fn sample_history() -> ListeningHistory {
        let start = datetime!(2024-04-01 1:15);
        let tracks = (0..9)
            .map(|n| PlayEvent {
                title: format!("Track {}", n % 3),
                artist: String::from("Band"),
                album: String::from("Record"),
                duration_ms: 201_337,
                played_at: start + Duration::hours(n * 7),
                user: String::from("alice"),
                genre: Some(String::from("Rock, Indie")),
                image_url: Some(format!("/library/metadata/{n}/thumb")),
            })
            .collect();
        ListeningHistory::new("alice", 2024, tracks)
    }

    #[test]
    fn build_fills_every_section() {
        let document = StatsDocument::build(&sample_history(), 2);
        assert_eq!(document.user, "alice");
        assert_eq!(document.total.total_tracks, 9);
        assert_eq!(document.top_tracks.len(), 2);
        assert_eq!(document.top_artists.len(), 1);
        assert!(document.time_analysis.has_plays);
        assert_eq!(document.time_analysis.day_anthems.len(), 7);
        assert!(document.time_analysis.late_night_anthem.is_some());
        assert!(document.ai_content.is_none());
    }

    #[test]
    fn empty_history_reports_defaults() {
        let document = StatsDocument::build(&ListeningHistory::new("nobody", 2024, Vec::new()), 10);
        assert!(!document.time_analysis.has_plays);
        assert_eq!(document.time_analysis.peak_listening_hour, 0);
        assert_eq!(document.time_analysis.peak_day_overall.date, None);
        assert!(document.top_artists.is_empty());
    }

    #[test]
    fn artist_rows_omit_track_fields() {
        let document = StatsDocument::build(&sample_history(), 10);
        let json = serde_json::to_value(&document).expect("encode");
        let artist = &json["top_artists"][0];
        assert!(artist.get("artist").is_none());
        assert!(artist.get("album").is_none());
        assert!(artist.get("image_url").is_some());
        assert_eq!(json["top_albums"][0]["artist"], "Band");
        assert!(json["time_analysis"]["peak_day_overall"]["date"].is_string());
    }

    #[test]
    fn stats_json_excludes_generated_content() {
        let mut document = StatsDocument::build(&sample_history(), 3);
        let mut content = Map::new();
        content.insert(String::from("roast"), serde_json::json!({"roasts": []}));
        document.ai_content = Some(content);

        let text = document.stats_json().expect("json");
        assert!(!text.contains("ai_content"));
        assert!(text.contains("top_tracks"));
    }

    #[test]
    fn document_survives_save_and_load() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("alice_2024_processed.json");
        let document = StatsDocument::build(&sample_history(), 10);

        save_document(&path, &document).expect("save");
        save_document(&path, &document).expect("save again");
        let loaded = load_document(&path).expect("load");

        assert_eq!(loaded, document);
        assert!(path.with_extension("json.bak").exists());
    }

    #[test]
    fn save_succeeds_when_backup_cannot_be_written() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("bob_2024_processed.json");
        let document = StatsDocument::build(&sample_history(), 10);
        save_document(&path, &document).expect("first save");
        fs::create_dir(path.with_extension("json.bak")).expect("block backup path");

        save_document(&path, &document).expect("save without backup");
        assert_eq!(load_document(&path).expect("load"), document);
        assert!(path.with_extension("json.bak").is_dir());
    }
}
