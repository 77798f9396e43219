use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use time::format_description::BorrowedFormatItem;
use time::format_description::well_known::Iso8601;
use time::macros::format_description;
use time::{OffsetDateTime, PrimitiveDateTime, UtcOffset};

pub const UNKNOWN_ARTIST: &str = "Unknown Artist";
pub const UNKNOWN_ALBUM: &str = "Unknown Album";

const MILLIS_PER_MINUTE: f64 = 60_000.0;
const PLAYED_AT_FORMAT: &[BorrowedFormatItem<'static>] =
    format_description!("[year]-[month]-[day]T[hour]:[minute]:[second]");

/// One recorded listen. Events without a timestamp never get this far.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayEvent {
    pub title: String,
    #[serde(default = "default_artist")]
    pub artist: String,
    #[serde(default = "default_album")]
    pub album: String,
    #[serde(default, alias = "duration")]
    pub duration_ms: u64,
    #[serde(with = "played_at_format")]
    pub played_at: PrimitiveDateTime,
    #[serde(default)]
    pub user: String,
    #[serde(default)]
    pub genre: Option<String>,
    #[serde(default, alias = "thumb_url")]
    pub image_url: Option<String>,
}

impl PlayEvent {
    pub fn duration_minutes(&self) -> f64 {
        self.duration_ms as f64 / MILLIS_PER_MINUTE
    }
}

fn default_artist() -> String {
    UNKNOWN_ARTIST.to_string()
}

fn default_album() -> String {
    UNKNOWN_ALBUM.to_string()
}

/// Every play of one user for one year. Order carries no meaning except for
/// first-seen picks such as cover art.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ListeningHistory {
    pub user: String,
    pub year: i32,
    #[serde(default)]
    pub tracks: Vec<PlayEvent>,
    #[serde(default)]
    pub avatar_url: Option<String>,
}

impl ListeningHistory {
    pub fn new(user: impl Into<String>, year: i32, tracks: Vec<PlayEvent>) -> Self {
        Self {
            user: user.into(),
            year,
            tracks,
            avatar_url: None,
        }
    }

    pub fn total_tracks(&self) -> usize {
        self.tracks.len()
    }

    pub fn total_minutes(&self) -> f64 {
        self.tracks.iter().map(PlayEvent::duration_minutes).sum()
    }
}

/// Known track lengths keyed by artist then title, shared across users so a
/// history that lacks durations can borrow them from another.
#[derive(Debug, Clone, Default)]
pub struct DurationLookup {
    by_artist: HashMap<String, HashMap<String, u64>>,
}

impl DurationLookup {
    pub fn from_histories<'a>(histories: impl IntoIterator<Item = &'a ListeningHistory>) -> Self {
        let mut lookup = Self::default();
        for history in histories {
            lookup.learn(history);
        }
        lookup
    }

    /// First non-zero duration seen for a (title, artist) pair wins.
    pub fn learn(&mut self, history: &ListeningHistory) {
        for event in &history.tracks {
            if event.duration_ms == 0 {
                continue;
            }
            self.by_artist
                .entry(event.artist.clone())
                .or_default()
                .entry(event.title.clone())
                .or_insert(event.duration_ms);
        }
    }

    pub fn get(&self, title: &str, artist: &str) -> Option<u64> {
        self.by_artist.get(artist)?.get(title).copied()
    }

    pub fn len(&self) -> usize {
        self.by_artist.values().map(HashMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.by_artist.is_empty()
    }

    /// Fills zero durations in place and returns how many events changed.
    pub fn fill_missing(&self, history: &mut ListeningHistory) -> usize {
        let mut filled = 0;
        for event in history.tracks.iter_mut().filter(|event| event.duration_ms == 0) {
            if let Some(duration_ms) = self.get(&event.title, &event.artist) {
                event.duration_ms = duration_ms;
                filled += 1;
            }
        }
        filled
    }
}

pub fn load_history(path: &Path) -> Result<ListeningHistory> {
    let raw =
        fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))?;
    let history: ListeningHistory = serde_json::from_str(&raw)
        .with_context(|| format!("failed to parse {}", path.display()))?;
    Ok(history)
}

pub fn save_history(path: &Path, history: &ListeningHistory) -> Result<()> {
    let json = serde_json::to_string_pretty(history)?;
    fs::write(path, json).with_context(|| format!("failed to write {}", path.display()))?;
    Ok(())
}

/// Accepts naive ISO timestamps (with or without fractional seconds) and
/// offset-carrying ones, which are shifted to UTC.
pub fn parse_played_at(raw: &str) -> Result<PrimitiveDateTime, time::error::Parse> {
    let raw = raw.trim();
    if let Ok(value) = PrimitiveDateTime::parse(raw, PLAYED_AT_FORMAT) {
        return Ok(value);
    }
    // The naive ISO parser accepts a trailing offset and drops it, so the
    // offset-aware parse has to run first.
    if let Ok(with_offset) = OffsetDateTime::parse(raw, &Iso8601::DEFAULT) {
        let utc = with_offset.to_offset(UtcOffset::UTC);
        return Ok(PrimitiveDateTime::new(utc.date(), utc.time()));
    }
    PrimitiveDateTime::parse(raw, &Iso8601::DEFAULT)
}

mod played_at_format {
    use super::{PLAYED_AT_FORMAT, parse_played_at};
    use serde::{Deserialize, Deserializer, Serializer};
    use time::PrimitiveDateTime;

    pub fn serialize<S>(value: &PrimitiveDateTime, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let text = value
            .format(PLAYED_AT_FORMAT)
            .map_err(serde::ser::Error::custom)?;
        serializer.serialize_str(&text)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<PrimitiveDateTime, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        parse_played_at(&raw).map_err(serde::de::Error::custom)
    }
}
