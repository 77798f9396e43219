use crate::model::{ListeningHistory, PlayEvent};
use crate::tally::{Entry, Tally};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

pub const DEFAULT_TOP_LIMIT: usize = 10;

/// One leaderboard row. `artist` and `album` are only filled where they
/// disambiguate the name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TopItem {
    pub name: String,
    pub plays: u64,
    pub minutes: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub artist: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub album: Option<String>,
    pub image_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct TotalStats {
    pub total_tracks: u64,
    pub total_minutes: f64,
    pub unique_artists: u64,
    pub unique_albums: u64,
    pub unique_tracks: u64,
}

struct SummedMinutes {
    minutes: f64,
    image_url: Option<String>,
}

struct TrackSeed {
    album: String,
    minutes_per_play: f64,
    image_url: Option<String>,
}

pub struct StatsProcessor<'a> {
    history: &'a ListeningHistory,
}

impl<'a> StatsProcessor<'a> {
    pub fn new(history: &'a ListeningHistory) -> Self {
        Self { history }
    }

    /// Artists by play count. Minutes are summed per event since an artist's
    /// tracks differ in length.
    pub fn top_artists(&self, limit: usize) -> Vec<TopItem> {
        let mut tally: Tally<&str, SummedMinutes> = Tally::new();
        for event in &self.history.tracks {
            let entry = tally.record(event.artist.as_str(), || first_seen(event));
            entry.value.minutes += event.duration_minutes();
        }

        top_entries(tally, limit)
            .map(|entry| TopItem {
                name: entry.key.to_string(),
                plays: entry.count,
                minutes: entry.value.minutes,
                artist: None,
                album: None,
                image_url: entry.value.image_url,
            })
            .collect()
    }

    /// Tracks keyed by (title, artist). Minutes are the first-seen duration
    /// times the play count, not a per-event sum.
    pub fn top_tracks(&self, limit: usize) -> Vec<TopItem> {
        let mut tally: Tally<(&str, &str), TrackSeed> = Tally::new();
        for event in &self.history.tracks {
            tally.record((event.title.as_str(), event.artist.as_str()), || TrackSeed {
                album: event.album.clone(),
                minutes_per_play: event.duration_minutes(),
                image_url: event.image_url.clone(),
            });
        }

        top_entries(tally, limit)
            .map(|entry| {
                let (title, artist) = entry.key;
                TopItem {
                    name: title.to_string(),
                    plays: entry.count,
                    minutes: entry.value.minutes_per_play * entry.count as f64,
                    artist: Some(artist.to_string()),
                    album: Some(entry.value.album),
                    image_url: entry.value.image_url,
                }
            })
            .collect()
    }

    /// Albums keyed by (album, artist), minutes summed per event.
    pub fn top_albums(&self, limit: usize) -> Vec<TopItem> {
        let mut tally: Tally<(&str, &str), SummedMinutes> = Tally::new();
        for event in &self.history.tracks {
            let key = (event.album.as_str(), event.artist.as_str());
            let entry = tally.record(key, || first_seen(event));
            entry.value.minutes += event.duration_minutes();
        }

        top_entries(tally, limit)
            .map(|entry| {
                let (album, artist) = entry.key;
                TopItem {
                    name: album.to_string(),
                    plays: entry.count,
                    minutes: entry.value.minutes,
                    artist: Some(artist.to_string()),
                    album: None,
                    image_url: entry.value.image_url,
                }
            })
            .collect()
    }

    pub fn total_stats(&self) -> TotalStats {
        let tracks = &self.history.tracks;
        let unique_artists: HashSet<&str> = tracks.iter().map(|e| e.artist.as_str()).collect();
        let unique_albums: HashSet<&str> = tracks.iter().map(|e| e.album.as_str()).collect();
        let unique_tracks: HashSet<(&str, &str)> = tracks
            .iter()
            .map(|e| (e.title.as_str(), e.artist.as_str()))
            .collect();

        TotalStats {
            total_tracks: tracks.len() as u64,
            total_minutes: self.history.total_minutes(),
            unique_artists: unique_artists.len() as u64,
            unique_albums: unique_albums.len() as u64,
            unique_tracks: unique_tracks.len() as u64,
        }
    }
}

fn first_seen(event: &PlayEvent) -> SummedMinutes {
    SummedMinutes {
        minutes: 0.0,
        image_url: event.image_url.clone(),
    }
}

fn top_entries<K, V>(tally: Tally<K, V>, limit: usize) -> impl Iterator<Item = Entry<K, V>>
where
    K: std::hash::Hash + Eq + Clone,
{
    tally.ranked().into_iter().take(limit)
}
