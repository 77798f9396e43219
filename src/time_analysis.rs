use crate::model::ListeningHistory;
use crate::tally::Tally;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::ops::Range;
use time::{Date, Weekday};

time::serde::format_description!(iso_date, Date, "[year]-[month]-[day]");

/// Hours counted as "after midnight": 00:00 up to, not including, 04:00.
pub const LATE_NIGHT_HOURS: Range<u8> = 0..4;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeakDay {
    #[serde(with = "iso_date::option")]
    pub date: Option<Date>,
    pub plays: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LateNightAnthem {
    pub track: String,
    pub artist: String,
    pub plays_after_midnight: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DayAnthem {
    pub track: String,
    pub artist: String,
    pub day: String,
    pub plays: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepeatRecord {
    pub track: String,
    pub artist: String,
    #[serde(with = "iso_date")]
    pub date: Date,
    pub plays: u64,
}

pub struct TimeAnalysis<'a> {
    history: &'a ListeningHistory,
}

impl<'a> TimeAnalysis<'a> {
    pub fn new(history: &'a ListeningHistory) -> Self {
        Self { history }
    }

    pub fn plays_by_hour(&self) -> [u64; 24] {
        let mut buckets = [0_u64; 24];
        for event in &self.history.tracks {
            buckets[usize::from(event.played_at.hour())] += 1;
        }
        buckets
    }

    /// Index 0 is Monday.
    pub fn plays_by_day_of_week(&self) -> [u64; 7] {
        let mut buckets = [0_u64; 7];
        for event in &self.history.tracks {
            let day = event.played_at.weekday().number_days_from_monday();
            buckets[usize::from(day)] += 1;
        }
        buckets
    }

    /// Index 0 is January.
    pub fn plays_by_month(&self) -> [u64; 12] {
        let mut buckets = [0_u64; 12];
        for event in &self.history.tracks {
            let month = u8::from(event.played_at.month());
            buckets[usize::from(month - 1)] += 1;
        }
        buckets
    }

    /// Busiest hour, or 0 when there is nothing to count. Use
    /// [`Self::peak_listening_hour_checked`] to tell the two apart.
    pub fn peak_listening_hour(&self) -> u8 {
        self.peak_listening_hour_checked().unwrap_or(0)
    }

    pub fn peak_listening_hour_checked(&self) -> Option<u8> {
        peak_index(&self.plays_by_hour())
    }

    /// Busiest weekday (0 = Monday), or 0 when empty.
    pub fn peak_listening_day(&self) -> u8 {
        self.peak_listening_day_checked().unwrap_or(0)
    }

    pub fn peak_listening_day_checked(&self) -> Option<u8> {
        peak_index(&self.plays_by_day_of_week())
    }

    pub fn peak_day_overall(&self) -> PeakDay {
        let tally: Tally<Date> = self
            .history
            .tracks
            .iter()
            .map(|event| event.played_at.date())
            .collect();
        match tally.leader() {
            Some(entry) => PeakDay {
                date: Some(entry.key),
                plays: entry.count,
            },
            None => PeakDay {
                date: None,
                plays: 0,
            },
        }
    }

    pub fn longest_streak(&self) -> u32 {
        let dates: BTreeSet<Date> = self
            .history
            .tracks
            .iter()
            .map(|event| event.played_at.date())
            .collect();

        let mut longest = 0_u32;
        let mut current = 0_u32;
        let mut previous: Option<Date> = None;
        for date in dates {
            current = match previous {
                Some(prev) if (date - prev).whole_days() == 1 => current + 1,
                _ => 1,
            };
            longest = longest.max(current);
            previous = Some(date);
        }
        longest
    }

    pub fn late_night_anthem(&self) -> Option<LateNightAnthem> {
        let tally: Tally<(&str, &str)> = self
            .history
            .tracks
            .iter()
            .filter(|event| LATE_NIGHT_HOURS.contains(&event.played_at.hour()))
            .map(|event| (event.title.as_str(), event.artist.as_str()))
            .collect();
        let leader = tally.leader()?;
        Some(LateNightAnthem {
            track: leader.key.0.to_string(),
            artist: leader.key.1.to_string(),
            plays_after_midnight: leader.count,
        })
    }

    pub fn day_anthem(&self, weekday: Weekday) -> Option<DayAnthem> {
        let tally: Tally<(&str, &str)> = self
            .history
            .tracks
            .iter()
            .filter(|event| event.played_at.weekday() == weekday)
            .map(|event| (event.title.as_str(), event.artist.as_str()))
            .collect();
        let leader = tally.leader()?;
        Some(DayAnthem {
            track: leader.key.0.to_string(),
            artist: leader.key.1.to_string(),
            day: weekday.to_string(),
            plays: leader.count,
        })
    }

    /// Monday through Sunday.
    pub fn day_anthems(&self) -> Vec<Option<DayAnthem>> {
        let mut weekday = Weekday::Monday;
        let mut anthems = Vec::with_capacity(7);
        for _ in 0..7 {
            anthems.push(self.day_anthem(weekday));
            weekday = weekday.next();
        }
        anthems
    }

    pub fn most_repeated_single_day(&self) -> Option<RepeatRecord> {
        let tally: Tally<(Date, &str, &str)> = self
            .history
            .tracks
            .iter()
            .map(|event| {
                (
                    event.played_at.date(),
                    event.title.as_str(),
                    event.artist.as_str(),
                )
            })
            .collect();
        let leader = tally.leader()?;
        let (date, track, artist) = leader.key;
        Some(RepeatRecord {
            track: track.to_string(),
            artist: artist.to_string(),
            date,
            plays: leader.count,
        })
    }
}

/// Largest bucket, lowest index on ties, `None` when every bucket is empty.
fn peak_index(buckets: &[u64]) -> Option<u8> {
    let mut best: Option<usize> = None;
    for (index, count) in buckets.iter().enumerate() {
        if *count == 0 {
            continue;
        }
        if best.is_none_or(|current| *count > buckets[current]) {
            best = Some(index);
        }
    }
    best.and_then(|index| u8::try_from(index).ok())
}
