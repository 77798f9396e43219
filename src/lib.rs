//! Year-in-review statistics built from a media server's playback history.
//!
//! [`stats`] and [`time_analysis`] are pure queries over a
//! [`model::ListeningHistory`]; [`report`] merges their output into the
//! document that [`pipeline`] writes and [`content`] annotates.

pub mod config;
pub mod content;
pub mod model;
pub mod pipeline;
pub mod report;
pub mod stats;
pub mod tally;
pub mod time_analysis;
