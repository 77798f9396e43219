use crate::config::Config;
use crate::content::{TextGenerator, generate_all};
use crate::model::{DurationLookup, ListeningHistory, load_history};
use crate::report::{StatsDocument, save_document};
use anyhow::{Context, Result, bail};
use log::{debug, info};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

const RAW_SUFFIX: &str = "_raw.json";
const PROCESSED_SUFFIX: &str = "_processed.json";

/// A `<user>_<year>_raw.json` history waiting to be processed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawFile {
    pub user: String,
    pub year: i32,
    pub path: PathBuf,
}

impl RawFile {
    pub fn processed_name(&self) -> String {
        format!("{}_{}{PROCESSED_SUFFIX}", self.user, self.year)
    }
}

/// Splits `<user>_<year>_raw.json`. Older files carry no year; those get
/// `fallback_year` and the whole stem becomes the user name.
pub fn parse_raw_file_name(file_name: &str, fallback_year: i32) -> Option<(String, i32)> {
    let stem = file_name.strip_suffix(RAW_SUFFIX)?;
    if stem.is_empty() {
        return None;
    }
    if let Some((user, year)) = stem.rsplit_once('_')
        && !user.is_empty()
        && !year.is_empty()
        && year.bytes().all(|b| b.is_ascii_digit())
        && let Ok(year) = year.parse()
    {
        return Some((user.to_string(), year));
    }
    Some((stem.to_string(), fallback_year))
}

pub fn discover_raw_files(data_dir: &Path, fallback_year: i32) -> Result<Vec<RawFile>> {
    let mut files = Vec::new();
    for entry in WalkDir::new(data_dir)
        .min_depth(1)
        .max_depth(1)
        .sort_by_file_name()
    {
        let entry = entry.with_context(|| format!("failed to scan {}", data_dir.display()))?;
        if !entry.file_type().is_file() {
            continue;
        }
        let name = entry.file_name().to_string_lossy();
        if let Some((user, year)) = parse_raw_file_name(&name, fallback_year) {
            files.push(RawFile {
                user,
                year,
                path: entry.path().to_path_buf(),
            });
        }
    }
    Ok(files)
}

/// Turns every raw history under the data directory into a processed
/// statistics document next to it. Returns the written paths.
pub fn process(config: &Config, generator: &dyn TextGenerator) -> Result<Vec<PathBuf>> {
    let data_dir = config.data_dir();
    if !data_dir.is_dir() {
        bail!(
            "data directory not found: {}. Extract listening history first.",
            data_dir.display()
        );
    }

    let raw_files = discover_raw_files(&data_dir, config.year)?;
    if raw_files.is_empty() {
        bail!("no raw history files found in {}", data_dir.display());
    }

    let mut histories: Vec<(RawFile, ListeningHistory)> = Vec::with_capacity(raw_files.len());
    for raw in raw_files {
        let history = load_history(&raw.path)?;
        histories.push((raw, history));
    }

    let durations = DurationLookup::from_histories(histories.iter().map(|(_, history)| history));
    debug!("duration lookup holds {} tracks", durations.len());

    let total = histories.len();
    let mut written = Vec::with_capacity(total);
    for (index, (raw, mut history)) in histories.into_iter().enumerate() {
        info!("processing user {}/{}: {} ({})", index + 1, total, raw.user, raw.year);

        let filled = durations.fill_missing(&mut history);
        if filled > 0 {
            debug!("filled {filled} missing durations for {}", raw.user);
        }

        let mut document = StatsDocument::build(&history, config.top_limit);
        if config.generate_content {
            info!("generating commentary for {}", raw.user);
            document.ai_content = Some(generate_all(generator, &document)?);
        }

        let path = data_dir.join(raw.processed_name());
        save_document(&path, &document)?;
        info!("saved processed data to {}", path.display());
        written.push(path);
    }
    Ok(written)
}

/// Builds one document straight from a raw history file.
pub fn document_for_file(path: &Path, top_limit: usize) -> Result<StatsDocument> {
    let history = load_history(path)?;
    Ok(StatsDocument::build(&history, top_limit))
}
