use crate::stats::DEFAULT_TOP_LIMIT;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

const APP_DIR: &str = "wrapped";
const CONFIG_FILE: &str = "config.json";
const DATA_DIR: &str = "data";

pub const CONFIG_DIR_VAR: &str = "WRAPPED_CONFIG_DIR";
pub const YEAR_VAR: &str = "WRAPPED_YEAR";
pub const OUTPUT_DIR_VAR: &str = "WRAPPED_OUTPUT_DIR";
pub const TOP_LIMIT_VAR: &str = "WRAPPED_TOP_LIMIT";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_year")]
    pub year: i32,
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
    #[serde(default = "default_top_limit")]
    pub top_limit: usize,
    #[serde(default)]
    pub generate_content: bool,
}

fn default_year() -> i32 {
    time::OffsetDateTime::now_utc().year()
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("dist")
}

fn default_top_limit() -> usize {
    DEFAULT_TOP_LIMIT
}

impl Default for Config {
    fn default() -> Self {
        Self {
            year: default_year(),
            output_dir: default_output_dir(),
            top_limit: default_top_limit(),
            generate_content: false,
        }
    }
}

impl Config {
    pub fn data_dir(&self) -> PathBuf {
        self.output_dir.join(DATA_DIR)
    }

    /// Environment variables win over the file.
    pub fn apply_env_overrides(&mut self) -> Result<()> {
        if let Some(year) = env_value::<i32>(YEAR_VAR)? {
            self.year = year;
        }
        if let Ok(dir) = env::var(OUTPUT_DIR_VAR)
            && !dir.trim().is_empty()
        {
            self.output_dir = PathBuf::from(dir.trim());
        }
        if let Some(limit) = env_value::<usize>(TOP_LIMIT_VAR)? {
            self.top_limit = limit;
        }
        Ok(())
    }
}

fn env_value<T>(name: &str) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match env::var(name) {
        Ok(raw) if !raw.trim().is_empty() => raw
            .trim()
            .parse()
            .map(Some)
            .with_context(|| format!("{name} has an invalid value {raw:?}")),
        _ => Ok(None),
    }
}

pub fn config_root() -> Result<PathBuf> {
    if let Ok(override_dir) = env::var(CONFIG_DIR_VAR) {
        return Ok(PathBuf::from(override_dir));
    }

    let home = env::var("HOME")
        .or_else(|_| env::var("USERPROFILE"))
        .context("neither HOME nor USERPROFILE is set")?;
    Ok(PathBuf::from(home).join(".config").join(APP_DIR))
}

pub fn config_path() -> Result<PathBuf> {
    Ok(config_root()?.join(CONFIG_FILE))
}

pub fn ensure_config_dir() -> Result<PathBuf> {
    let root = config_root()?;
    fs::create_dir_all(&root).with_context(|| format!("failed to create {}", root.display()))?;
    Ok(root)
}

/// File settings (or defaults when there is no file) plus environment overrides.
pub fn load_config() -> Result<Config> {
    let mut config = load_config_from_path(&config_path()?)?;
    config.apply_env_overrides()?;
    Ok(config)
}

pub fn save_config(config: &Config) -> Result<()> {
    ensure_config_dir()?;
    let path = config_path()?;
    let json = serde_json::to_string_pretty(config)?;
    fs::write(&path, json).with_context(|| format!("failed to write {}", path.display()))?;
    Ok(())
}

fn load_config_from_path(path: &Path) -> Result<Config> {
    if !path.exists() {
        return Ok(Config::default());
    }

    let raw = fs::read_to_string(path)
        .with_context(|| format!("failed to read config file {}", path.display()))?;
    let config: Config = serde_json::from_str(&raw)
        .with_context(|| format!("failed to parse config file {}", path.display()))?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn missing_fields_take_defaults() {
        let config: Config = serde_json::from_str(r#"{"year": 2023}"#).expect("parse");
        assert_eq!(config.year, 2023);
        assert_eq!(config.output_dir, PathBuf::from("dist"));
        assert_eq!(config.top_limit, 10);
        assert!(!config.generate_content);
        assert_eq!(config.data_dir(), PathBuf::from("dist").join("data"));
    }

    #[test]
    fn missing_file_means_defaults() {
        let dir = tempdir().expect("tempdir");
        let config = load_config_from_path(&dir.path().join("absent.json")).expect("load");
        assert_eq!(config.top_limit, DEFAULT_TOP_LIMIT);
    }

    #[test]
    fn malformed_file_is_an_error() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join(CONFIG_FILE);
        fs::write(&path, "{ not json").expect("write");
        let err = load_config_from_path(&path).expect_err("should fail");
        assert!(format!("{err:#}").contains("failed to parse config file"));
    }

    // Environment variables are process-wide, so everything touching them
    // lives in this one test.
    #[test]
    fn save_load_and_env_overrides() {
        let dir = tempdir().expect("tempdir");
        unsafe {
            env::set_var(CONFIG_DIR_VAR, dir.path().to_string_lossy().as_ref());
            env::remove_var(YEAR_VAR);
            env::remove_var(OUTPUT_DIR_VAR);
            env::remove_var(TOP_LIMIT_VAR);
        }

        let config = Config {
            year: 2022,
            output_dir: PathBuf::from("site"),
            top_limit: 5,
            generate_content: true,
        };
        save_config(&config).expect("save");
        assert_eq!(load_config().expect("load"), config);

        unsafe {
            env::set_var(YEAR_VAR, "2021");
            env::set_var(TOP_LIMIT_VAR, "25");
        }
        let overridden = load_config().expect("load with env");
        assert_eq!(overridden.year, 2021);
        assert_eq!(overridden.top_limit, 25);
        assert_eq!(overridden.output_dir, PathBuf::from("site"));

        unsafe {
            env::set_var(TOP_LIMIT_VAR, "lots");
        }
        assert!(load_config().is_err());

        unsafe {
            env::remove_var(YEAR_VAR);
            env::remove_var(TOP_LIMIT_VAR);
            env::remove_var(CONFIG_DIR_VAR);
        }
    }
}
