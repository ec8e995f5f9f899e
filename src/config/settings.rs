use crate::error::Result;
use log::{info, warn};
use once_cell::sync::Lazy;
use serde::Deserialize;
use std::collections::HashMap;
use std::env;
use std::path::{Path, PathBuf};
use std::sync::RwLock;
use std::time::Duration;

pub static GLOBAL_CONFIG: Lazy<Config> = Lazy::new(Config::new);

pub const CONFIG_FILE: &str = "academy.toml";

static DEFAULT_DATA_DIR: &str = "data";
const DEFAULT_AUTO_ADVANCE_MS: u64 = 500;
const DEFAULT_TOAST_MS: u64 = 3000;
const DEFAULT_MINING_SUCCESS: f64 = 0.1;

const DATA_DIR_KEY: &str = "ACADEMY_DATA_DIR";
const AUTO_ADVANCE_KEY: &str = "ACADEMY_AUTO_ADVANCE_MS";
const TOAST_KEY: &str = "ACADEMY_TOAST_MS";
const MINING_SUCCESS_KEY: &str = "ACADEMY_MINING_SUCCESS";

/// Optional overrides read from `academy.toml` in the data directory
#[derive(Debug, Default, Deserialize)]
pub struct FileSettings {
    pub auto_advance_ms: Option<u64>,
    pub toast_ms: Option<u64>,
    pub mining_success_probability: Option<f64>,
}

impl FileSettings {
    pub fn parse(text: &str) -> Result<FileSettings> {
        Ok(toml::from_str(text)?)
    }

    pub fn load(data_dir: &Path) -> Result<Option<FileSettings>> {
        let path = data_dir.join(CONFIG_FILE);
        if !path.exists() {
            return Ok(None);
        }
        let text = std::fs::read_to_string(&path)?;
        let settings = Self::parse(&text)?;
        info!("Loaded settings from {}", path.display());
        Ok(Some(settings))
    }

    /// Config keys and raw values set by this file
    fn entries(&self) -> Vec<(&'static str, String)> {
        let mut entries = Vec::new();
        if let Some(ms) = self.auto_advance_ms {
            entries.push((AUTO_ADVANCE_KEY, ms.to_string()));
        }
        if let Some(ms) = self.toast_ms {
            entries.push((TOAST_KEY, ms.to_string()));
        }
        if let Some(p) = self.mining_success_probability {
            entries.push((MINING_SUCCESS_KEY, p.to_string()));
        }
        entries
    }
}

pub struct Config {
    inner: RwLock<HashMap<String, String>>,
}

impl Default for Config {
    fn default() -> Self {
        Self::new()
    }
}

impl Config {
    /// Build the config from defaults, then `academy.toml`, then the environment
    pub fn new() -> Config {
        let config = Config {
            inner: RwLock::new(HashMap::new()),
        };
        let data_dir = env::var(DATA_DIR_KEY).unwrap_or_else(|_| DEFAULT_DATA_DIR.to_string());
        config.set_data_dir(data_dir);
        config
    }

    /// Config with only built-in defaults, rooted at `data_dir`
    pub fn with_data_dir(data_dir: &Path) -> Config {
        let mut map = HashMap::new();
        map.insert(
            String::from(DATA_DIR_KEY),
            data_dir.to_string_lossy().to_string(),
        );
        Config {
            inner: RwLock::new(map),
        }
    }

    fn get(&self, key: &str) -> Option<String> {
        match self.inner.read() {
            Ok(inner) => inner.get(key).cloned(),
            Err(_) => {
                log::error!("Failed to acquire read lock on config");
                None
            }
        }
    }

    fn set(&self, key: &str, value: String) {
        match self.inner.write() {
            Ok(mut inner) => {
                inner.insert(String::from(key), value);
            }
            Err(_) => log::error!("Failed to acquire write lock on config"),
        }
    }

    fn get_parsed<T: std::str::FromStr>(&self, key: &str, default: T) -> T {
        match self.get(key) {
            Some(raw) => raw.trim().parse().unwrap_or_else(|_| {
                warn!("Invalid value {raw:?} for {key}, using default");
                default
            }),
            None => default,
        }
    }

    pub fn get_data_dir(&self) -> PathBuf {
        PathBuf::from(
            self.get(DATA_DIR_KEY)
                .unwrap_or_else(|| DEFAULT_DATA_DIR.to_string()),
        )
    }

    /// Move to `dir` and layer its `academy.toml` and then the environment on top
    pub fn set_data_dir(&self, dir: String) {
        match FileSettings::load(Path::new(&dir)) {
            Ok(Some(file)) => {
                for (key, value) in file.entries() {
                    self.set(key, value);
                }
            }
            Ok(None) => {}
            Err(e) => warn!("Ignoring unreadable {CONFIG_FILE} in {dir}: {e}"),
        }

        // Environment wins over the file
        for key in [AUTO_ADVANCE_KEY, TOAST_KEY, MINING_SUCCESS_KEY] {
            if let Ok(value) = env::var(key) {
                self.set(key, value);
            }
        }

        self.set(DATA_DIR_KEY, dir);
    }

    /// Delay before a stepper advances to the next step
    pub fn get_auto_advance_delay(&self) -> Duration {
        Duration::from_millis(self.get_parsed(AUTO_ADVANCE_KEY, DEFAULT_AUTO_ADVANCE_MS))
    }

    pub fn set_auto_advance_ms(&self, ms: u64) {
        self.set(AUTO_ADVANCE_KEY, ms.to_string());
    }

    /// How long an achievement toast stays visible
    pub fn get_toast_lifetime(&self) -> Duration {
        Duration::from_millis(self.get_parsed(TOAST_KEY, DEFAULT_TOAST_MS))
    }

    /// Per-tick success chance of the mining simulator, clamped to [0, 1]
    pub fn get_mining_success_probability(&self) -> f64 {
        let p = self.get_parsed(MINING_SUCCESS_KEY, DEFAULT_MINING_SUCCESS);
        if p.is_finite() {
            p.clamp(0.0, 1.0)
        } else {
            DEFAULT_MINING_SUCCESS
        }
    }

    pub fn set_mining_success_probability(&self, p: f64) {
        self.set(MINING_SUCCESS_KEY, p.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_defaults() {
        let config = Config::with_data_dir(Path::new("/tmp/academy"));
        assert_eq!(config.get_data_dir(), PathBuf::from("/tmp/academy"));
        assert_eq!(config.get_auto_advance_delay(), Duration::from_millis(500));
        assert_eq!(config.get_toast_lifetime(), Duration::from_millis(3000));
        assert!((config.get_mining_success_probability() - 0.1).abs() < f64::EPSILON);
    }

    #[test]
    fn test_malformed_value_falls_back_to_default() {
        let config = Config::with_data_dir(Path::new("."));
        config.set(AUTO_ADVANCE_KEY, "soon".to_string());
        assert_eq!(config.get_auto_advance_delay(), Duration::from_millis(500));
    }

    #[test]
    fn test_probability_is_clamped() {
        let config = Config::with_data_dir(Path::new("."));
        config.set_mining_success_probability(4.0);
        assert_eq!(config.get_mining_success_probability(), 1.0);
    }

    #[test]
    fn test_file_settings_entries() {
        let file = FileSettings::parse("auto_advance_ms = 250\ntoast_ms = 1000\n").unwrap();
        let config = Config::with_data_dir(Path::new("."));
        for (key, value) in file.entries() {
            config.set(key, value);
        }
        assert_eq!(config.get_auto_advance_delay(), Duration::from_millis(250));
        assert_eq!(config.get_toast_lifetime(), Duration::from_millis(1000));
    }

    #[test]
    fn test_data_dir_reads_settings_file_under_env() {
        let dir = tempdir().unwrap();
        std::fs::write(
            dir.path().join(CONFIG_FILE),
            "auto_advance_ms = 250\ntoast_ms = 1000\n",
        )
        .unwrap();
        assert!(FileSettings::load(dir.path()).unwrap().is_some());

        let config = Config::with_data_dir(Path::new("."));
        config.set_data_dir(dir.path().to_string_lossy().to_string());
        assert_eq!(config.get_data_dir(), dir.path());
        assert_eq!(config.get_auto_advance_delay(), Duration::from_millis(250));
        assert_eq!(config.get_toast_lifetime(), Duration::from_millis(1000));

        // Only this test touches the toast variable
        env::set_var(TOAST_KEY, "42");
        config.set_data_dir(dir.path().to_string_lossy().to_string());
        env::remove_var(TOAST_KEY);
        assert_eq!(config.get_toast_lifetime(), Duration::from_millis(42));
        assert_eq!(config.get_auto_advance_delay(), Duration::from_millis(250));
    }

    #[test]
    fn test_missing_settings_file_keeps_defaults() {
        let dir = tempdir().unwrap();
        assert!(FileSettings::load(dir.path()).unwrap().is_none());

        let config = Config::with_data_dir(Path::new("."));
        config.set_data_dir(dir.path().to_string_lossy().to_string());
        assert_eq!(config.get_auto_advance_delay(), Duration::from_millis(500));
    }

    #[test]
    fn test_file_settings_reject_bad_toml() {
        assert!(FileSettings::parse("auto_advance_ms = \"fast\"").is_err());
    }
}
