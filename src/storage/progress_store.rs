// Persistent learner state, kept in a Sled tree of string keys and JSON values.
// It plays the role browser local storage plays for the web app: reads never
// fail (missing or malformed values become defaults) and the plain `save_*`
// writes are best-effort.

use crate::core::{CompletionSet, ProgressState};
use crate::error::{AcademyError, Result};
use log::{info, warn};
use serde::{Deserialize, Serialize};
use sled::{Db, Tree};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

const PROGRESS_TREE: &str = "progress";
const COMPLETED_MODULES_KEY: &str = "completed_modules";
const STEPS_KEY_PREFIX: &str = "steps:";
const MASTERY_POINTS_KEY: &str = "mastery_points";
const AUDIO_ENABLED_KEY: &str = "audio_enabled";
const VOLUME_KEY: &str = "volume";
const ADAPTATION_LEVEL_KEY: &str = "adaptation_level";

/// How much detail the lessons present
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AdaptationLevel {
    #[default]
    Beginner,
    Intermediate,
    Advanced,
}

impl FromStr for AdaptationLevel {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "beginner" => Ok(AdaptationLevel::Beginner),
            "intermediate" => Ok(AdaptationLevel::Intermediate),
            "advanced" => Ok(AdaptationLevel::Advanced),
            _ => Err(format!(
                "Invalid level: {s}. Valid options: beginner, intermediate, advanced"
            )),
        }
    }
}

impl fmt::Display for AdaptationLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AdaptationLevel::Beginner => write!(f, "beginner"),
            AdaptationLevel::Intermediate => write!(f, "intermediate"),
            AdaptationLevel::Advanced => write!(f, "advanced"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LearnerSettings {
    pub audio_enabled: bool,
    /// Always within [0, 1]
    pub volume: f32,
    pub adaptation_level: AdaptationLevel,
}

impl Default for LearnerSettings {
    fn default() -> Self {
        Self {
            audio_enabled: true,
            volume: 0.5,
            adaptation_level: AdaptationLevel::Beginner,
        }
    }
}

pub fn clamp_volume(volume: f32) -> f32 {
    if volume.is_finite() {
        volume.clamp(0.0, 1.0)
    } else {
        LearnerSettings::default().volume
    }
}

pub struct ProgressStore {
    db: Db,
    tree: Tree,
    path: PathBuf,
}

impl ProgressStore {
    pub fn open(path: &Path) -> Result<ProgressStore> {
        let db = sled::open(path)
            .map_err(|e| AcademyError::Database(format!("Failed to open database: {e}")))?;
        let tree = db
            .open_tree(PROGRESS_TREE)
            .map_err(|e| AcademyError::Database(format!("Failed to open progress tree: {e}")))?;
        info!("Opened progress store at {}", path.display());
        Ok(ProgressStore {
            db,
            tree,
            path: path.to_path_buf(),
        })
    }

    /// Open `<data_dir>/progress`
    pub fn open_in(data_dir: &Path) -> Result<ProgressStore> {
        Self::open(&data_dir.join("progress"))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_raw(&self, key: &str) -> Option<String> {
        match self.tree.get(key) {
            Ok(Some(value)) => match String::from_utf8(value.to_vec()) {
                Ok(text) => Some(text),
                Err(e) => {
                    warn!("Ignoring non-UTF-8 value for {key}: {e}");
                    None
                }
            },
            Ok(None) => None,
            Err(e) => {
                warn!("Failed to read {key}: {e}");
                None
            }
        }
    }

    fn read_json<T: for<'de> Deserialize<'de>>(&self, key: &str) -> Option<T> {
        let raw = self.read_raw(key)?;
        match serde_json::from_str(&raw) {
            Ok(value) => Some(value),
            Err(e) => {
                warn!("Malformed value for {key} ({e}), using default");
                None
            }
        }
    }

    fn try_write_json<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> Result<()> {
        let encoded = serde_json::to_string(value)?;
        self.tree
            .insert(key, encoded.as_bytes())
            .map_err(|e| AcademyError::Database(format!("Failed to write {key}: {e}")))?;
        self.tree
            .flush()
            .map_err(|e| AcademyError::Database(format!("Failed to flush {key}: {e}")))?;
        Ok(())
    }

    fn write_json<T: Serialize + ?Sized>(&self, key: &str, value: &T) {
        if let Err(e) = self.try_write_json(key, value) {
            warn!("Could not save {key}: {e}");
        }
    }

    fn steps_key(module: &str) -> String {
        format!("{STEPS_KEY_PREFIX}{module}")
    }

    pub fn load_completed_modules(&self) -> CompletionSet {
        self.read_raw(COMPLETED_MODULES_KEY)
            .map(|raw| CompletionSet::from_json_lossy(&raw))
            .unwrap_or_default()
    }

    pub fn try_save_completed_modules(&self, completed: &CompletionSet) -> Result<()> {
        let ids: Vec<&str> = completed.iter().collect();
        self.try_write_json(COMPLETED_MODULES_KEY, &ids)
    }

    pub fn save_completed_modules(&self, completed: &CompletionSet) {
        if let Err(e) = self.try_save_completed_modules(completed) {
            warn!("Could not save completed modules: {e}");
        }
    }

    pub fn load_module_steps(&self, module: &str) -> BTreeSet<usize> {
        self.read_json(&Self::steps_key(module)).unwrap_or_default()
    }

    pub fn save_module_steps(&self, module: &str, steps: &BTreeSet<usize>) {
        self.write_json(&Self::steps_key(module), steps);
    }

    pub fn load_mastery_points(&self) -> u64 {
        self.read_json(MASTERY_POINTS_KEY).unwrap_or(0)
    }

    pub fn save_mastery_points(&self, points: u64) {
        self.write_json(MASTERY_POINTS_KEY, &points);
    }

    /// Rebuild the whole progress state from storage
    pub fn load_progress(&self) -> ProgressState {
        let mut module_steps = BTreeMap::new();
        for item in self.tree.scan_prefix(STEPS_KEY_PREFIX) {
            match item {
                Ok((key, _)) => {
                    let key = String::from_utf8_lossy(&key).to_string();
                    if let Some(module) = key.strip_prefix(STEPS_KEY_PREFIX) {
                        let steps = self.load_module_steps(module);
                        if !steps.is_empty() {
                            module_steps.insert(module.to_string(), steps);
                        }
                    }
                }
                Err(e) => warn!("Failed to scan step records: {e}"),
            }
        }

        ProgressState {
            completed_modules: self.load_completed_modules(),
            module_steps,
            mastery_points: self.load_mastery_points(),
        }
    }

    /// Write every part of `state`, stopping at the first failure
    pub fn try_save_progress(&self, state: &ProgressState) -> Result<()> {
        self.try_save_completed_modules(&state.completed_modules)?;
        for (module, steps) in &state.module_steps {
            self.try_write_json(&Self::steps_key(module), steps)?;
        }
        self.try_write_json(MASTERY_POINTS_KEY, &state.mastery_points)
    }

    pub fn save_progress(&self, state: &ProgressState) {
        if let Err(e) = self.try_save_progress(state) {
            warn!("Could not save progress: {e}");
        }
    }

    pub fn load_settings(&self) -> LearnerSettings {
        let defaults = LearnerSettings::default();
        let adaptation_level = self
            .read_raw(ADAPTATION_LEVEL_KEY)
            .and_then(|raw| {
                let text: String = serde_json::from_str(&raw).unwrap_or(raw);
                text.parse().ok()
            })
            .unwrap_or(defaults.adaptation_level);

        LearnerSettings {
            audio_enabled: self
                .read_json(AUDIO_ENABLED_KEY)
                .unwrap_or(defaults.audio_enabled),
            volume: self
                .read_json::<f32>(VOLUME_KEY)
                .map(clamp_volume)
                .unwrap_or(defaults.volume),
            adaptation_level,
        }
    }

    pub fn set_audio_enabled(&self, enabled: bool) {
        self.write_json(AUDIO_ENABLED_KEY, &enabled);
    }

    pub fn set_volume(&self, volume: f32) {
        self.write_json(VOLUME_KEY, &clamp_volume(volume));
    }

    pub fn set_adaptation_level(&self, level: AdaptationLevel) {
        self.write_json(ADAPTATION_LEVEL_KEY, &level);
    }

    /// Remove all progress records; learner settings are kept
    pub fn reset(&self) -> Result<()> {
        let mut keys = vec![
            COMPLETED_MODULES_KEY.as_bytes().to_vec(),
            MASTERY_POINTS_KEY.as_bytes().to_vec(),
        ];
        for item in self.tree.scan_prefix(STEPS_KEY_PREFIX) {
            let (key, _) = item?;
            keys.push(key.to_vec());
        }
        for key in keys {
            self.tree.remove(key)?;
        }
        self.db.flush()?;
        info!("Progress reset");
        Ok(())
    }

    #[cfg(test)]
    fn write_raw(&self, key: &str, value: &str) {
        self.tree.insert(key, value.as_bytes()).unwrap();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_empty_store_reads_defaults() {
        let dir = tempdir().unwrap();
        let store = ProgressStore::open_in(dir.path()).unwrap();
        assert_eq!(store.load_progress(), ProgressState::default());
        assert_eq!(store.load_settings(), LearnerSettings::default());
    }

    #[test]
    fn test_malformed_values_read_as_defaults() {
        let dir = tempdir().unwrap();
        let store = ProgressStore::open_in(dir.path()).unwrap();
        store.write_raw(COMPLETED_MODULES_KEY, "{\"money\": true}");
        store.write_raw("steps:money", "[0, \"one\"]");
        store.write_raw(AUDIO_ENABLED_KEY, "maybe");
        store.write_raw(VOLUME_KEY, "7.5");
        store.write_raw(ADAPTATION_LEVEL_KEY, "wizard");

        let progress = store.load_progress();
        assert!(progress.completed_modules.is_empty());
        assert!(progress.module_steps.is_empty());

        let settings = store.load_settings();
        assert!(settings.audio_enabled);
        assert_eq!(settings.volume, 1.0);
        assert_eq!(settings.adaptation_level, AdaptationLevel::Beginner);
    }

    #[test]
    fn test_bare_level_string_is_accepted() {
        let dir = tempdir().unwrap();
        let store = ProgressStore::open_in(dir.path()).unwrap();
        store.write_raw(ADAPTATION_LEVEL_KEY, "advanced");
        assert_eq!(
            store.load_settings().adaptation_level,
            AdaptationLevel::Advanced
        );
    }

    #[test]
    fn test_progress_survives_reopen() {
        let dir = tempdir().unwrap();
        let mut state = ProgressState::default();
        state.completed_modules.insert("money");
        state
            .module_steps
            .insert("numbers".to_string(), BTreeSet::from([0, 1]));
        state.mastery_points = 100;

        {
            let store = ProgressStore::open_in(dir.path()).unwrap();
            store.try_save_progress(&state).unwrap();
            store.set_volume(0.25);
            store.set_audio_enabled(false);
            store.set_adaptation_level(AdaptationLevel::Intermediate);
        }

        let store = ProgressStore::open_in(dir.path()).unwrap();
        assert_eq!(store.load_progress(), state);
        let settings = store.load_settings();
        assert!(!settings.audio_enabled);
        assert_eq!(settings.volume, 0.25);
        assert_eq!(settings.adaptation_level, AdaptationLevel::Intermediate);
    }

    #[test]
    fn test_reset_keeps_settings() {
        let dir = tempdir().unwrap();
        let store = ProgressStore::open_in(dir.path()).unwrap();
        let mut state = ProgressState::default();
        state.completed_modules.insert("money");
        state
            .module_steps
            .insert("money".to_string(), BTreeSet::from([0]));
        store.save_progress(&state);
        store.set_audio_enabled(false);

        store.reset().unwrap();
        assert_eq!(store.load_progress(), ProgressState::default());
        assert!(!store.load_settings().audio_enabled);
    }

    #[test]
    fn test_adaptation_level_parsing() {
        assert_eq!(
            "Intermediate".parse::<AdaptationLevel>().unwrap(),
            AdaptationLevel::Intermediate
        );
        assert!("expert".parse::<AdaptationLevel>().is_err());
        assert_eq!(AdaptationLevel::Advanced.to_string(), "advanced");
    }
}
