//! Settings persistence using TOML
//!
//! Stores settings in ~/.config/blockfall/settings.toml (or platform equivalent)

use crate::error::{Error, Result};
use crate::generator::Randomizer;
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Game settings
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Board size, speed curve and randomizer
    pub gameplay: GameplaySettings,
    /// Timing of the cosmetic animations
    pub animation: AnimationSettings,
    /// Keybindings
    pub keys: KeyBindings,
}

/// Gameplay settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GameplaySettings {
    pub rows: usize,
    pub cols: usize,
    /// Gravity interval at level 0
    pub base_speed_ms: u64,
    /// Interval reduction per level
    pub acceleration_ms: u64,
    /// Accumulated run time needed per level
    pub level_interval_ms: u64,
    /// Level after which the speed stops increasing
    pub max_speed_level: u32,
    pub randomizer: Randomizer,
    /// Fixed seed for the piece sequence; random when absent
    pub seed: Option<u64>,
}

/// Animation settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnimationSettings {
    /// When false, line clears resolve instantly and pausing does not flash
    pub enabled: bool,
    pub clear_frames: u32,
    pub clear_frame_ms: u64,
    pub pause_frame_ms: u64,
}

/// Key bindings (stored as strings for easy editing)
/// Each command can have one or more keys bound to it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct KeyBindings {
    #[serde(deserialize_with = "deserialize_keys", serialize_with = "serialize_keys")]
    pub move_left: Vec<String>,
    #[serde(deserialize_with = "deserialize_keys", serialize_with = "serialize_keys")]
    pub move_right: Vec<String>,
    #[serde(deserialize_with = "deserialize_keys", serialize_with = "serialize_keys")]
    pub move_down: Vec<String>,
    #[serde(deserialize_with = "deserialize_keys", serialize_with = "serialize_keys")]
    pub rotate: Vec<String>,
    #[serde(deserialize_with = "deserialize_keys", serialize_with = "serialize_keys")]
    pub toggle_pause: Vec<String>,
    /// Only active on the new-game / game-over screen
    #[serde(deserialize_with = "deserialize_keys", serialize_with = "serialize_keys")]
    pub new_game: Vec<String>,
}

/// A binding in `settings.toml` is either one key name or a list of them
#[derive(Deserialize)]
#[serde(untagged)]
enum KeyNames {
    One(String),
    Many(Vec<String>),
}

/// Read a binding such as `rotate = "Space"` or `rotate = ["Space", "x"]`
fn deserialize_keys<'de, D>(deserializer: D) -> std::result::Result<Vec<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Ok(match KeyNames::deserialize(deserializer)? {
        KeyNames::One(key) => vec![key],
        KeyNames::Many(keys) => keys,
    })
}

/// Write a lone key back as a plain string so hand-edited files stay short
fn serialize_keys<S>(keys: &[String], serializer: S) -> std::result::Result<S::Ok, S::Error>
where
    S: serde::Serializer,
{
    match keys {
        [key] => serializer.serialize_str(key),
        _ => keys.serialize(serializer),
    }
}

impl Default for GameplaySettings {
    fn default() -> Self {
        Self {
            rows: 20,
            cols: 10,
            base_speed_ms: 1000,
            acceleration_ms: 100,
            level_interval_ms: 60_000,
            max_speed_level: 8,
            randomizer: Randomizer::Uniform,
            seed: None,
        }
    }
}

impl Default for AnimationSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            clear_frames: 10,
            clear_frame_ms: 50,
            pause_frame_ms: 75,
        }
    }
}

impl Default for KeyBindings {
    fn default() -> Self {
        Self {
            move_left: vec!["Left".to_string()],
            move_right: vec!["Right".to_string()],
            move_down: vec!["Down".to_string()],
            rotate: vec!["Space".to_string()],
            toggle_pause: vec!["Enter".to_string()],
            new_game: vec!["Enter".to_string()],
        }
    }
}

impl AnimationSettings {
    pub fn clear_frame(&self) -> Duration {
        Duration::from_millis(self.clear_frame_ms)
    }

    pub fn pause_frame(&self) -> Duration {
        Duration::from_millis(self.pause_frame_ms)
    }
}

impl Settings {
    /// Get the project directories
    pub(crate) fn project_dirs() -> Option<ProjectDirs> {
        ProjectDirs::from("com", "blockfall", "blockfall")
    }

    /// Get the settings file path
    pub fn settings_path() -> Option<PathBuf> {
        Self::project_dirs().map(|dirs| dirs.config_dir().join("settings.toml"))
    }

    /// Load settings from the default location, or fall back to defaults
    pub fn load() -> Self {
        let Some(path) = Self::settings_path() else {
            return Self::default();
        };

        match Self::load_from(&path) {
            Ok(settings) => settings,
            Err(e) => {
                tracing::debug!("using default settings ({})", e);
                Self::default()
            }
        }
    }

    /// Load settings from a specific file
    pub fn load_from(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path).map_err(|e| Error::storage(path, e))?;
        Ok(toml::from_str(&contents)?)
    }

    /// Save settings to the default location
    pub fn save(&self) -> Result<()> {
        let path = Self::settings_path().ok_or(Error::NoDataDir)?;
        self.save_to(&path)
    }

    /// Save settings to a specific file, creating its directory if needed
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir).map_err(|e| Error::storage(dir, e))?;
        }
        let contents = toml::to_string_pretty(self)?;
        fs::write(path, contents).map_err(|e| Error::storage(path, e))?;
        Ok(())
    }
}
