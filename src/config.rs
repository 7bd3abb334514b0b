//! Preset and global settings
//!
//! The configuration is an explicit value: [`Config`] holds the named timing
//! presets plus the global settings, and each worker receives its own copy
//! at construction time. String-keyed access only exists through
//! [`SettingKey`], the translation table used at the GUI boundary.

use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::utils::path::get_data_dir;

/// Preset selected when nothing else is configured
pub const DEFAULT_PRESET: &str = "路亚轻杆";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to access config file {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to serialize config: {0}")]
    Serialize(#[from] serde_json::Error),
    #[error("preset '{0}' not found")]
    UnknownPreset(String),
    #[error("unknown setting '{0}'")]
    UnknownSetting(String),
    #[error("invalid value '{value}' for setting '{name}'")]
    InvalidValue { name: String, value: String },
}

/// Timing parameters for one rod/bait combination
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Preset {
    /// Seconds the button is held to cast
    pub cast_time: f64,
    /// Seconds the button is held per reel pull
    pub reel_in_time: f64,
    /// Seconds of slack between pulls
    pub release_time: f64,
    /// Pull attempts before the catch is given up
    pub max_pulls: u32,
    /// Seconds between cycles
    pub cycle_interval: f64,
}

impl Preset {
    fn new(
        cast_time: f64,
        reel_in_time: f64,
        release_time: f64,
        max_pulls: u32,
        cycle_interval: f64,
    ) -> Self {
        Self {
            cast_time,
            reel_in_time,
            release_time,
            max_pulls,
            cycle_interval,
        }
    }

    fn is_valid(&self) -> bool {
        [
            self.cast_time,
            self.reel_in_time,
            self.release_time,
            self.cycle_interval,
        ]
        .iter()
        .all(|v| v.is_finite() && *v > 0.0)
            && self.max_pulls > 0
    }
}

/// Settings shared by every preset
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GlobalSettings {
    pub hotkey: String,
    pub debug_hotkey: String,
    /// Accept the time-extension popup instead of declining it
    pub enable_jiashi: bool,
    /// Timing jitter in percent (0-100)
    pub jitter_range: u8,
    pub theme: String,
}

impl Default for GlobalSettings {
    fn default() -> Self {
        Self {
            hotkey: "F2".to_string(),
            debug_hotkey: "F10".to_string(),
            enable_jiashi: true,
            jitter_range: 0,
            theme: "Light".to_string(),
        }
    }
}

/// Built-in presets
pub fn default_presets() -> BTreeMap<String, Preset> {
    let mut presets = BTreeMap::new();
    presets.insert("路亚轻杆".to_string(), Preset::new(2.0, 2.0, 1.0, 20, 0.5));
    presets.insert("路亚重杆".to_string(), Preset::new(3.0, 2.5, 1.5, 15, 0.5));
    presets.insert("冰钓轻杆".to_string(), Preset::new(1.5, 1.8, 0.8, 25, 0.5));
    presets.insert("冰钓重杆".to_string(), Preset::new(2.5, 2.2, 1.2, 18, 0.5));
    presets
}

fn default_preset_name() -> String {
    DEFAULT_PRESET.to_string()
}

/// Complete configuration as stored in `config/config.json`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_preset_name")]
    pub current_preset: String,
    #[serde(default = "default_presets")]
    pub presets: BTreeMap<String, Preset>,
    #[serde(default)]
    pub global_settings: GlobalSettings,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            current_preset: default_preset_name(),
            presets: default_presets(),
            global_settings: GlobalSettings::default(),
        }
    }
}

impl Config {
    /// Default location below the data directory
    pub fn default_path() -> PathBuf {
        get_data_dir().join("config").join("config.json")
    }

    /// Load the configuration, writing defaults when the file is missing or corrupt.
    ///
    /// A file that exists but cannot be read is left alone and defaults are used
    /// for this run only.
    pub fn load_or_default(path: &Path) -> Self {
        let content = match fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                tracing::info!("[CONFIG] No config at {:?}, writing defaults", path);
                return Self::write_defaults(path);
            }
            Err(e) => {
                tracing::warn!("[CONFIG] Cannot read {:?}: {}, using defaults without saving", path, e);
                return Self::default();
            }
        };

        match serde_json::from_str::<Config>(&content) {
            Ok(mut config) => {
                if config.presets.is_empty() {
                    config.presets = default_presets();
                }
                if !config.presets.contains_key(&config.current_preset) {
                    let fallback = config
                        .presets
                        .keys()
                        .next()
                        .cloned()
                        .unwrap_or_else(default_preset_name);
                    tracing::warn!(
                        "[CONFIG] Preset '{}' not found, falling back to '{}'",
                        config.current_preset,
                        fallback
                    );
                    config.current_preset = fallback;
                }
                if let Err(e) = config.validate() {
                    tracing::warn!("[CONFIG] {}", e);
                }
                config
            }
            Err(e) => {
                tracing::warn!("[CONFIG] Corrupt config {:?}: {}, writing defaults", path, e);
                Self::write_defaults(path)
            }
        }
    }

    fn write_defaults(path: &Path) -> Self {
        let config = Self::default();
        if let Err(e) = config.save(path) {
            tracing::warn!("[CONFIG] Failed to write default config: {}", e);
        }
        config
    }

    /// Write the configuration as pretty JSON
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|source| ConfigError::Io {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        let content = serde_json::to_string_pretty(self)?;
        fs::write(path, content).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Check that the current preset exists and every value is in range
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.presets.contains_key(&self.current_preset) {
            return Err(ConfigError::UnknownPreset(self.current_preset.clone()));
        }
        for (name, preset) in &self.presets {
            if !preset.is_valid() {
                return Err(ConfigError::InvalidValue {
                    name: name.clone(),
                    value: format!("{:?}", preset),
                });
            }
        }
        if self.global_settings.jitter_range > 100 {
            return Err(ConfigError::InvalidValue {
                name: "jitter_range".to_string(),
                value: self.global_settings.jitter_range.to_string(),
            });
        }
        Ok(())
    }

    /// The preset the automation loop runs with
    pub fn active_preset(&self) -> &Preset {
        self.presets
            .get(&self.current_preset)
            .or_else(|| self.presets.values().next())
            .unwrap_or(&FALLBACK_PRESET)
    }

    /// Switch the active preset by name
    pub fn select_preset(&mut self, name: &str) -> Result<(), ConfigError> {
        if !self.presets.contains_key(name) {
            return Err(ConfigError::UnknownPreset(name.to_string()));
        }
        self.current_preset = name.to_string();
        Ok(())
    }

    /// Read a setting through the GUI translation table
    pub fn setting(&self, key: SettingKey) -> String {
        let preset = self.active_preset();
        let globals = &self.global_settings;
        match key {
            SettingKey::CastTime => preset.cast_time.to_string(),
            SettingKey::ReelInTime => preset.reel_in_time.to_string(),
            SettingKey::ReleaseTime => preset.release_time.to_string(),
            SettingKey::MaxPulls => preset.max_pulls.to_string(),
            SettingKey::CycleInterval => preset.cycle_interval.to_string(),
            SettingKey::Hotkey => globals.hotkey.clone(),
            SettingKey::DebugHotkey => globals.debug_hotkey.clone(),
            SettingKey::EnableJiashi => globals.enable_jiashi.to_string(),
            SettingKey::JitterRange => globals.jitter_range.to_string(),
            SettingKey::Theme => globals.theme.clone(),
        }
    }

    /// Write a setting through the GUI translation table
    ///
    /// Preset keys go to the active preset, everything else to the globals.
    pub fn set_setting(&mut self, key: SettingKey, value: &str) -> Result<(), ConfigError> {
        let invalid = || ConfigError::InvalidValue {
            name: key.name().to_string(),
            value: value.to_string(),
        };
        let positive = |v: &str| -> Result<f64, ConfigError> {
            v.trim()
                .parse::<f64>()
                .ok()
                .filter(|v| v.is_finite() && *v > 0.0)
                .ok_or_else(invalid)
        };

        match key {
            SettingKey::CastTime => self.active_preset_mut()?.cast_time = positive(value)?,
            SettingKey::ReelInTime => self.active_preset_mut()?.reel_in_time = positive(value)?,
            SettingKey::ReleaseTime => self.active_preset_mut()?.release_time = positive(value)?,
            SettingKey::CycleInterval => {
                self.active_preset_mut()?.cycle_interval = positive(value)?
            }
            SettingKey::MaxPulls => {
                let pulls = value
                    .trim()
                    .parse::<u32>()
                    .ok()
                    .filter(|p| *p > 0)
                    .ok_or_else(invalid)?;
                self.active_preset_mut()?.max_pulls = pulls;
            }
            SettingKey::Hotkey => self.global_settings.hotkey = value.trim().to_string(),
            SettingKey::DebugHotkey => {
                self.global_settings.debug_hotkey = value.trim().to_string()
            }
            SettingKey::EnableJiashi => {
                self.global_settings.enable_jiashi =
                    value.trim().parse::<bool>().map_err(|_| invalid())?
            }
            SettingKey::JitterRange => {
                self.global_settings.jitter_range = value
                    .trim()
                    .parse::<u8>()
                    .ok()
                    .filter(|j| *j <= 100)
                    .ok_or_else(invalid)?
            }
            SettingKey::Theme => self.global_settings.theme = value.trim().to_string(),
        }
        Ok(())
    }

    fn active_preset_mut(&mut self) -> Result<&mut Preset, ConfigError> {
        let name = self.current_preset.clone();
        self.presets
            .get_mut(&name)
            .ok_or(ConfigError::UnknownPreset(name))
    }
}

static FALLBACK_PRESET: Preset = Preset {
    cast_time: 2.0,
    reel_in_time: 2.0,
    release_time: 1.0,
    max_pulls: 20,
    cycle_interval: 0.5,
};

/// Setting names understood at the GUI boundary
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SettingKey {
    CastTime,
    ReelInTime,
    ReleaseTime,
    MaxPulls,
    CycleInterval,
    Hotkey,
    DebugHotkey,
    EnableJiashi,
    JitterRange,
    Theme,
}

impl SettingKey {
    pub const ALL: [SettingKey; 10] = [
        SettingKey::CastTime,
        SettingKey::ReelInTime,
        SettingKey::ReleaseTime,
        SettingKey::MaxPulls,
        SettingKey::CycleInterval,
        SettingKey::Hotkey,
        SettingKey::DebugHotkey,
        SettingKey::EnableJiashi,
        SettingKey::JitterRange,
        SettingKey::Theme,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            SettingKey::CastTime => "cast_time",
            SettingKey::ReelInTime => "reel_in_time",
            SettingKey::ReleaseTime => "release_time",
            SettingKey::MaxPulls => "max_pulls",
            SettingKey::CycleInterval => "cycle_interval",
            SettingKey::Hotkey => "hotkey",
            SettingKey::DebugHotkey => "debug_hotkey",
            SettingKey::EnableJiashi => "enable_jiashi",
            SettingKey::JitterRange => "jitter_range",
            SettingKey::Theme => "theme",
        }
    }

    pub fn from_name(name: &str) -> Result<Self, ConfigError> {
        Self::ALL
            .iter()
            .copied()
            .find(|key| key.name() == name)
            .ok_or_else(|| ConfigError::UnknownSetting(name.to_string()))
    }
}
