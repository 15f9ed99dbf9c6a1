//! Gesture settings and the string-keyed preference store they come from.
//!
//! Detectors never read the store themselves.  The owner builds a
//! [`GestureSettings`] value with [`GestureSettings::from_store`] and passes
//! it to the arbiter at construction and again whenever the store changes.
//!
//! Missing or unrecognised values fall back to the defaults: medium
//! sensitivity, not reversed, gestures off.

use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::GestureError;

/// Which sensing modality is armed: `none` / `shake` / `hand`.
pub const KEY_GESTURE_CONTROL: &str = "pref_gesture_control";
/// Threshold scaling: `low` / `medium` / `high`.
pub const KEY_GESTURE_SENSITIVITY: &str = "pref_gesture_sensitivity";
/// Swap next/previous on the motion path: `normal` / `reversed`.
pub const KEY_GESTURE_REVERSED: &str = "pref_gesture_reversed";

// ════════════════════════════════════════════════════════════════════════════
// Sensitivity
// ════════════════════════════════════════════════════════════════════════════

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sensitivity {
    Low,
    #[default]
    Medium,
    High,
}

impl Sensitivity {
    /// Multiplier applied to the base motion thresholds.  Higher
    /// sensitivity means a smaller threshold.
    pub fn factor(self) -> f32 {
        match self {
            Sensitivity::Low    => 1.5,
            Sensitivity::Medium => 1.0,
            Sensitivity::High   => 0.7,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Sensitivity::Low    => "low",
            Sensitivity::Medium => "medium",
            Sensitivity::High   => "high",
        }
    }

    /// Next value in the low → medium → high → low cycle.
    pub fn cycle(self) -> Self {
        match self {
            Sensitivity::Low    => Sensitivity::Medium,
            Sensitivity::Medium => Sensitivity::High,
            Sensitivity::High   => Sensitivity::Low,
        }
    }
}

impl FromStr for Sensitivity {
    type Err = GestureError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "low"    => Ok(Sensitivity::Low),
            "medium" => Ok(Sensitivity::Medium),
            "high"   => Ok(Sensitivity::High),
            other    => Err(GestureError::Preferences(format!("unknown sensitivity {:?}", other))),
        }
    }
}

impl fmt::Display for Sensitivity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ════════════════════════════════════════════════════════════════════════════
// GestureMode
// ════════════════════════════════════════════════════════════════════════════

/// The user's choice of gesture modality.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GestureMode {
    #[default]
    Off,
    Motion,
    Hand,
}

impl GestureMode {
    /// The value written to the preference store.
    pub fn as_str(self) -> &'static str {
        match self {
            GestureMode::Off    => "none",
            GestureMode::Motion => "shake",
            GestureMode::Hand   => "hand",
        }
    }
}

impl FromStr for GestureMode {
    type Err = GestureError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "none" | "off"      => Ok(GestureMode::Off),
            "shake" | "motion"  => Ok(GestureMode::Motion),
            "hand"              => Ok(GestureMode::Hand),
            other => Err(GestureError::Preferences(format!("unknown gesture mode {:?}", other))),
        }
    }
}

impl fmt::Display for GestureMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

fn parse_reversed(s: &str) -> Result<bool, GestureError> {
    match s.trim().to_ascii_lowercase().as_str() {
        "reversed" | "true"  => Ok(true),
        "normal"   | "false" => Ok(false),
        other => Err(GestureError::Preferences(format!("unknown direction {:?}", other))),
    }
}

// ════════════════════════════════════════════════════════════════════════════
// GestureSettings
// ════════════════════════════════════════════════════════════════════════════

/// Snapshot of the gesture preferences, passed explicitly to detectors.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GestureSettings {
    pub mode:        GestureMode,
    pub sensitivity: Sensitivity,
    pub reversed:    bool,
}

impl GestureSettings {
    /// Read settings from a store, falling back per key on any problem.
    pub fn from_store(store: &dyn PreferenceStore) -> Self {
        let defaults = GestureSettings::default();
        GestureSettings {
            mode:        read_key(store, KEY_GESTURE_CONTROL, defaults.mode, str::parse),
            sensitivity: read_key(store, KEY_GESTURE_SENSITIVITY, defaults.sensitivity, str::parse),
            reversed:    read_key(store, KEY_GESTURE_REVERSED, defaults.reversed, parse_reversed),
        }
    }

    /// Write every field back to a store.
    pub fn write_to(&self, store: &mut dyn PreferenceStore) {
        store.set(KEY_GESTURE_CONTROL, self.mode.as_str());
        store.set(KEY_GESTURE_SENSITIVITY, self.sensitivity.as_str());
        store.set(KEY_GESTURE_REVERSED, if self.reversed { "reversed" } else { "normal" });
    }
}

fn read_key<T: fmt::Debug>(
    store: &dyn PreferenceStore,
    key: &str,
    default: T,
    parse: impl Fn(&str) -> Result<T, GestureError>,
) -> T {
    match store.get(key) {
        None => {
            debug!(key, ?default, "preference not set, using default");
            default
        }
        Some(raw) => match parse(&raw) {
            Ok(v) => v,
            Err(e) => {
                warn!(key, error = %e, ?default, "bad preference, using default");
                default
            }
        },
    }
}

// ════════════════════════════════════════════════════════════════════════════
// PreferenceStore
// ════════════════════════════════════════════════════════════════════════════

/// A string-keyed preference store.
pub trait PreferenceStore {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&mut self, key: &str, value: &str);
}

/// Preferences held in memory only.
#[derive(Clone, Debug, Default)]
pub struct InMemoryPreferences {
    values: BTreeMap<String, String>,
}

impl InMemoryPreferences {
    pub fn from_pairs<'a>(pairs: impl IntoIterator<Item = (&'a str, &'a str)>) -> Self {
        InMemoryPreferences {
            values: pairs.into_iter().map(|(k, v)| (k.to_string(), v.to_string())).collect(),
        }
    }
}

impl PreferenceStore for InMemoryPreferences {
    fn get(&self, key: &str) -> Option<String> {
        self.values.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: &str) {
        self.values.insert(key.to_string(), value.to_string());
    }
}

/// Preferences persisted as a flat JSON object of strings.
#[derive(Clone, Debug)]
pub struct JsonPreferences {
    path:   PathBuf,
    values: BTreeMap<String, String>,
}

impl JsonPreferences {
    /// Load from `path`.  A missing file is an empty store.
    pub fn load(path: impl Into<PathBuf>) -> Result<Self, GestureError> {
        let path = path.into();
        if !path.exists() {
            debug!(path = %path.display(), "no preferences file, starting empty");
            return Ok(JsonPreferences { path, values: BTreeMap::new() });
        }
        let content = fs::read_to_string(&path)?;
        let values: BTreeMap<String, String> = serde_json::from_str(&content)?;
        debug!(path = %path.display(), keys = values.len(), "loaded preferences");
        Ok(JsonPreferences { path, values })
    }

    /// Load, or start empty (with a warning) if the file is unreadable or
    /// corrupt.  Saving later overwrites the bad file.
    pub fn load_or_default(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        match Self::load(&path) {
            Ok(p) => p,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "unreadable preferences, using defaults");
                JsonPreferences { path, values: BTreeMap::new() }
            }
        }
    }

    pub fn save(&self) -> Result<(), GestureError> {
        if let Some(dir) = self.path.parent() {
            if !dir.as_os_str().is_empty() {
                fs::create_dir_all(dir)?;
            }
        }
        let content = serde_json::to_string_pretty(&self.values)?;
        fs::write(&self.path, content)?;
        debug!(path = %self.path.display(), "saved preferences");
        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl PreferenceStore for JsonPreferences {
    fn get(&self, key: &str) -> Option<String> {
        self.values.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: &str) {
        self.values.insert(key.to_string(), value.to_string());
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Tests
// ════════════════════════════════════════════════════════════════════════════
