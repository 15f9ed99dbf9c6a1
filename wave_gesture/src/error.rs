//! Error type for the few operations that can actually fail.
//!
//! Per-sample and per-frame problems never surface here: a bad sample or a
//! frame without a hand simply produces no event.  Only acquiring a
//! resource (sensor, camera, worker thread) or touching the preference
//! file can fail.

use std::io;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum GestureError {
    #[error("motion sensor unavailable: {0}")]
    SensorUnavailable(String),

    #[error("camera unavailable: {0}")]
    CameraUnavailable(String),

    #[error("failed to spawn {name} worker")]
    WorkerSpawn {
        name: &'static str,
        #[source]
        source: io::Error,
    },

    #[error("invalid preference: {0}")]
    Preferences(String),

    #[error("preferences file: {0}")]
    PreferencesIo(#[from] io::Error),

    #[error("preferences format: {0}")]
    PreferencesJson(#[from] serde_json::Error),
}

impl GestureError {
    /// True for failures to acquire a sensing resource, which the owner is
    /// expected to report to the user rather than treat as a bug.
    pub fn is_acquisition(&self) -> bool {
        matches!(
            self,
            GestureError::SensorUnavailable(_)
                | GestureError::CameraUnavailable(_)
                | GestureError::WorkerSpawn { .. }
        )
    }
}
