//! # wave_gesture
//!
//! Gesture-based playback control for an audio player.
//!
//! Two independent sensing modalities are turned into five discrete
//! transport commands:
//!
//! ```text
//! accelerometer ─► MotionGestureDetector ─┐
//!                                         ├─► GestureArbiter ─► CommandSink
//! hand frames ─► classify ─► HandGestureDetector ─┘
//! ```
//!
//! Only one modality is ever armed.  Detectors run on their own worker
//! threads and hand events to the arbiter over a bounded channel; the
//! arbiter delivers them to the sink from whichever thread calls
//! [`GestureArbiter::pump`].
//!
//! ## Gesture → Command mapping
//!
//! | Modality | Gesture | Command |
//! |---|---|---|
//! | Motion | Lateral swipe right (`x > swipe`) | `Next` (`Previous` when reversed) |
//! | Motion | Lateral swipe left (`x < -swipe`) | `Previous` (`Next` when reversed) |
//! | Motion | Drop (`y < drop`) | `PlayPauseToggle` |
//! | Hand | Index finger only | `Next` |
//! | Hand | Index + middle + ring | `Previous` |
//! | Hand | Closed fist | `Play` |
//! | Hand | Open palm | `Pause` |
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use wave_gesture::{GestureArbiter, GestureSettings, InMemoryPreferences};
//! # use wave_gesture::{CommandSink, MotionSource, HandSource};
//! # fn sources() -> (Box<dyn MotionSource>, Box<dyn HandSource>) { unimplemented!() }
//! # struct Sink;
//! # impl CommandSink for Sink {
//! #     fn next(&mut self) {} fn previous(&mut self) {} fn play(&mut self) {}
//! #     fn pause(&mut self) {} fn toggle_play_pause(&mut self) {}
//! # }
//! let prefs = InMemoryPreferences::default();
//! let settings = GestureSettings::from_store(&prefs);
//! let (motion, hand) = sources();
//!
//! let mut arbiter = GestureArbiter::new(motion, hand, Box::new(Sink), &settings);
//! arbiter.enable_motion().ok();
//! loop {
//!     arbiter.pump();
//! #   break;
//! }
//! ```

pub mod arbiter;
pub mod classifier;
pub mod error;
pub mod event;
pub mod hand;
pub mod landmarks;
pub mod motion;
pub mod poses;
pub mod settings;
pub mod source;
pub mod worker;

pub use arbiter::{CommandSink, DetectorMode, GestureArbiter};
pub use classifier::{classify, classify_frame, ClassifierThresholds, HandPose};
pub use error::GestureError;
pub use event::{AccelerationSample, GestureEvent};
pub use hand::HandGestureDetector;
pub use landmarks::{HandFrame, Landmark};
pub use motion::{MotionGestureDetector, MotionThresholds};
pub use settings::{
    GestureMode, GestureSettings, InMemoryPreferences, JsonPreferences, PreferenceStore,
    Sensitivity,
};
pub use source::{FrameSlot, HandSource, MotionSource};
