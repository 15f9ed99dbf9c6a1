//! # wave_deck
//!
//! Desk harness for `wave_gesture`: a simulated accelerometer and camera
//! driven from the keyboard, a playlist player standing in for the media
//! service, and a live view of what the detectors see.
//!
//! ## Gesture → Command mapping
//!
//! | Modality | Gesture | Command |
//! |---|---|---|
//! | Motion | Flick right | Next (Previous when reversed) |
//! | Motion | Flick left | Previous (Next when reversed) |
//! | Motion | Drop | Play / pause |
//! | Hand | Index finger | Next |
//! | Hand | Three fingers | Previous |
//! | Hand | Fist | Play |
//! | Hand | Open palm | Pause |
//!
//! ## Feature flags
//!
//! * (default) — **Simulation mode**: keyboard shortcuts drive both sensors.
//! * `leap` — **Hardware mode**: hand frames come from a LeapMotion
//!   controller via LeapC; the accelerometer stays simulated.
//!
//! ### Keyboard shortcuts
//!
//! | Key | Action |
//! |---|---|
//! | `M` / `H` / `O` | Gesture control: motion / hand / off |
//! | `S` | Cycle sensitivity |
//! | `R` | Toggle reversed swipe direction |
//! | `←` / `→` | Flick left / right (harder with Shift) |
//! | `↓` | Drop |
//! | `1`–`5` | Hold a pose: one, two, three fingers, fist, palm |
//! | `0` | Take the hand out of view |
//! | `Space` / `N` / `B` | Manual play-pause / next / previous |
//! | `Z` / `X` | Shuffle / repeat mode |
//! | `Q` / `Esc` | Quit |
//!
//! Settings keys are saved to the preference file and applied to the
//! arbiter immediately.

pub mod sim;
pub mod player;
pub mod visualizer;
pub mod app;
#[cfg(feature = "leap")]
pub mod leap;
