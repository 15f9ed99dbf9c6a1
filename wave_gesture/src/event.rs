//! The values that flow through the pipeline: raw motion samples in,
//! discrete playback commands out.

use std::fmt;

// ════════════════════════════════════════════════════════════════════════════
// GestureEvent
// ════════════════════════════════════════════════════════════════════════════

/// A discrete playback command decided by one of the detectors.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum GestureEvent {
    /// Skip to the next item.
    Next,
    /// Go back to the previous item.
    Previous,
    /// Start or resume playback.
    Play,
    /// Pause playback.
    Pause,
    /// Play if paused, pause if playing.
    PlayPauseToggle,
}

impl GestureEvent {
    /// Short lowercase name, used in logs and status lines.
    pub fn as_str(self) -> &'static str {
        match self {
            GestureEvent::Next            => "next",
            GestureEvent::Previous        => "previous",
            GestureEvent::Play            => "play",
            GestureEvent::Pause           => "pause",
            GestureEvent::PlayPauseToggle => "play-pause",
        }
    }

    /// `Next` and `Previous` are momentary pulses; the rest describe a
    /// playback level.
    pub fn is_pulse(self) -> bool {
        matches!(self, GestureEvent::Next | GestureEvent::Previous)
    }

    /// Swap `Next` and `Previous`; other events are unchanged.
    pub fn reversed(self) -> Self {
        match self {
            GestureEvent::Next     => GestureEvent::Previous,
            GestureEvent::Previous => GestureEvent::Next,
            other                  => other,
        }
    }
}

impl fmt::Display for GestureEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ════════════════════════════════════════════════════════════════════════════
// AccelerationSample
// ════════════════════════════════════════════════════════════════════════════

/// One reading from a 3-axis accelerometer (m/s²).
///
/// `x` is lateral (right positive), `y` vertical (up positive).  Only `x`
/// and `y` participate in gesture detection.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct AccelerationSample {
    pub x: f32,
    pub y: f32,
    pub z: f32,
    /// Driver timestamp; the detectors use arrival time instead.
    pub timestamp_ms: u64,
}

impl AccelerationSample {
    pub fn new(x: f32, y: f32, z: f32, timestamp_ms: u64) -> Self {
        AccelerationSample { x, y, z, timestamp_ms }
    }

    /// A resting device: gravity on `z`, nothing lateral.
    pub fn at_rest(timestamp_ms: u64) -> Self {
        AccelerationSample::new(0.0, 0.0, 9.81, timestamp_ms)
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Tests
// ════════════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reversed_swaps_only_track_skips() {
        assert_eq!(GestureEvent::Next.reversed(), GestureEvent::Previous);
        assert_eq!(GestureEvent::Previous.reversed(), GestureEvent::Next);
        assert_eq!(GestureEvent::Play.reversed(), GestureEvent::Play);
        assert_eq!(GestureEvent::PlayPauseToggle.reversed(), GestureEvent::PlayPauseToggle);
    }

    #[test]
    fn pulses_are_skips() {
        assert!(GestureEvent::Next.is_pulse());
        assert!(GestureEvent::Previous.is_pulse());
        assert!(!GestureEvent::Pause.is_pulse());
        assert!(!GestureEvent::PlayPauseToggle.is_pulse());
    }

    #[test]
    fn display_uses_short_name() {
        assert_eq!(GestureEvent::PlayPauseToggle.to_string(), "play-pause");
    }
}
