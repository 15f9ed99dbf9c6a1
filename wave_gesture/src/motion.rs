//! Motion gesture detector: accelerometer samples → swipe / drop events.
//!
//! A single sample past a threshold is enough signal; the cooldown alone
//! keeps the deceleration tail of the same flick from firing again.
//!
//! Evaluation order, first match wins:
//!
//! | Condition | Event | Reversed |
//! |---|---|---|
//! | `x >  swipe` | `Next` | `Previous` |
//! | `x < -swipe` | `Previous` | `Next` |
//! | `y <  drop`  | `PlayPauseToggle` | `PlayPauseToggle` |

use tracing::debug;

use crate::event::{AccelerationSample, GestureEvent};
use crate::settings::{GestureSettings, Sensitivity};

/// Lateral acceleration (m/s²) for a swipe at medium sensitivity.
pub const BASE_SWIPE_THRESHOLD: f32 = 16.0;
/// Vertical acceleration (m/s², negative = down) for a drop at medium
/// sensitivity.
pub const BASE_DROP_THRESHOLD: f32 = -3.0;
/// Minimum time between two emissions.
pub const MOTION_COOLDOWN_MS: u64 = 800;

// ════════════════════════════════════════════════════════════════════════════
// MotionThresholds
// ════════════════════════════════════════════════════════════════════════════

/// Thresholds after sensitivity scaling.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MotionThresholds {
    pub swipe:       f32,
    pub drop:        f32,
    pub cooldown_ms: u64,
    pub reversed:    bool,
}

impl MotionThresholds {
    pub fn new(sensitivity: Sensitivity, reversed: bool) -> Self {
        let factor = sensitivity.factor();
        MotionThresholds {
            swipe:       BASE_SWIPE_THRESHOLD * factor,
            drop:        BASE_DROP_THRESHOLD * factor,
            cooldown_ms: MOTION_COOLDOWN_MS,
            reversed,
        }
    }

    pub fn from_settings(settings: &GestureSettings) -> Self {
        Self::new(settings.sensitivity, settings.reversed)
    }
}

impl Default for MotionThresholds {
    fn default() -> Self {
        Self::new(Sensitivity::default(), false)
    }
}

// ════════════════════════════════════════════════════════════════════════════
// MotionGestureDetector
// ════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone)]
pub struct MotionGestureDetector {
    thresholds:     MotionThresholds,
    last_action_ms: Option<u64>,
}

impl Default for MotionGestureDetector {
    fn default() -> Self {
        Self::new(MotionThresholds::default())
    }
}

impl MotionGestureDetector {
    pub fn new(thresholds: MotionThresholds) -> Self {
        MotionGestureDetector { thresholds, last_action_ms: None }
    }

    pub fn from_settings(settings: &GestureSettings) -> Self {
        Self::new(MotionThresholds::from_settings(settings))
    }

    /// Feed one sample that arrived at `now_ms`.
    pub fn process(&mut self, sample: &AccelerationSample, now_ms: u64) -> Option<GestureEvent> {
        if let Some(last) = self.last_action_ms {
            if now_ms.saturating_sub(last) < self.thresholds.cooldown_ms {
                return None;
            }
        }

        let t = &self.thresholds;
        let event = if sample.x > t.swipe {
            GestureEvent::Next
        } else if sample.x < -t.swipe {
            GestureEvent::Previous
        } else if sample.y < t.drop {
            GestureEvent::PlayPauseToggle
        } else {
            return None;
        };
        let event = if t.reversed { event.reversed() } else { event };

        self.last_action_ms = Some(now_ms);
        debug!(gesture = %event, x = sample.x, y = sample.y, now_ms, "motion gesture");
        Some(event)
    }

    /// Recompute thresholds from new settings.  Cooldown state is kept.
    pub fn refresh(&mut self, settings: &GestureSettings) {
        self.thresholds = MotionThresholds::from_settings(settings);
    }

    pub fn reset(&mut self) {
        self.last_action_ms = None;
    }

    pub fn thresholds(&self) -> &MotionThresholds {
        &self.thresholds
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Tests
// ════════════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;

    fn s(x: f32, y: f32) -> AccelerationSample {
        AccelerationSample::new(x, y, 9.81, 0)
    }

    fn det(sensitivity: Sensitivity, reversed: bool) -> MotionGestureDetector {
        MotionGestureDetector::new(MotionThresholds::new(sensitivity, reversed))
    }

    #[test]
    fn swipe_right_is_next() {
        let mut d = det(Sensitivity::Medium, false);
        assert_eq!(d.process(&s(16.5, 0.0), 1_000), Some(GestureEvent::Next));
    }

    #[test]
    fn reversed_swipe_right_is_previous() {
        let mut d = det(Sensitivity::Medium, true);
        assert_eq!(d.process(&s(16.5, 0.0), 1_000), Some(GestureEvent::Previous));
        let mut d = det(Sensitivity::Medium, true);
        assert_eq!(d.process(&s(-16.5, 0.0), 1_000), Some(GestureEvent::Next));
    }

    #[test]
    fn swipe_left_is_previous() {
        let mut d = det(Sensitivity::Medium, false);
        assert_eq!(d.process(&s(-20.0, 0.0), 1_000), Some(GestureEvent::Previous));
    }

    #[test]
    fn drop_toggles_even_when_reversed() {
        let mut d = det(Sensitivity::Medium, true);
        assert_eq!(d.process(&s(0.0, -4.0), 1_000), Some(GestureEvent::PlayPauseToggle));
    }

    #[test]
    fn swipe_takes_priority_over_drop() {
        let mut d = det(Sensitivity::Medium, false);
        assert_eq!(d.process(&s(18.0, -9.0), 1_000), Some(GestureEvent::Next));
    }

    #[test]
    fn threshold_is_strict() {
        let mut d = det(Sensitivity::Medium, false);
        assert_eq!(d.process(&s(16.0, 0.0), 1_000), None);
        assert_eq!(d.process(&s(-16.0, -3.0), 1_000), None);
    }

    #[test]
    fn quiet_device_emits_nothing() {
        let mut d = MotionGestureDetector::default();
        for i in 0..100 {
            assert_eq!(d.process(&AccelerationSample::at_rest(i), i * 20), None);
        }
    }

    #[test]
    fn sensitivity_scales_thresholds() {
        let low  = MotionThresholds::new(Sensitivity::Low, false);
        let high = MotionThresholds::new(Sensitivity::High, false);
        assert!((low.swipe - 24.0).abs() < 1e-4);
        assert!((low.drop + 4.5).abs() < 1e-4);
        assert!((high.swipe - 11.2).abs() < 1e-4);
        assert!((high.drop + 2.1).abs() < 1e-4);

        // 14 m/s² only counts as a swipe on high sensitivity.
        assert_eq!(det(Sensitivity::Medium, false).process(&s(14.0, 0.0), 0), None);
        assert_eq!(det(Sensitivity::High, false).process(&s(14.0, 0.0), 0), Some(GestureEvent::Next));
        assert_eq!(det(Sensitivity::Low, false).process(&s(20.0, 0.0), 0), None);
    }

    #[test]
    fn cooldown_suppresses_tail() {
        let mut d = MotionGestureDetector::default();
        assert_eq!(d.process(&s(20.0, 0.0), 1_000), Some(GestureEvent::Next));
        // Deceleration tail of the same flick.
        assert_eq!(d.process(&s(-20.0, 0.0), 1_100), None);
        assert_eq!(d.process(&s(0.0, -5.0), 1_799), None);
        assert_eq!(d.process(&s(0.0, -5.0), 1_800), Some(GestureEvent::PlayPauseToggle));
    }

    #[test]
    fn no_two_emissions_within_cooldown() {
        let mut d = MotionGestureDetector::default();
        let mut last: Option<u64> = None;
        for i in 0..500u64 {
            let t = i * 16;
            let x = if i % 2 == 0 { 30.0 } else { -30.0 };
            if d.process(&s(x, -10.0), t).is_some() {
                if let Some(prev) = last {
                    assert!(t - prev >= MOTION_COOLDOWN_MS);
                }
                last = Some(t);
            }
        }
    }

    #[test]
    fn refresh_applies_new_settings() {
        let mut d = MotionGestureDetector::default();
        let settings = GestureSettings {
            sensitivity: Sensitivity::High,
            reversed:    true,
            ..Default::default()
        };
        d.refresh(&settings);
        assert!(d.thresholds().reversed);
        assert_eq!(d.process(&s(12.0, 0.0), 0), Some(GestureEvent::Previous));
    }

    #[test]
    fn reset_forgets_cooldown() {
        let mut d = MotionGestureDetector::default();
        d.process(&s(20.0, 0.0), 1_000);
        d.reset();
        assert_eq!(d.process(&s(20.0, 0.0), 1_001), Some(GestureEvent::Next));
    }
}
