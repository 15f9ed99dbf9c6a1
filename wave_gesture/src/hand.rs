//! Hand gesture detector: per-frame poses → debounced gesture events.
//!
//! Single-frame classification is noisy (occluded fingers, motion blur), so
//! two stages sit between the classifier and the sink:
//!
//! 1. **Majority vote** over the last [`STABILIZATION_WINDOW`] frames.  A
//!    pose is stable once it fills at least half the window (rounded up).
//! 2. **Cooldown + edge triggering.**  Nothing fires within
//!    [`HAND_COOLDOWN_MS`] of the previous emission.  `Play` / `Pause` are
//!    levels: holding the same pose never re-fires them.  `Next` /
//!    `Previous` are pulses: once fired, the window restarts so a held pose
//!    repeats only after the cooldown and a fresh vote.
//!
//! A frame with no hand clears the window; votes never survive the hand
//! leaving the camera.

use std::collections::VecDeque;

use tracing::{debug, trace};

use crate::classifier::{classify_with, ClassifierThresholds, HandPose};
use crate::event::GestureEvent;
use crate::landmarks::HandFrame;

/// Frames in the majority-vote window.
pub const STABILIZATION_WINDOW: usize = 3;
/// Minimum time between two emissions (exclusive).
pub const HAND_COOLDOWN_MS: u64 = 1200;

/// Votes needed for a pose to be stable: half the window, rounded up.
pub const fn majority(window: usize) -> usize {
    (window + 1) / 2
}

// ════════════════════════════════════════════════════════════════════════════
// HandGestureDetector
// ════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone)]
pub struct HandGestureDetector {
    window:           VecDeque<HandPose>,
    capacity:         usize,
    cooldown_ms:      u64,
    thresholds:       ClassifierThresholds,
    last_emitted:     Option<GestureEvent>,
    last_emission_ms: Option<u64>,
}

impl Default for HandGestureDetector {
    fn default() -> Self {
        Self::new()
    }
}

impl HandGestureDetector {
    pub fn new() -> Self {
        Self::with_params(STABILIZATION_WINDOW, HAND_COOLDOWN_MS, ClassifierThresholds::default())
    }

    /// Construct with explicit window size, cooldown and classifier
    /// thresholds.  A zero window is bumped to one.
    pub fn with_params(capacity: usize, cooldown_ms: u64, thresholds: ClassifierThresholds) -> Self {
        let capacity = capacity.max(1);
        HandGestureDetector {
            window: VecDeque::with_capacity(capacity),
            capacity,
            cooldown_ms,
            thresholds,
            last_emitted: None,
            last_emission_ms: None,
        }
    }

    /// Feed one camera frame observed at `now_ms`.
    ///
    /// `None` means no hand was detected in that frame.
    pub fn process(&mut self, frame: Option<&HandFrame>, now_ms: u64) -> Option<GestureEvent> {
        let frame = match frame {
            Some(f) => f,
            None => {
                if !self.window.is_empty() {
                    trace!("hand lost, clearing {} buffered votes", self.window.len());
                }
                self.window.clear();
                return None;
            }
        };
        let pose = classify_with(frame, &self.thresholds);
        self.process_pose(pose, now_ms)
    }

    /// Feed an already-classified pose.  Used by [`process`] and by callers
    /// that run the classifier elsewhere.
    ///
    /// [`process`]: HandGestureDetector::process
    pub fn process_pose(&mut self, pose: HandPose, now_ms: u64) -> Option<GestureEvent> {
        if self.window.len() == self.capacity {
            self.window.pop_front();
        }
        self.window.push_back(pose);

        let candidate = self.stable_pose()?.gesture()?;

        // Level gestures only fire on a change of stable pose.
        if !candidate.is_pulse() && self.last_emitted == Some(candidate) {
            return None;
        }

        if let Some(last) = self.last_emission_ms {
            if now_ms.saturating_sub(last) <= self.cooldown_ms {
                return None;
            }
        }

        self.last_emission_ms = Some(now_ms);
        if candidate.is_pulse() {
            self.last_emitted = None;
            self.window.clear();
        } else {
            self.last_emitted = Some(candidate);
        }
        debug!(gesture = %candidate, now_ms, "hand gesture");
        Some(candidate)
    }

    /// The most frequent recognised pose in the window, if it reaches the
    /// majority threshold.  Ties go to the classifier's priority order.
    pub fn stable_pose(&self) -> Option<HandPose> {
        let needed = majority(self.capacity);
        HandPose::PRIORITY
            .iter()
            .map(|&p| (p, self.window.iter().filter(|&&w| w == p).count()))
            .filter(|&(_, n)| n >= needed)
            .max_by(|a, b| a.1.cmp(&b.1).then(rank(b.0).cmp(&rank(a.0))))
            .map(|(p, _)| p)
    }

    /// Forget everything: votes, cooldown and level memory.
    pub fn reset(&mut self) {
        self.window.clear();
        self.last_emitted = None;
        self.last_emission_ms = None;
    }

    pub fn buffered(&self) -> usize {
        self.window.len()
    }

    pub fn last_emitted(&self) -> Option<GestureEvent> {
        self.last_emitted
    }

    pub fn cooldown_ms(&self) -> u64 {
        self.cooldown_ms
    }
}

/// Position in the classifier's priority list (lower wins).
fn rank(pose: HandPose) -> usize {
    HandPose::PRIORITY
        .iter()
        .position(|&p| p == pose)
        .unwrap_or(HandPose::PRIORITY.len())
}

// ════════════════════════════════════════════════════════════════════════════
// Tests
// ════════════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;
    use crate::poses;

    const STEP: u64 = 33; // ~30 fps

    /// Feed poses one frame apart starting at `t0`, collecting emissions.
    fn feed(det: &mut HandGestureDetector, t0: u64, poses: &[HandPose]) -> Vec<GestureEvent> {
        poses
            .iter()
            .enumerate()
            .filter_map(|(i, &p)| det.process_pose(p, t0 + i as u64 * STEP))
            .collect()
    }

    #[test]
    fn majority_of_three_is_two() {
        assert_eq!(majority(3), 2);
        assert_eq!(majority(4), 2);
        assert_eq!(majority(5), 3);
        assert_eq!(majority(1), 1);
    }

    #[test]
    fn three_fists_play_once_fourth_is_silent() {
        let mut det = HandGestureDetector::new();
        let fist = poses::closed_fist();
        let out: Vec<_> = (0..4)
            .filter_map(|i| det.process(Some(&fist), 10_000 + i * STEP))
            .collect();
        assert_eq!(out, vec![GestureEvent::Play]);
    }

    #[test]
    fn held_fist_never_replays_even_after_cooldown() {
        let mut det = HandGestureDetector::new();
        let fist = [HandPose::ClosedFist; 3];
        assert_eq!(feed(&mut det, 0, &fist), vec![GestureEvent::Play]);
        assert!(feed(&mut det, 5_000, &fist).is_empty());
    }

    #[test]
    fn level_gesture_fires_on_change() {
        let mut det = HandGestureDetector::new();
        feed(&mut det, 0, &[HandPose::ClosedFist; 3]);
        let out = feed(&mut det, 2_000, &[HandPose::OpenPalm; 3]);
        assert_eq!(out, vec![GestureEvent::Pause]);
    }

    #[test]
    fn split_vote_still_reaches_majority() {
        let mut det = HandGestureDetector::new();
        let out = feed(&mut det, 0, &[
            HandPose::OneFingerExtended, HandPose::None, HandPose::OneFingerExtended,
        ]);
        assert_eq!(out, vec![GestureEvent::Next]);
    }

    #[test]
    fn all_none_never_emits() {
        let mut det = HandGestureDetector::new();
        let out = feed(&mut det, 0, &[HandPose::None; 50]);
        assert!(out.is_empty());
    }

    #[test]
    fn single_noisy_frame_is_ignored() {
        let mut det = HandGestureDetector::new();
        let out = feed(&mut det, 0, &[
            HandPose::None, HandPose::OpenPalm, HandPose::None, HandPose::None,
        ]);
        assert!(out.is_empty());
    }

    #[test]
    fn absent_hand_discards_partial_majority() {
        let mut det = HandGestureDetector::new();
        let palm = poses::open_palm();
        let none = poses::two_fingers();
        // Palm, (no pose) → one vote for palm; then a second palm would be
        // a majority, but the hand leaves first.
        assert_eq!(det.process(Some(&palm), 0), None);
        assert_eq!(det.process(Some(&none), 33), None);
        assert_eq!(det.process(None, 66), None);
        assert_eq!(det.buffered(), 0);
        // Hand returns: one palm vote alone is not enough.
        assert_eq!(det.process(Some(&palm), 99), None);
        // A second palm vote completes a fresh majority.
        assert_eq!(det.process(Some(&palm), 132), Some(GestureEvent::Pause));
    }

    #[test]
    fn two_vote_majority_does_not_survive_absence() {
        let mut det = HandGestureDetector::with_params(5, HAND_COOLDOWN_MS, Default::default());
        let fist = poses::closed_fist();
        det.process(Some(&fist), 0);
        det.process(Some(&fist), 33);
        det.process(None, 66);
        // Needs three fresh votes with a window of five.
        assert_eq!(det.process(Some(&fist), 99), None);
        assert_eq!(det.process(Some(&fist), 132), None);
        assert_eq!(det.process(Some(&fist), 165), Some(GestureEvent::Play));
    }

    #[test]
    fn held_pointer_repeats_only_after_cooldown() {
        let mut det = HandGestureDetector::new();
        let frames = [HandPose::OneFingerExtended; 60]; // ~2 s at 30 fps
        let mut times = Vec::new();
        for (i, &p) in frames.iter().enumerate() {
            let t = i as u64 * STEP;
            if det.process_pose(p, t) == Some(GestureEvent::Next) {
                times.push(t);
            }
        }
        assert_eq!(times.len(), 2);
        assert!(times[1] - times[0] > HAND_COOLDOWN_MS);
    }

    #[test]
    fn pulse_clears_level_memory() {
        let mut det = HandGestureDetector::new();
        feed(&mut det, 0, &[HandPose::OneFingerExtended; 2]);
        assert_eq!(det.last_emitted(), None);
        feed(&mut det, 2_000, &[HandPose::ClosedFist; 2]);
        assert_eq!(det.last_emitted(), Some(GestureEvent::Play));
    }

    #[test]
    fn cooldown_blocks_any_gesture() {
        let mut det = HandGestureDetector::new();
        assert_eq!(feed(&mut det, 0, &[HandPose::ClosedFist; 2]), vec![GestureEvent::Play]);
        // Palm stabilises well inside the cooldown window.
        assert!(feed(&mut det, 200, &[HandPose::OpenPalm; 3]).is_empty());
        // Still held after the window: now it fires.
        let out = feed(&mut det, 33 + HAND_COOLDOWN_MS + 1, &[HandPose::OpenPalm]);
        assert_eq!(out, vec![GestureEvent::Pause]);
    }

    #[test]
    fn cooldown_boundary_is_exclusive() {
        let mut det = HandGestureDetector::new();
        det.process_pose(HandPose::ClosedFist, 0);
        assert_eq!(det.process_pose(HandPose::ClosedFist, 1_000), Some(GestureEvent::Play));
        det.process_pose(HandPose::OpenPalm, 1_000 + HAND_COOLDOWN_MS - 1);
        assert_eq!(det.process_pose(HandPose::OpenPalm, 1_000 + HAND_COOLDOWN_MS), None);
        assert_eq!(
            det.process_pose(HandPose::OpenPalm, 1_000 + HAND_COOLDOWN_MS + 1),
            Some(GestureEvent::Pause)
        );
    }

    #[test]
    fn no_two_emissions_within_cooldown() {
        let mut det = HandGestureDetector::new();
        let cycle = [
            HandPose::ClosedFist, HandPose::ClosedFist, HandPose::OpenPalm, HandPose::OpenPalm,
            HandPose::OneFingerExtended, HandPose::OneFingerExtended,
            HandPose::ThreeFingersExtended, HandPose::ThreeFingersExtended,
        ];
        let mut last: Option<u64> = None;
        for i in 0..400u64 {
            let t = i * 20;
            if det.process_pose(cycle[(i as usize) % cycle.len()], t).is_some() {
                if let Some(prev) = last {
                    assert!(t - prev > HAND_COOLDOWN_MS);
                }
                last = Some(t);
            }
        }
        assert!(last.is_some());
    }

    #[test]
    fn window_never_exceeds_capacity() {
        let mut det = HandGestureDetector::new();
        feed(&mut det, 0, &[HandPose::None; 10]);
        assert_eq!(det.buffered(), STABILIZATION_WINDOW);
    }

    #[test]
    fn tie_goes_to_priority_order() {
        let mut det = HandGestureDetector::with_params(4, HAND_COOLDOWN_MS, Default::default());
        feed(&mut det, 0, &[
            HandPose::OpenPalm, HandPose::OpenPalm, HandPose::ClosedFist,
        ]);
        // Window of four needs two votes; palm already fired once.
        det.reset();
        let out = feed(&mut det, 10_000, &[
            HandPose::OpenPalm, HandPose::ClosedFist, HandPose::OpenPalm, HandPose::ClosedFist,
        ]);
        // Palm reaches two votes first (frame three), then both tie at two
        // and the fist outranks the palm.
        assert_eq!(out, vec![GestureEvent::Pause]);
        assert_eq!(det.stable_pose(), Some(HandPose::ClosedFist));
    }

    #[test]
    fn reset_clears_everything() {
        let mut det = HandGestureDetector::new();
        feed(&mut det, 0, &[HandPose::ClosedFist; 3]);
        det.reset();
        assert_eq!(det.buffered(), 0);
        assert_eq!(det.last_emitted(), None);
        // Fresh start: the same fist fires immediately.
        assert_eq!(feed(&mut det, 100, &[HandPose::ClosedFist; 2]), vec![GestureEvent::Play]);
    }
}
