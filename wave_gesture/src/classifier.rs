//! Geometric hand-pose classifier.
//!
//! A stateless mapping from one [`HandFrame`] to a [`HandPose`], using only
//! distance ratios between landmarks:
//!
//! * A finger is **extended** when its tip is farther from the wrist than
//!   its base knuckle by more than [`EXTEND_MARGIN`].
//! * A finger is **folded** when its tip is no farther from the wrist than
//!   its base knuckle plus [`FOLD_MARGIN`].
//! * A **fist** is judged against the palm centre (landmark 9) rather than
//!   the wrist: curled fingertips cluster around it however the wrist sits.
//!
//! Poses are tested in a fixed priority order and the first match wins:
//! one finger, three fingers, fist, open palm.

use crate::event::GestureEvent;
use crate::landmarks::{Finger, HandFrame, PALM_CENTER};

// ════════════════════════════════════════════════════════════════════════════
// Thresholds (normalized image units)
// ════════════════════════════════════════════════════════════════════════════

/// Tip must exceed base distance by this much to count as extended.
pub const EXTEND_MARGIN: f32 = 0.08;
/// Tip must stay under base distance plus this much to count as folded.
pub const FOLD_MARGIN: f32 = 0.03;
/// Maximum tip-to-palm-centre distance for a curled finger in a fist.
pub const FIST_PROXIMITY: f32 = 0.12;
/// Curled non-thumb fingers required for a fist (of 4).
pub const FIST_MIN_CURLED: usize = 4;
/// Extended fingers required for an open palm (of 5).
pub const OPEN_PALM_MIN_EXTENDED: usize = 5;

/// The classifier's tunables, grouped so callers can probe boundaries.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ClassifierThresholds {
    pub extend_margin:          f32,
    pub fold_margin:            f32,
    pub fist_proximity:         f32,
    pub fist_min_curled:        usize,
    pub open_palm_min_extended: usize,
}

impl Default for ClassifierThresholds {
    fn default() -> Self {
        ClassifierThresholds {
            extend_margin:          EXTEND_MARGIN,
            fold_margin:            FOLD_MARGIN,
            fist_proximity:         FIST_PROXIMITY,
            fist_min_curled:        FIST_MIN_CURLED,
            open_palm_min_extended: OPEN_PALM_MIN_EXTENDED,
        }
    }
}

// ════════════════════════════════════════════════════════════════════════════
// HandPose
// ════════════════════════════════════════════════════════════════════════════

/// Per-frame classification result.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum HandPose {
    OneFingerExtended,
    ThreeFingersExtended,
    OpenPalm,
    ClosedFist,
    None,
}

impl HandPose {
    /// Recognised poses in evaluation priority.
    pub const PRIORITY: [HandPose; 4] = [
        HandPose::OneFingerExtended,
        HandPose::ThreeFingersExtended,
        HandPose::ClosedFist,
        HandPose::OpenPalm,
    ];

    /// The playback command a stable pose stands for.
    pub fn gesture(self) -> Option<GestureEvent> {
        match self {
            HandPose::OneFingerExtended    => Some(GestureEvent::Next),
            HandPose::ThreeFingersExtended => Some(GestureEvent::Previous),
            HandPose::ClosedFist           => Some(GestureEvent::Play),
            HandPose::OpenPalm             => Some(GestureEvent::Pause),
            HandPose::None                 => None,
        }
    }

    pub fn is_none(self) -> bool {
        self == HandPose::None
    }

    pub fn name(self) -> &'static str {
        match self {
            HandPose::OneFingerExtended    => "one finger",
            HandPose::ThreeFingersExtended => "three fingers",
            HandPose::OpenPalm             => "open palm",
            HandPose::ClosedFist           => "closed fist",
            HandPose::None                 => "none",
        }
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Classification
// ════════════════════════════════════════════════════════════════════════════

/// Classify an optional frame with the default thresholds.
///
/// An absent hand is `HandPose::None`.
pub fn classify(frame: Option<&HandFrame>) -> HandPose {
    match frame {
        Some(f) => classify_frame(f),
        None    => HandPose::None,
    }
}

/// Classify a present frame with the default thresholds.
pub fn classify_frame(frame: &HandFrame) -> HandPose {
    classify_with(frame, &ClassifierThresholds::default())
}

/// Classify a present frame with explicit thresholds.
pub fn classify_with(frame: &HandFrame, t: &ClassifierThresholds) -> HandPose {
    let ext  = |f: Finger| is_extended(frame, f, t);
    let fold = |f: Finger| is_folded(frame, f, t);

    if ext(Finger::Index) && fold(Finger::Middle) && fold(Finger::Ring) && fold(Finger::Pinky) {
        return HandPose::OneFingerExtended;
    }

    if ext(Finger::Index) && ext(Finger::Middle) && ext(Finger::Ring) && fold(Finger::Pinky) {
        return HandPose::ThreeFingersExtended;
    }

    if curled_count(frame, t) >= t.fist_min_curled {
        return HandPose::ClosedFist;
    }

    let extended = Finger::ALL.iter().filter(|&&f| ext(f)).count();
    if extended >= t.open_palm_min_extended {
        return HandPose::OpenPalm;
    }

    HandPose::None
}

/// Tip clearly beyond the base knuckle, measured from the wrist.
pub fn is_extended(frame: &HandFrame, finger: Finger, t: &ClassifierThresholds) -> bool {
    let (tip, base) = frame.finger_reach(finger);
    tip > base + t.extend_margin
}

/// Tip pulled back to (roughly) the base knuckle, measured from the wrist.
pub fn is_folded(frame: &HandFrame, finger: Finger, t: &ClassifierThresholds) -> bool {
    let (tip, base) = frame.finger_reach(finger);
    tip < base + t.fold_margin
}

/// Non-thumb fingertips within `fist_proximity` of the palm centre.
fn curled_count(frame: &HandFrame, t: &ClassifierThresholds) -> usize {
    let palm = frame.point(PALM_CENTER);
    Finger::NON_THUMB
        .iter()
        .filter(|f| frame.point(f.tip()).distance(&palm) < t.fist_proximity)
        .count()
}

// ════════════════════════════════════════════════════════════════════════════
// Tests
// ════════════════════════════════════════════════════════════════════════════
