//! Hand-skeleton landmark frames.
//!
//! Indices follow the usual 21-point hand model: the wrist, then four
//! joints per digit from thumb to pinky.

/// Number of landmarks in one frame.
pub const LANDMARK_COUNT: usize = 21;

pub const WRIST:       usize = 0;
pub const THUMB_MCP:   usize = 2;
pub const THUMB_TIP:   usize = 4;
pub const INDEX_BASE:  usize = 5;
pub const INDEX_TIP:   usize = 8;
pub const MIDDLE_BASE: usize = 9;
pub const MIDDLE_TIP:  usize = 12;
pub const RING_BASE:   usize = 13;
pub const RING_TIP:    usize = 16;
pub const PINKY_BASE:  usize = 17;
pub const PINKY_TIP:   usize = 20;

/// The palm-centre anchor used by the fist test.
pub const PALM_CENTER: usize = MIDDLE_BASE;

/// Connections drawn between landmarks when rendering a skeleton.
pub const BONES: [(usize, usize); 21] = [
    (0, 1), (1, 2), (2, 3), (3, 4),
    (0, 5), (5, 6), (6, 7), (7, 8),
    (5, 9), (9, 10), (10, 11), (11, 12),
    (9, 13), (13, 14), (14, 15), (15, 16),
    (13, 17), (0, 17), (17, 18), (18, 19), (19, 20),
];

// ════════════════════════════════════════════════════════════════════════════
// Finger
// ════════════════════════════════════════════════════════════════════════════

/// The five digits, with the landmark pair the classifier measures.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Finger {
    Thumb,
    Index,
    Middle,
    Ring,
    Pinky,
}

impl Finger {
    pub const ALL: [Finger; 5] = [
        Finger::Thumb, Finger::Index, Finger::Middle, Finger::Ring, Finger::Pinky,
    ];

    /// The four digits excluding the thumb.
    pub const NON_THUMB: [Finger; 4] = [
        Finger::Index, Finger::Middle, Finger::Ring, Finger::Pinky,
    ];

    pub fn tip(self) -> usize {
        match self {
            Finger::Thumb  => THUMB_TIP,
            Finger::Index  => INDEX_TIP,
            Finger::Middle => MIDDLE_TIP,
            Finger::Ring   => RING_TIP,
            Finger::Pinky  => PINKY_TIP,
        }
    }

    /// Base knuckle.  The thumb has no knuckle in line with the others, so
    /// its MCP joint stands in.
    pub fn base(self) -> usize {
        match self {
            Finger::Thumb  => THUMB_MCP,
            Finger::Index  => INDEX_BASE,
            Finger::Middle => MIDDLE_BASE,
            Finger::Ring   => RING_BASE,
            Finger::Pinky  => PINKY_BASE,
        }
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Landmark / HandFrame
// ════════════════════════════════════════════════════════════════════════════

/// A landmark position normalized to the camera image, `x, y ∈ [0, 1]`.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Landmark {
    pub x: f32,
    pub y: f32,
}

impl Landmark {
    pub const fn new(x: f32, y: f32) -> Self {
        Landmark { x, y }
    }

    pub fn distance(&self, other: &Landmark) -> f32 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        (dx * dx + dy * dy).sqrt()
    }
}

/// One detected hand in one camera frame.
///
/// Always holds exactly [`LANDMARK_COUNT`] points; an undetected hand is
/// represented as `Option::<HandFrame>::None` by the caller.
#[derive(Clone, Debug, PartialEq)]
pub struct HandFrame {
    points: [Landmark; LANDMARK_COUNT],
}

impl HandFrame {
    pub fn new(points: [Landmark; LANDMARK_COUNT]) -> Self {
        HandFrame { points }
    }

    /// Build a frame from a landmark list of unknown length.
    ///
    /// Returns `None` unless exactly 21 points are present, so a truncated
    /// detector result degrades to "no hand" instead of an index panic.
    pub fn from_slice(points: &[Landmark]) -> Option<Self> {
        let points: [Landmark; LANDMARK_COUNT] = points.try_into().ok()?;
        Some(HandFrame { points })
    }

    /// Convenience constructor from `(x, y)` pairs.
    pub fn from_xy(points: &[(f32, f32)]) -> Option<Self> {
        let v: Vec<Landmark> = points.iter().map(|&(x, y)| Landmark::new(x, y)).collect();
        Self::from_slice(&v)
    }

    pub fn point(&self, index: usize) -> Landmark {
        self.points[index]
    }

    pub fn points(&self) -> &[Landmark; LANDMARK_COUNT] {
        &self.points
    }

    pub fn wrist(&self) -> Landmark {
        self.points[WRIST]
    }

    /// Wrist-to-tip and wrist-to-base distance for one finger.
    pub fn finger_reach(&self, finger: Finger) -> (f32, f32) {
        let wrist = self.wrist();
        (
            wrist.distance(&self.points[finger.tip()]),
            wrist.distance(&self.points[finger.base()]),
        )
    }

    /// Return a copy with every point moved by `(dx, dy)`.
    pub fn translated(&self, dx: f32, dy: f32) -> Self {
        let mut points = self.points;
        for p in points.iter_mut() {
            p.x += dx;
            p.y += dy;
        }
        HandFrame { points }
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Tests
// ════════════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_slice_requires_21_points() {
        assert!(HandFrame::from_slice(&[Landmark::default(); 20]).is_none());
        assert!(HandFrame::from_slice(&[]).is_none());
        assert!(HandFrame::from_slice(&[Landmark::default(); 21]).is_some());
    }

    #[test]
    fn finger_landmarks_follow_hand_model() {
        assert_eq!(Finger::Index.tip(), 8);
        assert_eq!(Finger::Pinky.base(), 17);
        assert_eq!(Finger::Thumb.base(), THUMB_MCP);
    }

    #[test]
    fn distance_is_euclidean() {
        let a = Landmark::new(0.0, 0.0);
        let b = Landmark::new(0.3, 0.4);
        assert!((a.distance(&b) - 0.5).abs() < 1e-6);
    }

    #[test]
    fn bones_stay_in_range() {
        for &(a, b) in BONES.iter() {
            assert!(a < LANDMARK_COUNT && b < LANDMARK_COUNT);
        }
    }
}
