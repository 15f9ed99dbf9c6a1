//! Reference landmark layouts for each recognised pose.
//!
//! An upright right hand seen by a front camera: wrist near the bottom of
//! the image, fingers pointing up (decreasing `y`).  Used by tests and by
//! simulated hand sources, which add jitter on top.

use crate::landmarks::{HandFrame, Landmark, LANDMARK_COUNT};

const WRIST: (f32, f32) = (0.50, 0.85);

// Thumb: CMC, MCP, IP, tip.
const THUMB_OUT:    [(f32, f32); 4] = [(0.42, 0.80), (0.36, 0.72), (0.31, 0.66), (0.27, 0.60)];
const THUMB_TUCKED: [(f32, f32); 4] = [(0.42, 0.80), (0.38, 0.74), (0.42, 0.68), (0.46, 0.65)];

// Fingers: MCP, PIP, DIP, tip.
const INDEX_UP:    [(f32, f32); 4] = [(0.44, 0.60), (0.43, 0.50), (0.425, 0.43), (0.42, 0.37)];
const INDEX_DOWN:  [(f32, f32); 4] = [(0.44, 0.60), (0.43, 0.55), (0.45, 0.62), (0.47, 0.66)];
const MIDDLE_UP:   [(f32, f32); 4] = [(0.50, 0.58), (0.50, 0.47), (0.50, 0.40), (0.50, 0.34)];
const MIDDLE_DOWN: [(f32, f32); 4] = [(0.50, 0.58), (0.50, 0.53), (0.51, 0.61), (0.51, 0.65)];
const RING_UP:     [(f32, f32); 4] = [(0.56, 0.60), (0.57, 0.50), (0.575, 0.44), (0.58, 0.39)];
const RING_DOWN:   [(f32, f32); 4] = [(0.56, 0.60), (0.57, 0.55), (0.56, 0.62), (0.55, 0.66)];
const PINKY_UP:    [(f32, f32); 4] = [(0.61, 0.64), (0.63, 0.55), (0.645, 0.50), (0.66, 0.46)];
const PINKY_DOWN:  [(f32, f32); 4] = [(0.61, 0.64), (0.62, 0.60), (0.59, 0.65), (0.57, 0.67)];

/// Assemble a frame from per-digit joint lists, wrist first.
fn build(digits: [&[(f32, f32); 4]; 5]) -> HandFrame {
    let mut pts = [Landmark::default(); LANDMARK_COUNT];
    pts[0] = Landmark::new(WRIST.0, WRIST.1);
    for (d, joints) in digits.iter().enumerate() {
        for (j, &(x, y)) in joints.iter().enumerate() {
            pts[1 + d * 4 + j] = Landmark::new(x, y);
        }
    }
    HandFrame::new(pts)
}

/// Index finger up, the rest curled.
pub fn one_finger() -> HandFrame {
    build([&THUMB_TUCKED, &INDEX_UP, &MIDDLE_DOWN, &RING_DOWN, &PINKY_DOWN])
}

/// Index and middle up: not a recognised pose.
pub fn two_fingers() -> HandFrame {
    build([&THUMB_TUCKED, &INDEX_UP, &MIDDLE_UP, &RING_DOWN, &PINKY_DOWN])
}

/// Index, middle and ring up, pinky curled.
pub fn three_fingers() -> HandFrame {
    build([&THUMB_TUCKED, &INDEX_UP, &MIDDLE_UP, &RING_UP, &PINKY_DOWN])
}

/// Every finger spread.
pub fn open_palm() -> HandFrame {
    build([&THUMB_OUT, &INDEX_UP, &MIDDLE_UP, &RING_UP, &PINKY_UP])
}

/// Every finger curled onto the palm.
pub fn closed_fist() -> HandFrame {
    build([&THUMB_TUCKED, &INDEX_DOWN, &MIDDLE_DOWN, &RING_DOWN, &PINKY_DOWN])
}
