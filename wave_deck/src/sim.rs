//! Simulated sensors driven by the keyboard.
//!
//! The window translates key presses into [`SimInput`]s and broadcasts them
//! to every running [`SimDevice`].  Each device runs on its own thread and
//! ignores inputs meant for the other one.  Devices feed the real
//! `wave_gesture` sources through their feeders, so what they produce goes
//! through the same detectors as hardware input.  While a source is not
//! registered the feeder drops input, just as a real sensor would be
//! unregistered.

use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use rand::Rng;
use tracing::debug;

use wave_gesture::poses;
use wave_gesture::source::{HandFeeder, MotionFeeder};
use wave_gesture::{AccelerationSample, HandFrame};

/// 50 Hz, like a UI-rate sensor listener.
pub const SAMPLE_PERIOD: Duration = Duration::from_millis(20);
/// ~30 fps camera.
pub const FRAME_PERIOD: Duration = Duration::from_millis(33);

const REST_NOISE:     f32 = 0.4;   // m/s²
const HAND_DRIFT:     f32 = 0.03;  // whole-hand translation
const POINT_JITTER:   f32 = 0.0015;

// ════════════════════════════════════════════════════════════════════════════
// SimInput
// ════════════════════════════════════════════════════════════════════════════

/// Raw input event from the simulation window.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum SimInput {
    KeyDown(SimKey),
}

/// Simulated key codes (mapped from minifb Key).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SimKey {
    SwipeLeft,       // ←
    SwipeRight,      // →
    SwipeLeftHard,   // Shift+←
    SwipeRightHard,  // Shift+→
    Drop,            // ↓
    Pose(SimPose),   // 1–5
    NoHand,          // 0
}

/// Hand shapes the simulated camera can hold in view.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SimPose {
    OneFinger,
    TwoFingers,
    ThreeFingers,
    Fist,
    Palm,
}

impl SimPose {
    pub fn frame(self) -> HandFrame {
        match self {
            SimPose::OneFinger    => poses::one_finger(),
            SimPose::TwoFingers   => poses::two_fingers(),
            SimPose::ThreeFingers => poses::three_fingers(),
            SimPose::Fist         => poses::closed_fist(),
            SimPose::Palm         => poses::open_palm(),
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            SimPose::OneFinger    => "one finger",
            SimPose::TwoFingers   => "two fingers",
            SimPose::ThreeFingers => "three fingers",
            SimPose::Fist         => "fist",
            SimPose::Palm         => "palm",
        }
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Telemetry — what the devices last produced, for the visualizer
// ════════════════════════════════════════════════════════════════════════════

pub struct Telemetry {
    sample: Mutex<AccelerationSample>,
    frame:  Mutex<Option<HandFrame>>,
}

impl Default for Telemetry {
    fn default() -> Self {
        Telemetry {
            sample: Mutex::new(AccelerationSample::at_rest(0)),
            frame:  Mutex::new(None),
        }
    }
}

impl Telemetry {
    pub fn record_sample(&self, sample: AccelerationSample) {
        *self.sample.lock() = sample;
    }

    pub fn record_frame(&self, frame: Option<HandFrame>) {
        *self.frame.lock() = frame;
    }

    pub fn sample(&self) -> AccelerationSample {
        *self.sample.lock()
    }

    pub fn frame(&self) -> Option<HandFrame> {
        self.frame.lock().clone()
    }
}

// ════════════════════════════════════════════════════════════════════════════
// SimDevice trait + spawn helper
// ════════════════════════════════════════════════════════════════════════════

/// A simulated sensor that consumes [`SimInput`]s on its own thread until
/// the sending side hangs up.
pub trait SimDevice: Send + 'static {
    fn run(self: Box<Self>, rx: Receiver<SimInput>);
}

/// Spawn a device on its own thread and return its input channel.
pub fn spawn_device<D: SimDevice>(device: D) -> Sender<SimInput> {
    let (tx, rx) = mpsc::channel();
    thread::spawn(move || Box::new(device).run(rx));
    tx
}

/// The set of running devices.  Dropping it stops them.
pub struct SimRig {
    devices:       Vec<Sender<SimInput>>,
    pub telemetry: Arc<Telemetry>,
}

impl SimRig {
    /// Start a simulated accelerometer and, if `hand` is given, a simulated
    /// camera.
    pub fn start(motion: MotionFeeder, hand: Option<HandFeeder>) -> Self {
        let telemetry = Arc::new(Telemetry::default());
        let mut devices = vec![spawn_device(SimAccelerometer::new(motion, Arc::clone(&telemetry)))];
        if let Some(hand) = hand {
            devices.push(spawn_device(SimCamera::new(hand, Arc::clone(&telemetry))));
        }
        SimRig { devices, telemetry }
    }

    pub fn send(&self, key: SimKey) {
        for tx in &self.devices {
            let _ = tx.send(SimInput::KeyDown(key));
        }
    }
}

// ════════════════════════════════════════════════════════════════════════════
// SimAccelerometer
// ════════════════════════════════════════════════════════════════════════════

/// Lateral acceleration of a flick, one value per sample period.  The swing
/// back is kept under every swipe threshold.
const SWIPE_PROFILE:      [f32; 5] = [6.0, 14.0, 20.0, -8.0, -3.0];
const HARD_SWIPE_PROFILE: [f32; 5] = [9.0, 20.0, 28.0, -10.0, -4.0];
/// Vertical acceleration of a quick drop of the wrist.
const DROP_PROFILE:       [f32; 3] = [-2.0, -6.0, -2.0];

pub struct SimAccelerometer {
    feeder:    MotionFeeder,
    telemetry: Arc<Telemetry>,
    /// Queued (x, y) offsets still to be played out.
    pending:   std::collections::VecDeque<(f32, f32)>,
}

impl SimAccelerometer {
    pub fn new(feeder: MotionFeeder, telemetry: Arc<Telemetry>) -> Self {
        SimAccelerometer { feeder, telemetry, pending: Default::default() }
    }

    fn queue(&mut self, key: SimKey) {
        let (profile, sign): (&[f32], f32) = match key {
            SimKey::SwipeRight     => (&SWIPE_PROFILE, 1.0),
            SimKey::SwipeLeft      => (&SWIPE_PROFILE, -1.0),
            SimKey::SwipeRightHard => (&HARD_SWIPE_PROFILE, 1.0),
            SimKey::SwipeLeftHard  => (&HARD_SWIPE_PROFILE, -1.0),
            SimKey::Drop => {
                self.pending.extend(DROP_PROFILE.iter().map(|&y| (0.0, y)));
                return;
            }
            _ => return,
        };
        self.pending.extend(profile.iter().map(|&x| (x * sign, 0.0)));
        debug!(?key, "simulated flick");
    }
}

impl SimDevice for SimAccelerometer {
    fn run(mut self: Box<Self>, rx: Receiver<SimInput>) {
        let mut rng = rand::thread_rng();
        let origin = Instant::now();
        let mut next_due = Instant::now();

        loop {
            let wait = next_due.saturating_duration_since(Instant::now());
            match rx.recv_timeout(wait) {
                Ok(SimInput::KeyDown(key)) => {
                    self.queue(key);
                    continue;
                }
                Err(RecvTimeoutError::Timeout) => {}
                Err(RecvTimeoutError::Disconnected) => return,
            }
            next_due += SAMPLE_PERIOD;

            let (dx, dy) = self.pending.pop_front().unwrap_or((0.0, 0.0));
            let sample = AccelerationSample::new(
                dx + rng.gen_range(-REST_NOISE..=REST_NOISE),
                dy + rng.gen_range(-REST_NOISE..=REST_NOISE),
                9.81 + rng.gen_range(-REST_NOISE..=REST_NOISE),
                origin.elapsed().as_millis() as u64,
            );
            self.feeder.push(sample);
            self.telemetry.record_sample(sample);
        }
    }
}

// ════════════════════════════════════════════════════════════════════════════
// SimCamera
// ════════════════════════════════════════════════════════════════════════════

pub struct SimCamera {
    feeder:    HandFeeder,
    telemetry: Arc<Telemetry>,
    pose:      Option<SimPose>,
}

impl SimCamera {
    pub fn new(feeder: HandFeeder, telemetry: Arc<Telemetry>) -> Self {
        SimCamera { feeder, telemetry, pose: None }
    }
}

impl SimDevice for SimCamera {
    fn run(mut self: Box<Self>, rx: Receiver<SimInput>) {
        let mut rng = rand::thread_rng();
        let mut next_due = Instant::now();

        loop {
            let wait = next_due.saturating_duration_since(Instant::now());
            match rx.recv_timeout(wait) {
                Ok(SimInput::KeyDown(SimKey::Pose(p))) => {
                    self.pose = Some(p);
                    continue;
                }
                Ok(SimInput::KeyDown(SimKey::NoHand)) => {
                    self.pose = None;
                    continue;
                }
                Ok(SimInput::KeyDown(_)) => continue,
                Err(RecvTimeoutError::Timeout) => {}
                Err(RecvTimeoutError::Disconnected) => return,
            }
            next_due += FRAME_PERIOD;

            let frame = self.pose.map(|p| jitter(&p.frame(), &mut rng));
            self.feeder.publish(frame.clone());
            self.telemetry.record_frame(frame);
        }
    }
}

/// Drift the whole hand and wobble each landmark a little.
pub fn jitter<R: Rng>(frame: &HandFrame, rng: &mut R) -> HandFrame {
    let mut points = *frame.points();
    for p in points.iter_mut() {
        p.x += rng.gen_range(-POINT_JITTER..=POINT_JITTER);
        p.y += rng.gen_range(-POINT_JITTER..=POINT_JITTER);
    }
    HandFrame::new(points).translated(
        rng.gen_range(-HAND_DRIFT..=HAND_DRIFT),
        rng.gen_range(-HAND_DRIFT..=HAND_DRIFT),
    )
}

// ════════════════════════════════════════════════════════════════════════════
// Tests
// ════════════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use wave_gesture::source::{ChannelMotionSource, SlotHandSource, SlotRecv};
    use wave_gesture::{classify_frame, GestureEvent, HandPose, HandSource, MotionGestureDetector,
                       MotionSource, MotionThresholds, Sensitivity};

    #[test]
    fn jittered_poses_keep_their_class() {
        let mut rng = StdRng::seed_from_u64(7);
        let cases = [
            (SimPose::OneFinger,    HandPose::OneFingerExtended),
            (SimPose::TwoFingers,   HandPose::None),
            (SimPose::ThreeFingers, HandPose::ThreeFingersExtended),
            (SimPose::Fist,         HandPose::ClosedFist),
            (SimPose::Palm,         HandPose::OpenPalm),
        ];
        for (pose, want) in cases {
            for _ in 0..200 {
                assert_eq!(classify_frame(&jitter(&pose.frame(), &mut rng)), want, "{}", pose.name());
            }
        }
    }

    fn first_event(profile: &[f32], sensitivity: Sensitivity) -> Option<GestureEvent> {
        let mut det = MotionGestureDetector::new(MotionThresholds::new(sensitivity, false));
        profile.iter().enumerate().find_map(|(i, &x)| {
            det.process(&AccelerationSample::new(x, 0.0, 9.81, 0), i as u64 * 20)
        })
    }

    #[test]
    fn flick_profiles_match_sensitivity() {
        assert_eq!(first_event(&SWIPE_PROFILE, Sensitivity::Medium), Some(GestureEvent::Next));
        assert_eq!(first_event(&SWIPE_PROFILE, Sensitivity::Low), None);
        assert_eq!(first_event(&HARD_SWIPE_PROFILE, Sensitivity::Low), Some(GestureEvent::Next));
    }

    #[test]
    fn swing_back_stays_below_swipe_threshold() {
        let most_sensitive = MotionThresholds::new(Sensitivity::High, false).swipe;
        for x in SWIPE_PROFILE.iter().chain(HARD_SWIPE_PROFILE.iter()).filter(|x| **x < 0.0) {
            assert!(x.abs() + REST_NOISE < most_sensitive);
        }
    }

    #[test]
    fn accelerometer_plays_out_flick() {
        let mut src = ChannelMotionSource::default();
        let rx = src.start().unwrap();
        let tx = spawn_device(SimAccelerometer::new(src.feeder(), Arc::new(Telemetry::default())));
        tx.send(SimInput::KeyDown(SimKey::SwipeLeft)).unwrap();

        let deadline = Instant::now() + Duration::from_secs(2);
        let mut peak = 0.0f32;
        while Instant::now() < deadline && peak > -16.0 {
            if let Ok(s) = rx.recv_timeout(Duration::from_millis(100)) {
                peak = peak.min(s.x);
            }
        }
        assert!(peak < -16.0);
    }

    #[test]
    fn camera_holds_pose_until_changed() {
        let mut src = SlotHandSource::new();
        let slot = src.start().unwrap();
        let telemetry = Arc::new(Telemetry::default());
        let tx = spawn_device(SimCamera::new(src.feeder(), Arc::clone(&telemetry)));

        // No hand until a pose key arrives.
        assert_eq!(slot.recv_timeout(Duration::from_secs(1)), SlotRecv::Frame(None));

        tx.send(SimInput::KeyDown(SimKey::Pose(SimPose::Fist))).unwrap();
        let deadline = Instant::now() + Duration::from_secs(2);
        let mut seen = HandPose::None;
        while Instant::now() < deadline && seen == HandPose::None {
            if let SlotRecv::Frame(Some(f)) = slot.recv_timeout(Duration::from_millis(100)) {
                seen = classify_frame(&f);
            }
        }
        assert_eq!(seen, HandPose::ClosedFist);
        assert!(telemetry.frame().is_some());
    }
}
