//! Hand source backed by a real LeapMotion controller.
//!
//! Requires the `leap` feature flag and the LeapC shared library installed.
//! Each tracking frame's hand (the right hand if both are visible) is
//! flattened onto the 21-landmark camera layout: the device's x/y plane in
//! millimetres becomes normalized image coordinates with y pointing down.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc;
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use tracing::{info, warn};

use wave_gesture::landmarks::LANDMARK_COUNT;
use wave_gesture::{FrameSlot, GestureError, HandFrame, HandSource, Landmark};

use crate::sim::Telemetry;

/// Millimetres of tracking space mapped onto one image width.
const SPAN_MM: f32 = 400.0;
const POLL_MS: u32 = 100;

struct Running {
    stop:   Arc<AtomicBool>,
    slot:   Arc<FrameSlot>,
    handle: JoinHandle<()>,
}

pub struct LeapHandSource {
    telemetry: Arc<Telemetry>,
    running:   Option<Running>,
}

impl LeapHandSource {
    pub fn new(telemetry: Arc<Telemetry>) -> Self {
        LeapHandSource { telemetry, running: None }
    }
}

impl HandSource for LeapHandSource {
    fn start(&mut self) -> Result<Arc<FrameSlot>, GestureError> {
        self.stop();

        let slot = Arc::new(FrameSlot::new());
        let stop = Arc::new(AtomicBool::new(false));
        let (ready_tx, ready_rx) = mpsc::sync_channel::<Result<(), String>>(1);

        let handle = {
            let slot = Arc::clone(&slot);
            let stop = Arc::clone(&stop);
            let telemetry = Arc::clone(&self.telemetry);
            thread::Builder::new()
                .name("leap-camera".into())
                .spawn(move || poll_leap(slot, stop, telemetry, ready_tx))
                .map_err(|e| GestureError::CameraUnavailable(e.to_string()))?
        };

        // The connection is opened on the polling thread; wait for the verdict.
        let verdict = ready_rx
            .recv()
            .unwrap_or_else(|_| Err("tracking thread exited".to_string()));
        if let Err(msg) = verdict {
            let _ = handle.join();
            return Err(GestureError::CameraUnavailable(msg));
        }

        info!("leap hand tracking started");
        self.running = Some(Running { stop, slot: Arc::clone(&slot), handle });
        Ok(slot)
    }

    fn stop(&mut self) {
        if let Some(run) = self.running.take() {
            run.stop.store(true, Ordering::Release);
            run.slot.close();
            if run.handle.join().is_err() {
                warn!("leap tracking thread panicked");
            }
            self.telemetry.record_frame(None);
            info!("leap hand tracking stopped");
        }
    }
}

impl Drop for LeapHandSource {
    fn drop(&mut self) {
        self.stop();
    }
}

fn poll_leap(
    slot:      Arc<FrameSlot>,
    stop:      Arc<AtomicBool>,
    telemetry: Arc<Telemetry>,
    ready:     mpsc::SyncSender<Result<(), String>>,
) {
    use leaprs::*;

    let mut connection = match Connection::create(ConnectionConfig::default()) {
        Ok(c)  => c,
        Err(e) => {
            let _ = ready.send(Err(format!("LeapC connection: {:?}", e)));
            return;
        }
    };
    if let Err(e) = connection.open() {
        let _ = ready.send(Err(format!("LeapMotion device: {:?}", e)));
        return;
    }
    let _ = ready.send(Ok(()));

    while !stop.load(Ordering::Acquire) {
        let msg = match connection.poll(POLL_MS) {
            Ok(m)  => m,
            Err(_) => continue,
        };

        if let Event::Tracking(frame) = msg.event() {
            let hands: Vec<_> = frame.hands().collect();
            let hand = hands
                .iter()
                .find(|h| h.hand_type() == HandType::Right)
                .or_else(|| hands.first());
            let observed = hand.and_then(to_hand_frame);

            telemetry.record_frame(observed.clone());
            if !slot.publish(observed) {
                break;
            }
        }
    }
}

/// Flatten a tracked hand onto the camera landmark layout.
fn to_hand_frame(hand: &leaprs::Hand) -> Option<HandFrame> {
    let digits: Vec<_> = hand.digits().collect();
    if digits.len() < 5 {
        return None;
    }

    let mut points = [Landmark::default(); LANDMARK_COUNT];
    // Carpal end of the middle metacarpal sits where a camera sees the wrist.
    let wrist = digits[2].metacarpal().prev_joint();
    points[0] = project(wrist.x, wrist.y);

    for (d, digit) in digits.iter().take(5).enumerate() {
        let base = digit.proximal().prev_joint();
        let pip  = digit.proximal().next_joint();
        let dip  = digit.intermediate().next_joint();
        let tip  = digit.distal().next_joint();
        points[1 + d * 4]     = project(base.x, base.y);
        points[1 + d * 4 + 1] = project(pip.x, pip.y);
        points[1 + d * 4 + 2] = project(dip.x, dip.y);
        points[1 + d * 4 + 3] = project(tip.x, tip.y);
    }
    Some(HandFrame::new(points))
}

fn project(x_mm: f32, y_mm: f32) -> Landmark {
    Landmark::new(0.5 + x_mm / SPAN_MM, 1.0 - y_mm / SPAN_MM)
}
