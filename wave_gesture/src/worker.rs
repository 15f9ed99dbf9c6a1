//! Armed detectors: one worker thread per active modality.
//!
//! A controller owns its source and its detector.  `start` registers with
//! the source and spawns a worker that pulls input, runs the detector and
//! hands any event to an [`Emitter`].  `stop` unregisters, joins the worker
//! and clears the detector, so nothing from this modality can be emitted
//! once it returns.
//!
//! The emitter never calls the sink.  It stamps each event with the
//! generation it was armed under and pushes it onto the arbiter's bounded
//! channel; the arbiter delivers on its own thread and discards stamps
//! from a generation that has since been disarmed.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::mpsc::{Receiver, RecvTimeoutError, SyncSender, TrySendError};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use tracing::{debug, info, trace, warn};

use crate::error::GestureError;
use crate::event::{AccelerationSample, GestureEvent};
use crate::hand::HandGestureDetector;
use crate::motion::MotionGestureDetector;
use crate::settings::GestureSettings;
use crate::source::{HandSource, MotionSource, SlotRecv};

/// How often an idle worker re-checks its stop flag.
pub const POLL_INTERVAL: Duration = Duration::from_millis(50);

// ════════════════════════════════════════════════════════════════════════════
// Clock
// ════════════════════════════════════════════════════════════════════════════

/// Monotonic milliseconds since the clock was created.  Shared by both
/// workers so cooldowns are measured on one time base.
#[derive(Clone, Copy, Debug)]
pub struct Clock {
    origin: Instant,
}

impl Default for Clock {
    fn default() -> Self {
        Clock { origin: Instant::now() }
    }
}

impl Clock {
    pub fn now_ms(&self) -> u64 {
        self.origin.elapsed().as_millis() as u64
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Emitter
// ════════════════════════════════════════════════════════════════════════════

/// An event tagged with the arming generation that produced it.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Stamped {
    pub generation: u64,
    pub event:      GestureEvent,
}

/// Handoff from a worker thread to the sink's thread.
#[derive(Clone)]
pub struct Emitter {
    tx:         SyncSender<Stamped>,
    generation: u64,
    current:    Arc<AtomicU64>,
}

impl Emitter {
    pub fn new(tx: SyncSender<Stamped>, generation: u64, current: Arc<AtomicU64>) -> Self {
        Emitter { tx, generation, current }
    }

    /// Queue an event for delivery.  Events from a stale generation and
    /// events that find the queue full are dropped.
    pub fn emit(&self, event: GestureEvent) -> bool {
        if self.current.load(Ordering::Acquire) != self.generation {
            trace!(%event, generation = self.generation, "dropping event from disarmed detector");
            return false;
        }
        match self.tx.try_send(Stamped { generation: self.generation, event }) {
            Ok(()) => true,
            Err(TrySendError::Full(_)) => {
                warn!(%event, "command queue full, dropping gesture");
                false
            }
            Err(TrySendError::Disconnected(_)) => false,
        }
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }
}

// ════════════════════════════════════════════════════════════════════════════
// DetectorWorker
// ════════════════════════════════════════════════════════════════════════════

/// A running worker thread with a cooperative stop flag.
pub struct DetectorWorker {
    name:   &'static str,
    stop:   Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl DetectorWorker {
    /// Spawn `body` on a named thread.  The body must return promptly once
    /// the flag it receives is set.
    pub fn spawn<F>(name: &'static str, body: F) -> Result<Self, GestureError>
    where
        F: FnOnce(Arc<AtomicBool>) + Send + 'static,
    {
        let stop = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&stop);
        let handle = thread::Builder::new()
            .name(format!("{}-gestures", name))
            .spawn(move || body(flag))
            .map_err(|source| GestureError::WorkerSpawn { name, source })?;
        debug!(worker = name, "worker started");
        Ok(DetectorWorker { name, stop, handle: Some(handle) })
    }

    pub fn request_stop(&self) {
        self.stop.store(true, Ordering::Release);
    }

    /// Ask the worker to finish and wait for it.  Idempotent.
    pub fn join(&mut self) {
        self.request_stop();
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                warn!(worker = self.name, "worker panicked");
            }
            debug!(worker = self.name, "worker stopped");
        }
    }

    pub fn is_running(&self) -> bool {
        self.handle.is_some()
    }
}

impl Drop for DetectorWorker {
    fn drop(&mut self) {
        self.join();
    }
}

// ════════════════════════════════════════════════════════════════════════════
// GestureDetector
// ════════════════════════════════════════════════════════════════════════════

pub trait GestureDetector: Send {
    fn name(&self) -> &'static str;
    /// Register with the input source and begin emitting.
    fn start(&mut self, emitter: Emitter, clock: Clock) -> Result<(), GestureError>;
    /// Unregister, join the worker and clear detector state.  Idempotent.
    fn stop(&mut self);
    fn is_armed(&self) -> bool;
    /// Recompute cached thresholds from new settings.
    fn refresh(&mut self, settings: &GestureSettings);
}

// ════════════════════════════════════════════════════════════════════════════
// MotionController
// ════════════════════════════════════════════════════════════════════════════

pub struct MotionController {
    source:   Box<dyn MotionSource>,
    detector: Arc<Mutex<MotionGestureDetector>>,
    worker:   Option<DetectorWorker>,
}

impl MotionController {
    pub fn new(source: Box<dyn MotionSource>, settings: &GestureSettings) -> Self {
        MotionController {
            source,
            detector: Arc::new(Mutex::new(MotionGestureDetector::from_settings(settings))),
            worker:   None,
        }
    }

    pub fn detector(&self) -> MotionGestureDetector {
        self.detector.lock().clone()
    }
}

impl GestureDetector for MotionController {
    fn name(&self) -> &'static str { "motion" }

    fn start(&mut self, emitter: Emitter, clock: Clock) -> Result<(), GestureError> {
        if self.is_armed() {
            return Ok(());
        }
        let rx = self.source.start()?;
        let detector = Arc::clone(&self.detector);
        let worker = DetectorWorker::spawn("motion", move |stop| {
            motion_loop(rx, detector, emitter, clock, stop)
        });
        match worker {
            Ok(w) => {
                self.worker = Some(w);
                info!("motion detector armed");
                Ok(())
            }
            Err(e) => {
                self.source.stop();
                Err(e)
            }
        }
    }

    fn stop(&mut self) {
        let Some(mut worker) = self.worker.take() else {
            self.source.stop();
            return;
        };
        worker.request_stop();
        self.source.stop();
        worker.join();
        self.detector.lock().reset();
        info!("motion detector disarmed");
    }

    fn is_armed(&self) -> bool {
        self.worker.is_some()
    }

    fn refresh(&mut self, settings: &GestureSettings) {
        self.detector.lock().refresh(settings);
    }
}

fn motion_loop(
    rx:       Receiver<AccelerationSample>,
    detector: Arc<Mutex<MotionGestureDetector>>,
    emitter:  Emitter,
    clock:    Clock,
    stop:     Arc<AtomicBool>,
) {
    while !stop.load(Ordering::Acquire) {
        let sample = match rx.recv_timeout(POLL_INTERVAL) {
            Ok(s) => s,
            Err(RecvTimeoutError::Timeout)      => continue,
            Err(RecvTimeoutError::Disconnected) => break,
        };
        if stop.load(Ordering::Acquire) {
            break;
        }
        let event = detector.lock().process(&sample, clock.now_ms());
        if let Some(event) = event {
            emitter.emit(event);
        }
    }
}

// ════════════════════════════════════════════════════════════════════════════
// HandController
// ════════════════════════════════════════════════════════════════════════════

pub struct HandController {
    source:   Box<dyn HandSource>,
    detector: Arc<Mutex<HandGestureDetector>>,
    worker:   Option<DetectorWorker>,
}

impl HandController {
    pub fn new(source: Box<dyn HandSource>) -> Self {
        HandController {
            source,
            detector: Arc::new(Mutex::new(HandGestureDetector::new())),
            worker:   None,
        }
    }

    pub fn detector(&self) -> HandGestureDetector {
        self.detector.lock().clone()
    }
}

impl GestureDetector for HandController {
    fn name(&self) -> &'static str { "hand" }

    fn start(&mut self, emitter: Emitter, clock: Clock) -> Result<(), GestureError> {
        if self.is_armed() {
            return Ok(());
        }
        let slot = self.source.start()?;
        let detector = Arc::clone(&self.detector);
        let worker = DetectorWorker::spawn("hand", move |stop| {
            while !stop.load(Ordering::Acquire) {
                let frame = match slot.recv_timeout(POLL_INTERVAL) {
                    SlotRecv::Frame(f) => f,
                    SlotRecv::Timeout  => continue,
                    SlotRecv::Closed   => break,
                };
                if stop.load(Ordering::Acquire) {
                    break;
                }
                let event = detector.lock().process(frame.as_ref(), clock.now_ms());
                if let Some(event) = event {
                    emitter.emit(event);
                }
            }
        });
        match worker {
            Ok(w) => {
                self.worker = Some(w);
                info!("hand detector armed");
                Ok(())
            }
            Err(e) => {
                self.source.stop();
                Err(e)
            }
        }
    }

    fn stop(&mut self) {
        let Some(mut worker) = self.worker.take() else {
            self.source.stop();
            return;
        };
        worker.request_stop();
        self.source.stop();
        worker.join();
        self.detector.lock().reset();
        info!("hand detector disarmed");
    }

    fn is_armed(&self) -> bool {
        self.worker.is_some()
    }

    // Pose geometry does not depend on the user's sensitivity setting.
    fn refresh(&mut self, _settings: &GestureSettings) {}
}

// ════════════════════════════════════════════════════════════════════════════
// Tests
// ════════════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::{ChannelMotionSource, SlotHandSource};
    use std::sync::mpsc;

    fn emitter(generation: u64) -> (Emitter, Receiver<Stamped>, Arc<AtomicU64>) {
        let (tx, rx) = mpsc::sync_channel(2);
        let current = Arc::new(AtomicU64::new(generation));
        (Emitter::new(tx, generation, Arc::clone(&current)), rx, current)
    }

    #[test]
    fn emitter_stamps_generation() {
        let (em, rx, _) = emitter(7);
        assert!(em.emit(GestureEvent::Pause));
        assert_eq!(rx.try_recv().unwrap(), Stamped { generation: 7, event: GestureEvent::Pause });
    }

    #[test]
    fn emitter_goes_quiet_after_generation_bump() {
        let (em, rx, current) = emitter(3);
        current.fetch_add(1, Ordering::AcqRel);
        assert!(!em.emit(GestureEvent::Next));
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn full_queue_drops_instead_of_blocking() {
        let (em, _rx, _) = emitter(0);
        assert!(em.emit(GestureEvent::Next));
        assert!(em.emit(GestureEvent::Next));
        assert!(!em.emit(GestureEvent::Next));
    }

    #[test]
    fn worker_join_is_idempotent() {
        let mut w = DetectorWorker::spawn("test", |stop| {
            while !stop.load(Ordering::Acquire) {
                thread::sleep(Duration::from_millis(5));
            }
        })
        .unwrap();
        assert!(w.is_running());
        w.join();
        w.join();
        assert!(!w.is_running());
    }

    #[test]
    fn motion_controller_arms_and_disarms() {
        let src = ChannelMotionSource::default();
        let feeder = src.feeder();
        let mut ctl = MotionController::new(Box::new(src), &GestureSettings::default());
        let (em, rx, _) = emitter(0);

        ctl.start(em.clone(), Clock::default()).unwrap();
        ctl.start(em, Clock::default()).unwrap();
        assert!(ctl.is_armed());
        feeder.push(AccelerationSample::new(0.0, -5.0, 9.81, 0));
        let got = rx.recv_timeout(Duration::from_secs(1)).unwrap();
        assert_eq!(got.event, GestureEvent::PlayPauseToggle);

        ctl.stop();
        ctl.stop();
        assert!(!ctl.is_armed());
        assert!(!feeder.is_registered());
    }

    #[test]
    fn stop_clears_motion_cooldown() {
        let src = ChannelMotionSource::default();
        let feeder = src.feeder();
        let mut ctl = MotionController::new(Box::new(src), &GestureSettings::default());
        let (em, rx, _) = emitter(0);
        ctl.start(em.clone(), Clock::default()).unwrap();
        feeder.push(AccelerationSample::new(20.0, 0.0, 9.81, 0));
        rx.recv_timeout(Duration::from_secs(1)).unwrap();
        ctl.stop();

        // Well inside 800 ms of the first swipe, but the detector was reset.
        ctl.start(em, Clock::default()).unwrap();
        feeder.push(AccelerationSample::new(20.0, 0.0, 9.81, 0));
        assert!(rx.recv_timeout(Duration::from_secs(1)).is_ok());
        ctl.stop();
    }

    #[test]
    fn hand_controller_stop_unbinds() {
        let src = SlotHandSource::new();
        let feeder = src.feeder();
        let mut ctl = HandController::new(Box::new(src));
        let (em, _rx, _) = emitter(0);
        ctl.start(em, Clock::default()).unwrap();
        assert!(feeder.is_bound());
        ctl.stop();
        assert!(!feeder.is_bound());
        assert_eq!(ctl.detector().buffered(), 0);
    }
}
