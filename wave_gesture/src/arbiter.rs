//! The gesture arbiter: at most one armed modality, one command sink.
//!
//! ```text
//!              enable_motion()
//!        ┌──────────────────────────┐
//!        │                          ▼
//!      ┌─┴─┐   enable_hand()    ┌────────┐
//!      │Off│ ─────────────────► │ Motion │
//!      └───┘ ◄── disable_all ── └────────┘
//!        ▲ │                     │    ▲
//!        │ ▼                     ▼    │
//!      ┌──────┐ ◄─ enable_hand ──     │
//!      │ Hand │ ── enable_motion ─────┘
//!      └──────┘
//! ```
//!
//! Every transition stops the armed detector (joining its worker) before
//! arming the next, and bumps the arming generation first, so an event
//! already in flight from the old detector is discarded instead of
//! delivered.  Events reach the sink only through [`GestureArbiter::pump`],
//! on the caller's thread; the sink never sees two deliveries at once.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, SyncSender, TryRecvError};
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::error::GestureError;
use crate::event::GestureEvent;
use crate::settings::{GestureMode, GestureSettings};
use crate::source::{HandSource, MotionSource};
use crate::worker::{Clock, Emitter, GestureDetector, HandController, MotionController, Stamped};

/// Gesture events queued between the workers and [`GestureArbiter::pump`].
pub const COMMAND_QUEUE_CAPACITY: usize = 16;

// ════════════════════════════════════════════════════════════════════════════
// CommandSink
// ════════════════════════════════════════════════════════════════════════════

/// The playback side: receives decided commands.
pub trait CommandSink {
    fn next(&mut self);
    fn previous(&mut self);
    fn play(&mut self);
    fn pause(&mut self);
    fn toggle_play_pause(&mut self);

    /// Route one event to the matching operation.
    fn dispatch(&mut self, event: GestureEvent) {
        match event {
            GestureEvent::Next            => self.next(),
            GestureEvent::Previous        => self.previous(),
            GestureEvent::Play            => self.play(),
            GestureEvent::Pause           => self.pause(),
            GestureEvent::PlayPauseToggle => self.toggle_play_pause(),
        }
    }
}

// ════════════════════════════════════════════════════════════════════════════
// DetectorMode
// ════════════════════════════════════════════════════════════════════════════

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum DetectorMode {
    #[default]
    Off,
    Motion,
    Hand,
}

impl DetectorMode {
    pub fn name(self) -> &'static str {
        match self {
            DetectorMode::Off    => "off",
            DetectorMode::Motion => "motion",
            DetectorMode::Hand   => "hand",
        }
    }
}

impl From<GestureMode> for DetectorMode {
    fn from(mode: GestureMode) -> Self {
        match mode {
            GestureMode::Off    => DetectorMode::Off,
            GestureMode::Motion => DetectorMode::Motion,
            GestureMode::Hand   => DetectorMode::Hand,
        }
    }
}

// ════════════════════════════════════════════════════════════════════════════
// GestureArbiter
// ════════════════════════════════════════════════════════════════════════════

pub struct GestureArbiter {
    motion:     MotionController,
    hand:       HandController,
    mode:       DetectorMode,
    sink:       Box<dyn CommandSink>,
    tx:         SyncSender<Stamped>,
    rx:         Receiver<Stamped>,
    generation: Arc<AtomicU64>,
    clock:      Clock,
    delivered:  u64,
    discarded:  u64,
}

impl GestureArbiter {
    /// Build an arbiter in the `Off` state.  Call [`apply`] or one of the
    /// `enable_*` operations to arm a modality.
    ///
    /// [`apply`]: GestureArbiter::apply
    pub fn new(
        motion_source: Box<dyn MotionSource>,
        hand_source:   Box<dyn HandSource>,
        sink:          Box<dyn CommandSink>,
        settings:      &GestureSettings,
    ) -> Self {
        let (tx, rx) = mpsc::sync_channel(COMMAND_QUEUE_CAPACITY);
        GestureArbiter {
            motion: MotionController::new(motion_source, settings),
            hand: HandController::new(hand_source),
            mode: DetectorMode::Off,
            sink,
            tx,
            rx,
            generation: Arc::new(AtomicU64::new(0)),
            clock: Clock::default(),
            delivered: 0,
            discarded: 0,
        }
    }

    // ── mode transitions ─────────────────────────────────────────────────

    /// Stop hand tracking (if armed) and arm the motion detector.
    pub fn enable_motion(&mut self) -> Result<(), GestureError> {
        self.switch_to(DetectorMode::Motion)
    }

    /// Stop motion sensing (if armed) and arm the hand detector.
    pub fn enable_hand(&mut self) -> Result<(), GestureError> {
        self.switch_to(DetectorMode::Hand)
    }

    /// Stop whichever detector is armed.
    pub fn disable_all(&mut self) {
        self.disarm_all();
        self.mode = DetectorMode::Off;
        info!("gestures disabled");
    }

    /// Refresh both detectors from `settings`, then switch to the mode it
    /// names.  Acquisition failures leave the arbiter off.
    pub fn apply(&mut self, settings: &GestureSettings) -> Result<(), GestureError> {
        self.motion.refresh(settings);
        self.hand.refresh(settings);
        match settings.mode {
            GestureMode::Off    => { self.disable_all(); Ok(()) }
            GestureMode::Motion => self.enable_motion(),
            GestureMode::Hand   => self.enable_hand(),
        }
    }

    fn switch_to(&mut self, target: DetectorMode) -> Result<(), GestureError> {
        if self.mode == target && self.armed_count() == 1 {
            debug!(mode = target.name(), "already armed");
            return Ok(());
        }

        self.disarm_all();
        debug_assert_eq!(self.armed_count(), 0, "a detector survived disarm");

        let generation = self.generation.load(Ordering::Acquire);
        let emitter = Emitter::new(self.tx.clone(), generation, Arc::clone(&self.generation));
        let result = match target {
            DetectorMode::Motion => self.motion.start(emitter, self.clock),
            DetectorMode::Hand   => self.hand.start(emitter, self.clock),
            DetectorMode::Off    => Ok(()),
        };

        match result {
            Ok(()) => {
                self.mode = target;
                debug_assert!(self.armed_count() <= 1, "two detectors armed at once");
                info!(mode = target.name(), generation, "gesture mode switched");
                Ok(())
            }
            Err(e) => {
                warn!(mode = target.name(), error = %e, "could not arm gesture detector");
                self.mode = DetectorMode::Off;
                Err(e)
            }
        }
    }

    /// Invalidate in-flight events, then stop both detectors.
    fn disarm_all(&mut self) {
        self.generation.fetch_add(1, Ordering::AcqRel);
        self.motion.stop();
        self.hand.stop();
    }

    fn armed_count(&self) -> usize {
        self.motion.is_armed() as usize + self.hand.is_armed() as usize
    }

    // ── delivery ─────────────────────────────────────────────────────────

    /// Deliver every queued event to the sink without blocking.  Returns
    /// the number delivered.
    pub fn pump(&mut self) -> usize {
        let mut n = 0;
        loop {
            match self.rx.try_recv() {
                Ok(stamped) => n += self.deliver(stamped) as usize,
                Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => break,
            }
        }
        n
    }

    /// Wait up to `timeout` for one event, then drain the rest.
    pub fn pump_timeout(&mut self, timeout: Duration) -> usize {
        match self.rx.recv_timeout(timeout) {
            Ok(stamped) => self.deliver(stamped) as usize + self.pump(),
            Err(RecvTimeoutError::Timeout) | Err(RecvTimeoutError::Disconnected) => 0,
        }
    }

    fn deliver(&mut self, stamped: Stamped) -> bool {
        if stamped.generation != self.generation.load(Ordering::Acquire) {
            self.discarded += 1;
            debug!(event = %stamped.event, "discarding event from a disarmed detector");
            return false;
        }
        debug!(event = %stamped.event, mode = self.mode.name(), "delivering gesture");
        self.sink.dispatch(stamped.event);
        self.delivered += 1;
        true
    }

    // ── accessors ────────────────────────────────────────────────────────

    pub fn mode(&self) -> DetectorMode       { self.mode }
    pub fn is_motion_armed(&self) -> bool    { self.motion.is_armed() }
    pub fn is_hand_armed(&self) -> bool      { self.hand.is_armed() }
    pub fn delivered(&self) -> u64           { self.delivered }
    pub fn discarded(&self) -> u64           { self.discarded }
    pub fn sink(&self) -> &dyn CommandSink   { self.sink.as_ref() }
    pub fn sink_mut(&mut self) -> &mut dyn CommandSink { self.sink.as_mut() }
}

impl Drop for GestureArbiter {
    fn drop(&mut self) {
        self.disarm_all();
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Tests
// ════════════════════════════════════════════════════════════════════════════
