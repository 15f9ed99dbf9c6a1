//! Input sources: where samples and frames come from.
//!
//! The core never talks to a sensor driver or camera directly.  A
//! [`MotionSource`] hands back a bounded channel of samples when started;
//! a [`HandSource`] hands back a [`FrameSlot`], a keep-only-latest mailbox
//! that the camera side overwrites so analysis never queues stale frames.
//!
//! [`ChannelMotionSource`] and [`SlotHandSource`] are ready-made sources
//! fed by external code through cloneable feeder handles.  A feeder pushes
//! into whatever registration is current and silently drops input while
//! the source is stopped, like a sensor listener that was unregistered.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc::{self, Receiver, SyncSender, TrySendError};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::{Condvar, Mutex};
use tracing::{info, trace};

use crate::error::GestureError;
use crate::event::AccelerationSample;
use crate::landmarks::HandFrame;

/// Samples buffered between a motion producer and its worker.
pub const MOTION_QUEUE_CAPACITY: usize = 64;

// ════════════════════════════════════════════════════════════════════════════
// Source traits
// ════════════════════════════════════════════════════════════════════════════

/// A stream of accelerometer samples.
pub trait MotionSource: Send {
    /// Register with the sensor.  Each call returns a fresh receiver.
    fn start(&mut self) -> Result<Receiver<AccelerationSample>, GestureError>;
    /// Unregister.  Must be idempotent; afterwards no sample is delivered.
    fn stop(&mut self);
}

/// A stream of per-frame hand observations.
pub trait HandSource: Send {
    /// Bind to the camera pipeline.  Each call returns a fresh slot.
    fn start(&mut self) -> Result<Arc<FrameSlot>, GestureError>;
    /// Unbind.  Must be idempotent and must close the slot it handed out.
    fn stop(&mut self);
}

// ════════════════════════════════════════════════════════════════════════════
// FrameSlot — keep-only-latest mailbox
// ════════════════════════════════════════════════════════════════════════════

/// Result of waiting on a [`FrameSlot`].
#[derive(Debug, PartialEq)]
pub enum SlotRecv {
    /// The newest observation; `None` inside means no hand in that frame.
    Frame(Option<HandFrame>),
    Timeout,
    Closed,
}

#[derive(Default)]
struct SlotState {
    pending:   Option<Option<HandFrame>>,
    closed:    bool,
    published: u64,
    dropped:   u64,
}

/// Single-entry mailbox between a camera pipeline and its analysis worker.
///
/// Publishing over an unconsumed frame replaces it and counts a drop.
#[derive(Default)]
pub struct FrameSlot {
    state: Mutex<SlotState>,
    ready: Condvar,
}

impl FrameSlot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Offer the latest observation.  Returns `false` once closed.
    pub fn publish(&self, frame: Option<HandFrame>) -> bool {
        let mut st = self.state.lock();
        if st.closed {
            return false;
        }
        if st.pending.replace(frame).is_some() {
            st.dropped += 1;
            trace!(dropped = st.dropped, "analysis behind, replaced pending frame");
        }
        st.published += 1;
        drop(st);
        self.ready.notify_one();
        true
    }

    /// Wait up to `timeout` for an observation.
    pub fn recv_timeout(&self, timeout: Duration) -> SlotRecv {
        let mut st = self.state.lock();
        if st.pending.is_none() && !st.closed {
            self.ready.wait_for(&mut st, timeout);
        }
        if let Some(frame) = st.pending.take() {
            return SlotRecv::Frame(frame);
        }
        if st.closed { SlotRecv::Closed } else { SlotRecv::Timeout }
    }

    /// Close the slot: pending input is discarded and waiters wake up.
    pub fn close(&self) {
        let mut st = self.state.lock();
        st.closed = true;
        st.pending = None;
        drop(st);
        self.ready.notify_all();
    }

    pub fn is_closed(&self) -> bool {
        self.state.lock().closed
    }

    /// Frames replaced before the worker got to them.
    pub fn dropped(&self) -> u64 {
        self.state.lock().dropped
    }

    pub fn published(&self) -> u64 {
        self.state.lock().published
    }
}

// ════════════════════════════════════════════════════════════════════════════
// ChannelMotionSource
// ════════════════════════════════════════════════════════════════════════════

/// A motion source fed by a [`MotionFeeder`].
pub struct ChannelMotionSource {
    current:  Arc<Mutex<Option<SyncSender<AccelerationSample>>>>,
    dropped:  Arc<AtomicU64>,
    capacity: usize,
}

/// Cloneable producer handle for a [`ChannelMotionSource`].
#[derive(Clone)]
pub struct MotionFeeder {
    current: Arc<Mutex<Option<SyncSender<AccelerationSample>>>>,
    dropped: Arc<AtomicU64>,
}

impl Default for ChannelMotionSource {
    fn default() -> Self {
        Self::with_capacity(MOTION_QUEUE_CAPACITY)
    }
}

impl ChannelMotionSource {
    pub fn with_capacity(capacity: usize) -> Self {
        ChannelMotionSource {
            current:  Arc::new(Mutex::new(None)),
            dropped:  Arc::new(AtomicU64::new(0)),
            capacity: capacity.max(1),
        }
    }

    pub fn feeder(&self) -> MotionFeeder {
        MotionFeeder { current: Arc::clone(&self.current), dropped: Arc::clone(&self.dropped) }
    }
}

impl MotionSource for ChannelMotionSource {
    fn start(&mut self) -> Result<Receiver<AccelerationSample>, GestureError> {
        let (tx, rx) = mpsc::sync_channel(self.capacity);
        *self.current.lock() = Some(tx);
        info!("motion source registered");
        Ok(rx)
    }

    fn stop(&mut self) {
        if self.current.lock().take().is_some() {
            info!("motion source unregistered");
        }
    }
}

impl MotionFeeder {
    /// Deliver a sample if the source is registered.  A full queue drops
    /// the sample rather than blocking the producer.
    pub fn push(&self, sample: AccelerationSample) -> bool {
        let guard = self.current.lock();
        let Some(tx) = guard.as_ref() else { return false };
        match tx.try_send(sample) {
            Ok(()) => true,
            Err(TrySendError::Full(_)) => {
                self.dropped.fetch_add(1, Ordering::Relaxed);
                false
            }
            Err(TrySendError::Disconnected(_)) => false,
        }
    }

    pub fn is_registered(&self) -> bool {
        self.current.lock().is_some()
    }

    /// Samples dropped because the queue was full.
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }
}

// ════════════════════════════════════════════════════════════════════════════
// SlotHandSource
// ════════════════════════════════════════════════════════════════════════════

/// A hand source fed by a [`HandFeeder`].
#[derive(Default)]
pub struct SlotHandSource {
    current: Arc<Mutex<Option<Arc<FrameSlot>>>>,
}

/// Cloneable producer handle for a [`SlotHandSource`].
#[derive(Clone)]
pub struct HandFeeder {
    current: Arc<Mutex<Option<Arc<FrameSlot>>>>,
}

impl SlotHandSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn feeder(&self) -> HandFeeder {
        HandFeeder { current: Arc::clone(&self.current) }
    }
}

impl HandSource for SlotHandSource {
    fn start(&mut self) -> Result<Arc<FrameSlot>, GestureError> {
        let slot = Arc::new(FrameSlot::new());
        if let Some(old) = self.current.lock().replace(Arc::clone(&slot)) {
            old.close();
        }
        info!("hand source bound");
        Ok(slot)
    }

    fn stop(&mut self) {
        if let Some(slot) = self.current.lock().take() {
            slot.close();
            info!(dropped = slot.dropped(), "hand source unbound");
        }
    }
}

impl HandFeeder {
    /// Publish the latest observation if the source is bound.
    pub fn publish(&self, frame: Option<HandFrame>) -> bool {
        match self.current.lock().as_ref() {
            Some(slot) => slot.publish(frame),
            None       => false,
        }
    }

    pub fn is_bound(&self) -> bool {
        self.current.lock().is_some()
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Tests
// ════════════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;
    use crate::poses;
    use std::thread;

    #[test]
    fn slot_keeps_only_latest() {
        let slot = FrameSlot::new();
        slot.publish(None);
        slot.publish(Some(poses::closed_fist()));
        slot.publish(Some(poses::open_palm()));
        assert_eq!(slot.dropped(), 2);
        assert_eq!(slot.recv_timeout(Duration::from_millis(1)), SlotRecv::Frame(Some(poses::open_palm())));
        assert_eq!(slot.recv_timeout(Duration::from_millis(1)), SlotRecv::Timeout);
    }

    #[test]
    fn closed_slot_rejects_and_wakes() {
        let slot = Arc::new(FrameSlot::new());
        let waiter = {
            let slot = Arc::clone(&slot);
            thread::spawn(move || slot.recv_timeout(Duration::from_secs(5)))
        };
        thread::sleep(Duration::from_millis(20));
        slot.close();
        assert_eq!(waiter.join().unwrap(), SlotRecv::Closed);
        assert!(!slot.publish(None));
    }

    #[test]
    fn slot_wakes_on_publish() {
        let slot = Arc::new(FrameSlot::new());
        let waiter = {
            let slot = Arc::clone(&slot);
            thread::spawn(move || slot.recv_timeout(Duration::from_secs(5)))
        };
        thread::sleep(Duration::from_millis(20));
        slot.publish(None);
        assert_eq!(waiter.join().unwrap(), SlotRecv::Frame(None));
    }

    #[test]
    fn motion_feeder_only_delivers_while_registered() {
        let mut src = ChannelMotionSource::default();
        let feeder = src.feeder();
        assert!(!feeder.push(AccelerationSample::at_rest(0)));

        let rx = src.start().unwrap();
        assert!(feeder.push(AccelerationSample::at_rest(1)));
        assert_eq!(rx.try_recv().unwrap().timestamp_ms, 1);

        src.stop();
        src.stop();
        assert!(!feeder.is_registered());
        assert!(!feeder.push(AccelerationSample::at_rest(2)));
    }

    #[test]
    fn full_motion_queue_drops() {
        let mut src = ChannelMotionSource::with_capacity(2);
        let feeder = src.feeder();
        let _rx = src.start().unwrap();
        assert!(feeder.push(AccelerationSample::at_rest(0)));
        assert!(feeder.push(AccelerationSample::at_rest(1)));
        assert!(!feeder.push(AccelerationSample::at_rest(2)));
        assert_eq!(feeder.dropped(), 1);
    }

    #[test]
    fn hand_source_stop_closes_slot() {
        let mut src = SlotHandSource::new();
        let feeder = src.feeder();
        let slot = src.start().unwrap();
        assert!(feeder.publish(Some(poses::one_finger())));
        src.stop();
        assert!(slot.is_closed());
        assert!(!feeder.publish(None));
    }

    #[test]
    fn restart_hands_out_fresh_slot() {
        let mut src = SlotHandSource::new();
        let first = src.start().unwrap();
        let second = src.start().unwrap();
        assert!(first.is_closed());
        assert!(!second.is_closed());
    }
}
