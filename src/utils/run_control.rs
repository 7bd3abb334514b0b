//! Run/pause flags shared between the controller and a worker thread
//!
//! The controller writes, the worker polls. A worker observes a stop or pause
//! request within one [`SLEEP_SLICE`] plus the duration of the capture or
//! input call it is currently in; every wait in the workers goes through
//! [`RunControl::smart_sleep`] or checks [`RunControl::should_continue`] at
//! least that often.

use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::{Duration, Instant};

use parking_lot::Mutex;

/// Longest uninterrupted sleep a worker performs
pub const SLEEP_SLICE: Duration = Duration::from_millis(50);

/// Per-worker control flags
#[derive(Debug)]
pub struct RunControl {
    running: AtomicBool,
    paused: AtomicBool,
}

impl RunControl {
    /// New control block: not running, paused
    pub fn new() -> Self {
        Self {
            running: AtomicBool::new(false),
            paused: AtomicBool::new(true),
        }
    }

    pub fn start(&self) {
        self.running.store(true, Ordering::SeqCst);
    }

    pub fn stop(&self) {
        self.running.store(false, Ordering::SeqCst);
    }

    pub fn pause(&self) {
        self.paused.store(true, Ordering::SeqCst);
    }

    pub fn resume(&self) {
        self.paused.store(false, Ordering::SeqCst);
    }

    /// Flip between paused and resumed, returning the new paused state
    pub fn toggle(&self) -> bool {
        !self.paused.fetch_xor(true, Ordering::SeqCst)
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    pub fn is_paused(&self) -> bool {
        self.paused.load(Ordering::SeqCst)
    }

    /// Running and not paused
    pub fn should_continue(&self) -> bool {
        self.is_running() && !self.is_paused()
    }

    /// Sleep for `duration` in [`SLEEP_SLICE`] steps.
    ///
    /// Returns `false` as soon as a stop or pause is observed, `true` when the
    /// full duration elapsed.
    pub fn smart_sleep(&self, duration: Duration) -> bool {
        let start = Instant::now();
        loop {
            if !self.should_continue() {
                return false;
            }
            let remaining = duration.saturating_sub(start.elapsed());
            if remaining.is_zero() {
                return true;
            }
            thread::sleep(remaining.min(SLEEP_SLICE));
        }
    }
}

impl Default for RunControl {
    fn default() -> Self {
        Self::new()
    }
}

/// Single-slot mailbox for a preset change requested by the controller
#[derive(Debug, Default)]
pub struct PresetRequest {
    pending: Mutex<Option<String>>,
}

impl PresetRequest {
    pub fn new() -> Self {
        Self::default()
    }

    /// Post a request, replacing any request not yet applied
    pub fn request(&self, name: impl Into<String>) {
        *self.pending.lock() = Some(name.into());
    }

    /// Take the pending request, if any
    pub fn take(&self) -> Option<String> {
        self.pending.lock().take()
    }
}
