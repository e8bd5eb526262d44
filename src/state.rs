//! Timing state shared between the input monitor and the idle watcher

use std::{
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc, Mutex, MutexGuard, PoisonError,
    },
    time::{Duration, Instant},
};

use crate::errors::BackendError;

#[derive(Debug)]
pub(crate) struct TimingState {
    /// Most recent key-down, `None` until the first one.
    pub last_keypress: Option<Instant>,
    /// Inactivity after which the LED is turned off.
    pub idle_threshold: Duration,
    /// LED state as last successfully applied.
    pub is_lit: bool,
    /// Backend failure seen by the watcher. Never cleared once set.
    fault: Option<Arc<BackendError>>,
}

impl TimingState {
    pub(crate) fn new(idle_threshold: Duration) -> Self {
        Self {
            last_keypress: None,
            idle_threshold,
            is_lit: false,
            fault: None,
        }
    }

    /// Record a key-down at `now`. Never moves the timestamp backwards.
    pub(crate) fn record_keypress(&mut self, now: Instant) {
        self.last_keypress = Some(match self.last_keypress {
            Some(prev) if prev > now => prev,
            _ => now,
        });
    }

    /// Time since the last keypress, `None` if there never was one.
    pub(crate) fn idle_for(&self, now: Instant) -> Option<Duration> {
        self.last_keypress
            .map(|last| now.saturating_duration_since(last))
    }

    /// True when the LED is on and the idle threshold has been exceeded.
    pub(crate) fn should_turn_off(&self, now: Instant) -> bool {
        self.is_lit
            && self
                .idle_for(now)
                .map_or(true, |idle| idle > self.idle_threshold)
    }

    pub(crate) fn set_fault(&mut self, err: BackendError) {
        if self.fault.is_none() {
            self.fault = Some(Arc::new(err));
        }
    }

    pub(crate) fn fault(&self) -> Option<Arc<BackendError>> {
        self.fault.clone()
    }
}

/// State handed to both threads.
#[derive(Debug)]
pub(crate) struct Shared {
    timing: Mutex<TimingState>,
    /// Process wide stop request, also set from signal handlers.
    shutdown: Arc<AtomicBool>,
}

impl Shared {
    pub(crate) fn new(idle_threshold: Duration, shutdown: Arc<AtomicBool>) -> Self {
        Self {
            timing: Mutex::new(TimingState::new(idle_threshold)),
            shutdown,
        }
    }

    /// Exclusive access to the timing state. Hold the guard across the whole
    /// check-then-set sequence, backend call included.
    pub(crate) fn lock(&self) -> MutexGuard<'_, TimingState> {
        self.timing.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn request_shutdown(&self) {
        self.shutdown.store(true, Ordering::SeqCst);
    }

    pub(crate) fn shutting_down(&self) -> bool {
        self.shutdown.load(Ordering::SeqCst)
    }
}
