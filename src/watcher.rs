//! Background thread turning the LED off after the idle timeout.

use std::{
    sync::Arc,
    thread::{self, JoinHandle},
    time::{Duration, Instant},
};

use log::{debug, error};

use crate::{
    led::{LedBackend, OFF},
    state::Shared,
};

/// How often the idle time is checked.
pub(crate) const POLL_INTERVAL: Duration = Duration::from_millis(500);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum WatchAction {
    /// Nothing to do this round.
    Idle,
    /// LED was turned off.
    TurnedOff,
    /// Turning the LED off failed, fault recorded and shutdown requested.
    Faulted,
}

pub(crate) struct IdleWatcher {
    shared: Arc<Shared>,
    led: Arc<dyn LedBackend>,
    interval: Duration,
}

impl IdleWatcher {
    pub(crate) fn new(shared: Arc<Shared>, led: Arc<dyn LedBackend>, interval: Duration) -> Self {
        Self {
            shared,
            led,
            interval,
        }
    }

    /// Start on a dedicated thread. Unpark the thread to make it notice a
    /// shutdown request before the interval has passed.
    pub(crate) fn spawn(self) -> std::io::Result<JoinHandle<()>> {
        thread::Builder::new()
            .name("idle-watcher".into())
            .spawn(move || self.run())
    }

    fn run(&self) {
        while !self.shared.shutting_down() {
            if self.poll_once(Instant::now()) == WatchAction::Faulted {
                break;
            }
            thread::park_timeout(self.interval);
        }
        debug!("Idle watcher stopped");
    }

    /// One check at `now`. Decision and backend call happen under one lock.
    pub(crate) fn poll_once(&self, now: Instant) -> WatchAction {
        let mut state = self.shared.lock();
        if !state.should_turn_off(now) {
            return WatchAction::Idle;
        }
        debug!("Idle for {:?}, turning LED off", state.idle_for(now));
        match self.led.set_brightness(OFF) {
            Ok(()) => {
                state.is_lit = false;
                WatchAction::TurnedOff
            }
            Err(err) => {
                error!("Failed to turn LED off: {err}");
                state.set_fault(err);
                drop(state);
                self.shared.request_shutdown();
                WatchAction::Faulted
            }
        }
    }
}
