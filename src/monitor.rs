//! Main loop: turn the LED on at key-down

use std::time::{Duration, Instant};

use log::{debug, info, warn};

use crate::{
    errors::{BackendError, MonitorError},
    input::{InputRecord, NextRecord, RecordSource},
    led::{Brightness, LedBackend},
    state::Shared,
};

/// Consumes input records and lights the LED on key-down.
pub(crate) struct Monitor<'a> {
    shared: &'a Shared,
    led: &'a dyn LedBackend,
    on_brightness: Brightness,
    /// Longest time to wait for a record before checking for shutdown again.
    wait: Duration,
}

impl<'a> Monitor<'a> {
    pub(crate) fn new(
        shared: &'a Shared,
        led: &'a dyn LedBackend,
        on_brightness: Brightness,
        wait: Duration,
    ) -> Self {
        Self {
            shared,
            led,
            on_brightness,
            wait,
        }
    }

    /// Run until the source ends, an error occurs, or shutdown is requested.
    pub(crate) fn run(&self, source: &mut dyn RecordSource) -> Result<(), MonitorError> {
        info!("Start scanning for keyboard events...");
        while !self.shared.shutting_down() {
            match source.next_record(self.wait)? {
                NextRecord::Record(record) => self.handle_record(&record, Instant::now())?,
                NextRecord::Timeout => (),
                NextRecord::Eof => {
                    warn!("Input device went away");
                    break;
                }
            }
        }
        Ok(())
    }

    /// Apply one record observed at `now`.
    pub(crate) fn handle_record(
        &self,
        record: &InputRecord,
        now: Instant,
    ) -> Result<(), BackendError> {
        if !record.is_key_down() {
            return Ok(());
        }
        debug!(
            "{}.{:06} :: Keypress detected :: code={}",
            record.time.as_secs(),
            record.time.subsec_micros(),
            record.code
        );
        let mut state = self.shared.lock();
        state.record_keypress(now);
        if !state.is_lit {
            self.led.set_brightness(self.on_brightness)?;
            state.is_lit = true;
        }
        Ok(())
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use std::{
        collections::VecDeque,
        sync::{
            atomic::{AtomicBool, Ordering},
            Arc, Mutex,
        },
    };

    use snafu::IntoError;

    use crate::{
        errors::{InputError, PermissionSnafu},
        input::EV_KEY,
    };

    use super::*;

    /// Backend that records every call, optionally failing on some values.
    #[derive(Debug, Default)]
    pub(crate) struct RecordingLed {
        pub calls: Mutex<Vec<(Brightness, Instant)>>,
        /// Fail requests for this value once `fail_after` calls succeeded.
        pub fail_on: Option<Brightness>,
        pub fail_after: usize,
    }

    impl RecordingLed {
        pub(crate) fn calls(&self) -> Vec<Brightness> {
            self.timed_calls().into_iter().map(|(value, _)| value).collect()
        }

        pub(crate) fn timed_calls(&self) -> Vec<(Brightness, Instant)> {
            self.calls.lock().unwrap().clone()
        }
    }

    impl LedBackend for RecordingLed {
        fn set_brightness(&self, value: Brightness) -> Result<(), BackendError> {
            let mut calls = self.calls.lock().unwrap();
            if self.fail_on == Some(value) && calls.len() >= self.fail_after {
                return Err(PermissionSnafu {
                    path: "/sys/class/leds/test::kbd_backlight/brightness",
                }
                .into_error(std::io::Error::from(std::io::ErrorKind::PermissionDenied)));
            }
            calls.push((value, Instant::now()));
            Ok(())
        }
    }

    /// Source replaying a script, then reporting EOF.
    pub(crate) struct ScriptedSource {
        pub script: VecDeque<NextRecord>,
    }

    impl RecordSource for ScriptedSource {
        fn next_record(&mut self, _wait: Duration) -> Result<NextRecord, InputError> {
            Ok(self.script.pop_front().unwrap_or(NextRecord::Eof))
        }
    }

    pub(crate) fn key(value: i32) -> InputRecord {
        InputRecord {
            kind: EV_KEY,
            code: 30,
            value,
            time: Duration::ZERO,
        }
    }

    fn shared(threshold: Duration) -> Shared {
        Shared::new(threshold, Arc::new(AtomicBool::new(false)))
    }

    #[test]
    fn lights_once_for_a_burst_of_keys() {
        let shared = shared(Duration::from_secs(1));
        let led = RecordingLed::default();
        let monitor = Monitor::new(&shared, &led, 3, Duration::ZERO);
        let t0 = Instant::now();
        for i in 0..10 {
            let now = t0 + Duration::from_millis(200 * i);
            monitor.handle_record(&key(1), now).unwrap();
            monitor.handle_record(&key(0), now).unwrap();
        }
        assert_eq!(led.calls(), vec![3]);
        let state = shared.lock();
        assert!(state.is_lit);
        assert_eq!(state.last_keypress, Some(t0 + Duration::from_millis(1800)));
    }

    #[test]
    fn key_up_alone_does_nothing() {
        let shared = shared(Duration::from_secs(1));
        let led = RecordingLed::default();
        let monitor = Monitor::new(&shared, &led, 1, Duration::ZERO);
        monitor.handle_record(&key(0), Instant::now()).unwrap();
        assert!(led.calls().is_empty());
        assert_eq!(shared.lock().last_keypress, None);
    }

    #[test]
    fn backend_failure_is_returned_and_light_stays_off() {
        let shared = shared(Duration::from_secs(1));
        let led = RecordingLed {
            fail_on: Some(1),
            ..Default::default()
        };
        let monitor = Monitor::new(&shared, &led, 1, Duration::ZERO);
        let mut source = ScriptedSource {
            script: VecDeque::from([NextRecord::Record(key(1))]),
        };
        let err = monitor.run(&mut source).unwrap_err();
        assert!(matches!(err, MonitorError::Backend { .. }), "{err}");
        assert!(!shared.lock().is_lit);
        // The keypress itself is still recorded.
        assert!(shared.lock().last_keypress.is_some());
    }

    #[test]
    fn stops_at_eof() {
        let shared = shared(Duration::from_secs(1));
        let led = RecordingLed::default();
        let monitor = Monitor::new(&shared, &led, 1, Duration::ZERO);
        let mut source = ScriptedSource {
            script: VecDeque::from([
                NextRecord::Record(key(1)),
                NextRecord::Timeout,
                NextRecord::Record(key(0)),
            ]),
        };
        monitor.run(&mut source).unwrap();
        assert_eq!(led.calls(), vec![1]);
    }

    #[test]
    fn checks_shutdown_before_waiting() {
        let flag = Arc::new(AtomicBool::new(true));
        let shared = Shared::new(Duration::from_secs(1), flag.clone());
        let led = RecordingLed::default();
        let monitor = Monitor::new(&shared, &led, 1, Duration::ZERO);
        let mut source = ScriptedSource {
            script: VecDeque::from([NextRecord::Record(key(1))]),
        };
        monitor.run(&mut source).unwrap();
        assert!(led.calls().is_empty());
        assert_eq!(source.script.len(), 1);
        assert!(flag.load(Ordering::SeqCst));
    }
}
