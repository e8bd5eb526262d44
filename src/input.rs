//! Input records and the evdev device they are read from

use std::{
    collections::VecDeque,
    fs::{File, OpenOptions},
    os::{fd::AsFd, unix::fs::OpenOptionsExt},
    path::{Path, PathBuf},
    time::Duration,
};

use evdev_rs::{util::event_code_to_int, Device, DeviceWrapper, InputEvent, ReadFlag};
use log::debug;
use nix::{
    errno::Errno,
    fcntl::OFlag,
    poll::{poll, PollFd, PollFlags, PollTimeout},
};
use snafu::ResultExt;

use crate::errors::{
    is_permission_denied, running_as_root, InputError, InputOpenSnafu, InputPermissionSnafu,
    InputPollSnafu, InputReadSnafu,
};

/// Event group of key events (`EV_KEY` in linux/input-event-codes.h).
pub(crate) const EV_KEY: u16 = 0x01;

/// One event as delivered by the kernel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct InputRecord {
    /// Event group
    pub kind: u16,
    /// Specific event within the group, e.g. which key
    pub code: u16,
    /// For keys: 1 = press, 0 = release, 2 = autorepeat
    pub value: i32,
    /// Kernel timestamp. Not monotonic, only for logging.
    pub time: Duration,
}

impl InputRecord {
    /// Only key-down matters. Release, autorepeat and other groups are all
    /// treated as "not a keypress".
    pub(crate) fn is_key_down(&self) -> bool {
        self.kind == EV_KEY && self.value == 1
    }
}

impl From<&InputEvent> for InputRecord {
    fn from(ev: &InputEvent) -> Self {
        let (kind, code) = event_code_to_int(&ev.event_code);
        let secs = u64::try_from(ev.time.tv_sec).unwrap_or_default();
        let micros = u64::try_from(ev.time.tv_usec).unwrap_or_default();
        Self {
            kind: kind as u16,
            code: code as u16,
            value: ev.value,
            time: Duration::from_secs(secs) + Duration::from_micros(micros),
        }
    }
}

/// Result of waiting for the next record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum NextRecord {
    Record(InputRecord),
    /// Nothing arrived within the wait, or the wait was interrupted.
    Timeout,
    /// The source is gone (device unplugged).
    Eof,
}

/// Supplier of input records.
pub(crate) trait RecordSource {
    /// Wait at most `wait` for the next record.
    fn next_record(&mut self, wait: Duration) -> Result<NextRecord, InputError>;
}

/// Handler for /dev/input/eventN
#[derive(Debug)]
pub(crate) struct EvdevSource {
    path: PathBuf,
    dev: Device,
    /// Events read from the device but not yet handed out.
    pending: VecDeque<InputRecord>,
    /// Device reported ENODEV.
    gone: bool,
}

enum Readiness {
    Readable,
    Timeout,
    Hangup,
}

impl EvdevSource {
    pub(crate) fn open(path: &Path) -> Result<Self, InputError> {
        // Non-blocking so that a read never outlives the poll timeout.
        let file: File = match OpenOptions::new()
            .read(true)
            .custom_flags(OFlag::O_NONBLOCK.bits())
            .open(path)
        {
            Ok(f) => f,
            Err(e) if is_permission_denied(&e, running_as_root()) => {
                return Err(e).context(InputPermissionSnafu { path })
            }
            Err(e) => return Err(e).context(InputOpenSnafu { path }),
        };
        let dev = Device::new_from_file(file).context(InputOpenSnafu { path })?;
        debug!("Opened {} ({:?})", path.display(), dev.name());
        Ok(Self {
            path: path.to_path_buf(),
            dev,
            pending: VecDeque::new(),
            gone: false,
        })
    }

    fn wait_readable(&self, wait: Duration) -> Result<Readiness, InputError> {
        let timeout = PollTimeout::from(u16::try_from(wait.as_millis()).unwrap_or(u16::MAX));
        let mut fds = [PollFd::new(self.dev.file().as_fd(), PollFlags::POLLIN)];
        match poll(&mut fds, timeout) {
            Ok(0) | Err(Errno::EINTR) => return Ok(Readiness::Timeout),
            Ok(_) => (),
            Err(e) => return Err(e).context(InputPollSnafu { path: &self.path }),
        }
        let revents = fds[0].revents().unwrap_or(PollFlags::empty());
        if revents.contains(PollFlags::POLLIN) {
            Ok(Readiness::Readable)
        } else if revents.intersects(PollFlags::POLLHUP | PollFlags::POLLERR | PollFlags::POLLNVAL) {
            Ok(Readiness::Hangup)
        } else {
            Ok(Readiness::Timeout)
        }
    }

    /// Move everything libevdev can give us without blocking into `pending`.
    fn drain(&mut self) -> Result<(), InputError> {
        loop {
            match self.dev.next_event(ReadFlag::NORMAL) {
                Ok((_, ev)) => self.pending.push_back(InputRecord::from(&ev)),
                Err(e) if e.kind() == std::io::ErrorKind::WouldBlock => return Ok(()),
                Err(e) if e.raw_os_error() == Some(Errno::ENODEV as i32) => {
                    self.gone = true;
                    return Ok(());
                }
                Err(e) => return Err(e).context(InputReadSnafu { path: &self.path }),
            }
        }
    }
}

impl RecordSource for EvdevSource {
    fn next_record(&mut self, wait: Duration) -> Result<NextRecord, InputError> {
        if let Some(record) = self.pending.pop_front() {
            return Ok(NextRecord::Record(record));
        }
        if self.gone {
            return Ok(NextRecord::Eof);
        }
        match self.wait_readable(wait)? {
            Readiness::Timeout => return Ok(NextRecord::Timeout),
            Readiness::Hangup => return Ok(NextRecord::Eof),
            Readiness::Readable => self.drain()?,
        }
        Ok(match self.pending.pop_front() {
            Some(record) => NextRecord::Record(record),
            None if self.gone => NextRecord::Eof,
            None => NextRecord::Timeout,
        })
    }
}
