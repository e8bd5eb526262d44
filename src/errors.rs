//! Error types

use std::path::PathBuf;

use snafu::{prelude::*, Backtrace};

/// Failure to locate the keyboard or its LED at startup.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub(crate) enum DiscoveryError {
    #[snafu(display("Failed to read input device list {}: {source}", path.display()))]
    ReadDescriptor {
        path: PathBuf,
        source: std::io::Error,
        backtrace: Backtrace,
    },
    #[snafu(display("No keyboard found in {}", path.display()))]
    NoKeyboard { path: PathBuf },
    #[snafu(display("Malformed handler list for keyboard in {}", path.display()))]
    MalformedHandlers { path: PathBuf },
    #[snafu(display("Failed to open LED directory {}: {source}", path.display()))]
    OpenLedDir {
        path: PathBuf,
        source: std::io::Error,
        backtrace: Backtrace,
    },
    #[snafu(display("No kbd_backlight found in {}. Please specify one explicitly.", path.display()))]
    NoLed { path: PathBuf },
}

/// Failure to change the LED brightness.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub(crate) enum BackendError {
    #[snafu(display(
        "You do not have access to {}: {source}. Try running as root instead.",
        path.display()
    ))]
    Permission {
        path: PathBuf,
        source: std::io::Error,
        backtrace: Backtrace,
    },
    #[snafu(display("IO error writing LED {}: {source}", path.display()))]
    Io {
        path: PathBuf,
        source: std::io::Error,
        backtrace: Backtrace,
    },
    #[snafu(display("Session bus error setting {class}/{id}: {source}"))]
    Bus {
        class: String,
        id: String,
        source: zbus::Error,
        backtrace: Backtrace,
    },
}

/// Failure on the keyboard input device.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub(crate) enum InputError {
    #[snafu(display(
        "You do not have access to {}: {source}. Try running as root instead.",
        path.display()
    ))]
    InputPermission {
        path: PathBuf,
        source: std::io::Error,
        backtrace: Backtrace,
    },
    #[snafu(display("Failed to open {}: {source}", path.display()))]
    InputOpen {
        path: PathBuf,
        source: std::io::Error,
        backtrace: Backtrace,
    },
    #[snafu(display("Error reading {}: {source}", path.display()))]
    InputRead {
        path: PathBuf,
        source: std::io::Error,
        backtrace: Backtrace,
    },
    #[snafu(display("Polling error on {}: {source}", path.display()))]
    InputPoll {
        path: PathBuf,
        source: nix::Error,
        backtrace: Backtrace,
    },
}

/// Why the input monitor stopped.
#[derive(Debug, Snafu)]
pub(crate) enum MonitorError {
    #[snafu(transparent)]
    Input { source: InputError },
    #[snafu(transparent)]
    Backend { source: BackendError },
}

/// Invalid command line options.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub(crate) enum ConfigError {
    #[snafu(display("Invalid session LED {spec:?}: expected CLASS:ID, e.g. leds:tpacpi::kbd_backlight"))]
    SessionSpec { spec: String },
}

/// True if a permission failure should come with the "run as root" hint.
pub(crate) fn is_permission_denied(err: &std::io::Error, is_root: bool) -> bool {
    err.kind() == std::io::ErrorKind::PermissionDenied && !is_root
}

pub(crate) fn running_as_root() -> bool {
    nix::unistd::geteuid().is_root()
}

#[cfg(test)]
mod tests {
    use std::io::{Error, ErrorKind};

    use super::*;

    #[test]
    fn permission_hint_only_for_unprivileged_denial() {
        let denied = Error::from(ErrorKind::PermissionDenied);
        let missing = Error::from(ErrorKind::NotFound);
        assert!(is_permission_denied(&denied, false));
        assert!(!is_permission_denied(&denied, true));
        assert!(!is_permission_denied(&missing, false));
        assert!(!is_permission_denied(&missing, true));
    }
}
