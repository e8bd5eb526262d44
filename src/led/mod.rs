//! Abstraction for the keyboard LED
//!
//! Brightness 0 is off for every backend; any other value is passed through
//! as is.

use std::{fmt, path::PathBuf};

use crate::errors::BackendError;

pub(crate) use logind::LogindLed;
pub(crate) use sysfs::SysfsLed;

mod logind;
mod sysfs;

/// Brightness value. 0 is off.
pub(crate) type Brightness = u32;

/// Brightness that means off.
pub(crate) const OFF: Brightness = 0;

/// Where and how the LED is controlled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum LedTarget {
    /// Direct write to a `brightness` file in sysfs.
    Path(PathBuf),
    /// Device known to logind, changed through the session bus.
    Session { class: String, id: String },
}

impl fmt::Display for LedTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LedTarget::Path(path) => write!(f, "{}", path.display()),
            LedTarget::Session { class, id } => write!(f, "logind {class}:{id}"),
        }
    }
}

/// Something that can change the LED brightness.
pub(crate) trait LedBackend: Send + Sync {
    /// Apply `value` right away. No caching, every call reaches the device.
    fn set_brightness(&self, value: Brightness) -> Result<(), BackendError>;
}

/// Build the backend for a target.
pub(crate) fn open(target: &LedTarget) -> Result<Box<dyn LedBackend>, BackendError> {
    Ok(match target {
        LedTarget::Path(path) => Box::new(SysfsLed::new(path.clone())),
        LedTarget::Session { class, id } => Box::new(LogindLed::connect(class, id)?),
    })
}
