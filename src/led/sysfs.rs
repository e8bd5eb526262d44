//! LED in /sys, written directly

use std::{fs::OpenOptions, io::Write, path::PathBuf};

use log::info;
use snafu::ResultExt;

use crate::errors::{
    is_permission_denied, running_as_root, BackendError, IoSnafu, PermissionSnafu,
};

use super::{Brightness, LedBackend};

#[derive(Debug)]
pub(crate) struct SysfsLed {
    /// Path to the `brightness` file
    path: PathBuf,
}

impl SysfsLed {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }
}

impl LedBackend for SysfsLed {
    fn set_brightness(&self, value: Brightness) -> Result<(), BackendError> {
        info!("Setting LED to {value}");
        let mut f = match OpenOptions::new().write(true).open(&self.path) {
            Ok(f) => f,
            Err(e) if is_permission_denied(&e, running_as_root()) => {
                return Err(e).context(PermissionSnafu { path: &self.path })
            }
            Err(e) => return Err(e).context(IoSnafu { path: &self.path }),
        };
        write!(f, "{value}").context(IoSnafu { path: &self.path })?;
        Ok(())
    }
}
