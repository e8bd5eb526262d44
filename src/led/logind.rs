//! LED changed through systemd-logind
//!
//! `SetBrightness` is allowed for the active session user without further
//! privileges, so this works for a daemon started from the user session.

use log::info;
use snafu::ResultExt;
use zbus::blocking::Connection;

use crate::errors::{BackendError, BusSnafu};

use super::{Brightness, LedBackend};

/// D-Bus proxy for the caller's own logind session.
#[zbus::proxy(
    interface = "org.freedesktop.login1.Session",
    default_service = "org.freedesktop.login1",
    default_path = "/org/freedesktop/login1/session/auto"
)]
trait Login1Session {
    /// Set brightness of device `name` in `subsystem` (e.g. "leds").
    fn set_brightness(&self, subsystem: &str, name: &str, brightness: u32) -> zbus::Result<()>;
}

pub(crate) struct LogindLed {
    session: Login1SessionProxyBlocking<'static>,
    class: String,
    id: String,
}

impl std::fmt::Debug for LogindLed {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LogindLed")
            .field("class", &self.class)
            .field("id", &self.id)
            .finish_non_exhaustive()
    }
}

impl LogindLed {
    /// Connect to the system bus. Fails if it can't be reached.
    pub fn connect(class: &str, id: &str) -> Result<Self, BackendError> {
        let context = || BusSnafu { class, id };
        let conn = Connection::system().with_context(|_| context())?;
        let session = Login1SessionProxyBlocking::new(&conn).with_context(|_| context())?;
        Ok(Self {
            session,
            class: class.to_owned(),
            id: id.to_owned(),
        })
    }
}

impl LedBackend for LogindLed {
    fn set_brightness(&self, value: Brightness) -> Result<(), BackendError> {
        info!("Setting LED to {value}");
        self.session
            .set_brightness(&self.class, &self.id, value)
            .context(BusSnafu {
                class: &self.class,
                id: &self.id,
            })
    }
}
