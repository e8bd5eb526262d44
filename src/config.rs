//! Validated daemon configuration

use std::{path::PathBuf, time::Duration};

use crate::{
    errors::{ConfigError, SessionSpecSnafu},
    flags::Cli,
    led::{Brightness, LedTarget},
};

/// logind subsystem of keyboard backlights.
pub(crate) const LEDS_CLASS: &str = "leds";

/// How to reach a discovered LED.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub(crate) enum BackendKind {
    #[default]
    Sysfs,
    Logind,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Config {
    pub idle_threshold: Duration,
    pub on_brightness: Brightness,
    /// Input device, discovered if `None`.
    pub input_device: Option<PathBuf>,
    /// LED, discovered if `None`.
    pub led_target: Option<LedTarget>,
    /// Backend used for a discovered LED.
    pub backend: BackendKind,
    pub debug: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            idle_threshold: Duration::from_secs(15),
            on_brightness: 1,
            input_device: None,
            led_target: None,
            backend: BackendKind::Sysfs,
            debug: false,
        }
    }
}

impl TryFrom<Cli> for Config {
    type Error = ConfigError;

    fn try_from(cli: Cli) -> Result<Self, Self::Error> {
        let led_target = match (cli.led, cli.session_led) {
            (Some(path), _) => Some(sysfs_target(path)),
            (None, Some(spec)) => Some(parse_session_led(&spec)?),
            (None, None) => None,
        };
        Ok(Self {
            idle_threshold: Duration::from_secs(cli.timeout),
            on_brightness: cli.brightness,
            input_device: cli.input,
            led_target,
            backend: if cli.logind {
                BackendKind::Logind
            } else {
                BackendKind::Sysfs
            },
            debug: cli.debug,
        })
    }
}

/// Accept both an LED directory and its `brightness` file.
fn sysfs_target(path: PathBuf) -> LedTarget {
    if path.is_dir() {
        LedTarget::Path(path.join("brightness"))
    } else {
        LedTarget::Path(path)
    }
}

/// Parse `CLASS:ID`. Only the first colon separates, LED names contain `::`.
fn parse_session_led(spec: &str) -> Result<LedTarget, ConfigError> {
    match spec.split_once(':') {
        Some((class, id)) if !class.is_empty() && !id.is_empty() => Ok(LedTarget::Session {
            class: class.to_owned(),
            id: id.to_owned(),
        }),
        _ => SessionSpecSnafu { spec }.fail(),
    }
}
