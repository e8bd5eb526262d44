//! Wires discovery, backend and the two loops together

use std::{
    path::PathBuf,
    sync::{atomic::AtomicBool, Arc},
    time::Duration,
};

use anyhow::Context;
use log::info;

use crate::{
    config::{BackendKind, Config, LEDS_CLASS},
    discovery,
    errors::DiscoveryError,
    input::{EvdevSource, RecordSource},
    led::{self, Brightness, LedBackend, LedTarget, OFF},
    monitor::Monitor,
    state::Shared,
    watcher::{IdleWatcher, POLL_INTERVAL},
};

/// How a run ended.
#[derive(Debug)]
pub(crate) enum ExitOutcome {
    Clean,
    Faulted(anyhow::Error),
}

impl From<anyhow::Result<()>> for ExitOutcome {
    fn from(result: anyhow::Result<()>) -> Self {
        match result {
            Ok(()) => ExitOutcome::Clean,
            Err(reason) => ExitOutcome::Faulted(reason),
        }
    }
}

/// Where discovery looks for devices.
#[derive(Debug, Clone)]
pub(crate) struct SearchPaths {
    pub input_devices: PathBuf,
    pub input_dir: PathBuf,
    pub leds_dir: PathBuf,
}

impl Default for SearchPaths {
    fn default() -> Self {
        Self {
            input_devices: discovery::INPUT_DEVICES.into(),
            input_dir: discovery::INPUT_DIR.into(),
            leds_dir: discovery::LEDS_DIR.into(),
        }
    }
}

/// Parameters of the two loops.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Timing {
    pub idle_threshold: Duration,
    pub on_brightness: Brightness,
    /// Watcher poll interval, also the longest input wait between shutdown
    /// checks.
    pub poll_interval: Duration,
}

/// Run the daemon until the input device goes away, a fatal error occurs,
/// or `shutdown` is set.
pub(crate) fn run(config: &Config, shutdown: Arc<AtomicBool>) -> ExitOutcome {
    start(config, &SearchPaths::default(), shutdown).into()
}

fn start(config: &Config, paths: &SearchPaths, shutdown: Arc<AtomicBool>) -> anyhow::Result<()> {
    let (input, target) = resolve(config, paths)?;
    info!("Using keyboard device: {}", input.display());
    info!("Using keyboard LED: {target}");

    let led: Arc<dyn LedBackend> =
        Arc::from(led::open(&target).context("Failed to set up LED backend")?);
    let mut source = EvdevSource::open(&input)?;
    supervise(
        led,
        &mut source,
        Timing {
            idle_threshold: config.idle_threshold,
            on_brightness: config.on_brightness,
            poll_interval: POLL_INTERVAL,
        },
        shutdown,
    )
}

/// Config overrides first, discovery for the rest.
fn resolve(config: &Config, paths: &SearchPaths) -> Result<(PathBuf, LedTarget), DiscoveryError> {
    let input = match &config.input_device {
        Some(path) => path.clone(),
        None => discovery::find_input_device(&paths.input_devices, &paths.input_dir)?,
    };
    let target = match &config.led_target {
        Some(target) => target.clone(),
        None => {
            let led = discovery::find_led_device(&paths.leds_dir)?;
            match config.backend {
                BackendKind::Sysfs => LedTarget::Path(led.brightness),
                BackendKind::Logind => LedTarget::Session {
                    class: LEDS_CLASS.to_owned(),
                    id: led.name,
                },
            }
        }
    };
    Ok((input, target))
}

/// Force the LED off, run the watcher in the background and the monitor
/// here. The watcher is always joined before returning.
fn supervise(
    led: Arc<dyn LedBackend>,
    source: &mut dyn RecordSource,
    timing: Timing,
    shutdown: Arc<AtomicBool>,
) -> anyhow::Result<()> {
    led.set_brightness(OFF)
        .context("Failed to turn LED off at startup")?;

    let shared = Arc::new(Shared::new(timing.idle_threshold, shutdown));
    let watcher = IdleWatcher::new(shared.clone(), led.clone(), timing.poll_interval)
        .spawn()
        .context("Failed to start idle watcher")?;

    let monitored = Monitor::new(&shared, led.as_ref(), timing.on_brightness, timing.poll_interval)
        .run(source);

    shared.request_shutdown();
    watcher.thread().unpark();
    if watcher.join().is_err() {
        anyhow::bail!("Idle watcher panicked");
    }
    info!("Exiting ...");

    if let Some(fault) = shared.lock().fault() {
        return Err(anyhow::Error::new(fault).context("Idle watcher failed"));
    }
    monitored.context("Input monitor failed")
}
