//! Command line arguments
use std::path::PathBuf;

#[derive(Debug, clap::Parser)]
#[command(version, about, long_about = None)]
/// Keyboard backlight daemon. Lights the keyboard while typing and turns it
/// off after a timeout
pub struct Cli {
    /// Seconds without a keypress before the backlight is turned off.
    #[clap(short, long, default_value_t = 15)]
    pub timeout: u64,
    /// Brightness to use while typing.
    #[clap(short, long, default_value_t = 1)]
    pub brightness: u32,
    /// Keyboard evdev device to monitor, e.g. /dev/input/event3. Found
    /// automatically if not given.
    #[clap(short, long)]
    pub input: Option<PathBuf>,
    /// LED to control: its directory in /sys/class/leds or its brightness
    /// file. Found automatically if not given.
    #[clap(short, long, conflicts_with = "session_led")]
    pub led: Option<PathBuf>,
    /// LED to control through logind, as CLASS:ID (e.g.
    /// leds:tpacpi::kbd_backlight).
    #[clap(short, long)]
    pub session_led: Option<String>,
    /// Set the brightness through logind instead of writing to sysfs. Works
    /// without root from inside a user session.
    #[clap(long, conflicts_with = "led")]
    pub logind: bool,
    /// Enable debug output
    #[clap(short = 'D', long, short_alias = 'v', alias = "verbose")]
    pub debug: bool,
}
