//! Locate the keyboard input device and its backlight LED

use std::fs;
use std::path::Path;
use std::path::PathBuf;

use log::debug;
use snafu::prelude::*;

use crate::errors::DiscoveryError;
use crate::errors::MalformedHandlersSnafu;
use crate::errors::NoKeyboardSnafu;
use crate::errors::NoLedSnafu;
use crate::errors::OpenLedDirSnafu;
use crate::errors::ReadDescriptorSnafu;

/// Kernel list of input devices.
pub(crate) const INPUT_DEVICES: &str = "/proc/bus/input/devices";
/// Where the event device nodes live.
pub(crate) const INPUT_DIR: &str = "/dev/input";
/// LED class directory.
pub(crate) const LEDS_DIR: &str = "/sys/class/leds";

/// `EV=` bitmask of a keyboard: EV_REP | EV_LED | EV_MSC | EV_KEY | EV_SYN.
/// Matched as an opaque string.
const KEYBOARD_EV_MASK: &str = "120013";

/// An LED found in the LED class directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct LedDevice {
    /// Directory entry name, also the logind device id.
    pub name: String,
    /// Path to the `brightness` file.
    pub brightness: PathBuf,
}

/// Find the event device of the first keyboard listed in `descriptor`.
pub(crate) fn find_input_device(
    descriptor: &Path,
    input_dir: &Path,
) -> Result<PathBuf, DiscoveryError> {
    let text = fs::read_to_string(descriptor).context(ReadDescriptorSnafu { path: descriptor })?;
    let event = keyboard_handler(&text)
        .context(NoKeyboardSnafu { path: descriptor })?
        .context(MalformedHandlersSnafu { path: descriptor })?;
    Ok(input_dir.join(event))
}

/// Scan the device list for a keyboard.
///
/// Returns `None` if no device has the keyboard bitmask, `Some(None)` if the
/// first one found has no usable `eventN` handler.
fn keyboard_handler(text: &str) -> Option<Option<&str>> {
    text.split("\n\n")
        .find(|record| record_field(record, "B: EV=").is_some_and(|ev| ev.trim() == KEYBOARD_EV_MASK))
        .map(|record| record_field(record, "H: Handlers=").and_then(event_handler))
}

/// Value of the line starting with `prefix`, without the prefix.
fn record_field<'a>(record: &'a str, prefix: &str) -> Option<&'a str> {
    record.lines().find_map(|line| line.strip_prefix(prefix))
}

/// The `eventN` token of a handler list. The kernel ends every handler with
/// a space; a token without one is considered truncated.
fn event_handler(handlers: &str) -> Option<&str> {
    let start = handlers.find("event")?;
    let rest = &handlers[start..];
    let end = rest.find(' ')?;
    Some(&rest[..end])
}

/// Find the first LED in `search_root` with `kbd_backlight` in its name.
pub(crate) fn find_led_device(search_root: &Path) -> Result<LedDevice, DiscoveryError> {
    let mut names = vec![];
    for entry in fs::read_dir(search_root).context(OpenLedDirSnafu { path: search_root })? {
        let entry = entry.context(OpenLedDirSnafu { path: search_root })?;
        let name = entry.file_name().to_string_lossy().into_owned();
        if name.contains("kbd_backlight") {
            names.push(name);
        }
    }
    // Directory order is arbitrary, pick deterministically.
    names.sort();
    if names.len() > 1 {
        debug!("Multiple kbd_backlights found, using the first of {names:?}");
    }
    let name = names
        .into_iter()
        .next()
        .context(NoLedSnafu { path: search_root })?;
    Ok(LedDevice {
        brightness: search_root.join(&name).join("brightness"),
        name,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const DEVICES: &str = "\
I: Bus=0019 Vendor=0000 Product=0001 Version=0000
N: Name=\"Power Button\"
P: Phys=LNXPWRBN/button/input0
S: Sysfs=/devices/LNXSYSTM:00/LNXPWRBN:00/input/input0
U: Uniq=
H: Handlers=kbd event0 
B: PROP=0
B: EV=3
B: KEY=10000000000000 0

I: Bus=0011 Vendor=0001 Product=0001 Version=ab54
N: Name=\"AT Translated Set 2 keyboard\"
P: Phys=isa0060/serio0/input0
S: Sysfs=/devices/platform/i8042/serio0/input/input3
U: Uniq=
H: Handlers=sysrq kbd leds event3 
B: PROP=0
B: EV=120013
B: KEY=402000000 3803078f800d001 feffffdfffefffff fffffffffffffffe
B: MSC=10
B: LED=7

";

    fn write_devices(text: &str) -> tempfile::NamedTempFile {
        let file = tempfile::NamedTempFile::new().unwrap();
        fs::write(file.path(), text).unwrap();
        file
    }

    #[test]
    fn finds_keyboard_event_device() {
        let file = write_devices(DEVICES);
        let path = find_input_device(file.path(), Path::new("/dev/input")).unwrap();
        assert_eq!(path, Path::new("/dev/input/event3"));
    }

    #[test]
    fn no_keyboard_bitmask() {
        let file = write_devices(&DEVICES.replace("EV=120013", "EV=17"));
        let err = find_input_device(file.path(), Path::new("/dev/input")).unwrap_err();
        assert!(matches!(err, DiscoveryError::NoKeyboard { .. }), "{err}");
    }

    #[test]
    fn bitmask_must_match_exactly() {
        assert_eq!(keyboard_handler(&DEVICES.replace("EV=120013", "EV=1200131")), None);
    }

    #[test]
    fn handler_without_event_is_malformed() {
        let file = write_devices(&DEVICES.replace("leds event3 ", "leds "));
        let err = find_input_device(file.path(), Path::new("/dev/input")).unwrap_err();
        assert!(matches!(err, DiscoveryError::MalformedHandlers { .. }), "{err}");
    }

    #[test]
    fn unterminated_event_handler_is_malformed() {
        assert_eq!(
            keyboard_handler(&DEVICES.replace("leds event3 ", "leds event3")),
            Some(None)
        );
    }

    #[test]
    fn unreadable_descriptor() {
        let dir = tempfile::tempdir().unwrap();
        let err = find_input_device(&dir.path().join("devices"), Path::new("/dev/input")).unwrap_err();
        assert!(matches!(err, DiscoveryError::ReadDescriptor { .. }), "{err}");
    }

    #[test]
    fn finds_kbd_backlight() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["input3::capslock", "tpacpi::kbd_backlight", "platform::mute"] {
            fs::create_dir(dir.path().join(name)).unwrap();
        }
        let led = find_led_device(dir.path()).unwrap();
        assert_eq!(led.name, "tpacpi::kbd_backlight");
        assert_eq!(
            led.brightness,
            dir.path().join("tpacpi::kbd_backlight").join("brightness")
        );
    }

    #[test]
    fn picks_first_kbd_backlight_by_name() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["zz::kbd_backlight", "asus::kbd_backlight"] {
            fs::create_dir(dir.path().join(name)).unwrap();
        }
        assert_eq!(find_led_device(dir.path()).unwrap().name, "asus::kbd_backlight");
    }

    #[test]
    fn no_kbd_backlight() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir(dir.path().join("input3::capslock")).unwrap();
        let err = find_led_device(dir.path()).unwrap_err();
        assert!(matches!(err, DiscoveryError::NoLed { .. }), "{err}");
    }

    #[test]
    fn missing_led_dir() {
        let dir = tempfile::tempdir().unwrap();
        let err = find_led_device(&dir.path().join("leds")).unwrap_err();
        assert!(matches!(err, DiscoveryError::OpenLedDir { .. }), "{err}");
    }
}
