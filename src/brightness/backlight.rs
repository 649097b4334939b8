//! Brightness control through the kernel backlight class.
//!
//! Each directory under the backlight root is one device exposing
//! `max_brightness`, `actual_brightness` and a writable `brightness` file.

use super::BrightnessBackend;
use crate::{policy::BrightnessLevel, Error, Result};
use log::{debug, warn};
use std::fs;
use std::path::{Path, PathBuf};

const FILE_MAX_BRIGHTNESS: &str = "max_brightness";
const FILE_ACTUAL_BRIGHTNESS: &str = "actual_brightness";
// amdgpu reports actual_brightness on a different scale than max_brightness
const FILE_BRIGHTNESS: &str = "brightness";

/// Backend writing to every device under a backlight root directory
pub struct BacklightBackend {
    root: PathBuf,
}

impl BacklightBackend {
    /// Create a backend for a backlight root such as `/sys/class/backlight`
    #[must_use]
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    /// Device directories, sorted by name
    ///
    /// # Errors
    ///
    /// Returns [`Error::Backend`] if the root cannot be listed or holds no device.
    pub fn devices(&self) -> Result<Vec<PathBuf>> {
        let entries = fs::read_dir(&self.root)
            .map_err(|e| Error::Backend(format!("Cannot list {}: {e}", self.root.display())))?;

        let mut devices: Vec<PathBuf> = entries
            .filter_map(std::result::Result::ok)
            .map(|entry| entry.path())
            .filter(|path| path.join(FILE_MAX_BRIGHTNESS).exists())
            .collect();
        devices.sort();

        if devices.is_empty() {
            return Err(Error::Backend(format!(
                "No backlight device under {}",
                self.root.display()
            )));
        }
        Ok(devices)
    }

    /// Current level of every device
    ///
    /// # Errors
    ///
    /// Returns [`Error::Backend`] if a device cannot be read.
    pub fn levels(&self) -> Result<Vec<BrightnessLevel>> {
        self.devices()?
            .iter()
            .map(|device| {
                let max = read_value(&device.join(FILE_MAX_BRIGHTNESS))?;
                let current = read_current(device)?;
                Ok(to_level(current, max))
            })
            .collect()
    }
}

impl BrightnessBackend for BacklightBackend {
    fn current_brightness(&mut self) -> Result<BrightnessLevel> {
        self.levels()?
            .first()
            .copied()
            .ok_or_else(|| Error::Backend("No backlight level available".to_string()))
    }

    fn apply(&mut self, level: BrightnessLevel) -> Result<()> {
        for device in self.devices()? {
            let max = read_value(&device.join(FILE_MAX_BRIGHTNESS))?;
            let raw = to_raw(level, max);
            debug!("Writing {} to {}", raw, device.display());
            fs::write(device.join(FILE_BRIGHTNESS), raw.to_string()).map_err(|e| {
                Error::Backend(format!("Cannot set brightness of {}: {e}", device.display()))
            })?;
        }
        Ok(())
    }

    fn name(&self) -> &str {
        "backlight"
    }
}

fn read_value(path: &Path) -> Result<u64> {
    let content = fs::read_to_string(path)
        .map_err(|e| Error::Backend(format!("Cannot read {}: {e}", path.display())))?;
    content
        .trim()
        .parse()
        .map_err(|e| Error::Backend(format!("Bad value in {}: {e}", path.display())))
}

fn read_current(device: &Path) -> Result<u64> {
    let actual = device.join(FILE_ACTUAL_BRIGHTNESS);
    let is_amd = device
        .file_name()
        .and_then(|n| n.to_str())
        .is_some_and(|n| n.starts_with("amdgpu"));

    if actual.exists() && !is_amd {
        read_value(&actual)
    } else {
        read_value(&device.join(FILE_BRIGHTNESS))
    }
}

#[allow(clippy::cast_possible_truncation)] // percent <= 100 after clamp
fn to_level(raw: u64, max: u64) -> BrightnessLevel {
    if max == 0 {
        warn!("Backlight reports max_brightness 0");
        return BrightnessLevel::MAX;
    }
    let percent = (raw.min(max) * 100 + max / 2) / max;
    BrightnessLevel::saturating(percent as u32)
}

fn to_raw(level: BrightnessLevel, max: u64) -> u64 {
    (u64::from(level.percent()) * max + 50) / 100
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fake_device(root: &Path, name: &str, current: u64, max: u64) {
        let dir = root.join(name);
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join(FILE_MAX_BRIGHTNESS), format!("{max}\n")).unwrap();
        fs::write(dir.join(FILE_ACTUAL_BRIGHTNESS), format!("{current}\n")).unwrap();
        fs::write(dir.join(FILE_BRIGHTNESS), format!("{current}\n")).unwrap();
    }

    #[test]
    fn test_scaling() {
        assert_eq!(to_level(24000, 48000).percent(), 50);
        assert_eq!(to_level(48000, 48000).percent(), 100);
        assert_eq!(to_level(0, 255).percent(), 0);
        assert_eq!(to_raw(BrightnessLevel::new(50).unwrap(), 255), 128);
        assert_eq!(to_raw(BrightnessLevel::new(1).unwrap(), 19200), 192);
    }

    #[test]
    fn test_first_device_is_representative() {
        let tmp = tempfile::tempdir().unwrap();
        fake_device(tmp.path(), "acpi_video0", 10, 10);
        fake_device(tmp.path(), "intel_backlight", 4800, 19200);

        let mut backend = BacklightBackend::new(tmp.path());
        let levels = backend.levels().unwrap();
        assert_eq!(levels.len(), 2);
        assert_eq!(backend.current_brightness().unwrap().percent(), 100);
    }

    #[test]
    fn test_apply_writes_every_device() {
        let tmp = tempfile::tempdir().unwrap();
        fake_device(tmp.path(), "a", 100, 100);
        fake_device(tmp.path(), "b", 255, 255);

        let mut backend = BacklightBackend::new(tmp.path());
        backend.apply(BrightnessLevel::new(20).unwrap()).unwrap();

        let a = fs::read_to_string(tmp.path().join("a").join(FILE_BRIGHTNESS)).unwrap();
        let b = fs::read_to_string(tmp.path().join("b").join(FILE_BRIGHTNESS)).unwrap();
        assert_eq!(a, "20");
        assert_eq!(b, "51");
    }

    #[test]
    fn test_missing_root_is_backend_error() {
        let mut backend = BacklightBackend::new("/nonexistent/miyobi/backlight");
        assert!(matches!(backend.current_brightness(), Err(Error::Backend(_))));
        assert!(matches!(
            backend.apply(BrightnessLevel::MAX),
            Err(Error::Backend(_))
        ));
    }

    #[test]
    fn test_empty_root_is_backend_error() {
        let tmp = tempfile::tempdir().unwrap();
        let backend = BacklightBackend::new(tmp.path());
        assert!(backend.devices().is_err());
    }
}
