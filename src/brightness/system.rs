//! Brightness control through the operating system's display API.
//!
//! Uses the `brightness` crate: logind and the backlight class on Linux, the
//! monitor configuration API on Windows. Every display is one device.

use super::BrightnessBackend;
use crate::{policy::BrightnessLevel, Error, Result};
use brightness::blocking::{brightness_devices, Brightness, BlockingDevice};
use log::debug;

/// Backend driving every display the OS reports
#[derive(Debug, Default)]
pub struct SystemBackend;

impl SystemBackend {
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Displays currently known to the OS
    ///
    /// # Errors
    ///
    /// Returns [`Error::Backend`] if enumeration fails or no display supports brightness.
    pub fn devices(&self) -> Result<Vec<BlockingDevice>> {
        let devices = brightness_devices()
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(|e| Error::Backend(format!("Cannot enumerate displays: {e}")))?;

        if devices.is_empty() {
            return Err(Error::Backend("No display with brightness control".to_string()));
        }
        Ok(devices)
    }

    /// Current level of every display, in enumeration order
    ///
    /// # Errors
    ///
    /// Returns [`Error::Backend`] if a display cannot be read.
    pub fn levels(&self) -> Result<Vec<BrightnessLevel>> {
        self.devices()?
            .iter()
            .map(|device| {
                device
                    .get()
                    .map(BrightnessLevel::saturating)
                    .map_err(|e| Error::Backend(format!("Cannot read brightness: {e}")))
            })
            .collect()
    }
}

impl BrightnessBackend for SystemBackend {
    fn current_brightness(&mut self) -> Result<BrightnessLevel> {
        representative(&self.levels()?)
    }

    fn apply(&mut self, level: BrightnessLevel) -> Result<()> {
        for device in self.devices()? {
            let name = device.device_name().unwrap_or_else(|_| "display".to_string());
            debug!("Setting {} to {}", name, level);
            device
                .set(u32::from(level.percent()))
                .map_err(|e| Error::Backend(format!("Cannot set brightness of {name}: {e}")))?;
        }
        Ok(())
    }

    fn name(&self) -> &str {
        "system"
    }
}

/// The first display's level stands for all of them
fn representative(levels: &[BrightnessLevel]) -> Result<BrightnessLevel> {
    levels
        .first()
        .copied()
        .ok_or_else(|| Error::Backend("No display brightness available".to_string()))
}
