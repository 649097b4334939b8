//! Display brightness backends.
//!
//! Implementations behind [`BrightnessBackend`]: a command-line utility on
//! Linux, the OS display API (Linux and Windows), and on Linux the kernel
//! backlight class directly. [`create_backend`] resolves one of them once at
//! startup.

/// Command-line utility backend (`brightnessctl`)
pub mod command;

/// OS display API backend
#[cfg(any(target_os = "linux", target_os = "windows"))]
pub mod system;

/// Kernel backlight class backend
#[cfg(target_os = "linux")]
pub mod backlight;

use crate::{
    config::BackendConfig,
    constants::FALLBACK_NORMAL_LEVEL,
    policy::BrightnessLevel,
    Error, Result,
};
use log::{info, warn};
use std::str::FromStr;

#[cfg(target_os = "linux")]
pub use backlight::BacklightBackend;
pub use command::CommandLineBackend;
#[cfg(any(target_os = "linux", target_os = "windows"))]
pub use system::SystemBackend;

/// Trait for all brightness backends
pub trait BrightnessBackend {
    /// Read the current brightness
    ///
    /// # Errors
    ///
    /// Returns [`Error::Backend`] if the level cannot be read.
    fn current_brightness(&mut self) -> Result<BrightnessLevel>;

    /// Set the brightness
    ///
    /// # Errors
    ///
    /// Returns [`Error::Backend`] if the level could not be applied.
    fn apply(&mut self, level: BrightnessLevel) -> Result<()>;

    /// Backend name for log output
    fn name(&self) -> &str;
}

/// Operating system family the backend is selected for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Platform {
    /// Linux with a POSIX userland
    Linux,
    /// Windows
    Windows,
    /// Anything else
    Other,
}

impl Platform {
    /// Platform of the running binary
    #[must_use]
    pub const fn detect() -> Self {
        if cfg!(target_os = "linux") {
            Self::Linux
        } else if cfg!(target_os = "windows") {
            Self::Windows
        } else {
            Self::Other
        }
    }
}

/// Which backend to use
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BackendKind {
    /// Command-line utility on Linux, OS display API elsewhere
    #[default]
    Auto,
    /// External brightness utility
    CommandLine,
    /// OS display API
    System,
    /// Kernel backlight class (Linux only)
    Backlight,
}

impl FromStr for BackendKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "auto" => Ok(Self::Auto),
            "command" | "cli" | "brightnessctl" => Ok(Self::CommandLine),
            "system" | "api" => Ok(Self::System),
            "backlight" | "sysfs" => Ok(Self::Backlight),
            _ => Err(Error::ConfigError(format!("Unknown brightness backend: {s}"))),
        }
    }
}

impl BackendKind {
    /// Resolve `Auto` against a platform
    #[must_use]
    pub const fn resolve(self, platform: Platform) -> Self {
        match (self, platform) {
            (Self::Auto, Platform::Linux) => Self::CommandLine,
            (Self::Auto, Platform::Windows | Platform::Other) => Self::System,
            (kind, _) => kind,
        }
    }
}

/// Create the brightness backend for a platform
///
/// # Errors
///
/// Returns [`Error::ConfigError`] if the configured backend name is unknown
/// or the backend is not available on the build target.
pub fn create_backend(config: &BackendConfig, platform: Platform) -> Result<Box<dyn BrightnessBackend>> {
    let kind = config.kind.parse::<BackendKind>()?.resolve(platform);
    let backend: Box<dyn BrightnessBackend> = match kind {
        BackendKind::CommandLine | BackendKind::Auto => Box::new(CommandLineBackend::new(&config.command)),
        BackendKind::System => system_backend()?,
        BackendKind::Backlight => backlight_backend(config)?,
    };
    info!("Using {} brightness backend ({:?})", backend.name(), platform);
    Ok(backend)
}

#[cfg(any(target_os = "linux", target_os = "windows"))]
fn system_backend() -> Result<Box<dyn BrightnessBackend>> {
    Ok(Box::new(SystemBackend::new()))
}

#[cfg(not(any(target_os = "linux", target_os = "windows")))]
fn system_backend() -> Result<Box<dyn BrightnessBackend>> {
    Err(Error::ConfigError(
        "No display brightness API on this platform, use the command backend".to_string(),
    ))
}

#[cfg(target_os = "linux")]
fn backlight_backend(config: &BackendConfig) -> Result<Box<dyn BrightnessBackend>> {
    Ok(Box::new(BacklightBackend::new(&config.backlight_path)))
}

#[cfg(not(target_os = "linux"))]
fn backlight_backend(_config: &BackendConfig) -> Result<Box<dyn BrightnessBackend>> {
    Err(Error::ConfigError(
        "The backlight backend is only available on Linux".to_string(),
    ))
}

/// Read the brightness to restore when the user sits back, falling back to 100%
pub fn seed_normal_level(backend: &mut dyn BrightnessBackend) -> BrightnessLevel {
    match backend.current_brightness() {
        Ok(level) => {
            info!("Normal brightness is {}", level);
            level
        }
        Err(e) => {
            warn!("Could not read current brightness ({e}), assuming {FALLBACK_NORMAL_LEVEL}%");
            BrightnessLevel::saturating(u32::from(FALLBACK_NORMAL_LEVEL))
        }
    }
}
