//! Brightness control through an external command-line utility.

use super::BrightnessBackend;
use crate::{policy::BrightnessLevel, Error, Result};
use log::debug;
use std::process::{Command, Output};

/// Backend that runs `brightnessctl` (or a compatible program)
pub struct CommandLineBackend {
    program: String,
}

impl CommandLineBackend {
    /// Create a backend for the given program name or path
    #[must_use]
    pub fn new(program: &str) -> Self {
        Self {
            program: program.to_string(),
        }
    }

    fn run(&self, args: &[&str]) -> Result<Output> {
        debug!("Running {} {}", self.program, args.join(" "));
        let output = Command::new(&self.program)
            .args(args)
            .output()
            .map_err(|e| Error::Backend(format!("Failed to run {}: {e}", self.program)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(Error::Backend(format!(
                "{} exited with {}: {}",
                self.program,
                output.status,
                stderr.trim()
            )));
        }

        Ok(output)
    }
}

impl BrightnessBackend for CommandLineBackend {
    fn current_brightness(&mut self) -> Result<BrightnessLevel> {
        let output = self.run(&["-m"])?;
        parse_machine_output(&String::from_utf8_lossy(&output.stdout))
    }

    fn apply(&mut self, level: BrightnessLevel) -> Result<()> {
        let value = format!("{}%", level.percent());
        self.run(&["s", &value])?;
        Ok(())
    }

    fn name(&self) -> &str {
        std::path::Path::new(&self.program)
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or(&self.program)
    }
}

/// Parse `brightnessctl -m` output
///
/// The first line looks like `intel_backlight,backlight,19200,40%,48000`;
/// the fourth field is the current percentage.
///
/// # Errors
///
/// Returns [`Error::Backend`] if the line does not have a percentage field.
pub fn parse_machine_output(output: &str) -> Result<BrightnessLevel> {
    let line = output
        .lines()
        .find(|l| !l.trim().is_empty())
        .ok_or_else(|| Error::Backend("Empty brightnessctl output".to_string()))?;

    let percent = line
        .split(',')
        .nth(3)
        .and_then(|field| field.trim().strip_suffix('%'))
        .and_then(|p| p.parse::<u32>().ok())
        .ok_or_else(|| Error::Backend(format!("Unexpected brightnessctl output: {line}")))?;

    Ok(BrightnessLevel::saturating(percent))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_machine_output() {
        let level = parse_machine_output("intel_backlight,backlight,19200,40%,48000\n").unwrap();
        assert_eq!(level.percent(), 40);
    }

    #[test]
    fn test_parse_first_device_only() {
        let out = "amdgpu_bl0,backlight,255,100%,255\nacpi_video0,backlight,5,50%,10\n";
        assert_eq!(parse_machine_output(out).unwrap().percent(), 100);
    }

    #[test]
    fn test_parse_garbage() {
        assert!(parse_machine_output("").is_err());
        assert!(parse_machine_output("device,class,12").is_err());
        assert!(parse_machine_output("device,class,12,abc%,100").is_err());
    }

    #[test]
    fn test_name_strips_path() {
        let backend = CommandLineBackend::new("/usr/bin/brightnessctl");
        assert_eq!(backend.name(), "brightnessctl");
    }

    #[cfg(unix)]
    #[test]
    fn test_missing_program_is_backend_error() {
        let mut backend = CommandLineBackend::new("miyobi-no-such-brightness-tool");
        let result = backend.apply(BrightnessLevel::MAX);
        assert!(matches!(result, Err(Error::Backend(_))));
    }

    #[cfg(unix)]
    #[test]
    fn test_exit_status_is_checked() {
        let mut ok = CommandLineBackend::new("true");
        assert!(ok.apply(BrightnessLevel::MAX).is_ok());

        let mut failing = CommandLineBackend::new("false");
        assert!(matches!(failing.apply(BrightnessLevel::MAX), Err(Error::Backend(_))));
    }
}
