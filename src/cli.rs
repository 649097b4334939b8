//! Command-line arguments and their overrides on top of the config file.

use crate::{config::Config, Error, Result};
use clap::Parser;
use std::path::PathBuf;
use std::str::FromStr;

/// Camera argument: a device index or `none` to scan for the first working one
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CameraArg {
    Index(i32),
    Discover,
}

impl FromStr for CameraArg {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        if s.eq_ignore_ascii_case("none") || s.eq_ignore_ascii_case("auto") {
            return Ok(Self::Discover);
        }
        match s.parse::<i32>() {
            Ok(index) if index >= 0 => Ok(Self::Index(index)),
            _ => Err(Error::InvalidInput(format!(
                "Invalid camera '{s}', expected an index or 'none'"
            ))),
        }
    }
}

fn parse_camera(s: &str) -> std::result::Result<CameraArg, String> {
    s.parse().map_err(|e: Error| e.to_string())
}

fn parse_quit_key(s: &str) -> std::result::Result<char, String> {
    let mut chars = s.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) => Ok(c),
        _ => Err(format!("quit key must be one character, got '{s}'")),
    }
}

#[derive(Parser, Debug)]
#[command(author, version, about = "Dim the screen when you sit too close to it", long_about = None)]
pub struct Args {
    /// Camera index, or `none` to use the first camera that opens
    #[arg(long, value_parser = parse_camera)]
    pub cam: Option<CameraArg>,

    /// Key that ends the session
    #[arg(short, long, value_parser = parse_quit_key)]
    pub quit_key: Option<char>,

    /// Path to configuration file (YAML format)
    #[arg(short = 'C', long)]
    pub config: Option<PathBuf>,

    /// Enable debug output
    #[arg(short, long)]
    pub debug: bool,

    /// Dim below this distance in centimeters
    #[arg(short, long)]
    pub threshold: Option<f64>,

    /// Brightness percentage applied while too close
    #[arg(long, value_parser = clap::value_parser!(u8).range(0..=100))]
    pub close_level: Option<u8>,

    /// Brightness backend (auto, command, system, backlight)
    #[arg(short, long)]
    pub backend: Option<String>,

    /// Maximum samples per second, 0 for unlimited
    #[arg(long)]
    pub fps: Option<f64>,

    /// Analyze every Nth frame
    #[arg(long)]
    pub skip: Option<u32>,

    /// Run without the preview window
    #[arg(long)]
    pub headless: bool,

    /// Write the effective configuration to this path and exit
    #[arg(long)]
    pub dump_config: Option<PathBuf>,
}

impl FromStr for Args {
    type Err = Error;

    /// Parse a whitespace-separated argument line, without the program name
    fn from_str(line: &str) -> Result<Self> {
        let argv = std::iter::once("miyobi").chain(line.split_whitespace());
        Self::try_parse_from(argv).map_err(|e| Error::InvalidInput(e.to_string()))
    }
}

impl Args {
    /// Overlay the flags that were given onto `config`
    pub fn apply_to(&self, config: &mut Config) {
        match self.cam {
            Some(CameraArg::Index(index)) => config.camera.index = Some(index),
            Some(CameraArg::Discover) => config.camera.index = None,
            None => {}
        }
        if let Some(key) = self.quit_key {
            config.display.quit_key = key;
        }
        if let Some(threshold) = self.threshold {
            config.policy.threshold_cm = threshold;
        }
        if let Some(level) = self.close_level {
            config.policy.close_level = level;
        }
        if let Some(backend) = &self.backend {
            config.backend.kind.clone_from(backend);
        }
        if let Some(fps) = self.fps {
            config.sampling.max_samples_per_second = fps;
        }
        if let Some(skip) = self.skip {
            config.sampling.frame_skip = skip;
        }
        if self.headless {
            config.display.enabled = false;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_camera_arg() {
        assert_eq!("2".parse::<CameraArg>().unwrap(), CameraArg::Index(2));
        assert_eq!("none".parse::<CameraArg>().unwrap(), CameraArg::Discover);
        assert_eq!("None".parse::<CameraArg>().unwrap(), CameraArg::Discover);
        assert!("-1".parse::<CameraArg>().is_err());
        assert!("front".parse::<CameraArg>().is_err());
    }

    #[test]
    fn test_no_flags_keep_config() {
        let args: Args = "".parse().unwrap();
        let mut config = Config::default();
        args.apply_to(&mut config);
        assert_eq!(config.camera.index, Some(0));
        assert_eq!(config.display.quit_key, 'q');
        assert!(config.display.enabled);
    }

    #[test]
    fn test_flags_override_config() {
        let args: Args = "--cam none --quit-key x --threshold 50 --close-level 5 --backend backlight --fps 0 --skip 3 --headless"
            .parse()
            .unwrap();
        let mut config = Config::default();
        args.apply_to(&mut config);
        assert_eq!(config.camera.index, None);
        assert_eq!(config.display.quit_key, 'x');
        assert_eq!(config.policy.threshold_cm, 50.0);
        assert_eq!(config.policy.close_level, 5);
        assert_eq!(config.backend.kind, "backlight");
        assert_eq!(config.sampling.max_samples_per_second, 0.0);
        assert_eq!(config.sampling.frame_skip, 3);
        assert!(!config.display.enabled);
    }

    #[test]
    fn test_rejects_bad_values() {
        assert!("--quit-key qq".parse::<Args>().is_err());
        assert!("--close-level 101".parse::<Args>().is_err());
        assert!("--cam front".parse::<Args>().is_err());
    }
}
