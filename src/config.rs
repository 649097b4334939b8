//! Configuration management for the brightness controller

use crate::{
    constants::{
        BACKLIGHT_DEVICES_PATH, CAMERA_SCAN_LIMIT, DEFAULT_BRIGHTNESS_COMMAND, DEFAULT_CLOSE_LEVEL,
        DEFAULT_DIAGNOSTICS_INTERVAL, DEFAULT_FOCAL_LENGTH_PX, DEFAULT_FRAME_SKIP,
        DEFAULT_MAX_SAMPLES_PER_SECOND, DEFAULT_QUIT_KEY, DEFAULT_REFERENCE_WIDTH_CM,
        DEFAULT_THRESHOLD_CM, WINDOW_TITLE,
    },
    Error, Result,
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Camera selection
    pub camera: CameraConfig,

    /// Landmark-to-distance calibration
    pub distance: DistanceConfig,

    /// Brightness decision policy
    pub policy: PolicyConfig,

    /// Brightness backend selection
    pub backend: BackendConfig,

    /// Sampling loop pacing
    pub sampling: SamplingConfig,

    /// Model file paths
    pub models: ModelConfig,

    /// Preview window
    pub display: DisplayConfig,
}

/// Camera configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraConfig {
    /// Device index; `None` scans indices `0..scan_limit`
    pub index: Option<i32>,

    /// Number of indices tried during auto-discovery
    pub scan_limit: i32,
}

/// Pinhole calibration constants
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DistanceConfig {
    /// Real-world distance between the eye landmarks (cm)
    pub reference_width_cm: f64,

    /// Focal length proxy (px)
    pub focal_length_px: f64,
}

/// Brightness policy configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PolicyConfig {
    /// Dim below this distance (cm)
    pub threshold_cm: f64,

    /// Extra distance needed to leave the dim level (cm)
    pub hysteresis_cm: f64,

    /// Level applied while too close (percent)
    pub close_level: u8,

    /// Level applied otherwise; read from the system when unset
    pub normal_level: Option<u8>,

    /// Skip backend calls when the level is already applied
    pub debounce: bool,
}

/// Brightness backend configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BackendConfig {
    /// `auto`, `command`, `system` or `backlight`
    pub kind: String,

    /// Command-line utility for the `command` backend
    pub command: String,

    /// Backlight class root for the `backlight` backend
    pub backlight_path: PathBuf,
}

/// Sampling loop configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SamplingConfig {
    /// Sampling ceiling, 0 for unlimited
    pub max_samples_per_second: f64,

    /// Analyze every Nth frame
    pub frame_skip: u32,

    /// Report resource usage every Nth analyzed frame, 0 to disable
    pub diagnostics_interval: u32,
}

/// Model file paths configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    /// YuNet face detection model
    pub face_detector: PathBuf,

    /// Face mesh landmark model
    pub face_mesh: PathBuf,

    /// Minimum face detection score
    pub score_threshold: f32,

    /// Maximum number of faces passed to the landmark model
    pub max_faces: usize,
}

/// Display configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DisplayConfig {
    /// Show the preview window
    pub enabled: bool,

    /// Window title
    pub window_title: String,

    /// Key that ends the session
    pub quit_key: char,

    /// Draw the distance next to the face
    pub annotate: bool,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            index: Some(0),
            scan_limit: CAMERA_SCAN_LIMIT,
        }
    }
}

impl Default for DistanceConfig {
    fn default() -> Self {
        Self {
            reference_width_cm: DEFAULT_REFERENCE_WIDTH_CM,
            focal_length_px: DEFAULT_FOCAL_LENGTH_PX,
        }
    }
}

impl Default for PolicyConfig {
    fn default() -> Self {
        Self {
            threshold_cm: DEFAULT_THRESHOLD_CM,
            hysteresis_cm: 0.0,
            close_level: DEFAULT_CLOSE_LEVEL,
            normal_level: None,
            debounce: true,
        }
    }
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            kind: "auto".to_string(),
            command: DEFAULT_BRIGHTNESS_COMMAND.to_string(),
            backlight_path: PathBuf::from(BACKLIGHT_DEVICES_PATH),
        }
    }
}

impl Default for SamplingConfig {
    fn default() -> Self {
        Self {
            max_samples_per_second: DEFAULT_MAX_SAMPLES_PER_SECOND,
            frame_skip: DEFAULT_FRAME_SKIP,
            diagnostics_interval: DEFAULT_DIAGNOSTICS_INTERVAL,
        }
    }
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            face_detector: PathBuf::from("assets/face_detection_yunet_2023mar.onnx"),
            face_mesh: PathBuf::from("assets/face_mesh.onnx"),
            score_threshold: 0.6,
            max_faces: 1,
        }
    }
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            window_title: WINDOW_TITLE.to_string(),
            quit_key: DEFAULT_QUIT_KEY,
            annotate: true,
        }
    }
}

impl Config {
    /// Load configuration from a YAML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;

        serde_yaml::from_str(&content).map_err(|e| Error::ConfigError(format!("Failed to parse config: {e}")))
    }

    /// Save configuration to a YAML file
    pub fn to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = serde_yaml::to_string(self)
            .map_err(|e| Error::ConfigError(format!("Failed to serialize config: {e}")))?;

        std::fs::write(path, content)?;

        Ok(())
    }

    /// Validate value ranges; model files are checked when the detector loads
    pub fn validate(&self) -> Result<()> {
        if self.camera.scan_limit <= 0 {
            return Err(Error::ConfigError(
                "Camera scan limit must be greater than 0".to_string(),
            ));
        }
        if let Some(index) = self.camera.index {
            if index < 0 {
                return Err(Error::ConfigError(format!("Camera index {index} is negative")));
            }
        }

        if !(self.distance.reference_width_cm > 0.0) || !(self.distance.focal_length_px > 0.0) {
            return Err(Error::ConfigError(
                "Reference width and focal length must be positive".to_string(),
            ));
        }

        if !(self.policy.threshold_cm > 0.0) {
            return Err(Error::ConfigError("Threshold distance must be positive".to_string()));
        }
        if !(self.policy.hysteresis_cm >= 0.0) {
            return Err(Error::ConfigError("Hysteresis must not be negative".to_string()));
        }
        if self.policy.close_level > 100 {
            return Err(Error::ConfigError(
                "Close brightness must be between 0 and 100".to_string(),
            ));
        }
        if self.policy.normal_level.is_some_and(|level| level > 100) {
            return Err(Error::ConfigError(
                "Normal brightness must be between 0 and 100".to_string(),
            ));
        }

        if !(self.sampling.max_samples_per_second >= 0.0) {
            return Err(Error::ConfigError(
                "Samples per second must not be negative".to_string(),
            ));
        }
        if self.sampling.frame_skip == 0 {
            return Err(Error::ConfigError("Frame skip must be greater than 0".to_string()));
        }

        if self.models.max_faces == 0 {
            return Err(Error::ConfigError("Max faces must be greater than 0".to_string()));
        }
        if !(0.0..=1.0).contains(&self.models.score_threshold) {
            return Err(Error::ConfigError(
                "Score threshold must be between 0.0 and 1.0".to_string(),
            ));
        }

        Ok(())
    }
}

/// Example configuration file content
pub const EXAMPLE_CONFIG: &str = r#"# Miyobi configuration

# Camera; set `index: null` to scan for the first working device
camera:
  index: 0
  scan_limit: 6

# Pinhole calibration
distance:
  reference_width_cm: 6.3
  focal_length_px: 600.0

# Brightness policy
policy:
  threshold_cm: 45.0
  hysteresis_cm: 0.0
  close_level: 1
  # normal_level: 80
  debounce: true

# Brightness backend: auto, command, system or backlight (Linux only)
backend:
  kind: "auto"
  command: "brightnessctl"
  backlight_path: "/sys/class/backlight"

# Sampling loop
sampling:
  max_samples_per_second: 10.0
  frame_skip: 2
  diagnostics_interval: 10

# Model paths
models:
  face_detector: "assets/face_detection_yunet_2023mar.onnx"
  face_mesh: "assets/face_mesh.onnx"
  score_threshold: 0.6
  max_faces: 1

# Preview window
display:
  enabled: true
  window_title: "Miyobi"
  quit_key: "q"
  annotate: true
"#;
