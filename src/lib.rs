//! Screen brightness control from the viewer's distance to the camera.
//!
//! The library watches a webcam, finds the viewer's face landmarks and
//! estimates how far away they sit using the pinhole camera model:
//! - `OpenCV` for capture, face detection and the preview window
//! - ONNX Runtime for the face mesh landmark model
//! - `brightnessctl` or the OS display brightness API for brightness
//!
//! Each sample goes through:
//! 1. Capture a frame (every Nth frame is analyzed)
//! 2. Detect face landmarks and take the two eye points
//! 3. Estimate distance as `reference_width * focal_length / pixel_width`
//! 4. Dim the screen when closer than the threshold, restore it otherwise
//!
//! # Examples
//!
//! ## Estimating a distance
//!
//! ```
//! use miyobi::distance::PinholeEstimator;
//!
//! let estimator = PinholeEstimator::default();
//! let distance = estimator.estimate(126.0).unwrap();
//! assert!((distance - 30.0).abs() < 1e-9);
//! ```
//!
//! ## Driving a backend from distances
//!
//! ```no_run
//! use miyobi::{
//!     brightness::{create_backend, Platform},
//!     config::BackendConfig,
//!     policy::{BrightnessLevel, BrightnessPolicy, BrightnessState},
//! };
//!
//! # fn main() -> miyobi::Result<()> {
//! let mut backend = create_backend(&BackendConfig::default(), Platform::detect())?;
//! let policy = BrightnessPolicy::new(45.0, BrightnessLevel::new(1)?, BrightnessLevel::new(80)?);
//! let mut state = BrightnessState::new();
//!
//! for distance in [60.0, 30.0, 30.0, 60.0] {
//!     let outcome = policy.apply(distance, &mut state, backend.as_mut())?;
//!     println!("{distance} cm -> {outcome:?}");
//! }
//! # Ok(())
//! # }
//! ```

/// Main application module
pub mod app;

/// Brightness backends and backend selection
pub mod brightness;

/// Camera capture and discovery
pub mod capture;

/// Command-line arguments
pub mod cli;

/// Configuration management
pub mod config;

/// Constants used throughout the application
pub mod constants;

/// Process resource usage reporting
pub mod diagnostics;

/// Preview window and overlay
pub mod display;

/// Pinhole distance estimation
pub mod distance;

/// Error types and result handling
pub mod error;

/// Face landmark detection
pub mod landmarks;

/// Distance-to-brightness decision policy
pub mod policy;

pub use error::{Error, Result};
