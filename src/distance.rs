//! Pinhole-camera distance estimation from a pair of facial landmarks.
//!
//! The eye landmarks are roughly a fixed real-world width apart, so the
//! distance to the camera follows from `W * f / w` where `w` is their
//! separation in pixels.

use crate::{
    constants::{DEFAULT_FOCAL_LENGTH_PX, DEFAULT_REFERENCE_WIDTH_CM},
    Error, Result,
};
use opencv::core::Point2f;

/// Euclidean distance between two landmarks in pixels
#[must_use]
pub fn find_distance(a: Point2f, b: Point2f) -> f64 {
    let dx = f64::from(b.x) - f64::from(a.x);
    let dy = f64::from(b.y) - f64::from(a.y);
    dx.hypot(dy)
}

/// Estimate the distance in centimetres for a measured pixel width
///
/// # Errors
///
/// Returns [`Error::InvalidMeasurement`] if `pixel_width` is zero, negative or NaN.
pub fn estimate(pixel_width: f64, reference_width_cm: f64, focal_length_px: f64) -> Result<f64> {
    // `!(x > 0)` also rejects NaN
    if !(pixel_width > 0.0) {
        return Err(Error::InvalidMeasurement(pixel_width));
    }
    Ok(reference_width_cm * focal_length_px / pixel_width)
}

/// The two landmarks whose separation is measured
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LandmarkPair {
    /// Left eye landmark in frame coordinates
    pub left: Point2f,
    /// Right eye landmark in frame coordinates
    pub right: Point2f,
}

impl LandmarkPair {
    /// Create a pair from two frame coordinates
    #[must_use]
    pub const fn new(left: Point2f, right: Point2f) -> Self {
        Self { left, right }
    }

    /// Separation of the two landmarks in pixels
    #[must_use]
    pub fn pixel_width(&self) -> f64 {
        find_distance(self.left, self.right)
    }
}

/// Distance estimator holding the calibration constants
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PinholeEstimator {
    reference_width_cm: f64,
    focal_length_px: f64,
}

impl Default for PinholeEstimator {
    fn default() -> Self {
        Self::new(DEFAULT_REFERENCE_WIDTH_CM, DEFAULT_FOCAL_LENGTH_PX)
    }
}

impl PinholeEstimator {
    /// Create an estimator from a reference width (cm) and focal length proxy (px)
    #[must_use]
    pub const fn new(reference_width_cm: f64, focal_length_px: f64) -> Self {
        Self {
            reference_width_cm,
            focal_length_px,
        }
    }

    /// Estimate distance for a pixel width
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidMeasurement`] for a non-positive width.
    pub fn estimate(&self, pixel_width: f64) -> Result<f64> {
        estimate(pixel_width, self.reference_width_cm, self.focal_length_px)
    }

    /// Estimate distance for a landmark pair
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidMeasurement`] when both landmarks coincide.
    pub fn estimate_pair(&self, pair: &LandmarkPair) -> Result<f64> {
        self.estimate(pair.pixel_width())
    }

    pub const fn reference_width_cm(&self) -> f64 {
        self.reference_width_cm
    }

    pub const fn focal_length_px(&self) -> f64 {
        self.focal_length_px
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_estimate_known_widths() {
        let estimator = PinholeEstimator::default();
        assert_eq!(estimator.estimate(126.0).unwrap(), 30.0);
        assert_eq!(estimator.estimate(63.0).unwrap(), 60.0);
    }

    #[test]
    fn test_estimate_rejects_non_positive() {
        assert!(matches!(estimate(0.0, 6.3, 600.0), Err(Error::InvalidMeasurement(_))));
        assert!(matches!(estimate(-1.0, 6.3, 600.0), Err(Error::InvalidMeasurement(_))));
        assert!(matches!(estimate(f64::NAN, 6.3, 600.0), Err(Error::InvalidMeasurement(_))));
    }

    #[test]
    fn test_find_distance() {
        let a = Point2f::new(0.0, 0.0);
        let b = Point2f::new(3.0, 4.0);
        assert!((find_distance(a, b) - 5.0).abs() < 1e-9);
        assert_eq!(find_distance(a, a), 0.0);
    }

    #[test]
    fn test_pair_estimate() {
        let pair = LandmarkPair::new(Point2f::new(100.0, 200.0), Point2f::new(226.0, 200.0));
        let distance = PinholeEstimator::default().estimate_pair(&pair).unwrap();
        assert!((distance - 30.0).abs() < 1e-9);
    }

    #[test]
    fn test_coincident_pair_is_invalid() {
        let p = Point2f::new(50.0, 50.0);
        let pair = LandmarkPair::new(p, p);
        assert!(PinholeEstimator::default().estimate_pair(&pair).is_err());
    }
}
