//! Camera capture: opening a device, auto-discovery and frame reads.

use crate::{Error, Result};
use log::{debug, info, warn};
use opencv::{
    core::Mat,
    prelude::*,
    videoio::{self, VideoCapture, CAP_PROP_BUFFERSIZE},
};

/// Source of frames for the sampling loop
pub trait FrameSource {
    /// Read the next frame into `frame`, returning `false` when no frame is available
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying device fails.
    fn read(&mut self, frame: &mut Mat) -> Result<bool>;

    /// Release the device; called exactly once on every exit path
    ///
    /// # Errors
    ///
    /// Returns an error if the device cannot be released cleanly.
    fn release(&mut self) -> Result<()>;
}

/// Which camera to open
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CameraSelection {
    /// Specific device index
    Index(i32),
    /// First device in `0..limit` that opens
    AutoDiscover {
        /// Number of indices to try
        limit: i32,
    },
}

/// `OpenCV` webcam
pub struct Camera {
    index: i32,
    capture: VideoCapture,
}

impl Camera {
    /// Try to open the camera at `index`; `Ok(None)` when the device does not open
    ///
    /// # Errors
    ///
    /// Returns an error if `OpenCV` fails while creating the capture.
    pub fn try_open(index: i32) -> Result<Option<Self>> {
        debug!("Trying camera {}", index);
        let mut capture = VideoCapture::new(index, videoio::CAP_ANY)?;
        if !capture.is_opened()? {
            return Ok(None);
        }

        // Keep latency low, a stale buffered frame would lag the distance
        if let Err(e) = capture.set(CAP_PROP_BUFFERSIZE, 1.0) {
            debug!("Camera {} does not accept a buffer size: {}", index, e);
        }

        Ok(Some(Self { index, capture }))
    }

    /// Open a camera according to the selection
    ///
    /// # Errors
    ///
    /// Returns [`Error::NoCameraFound`] if no device opens.
    pub fn open(selection: CameraSelection) -> Result<Self> {
        match selection {
            CameraSelection::Index(index) => {
                info!("Opening camera {}", index);
                Self::try_open(index)?
                    .ok_or_else(|| Error::NoCameraFound(format!("camera {index} could not be opened")))
            }
            CameraSelection::AutoDiscover { limit } => {
                let (index, camera) = discover(limit, Self::try_open)?;
                info!("Discovered camera {}", index);
                Ok(camera)
            }
        }
    }

    #[must_use]
    pub const fn index(&self) -> i32 {
        self.index
    }
}

impl FrameSource for Camera {
    fn read(&mut self, frame: &mut Mat) -> Result<bool> {
        Ok(self.capture.read(frame)?)
    }

    fn release(&mut self) -> Result<()> {
        info!("Releasing camera {}", self.index);
        self.capture.release()?;
        Ok(())
    }
}

/// Try indices `0..limit` and return the first that opens
///
/// # Errors
///
/// Returns [`Error::NoCameraFound`] if every index fails. An error from a
/// single index is logged and treated as "did not open".
pub fn discover<S, F>(limit: i32, mut open: F) -> Result<(i32, S)>
where
    F: FnMut(i32) -> Result<Option<S>>,
{
    for index in 0..limit {
        match open(index) {
            Ok(Some(source)) => return Ok((index, source)),
            Ok(None) => debug!("Camera {} did not open", index),
            Err(e) => warn!("Probing camera {} failed: {}", index, e),
        }
    }
    Err(Error::NoCameraFound(format!(
        "no camera opened among indices 0..{limit}"
    )))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_discover_first_working_index() {
        let mut tried = Vec::new();
        let (index, source) = discover(6, |i| {
            tried.push(i);
            Ok((i == 2).then_some("cam2"))
        })
        .unwrap();
        assert_eq!(index, 2);
        assert_eq!(source, "cam2");
        assert_eq!(tried, vec![0, 1, 2]);
    }

    #[test]
    fn test_discover_skips_open_errors() {
        let (index, _) = discover(6, |i| {
            if i == 0 {
                Err(Error::InvalidInput("busy".to_string()))
            } else {
                Ok(Some(()))
            }
        })
        .unwrap();
        assert_eq!(index, 1);
    }

    #[test]
    fn test_discover_exhausted() {
        let result = discover::<(), _>(6, |_| Ok(None));
        assert!(matches!(result, Err(Error::NoCameraFound(_))));
    }
}
