//! Preview window, distance overlay and quit-key polling.

use crate::{
    constants::{OVERLAY_OFFSET_X, OVERLAY_OFFSET_Y},
    Result,
};
use log::info;
use opencv::{
    core::{Mat, Point, Point2f, Scalar},
    highgui::{self, WINDOW_AUTOSIZE},
    imgproc::{self, FONT_HERSHEY_PLAIN, LINE_8},
    prelude::*,
};

/// Where frames are shown and keys are read from
pub trait DisplaySurface {
    /// Show a frame
    fn show(&mut self, frame: &Mat) -> Result<()>;

    /// Key pressed since the last poll, if any
    fn poll_key(&mut self) -> Result<Option<char>>;

    /// Tear the surface down; called once on every exit path
    fn close(&mut self) -> Result<()>;
}

/// `OpenCV` `HighGUI` window
pub struct PreviewWindow {
    title: String,
}

impl PreviewWindow {
    /// Create the named window
    ///
    /// # Errors
    ///
    /// Returns an error if the window cannot be created (no display server).
    pub fn new(title: &str) -> Result<Self> {
        highgui::named_window(title, WINDOW_AUTOSIZE)?;
        Ok(Self {
            title: title.to_string(),
        })
    }
}

impl DisplaySurface for PreviewWindow {
    fn show(&mut self, frame: &Mat) -> Result<()> {
        if !frame.empty() {
            highgui::imshow(&self.title, frame)?;
        }
        Ok(())
    }

    fn poll_key(&mut self) -> Result<Option<char>> {
        let key = highgui::wait_key(1)?;
        Ok(key_to_char(key))
    }

    fn close(&mut self) -> Result<()> {
        info!("Closing preview window");
        highgui::destroy_all_windows()?;
        Ok(())
    }
}

/// No window; the session ends on capture failure or process signal
#[derive(Debug, Default)]
pub struct Headless;

impl DisplaySurface for Headless {
    fn show(&mut self, _frame: &Mat) -> Result<()> {
        Ok(())
    }

    fn poll_key(&mut self) -> Result<Option<char>> {
        Ok(None)
    }

    fn close(&mut self) -> Result<()> {
        Ok(())
    }
}

/// Convert a `wait_key` code to a character; `-1` means no key
#[must_use]
pub fn key_to_char(key: i32) -> Option<char> {
    if key < 0 {
        return None;
    }
    // Some backends set modifier bits above the low byte
    u8::try_from(key & 0xFF).ok().map(char::from)
}

/// Draw `"<cm> cm"` above the anchor landmark on a filled box
#[allow(clippy::cast_possible_truncation)]
pub fn annotate_distance(frame: &mut Mat, distance_cm: f64, anchor: Point2f) -> Result<()> {
    let text = format!("{} cm", distance_cm as i64);
    let origin = Point::new(
        anchor.x as i32 + OVERLAY_OFFSET_X,
        anchor.y as i32 + OVERLAY_OFFSET_Y,
    );

    let scale = 2.0;
    let thickness = 2;
    let mut baseline = 0;
    let size = imgproc::get_text_size(&text, FONT_HERSHEY_PLAIN, scale, thickness, &mut baseline)?;

    let offset = 10;
    imgproc::rectangle_points(
        frame,
        Point::new(origin.x - offset, origin.y + offset),
        Point::new(origin.x + size.width + offset, origin.y - size.height - offset),
        Scalar::new(255.0, 0.0, 255.0, 0.0),
        imgproc::FILLED,
        LINE_8,
        0,
    )?;
    imgproc::put_text(
        frame,
        &text,
        origin,
        FONT_HERSHEY_PLAIN,
        scale,
        Scalar::new(255.0, 255.0, 255.0, 0.0),
        thickness,
        LINE_8,
        false,
    )?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use opencv::core::{Vec3b, CV_8UC3};

    #[test]
    fn test_key_to_char() {
        assert_eq!(key_to_char(-1), None);
        assert_eq!(key_to_char(i32::from(b'q')), Some('q'));
        assert_eq!(key_to_char(0x10_0000 | i32::from(b'x')), Some('x'));
    }

    #[test]
    fn test_annotate_draws_on_frame() {
        let mut frame = Mat::zeros(480, 640, CV_8UC3).unwrap().to_mat().unwrap();
        annotate_distance(&mut frame, 30.7, Point2f::new(320.0, 200.0)).unwrap();
        // Text origin is (220, 150); the box margin left of it is filled
        let pixel = *frame.at_2d::<Vec3b>(155, 215).unwrap();
        assert_eq!(pixel, Vec3b::from([255, 0, 255]));
    }

    #[test]
    fn test_annotate_near_edge_does_not_fail() {
        let mut frame = Mat::zeros(120, 160, CV_8UC3).unwrap().to_mat().unwrap();
        assert!(annotate_distance(&mut frame, 99.0, Point2f::new(5.0, 5.0)).is_ok());
    }

    #[test]
    fn test_headless_never_quits() {
        let mut surface = Headless;
        assert_eq!(surface.poll_key().unwrap(), None);
        assert!(surface.close().is_ok());
    }
}
