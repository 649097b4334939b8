//! Face landmark detection.
//!
//! Faces are located with `OpenCV`'s YuNet detector, then each face crop is
//! run through a face mesh model with ONNX Runtime. The mesh uses the
//! 468-point indexing convention, so the eye landmarks are 145 and 374.

use crate::{
    constants::{LEFT_EYE_LANDMARK, NUM_FACE_MESH_LANDMARKS, RIGHT_EYE_LANDMARK},
    distance::LandmarkPair,
    Error, Result,
};
use log::{debug, info};
use ndarray::{Array4, CowArray};
use opencv::{
    core::{Mat, Point2f, Ptr, Rect, Size, Vec3f, CV_32F},
    dnn::{DNN_BACKEND_DEFAULT, DNN_TARGET_CPU},
    imgproc::{self, InterpolationFlags},
    objdetect::FaceDetectorYN,
    prelude::*,
};
use ort::{Environment, Session, Value};
use std::path::Path;
use std::sync::Arc;

/// Face mesh model input size
const FACE_MESH_INPUT_SIZE: i32 = 192;

/// Margin added around the detected face box before cropping
const FACE_BOX_EXPANSION: f32 = 0.25;

/// NMS threshold passed to YuNet
const NMS_THRESHOLD: f32 = 0.3;

/// Ordered landmark points of one face, in frame coordinates
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FaceLandmarks {
    points: Vec<Point2f>,
}

impl FaceLandmarks {
    #[must_use]
    pub const fn new(points: Vec<Point2f>) -> Self {
        Self { points }
    }

    /// Landmark at `index`, if the detector produced it
    #[must_use]
    pub fn get(&self, index: usize) -> Option<Point2f> {
        self.points.get(index).copied()
    }

    /// The two eye landmarks used for distance estimation
    #[must_use]
    pub fn eye_pair(&self) -> Option<LandmarkPair> {
        Some(LandmarkPair::new(
            self.get(LEFT_EYE_LANDMARK)?,
            self.get(RIGHT_EYE_LANDMARK)?,
        ))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.points.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    #[must_use]
    pub fn points(&self) -> &[Point2f] {
        &self.points
    }
}

/// Detector producing per-face landmark lists for a frame
pub trait LandmarkDetector {
    /// Detect faces and their landmarks, first face first
    ///
    /// # Errors
    ///
    /// Returns [`Error::LandmarkDetection`] or a wrapped library error when inference fails.
    fn find_faces(&mut self, frame: &Mat) -> Result<Vec<FaceLandmarks>>;
}

/// YuNet face detector followed by a face mesh landmark model
pub struct FaceMeshDetector {
    face_detector: Ptr<FaceDetectorYN>,
    session: Session,
    max_faces: usize,
    input_size: i32,
}

impl FaceMeshDetector {
    /// Load the face detector and face mesh models
    ///
    /// # Errors
    ///
    /// Returns an error if either model file is missing or cannot be loaded.
    pub fn new<P: AsRef<Path>, Q: AsRef<Path>>(
        face_detector_path: P,
        face_mesh_path: Q,
        score_threshold: f32,
        max_faces: usize,
    ) -> Result<Self> {
        let detector_path = face_detector_path.as_ref();
        let mesh_path = face_mesh_path.as_ref();
        for path in [detector_path, mesh_path] {
            if !path.exists() {
                return Err(Error::ModelError(format!("Model not found: {}", path.display())));
            }
        }

        info!("Loading face detector: {}", detector_path.display());
        let top_k = i32::try_from(max_faces.max(1)).unwrap_or(i32::MAX);
        let face_detector = FaceDetectorYN::create(
            &detector_path.to_string_lossy(),
            "",
            Size::new(320, 320),
            score_threshold,
            NMS_THRESHOLD,
            top_k,
            DNN_BACKEND_DEFAULT,
            DNN_TARGET_CPU,
        )?;

        info!("Loading face mesh model: {}", mesh_path.display());
        let environment = Arc::new(
            Environment::builder()
                .with_name("face_mesh")
                .with_log_level(ort::LoggingLevel::Warning)
                .build()?,
        );

        let session = ort::SessionBuilder::new(&environment)?
            .with_optimization_level(ort::GraphOptimizationLevel::Level3)?
            .with_model_from_file(mesh_path)?;

        if session.outputs.is_empty() {
            return Err(Error::ModelError("Face mesh model has no outputs".to_string()));
        }

        Ok(Self {
            face_detector,
            session,
            max_faces,
            input_size: FACE_MESH_INPUT_SIZE,
        })
    }

    /// Face boxes in frame coordinates, highest score first
    fn detect_boxes(&mut self, frame: &Mat) -> Result<Vec<Rect>> {
        self.face_detector
            .set_input_size(Size::new(frame.cols(), frame.rows()))?;

        let mut faces = Mat::default();
        self.face_detector.detect(frame, &mut faces)?;

        // One row per face: x, y, w, h, 5 keypoints, score
        let mut boxes = Vec::new();
        for row in 0..faces.rows() {
            let x = *faces.at_2d::<f32>(row, 0)?;
            let y = *faces.at_2d::<f32>(row, 1)?;
            let w = *faces.at_2d::<f32>(row, 2)?;
            let h = *faces.at_2d::<f32>(row, 3)?;
            if w > 0.0 && h > 0.0 {
                #[allow(clippy::cast_possible_truncation)]
                boxes.push(Rect::new(x as i32, y as i32, w as i32, h as i32));
            }
        }
        Ok(boxes)
    }

    /// Run the face mesh on one crop, returning points in crop pixels
    #[allow(clippy::cast_sign_loss)] // input size is a positive constant
    fn mesh(&self, crop: &Mat) -> Result<Vec<Point2f>> {
        let size = self.input_size as usize;

        let mut resized = Mat::default();
        imgproc::resize(
            crop,
            &mut resized,
            Size::new(self.input_size, self.input_size),
            0.0,
            0.0,
            InterpolationFlags::INTER_LINEAR as i32,
        )?;

        let mut rgb_image = Mat::default();
        imgproc::cvt_color(&resized, &mut rgb_image, imgproc::COLOR_BGR2RGB, 0)?;

        let mut float_image = Mat::default();
        rgb_image.convert_to(&mut float_image, CV_32F, 1.0 / 255.0, 0.0)?;

        let mut data = Vec::with_capacity(size * size * 3);
        for row in 0..self.input_size {
            for col in 0..self.input_size {
                let pixel = float_image.at_2d::<Vec3f>(row, col)?;
                data.extend_from_slice(&[pixel[0], pixel[1], pixel[2]]);
            }
        }

        // The face mesh export takes NHWC input
        let input = Array4::from_shape_vec((1, size, size, 3), data)
            .map_err(|e| Error::ModelError(format!("Failed to create input array: {e}")))?;
        let cow_array = CowArray::from(input.into_dyn());
        let input_tensor = Value::from_array(self.session.allocator(), &cow_array)?;

        let outputs = self.session.run(vec![input_tensor])?;
        let mesh_output = outputs
            .into_iter()
            .next()
            .ok_or_else(|| Error::LandmarkDetection("No output from face mesh model".to_string()))?;

        let mesh_tensor = mesh_output.try_extract::<f32>()?;
        let mesh_view = mesh_tensor.view();
        let values: Vec<f32> = mesh_view.iter().copied().collect();

        // x, y, z per landmark
        if values.len() < NUM_FACE_MESH_LANDMARKS * 3 {
            return Err(Error::LandmarkDetection(format!(
                "Face mesh returned {} values, expected {}",
                values.len(),
                NUM_FACE_MESH_LANDMARKS * 3
            )));
        }

        Ok(values
            .chunks_exact(3)
            .take(NUM_FACE_MESH_LANDMARKS)
            .map(|xyz| Point2f::new(xyz[0], xyz[1]))
            .collect())
    }
}

impl LandmarkDetector for FaceMeshDetector {
    fn find_faces(&mut self, frame: &Mat) -> Result<Vec<FaceLandmarks>> {
        // Library failures on a single frame are reported as detection failures
        self.detect_landmarks(frame).map_err(|e| match e {
            Error::LandmarkDetection(_) => e,
            other => Error::LandmarkDetection(other.to_string()),
        })
    }
}

impl FaceMeshDetector {
    #[allow(clippy::cast_precision_loss)]
    fn detect_landmarks(&mut self, frame: &Mat) -> Result<Vec<FaceLandmarks>> {
        if frame.empty() {
            return Ok(Vec::new());
        }

        let boxes = self.detect_boxes(frame)?;
        debug!("YuNet found {} face(s)", boxes.len());

        let mut faces = Vec::new();
        for bbox in boxes.into_iter().take(self.max_faces) {
            let crop_box = square_face_box(bbox, frame.cols(), frame.rows(), FACE_BOX_EXPANSION);
            if crop_box.width <= 0 || crop_box.height <= 0 {
                continue;
            }

            let crop = Mat::roi(frame, crop_box)?.try_clone()?;
            let scale_x = crop_box.width as f32 / self.input_size as f32;
            let scale_y = crop_box.height as f32 / self.input_size as f32;

            let points = self
                .mesh(&crop)?
                .into_iter()
                .map(|p| {
                    Point2f::new(
                        crop_box.x as f32 + p.x * scale_x,
                        crop_box.y as f32 + p.y * scale_y,
                    )
                })
                .collect();
            faces.push(FaceLandmarks::new(points));
        }

        Ok(faces)
    }
}

/// Expand a face box by `shift` on every side, make it square and keep it inside the frame
#[must_use]
#[allow(clippy::cast_possible_truncation, clippy::cast_precision_loss)]
pub fn square_face_box(bbox: Rect, max_width: i32, max_height: i32, shift: f32) -> Rect {
    let x_shift = (bbox.width as f32 * shift).round() as i32;
    let y_shift = (bbox.height as f32 * shift).round() as i32;

    let x = (bbox.x - x_shift).max(0);
    let y = (bbox.y - y_shift).max(0);
    let width = (bbox.width + 2 * x_shift).min(max_width - x);
    let height = (bbox.height + 2 * y_shift).min(max_height - y);

    let side = width.max(height).min(max_width).min(max_height);
    let x = x.min(max_width - side).max(0);
    let y = y.min(max_height - side).max(0);

    Rect::new(x, y, side, side)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mesh_with(points: &[(usize, f32, f32)]) -> FaceLandmarks {
        let mut all = vec![Point2f::new(0.0, 0.0); NUM_FACE_MESH_LANDMARKS];
        for &(i, x, y) in points {
            all[i] = Point2f::new(x, y);
        }
        FaceLandmarks::new(all)
    }

    #[test]
    fn test_eye_pair_indices() {
        let face = mesh_with(&[(LEFT_EYE_LANDMARK, 100.0, 200.0), (RIGHT_EYE_LANDMARK, 226.0, 200.0)]);
        let pair = face.eye_pair().unwrap();
        assert_eq!(pair.left, Point2f::new(100.0, 200.0));
        assert_eq!(pair.right, Point2f::new(226.0, 200.0));
        assert!((pair.pixel_width() - 126.0).abs() < 1e-6);
    }

    #[test]
    fn test_incomplete_mesh_has_no_pair() {
        let face = FaceLandmarks::new(vec![Point2f::new(1.0, 1.0); 100]);
        assert!(face.eye_pair().is_none());
        assert_eq!(face.len(), 100);
    }

    #[test]
    fn test_square_face_box_inside_frame() {
        let boxes = [
            Rect::new(10, 10, 50, 60),
            Rect::new(600, 440, 40, 40),
            Rect::new(0, 0, 10, 10),
            Rect::new(100, 100, 400, 300),
        ];
        for bbox in boxes {
            let refined = square_face_box(bbox, 640, 480, 0.25);
            assert_eq!(refined.width, refined.height);
            assert!(refined.x >= 0 && refined.y >= 0);
            assert!(refined.x + refined.width <= 640);
            assert!(refined.y + refined.height <= 480);
        }
    }

    #[test]
    fn test_square_face_box_expands() {
        let refined = square_face_box(Rect::new(200, 200, 80, 80), 640, 480, 0.25);
        assert_eq!(refined, Rect::new(180, 180, 120, 120));
    }
}
