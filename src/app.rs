//! Main application module: the distance-to-brightness sampling loop.

use crate::{
    brightness::{create_backend, seed_normal_level, BrightnessBackend, Platform},
    capture::{Camera, CameraSelection, FrameSource},
    config::Config,
    constants::FOREHEAD_LANDMARK,
    diagnostics::{ProcessMonitor, ResourceMonitor},
    display::{annotate_distance, DisplaySurface, Headless, PreviewWindow},
    distance::PinholeEstimator,
    error::{Error, Result},
    landmarks::{FaceMeshDetector, LandmarkDetector},
    policy::{ApplyOutcome, BrightnessLevel, BrightnessPolicy, BrightnessState},
};
use log::{debug, error, info, warn};
use opencv::{core::Mat, prelude::*};
use std::time::{Duration, Instant};

/// Stage the loop is currently in
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopStage {
    /// Waiting for and reading the next frame
    Capturing,
    /// Running the landmark detector
    Detecting,
    /// Converting the landmark width to a distance
    Estimating,
    /// Choosing the brightness level
    Deciding,
    /// Pushing the level to the backend
    Applying,
    /// Showing the frame and polling the quit key
    Displaying,
    /// Capture released, display closed
    Stopped,
}

/// Why the loop ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// The quit key was pressed
    QuitKey,
    /// The camera stopped delivering frames
    CaptureFailed,
}

/// Enforces a minimum interval between captures
#[derive(Debug)]
pub struct RateLimiter {
    min_interval: Option<Duration>,
    last: Option<Instant>,
}

impl RateLimiter {
    /// Limit to `max_per_second` iterations; zero or less means unlimited
    #[must_use]
    pub fn new(max_per_second: f64) -> Self {
        let min_interval = (max_per_second > 0.0).then(|| Duration::from_secs_f64(1.0 / max_per_second));
        Self {
            min_interval,
            last: None,
        }
    }

    /// Sleep until the interval since the previous call has elapsed
    pub fn wait(&mut self) {
        if let (Some(interval), Some(last)) = (self.min_interval, self.last) {
            let elapsed = last.elapsed();
            if elapsed < interval {
                std::thread::sleep(interval - elapsed);
            }
        }
        self.last = Some(Instant::now());
    }

    #[must_use]
    pub const fn min_interval(&self) -> Option<Duration> {
        self.min_interval
    }
}

/// Loop pacing and display options
#[derive(Debug, Clone, PartialEq)]
pub struct LoopSettings {
    /// Sampling ceiling, 0 for unlimited
    pub max_samples_per_second: f64,
    /// Analyze every Nth frame
    pub frame_skip: u32,
    /// Sample resource usage every Nth analyzed frame, 0 to disable
    pub diagnostics_interval: u32,
    /// Key that ends the session
    pub quit_key: char,
    /// Draw the distance on analyzed frames
    pub annotate: bool,
}

impl From<&Config> for LoopSettings {
    fn from(config: &Config) -> Self {
        Self {
            max_samples_per_second: config.sampling.max_samples_per_second,
            frame_skip: config.sampling.frame_skip,
            diagnostics_interval: config.sampling.diagnostics_interval,
            quit_key: config.display.quit_key,
            annotate: config.display.annotate,
        }
    }
}

/// External collaborators driven by the loop
pub struct Collaborators {
    /// Frame source
    pub source: Box<dyn FrameSource>,
    /// Landmark detector
    pub detector: Box<dyn LandmarkDetector>,
    /// Preview surface and key input
    pub display: Box<dyn DisplaySurface>,
    /// Brightness backend
    pub backend: Box<dyn BrightnessBackend>,
    /// Resource usage source
    pub monitor: Box<dyn ResourceMonitor>,
}

/// What happened to one captured frame
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct FrameReport {
    /// 1-based frame counter
    pub frame_index: u64,
    /// Whether the frame went through detection
    pub analyzed: bool,
    /// Number of faces found
    pub faces: usize,
    /// Estimated distance of the first face
    pub distance_cm: Option<f64>,
    /// Policy result, `None` when no decision was made or the backend failed
    pub outcome: Option<ApplyOutcome>,
}

/// Result of one loop iteration
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Step {
    /// Keep going
    Continue(FrameReport),
    /// Leave the loop
    Stop(StopReason),
}

/// Totals for a finished session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionSummary {
    /// Why the session ended
    pub stop_reason: StopReason,
    /// Frames captured
    pub frames: u64,
    /// Frames analyzed
    pub analyzed_frames: u64,
    /// Last level the backend accepted
    pub last_applied: Option<BrightnessLevel>,
}

/// Capture → detect → estimate → decide → apply → display, until stopped
pub struct SamplingLoop {
    collaborators: Collaborators,
    estimator: PinholeEstimator,
    policy: BrightnessPolicy,
    state: BrightnessState,
    settings: LoopSettings,
    limiter: RateLimiter,
    frame_count: u64,
    analyzed_count: u64,
    stage: LoopStage,
    released: bool,
    diagnostics_warned: bool,
}

impl SamplingLoop {
    /// Create a loop over the given collaborators
    #[must_use]
    pub fn new(
        collaborators: Collaborators,
        estimator: PinholeEstimator,
        policy: BrightnessPolicy,
        settings: LoopSettings,
    ) -> Self {
        let limiter = RateLimiter::new(settings.max_samples_per_second);
        Self {
            collaborators,
            estimator,
            policy,
            state: BrightnessState::new(),
            settings,
            limiter,
            frame_count: 0,
            analyzed_count: 0,
            stage: LoopStage::Capturing,
            released: false,
            diagnostics_warned: false,
        }
    }

    /// Run until the quit key or a capture failure, then release everything
    ///
    /// # Errors
    ///
    /// Returns unexpected failures (display, overlay drawing). Cleanup has
    /// already run when this returns, whatever the outcome.
    pub fn run(&mut self) -> Result<SessionSummary> {
        info!("Starting sampling loop");
        let result = self.run_until_stopped();
        self.shutdown();

        let stop_reason = result?;
        info!(
            "Session ended ({:?}) after {} frames, {} analyzed",
            stop_reason, self.frame_count, self.analyzed_count
        );
        Ok(SessionSummary {
            stop_reason,
            frames: self.frame_count,
            analyzed_frames: self.analyzed_count,
            last_applied: self.state.last_applied(),
        })
    }

    fn run_until_stopped(&mut self) -> Result<StopReason> {
        loop {
            if let Step::Stop(reason) = self.step()? {
                return Ok(reason);
            }
        }
    }

    /// Run a single iteration
    ///
    /// # Errors
    ///
    /// Returns display, drawing or other non-recoverable failures; detection,
    /// measurement and backend failures are logged and the frame is skipped.
    pub fn step(&mut self) -> Result<Step> {
        self.stage = LoopStage::Capturing;
        self.limiter.wait();

        let mut frame = match self.capture() {
            Ok(frame) => frame,
            Err(e) => {
                error!("{e}");
                return Ok(Step::Stop(StopReason::CaptureFailed));
            }
        };
        self.frame_count += 1;

        let mut report = FrameReport {
            frame_index: self.frame_count,
            ..FrameReport::default()
        };

        if self.frame_count % u64::from(self.settings.frame_skip.max(1)) == 0 {
            self.analyze(&mut frame, &mut report)?;
            self.analyzed_count += 1;
            self.report_diagnostics();
        }

        self.stage = LoopStage::Displaying;
        self.collaborators.display.show(&frame)?;
        if self.collaborators.display.poll_key()? == Some(self.settings.quit_key) {
            info!("Exit requested by user");
            return Ok(Step::Stop(StopReason::QuitKey));
        }

        Ok(Step::Continue(report))
    }

    fn capture(&mut self) -> Result<Mat> {
        let mut frame = Mat::default();
        match self.collaborators.source.read(&mut frame) {
            Ok(true) if !frame.empty() => Ok(frame),
            Ok(_) => Err(Error::CaptureReadFailure("camera returned no frame".to_string())),
            Err(e @ Error::CaptureReadFailure(_)) => Err(e),
            Err(e) => Err(Error::CaptureReadFailure(e.to_string())),
        }
    }

    fn analyze(&mut self, frame: &mut Mat, report: &mut FrameReport) -> Result<()> {
        report.analyzed = true;

        self.stage = LoopStage::Detecting;
        let Some(faces) = recover(self.collaborators.detector.find_faces(frame))? else {
            return Ok(());
        };
        report.faces = faces.len();

        // Only the first face drives the brightness
        let Some(face) = faces.first() else {
            return Ok(());
        };

        self.stage = LoopStage::Estimating;
        let Some(pair) = face.eye_pair() else {
            debug!("Face has {} landmarks, eye landmarks missing", face.len());
            return Ok(());
        };
        let Some(distance) = recover(self.estimator.estimate_pair(&pair))? else {
            return Ok(());
        };
        report.distance_cm = Some(distance);

        self.stage = LoopStage::Deciding;
        debug!(
            "Distance {:.1} cm, target {}",
            distance,
            self.policy.target(distance, &self.state)
        );

        self.stage = LoopStage::Applying;
        report.outcome = recover(self.policy.apply(
            distance,
            &mut self.state,
            self.collaborators.backend.as_mut(),
        ))?;

        if self.settings.annotate {
            if let Some(anchor) = face.get(FOREHEAD_LANDMARK) {
                annotate_distance(frame, distance, anchor)?;
            }
        }

        Ok(())
    }

    fn report_diagnostics(&mut self) {
        let interval = u64::from(self.settings.diagnostics_interval);
        if interval == 0 || self.analyzed_count % interval != 0 {
            return;
        }
        match self.collaborators.monitor.sample() {
            Ok(usage) => info!("{usage}"),
            Err(e) if !self.diagnostics_warned => {
                warn!("Resource usage reporting disabled: {e}");
                self.diagnostics_warned = true;
            }
            Err(e) => debug!("{e}"),
        }
    }

    /// Release the capture device and close the display; runs at most once
    pub fn shutdown(&mut self) {
        if self.released {
            return;
        }
        self.released = true;
        self.stage = LoopStage::Stopped;

        if let Err(e) = self.collaborators.source.release() {
            warn!("Failed to release capture device: {e}");
        }
        if let Err(e) = self.collaborators.display.close() {
            warn!("Failed to close display: {e}");
        }
    }

    #[must_use]
    pub const fn stage(&self) -> LoopStage {
        self.stage
    }

    #[must_use]
    pub const fn state(&self) -> &BrightnessState {
        &self.state
    }

    #[must_use]
    pub const fn frame_count(&self) -> u64 {
        self.frame_count
    }

    #[must_use]
    pub const fn analyzed_count(&self) -> u64 {
        self.analyzed_count
    }

    /// Whether a failed resource sample has already been reported
    #[must_use]
    pub const fn diagnostics_warned(&self) -> bool {
        self.diagnostics_warned
    }
}

/// Log a per-frame failure and carry on; anything else ends the session
fn recover<T>(result: Result<T>) -> Result<Option<T>> {
    match result {
        Ok(value) => Ok(Some(value)),
        Err(e) if e.is_recoverable() => {
            warn!("Skipping frame: {e}");
            Ok(None)
        }
        Err(e) => Err(e),
    }
}

impl Drop for SamplingLoop {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// Fully wired application built from configuration
pub struct MiyobiApp {
    sampling: SamplingLoop,
}

impl MiyobiApp {
    /// Open the camera, load the models and resolve the brightness backend
    ///
    /// # Errors
    ///
    /// Returns [`Error::NoCameraFound`] when no camera opens, or a
    /// configuration/model error; the loop is not entered in either case.
    pub fn new(config: &Config) -> Result<Self> {
        info!("Initializing Miyobi");
        config.validate()?;

        let selection = match config.camera.index {
            Some(index) => CameraSelection::Index(index),
            None => CameraSelection::AutoDiscover {
                limit: config.camera.scan_limit,
            },
        };
        let camera = Camera::open(selection)?;

        let detector = FaceMeshDetector::new(
            &config.models.face_detector,
            &config.models.face_mesh,
            config.models.score_threshold,
            config.models.max_faces,
        )?;

        let mut backend = create_backend(&config.backend, Platform::detect())?;
        let normal = match config.policy.normal_level {
            Some(percent) => BrightnessLevel::new(percent)?,
            None => seed_normal_level(backend.as_mut()),
        };
        let close = BrightnessLevel::new(config.policy.close_level)?;
        let policy = BrightnessPolicy::new(config.policy.threshold_cm, close, normal)
            .with_hysteresis(config.policy.hysteresis_cm)
            .with_debounce(config.policy.debounce);
        info!(
            "Dimming to {} below {:.1} cm, restoring {}",
            close, config.policy.threshold_cm, normal
        );

        let display: Box<dyn DisplaySurface> = if config.display.enabled {
            Box::new(PreviewWindow::new(&config.display.window_title)?)
        } else {
            info!("Running headless");
            Box::new(Headless)
        };

        let collaborators = Collaborators {
            source: Box::new(camera),
            detector: Box::new(detector),
            display,
            backend,
            monitor: Box::new(ProcessMonitor::new()),
        };
        let estimator = PinholeEstimator::new(
            config.distance.reference_width_cm,
            config.distance.focal_length_px,
        );

        Ok(Self {
            sampling: SamplingLoop::new(collaborators, estimator, policy, LoopSettings::from(config)),
        })
    }

    /// Run the sampling loop to completion
    ///
    /// # Errors
    ///
    /// Returns unexpected loop failures after cleanup.
    pub fn run(&mut self) -> Result<SessionSummary> {
        self.sampling.run()
    }
}
