//! Constants used throughout the application

/// Face mesh landmark under the left eye
pub const LEFT_EYE_LANDMARK: usize = 145;

/// Face mesh landmark under the right eye
pub const RIGHT_EYE_LANDMARK: usize = 374;

/// Face mesh landmark at the top of the forehead, used to anchor the overlay
pub const FOREHEAD_LANDMARK: usize = 10;

/// Number of points produced by the face mesh model
pub const NUM_FACE_MESH_LANDMARKS: usize = 468;

/// Real-world distance between the two eye landmarks in centimetres
pub const DEFAULT_REFERENCE_WIDTH_CM: f64 = 6.3;

/// Focal length proxy of a typical laptop webcam in pixels
pub const DEFAULT_FOCAL_LENGTH_PX: f64 = 600.0;

/// Distance below which the screen is dimmed
pub const DEFAULT_THRESHOLD_CM: f64 = 45.0;

/// Brightness applied while the user sits too close
pub const DEFAULT_CLOSE_LEVEL: u8 = 1;

/// Normal brightness when the current level cannot be read
pub const FALLBACK_NORMAL_LEVEL: u8 = 100;

/// Sampling ceiling in frames per second
pub const DEFAULT_MAX_SAMPLES_PER_SECOND: f64 = 10.0;

/// Analyze every Nth captured frame
pub const DEFAULT_FRAME_SKIP: u32 = 2;

/// Sample resource usage every Nth analyzed frame
pub const DEFAULT_DIAGNOSTICS_INTERVAL: u32 = 10;

/// Camera indices tried during auto-discovery (0..N)
pub const CAMERA_SCAN_LIMIT: i32 = 6;

/// Title of the preview window
pub const WINDOW_TITLE: &str = "Miyobi";

/// Default quit key
pub const DEFAULT_QUIT_KEY: char = 'q';

/// Command-line brightness utility
pub const DEFAULT_BRIGHTNESS_COMMAND: &str = "brightnessctl";

/// Location of kernel backlight devices
pub const BACKLIGHT_DEVICES_PATH: &str = "/sys/class/backlight";

/// Overlay text offset from the forehead landmark
pub const OVERLAY_OFFSET_X: i32 = -100;
pub const OVERLAY_OFFSET_Y: i32 = -50;
