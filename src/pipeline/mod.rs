pub mod camera;
pub mod compositor;
pub mod overlay;
pub mod recognizer;

pub use camera::{CameraSource, available_cameras};
pub use compositor::{CompositedFrame, display_channels};
pub use recognizer::{DetectorConfig, RecognizerBackend};
