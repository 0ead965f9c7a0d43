pub mod calibration;
pub mod error;
pub mod marker;
pub mod transform;

#[cfg(feature = "opencv")]
pub mod aruco;

pub use calibration::CalibrationFrame;
pub use error::{Result, SensorError};
pub use marker::{
    fronto_parallel_translation, DetectedMarker, MarkerCfg, MarkerDetector, MarkerPoseEstimator,
    PoseEstimate,
};
