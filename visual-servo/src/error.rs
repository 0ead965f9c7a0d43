use std::path::PathBuf;

use thiserror::Error;

/// Invalid servo or tracker configuration, reported by `finalize`.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed config: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("smoothing factor {0} outside (0, 1]")]
    InvalidSmoothingFactor(f64),

    #[error("joint index {index} out of range for {dimension} joints")]
    JointIndexOutOfRange { index: usize, dimension: usize },

    #[error("finger {finger} does not exist, hand has {fingers} fingers")]
    UnknownFinger { finger: usize, fingers: usize },

    #[error("camera {camera} selected but only {cameras} cameras are configured")]
    UnknownCamera { camera: usize, cameras: usize },

    #[error("{calibrations} calibrations given for {cameras} cameras")]
    CameraCount { calibrations: usize, cameras: usize },

    #[error("{0} must be positive")]
    NotPositive(&'static str),

    #[error("{0} must not be negative")]
    Negative(&'static str),
}
