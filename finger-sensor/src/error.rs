//! Error types for camera calibration and marker sensing.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum SensorError {
    #[error("cannot read calibration file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed calibration document: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("calibration entry `{key}` is {rows}x{cols} with {len} values, expected {expected_rows}x{expected_cols}")]
    MatrixShape {
        key: &'static str,
        rows: usize,
        cols: usize,
        len: usize,
        expected_rows: usize,
        expected_cols: usize,
    },

    #[error("world to camera transform is not invertible")]
    SingularTransform,

    #[error("degenerate marker corners: {0}")]
    DegenerateMarker(String),

    #[error("marker detection failed: {0}")]
    Detection(String),
}

pub type Result<T> = std::result::Result<T, SensorError>;

#[cfg(feature = "opencv")]
impl From<opencv::Error> for SensorError {
    fn from(error: opencv::Error) -> Self {
        Self::Detection(error.to_string())
    }
}
