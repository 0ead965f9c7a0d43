use std::path::Path;

use serde::Deserialize;
use sophus::{
    core::linalg::VecF64,
    image::ImageSize,
    nalgebra::{DVector, Matrix3, Matrix4, SMatrix, Vector2},
    sensor::camera_enum::perspective_camera::PinholeCameraF64,
};

use finger_core::PointCoordinates;

use crate::error::{Result, SensorError};

const DEFAULT_IMAGE_WIDTH: usize = 720;
const DEFAULT_IMAGE_HEIGHT: usize = 540;

/// Intrinsics and extrinsics of one calibrated camera.
///
/// Immutable once built. `cam_to_world` is inverted a single time here, every
/// estimate afterwards only multiplies with it.
#[derive(Clone, Debug)]
pub struct CalibrationFrame {
    pub name: String,
    pub model: PinholeCameraF64,

    camera_matrix: Matrix3<f64>,
    distortion_coeffs: DVector<f64>,

    // extrinsics, world to camera and back (constant during operation)
    world_to_cam: Matrix4<f64>,
    cam_to_world: Matrix4<f64>,
}

impl CalibrationFrame {
    pub fn new(
        name: impl Into<String>,
        camera_matrix: Matrix3<f64>,
        distortion_coeffs: DVector<f64>,
        world_to_cam: Matrix4<f64>,
        image_size: ImageSize,
    ) -> Result<Self> {
        let cam_to_world = world_to_cam
            .try_inverse()
            .ok_or(SensorError::SingularTransform)?;

        let fx = camera_matrix[(0, 0)];
        let fy = camera_matrix[(1, 1)];
        let cx = camera_matrix[(0, 2)];
        let cy = camera_matrix[(1, 2)];
        let model =
            PinholeCameraF64::from_params_and_size(&VecF64::<4>::new(fx, fy, cx, cy), image_size);

        Ok(Self {
            name: name.into(),
            model,
            camera_matrix,
            distortion_coeffs,
            world_to_cam,
            cam_to_world,
        })
    }

    /// Reads a calibration document with `camera_matrix`,
    /// `distortion_coefficients` and `projection_matrix` entries, each given as
    /// `{rows, cols, data}` with row-major data.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| SensorError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let frame = Self::from_yaml_str(&text)?;
        log::debug!("loaded calibration {} from {}", frame.name, path.display());
        Ok(frame)
    }

    pub fn from_yaml_str(text: &str) -> Result<Self> {
        let file: CalibrationFile = serde_yaml::from_str(text)?;

        let camera_matrix = file.camera_matrix.to_matrix::<3, 3>("camera_matrix")?;
        let distortion_coeffs = file
            .distortion_coefficients
            .to_vector("distortion_coefficients")?;
        let world_to_cam = file.projection_matrix.to_matrix::<4, 4>("projection_matrix")?;

        Self::new(
            file.camera_name.unwrap_or_default(),
            camera_matrix,
            distortion_coeffs,
            world_to_cam,
            ImageSize::new(file.image_width, file.image_height),
        )
    }

    pub fn camera_matrix(&self) -> &Matrix3<f64> {
        &self.camera_matrix
    }

    pub fn distortion_coeffs(&self) -> &DVector<f64> {
        &self.distortion_coeffs
    }

    pub fn world_to_cam(&self) -> &Matrix4<f64> {
        &self.world_to_cam
    }

    pub fn cam_to_world(&self) -> &Matrix4<f64> {
        &self.cam_to_world
    }

    pub fn cols(&self) -> usize {
        self.model.image_size().width
    }

    pub fn rows(&self) -> usize {
        self.model.image_size().height
    }

    /// Undistorted pinhole projection. `None` behind the image plane.
    pub fn project(&self, point_in_camera: &PointCoordinates) -> Option<Vector2<f64>> {
        if point_in_camera.z <= f64::EPSILON {
            return None;
        }
        let params = self.model.params();
        Some(Vector2::new(
            params[0] * point_in_camera.x / point_in_camera.z + params[2],
            params[1] * point_in_camera.y / point_in_camera.z + params[3],
        ))
    }

    pub fn contains_pixel(&self, pixel: &Vector2<f64>) -> bool {
        pixel.x >= 0.0
            && pixel.y >= 0.0
            && pixel.x < self.cols() as f64
            && pixel.y < self.rows() as f64
    }
}

#[derive(Debug, Deserialize)]
struct CalibrationFile {
    #[serde(default)]
    camera_name: Option<String>,
    #[serde(default = "default_image_width")]
    image_width: usize,
    #[serde(default = "default_image_height")]
    image_height: usize,
    camera_matrix: MatrixEntry,
    distortion_coefficients: MatrixEntry,
    projection_matrix: MatrixEntry,
}

fn default_image_width() -> usize {
    DEFAULT_IMAGE_WIDTH
}

fn default_image_height() -> usize {
    DEFAULT_IMAGE_HEIGHT
}

#[derive(Debug, Deserialize)]
struct MatrixEntry {
    rows: usize,
    cols: usize,
    data: Vec<f64>,
}

impl MatrixEntry {
    fn to_matrix<const R: usize, const C: usize>(
        &self,
        key: &'static str,
    ) -> Result<SMatrix<f64, R, C>> {
        if self.rows != R || self.cols != C || self.data.len() != R * C {
            return Err(self.shape_error(key, R, C));
        }
        Ok(SMatrix::<f64, R, C>::from_row_slice(&self.data))
    }

    // distortion vectors come as 1xN or Nx1
    fn to_vector(&self, key: &'static str) -> Result<DVector<f64>> {
        if self.data.len() != self.rows * self.cols || self.rows.min(self.cols) != 1 {
            return Err(self.shape_error(key, 1, self.data.len()));
        }
        Ok(DVector::from_vec(self.data.clone()))
    }

    fn shape_error(&self, key: &'static str, expected_rows: usize, expected_cols: usize) -> SensorError {
        SensorError::MatrixShape {
            key,
            rows: self.rows,
            cols: self.cols,
            len: self.data.len(),
            expected_rows,
            expected_cols,
        }
    }
}
