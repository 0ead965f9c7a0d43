use std::sync::Arc;

use serde::Deserialize;
use sophus::nalgebra::Vector2;

use finger_core::PointCoordinates;

use crate::{
    calibration::CalibrationFrame,
    error::{Result, SensorError},
    transform::camera_to_world,
};

/// Identity and physical size of the tracked fiducial.
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct MarkerCfg {
    pub marker_id: i32,
    // side length in meters
    pub marker_length: f64,
    pub dictionary: String,
}

impl Default for MarkerCfg {
    fn default() -> Self {
        Self {
            marker_id: 0,
            marker_length: 0.04,
            dictionary: String::from("DICT_APRILTAG_16h5"),
        }
    }
}

/// One detected fiducial: its id and image corners, clockwise from top-left.
#[derive(Clone, Debug, PartialEq)]
pub struct DetectedMarker {
    pub id: i32,
    pub corners: [Vector2<f64>; 4],
}

impl DetectedMarker {
    pub fn center(&self) -> Vector2<f64> {
        self.corners.iter().sum::<Vector2<f64>>() / 4.0
    }
}

/// Image to marker corners, and marker corners to camera-frame translation.
pub trait MarkerDetector {
    type Image;

    fn detect(&self, image: &Self::Image) -> Result<Vec<DetectedMarker>>;

    fn estimate_translation(
        &self,
        marker: &DetectedMarker,
        marker_length: f64,
        calibration: &CalibrationFrame,
    ) -> Result<PointCoordinates>;
}

/// Marker position seen by one camera during one tick.
#[derive(Clone, Debug, PartialEq)]
pub struct PoseEstimate {
    pub camera_index: usize,
    // world frame, `None` if the marker was not found in this image
    pub position: Option<PointCoordinates>,
}

impl PoseEstimate {
    pub fn absent(camera_index: usize) -> Self {
        Self {
            camera_index,
            position: None,
        }
    }
}

/// Locates the configured marker in the images of a single camera.
pub struct MarkerPoseEstimator<D> {
    camera_index: usize,
    calibration: Arc<CalibrationFrame>,
    detector: D,
    marker: MarkerCfg,
}

impl<D: MarkerDetector> MarkerPoseEstimator<D> {
    pub fn new(
        camera_index: usize,
        calibration: Arc<CalibrationFrame>,
        detector: D,
        marker: MarkerCfg,
    ) -> Self {
        Self {
            camera_index,
            calibration,
            detector,
            marker,
        }
    }

    pub fn camera_index(&self) -> usize {
        self.camera_index
    }

    pub fn calibration(&self) -> &CalibrationFrame {
        &self.calibration
    }

    /// World position of the marker in `image`.
    ///
    /// A marker that is not in the image is an ordinary outcome and yields an
    /// estimate without position. Errors are reserved for detector failures.
    pub fn estimate(&self, image: &D::Image) -> Result<PoseEstimate> {
        let detections = self.detector.detect(image)?;
        let Some(marker) = detections
            .iter()
            .find(|detection| detection.id == self.marker.marker_id)
        else {
            return Ok(PoseEstimate::absent(self.camera_index));
        };

        let in_camera =
            self.detector
                .estimate_translation(marker, self.marker.marker_length, &self.calibration)?;
        let in_world = camera_to_world(self.calibration.cam_to_world(), &in_camera);

        Ok(PoseEstimate {
            camera_index: self.camera_index,
            position: Some(in_world),
        })
    }
}

/// Translation of a square marker facing the camera, from its undistorted
/// corners. Depth comes from the apparent edge lengths, lateral offset from
/// the corner centroid.
pub fn fronto_parallel_translation(
    marker: &DetectedMarker,
    marker_length: f64,
    calibration: &CalibrationFrame,
) -> Result<PointCoordinates> {
    let [c0, c1, c2, c3] = &marker.corners;
    let horizontal = ((c1 - c0).norm() + (c2 - c3).norm()) / 2.0;
    let vertical = ((c2 - c1).norm() + (c3 - c0).norm()) / 2.0;
    if horizontal < f64::EPSILON || vertical < f64::EPSILON {
        return Err(SensorError::DegenerateMarker(format!(
            "marker {} spans {horizontal}x{vertical} pixels",
            marker.id
        )));
    }

    let params = calibration.model.params();
    let (fx, fy, cx, cy) = (params[0], params[1], params[2], params[3]);
    let depth = (fx * marker_length / horizontal + fy * marker_length / vertical) / 2.0;
    let center = marker.center();

    Ok(PointCoordinates::new(
        (center.x - cx) * depth / fx,
        (center.y - cy) * depth / fy,
        depth,
    ))
}
