use std::sync::Arc;

use anyhow::{ensure, Result};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::Deserialize;
use sophus::{
    image::ImageSize,
    nalgebra::{DVector, Matrix3, Matrix4, Vector2, Vector3},
};

use finger_core::{CameraObservation, CameraSource, ObjectState, PointCoordinates};
use finger_sensor::{
    fronto_parallel_translation, transform::world_to_camera, CalibrationFrame, DetectedMarker,
    MarkerCfg, MarkerDetector,
};

use crate::{block::Block, SIMULATION_TIME_STEP};

/// Markers a simulated camera "sees" in one frame.
#[derive(Clone, Debug, PartialEq)]
pub struct SyntheticFrame {
    pub camera_index: usize,
    pub markers: Vec<DetectedMarker>,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct SimCameraRigCfg {
    // a new frame set every n reads, in between the last one is repeated
    pub frame_period_reads: u64,
    // seconds between two reads
    pub read_interval: f64,
    // chance that a camera misses the marker in a frame
    pub dropout_probability: f64,
    // uniform corner noise amplitude, in pixels
    pub pixel_noise: f64,
    pub seed: u64,
    pub marker: MarkerCfg,
}

impl Default for SimCameraRigCfg {
    fn default() -> Self {
        Self {
            frame_period_reads: 3,
            read_interval: SIMULATION_TIME_STEP,
            dropout_probability: 0.2,
            pixel_noise: 0.3,
            seed: 0,
            marker: MarkerCfg::default(),
        }
    }
}

/// Cameras around the arena that render the cube's marker as corner sets.
///
/// The marker is drawn as a square facing the camera, centered on the cube.
pub struct SimCameraRig {
    calibrations: Vec<Arc<CalibrationFrame>>,
    block: Block,
    cfg: SimCameraRigCfg,
    rng: ChaCha8Rng,

    reads: u64,
    latest: Option<CameraObservation<SyntheticFrame>>,
}

impl SimCameraRig {
    pub fn new(calibrations: Vec<Arc<CalibrationFrame>>, block: Block, cfg: SimCameraRigCfg) -> Result<Self> {
        ensure!(
            (0.0..=1.0).contains(&cfg.dropout_probability),
            "dropout probability {} outside [0, 1]",
            cfg.dropout_probability
        );
        ensure!(cfg.frame_period_reads > 0, "frame period must be at least one read");
        ensure!(cfg.pixel_noise >= 0.0, "pixel noise must not be negative");

        Ok(Self {
            calibrations,
            block,
            rng: ChaCha8Rng::seed_from_u64(cfg.seed),
            cfg,
            reads: 0,
            latest: None,
        })
    }

    fn capture(&mut self) -> CameraObservation<SyntheticFrame> {
        let object = self.block.object_position();
        let images = (0..self.calibrations.len())
            .map(|camera_index| {
                let markers = self.render(camera_index, &object).into_iter().collect();
                SyntheticFrame {
                    camera_index,
                    markers,
                }
            })
            .collect();

        CameraObservation {
            timestamp: self.reads as f64 * self.cfg.read_interval,
            images,
        }
    }

    fn render(&mut self, camera_index: usize, object: &PointCoordinates) -> Option<DetectedMarker> {
        if self.rng.gen_bool(self.cfg.dropout_probability) {
            return None;
        }

        let calibration = &self.calibrations[camera_index];
        let center = world_to_camera(calibration.world_to_cam(), object);
        let h = self.cfg.marker.marker_length / 2.0;

        let mut corners = [Vector2::zeros(); 4];
        for (corner, (dx, dy)) in corners.iter_mut().zip([(-h, -h), (h, -h), (h, h), (-h, h)]) {
            let pixel = calibration.project(&(center + Vector3::new(dx, dy, 0.0)))?;
            if !calibration.contains_pixel(&pixel) {
                return None;
            }
            *corner = pixel;
        }

        let noise = self.cfg.pixel_noise;
        for corner in corners.iter_mut() {
            corner.x += self.rng.gen_range(-noise..=noise);
            corner.y += self.rng.gen_range(-noise..=noise);
        }

        Some(DetectedMarker {
            id: self.cfg.marker.marker_id,
            corners,
        })
    }
}

impl CameraSource for SimCameraRig {
    type Image = SyntheticFrame;

    fn number_of_cameras(&self) -> usize {
        self.calibrations.len()
    }

    fn latest_observation(&mut self) -> Result<CameraObservation<SyntheticFrame>> {
        let due = self.reads % self.cfg.frame_period_reads == 0;
        let observation = match self.latest.take() {
            Some(latest) if !due => latest,
            _ => self.capture(),
        };
        self.reads += 1;
        self.latest = Some(observation.clone());
        Ok(observation)
    }
}

/// Reads the corner sets of a [`SyntheticFrame`].
#[derive(Clone, Copy, Debug, Default)]
pub struct SimMarkerDetector;

impl MarkerDetector for SimMarkerDetector {
    type Image = SyntheticFrame;

    fn detect(&self, image: &SyntheticFrame) -> finger_sensor::Result<Vec<DetectedMarker>> {
        Ok(image.markers.clone())
    }

    fn estimate_translation(
        &self,
        marker: &DetectedMarker,
        marker_length: f64,
        calibration: &CalibrationFrame,
    ) -> finger_sensor::Result<PointCoordinates> {
        fronto_parallel_translation(marker, marker_length, calibration)
    }
}

/// World to camera transform of a camera at `eye` looking at `target`, with
/// the image y axis pointing down.
pub fn camera_looking_at(eye: &PointCoordinates, target: &PointCoordinates) -> Matrix4<f64> {
    let forward = (target - eye).normalize();
    let right = forward.cross(&Vector3::z()).normalize();
    let down = forward.cross(&right);

    let rotation = Matrix3::from_rows(&[right.transpose(), down.transpose(), forward.transpose()]);
    let translation = -(rotation * eye);

    let mut world_to_cam = Matrix4::identity();
    world_to_cam.fixed_view_mut::<3, 3>(0, 0).copy_from(&rotation);
    world_to_cam.fixed_view_mut::<3, 1>(0, 3).copy_from(&translation);
    world_to_cam
}

/// Three cameras at 60, 180 and 300 degrees around the arena.
pub fn tricamera_calibrations() -> Result<Vec<Arc<CalibrationFrame>>> {
    let camera_matrix = Matrix3::new(590.0, 0.0, 360.0, 0.0, 590.0, 270.0, 0.0, 0.0, 1.0);
    let look_at = PointCoordinates::new(0.0, 0.0, 0.03);

    [60.0_f64, 180.0, 300.0]
        .iter()
        .map(|degrees| {
            let (s, c) = degrees.to_radians().sin_cos();
            let eye = PointCoordinates::new(0.55 * c, 0.55 * s, 0.35);
            let frame = CalibrationFrame::new(
                format!("camera{degrees}"),
                camera_matrix,
                DVector::zeros(5),
                camera_looking_at(&eye, &look_at),
                ImageSize::new(720, 540),
            )?;
            Ok(Arc::new(frame))
        })
        .collect()
}
