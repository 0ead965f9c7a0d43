use anyhow::Result;

use finger_core::{CameraSource, ObjectState};
use finger_sensor::{MarkerDetector, MarkerPoseEstimator, PoseEstimate};

use crate::fusion::{FusedTarget, MultiCameraFusion};

/// Where the control loop gets its target from.
pub trait TargetSource {
    /// Target for the current tick. Not finding the object is reported as
    /// [`FusedTarget::Unavailable`], errors are reserved for a broken source.
    fn acquire(&mut self) -> Result<FusedTarget>;
}

/// Object position read straight from the simulation, no vision involved.
pub struct GroundTruthTarget<O> {
    object: O,
}

impl<O: ObjectState> GroundTruthTarget<O> {
    pub fn new(object: O) -> Self {
        Self { object }
    }
}

impl<O: ObjectState> TargetSource for GroundTruthTarget<O> {
    fn acquire(&mut self) -> Result<FusedTarget> {
        Ok(FusedTarget::Available(self.object.object_position()))
    }
}

/// Marker tracking over all cameras of a [`CameraSource`].
pub struct VisualTracker<C, D> {
    cameras: C,
    estimators: Vec<MarkerPoseEstimator<D>>,
    fusion: MultiCameraFusion,

    max_stale_ticks: Option<u64>,
    last_timestamp: Option<f64>,
    unchanged_reads: u64,
}

impl<C, D> VisualTracker<C, D>
where
    C: CameraSource,
    D: MarkerDetector<Image = C::Image>,
{
    /// One estimator per camera, in camera order.
    pub fn new(
        cameras: C,
        estimators: Vec<MarkerPoseEstimator<D>>,
        fusion: MultiCameraFusion,
        max_stale_ticks: Option<u64>,
    ) -> Self {
        Self {
            cameras,
            estimators,
            fusion,
            max_stale_ticks,
            last_timestamp: None,
            unchanged_reads: 0,
        }
    }

    pub fn fusion(&self) -> &MultiCameraFusion {
        &self.fusion
    }

    pub fn cameras(&self) -> &C {
        &self.cameras
    }

    fn is_stale(&mut self, timestamp: f64) -> bool {
        if self.last_timestamp == Some(timestamp) {
            self.unchanged_reads += 1;
        } else {
            self.last_timestamp = Some(timestamp);
            self.unchanged_reads = 0;
        }
        self.max_stale_ticks
            .is_some_and(|limit| self.unchanged_reads > limit)
    }

    /// Per-camera estimates for the latest frame set.
    pub fn estimate(&mut self) -> Result<Vec<PoseEstimate>> {
        let observation = self.cameras.latest_observation()?;
        if self.is_stale(observation.timestamp) {
            log::debug!(
                "frame set {} repeated for {} ticks",
                observation.timestamp,
                self.unchanged_reads
            );
            return Ok(Vec::new());
        }

        if observation.images.len() < self.estimators.len() {
            log::warn!(
                "camera source delivered {} images for {} cameras",
                observation.images.len(),
                self.estimators.len()
            );
        }

        let estimates = self
            .estimators
            .iter()
            .enumerate()
            .filter(|(_, estimator)| self.fusion.uses_camera(estimator.camera_index()))
            .map(|(i, estimator)| match observation.images.get(i) {
                Some(image) => estimator.estimate(image).unwrap_or_else(|err| {
                    log::warn!("camera {}: marker detection failed: {err}", estimator.camera_index());
                    PoseEstimate::absent(estimator.camera_index())
                }),
                None => PoseEstimate::absent(estimator.camera_index()),
            })
            .collect();
        Ok(estimates)
    }
}

impl<C, D> TargetSource for VisualTracker<C, D>
where
    C: CameraSource,
    D: MarkerDetector<Image = C::Image>,
{
    fn acquire(&mut self) -> Result<FusedTarget> {
        let estimates = self.estimate()?;
        let target = self.fusion.fuse(&estimates);
        if !target.is_available() {
            log::debug!("no marker estimate this tick");
        }
        Ok(target)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use approx::assert_relative_eq;
    use finger_core::{CameraObservation, PointCoordinates};
    use finger_sensor::{CalibrationFrame, DetectedMarker, MarkerCfg, SensorError};
    use finger_sim::{tricamera_calibrations, Block, SimCameraRig, SimCameraRigCfg, SimMarkerDetector, SyntheticFrame};

    use crate::fusion::CameraMode;

    fn quiet_cfg() -> SimCameraRigCfg {
        SimCameraRigCfg {
            dropout_probability: 0.0,
            pixel_noise: 0.0,
            ..SimCameraRigCfg::default()
        }
    }

    fn estimators<D: MarkerDetector + Clone>(
        calibrations: &[Arc<CalibrationFrame>],
        detector: D,
    ) -> Vec<MarkerPoseEstimator<D>> {
        calibrations
            .iter()
            .enumerate()
            .map(|(i, calibration)| {
                MarkerPoseEstimator::new(i, calibration.clone(), detector.clone(), MarkerCfg::default())
            })
            .collect()
    }

    #[test]
    fn test_ground_truth_follows_the_block() {
        let block = Block::default();
        let mut target = GroundTruthTarget::new(block.clone());
        block.set_state(PointCoordinates::new(0.02, 0.03, 0.0325), [0.0, 0.0, 0.0, 1.0]);
        assert_eq!(
            target.acquire().unwrap(),
            FusedTarget::Available(PointCoordinates::new(0.02, 0.03, 0.0325))
        );
    }

    #[test]
    fn test_fuses_all_cameras_of_the_rig() {
        let calibrations = tricamera_calibrations().unwrap();
        let block = Block::new(PointCoordinates::new(-0.03, 0.07, 0.0325));
        let rig = SimCameraRig::new(calibrations.clone(), block, quiet_cfg()).unwrap();
        let mut tracker = VisualTracker::new(
            rig,
            estimators(&calibrations, SimMarkerDetector),
            MultiCameraFusion::new(CameraMode::Multi),
            None,
        );

        let estimates = tracker.estimate().unwrap();
        assert_eq!(estimates.len(), 3);
        let target = tracker.acquire().unwrap();
        let position = target.position().unwrap();
        assert_relative_eq!(position.x, -0.03, epsilon = 1e-9);
        assert_relative_eq!(position.y, 0.07, epsilon = 1e-9);
    }

    #[test]
    fn test_single_mode_only_runs_the_selected_camera() {
        let calibrations = tricamera_calibrations().unwrap();
        let rig = SimCameraRig::new(calibrations.clone(), Block::default(), quiet_cfg()).unwrap();
        let mut tracker = VisualTracker::new(
            rig,
            estimators(&calibrations, SimMarkerDetector),
            MultiCameraFusion::new(CameraMode::Single { camera: 2 }),
            None,
        );
        let estimates = tracker.estimate().unwrap();
        assert_eq!(estimates.len(), 1);
        assert_eq!(estimates[0].camera_index, 2);
    }

    #[test]
    fn test_full_dropout_starves_the_target() {
        let calibrations = tricamera_calibrations().unwrap();
        let cfg = SimCameraRigCfg {
            dropout_probability: 1.0,
            ..SimCameraRigCfg::default()
        };
        let rig = SimCameraRig::new(calibrations.clone(), Block::default(), cfg).unwrap();
        let mut tracker = VisualTracker::new(
            rig,
            estimators(&calibrations, SimMarkerDetector),
            MultiCameraFusion::default(),
            None,
        );
        assert_eq!(tracker.acquire().unwrap(), FusedTarget::Unavailable);
    }

    #[derive(Clone)]
    struct FailingDetector;

    impl MarkerDetector for FailingDetector {
        type Image = SyntheticFrame;

        fn detect(&self, _image: &SyntheticFrame) -> finger_sensor::Result<Vec<DetectedMarker>> {
            Err(SensorError::Detection(String::from("sensor unplugged")))
        }

        fn estimate_translation(
            &self,
            _marker: &DetectedMarker,
            _marker_length: f64,
            _calibration: &CalibrationFrame,
        ) -> finger_sensor::Result<PointCoordinates> {
            Err(SensorError::Detection(String::from("sensor unplugged")))
        }
    }

    #[test]
    fn test_detector_failures_count_as_misses() {
        let calibrations = tricamera_calibrations().unwrap();
        let rig = SimCameraRig::new(calibrations.clone(), Block::default(), quiet_cfg()).unwrap();
        let mut tracker = VisualTracker::new(
            rig,
            estimators(&calibrations, FailingDetector),
            MultiCameraFusion::default(),
            None,
        );
        assert_eq!(tracker.acquire().unwrap(), FusedTarget::Unavailable);
    }

    struct FrozenCamera {
        frame: SyntheticFrame,
    }

    impl CameraSource for FrozenCamera {
        type Image = SyntheticFrame;

        fn number_of_cameras(&self) -> usize {
            1
        }

        fn latest_observation(&mut self) -> Result<CameraObservation<SyntheticFrame>> {
            Ok(CameraObservation {
                timestamp: 1.5,
                images: vec![self.frame.clone()],
            })
        }
    }

    #[test]
    fn test_repeated_frames_go_stale() {
        let calibrations = tricamera_calibrations().unwrap();
        let mut rig = SimCameraRig::new(calibrations.clone(), Block::default(), quiet_cfg()).unwrap();
        let frame = rig.latest_observation().unwrap().images.remove(0);
        let mut tracker = VisualTracker::new(
            FrozenCamera { frame },
            estimators(&calibrations[..1], SimMarkerDetector),
            MultiCameraFusion::default(),
            Some(2),
        );

        // first read plus two repeats are still accepted
        for _ in 0..3 {
            assert!(tracker.acquire().unwrap().is_available());
        }
        assert_eq!(tracker.acquire().unwrap(), FusedTarget::Unavailable);
    }

    #[test]
    fn test_missing_images_count_as_absent() {
        let calibrations = tricamera_calibrations().unwrap();
        let mut rig = SimCameraRig::new(calibrations.clone(), Block::default(), quiet_cfg()).unwrap();
        let frame = rig.latest_observation().unwrap().images.remove(0);
        let mut tracker = VisualTracker::new(
            FrozenCamera { frame },
            estimators(&calibrations, SimMarkerDetector),
            MultiCameraFusion::default(),
            None,
        );

        let estimates = tracker.estimate().unwrap();
        assert_eq!(estimates.len(), 3);
        assert!(estimates[0].position.is_some());
        assert_eq!(estimates[1], PoseEstimate::absent(1));
        assert_eq!(estimates[2], PoseEstimate::absent(2));
        assert!(tracker.acquire().unwrap().is_available());
    }
}
