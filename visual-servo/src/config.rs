use std::{num::NonZeroU64, path::Path, sync::Arc, time::Duration};

use anyhow::Result;
use serde::Deserialize;

use finger_core::{finger_joint_range, CameraSource, JointConfiguration, Kinematics, Platform, PointCoordinates, Real};
use finger_sensor::{CalibrationFrame, MarkerCfg, MarkerDetector, MarkerPoseEstimator};

use crate::{
    control_loop::ControlLoop,
    error::ConfigError,
    fusion::{CameraMode, MultiCameraFusion},
    planner::IkMotionPlanner,
    smoother::TrajectorySmoother,
    tracking::{TargetSource, VisualTracker},
};

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default)]
pub struct TrackerCfg {
    pub camera_mode: CameraMode,
    // report no target once the camera source repeats a frame set this often
    pub max_stale_ticks: Option<u64>,
    pub marker: MarkerCfg,
}

impl TrackerCfg {
    /// One estimator per calibration, calibration `i` belongs to camera `i`.
    pub fn finalize<C, D>(
        self,
        cameras: C,
        calibrations: Vec<Arc<CalibrationFrame>>,
        detector: D,
    ) -> Result<VisualTracker<C, D>, ConfigError>
    where
        C: CameraSource,
        D: MarkerDetector<Image = C::Image> + Clone,
    {
        let number_of_cameras = cameras.number_of_cameras();
        if calibrations.len() != number_of_cameras {
            return Err(ConfigError::CameraCount {
                calibrations: calibrations.len(),
                cameras: number_of_cameras,
            });
        }
        if let CameraMode::Single { camera } = self.camera_mode {
            if camera >= number_of_cameras {
                return Err(ConfigError::UnknownCamera {
                    camera,
                    cameras: number_of_cameras,
                });
            }
        }

        let estimators = calibrations
            .into_iter()
            .enumerate()
            .map(|(camera_index, calibration)| {
                MarkerPoseEstimator::new(camera_index, calibration, detector.clone(), self.marker.clone())
            })
            .collect();

        log::info!(
            "tracking marker {} with {number_of_cameras} cameras, {:?}",
            self.marker.marker_id,
            self.camera_mode
        );

        Ok(VisualTracker::new(
            cameras,
            estimators,
            MultiCameraFusion::new(self.camera_mode),
            self.max_stale_ticks,
        ))
    }
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct ServoLoopCfg {
    // joint angles of one finger, used for every finger
    pub initial_posture: [Real; 3],
    pub init_hold_ticks: u64,

    pub finger_index: usize,
    pub target_offset: [Real; 3],
    pub ik_tolerance: Real,
    pub ik_max_iterations: usize,

    pub smoothing_alpha: Real,
    // seconds to wait after a tick without target
    pub hold_sleep_s: f64,
    pub diagnostics_every: u64,

    pub tracker: TrackerCfg,
}

impl Default for ServoLoopCfg {
    fn default() -> Self {
        Self {
            initial_posture: [0.0, 1.5, -2.7],
            init_hold_ticks: 500,
            finger_index: 0,
            target_offset: [0.0, 0.0, 0.06],
            ik_tolerance: 0.002,
            ik_max_iterations: 3000,
            smoothing_alpha: 0.1,
            hold_sleep_s: 0.1,
            diagnostics_every: 500,
            tracker: TrackerCfg::default(),
        }
    }
}

impl ServoLoopCfg {
    pub fn from_yaml_str(yaml: &str) -> Result<Self, ConfigError> {
        Ok(serde_yaml::from_str(yaml)?)
    }

    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let yaml = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_yaml_str(&yaml)
    }

    pub fn finalize<P, T, K>(self, platform: P, target_source: T, kinematics: K) -> Result<ControlLoop<P, T, K>>
    where
        P: Platform,
        T: TargetSource,
        K: Kinematics,
    {
        let fingers = kinematics.number_of_fingers();
        if self.finger_index >= fingers {
            return Err(ConfigError::UnknownFinger {
                finger: self.finger_index,
                fingers,
            }
            .into());
        }
        let diagnostics_every =
            NonZeroU64::new(self.diagnostics_every).ok_or(ConfigError::NotPositive("diagnostics_every"))?;
        if !(self.ik_tolerance > 0.0) {
            return Err(ConfigError::NotPositive("ik_tolerance").into());
        }
        if self.ik_max_iterations == 0 {
            return Err(ConfigError::NotPositive("ik_max_iterations").into());
        }
        if !(self.hold_sleep_s >= 0.0 && self.hold_sleep_s.is_finite()) {
            return Err(ConfigError::Negative("hold_sleep_s").into());
        }

        let initial_posture = JointConfiguration::repeated(self.initial_posture, fingers);
        let smoother = TrajectorySmoother::new(
            self.smoothing_alpha,
            finger_joint_range(self.finger_index),
            initial_posture.len(),
        )?;
        let planner = IkMotionPlanner::new(
            kinematics,
            self.finger_index,
            PointCoordinates::from(self.target_offset),
            self.ik_tolerance,
            self.ik_max_iterations,
        );

        log::info!(
            "servoing finger {} of {fingers}, alpha {}, target offset {:?}",
            self.finger_index,
            self.smoothing_alpha,
            self.target_offset
        );

        Ok(ControlLoop::new(
            platform,
            target_source,
            planner,
            smoother,
            initial_posture,
            self.init_hold_ticks,
            Duration::from_secs_f64(self.hold_sleep_s),
            diagnostics_every,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use finger_core::ObjectState;
    use finger_sim::{tricamera_calibrations, Block, FingerType, SimCameraRig, SimCameraRigCfg, SimFinger, SimMarkerDetector};

    use crate::tracking::GroundTruthTarget;

    #[test]
    fn test_defaults_from_empty_yaml() {
        let cfg = ServoLoopCfg::from_yaml_str("{}").unwrap();
        assert_eq!(cfg.initial_posture, [0.0, 1.5, -2.7]);
        assert_eq!(cfg.init_hold_ticks, 500);
        assert_eq!(cfg.smoothing_alpha, 0.1);
        assert_eq!(cfg.tracker.camera_mode, CameraMode::Multi);
        assert_eq!(cfg.tracker.max_stale_ticks, None);
    }

    #[test]
    fn test_partial_yaml_overrides() {
        let yaml = "
smoothing_alpha: 0.25
finger_index: 2
tracker:
  camera_mode:
    mode: single
    camera: 1
  max_stale_ticks: 30
  marker:
    marker_id: 5
";
        let cfg = ServoLoopCfg::from_yaml_str(yaml).unwrap();
        assert_eq!(cfg.smoothing_alpha, 0.25);
        assert_eq!(cfg.finger_index, 2);
        assert_eq!(cfg.tracker.camera_mode, CameraMode::Single { camera: 1 });
        assert_eq!(cfg.tracker.max_stale_ticks, Some(30));
        assert_eq!(cfg.tracker.marker.marker_id, 5);
        assert_eq!(cfg.tracker.marker.marker_length, 0.04);
        assert_eq!(cfg.diagnostics_every, 500);
    }

    #[test]
    fn test_missing_file_is_a_read_error() {
        let err = ServoLoopCfg::from_yaml_file("/nonexistent/servo.yaml").unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }

    fn finalize_with(cfg: ServoLoopCfg) -> Result<()> {
        let finger = SimFinger::new(FingerType::Tri, 0.004);
        let kinematics = finger.kinematics().clone();
        cfg.finalize(finger, GroundTruthTarget::new(Block::default()), kinematics)
            .map(|_| ())
    }

    #[test]
    fn test_rejects_unknown_finger() {
        let cfg = ServoLoopCfg {
            finger_index: 3,
            ..ServoLoopCfg::default()
        };
        let err = finalize_with(cfg).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<ConfigError>(),
            Some(ConfigError::UnknownFinger { finger: 3, fingers: 3 })
        ));
    }

    #[test]
    fn test_rejects_invalid_alpha() {
        let cfg = ServoLoopCfg {
            smoothing_alpha: 0.0,
            ..ServoLoopCfg::default()
        };
        let err = finalize_with(cfg).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<ConfigError>(),
            Some(ConfigError::InvalidSmoothingFactor(_))
        ));
    }

    #[test]
    fn test_rejects_zero_diagnostics_period() {
        let cfg = ServoLoopCfg {
            diagnostics_every: 0,
            ..ServoLoopCfg::default()
        };
        let err = finalize_with(cfg).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<ConfigError>(),
            Some(ConfigError::NotPositive("diagnostics_every"))
        ));
        assert!(finalize_with(ServoLoopCfg::default()).is_ok());
    }

    #[test]
    fn test_tracker_checks_camera_selection() {
        let calibrations = tricamera_calibrations().unwrap();
        let block = Block::default();
        let rig = SimCameraRig::new(calibrations.clone(), block.clone(), SimCameraRigCfg::default()).unwrap();
        let cfg = TrackerCfg {
            camera_mode: CameraMode::Single { camera: 3 },
            ..TrackerCfg::default()
        };
        assert!(matches!(
            cfg.finalize(rig, calibrations.clone(), SimMarkerDetector),
            Err(ConfigError::UnknownCamera { camera: 3, cameras: 3 })
        ));

        let rig = SimCameraRig::new(calibrations.clone(), block.clone(), SimCameraRigCfg::default()).unwrap();
        assert!(matches!(
            TrackerCfg::default().finalize(rig, calibrations[..2].to_vec(), SimMarkerDetector),
            Err(ConfigError::CameraCount { calibrations: 2, cameras: 3 })
        ));
        assert!(block.object_position().z > 0.0);
    }
}
