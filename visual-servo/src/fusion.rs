use serde::Deserialize;

use finger_core::PointCoordinates;
use finger_sensor::PoseEstimate;

/// Which cameras contribute to the target.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum CameraMode {
    /// Only this camera is used, its misses are not filled in by others.
    Single { camera: usize },
    /// Mean over every camera that found the marker.
    #[default]
    Multi,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum FusedTarget {
    Available(PointCoordinates),
    Unavailable,
}

impl FusedTarget {
    pub fn position(&self) -> Option<&PointCoordinates> {
        match self {
            FusedTarget::Available(position) => Some(position),
            FusedTarget::Unavailable => None,
        }
    }

    pub fn is_available(&self) -> bool {
        matches!(self, FusedTarget::Available(_))
    }
}

impl From<Option<PointCoordinates>> for FusedTarget {
    fn from(position: Option<PointCoordinates>) -> Self {
        position.map_or(FusedTarget::Unavailable, FusedTarget::Available)
    }
}

/// Combines the per-camera estimates of one tick.
///
/// All cameras weigh the same. The result only depends on the set of
/// estimates, never on earlier ticks.
#[derive(Clone, Debug, Default)]
pub struct MultiCameraFusion {
    mode: CameraMode,
}

impl MultiCameraFusion {
    pub fn new(mode: CameraMode) -> Self {
        Self { mode }
    }

    pub fn mode(&self) -> CameraMode {
        self.mode
    }

    /// Whether estimates of `camera_index` can influence the result.
    pub fn uses_camera(&self, camera_index: usize) -> bool {
        match self.mode {
            CameraMode::Single { camera } => camera == camera_index,
            CameraMode::Multi => true,
        }
    }

    pub fn fuse(&self, estimates: &[PoseEstimate]) -> FusedTarget {
        match self.mode {
            CameraMode::Single { camera } => estimates
                .iter()
                .find(|estimate| estimate.camera_index == camera)
                .and_then(|estimate| estimate.position)
                .into(),
            CameraMode::Multi => {
                let available: Vec<&PointCoordinates> = estimates
                    .iter()
                    .filter_map(|estimate| estimate.position.as_ref())
                    .collect();
                if available.is_empty() {
                    return FusedTarget::Unavailable;
                }
                let sum: PointCoordinates = available.iter().copied().sum();
                FusedTarget::Available(sum / available.len() as f64)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn seen(camera_index: usize, x: f64, y: f64, z: f64) -> PoseEstimate {
        PoseEstimate {
            camera_index,
            position: Some(PointCoordinates::new(x, y, z)),
        }
    }

    #[test]
    fn test_multi_camera_averages_available_estimates() {
        let fusion = MultiCameraFusion::new(CameraMode::Multi);
        let estimates = [
            seen(0, 0.10, -0.02, 0.03),
            PoseEstimate::absent(1),
            seen(2, 0.12, 0.04, 0.05),
        ];
        let fused = fusion.fuse(&estimates);
        let position = fused.position().unwrap();
        assert_relative_eq!(position.x, 0.11, epsilon = 1e-12);
        assert_relative_eq!(position.y, 0.01, epsilon = 1e-12);
        assert_relative_eq!(position.z, 0.04, epsilon = 1e-12);
    }

    #[test]
    fn test_multi_camera_starves_without_estimates() {
        let fusion = MultiCameraFusion::new(CameraMode::Multi);
        let estimates = [PoseEstimate::absent(0), PoseEstimate::absent(1), PoseEstimate::absent(2)];
        assert_eq!(fusion.fuse(&estimates), FusedTarget::Unavailable);
        assert_eq!(fusion.fuse(&[]), FusedTarget::Unavailable);
    }

    #[test]
    fn test_single_camera_is_not_backfilled() {
        let fusion = MultiCameraFusion::new(CameraMode::Single { camera: 1 });
        let estimates = [seen(0, 0.1, 0.1, 0.1), PoseEstimate::absent(1)];
        assert_eq!(fusion.fuse(&estimates), FusedTarget::Unavailable);
        assert!(!fusion.uses_camera(0));
    }

    #[test]
    fn test_single_camera_passes_through() {
        let fusion = MultiCameraFusion::new(CameraMode::Single { camera: 1 });
        let estimates = [seen(0, 0.1, 0.1, 0.1), seen(1, 0.2, 0.3, 0.4)];
        assert_eq!(
            fusion.fuse(&estimates),
            FusedTarget::Available(PointCoordinates::new(0.2, 0.3, 0.4))
        );
    }

    #[test]
    fn test_camera_mode_from_yaml() {
        let single: CameraMode = serde_yaml::from_str("mode: single\ncamera: 2\n").unwrap();
        assert_eq!(single, CameraMode::Single { camera: 2 });
        let multi: CameraMode = serde_yaml::from_str("mode: multi\n").unwrap();
        assert_eq!(multi, CameraMode::Multi);
    }
}
