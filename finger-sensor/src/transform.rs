//! Rigid transforms between the camera and the world frame.

use sophus::nalgebra::Matrix4;

use finger_core::PointCoordinates;

/// Maps a camera-frame point into the world frame: homogenize, multiply,
/// drop the homogeneous coordinate.
pub fn camera_to_world(cam_to_world: &Matrix4<f64>, point_in_camera: &PointCoordinates) -> PointCoordinates {
    apply(cam_to_world, point_in_camera)
}

pub fn world_to_camera(world_to_cam: &Matrix4<f64>, point_in_world: &PointCoordinates) -> PointCoordinates {
    apply(world_to_cam, point_in_world)
}

fn apply(transform: &Matrix4<f64>, point: &PointCoordinates) -> PointCoordinates {
    (transform * point.push(1.0)).xyz()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use sophus::nalgebra::{Rotation3, Translation3, Vector3};

    fn camera_pose() -> Matrix4<f64> {
        let rotation = Rotation3::from_axis_angle(&Vector3::x_axis(), 2.1)
            * Rotation3::from_axis_angle(&Vector3::z_axis(), 0.4);
        Translation3::new(0.02, -0.05, 0.6).to_homogeneous() * rotation.to_homogeneous()
    }

    #[test]
    fn test_round_trip_through_camera_frame() {
        let world_to_cam = camera_pose();
        let cam_to_world = world_to_cam.try_inverse().unwrap();
        let world_point = PointCoordinates::new(0.05, -0.1, 0.0325);

        let in_camera = world_to_camera(&world_to_cam, &world_point);
        let back = camera_to_world(&cam_to_world, &in_camera);

        assert_relative_eq!(back.x, world_point.x, epsilon = 1e-12);
        assert_relative_eq!(back.y, world_point.y, epsilon = 1e-12);
        assert_relative_eq!(back.z, world_point.z, epsilon = 1e-12);
    }

    #[test]
    fn test_translation_only() {
        let transform = Translation3::new(1.0, 2.0, 3.0).to_homogeneous();
        let moved = camera_to_world(&transform, &PointCoordinates::zeros());
        assert_eq!(moved, PointCoordinates::new(1.0, 2.0, 3.0));
    }
}
