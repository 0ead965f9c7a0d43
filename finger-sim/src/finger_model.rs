use std::f64::consts::PI;

use anyhow::{bail, Result};
use sophus::nalgebra::{Matrix3, Vector3};

use finger_core::{
    finger_joint_range, JointConfiguration, Kinematics, PointCoordinates, Real, JOINTS_PER_FINGER,
};

/// Link lengths and mounting of one finger. All fingers share it, finger `i`
/// is rotated by `i * 120°` about the vertical axis.
#[derive(Clone, Debug)]
pub struct FingerGeometry {
    // horizontal offset of the upper joint from the arena center
    pub base_radius: Real,
    pub base_height: Real,
    pub upper_link: Real,
    pub lower_link: Real,
}

impl Default for FingerGeometry {
    fn default() -> Self {
        Self {
            base_radius: 0.04,
            base_height: 0.29,
            upper_link: 0.16,
            lower_link: 0.16,
        }
    }
}

#[derive(Clone, Debug)]
pub struct FingerKinematics {
    geometry: FingerGeometry,
    number_of_fingers: usize,
    // damping of the least squares step
    damping: Real,
}

const JACOBIAN_STEP: Real = 1e-6;
// largest joint change of a single solver iteration, in radians
const MAX_STEP: Real = 0.5;

impl FingerKinematics {
    pub fn new(geometry: FingerGeometry, number_of_fingers: usize) -> Self {
        Self {
            geometry,
            number_of_fingers,
            damping: 1e-2,
        }
    }

    pub fn geometry(&self) -> &FingerGeometry {
        &self.geometry
    }

    fn mounting_angle(&self, finger_index: usize) -> Real {
        2.0 * PI * finger_index as Real / 3.0
    }

    /// Tip of one finger for its three joint angles.
    pub fn tip_position(&self, finger_index: usize, joints: &[Real]) -> PointCoordinates {
        let g = &self.geometry;
        let (q0, q1, q2) = (joints[0], joints[1], joints[2]);

        // both links swing in the finger's local y-z plane, bending inwards
        let link = |angle: Real, length: Real| Vector3::new(0.0, -length * angle.sin(), -length * angle.cos());
        let chain = link(q1, g.upper_link) + link(q1 + q2, g.lower_link);

        // abduction about the local y axis
        let abducted = Vector3::new(q0.sin() * chain.z, chain.y, q0.cos() * chain.z);
        let local = Vector3::new(0.0, g.base_radius, g.base_height) + abducted;

        let (s, c) = self.mounting_angle(finger_index).sin_cos();
        PointCoordinates::new(c * local.x - s * local.y, s * local.x + c * local.y, local.z)
    }

    fn jacobian(&self, finger_index: usize, joints: &[Real]) -> Matrix3<Real> {
        let mut jacobian = Matrix3::zeros();
        for column in 0..JOINTS_PER_FINGER {
            let mut forward = [joints[0], joints[1], joints[2]];
            let mut backward = forward;
            forward[column] += JACOBIAN_STEP;
            backward[column] -= JACOBIAN_STEP;
            let derivative = (self.tip_position(finger_index, &forward)
                - self.tip_position(finger_index, &backward))
                / (2.0 * JACOBIAN_STEP);
            jacobian.set_column(column, &derivative);
        }
        jacobian
    }

    fn check_dimensions(&self, joints: &JointConfiguration) -> Result<()> {
        if joints.len() != self.number_of_fingers * JOINTS_PER_FINGER {
            bail!(
                "expected {} joint angles for {} fingers, got {}",
                self.number_of_fingers * JOINTS_PER_FINGER,
                self.number_of_fingers,
                joints.len()
            );
        }
        Ok(())
    }
}

impl Kinematics for FingerKinematics {
    fn number_of_fingers(&self) -> usize {
        self.number_of_fingers
    }

    fn forward_kinematics(&self, joints: &JointConfiguration) -> Result<Vec<PointCoordinates>> {
        self.check_dimensions(joints)?;
        Ok((0..self.number_of_fingers)
            .map(|finger_index| self.tip_position(finger_index, joints.finger(finger_index)))
            .collect())
    }

    fn inverse_kinematics_one_finger(
        &self,
        finger_index: usize,
        target: &PointCoordinates,
        current: &JointConfiguration,
        tolerance: Real,
        max_iterations: usize,
    ) -> Result<(JointConfiguration, Real)> {
        self.check_dimensions(current)?;
        if finger_index >= self.number_of_fingers {
            bail!(
                "finger {finger_index} does not exist, hand has {} fingers",
                self.number_of_fingers
            );
        }

        let range = finger_joint_range(finger_index);
        let mut joints = current.clone();
        let mut error = target - self.tip_position(finger_index, joints.finger(finger_index));
        let damping = Matrix3::identity() * self.damping.powi(2);

        for _ in 0..max_iterations {
            if error.norm() < tolerance {
                break;
            }
            let jacobian = self.jacobian(finger_index, joints.finger(finger_index));
            let Some(inverse) = (jacobian * jacobian.transpose() + damping).try_inverse() else {
                break;
            };
            let mut step = jacobian.transpose() * inverse * error;
            let largest = step.amax();
            if largest > MAX_STEP {
                step *= MAX_STEP / largest;
            }
            for (angle, delta) in joints.as_mut_slice()[range.clone()].iter_mut().zip(step.iter()) {
                *angle += delta;
            }
            error = target - self.tip_position(finger_index, joints.finger(finger_index));
        }

        Ok((joints, error.norm()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn tri_finger() -> FingerKinematics {
        FingerKinematics::new(FingerGeometry::default(), 3)
    }

    #[test]
    fn test_straight_finger_hangs_below_base() {
        let kinematics = tri_finger();
        let tips = kinematics
            .forward_kinematics(&JointConfiguration::zeros(3))
            .unwrap();
        assert_eq!(tips.len(), 3);
        assert_relative_eq!(tips[0].x, 0.0, epsilon = 1e-12);
        assert_relative_eq!(tips[0].y, 0.04, epsilon = 1e-12);
        assert_relative_eq!(tips[0].z, 0.29 - 0.32, epsilon = 1e-12);
        // mounted 120 degrees apart
        for tip in &tips {
            assert_relative_eq!(tip.xy().norm(), 0.04, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_ik_reaches_reachable_target() {
        let kinematics = tri_finger();
        let reference = JointConfiguration::repeated([0.1, 1.0, -1.8], 3);
        let target = kinematics.forward_kinematics(&reference).unwrap()[0];

        let start = JointConfiguration::repeated([0.0, 1.5, -2.7], 3);
        let (solution, residual) = kinematics
            .inverse_kinematics_one_finger(0, &target, &start, 0.002, 3000)
            .unwrap();

        assert!(residual <= 0.002, "residual {residual}");
        assert_eq!(solution.finger(1), start.finger(1));
        assert_eq!(solution.finger(2), start.finger(2));
    }

    #[test]
    fn test_ik_is_a_fixed_point_near_convergence() {
        let kinematics = tri_finger();
        let target = PointCoordinates::new(0.03, 0.05, 0.09);
        let start = JointConfiguration::repeated([0.0, 1.5, -2.7], 3);
        let (solution, residual) = kinematics
            .inverse_kinematics_one_finger(0, &target, &start, 0.002, 3000)
            .unwrap();
        assert!(residual <= 0.002);

        let (again, residual_again) = kinematics
            .inverse_kinematics_one_finger(0, &target, &solution, 0.002, 3000)
            .unwrap();
        assert!(residual_again <= 0.002);
        assert_eq!(again, solution);
    }

    #[test]
    fn test_ik_out_of_reach_is_best_effort() {
        let kinematics = tri_finger();
        let target = PointCoordinates::new(0.0, 0.0, 2.0);
        let start = JointConfiguration::repeated([0.0, 1.5, -2.7], 3);
        let (_, residual) = kinematics
            .inverse_kinematics_one_finger(0, &target, &start, 0.002, 50)
            .unwrap();
        assert!(residual > 0.002);
    }

    #[test]
    fn test_dimension_mismatch_is_an_error() {
        let kinematics = tri_finger();
        assert!(kinematics
            .forward_kinematics(&JointConfiguration::zeros(1))
            .is_err());
        assert!(kinematics
            .inverse_kinematics_one_finger(
                3,
                &PointCoordinates::zeros(),
                &JointConfiguration::zeros(3),
                0.002,
                10
            )
            .is_err());
    }
}
