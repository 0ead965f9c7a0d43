use anyhow::Result;

use crate::{JointConfiguration, PointCoordinates, Real};

/// Forward and inverse kinematics of a multi-finger hand.
pub trait Kinematics {
    fn number_of_fingers(&self) -> usize;

    /// Finger tip position of every finger, in world coordinates.
    fn forward_kinematics(&self, joints: &JointConfiguration) -> Result<Vec<PointCoordinates>>;

    /// Moves the tip of one finger towards `target`, starting from `current`.
    ///
    /// Only the joints of `finger_index` change. Returns the last iterate and
    /// its positional error, which may exceed `tolerance` if the solver ran out
    /// of iterations.
    fn inverse_kinematics_one_finger(
        &self,
        finger_index: usize,
        target: &PointCoordinates,
        current: &JointConfiguration,
        tolerance: Real,
        max_iterations: usize,
    ) -> Result<(JointConfiguration, Real)>;
}

/// Read access to the pose of the manipulated object (simulation ground truth).
pub trait ObjectState {
    fn object_position(&self) -> PointCoordinates;
}
