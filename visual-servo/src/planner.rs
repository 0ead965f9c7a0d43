use anyhow::Result;

use finger_core::{JointConfiguration, Kinematics, PointCoordinates, Real};

/// Outcome of one inverse kinematics request.
#[derive(Clone, Debug, PartialEq)]
pub struct IkSolution {
    // target plus offset, what the solver aimed for
    pub goal: PointCoordinates,
    pub joints: JointConfiguration,
    pub residual: Real,
    pub converged: bool,
}

/// Turns a target position into joint positions of one finger.
///
/// The finger tip is aimed at a fixed offset from the target, so it ends up
/// above the object rather than inside it. Other fingers keep their observed
/// posture in the returned configuration.
pub struct IkMotionPlanner<K> {
    kinematics: K,
    finger_index: usize,
    target_offset: PointCoordinates,
    tolerance: Real,
    max_iterations: usize,
}

impl<K: Kinematics> IkMotionPlanner<K> {
    pub fn new(
        kinematics: K,
        finger_index: usize,
        target_offset: PointCoordinates,
        tolerance: Real,
        max_iterations: usize,
    ) -> Self {
        Self {
            kinematics,
            finger_index,
            target_offset,
            tolerance,
            max_iterations,
        }
    }

    pub fn kinematics(&self) -> &K {
        &self.kinematics
    }

    pub fn finger_index(&self) -> usize {
        self.finger_index
    }

    pub fn tolerance(&self) -> Real {
        self.tolerance
    }

    pub fn goal_for(&self, target: &PointCoordinates) -> PointCoordinates {
        target + self.target_offset
    }

    /// Solves from the observed joint positions. Not converging within the
    /// iteration budget is not an error, the last iterate is returned.
    pub fn plan(&self, target: &PointCoordinates, observed: &JointConfiguration) -> Result<IkSolution> {
        let goal = self.goal_for(target);
        let (joints, residual) = self.kinematics.inverse_kinematics_one_finger(
            self.finger_index,
            &goal,
            observed,
            self.tolerance,
            self.max_iterations,
        )?;

        let converged = residual <= self.tolerance;
        if !converged {
            log::debug!(
                "ik did not converge for goal [{:.4}, {:.4}, {:.4}], residual {residual:.5}",
                goal.x,
                goal.y,
                goal.z
            );
        }

        Ok(IkSolution {
            goal,
            joints,
            residual,
            converged,
        })
    }

    /// Tip position of the planned finger for the given joints.
    pub fn tip_position(&self, joints: &JointConfiguration) -> Result<PointCoordinates> {
        let tips = self.kinematics.forward_kinematics(joints)?;
        tips.get(self.finger_index)
            .copied()
            .ok_or_else(|| anyhow::anyhow!("no tip position for finger {}", self.finger_index))
    }
}
