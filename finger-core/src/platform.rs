use anyhow::Result;

use crate::JointConfiguration;

/// Handle for the robot step that executes one appended action.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TimeIndex(pub u64);

/// Desired joint positions for one step.
#[derive(Clone, Debug, PartialEq)]
pub struct Action {
    pub position: JointConfiguration,
}

impl Action {
    pub fn new(position: JointConfiguration) -> Self {
        Self { position }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Observation {
    pub position: JointConfiguration,
    pub velocity: JointConfiguration,
}

/// Actuation and joint feedback of a (simulated or physical) robot.
///
/// Every appended action yields exactly one observation, retrievable through
/// the returned [`TimeIndex`]. `get_observation` may block until the step has
/// been executed. Errors here are failures of the robot backend itself.
pub trait Platform {
    fn append_desired_action(&mut self, action: &Action) -> Result<TimeIndex>;
    fn get_observation(&mut self, t: TimeIndex) -> Result<Observation>;
}
