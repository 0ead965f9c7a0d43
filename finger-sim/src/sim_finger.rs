use std::collections::VecDeque;

use anyhow::{bail, Result};
use serde::Deserialize;

use finger_core::{Action, JointConfiguration, Observation, Platform, Real, TimeIndex, JOINTS_PER_FINGER};

use crate::finger_model::{FingerGeometry, FingerKinematics};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FingerType {
    Single,
    Tri,
}

impl FingerType {
    pub fn number_of_fingers(self) -> usize {
        match self {
            FingerType::Single => 1,
            FingerType::Tri => 3,
        }
    }
}

// time constant of the joint position response, in seconds
const POSITION_TIME_CONSTANT: Real = 0.02;
// observations kept for lookup by time index
const OBSERVATION_HISTORY: usize = 1000;

/// Simulated finger hand under joint position control.
///
/// Every appended action executes one simulation step immediately, the
/// resulting observation stays retrievable for the last
/// `OBSERVATION_HISTORY` steps.
pub struct SimFinger {
    kinematics: FingerKinematics,
    time_step: Real,
    position_gain: Real,

    position: JointConfiguration,
    velocity: JointConfiguration,

    next_time_index: u64,
    observations: VecDeque<(TimeIndex, Observation)>,
}

impl SimFinger {
    pub fn new(finger_type: FingerType, time_step: Real) -> Self {
        let number_of_fingers = finger_type.number_of_fingers();
        Self {
            kinematics: FingerKinematics::new(FingerGeometry::default(), number_of_fingers),
            time_step,
            position_gain: 1.0 - (-time_step / POSITION_TIME_CONSTANT).exp(),
            position: JointConfiguration::zeros(number_of_fingers),
            velocity: JointConfiguration::zeros(number_of_fingers),
            next_time_index: 0,
            observations: VecDeque::with_capacity(OBSERVATION_HISTORY),
        }
    }

    pub fn number_of_fingers(&self) -> usize {
        self.position.number_of_fingers()
    }

    pub fn kinematics(&self) -> &FingerKinematics {
        &self.kinematics
    }

    pub fn time_step(&self) -> Real {
        self.time_step
    }

    fn check_dimensions(&self, joints: &JointConfiguration) -> Result<()> {
        if joints.len() != self.number_of_fingers() * JOINTS_PER_FINGER {
            bail!(
                "finger hand has {} joints, got {} values",
                self.number_of_fingers() * JOINTS_PER_FINGER,
                joints.len()
            );
        }
        Ok(())
    }

    pub fn reset_finger_positions_and_velocities(
        &mut self,
        position: &JointConfiguration,
        velocity: Option<&JointConfiguration>,
    ) -> Result<()> {
        self.check_dimensions(position)?;
        self.position = position.clone();
        self.velocity = match velocity {
            Some(velocity) => {
                self.check_dimensions(velocity)?;
                velocity.clone()
            }
            None => JointConfiguration::zeros(self.number_of_fingers()),
        };
        self.observations.clear();
        Ok(())
    }

    /// Puts the joints at `position` at rest and returns the resulting state.
    pub fn reset_finger(&mut self, position: &JointConfiguration) -> Result<Observation> {
        self.reset_finger_positions_and_velocities(position, None)?;
        Ok(self.current_observation())
    }

    fn current_observation(&self) -> Observation {
        Observation {
            position: self.position.clone(),
            velocity: self.velocity.clone(),
        }
    }

    fn step(&mut self, desired: &JointConfiguration) {
        for joint in 0..self.position.len() {
            let previous = self.position[joint];
            let next = previous + self.position_gain * (desired[joint] - previous);
            self.position[joint] = next;
            self.velocity[joint] = (next - previous) / self.time_step;
        }
    }
}

impl Platform for SimFinger {
    fn append_desired_action(&mut self, action: &Action) -> Result<TimeIndex> {
        self.check_dimensions(&action.position)?;
        self.step(&action.position);

        let t = TimeIndex(self.next_time_index);
        self.next_time_index += 1;

        if self.observations.len() == OBSERVATION_HISTORY {
            self.observations.pop_front();
        }
        self.observations.push_back((t, self.current_observation()));
        Ok(t)
    }

    fn get_observation(&mut self, t: TimeIndex) -> Result<Observation> {
        match self.observations.iter().find(|(index, _)| *index == t) {
            Some((_, observation)) => Ok(observation.clone()),
            None => bail!("no observation for time index {}", t.0),
        }
    }
}
