use std::time::{SystemTime, UNIX_EPOCH};

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::Deserialize;

use finger_core::{Action, JointConfiguration, Kinematics, Observation, Platform, PointCoordinates, Real};
use finger_sim::{
    sample::{feasible_random_joint_positions_for_reaching, random_position_in_arena, JointBounds},
    Block, FingerType, GoalMarker, SimFinger, SIMULATION_TIME_STEP,
};

use crate::{
    error::EnvError,
    logger::DataLogger,
    observation::{ObservationKey, ObservationSchema, PushObservation, SchemaEntry},
    spaces::Space,
};

// height of goal and object above the floor
const PLACEMENT_HEIGHT: Real = 0.0425;

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct FingerPushCfg {
    // seconds between two env steps
    pub control_rate_s: f64,
    pub finger_type: FingerType,
    pub seed: u64,
    // `None` selects the default push layout
    pub observations: Option<Vec<SchemaEntry>>,
}

impl Default for FingerPushCfg {
    fn default() -> Self {
        Self {
            control_rate_s: 0.02,
            finger_type: FingerType::Tri,
            seed: 0,
            observations: None,
        }
    }
}

impl FingerPushCfg {
    /// Builds the environment and runs the first reset.
    pub fn finalize(self) -> Result<FingerPush, EnvError> {
        let steps = (self.control_rate_s / SIMULATION_TIME_STEP).round();
        if !(steps >= 1.0 && (self.control_rate_s - steps * SIMULATION_TIME_STEP).abs() <= 1e-6) {
            return Err(EnvError::ControlRate {
                control_rate_s: self.control_rate_s,
                time_step: SIMULATION_TIME_STEP,
            });
        }

        let number_of_fingers = self.finger_type.number_of_fingers();
        let schema = match self.observations {
            Some(entries) => ObservationSchema::new(entries, number_of_fingers)?,
            None => ObservationSchema::push(number_of_fingers),
        };
        let joint_bounds = JointBounds::for_fingers(number_of_fingers);
        let observation_space = schema.observation_space(number_of_fingers, &joint_bounds)?;
        let action_space = Space::new(
            joint_bounds.lower.as_slice().to_vec(),
            joint_bounds.upper.as_slice().to_vec(),
        )?;

        log::info!(
            "push env: {number_of_fingers} fingers, {} sub-steps per control step, {} observations",
            steps,
            schema.width()
        );

        let mut env = FingerPush {
            finger: SimFinger::new(self.finger_type, SIMULATION_TIME_STEP),
            steps_per_control: steps as usize,
            schema,
            observation_space,
            action_space,
            joint_bounds,
            block: Block::default(),
            goal_marker: GoalMarker::default(),
            logger: DataLogger::new(),
            rng: ChaCha8Rng::seed_from_u64(self.seed),
            episode: Episode {
                goal: PointCoordinates::zeros(),
                object_initial_position: PointCoordinates::zeros(),
                step_count: 0,
            },
        };
        env.reset()?;
        Ok(env)
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Episode {
    pub goal: PointCoordinates,
    pub object_initial_position: PointCoordinates,
    pub step_count: u64,
}

#[derive(Clone, Debug, PartialEq)]
pub struct StepInfo {
    // 1.0 once the episode is solved
    pub is_success: f32,
}

#[derive(Clone, Debug, PartialEq)]
pub struct StepResult {
    // scaled to [-1, 1]
    pub observation: Vec<Real>,
    pub reward: Real,
    pub done: bool,
    pub info: StepInfo,
}

/// Negative distance between object and goal. Pushing never ends an episode.
pub fn compute_reward(object_position: &PointCoordinates, goal: &PointCoordinates) -> (Real, bool) {
    (-(object_position - goal).norm(), false)
}

fn now() -> f64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_secs_f64())
        .unwrap_or_default()
}

/// Push task on the simulated single or tri finger.
pub struct FingerPush {
    finger: SimFinger,
    steps_per_control: usize,

    schema: ObservationSchema,
    observation_space: Space,
    action_space: Space,
    joint_bounds: JointBounds,

    block: Block,
    goal_marker: GoalMarker,
    logger: DataLogger,
    rng: ChaCha8Rng,

    episode: Episode,
}

impl FingerPush {
    pub fn number_of_fingers(&self) -> usize {
        self.finger.number_of_fingers()
    }

    pub fn steps_per_control(&self) -> usize {
        self.steps_per_control
    }

    pub fn schema(&self) -> &ObservationSchema {
        &self.schema
    }

    pub fn observation_space(&self) -> &Space {
        &self.observation_space
    }

    pub fn action_space(&self) -> &Space {
        &self.action_space
    }

    pub fn episode(&self) -> &Episode {
        &self.episode
    }

    pub fn block(&self) -> &Block {
        &self.block
    }

    pub fn goal_marker(&self) -> &GoalMarker {
        &self.goal_marker
    }

    pub fn logger(&self) -> &DataLogger {
        &self.logger
    }

    pub fn logger_mut(&mut self) -> &mut DataLogger {
        &mut self.logger
    }

    /// Starts a new episode from a random feasible posture with random goal
    /// and object positions. Returns the scaled first observation.
    pub fn reset(&mut self) -> Result<Vec<Real>, EnvError> {
        let start = feasible_random_joint_positions_for_reaching(
            &mut self.rng,
            self.finger.kinematics(),
            &self.joint_bounds,
        )
        .map_err(EnvError::Sampling)?;
        let observation = self.finger.reset_finger(&start)?;

        let goal = random_position_in_arena(&mut self.rng, PLACEMENT_HEIGHT);
        let object = random_position_in_arena(&mut self.rng, PLACEMENT_HEIGHT);
        self.goal_marker.set_state(&[goal]);
        self.block.set_state(object, [0.0, 0.0, 0.0, 1.0]);

        self.logger.new_episode(object, goal);
        self.episode = Episode {
            goal,
            object_initial_position: object,
            step_count: 0,
        };

        let state = self.record(&observation, &start)?;
        Ok(self.observation_space.scale(&self.schema.flatten(&state)))
    }

    pub fn step(&mut self, action: &[Real]) -> Result<StepResult, EnvError> {
        if action.len() != self.action_space.dim() {
            return Err(EnvError::ActionWidth {
                expected: self.action_space.dim(),
                got: action.len(),
            });
        }
        let position = JointConfiguration::new(self.action_space.unscale(action));
        let finger_action = Action::new(position.clone());

        // the agent sees the state right after the first sub-step
        let t = self.finger.append_desired_action(&finger_action)?;
        let observation = self.finger.get_observation(t)?;
        let state = self.record(&observation, &position)?;
        for _ in 1..self.steps_per_control {
            let t = self.finger.append_desired_action(&finger_action)?;
            self.finger.get_observation(t)?;
        }

        let (reward, done) = compute_reward(&state.object_position, &self.episode.goal);
        self.episode.step_count += 1;
        log::debug!("step {} reward {reward:.5}", self.episode.step_count);

        Ok(StepResult {
            observation: self.observation_space.scale(&self.schema.flatten(&state)),
            reward,
            done,
            info: StepInfo {
                is_success: if done { 1.0 } else { 0.0 },
            },
        })
    }

    fn record(&mut self, observation: &Observation, action: &JointConfiguration) -> Result<PushObservation, EnvError> {
        let tips = self.finger.kinematics().forward_kinematics(&observation.position)?;
        self.logger.append(observation.position.as_slice(), &tips, now());

        Ok(PushObservation {
            joint_positions: observation.position.as_slice().to_vec(),
            joint_velocities: observation.velocity.as_slice().to_vec(),
            action_joint_positions: action.as_slice().to_vec(),
            end_effector_position: tips,
            goal_position: self.episode.goal,
            object_position: self.block.get_state().0,
        })
    }

    /// Flat unscaled value of `key` in a scaled observation.
    pub fn unscaled_field(&self, scaled: &[Real], key: ObservationKey) -> Option<Vec<Real>> {
        let range = self.schema.range_of(key)?;
        let full = self.observation_space.unscale(scaled);
        full.get(range).map(<[Real]>::to_vec)
    }
}
