//! Random joint configurations and object placements.

use std::f64::consts::PI;

use anyhow::{bail, Result};
use rand::Rng;

use finger_core::{JointConfiguration, Kinematics, PointCoordinates, Real};

/// Radius of the circular arena floor that objects are placed on.
pub const ARENA_RADIUS: Real = 0.15;

// tips must stay this far above the floor to count as feasible
const MIN_TIP_HEIGHT: Real = 0.01;
const MAX_SAMPLING_ATTEMPTS: usize = 1000;

/// Per-joint position limits.
#[derive(Clone, Debug, PartialEq)]
pub struct JointBounds {
    pub lower: JointConfiguration,
    pub upper: JointConfiguration,
}

impl JointBounds {
    /// Mechanical limits of the upper, middle and lower joint, per finger.
    pub fn for_fingers(number_of_fingers: usize) -> Self {
        Self {
            lower: JointConfiguration::repeated([-0.33, 0.0, -2.7], number_of_fingers),
            upper: JointConfiguration::repeated([1.0, 1.57, 0.0], number_of_fingers),
        }
    }

    pub fn contains(&self, joints: &JointConfiguration) -> bool {
        joints.len() == self.lower.len()
            && joints
                .iter()
                .zip(self.lower.iter().zip(self.upper.iter()))
                .all(|(q, (low, high))| (*low..=*high).contains(q))
    }
}

pub fn random_joint_positions<R: Rng>(rng: &mut R, bounds: &JointBounds) -> JointConfiguration {
    bounds
        .lower
        .iter()
        .zip(bounds.upper.iter())
        .map(|(low, high)| rng.gen_range(*low..=*high))
        .collect::<Vec<_>>()
        .into()
}

/// Random joint positions within `bounds` that keep every finger tip above
/// the arena floor.
pub fn feasible_random_joint_positions_for_reaching<R: Rng, K: Kinematics>(
    rng: &mut R,
    kinematics: &K,
    bounds: &JointBounds,
) -> Result<JointConfiguration> {
    for _ in 0..MAX_SAMPLING_ATTEMPTS {
        let candidate = random_joint_positions(rng, bounds);
        let tips = kinematics.forward_kinematics(&candidate)?;
        if tips.iter().all(|tip| tip.z > MIN_TIP_HEIGHT) {
            return Ok(candidate);
        }
    }
    bail!("no feasible joint configuration after {MAX_SAMPLING_ATTEMPTS} samples")
}

/// Uniform position on the arena disk at a fixed height.
pub fn random_position_in_arena<R: Rng>(rng: &mut R, height: Real) -> PointCoordinates {
    let angle = rng.gen_range(0.0..2.0 * PI);
    // sqrt keeps the density uniform over the disk area
    let radius = ARENA_RADIUS * rng.gen_range(0.0..=1.0_f64).sqrt();
    PointCoordinates::new(radius * angle.cos(), radius * angle.sin(), height)
}
