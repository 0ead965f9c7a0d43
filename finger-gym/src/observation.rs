use std::{fmt, ops::Range};

use serde::Deserialize;

use finger_core::{PointCoordinates, Real, JOINTS_PER_FINGER};
use finger_sim::sample::{JointBounds, ARENA_RADIUS};

use crate::{error::EnvError, spaces::Space};

// joint speed limit assumed for scaling, rad/s
const MAX_JOINT_VELOCITY: Real = 10.0;
// box around the robot that finger tips stay in
const TIP_LOW: [Real; 3] = [-0.4, -0.4, 0.0];
const TIP_HIGH: [Real; 3] = [0.4, 0.4, 0.5];
const TIP_TO_GOAL_LOW: [Real; 3] = [-0.6, -0.6, -0.5];
const TIP_TO_GOAL_HIGH: [Real; 3] = [0.6, 0.6, 0.5];
// objects rest on the arena floor, below this height
const OBJECT_MAX_HEIGHT: Real = 0.1;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ObservationKey {
    JointPositions,
    JointVelocities,
    ActionJointPositions,
    EndEffectorPosition,
    EndEffectorToGoal,
    GoalPosition,
    ObjectPosition,
}

impl ObservationKey {
    pub const ALL: [ObservationKey; 7] = [
        ObservationKey::JointPositions,
        ObservationKey::JointVelocities,
        ObservationKey::ActionJointPositions,
        ObservationKey::EndEffectorPosition,
        ObservationKey::EndEffectorToGoal,
        ObservationKey::GoalPosition,
        ObservationKey::ObjectPosition,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ObservationKey::JointPositions => "joint_positions",
            ObservationKey::JointVelocities => "joint_velocities",
            ObservationKey::ActionJointPositions => "action_joint_positions",
            ObservationKey::EndEffectorPosition => "end_effector_position",
            ObservationKey::EndEffectorToGoal => "end_effector_to_goal",
            ObservationKey::GoalPosition => "goal_position",
            ObservationKey::ObjectPosition => "object_position",
        }
    }

    pub fn natural_width(self, number_of_fingers: usize) -> usize {
        match self {
            ObservationKey::GoalPosition | ObservationKey::ObjectPosition => 3,
            _ => JOINTS_PER_FINGER * number_of_fingers,
        }
    }

    /// Unscaled range of this part of the observation.
    pub fn bounds(self, number_of_fingers: usize, joint_bounds: &JointBounds) -> (Vec<Real>, Vec<Real>) {
        let per_tip = |low: [Real; 3], high: [Real; 3]| {
            (
                low.repeat(number_of_fingers),
                high.repeat(number_of_fingers),
            )
        };
        match self {
            ObservationKey::JointPositions | ObservationKey::ActionJointPositions => (
                joint_bounds.lower.as_slice().to_vec(),
                joint_bounds.upper.as_slice().to_vec(),
            ),
            ObservationKey::JointVelocities => {
                let width = self.natural_width(number_of_fingers);
                (vec![-MAX_JOINT_VELOCITY; width], vec![MAX_JOINT_VELOCITY; width])
            }
            ObservationKey::EndEffectorPosition => per_tip(TIP_LOW, TIP_HIGH),
            ObservationKey::EndEffectorToGoal => per_tip(TIP_TO_GOAL_LOW, TIP_TO_GOAL_HIGH),
            ObservationKey::GoalPosition | ObservationKey::ObjectPosition => (
                vec![-ARENA_RADIUS, -ARENA_RADIUS, 0.0],
                vec![ARENA_RADIUS, ARENA_RADIUS, OBJECT_MAX_HEIGHT],
            ),
        }
    }
}

impl fmt::Display for ObservationKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
pub struct SchemaEntry {
    pub key: ObservationKey,
    pub width: usize,
}

/// Ordered layout of the flat observation vector.
#[derive(Clone, Debug, PartialEq)]
pub struct ObservationSchema {
    entries: Vec<SchemaEntry>,
}

impl ObservationSchema {
    pub fn new(entries: Vec<SchemaEntry>, number_of_fingers: usize) -> Result<Self, EnvError> {
        for (i, entry) in entries.iter().enumerate() {
            let expected = entry.key.natural_width(number_of_fingers);
            if entry.width != expected {
                return Err(EnvError::SchemaWidth {
                    key: entry.key,
                    expected,
                    got: entry.width,
                });
            }
            if entries[..i].iter().any(|earlier| earlier.key == entry.key) {
                return Err(EnvError::DuplicateKey(entry.key));
            }
        }
        Ok(Self { entries })
    }

    /// Joint state, commanded joints, goal and object.
    pub fn push(number_of_fingers: usize) -> Self {
        let entries = [
            ObservationKey::JointPositions,
            ObservationKey::JointVelocities,
            ObservationKey::ActionJointPositions,
            ObservationKey::GoalPosition,
            ObservationKey::ObjectPosition,
        ]
        .into_iter()
        .map(|key| SchemaEntry {
            key,
            width: key.natural_width(number_of_fingers),
        })
        .collect();
        Self { entries }
    }

    pub fn entries(&self) -> &[SchemaEntry] {
        &self.entries
    }

    pub fn width(&self) -> usize {
        self.entries.iter().map(|entry| entry.width).sum()
    }

    /// Position of `key` in the flat vector.
    pub fn range_of(&self, key: ObservationKey) -> Option<Range<usize>> {
        let mut start = 0;
        for entry in &self.entries {
            if entry.key == key {
                return Some(start..start + entry.width);
            }
            start += entry.width;
        }
        None
    }

    pub fn observation_space(&self, number_of_fingers: usize, joint_bounds: &JointBounds) -> Result<Space, EnvError> {
        let mut low = Vec::with_capacity(self.width());
        let mut high = Vec::with_capacity(self.width());
        for entry in &self.entries {
            let (l, h) = entry.key.bounds(number_of_fingers, joint_bounds);
            low.extend(l);
            high.extend(h);
        }
        Space::new(low, high)
    }

    pub fn flatten(&self, observation: &PushObservation) -> Vec<Real> {
        let mut flat = Vec::with_capacity(self.width());
        for entry in &self.entries {
            flat.extend_from_slice(&observation.field(entry.key));
        }
        flat
    }
}

/// Everything the environment can observe after one step.
#[derive(Clone, Debug, PartialEq)]
pub struct PushObservation {
    pub joint_positions: Vec<Real>,
    pub joint_velocities: Vec<Real>,
    pub action_joint_positions: Vec<Real>,
    pub end_effector_position: Vec<PointCoordinates>,
    pub goal_position: PointCoordinates,
    pub object_position: PointCoordinates,
}

fn flat_points(points: impl IntoIterator<Item = PointCoordinates>) -> Vec<Real> {
    points
        .into_iter()
        .flat_map(|point| [point.x, point.y, point.z])
        .collect()
}

impl PushObservation {
    pub fn end_effector_to_goal(&self) -> Vec<PointCoordinates> {
        self.end_effector_position
            .iter()
            .map(|tip| self.goal_position - tip)
            .collect()
    }

    pub fn field(&self, key: ObservationKey) -> Vec<Real> {
        match key {
            ObservationKey::JointPositions => self.joint_positions.clone(),
            ObservationKey::JointVelocities => self.joint_velocities.clone(),
            ObservationKey::ActionJointPositions => self.action_joint_positions.clone(),
            ObservationKey::EndEffectorPosition => flat_points(self.end_effector_position.iter().copied()),
            ObservationKey::EndEffectorToGoal => flat_points(self.end_effector_to_goal()),
            ObservationKey::GoalPosition => flat_points([self.goal_position]),
            ObservationKey::ObjectPosition => flat_points([self.object_position]),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn observation() -> PushObservation {
        PushObservation {
            joint_positions: vec![0.1, 0.2, 0.3],
            joint_velocities: vec![0.0, -1.0, 1.0],
            action_joint_positions: vec![0.5, 0.6, 0.7],
            end_effector_position: vec![PointCoordinates::new(0.1, 0.0, 0.2)],
            goal_position: PointCoordinates::new(0.0, 0.1, 0.0425),
            object_position: PointCoordinates::new(-0.1, 0.0, 0.0425),
        }
    }

    #[test]
    fn test_push_schema_widths() {
        let schema = ObservationSchema::push(3);
        let widths: Vec<usize> = schema.entries().iter().map(|entry| entry.width).collect();
        assert_eq!(widths, vec![9, 9, 9, 3, 3]);
        assert_eq!(schema.width(), 33);
        assert_eq!(schema.range_of(ObservationKey::GoalPosition), Some(27..30));
        assert_eq!(schema.range_of(ObservationKey::EndEffectorPosition), None);
    }

    #[test]
    fn test_flattens_in_schema_order() {
        let schema = ObservationSchema::new(
            vec![
                SchemaEntry {
                    key: ObservationKey::ObjectPosition,
                    width: 3,
                },
                SchemaEntry {
                    key: ObservationKey::EndEffectorToGoal,
                    width: 3,
                },
            ],
            1,
        )
        .unwrap();
        let flat = schema.flatten(&observation());
        assert_eq!(flat.len(), 6);
        assert_eq!(flat[..3], [-0.1, 0.0, 0.0425]);
        assert_eq!(flat[3], -0.1);
    }

    #[test]
    fn test_rejects_wrong_width_and_duplicates() {
        let joint_positions = SchemaEntry {
            key: ObservationKey::JointPositions,
            width: 3,
        };
        assert!(matches!(
            ObservationSchema::new(vec![joint_positions], 3),
            Err(EnvError::SchemaWidth { expected: 9, got: 3, .. })
        ));
        assert!(matches!(
            ObservationSchema::new(vec![joint_positions, joint_positions], 1),
            Err(EnvError::DuplicateKey(ObservationKey::JointPositions))
        ));
    }

    #[test]
    fn test_every_key_has_bounds_of_its_width() {
        let joint_bounds = JointBounds::for_fingers(3);
        for key in ObservationKey::ALL {
            let (low, high) = key.bounds(3, &joint_bounds);
            assert_eq!(low.len(), key.natural_width(3), "{key}");
            assert_eq!(high.len(), key.natural_width(3), "{key}");
        }
    }

    #[test]
    fn test_keys_from_yaml() {
        let entry: SchemaEntry = serde_yaml::from_str("key: end_effector_to_goal\nwidth: 9\n").unwrap();
        assert_eq!(entry.key, ObservationKey::EndEffectorToGoal);
    }
}
