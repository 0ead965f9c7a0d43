use std::ops::{Index, IndexMut, Range};

use serde::{Deserialize, Serialize};

use crate::{Real, JOINTS_PER_FINGER};

/// Joint angles of all fingers, finger-major: `[f0_j0, f0_j1, f0_j2, f1_j0, ...]`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct JointConfiguration(Vec<Real>);

impl JointConfiguration {
    pub fn new(angles: Vec<Real>) -> Self {
        Self(angles)
    }

    pub fn zeros(number_of_fingers: usize) -> Self {
        Self(vec![0.0; number_of_fingers * JOINTS_PER_FINGER])
    }

    /// The same per-finger posture repeated for every finger.
    pub fn repeated(per_finger: [Real; JOINTS_PER_FINGER], number_of_fingers: usize) -> Self {
        Self(
            per_finger
                .iter()
                .copied()
                .cycle()
                .take(number_of_fingers * JOINTS_PER_FINGER)
                .collect(),
        )
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn number_of_fingers(&self) -> usize {
        self.0.len() / JOINTS_PER_FINGER
    }

    pub fn as_slice(&self) -> &[Real] {
        &self.0
    }

    pub fn as_mut_slice(&mut self) -> &mut [Real] {
        &mut self.0
    }

    pub fn into_vec(self) -> Vec<Real> {
        self.0
    }

    pub fn finger(&self, finger_index: usize) -> &[Real] {
        &self.0[finger_joint_range(finger_index)]
    }

    pub fn finger_mut(&mut self, finger_index: usize) -> &mut [Real] {
        &mut self.0[finger_joint_range(finger_index)]
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Real> {
        self.0.iter()
    }
}

/// Indices of the joints belonging to one finger.
pub fn finger_joint_range(finger_index: usize) -> Range<usize> {
    finger_index * JOINTS_PER_FINGER..(finger_index + 1) * JOINTS_PER_FINGER
}

impl Index<usize> for JointConfiguration {
    type Output = Real;

    fn index(&self, index: usize) -> &Self::Output {
        &self.0[index]
    }
}

impl IndexMut<usize> for JointConfiguration {
    fn index_mut(&mut self, index: usize) -> &mut Self::Output {
        &mut self.0[index]
    }
}

impl From<Vec<Real>> for JointConfiguration {
    fn from(angles: Vec<Real>) -> Self {
        Self(angles)
    }
}
