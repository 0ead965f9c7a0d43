use finger_core::{JointConfiguration, Real};

use crate::error::ConfigError;

/// First-order low-pass filter on the commanded joint positions.
///
/// Only the joints in the update set follow the candidate, all others keep
/// their previous command.
#[derive(Clone, Debug)]
pub struct TrajectorySmoother {
    alpha: Real,
    update_indices: Vec<usize>,
}

impl TrajectorySmoother {
    pub fn new(
        alpha: Real,
        update_indices: impl IntoIterator<Item = usize>,
        dimension: usize,
    ) -> Result<Self, ConfigError> {
        if !(alpha > 0.0 && alpha <= 1.0) {
            return Err(ConfigError::InvalidSmoothingFactor(alpha));
        }
        let update_indices: Vec<usize> = update_indices.into_iter().collect();
        if let Some(&index) = update_indices.iter().find(|&&index| index >= dimension) {
            return Err(ConfigError::JointIndexOutOfRange { index, dimension });
        }
        Ok(Self {
            alpha,
            update_indices,
        })
    }

    pub fn alpha(&self) -> Real {
        self.alpha
    }

    pub fn update_indices(&self) -> &[usize] {
        &self.update_indices
    }

    /// `alpha * candidate + (1 - alpha) * previous` on the update set.
    pub fn smooth(&self, previous: &JointConfiguration, candidate: &JointConfiguration) -> JointConfiguration {
        let mut next = previous.clone();
        for &index in &self.update_indices {
            next[index] = self.alpha * candidate[index] + (1.0 - self.alpha) * previous[index];
        }
        next
    }
}
