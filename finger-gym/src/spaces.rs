use finger_core::Real;

use crate::error::EnvError;

/// Axis-aligned box, the unscaled range of an observation or action vector.
#[derive(Clone, Debug, PartialEq)]
pub struct Space {
    low: Vec<Real>,
    high: Vec<Real>,
}

impl Space {
    pub fn new(low: Vec<Real>, high: Vec<Real>) -> Result<Self, EnvError> {
        if low.len() != high.len() || low.iter().zip(&high).any(|(l, h)| !(h > l)) {
            return Err(EnvError::InvalidBounds {
                low: low.len(),
                high: high.len(),
            });
        }
        Ok(Self { low, high })
    }

    pub fn dim(&self) -> usize {
        self.low.len()
    }

    pub fn low(&self) -> &[Real] {
        &self.low
    }

    pub fn high(&self) -> &[Real] {
        &self.high
    }

    pub fn contains(&self, x: &[Real]) -> bool {
        x.len() == self.dim()
            && x.iter()
                .zip(self.low.iter().zip(&self.high))
                .all(|(v, (l, h))| (*l..=*h).contains(v))
    }

    /// Maps the box onto [-1, 1], values outside the box are clipped.
    pub fn scale(&self, x: &[Real]) -> Vec<Real> {
        x.iter()
            .zip(self.low.iter().zip(&self.high))
            .map(|(v, (l, h))| (2.0 * (v - l) / (h - l) - 1.0).clamp(-1.0, 1.0))
            .collect()
    }

    pub fn unscale(&self, y: &[Real]) -> Vec<Real> {
        y.iter()
            .zip(self.low.iter().zip(&self.high))
            .map(|(v, (l, h))| l + (v.clamp(-1.0, 1.0) + 1.0) * (h - l) / 2.0)
            .collect()
    }
}
