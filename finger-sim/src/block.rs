use std::sync::{Arc, PoisonError, RwLock};

use finger_core::{ObjectState, PointCoordinates};

// half of the cube's edge, the resting height of its center
pub const BLOCK_HALF_SIZE: f64 = 0.0325;

#[derive(Clone, Debug, PartialEq)]
struct BlockPose {
    position: PointCoordinates,
    // quaternion, x y z w
    orientation: [f64; 4],
}

/// Handle to the simulated cube. Clones share the same pose, so the world,
/// the camera rig and the environment all see one object.
#[derive(Clone, Debug)]
pub struct Block {
    pose: Arc<RwLock<BlockPose>>,
}

impl Default for Block {
    fn default() -> Self {
        Self::new(PointCoordinates::new(0.15, 0.0, BLOCK_HALF_SIZE))
    }
}

impl Block {
    pub fn new(position: PointCoordinates) -> Self {
        Self {
            pose: Arc::new(RwLock::new(BlockPose {
                position,
                orientation: [0.0, 0.0, 0.0, 1.0],
            })),
        }
    }

    pub fn set_state(&self, position: PointCoordinates, orientation: [f64; 4]) {
        let mut pose = self.pose.write().unwrap_or_else(PoisonError::into_inner);
        pose.position = position;
        pose.orientation = orientation;
    }

    pub fn get_state(&self) -> (PointCoordinates, [f64; 4]) {
        let pose = self.pose.read().unwrap_or_else(PoisonError::into_inner);
        (pose.position, pose.orientation)
    }
}

impl ObjectState for Block {
    fn object_position(&self) -> PointCoordinates {
        self.get_state().0
    }
}

/// Purely visual goal indicator, it does not collide with anything.
#[derive(Clone, Debug, Default)]
pub struct GoalMarker {
    positions: Vec<PointCoordinates>,
}

impl GoalMarker {
    pub fn set_state(&mut self, positions: &[PointCoordinates]) {
        self.positions = positions.to_vec();
    }

    pub fn positions(&self) -> &[PointCoordinates] {
        &self.positions
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clones_share_pose() {
        let block = Block::default();
        let observer = block.clone();
        block.set_state(PointCoordinates::new(0.1, -0.05, 0.0425), [0.0, 0.0, 0.0, 1.0]);
        assert_eq!(
            observer.object_position(),
            PointCoordinates::new(0.1, -0.05, 0.0425)
        );
    }
}
