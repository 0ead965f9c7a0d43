//! Kinematic stand-ins for the robot, the tracked object and the camera rig.
//!
//! Joints track their position command with a first-order lag, there is no
//! contact dynamics. Good enough to close the servo loop and to drive the
//! push environment without hardware.

pub mod block;
pub mod camera_rig;
pub mod finger_model;
pub mod sample;
pub mod sim_finger;

pub use block::{Block, GoalMarker};
pub use camera_rig::{tricamera_calibrations, SimCameraRig, SimCameraRigCfg, SimMarkerDetector, SyntheticFrame};
pub use finger_model::{FingerGeometry, FingerKinematics};
pub use sim_finger::{FingerType, SimFinger};

/// Physics step of the simulated robot, in seconds.
pub const SIMULATION_TIME_STEP: f64 = 0.004;
