//! Visual servoing of one finger towards a marker tracked by several cameras.
//!
//! Per control tick: camera images -> per-camera marker positions -> fused
//! target -> inverse kinematics -> smoothed joint command.

pub mod config;
pub mod control_loop;
pub mod error;
pub mod fusion;
pub mod planner;
pub mod smoother;
pub mod tracking;

pub use config::{ServoLoopCfg, TrackerCfg};
pub use control_loop::{ControlLoop, LoopState, TickReport};
pub use error::ConfigError;
pub use fusion::{CameraMode, FusedTarget, MultiCameraFusion};
pub use planner::{IkMotionPlanner, IkSolution};
pub use smoother::TrajectorySmoother;
pub use tracking::{GroundTruthTarget, TargetSource, VisualTracker};
