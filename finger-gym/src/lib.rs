//! Step/reset environment around the simulated finger for learning to push
//! the cube to a goal.
//!
//! Observations and actions are exchanged scaled to [-1, 1]. The cube only
//! moves when placed by `reset`, the kinematic simulation has no contacts.

pub mod error;
pub mod logger;
pub mod observation;
pub mod push_env;
pub mod spaces;

pub use error::EnvError;
pub use logger::{DataLogger, EpisodeLog, StepRecord};
pub use observation::{ObservationKey, ObservationSchema, PushObservation, SchemaEntry};
pub use push_env::{compute_reward, Episode, FingerPush, FingerPushCfg, StepInfo, StepResult};
pub use spaces::Space;
