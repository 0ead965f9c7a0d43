use thiserror::Error;

use crate::observation::ObservationKey;

#[derive(Debug, Error)]
pub enum EnvError {
    #[error("action has {got} values, expected {expected}")]
    ActionWidth { expected: usize, got: usize },

    #[error("control rate {control_rate_s}s is not a multiple of the {time_step}s simulation step")]
    ControlRate { control_rate_s: f64, time_step: f64 },

    #[error("observation {key} has width {got}, expected {expected}")]
    SchemaWidth {
        key: ObservationKey,
        expected: usize,
        got: usize,
    },

    #[error("observation {0} listed twice")]
    DuplicateKey(ObservationKey),

    #[error("bounds of length {low} and {high} do not describe a box")]
    InvalidBounds { low: usize, high: usize },

    #[error("cannot sample a start configuration: {0}")]
    Sampling(anyhow::Error),

    #[error(transparent)]
    Platform(#[from] anyhow::Error),
}
