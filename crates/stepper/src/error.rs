use std::io;

use flexstep_core::SolverFailure;
use thiserror::Error;

use crate::ConfigError;

/// Errors raised while setting up the stepper.
///
/// Once initialized, the stepper never returns an error: solver failures are
/// retried and terminal conditions are reported through [`Status`](crate::Status).
#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid config: {0}")]
    InvalidConfig(#[from] ConfigError),

    #[error("solver failed to initialize")]
    Init(#[source] SolverFailure),

    #[error("failed to open statistics output")]
    Stats(#[source] io::Error),
}
