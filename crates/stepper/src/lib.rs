//! Adaptive load stepping around an implicit equilibrium solver.
//!
//! [`AdaptiveStepper`] wraps a [`Solver`](flexstep_core::Solver) and a
//! [`Model`](flexstep_core::Model) and decides, run by run, how large the next
//! step should be and what to do with each solution:
//!
//! - **commit** a converged and accepted solution, then grow or shrink the
//!   step size depending on how many iterations it took
//! - **continue** from a converged solution a model did not accept yet
//! - **cancel** a failed or rejected solution and retry the same step with a
//!   reduced (or, once reduction is exhausted, increased) step size
//!
//! The step-size search lives in [`StepSizeController`], run bookkeeping in
//! [`OutcomeTracker`].

mod config;
mod controller;
mod error;
mod event;
mod outcome;
mod stats;
mod status;
mod stepper;
mod tracker;

pub use config::{Config, ConfigError, TimeWindow};
pub use controller::{Retry, StepSizeController};
pub use error::Error;
pub use event::{Action, Event};
pub use outcome::{StepOutcome, Transition};
pub use stats::StatsWriter;
pub use status::{ExitReason, Status};
pub use stepper::AdaptiveStepper;
pub use tracker::{OutcomeTracker, Statistics, StepCounters};
