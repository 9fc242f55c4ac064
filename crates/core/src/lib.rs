//! Host contracts shared by flexstep plugins.
//!
//! This crate defines the seams between a simulation host, the models that
//! describe boundary conditions and other problem data, and the solvers that
//! find equilibrium for one step:
//!
//! - [`SimulationState`]: the explicitly passed shared context (time step,
//!   simulated time, solution quality flag, solver info)
//! - [`Action`]: the closed set of actions a [`Model`] can be asked to take
//! - [`Model`]: a plugin that reacts to actions
//! - [`Solver`]: the advance/solve/commit/cancel lifecycle of an implicit solver
//! - [`Observer`]: receives events and optionally returns control actions

mod action;
mod constraints;
mod model;
mod observer;
mod solver;
mod state;

pub use action::{Action, CommitDecision, ContinueParams, StepSizeParams, Terminate};
pub use constraints::{Constraint, Constraints};
pub use model::Model;
pub use observer::Observer;
pub use solver::{FailureKind, Solver, SolverFailure, SolverSettings};
pub use state::{SimulationState, SolverInfo};
