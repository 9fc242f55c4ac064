use std::fmt;

use thiserror::Error;

use crate::{Model, SimulationState};

/// Settings a stepping module pushes into a solver between runs.
///
/// Each field is an override; `None` leaves the solver's own value alone.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SolverSettings {
    /// Step size for the next advance (time step for dynamic solvers,
    /// load increment for quasi-static ones).
    pub delta_time: Option<f64>,
}

/// Why a solve attempt failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// The iteration limit was reached without convergence.
    NotConverged,
    /// The numerical state became invalid, for example a NaN in the system matrix.
    InvalidState,
    /// Any other failure reported by the solver.
    Other,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::NotConverged => "no convergence",
            Self::InvalidState => "invalid numerical state",
            Self::Other => "solver failure",
        };
        f.write_str(s)
    }
}

/// A recoverable failure raised by [`Solver::solve`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{kind} in {origin}: {message}")]
pub struct SolverFailure {
    /// Where the failure was raised.
    pub origin: String,
    /// Failure category.
    pub kind: FailureKind,
    /// Human-readable detail.
    pub message: String,
}

impl SolverFailure {
    /// Creates a failure of the given kind.
    pub fn new(origin: impl Into<String>, kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            origin: origin.into(),
            kind,
            message: message.into(),
        }
    }

    /// Creates a [`FailureKind::NotConverged`] failure.
    pub fn not_converged(origin: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(origin, FailureKind::NotConverged, message)
    }

    /// Creates a [`FailureKind::InvalidState`] failure.
    pub fn invalid_state(origin: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(origin, FailureKind::InvalidState, message)
    }
}

/// The lifecycle of an implicit equilibrium solver.
///
/// A stepping module drives a solver through the following sequence for each
/// attempted step:
///
/// ```text
/// solver.configure(&settings);
/// solver.advance(model, state);
/// match solver.solve(model, state) {
///     Ok(()) => solver.commit(model, state),   // or keep going on continue
///     Err(_) => solver.cancel(model, state),
/// }
/// ```
///
/// Solvers publish their iteration count in
/// [`SimulationState::solver_info`], ideally before returning a failure too.
/// They are responsible for passing [`Action::Advance`](crate::Action::Advance),
/// [`Action::Commit`](crate::Action::Commit) and
/// [`Action::Cancel`](crate::Action::Cancel) on to the model.
pub trait Solver<M: Model + ?Sized> {
    /// Prepares the solver before the first step.
    ///
    /// # Errors
    ///
    /// Returns a [`SolverFailure`] if the solver cannot start.
    fn init(&mut self, _model: &mut M, _state: &mut SimulationState) -> Result<(), SolverFailure> {
        Ok(())
    }

    /// Applies setting overrides. Settings are not retained by the caller.
    fn configure(&mut self, settings: &SolverSettings);

    /// Starts a new step from the last committed state.
    fn advance(&mut self, model: &mut M, state: &mut SimulationState);

    /// Iterates to equilibrium for the current step.
    ///
    /// # Errors
    ///
    /// Returns a [`SolverFailure`] on non-convergence or an invalid numerical
    /// state. The failure is recoverable: the caller cancels and retries.
    fn solve(&mut self, model: &mut M, state: &mut SimulationState) -> Result<(), SolverFailure>;

    /// Makes the current solution final.
    fn commit(&mut self, model: &mut M, state: &mut SimulationState);

    /// Rolls all solver state back to the last commit.
    fn cancel(&mut self, model: &mut M, state: &mut SimulationState);

    /// Releases resources at the end of the simulation.
    fn shutdown(&mut self, _state: &mut SimulationState) {}
}
