use flexstep_core::SolverFailure;

use crate::{Retry, Statistics};

/// Control actions an observer can request from the stepper.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    /// End the simulation once the current run has been fully applied.
    StopEarly,
}

/// Event emitted by the stepper at the end of every run.
#[derive(Debug)]
pub enum Event<'a> {
    /// The step's solution became final.
    Committed {
        /// The time step that was committed.
        step: usize,
        /// The increment the solution was found with.
        increment: f64,
        /// The increment the next step will start from.
        next_increment: f64,
        /// Largest iteration count seen in the step.
        iterations: usize,
        stats: Statistics,
    },

    /// The solution converged but was not accepted; the step is repeated.
    Continued {
        step: usize,
        /// Number of continues in this step, including this one.
        continues: u64,
        stats: Statistics,
    },

    /// The solution was discarded and the step is retried or abandoned.
    Canceled {
        step: usize,
        /// The increment that was discarded.
        increment: f64,
        /// The solver failure behind the discard, if the solver raised one.
        failure: Option<&'a SolverFailure>,
        /// How the step is retried; `None` means no strategy is left.
        retry: Option<Retry>,
        stats: Statistics,
    },
}

impl Event<'_> {
    /// Returns the time step the event refers to.
    #[must_use]
    pub fn step(&self) -> usize {
        match self {
            Self::Committed { step, .. }
            | Self::Continued { step, .. }
            | Self::Canceled { step, .. } => *step,
        }
    }

    /// Returns the run totals at the time of the event.
    #[must_use]
    pub fn stats(&self) -> Statistics {
        match self {
            Self::Committed { stats, .. }
            | Self::Continued { stats, .. }
            | Self::Canceled { stats, .. } => *stats,
        }
    }
}
