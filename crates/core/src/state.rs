/// Information published by a solver about its most recent solve.
///
/// The record is cleared at the start of every run. A solver that fails
/// before reaching a result may leave some fields unset.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SolverInfo {
    /// Number of nonlinear iterations performed.
    pub iter_count: Option<usize>,
    /// Final residual norm, if the solver reports one.
    pub residual: Option<f64>,
}

impl SolverInfo {
    /// Resets all fields to unset.
    pub fn clear(&mut self) {
        *self = Self::default();
    }
}

/// Shared simulation context passed explicitly between host and plugins.
///
/// The stepping module owns the authoritative time-step index during a run
/// and publishes it here. Solvers receive mutable access and may advance the
/// simulated time; models only receive shared references.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SimulationState {
    time_step: usize,
    time: Option<f64>,
    accepted: bool,
    /// Information about the most recent solve.
    pub solver_info: SolverInfo,
}

impl SimulationState {
    /// Creates a state at time step zero with no simulated time.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the current time-step index.
    #[must_use]
    pub fn time_step(&self) -> usize {
        self.time_step
    }

    /// Publishes a new time-step index.
    pub fn set_time_step(&mut self, time_step: usize) {
        self.time_step = time_step;
    }

    /// Returns the simulated time, if the host or solver tracks one.
    #[must_use]
    pub fn time(&self) -> Option<f64> {
        self.time
    }

    /// Sets the simulated time.
    pub fn set_time(&mut self, time: f64) {
        self.time = Some(time);
    }

    /// Returns whether the solution of the last attempted step was accepted.
    #[must_use]
    pub fn accepted(&self) -> bool {
        self.accepted
    }

    /// Records whether the solution of the last attempted step was accepted.
    pub fn set_accepted(&mut self, accepted: bool) {
        self.accepted = accepted;
    }
}
