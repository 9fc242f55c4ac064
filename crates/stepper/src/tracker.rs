use std::fmt;

/// Run totals accumulated over the whole simulation.
///
/// Every field only ever grows.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Statistics {
    pub runs: u64,
    pub commits: u64,
    pub cancels: u64,
    pub continues: u64,
    /// Continues whose step was canceled afterwards.
    pub cancels_after_continue: u64,
    pub iterations: u64,
    /// Iterations spent on steps that had already been continued.
    pub iterations_after_continue: u64,
}

impl fmt::Display for Statistics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "adaptive stepping statistics ...")?;
        writeln!(f, "... total # of runs: {}", self.runs)?;
        writeln!(f, "... # of commits:    {}", self.commits)?;
        writeln!(f, "... # of continues:  {}", self.continues)?;
        writeln!(
            f,
            "-------  ( of which {} were canceled.)",
            self.cancels_after_continue
        )?;
        writeln!(f, "... # of cancels:    {}", self.cancels)?;
        writeln!(f, "...")?;
        writeln!(f, "... total # of iterations: {}", self.iterations)?;
        write!(
            f,
            "-------  ( of which {} after continue.)",
            self.iterations_after_continue
        )
    }
}

/// Counters for the simulation step currently being attempted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StepCounters {
    pub cancels: u64,
    pub continues: u64,
    /// Largest iteration count seen since the last commit or cancel.
    pub max_iterations: usize,
}

/// Bookkeeping of run outcomes.
///
/// The tracker has no say in any decision; the stepper reports what happened
/// and reads the counters back for step-size feedback and reporting.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OutcomeTracker {
    totals: Statistics,
    step: StepCounters,
}

impl OutcomeTracker {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a snapshot of the run totals.
    #[must_use]
    pub fn statistics(&self) -> Statistics {
        self.totals
    }

    /// Returns the counters of the current step.
    #[must_use]
    pub fn step(&self) -> StepCounters {
        self.step
    }

    /// Returns true if the current step has been continued at least once.
    #[must_use]
    pub fn is_continuing(&self) -> bool {
        self.step.continues > 0
    }

    /// Returns the largest iteration count seen in the current step.
    #[must_use]
    pub fn max_iterations(&self) -> usize {
        self.step.max_iterations
    }

    pub fn record_run(&mut self) {
        self.totals.runs += 1;
    }

    /// Adds the iteration count of one solve.
    pub fn record_iterations(&mut self, iterations: usize) {
        self.step.max_iterations = self.step.max_iterations.max(iterations);
        let iterations = iterations as u64;
        self.totals.iterations += iterations;
        if self.is_continuing() {
            self.totals.iterations_after_continue += iterations;
        }
    }

    /// Counts a commit and starts a fresh step.
    pub fn record_commit(&mut self) {
        self.totals.commits += 1;
        self.step = StepCounters::default();
    }

    /// Counts a continuation and returns the number of continues in this step.
    pub fn record_continue(&mut self) -> u64 {
        self.totals.continues += 1;
        self.step.continues += 1;
        self.step.continues
    }

    /// Counts a cancel.
    ///
    /// Pending continues of the step are folded into the
    /// canceled-after-continue total, and the iteration maximum restarts.
    pub fn record_cancel(&mut self) {
        self.totals.cancels += 1;
        self.step.cancels += 1;
        self.totals.cancels_after_continue += self.step.continues;
        self.step.continues = 0;
        self.step.max_iterations = 0;
    }
}
