use crate::Constraints;

/// Actions a [`Model`](crate::Model) can be asked to take.
///
/// The stepping module issues [`SetStepSize`](Action::SetStepSize),
/// [`CheckCommit`](Action::CheckCommit) and [`Continue`](Action::Continue).
/// Solvers issue the lifecycle actions [`Advance`](Action::Advance),
/// [`GetConstraints`](Action::GetConstraints), [`Commit`](Action::Commit)
/// and [`Cancel`](Action::Cancel) while they work through a step.
///
/// Actions that return data carry a response value that models fill in
/// place, which lets the same action be broadcast to several models.
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    /// A new step size is about to be attempted.
    SetStepSize(StepSizeParams),

    /// A converged solution is up for acceptance.
    CheckCommit(CommitDecision),

    /// A converged solution was not accepted and the step is repeated.
    Continue(ContinueParams),

    /// The solver starts a new step from the last committed state.
    Advance,

    /// The solver collects prescribed values for the current step.
    GetConstraints(Constraints),

    /// The solution of the current step became final.
    Commit,

    /// The solution of the current step was discarded.
    Cancel,
}

/// Parameters of [`Action::SetStepSize`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StepSizeParams {
    /// The step size about to be attempted.
    pub step_size: f64,
    /// The configured starting step size.
    pub initial_step_size: f64,
}

/// Parameters of [`Action::Continue`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContinueParams {
    /// Number of continuations of the current step, including this one.
    pub continues: u64,
}

/// A model's verdict on a converged solution.
///
/// Models only ever veto: they clear `accept`, set `discard`, or request
/// termination. A solution that no model objects to is committed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommitDecision {
    /// Whether the solution is final for this step.
    pub accept: bool,
    /// Whether the solution must be thrown away and the step retried.
    pub discard: bool,
    /// Optional request to end the simulation after this step.
    pub terminate: Option<Terminate>,
}

impl Default for CommitDecision {
    fn default() -> Self {
        Self {
            accept: true,
            discard: false,
            terminate: None,
        }
    }
}

impl CommitDecision {
    /// Records a termination request, keeping the strongest one seen.
    pub fn request_terminate(&mut self, terminate: Terminate) {
        self.terminate = Some(match self.terminate {
            Some(Terminate::Sure) => Terminate::Sure,
            _ => terminate,
        });
    }
}

/// Strength of a termination request raised during a commit check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Terminate {
    /// The simulation should end once this step is committed.
    Sure,
    /// A model considers ending worthwhile; the stepper logs and ignores it.
    Suggested,
}
