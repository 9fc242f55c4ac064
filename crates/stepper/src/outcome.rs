use flexstep_core::{CommitDecision, Terminate};

/// What happened during one run, as seen by the stepper.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StepOutcome {
    pub converged: bool,
    pub discard: bool,
    pub accept: bool,
    pub terminate: Option<Terminate>,
    pub iterations: usize,
}

/// The transition selected for a run's outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// The solution is final for this step.
    Commit,
    /// Converged but not accepted; repeat the step from this solution.
    Continue,
    /// Throw the solution away and retry the step.
    Cancel,
}

impl StepOutcome {
    /// Outcome of a solve that raised a failure; the model is not consulted.
    #[must_use]
    pub fn failed(iterations: usize) -> Self {
        Self {
            converged: false,
            discard: true,
            accept: true,
            terminate: None,
            iterations,
        }
    }

    /// Outcome of a converged solve judged by the models.
    #[must_use]
    pub fn converged(iterations: usize, decision: CommitDecision) -> Self {
        Self {
            converged: true,
            discard: decision.discard,
            accept: decision.accept,
            terminate: decision.terminate,
            iterations,
        }
    }

    /// Returns true if the solution counts as accepted for output purposes.
    #[must_use]
    pub fn is_accepted(&self) -> bool {
        self.accept && !self.discard
    }

    /// Selects the transition. A discard always wins over acceptance.
    #[must_use]
    pub fn transition(&self) -> Transition {
        if self.discard {
            Transition::Cancel
        } else if self.accept {
            Transition::Commit
        } else {
            Transition::Continue
        }
    }

    /// Returns true if a model demanded termination after this step.
    #[must_use]
    pub fn terminate_requested(&self) -> bool {
        self.terminate == Some(Terminate::Sure)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decision(accept: bool, discard: bool) -> CommitDecision {
        CommitDecision {
            accept,
            discard,
            terminate: None,
        }
    }

    #[test]
    fn discard_dominates_accept() {
        let outcome = StepOutcome::converged(3, decision(true, true));

        assert_eq!(outcome.transition(), Transition::Cancel);
        assert!(!outcome.is_accepted());
    }

    #[test]
    fn unaccepted_solution_continues() {
        let outcome = StepOutcome::converged(3, decision(false, false));

        assert_eq!(outcome.transition(), Transition::Continue);
        assert!(!outcome.is_accepted());
    }

    #[test]
    fn default_decision_commits() {
        let outcome = StepOutcome::converged(3, CommitDecision::default());

        assert_eq!(outcome.transition(), Transition::Commit);
        assert!(outcome.is_accepted());
    }

    #[test]
    fn failed_solve_cancels() {
        let outcome = StepOutcome::failed(0);

        assert!(!outcome.converged);
        assert_eq!(outcome.transition(), Transition::Cancel);
    }

    #[test]
    fn only_sure_termination_counts() {
        let mut d = CommitDecision::default();
        d.request_terminate(Terminate::Suggested);
        assert!(!StepOutcome::converged(1, d).terminate_requested());

        d.request_terminate(Terminate::Sure);
        assert!(StepOutcome::converged(1, d).terminate_requested());
    }
}
