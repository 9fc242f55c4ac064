//! Shared fixtures for end-to-end stepping tests.
//!
//! [`SpringChainSolver`] finds equilibrium of two springs in series: the left
//! end is fixed, the right end is displaced by whatever the model prescribes
//! for [`SpringChainSolver::END`], and the middle node is free. The left spring
//! is linear and the right one hardens cubically, so Newton needs more
//! iterations for larger load increments.

use flexstep_core::{
    Action, Constraints, Model, SimulationState, Solver, SolverFailure, SolverSettings,
};

const ORIGIN: &str = "spring-chain";

/// Stiffness parameters of the chain.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpringChain {
    pub left_stiffness: f64,
    pub right_stiffness: f64,
    pub hardening: f64,
}

impl Default for SpringChain {
    fn default() -> Self {
        Self {
            left_stiffness: 1.0,
            right_stiffness: 1.0,
            hardening: 10.0,
        }
    }
}

impl SpringChain {
    /// Out-of-balance force on the middle node at displacement `u` with the
    /// right end at `end`.
    #[must_use]
    pub fn residual(&self, u: f64, end: f64) -> f64 {
        let stretch = end - u;
        self.left_stiffness * u
            - self.right_stiffness * (stretch + self.hardening * stretch.powi(3))
    }

    #[must_use]
    pub fn tangent(&self, u: f64, end: f64) -> f64 {
        let stretch = end - u;
        self.left_stiffness
            + self.right_stiffness * (1.0 + 3.0 * self.hardening * stretch.powi(2))
    }
}

/// A committed equilibrium state.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Equilibrium {
    pub time: f64,
    pub end: f64,
    pub middle: f64,
}

/// Newton solver for a [`SpringChain`] with pseudo-time equal to the sum of
/// committed step sizes.
#[derive(Debug, Clone)]
pub struct SpringChainSolver {
    pub chain: SpringChain,
    pub tolerance: f64,
    pub max_iter: usize,
    /// Load increments larger than this produce a non-finite solution.
    pub blow_up_above: Option<f64>,
    dt: f64,
    time: f64,
    time0: f64,
    end: f64,
    end0: f64,
    middle: f64,
    middle0: f64,
    history: Vec<Equilibrium>,
}

impl Default for SpringChainSolver {
    fn default() -> Self {
        Self::new(SpringChain::default())
    }
}

impl SpringChainSolver {
    /// Node group whose displacement drives the chain.
    pub const END: (&'static str, &'static str) = ("end", "dx");

    #[must_use]
    pub fn new(chain: SpringChain) -> Self {
        Self {
            chain,
            tolerance: 1.0e-10,
            max_iter: 20,
            blow_up_above: None,
            dt: 0.0,
            time: 0.0,
            time0: 0.0,
            end: 0.0,
            end0: 0.0,
            middle: 0.0,
            middle0: 0.0,
            history: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_max_iter(mut self, max_iter: usize) -> Self {
        self.max_iter = max_iter;
        self
    }

    #[must_use]
    pub fn with_blow_up_above(mut self, increment: f64) -> Self {
        self.blow_up_above = Some(increment);
        self
    }

    /// Returns every committed equilibrium in order.
    #[must_use]
    pub fn history(&self) -> &[Equilibrium] {
        &self.history
    }

    /// Returns the last committed equilibrium, if any.
    #[must_use]
    pub fn last(&self) -> Option<&Equilibrium> {
        self.history.last()
    }

    fn prescribed_end<M: Model + ?Sized>(
        model: &mut M,
        state: &SimulationState,
    ) -> Result<f64, SolverFailure> {
        let (group, dof) = Self::END;
        let mut action = Action::GetConstraints(Constraints::new());
        model.take_action(&mut action, state);

        let end = match action {
            Action::GetConstraints(constraints) => constraints.get(group, dof),
            _ => None,
        };
        end.ok_or_else(|| {
            SolverFailure::invalid_state(ORIGIN, format!("no {dof} prescribed on {group}"))
        })
    }
}

impl<M: Model + ?Sized> Solver<M> for SpringChainSolver {
    fn init(&mut self, _model: &mut M, state: &mut SimulationState) -> Result<(), SolverFailure> {
        self.time0 = 0.0;
        self.time = 0.0;
        state.set_time(0.0);
        Ok(())
    }

    fn configure(&mut self, settings: &SolverSettings) {
        if let Some(dt) = settings.delta_time {
            self.dt = dt;
        }
    }

    fn advance(&mut self, model: &mut M, state: &mut SimulationState) {
        model.take_action(&mut Action::Advance, state);
        self.time = self.time0 + self.dt;
        state.set_time(self.time);
    }

    fn solve(&mut self, model: &mut M, state: &mut SimulationState) -> Result<(), SolverFailure> {
        let end = Self::prescribed_end(model, state)?;

        let mut u = self.middle0;
        if let Some(limit) = self.blow_up_above {
            if (end - self.end0).abs() > limit {
                u = f64::NAN;
            }
        }

        for iter in 0..=self.max_iter {
            let residual = self.chain.residual(u, end);
            state.solver_info.iter_count = Some(iter);

            if !residual.is_finite() {
                return Err(SolverFailure::invalid_state(
                    ORIGIN,
                    format!("residual is not finite after {iter} iterations"),
                ));
            }

            state.solver_info.residual = Some(residual.abs());
            if residual.abs() <= self.tolerance {
                self.end = end;
                self.middle = u;
                return Ok(());
            }

            u -= residual / self.chain.tangent(u, end);
        }

        Err(SolverFailure::not_converged(
            ORIGIN,
            format!("no convergence in {} iterations", self.max_iter),
        ))
    }

    fn commit(&mut self, model: &mut M, state: &mut SimulationState) {
        model.take_action(&mut Action::Commit, state);
        self.time0 = self.time;
        self.end0 = self.end;
        self.middle0 = self.middle;
        self.history.push(Equilibrium {
            time: self.time,
            end: self.end,
            middle: self.middle,
        });
    }

    fn cancel(&mut self, model: &mut M, state: &mut SimulationState) {
        model.take_action(&mut Action::Cancel, state);
        self.time = self.time0;
        self.end = self.end0;
        self.middle = self.middle0;
        state.set_time(self.time0);
    }
}
