use flexstep_core::{
    Action, CommitDecision, Constraints, Model, SimulationState, StepSizeParams, Terminate,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

/// Configuration for a [`DirichletModel`].
///
/// ```toml
/// nodeGroups = ["right", "top"]
/// dofs = ["dx", "dy"]
/// factors = [1.0, 0.5]
/// dispIncr = 0.01
/// maxDisp = 0.2
/// ```
///
/// Exactly one of `disp_incr` and `disp_rate` selects the control [`Method`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase", deny_unknown_fields)]
pub struct DirichletConfig {
    pub node_groups: Vec<String>,
    /// One dof type per node group.
    pub dofs: Vec<String>,
    /// One factor per node group; all ones when unset.
    pub factors: Option<Vec<f64>>,
    /// Scale increment at the initial step size.
    pub disp_incr: Option<f64>,
    /// Scale increment per unit step size.
    pub disp_rate: Option<f64>,
    pub init_disp: f64,
    /// Request termination once the absolute scale exceeds this value.
    pub max_disp: Option<f64>,
    /// Start unloading once the absolute scale reaches this value.
    pub turn_disp: Option<f64>,
    /// Hold the scale once it reaches this value.
    pub hold_disp: Option<f64>,
}

impl Default for DirichletConfig {
    fn default() -> Self {
        Self {
            node_groups: Vec::new(),
            dofs: Vec::new(),
            factors: None,
            disp_incr: None,
            disp_rate: None,
            init_disp: 0.0,
            max_disp: None,
            turn_disp: None,
            hold_disp: None,
        }
    }
}

/// Errors that can occur when validating a [`DirichletConfig`].
#[derive(Debug, Error, Clone, PartialEq)]
pub enum DirichletConfigError {
    #[error("no node groups given")]
    NoNodeGroups,

    #[error("expected {expected} {field}, one per node group, got {found}")]
    Length {
        field: &'static str,
        expected: usize,
        found: usize,
    },

    #[error("either dispIncr or dispRate must be given")]
    MissingMethod,

    #[error("dispIncr and dispRate are mutually exclusive")]
    AmbiguousMethod,

    #[error("{field} must be finite and non-negative, got {value}")]
    Limit { field: &'static str, value: f64 },
}

/// How the displacement increment follows the step size.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Method {
    /// `incr` at the initial step size, scaled proportionally with it.
    Increment(f64),
    /// `rate` per unit step size.
    Rate(f64),
}

impl Method {
    /// Returns the scale increment for a step size.
    #[must_use]
    pub fn increment(&self, params: &StepSizeParams) -> f64 {
        match *self {
            Self::Increment(incr) => incr * params.step_size / params.initial_step_size,
            Self::Rate(rate) => rate * params.step_size,
        }
    }
}

/// Loading phase of a [`DirichletModel`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Loading,
    Unloading,
    Holding,
}

/// Displacement-controlled Dirichlet boundary conditions.
///
/// Prescribes `factor * scale` on each configured `(node group, dof)` pair.
/// Each step moves the committed scale by an increment derived from the step
/// size; the trial scale is kept until the solver commits or cancels.
///
/// With `turn_disp` set, the load path reverses once the scale reaches it and
/// stops at `hold_disp` on the way back. Without it, `hold_disp` stops the
/// loading path directly.
#[derive(Debug, Clone)]
pub struct DirichletModel {
    config: DirichletConfig,
    factors: Vec<f64>,
    method: Method,
    phase: Phase,
    scale0: f64,
    scale: f64,
    step_incr: f64,
}

impl DirichletModel {
    /// Creates a model from a configuration.
    ///
    /// # Errors
    ///
    /// Returns a [`DirichletConfigError`] if the node groups, dofs and factors
    /// differ in length, the control method is missing or ambiguous, or a
    /// displacement limit is negative.
    pub fn new(config: DirichletConfig) -> Result<Self, DirichletConfigError> {
        let groups = config.node_groups.len();
        if groups == 0 {
            return Err(DirichletConfigError::NoNodeGroups);
        }
        if config.dofs.len() != groups {
            return Err(DirichletConfigError::Length {
                field: "dofs",
                expected: groups,
                found: config.dofs.len(),
            });
        }

        let factors = match &config.factors {
            Some(factors) if factors.len() != groups => {
                return Err(DirichletConfigError::Length {
                    field: "factors",
                    expected: groups,
                    found: factors.len(),
                });
            }
            Some(factors) => factors.clone(),
            None => vec![1.0; groups],
        };

        let method = match (config.disp_incr, config.disp_rate) {
            (Some(incr), None) => Method::Increment(incr),
            (None, Some(rate)) => Method::Rate(rate),
            (None, None) => return Err(DirichletConfigError::MissingMethod),
            (Some(_), Some(_)) => return Err(DirichletConfigError::AmbiguousMethod),
        };

        for (field, limit) in [
            ("maxDisp", config.max_disp),
            ("turnDisp", config.turn_disp),
            ("holdDisp", config.hold_disp),
        ] {
            if let Some(value) = limit {
                if !value.is_finite() || value < 0.0 {
                    return Err(DirichletConfigError::Limit { field, value });
                }
            }
        }

        let step_incr = match method {
            Method::Increment(incr) => incr,
            Method::Rate(_) => 0.0,
        };

        Ok(Self {
            factors,
            method,
            phase: Phase::Loading,
            scale0: config.init_disp,
            scale: config.init_disp,
            step_incr,
            config,
        })
    }

    #[must_use]
    pub fn config(&self) -> &DirichletConfig {
        &self.config
    }

    #[must_use]
    pub fn method(&self) -> Method {
        self.method
    }

    #[must_use]
    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Returns the scale of the current trial step.
    #[must_use]
    pub fn disp_scale(&self) -> f64 {
        self.scale
    }

    /// Returns the last committed scale.
    #[must_use]
    pub fn committed_scale(&self) -> f64 {
        self.scale0
    }

    /// Returns the signed scale increment applied by the next advance.
    #[must_use]
    pub fn increment(&self) -> f64 {
        match self.phase {
            Phase::Loading => self.step_incr,
            Phase::Unloading => -self.step_incr,
            Phase::Holding => 0.0,
        }
    }

    fn set_step_size(&mut self, params: &StepSizeParams) {
        self.step_incr = self.method.increment(params);
        debug!(
            step_size = params.step_size,
            increment = self.increment(),
            "displacement increment updated"
        );
    }

    fn check_commit(&self, decision: &mut CommitDecision) {
        if let Some(max) = self.config.max_disp {
            if self.scale.abs() > max {
                info!(
                    scale = self.scale,
                    max_disp = max,
                    "maximum displacement exceeded, requesting termination"
                );
                decision.request_terminate(Terminate::Sure);
            }
        }
    }

    fn apply_constraints(&self, constraints: &mut Constraints) {
        for ((group, dof), factor) in self
            .config
            .node_groups
            .iter()
            .zip(&self.config.dofs)
            .zip(&self.factors)
        {
            constraints.set(group, dof, factor * self.scale);
        }
    }

    fn commit(&mut self) {
        self.scale0 = self.scale;

        let reached = self.scale.abs();
        let next = match (self.phase, self.config.turn_disp, self.config.hold_disp) {
            (Phase::Loading, Some(turn), _) if reached >= turn => Phase::Unloading,
            (Phase::Loading, None, Some(hold)) if reached >= hold => Phase::Holding,
            (Phase::Unloading, _, Some(hold)) if reached <= hold => Phase::Holding,
            (phase, _, _) => phase,
        };

        if next != self.phase {
            info!(scale = self.scale, from = ?self.phase, to = ?next, "load phase changed");
            self.phase = next;
        }
    }
}

impl Model for DirichletModel {
    fn take_action(&mut self, action: &mut Action, _state: &SimulationState) -> bool {
        match action {
            Action::SetStepSize(params) => self.set_step_size(params),
            Action::Advance => self.scale = self.scale0 + self.increment(),
            Action::GetConstraints(constraints) => self.apply_constraints(constraints),
            Action::CheckCommit(decision) => self.check_commit(decision),
            Action::Commit => self.commit(),
            Action::Cancel => self.scale = self.scale0,
            Action::Continue(_) => return false,
        }
        true
    }
}
