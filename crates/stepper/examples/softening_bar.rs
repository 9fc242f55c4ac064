//! Displacement-controlled loading of a softening bar in series with a spring.
//!
//! The left bar softens exponentially once stretched past its peak, so the
//! Newton solver needs more iterations, and occasionally fails, as the load
//! passes the peak. The stepper adapts the step size and prints the committed
//! load path.
//!
//! # Usage
//!
//! ```text
//! cargo run --example softening_bar
//! cargo run --example softening_bar -- 0.5
//! RUST_LOG=flexstep_stepper=debug cargo run --example softening_bar
//! ```
//!
//! The optional argument is the starting step size (default 1.0).

use std::error::Error;

use flexstep_core::{
    Action as ModelAction, Constraints, Model, SimulationState, Solver, SolverFailure,
    SolverSettings,
};
use flexstep_models::{DirichletConfig, DirichletModel};
use flexstep_stepper::{Action, AdaptiveStepper, Config, Event};

const GROUP: &str = "tip";
const DOF: &str = "dx";

fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .with_target(false)
        .init();

    let start_incr = std::env::args()
        .nth(1)
        .as_deref()
        .map(str::parse::<f64>)
        .transpose()?
        .unwrap_or(1.0);

    let config = Config {
        start_incr,
        max_incr: Some(4.0 * start_incr),
        opt_iter: 4,
        ..Config::default()
    };
    let model = DirichletModel::new(DirichletConfig {
        node_groups: vec![GROUP.into()],
        dofs: vec![DOF.into()],
        disp_incr: Some(0.1),
        max_disp: Some(4.0),
        ..DirichletConfig::default()
    })?;

    let mut stepper = AdaptiveStepper::new(config, model, SofteningBar::default())?;
    let mut state = SimulationState::new();
    stepper.init(&mut state)?;

    let mut increments = Vec::new();
    let mut record_increments = |event: &Event<'_>| -> Option<Action> {
        if let Event::Committed { increment, .. } = event {
            increments.push(*increment);
        }
        None
    };
    let reason = stepper.run_until_exit_observed(&mut state, Some(1000), &mut record_increments);
    let stats = stepper.shutdown(&mut state);

    println!("{:>6} {:>10} {:>10} {:>10} {:>10}", "step", "incr", "tip", "middle", "force");
    let bar = stepper.solver();
    for (step, (incr, point)) in increments.iter().zip(&bar.history).enumerate() {
        println!(
            "{:>6} {incr:>10.4} {:>10.4} {:>10.4} {:>10.4}",
            step + 1,
            point.tip,
            point.middle,
            point.force
        );
    }
    println!("finished: {reason}");
    println!("{stats}");
    Ok(())
}

/// A bar with force `k * e * exp(-e / e0)` in series with a linear spring.
///
/// The tip displacement comes from the model; the middle node is solved for.
struct SofteningBar {
    stiffness: f64,
    peak_strain: f64,
    spring: f64,
    dt: f64,
    time0: f64,
    tip: f64,
    tip0: f64,
    middle: f64,
    middle0: f64,
    history: Vec<LoadPoint>,
}

struct LoadPoint {
    tip: f64,
    middle: f64,
    force: f64,
}

impl Default for SofteningBar {
    fn default() -> Self {
        Self {
            stiffness: 1.0,
            peak_strain: 1.0,
            spring: 0.5,
            dt: 0.0,
            time0: 0.0,
            tip: 0.0,
            tip0: 0.0,
            middle: 0.0,
            middle0: 0.0,
            history: Vec::new(),
        }
    }
}

impl SofteningBar {
    fn bar_force(&self, strain: f64) -> f64 {
        self.stiffness * strain * (-strain / self.peak_strain).exp()
    }

    fn bar_tangent(&self, strain: f64) -> f64 {
        self.stiffness * (1.0 - strain / self.peak_strain) * (-strain / self.peak_strain).exp()
    }
}

impl<M: Model> Solver<M> for SofteningBar {
    fn init(&mut self, _model: &mut M, state: &mut SimulationState) -> Result<(), SolverFailure> {
        state.set_time(0.0);
        Ok(())
    }

    fn configure(&mut self, settings: &SolverSettings) {
        if let Some(dt) = settings.delta_time {
            self.dt = dt;
        }
    }

    fn advance(&mut self, model: &mut M, state: &mut SimulationState) {
        model.take_action(&mut ModelAction::Advance, state);
        state.set_time(self.time0 + self.dt);
    }

    fn solve(&mut self, model: &mut M, state: &mut SimulationState) -> Result<(), SolverFailure> {
        let mut action = ModelAction::GetConstraints(Constraints::new());
        model.take_action(&mut action, state);
        let tip = match &action {
            ModelAction::GetConstraints(constraints) => constraints.get(GROUP, DOF),
            _ => None,
        }
        .ok_or_else(|| SolverFailure::invalid_state("softening-bar", "tip is not constrained"))?;

        let mut u = self.middle0;
        for iter in 0..=6 {
            let residual = self.bar_force(u) - self.spring * (tip - u);
            state.solver_info.iter_count = Some(iter);
            state.solver_info.residual = Some(residual.abs());

            if !residual.is_finite() {
                return Err(SolverFailure::invalid_state("softening-bar", "residual is NaN"));
            }
            if residual.abs() < 1.0e-10 {
                self.tip = tip;
                self.middle = u;
                return Ok(());
            }
            u -= residual / (self.bar_tangent(u) + self.spring);
        }

        Err(SolverFailure::not_converged(
            "softening-bar",
            "no convergence in 6 iterations",
        ))
    }

    fn commit(&mut self, model: &mut M, state: &mut SimulationState) {
        model.take_action(&mut ModelAction::Commit, state);
        self.time0 = state.time().unwrap_or(self.time0);
        self.tip0 = self.tip;
        self.middle0 = self.middle;

        self.history.push(LoadPoint {
            tip: self.tip0,
            middle: self.middle0,
            force: self.bar_force(self.middle0),
        });
    }

    fn cancel(&mut self, model: &mut M, state: &mut SimulationState) {
        model.take_action(&mut ModelAction::Cancel, state);
        self.tip = self.tip0;
        self.middle = self.middle0;
        state.set_time(self.time0);
    }
}
