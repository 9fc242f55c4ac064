use approx::assert_relative_eq;
use flexstep_core::{
    Action as ModelAction, FailureKind, Model, SimulationState, Solver, SolverFailure,
};
use flexstep_models::{DirichletConfig, DirichletModel, Phase};
use flexstep_stepper::{Action, AdaptiveStepper, Config, Event, ExitReason, Retry};
use integration_tests::{SpringChain, SpringChainSolver};
use serde::Deserialize;

const RUN_LIMIT: Option<usize> = Some(500);

fn dirichlet(disp_incr: f64) -> DirichletConfig {
    let (group, dof) = SpringChainSolver::END;
    DirichletConfig {
        node_groups: vec![group.into()],
        dofs: vec![dof.into()],
        disp_incr: Some(disp_incr),
        ..DirichletConfig::default()
    }
}

fn stepper<M: Model>(
    config: Config,
    model: M,
    solver: SpringChainSolver,
) -> (AdaptiveStepper<M, SpringChainSolver>, SimulationState) {
    let mut stepper = AdaptiveStepper::new(config, model, solver).expect("valid config");
    let mut state = SimulationState::new();
    stepper.init(&mut state).expect("init should succeed");
    (stepper, state)
}

fn assert_in_equilibrium(solver: &SpringChainSolver) {
    for eq in solver.history() {
        assert!(solver.chain.residual(eq.middle, eq.end).abs() <= solver.tolerance);
    }
}

#[test]
fn reaches_target_displacement() {
    let model = DirichletModel::new(DirichletConfig {
        max_disp: Some(1.0),
        ..dirichlet(0.1)
    })
    .expect("valid model config");
    let (mut stepper, mut state) = stepper(Config::default(), model, SpringChainSolver::default());

    let reason = stepper.run_until_exit(&mut state, RUN_LIMIT);
    let stats = stepper.shutdown(&mut state);

    assert_eq!(reason, ExitReason::ModelTerminated);
    assert_eq!(stats.commits, 11);
    assert_eq!(stats.cancels, 0);
    assert_eq!(state.time_step(), 11);

    let solver = stepper.solver();
    assert_in_equilibrium(solver);
    let last = solver.last().expect("committed steps");
    assert_relative_eq!(last.end, 1.1, epsilon = 1e-12);
    assert_relative_eq!(last.time, 11.0, epsilon = 1e-12);
    assert_relative_eq!(stepper.model().committed_scale(), last.end);
}

#[test]
fn recovers_from_blow_up() {
    let model = DirichletModel::new(DirichletConfig {
        max_disp: Some(1.0),
        ..dirichlet(0.2)
    })
    .expect("valid model config");
    let solver = SpringChainSolver::default().with_blow_up_above(0.15);
    let (mut stepper, mut state) = stepper(Config::default(), model, solver);

    let mut failures = Vec::new();
    let mut observer = |event: &Event<'_>| -> Option<Action> {
        if let Event::Canceled { failure, retry, .. } = event {
            failures.push((failure.map(|f| f.kind), *retry));
        }
        None
    };
    let reason = stepper.run_until_exit_observed(&mut state, RUN_LIMIT, &mut observer);

    assert_eq!(reason, ExitReason::ModelTerminated);
    assert_eq!(
        failures,
        vec![(Some(FailureKind::InvalidState), Some(Retry::Reduced)); 3]
    );

    let stats = stepper.tracker().statistics();
    assert_eq!(stats.cancels, 3);
    assert_eq!(stats.commits, 11);

    let solver = stepper.solver();
    assert_in_equilibrium(solver);
    let mut previous = 0.0;
    for eq in solver.history() {
        assert!(eq.end - previous <= 0.15);
        previous = eq.end;
    }
    assert!(previous > 1.0);
}

#[test]
fn iteration_limit_forces_smaller_steps() {
    let model = DirichletModel::new(DirichletConfig {
        max_disp: Some(1.0),
        ..dirichlet(0.5)
    })
    .expect("valid model config");
    let solver = SpringChainSolver::default().with_max_iter(4);
    let (mut stepper, mut state) = stepper(Config::default(), model, solver);

    let reason = stepper.run_until_exit(&mut state, RUN_LIMIT);

    assert_eq!(reason, ExitReason::ModelTerminated);
    let stats = stepper.tracker().statistics();
    assert_eq!(stats.cancels, 3);
    assert_eq!(stats.commits, 8);

    // The first attempt at the full step never converges.
    let first = stepper.solver().history()[0];
    assert_relative_eq!(first.time, 0.45, epsilon = 1e-12);
    assert_relative_eq!(first.end, 0.225, epsilon = 1e-12);
}

#[test]
fn time_limit_ends_simulation() {
    let config = Config {
        time_max: Some(2.5),
        ..Config::default()
    };
    let model = DirichletModel::new(dirichlet(0.05)).expect("valid model config");
    let (mut stepper, mut state) = stepper(config, model, SpringChainSolver::default());

    let reason = stepper.run_until_exit(&mut state, RUN_LIMIT);

    assert_eq!(reason, ExitReason::TimeLimitReached);
    assert_eq!(stepper.solver().history().len(), 3);
    assert_relative_eq!(state.time().unwrap(), 3.0);
}

#[test]
fn strict_bounds_cap_the_increment() {
    let config = Config {
        start_incr: 0.1,
        max_incr: Some(0.2),
        strict: true,
        ..Config::default()
    };
    let model = DirichletModel::new(DirichletConfig {
        disp_incr: None,
        disp_rate: Some(1.0),
        max_disp: Some(1.0),
        ..dirichlet(0.0)
    })
    .expect("valid model config");
    let (mut stepper, mut state) = stepper(config, model, SpringChainSolver::default());

    let reason = stepper.run_until_exit(&mut state, RUN_LIMIT);
    assert_eq!(reason, ExitReason::ModelTerminated);

    let mut previous = 0.0;
    for eq in stepper.solver().history() {
        // Rate control moves the load by exactly the step size.
        assert_relative_eq!(eq.end, eq.time, epsilon = 1e-12);
        assert!(eq.time - previous <= 0.2 + 1e-12);
        previous = eq.time;
    }
    assert_eq!(stepper.solver().history().len(), 6);
}

#[test]
fn load_turns_and_holds() {
    let model = DirichletModel::new(DirichletConfig {
        turn_disp: Some(0.3),
        hold_disp: Some(0.15),
        ..dirichlet(0.1)
    })
    .expect("valid model config");
    let (mut stepper, mut state) = stepper(Config::default(), model, SpringChainSolver::default());

    let reason = stepper.run_until_exit(&mut state, Some(8));

    assert_eq!(reason, ExitReason::RunLimitReached);
    assert_eq!(stepper.model().phase(), Phase::Holding);

    let ends: Vec<f64> = stepper.solver().history().iter().map(|eq| eq.end).collect();
    let expected = [0.1, 0.2, 0.3, 0.2, 0.1, 0.1, 0.1, 0.1];
    assert_eq!(ends.len(), expected.len());
    for (end, want) in ends.into_iter().zip(expected) {
        assert_relative_eq!(end, want, epsilon = 1e-12);
    }
}

/// Rejects the first converged solution of every step.
#[derive(Default)]
struct SecondOpinion {
    asked: bool,
}

impl Model for SecondOpinion {
    fn take_action(&mut self, action: &mut ModelAction, _state: &SimulationState) -> bool {
        match action {
            ModelAction::CheckCommit(decision) if !self.asked => {
                self.asked = true;
                decision.accept = false;
            }
            ModelAction::Commit => self.asked = false,
            _ => return false,
        }
        true
    }
}

#[test]
fn actions_reach_every_model() {
    let loading = DirichletModel::new(DirichletConfig {
        max_disp: Some(0.5),
        ..dirichlet(0.1)
    })
    .expect("valid model config");
    let models: Vec<Box<dyn Model>> = vec![Box::new(loading), Box::new(SecondOpinion::default())];
    let (mut stepper, mut state) = stepper(Config::default(), models, SpringChainSolver::default());

    assert!(!stepper.run(&mut state).is_exit());
    assert!(!state.accepted());
    assert_eq!(state.time_step(), 0);

    let reason = stepper.run_until_exit(&mut state, RUN_LIMIT);

    assert_eq!(reason, ExitReason::ModelTerminated);
    let stats = stepper.tracker().statistics();
    assert_eq!(stats.commits, 6);
    assert_eq!(stats.continues, stats.commits);
    assert_eq!(stats.runs, 12);
    assert_in_equilibrium(stepper.solver());
}

#[test]
fn statistics_file_has_one_record_per_commit() {
    let dir = tempfile::TempDir::new().expect("temp dir");
    let path = dir.path().join("flex.stats");
    let config = Config {
        write_stats: true,
        stats_file: path.clone(),
        ..Config::default()
    };
    let model = DirichletModel::new(DirichletConfig {
        max_disp: Some(0.35),
        ..dirichlet(0.1)
    })
    .expect("valid model config");
    let (mut stepper, mut state) = stepper(config, model, SpringChainSolver::default());

    stepper.run_until_exit(&mut state, RUN_LIMIT);
    let stats = stepper.shutdown(&mut state);

    let text = std::fs::read_to_string(&path).expect("stats file");
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(stats.commits, 4);
    assert_eq!(lines.len(), 5);
    assert!(lines[0].trim_start().starts_with("nRun"));
    assert!(lines[4].trim_start().starts_with("4.0000e+00  4.0000e+00"));
}

#[derive(Deserialize)]
struct Input {
    stepper: Config,
    dirichlet: DirichletConfig,
}

#[test]
fn runs_from_toml_input() {
    let input: Input = toml::from_str(
        r#"
        [stepper]
        startIncr = 0.5
        optIter = 4
        reduction = 0.5

        [dirichlet]
        nodeGroups = ["end"]
        dofs = ["dx"]
        dispRate = 0.2
        maxDisp = 0.6
        "#,
    )
    .expect("valid input");

    let model = DirichletModel::new(input.dirichlet).expect("valid model config");
    let (mut stepper, mut state) = stepper(input.stepper, model, SpringChainSolver::default());

    let reason = stepper.run_until_exit(&mut state, RUN_LIMIT);

    assert_eq!(reason, ExitReason::ModelTerminated);
    assert_relative_eq!(stepper.config().min_incr(), 5.0e-4);
    assert!(stepper.solver().last().expect("commits").end > 0.6);
}

/// Solver whose every solve fails.
struct Stuck(SpringChainSolver);

impl<M: Model + ?Sized> Solver<M> for Stuck {
    fn configure(&mut self, settings: &flexstep_core::SolverSettings) {
        Solver::<M>::configure(&mut self.0, settings);
    }

    fn advance(&mut self, model: &mut M, state: &mut SimulationState) {
        self.0.advance(model, state);
    }

    fn solve(&mut self, _model: &mut M, state: &mut SimulationState) -> Result<(), SolverFailure> {
        state.solver_info.iter_count = Some(1);
        Err(SolverFailure::not_converged("stuck", "never converges"))
    }

    fn commit(&mut self, model: &mut M, state: &mut SimulationState) {
        self.0.commit(model, state);
    }

    fn cancel(&mut self, model: &mut M, state: &mut SimulationState) {
        self.0.cancel(model, state);
    }
}

#[test]
fn gives_up_when_no_step_size_works() {
    let config = Config {
        start_incr: 1.0,
        min_incr: Some(0.1),
        max_incr: Some(2.0),
        reduction: 0.5,
        ..Config::default()
    };
    let model = DirichletModel::new(dirichlet(0.1)).expect("valid model config");
    let mut stepper =
        AdaptiveStepper::new(config, model, Stuck(SpringChainSolver::new(SpringChain::default())))
            .expect("valid config");
    let mut state = SimulationState::new();
    stepper.init(&mut state).expect("init should succeed");

    let reason = stepper.run_until_exit(&mut state, RUN_LIMIT);

    assert_eq!(reason, ExitReason::StrategyExhausted);
    let stats = stepper.tracker().statistics();
    assert_eq!(stats.commits, 0);
    // 1 -> 0.5 -> 0.25 -> 0.125 -> 0.0625, then 2 and 4.
    assert_eq!(stats.cancels, 7);
    assert_eq!(state.time_step(), 0);
    assert_relative_eq!(stepper.model().disp_scale(), 0.0);
}
