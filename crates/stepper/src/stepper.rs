use std::{
    fs::File,
    io::{BufWriter, Write},
};

use cpu_time::ProcessTime;
use flexstep_core::{
    Action as ModelAction, CommitDecision, ContinueParams, Model, Observer, SimulationState,
    Solver, SolverFailure, SolverSettings, StepSizeParams, Terminate,
};
use tracing::{debug, error, info, warn};

use crate::{
    Action, Config, Error, Event, ExitReason, OutcomeTracker, Retry, Statistics, StatsWriter,
    Status, StepOutcome, StepSizeController, Transition,
};


/// What a transition leaves behind: a terminal reason, and the observer's reply.
type Flow = (Option<ExitReason>, Option<Action>);

/// Adaptive load stepping around an implicit equilibrium solver.
///
/// The stepper owns a [`Model`] and a [`Solver`] and is driven by a host loop
/// that calls [`run`] until it returns [`Status::Exit`]. Each run attempts one
/// simulation step:
///
/// 1. Push the current increment to the model ([`ModelAction::SetStepSize`])
///    and the solver ([`Solver::configure`]), then advance the solver.
/// 2. Publish the tentative time step `step0 + 1` and solve. A
///    [`SolverFailure`] is logged and turned into a discard.
/// 3. Ask the model to judge a converged solution
///    ([`ModelAction::CheckCommit`]) and publish `accept && !discard` as the
///    accepted flag.
/// 4. Commit, continue, or cancel and retry with a reduced or increased step.
/// 5. Stop once the simulated time exceeds `time_max`.
///
/// No run ever fails: every solver failure turns into a retry, and the
/// simulation ends through [`ExitReason`] instead.
///
/// # Example
///
/// ```ignore
/// let mut stepper = AdaptiveStepper::new(config, model, solver)?;
/// let mut state = SimulationState::new();
///
/// stepper.init(&mut state)?;
/// while !stepper.run(&mut state).is_exit() {}
/// let stats = stepper.shutdown(&mut state);
/// ```
///
/// [`run`]: AdaptiveStepper::run
pub struct AdaptiveStepper<M, S> {
    config: Config,
    model: M,
    solver: S,
    controller: StepSizeController,
    tracker: OutcomeTracker,
    step0: usize,
    stats: Option<StatsWriter<Box<dyn Write>>>,
    /// Process CPU clock at `init`; `None` where the platform cannot read it.
    started: Option<ProcessTime>,
}

impl<M, S> AdaptiveStepper<M, S>
where
    M: Model,
    S: Solver<M>,
{
    /// Creates a stepper around a model and a solver.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidConfig`] if the configuration does not validate.
    pub fn new(config: Config, model: M, solver: S) -> Result<Self, Error> {
        config.validate()?;
        let controller = StepSizeController::new(&config);

        Ok(Self {
            config,
            model,
            solver,
            controller,
            tracker: OutcomeTracker::new(),
            step0: 0,
            stats: None,
            started: ProcessTime::try_now().ok(),
        })
    }

    /// Sends statistics records to `out` instead of the configured file.
    ///
    /// Records are written even if `write_stats` is off in the config.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Stats`] if the header cannot be written.
    pub fn with_stats_output<W: Write + 'static>(mut self, out: W) -> Result<Self, Error> {
        let out: Box<dyn Write> = Box::new(out);
        self.stats = Some(StatsWriter::new(out).map_err(Error::Stats)?);
        Ok(self)
    }

    /// Prepares the stepper and the solver for the first run.
    ///
    /// Resets the published time step and accepted flag, hands the starting
    /// increment to the solver, and opens the statistics file when enabled.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Init`] if the solver fails to initialize, or
    /// [`Error::Stats`] if the statistics file cannot be created.
    pub fn init(&mut self, state: &mut SimulationState) -> Result<(), Error> {
        self.step0 = 0;
        state.set_time_step(0);
        state.set_accepted(false);

        self.solver.configure(&SolverSettings {
            delta_time: Some(self.controller.increment()),
        });
        self.solver
            .init(&mut self.model, state)
            .map_err(Error::Init)?;

        if self.config.write_stats && self.stats.is_none() {
            let file = File::create(&self.config.stats_file).map_err(Error::Stats)?;
            let out: Box<dyn Write> = Box::new(BufWriter::new(file));
            self.stats = Some(StatsWriter::new(out).map_err(Error::Stats)?);
        }

        self.started = ProcessTime::try_now().ok();
        Ok(())
    }

    /// Attempts one simulation step.
    pub fn run(&mut self, state: &mut SimulationState) -> Status {
        self.run_observed(state, &mut ())
    }

    /// Attempts one simulation step and reports the outcome to `observer`.
    ///
    /// The observer sees one [`Event`] per run, after the transition has been
    /// applied. Returning [`Action::StopEarly`] ends the simulation with
    /// [`ExitReason::StoppedByObserver`] unless another exit applies first.
    pub fn run_observed<Obs>(&mut self, state: &mut SimulationState, observer: &mut Obs) -> Status
    where
        Obs: for<'a> Observer<Event<'a>, Action> + ?Sized,
    {
        self.tracker.record_run();
        state.solver_info.clear();

        let increment = self.controller.increment();
        self.push_step_size(increment, state);
        self.solver.advance(&mut self.model, state);

        // Continued attempts start from a converged state and do not count
        // towards the largest increment tried.
        if !self.tracker.is_continuing() {
            self.controller.record_attempt();
        }

        let step = self.step0 + 1;
        state.set_time_step(step);

        let failure = self.solver.solve(&mut self.model, state).err();
        if let Some(failure) = &failure {
            warn!(
                step,
                origin = %failure.origin,
                kind = %failure.kind,
                "solver failed, discarding solution: {}",
                failure.message
            );
        }

        let iterations = state.solver_info.iter_count.unwrap_or(0);
        self.tracker.record_iterations(iterations);

        let outcome = if failure.is_some() {
            StepOutcome::failed(iterations)
        } else {
            StepOutcome::converged(iterations, self.check_commit(state))
        };
        state.set_accepted(outcome.is_accepted());

        let (exit, action) = match outcome.transition() {
            Transition::Commit => self.commit(step, increment, &outcome, state, observer),
            Transition::Continue => self.continue_step(step, state, observer),
            Transition::Cancel => self.cancel(step, increment, failure.as_ref(), state, observer),
        };

        if let Some(reason) = exit {
            return Status::Exit(reason);
        }

        if self.time_limit_reached(state) {
            info!(
                time = state.time(),
                time_max = self.config.time_max,
                "maximum simulated time reached, terminating simulation"
            );
            return Status::Exit(ExitReason::TimeLimitReached);
        }

        match action {
            Some(Action::StopEarly) => {
                info!(step, "observer requested an early stop");
                Status::Exit(ExitReason::StoppedByObserver)
            }
            None => Status::Continue,
        }
    }

    /// Runs until the simulation exits or `max_runs` runs have been made.
    pub fn run_until_exit(
        &mut self,
        state: &mut SimulationState,
        max_runs: Option<usize>,
    ) -> ExitReason {
        self.run_until_exit_observed(state, max_runs, &mut ())
    }

    /// Like [`run_until_exit`](Self::run_until_exit), reporting every run to `observer`.
    pub fn run_until_exit_observed<Obs>(
        &mut self,
        state: &mut SimulationState,
        max_runs: Option<usize>,
        observer: &mut Obs,
    ) -> ExitReason
    where
        Obs: for<'a> Observer<Event<'a>, Action> + ?Sized,
    {
        let mut runs = 0;
        loop {
            if max_runs.is_some_and(|max| runs >= max) {
                return ExitReason::RunLimitReached;
            }
            runs += 1;
            if let Status::Exit(reason) = self.run_observed(state, observer) {
                return reason;
            }
        }
    }

    /// Shuts the solver down and reports the run totals.
    pub fn shutdown(&mut self, state: &mut SimulationState) -> Statistics {
        self.solver.shutdown(state);

        if let Some(writer) = self.stats.take() {
            if let Err(error) = writer.into_inner().flush() {
                warn!(%error, "failed to flush statistics output");
            }
        }

        let stats = self.tracker.statistics();
        info!("{stats}");
        stats
    }

    /// Returns the effective configuration.
    #[must_use]
    pub fn config(&self) -> &Config {
        &self.config
    }

    #[must_use]
    pub fn controller(&self) -> &StepSizeController {
        &self.controller
    }

    #[must_use]
    pub fn tracker(&self) -> &OutcomeTracker {
        &self.tracker
    }

    #[must_use]
    pub fn model(&self) -> &M {
        &self.model
    }

    pub fn model_mut(&mut self) -> &mut M {
        &mut self.model
    }

    #[must_use]
    pub fn solver(&self) -> &S {
        &self.solver
    }

    pub fn solver_mut(&mut self) -> &mut S {
        &mut self.solver
    }

    /// Consumes the stepper and returns the model and the solver.
    pub fn into_parts(self) -> (M, S) {
        (self.model, self.solver)
    }

    fn push_step_size(&mut self, increment: f64, state: &SimulationState) {
        debug!(step_size = increment, "setting step size");

        let mut action = ModelAction::SetStepSize(StepSizeParams {
            step_size: increment,
            initial_step_size: self.controller.initial_increment(),
        });
        self.model.take_action(&mut action, state);

        self.solver.configure(&SolverSettings {
            delta_time: Some(increment),
        });
    }

    fn check_commit(&mut self, state: &SimulationState) -> CommitDecision {
        let mut action = ModelAction::CheckCommit(CommitDecision::default());
        self.model.take_action(&mut action, state);

        match action {
            ModelAction::CheckCommit(decision) => decision,
            _ => CommitDecision::default(),
        }
    }

    fn commit<Obs>(
        &mut self,
        step: usize,
        increment: f64,
        outcome: &StepOutcome,
        state: &mut SimulationState,
        observer: &mut Obs,
    ) -> Flow
    where
        Obs: for<'a> Observer<Event<'a>, Action> + ?Sized,
    {
        self.solver.commit(&mut self.model, state);

        let iterations = self.tracker.max_iterations();
        self.controller
            .on_commit(iterations, self.config.opt_iter, state.time());
        self.tracker.record_commit();
        self.step0 = step;
        self.write_stats();

        let next_increment = self.controller.increment();
        debug!(step, increment, next_increment, iterations, "step committed");

        let action = observer.observe(&Event::Committed {
            step,
            increment,
            next_increment,
            iterations,
            stats: self.tracker.statistics(),
        });

        if outcome.terminate_requested() {
            info!(
                step,
                "a model gave the terminate signal during the commit check, \
                 output for this step is skipped"
            );
            return (Some(ExitReason::ModelTerminated), action);
        }
        if outcome.terminate == Some(Terminate::Suggested) {
            debug!(step, "ignoring non-binding terminate request");
        }

        (None, action)
    }

    fn continue_step<Obs>(
        &mut self,
        step: usize,
        state: &mut SimulationState,
        observer: &mut Obs,
    ) -> Flow
    where
        Obs: for<'a> Observer<Event<'a>, Action> + ?Sized,
    {
        // The solver keeps its converged state as the starting point.
        state.set_time_step(self.step0);

        let continues = self.tracker.record_continue();
        info!(step, continues, "solution not accepted, continuing with this step");

        let mut action = ModelAction::Continue(ContinueParams { continues });
        self.model.take_action(&mut action, state);

        let action = observer.observe(&Event::Continued {
            step,
            continues,
            stats: self.tracker.statistics(),
        });
        (None, action)
    }

    fn cancel<Obs>(
        &mut self,
        step: usize,
        increment: f64,
        failure: Option<&SolverFailure>,
        state: &mut SimulationState,
        observer: &mut Obs,
    ) -> Flow
    where
        Obs: for<'a> Observer<Event<'a>, Action> + ?Sized,
    {
        self.tracker.record_cancel();
        self.solver.cancel(&mut self.model, state);
        state.set_time_step(self.step0);

        let retry = self.controller.next_retry();
        let next = self.controller.increment();
        match retry {
            Some(Retry::Reduced) => {
                info!(step, step_size = next, "returning to the same step with reduced step size");
            }
            Some(Retry::Increased) => {
                info!(step, step_size = next, "returning to the same step with increased step size");
            }
            None => {
                error!(
                    step,
                    min_incr = self.controller.min_increment(),
                    max_incr = self.controller.max_increment(),
                    "out of strategies, cannot find a step size that works for this step"
                );
            }
        }

        let action = observer.observe(&Event::Canceled {
            step,
            increment,
            failure,
            retry,
            stats: self.tracker.statistics(),
        });

        (retry.is_none().then_some(ExitReason::StrategyExhausted), action)
    }

    fn time_limit_reached(&self, state: &SimulationState) -> bool {
        match (self.config.time_max, state.time()) {
            (Some(max), Some(time)) => time > max,
            _ => false,
        }
    }

    fn write_stats(&mut self) {
        let stats = self.tracker.statistics();
        let elapsed = self
            .started
            .and_then(|started| started.try_elapsed().ok())
            .unwrap_or_default();

        let failed = match &mut self.stats {
            Some(writer) => writer.record(&stats, elapsed).err(),
            None => None,
        };

        if let Some(error) = failed {
            warn!(%error, "failed to write statistics, disabling statistics output");
            self.stats = None;
        }
    }
}
