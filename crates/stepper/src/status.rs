use std::fmt;

/// Result of a single run, returned to the host driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    /// Call `run` again.
    Continue,
    /// The simulation is over.
    Exit(ExitReason),
}

impl Status {
    #[must_use]
    pub fn is_exit(&self) -> bool {
        matches!(self, Self::Exit(_))
    }
}

/// Why the simulation ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitReason {
    /// Neither reducing nor increasing the step size is possible.
    StrategyExhausted,
    /// A model demanded termination after a committed step.
    ModelTerminated,
    /// The simulated time exceeded the configured maximum.
    TimeLimitReached,
    /// An observer requested an early stop.
    StoppedByObserver,
    /// The driver loop hit its run limit.
    RunLimitReached,
}

impl fmt::Display for ExitReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::StrategyExhausted => "no step size strategy left",
            Self::ModelTerminated => "terminated by model",
            Self::TimeLimitReached => "maximum simulated time reached",
            Self::StoppedByObserver => "stopped by observer",
            Self::RunLimitReached => "run limit reached",
        };
        f.write_str(s)
    }
}
