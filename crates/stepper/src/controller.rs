use crate::config::{Config, TimeWindow};

/// Strategy chosen to retry a step after its solution was discarded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Retry {
    /// The increment was multiplied by the reduction factor.
    Reduced,
    /// The increment was grown past the largest increment tried so far.
    Increased,
}

/// Owns the step size and adapts it to solver behavior.
///
/// After a commit the increment follows a smooth proportional rule: more
/// iterations than the target shrinks it, fewer grows it. After a discarded
/// step the controller searches around the last attempt, first reducing the
/// increment until it hits the lower bound, then growing it past the largest
/// increment tried so far, until neither is possible. The search state lives
/// for one simulation step and is reset by [`reset_after_commit`].
///
/// [`reset_after_commit`]: StepSizeController::reset_after_commit
#[derive(Debug, Clone, PartialEq)]
pub struct StepSizeController {
    increment: f64,
    initial: f64,
    min: f64,
    max: f64,
    reduction: f64,
    max_tried: f64,
    tried_smallest: bool,
    window: Option<TimeWindow>,
    strict: bool,
}

impl StepSizeController {
    /// Creates a controller from a validated configuration.
    #[must_use]
    pub fn new(config: &Config) -> Self {
        Self {
            increment: config.start_incr,
            initial: config.start_incr,
            min: config.min_incr(),
            max: config.max_incr(),
            reduction: config.reduction,
            max_tried: 0.0,
            tried_smallest: false,
            window: config.time_window(),
            strict: config.strict,
        }
    }

    /// Returns the current step size.
    #[must_use]
    pub fn increment(&self) -> f64 {
        self.increment
    }

    /// Returns the configured starting step size.
    #[must_use]
    pub fn initial_increment(&self) -> f64 {
        self.initial
    }

    #[must_use]
    pub fn min_increment(&self) -> f64 {
        self.min
    }

    #[must_use]
    pub fn max_increment(&self) -> f64 {
        self.max
    }

    #[must_use]
    pub fn reduction(&self) -> f64 {
        self.reduction
    }

    /// Returns the largest increment attempted in the current step.
    #[must_use]
    pub fn max_tried(&self) -> f64 {
        self.max_tried
    }

    /// Returns true once reduction has been exhausted for the current step.
    #[must_use]
    pub fn tried_smallest(&self) -> bool {
        self.tried_smallest
    }

    /// Records the current increment as attempted.
    pub fn record_attempt(&mut self) {
        self.max_tried = self.max_tried.max(self.increment);
    }

    /// Scales the increment by `0.5^((max_iter - opt_iter) / 4)`.
    ///
    /// The increment only shrinks while above the lower bound and only grows
    /// while below the upper bound.
    pub fn adjust_for_iterations(&mut self, max_iter: usize, opt_iter: usize) {
        let shrink = max_iter > opt_iter && self.increment > self.min;
        let grow = max_iter < opt_iter && self.increment < self.max;

        if shrink || grow {
            #[allow(clippy::cast_precision_loss)]
            let exponent = (max_iter as f64 - opt_iter as f64) / 4.0;
            let scaled = self.increment * 0.5_f64.powf(exponent);
            // Underflow to zero would stall the stepper.
            if scaled > 0.0 {
                self.increment = scaled;
            }
        }
    }

    /// Forces the minimum increment while `time` is inside the fine-resolution window.
    pub fn apply_time_window(&mut self, time: Option<f64>) {
        if let (Some(window), Some(time)) = (self.window, time) {
            if window.contains(time) {
                self.increment = self.min;
            }
        }
    }

    /// Clamps the increment into `[min, max]` when strict mode is on.
    pub fn apply_strict_clamp(&mut self) {
        if self.strict {
            self.increment = self.increment.clamp(self.min, self.max);
        }
    }

    /// Clears the per-step search state.
    pub fn reset_after_commit(&mut self) {
        self.tried_smallest = false;
        self.max_tried = 0.0;
    }

    /// Runs the full commit sequence: iteration feedback, time window,
    /// strict clamp, and search reset.
    pub fn on_commit(&mut self, max_iter: usize, opt_iter: usize, time: Option<f64>) {
        self.adjust_for_iterations(max_iter, opt_iter);
        self.apply_time_window(time);
        self.apply_strict_clamp();
        self.reset_after_commit();
    }

    /// Tries to shrink the increment by the reduction factor.
    ///
    /// Returns false, and remembers it for the rest of the step, once the
    /// increment has reached the lower bound.
    pub fn try_reduce(&mut self) -> bool {
        if !self.tried_smallest && self.increment > self.min {
            self.increment *= self.reduction;
            true
        } else {
            self.tried_smallest = true;
            false
        }
    }

    /// Tries to grow the increment beyond the largest one tried this step.
    ///
    /// Returns false once the largest increment tried exceeds the upper bound.
    pub fn try_increase(&mut self) -> bool {
        if self.max_tried > self.max {
            return false;
        }
        self.max_tried /= self.reduction;
        self.increment = self.max_tried;
        true
    }

    /// Picks the retry strategy after a discarded step: reduce first, then
    /// increase. Returns `None` when both are exhausted.
    pub fn next_retry(&mut self) -> Option<Retry> {
        if self.try_reduce() {
            Some(Retry::Reduced)
        } else if self.try_increase() {
            Some(Retry::Increased)
        } else {
            None
        }
    }
}
