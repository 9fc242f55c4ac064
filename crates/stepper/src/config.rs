use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Configuration for the adaptive stepper.
///
/// Field names follow the camelCase keys used in input files:
///
/// ```toml
/// startIncr = 0.1
/// optIter = 6
/// reduction = 0.5
/// strict = true
/// ```
///
/// Bounds that are left unset derive from `start_incr`: the minimum defaults
/// to `start_incr * 1e-3` and the maximum to `start_incr`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase", deny_unknown_fields)]
pub struct Config {
    /// Append a statistics record to `stats_file` after every commit.
    pub write_stats: bool,
    pub stats_file: PathBuf,
    /// Target number of nonlinear iterations per step.
    pub opt_iter: usize,
    pub start_incr: f64,
    pub min_incr: Option<f64>,
    pub max_incr: Option<f64>,
    /// Factor applied on every step reduction; must lie in (0, 1).
    pub reduction: f64,
    /// Clamp the increment into `[min_incr, max_incr]` after every commit.
    pub strict: bool,
    /// End the simulation once the simulated time exceeds this value.
    pub time_max: Option<f64>,
    /// Start of the window in which the increment is forced to its minimum.
    pub time_a: Option<f64>,
    /// End of that window; open-ended when unset.
    pub time_b: Option<f64>,
}

/// Errors that can occur when validating a [`Config`].
#[derive(Debug, Error, Clone, Copy, PartialEq)]
pub enum ConfigError {
    #[error("startIncr must be finite and positive, got {0}")]
    StartIncr(f64),

    #[error("minIncr must be finite and positive, got {0}")]
    MinIncr(f64),

    #[error("maxIncr must be finite and positive, got {0}")]
    MaxIncr(f64),

    #[error("minIncr ({min}) exceeds maxIncr ({max})")]
    Bounds { min: f64, max: f64 },

    #[error("reduction must lie strictly between 0 and 1, got {0}")]
    Reduction(f64),

    #[error("timeMax must be finite")]
    TimeMax,

    #[error("time window is empty: timeA ({a}) must be less than timeB ({b})")]
    TimeWindow { a: f64, b: f64 },
}

impl Default for Config {
    fn default() -> Self {
        Self {
            write_stats: false,
            stats_file: PathBuf::from("flex.stats"),
            opt_iter: 5,
            start_incr: 1.0,
            min_incr: None,
            max_incr: None,
            reduction: 0.45,
            strict: false,
            time_max: None,
            time_a: None,
            time_b: None,
        }
    }
}

impl Config {
    /// Returns the effective lower increment bound.
    #[must_use]
    pub fn min_incr(&self) -> f64 {
        self.min_incr.unwrap_or(self.start_incr * 1.0e-3)
    }

    /// Returns the effective upper increment bound.
    #[must_use]
    pub fn max_incr(&self) -> f64 {
        self.max_incr.unwrap_or(self.start_incr)
    }

    /// Returns the fine-resolution window, if one is configured.
    ///
    /// The window is active only when `time_a` is set.
    #[must_use]
    pub fn time_window(&self) -> Option<TimeWindow> {
        self.time_a.map(|start| TimeWindow {
            start,
            end: self.time_b.unwrap_or(f64::INFINITY),
        })
    }

    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] if an increment setting is non-positive or
    /// non-finite, the bounds are inverted, the reduction factor is outside
    /// (0, 1), or the time settings are inconsistent.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.start_incr.is_finite() || self.start_incr <= 0.0 {
            return Err(ConfigError::StartIncr(self.start_incr));
        }

        let min = self.min_incr();
        if !min.is_finite() || min <= 0.0 {
            return Err(ConfigError::MinIncr(min));
        }

        let max = self.max_incr();
        if !max.is_finite() || max <= 0.0 {
            return Err(ConfigError::MaxIncr(max));
        }
        if min > max {
            return Err(ConfigError::Bounds { min, max });
        }

        // Increasing the step divides by the reduction factor.
        if !(self.reduction > 0.0 && self.reduction < 1.0) {
            return Err(ConfigError::Reduction(self.reduction));
        }

        if self.time_max.is_some_and(|t| !t.is_finite()) {
            return Err(ConfigError::TimeMax);
        }

        if let Some(window) = self.time_window() {
            if window.start.is_nan() || window.end.is_nan() || window.start >= window.end {
                return Err(ConfigError::TimeWindow {
                    a: window.start,
                    b: window.end,
                });
            }
        }

        Ok(())
    }
}

/// An open interval of simulated time `(start, end)`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimeWindow {
    pub start: f64,
    pub end: f64,
}

impl TimeWindow {
    /// Returns true if `time` lies strictly inside the window.
    #[must_use]
    pub fn contains(&self, time: f64) -> bool {
        self.start < time && time < self.end
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use approx::assert_relative_eq;

    #[test]
    fn bounds_derive_from_start_increment() {
        let config = Config {
            start_incr: 0.2,
            ..Config::default()
        };

        assert_relative_eq!(config.min_incr(), 2.0e-4);
        assert_relative_eq!(config.max_incr(), 0.2);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn parses_camel_case_keys() {
        let config: Config = toml::from_str(
            r#"
            writeStats = true
            statsFile = "run.stats"
            optIter = 8
            startIncr = 0.5
            minIncr = 0.01
            reduction = 0.5
            strict = true
            timeMax = 10.0
            timeA = 2.0
            timeB = 3.0
            "#,
        )
        .expect("valid toml");

        assert!(config.write_stats);
        assert_eq!(config.stats_file, PathBuf::from("run.stats"));
        assert_eq!(config.opt_iter, 8);
        assert_relative_eq!(config.min_incr(), 0.01);
        assert_relative_eq!(config.max_incr(), 0.5);
        assert!(config.strict);
        assert_eq!(
            config.time_window(),
            Some(TimeWindow {
                start: 2.0,
                end: 3.0
            })
        );
        assert!(config.validate().is_ok());
    }

    #[test]
    fn empty_input_gives_defaults() {
        let config: Config = toml::from_str("").expect("valid toml");

        assert_eq!(config, Config::default());
        assert_eq!(config.opt_iter, 5);
        assert_relative_eq!(config.reduction, 0.45);
        assert!(!config.strict);
    }

    #[test]
    fn rejects_unknown_keys() {
        let result: Result<Config, _> = toml::from_str("stepSize = 1.0");
        assert!(result.is_err());
    }

    #[test]
    fn rejects_reduction_outside_unit_interval() {
        for reduction in [0.0, 1.0, 1.5, -0.3, f64::NAN] {
            let config = Config {
                reduction,
                ..Config::default()
            };
            assert!(matches!(config.validate(), Err(ConfigError::Reduction(_))));
        }
    }

    #[test]
    fn rejects_inverted_bounds() {
        let config = Config {
            min_incr: Some(2.0),
            max_incr: Some(1.0),
            ..Config::default()
        };

        assert_eq!(
            config.validate(),
            Err(ConfigError::Bounds { min: 2.0, max: 1.0 })
        );
    }

    #[test]
    fn rejects_non_positive_start() {
        let config = Config {
            start_incr: 0.0,
            ..Config::default()
        };

        assert!(matches!(config.validate(), Err(ConfigError::StartIncr(_))));
    }

    #[test]
    fn rejects_empty_time_window() {
        let config = Config {
            time_a: Some(3.0),
            time_b: Some(2.0),
            ..Config::default()
        };

        assert!(matches!(
            config.validate(),
            Err(ConfigError::TimeWindow { .. })
        ));
    }

    #[test]
    fn window_without_end_is_open() {
        let config = Config {
            time_a: Some(1.0),
            ..Config::default()
        };
        let window = config.time_window().expect("window configured");

        assert!(window.contains(1.5));
        assert!(window.contains(1.0e12));
        assert!(!window.contains(1.0));
    }

    #[test]
    fn window_needs_a_start() {
        let config = Config {
            time_b: Some(3.0),
            ..Config::default()
        };

        assert_eq!(config.time_window(), None);
    }

    #[test]
    fn rejects_non_finite_max_incr() {
        for max_incr in [f64::INFINITY, f64::NAN] {
            let config = Config {
                min_incr: Some(0.5),
                max_incr: Some(max_incr),
                reduction: 0.5,
                ..Config::default()
            };
            assert!(matches!(config.validate(), Err(ConfigError::MaxIncr(_))));
        }
    }

    #[test]
    fn rejects_non_finite_time_max() {
        for time_max in [f64::INFINITY, f64::NAN] {
            let config = Config {
                time_max: Some(time_max),
                ..Config::default()
            };
            assert_eq!(config.validate(), Err(ConfigError::TimeMax));
        }

        let config = Config {
            time_max: Some(10.0),
            ..Config::default()
        };
        assert!(config.validate().is_ok());
    }
}
