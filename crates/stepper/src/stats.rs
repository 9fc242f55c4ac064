use std::{
    io::{self, Write},
    time::Duration,
};

use crate::Statistics;

const HEADER: &str = "   nRun  nComm  nCanc  nCont  nCaCo  nIter  CPU";
const WIDTH: usize = 11;

/// Appends one statistics record per commit to a tabular text sink.
///
/// Each record holds the run, commit, cancel, continue,
/// canceled-after-continue and iteration totals followed by the process CPU
/// seconds, all in fixed-width scientific notation:
///
/// ```text
///    nRun  nComm  nCanc  nCont  nCaCo  nIter  CPU
///  1.0000e+00  1.0000e+00  0.0000e+00  0.0000e+00  0.0000e+00  4.0000e+00   1.2500e-01
/// ```
#[derive(Debug)]
pub struct StatsWriter<W: Write> {
    out: W,
}

impl<W: Write> StatsWriter<W> {
    /// Wraps a sink and writes the column header.
    ///
    /// # Errors
    ///
    /// Returns an error if the header cannot be written.
    pub fn new(mut out: W) -> io::Result<Self> {
        writeln!(out, "{HEADER}")?;
        out.flush()?;
        Ok(Self { out })
    }

    /// Writes a record and flushes the sink.
    ///
    /// # Errors
    ///
    /// Returns an error if writing or flushing fails.
    #[allow(clippy::cast_precision_loss)]
    pub fn record(&mut self, stats: &Statistics, elapsed: Duration) -> io::Result<()> {
        let counts = [
            stats.runs,
            stats.commits,
            stats.cancels,
            stats.continues,
            stats.cancels_after_continue,
            stats.iterations,
        ];

        let mut line = String::new();
        for count in counts {
            line.push_str(&format!(" {:>WIDTH$}", scientific(count as f64)));
        }
        line.push_str(&format!(
            "  {:>WIDTH$}",
            scientific(elapsed.as_secs_f64())
        ));

        writeln!(self.out, "{line}")?;
        self.out.flush()
    }

    /// Consumes the writer and returns the sink.
    pub fn into_inner(self) -> W {
        self.out
    }
}

/// Formats `value` with four fraction digits and a signed two-digit exponent.
fn scientific(value: f64) -> String {
    let formatted = format!("{value:.4e}");
    match formatted.split_once('e') {
        Some((mantissa, exponent)) => match exponent.parse::<i32>() {
            Ok(exp) => {
                let sign = if exp < 0 { '-' } else { '+' };
                format!("{mantissa}e{sign}{:02}", exp.unsigned_abs())
            }
            Err(_) => formatted,
        },
        None => formatted,
    }
}
