use std::fmt;

use serde::Serialize;

use crate::types::{Job, Time};

/// Running totals over finished jobs
#[derive(Debug, Clone, Default)]
pub struct Metrics {
    finished: usize,
    total_turnaround: Time,
    total_overhead: f64,
    max_overhead: f64,
}

impl Metrics {
    pub fn new() -> Self {
        Default::default()
    }

    /// Account for a job that just finished, returning its overhead
    pub fn record(&mut self, job: &Job) -> f64 {
        let overhead = job.overhead();
        self.finished += 1;
        self.total_turnaround += job.turnaround();
        self.total_overhead += overhead;
        self.max_overhead = self.max_overhead.max(overhead);
        overhead
    }

    /// Final figures once the clock stopped at `clock`.
    /// The last cycle only served to observe the final completion, so it is
    /// not part of the makespan.
    pub fn summary(&self, clock: Time, quantum: Time) -> Summary {
        let n = self.finished as u64;
        let (mean_turnaround, mean_overhead) = if n == 0 {
            (0, 0.0)
        } else {
            (
                (self.total_turnaround + n - 1) / n,
                self.total_overhead / n as f64,
            )
        };
        Summary {
            mean_turnaround,
            max_overhead: self.max_overhead,
            mean_overhead,
            makespan: clock.saturating_sub(quantum),
        }
    }
}

/// End of run performance figures
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Summary {
    /// mean turnaround, rounded up
    pub mean_turnaround: Time,
    pub max_overhead: f64,
    pub mean_overhead: f64,
    pub makespan: Time,
}

impl fmt::Display for Summary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Turnaround time {}", self.mean_turnaround)?;
        writeln!(f, "Time overhead {:.2} {:.2}", self.max_overhead, self.mean_overhead)?;
        write!(f, "Makespan {}", self.makespan)
    }
}
