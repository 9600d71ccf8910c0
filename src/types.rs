use std::fmt;

use parse_display::Display;
use serde::{Deserialize, Serialize};

/// A time point or a duration in simulation, in abstract time units
pub type Time = u64;

/// Position of a job in the input, used as owner tag on memory segments
pub type JobId = usize;

/// Lifecycle of a job
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, Serialize, Deserialize)]
#[display(style = "UPPERCASE")]
pub enum JobState {
    /// Admitted from the job source, waiting for memory
    Arrived,
    Ready,
    Running,
    Finished,
}

impl JobState {
    /// Whether moving from `self` to `to` is a legal transition.
    /// `Running -> Ready` only happens under round robin preemption.
    pub fn can_become(self, to: JobState) -> bool {
        use JobState::*;
        matches!(
            (self, to),
            (Arrived, Ready) | (Ready, Running) | (Running, Ready) | (Running, Finished)
        )
    }
}

/// A job as described by one input record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobSpec {
    pub arrival_time: Time,
    pub name: String,
    pub service_time: Time,
    pub memory_requirement: u32,
}

/// A job tracked by the simulation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Job {
    pub id: JobId,
    pub name: String,
    pub arrival_time: Time,
    pub service_time: Time,
    pub memory_requirement: u32,

    /// processor time received so far
    pub time_ran: Time,
    /// time spent queued, in input or ready
    pub wait_time: Time,
    pub state: JobState,
}

impl Job {
    pub fn new(id: JobId, spec: JobSpec) -> Self {
        Job {
            id,
            name: spec.name,
            arrival_time: spec.arrival_time,
            service_time: spec.service_time,
            memory_requirement: spec.memory_requirement,
            time_ran: 0,
            wait_time: 0,
            state: JobState::Arrived,
        }
    }

    pub fn is_finished(&self) -> bool {
        self.time_ran >= self.service_time
    }

    pub fn remaining_time(&self) -> Time {
        self.service_time.saturating_sub(self.time_ran)
    }

    pub fn turnaround(&self) -> Time {
        self.time_ran + self.wait_time
    }

    /// Turnaround relative to service time, at least 1.0 for a finished job
    pub fn overhead(&self) -> f64 {
        self.turnaround() as f64 / self.service_time as f64
    }

    /// Wait accrued for arriving between two cycle boundaries.
    ///
    /// Cycles start on multiples of `quantum`, so a job arriving at 5 with
    /// quantum 3 is only noticed at 6 and is charged the 1 unit in between.
    pub fn arrival_misalignment(&self, quantum: Time) -> Time {
        match self.arrival_time % quantum {
            r if self.arrival_time > 0 && r != 0 => quantum - r,
            _ => 0,
        }
    }

    pub(crate) fn set_state(&mut self, to: JobState) {
        debug_assert!(
            self.state.can_become(to),
            "illegal transition of job {} from {} to {}",
            self.name,
            self.state,
            to
        );
        self.state = to;
    }
}

impl fmt::Display for Job {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Job({}, @{}, {}/{}, {}u, {})",
            self.name, self.arrival_time, self.time_ran, self.service_time, self.memory_requirement, self.state
        )
    }
}
