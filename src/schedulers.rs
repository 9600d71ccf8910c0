use crate::config::Policy;
use crate::queues::JobQueue;
use crate::types::Job;
use crate::utils::logging::prelude::*;

mod round_robin;
mod sjf;

pub use round_robin::RoundRobin;
pub use sjf::ShortestJobFirst;

/// Decides the order of the ready queue and which job holds the processor
pub trait Scheduler {
    /// Put a job that just became ready into the ready queue
    fn enqueue(&mut self, ready: &mut JobQueue, job: Job);

    /// Pick the job to run this cycle, possibly replacing the one in `running`.
    ///
    /// Returns true when a job was dispatched onto the processor.
    fn schedule(&mut self, running: &mut Option<Job>, ready: &mut JobQueue) -> bool;
}

pub fn from_config(policy: Policy) -> Box<dyn Scheduler> {
    info!(scheduler = %policy, "using");
    match policy {
        Policy::Sjf => Box::new(ShortestJobFirst),
        Policy::RoundRobin => Box::new(RoundRobin),
    }
}
