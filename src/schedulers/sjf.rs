use crate::queues::JobQueue;
use crate::schedulers::Scheduler;
use crate::types::{Job, JobState};
use crate::utils::logging::prelude::*;

/// Non-preemptive shortest job first, ordered by total service time
#[derive(Debug, Default)]
pub struct ShortestJobFirst;

impl Scheduler for ShortestJobFirst {
    fn enqueue(&mut self, ready: &mut JobQueue, job: Job) {
        ready.insert_by_service_time(job);
    }

    #[instrument(level = "trace", skip(self, running, ready), fields(ready.len = ready.len()))]
    fn schedule(&mut self, running: &mut Option<Job>, ready: &mut JobQueue) -> bool {
        // a running job keeps the processor until it finishes
        if running.is_some() {
            return false;
        }
        match ready.pop_front() {
            Some(mut job) => {
                job.set_state(JobState::Running);
                *running = Some(job);
                true
            }
            None => false,
        }
    }
}
