use crate::queues::JobQueue;
use crate::schedulers::Scheduler;
use crate::types::{Job, JobState};
use crate::utils::logging::prelude::*;

/// Preemptive round robin, switching jobs at every cycle boundary
#[derive(Debug, Default)]
pub struct RoundRobin;

impl Scheduler for RoundRobin {
    fn enqueue(&mut self, ready: &mut JobQueue, job: Job) {
        ready.push_back(job);
    }

    #[instrument(level = "trace", skip(self, running, ready), fields(ready.len = ready.len()))]
    fn schedule(&mut self, running: &mut Option<Job>, ready: &mut JobQueue) -> bool {
        // nobody waiting, the current job (if any) simply continues
        let mut next = match ready.pop_front() {
            Some(job) => job,
            None => return false,
        };

        // the head is taken before the preempted job joins the tail
        if let Some(mut preempted) = running.take() {
            trace!(job = %preempted.name, "preempted");
            preempted.set_state(JobState::Ready);
            ready.push_back(preempted);
        }

        next.set_state(JobState::Running);
        *running = Some(next);
        true
    }
}
