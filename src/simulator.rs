use parse_display::Display;
use serde::Serialize;

use crate::config::{MemoryPolicy, SimConfig};
use crate::memory::Memory;
use crate::metrics::{Metrics, Summary};
use crate::queues::JobQueue;
use crate::schedulers::{self, Scheduler};
use crate::types::{Job, JobSpec, JobState, Time};
use crate::utils::prelude::*;

/// State transitions reported by the simulation, in the order they happen
#[derive(Debug, Clone, PartialEq, Eq, Display, Serialize)]
#[serde(tag = "event", rename_all = "UPPERCASE")]
pub enum Event {
    /// Job obtained memory and joined the ready queue
    #[display("{time},READY,process_name={name},assigned_at={assigned_at}")]
    Ready { time: Time, name: String, assigned_at: u32 },
    /// Job was put on the processor
    #[display("{time},RUNNING,process_name={name},remaining_time={remaining_time}")]
    Running {
        time: Time,
        name: String,
        remaining_time: Time,
    },
    /// Job completed, `proc_remaining` jobs are still waiting in ready or input
    #[display("{time},FINISHED,process_name={name},proc_remaining={proc_remaining}")]
    Finished {
        time: Time,
        name: String,
        proc_remaining: usize,
    },
}

impl Event {
    pub fn time(&self) -> Time {
        match self {
            Event::Ready { time, .. } | Event::Running { time, .. } | Event::Finished { time, .. } => *time,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Event::Ready { name, .. } | Event::Running { name, .. } | Event::Finished { name, .. } => name,
        }
    }
}

/// The whole simulated system: job queues, processor, memory and clock.
///
/// Jobs move by value between `pending -> input -> ready <-> running -> finished`.
/// Memory segments only record the id of the job occupying them.
pub struct Simulation {
    quantum: Time,
    time_limit: Option<Time>,
    scheduler: Box<dyn Scheduler>,
    /// `None` when memory is unlimited
    memory: Option<Memory>,

    clock: Time,
    cycles: u64,
    total_jobs: usize,

    /// not arrived yet, sorted by arrival time
    pending: JobQueue,
    /// arrived, waiting for memory
    input: JobQueue,
    ready: JobQueue,
    running: Option<Job>,
    finished: Vec<Job>,

    metrics: Metrics,
    events: Vec<Event>,
}

impl Simulation {
    pub fn new<I>(cfg: SimConfig, jobs: I) -> Result<Self>
    where
        I: IntoIterator<Item = JobSpec>,
    {
        cfg.validate()?;

        let mut jobs: Vec<_> = jobs.into_iter().collect();
        for spec in &jobs {
            if spec.service_time == 0 {
                return Err(Error::InvalidParameter {
                    name: "service_time",
                    reason: format!("`{}` has no service time", spec.name),
                });
            }
            if spec.memory_requirement == 0 {
                return Err(Error::InvalidParameter {
                    name: "memory_requirement",
                    reason: format!("`{}` requires no memory", spec.name),
                });
            }
        }
        // admission only ever looks at the front of `pending`
        jobs.sort_by_key(|j| j.arrival_time);
        let pending: JobQueue = jobs
            .into_iter()
            .enumerate()
            .map(|(id, spec)| Job::new(id, spec))
            .collect();

        let memory = match cfg.memory {
            MemoryPolicy::Infinite => None,
            MemoryPolicy::BestFit => Some(Memory::new(cfg.memory_size)),
        };

        info!(
            policy = %cfg.policy,
            memory = %cfg.memory,
            quantum = cfg.quantum,
            jobs = pending.len(),
            "new simulation"
        );

        Ok(Simulation {
            quantum: cfg.quantum,
            time_limit: cfg.time_limit,
            scheduler: schedulers::from_config(cfg.policy),
            memory,
            clock: 0,
            cycles: 0,
            total_jobs: pending.len(),
            pending,
            input: JobQueue::new(),
            ready: JobQueue::new(),
            running: None,
            finished: vec![],
            metrics: Metrics::new(),
            events: vec![],
        })
    }

    /// Run cycles until every job finished, or the time limit is reached
    pub fn run(&mut self) -> Summary {
        while !self.should_stop() {
            self.step();
        }
        self.finish()
    }

    /// Summary of the run so far, logging whether anything was left behind
    pub fn finish(&self) -> Summary {
        let summary = self.summary();
        if self.is_drained() {
            info!(time = self.clock, cycles = self.cycles, %summary, "all jobs finished");
        } else {
            warn!(
                time = self.clock,
                unfinished = self.total_jobs - self.finished.len(),
                "stopped at time limit"
            );
        }
        summary
    }

    /// At least one cycle ran, and either nothing is left to do or the time limit passed
    pub fn should_stop(&self) -> bool {
        let limit_reached = self.time_limit.map_or(false, |limit| self.clock >= limit);
        self.cycles > 0 && (self.is_drained() || limit_reached)
    }

    pub fn is_drained(&self) -> bool {
        self.pending.is_empty() && self.input.is_empty() && self.ready.is_empty() && self.running.is_none()
    }

    /// Advance the simulation by one quantum
    pub fn step(&mut self) {
        let now = self.clock;
        let _g = debug_span!("cycle", time = now).entered();

        self.complete(now);
        self.admit(now);
        self.promote(now);
        self.dispatch(now);
        self.accrue();

        self.clock += self.quantum;
        self.cycles += 1;

        if cfg!(debug_assertions) {
            self.check_invariants();
        }
    }

    /// Retire the running job if it got all its service time, and free its memory
    fn complete(&mut self, now: Time) {
        let mut job = match self.running.take() {
            Some(job) if job.is_finished() => job,
            other => {
                self.running = other;
                return;
            }
        };

        job.set_state(JobState::Finished);
        let overhead = self.metrics.record(&job);
        self.events.push(Event::Finished {
            time: now,
            name: job.name.clone(),
            proc_remaining: self.ready.len() + self.input.len(),
        });
        if let Some(memory) = self.memory.as_mut() {
            memory.release(job.id);
        }
        info!(job = %job.name, turnaround = job.turnaround(), overhead, "finished");
        self.finished.push(job);
    }

    /// Move every job that has arrived by `now` into the input queue
    fn admit(&mut self, now: Time) {
        let arrived = self.pending.pop_while(|j| j.arrival_time <= now);
        if !arrived.is_empty() {
            debug!(count = arrived.len(), "arrived");
        }
        self.input.extend(arrived);
    }

    /// Move jobs from input to ready, allocating memory where it is limited
    fn promote(&mut self, now: Time) {
        let Simulation {
            quantum,
            scheduler,
            memory,
            input,
            ready,
            events,
            ..
        } = self;

        let waiting = input.take_all();
        match memory {
            None => {
                for job in waiting {
                    make_ready(&mut **scheduler, ready, job, *quantum);
                }
            }
            Some(memory) => {
                // jobs that do not fit stay in input, in their original order
                for job in waiting {
                    match memory.allocate(job.id, job.memory_requirement) {
                        Some(assigned_at) => {
                            events.push(Event::Ready {
                                time: now,
                                name: job.name.clone(),
                                assigned_at,
                            });
                            make_ready(&mut **scheduler, ready, job, *quantum);
                        }
                        None => {
                            trace!(job = %job.name, requirement = job.memory_requirement, "no hole fits");
                            input.push_back(job);
                        }
                    }
                }
            }
        }
    }

    fn dispatch(&mut self, now: Time) {
        if !self.scheduler.schedule(&mut self.running, &mut self.ready) {
            return;
        }
        if let Some(job) = &self.running {
            debug!(job = %job.name, remaining = job.remaining_time(), "dispatched");
            self.events.push(Event::Running {
                time: now,
                name: job.name.clone(),
                remaining_time: job.remaining_time(),
            });
        }
    }

    /// Charge this cycle to the running job and to everyone still queued
    fn accrue(&mut self) {
        let quantum = self.quantum;
        if let Some(job) = self.running.as_mut() {
            job.time_ran += quantum;
        }
        for job in self.ready.iter_mut().chain(self.input.iter_mut()) {
            job.wait_time += quantum;
        }
    }

    /// Panics if a job got lost, duplicated, or disagrees with memory
    pub fn check_invariants(&self) {
        let mut ids: Vec<_> = self
            .pending
            .iter()
            .chain(self.input.iter())
            .chain(self.ready.iter())
            .chain(self.running.iter())
            .chain(self.finished.iter())
            .map(|j| j.id)
            .collect();
        ids.sort_unstable();
        assert!(
            ids.iter().copied().eq(0..self.total_jobs),
            "jobs lost or duplicated: {:?}",
            ids
        );

        let states = [
            (self.pending.iter().collect::<Vec<_>>(), JobState::Arrived),
            (self.input.iter().collect(), JobState::Arrived),
            (self.ready.iter().collect(), JobState::Ready),
            (self.running.iter().collect(), JobState::Running),
            (self.finished.iter().collect(), JobState::Finished),
        ];
        for (jobs, state) in states.iter() {
            for job in jobs {
                assert_eq!(job.state, *state, "{} is in the wrong place", job);
            }
        }

        if let Some(memory) = &self.memory {
            assert!(memory.is_contiguous(), "memory has gaps or overlaps: {}", memory);
            assert!(memory.used() <= memory.size());
            for job in self.ready.iter().chain(self.running.iter()) {
                let segment = memory.segment_of(job.id);
                assert_eq!(
                    segment.map(|s| s.size()),
                    Some(job.memory_requirement),
                    "{} does not hold its memory",
                    job
                );
            }
            for job in self.pending.iter().chain(self.input.iter()).chain(self.finished.iter()) {
                assert!(memory.segment_of(job.id).is_none(), "{} holds memory", job);
            }
        }
    }

    pub fn summary(&self) -> Summary {
        self.metrics.summary(self.clock, self.quantum)
    }

    pub fn clock(&self) -> Time {
        self.clock
    }

    pub fn cycles(&self) -> u64 {
        self.cycles
    }

    pub fn pending(&self) -> &JobQueue {
        &self.pending
    }

    pub fn input(&self) -> &JobQueue {
        &self.input
    }

    pub fn ready(&self) -> &JobQueue {
        &self.ready
    }

    pub fn running(&self) -> Option<&Job> {
        self.running.as_ref()
    }

    pub fn finished(&self) -> &[Job] {
        &self.finished
    }

    pub fn memory(&self) -> Option<&Memory> {
        self.memory.as_ref()
    }

    /// Every event not yet drained
    pub fn events(&self) -> &[Event] {
        &self.events
    }

    pub fn drain_events(&mut self) -> std::vec::Drain<'_, Event> {
        self.events.drain(..)
    }
}

/// Queue a job that just left input, charging the part of the cycle it
/// arrived in before the boundary where it was noticed
fn make_ready(scheduler: &mut dyn Scheduler, ready: &mut JobQueue, mut job: Job, quantum: Time) {
    job.wait_time += job.arrival_misalignment(quantum);
    job.set_state(JobState::Ready);
    scheduler.enqueue(ready, job);
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use approx::assert_abs_diff_eq;

    use super::*;
    use crate::config::Policy;

    fn jobs(records: &[(Time, &str, Time, u32)]) -> Vec<JobSpec> {
        records
            .iter()
            .map(|&(arrival_time, name, service_time, memory_requirement)| JobSpec {
                arrival_time,
                name: name.into(),
                service_time,
                memory_requirement,
            })
            .collect()
    }

    fn sim(policy: Policy, memory: MemoryPolicy, quantum: Time, records: &[(Time, &str, Time, u32)]) -> Simulation {
        Simulation::new(SimConfig::new(policy, memory, quantum), jobs(records)).unwrap()
    }

    fn lines(sim: &Simulation) -> Vec<String> {
        sim.events().iter().map(ToString::to_string).collect()
    }

    const FOUR: &[(Time, &str, Time, u32)] = &[(0, "P1", 4, 200), (1, "P2", 2, 300), (2, "P3", 6, 100), (3, "P4", 3, 500)];

    #[test]
    fn single_job() {
        let mut sim = sim(Policy::Sjf, MemoryPolicy::Infinite, 1, &[(0, "A", 10, 100)]);
        let summary = sim.run();

        assert_eq!(
            lines(&sim),
            vec!["0,RUNNING,process_name=A,remaining_time=10", "10,FINISHED,process_name=A,proc_remaining=0"]
        );
        assert_eq!(summary.mean_turnaround, 10);
        assert_abs_diff_eq!(summary.max_overhead, 1.0);
        assert_abs_diff_eq!(summary.mean_overhead, 1.0);
        assert_eq!(summary.makespan, 10);
    }

    #[test]
    fn no_jobs() {
        let mut sim = sim(Policy::RoundRobin, MemoryPolicy::BestFit, 3, &[]);
        let summary = sim.run();
        assert_eq!(sim.cycles(), 1);
        assert!(sim.events().is_empty());
        assert_eq!(summary.makespan, 0);
        assert_eq!(summary.mean_turnaround, 0);
    }

    #[test]
    fn sjf_orders_by_service_time() {
        let mut sim = sim(Policy::Sjf, MemoryPolicy::Infinite, 1, FOUR);
        let summary = sim.run();

        assert_eq!(
            lines(&sim),
            vec![
                "0,RUNNING,process_name=P1,remaining_time=4",
                "4,FINISHED,process_name=P1,proc_remaining=3",
                "4,RUNNING,process_name=P2,remaining_time=2",
                "6,FINISHED,process_name=P2,proc_remaining=2",
                "6,RUNNING,process_name=P4,remaining_time=3",
                "9,FINISHED,process_name=P4,proc_remaining=1",
                "9,RUNNING,process_name=P3,remaining_time=6",
                "15,FINISHED,process_name=P3,proc_remaining=0",
            ]
        );
        assert_eq!(summary.mean_turnaround, 7);
        assert_abs_diff_eq!(summary.max_overhead, 2.5);
        assert_abs_diff_eq!(summary.mean_overhead, 23.0 / 12.0, epsilon = 1e-9);
        assert_eq!(summary.makespan, 15);
    }

    #[test]
    fn round_robin_best_fit() {
        let mut sim = sim(Policy::RoundRobin, MemoryPolicy::BestFit, 2, FOUR);
        let summary = sim.run();

        assert_eq!(
            lines(&sim),
            vec![
                "0,READY,process_name=P1,assigned_at=0",
                "0,RUNNING,process_name=P1,remaining_time=4",
                "2,READY,process_name=P2,assigned_at=200",
                "2,READY,process_name=P3,assigned_at=500",
                "2,RUNNING,process_name=P2,remaining_time=2",
                "4,FINISHED,process_name=P2,proc_remaining=2",
                "4,READY,process_name=P4,assigned_at=600",
                "4,RUNNING,process_name=P3,remaining_time=6",
                "6,RUNNING,process_name=P1,remaining_time=2",
                "8,FINISHED,process_name=P1,proc_remaining=2",
                "8,RUNNING,process_name=P4,remaining_time=3",
                "10,RUNNING,process_name=P3,remaining_time=4",
                "12,RUNNING,process_name=P4,remaining_time=1",
                "14,FINISHED,process_name=P4,proc_remaining=1",
                "14,RUNNING,process_name=P3,remaining_time=2",
                "16,FINISHED,process_name=P3,proc_remaining=0",
            ]
        );
        assert_eq!(summary.mean_turnaround, 9);
        assert_abs_diff_eq!(summary.max_overhead, 11.0 / 3.0, epsilon = 1e-9);
        assert_abs_diff_eq!(summary.mean_overhead, 2.375, epsilon = 1e-9);
        assert_eq!(summary.makespan, 16);

        let memory = sim.memory().unwrap();
        assert_eq!(memory.segments().len(), 1);
        assert_eq!(memory.holes().next().map(|h| h.size()), Some(2048));
    }

    #[test]
    fn memory_freed_in_a_cycle_is_reused_in_that_cycle() {
        let mut sim = sim(
            Policy::RoundRobin,
            MemoryPolicy::BestFit,
            3,
            &[(0, "P1", 5, 1000), (1, "P2", 3, 1500), (3, "P3", 2, 600), (5, "P4", 4, 900)],
        );
        let summary = sim.run();

        let events = lines(&sim);
        assert!(events.contains(&"6,FINISHED,process_name=P3,proc_remaining=2".to_string()));
        assert!(events.contains(&"6,READY,process_name=P4,assigned_at=1000".to_string()));
        // P2 needs both P1 and P4 gone
        assert!(events.contains(&"15,READY,process_name=P2,assigned_at=0".to_string()));
        assert_eq!(summary.mean_turnaround, 10);
        assert_eq!(summary.makespan, 18);

        let waited: HashMap<_, _> = sim.finished().iter().map(|j| (j.name.as_str(), j.wait_time)).collect();
        // arrived at 5, noticed at 6
        assert_eq!(waited["P4"], 4);
        assert_eq!(waited["P2"], 14);
    }

    #[test]
    fn only_one_large_job_fits_at_a_time() {
        let mut sim = sim(
            Policy::Sjf,
            MemoryPolicy::BestFit,
            1,
            &[(0, "A", 3, 1200), (0, "B", 3, 1200)],
        );
        sim.step();

        let ready_at_zero: Vec<_> = sim
            .events()
            .iter()
            .filter(|e| matches!(e, Event::Ready { .. }))
            .map(Event::name)
            .collect();
        assert_eq!(ready_at_zero, vec!["A"]);
        assert_eq!(sim.input().len(), 1);

        let summary = sim.run();
        assert_eq!(
            lines(&sim)[2..],
            [
                "3,FINISHED,process_name=A,proc_remaining=1",
                "3,READY,process_name=B,assigned_at=0",
                "3,RUNNING,process_name=B,remaining_time=3",
                "6,FINISHED,process_name=B,proc_remaining=0",
            ]
        );
        assert_eq!(summary.mean_turnaround, 5);
    }

    #[test]
    fn oversized_job_waits_until_time_limit() {
        let cfg = SimConfig::new(Policy::Sjf, MemoryPolicy::BestFit, 1).with_time_limit(50);
        let mut sim = Simulation::new(cfg, jobs(&[(0, "A", 2, 10), (1, "HUGE", 1, 4096)])).unwrap();
        let summary = sim.run();

        assert_eq!(sim.clock(), 50);
        assert!(!sim.is_drained());
        assert_eq!(sim.finished().len(), 1);
        assert_eq!(sim.input().front().map(|j| j.name.as_str()), Some("HUGE"));
        assert_eq!(sim.input().front().map(|j| j.wait_time), Some(49));
        assert!(sim.events().iter().all(|e| e.name() == "A"));
        assert_eq!(summary.mean_turnaround, 2);
    }

    #[test]
    fn every_finished_job_accounts_for_its_time() {
        for &policy in &[Policy::Sjf, Policy::RoundRobin] {
            for &memory in &[MemoryPolicy::Infinite, MemoryPolicy::BestFit] {
                for &quantum in &[1, 2, 3, 5] {
                    let mut sim = sim(policy, memory, quantum, FOUR);
                    sim.run();
                    assert_eq!(sim.finished().len(), FOUR.len());
                    for job in sim.finished() {
                        assert!(job.time_ran >= job.service_time);
                        assert_eq!(job.turnaround(), job.time_ran + job.wait_time);
                        assert!(job.overhead() >= 1.0, "{} under {} {} q={}", job, policy, memory, quantum);
                    }
                }
            }
        }
    }

    #[test]
    fn sjf_never_preempts() {
        let mut sim = sim(Policy::Sjf, MemoryPolicy::BestFit, 1, FOUR);
        let mut previous: Option<usize> = None;
        while !sim.should_stop() {
            sim.step();
            let current = sim.running().map(|j| j.id);
            if let (Some(prev), true) = (previous, previous != current) {
                assert!(sim.finished().iter().any(|j| j.id == prev), "job {} was demoted", prev);
            }
            previous = current;
        }
    }

    #[test]
    fn round_robin_serves_everyone_within_a_round() {
        let quantum = 2;
        let records = &[(0, "A", 9, 1), (0, "B", 9, 1), (0, "C", 9, 1)];
        let mut sim = sim(Policy::RoundRobin, MemoryPolicy::Infinite, quantum, records);
        sim.run();

        let mut last_slot: HashMap<String, Time> = HashMap::new();
        for event in sim.events() {
            if let Event::Running { time, name, .. } = event {
                if let Some(prev) = last_slot.insert(name.clone(), *time) {
                    assert!(time - prev <= records.len() as Time * quantum);
                }
            }
        }
        assert_eq!(last_slot.len(), 3);
    }

    #[test]
    fn quantum_applies_to_sjf() {
        let mut sim = sim(Policy::Sjf, MemoryPolicy::Infinite, 3, &[(0, "A", 4, 1), (1, "B", 1, 1)]);
        let summary = sim.run();
        assert_eq!(
            lines(&sim),
            vec![
                "0,RUNNING,process_name=A,remaining_time=4",
                "6,FINISHED,process_name=A,proc_remaining=1",
                "6,RUNNING,process_name=B,remaining_time=1",
                "9,FINISHED,process_name=B,proc_remaining=0",
            ]
        );
        assert_eq!(summary.makespan, 9);
    }

    #[test]
    fn unsorted_jobs_are_ordered_by_arrival() {
        let mut sim = sim(Policy::Sjf, MemoryPolicy::Infinite, 1, &[(5, "late", 1, 1), (0, "early", 1, 1)]);
        assert_eq!(sim.pending().front().map(|j| j.name.as_str()), Some("early"));
        sim.run();
        assert_eq!(sim.finished().len(), 2);
    }

    #[test]
    fn rejects_bad_config() {
        let cfg = SimConfig::new(Policy::Sjf, MemoryPolicy::Infinite, 0);
        assert!(Simulation::new(cfg, vec![]).is_err());
    }

    #[test]
    fn rejects_degenerate_jobs() {
        let cfg = SimConfig::new(Policy::Sjf, MemoryPolicy::BestFit, 1);
        let no_memory = Simulation::new(cfg.clone(), jobs(&[(0, "A", 1, 1), (0, "Z", 1, 0)]));
        assert!(matches!(
            no_memory,
            Err(Error::InvalidParameter {
                name: "memory_requirement",
                ..
            })
        ));

        let no_service = Simulation::new(cfg, jobs(&[(0, "Z", 0, 10)]));
        assert!(matches!(
            no_service,
            Err(Error::InvalidParameter { name: "service_time", .. })
        ));
    }

    #[test]
    fn invariants_hold_after_every_cycle() {
        let mut sim = sim(
            Policy::RoundRobin,
            MemoryPolicy::BestFit,
            3,
            &[(0, "P1", 5, 1000), (1, "P2", 3, 1500), (3, "P3", 2, 600), (5, "P4", 4, 900)],
        );
        sim.check_invariants();
        while !sim.should_stop() {
            sim.step();
            sim.check_invariants();
        }
        assert_eq!(sim.finished().len(), 4);
        assert_eq!(sim.memory().map(Memory::used), Some(0));
    }

    #[test]
    fn drained_events_are_gone() {
        let mut sim = sim(Policy::Sjf, MemoryPolicy::Infinite, 1, &[(0, "A", 1, 1)]);
        sim.step();
        assert_eq!(sim.drain_events().count(), 1);
        assert!(sim.events().is_empty());
    }

    #[test]
    fn json_events() {
        let event = Event::Ready {
            time: 3,
            name: "P1".into(),
            assigned_at: 100,
        };
        assert_eq!(
            serde_json::to_string(&event).unwrap(),
            r#"{"event":"READY","time":3,"name":"P1","assigned_at":100}"#
        );
    }
}
