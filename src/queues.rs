use std::collections::vec_deque::{self, VecDeque};
use std::iter::FromIterator;

use crate::types::Job;

/// An ordered collection of jobs, owned by value
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct JobQueue {
    jobs: VecDeque<Job>,
}

impl JobQueue {
    pub fn new() -> Self {
        Default::default()
    }

    pub fn len(&self) -> usize {
        self.jobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }

    pub fn front(&self) -> Option<&Job> {
        self.jobs.front()
    }

    pub fn iter(&self) -> vec_deque::Iter<'_, Job> {
        self.jobs.iter()
    }

    pub fn iter_mut(&mut self) -> vec_deque::IterMut<'_, Job> {
        self.jobs.iter_mut()
    }

    pub fn push_back(&mut self, job: Job) {
        self.jobs.push_back(job);
    }

    pub fn pop_front(&mut self) -> Option<Job> {
        self.jobs.pop_front()
    }

    /// Insert keeping the queue sorted ascending by service time.
    /// A job goes after every queued job with the same service time.
    pub fn insert_by_service_time(&mut self, job: Job) {
        let idx = self
            .jobs
            .iter()
            .position(|queued| job.service_time < queued.service_time)
            .unwrap_or_else(|| self.jobs.len());
        self.jobs.insert(idx, job);
    }

    /// Pop jobs from the front for as long as `pred` holds
    pub fn pop_while<P>(&mut self, mut pred: P) -> Vec<Job>
    where
        P: FnMut(&Job) -> bool,
    {
        let n = self.jobs.iter().take_while(|j| pred(j)).count();
        self.jobs.drain(..n).collect()
    }

    /// Take every job out, leaving the queue empty
    pub fn take_all(&mut self) -> JobQueue {
        std::mem::take(self)
    }
}

impl FromIterator<Job> for JobQueue {
    fn from_iter<T: IntoIterator<Item = Job>>(iter: T) -> Self {
        JobQueue {
            jobs: iter.into_iter().collect(),
        }
    }
}

impl Extend<Job> for JobQueue {
    fn extend<T: IntoIterator<Item = Job>>(&mut self, iter: T) {
        self.jobs.extend(iter)
    }
}

impl IntoIterator for JobQueue {
    type Item = Job;
    type IntoIter = vec_deque::IntoIter<Job>;

    fn into_iter(self) -> Self::IntoIter {
        self.jobs.into_iter()
    }
}

impl<'a> IntoIterator for &'a JobQueue {
    type Item = &'a Job;
    type IntoIter = vec_deque::Iter<'a, Job>;

    fn into_iter(self) -> Self::IntoIter {
        self.jobs.iter()
    }
}
