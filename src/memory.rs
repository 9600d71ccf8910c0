//! Contiguous memory with best-fit placement.
//!
//! Memory is a list of segments ordered by address that always covers
//! `[0, size - 1]` exactly. A segment is either a hole or occupied by one job.
//! Placing a job into a larger hole splits it, and releasing a job merges the
//! freed segment with every neighbouring hole.

use std::fmt;

use itertools::Itertools;
use serde::Serialize;

use crate::types::JobId;
use crate::utils::logging::prelude::*;

/// Default size of the address space, in memory units
pub const DEFAULT_MEMORY_SIZE: u32 = 2048;

/// A contiguous address range, `end` inclusive
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Segment {
    pub start: u32,
    pub end: u32,
    /// `None` for a hole
    pub occupant: Option<JobId>,
}

impl Segment {
    fn hole(start: u32, end: u32) -> Self {
        Segment {
            start,
            end,
            occupant: None,
        }
    }

    pub fn size(&self) -> u32 {
        self.end - self.start + 1
    }

    pub fn is_hole(&self) -> bool {
        self.occupant.is_none()
    }
}

impl fmt::Display for Segment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.occupant {
            Some(job) => write!(f, "[{}, {}]#{}", self.start, self.end, job),
            None => write!(f, "[{}, {}]", self.start, self.end),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Memory {
    size: u32,
    segments: Vec<Segment>,
}

impl Memory {
    /// One hole spanning the whole address space
    pub fn new(size: u32) -> Self {
        assert!(size > 0, "memory must have at least one unit");
        Memory {
            size,
            segments: vec![Segment::hole(0, size - 1)],
        }
    }

    pub fn size(&self) -> u32 {
        self.size
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    pub fn holes(&self) -> impl Iterator<Item = &Segment> {
        self.segments.iter().filter(|s| s.is_hole())
    }

    /// Total size of occupied segments
    pub fn used(&self) -> u32 {
        self.segments
            .iter()
            .filter(|s| !s.is_hole())
            .map(Segment::size)
            .sum()
    }

    pub fn segment_of(&self, job: JobId) -> Option<&Segment> {
        self.segments.iter().find(|s| s.occupant == Some(job))
    }

    /// Index of the hole a job of `requirement` units would be placed in.
    ///
    /// Scans in address order keeping a running candidate. A later hole only
    /// replaces the candidate when it is strictly smaller, so among equally
    /// sized holes the lowest address wins.
    pub fn best_fit(&self, requirement: u32) -> Option<usize> {
        let mut best: Option<(usize, u32)> = None;
        for (idx, segment) in self.segments.iter().enumerate() {
            if !segment.is_hole() || segment.size() < requirement {
                continue;
            }
            match best {
                Some((_, size)) if size <= segment.size() => {}
                _ => best = Some((idx, segment.size())),
            }
        }
        best.map(|(idx, _)| idx)
    }

    /// Place `job` into the best fitting hole, returning its start address.
    ///
    /// A hole larger than needed is split, the job takes the low end and the
    /// remainder stays a hole right after it. Returns `None`, leaving memory
    /// untouched, when no hole is large enough.
    pub fn allocate(&mut self, job: JobId, requirement: u32) -> Option<u32> {
        assert!(requirement > 0, "job {} requests no memory", job);
        let idx = self.best_fit(requirement)?;

        let hole = self.segments[idx];
        if hole.size() > requirement {
            let split_at = hole.start + requirement;
            self.segments[idx].end = split_at - 1;
            self.segments.insert(idx + 1, Segment::hole(split_at, hole.end));
            trace!(%hole, split_at, "split hole");
        }

        let segment = &mut self.segments[idx];
        segment.occupant = Some(job);
        debug!(job, %segment, "allocated");
        Some(segment.start)
    }

    /// Turn the segment held by `job` back into a hole and merge neighbouring holes.
    ///
    /// Returns false if `job` holds no memory.
    pub fn release(&mut self, job: JobId) -> bool {
        match self.segments.iter_mut().find(|s| s.occupant == Some(job)) {
            Some(segment) => {
                segment.occupant = None;
                debug!(job, %segment, "released");
                self.merge_holes();
                true
            }
            None => false,
        }
    }

    /// Collapse every run of adjacent holes into its first segment
    pub fn merge_holes(&mut self) {
        let before = self.segments.len();
        self.segments = std::mem::take(&mut self.segments)
            .into_iter()
            .coalesce(|prev, next| {
                if prev.is_hole() && next.is_hole() {
                    Ok(Segment::hole(prev.start, next.end))
                } else {
                    Err((prev, next))
                }
            })
            .collect();
        if self.segments.len() != before {
            trace!(merged = before - self.segments.len(), "merged holes");
        }
    }

    /// Segments cover `[0, size - 1]` in order, without gaps or overlaps
    pub fn is_contiguous(&self) -> bool {
        let bounds = match (self.segments.first(), self.segments.last()) {
            (Some(first), Some(last)) => first.start == 0 && last.end == self.size - 1,
            _ => false,
        };
        bounds
            && self.segments.iter().all(|s| s.start <= s.end)
            && self
                .segments
                .iter()
                .tuple_windows()
                .all(|(prev, next)| prev.end + 1 == next.start)
    }
}

impl Default for Memory {
    fn default() -> Self {
        Memory::new(DEFAULT_MEMORY_SIZE)
    }
}

impl fmt::Display for Memory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.segments.iter().join(" "))
    }
}
