//! Reading job descriptions.
//!
//! One job per line: `<arrival_time> <name> <service_time> <memory_requirement>`,
//! separated by whitespace, in non-decreasing order of arrival time. Tokens
//! are taken as is, quotes have no special meaning.

use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::Path;

use csv::StringRecord;

use crate::types::JobSpec;
use crate::utils::prelude::*;

const FIELDS: usize = 4;

pub fn from_path(path: &Path) -> Result<Vec<JobSpec>> {
    let _g = debug_span!("read_jobs", path = %path.display()).entered();
    from_reader(File::open(path)?)
}

pub fn from_reader(reader: impl io::Read) -> Result<Vec<JobSpec>> {
    let mut jobs: Vec<JobSpec> = vec![];
    for (idx, line) in BufReader::new(reader).lines().enumerate() {
        let line_no = idx as u64 + 1;
        let record: StringRecord = line?.split_ascii_whitespace().collect();
        if record.is_empty() {
            continue;
        }

        let job = parse_record(&record).map_err(|reason| Error::invalid_input(line_no, reason))?;
        if let Some(prev) = jobs.last() {
            if job.arrival_time < prev.arrival_time {
                return Err(Error::invalid_input(
                    line_no,
                    format!(
                        "arrival time {} of `{}` is before {} of `{}`",
                        job.arrival_time, job.name, prev.arrival_time, prev.name
                    ),
                ));
            }
        }
        trace!(line = line_no, ?job, "parsed");
        jobs.push(job);
    }

    debug!(jobs.len = jobs.len(), "read jobs");
    Ok(jobs)
}

fn parse_record(record: &StringRecord) -> std::result::Result<JobSpec, String> {
    if record.len() != FIELDS {
        return Err(format!("expected {} fields, found {}", FIELDS, record.len()));
    }

    let job: JobSpec = record.deserialize(None).map_err(|e| e.to_string())?;
    if job.service_time == 0 {
        return Err(format!("`{}` has no service time", job.name));
    }
    if job.memory_requirement == 0 {
        return Err(format!("`{}` requires no memory", job.name));
    }
    Ok(job)
}
