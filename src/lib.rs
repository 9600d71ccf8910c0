//! Single processor job scheduling with contiguous memory allocation,
//! simulated one fixed-length cycle at a time.

use std::io;

use crate::config::AppConfigExt;
use crate::utils::prelude::*;

pub mod config;
pub mod incoming;
pub mod memory;
pub mod metrics;
pub mod output;
pub mod queues;
pub mod schedulers;
pub mod simulator;
pub mod types;
pub mod utils;

pub use crate::config::{MemoryPolicy, Policy, SimConfig};
pub use crate::metrics::Summary;
pub use crate::simulator::{Event, Simulation};
pub use crate::types::{Job, JobSpec, JobState};

/// Run the configured simulation end-to-end, streaming events to `out`
pub fn run_sim(out: impl io::Write) -> Result<Summary> {
    let _g = info_span!("sim").entered();

    let settings = config().settings()?;
    let path = settings.sim.input.clone().ok_or_else(|| Error::InvalidParameter {
        name: "sim.input",
        reason: "no job file given".into(),
    })?;
    let jobs = incoming::from_path(&path)?;

    let mut sim = Simulation::new(settings.sim, jobs)?;
    let mut renderer = output::Renderer::new(out, settings.output.format);

    let summary = {
        let _g = info_span!("run").entered();
        while !sim.should_stop() {
            sim.step();
            for event in sim.drain_events() {
                renderer.event(&event)?;
            }
        }
        sim.finish()
    };

    renderer.summary(&summary)?;
    Ok(summary)
}
