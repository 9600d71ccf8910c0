use std::convert::TryFrom;
use std::io;
use std::path::PathBuf;

use structopt::StructOpt;

use schedsim::config::{AppConfigExt, OutputFormat};
use schedsim::utils::app_config::AppConfig;
use schedsim::utils::prelude::*;
use schedsim::{MemoryPolicy, Policy};

/// Should be implemented by individual subcommand
pub trait Cmd {
    fn run(self) -> Result<()>;
}

/// Show the resolved configuration
#[derive(StructOpt)]
pub struct Config {}

impl Cmd for Config {
    fn run(self) -> Result<()> {
        let settings = config().settings()?;
        print!("{}", serde_yaml::to_string(&settings)?);
        Ok(())
    }
}

/// Run the simulation end-to-end
#[derive(StructOpt)]
pub struct Run {
    /// Job file, one `<arrival> <name> <service time> <memory>` per line
    #[structopt(short, long, value_name = "FILE", parse(from_os_str))]
    file: Option<PathBuf>,

    /// Scheduling policy, SJF or RR
    #[structopt(short, long, value_name = "POLICY")]
    scheduler: Option<Policy>,

    /// Memory policy, infinite or best-fit
    #[structopt(short, long)]
    memory: Option<MemoryPolicy>,

    /// Length of one cycle
    #[structopt(short, long)]
    quantum: Option<u64>,

    /// Total memory units for best-fit allocation
    #[structopt(long)]
    memory_size: Option<u32>,

    /// Stop once the clock reaches this point
    #[structopt(long)]
    time_limit: Option<u64>,

    /// Output format, text or json
    #[structopt(long)]
    format: Option<OutputFormat>,
}

impl Run {
    /// Push the given flags into the config as overrides
    pub fn apply(&self, cfg: &mut AppConfig) -> Result<()> {
        if let Some(file) = &self.file {
            cfg.set("sim.input", file.to_string_lossy().into_owned())?;
        }
        if let Some(policy) = self.scheduler {
            cfg.set("sim.policy", policy.to_string())?;
        }
        if let Some(memory) = self.memory {
            cfg.set("sim.memory", memory.to_string())?;
        }
        if let Some(quantum) = self.quantum {
            cfg.set("sim.quantum", to_int("quantum", quantum)?)?;
        }
        if let Some(size) = self.memory_size {
            cfg.set("sim.memory_size", i64::from(size))?;
        }
        if let Some(limit) = self.time_limit {
            cfg.set("sim.time_limit", to_int("time-limit", limit)?)?;
        }
        if let Some(format) = self.format {
            cfg.set("output.format", format.to_string())?;
        }
        Ok(())
    }
}

fn to_int(name: &'static str, v: u64) -> Result<i64> {
    i64::try_from(v).map_err(|e| Error::InvalidParameter {
        name,
        reason: e.to_string(),
    })
}

impl Cmd for Run {
    fn run(self) -> Result<()> {
        let stdout = io::stdout();
        let summary = schedsim::run_sim(stdout.lock())?;
        info!(?summary, "simulation done");
        Ok(())
    }
}
