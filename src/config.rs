use std::path::PathBuf;

use parse_display::{Display, FromStr};
use serde::{Deserialize, Serialize};

use crate::memory::DEFAULT_MEMORY_SIZE;
use crate::types::Time;
use crate::utils::app_config::AppConfig;
use crate::utils::prelude::*;

/// Which job gets the processor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, FromStr, Serialize, Deserialize)]
pub enum Policy {
    /// Shortest job first, never preempts
    #[display("SJF")]
    #[serde(rename = "SJF")]
    Sjf,
    /// Round robin, preempts every quantum
    #[display("RR")]
    #[serde(rename = "RR")]
    RoundRobin,
}

/// How jobs obtain memory before becoming ready
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, FromStr, Serialize, Deserialize)]
pub enum MemoryPolicy {
    #[display("infinite")]
    #[serde(rename = "infinite")]
    Infinite,
    #[display("best-fit")]
    #[serde(rename = "best-fit")]
    BestFit,
}

/// The `sim` section
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimConfig {
    pub policy: Policy,
    pub memory: MemoryPolicy,
    /// length of one cycle, and the preemption interval under round robin
    pub quantum: Time,
    #[serde(default = "default_memory_size")]
    pub memory_size: u32,
    /// stop once the clock reaches this point even if jobs remain
    #[serde(default)]
    pub time_limit: Option<Time>,
    /// job file, may also be given on the command line
    #[serde(default)]
    pub input: Option<PathBuf>,
}

fn default_memory_size() -> u32 {
    DEFAULT_MEMORY_SIZE
}

impl SimConfig {
    pub fn new(policy: Policy, memory: MemoryPolicy, quantum: Time) -> Self {
        SimConfig {
            policy,
            memory,
            quantum,
            memory_size: DEFAULT_MEMORY_SIZE,
            time_limit: None,
            input: None,
        }
    }

    pub fn with_memory_size(mut self, memory_size: u32) -> Self {
        self.memory_size = memory_size;
        self
    }

    pub fn with_time_limit(mut self, time_limit: Time) -> Self {
        self.time_limit = Some(time_limit);
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.quantum == 0 {
            return Err(Error::InvalidParameter {
                name: "sim.quantum",
                reason: "must be a positive integer".into(),
            });
        }
        if self.memory_size == 0 {
            return Err(Error::InvalidParameter {
                name: "sim.memory_size",
                reason: "must be a positive integer".into(),
            });
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, FromStr, Serialize, Deserialize)]
#[display(style = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// `<time>,<EVENT>,key=value,...` lines followed by the summary
    Text,
    /// one JSON object per line
    Json,
}

/// The `output` section
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutputConfig {
    pub format: OutputFormat,
}

/// Resolved settings, as shown by the `config` command
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    pub sim: SimConfig,
    pub output: OutputConfig,
}

pub trait AppConfigExt {
    fn sim_config(&self) -> Result<SimConfig>;
    fn settings(&self) -> Result<Settings>;
}

impl AppConfigExt for AppConfig {
    fn sim_config(&self) -> Result<SimConfig> {
        let cfg: SimConfig = self.get("sim")?;
        cfg.validate()?;
        Ok(cfg)
    }

    fn settings(&self) -> Result<Settings> {
        Ok(Settings {
            sim: self.sim_config()?,
            output: self.get("output")?,
        })
    }
}
