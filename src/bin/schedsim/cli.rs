use std::path::PathBuf;

use structopt::StructOpt;

use crate::commands::{self, Cmd};
use schedsim::utils::prelude::*;

/// Simulate job scheduling and memory allocation on a single processor
#[derive(StructOpt)]
#[structopt(name = "schedsim")]
pub struct Cli {
    /// Set a custom config file
    #[structopt(short, long, value_name = "FILE", parse(from_os_str))]
    config: Option<PathBuf>,

    /// Apply a named preset from the config
    #[structopt(short, long)]
    preset: Option<String>,

    #[structopt(subcommand)]
    cmd: Command,
}

#[derive(StructOpt)]
enum Command {
    Run(commands::Run),
    Config(commands::Config),
}

impl Cli {
    /// Layer the config file, the preset, the environment and the subcommand flags, in that order
    pub fn apply(&self) -> Result<()> {
        let mut cfg = config_mut();
        if let Some(path) = &self.config {
            cfg.use_file(path)?;
        }
        if let Some(name) = &self.preset {
            cfg.use_preset(name)?;
        }
        cfg.use_env()?;
        if let Command::Run(run) = &self.cmd {
            run.apply(&mut cfg)?;
        }
        Ok(())
    }

    pub fn execute(self) -> Result<()> {
        match self.cmd {
            Command::Run(cmd) => cmd.run(),
            Command::Config(cmd) => cmd.run(),
        }
    }
}
