use schedsim::utils::{self, prelude::*};
use structopt::StructOpt;

mod cli;
mod commands;

fn main() -> Result<()> {
    // panic setup should be done early
    utils::panic::setup();

    // defaults first, everything else is layered on top
    utils::app_config::setup()?;

    let cli = cli::Cli::from_args();
    cli.apply()?;

    let _guard = utils::logging::setup()?;
    trace!("Start cli execution");

    cli.execute()
}
