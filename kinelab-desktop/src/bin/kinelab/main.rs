//! Binary for running kinelab simulations from the command line.

// Crate-specific lint settings. (General settings can be found in the workspace manifest.)
#![forbid(unsafe_code)]

use std::io::{self, Write as _};

use anyhow::Context as _;
use clap::Parser as _;

use kinelab_desktop::{logging, scenario};

mod command_options;
use command_options::LabArgs;

fn main() -> Result<(), anyhow::Error> {
    let options = LabArgs::parse();

    logging::install(&options.logging)?;
    let config = options.config.build_config()?;
    log::debug!("configuration: {config:?}");

    let stdout = io::stdout();
    let mut out = io::BufWriter::new(stdout.lock());
    scenario::run_scenario(options.scenario, &config, &options.run_options(), &mut out)
        .with_context(|| format!("{} scenario failed", <&str>::from(options.scenario)))?;
    out.flush()?;
    Ok(())
}
