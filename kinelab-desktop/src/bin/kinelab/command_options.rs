//! Command line option parsing.

use clap::Parser;

use kinelab::sim::Frame;
use kinelab_desktop::config_files::ConfigArgs;
use kinelab_desktop::logging::LoggingArgs;
use kinelab_desktop::scenario::{RunOptions, Scenario};

#[derive(Clone, Debug, Parser)]
#[command(
    name = "kinelab", author, about, version,
    help_template = "\
{name} {version}
{about-with-newline}
{usage-heading}
    {usage}

{all-args}{after-help}",
)]
pub(crate) struct LabArgs {
    /// Which simulation to run.
    #[arg(value_enum)]
    pub(crate) scenario: Scenario,

    /// Number of steps to simulate.
    #[arg(long = "frames", value_name = "N", default_value = "300")]
    pub(crate) frames: Frame,

    /// Print only every Nth step, plus any step where something notable happened.
    #[arg(long = "every", value_name = "N", default_value = "1", value_parser = clap::value_parser!(u64).range(1..))]
    pub(crate) every: Frame,

    #[command(flatten)]
    pub(crate) logging: LoggingArgs,

    #[command(flatten)]
    pub(crate) config: ConfigArgs,
}

impl LabArgs {
    pub(crate) fn run_options(&self) -> RunOptions {
        RunOptions::new(self.frames, self.every)
    }
}
