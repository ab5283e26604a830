//! Logging to stderr.

use anyhow::Context as _;
use log::Log as _;

/// A [`clap::Args`] struct for options controlling log output to stderr.
#[derive(Clone, Debug, Default, clap::Args)]
#[expect(clippy::module_name_repetitions)]
pub struct LoggingArgs {
    /// Additional logging to stderr.
    #[arg(long = "verbose", short = 'v')]
    pub verbose: bool,

    /// Remove timestamps from logs so that they are closer to deterministic.
    ///
    /// This option is intended for internal tests only.
    #[arg(long = "simplify-log-format", hide = true)]
    pub simplify_log_format: bool,

    /// Also log every integrator step and bisection iteration, which is normally
    /// suppressed even with --verbose.
    #[arg(long = "log-iterations", hide = true, requires = "verbose")]
    pub log_iterations: bool,
}

/// Install a [`log`] global logger based on user-provided `options`.
pub fn install(options: &LoggingArgs) -> Result<(), anyhow::Error> {
    use log::LevelFilter::{Error, Info, Off, Trace};

    let &LoggingArgs {
        verbose,
        simplify_log_format,
        log_iterations,
    } = options;

    let stderr_logger = *simplelog::WriteLogger::new(
        if verbose { Trace } else { Info },
        // Note: This has no target filters because `LabLogger` calls
        // `util::log::standard_filter` to do it.
        simplelog::ConfigBuilder::new()
            .set_target_level(Off)
            .set_location_level(Off)
            .set_time_level(if simplify_log_format { Off } else { Error })
            .build(),
        std::io::stderr(),
    );
    let max_level = simplelog::SharedLogger::level(&stderr_logger);

    log::set_boxed_logger(Box::new(LabLogger {
        stderr_logger,
        noisy: log_iterations,
    }))
    .context("failed to initialize logging")?;
    log::set_max_level(max_level);
    Ok(())
}

/// [`log::Log`] implementation that [`install()`] registers globally.
struct LabLogger {
    stderr_logger: simplelog::WriteLogger<std::io::Stderr>,
    noisy: bool,
}

impl log::Log for LabLogger {
    fn enabled(&self, metadata: &log::Metadata<'_>) -> bool {
        kinelab::util::log::standard_filter(metadata, self.noisy)
            && self.stderr_logger.enabled(metadata)
    }

    fn log(&self, record: &log::Record<'_>) {
        if !kinelab::util::log::standard_filter(record.metadata(), self.noisy) {
            return;
        }
        self.stderr_logger.log(record);
    }

    fn flush(&self) {
        self.stderr_logger.flush();
    }
}
