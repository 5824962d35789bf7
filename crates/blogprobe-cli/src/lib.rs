//! Blogprobe CLI Library
//!
//! Command-line interface for running the blog end-to-end suite.

#![warn(missing_docs)]

mod commands;
mod config;
mod error;
mod output;
mod runner;

pub use commands::{Cli, ColorArg, Commands, ConfigArgs, FormatArg, HarnessArgs, ListArgs, RunArgs};
pub use config::{
    load_harness_config, load_harness_config_from, CliConfig, ColorChoice, Verbosity,
};
pub use error::{CliError, CliResult};
pub use output::{CaseReport, OutputFormat, ProgressReporter, SuiteReport};
pub use runner::{list_scenarios, run_blog_suite, TestRunner};

use tracing_subscriber::EnvFilter;

/// Install the stderr log subscriber. `RUST_LOG` wins over `verbosity`.
pub fn init_tracing(verbosity: Verbosity, ansi: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(verbosity.log_filter()));
    // A subscriber may already be set (tests); keep it.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_ansi(ansi)
        .compact()
        .try_init();
}
