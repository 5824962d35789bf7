//! Blogprobe CLI: end-to-end tests for the blog application
//!
//! ## Usage
//!
//! ```bash
//! blogprobe run                          # Run every scenario in Chromium
//! blogprobe run --intercept              # Answer the blog API in-process
//! blogprobe run --filter "Login >"       # Only the login scenarios
//! blogprobe list                         # Show scenario names
//! blogprobe config --config blogprobe.yaml
//! ```

use blogprobe::scenarios::blog_app_suite;
use blogprobe::MockDriver;
use blogprobe_cli::{
    init_tracing, list_scenarios, load_harness_config, run_blog_suite, Cli, CliConfig, CliError,
    CliResult, ColorChoice, Commands, ConfigArgs, ListArgs, RunArgs, Verbosity,
};
use clap::Parser;
use std::process::ExitCode;

fn main() -> ExitCode {
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn run() -> CliResult<()> {
    let cli = Cli::parse();
    let config = build_config(&cli);
    init_tracing(config.verbosity, config.color.should_color());

    match cli.command {
        Commands::Run(args) => run_suite(config, &args),
        Commands::List(args) => {
            run_list(&args);
            Ok(())
        }
        Commands::Config(args) => run_config(&args),
    }
}

fn build_config(cli: &Cli) -> CliConfig {
    let verbosity = Verbosity::from_flags(cli.quiet, cli.verbose);
    let color: ColorChoice = cli.color.into();
    CliConfig::new().with_verbosity(verbosity).with_color(color)
}

fn run_suite(config: CliConfig, args: &RunArgs) -> CliResult<()> {
    let harness = load_harness_config(&args.harness)?;
    tracing::info!(
        app = %harness.app_url,
        api = %harness.api_url,
        intercept = harness.intercept,
        "starting run"
    );

    let rt = tokio::runtime::Runtime::new()
        .map_err(|e| CliError::test_execution(format!("Failed to create runtime: {e}")))?;
    rt.block_on(run_blog_suite(
        harness,
        args,
        config.with_fail_fast(args.fail_fast),
    ))
}

fn run_list(args: &ListArgs) {
    // Names do not depend on the driver.
    let suite = blog_app_suite::<MockDriver>();
    for name in list_scenarios(&suite, args.filter.as_deref()) {
        println!("{name}");
    }
}

fn run_config(args: &ConfigArgs) -> CliResult<()> {
    let harness = load_harness_config(&args.harness)?;
    if !args.check {
        print!("{}", harness.to_yaml()?);
    }
    Ok(())
}
