//! Scenario execution for the CLI

use crate::commands::RunArgs;
use crate::config::CliConfig;
use crate::error::{CliError, CliResult};
use crate::output::{OutputFormat, ProgressReporter, SuiteReport};
use blogprobe::{
    DriverFactory, HarnessConfig, PageDriver, SuiteResults, SuiteRunner, TestSuite,
};

/// Qualified names a filter selects, in run order
#[must_use]
pub fn list_scenarios<D: PageDriver>(suite: &TestSuite<D>, filter: Option<&str>) -> Vec<String> {
    suite
        .qualified_names()
        .into_iter()
        .filter(|name| filter.map_or(true, |f| name.contains(f)))
        .collect()
}

/// Drives a [`SuiteRunner`] and reports as scenarios finish
#[derive(Debug)]
pub struct TestRunner {
    config: CliConfig,
    format: OutputFormat,
    reporter: ProgressReporter,
}

impl TestRunner {
    /// Create a new test runner
    #[must_use]
    pub fn new(config: CliConfig, format: OutputFormat) -> Self {
        // JSON goes to stdout alone; progress lines would interleave on a tty.
        let quiet = config.verbosity.is_quiet() || format == OutputFormat::Json;
        let reporter = ProgressReporter::new(config.color.should_color(), quiet);
        Self {
            config,
            format,
            reporter,
        }
    }

    /// Run every selected scenario of `suite`
    pub async fn run<D, F>(
        &mut self,
        runner: SuiteRunner<D, F>,
        suite: &TestSuite<D>,
        filter: Option<&str>,
    ) -> SuiteResults
    where
        D: PageDriver,
        F: DriverFactory<D>,
    {
        let selected = list_scenarios(suite, filter).len();
        if selected == 0 {
            self.reporter.warning("No scenarios match the filter");
        }

        self.reporter.header(&suite.name);
        self.reporter.start_progress(selected as u64, "scenarios");

        let runner = match filter {
            Some(filter) => runner.with_filter(filter),
            None => runner,
        }
        .with_fail_fast(self.config.fail_fast);

        let reporter = &self.reporter;
        let results = runner
            .run_with(suite, |result| {
                reporter.result(result);
                reporter.increment(1);
            })
            .await;
        self.reporter.finish();
        results
    }

    /// Print the outcome; failed scenarios make this an error
    pub fn finish(&self, results: &SuiteResults) -> CliResult<()> {
        match self.format {
            OutputFormat::Json => {
                println!("{}", serde_json::to_string_pretty(&SuiteReport::from(results))?);
            }
            OutputFormat::Text => {
                self.reporter.summary(
                    results.passed_count(),
                    results.failed_count(),
                    results.duration,
                );
            }
        }

        if results.all_passed() {
            Ok(())
        } else {
            Err(CliError::test_execution(format!(
                "{} of {} scenarios failed",
                results.failed_count(),
                results.total()
            )))
        }
    }

    /// Get the reporter (for testing)
    #[must_use]
    pub const fn reporter(&self) -> &ProgressReporter {
        &self.reporter
    }
}

/// Run the blog suite in Chromium
#[cfg(feature = "browser")]
pub async fn run_blog_suite(
    harness: HarnessConfig,
    args: &RunArgs,
    config: CliConfig,
) -> CliResult<()> {
    use blogprobe::scenarios::blog_app_suite;
    use blogprobe::{BackendClient, ChromiumDriver, ChromiumLauncher, ScenarioSetup};

    let mut suite = blog_app_suite::<ChromiumDriver>();
    suite.set_case_timeout(args.case_timeout);

    let backend = BackendClient::from_config(&harness);
    let setup = ScenarioSetup::new(harness.clone());
    let runner = SuiteRunner::new(ChromiumLauncher::new(harness), backend, setup);

    let mut test_runner = TestRunner::new(config, args.format.into());
    let results = test_runner
        .run(runner, &suite, args.filter.as_deref())
        .await;
    test_runner.finish(&results)
}

/// Run the blog suite in Chromium
#[cfg(not(feature = "browser"))]
pub async fn run_blog_suite(
    _harness: HarnessConfig,
    _args: &RunArgs,
    _config: CliConfig,
) -> CliResult<()> {
    Err(CliError::unsupported(
        "browser support not enabled; rebuild with --features browser",
    ))
}
