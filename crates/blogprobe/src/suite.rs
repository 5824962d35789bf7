//! Nested test suites and the runner that executes them.
//!
//! A suite holds cases and child suites; a case is a scenario body plus its
//! timeout and fixtures. The runner gives every case a fresh page from a
//! [`DriverFactory`], runs [`ScenarioSetup`] first, and records one
//! [`TestResult`] per case. A failing case never stops the next one unless
//! fail-fast is enabled.

use crate::backend::BackendClient;
use crate::model::NewBlog;
use crate::page::PageDriver;
use crate::result::{ProbeError, ProbeResult};
use crate::setup::{ScenarioContext, ScenarioSetup};
use async_trait::async_trait;
use futures::future::BoxFuture;
use std::marker::PhantomData;
use std::time::{Duration, Instant};

/// Separator between suite and case names
pub const NAME_SEPARATOR: &str = " > ";

/// Default case timeout
pub const DEFAULT_CASE_TIMEOUT_MS: u64 = 30_000;

/// Scenario body
pub type ScenarioFn<D> = for<'a> fn(&'a mut ScenarioContext<D>) -> BoxFuture<'a, ProbeResult<()>>;

/// A single test case
pub struct TestCase<D: PageDriver> {
    /// Test name
    pub name: String,
    /// Test timeout in milliseconds
    pub timeout_ms: u64,
    /// Blogs that exist before the scenario starts
    pub blogs: Vec<NewBlog>,
    body: ScenarioFn<D>,
}

impl<D: PageDriver> TestCase<D> {
    /// Create a new test case
    #[must_use]
    pub fn new(name: impl Into<String>, body: ScenarioFn<D>) -> Self {
        Self {
            name: name.into(),
            timeout_ms: DEFAULT_CASE_TIMEOUT_MS,
            blogs: Vec::new(),
            body,
        }
    }

    /// Set timeout
    #[must_use]
    pub const fn with_timeout(mut self, ms: u64) -> Self {
        self.timeout_ms = ms;
        self
    }

    /// Add a pre-existing blog
    #[must_use]
    pub fn with_blog(mut self, blog: NewBlog) -> Self {
        self.blogs.push(blog);
        self
    }
}

impl<D: PageDriver> std::fmt::Debug for TestCase<D> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TestCase")
            .field("name", &self.name)
            .field("timeout_ms", &self.timeout_ms)
            .field("blogs", &self.blogs.len())
            .finish_non_exhaustive()
    }
}

/// A test suite containing cases and nested suites
#[derive(Debug)]
pub struct TestSuite<D: PageDriver> {
    /// Suite name
    pub name: String,
    /// Tests in this suite
    pub tests: Vec<TestCase<D>>,
    /// Nested suites, run after this suite's own tests
    pub suites: Vec<TestSuite<D>>,
}

impl<D: PageDriver> TestSuite<D> {
    /// Create a new test suite
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            tests: Vec::new(),
            suites: Vec::new(),
        }
    }

    /// Add a test case
    pub fn add_test(&mut self, test: TestCase<D>) {
        self.tests.push(test);
    }

    /// Add a nested suite
    pub fn add_suite(&mut self, suite: Self) {
        self.suites.push(suite);
    }

    /// Builder form of [`Self::add_test`]
    #[must_use]
    pub fn with_test(mut self, test: TestCase<D>) -> Self {
        self.add_test(test);
        self
    }

    /// Builder form of [`Self::add_suite`]
    #[must_use]
    pub fn with_suite(mut self, suite: Self) -> Self {
        self.add_suite(suite);
        self
    }

    /// Apply one timeout to every case, nested suites included
    pub fn set_case_timeout(&mut self, ms: u64) {
        for test in &mut self.tests {
            test.timeout_ms = ms;
        }
        for suite in &mut self.suites {
            suite.set_case_timeout(ms);
        }
    }

    /// Number of tests, nested suites included
    #[must_use]
    pub fn test_count(&self) -> usize {
        self.tests.len() + self.suites.iter().map(Self::test_count).sum::<usize>()
    }

    /// Every case with its qualified name, in run order
    #[must_use]
    pub fn flatten(&self) -> Vec<(String, &TestCase<D>)> {
        let mut out = Vec::new();
        self.collect_cases(None, &mut out);
        out
    }

    /// Qualified names of every case, in run order
    #[must_use]
    pub fn qualified_names(&self) -> Vec<String> {
        self.flatten().into_iter().map(|(name, _)| name).collect()
    }

    fn collect_cases<'s>(&'s self, parent: Option<&str>, out: &mut Vec<(String, &'s TestCase<D>)>) {
        let prefix = match parent {
            Some(parent) => format!("{parent}{NAME_SEPARATOR}{}", self.name),
            None => self.name.clone(),
        };
        for test in &self.tests {
            out.push((format!("{prefix}{NAME_SEPARATOR}{}", test.name), test));
        }
        for suite in &self.suites {
            suite.collect_cases(Some(&prefix), out);
        }
    }
}

/// Result of running a single test
#[derive(Debug, Clone)]
pub struct TestResult {
    /// Qualified test name
    pub name: String,
    /// Whether test passed
    pub passed: bool,
    /// Error message if failed
    pub error: Option<String>,
    /// Test duration
    pub duration: Duration,
}

impl TestResult {
    /// Create a passing test result
    #[must_use]
    pub fn pass(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            passed: true,
            error: None,
            duration: Duration::ZERO,
        }
    }

    /// Create a failing test result
    #[must_use]
    pub fn fail(name: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            passed: false,
            error: Some(error.into()),
            duration: Duration::ZERO,
        }
    }

    /// Set duration
    #[must_use]
    pub const fn with_duration(mut self, duration: Duration) -> Self {
        self.duration = duration;
        self
    }
}

/// Results from running a test suite
#[derive(Debug, Clone)]
pub struct SuiteResults {
    /// Suite name
    pub suite_name: String,
    /// Individual test results
    pub results: Vec<TestResult>,
    /// Total duration
    pub duration: Duration,
}

impl SuiteResults {
    /// Check if all tests passed
    #[must_use]
    pub fn all_passed(&self) -> bool {
        self.results.iter().all(|r| r.passed)
    }

    /// Count passed tests
    #[must_use]
    pub fn passed_count(&self) -> usize {
        self.results.iter().filter(|r| r.passed).count()
    }

    /// Count failed tests
    #[must_use]
    pub fn failed_count(&self) -> usize {
        self.results.iter().filter(|r| !r.passed).count()
    }

    /// Get total test count
    #[must_use]
    pub fn total(&self) -> usize {
        self.results.len()
    }

    /// Get failed tests
    #[must_use]
    pub fn failures(&self) -> Vec<&TestResult> {
        self.results.iter().filter(|r| !r.passed).collect()
    }

    /// Result for a qualified name
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&TestResult> {
        self.results.iter().find(|r| r.name == name)
    }
}

/// Source of fresh page drivers, one per case
#[async_trait]
pub trait DriverFactory<D: PageDriver>: Send + Sync {
    /// Create a driver for the next case
    async fn create(&self) -> ProbeResult<D>;
}

#[async_trait]
impl<D, F> DriverFactory<D> for F
where
    D: PageDriver + 'static,
    F: Fn() -> ProbeResult<D> + Send + Sync,
{
    async fn create(&self) -> ProbeResult<D> {
        (self)()
    }
}

/// Runs suites case by case
#[derive(Debug)]
pub struct SuiteRunner<D: PageDriver, F: DriverFactory<D>> {
    factory: F,
    backend: BackendClient,
    setup: ScenarioSetup,
    filter: Option<String>,
    fail_fast: bool,
    _driver: PhantomData<fn() -> D>,
}

impl<D: PageDriver, F: DriverFactory<D>> SuiteRunner<D, F> {
    /// Create a runner; `setup` is the template applied before every case
    pub fn new(factory: F, backend: BackendClient, setup: ScenarioSetup) -> Self {
        Self {
            factory,
            backend,
            setup,
            filter: None,
            fail_fast: false,
            _driver: PhantomData,
        }
    }

    /// Only run cases whose qualified name contains `filter`
    #[must_use]
    pub fn with_filter(mut self, filter: impl Into<String>) -> Self {
        self.filter = Some(filter.into());
        self
    }

    /// Stop after the first failure
    #[must_use]
    pub const fn with_fail_fast(mut self, fail_fast: bool) -> Self {
        self.fail_fast = fail_fast;
        self
    }

    /// Whether a qualified name passes the filter
    #[must_use]
    pub fn selects(&self, name: &str) -> bool {
        self.filter.as_deref().map_or(true, |f| name.contains(f))
    }

    /// Run a test suite
    pub async fn run(&self, suite: &TestSuite<D>) -> SuiteResults {
        self.run_with(suite, |_| {}).await
    }

    /// Run a test suite, reporting each result as it completes
    pub async fn run_with<R>(&self, suite: &TestSuite<D>, mut report: R) -> SuiteResults
    where
        R: FnMut(&TestResult),
    {
        let start = Instant::now();
        let mut results = Vec::new();

        for (name, case) in suite.flatten() {
            if !self.selects(&name) {
                continue;
            }
            let result = self.run_case(&name, case).await;
            report(&result);
            let failed = !result.passed;
            results.push(result);
            if failed && self.fail_fast {
                tracing::warn!(case = %name, "fail-fast: stopping suite");
                break;
            }
        }

        SuiteResults {
            suite_name: suite.name.clone(),
            results,
            duration: start.elapsed(),
        }
    }

    async fn run_case(&self, name: &str, case: &TestCase<D>) -> TestResult {
        let start = Instant::now();
        tracing::info!(case = %name, "running");

        let budget = Duration::from_millis(case.timeout_ms);
        let outcome = match tokio::time::timeout(budget, self.execute(case)).await {
            Ok(outcome) => outcome,
            Err(_) => Err(ProbeError::Timeout {
                ms: case.timeout_ms,
                what: format!("case \"{name}\""),
            }),
        };

        let result = match outcome {
            Ok(()) => {
                tracing::info!(case = %name, "passed");
                TestResult::pass(name)
            }
            Err(err) => {
                tracing::error!(case = %name, error = %err, "failed");
                TestResult::fail(name, err.to_string())
            }
        };
        result.with_duration(start.elapsed())
    }

    async fn execute(&self, case: &TestCase<D>) -> ProbeResult<()> {
        let driver = self.factory.create().await?;
        let setup = self.setup.clone().with_blogs(case.blogs.iter().cloned());
        let mut ctx = setup.run(&self.backend, driver).await?;

        let outcome = (case.body)(&mut ctx).await;
        if let Err(err) = ctx.close().await {
            tracing::warn!(error = %err, "closing page failed");
        }
        outcome
    }
}
