//! CLI command definitions using clap

use blogprobe::HarnessConfig;
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Blogprobe: end-to-end tests for the blog application
#[derive(Parser, Debug)]
#[command(name = "blogprobe")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Verbosity level (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Quiet mode (suppress non-error output)
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Color output (auto, always, never)
    #[arg(long, default_value = "auto", global = true)]
    pub color: ColorArg,

    /// Subcommand to run
    #[command(subcommand)]
    pub command: Commands,
}

/// CLI subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the blog scenarios in Chromium
    Run(RunArgs),

    /// List scenario names without running them
    List(ListArgs),

    /// Show the effective harness configuration
    Config(ConfigArgs),
}

/// Harness settings shared by `run` and `config`
#[derive(Parser, Debug, Clone, Default)]
pub struct HarnessArgs {
    /// YAML configuration file
    #[arg(short, long, env = "BLOGPROBE_CONFIG")]
    pub config: Option<PathBuf>,

    /// Application root URL
    #[arg(long)]
    pub app_url: Option<String>,

    /// Backend root URL
    #[arg(long)]
    pub api_url: Option<String>,

    /// Answer the blog API in-process instead of using the backend
    #[arg(long)]
    pub intercept: bool,

    /// Show the browser window
    #[arg(long)]
    pub headed: bool,

    /// Disable the Chromium sandbox (containers)
    #[arg(long)]
    pub no_sandbox: bool,

    /// Chromium executable
    #[arg(long)]
    pub chromium: Option<PathBuf>,

    /// Action and assertion timeout in milliseconds
    #[arg(long)]
    pub timeout: Option<u64>,
}

impl HarnessArgs {
    /// Layer flags over a loaded configuration
    #[must_use]
    pub fn apply(&self, mut config: HarnessConfig) -> HarnessConfig {
        if let Some(ref url) = self.app_url {
            config.app_url.clone_from(url);
        }
        if let Some(ref url) = self.api_url {
            config.api_url.clone_from(url);
        }
        if self.intercept {
            config.intercept = true;
        }
        if self.headed {
            config.headless = false;
        }
        if self.no_sandbox {
            config.sandbox = false;
        }
        if let Some(ref path) = self.chromium {
            config.chromium_path = Some(path.display().to_string());
        }
        if let Some(ms) = self.timeout {
            config = config.with_timeout_ms(ms);
        }
        config
    }
}

/// Arguments for the run command
#[derive(Parser, Debug)]
pub struct RunArgs {
    /// Harness settings
    #[command(flatten)]
    pub harness: HarnessArgs,

    /// Only run scenarios whose qualified name contains this text
    #[arg(short, long)]
    pub filter: Option<String>,

    /// Stop after the first failing scenario
    #[arg(long)]
    pub fail_fast: bool,

    /// Per-scenario timeout in milliseconds
    #[arg(long, default_value = "30000")]
    pub case_timeout: u64,

    /// Result format
    #[arg(long, default_value = "text")]
    pub format: FormatArg,
}

/// Arguments for the list command
#[derive(Parser, Debug)]
pub struct ListArgs {
    /// Only list scenarios whose qualified name contains this text
    #[arg(short, long)]
    pub filter: Option<String>,
}

/// Arguments for the config command
#[derive(Parser, Debug)]
pub struct ConfigArgs {
    /// Harness settings
    #[command(flatten)]
    pub harness: HarnessArgs,

    /// Only validate; print nothing on success
    #[arg(long)]
    pub check: bool,
}

/// Result output format
#[derive(ValueEnum, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum FormatArg {
    /// Human-readable lines
    #[default]
    Text,
    /// One JSON document
    Json,
}

impl From<FormatArg> for crate::output::OutputFormat {
    fn from(arg: FormatArg) -> Self {
        match arg {
            FormatArg::Text => Self::Text,
            FormatArg::Json => Self::Json,
        }
    }
}

/// Color choice argument
#[derive(ValueEnum, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ColorArg {
    /// Automatic color detection
    #[default]
    Auto,
    /// Always use colors
    Always,
    /// Never use colors
    Never,
}

impl From<ColorArg> for crate::config::ColorChoice {
    fn from(arg: ColorArg) -> Self {
        match arg {
            ColorArg::Auto => Self::Auto,
            ColorArg::Always => Self::Always,
            ColorArg::Never => Self::Never,
        }
    }
}
