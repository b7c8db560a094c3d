
use std::path::PathBuf;

use clap::builder::Styles;
use clap::builder::styling::AnsiColor;
use clap::{Args, Parser, Subcommand, ValueEnum};
use smoke::protocol::{BrowserKind, Viewport};

use crate::output::OutputFormat;

/// Cargo-like help colours: green bold headers, cyan literals and placeholders.
fn cli_styles() -> Styles {
	Styles::styled()
		.header(AnsiColor::Green.on_default().bold())
		.usage(AnsiColor::Green.on_default().bold())
		.literal(AnsiColor::Cyan.on_default())
		.placeholder(AnsiColor::Cyan.on_default())
		.valid(AnsiColor::Cyan.on_default())
		.invalid(AnsiColor::Red.on_default().bold())
		.error(AnsiColor::Red.on_default().bold())
}

/// Runs declarative browser scenarios against mocked backends.
///
/// Without a subcommand every configured scenario runs: the `scenarios`
/// listed in `smoke.json`, else the built-in catalog.
#[derive(Parser, Debug)]
#[command(name = "smoke")]
#[command(version)]
#[command(styles = cli_styles())]
pub struct Cli {
	#[command(flatten)]
	pub global: GlobalArgs,

	#[command(subcommand)]
	pub command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
	/// Run scenarios from files, or the configured set when none are given.
	Run(RunArgs),
	/// List scenarios without running them.
	List(ListArgs),
	/// Validate scenario files without launching a browser.
	Check(CheckArgs),
}

#[derive(Args, Debug, Clone, Default)]
pub struct RunArgs {
	/// Scenario files (JSON, one scenario or an array)
	#[arg(value_name = "FILE")]
	pub files: Vec<PathBuf>,

	/// Only run scenarios with this name (repeatable)
	#[arg(short, long = "scenario", value_name = "NAME")]
	pub scenarios: Vec<String>,
}

#[derive(Args, Debug, Clone, Default)]
pub struct ListArgs {
	/// Scenario files to list instead of the configured set
	#[arg(value_name = "FILE")]
	pub files: Vec<PathBuf>,
}

#[derive(Args, Debug, Clone)]
pub struct CheckArgs {
	#[arg(value_name = "FILE", required = true)]
	pub files: Vec<PathBuf>,
}

/// Flags accepted before or after any subcommand. Unset flags leave the
/// config file and `SMOKE_*` environment values alone.
#[derive(Args, Debug, Clone, Default)]
pub struct GlobalArgs {
	/// Increase verbosity (-v info, -vv debug)
	#[arg(short, long, global = true, action = clap::ArgAction::Count)]
	pub verbose: u8,

	/// Report format
	#[arg(short = 'f', long, global = true, value_enum, default_value_t)]
	pub format: OutputFormat,

	/// Base URL relative navigations resolve against
	#[arg(long, global = true, value_name = "URL")]
	pub base_url: Option<String>,

	/// Viewport size, e.g. 1280x800
	#[arg(long, global = true, value_name = "WxH")]
	pub viewport: Option<Viewport>,

	/// JSON file with bootstrap payload fields merged over each scenario's
	#[arg(long, global = true, value_name = "FILE")]
	pub bootstrap: Option<PathBuf>,

	/// Where screenshots are written
	#[arg(long, global = true, value_name = "DIR")]
	pub artifacts_dir: Option<PathBuf>,

	#[arg(long, global = true, value_enum)]
	pub browser: Option<BrowserArg>,

	/// Show the browser window
	#[arg(long, global = true)]
	pub headed: bool,

	/// Scenarios run at the same time
	#[arg(short, long, global = true, value_name = "N")]
	pub jobs: Option<usize>,

	/// Answer unmocked requests with a 404 instead of letting them through
	#[arg(long, global = true)]
	pub strict_mocks: bool,

	/// Action and wait timeout in milliseconds
	#[arg(long, global = true, value_name = "MS")]
	pub timeout: Option<u64>,

	/// Whole-scenario budget in milliseconds
	#[arg(long, global = true, value_name = "MS")]
	pub scenario_timeout: Option<u64>,

	/// Config file (default: smoke.json in this or a parent directory)
	#[arg(short, long, global = true, value_name = "FILE")]
	pub config: Option<PathBuf>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum BrowserArg {
	Chromium,
	Firefox,
	Webkit,
}

impl From<BrowserArg> for BrowserKind {
	fn from(browser: BrowserArg) -> Self {
		match browser {
			BrowserArg::Chromium => BrowserKind::Chromium,
			BrowserArg::Firefox => BrowserKind::Firefox,
			BrowserArg::Webkit => BrowserKind::Webkit,
		}
	}
}
