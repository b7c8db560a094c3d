//! Layered settings: `smoke.json`, then `SMOKE_*` environment variables,
//! then command line flags. Later layers win field by field.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use smoke::driver::{DEFAULT_ACTION_TIMEOUT, DEFAULT_SCENARIO_TIMEOUT};
use smoke::protocol::{BootstrapPayload, BrowserKind, DialogPolicy, UnmatchedPolicy, Viewport};
use smoke::{Environment, LaunchOptions};
use tracing::debug;

use crate::cli::GlobalArgs;
use crate::error::{CliError, Result};

pub const CONFIG_FILE: &str = "smoke.json";

/// Contents of `smoke.json`. Relative paths resolve against the file's directory.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct FileConfig {
	#[serde(default)]
	pub base_url: Option<String>,
	/// `WIDTHxHEIGHT`
	#[serde(default)]
	pub viewport: Option<String>,
	#[serde(default)]
	pub bootstrap: Option<BootstrapPayload>,
	#[serde(default)]
	pub artifacts_dir: Option<PathBuf>,
	#[serde(default)]
	pub browser: Option<BrowserKind>,
	#[serde(default)]
	pub headless: Option<bool>,
	#[serde(default)]
	pub jobs: Option<usize>,
	#[serde(default)]
	pub strict_mocks: Option<bool>,
	/// `false` lets element actions use the first of several matches.
	#[serde(default)]
	pub strict_selectors: Option<bool>,
	#[serde(default)]
	pub timeout_ms: Option<u64>,
	#[serde(default)]
	pub scenario_timeout_ms: Option<u64>,
	#[serde(default)]
	pub dialogs: Option<DialogPolicy>,
	/// Scenario files run when none are given on the command line.
	#[serde(default)]
	pub scenarios: Vec<PathBuf>,
}

/// Fully resolved settings for one invocation.
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
	pub base_url: Option<String>,
	pub viewport: Viewport,
	pub bootstrap: Option<BootstrapPayload>,
	pub artifacts_dir: PathBuf,
	pub browser: BrowserKind,
	pub headless: bool,
	pub jobs: usize,
	pub strict_mocks: bool,
	pub strict_selectors: bool,
	pub action_timeout: Duration,
	pub scenario_timeout: Duration,
	pub dialogs: DialogPolicy,
	pub scenarios: Vec<PathBuf>,
	/// The config file these settings were read from, if any.
	pub source: Option<PathBuf>,
}

impl Default for Settings {
	fn default() -> Self {
		Self {
			base_url: None,
			viewport: Viewport::default(),
			bootstrap: None,
			artifacts_dir: PathBuf::from("artifacts"),
			browser: BrowserKind::default(),
			headless: true,
			jobs: 1,
			strict_mocks: false,
			strict_selectors: true,
			action_timeout: DEFAULT_ACTION_TIMEOUT,
			scenario_timeout: DEFAULT_SCENARIO_TIMEOUT,
			dialogs: DialogPolicy::default(),
			scenarios: Vec::new(),
			source: None,
		}
	}
}

/// Searches `start` and its ancestors for `smoke.json`.
pub fn find_config(start: &Path) -> Option<PathBuf> {
	let mut current = start;
	loop {
		let candidate = current.join(CONFIG_FILE);
		debug!(path = %candidate.display(), "checking for config");
		if candidate.is_file() {
			return Some(candidate);
		}
		match current.parent() {
			Some(parent) if parent != current => current = parent,
			_ => return None,
		}
	}
}

fn read_config(path: &Path) -> Result<FileConfig> {
	let config_error = |message: String| CliError::Config {
		path: path.to_path_buf(),
		message,
	};
	let source = std::fs::read_to_string(path).map_err(|e| config_error(e.to_string()))?;
	serde_json::from_str(&source).map_err(|e| config_error(e.to_string()))
}

impl Settings {
	/// Resolves settings for a process started in `cwd`.
	///
	/// `env` looks up environment variables; pass `|k| std::env::var(k).ok()`
	/// outside tests.
	pub fn load<E>(cwd: &Path, args: &GlobalArgs, env: E) -> Result<Self>
	where
		E: Fn(&str) -> Option<String>,
	{
		let path = match &args.config {
			Some(explicit) => Some(cwd.join(explicit)),
			None => find_config(cwd),
		};
		let mut settings = Settings::default();
		if let Some(path) = path {
			debug!(path = %path.display(), "loading config");
			let file = read_config(&path)?;
			settings.apply_file(file, &path)?;
		}
		settings.apply_env(env)?;
		settings.apply_args(args, cwd)?;
		Ok(settings)
	}

	fn apply_file(&mut self, file: FileConfig, path: &Path) -> Result<()> {
		let dir = path.parent().unwrap_or(Path::new("."));
		if let Some(base_url) = file.base_url {
			self.base_url = Some(base_url);
		}
		if let Some(viewport) = file.viewport {
			self.viewport = viewport.parse().map_err(|message| CliError::Config {
				path: path.to_path_buf(),
				message,
			})?;
		}
		if let Some(bootstrap) = file.bootstrap {
			self.merge_bootstrap(&bootstrap);
		}
		if let Some(dir_setting) = file.artifacts_dir {
			self.artifacts_dir = dir.join(dir_setting);
		}
		self.browser = file.browser.unwrap_or(self.browser);
		self.headless = file.headless.unwrap_or(self.headless);
		if let Some(jobs) = file.jobs {
			self.jobs = jobs.max(1);
		}
		self.strict_mocks = file.strict_mocks.unwrap_or(self.strict_mocks);
		self.strict_selectors = file.strict_selectors.unwrap_or(self.strict_selectors);
		if let Some(ms) = file.timeout_ms {
			self.action_timeout = Duration::from_millis(ms);
		}
		if let Some(ms) = file.scenario_timeout_ms {
			self.scenario_timeout = Duration::from_millis(ms);
		}
		self.dialogs = file.dialogs.unwrap_or(self.dialogs);
		self.scenarios = file.scenarios.into_iter().map(|p| dir.join(p)).collect();
		self.source = Some(path.to_path_buf());
		Ok(())
	}

	fn apply_env<E>(&mut self, env: E) -> Result<()>
	where
		E: Fn(&str) -> Option<String>,
	{
		let var = |key: &str| env(key).filter(|v| !v.trim().is_empty());

		if let Some(base_url) = var("SMOKE_BASE_URL") {
			self.base_url = Some(base_url);
		}
		if let Some(viewport) = var("SMOKE_VIEWPORT") {
			self.viewport = viewport.parse().map_err(|message| CliError::setting("SMOKE_VIEWPORT", message))?;
		}
		if let Some(dir) = var("SMOKE_ARTIFACTS_DIR") {
			self.artifacts_dir = PathBuf::from(dir);
		}
		if let Some(jobs) = var("SMOKE_JOBS") {
			let jobs: usize = jobs
				.trim()
				.parse()
				.map_err(|_| CliError::setting("SMOKE_JOBS", format!("'{jobs}' is not a number")))?;
			self.jobs = jobs.max(1);
		}

		let overlay = BootstrapPayload {
			api_url: var("SMOKE_API_URL"),
			nonce: var("SMOKE_NONCE"),
			home_url: var("SMOKE_HOME_URL"),
			..BootstrapPayload::default()
		};
		if overlay != BootstrapPayload::default() {
			self.merge_bootstrap(&overlay);
		}
		Ok(())
	}

	fn apply_args(&mut self, args: &GlobalArgs, cwd: &Path) -> Result<()> {
		if let Some(base_url) = &args.base_url {
			self.base_url = Some(base_url.clone());
		}
		if let Some(viewport) = args.viewport {
			self.viewport = viewport;
		}
		if let Some(path) = &args.bootstrap {
			let path = cwd.join(path);
			let source = std::fs::read_to_string(&path).map_err(|e| CliError::setting("--bootstrap", format!("{}: {e}", path.display())))?;
			let payload: BootstrapPayload =
				serde_json::from_str(&source).map_err(|e| CliError::setting("--bootstrap", format!("{}: {e}", path.display())))?;
			self.merge_bootstrap(&payload);
		}
		if let Some(dir) = &args.artifacts_dir {
			self.artifacts_dir = dir.clone();
		}
		if let Some(browser) = args.browser {
			self.browser = browser.into();
		}
		if args.headed {
			self.headless = false;
		}
		if let Some(jobs) = args.jobs {
			self.jobs = jobs.max(1);
		}
		if args.strict_mocks {
			self.strict_mocks = true;
		}
		if let Some(ms) = args.timeout {
			self.action_timeout = Duration::from_millis(ms);
		}
		if let Some(ms) = args.scenario_timeout {
			self.scenario_timeout = Duration::from_millis(ms);
		}
		Ok(())
	}

	fn merge_bootstrap(&mut self, overlay: &BootstrapPayload) {
		self.bootstrap = Some(match self.bootstrap.take() {
			Some(existing) => existing.merged(overlay),
			None => overlay.clone(),
		});
	}

	pub fn environment(&self) -> Environment {
		Environment {
			base_url: self.base_url.clone(),
			viewport: self.viewport,
			bootstrap: self.bootstrap.clone(),
			artifacts_dir: self.artifacts_dir.clone(),
			action_timeout: self.action_timeout,
			scenario_timeout: self.scenario_timeout,
			strict_selectors: self.strict_selectors,
			unmatched: self.strict_mocks.then_some(UnmatchedPolicy::Strict),
			dialogs: self.dialogs,
		}
	}

	pub fn launch_options(&self) -> LaunchOptions {
		LaunchOptions {
			browser: self.browser,
			headless: self.headless,
			..LaunchOptions::default()
		}
	}
}
