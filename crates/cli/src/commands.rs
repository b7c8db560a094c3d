//! Subcommand implementations.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use smoke::protocol::{Report, ScenarioResult, StepRecord};
use smoke::{Driver, PlaywrightSessionFactory, Runner, Scenario, SessionFactory, catalog};
use tracing::{error, info, warn};

use crate::cli::{Cli, Commands, RunArgs};
use crate::config::Settings;
use crate::error::{CliError, Result};
use crate::output::{self, CheckOutcome, OutputFormat};

/// Runs the parsed command line and returns the process exit status.
pub async fn dispatch(cli: Cli, cwd: &Path) -> Result<i32> {
	let settings = Settings::load(cwd, &cli.global, |key| std::env::var(key).ok())?;
	let format = cli.global.format;
	if let Some(source) = &settings.source {
		info!(config = %source.display(), "using config file");
	}

	match cli.command.unwrap_or_else(|| Commands::Run(RunArgs::default())) {
		Commands::Run(args) => {
			let scenarios = collect(&args.files, &args.scenarios, &settings, cwd)?;
			run(&scenarios, &settings, format).await
		}
		Commands::List(args) => {
			let scenarios = collect(&args.files, &[], &settings, cwd)?;
			print_rendered(output::render_list(&scenarios, format)?, format);
			Ok(0)
		}
		Commands::Check(args) => check(&args.files, cwd, format),
	}
}

fn load(path: &Path) -> Result<Vec<Scenario>> {
	smoke::scenario::load_file(path).map_err(|source| match source {
		smoke::Error::Io(_) => CliError::ScenarioFile {
			path: path.to_path_buf(),
			source,
		},
		other => other.into(),
	})
}

/// Scenarios named on the command line, else the config's files, else the
/// built-in catalog, narrowed to `names` when any are given.
pub fn collect(files: &[PathBuf], names: &[String], settings: &Settings, cwd: &Path) -> Result<Vec<Scenario>> {
	let mut scenarios = Vec::new();
	if !files.is_empty() {
		for file in files {
			scenarios.extend(load(&cwd.join(file))?);
		}
	} else if !settings.scenarios.is_empty() {
		for file in &settings.scenarios {
			scenarios.extend(load(file)?);
		}
	} else {
		scenarios = catalog::builtin(settings.base_url.as_deref());
	}

	if !names.is_empty() {
		if let Some(missing) = names.iter().find(|name| !scenarios.iter().any(|s| &s.name == *name)) {
			return Err(CliError::UnknownScenario {
				name: missing.clone(),
				available: scenarios.iter().map(|s| s.name.as_str()).collect::<Vec<_>>().join(", "),
			});
		}
		scenarios.retain(|s| names.contains(&s.name));
	}

	if scenarios.is_empty() {
		return Err(CliError::NoScenarios);
	}
	Ok(scenarios)
}

async fn run(scenarios: &[Scenario], settings: &Settings, format: OutputFormat) -> Result<i32> {
	let options = settings.launch_options();
	info!(browser = %options.browser, headless = options.headless, "launching browser");
	let report = match PlaywrightSessionFactory::launch(&options).await {
		Ok(factory) => {
			let factory = Arc::new(factory);
			let report = execute(factory.clone(), scenarios, settings).await;
			if let Err(err) = factory.shutdown().await {
				warn!(error = %err, "browser shutdown failed");
			}
			report
		}
		Err(err) => {
			error!(error = %err, "browser launch failed");
			launch_failure_report(scenarios, &err)
		}
	};

	print_rendered(output::render_report(&report, format)?, format);
	Ok(report.exit_code())
}

/// Every scenario `Errored` by `err` before its first step.
pub fn launch_failure_report(scenarios: &[Scenario], err: &smoke::Error) -> Report {
	let reason = format!("browser launch failed: {err}");
	let results = scenarios
		.iter()
		.map(|scenario| {
			let steps = scenario
				.actions
				.iter()
				.enumerate()
				.map(|(index, action)| StepRecord::skipped(index, action.label()))
				.collect();
			ScenarioResult::stopped(scenario.name.clone(), err.kind(), reason.clone(), steps, Vec::new(), 0)
		})
		.collect();
	Report::new(results, 0)
}

/// Runs `scenarios` over sessions from `factory` with the resolved settings.
pub async fn execute(factory: Arc<dyn SessionFactory>, scenarios: &[Scenario], settings: &Settings) -> Report {
	Runner::new(Driver::new(factory, settings.environment())).with_jobs(settings.jobs).run(scenarios).await
}

/// Validates each file, reporting every problem rather than stopping at the first.
pub fn check_files(files: &[PathBuf], cwd: &Path) -> Vec<CheckOutcome> {
	files
		.iter()
		.map(|file| {
			let result = load(&cwd.join(file))
				.map(|scenarios| scenarios.into_iter().map(|s| s.name).collect())
				.map_err(|err| err.to_string());
			CheckOutcome { path: file.clone(), result }
		})
		.collect()
}

fn check(files: &[PathBuf], cwd: &Path, format: OutputFormat) -> Result<i32> {
	let outcomes = check_files(files, cwd);
	print_rendered(output::render_check(&outcomes, format)?, format);
	Ok(if outcomes.iter().all(|o| o.result.is_ok()) { 0 } else { 1 })
}

fn print_rendered(rendered: String, format: OutputFormat) {
	match format {
		OutputFormat::Text => print!("{rendered}"),
		OutputFormat::Json => println!("{rendered}"),
	}
}

#[cfg(test)]
mod tests {
	use std::fs;
	use std::time::Duration;

	use serde_json::json;
	use smoke::protocol::{FailureKind, ScenarioState, StepOutcome};
	use smoke::testing::{FakeBrowser, FakeElement};
	use tempfile::TempDir;

	use super::*;

	fn write_scenario(dir: &Path, file: &str, value: serde_json::Value) -> PathBuf {
		let path = dir.join(file);
		fs::write(&path, serde_json::to_string_pretty(&value).unwrap()).unwrap();
		path
	}

	fn login(name: &str) -> serde_json::Value {
		json!({
			"name": name,
			"baseUrl": "http://localhost:8080",
			"routes": [{"pattern": "**/api/me", "fulfill": {"json": {"id": 1}}}],
			"actions": [
				{"action": "navigate", "url": "/"},
				{"action": "click", "selector": "#login"},
				{"action": "assertVisible", "selector": "#welcome"}
			]
		})
	}

	#[test]
	fn collect_falls_back_to_catalog() {
		let temp = TempDir::new().unwrap();
		let settings = Settings {
			base_url: Some("http://127.0.0.1:9000".into()),
			..Settings::default()
		};
		let scenarios = collect(&[], &[], &settings, temp.path()).unwrap();
		assert_eq!(scenarios.len(), catalog::names().len());
		assert!(scenarios.iter().all(|s| s.base_url.as_deref() == Some("http://127.0.0.1:9000")));

		let only = collect(&[], &["backup-chunks".to_string()], &settings, temp.path()).unwrap();
		assert_eq!(only.len(), 1);
		assert_eq!(only[0].name, "backup-chunks");
	}

	#[test]
	fn collect_prefers_files_then_config() {
		let temp = TempDir::new().unwrap();
		write_scenario(temp.path(), "a.json", json!([login("a-one"), login("a-two")]));
		let configured = write_scenario(temp.path(), "b.json", login("b"));
		let settings = Settings {
			scenarios: vec![configured],
			..Settings::default()
		};

		let from_files = collect(&[PathBuf::from("a.json")], &[], &settings, temp.path()).unwrap();
		assert_eq!(from_files.iter().map(|s| s.name.as_str()).collect::<Vec<_>>(), ["a-one", "a-two"]);

		let from_config = collect(&[], &[], &settings, temp.path()).unwrap();
		assert_eq!(from_config[0].name, "b");
	}

	#[test]
	fn unknown_scenario_lists_available() {
		let temp = TempDir::new().unwrap();
		let err = collect(&[], &["nope".to_string()], &Settings::default(), temp.path()).unwrap_err();
		match err {
			CliError::UnknownScenario { name, available } => {
				assert_eq!(name, "nope");
				assert!(available.contains("content-enhancer"), "{available}");
			}
			other => panic!("expected unknown scenario, got {other:?}"),
		}
	}

	#[test]
	fn missing_file_names_path() {
		let temp = TempDir::new().unwrap();
		let err = collect(&[PathBuf::from("missing.json")], &[], &Settings::default(), temp.path()).unwrap_err();
		assert!(matches!(err, CliError::ScenarioFile { .. }), "{err:?}");
		assert!(err.to_string().contains("missing.json"), "{err}");
	}

	#[test]
	fn check_reports_each_file() {
		let temp = TempDir::new().unwrap();
		write_scenario(temp.path(), "good.json", login("good"));
		write_scenario(temp.path(), "bad.json", json!({"name": "bad", "actions": []}));

		let outcomes = check_files(&[PathBuf::from("good.json"), PathBuf::from("bad.json")], temp.path());
		assert_eq!(outcomes[0].result.as_ref().unwrap(), &vec!["good".to_string()]);
		let error = outcomes[1].result.as_ref().unwrap_err();
		assert!(error.contains("bad.json"), "{error}");
	}

	#[test]
	fn launch_failure_errors_every_scenario() {
		let scenarios = catalog::builtin(None);
		let err = smoke::Error::Browser(smoke::runtime::Error::ServerNotFound);
		let report = launch_failure_report(&scenarios, &err);

		assert_eq!(report.results.len(), scenarios.len());
		assert_eq!(report.summary.errored, scenarios.len());
		assert_eq!(report.exit_code(), 1);
		for (result, scenario) in report.results.iter().zip(&scenarios) {
			assert_eq!(result.scenario_name, scenario.name);
			assert_eq!(result.state, ScenarioState::Errored);
			assert_eq!(result.error_kind, Some(FailureKind::Browser));
			assert!(result.artifact_paths.is_empty());
			assert_eq!(result.steps.len(), scenario.actions.len());
			assert!(result.steps.iter().all(|s| s.outcome == StepOutcome::Skipped));
			assert!(result.failure_reason.as_deref().unwrap().starts_with("browser launch failed"));
		}
	}

	#[tokio::test]
	async fn execute_runs_every_scenario() {
		let temp = TempDir::new().unwrap();
		write_scenario(temp.path(), "flows.json", json!([login("passes"), login("fails")]));
		let mut scenarios = collect(&[PathBuf::from("flows.json")], &[], &Settings::default(), temp.path()).unwrap();
		scenarios[1].actions.push(smoke::protocol::Action::assert_visible("#admin"));

		let browser = FakeBrowser::new()
			.with_element("#login", FakeElement::new())
			.on_click("#login", |dom, _| dom.insert("#welcome", FakeElement::new()));
		let settings = Settings {
			artifacts_dir: temp.path().join("artifacts"),
			action_timeout: Duration::from_millis(50),
			jobs: 2,
			..Settings::default()
		};

		let report = execute(Arc::new(browser.clone()), &scenarios, &settings).await;
		assert_eq!(report.results[0].state, ScenarioState::Passed);
		assert_eq!(report.results[1].state, ScenarioState::Failed);
		assert_eq!(report.results[1].error_kind, Some(FailureKind::AssertionFailed));
		assert_eq!(report.exit_code(), 1);
		assert_eq!(browser.opened(), 2);
		assert!(temp.path().join("artifacts").join("fails-failure.png").exists());
	}
}
