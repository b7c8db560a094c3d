//! Binary-level tests that never launch a browser.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

use serde_json::{Value, json};
use tempfile::TempDir;

fn smoke_binary() -> PathBuf {
	PathBuf::from(env!("CARGO_BIN_EXE_smoke"))
}

/// `smoke` in `dir` with a clean `SMOKE_*` environment.
fn smoke_command(dir: &Path, args: &[&str]) -> Command {
	let mut command = Command::new(smoke_binary());
	command.current_dir(dir).args(args);
	for key in ["SMOKE_BASE_URL", "SMOKE_VIEWPORT", "SMOKE_API_URL", "SMOKE_NONCE", "SMOKE_HOME_URL", "SMOKE_ARTIFACTS_DIR", "SMOKE_JOBS"] {
		command.env_remove(key);
	}
	command
}

fn run_smoke(dir: &Path, args: &[&str]) -> (i32, String, String) {
	capture(&mut smoke_command(dir, args))
}

fn capture(command: &mut Command) -> (i32, String, String) {
	let output = command.output().expect("failed to execute smoke");
	(
		output.status.code().unwrap_or(-1),
		String::from_utf8_lossy(&output.stdout).to_string(),
		String::from_utf8_lossy(&output.stderr).to_string(),
	)
}

fn write(dir: &Path, name: &str, value: Value) {
	fs::write(dir.join(name), serde_json::to_string_pretty(&value).unwrap()).unwrap();
}

#[test]
fn check_accepts_valid_files() {
	let temp = TempDir::new().unwrap();
	write(
		temp.path(),
		"settings.json",
		json!({
			"name": "settings page",
			"baseUrl": "http://localhost:8080",
			"routes": [
				{"pattern": "**/settings", "method": "GET", "fulfill": {"json": {"theme": "dark"}}},
				{"regex": "/analytics/.*", "abort": "blockedbyclient"}
			],
			"actions": [
				{"action": "navigate", "url": "/settings"},
				{"action": "assertText", "selector": "h1", "expected": "Settings", "match": "contains"}
			]
		}),
	);

	let (code, stdout, _) = run_smoke(temp.path(), &["check", "settings.json"]);
	assert_eq!(code, 0, "{stdout}");
	assert!(stdout.contains("settings page"), "{stdout}");
}

#[test]
fn check_flags_invalid_files_in_json() {
	let temp = TempDir::new().unwrap();
	write(temp.path(), "empty.json", json!({"name": "empty", "actions": []}));
	write(
		temp.path(),
		"ok.json",
		json!({"name": "ok", "actions": [{"action": "navigate", "url": "http://localhost/"}]}),
	);

	let (code, stdout, _) = run_smoke(temp.path(), &["--format", "json", "check", "ok.json", "empty.json"]);
	assert_eq!(code, 1);
	let report: Value = serde_json::from_str(&stdout).unwrap();
	assert_eq!(report[0]["ok"], true);
	assert_eq!(report[1]["ok"], false);
	assert!(report[1]["error"].as_str().unwrap().contains("empty.json"));
}

#[test]
fn list_shows_builtin_catalog() {
	let temp = TempDir::new().unwrap();
	let (code, stdout, stderr) = run_smoke(temp.path(), &["-f", "json", "list"]);
	assert_eq!(code, 0, "{stderr}");
	let entries: Value = serde_json::from_str(&stdout).unwrap();
	let names: Vec<_> = entries.as_array().unwrap().iter().map(|e| e["name"].as_str().unwrap().to_string()).collect();
	assert_eq!(names, ["content-enhancer", "backup-chunks", "bulk-optimize-rate-limit"]);
}

#[test]
fn list_uses_config_scenarios() {
	let temp = TempDir::new().unwrap();
	fs::create_dir_all(temp.path().join("flows")).unwrap();
	write(
		&temp.path().join("flows"),
		"home.json",
		json!({"name": "home", "description": "Landing page renders", "actions": [{"action": "navigate", "url": "/"}]}),
	);
	write(temp.path(), "smoke.json", json!({"baseUrl": "http://localhost:3000", "scenarios": ["flows/home.json"]}));
	let nested = temp.path().join("src");
	fs::create_dir_all(&nested).unwrap();

	let (code, stdout, stderr) = run_smoke(&nested, &["list"]);
	assert_eq!(code, 0, "{stderr}");
	assert!(stdout.contains("home"), "{stdout}");
	assert!(stdout.contains("Landing page renders"), "{stdout}");
}

#[test]
fn usage_errors_exit_with_two() {
	let temp = TempDir::new().unwrap();
	write(temp.path(), "smoke.json", json!({"jobs": "lots"}));

	let (code, _, stderr) = run_smoke(temp.path(), &["list"]);
	assert_eq!(code, 2);
	assert!(stderr.contains("smoke.json"), "{stderr}");

	let (code, _, stderr) = run_smoke(temp.path(), &["--config", "missing.json", "list"]);
	assert_eq!(code, 2);
	assert!(stderr.contains("missing.json"), "{stderr}");
}

#[test]
fn unknown_scenario_is_a_usage_error() {
	let temp = TempDir::new().unwrap();
	let (code, _, stderr) = run_smoke(temp.path(), &["run", "--scenario", "nope"]);
	assert_eq!(code, 2);
	assert!(stderr.contains("unknown scenario 'nope'"), "{stderr}");
}

#[test]
fn missing_driver_reports_every_scenario_errored() {
	let temp = TempDir::new().unwrap();
	let empty_path = temp.path().join("bin");
	fs::create_dir(&empty_path).unwrap();

	let mut command = smoke_command(temp.path(), &["run", "--format", "json"]);
	command.env("PATH", &empty_path);
	for key in ["PLAYWRIGHT_NODE_EXE", "PLAYWRIGHT_CLI_JS", "PLAYWRIGHT_DRIVER_PATH"] {
		command.env_remove(key);
	}
	let (code, stdout, stderr) = capture(&mut command);

	assert_eq!(code, 1, "{stderr}");
	let report: Value = serde_json::from_str(&stdout).unwrap();
	let results = report["results"].as_array().unwrap();
	assert_eq!(results.len(), 3);
	for result in results {
		assert_eq!(result["state"], "errored", "{result}");
		assert_eq!(result["errorKind"], "browser");
		assert_eq!(result["artifactPaths"], json!([]));
	}
	assert_eq!(report["summary"]["errored"], 3);
}
