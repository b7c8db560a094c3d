//! Report rendering.
//!
//! `text` is for people: one line per scenario, failure detail indented
//! below it, a summary line last. `json` is the serialized
//! [`Report`](smoke::protocol::Report) for CI tooling.

use std::fmt::{self, Write as _};
use std::path::PathBuf;

use colored::Colorize;
use serde_json::json;
use smoke::Scenario;
use smoke::protocol::{Report, ScenarioResult, ScenarioState, StepOutcome};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
	/// Human-readable text
	#[default]
	Text,
	/// JSON report
	Json,
}

impl fmt::Display for OutputFormat {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(match self {
			Self::Text => "text",
			Self::Json => "json",
		})
	}
}

/// `850ms` or `2.4s`.
pub fn format_duration(ms: u64) -> String {
	if ms < 1000 { format!("{ms}ms") } else { format!("{:.1}s", ms as f64 / 1000.0) }
}

fn status_tag(state: ScenarioState) -> colored::ColoredString {
	match state {
		ScenarioState::Passed => "PASS".green().bold(),
		ScenarioState::Failed => "FAIL".red().bold(),
		ScenarioState::Errored => "ERROR".yellow().bold(),
		other => other.as_str().to_uppercase().dimmed(),
	}
}

fn render_result(out: &mut String, result: &ScenarioResult) {
	let _ = writeln!(out, "{:<5} {} {}", status_tag(result.state), result.scenario_name.bold(), format_duration(result.duration_ms).dimmed());
	if result.passed {
		return;
	}
	if let Some(step) = result.steps.iter().find(|s| s.outcome == StepOutcome::Failed) {
		let _ = writeln!(out, "      at step {}: {}", step.index + 1, step.action);
	}
	if let Some(reason) = &result.failure_reason {
		let _ = writeln!(out, "      {}", reason.red());
	}
	for artifact in &result.artifact_paths {
		let _ = writeln!(out, "      artifact: {}", artifact.display());
	}
}

pub fn render_text(report: &Report) -> String {
	let mut out = String::new();
	for result in &report.results {
		render_result(&mut out, result);
	}
	let summary = &report.summary;
	let counts = format!(
		"{} passed, {} failed, {} errored",
		summary.passed, summary.failed, summary.errored
	);
	let counts = if report.all_passed() { counts.green() } else { counts.red() };
	let _ = writeln!(
		out,
		"\n{} scenario{}: {} in {}",
		summary.total,
		if summary.total == 1 { "" } else { "s" },
		counts,
		format_duration(report.duration_ms)
	);
	out
}

pub fn render_report(report: &Report, format: OutputFormat) -> serde_json::Result<String> {
	match format {
		OutputFormat::Text => Ok(render_text(report)),
		OutputFormat::Json => serde_json::to_string_pretty(report),
	}
}

pub fn render_list(scenarios: &[Scenario], format: OutputFormat) -> serde_json::Result<String> {
	match format {
		OutputFormat::Json => {
			let entries: Vec<_> = scenarios
				.iter()
				.map(|s| {
					json!({
						"name": s.name,
						"description": s.description,
						"baseUrl": s.base_url,
						"routes": s.mocks.len(),
						"actions": s.actions.len(),
					})
				})
				.collect();
			serde_json::to_string_pretty(&entries)
		}
		OutputFormat::Text => {
			let width = scenarios.iter().map(|s| s.name.len()).max().unwrap_or(0);
			let mut out = String::new();
			for s in scenarios {
				let _ = writeln!(out, "{:<width$}  {}", s.name.cyan().bold(), s.description.dimmed());
			}
			Ok(out)
		}
	}
}

/// Validation result for one scenario file.
#[derive(Debug)]
pub struct CheckOutcome {
	pub path: PathBuf,
	/// Scenario names on success, the error message otherwise.
	pub result: Result<Vec<String>, String>,
}

pub fn render_check(outcomes: &[CheckOutcome], format: OutputFormat) -> serde_json::Result<String> {
	match format {
		OutputFormat::Json => {
			let entries: Vec<_> = outcomes
				.iter()
				.map(|o| match &o.result {
					Ok(names) => json!({"path": o.path, "ok": true, "scenarios": names}),
					Err(error) => json!({"path": o.path, "ok": false, "error": error}),
				})
				.collect();
			serde_json::to_string_pretty(&entries)
		}
		OutputFormat::Text => {
			let mut out = String::new();
			for o in outcomes {
				match &o.result {
					Ok(names) => {
						let _ = writeln!(out, "{} {} ({})", "ok".green().bold(), o.path.display(), names.join(", "));
					}
					Err(error) => {
						let _ = writeln!(out, "{} {}\n      {}", "invalid".red().bold(), o.path.display(), error);
					}
				}
			}
			Ok(out)
		}
	}
}
