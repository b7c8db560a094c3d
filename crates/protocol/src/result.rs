//! Scenario lifecycle, per-step records and the aggregate report.

use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Lifecycle of one scenario run.
///
/// `Pending -> Running -> {Passed, Failed, Errored}`. Terminal states never
/// transition again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScenarioState {
	#[default]
	Pending,
	Running,
	/// Every action and assertion succeeded.
	Passed,
	/// A wait, element resolution or assertion did not hold.
	Failed,
	/// Infrastructure problem: browser, budget, invalid input.
	Errored,
}

impl ScenarioState {
	pub fn is_terminal(self) -> bool {
		matches!(self, Self::Passed | Self::Failed | Self::Errored)
	}

	/// Whether `self -> next` is a legal transition.
	///
	/// `Pending` may also go straight to `Errored` when setup fails before
	/// the scenario starts running.
	pub fn can_transition_to(self, next: ScenarioState) -> bool {
		matches!(
			(self, next),
			(Self::Pending, Self::Running) | (Self::Pending, Self::Errored) | (Self::Running, Self::Passed | Self::Failed | Self::Errored)
		)
	}

	pub fn as_str(self) -> &'static str {
		match self {
			Self::Pending => "pending",
			Self::Running => "running",
			Self::Passed => "passed",
			Self::Failed => "failed",
			Self::Errored => "errored",
		}
	}
}

impl fmt::Display for ScenarioState {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

/// Category of the error that ended a scenario early.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FailureKind {
	Navigation,
	Timeout,
	ElementNotFound,
	ElementAmbiguous,
	AssertionFailed,
	MockMismatch,
	BudgetExceeded,
	Browser,
	InvalidScenario,
	Io,
}

impl FailureKind {
	/// Terminal state a scenario ends in when stopped by this kind of error.
	pub fn disposition(self) -> ScenarioState {
		match self {
			Self::Timeout | Self::ElementNotFound | Self::ElementAmbiguous | Self::AssertionFailed => ScenarioState::Failed,
			Self::Navigation | Self::MockMismatch | Self::BudgetExceeded | Self::Browser | Self::InvalidScenario | Self::Io => ScenarioState::Errored,
		}
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StepOutcome {
	Passed,
	Failed,
	/// Not executed because an earlier step stopped the scenario.
	Skipped,
}

/// Narration of one executed (or skipped) action.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StepRecord {
	pub index: usize,
	pub action: String,
	pub outcome: StepOutcome,
	pub duration_ms: u64,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub error: Option<String>,
}

impl StepRecord {
	pub fn passed(index: usize, action: String, duration_ms: u64) -> Self {
		Self {
			index,
			action,
			outcome: StepOutcome::Passed,
			duration_ms,
			error: None,
		}
	}

	pub fn failed(index: usize, action: String, duration_ms: u64, error: String) -> Self {
		Self {
			index,
			action,
			outcome: StepOutcome::Failed,
			duration_ms,
			error: Some(error),
		}
	}

	pub fn skipped(index: usize, action: String) -> Self {
		Self {
			index,
			action,
			outcome: StepOutcome::Skipped,
			duration_ms: 0,
			error: None,
		}
	}
}

/// Outcome of one scenario. Built once when the scenario reaches a
/// terminal state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScenarioResult {
	pub scenario_name: String,
	pub state: ScenarioState,
	pub passed: bool,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub failure_reason: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub error_kind: Option<FailureKind>,
	#[serde(default)]
	pub artifact_paths: Vec<PathBuf>,
	#[serde(default)]
	pub steps: Vec<StepRecord>,
	pub duration_ms: u64,
}

impl ScenarioResult {
	pub fn passed(name: impl Into<String>, steps: Vec<StepRecord>, artifact_paths: Vec<PathBuf>, duration_ms: u64) -> Self {
		Self {
			scenario_name: name.into(),
			state: ScenarioState::Passed,
			passed: true,
			failure_reason: None,
			error_kind: None,
			artifact_paths,
			steps,
			duration_ms,
		}
	}

	/// A failed or errored result; the terminal state follows from `kind`.
	pub fn stopped(name: impl Into<String>, kind: FailureKind, reason: impl Into<String>, steps: Vec<StepRecord>, artifact_paths: Vec<PathBuf>, duration_ms: u64) -> Self {
		Self {
			scenario_name: name.into(),
			state: kind.disposition(),
			passed: false,
			failure_reason: Some(reason.into()),
			error_kind: Some(kind),
			artifact_paths,
			steps,
			duration_ms,
		}
	}
}

/// Counts per terminal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ReportSummary {
	pub total: usize,
	pub passed: usize,
	pub failed: usize,
	pub errored: usize,
}

/// Every scenario result of one invocation, in input order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Report {
	pub summary: ReportSummary,
	pub results: Vec<ScenarioResult>,
	pub duration_ms: u64,
}

impl Report {
	pub fn new(results: Vec<ScenarioResult>, duration_ms: u64) -> Self {
		let count = |state| results.iter().filter(|r| r.state == state).count();
		let summary = ReportSummary {
			total: results.len(),
			passed: count(ScenarioState::Passed),
			failed: count(ScenarioState::Failed),
			errored: count(ScenarioState::Errored),
		};
		Self { summary, results, duration_ms }
	}

	pub fn all_passed(&self) -> bool {
		self.results.iter().all(|r| r.passed)
	}

	/// Process exit status: 0 only when every scenario passed.
	pub fn exit_code(&self) -> i32 {
		if self.all_passed() { 0 } else { 1 }
	}
}
