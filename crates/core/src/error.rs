//! Error taxonomy for scenario runs.
//!
//! Every error maps to a [`FailureKind`], and through it to the terminal
//! state a scenario ends in: selector, wait and assertion problems are
//! `Failed`; navigation, browser and setup problems are `Errored`.

use std::time::Duration;

use smoke_protocol::{FailureKind, ScenarioState};
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// Whole milliseconds, saturating at `u64::MAX`.
pub(crate) fn millis(duration: Duration) -> u64 {
	duration.as_millis().try_into().unwrap_or(u64::MAX)
}

#[derive(Debug, Error)]
pub enum Error {
	/// The page failed to load.
	#[error("navigation to {url} failed: {message}")]
	Navigation { url: String, message: String },

	#[error("timed out after {timeout_ms}ms waiting for {what}")]
	Timeout { what: String, timeout_ms: u64 },

	#[error("no element matches '{selector}'")]
	ElementNotFound { selector: String },

	#[error("'{selector}' matches {count} elements, expected exactly one")]
	ElementAmbiguous { selector: String, count: usize },

	#[error("assertion failed on '{selector}': {message}")]
	AssertionFailed { selector: String, message: String },

	/// A request matched no mock entry under a strict policy.
	#[error("no mock registered for {method} {url}")]
	MockMismatch { method: String, url: String },

	#[error("scenario exceeded its {budget_ms}ms budget")]
	BudgetExceeded { budget_ms: u64 },

	#[error(transparent)]
	Browser(#[from] smoke_runtime::Error),

	#[error("I/O error: {0}")]
	Io(#[from] std::io::Error),

	#[error("JSON error: {0}")]
	Json(#[from] serde_json::Error),

	#[error("invalid scenario: {0}")]
	InvalidScenario(String),
}

impl Error {
	pub fn assertion(selector: impl Into<String>, message: impl Into<String>) -> Self {
		Self::AssertionFailed {
			selector: selector.into(),
			message: message.into(),
		}
	}

	pub fn invalid(message: impl Into<String>) -> Self {
		Self::InvalidScenario(message.into())
	}

	pub fn kind(&self) -> FailureKind {
		match self {
			Self::Navigation { .. } => FailureKind::Navigation,
			Self::Timeout { .. } => FailureKind::Timeout,
			Self::ElementNotFound { .. } => FailureKind::ElementNotFound,
			Self::ElementAmbiguous { .. } => FailureKind::ElementAmbiguous,
			Self::AssertionFailed { .. } => FailureKind::AssertionFailed,
			Self::MockMismatch { .. } => FailureKind::MockMismatch,
			Self::BudgetExceeded { .. } => FailureKind::BudgetExceeded,
			Self::Browser(_) => FailureKind::Browser,
			Self::Io(_) | Self::Json(_) => FailureKind::Io,
			Self::InvalidScenario(_) => FailureKind::InvalidScenario,
		}
	}

	/// Terminal state a scenario stopped by this error ends in.
	pub fn disposition(&self) -> ScenarioState {
		self.kind().disposition()
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn action_level_errors_fail_the_scenario() {
		let failed = [
			Error::Timeout {
				what: "text=Ready".into(),
				timeout_ms: 100,
			},
			Error::ElementNotFound { selector: "#x".into() },
			Error::ElementAmbiguous {
				selector: "button".into(),
				count: 3,
			},
			Error::assertion("h1", "expected \"a\", got \"b\""),
		];
		for err in failed {
			assert_eq!(err.disposition(), ScenarioState::Failed, "{err}");
		}
	}

	#[test]
	fn infrastructure_errors_error_the_scenario() {
		let errored = [
			Error::Navigation {
				url: "http://localhost/".into(),
				message: "net::ERR_CONNECTION_REFUSED".into(),
			},
			Error::BudgetExceeded { budget_ms: 10 },
			Error::Browser(smoke_runtime::Error::ChannelClosed),
			Error::invalid("no actions"),
		];
		for err in errored {
			assert_eq!(err.disposition(), ScenarioState::Errored, "{err}");
		}
	}

	#[test]
	fn millis_saturates() {
		assert_eq!(millis(Duration::from_millis(1500)), 1500);
		assert_eq!(millis(Duration::MAX), u64::MAX);
	}

	#[test]
	fn messages_name_the_selector() {
		let err = Error::ElementAmbiguous {
			selector: "role=checkbox".into(),
			count: 2,
		};
		assert_eq!(err.to_string(), "'role=checkbox' matches 2 elements, expected exactly one");
	}
}
