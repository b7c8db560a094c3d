use std::path::PathBuf;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, CliError>;

/// Exit status for configuration and usage problems. Scenario failures
/// exit with 1.
pub const EXIT_USAGE: i32 = 2;

#[derive(Debug, Error)]
pub enum CliError {
	#[error("config {}: {message}", path.display())]
	Config { path: PathBuf, message: String },

	#[error("invalid {name}: {message}")]
	Setting { name: &'static str, message: String },

	#[error("unknown scenario '{name}' (available: {available})")]
	UnknownScenario { name: String, available: String },

	#[error("no scenarios to run")]
	NoScenarios,

	#[error("{}: {source}", path.display())]
	ScenarioFile {
		path: PathBuf,
		#[source]
		source: smoke::Error,
	},

	#[error(transparent)]
	Smoke(#[from] smoke::Error),

	#[error(transparent)]
	Io(#[from] std::io::Error),

	#[error(transparent)]
	Json(#[from] serde_json::Error),
}

impl CliError {
	pub fn setting(name: &'static str, message: impl Into<String>) -> Self {
		Self::Setting { name, message: message.into() }
	}
}
