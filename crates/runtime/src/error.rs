//! Error types for the Playwright runtime.

use thiserror::Error;

/// Result type alias for runtime operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while talking to the Playwright driver.
#[derive(Debug, Error)]
pub enum Error {
	/// Playwright driver was not found.
	#[error("Playwright driver not found. Install with: npm install -g playwright, or set PLAYWRIGHT_DRIVER_PATH")]
	ServerNotFound,

	/// Failed to launch the driver process.
	#[error("Failed to launch Playwright driver: {0}. Check that Node.js is installed.")]
	LaunchFailed(String),

	/// Stdio pipe failure.
	#[error("Transport error: {0}")]
	TransportError(String),

	/// Malformed or unexpected JSON-RPC traffic.
	#[error("Protocol error: {0}")]
	ProtocolError(String),

	/// Error reported by the driver for a request.
	#[error("{name}: {message}")]
	Remote {
		/// Error type name (e.g. "TimeoutError", "TargetClosedError")
		name: String,
		message: String,
		/// JavaScript stack trace from the driver, if any
		stack: Option<String>,
	},

	#[error("I/O error: {0}")]
	Io(#[from] std::io::Error),

	#[error("JSON error: {0}")]
	Json(#[from] serde_json::Error),

	#[error("Timeout: {0}")]
	Timeout(String),

	/// Target was closed (browser, context, or page).
	#[error("Target closed: cannot use closed {target_type}. {context}")]
	TargetClosed { target_type: String, context: String },

	/// GUID missing from the object registry.
	#[error("Object not found: {0}")]
	ObjectNotFound(String),

	/// Connection shut down while a request was in flight.
	#[error("Channel closed unexpectedly")]
	ChannelClosed,
}

impl Error {
	/// Returns the error name if this is a remote error.
	pub fn error_name(&self) -> Option<&str> {
		match self {
			Error::Remote { name, .. } => Some(name),
			_ => None,
		}
	}

	pub fn is_timeout(&self) -> bool {
		match self {
			Error::Timeout(_) => true,
			Error::Remote { name, .. } => name == "TimeoutError",
			_ => false,
		}
	}

	pub fn is_target_closed(&self) -> bool {
		match self {
			Error::TargetClosed { .. } | Error::ChannelClosed => true,
			Error::Remote { name, .. } => name == "TargetClosedError",
			_ => false,
		}
	}
}
