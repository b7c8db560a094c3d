//! Playwright driver process lifecycle.

use std::process::Stdio;
use std::time::Duration;

use tokio::process::{Child, ChildStdin, ChildStdout, Command};

use crate::driver::get_driver_executable;
use crate::error::{Error, Result};

/// Environment variables forwarded to the driver when set.
const PASSTHROUGH_ENV: &[&str] = &["PLAYWRIGHT_BROWSERS_PATH", "PLAYWRIGHT_SKIP_BROWSER_DOWNLOAD"];

/// The `node cli.js run-driver` child process.
#[derive(Debug)]
pub struct PlaywrightServer {
	process: Child,
}

impl PlaywrightServer {
	/// Locates and spawns the driver with piped stdio.
	///
	/// # Errors
	///
	/// Returns [`Error::ServerNotFound`] if the driver cannot be located and
	/// [`Error::LaunchFailed`] if the process fails to start or exits at once.
	pub async fn launch() -> Result<Self> {
		let (node_exe, cli_js) = get_driver_executable()?;

		let mut cmd = Command::new(&node_exe);
		cmd.arg(&cli_js)
			.arg("run-driver")
			.env("PW_LANG_NAME", "rust")
			.env("PW_LANG_NAME_VERSION", env!("CARGO_PKG_RUST_VERSION"))
			.env("PW_CLI_DISPLAY_VERSION", env!("CARGO_PKG_VERSION"))
			.stdin(Stdio::piped())
			.stdout(Stdio::piped())
			.stderr(Stdio::inherit())
			.kill_on_drop(true);

		for key in PASSTHROUGH_ENV {
			if let Some(value) = std::env::var_os(key) {
				cmd.env(key, value);
			}
		}

		let mut process = cmd.spawn().map_err(|e| Error::LaunchFailed(format!("failed to spawn {}: {e}", node_exe.display())))?;

		tokio::time::sleep(Duration::from_millis(100)).await;
		match process.try_wait() {
			Ok(Some(status)) => Err(Error::LaunchFailed(format!("driver exited immediately with status {status}"))),
			Ok(None) => {
				tracing::debug!(pid = process.id(), "Playwright driver started");
				Ok(Self { process })
			}
			Err(e) => Err(Error::LaunchFailed(format!("failed to check driver status: {e}"))),
		}
	}

	/// Takes the driver's stdin and stdout for the transport.
	pub fn take_stdio(&mut self) -> Result<(ChildStdin, ChildStdout)> {
		let stdin = self.process.stdin.take().ok_or_else(|| Error::TransportError("driver stdin already taken".to_string()))?;
		let stdout = self.process.stdout.take().ok_or_else(|| Error::TransportError("driver stdout already taken".to_string()))?;
		Ok((stdin, stdout))
	}

	/// Closes the pipes and waits briefly for the driver to exit, then kills it.
	pub async fn shutdown(mut self) -> Result<()> {
		drop(self.process.stdin.take());
		drop(self.process.stdout.take());

		match tokio::time::timeout(Duration::from_secs(2), self.process.wait()).await {
			Ok(Ok(status)) => {
				tracing::debug!(%status, "Playwright driver exited");
				Ok(())
			}
			Ok(Err(e)) => Err(Error::Io(e)),
			Err(_) => self.kill().await,
		}
	}

	/// Force kills the driver process.
	pub async fn kill(mut self) -> Result<()> {
		self.process.kill().await.map_err(|e| Error::LaunchFailed(format!("failed to kill driver: {e}")))?;
		let _ = tokio::time::timeout(Duration::from_millis(500), self.process.wait()).await;
		Ok(())
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[tokio::test]
	#[ignore = "requires Node.js and the Playwright driver"]
	async fn launch_and_shutdown() {
		let mut server = PlaywrightServer::launch().await.unwrap();
		server.take_stdio().unwrap();
		assert!(server.take_stdio().is_err());
		server.shutdown().await.unwrap();
	}
}
