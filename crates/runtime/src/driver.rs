//! Playwright driver discovery.
//!
//! The harness does not bundle a driver. It looks for a Node.js executable
//! and Playwright's `cli.js` in this order:
//!
//! 1. `PLAYWRIGHT_NODE_EXE` + `PLAYWRIGHT_CLI_JS`
//! 2. `PLAYWRIGHT_DRIVER_PATH` (a driver directory with `node` and `package/cli.js`)
//! 3. global npm installation (`npm root -g`)
//! 4. local npm installation (`npm root`)
//!
//! A candidate whose node binary can't run (e.g. a dynamically linked node
//! on NixOS) is retried with the node found on `PATH`.

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use tracing::{debug, warn};

use crate::error::{Error, Result};

/// Returns `(node_executable, cli_js)` for the Playwright driver.
///
/// # Errors
///
/// Returns [`Error::ServerNotFound`] if no candidate location holds a runnable driver.
pub fn get_driver_executable() -> Result<(PathBuf, PathBuf)> {
	locate_driver(|key| std::env::var_os(key), find_node_executable)
}

/// Discovery with injectable environment lookup and node fallback.
pub fn locate_driver<E, N>(env: E, find_node: N) -> Result<(PathBuf, PathBuf)>
where
	E: Fn(&str) -> Option<OsString>,
	N: Fn() -> Result<PathBuf>,
{
	let candidates: [(&str, Box<dyn Fn() -> Option<(PathBuf, PathBuf)> + '_>); 4] = [
		("PLAYWRIGHT_NODE_EXE/PLAYWRIGHT_CLI_JS", Box::new(|| try_node_cli_env(&env))),
		("PLAYWRIGHT_DRIVER_PATH", Box::new(|| try_driver_path_env(&env))),
		("npm global", Box::new(|| try_npm_root(&["root", "-g"], &find_node))),
		("npm local", Box::new(|| try_npm_root(&["root"], &find_node))),
	];

	for (label, probe) in candidates {
		let Some((node, cli)) = probe() else {
			continue;
		};
		if let Some(paths) = resolve_candidate_with_fallback(label, node, cli, &find_node) {
			debug!(source = label, node = %paths.0.display(), cli = %paths.1.display(), "using Playwright driver");
			return Ok(paths);
		}
	}

	Err(Error::ServerNotFound)
}

fn resolve_candidate_with_fallback<F>(label: &str, node: PathBuf, cli: PathBuf, find_node: F) -> Option<(PathBuf, PathBuf)>
where
	F: Fn() -> Result<PathBuf>,
{
	let usable = node_is_usable(&node);
	debug!(source = label, node = %node.display(), cli = %cli.display(), usable, "driver candidate");
	if usable {
		return Some((node, cli));
	}

	warn!(
		source = label,
		node = %node.display(),
		"Playwright driver candidate node is not runnable; trying fallback node"
	);

	let fallback = find_node().ok()?;
	if fallback == node || !node_is_usable(&fallback) {
		return None;
	}
	warn!(source = label, node = %fallback.display(), "using fallback node executable for Playwright CLI");
	Some((fallback, cli))
}

fn try_node_cli_env<E>(env: &E) -> Option<(PathBuf, PathBuf)>
where
	E: Fn(&str) -> Option<OsString>,
{
	let node = PathBuf::from(env("PLAYWRIGHT_NODE_EXE")?);
	let cli = PathBuf::from(env("PLAYWRIGHT_CLI_JS")?);
	(node.exists() && cli.exists()).then_some((node, cli))
}

fn try_driver_path_env<E>(env: &E) -> Option<(PathBuf, PathBuf)>
where
	E: Fn(&str) -> Option<OsString>,
{
	let dir = PathBuf::from(env("PLAYWRIGHT_DRIVER_PATH")?);
	let node = dir.join(if cfg!(windows) { "node.exe" } else { "node" });
	let cli = dir.join("package").join("cli.js");
	(node.exists() && cli.exists()).then_some((node, cli))
}

fn try_npm_root<N>(args: &[&str], find_node: &N) -> Option<(PathBuf, PathBuf)>
where
	N: Fn() -> Result<PathBuf>,
{
	let output = Command::new("npm").args(args).stderr(Stdio::null()).output().ok()?;
	if !output.status.success() {
		return None;
	}
	let root = PathBuf::from(String::from_utf8_lossy(&output.stdout).trim());
	let cli = find_cli_in_node_modules(&root)?;
	Some((find_node().ok()?, cli))
}

/// `cli.js` of a `playwright` or `@playwright/test` package under `node_modules`.
fn find_cli_in_node_modules(node_modules: &Path) -> Option<PathBuf> {
	[node_modules.join("playwright"), node_modules.join("@playwright").join("test")]
		.into_iter()
		.map(|dir| dir.join("cli.js"))
		.find(|cli| cli.exists())
}

fn node_is_usable(node: &Path) -> bool {
	Command::new(node)
		.arg("--version")
		.stdout(Stdio::null())
		.stderr(Stdio::null())
		.status()
		.map(|status| status.success())
		.unwrap_or(false)
}

/// Finds `node` on `PATH` or in common install locations.
fn find_node_executable() -> Result<PathBuf> {
	let which_cmd = if cfg!(windows) { "where" } else { "which" };

	let on_path = Command::new(which_cmd)
		.arg("node")
		.output()
		.ok()
		.filter(|output| output.status.success())
		.and_then(|output| {
			let stdout = String::from_utf8_lossy(&output.stdout);
			stdout.lines().map(str::trim).find(|l| !l.is_empty()).map(PathBuf::from)
		});
	if let Some(path) = on_path.filter(|p| p.exists()) {
		return Ok(path);
	}

	let common_locations: &[&str] = if cfg!(windows) {
		&["C:\\Program Files\\nodejs\\node.exe", "C:\\Program Files (x86)\\nodejs\\node.exe"]
	} else {
		&["/usr/local/bin/node", "/usr/bin/node", "/opt/homebrew/bin/node", "/opt/local/bin/node"]
	};

	common_locations
		.iter()
		.map(PathBuf::from)
		.find(|p| p.exists())
		.ok_or_else(|| Error::LaunchFailed("Node.js executable not found. Install Node.js or set PLAYWRIGHT_NODE_EXE.".to_string()))
}
