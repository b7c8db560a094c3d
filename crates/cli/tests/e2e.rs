//! End-to-end runs against a real browser.
//!
//! These need a Playwright driver (see `smoke_runtime::driver`) and an
//! installed Chromium, so they are ignored by default:
//! `cargo test -p smoke-cli -- --ignored`. Every request is answered by the
//! scenario's own routes, so no web server is required.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

use serde_json::{Value, json};
use tempfile::TempDir;

const APP: &str = r#"<!doctype html>
<html>
<body>
<h1>Inventory</h1>
<button id="load">Load</button>
<ul id="items"></ul>
<script>
document.getElementById('load').addEventListener('click', async () => {
	const res = await fetch('/api/items');
	const items = await res.json();
	for (const item of items) {
		const li = document.createElement('li');
		li.textContent = item.name + ' (' + window.appData.nonce + ')';
		document.getElementById('items').appendChild(li);
	}
});
</script>
</body>
</html>"#;

fn run_smoke(dir: &Path, args: &[&str]) -> (i32, String, String) {
	let output = Command::new(env!("CARGO_BIN_EXE_smoke"))
		.current_dir(dir)
		.args(args)
		.output()
		.expect("failed to execute smoke");
	(
		output.status.code().unwrap_or(-1),
		String::from_utf8_lossy(&output.stdout).to_string(),
		String::from_utf8_lossy(&output.stderr).to_string(),
	)
}

fn scenario(dir: &Path, expected: &str) -> PathBuf {
	fs::write(dir.join("index.html"), APP).unwrap();
	let path = dir.join("inventory.json");
	let value = json!({
		"name": "inventory",
		"baseUrl": "http://inventory.test",
		"unmatched": "strict",
		"bootstrap": {"global": "appData", "nonce": "n-1"},
		"routes": [
			{"pattern": "**/api/items", "method": "GET", "fulfill": {"json": [{"name": "Widget"}]}},
			{"regex": "^http://inventory\\.test/$", "fulfill": {"contentType": "text/html", "bodyFile": "index.html"}}
		],
		"actions": [
			{"action": "navigate", "url": "/"},
			{"action": "click", "selector": "#load"},
			{"action": "waitForSelector", "selector": "#items li", "timeoutMs": 5000},
			{"action": "assertText", "selector": "#items li", "expected": expected}
		]
	});
	fs::write(&path, value.to_string()).unwrap();
	path
}

#[test]
#[ignore = "requires a Playwright driver and Chromium"]
fn mocked_app_passes() {
	let temp = TempDir::new().unwrap();
	scenario(temp.path(), "Widget (n-1)");

	let (code, stdout, stderr) = run_smoke(temp.path(), &["-f", "json", "--artifacts-dir", "out", "run", "inventory.json"]);
	assert_eq!(code, 0, "{stdout}\n{stderr}");
	let report: Value = serde_json::from_str(&stdout).unwrap();
	assert_eq!(report["summary"]["passed"], 1);
	assert!(temp.path().join("out").join("inventory.png").exists());
}

#[test]
#[ignore = "requires a Playwright driver and Chromium"]
fn failing_assertion_captures_screenshot() {
	let temp = TempDir::new().unwrap();
	scenario(temp.path(), "Gadget (n-1)");

	let (code, stdout, _) = run_smoke(temp.path(), &["-f", "json", "--artifacts-dir", "out", "run", "inventory.json"]);
	assert_eq!(code, 1);
	let report: Value = serde_json::from_str(&stdout).unwrap();
	assert_eq!(report["results"][0]["state"], "failed");
	assert_eq!(report["results"][0]["errorKind"], "assertionFailed");
	assert!(temp.path().join("out").join("inventory-failure.png").exists());
}
