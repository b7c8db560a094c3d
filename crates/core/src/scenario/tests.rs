use serde_json::json;
use tempfile::TempDir;

use super::*;
use crate::mock::{InterceptedRequest, Resolution};

fn parse(value: serde_json::Value, dir: &Path) -> Result<Vec<Scenario>> {
	parse_scenarios(&value.to_string(), dir)
}

#[test]
fn loads_single_object_with_routes() {
	let dir = TempDir::new().unwrap();
	std::fs::write(dir.path().join("products.json"), r#"{"items":[]}"#).unwrap();

	let scenarios = parse(
		json!({
			"name": "Settings Page",
			"baseUrl": "http://localhost:8080",
			"timeoutMs": 30000,
			"routes": [
				{"pattern": "**/products", "fulfill": {"bodyFile": "products.json"}},
				{"pattern": "**/save", "method": "post", "fulfill": {"status": 201, "json": {"ok": true}, "headers": {"x-mock": "1"}}},
				{"regex": "analytics", "abort": "blockedbyclient"}
			],
			"actions": [
				{"action": "navigate", "url": "/settings"},
				{"action": "assertVisible", "selector": "h1"}
			]
		}),
		dir.path(),
	)
	.unwrap();

	assert_eq!(scenarios.len(), 1);
	let scenario = &scenarios[0];
	assert_eq!(scenario.slug(), "settings-page");
	assert_eq!(scenario.timeout, Some(Duration::from_secs(30)));
	assert_eq!(scenario.mocks.len(), 3);
	assert_eq!(scenario.mocks.entries()[1].method.as_deref(), Some("POST"));

	match scenario.mocks.resolve(&InterceptedRequest::get("http://localhost:8080/api/products")) {
		Resolution::Fulfill(response) => {
			assert_eq!(response.content_type(), "application/json");
			assert_eq!(response.body(), br#"{"items":[]}"#);
		}
		other => panic!("expected body file, got {other:?}"),
	}
	match scenario.mocks.resolve(&InterceptedRequest::new("POST", "http://localhost:8080/api/save")) {
		Resolution::Fulfill(response) => {
			assert_eq!(response.status_code(), 201);
			assert_eq!(response.header("x-mock"), Some("1"));
		}
		other => panic!("expected json response, got {other:?}"),
	}
	assert_eq!(
		scenario.mocks.resolve(&InterceptedRequest::get("https://cdn.example/analytics.js")),
		Resolution::Abort("blockedbyclient".to_string())
	);
}

#[test]
fn loads_array_of_scenarios() {
	let dir = TempDir::new().unwrap();
	let path = dir.path().join("suite.json");
	std::fs::write(
		&path,
		json!([
			{"name": "a", "actions": [{"action": "navigate", "url": "/"}]},
			{"name": "b", "unmatched": "strict", "actions": [{"action": "pause", "ms": 10}]}
		])
		.to_string(),
	)
	.unwrap();

	let scenarios = load_file(&path).unwrap();
	let names: Vec<_> = scenarios.iter().map(|s| s.name.as_str()).collect();
	assert_eq!(names, ["a", "b"]);
	assert_eq!(scenarios[1].unmatched, Some(UnmatchedPolicy::Strict));
}

#[test]
fn directory_paths_resolve_against_file() {
	let dir = TempDir::new().unwrap();
	let scenarios = parse(
		json!({"name": "assets", "routes": [{"pattern": "**/*.js", "directory": "dist/assets"}], "actions": [{"action": "navigate", "url": "/"}]}),
		dir.path(),
	)
	.unwrap();
	match &scenarios[0].mocks.entries()[0].responder {
		Responder::Directory(root) => assert_eq!(root, &dir.path().join("dist/assets")),
		other => panic!("expected directory responder, got {other:?}"),
	}
}

#[test]
fn rejects_invalid_routes() {
	let dir = TempDir::new().unwrap();
	let cases = [
		(json!({"fulfill": {"body": "x"}}), "needs a `pattern` or a `regex`"),
		(json!({"pattern": "**/a", "regex": "a", "passthrough": true}), "mutually exclusive"),
		(json!({"pattern": "**/a"}), "needs one of"),
		(json!({"pattern": "**/a", "passthrough": true, "abort": "failed"}), "mutually exclusive"),
		(json!({"regex": "(", "passthrough": true}), "invalid regex"),
		(json!({"pattern": "**/a", "fulfill": {"body": "x", "json": {}}}), "mutually exclusive"),
		(json!({"pattern": "**/a", "fulfill": {"status": 42}}), "not a valid HTTP status"),
		(json!({"pattern": "**/a", "fulfill": {"bodyFile": "missing.json"}}), "cannot read"),
	];

	for (route, expected) in cases {
		let err = parse(json!({"name": "bad", "routes": [route], "actions": [{"action": "pause", "ms": 1}]}), dir.path()).unwrap_err();
		let message = err.to_string();
		assert!(matches!(err, Error::InvalidScenario(_)), "{message}");
		assert!(message.contains("route #1") && message.contains(expected), "{message}");
	}
}

#[test]
fn rejects_invalid_scenarios() {
	let dir = TempDir::new().unwrap();
	assert!(parse(json!({"name": " ", "actions": [{"action": "pause", "ms": 1}]}), dir.path()).is_err());
	assert!(parse(json!({"name": "empty", "actions": []}), dir.path()).is_err());
	assert!(parse(json!({"name": "t", "timeoutMs": 0, "actions": [{"action": "pause", "ms": 1}]}), dir.path()).is_err());
	assert!(parse(json!({"name": "sel", "actions": [{"action": "click", "selector": ""}]}), dir.path()).is_err());
	assert!(parse(json!({"name": "nav", "actions": [{"action": "navigate", "url": ""}]}), dir.path()).is_err());
	assert!(parse(json!({"name": "typo", "actions": [{"action": "clik", "selector": "a"}]}), dir.path()).is_err());
}

#[test]
fn load_file_prefixes_errors_with_path() {
	let dir = TempDir::new().unwrap();
	let path = dir.path().join("broken.json");
	std::fs::write(&path, "{ not json").unwrap();
	let err = load_file(&path).unwrap_err();
	assert!(matches!(err, Error::InvalidScenario(ref m) if m.contains("broken.json")), "{err}");

	let missing = load_file(&dir.path().join("nope.json")).unwrap_err();
	assert!(matches!(missing, Error::Io(_)));
}

#[test]
fn slugs() {
	assert_eq!(slugify("Bulk Optimize: rate limit!"), "bulk-optimize-rate-limit");
	assert_eq!(slugify("--"), "scenario");
	assert_eq!(slugify("content-enhancer"), "content-enhancer");
}
