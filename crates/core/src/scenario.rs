//! Runnable scenarios and loading them from JSON files.
//!
//! A scenario file holds one [`ScenarioSpec`] object or an array of them.
//! Loading validates route entries, compiles their patterns into a
//! [`RouteMockTable`] and resolves relative paths (`directory`, `bodyFile`)
//! against the directory the file lives in.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde_json::Value;
use smoke_protocol::{Action, BootstrapPayload, ResponseSpec, RouteSpec, ScenarioSpec, UnmatchedPolicy, Viewport};

use crate::error::{Error, Result};
use crate::mock::{MockResponse, Responder, RouteEntry, RouteMockTable, RoutePattern};

/// One independently runnable verification flow.
#[derive(Debug, Clone)]
pub struct Scenario {
	pub name: String,
	pub description: String,
	pub base_url: Option<String>,
	pub viewport: Option<Viewport>,
	pub bootstrap: Option<BootstrapPayload>,
	/// Unset means the environment (or the table default) decides.
	pub unmatched: Option<UnmatchedPolicy>,
	/// Wall-clock budget for the whole scenario.
	pub timeout: Option<Duration>,
	pub mocks: RouteMockTable,
	pub actions: Vec<Action>,
}

impl Scenario {
	pub fn new(name: impl Into<String>) -> Self {
		Self {
			name: name.into(),
			description: String::new(),
			base_url: None,
			viewport: None,
			bootstrap: None,
			unmatched: None,
			timeout: None,
			mocks: RouteMockTable::new(),
			actions: Vec::new(),
		}
	}

	pub fn with_description(mut self, description: impl Into<String>) -> Self {
		self.description = description.into();
		self
	}

	pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
		self.base_url = Some(base_url.into());
		self
	}

	pub fn with_viewport(mut self, viewport: Viewport) -> Self {
		self.viewport = Some(viewport);
		self
	}

	pub fn with_bootstrap(mut self, bootstrap: BootstrapPayload) -> Self {
		self.bootstrap = Some(bootstrap);
		self
	}

	pub fn with_unmatched(mut self, policy: UnmatchedPolicy) -> Self {
		self.unmatched = Some(policy);
		self
	}

	pub fn with_timeout(mut self, timeout: Duration) -> Self {
		self.timeout = Some(timeout);
		self
	}

	pub fn with_mocks(mut self, mocks: RouteMockTable) -> Self {
		self.mocks = mocks;
		self
	}

	pub fn action(mut self, action: Action) -> Self {
		self.actions.push(action);
		self
	}

	pub fn actions(mut self, actions: impl IntoIterator<Item = Action>) -> Self {
		self.actions.extend(actions);
		self
	}

	/// File-system friendly form of the name, used for artifact files.
	pub fn slug(&self) -> String {
		slugify(&self.name)
	}

	/// Builds a scenario from its file form. Relative paths resolve
	/// against `base_dir`.
	pub fn from_spec(spec: ScenarioSpec, base_dir: &Path) -> Result<Self> {
		if spec.name.trim().is_empty() {
			return Err(Error::invalid("scenario name must not be empty"));
		}
		if spec.timeout_ms == Some(0) {
			return Err(Error::invalid(format!("{}: timeoutMs must be positive", spec.name)));
		}
		validate_actions(&spec.name, &spec.actions)?;

		let mut mocks = RouteMockTable::new();
		for (index, route) in spec.routes.into_iter().enumerate() {
			let entry = route_entry(route, base_dir).map_err(|err| {
				let detail = match err {
					Error::InvalidScenario(message) => message,
					other => other.to_string(),
				};
				Error::invalid(format!("{}: route #{}: {detail}", spec.name, index + 1))
			})?;
			mocks.push(entry);
		}

		Ok(Self {
			name: spec.name,
			description: spec.description,
			base_url: spec.base_url,
			viewport: spec.viewport,
			bootstrap: spec.bootstrap,
			unmatched: spec.unmatched,
			timeout: spec.timeout_ms.map(Duration::from_millis),
			mocks,
			actions: spec.actions,
		})
	}
}

/// Lowercase ASCII alphanumerics with single dashes between words.
pub fn slugify(name: &str) -> String {
	let mut slug = String::with_capacity(name.len());
	for c in name.chars() {
		if c.is_ascii_alphanumeric() {
			slug.push(c.to_ascii_lowercase());
		} else if !slug.is_empty() && !slug.ends_with('-') {
			slug.push('-');
		}
	}
	while slug.ends_with('-') {
		slug.pop();
	}
	if slug.is_empty() { "scenario".to_string() } else { slug }
}

fn validate_actions(name: &str, actions: &[Action]) -> Result<()> {
	if actions.is_empty() {
		return Err(Error::invalid(format!("{name}: scenario has no actions")));
	}
	for (index, action) in actions.iter().enumerate() {
		if action.selector().is_some_and(|s| s.trim().is_empty()) {
			return Err(Error::invalid(format!("{name}: action #{} ({}) has an empty selector", index + 1, action.kind())));
		}
		if matches!(action, Action::Navigate { url } if url.trim().is_empty()) {
			return Err(Error::invalid(format!("{name}: action #{} has an empty url", index + 1)));
		}
	}
	Ok(())
}

fn route_entry(route: RouteSpec, base_dir: &Path) -> Result<RouteEntry> {
	let pattern = match (route.pattern, route.regex) {
		(Some(glob), None) => RoutePattern::glob(&glob),
		(None, Some(re)) => RoutePattern::regex(&re).map_err(|e| Error::invalid(format!("invalid regex: {e}")))?,
		(None, None) => return Err(Error::invalid("needs a `pattern` or a `regex`")),
		(Some(_), Some(_)) => return Err(Error::invalid("`pattern` and `regex` are mutually exclusive")),
	};

	let mut responders = Vec::new();
	if let Some(fulfill) = route.fulfill {
		responders.push(Responder::Static(response(fulfill, base_dir)?));
	}
	if let Some(dir) = route.directory {
		responders.push(Responder::Directory(resolve_path(base_dir, dir)));
	}
	if route.passthrough {
		responders.push(Responder::Passthrough);
	}
	if let Some(code) = route.abort {
		responders.push(Responder::Abort(code));
	}
	let responder = match responders.len() {
		1 => responders.remove(0),
		0 => return Err(Error::invalid("needs one of `fulfill`, `directory`, `passthrough`, `abort`")),
		_ => return Err(Error::invalid("`fulfill`, `directory`, `passthrough` and `abort` are mutually exclusive")),
	};

	Ok(RouteEntry {
		pattern,
		method: route.method.map(|m| m.to_ascii_uppercase()),
		responder,
	})
}

fn response(spec: ResponseSpec, base_dir: &Path) -> Result<MockResponse> {
	let bodies = usize::from(spec.body.is_some()) + usize::from(spec.json.is_some()) + usize::from(spec.body_file.is_some());
	if bodies > 1 {
		return Err(Error::invalid("`body`, `json` and `bodyFile` are mutually exclusive"));
	}

	let mut response = if let Some(json) = spec.json {
		MockResponse::json(&json)
	} else if let Some(file) = spec.body_file {
		let path = resolve_path(base_dir, file);
		let bytes = std::fs::read(&path).map_err(|e| Error::invalid(format!("cannot read {}: {e}", path.display())))?;
		MockResponse::bytes(crate::mock::content_type_for(&path), bytes)
	} else {
		MockResponse::text(spec.body.unwrap_or_default())
	};

	if let Some(status) = spec.status {
		if !(100..=599).contains(&status) {
			return Err(Error::invalid(format!("status {status} is not a valid HTTP status")));
		}
		response = response.with_status(status);
	}
	if let Some(content_type) = spec.content_type {
		response = response.with_content_type(content_type);
	}
	for (name, value) in spec.headers {
		response = response.with_header(name, value);
	}
	Ok(response)
}

fn resolve_path(base_dir: &Path, path: PathBuf) -> PathBuf {
	if path.is_absolute() { path } else { base_dir.join(path) }
}

/// Parses scenario JSON: a single object or an array of objects.
pub fn parse_scenarios(source: &str, base_dir: &Path) -> Result<Vec<Scenario>> {
	let value: Value = serde_json::from_str(source)?;
	let specs: Vec<ScenarioSpec> = match value {
		Value::Array(_) => serde_json::from_value(value)?,
		other => vec![serde_json::from_value(other)?],
	};
	specs.into_iter().map(|spec| Scenario::from_spec(spec, base_dir)).collect()
}

/// Loads every scenario in `path`.
pub fn load_file(path: &Path) -> Result<Vec<Scenario>> {
	let source = std::fs::read_to_string(path)?;
	let base_dir = path.parent().unwrap_or_else(|| Path::new("."));
	parse_scenarios(&source, base_dir).map_err(|err| match err {
		Error::InvalidScenario(message) => Error::InvalidScenario(format!("{}: {message}", path.display())),
		Error::Json(e) => Error::InvalidScenario(format!("{}: {e}", path.display())),
		other => other,
	})
}

#[cfg(test)]
mod tests;
