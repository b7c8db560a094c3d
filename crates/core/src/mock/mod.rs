//! Route mock table.
//!
//! A [`RouteMockTable`] is an ordered list of `pattern -> responder`
//! entries consulted for every request the page issues. The first entry
//! whose pattern (and optional method) matches decides the outcome;
//! requests no entry claims follow the table's [`UnmatchedPolicy`].
//!
//! Tables are plain values. Every scenario run works on its own clone, and
//! dynamic responders are shared `Arc`s of pure functions, so resolving a
//! request never mutates anything.

mod matcher;

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde_json::Value;
pub use smoke_protocol::UnmatchedPolicy;
use tracing::{debug, warn};

pub use self::matcher::RoutePattern;
use crate::error::Error;

/// Error code used when a request is aborted without an explicit one.
pub const DEFAULT_ABORT_CODE: &str = "failed";

/// A canned HTTP response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MockResponse {
	status: u16,
	content_type: String,
	headers: Vec<(String, String)>,
	body: Vec<u8>,
}

impl MockResponse {
	pub fn bytes(content_type: impl Into<String>, body: impl Into<Vec<u8>>) -> Self {
		Self {
			status: 200,
			content_type: content_type.into(),
			headers: Vec::new(),
			body: body.into(),
		}
	}

	/// `200 application/json` with `value` serialized as the body.
	pub fn json(value: &Value) -> Self {
		Self::bytes("application/json", value.to_string())
	}

	pub fn text(body: impl Into<String>) -> Self {
		Self::bytes("text/plain", body.into())
	}

	pub fn html(body: impl Into<String>) -> Self {
		Self::bytes("text/html", body.into())
	}

	/// Empty `text/plain` response with the given status.
	pub fn status(status: u16) -> Self {
		Self::text("").with_status(status)
	}

	pub fn with_status(mut self, status: u16) -> Self {
		self.status = status;
		self
	}

	pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
		self.content_type = content_type.into();
		self
	}

	pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
		self.headers.push((name.into(), value.into()));
		self
	}

	pub fn status_code(&self) -> u16 {
		self.status
	}

	pub fn content_type(&self) -> &str {
		&self.content_type
	}

	pub fn body(&self) -> &[u8] {
		&self.body
	}

	/// Extra headers in insertion order. `content-type` is not included.
	pub fn headers(&self) -> &[(String, String)] {
		&self.headers
	}

	/// Case-insensitive header lookup; `content-type` included.
	pub fn header(&self, name: &str) -> Option<&str> {
		if name.eq_ignore_ascii_case("content-type") {
			return Some(&self.content_type);
		}
		self.headers.iter().find(|(k, _)| k.eq_ignore_ascii_case(name)).map(|(_, v)| v.as_str())
	}

	/// Body decoded as JSON, if it is JSON.
	pub fn json_body(&self) -> Option<Value> {
		serde_json::from_slice(&self.body).ok()
	}
}

/// The parts of an intercepted request responders may inspect.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InterceptedRequest {
	pub method: String,
	pub url: String,
	pub headers: Vec<(String, String)>,
	pub post_data: Option<Vec<u8>>,
}

impl InterceptedRequest {
	pub fn new(method: impl Into<String>, url: impl Into<String>) -> Self {
		Self {
			method: method.into(),
			url: url.into(),
			..Self::default()
		}
	}

	pub fn get(url: impl Into<String>) -> Self {
		Self::new("GET", url)
	}

	pub fn post_json(url: impl Into<String>, body: &Value) -> Self {
		Self::new("POST", url).with_body(body.to_string())
	}

	pub fn with_body(mut self, body: impl Into<Vec<u8>>) -> Self {
		self.post_data = Some(body.into());
		self
	}

	pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
		self.headers.push((name.into(), value.into()));
		self
	}

	/// First query-string value for `name`.
	pub fn query(&self, name: &str) -> Option<String> {
		let url = url::Url::parse(&self.url).ok()?;
		url.query_pairs().find(|(k, _)| k == name).map(|(_, v)| v.into_owned())
	}

	/// Request body parsed as JSON.
	pub fn json_body(&self) -> Option<Value> {
		serde_json::from_slice(self.post_data.as_deref()?).ok()
	}

	/// Parameter from the JSON body, falling back to the query string.
	pub fn param(&self, name: &str) -> Option<Value> {
		self.json_body()
			.and_then(|mut body| body.get_mut(name).map(Value::take))
			.filter(|value| !value.is_null())
			.or_else(|| self.query(name).map(Value::String))
	}

	/// Numeric parameter; numeric strings are accepted.
	pub fn param_u64(&self, name: &str) -> Option<u64> {
		match self.param(name)? {
			Value::Number(n) => n.as_u64(),
			Value::String(s) => s.trim().parse().ok(),
			_ => None,
		}
	}

	pub fn param_str(&self, name: &str) -> Option<String> {
		match self.param(name)? {
			Value::String(s) => Some(s),
			other => Some(other.to_string()),
		}
	}
}

/// Decides the outcome from the request. Must be a pure function.
pub type DynamicResponder = Arc<dyn Fn(&InterceptedRequest) -> Resolution + Send + Sync>;

/// How a matched request is answered.
#[derive(Clone)]
pub enum Responder {
	Static(MockResponse),
	Dynamic(DynamicResponder),
	/// Serves files from a local directory by the URL's last path segment.
	Directory(PathBuf),
	/// Lets the request reach the network.
	Passthrough,
	Abort(String),
}

impl Responder {
	/// Fulfills every request with a response computed from it.
	pub fn dynamic<F>(f: F) -> Self
	where
		F: Fn(&InterceptedRequest) -> MockResponse + Send + Sync + 'static,
	{
		Self::Dynamic(Arc::new(move |request| Resolution::Fulfill(f(request))))
	}

	/// Lets the request decide between fulfilling, passing through and
	/// aborting.
	pub fn routed<F>(f: F) -> Self
	where
		F: Fn(&InterceptedRequest) -> Resolution + Send + Sync + 'static,
	{
		Self::Dynamic(Arc::new(f))
	}

	pub fn abort() -> Self {
		Self::Abort(DEFAULT_ABORT_CODE.to_string())
	}

	fn respond(&self, request: &InterceptedRequest) -> Resolution {
		match self {
			Self::Static(response) => Resolution::Fulfill(response.clone()),
			Self::Dynamic(f) => f(request),
			Self::Directory(root) => serve_from_directory(root, &request.url),
			Self::Passthrough => Resolution::Passthrough,
			Self::Abort(code) => Resolution::Abort(code.clone()),
		}
	}
}

impl fmt::Debug for Responder {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Self::Static(response) => f.debug_tuple("Static").field(&response.status).finish(),
			Self::Dynamic(_) => f.write_str("Dynamic(..)"),
			Self::Directory(root) => f.debug_tuple("Directory").field(root).finish(),
			Self::Passthrough => f.write_str("Passthrough"),
			Self::Abort(code) => f.debug_tuple("Abort").field(code).finish(),
		}
	}
}

impl From<MockResponse> for Responder {
	fn from(response: MockResponse) -> Self {
		Self::Static(response)
	}
}

/// Outcome of resolving one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
	Fulfill(MockResponse),
	Passthrough,
	Abort(String),
}

#[derive(Debug, Clone)]
pub struct RouteEntry {
	pub pattern: RoutePattern,
	/// Restricts the entry to one HTTP method (case-insensitive).
	pub method: Option<String>,
	pub responder: Responder,
}

impl RouteEntry {
	pub fn matches(&self, request: &InterceptedRequest) -> bool {
		let method_ok = self.method.as_deref().is_none_or(|m| m.eq_ignore_ascii_case(&request.method));
		method_ok && self.pattern.is_match(&request.url)
	}
}

/// Ordered, first-match-wins table of route mocks.
#[derive(Debug, Clone, Default)]
pub struct RouteMockTable {
	entries: Vec<RouteEntry>,
	unmatched: UnmatchedPolicy,
}

impl RouteMockTable {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn with_unmatched(mut self, policy: UnmatchedPolicy) -> Self {
		self.unmatched = policy;
		self
	}

	pub fn set_unmatched(&mut self, policy: UnmatchedPolicy) {
		self.unmatched = policy;
	}

	pub fn unmatched(&self) -> UnmatchedPolicy {
		self.unmatched
	}

	/// Appends an entry. Earlier entries take precedence.
	pub fn register(&mut self, pattern: impl Into<RoutePattern>, responder: impl Into<Responder>) -> &mut Self {
		self.push(RouteEntry {
			pattern: pattern.into(),
			method: None,
			responder: responder.into(),
		})
	}

	pub fn register_method(&mut self, method: &str, pattern: impl Into<RoutePattern>, responder: impl Into<Responder>) -> &mut Self {
		self.push(RouteEntry {
			pattern: pattern.into(),
			method: Some(method.to_ascii_uppercase()),
			responder: responder.into(),
		})
	}

	pub fn push(&mut self, entry: RouteEntry) -> &mut Self {
		self.entries.push(entry);
		self
	}

	pub fn fulfill(&mut self, pattern: impl Into<RoutePattern>, response: MockResponse) -> &mut Self {
		self.register(pattern, Responder::Static(response))
	}

	/// `200 application/json` for every match.
	pub fn json(&mut self, pattern: impl Into<RoutePattern>, value: Value) -> &mut Self {
		self.fulfill(pattern, MockResponse::json(&value))
	}

	pub fn respond_with<F>(&mut self, pattern: impl Into<RoutePattern>, f: F) -> &mut Self
	where
		F: Fn(&InterceptedRequest) -> MockResponse + Send + Sync + 'static,
	{
		self.register(pattern, Responder::dynamic(f))
	}

	/// Like [`respond_with`](Self::respond_with), but `f` may also pass the
	/// request through or abort it.
	pub fn route_with<F>(&mut self, pattern: impl Into<RoutePattern>, f: F) -> &mut Self
	where
		F: Fn(&InterceptedRequest) -> Resolution + Send + Sync + 'static,
	{
		self.register(pattern, Responder::routed(f))
	}

	pub fn entries(&self) -> &[RouteEntry] {
		&self.entries
	}

	pub fn len(&self) -> usize {
		self.entries.len()
	}

	pub fn is_empty(&self) -> bool {
		self.entries.is_empty()
	}

	/// Decides how `request` is answered.
	pub fn resolve(&self, request: &InterceptedRequest) -> Resolution {
		if let Some(entry) = self.entries.iter().find(|entry| entry.matches(request)) {
			debug!(method = %request.method, url = %request.url, pattern = %entry.pattern, "route mock hit");
			return entry.responder.respond(request);
		}

		match self.unmatched {
			UnmatchedPolicy::Passthrough => Resolution::Passthrough,
			UnmatchedPolicy::Strict => {
				let mismatch = Error::MockMismatch {
					method: request.method.clone(),
					url: request.url.clone(),
				};
				warn!(method = %request.method, url = %request.url, "{mismatch}");
				Resolution::Fulfill(MockResponse::text(mismatch.to_string()).with_status(404))
			}
			UnmatchedPolicy::Abort => {
				debug!(method = %request.method, url = %request.url, "aborting unmatched request");
				Resolution::Abort(DEFAULT_ABORT_CODE.to_string())
			}
		}
	}
}

fn serve_from_directory(root: &Path, url: &str) -> Resolution {
	let Some(name) = last_path_segment(url) else {
		return Resolution::Abort(DEFAULT_ABORT_CODE.to_string());
	};
	let path = root.join(&name);
	match std::fs::read(&path) {
		Ok(body) => Resolution::Fulfill(MockResponse::bytes(content_type_for(&path), body)),
		Err(err) => {
			debug!(path = %path.display(), error = %err, "asset not found, aborting request");
			Resolution::Abort(DEFAULT_ABORT_CODE.to_string())
		}
	}
}

fn last_path_segment(url: &str) -> Option<String> {
	let parsed = url::Url::parse(url).ok()?;
	let segment = parsed.path_segments()?.next_back()?;
	if segment.is_empty() || segment == ".." || segment == "." {
		return None;
	}
	Some(segment.to_string())
}

/// Content type by file extension.
pub fn content_type_for(path: &Path) -> &'static str {
	let ext = path.extension().and_then(|e| e.to_str()).map(str::to_ascii_lowercase);
	match ext.as_deref() {
		Some("js" | "mjs") => "application/javascript",
		Some("css") => "text/css",
		Some("html" | "htm") => "text/html",
		Some("json") => "application/json",
		Some("svg") => "image/svg+xml",
		Some("png") => "image/png",
		Some("jpg" | "jpeg") => "image/jpeg",
		Some("woff2") => "font/woff2",
		Some("txt") => "text/plain",
		_ => "application/octet-stream",
	}
}
