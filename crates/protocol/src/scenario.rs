//! JSON scenario file format.
//!
//! A scenario file holds one [`ScenarioSpec`] object or an array of them.
//! Paths inside a file (`bodyFile`, `directory`) are relative to the file's
//! directory; the loader in `smoke-core` resolves them.

use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::action::Action;
use crate::types::{BootstrapPayload, UnmatchedPolicy, Viewport};

/// One scenario as written on disk.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ScenarioSpec {
	pub name: String,
	#[serde(default, skip_serializing_if = "String::is_empty")]
	pub description: String,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub base_url: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub viewport: Option<Viewport>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub bootstrap: Option<BootstrapPayload>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub unmatched: Option<UnmatchedPolicy>,
	/// Wall-clock budget for the whole scenario.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub timeout_ms: Option<u64>,
	#[serde(default)]
	pub routes: Vec<RouteSpec>,
	pub actions: Vec<Action>,
}

/// A mock table entry: one matcher and exactly one responder.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct RouteSpec {
	/// Glob (`**/content?*`) or exact URL.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub pattern: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub regex: Option<String>,
	/// Restricts the entry to one HTTP method.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub method: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub fulfill: Option<ResponseSpec>,
	/// Serve files from this directory by last path segment.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub directory: Option<PathBuf>,
	#[serde(default, skip_serializing_if = "std::ops::Not::not")]
	pub passthrough: bool,
	/// Abort with this Playwright error code (e.g. `failed`, `timedout`).
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub abort: Option<String>,
}

/// Canned response body and metadata.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ResponseSpec {
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub status: Option<u16>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub content_type: Option<String>,
	#[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
	pub headers: BTreeMap<String, String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub body: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub json: Option<Value>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub body_file: Option<PathBuf>,
}
