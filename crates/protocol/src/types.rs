//! Primitive values shared by scenario files, configuration and the driver.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Window global the host application reads its bootstrap data from.
pub const DEFAULT_BOOTSTRAP_GLOBAL: &str = "woosuiteData";

/// Viewport dimensions for a browser context.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Viewport {
	/// Page width in pixels
	pub width: u32,
	/// Page height in pixels
	pub height: u32,
}

impl Viewport {
	pub const fn new(width: u32, height: u32) -> Self {
		Self { width, height }
	}
}

impl Default for Viewport {
	fn default() -> Self {
		Self::new(1280, 800)
	}
}

impl fmt::Display for Viewport {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}x{}", self.width, self.height)
	}
}

impl FromStr for Viewport {
	type Err = String;

	/// Parses `WIDTHxHEIGHT`, e.g. `1280x800`.
	fn from_str(s: &str) -> Result<Self, Self::Err> {
		let (w, h) = s
			.trim()
			.split_once(['x', 'X'])
			.ok_or_else(|| format!("invalid viewport '{s}': expected WIDTHxHEIGHT"))?;
		let parse = |part: &str| {
			part.trim()
				.parse::<u32>()
				.ok()
				.filter(|v| *v > 0)
				.ok_or_else(|| format!("invalid viewport '{s}': '{part}' is not a positive integer"))
		};
		Ok(Self::new(parse(w)?, parse(h)?))
	}
}

/// Browser engine to launch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BrowserKind {
	#[default]
	Chromium,
	Firefox,
	Webkit,
}

impl BrowserKind {
	pub fn as_str(self) -> &'static str {
		match self {
			Self::Chromium => "chromium",
			Self::Firefox => "firefox",
			Self::Webkit => "webkit",
		}
	}
}

impl fmt::Display for BrowserKind {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

/// What happens to an intercepted request no mock entry matches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UnmatchedPolicy {
	/// Let the request reach the network.
	#[default]
	Passthrough,
	/// Answer with a synthetic 404 describing the mismatch.
	Strict,
	/// Fail the request with a network error.
	Abort,
}

/// How JavaScript dialogs (`alert`, `confirm`, `prompt`) are answered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DialogPolicy {
	#[default]
	Accept,
	Dismiss,
}

/// Global configuration object injected before any page script runs.
///
/// Rendered by [`init_script`](Self::init_script) to
/// `window["<global>"] = {...};`. Known keys are typed; anything else the
/// host application expects goes in `extra` and is merged into the object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BootstrapPayload {
	/// Name of the window property to assign.
	#[serde(default = "default_global")]
	pub global: String,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub api_url: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub nonce: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub home_url: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub root: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub api_key: Option<String>,
	#[serde(flatten)]
	pub extra: Map<String, Value>,
}

fn default_global() -> String {
	DEFAULT_BOOTSTRAP_GLOBAL.to_string()
}

impl Default for BootstrapPayload {
	fn default() -> Self {
		Self {
			global: default_global(),
			api_url: None,
			nonce: None,
			home_url: None,
			root: None,
			api_key: None,
			extra: Map::new(),
		}
	}
}

impl BootstrapPayload {
	pub fn new(api_url: impl Into<String>, nonce: impl Into<String>, home_url: impl Into<String>) -> Self {
		Self {
			api_url: Some(api_url.into()),
			nonce: Some(nonce.into()),
			home_url: Some(home_url.into()),
			..Self::default()
		}
	}

	pub fn with_root(mut self, root: impl Into<String>) -> Self {
		self.root = Some(root.into());
		self
	}

	pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
		self.api_key = Some(key.into());
		self
	}

	pub fn with_extra(mut self, key: impl Into<String>, value: Value) -> Self {
		self.extra.insert(key.into(), value);
		self
	}

	/// Layers `other` on top of `self`: set fields and extra keys in `other` win.
	pub fn merged(mut self, other: &BootstrapPayload) -> Self {
		if other.global != DEFAULT_BOOTSTRAP_GLOBAL {
			self.global = other.global.clone();
		}
		let pick = |mine: &mut Option<String>, theirs: &Option<String>| {
			if theirs.is_some() {
				mine.clone_from(theirs);
			}
		};
		pick(&mut self.api_url, &other.api_url);
		pick(&mut self.nonce, &other.nonce);
		pick(&mut self.home_url, &other.home_url);
		pick(&mut self.root, &other.root);
		pick(&mut self.api_key, &other.api_key);
		for (k, v) in &other.extra {
			self.extra.insert(k.clone(), v.clone());
		}
		self
	}

	/// The object assigned to the window global, without the `global` key.
	pub fn data(&self) -> Value {
		let mut obj = self.extra.clone();
		let typed = [
			("apiUrl", &self.api_url),
			("nonce", &self.nonce),
			("homeUrl", &self.home_url),
			("root", &self.root),
			("apiKey", &self.api_key),
		];
		for (key, value) in typed {
			if let Some(v) = value {
				obj.insert(key.to_string(), Value::String(v.clone()));
			}
		}
		Value::Object(obj)
	}

	/// JavaScript evaluated in every frame before the host application loads.
	pub fn init_script(&self) -> String {
		format!("window[{}] = {};", Value::String(self.global.clone()), self.data())
	}
}

#[cfg(test)]
mod tests {
	use serde_json::json;

	use super::*;

	#[test]
	fn viewport_parses_width_by_height() {
		assert_eq!("1440x900".parse::<Viewport>().unwrap(), Viewport::new(1440, 900));
		assert_eq!(" 800X600 ".parse::<Viewport>().unwrap(), Viewport::new(800, 600));
		assert!("1440".parse::<Viewport>().is_err());
		assert!("0x600".parse::<Viewport>().is_err());
		assert!("wide x tall".parse::<Viewport>().is_err());
		assert_eq!(Viewport::default().to_string(), "1280x800");
	}

	#[test]
	fn bootstrap_renders_window_assignment() {
		let payload = BootstrapPayload::new("http://localhost/wp-json/woosuite/v1", "abc", "http://localhost").with_extra("features", json!({"seo": true}));
		let script = payload.init_script();
		assert!(script.starts_with("window[\"woosuiteData\"] = {"));

		let data = payload.data();
		assert_eq!(data["apiUrl"], "http://localhost/wp-json/woosuite/v1");
		assert_eq!(data["nonce"], "abc");
		assert_eq!(data["homeUrl"], "http://localhost");
		assert_eq!(data["features"]["seo"], true);
		assert!(data.get("root").is_none());
		assert!(data.get("global").is_none());
	}

	#[test]
	fn bootstrap_deserializes_unknown_keys_into_extra() {
		let payload: BootstrapPayload = serde_json::from_value(json!({
			"apiUrl": "/api",
			"nonce": "n",
			"locale": "en_US"
		}))
		.unwrap();
		assert_eq!(payload.global, DEFAULT_BOOTSTRAP_GLOBAL);
		assert_eq!(payload.extra["locale"], "en_US");
		assert!(payload.home_url.is_none());
	}

	#[test]
	fn bootstrap_merge_prefers_overrides() {
		let base = BootstrapPayload::new("/api", "old", "/home").with_extra("a", json!(1));
		let over = BootstrapPayload {
			nonce: Some("new".into()),
			..BootstrapPayload::default()
		}
		.with_extra("b", json!(2));
		let merged = base.merged(&over);
		assert_eq!(merged.nonce.as_deref(), Some("new"));
		assert_eq!(merged.api_url.as_deref(), Some("/api"));
		assert_eq!(merged.extra.len(), 2);
	}
}
