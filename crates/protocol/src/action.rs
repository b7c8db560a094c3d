//! Ordered UI actions and assertions performed by a scenario.

use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// How [`Action::AssertText`] compares the element text to the expectation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TextMatch {
	/// Trimmed text equals the expectation.
	#[default]
	Exact,
	/// Text contains the expectation.
	Contains,
	/// Text does not contain the expectation.
	NotContains,
}

impl TextMatch {
	pub fn matches(self, actual: &str, expected: &str) -> bool {
		match self {
			Self::Exact => actual.trim() == expected.trim(),
			Self::Contains => actual.contains(expected),
			Self::NotContains => !actual.contains(expected),
		}
	}
}

impl fmt::Display for TextMatch {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(match self {
			Self::Exact => "equal",
			Self::Contains => "contain",
			Self::NotContains => "not contain",
		})
	}
}

/// One step of a scenario.
///
/// Serialized with an `"action"` tag, e.g.
/// `{"action": "fill", "selector": "#title", "value": "Hello"}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "camelCase", rename_all_fields = "camelCase", deny_unknown_fields)]
pub enum Action {
	/// Load a URL; relative URLs resolve against the scenario base URL.
	Navigate { url: String },
	Click { selector: String },
	Fill { selector: String, value: String },
	/// Select an `<option>` by its value.
	SelectOption { selector: String, value: String },
	Check { selector: String },
	/// Wait until the selector is visible, failing with a timeout otherwise.
	WaitForSelector {
		selector: String,
		#[serde(default, skip_serializing_if = "Option::is_none")]
		timeout_ms: Option<u64>,
	},
	Pause { ms: u64 },
	AssertVisible { selector: String },
	AssertHidden { selector: String },
	AssertText {
		selector: String,
		expected: String,
		#[serde(default, rename = "match")]
		mode: TextMatch,
	},
	AssertAttribute { selector: String, name: String, expected: String },
	AssertValue { selector: String, expected: String },
	/// Save a PNG; relative paths land in the artifacts directory.
	Screenshot { path: PathBuf },
}

impl Action {
	pub fn navigate(url: impl Into<String>) -> Self {
		Self::Navigate { url: url.into() }
	}

	pub fn click(selector: impl Into<String>) -> Self {
		Self::Click { selector: selector.into() }
	}

	pub fn fill(selector: impl Into<String>, value: impl Into<String>) -> Self {
		Self::Fill {
			selector: selector.into(),
			value: value.into(),
		}
	}

	pub fn select_option(selector: impl Into<String>, value: impl Into<String>) -> Self {
		Self::SelectOption {
			selector: selector.into(),
			value: value.into(),
		}
	}

	pub fn check(selector: impl Into<String>) -> Self {
		Self::Check { selector: selector.into() }
	}

	pub fn wait_for(selector: impl Into<String>, timeout_ms: Option<u64>) -> Self {
		Self::WaitForSelector {
			selector: selector.into(),
			timeout_ms,
		}
	}

	pub fn pause(ms: u64) -> Self {
		Self::Pause { ms }
	}

	pub fn assert_visible(selector: impl Into<String>) -> Self {
		Self::AssertVisible { selector: selector.into() }
	}

	pub fn assert_hidden(selector: impl Into<String>) -> Self {
		Self::AssertHidden { selector: selector.into() }
	}

	pub fn assert_text(selector: impl Into<String>, expected: impl Into<String>, mode: TextMatch) -> Self {
		Self::AssertText {
			selector: selector.into(),
			expected: expected.into(),
			mode,
		}
	}

	pub fn assert_attribute(selector: impl Into<String>, name: impl Into<String>, expected: impl Into<String>) -> Self {
		Self::AssertAttribute {
			selector: selector.into(),
			name: name.into(),
			expected: expected.into(),
		}
	}

	pub fn assert_value(selector: impl Into<String>, expected: impl Into<String>) -> Self {
		Self::AssertValue {
			selector: selector.into(),
			expected: expected.into(),
		}
	}

	pub fn screenshot(path: impl Into<PathBuf>) -> Self {
		Self::Screenshot { path: path.into() }
	}

	/// Wire name of the action, as used in the `"action"` tag.
	pub fn kind(&self) -> &'static str {
		match self {
			Self::Navigate { .. } => "navigate",
			Self::Click { .. } => "click",
			Self::Fill { .. } => "fill",
			Self::SelectOption { .. } => "selectOption",
			Self::Check { .. } => "check",
			Self::WaitForSelector { .. } => "waitForSelector",
			Self::Pause { .. } => "pause",
			Self::AssertVisible { .. } => "assertVisible",
			Self::AssertHidden { .. } => "assertHidden",
			Self::AssertText { .. } => "assertText",
			Self::AssertAttribute { .. } => "assertAttribute",
			Self::AssertValue { .. } => "assertValue",
			Self::Screenshot { .. } => "screenshot",
		}
	}

	pub fn selector(&self) -> Option<&str> {
		match self {
			Self::Click { selector }
			| Self::Fill { selector, .. }
			| Self::SelectOption { selector, .. }
			| Self::Check { selector }
			| Self::WaitForSelector { selector, .. }
			| Self::AssertVisible { selector }
			| Self::AssertHidden { selector }
			| Self::AssertText { selector, .. }
			| Self::AssertAttribute { selector, .. }
			| Self::AssertValue { selector, .. } => Some(selector),
			Self::Navigate { .. } | Self::Pause { .. } | Self::Screenshot { .. } => None,
		}
	}

	pub fn is_assertion(&self) -> bool {
		matches!(
			self,
			Self::AssertVisible { .. } | Self::AssertHidden { .. } | Self::AssertText { .. } | Self::AssertAttribute { .. } | Self::AssertValue { .. }
		)
	}

	/// Short human-readable description used in step records and logs.
	pub fn label(&self) -> String {
		match self {
			Self::Navigate { url } => format!("navigate {url}"),
			Self::Click { selector } => format!("click {selector}"),
			Self::Fill { selector, value } => format!("fill {selector} with {value:?}"),
			Self::SelectOption { selector, value } => format!("select {value:?} in {selector}"),
			Self::Check { selector } => format!("check {selector}"),
			Self::WaitForSelector { selector, .. } => format!("wait for {selector}"),
			Self::Pause { ms } => format!("pause {ms}ms"),
			Self::AssertVisible { selector } => format!("assert {selector} visible"),
			Self::AssertHidden { selector } => format!("assert {selector} hidden"),
			Self::AssertText { selector, expected, mode } => format!("assert {selector} text {mode}s {expected:?}"),
			Self::AssertAttribute { selector, name, expected } => format!("assert {selector} [{name}] = {expected:?}"),
			Self::AssertValue { selector, expected } => format!("assert {selector} value = {expected:?}"),
			Self::Screenshot { path } => format!("screenshot {}", path.display()),
		}
	}
}
