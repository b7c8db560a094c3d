//! A page and the main-frame operations actions map onto.
//!
//! Selector-taking calls go to the page's main frame. Element actions are
//! sent with `strict: true`; read-only queries are not strict and look at
//! the first match.

use std::time::Duration;

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use serde::Deserialize;
use serde_json::json;
use smoke_runtime::{Channel, Error, Result};

use crate::error::millis;

/// `{ "value": ... }` result shape shared by frame queries.
#[derive(Deserialize)]
struct ValueResponse<T> {
	#[serde(default = "Option::default")]
	value: Option<T>,
}

#[derive(Clone, Debug)]
pub struct Page {
	channel: Channel,
	frame: Channel,
}

impl Page {
	pub(super) fn new(channel: Channel, frame: Channel) -> Self {
		Self { channel, frame }
	}

	pub fn guid(&self) -> &str {
		self.channel.guid()
	}

	/// Navigates the main frame and waits for `load`.
	pub async fn goto(&self, url: &str, timeout: Duration) -> Result<()> {
		self.frame
			.send_no_result("goto", json!({"url": url, "timeout": millis(timeout), "waitUntil": "load"}))
			.await
	}

	/// Number of elements `selector` currently matches.
	pub async fn query_count(&self, selector: &str) -> Result<usize> {
		let response: ValueResponse<usize> = self.frame.send("queryCount", json!({"selector": selector})).await?;
		Ok(response.value.unwrap_or(0))
	}

	pub async fn click(&self, selector: &str, timeout: Duration) -> Result<()> {
		self.frame
			.send_no_result("click", json!({"selector": selector, "strict": true, "timeout": millis(timeout)}))
			.await
	}

	pub async fn fill(&self, selector: &str, value: &str, timeout: Duration) -> Result<()> {
		self.frame
			.send_no_result("fill", json!({"selector": selector, "value": value, "strict": true, "timeout": millis(timeout)}))
			.await
	}

	pub async fn select_option(&self, selector: &str, value: &str, timeout: Duration) -> Result<()> {
		self.frame
			.send_no_result(
				"selectOption",
				json!({"selector": selector, "options": [{"value": value}], "strict": true, "timeout": millis(timeout)}),
			)
			.await
	}

	pub async fn check(&self, selector: &str, timeout: Duration) -> Result<()> {
		self.frame
			.send_no_result("check", json!({"selector": selector, "strict": true, "timeout": millis(timeout)}))
			.await
	}

	/// Resolves once `selector` is visible; fails with a timeout otherwise.
	pub async fn wait_for_selector(&self, selector: &str, timeout: Duration) -> Result<()> {
		self.frame
			.send_no_result("waitForSelector", json!({"selector": selector, "state": "visible", "timeout": millis(timeout)}))
			.await
	}

	pub async fn is_visible(&self, selector: &str) -> Result<bool> {
		let response: ValueResponse<bool> = self.frame.send("isVisible", json!({"selector": selector})).await?;
		Ok(response.value.unwrap_or(false))
	}

	pub async fn text_content(&self, selector: &str, timeout: Duration) -> Result<Option<String>> {
		let response: ValueResponse<String> = self
			.frame
			.send("textContent", json!({"selector": selector, "timeout": millis(timeout)}))
			.await?;
		Ok(response.value)
	}

	pub async fn get_attribute(&self, selector: &str, name: &str, timeout: Duration) -> Result<Option<String>> {
		let response: ValueResponse<String> = self
			.frame
			.send("getAttribute", json!({"selector": selector, "name": name, "timeout": millis(timeout)}))
			.await?;
		Ok(response.value)
	}

	pub async fn input_value(&self, selector: &str, timeout: Duration) -> Result<String> {
		let response: ValueResponse<String> = self
			.frame
			.send("inputValue", json!({"selector": selector, "timeout": millis(timeout)}))
			.await?;
		Ok(response.value.unwrap_or_default())
	}

	/// Captures the viewport as PNG bytes.
	pub async fn screenshot(&self, timeout: Duration) -> Result<Vec<u8>> {
		#[derive(Deserialize)]
		struct ScreenshotResponse {
			binary: String,
		}
		let response: ScreenshotResponse = self.channel.send("screenshot", json!({"type": "png", "timeout": millis(timeout)})).await?;
		BASE64
			.decode(&response.binary)
			.map_err(|e| Error::ProtocolError(format!("decode screenshot: {e}")))
	}
}
