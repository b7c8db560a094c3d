//! Browser contexts and their event loop.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use serde::Deserialize;
use serde_json::{Value, json};
use smoke_protocol::{DialogPolicy, UnmatchedPolicy, Viewport};
use smoke_runtime::{Channel, Connection, Event};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::route::handle_route;
use super::{GuidRef, Page};
use crate::error::Result;
use crate::mock::RouteMockTable;

/// Settings applied to a context before its first page opens.
#[derive(Debug, Clone, Default)]
pub struct ContextOptions {
	pub viewport: Viewport,
	/// Evaluated in every frame before page scripts.
	pub init_script: Option<String>,
	pub mocks: RouteMockTable,
	pub dialogs: DialogPolicy,
}

impl ContextOptions {
	/// Interception is only enabled when something could differ from the
	/// network's own answer.
	fn intercepts(&self) -> bool {
		!self.mocks.is_empty() || self.mocks.unmatched() != UnmatchedPolicy::Passthrough
	}
}

/// An isolated browser context.
///
/// Dropping a context that was not closed schedules its close on the
/// current runtime.
pub struct BrowserContext {
	channel: Channel,
	events: Option<JoinHandle<()>>,
	closed: AtomicBool,
}

impl BrowserContext {
	pub(super) async fn open(browser: &Channel, options: &ContextOptions) -> Result<Self> {
		#[derive(Deserialize)]
		struct NewContextResponse {
			context: GuidRef,
		}
		let viewport = json!({"width": options.viewport.width, "height": options.viewport.height});
		let response: NewContextResponse = browser.send("newContext", json!({"viewport": viewport})).await?;

		let connection = Arc::clone(browser.connection());
		connection.wait_for_object(&response.context.guid).await?;
		let channel = Channel::new(response.context.guid, Arc::clone(&connection));
		let events = channel.subscribe();

		let mut context = Self {
			channel,
			events: None,
			closed: AtomicBool::new(false),
		};
		context.configure(options).await?;
		context.events = Some(tokio::spawn(event_loop(events, connection, Arc::new(options.mocks.clone()), options.dialogs)));
		Ok(context)
	}

	async fn configure(&self, options: &ContextOptions) -> Result<()> {
		if let Some(source) = &options.init_script {
			self.channel.send_no_result("addInitScript", json!({"source": source})).await?;
		}
		for event in ["console", "dialog"] {
			if let Err(err) = self.channel.send_no_result("updateSubscription", json!({"event": event, "enabled": true})).await {
				debug!(event, error = %err, "event subscription not supported");
			}
		}
		if options.intercepts() {
			self.channel
				.send_no_result("setNetworkInterceptionPatterns", json!({"patterns": [{"glob": "**/*"}]}))
				.await?;
		}
		Ok(())
	}

	pub fn guid(&self) -> &str {
		self.channel.guid()
	}

	pub async fn new_page(&self) -> Result<Page> {
		#[derive(Deserialize)]
		struct NewPageResponse {
			page: GuidRef,
		}
		let response: NewPageResponse = self.channel.send("newPage", json!({})).await?;
		let connection = self.channel.connection();
		let page = connection.wait_for_object(&response.page.guid).await?;
		let frame = page
			.child_guid("mainFrame")
			.ok_or_else(|| smoke_runtime::Error::ProtocolError(format!("page {} has no main frame", page.guid)))?;
		connection.wait_for_object(frame).await?;

		Ok(Page::new(
			Channel::new(Arc::clone(&page.guid), Arc::clone(connection)),
			Channel::new(frame, Arc::clone(connection)),
		))
	}

	pub async fn close(&self) -> Result<()> {
		if self.closed.swap(true, Ordering::SeqCst) {
			return Ok(());
		}
		match self.channel.send_no_result("close", json!({})).await {
			Err(err) if err.is_target_closed() => Ok(()),
			other => Ok(other?),
		}
	}
}

impl Drop for BrowserContext {
	fn drop(&mut self) {
		if self.closed.load(Ordering::SeqCst) {
			return;
		}
		let Ok(runtime) = tokio::runtime::Handle::try_current() else {
			return;
		};
		let channel = self.channel.clone();
		debug!(guid = channel.guid(), "closing abandoned context");
		runtime.spawn(async move {
			let _ = channel.send_no_result("close", json!({})).await;
		});
	}
}

/// Serves route, dialog, console and page-error events until the context
/// is disposed.
async fn event_loop(mut events: mpsc::UnboundedReceiver<Event>, connection: Arc<Connection>, mocks: Arc<RouteMockTable>, dialogs: DialogPolicy) {
	while let Some(event) = events.recv().await {
		match event.method.as_str() {
			"route" => {
				let Some(guid) = guid_param(&event.params, "route") else {
					continue;
				};
				let connection = Arc::clone(&connection);
				let mocks = Arc::clone(&mocks);
				tokio::spawn(async move {
					if let Err(err) = handle_route(connection, guid, mocks).await {
						warn!(target: "smoke::browser", error = %err, "failed to answer intercepted request");
					}
				});
			}
			"dialog" => {
				let Some(guid) = guid_param(&event.params, "dialog") else {
					continue;
				};
				let connection = Arc::clone(&connection);
				tokio::spawn(answer_dialog(connection, guid, dialogs));
			}
			"console" => log_console(&event.params),
			"pageError" => {
				let error = &event.params["error"];
				let text = error["error"]["message"].as_str().or_else(|| error["value"].as_str()).unwrap_or("unknown error");
				warn!(target: "smoke::browser", error = text, "uncaught page error");
			}
			_ => {}
		}
	}
}

fn guid_param(params: &Value, field: &str) -> Option<String> {
	params.get(field)?.get("guid")?.as_str().map(str::to_string)
}

async fn answer_dialog(connection: Arc<Connection>, guid: String, policy: DialogPolicy) {
	let (kind, message) = match connection.wait_for_object(&guid).await {
		Ok(dialog) => (
			dialog.initializer["type"].as_str().unwrap_or("dialog").to_string(),
			dialog.initializer["message"].as_str().unwrap_or_default().to_string(),
		),
		Err(_) => ("dialog".to_string(), String::new()),
	};
	let method = match policy {
		DialogPolicy::Accept => "accept",
		DialogPolicy::Dismiss => "dismiss",
	};
	info!(target: "smoke::browser", kind = %kind, text = %message, action = method, "javascript dialog");
	if let Err(err) = Channel::new(guid, connection).send_no_result(method, json!({})).await {
		warn!(target: "smoke::browser", error = %err, "failed to answer dialog");
	}
}

fn log_console(params: &Value) {
	let kind = params["type"].as_str().unwrap_or("log");
	let text = params["text"].as_str().unwrap_or_default();
	let location = params["location"]["url"].as_str().unwrap_or_default();
	match kind {
		"error" => warn!(target: "smoke::browser", kind, location, "{text}"),
		"warning" => info!(target: "smoke::browser", kind, location, "{text}"),
		_ => debug!(target: "smoke::browser", kind, location, "{text}"),
	}
}
