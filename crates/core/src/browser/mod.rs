//! Thin Playwright handles over `smoke-runtime` channels.
//!
//! Only the surface the harness drives is modelled: launching a browser,
//! opening isolated contexts, one page per context, and the frame
//! operations actions map onto. Objects are addressed by GUID through a
//! [`Channel`]; the registry in [`Connection`] tells us what the driver
//! created in response.

mod context;
mod page;
mod route;

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use serde::Deserialize;
use serde_json::json;
use smoke_protocol::BrowserKind;
use smoke_runtime::{Channel, Connection, ObjectInfo, PlaywrightServer};

pub use self::context::{BrowserContext, ContextOptions};
pub use self::page::Page;
pub use self::route::{apply_resolution, intercepted_request};
use crate::error::{Result, millis};

/// `{ "guid": ... }` reference as returned by factory methods.
#[derive(Debug, Deserialize)]
pub(crate) struct GuidRef {
	pub guid: String,
}

#[derive(Debug, Clone)]
pub struct LaunchOptions {
	pub browser: BrowserKind,
	pub headless: bool,
	pub timeout: Duration,
}

impl Default for LaunchOptions {
	fn default() -> Self {
		Self {
			browser: BrowserKind::Chromium,
			headless: true,
			timeout: Duration::from_secs(30),
		}
	}
}

/// A running Playwright driver.
pub struct Playwright {
	server: Mutex<Option<PlaywrightServer>>,
	connection: Arc<Connection>,
	root: Arc<ObjectInfo>,
}

impl Playwright {
	/// Spawns the driver and completes the `initialize` handshake.
	pub async fn launch() -> Result<Self> {
		let (server, connection, root) = smoke_runtime::connect().await?;
		tracing::debug!(guid = %root.guid, "playwright driver ready");
		Ok(Self {
			server: Mutex::new(Some(server)),
			connection,
			root,
		})
	}

	pub async fn launch_browser(&self, options: &LaunchOptions) -> Result<Browser> {
		let name = options.browser.as_str();
		let browser_type = self.root.child_guid(name).ok_or_else(|| {
			smoke_runtime::Error::ProtocolError(format!("driver did not announce a {name} browser type"))
		})?;

		let channel = Channel::new(browser_type, Arc::clone(&self.connection));
		#[derive(Deserialize)]
		struct LaunchResponse {
			browser: GuidRef,
		}
		let response: LaunchResponse = channel
			.send(
				"launch",
				json!({
					"headless": options.headless,
					"timeout": millis(options.timeout),
				}),
			)
			.await?;
		self.connection.wait_for_object(&response.browser.guid).await?;

		tracing::info!(browser = name, headless = options.headless, "browser launched");
		Ok(Browser {
			channel: Channel::new(response.browser.guid, Arc::clone(&self.connection)),
		})
	}

	/// Stops the driver process.
	pub async fn shutdown(&self) -> Result<()> {
		let server = self.server.lock().take();
		if let Some(server) = server {
			server.shutdown().await?;
		}
		Ok(())
	}
}

pub struct Browser {
	channel: Channel,
}

impl Browser {
	/// Opens a fresh context. Contexts share no cookies or storage.
	pub async fn new_context(&self, options: &ContextOptions) -> Result<BrowserContext> {
		BrowserContext::open(&self.channel, options).await
	}

	pub async fn close(&self) -> Result<()> {
		match self.channel.send_no_result("close", json!({})).await {
			Err(err) if err.is_target_closed() => Ok(()),
			other => Ok(other?),
		}
	}
}
