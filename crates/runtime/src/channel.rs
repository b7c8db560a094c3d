//! Typed request proxy for one driver object.

use std::sync::Arc;

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tokio::sync::mpsc;

use crate::connection::{Connection, Event};
use crate::error::Result;

/// Sends requests on behalf of the object identified by `guid`.
#[derive(Clone)]
pub struct Channel {
	guid: Arc<str>,
	connection: Arc<Connection>,
}

impl Channel {
	pub fn new(guid: impl Into<Arc<str>>, connection: Arc<Connection>) -> Self {
		Self {
			guid: guid.into(),
			connection,
		}
	}

	/// Sends `method` with `params` and decodes the result.
	pub async fn send<P: Serialize, R: DeserializeOwned>(&self, method: &str, params: P) -> Result<R> {
		let params = serde_json::to_value(params)?;
		let response = self.connection.send_message(&self.guid, method, params).await?;
		Ok(serde_json::from_value(response)?)
	}

	/// Sends a request whose result is ignored.
	pub async fn send_no_result<P: Serialize>(&self, method: &str, params: P) -> Result<()> {
		let _: Value = self.send(method, params).await?;
		Ok(())
	}

	pub fn subscribe(&self) -> mpsc::UnboundedReceiver<Event> {
		self.connection.subscribe(&self.guid)
	}

	pub fn guid(&self) -> &str {
		&self.guid
	}

	pub fn connection(&self) -> &Arc<Connection> {
		&self.connection
	}
}

impl std::fmt::Debug for Channel {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("Channel").field("guid", &self.guid).finish()
	}
}
