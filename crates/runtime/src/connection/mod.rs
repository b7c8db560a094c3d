//! JSON-RPC connection to the Playwright driver.
//!
//! Correlates requests with responses by sequential id, keeps the
//! [`ObjectStore`] in sync with `__create__`/`__dispose__`/`__adopt__`, and
//! fans other events out to per-GUID subscribers.
//!
//! # Message flow
//!
//! 1. [`Connection::send_message`] assigns an id, parks a oneshot sender in
//!    the callback map and queues the request for the writer task.
//! 2. [`Connection::run`] decodes inbound messages; a response completes the
//!    matching callback, an event updates the registry or is forwarded to
//!    whoever [`subscribed`](Connection::subscribe) to its GUID.
//! 3. When the driver goes away every pending request fails with
//!    [`Error::ChannelClosed`] and every subscription stream ends.

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use std::task::{Context, Poll};
use std::time::Duration;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tokio::sync::{mpsc, oneshot};

use crate::error::{Error, Result};
use crate::transport::{PipeTransportReceiver, PipeTransportSender, TransportParts};

mod object_store;

pub use object_store::{ObjectInfo, ObjectStore};

/// How long to wait for an object referenced by a response to be announced.
const OBJECT_TIMEOUT: Duration = Duration::from_secs(30);

/// Metadata attached to every request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Metadata {
	/// Unix timestamp in milliseconds
	#[serde(rename = "wallTime")]
	pub wall_time: i64,
}

impl Metadata {
	pub fn now() -> Self {
		let wall_time = std::time::SystemTime::now()
			.duration_since(std::time::UNIX_EPOCH)
			.map(|d| d.as_millis() as i64)
			.unwrap_or_default();
		Self { wall_time }
	}
}

/// Request sent to the driver.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Request {
	pub id: u32,
	/// Target object GUID (`type@hash`), empty for the root.
	#[serde(serialize_with = "serialize_arc_str", deserialize_with = "deserialize_arc_str")]
	pub guid: Arc<str>,
	pub method: String,
	pub params: Value,
	pub metadata: Metadata,
}

fn serialize_arc_str<S: serde::Serializer>(value: &Arc<str>, serializer: S) -> std::result::Result<S::Ok, S::Error> {
	serializer.serialize_str(value)
}

fn deserialize_arc_str<'de, D: serde::Deserializer<'de>>(deserializer: D) -> std::result::Result<Arc<str>, D::Error> {
	let s = String::deserialize(deserializer)?;
	Ok(Arc::from(s))
}

/// Response correlated to a [`Request`] by id.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Response {
	pub id: u32,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub result: Option<Value>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub error: Option<ErrorWrapper>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorWrapper {
	pub error: ErrorPayload,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorPayload {
	pub message: String,
	/// Error type name (e.g., "TimeoutError", "TargetClosedError")
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub name: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub stack: Option<String>,
}

/// Event emitted by a driver object.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
	#[serde(serialize_with = "serialize_arc_str", deserialize_with = "deserialize_arc_str")]
	pub guid: Arc<str>,
	pub method: String,
	#[serde(default)]
	pub params: Value,
}

/// Inbound message: responses carry an `id`, events don't.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Message {
	Response(Response),
	Event(Event),
	/// Forward-compatible catch-all.
	Unknown(Value),
}

type CallbackMap = Arc<Mutex<HashMap<u32, oneshot::Sender<Result<Value>>>>>;
type SubscriberMap = Arc<Mutex<HashMap<Arc<str>, Vec<mpsc::UnboundedSender<Event>>>>>;

/// Removes the pending callback if the request future is dropped before the
/// response arrives.
struct CancelGuard {
	id: u32,
	callbacks: CallbackMap,
	completed: bool,
}

impl Drop for CancelGuard {
	fn drop(&mut self) {
		if !self.completed && self.callbacks.lock().remove(&self.id).is_some() {
			tracing::debug!(id = self.id, "dropped pending request");
		}
	}
}

struct ResponseFuture {
	rx: oneshot::Receiver<Result<Value>>,
	guard: CancelGuard,
}

impl Future for ResponseFuture {
	type Output = Result<Value>;

	fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
		match Pin::new(&mut self.rx).poll(cx) {
			Poll::Ready(result) => {
				self.guard.completed = true;
				Poll::Ready(result.map_err(|_| Error::ChannelClosed).and_then(|r| r))
			}
			Poll::Pending => Poll::Pending,
		}
	}
}

/// Transport halves, taken once by [`Connection::run`].
struct Pending {
	sender: PipeTransportSender,
	receiver: PipeTransportReceiver,
	message_rx: mpsc::UnboundedReceiver<Value>,
	outbound_rx: mpsc::UnboundedReceiver<Value>,
}

pub struct Connection {
	last_id: AtomicU32,
	callbacks: CallbackMap,
	subscribers: SubscriberMap,
	outbound_tx: mpsc::UnboundedSender<Value>,
	pending: Mutex<Option<Pending>>,
	objects: ObjectStore,
}

impl Connection {
	pub fn new(parts: TransportParts) -> Self {
		let TransportParts { sender, receiver, message_rx } = parts;
		let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();

		Self {
			last_id: AtomicU32::new(0),
			callbacks: Arc::new(Mutex::new(HashMap::new())),
			subscribers: Arc::new(Mutex::new(HashMap::new())),
			outbound_tx,
			pending: Mutex::new(Some(Pending {
				sender,
				receiver,
				message_rx,
				outbound_rx,
			})),
			objects: ObjectStore::new(),
		}
	}

	pub fn objects(&self) -> &ObjectStore {
		&self.objects
	}

	/// Sends a request and awaits its result.
	pub async fn send_message(&self, guid: &str, method: &str, params: Value) -> Result<Value> {
		let id = self.last_id.fetch_add(1, Ordering::SeqCst);
		tracing::debug!(id, guid, method, "sending request");

		let (tx, rx) = oneshot::channel();
		self.callbacks.lock().insert(id, tx);
		let guard = CancelGuard {
			id,
			callbacks: Arc::clone(&self.callbacks),
			completed: false,
		};

		let request = Request {
			id,
			guid: Arc::from(guid),
			method: method.to_string(),
			params,
			metadata: Metadata::now(),
		};

		if self.outbound_tx.send(serde_json::to_value(&request)?).is_err() {
			tracing::error!(id, method, "outbound channel closed");
			return Err(Error::ChannelClosed);
		}

		ResponseFuture { rx, guard }.await
	}

	/// Events emitted by `guid`, in arrival order. The stream ends when the
	/// object is disposed or the connection closes.
	pub fn subscribe(&self, guid: &str) -> mpsc::UnboundedReceiver<Event> {
		let (tx, rx) = mpsc::unbounded_channel();
		self.subscribers.lock().entry(Arc::from(guid)).or_default().push(tx);
		rx
	}

	/// Waits for `guid` to be announced by the driver.
	pub async fn wait_for_object(&self, guid: &str) -> Result<Arc<ObjectInfo>> {
		self.objects.wait_for(guid, OBJECT_TIMEOUT).await
	}

	/// Performs the `initialize` handshake and returns the `Playwright`
	/// root object.
	pub async fn initialize(&self) -> Result<Arc<ObjectInfo>> {
		let result = self.send_message("", "initialize", json!({ "sdkLanguage": "javascript" })).await?;
		let guid = result
			.get("playwright")
			.and_then(|p| p.get("guid"))
			.and_then(Value::as_str)
			.ok_or_else(|| Error::ProtocolError("initialize response missing playwright guid".to_string()))?;
		self.wait_for_object(guid).await
	}

	/// Runs the reader, writer and dispatch loops until the driver closes
	/// the pipe. Can only be called once.
	pub async fn run(self: &Arc<Self>) {
		let Some(Pending {
			mut sender,
			receiver,
			mut message_rx,
			mut outbound_rx,
		}) = self.pending.lock().take()
		else {
			tracing::warn!("connection run loop already started");
			return;
		};

		let reader = tokio::spawn(async move {
			if let Err(e) = receiver.run().await {
				tracing::debug!(error = %e, "transport reader stopped");
			}
		});

		let writer = tokio::spawn(async move {
			while let Some(message) = outbound_rx.recv().await {
				if let Err(e) = sender.send(message).await {
					tracing::error!(error = %e, "transport write failed");
					break;
				}
			}
		});

		while let Some(value) = message_rx.recv().await {
			match serde_json::from_value::<Message>(value) {
				Ok(message) => {
					if let Err(e) = self.dispatch(message) {
						tracing::warn!(error = %e, "failed to dispatch message");
					}
				}
				Err(e) => tracing::warn!(error = %e, "failed to parse message"),
			}
		}

		writer.abort();
		let _ = reader.await;
		self.close();
	}

	/// Fails every in-flight request and ends every subscription.
	fn close(&self) {
		let pending: Vec<_> = self.callbacks.lock().drain().collect();
		for (_, tx) in pending {
			let _ = tx.send(Err(Error::ChannelClosed));
		}
		self.subscribers.lock().clear();
		tracing::debug!("connection closed");
	}

	fn dispatch(&self, message: Message) -> Result<()> {
		match message {
			Message::Response(response) => {
				let callback = self
					.callbacks
					.lock()
					.remove(&response.id)
					.ok_or_else(|| Error::ProtocolError(format!("Cannot find request to respond: id={}", response.id)))?;

				let result = match response.error {
					Some(wrapper) => Err(parse_protocol_error(wrapper.error)),
					None => Ok(response.result.unwrap_or(Value::Null)),
				};
				let _ = callback.send(result);
				Ok(())
			}
			Message::Event(event) => match event.method.as_str() {
				"__create__" => self.handle_create(&event),
				"__dispose__" => {
					self.handle_dispose(&event.guid);
					Ok(())
				}
				"__adopt__" => {
					let child = event.params["guid"]
						.as_str()
						.ok_or_else(|| Error::ProtocolError("__adopt__ missing 'guid'".to_string()))?;
					self.objects.reparent(child, &event.guid)
				}
				_ => {
					self.forward(event);
					Ok(())
				}
			},
			Message::Unknown(value) => {
				tracing::debug!(%value, "ignoring unknown message");
				Ok(())
			}
		}
	}

	fn handle_create(&self, event: &Event) -> Result<()> {
		let type_name = event.params["type"]
			.as_str()
			.ok_or_else(|| Error::ProtocolError("__create__ missing 'type'".to_string()))?;
		let guid = event.params["guid"]
			.as_str()
			.ok_or_else(|| Error::ProtocolError("__create__ missing 'guid'".to_string()))?;

		tracing::debug!(type_name, guid, parent = %event.guid, "object created");
		self.objects.insert(ObjectInfo {
			guid: Arc::from(guid),
			type_name: type_name.to_string(),
			parent: event.guid.clone(),
			initializer: event.params.get("initializer").cloned().unwrap_or(Value::Null),
		});
		Ok(())
	}

	fn handle_dispose(&self, guid: &str) {
		let removed = self.objects.remove_tree(guid);
		let mut subscribers = self.subscribers.lock();
		subscribers.remove(guid);
		for g in &removed {
			subscribers.remove(g);
		}
		tracing::debug!(guid, count = removed.len(), "objects disposed");
	}

	fn forward(&self, event: Event) {
		let mut subscribers = self.subscribers.lock();
		let Some(senders) = subscribers.get_mut(&event.guid) else {
			tracing::trace!(guid = %event.guid, method = %event.method, "event without subscriber");
			return;
		};
		senders.retain(|tx| tx.send(event.clone()).is_ok());
		if senders.is_empty() {
			subscribers.remove(&event.guid);
		}
	}
}

/// Converts [`ErrorPayload`] from the driver into [`Error::Remote`].
fn parse_protocol_error(error: ErrorPayload) -> Error {
	Error::Remote {
		name: error.name.unwrap_or_else(|| "Error".to_string()),
		message: error.message,
		stack: error.stack,
	}
}

#[cfg(test)]
mod tests;
