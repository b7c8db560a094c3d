//! Registry of driver-side objects with per-GUID notification.
//!
//! The driver announces objects with `__create__` and retires them with
//! `__dispose__`. [`ObjectStore::wait_for`] registers its waiter before
//! checking the map so a concurrent insert is never missed.

use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use serde_json::Value;
use tokio::sync::Notify;

use crate::error::{Error, Result};

/// A driver object as announced by `__create__`.
#[derive(Debug, Clone)]
pub struct ObjectInfo {
	pub guid: Arc<str>,
	/// Protocol type, e.g. `Page`, `Route`, `Request`.
	pub type_name: String,
	/// GUID of the owning object; empty for the root.
	pub parent: Arc<str>,
	pub initializer: Value,
}

impl ObjectInfo {
	/// GUID nested in the initializer at `field.guid`, e.g. a page's `mainFrame`.
	pub fn child_guid(&self, field: &str) -> Option<&str> {
		self.initializer.get(field)?.get("guid")?.as_str()
	}
}

pub struct ObjectStore {
	objects: DashMap<Arc<str>, Arc<ObjectInfo>>,
	waiters: DashMap<Arc<str>, Arc<Notify>>,
}

impl Default for ObjectStore {
	fn default() -> Self {
		Self::new()
	}
}

impl ObjectStore {
	pub fn new() -> Self {
		Self {
			objects: DashMap::new(),
			waiters: DashMap::new(),
		}
	}

	/// Inserts an object and wakes anyone waiting for its GUID.
	pub fn insert(&self, info: ObjectInfo) {
		let guid = info.guid.clone();
		self.objects.insert(guid.clone(), Arc::new(info));
		if let Some((_, notify)) = self.waiters.remove(&guid) {
			notify.notify_waiters();
		}
	}

	/// Removes `guid` and every object it transitively owns. Returns the
	/// removed GUIDs.
	pub fn remove_tree(&self, guid: &str) -> Vec<Arc<str>> {
		let mut removed = Vec::new();
		let mut pending: Vec<Arc<str>> = vec![Arc::from(guid)];
		while let Some(next) = pending.pop() {
			if let Some((key, _)) = self.objects.remove(&next) {
				pending.extend(self.objects.iter().filter(|entry| entry.value().parent == key).map(|entry| entry.key().clone()));
				removed.push(key);
			}
		}
		removed
	}

	/// Moves `guid` under `new_parent`.
	pub fn reparent(&self, guid: &str, new_parent: &str) -> Result<()> {
		let mut entry = self.objects.get_mut(guid).ok_or_else(|| Error::ObjectNotFound(guid.to_string()))?;
		let mut info = (**entry.value()).clone();
		info.parent = Arc::from(new_parent);
		*entry.value_mut() = Arc::new(info);
		Ok(())
	}

	pub fn try_get(&self, guid: &str) -> Option<Arc<ObjectInfo>> {
		self.objects.get(guid).map(|r| r.value().clone())
	}

	pub fn contains(&self, guid: &str) -> bool {
		self.objects.contains_key(guid)
	}

	pub fn len(&self) -> usize {
		self.objects.len()
	}

	pub fn is_empty(&self) -> bool {
		self.objects.is_empty()
	}

	/// Waits for an object to be registered, with timeout.
	pub async fn wait_for(&self, guid: &str, timeout: Duration) -> Result<Arc<ObjectInfo>> {
		let g: Arc<str> = Arc::from(guid);
		let deadline = tokio::time::Instant::now() + timeout;

		loop {
			let notify = self.waiters.entry(g.clone()).or_insert_with(|| Arc::new(Notify::new())).clone();
			let notified = notify.notified();
			tokio::pin!(notified);
			notified.as_mut().enable();

			if let Some(obj) = self.objects.get(&g) {
				return Ok(obj.value().clone());
			}

			let remaining = deadline.saturating_duration_since(tokio::time::Instant::now());
			if remaining.is_zero() {
				return Err(Self::timeout_error(&g));
			}

			tokio::select! {
				biased;
				_ = notified => {}
				_ = tokio::time::sleep(remaining) => {
					return Err(Self::timeout_error(&g));
				}
			}
		}
	}

	fn timeout_error(guid: &str) -> Error {
		let target_type = match guid.split_once('@').map(|(prefix, _)| prefix) {
			Some("page") => "Page",
			Some("frame") => "Frame",
			Some("browser-context") => "BrowserContext",
			Some("browser") => "Browser",
			Some("route") => "Route",
			Some("request") => "Request",
			_ => return Error::Timeout(format!("waiting for object {guid}")),
		};
		Error::Timeout(format!("waiting for {target_type} object {guid}"))
	}
}
