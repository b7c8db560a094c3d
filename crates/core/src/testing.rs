//! Scripted in-memory browser.
//!
//! [`FakeBrowser`] implements [`SessionFactory`] over a tiny DOM model:
//! selectors are plain keys mapping to element lists, navigation loads the
//! scripted DOM, and click handlers mutate it, optionally after "fetching"
//! through the session's mock table. Every call is logged so tests can
//! check what the driver did.

use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::error::{Error, Result, millis};
use crate::mock::{InterceptedRequest, Resolution, RouteMockTable};
use crate::session::{PageSession, SessionConfig, SessionFactory};

/// First bytes of every PNG file.
pub const PNG_SIGNATURE: &[u8] = &[0x89, b'P', b'N', b'G', b'\r', b'\n', 0x1a, b'\n'];

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FakeElement {
	pub visible: bool,
	pub text: String,
	pub value: String,
	pub attributes: BTreeMap<String, String>,
}

impl FakeElement {
	pub fn new() -> Self {
		Self {
			visible: true,
			..Self::default()
		}
	}

	pub fn text(mut self, text: impl Into<String>) -> Self {
		self.text = text.into();
		self
	}

	pub fn value(mut self, value: impl Into<String>) -> Self {
		self.value = value.into();
		self
	}

	pub fn attr(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
		self.attributes.insert(name.into(), value.into());
		self
	}

	pub fn hidden(mut self) -> Self {
		self.visible = false;
		self
	}
}

/// Selector-keyed element lists. `sel >> nth=0` addresses the first
/// element under `sel`.
#[derive(Debug, Clone, Default)]
pub struct FakeDom {
	elements: BTreeMap<String, Vec<FakeElement>>,
}

fn split_nth(selector: &str) -> (&str, Option<usize>) {
	match selector.rsplit_once(" >> nth=") {
		Some((base, n)) => match n.parse() {
			Ok(n) => (base, Some(n)),
			Err(_) => (selector, None),
		},
		None => (selector, None),
	}
}

impl FakeDom {
	pub fn insert(&mut self, selector: impl Into<String>, element: FakeElement) {
		self.elements.entry(selector.into()).or_default().push(element);
	}

	pub fn remove(&mut self, selector: &str) {
		self.elements.remove(selector);
	}

	pub fn matches(&self, selector: &str) -> Vec<&FakeElement> {
		let (base, nth) = split_nth(selector);
		let all = self.elements.get(base).map(Vec::as_slice).unwrap_or_default();
		match nth {
			Some(n) => all.get(n).into_iter().collect(),
			None => all.iter().collect(),
		}
	}

	pub fn first_mut(&mut self, selector: &str) -> Option<&mut FakeElement> {
		let (base, nth) = split_nth(selector);
		self.elements.get_mut(base)?.get_mut(nth.unwrap_or(0))
	}

	pub fn set_text(&mut self, selector: &str, text: impl Into<String>) {
		if let Some(element) = self.first_mut(selector) {
			element.text = text.into();
		} else {
			self.insert(selector, FakeElement::new().text(text));
		}
	}
}

/// What a click handler can see besides the DOM.
pub struct FakePage<'a> {
	mocks: &'a RouteMockTable,
	log: &'a Mutex<Vec<String>>,
}

impl FakePage<'_> {
	/// Issues a request the way page code would, answered by the mock table.
	pub fn fetch(&self, request: InterceptedRequest) -> Resolution {
		self.log.lock().push(format!("fetch {} {}", request.method, request.url));
		self.mocks.resolve(&request)
	}
}

type ClickHandler = Arc<dyn Fn(&mut FakeDom, &FakePage<'_>) + Send + Sync>;

#[derive(Default)]
struct Script {
	dom: FakeDom,
	clicks: HashMap<String, ClickHandler>,
	open_error: Option<String>,
	navigation_error: Option<String>,
	hang_waits: bool,
	hang_open: bool,
	hang_close: bool,
	fail_screenshots: bool,
	action_delay: Option<Duration>,
}

#[derive(Default)]
struct Shared {
	script: Mutex<Script>,
	log: Mutex<Vec<String>>,
	configs: Mutex<Vec<SessionConfig>>,
	opened: AtomicUsize,
	closed: AtomicUsize,
}

/// Scripted [`SessionFactory`]. Cloning shares the script and the logs.
#[derive(Clone, Default)]
pub struct FakeBrowser {
	shared: Arc<Shared>,
}

impl FakeBrowser {
	pub fn new() -> Self {
		Self::default()
	}

	/// Adds an element to the DOM loaded by every navigation.
	pub fn with_element(self, selector: impl Into<String>, element: FakeElement) -> Self {
		self.shared.script.lock().dom.insert(selector, element);
		self
	}

	pub fn on_click<F>(self, selector: impl Into<String>, handler: F) -> Self
	where
		F: Fn(&mut FakeDom, &FakePage<'_>) + Send + Sync + 'static,
	{
		self.shared.script.lock().clicks.insert(selector.into(), Arc::new(handler));
		self
	}

	pub fn fail_open(self, message: impl Into<String>) -> Self {
		self.shared.script.lock().open_error = Some(message.into());
		self
	}

	pub fn fail_navigation(self, message: impl Into<String>) -> Self {
		self.shared.script.lock().navigation_error = Some(message.into());
		self
	}

	/// `wait_for_selector` never answers for missing elements.
	pub fn hang_waits(self) -> Self {
		self.shared.script.lock().hang_waits = true;
		self
	}

	/// `open` never returns.
	pub fn hang_open(self) -> Self {
		self.shared.script.lock().hang_open = true;
		self
	}

	/// `close` never returns. Dropping the session still counts as closed.
	pub fn hang_close(self) -> Self {
		self.shared.script.lock().hang_close = true;
		self
	}

	pub fn fail_screenshots(self) -> Self {
		self.shared.script.lock().fail_screenshots = true;
		self
	}

	/// Every element action and navigation takes this long.
	pub fn slow_actions(self, delay: Duration) -> Self {
		self.shared.script.lock().action_delay = Some(delay);
		self
	}

	/// Calls made by all sessions, in order.
	pub fn calls(&self) -> Vec<String> {
		self.shared.log.lock().clone()
	}

	/// Configurations sessions were opened with.
	pub fn configs(&self) -> Vec<SessionConfig> {
		self.shared.configs.lock().clone()
	}

	pub fn opened(&self) -> usize {
		self.shared.opened.load(Ordering::SeqCst)
	}

	/// Sessions closed explicitly or by drop.
	pub fn closed(&self) -> usize {
		self.shared.closed.load(Ordering::SeqCst)
	}
}

#[async_trait]
impl SessionFactory for FakeBrowser {
	async fn open(&self, config: SessionConfig) -> Result<Box<dyn PageSession>> {
		let hang = self.shared.script.lock().hang_open;
		if hang {
			std::future::pending::<()>().await;
		}
		if let Some(message) = self.shared.script.lock().open_error.clone() {
			return Err(Error::Browser(smoke_runtime::Error::LaunchFailed(message)));
		}
		self.shared.opened.fetch_add(1, Ordering::SeqCst);
		let mocks = config.mocks.clone();
		self.shared.configs.lock().push(config);
		Ok(Box::new(FakeSession {
			shared: Arc::clone(&self.shared),
			dom: Mutex::new(FakeDom::default()),
			mocks,
			closed: AtomicBool::new(false),
		}))
	}
}

struct FakeSession {
	shared: Arc<Shared>,
	dom: Mutex<FakeDom>,
	mocks: RouteMockTable,
	closed: AtomicBool,
}

impl FakeSession {
	fn log(&self, call: String) {
		self.shared.log.lock().push(call);
	}

	async fn delay(&self) {
		let delay = self.shared.script.lock().action_delay;
		if let Some(delay) = delay {
			tokio::time::sleep(delay).await;
		}
	}

	fn first<T>(&self, selector: &str, f: impl FnOnce(&FakeElement) -> T) -> Result<T> {
		let dom = self.dom.lock();
		dom.matches(selector).first().map(|el| f(el)).ok_or_else(|| Error::ElementNotFound {
			selector: selector.to_string(),
		})
	}

	fn update(&self, selector: &str, f: impl FnOnce(&mut FakeElement)) -> Result<()> {
		let mut dom = self.dom.lock();
		let element = dom.first_mut(selector).ok_or_else(|| Error::ElementNotFound {
			selector: selector.to_string(),
		})?;
		f(element);
		Ok(())
	}
}

#[async_trait]
impl PageSession for FakeSession {
	async fn goto(&self, url: &str, _timeout: Duration) -> Result<()> {
		self.log(format!("goto {url}"));
		self.delay().await;
		let (error, dom) = {
			let script = self.shared.script.lock();
			(script.navigation_error.clone(), script.dom.clone())
		};
		if let Some(message) = error {
			return Err(Error::Navigation {
				url: url.to_string(),
				message,
			});
		}
		*self.dom.lock() = dom;
		Ok(())
	}

	async fn count(&self, selector: &str) -> Result<usize> {
		Ok(self.dom.lock().matches(selector).len())
	}

	async fn click(&self, selector: &str, _timeout: Duration) -> Result<()> {
		self.log(format!("click {selector}"));
		self.delay().await;
		self.first(selector, |_| ())?;
		let (base, _) = split_nth(selector);
		let handler = self.shared.script.lock().clicks.get(base).cloned();
		if let Some(handler) = handler {
			let page = FakePage {
				mocks: &self.mocks,
				log: &self.shared.log,
			};
			let mut dom = self.dom.lock().clone();
			handler(&mut dom, &page);
			*self.dom.lock() = dom;
		}
		Ok(())
	}

	async fn fill(&self, selector: &str, value: &str, _timeout: Duration) -> Result<()> {
		self.log(format!("fill {selector} = {value}"));
		self.delay().await;
		self.update(selector, |el| el.value = value.to_string())
	}

	async fn select_option(&self, selector: &str, value: &str, _timeout: Duration) -> Result<()> {
		self.log(format!("select {selector} = {value}"));
		self.delay().await;
		self.update(selector, |el| el.value = value.to_string())
	}

	async fn check(&self, selector: &str, _timeout: Duration) -> Result<()> {
		self.log(format!("check {selector}"));
		self.delay().await;
		self.update(selector, |el| {
			el.attributes.insert("checked".to_string(), "true".to_string());
		})
	}

	async fn wait_for_selector(&self, selector: &str, timeout: Duration) -> Result<()> {
		self.log(format!("wait {selector}"));
		let visible = self.dom.lock().matches(selector).iter().any(|el| el.visible);
		if visible {
			return Ok(());
		}
		let hang = self.shared.script.lock().hang_waits;
		if hang {
			std::future::pending::<()>().await;
		}
		tokio::time::sleep(timeout).await;
		Err(Error::Timeout {
			what: selector.to_string(),
			timeout_ms: millis(timeout),
		})
	}

	async fn is_visible(&self, selector: &str) -> Result<bool> {
		Ok(self.dom.lock().matches(selector).first().is_some_and(|el| el.visible))
	}

	async fn text_content(&self, selector: &str) -> Result<Option<String>> {
		self.first(selector, |el| Some(el.text.clone()))
	}

	async fn attribute(&self, selector: &str, name: &str) -> Result<Option<String>> {
		self.first(selector, |el| el.attributes.get(name).cloned())
	}

	async fn input_value(&self, selector: &str) -> Result<String> {
		self.first(selector, |el| el.value.clone())
	}

	async fn screenshot(&self, path: &Path) -> Result<()> {
		self.log(format!("screenshot {}", path.display()));
		let fail = self.shared.script.lock().fail_screenshots;
		if fail {
			return Err(Error::Browser(smoke_runtime::Error::TargetClosed {
				target_type: "Page".to_string(),
				context: "screenshot".to_string(),
			}));
		}
		// Synchronous so paused-clock tests don't auto-advance past a pending write.
		if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
			std::fs::create_dir_all(parent)?;
		}
		std::fs::write(path, PNG_SIGNATURE)?;
		Ok(())
	}

	async fn close(&self) -> Result<()> {
		let hang = self.shared.script.lock().hang_close;
		if hang {
			std::future::pending::<()>().await;
		}
		if !self.closed.swap(true, Ordering::SeqCst) {
			self.log("close".to_string());
			self.shared.closed.fetch_add(1, Ordering::SeqCst);
		}
		Ok(())
	}
}

impl Drop for FakeSession {
	fn drop(&mut self) {
		if !self.closed.swap(true, Ordering::SeqCst) {
			self.shared.log.lock().push("close (dropped)".to_string());
			self.shared.closed.fetch_add(1, Ordering::SeqCst);
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn nth_selectors_address_one_element() {
		let mut dom = FakeDom::default();
		dom.insert("role=checkbox", FakeElement::new());
		dom.insert("role=checkbox", FakeElement::new().attr("id", "second"));

		assert_eq!(dom.matches("role=checkbox").len(), 2);
		assert_eq!(dom.matches("role=checkbox >> nth=1")[0].attributes["id"], "second");
		assert!(dom.matches("role=checkbox >> nth=5").is_empty());
		assert!(dom.first_mut("missing").is_none());
	}

	#[tokio::test]
	async fn sessions_get_their_own_dom() {
		let browser = FakeBrowser::new().with_element("#count", FakeElement::new().text("0")).on_click("#inc", |dom, _| dom.set_text("#count", "1"));
		let browser = browser.with_element("#inc", FakeElement::new());

		let a = browser.open(SessionConfig::default()).await.unwrap();
		let b = browser.open(SessionConfig::default()).await.unwrap();
		a.goto("http://x/", Duration::from_secs(1)).await.unwrap();
		b.goto("http://x/", Duration::from_secs(1)).await.unwrap();
		a.click("#inc", Duration::from_secs(1)).await.unwrap();

		assert_eq!(a.text_content("#count").await.unwrap().as_deref(), Some("1"));
		assert_eq!(b.text_content("#count").await.unwrap().as_deref(), Some("0"));

		a.close().await.unwrap();
		drop(b);
		assert_eq!(browser.opened(), 2);
		assert_eq!(browser.closed(), 2);
		assert!(browser.calls().contains(&"close (dropped)".to_string()));
	}
}
