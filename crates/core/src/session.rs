//! Seam between the scenario driver and a browser.
//!
//! The driver only ever talks to a [`SessionFactory`] and the
//! [`PageSession`]s it opens. [`PlaywrightSessionFactory`] backs them with
//! a real browser; tests use the scripted browser in `smoke::testing`.

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use smoke_protocol::{BootstrapPayload, DialogPolicy, Viewport};

use crate::browser::{Browser, BrowserContext, ContextOptions, LaunchOptions, Page, Playwright};
use crate::error::{Error, Result, millis};
use crate::mock::RouteMockTable;

/// Everything a fresh session is set up with.
#[derive(Debug, Clone)]
pub struct SessionConfig {
	pub viewport: Viewport,
	pub bootstrap: Option<BootstrapPayload>,
	/// Per-run clone of the scenario's mock table.
	pub mocks: RouteMockTable,
	pub dialogs: DialogPolicy,
	/// Upper bound for DOM reads and screenshots.
	pub action_timeout: Duration,
}

impl Default for SessionConfig {
	fn default() -> Self {
		Self {
			viewport: Viewport::default(),
			bootstrap: None,
			mocks: RouteMockTable::new(),
			dialogs: DialogPolicy::default(),
			action_timeout: Duration::from_secs(5),
		}
	}
}

/// One isolated browser context with a single page.
#[async_trait]
pub trait PageSession: Send + Sync {
	async fn goto(&self, url: &str, timeout: Duration) -> Result<()>;

	/// Number of elements `selector` matches right now.
	async fn count(&self, selector: &str) -> Result<usize>;

	async fn click(&self, selector: &str, timeout: Duration) -> Result<()>;
	async fn fill(&self, selector: &str, value: &str, timeout: Duration) -> Result<()>;
	async fn select_option(&self, selector: &str, value: &str, timeout: Duration) -> Result<()>;
	async fn check(&self, selector: &str, timeout: Duration) -> Result<()>;

	/// Waits until `selector` is visible, failing with [`Error::Timeout`].
	async fn wait_for_selector(&self, selector: &str, timeout: Duration) -> Result<()>;

	async fn is_visible(&self, selector: &str) -> Result<bool>;
	async fn text_content(&self, selector: &str) -> Result<Option<String>>;
	async fn attribute(&self, selector: &str, name: &str) -> Result<Option<String>>;
	async fn input_value(&self, selector: &str) -> Result<String>;

	/// Writes a PNG of the viewport to `path`, creating parent directories.
	async fn screenshot(&self, path: &Path) -> Result<()>;

	async fn close(&self) -> Result<()>;
}

#[async_trait]
pub trait SessionFactory: Send + Sync {
	async fn open(&self, config: SessionConfig) -> Result<Box<dyn PageSession>>;
}

/// Opens sessions as contexts of one shared browser.
pub struct PlaywrightSessionFactory {
	playwright: Playwright,
	browser: Browser,
}

impl PlaywrightSessionFactory {
	pub async fn launch(options: &LaunchOptions) -> Result<Self> {
		let playwright = Playwright::launch().await?;
		let browser = match playwright.launch_browser(options).await {
			Ok(browser) => browser,
			Err(err) => {
				let _ = playwright.shutdown().await;
				return Err(err);
			}
		};
		Ok(Self { playwright, browser })
	}

	/// Closes the browser and stops the driver.
	pub async fn shutdown(&self) -> Result<()> {
		if let Err(err) = self.browser.close().await {
			tracing::warn!(error = %err, "failed to close browser");
		}
		self.playwright.shutdown().await
	}
}

#[async_trait]
impl SessionFactory for PlaywrightSessionFactory {
	async fn open(&self, config: SessionConfig) -> Result<Box<dyn PageSession>> {
		let options = ContextOptions {
			viewport: config.viewport,
			init_script: config.bootstrap.as_ref().map(BootstrapPayload::init_script),
			mocks: config.mocks,
			dialogs: config.dialogs,
		};
		let context = self.browser.new_context(&options).await?;
		let page = context.new_page().await?;
		tracing::debug!(context = context.guid(), page = page.guid(), "session opened");
		Ok(Box::new(PlaywrightSession {
			context,
			page,
			read_timeout: config.action_timeout,
		}))
	}
}

pub struct PlaywrightSession {
	context: BrowserContext,
	page: Page,
	read_timeout: Duration,
}

/// Driver timeouts become [`Error::Timeout`] naming the selector; anything
/// else stays a browser error.
fn element_error(err: smoke_runtime::Error, selector: &str, timeout: Duration) -> Error {
	if err.is_timeout() {
		Error::Timeout {
			what: selector.to_string(),
			timeout_ms: millis(timeout),
		}
	} else {
		Error::Browser(err)
	}
}

#[async_trait]
impl PageSession for PlaywrightSession {
	async fn goto(&self, url: &str, timeout: Duration) -> Result<()> {
		self.page.goto(url, timeout).await.map_err(|err| Error::Navigation {
			url: url.to_string(),
			message: err.to_string(),
		})
	}

	async fn count(&self, selector: &str) -> Result<usize> {
		Ok(self.page.query_count(selector).await?)
	}

	async fn click(&self, selector: &str, timeout: Duration) -> Result<()> {
		self.page.click(selector, timeout).await.map_err(|e| element_error(e, selector, timeout))
	}

	async fn fill(&self, selector: &str, value: &str, timeout: Duration) -> Result<()> {
		self.page.fill(selector, value, timeout).await.map_err(|e| element_error(e, selector, timeout))
	}

	async fn select_option(&self, selector: &str, value: &str, timeout: Duration) -> Result<()> {
		self.page
			.select_option(selector, value, timeout)
			.await
			.map_err(|e| element_error(e, selector, timeout))
	}

	async fn check(&self, selector: &str, timeout: Duration) -> Result<()> {
		self.page.check(selector, timeout).await.map_err(|e| element_error(e, selector, timeout))
	}

	async fn wait_for_selector(&self, selector: &str, timeout: Duration) -> Result<()> {
		self.page
			.wait_for_selector(selector, timeout)
			.await
			.map_err(|e| element_error(e, selector, timeout))
	}

	async fn is_visible(&self, selector: &str) -> Result<bool> {
		Ok(self.page.is_visible(selector).await?)
	}

	async fn text_content(&self, selector: &str) -> Result<Option<String>> {
		let timeout = self.read_timeout;
		self.page.text_content(selector, timeout).await.map_err(|e| element_error(e, selector, timeout))
	}

	async fn attribute(&self, selector: &str, name: &str) -> Result<Option<String>> {
		let timeout = self.read_timeout;
		self.page
			.get_attribute(selector, name, timeout)
			.await
			.map_err(|e| element_error(e, selector, timeout))
	}

	async fn input_value(&self, selector: &str) -> Result<String> {
		let timeout = self.read_timeout;
		self.page.input_value(selector, timeout).await.map_err(|e| element_error(e, selector, timeout))
	}

	async fn screenshot(&self, path: &Path) -> Result<()> {
		let bytes = self.page.screenshot(self.read_timeout).await?;
		if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
			tokio::fs::create_dir_all(parent).await?;
		}
		tokio::fs::write(path, &bytes).await?;
		tracing::debug!(path = %path.display(), bytes = bytes.len(), "screenshot saved");
		Ok(())
	}

	async fn close(&self) -> Result<()> {
		self.context.close().await
	}
}
