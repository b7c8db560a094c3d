//! Declarative browser scenario harness.
//!
//! A [`Scenario`] is a named, ordered list of UI actions and assertions run
//! against a web application whose backend is replaced by a
//! [`RouteMockTable`]. The layers, bottom up:
//!
//! - [`mock`]: URL pattern matching and canned responses for intercepted requests
//! - [`browser`]: Browser, context and page handles over the Playwright driver
//! - [`session`]: the [`PageSession`] seam the driver talks to
//! - [`driver`]: executes one scenario and captures failure artifacts
//! - [`assert`]: visibility, text, attribute and value checks
//! - [`runner`]: runs a batch and aggregates a [`Report`](smoke_protocol::Report)
//!
//! ```text
//! Runner ── Driver ── SessionFactory ── PageSession ── Playwright driver
//!                          │                                  │
//!                      SessionConfig                  route events
//!                          └──────── RouteMockTable ◄─────────┘
//! ```
//!
//! Scenarios come from JSON files ([`scenario::load_file`]) or the
//! [`catalog`] of built-in flows.

pub mod assert;
pub mod browser;
pub mod catalog;
pub mod driver;
pub mod error;
pub mod mock;
pub mod runner;
pub mod scenario;
pub mod session;
#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use browser::LaunchOptions;
pub use driver::{Driver, Environment};
pub use error::{Error, Result};
pub use mock::{InterceptedRequest, MockResponse, Responder, Resolution, RouteMockTable, RoutePattern};
pub use runner::Runner;
pub use scenario::Scenario;
pub use session::{PageSession, PlaywrightSessionFactory, SessionConfig, SessionFactory};
pub use smoke_protocol as protocol;
pub use smoke_runtime as runtime;
