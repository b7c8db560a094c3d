//! Data model for the smoke scenario harness.
//!
//! This crate holds the serde types that describe scenarios on disk and the
//! results that come out of running them:
//!
//! - [`types`]: viewport, bootstrap payload, browser and policy enums
//! - [`selector`]: helper constructors for Playwright selector strings
//! - [`action`]: the ordered UI actions and assertions a scenario performs
//! - [`scenario`]: the JSON scenario file format
//! - [`result`]: scenario states, step records and the aggregate report
//!
//! Types here are pure data. Matching, driving and rendering live in the
//! `smoke-core` and `smoke-cli` crates.

pub mod action;
pub mod result;
pub mod scenario;
pub mod selector;
pub mod types;

pub use action::*;
pub use result::*;
pub use scenario::*;
pub use types::*;
