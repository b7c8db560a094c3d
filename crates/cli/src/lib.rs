//! Command line front end for the smoke scenario harness.
//!
//! Settings are layered from `smoke.json`, `SMOKE_*` environment variables
//! and flags ([`config`]); subcommands live in [`commands`] and render
//! through [`output`].

pub mod cli;
pub mod commands;
pub mod config;
pub mod error;
pub mod logging;
pub mod output;
