//! `crawlpipe` crate (library surface).
//!
//! The entrypoint for end users is the `crawlpipe` binary (HTTP API + MCP servers).
//! The adapters live here so they can be embedded and driven from integration tests.

pub mod api;
pub mod config;
pub mod logging;
#[cfg(feature = "mcp")]
pub mod mcp;

pub use crawlpipe_core as core;
