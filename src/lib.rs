//! ctdash - terminal dashboard for a clang-tidy cache server.
//!
//! This library provides:
//! - `poller` - adaptive multi-rate refresh scheduler (focus-aware)
//! - `host` - tokio event loop delivering ticks and focus signals
//! - `actions` - stats and histogram refresh actions, shared display model
//! - `client` - HTTP access to the cache server
//! - `stats` - `/stats` wire model and rendered panel
//! - `fmt` - duration, ratio and count formatting
//! - `config` - validated startup configuration
//! - `tui` - interactive terminal front end

pub mod actions;
pub mod client;
pub mod config;
pub mod fmt;
pub mod host;
pub mod poller;
pub mod stats;
pub mod tui;
