//! Terminal User Interface for ctdash.
//!
//! Renders the stats panel, the histogram slots and the poller's stream
//! counters. Terminal focus reporting drives the poller's focus state.

mod app;
mod event;
mod input;
mod render;
mod style;

pub use app::App;
