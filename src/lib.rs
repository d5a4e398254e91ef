//! Terminal client for a news-aggregation backend.
//!
//! The binary in `main.rs` wires these modules together; they are exposed
//! as a library so integration tests can drive the API client and the
//! reader controller directly.

pub mod api;
pub mod app;
pub mod config;
pub mod keybindings;
pub mod reader;
pub mod theme;
pub mod ui;
pub mod util;
