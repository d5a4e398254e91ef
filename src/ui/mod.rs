//! Terminal user interface.
//!
//! # Module Structure
//!
//! - `loop_runner` - Main event loop and terminal management
//! - `input` - Keyboard input handling
//! - `events` - Applying background completions to the app
//! - `helpers` - Request spawning and shared formatting
//! - `render` - Screen dispatch and overlays
//! - `login`, `tasks`, `articles`, `reader` - Per-screen widgets
//! - `status`, `help` - Status bar and help overlay

mod articles;
mod events;
mod help;
mod helpers;
mod input;
mod login;
mod loop_runner;
pub mod reader;
mod render;
mod status;
mod tasks;

pub use helpers::format_relative_time;
pub use loop_runner::{run, Action};
