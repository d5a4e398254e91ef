//! Page simplification for the reader screen.
//!
//! [`fetch`] runs one cancellable call against the backend's simplify
//! endpoint; [`controller`] owns that call and the Idle / Fetching /
//! Simplified state the screen renders from.

pub mod controller;
pub mod fetch;

pub use controller::{Applied, ReaderController, ReaderError, ReaderNotice, ReaderPhase, ReaderState};
pub use fetch::{ContentService, FetchEvent, FetchOutcome, FetchRequest, TaskHandle};
