//! Shared helpers for text measurement and address handling.
//!
//! ```
//! use newsdesk::util::{display_width, normalize_address, truncate_to_width};
//!
//! assert_eq!(normalize_address("example.com/a"), "https://example.com/a");
//! assert_eq!(display_width("新闻"), 4);
//! assert_eq!(truncate_to_width("Breaking news", 8), "Break...");
//! ```

mod address;
mod task;
mod text;

pub use address::{normalize_address, validate_url_for_open, UrlValidationError};
pub use task::catch_task_panic;
pub use text::{display_width, mask, strip_control_chars, truncate_to_width};

/// Longest search query accepted by list screens.
pub const MAX_SEARCH_QUERY_LENGTH: usize = 256;

/// Longest address accepted by the reader address bar.
pub const MAX_ADDRESS_LENGTH: usize = 2048;
