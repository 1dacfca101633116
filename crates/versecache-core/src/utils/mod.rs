//! Time sources and display helpers.

pub mod format;
pub mod time;

pub use format::{age_display, format_elapsed};
pub use time::{Clock, ManualClock, SystemClock};
