//! Browser automation for JavaScript-heavy airline search pages.
//!
//! Exposes a blocking-style session contract (navigate, bounded waits,
//! extraction) over a headless Chromium instance, with a randomized
//! desktop fingerprint and navigation retries.

pub mod actions;
pub mod engine;
pub mod error;
pub mod fingerprint;
pub mod session;

pub use actions::{BrowserSession, SessionFactory};
pub use engine::{ChromeEngine, SessionSettings};
pub use error::{BrowserError, Result};
pub use session::ChromeSession;
