//! Extraction client for company pages on the source platform.
//!
//! One long-lived browser session (cookies + optional credential login over
//! Browserless) is shared by all fetches. Profile fetches report a typed
//! outcome; post and member fetches degrade to empty on any internal error.

mod parse;
mod scraper;
mod session;

pub use scraper::PageScraper;
pub use session::SessionOptions;
