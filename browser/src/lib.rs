//! Chromium-backed [`BrowserDriver`](domtrace_core::BrowserDriver).

mod driver;
mod signals;

pub use driver::ChromiumDriver;
pub use driver::driver_factory;

/// Name of the page-to-host binding the click tracker posts to.
pub const CLICK_BINDING: &str = "recordClick";

/// In-page click tracker. Computes XPath and CSS locators for the clicked
/// element and posts the payload through [`CLICK_BINDING`].
pub const CLICK_TRACKER_JS: &str = include_str!("js/click_tracker.js");
