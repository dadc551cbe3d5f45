//! The page seam between the apply loop and the browser.
//!
//! The core never touches CDP directly; it talks to a [`PageDriver`], which the
//! real Chromium session implements and tests replace with a scripted portal.

use std::time::Duration;

use async_trait::async_trait;

use crate::browser::DriverError;

/// A single lookup strategy for a semantic UI target.
///
/// Strategies are static data: each semantic target owns an ordered list of
/// these, tried in priority order by the resolver.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Locator {
    /// Accessibility-role lookup with an exact (case-insensitive) accessible
    /// name. Most robust against markup drift.
    Role {
        role: &'static str,
        name: &'static str,
    },
    /// Case-insensitive substring match against visible element text.
    Text { substring: &'static str },
    /// Raw CSS selector fallback.
    Css { selector: &'static str },
    /// CSS selector further filtered by a case-insensitive text substring,
    /// for "any button/link that says X" lookups CSS alone cannot express.
    CssText {
        selector: &'static str,
        substring: &'static str,
    },
}

/// Driver capability consumed by the session loop.
///
/// "Not present" is a value everywhere in this contract: `count` returns 0,
/// the bounded waits return `Ok(false)` on timeout. `Err` is reserved for
/// driver-level failures (browser gone, script evaluation broke).
#[async_trait]
pub trait PageDriver: Send + Sync {
    /// Navigate and wait (bounded) for the load event.
    async fn goto(&self, url: &str) -> Result<(), DriverError>;

    /// Wait until network activity settles or the deadline passes.
    /// Returns `Ok(false)` on timeout; some pages stay busy indefinitely and
    /// that must not be fatal.
    async fn wait_for_network_idle(&self, timeout: Duration) -> Result<bool, DriverError>;

    /// Number of elements the locator currently matches.
    async fn count(&self, locator: &Locator) -> Result<usize, DriverError>;

    /// Click the first match. `force` dispatches the click without
    /// obstruction/stability checks, for elements under transient overlays.
    async fn click_first(&self, locator: &Locator, force: bool) -> Result<(), DriverError>;

    /// Fill the first match with `value` (input-event semantics).
    async fn fill_first(&self, locator: &Locator, value: &str) -> Result<(), DriverError>;

    /// Press Enter on the first match, submitting its form if it has one.
    async fn press_enter(&self, locator: &Locator) -> Result<(), DriverError>;

    /// Wait (bounded) for the first match to become visible.
    /// Returns `Ok(false)` if nothing became visible in time.
    async fn wait_visible(&self, locator: &Locator, timeout: Duration)
        -> Result<bool, DriverError>;
}
