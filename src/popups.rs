//! Interstitial popup handling
//!
//! Two popups can land between clicking Apply and the application actually
//! registering: a "follow us on social media" promo and a per-employer
//! confirmation dialog. Both handlers are idempotent and swallow their own
//! failures; a stuck popup should cost one card, not the session.

use std::time::Duration;

use tracing::{debug, warn};

use crate::locate::{self, PROMO_CLOSE};
use crate::page::{Locator, PageDriver};

const PROMO_TEXT: Locator = Locator::Text {
    substring: "follow us on social media",
};

// Truncated on purpose: the dialog reads "want to apply at <employer>", so
// only the prefix is stable across cards.
const CONFIRM_TEXT: Locator = Locator::Text {
    substring: "want to apply at t",
};

const CONFIRM_ROLE_APPLY: Locator = Locator::Role {
    role: "button",
    name: "Apply",
};

const CONFIRM_TEXT_APPLY: Locator = Locator::Text { substring: "Apply" };

const DIALOG_APPLY: Locator = Locator::CssText {
    selector: "div[role=\"dialog\"] button",
    substring: "Apply",
};

const PROMO_SETTLE: Duration = Duration::from_millis(400);
const CONFIRM_SETTLE: Duration = Duration::from_millis(500);
const DIALOG_SETTLE: Duration = Duration::from_millis(400);

/// Dismiss the social-media promo popup if it is showing. No-op otherwise.
pub async fn dismiss_promo<P>(page: &P)
where
    P: PageDriver + ?Sized,
{
    match page.count(&PROMO_TEXT).await {
        Ok(0) => return,
        Ok(_) => {}
        Err(e) => {
            debug!("promo probe failed: {e}");
            return;
        }
    }

    debug!("promo popup showing, closing it");
    match locate::resolve(page, &PROMO_CLOSE).await {
        Ok(Some(close)) => {
            if let Err(e) = page.click_first(close, true).await {
                warn!("failed to close promo popup: {e}");
                return;
            }
            tokio::time::sleep(PROMO_SETTLE).await;
        }
        Ok(None) => warn!("promo popup showing but no close control found"),
        Err(e) => warn!("failed to locate promo close control: {e}"),
    }
}

/// Confirm the per-employer apply dialog if it is showing.
///
/// After the phrase-based path, a selector-based dialog probe runs
/// unconditionally as an independent fallback for dialogs whose copy drifted.
pub async fn confirm_apply<P>(page: &P)
where
    P: PageDriver + ?Sized,
{
    match page.count(&CONFIRM_TEXT).await {
        Ok(n) if n > 0 => {
            debug!("confirmation dialog showing, clicking Apply");
            if click_confirm(page).await {
                tokio::time::sleep(CONFIRM_SETTLE).await;
                return;
            }
        }
        Ok(_) => {}
        Err(e) => debug!("confirmation probe failed: {e}"),
    }

    match page.count(&DIALOG_APPLY).await {
        Ok(n) if n > 0 => {
            debug!("dialog Apply button present, clicking it");
            if let Err(e) = page.click_first(&DIALOG_APPLY, true).await {
                warn!("failed to click dialog Apply button: {e}");
                return;
            }
            tokio::time::sleep(DIALOG_SETTLE).await;
        }
        Ok(_) => {}
        Err(e) => debug!("dialog probe failed: {e}"),
    }
}

async fn click_confirm<P>(page: &P) -> bool
where
    P: PageDriver + ?Sized,
{
    for locator in [&CONFIRM_ROLE_APPLY, &CONFIRM_TEXT_APPLY] {
        match page.count(locator).await {
            Ok(n) if n > 0 => match page.click_first(locator, true).await {
                Ok(()) => return true,
                Err(e) => {
                    warn!("failed to click confirmation Apply: {e}");
                    return false;
                }
            },
            Ok(_) => {}
            Err(e) => {
                warn!("failed to probe confirmation Apply: {e}");
                return false;
            }
        }
    }
    warn!("confirmation dialog showing but no Apply control found");
    false
}
