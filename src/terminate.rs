//! End-of-listing detection
//!
//! The listing page shows a terminal banner once no opportunities remain.
//! Detection fails open: if the probe itself errors, the loop keeps going and
//! lets its own iteration cap bound the run.

use tracing::{debug, info};

use crate::page::{Locator, PageDriver};

/// Banner phrases that mark an exhausted listing.
const EXHAUSTED_PHRASES: &[Locator] = &[
    Locator::Text {
        substring: "no matching opportunities",
    },
    Locator::Text {
        substring: "no opportunities found",
    },
];

/// True when the listing shows one of the terminal banners.
pub async fn is_exhausted<P>(page: &P) -> bool
where
    P: PageDriver + ?Sized,
{
    for phrase in EXHAUSTED_PHRASES {
        match page.count(phrase).await {
            Ok(n) if n > 0 => {
                info!("listing exhausted: page shows {:?}", phrase);
                return true;
            }
            Ok(_) => {}
            Err(e) => {
                debug!("exhaustion probe failed, assuming more cards: {e}");
                return false;
            }
        }
    }
    false
}
