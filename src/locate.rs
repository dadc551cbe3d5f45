//! Locator resolver
//!
//! Every UI element the bot touches is a semantic [`Target`]: a description
//! plus an ordered cascade of lookup strategies, tried until one matches.
//! Keeping the cascades in one static table makes the portal coupling visible
//! in a single place when the markup drifts.

use tracing::debug;

use crate::browser::DriverError;
use crate::page::{Locator, PageDriver};

/// A semantic UI target with its strategy cascade.
pub struct Target {
    pub describe: &'static str,
    pub strategies: &'static [Locator],
}

/// The per-card "View" control on the listing.
pub const VIEW_BUTTON: Target = Target {
    describe: "the View button",
    strategies: &[
        Locator::Role {
            role: "button",
            name: "View",
        },
        Locator::Text { substring: "View" },
    ],
};

/// The email field on the login form. The final loose fallback can match
/// unrelated inputs (e.g. a search box); kept deliberately, see DESIGN.md.
pub const EMAIL_FIELD: Target = Target {
    describe: "the email field",
    strategies: &[
        Locator::Css {
            selector: "input[type=\"email\"], input[name*=email], input[id*=email], \
                       input[placeholder*=Email], input[placeholder*=email]",
        },
        Locator::Css {
            selector: "input[name], input[id], input[placeholder]",
        },
    ],
};

/// The password field on the login form.
pub const PASSWORD_FIELD: Target = Target {
    describe: "the password field",
    strategies: &[
        Locator::Css {
            selector: "input[type=\"password\"], input[name*=password], input[id*=password], \
                       input[placeholder*=Password], input[placeholder*=password]",
        },
        Locator::Css {
            selector: "input[type=\"password\"]",
        },
    ],
};

/// The login submit control. Absent one, the caller falls back to pressing
/// Enter on the password field.
pub const SUBMIT_BUTTON: Target = Target {
    describe: "the login submit button",
    strategies: &[
        Locator::Css {
            selector: "button[type=\"submit\"]",
        },
        Locator::Role {
            role: "button",
            name: "Login",
        },
        Locator::Text {
            substring: "Sign in",
        },
    ],
};

/// Close control for the social-media promo popup.
pub const PROMO_CLOSE: Target = Target {
    describe: "the promo popup close button",
    strategies: &[
        Locator::Role {
            role: "button",
            name: "Close",
        },
        Locator::Text { substring: "×" },
        Locator::CssText {
            selector: "button, a",
            substring: "Close",
        },
    ],
};

/// Resolve a target against the current page: first strategy with at least
/// one match wins. `Ok(None)` is the normal "not present" outcome, never an
/// error; `Err` only surfaces driver-level failures.
pub async fn resolve<'t, P>(
    page: &P,
    target: &'t Target,
) -> Result<Option<&'t Locator>, DriverError>
where
    P: PageDriver + ?Sized,
{
    for strategy in target.strategies {
        if page.count(strategy).await? > 0 {
            return Ok(Some(strategy));
        }
        debug!("{}: no match for {:?}", target.describe, strategy);
    }
    Ok(None)
}
