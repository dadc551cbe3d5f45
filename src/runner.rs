//! Session runner
//!
//! Drives one full run: log in, open the matching-opportunities listing, then
//! view-and-apply card by card until the listing is exhausted, cards run out,
//! or the iteration cap is hit. Per-card failures are logged and skipped;
//! only login-stage failures end the run.

use std::time::Duration;

use thiserror::Error;
use tracing::{debug, info, warn};

use crate::browser::DriverError;
use crate::config::{Config, LOGIN_URL, OPPORTUNITIES_URL};
use crate::locate::{self, EMAIL_FIELD, PASSWORD_FIELD, SUBMIT_BUTTON, VIEW_BUTTON};
use crate::page::{Locator, PageDriver};
use crate::popups;
use crate::terminate;

// Settle delays after navigation/clicks. The portal re-renders the listing
// asynchronously after each apply, so these are load-bearing, not cosmetic.
const LISTING_SETTLE: Duration = Duration::from_millis(1500);
const VIEW_SETTLE: Duration = Duration::from_millis(700);
const APPLY_SETTLE: Duration = Duration::from_millis(1200);
const CARD_ERROR_BACKOFF: Duration = Duration::from_millis(1000);

const LOGIN_IDLE_TIMEOUT: Duration = Duration::from_secs(8);
const LISTING_IDLE_TIMEOUT: Duration = Duration::from_secs(8);
const ROLE_APPLY_TIMEOUT: Duration = Duration::from_secs(7);
const TEXT_APPLY_TIMEOUT: Duration = Duration::from_secs(3);

const ROLE_APPLY: Locator = Locator::Role {
    role: "button",
    name: "Apply",
};
const TEXT_APPLY: Locator = Locator::Text { substring: "Apply" };

#[derive(Error, Debug)]
pub enum SessionError {
    #[error("could not find email/password fields on the login page; selectors are stale")]
    LoginFormMissing,

    #[error(transparent)]
    Driver(#[from] DriverError),
}

/// Why the run stopped.
#[derive(Debug)]
pub enum Outcome {
    /// The listing showed its terminal banner.
    Exhausted,
    /// No View button left on the page, without a terminal banner.
    NoMoreCards,
    /// Hit the configured iteration cap.
    ReachedCap,
    /// A failure outside the per-card blast radius.
    Fatal(SessionError),
}

/// What one run accomplished.
#[derive(Debug)]
pub struct RunSummary {
    /// Applications submitted (cards where the Apply click landed).
    pub applied: u32,
    pub outcome: Outcome,
}

enum CardOutcome {
    Applied,
    Skipped,
    NoView,
}

/// Run the full session against an already-launched page.
pub async fn run_session<P>(page: &P, config: &Config) -> RunSummary
where
    P: PageDriver + ?Sized,
{
    let mut applied = 0u32;
    match drive(page, config, &mut applied).await {
        Ok(outcome) => RunSummary { applied, outcome },
        Err(e) => RunSummary {
            applied,
            outcome: Outcome::Fatal(e),
        },
    }
}

async fn drive<P>(page: &P, config: &Config, applied: &mut u32) -> Result<Outcome, SessionError>
where
    P: PageDriver + ?Sized,
{
    log_in(page, config).await?;

    info!("opening matching opportunities");
    page.goto(OPPORTUNITIES_URL).await?;
    if !page.wait_for_network_idle(LISTING_IDLE_TIMEOUT).await? {
        debug!("listing network never settled, continuing anyway");
    }
    tokio::time::sleep(LISTING_SETTLE).await;

    for attempt in 0..config.max_applies {
        if terminate::is_exhausted(page).await {
            return Ok(Outcome::Exhausted);
        }

        match apply_once(page).await {
            Ok(CardOutcome::Applied) => {
                *applied += 1;
                info!("applied to opportunity #{applied}");
                if terminate::is_exhausted(page).await {
                    return Ok(Outcome::Exhausted);
                }
            }
            Ok(CardOutcome::Skipped) => {
                if terminate::is_exhausted(page).await {
                    return Ok(Outcome::Exhausted);
                }
            }
            Ok(CardOutcome::NoView) => {
                info!("no View button left after {attempt} attempts");
                return Ok(Outcome::NoMoreCards);
            }
            Err(e) => {
                warn!("card attempt {attempt} failed, moving on: {e}");
                tokio::time::sleep(CARD_ERROR_BACKOFF).await;
            }
        }
    }

    info!("reached the {} apply cap", config.max_applies);
    Ok(Outcome::ReachedCap)
}

/// Handle one card: open it, find its Apply control, click through popups.
async fn apply_once<P>(page: &P) -> Result<CardOutcome, DriverError>
where
    P: PageDriver + ?Sized,
{
    let view = match locate::resolve(page, &VIEW_BUTTON).await? {
        Some(view) => view,
        None => return Ok(CardOutcome::NoView),
    };

    page.click_first(view, true).await?;
    tokio::time::sleep(VIEW_SETTLE).await;

    let apply = match resolve_apply(page).await? {
        Some(apply) => apply,
        None => {
            info!("card has no clickable Apply control, skipping");
            return Ok(CardOutcome::Skipped);
        }
    };

    page.click_first(apply, true).await?;

    popups::dismiss_promo(page).await;
    popups::confirm_apply(page).await;

    tokio::time::sleep(APPLY_SETTLE).await;
    Ok(CardOutcome::Applied)
}

/// The Apply control on an opened card. The role lookup gets the long wait;
/// the text fallback only a short one, since by then the page has already had
/// time to render.
async fn resolve_apply<P>(page: &P) -> Result<Option<&'static Locator>, DriverError>
where
    P: PageDriver + ?Sized,
{
    if page.count(&ROLE_APPLY).await? > 0 && page.wait_visible(&ROLE_APPLY, ROLE_APPLY_TIMEOUT).await? {
        return Ok(Some(&ROLE_APPLY));
    }
    if page.count(&TEXT_APPLY).await? > 0 && page.wait_visible(&TEXT_APPLY, TEXT_APPLY_TIMEOUT).await? {
        return Ok(Some(&TEXT_APPLY));
    }
    Ok(None)
}

async fn log_in<P>(page: &P, config: &Config) -> Result<(), SessionError>
where
    P: PageDriver + ?Sized,
{
    info!("logging in as {}", config.email);
    page.goto(LOGIN_URL).await.map_err(SessionError::from)?;
    if !page
        .wait_for_network_idle(LOGIN_IDLE_TIMEOUT)
        .await
        .map_err(SessionError::from)?
    {
        debug!("login page network never settled, continuing anyway");
    }

    let email = locate::resolve(page, &EMAIL_FIELD)
        .await
        .map_err(SessionError::from)?
        .ok_or(SessionError::LoginFormMissing)?;
    let password = locate::resolve(page, &PASSWORD_FIELD)
        .await
        .map_err(SessionError::from)?
        .ok_or(SessionError::LoginFormMissing)?;

    page.fill_first(email, &config.email)
        .await
        .map_err(SessionError::from)?;
    page.fill_first(password, &config.password)
        .await
        .map_err(SessionError::from)?;

    match locate::resolve(page, &SUBMIT_BUTTON)
        .await
        .map_err(SessionError::from)?
    {
        Some(submit) => page
            .click_first(submit, false)
            .await
            .map_err(SessionError::from)?,
        None => {
            debug!("no submit button, pressing Enter on the password field");
            page.press_enter(password)
                .await
                .map_err(SessionError::from)?;
        }
    }

    if !page
        .wait_for_network_idle(LOGIN_IDLE_TIMEOUT)
        .await
        .map_err(SessionError::from)?
    {
        debug!("post-login network never settled, continuing anyway");
    }
    Ok(())
}
