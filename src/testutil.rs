//! Scripted portal for driver-level tests.
//!
//! [`FakePage`] implements [`PageDriver`] over a small in-memory model of the
//! portal: a login form, a queue of opportunity cards, the two interstitial
//! popups, and a body-text blob for banner probes. Tests script the portal
//! through the builder methods and assert on the recorded interactions.

use std::collections::VecDeque;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::browser::DriverError;
use crate::config::Config;
use crate::page::{Locator, PageDriver};

/// One opportunity card and how it behaves when opened.
#[derive(Debug, Clone)]
pub struct FakeCard {
    apply_present: bool,
    apply_visible: bool,
    shows_promo: bool,
    shows_confirm: bool,
    error_on_view: bool,
}

impl FakeCard {
    /// Opens cleanly, Apply visible, no popups.
    pub fn clean() -> Self {
        Self {
            apply_present: true,
            apply_visible: true,
            shows_promo: false,
            shows_confirm: false,
            error_on_view: false,
        }
    }

    /// Apply exists in the DOM but never becomes visible.
    pub fn stuck() -> Self {
        Self {
            apply_visible: false,
            ..Self::clean()
        }
    }

    /// No Apply control at all (already-applied or withdrawn posting).
    pub fn missing() -> Self {
        Self {
            apply_present: false,
            apply_visible: false,
            ..Self::clean()
        }
    }

    /// Triggers both the promo popup and the confirmation dialog on apply.
    pub fn with_popups() -> Self {
        Self {
            shows_promo: true,
            shows_confirm: true,
            ..Self::clean()
        }
    }

    /// Clicking View fails at the driver level and eats the card.
    pub fn erroring() -> Self {
        Self {
            error_on_view: true,
            ..Self::clean()
        }
    }
}

#[derive(Debug, Default)]
struct PortalState {
    login_form: bool,
    has_submit: bool,
    cards: VecDeque<FakeCard>,
    open_card: Option<FakeCard>,
    promo_open: bool,
    confirm_open: bool,
    applies: u32,
    exhaust_after: Option<u32>,
    extra_text: String,
    visited: Vec<String>,
    filled: Vec<(String, String)>,
    clicks: Vec<String>,
    enter_pressed: bool,
    poisoned: bool,
}

impl PortalState {
    fn body_text(&self) -> String {
        let mut text = self.extra_text.to_lowercase();
        if self.exhaust_after.is_some_and(|n| self.applies >= n) {
            text.push_str(" no matching opportunities");
        }
        text
    }
}

/// What a locator means in portal terms.
enum Probe {
    View,
    Apply,
    Email,
    Password,
    Submit,
    PromoText,
    PromoClose,
    ConfirmText,
    DialogApply,
    BodyText(&'static str),
    Nothing,
}

fn classify(locator: &Locator) -> Probe {
    match locator {
        Locator::Role { name, .. } => match name.to_lowercase().as_str() {
            "view" => Probe::View,
            "apply" => Probe::Apply,
            "close" => Probe::PromoClose,
            "login" | "sign in" => Probe::Submit,
            _ => Probe::Nothing,
        },
        Locator::Text { substring } => {
            let lower = substring.to_lowercase();
            if lower.starts_with("follow us") {
                Probe::PromoText
            } else if lower.starts_with("want to apply") {
                Probe::ConfirmText
            } else if lower == "view" {
                Probe::View
            } else if lower == "apply" {
                Probe::Apply
            } else if lower == "sign in" || lower == "login" {
                Probe::Submit
            } else if lower == "×" || lower == "close" {
                Probe::PromoClose
            } else {
                Probe::BodyText(substring)
            }
        }
        Locator::Css { selector } => {
            if selector.contains("password") {
                Probe::Password
            } else if selector.contains("email") || selector.starts_with("input[") {
                Probe::Email
            } else if selector.contains("submit") {
                Probe::Submit
            } else {
                Probe::Nothing
            }
        }
        Locator::CssText {
            selector,
            substring,
        } => {
            let lower = substring.to_lowercase();
            if lower == "close" {
                Probe::PromoClose
            } else if selector.contains("dialog") && lower == "apply" {
                Probe::DialogApply
            } else {
                Probe::Nothing
            }
        }
    }
}

/// Scripted [`PageDriver`] implementation.
pub struct FakePage {
    state: Mutex<PortalState>,
}

impl FakePage {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(PortalState {
                login_form: true,
                has_submit: true,
                ..PortalState::default()
            }),
        }
    }

    /// Every driver call fails, for error-path tests.
    pub fn poisoned() -> Self {
        let page = Self::new();
        page.state.try_lock().unwrap().poisoned = true;
        page
    }

    pub fn with_cards(self, cards: Vec<FakeCard>) -> Self {
        self.state.try_lock().unwrap().cards = cards.into();
        self
    }

    /// Show the exhaustion banner once this many applies have landed.
    pub fn exhaust_after(self, n: u32) -> Self {
        self.state.try_lock().unwrap().exhaust_after = Some(n);
        self
    }

    pub fn without_login_form(self) -> Self {
        self.state.try_lock().unwrap().login_form = false;
        self
    }

    pub fn without_submit(self) -> Self {
        self.state.try_lock().unwrap().has_submit = false;
        self
    }

    pub fn with_body_text(self, text: &str) -> Self {
        self.state.try_lock().unwrap().extra_text = text.to_string();
        self
    }

    pub fn with_promo_open(self) -> Self {
        self.state.try_lock().unwrap().promo_open = true;
        self
    }

    pub fn with_confirm_open(self) -> Self {
        self.state.try_lock().unwrap().confirm_open = true;
        self
    }

    pub async fn applies(&self) -> u32 {
        self.state.lock().await.applies
    }

    pub async fn visited(&self) -> Vec<String> {
        self.state.lock().await.visited.clone()
    }

    pub async fn clicks(&self) -> Vec<String> {
        self.state.lock().await.clicks.clone()
    }

    pub async fn filled(&self) -> Vec<(String, String)> {
        self.state.lock().await.filled.clone()
    }

    pub async fn enter_pressed(&self) -> bool {
        self.state.lock().await.enter_pressed
    }

    pub async fn promo_open(&self) -> bool {
        self.state.lock().await.promo_open
    }

    pub async fn confirm_open(&self) -> bool {
        self.state.lock().await.confirm_open
    }
}

fn broken() -> DriverError {
    DriverError::JavaScriptError("page is gone".into())
}

impl PortalState {
    fn count_of(&self, probe: &Probe) -> usize {
        match probe {
            Probe::View => usize::from(!self.cards.is_empty()),
            Probe::Apply => {
                if self.confirm_open {
                    1
                } else {
                    usize::from(
                        self.open_card
                            .as_ref()
                            .is_some_and(|card| card.apply_present),
                    )
                }
            }
            Probe::Email => usize::from(self.login_form),
            Probe::Password => usize::from(self.login_form),
            Probe::Submit => usize::from(self.login_form && self.has_submit),
            Probe::PromoText | Probe::PromoClose => usize::from(self.promo_open),
            Probe::ConfirmText | Probe::DialogApply => usize::from(self.confirm_open),
            Probe::BodyText(substring) => {
                usize::from(self.body_text().contains(&substring.to_lowercase()))
            }
            Probe::Nothing => 0,
        }
    }
}

#[async_trait]
impl PageDriver for FakePage {
    async fn goto(&self, url: &str) -> Result<(), DriverError> {
        let mut state = self.state.lock().await;
        if state.poisoned {
            return Err(broken());
        }
        state.visited.push(url.to_string());
        Ok(())
    }

    async fn wait_for_network_idle(&self, _timeout: Duration) -> Result<bool, DriverError> {
        let state = self.state.lock().await;
        if state.poisoned {
            return Err(broken());
        }
        Ok(true)
    }

    async fn count(&self, locator: &Locator) -> Result<usize, DriverError> {
        let state = self.state.lock().await;
        if state.poisoned {
            return Err(broken());
        }
        Ok(state.count_of(&classify(locator)))
    }

    async fn click_first(&self, locator: &Locator, _force: bool) -> Result<(), DriverError> {
        let mut state = self.state.lock().await;
        if state.poisoned {
            return Err(broken());
        }
        match classify(locator) {
            Probe::View => {
                let card = state
                    .cards
                    .pop_front()
                    .ok_or_else(|| DriverError::ElementNotFound("View".into()))?;
                if card.error_on_view {
                    return Err(DriverError::JavaScriptError(
                        "node detached during click".into(),
                    ));
                }
                state.clicks.push("view".into());
                state.open_card = Some(card);
            }
            Probe::Apply | Probe::DialogApply => {
                if state.confirm_open {
                    state.confirm_open = false;
                    state.clicks.push("confirm-apply".into());
                } else {
                    let card = state
                        .open_card
                        .take()
                        .ok_or_else(|| DriverError::ElementNotFound("Apply".into()))?;
                    state.applies += 1;
                    state.promo_open = card.shows_promo;
                    state.confirm_open = card.shows_confirm;
                    state.clicks.push("apply".into());
                }
            }
            Probe::PromoClose => {
                state.promo_open = false;
                state.clicks.push("promo-close".into());
            }
            Probe::Submit => {
                state.clicks.push("submit".into());
            }
            _ => return Err(DriverError::ElementNotFound(format!("{locator:?}"))),
        }
        Ok(())
    }

    async fn fill_first(&self, locator: &Locator, value: &str) -> Result<(), DriverError> {
        let mut state = self.state.lock().await;
        if state.poisoned {
            return Err(broken());
        }
        let field = match classify(locator) {
            Probe::Email => "email",
            Probe::Password => "password",
            _ => return Err(DriverError::ElementNotFound(format!("{locator:?}"))),
        };
        state.filled.push((field.to_string(), value.to_string()));
        Ok(())
    }

    async fn press_enter(&self, _locator: &Locator) -> Result<(), DriverError> {
        let mut state = self.state.lock().await;
        if state.poisoned {
            return Err(broken());
        }
        state.enter_pressed = true;
        Ok(())
    }

    async fn wait_visible(
        &self,
        locator: &Locator,
        _timeout: Duration,
    ) -> Result<bool, DriverError> {
        let state = self.state.lock().await;
        if state.poisoned {
            return Err(broken());
        }
        let visible = match classify(locator) {
            Probe::Apply => {
                state.confirm_open
                    || state
                        .open_card
                        .as_ref()
                        .is_some_and(|card| card.apply_present && card.apply_visible)
            }
            probe => state.count_of(&probe) > 0,
        };
        Ok(visible)
    }
}

/// A config for driver tests; credentials are never sent anywhere.
pub fn test_config(max_applies: u32) -> Config {
    Config {
        email: "candidate@example.com".into(),
        password: "correct-horse".into(),
        headless: true,
        slow_mo: Duration::ZERO,
        max_applies,
    }
}
