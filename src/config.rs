//! Run configuration
//!
//! All knobs come from the environment (or a `.env` file loaded by the
//! binary), are resolved once at startup into a [`Config`] value, and are
//! passed by reference from there on. Core logic never reads the environment.

use std::time::Duration;

use thiserror::Error;

/// Login page for the portal.
pub const LOGIN_URL: &str = "https://www.instahyre.com/login";

/// Listing page, filtered to matching opportunities.
pub const OPPORTUNITIES_URL: &str =
    "https://www.instahyre.com/candidate/opportunities/?matching=true";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("{0} is not set; add it to your environment or .env file")]
    MissingCredential(&'static str),
}

/// Startup configuration for one run.
#[derive(Debug, Clone)]
pub struct Config {
    pub email: String,
    pub password: String,
    /// Run Chromium headless (default). Set `HEADLESS=false` for a headed
    /// window.
    pub headless: bool,
    /// Extra delay injected before every browser action, for watching runs
    /// in headed mode.
    pub slow_mo: Duration,
    /// Upper bound on loop iterations (views attempted, not applies landed).
    pub max_applies: u32,
}

impl Config {
    /// Resolve configuration from the environment.
    ///
    /// Missing credentials are a fatal startup error; everything else falls
    /// back to a default, with unparsable values treated as unset.
    pub fn from_env() -> Result<Self, ConfigError> {
        let email = required("INSTAHYRE_EMAIL")?;
        let password = required("INSTAHYRE_PASSWORD")?;

        let headless = std::env::var("HEADLESS")
            .map(|v| v.to_lowercase() != "false")
            .unwrap_or(true);

        let slow_mo: u64 = std::env::var("SLOW_MO")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(0);

        let max_applies: u32 = std::env::var("MAX_APPLIES")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(100);

        Ok(Self {
            email,
            password,
            headless,
            slow_mo: Duration::from_millis(slow_mo),
            max_applies,
        })
    }
}

fn required(key: &'static str) -> Result<String, ConfigError> {
    std::env::var(key)
        .ok()
        .filter(|v| !v.is_empty())
        .ok_or(ConfigError::MissingCredential(key))
}
