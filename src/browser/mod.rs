//! Browser provisioning module
//!
//! Launches and controls the single Chromium instance the session runs in,
//! configured to minimize automation fingerprinting.

mod errors;
mod session;

pub use errors::DriverError;
pub use session::BrowserSession;
