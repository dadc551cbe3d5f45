//! Browser driver error types

use thiserror::Error;

/// Driver-level failures. "Element not found" style outcomes are normal
/// values elsewhere in the crate; these variants mean the browser itself
/// misbehaved.
#[derive(Error, Debug)]
pub enum DriverError {
    #[error("Failed to launch browser: {0}")]
    LaunchFailed(String),

    #[error("Navigation failed: {0}")]
    NavigationFailed(String),

    #[error("JavaScript error: {0}")]
    JavaScriptError(String),

    #[error("Timeout: {0}")]
    Timeout(String),

    #[error("Element not found: {0}")]
    ElementNotFound(String),
}
