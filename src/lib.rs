//! Automated job-application runner for the Instahyre candidate portal.
//!
//! Logs in with credentials from the environment, opens the matching
//! opportunities listing, and applies to each card in turn until the listing
//! is exhausted or a configured cap is reached. The apply loop talks to the
//! browser only through the [`page::PageDriver`] seam, so everything above
//! the Chromium layer is testable against a scripted portal.

use std::path::PathBuf;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

pub mod browser;
pub mod config;
pub mod locate;
pub mod page;
pub mod popups;
pub mod runner;
pub mod terminate;

#[cfg(test)]
pub(crate) mod testutil;

/// Where run logs land: `<config dir>/instahyre-applier/logs`.
pub fn log_dir() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("instahyre-applier").join("logs"))
}

/// Install the tracing subscriber: console output plus, when the log
/// directory is writable, a daily-rotated file. The returned guard must stay
/// alive for the life of the process or buffered file output is lost.
pub fn init_logging() -> Option<WorkerGuard> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let console = tracing_subscriber::fmt::layer()
        .with_target(false)
        .with_filter(filter);

    let file_layer = log_dir()
        .and_then(|dir| std::fs::create_dir_all(&dir).ok().map(|_| dir))
        .map(|dir| {
            let appender = tracing_appender::rolling::daily(dir, "instahyre-applier.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = tracing_subscriber::fmt::layer()
                .with_writer(writer)
                .with_ansi(false)
                .with_filter(EnvFilter::new("debug"));
            (layer, guard)
        });

    match file_layer {
        Some((layer, guard)) => {
            tracing_subscriber::registry()
                .with(console)
                .with(layer)
                .init();
            Some(guard)
        }
        None => {
            tracing_subscriber::registry().with(console).init();
            None
        }
    }
}
