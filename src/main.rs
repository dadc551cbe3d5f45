use std::process::ExitCode;

use tracing::{error, info};

use applier::browser::BrowserSession;
use applier::config::Config;
use applier::runner::{self, Outcome};

#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();
    let _log_guard = applier::init_logging();

    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            error!("{e}");
            return ExitCode::FAILURE;
        }
    };

    let session = match BrowserSession::launch(&config).await {
        Ok(session) => session,
        Err(e) => {
            error!("{e}");
            return ExitCode::FAILURE;
        }
    };

    let summary = runner::run_session(&session, &config).await;
    info!(
        "run finished ({:?}); total applied: {}",
        summary.outcome, summary.applied
    );

    session.close().await;

    match summary.outcome {
        Outcome::Fatal(e) => {
            error!("session failed: {e}");
            ExitCode::FAILURE
        }
        _ => ExitCode::SUCCESS,
    }
}
