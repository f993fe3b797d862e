//! Warden relayer - single-pass cross-chain bridge event relay
//!
//! Scans the most recent blocks of the requested chain for bridge events and
//! submits the counterpart authorizing transaction on the other chain. One
//! invocation performs one pass; an external scheduler invokes it repeatedly.

use std::env;
use std::process::ExitCode;
use tracing::{debug, error, info};

mod chain;
mod config;
mod contracts;
mod dispatcher;
mod error;
mod events;
mod metrics;
mod orchestrator;
mod scanner;

use config::Settings;
use error::{RelayerError, RelayerResult};
use orchestrator::{Orchestrator, PassCode};

#[tokio::main]
async fn main() -> ExitCode {
    init_logging();

    info!("Starting warden relayer v{}", env!("CARGO_PKG_VERSION"));

    let Some(direction) = env::args().nth(1) else {
        error!("usage: warden-relayer <source|destination>");
        return ExitCode::from(2);
    };

    let settings = match Settings::load() {
        Ok(settings) => settings,
        Err(e) => {
            // Configuration failures are pass-fatal and pre-dispatch, so the
            // caller contract reports them as the no-action code.
            error!("Failed to load configuration: {:#}", e);
            return ExitCode::from(0);
        }
    };

    let orchestrator = Orchestrator::new(settings);
    let result = orchestrator.run(&direction).await;
    match &result {
        Ok(_) => {}
        Err(RelayerError::Direction(d)) => {
            error!(
                "Invalid direction {:?}: expected \"source\" or \"destination\"",
                d
            );
        }
        Err(e) => error!("Relay pass aborted: {}", e),
    }

    debug!("Pass metrics:\n{}", metrics::snapshot());
    ExitCode::from(pass_exit_code(&result))
}

/// Map a pass result to the coarse caller contract: 0 for nothing to do or a
/// pre-dispatch failure, 1 for dispatch attempted, 2 for a usage error.
fn pass_exit_code(result: &RelayerResult<PassCode>) -> u8 {
    match result {
        Ok(pass) => pass.code(),
        Err(RelayerError::Direction(_)) => 2,
        Err(_) => 0,
    }
}

fn init_logging() {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,warden_relayer=debug,hyper=warn"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(true))
        .init();
}
