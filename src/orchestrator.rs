//! Run orchestrator: wires connector, registry, scanner and dispatcher for
//! one relay pass
//!
//! A pass is stateless: sessions are opened, the requested side is scanned,
//! actions are dispatched toward the other side, and everything is dropped.
//! Because consecutive passes re-scan overlapping block windows, an event
//! near the window edge can be observed and relayed more than once; the
//! reference design carries no deduplication and none is added here.

use crate::chain::{self, ChainRole};
use crate::config::Settings;
use crate::contracts::{ContractRegistry, Warden};
use crate::dispatcher::RelayDispatcher;
use crate::error::RelayerResult;
use crate::events::EventKind;
use crate::scanner;

use futures::future;
use tracing::{debug, info};

/// Coarse pass-level result reported to the caller.
///
/// Success/failure counts are reported via logging, not in the code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PassCode {
    /// Nothing to relay in the scanned window.
    NoAction,
    /// The dispatch phase was reached and attempted.
    Dispatched,
}

impl PassCode {
    pub fn code(self) -> u8 {
        match self {
            PassCode::NoAction => 0,
            PassCode::Dispatched => 1,
        }
    }
}

/// Drives one relay pass in the requested direction.
pub struct Orchestrator {
    settings: Settings,
}

impl Orchestrator {
    pub fn new(settings: Settings) -> Self {
        Self { settings }
    }

    /// Run one relay pass.
    ///
    /// The direction is validated before any file or chain I/O. Registry and
    /// connection failures are pass-fatal; an empty scan window is a normal
    /// no-action outcome.
    pub async fn run(&self, direction: &str) -> RelayerResult<PassCode> {
        let scanned: ChainRole = direction.parse()?;

        let registry = ContractRegistry::from_file(&self.settings.relayer.contract_info)?;
        let source_binding = registry.binding(ChainRole::Source)?;
        let destination_binding = registry.binding(ChainRole::Destination)?;
        let warden = Warden::resolve(&source_binding, &destination_binding)?;

        // Both sides are always needed: actions cross from the scanned chain
        // to the other one.
        let rpc_timeout = self.settings.rpc_timeout();
        let (source_session, destination_session) = future::try_join(
            chain::connect(
                ChainRole::Source,
                self.settings.endpoint(ChainRole::Source),
                rpc_timeout,
            ),
            chain::connect(
                ChainRole::Destination,
                self.settings.endpoint(ChainRole::Destination),
                rpc_timeout,
            ),
        )
        .await?;
        debug_assert!(source_session.is_connected() && destination_session.is_connected());

        let (scan_session, scan_binding, target_session, target_binding) = match scanned {
            ChainRole::Source => (
                &source_session,
                &source_binding,
                &destination_session,
                &destination_binding,
            ),
            ChainRole::Destination => (
                &destination_session,
                &destination_binding,
                &source_session,
                &source_binding,
            ),
        };

        let window = scanner::compute_window(scan_session);
        let kind = EventKind::for_role(scanned);
        debug!(
            "Scanning {} chain at {} for {} events",
            scanned,
            scan_session.endpoint(),
            kind.name()
        );
        let events = scanner::fetch_events(scan_session, scan_binding, kind, window).await;

        if events.is_empty() {
            info!(
                "No {} events found on {} in blocks {}..={}",
                kind.name(),
                scanned,
                window.from_block,
                window.to_block
            );
            return Ok(PassCode::NoAction);
        }

        let dispatcher = RelayDispatcher::new(
            target_session,
            target_binding,
            &warden,
            self.settings.gas.clone(),
        );
        let outcome = dispatcher.dispatch(scanned, &events).await;

        info!(
            "Relay pass complete: {} submitted, {} failed out of {} event(s)",
            outcome.submitted,
            outcome.failed,
            events.len()
        );
        Ok(PassCode::Dispatched)
    }
}
