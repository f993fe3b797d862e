//! Event scanner: bounded block-window computation and windowed event fetch

use crate::chain::{ChainSession, EventSource};
use crate::contracts::ContractBinding;
use crate::events::{DomainEvent, EventDecoder, EventKind};
use crate::metrics;

use ethers::types::Filter;
use tracing::{debug, warn};

/// Number of most recent blocks scanned in one pass.
pub const SCAN_DEPTH: u64 = 5;

/// Inclusive block range scanned for events in one pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScanWindow {
    pub from_block: u64,
    pub to_block: u64,
}

impl ScanWindow {
    /// The most recent `SCAN_DEPTH` blocks ending at `latest`, clamped at
    /// genesis.
    pub fn for_height(latest: u64) -> Self {
        Self {
            from_block: latest.saturating_sub(SCAN_DEPTH - 1),
            to_block: latest,
        }
    }
}

/// Scan window for a session, from the height cached at connect time.
pub fn compute_window(session: &ChainSession) -> ScanWindow {
    ScanWindow::for_height(session.current_height())
}

/// Fetch and decode the events of one kind within the window.
///
/// The result is a fully materialized batch scoped to the window. A
/// provider-level query failure degrades to an empty batch with a warning;
/// a log that fails schema validation is reported and skipped.
pub async fn fetch_events<S: EventSource>(
    source: &S,
    binding: &ContractBinding,
    kind: EventKind,
    window: ScanWindow,
) -> Vec<DomainEvent> {
    let decoder = match EventDecoder::new(binding, kind) {
        Ok(decoder) => decoder,
        Err(e) => {
            warn!("Cannot scan {} chain: {}", source.role(), e);
            return Vec::new();
        }
    };

    let filter = Filter::new()
        .address(binding.address)
        .topic0(decoder.topic0())
        .from_block(window.from_block)
        .to_block(window.to_block);

    let logs = match source.get_logs(&filter).await {
        Ok(logs) => logs,
        Err(e) => {
            warn!(
                "Failed to fetch {} events on {} chain: {}",
                kind.name(),
                source.role(),
                e
            );
            return Vec::new();
        }
    };

    let mut events = Vec::with_capacity(logs.len());
    for log in &logs {
        match decoder.decode(log) {
            Ok(event) => events.push(event),
            Err(e) => warn!("Skipping undecodable log: {}", e),
        }
    }

    metrics::record_events_scanned(binding.role, kind.name(), events.len() as u64);
    debug!(
        "Scanned {} chain blocks {}..={}: {} {} event(s)",
        source.role(),
        window.from_block,
        window.to_block,
        events.len(),
        kind.name()
    );

    events
}
