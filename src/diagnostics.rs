//! Advisory events emitted while fetching and normalizing.
//!
//! Sinks observe degradation (transport failures, unexpected payloads,
//! dropped records) without influencing what the operations return.

use std::sync::Mutex;

use tracing::{debug, warn};

use crate::sources::pagination::StopReason;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Diagnostic {
    PageFetched {
        endpoint: String,
        page: usize,
        count: usize,
        total: usize,
    },
    FetchStopped {
        endpoint: String,
        reason: StopReason,
        pages: usize,
        total: usize,
    },
    TransportFailed {
        endpoint: String,
        page: Option<usize>,
        message: String,
    },
    UnexpectedShape {
        endpoint: String,
        page: Option<usize>,
        found: &'static str,
    },
    RecordSkipped {
        kind: &'static str,
    },
    OperationFailed {
        operation: &'static str,
        message: String,
    },
}

pub trait DiagnosticSink: Send + Sync {
    fn record(&self, event: Diagnostic);
}

/// Forwards diagnostics to `tracing`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl DiagnosticSink for TracingSink {
    fn record(&self, event: Diagnostic) {
        match event {
            Diagnostic::PageFetched {
                endpoint,
                page,
                count,
                total,
            } => debug!(%endpoint, page, count, total, "fetched page"),
            Diagnostic::FetchStopped {
                endpoint,
                reason,
                pages,
                total,
            } => debug!(%endpoint, ?reason, pages, total, "pagination stopped"),
            Diagnostic::TransportFailed {
                endpoint,
                page,
                message,
            } => warn!(%endpoint, ?page, "BioPortal request failed: {message}"),
            Diagnostic::UnexpectedShape {
                endpoint,
                page,
                found,
            } => warn!(%endpoint, ?page, "Unexpected BioPortal response format: {found}"),
            Diagnostic::RecordSkipped { kind } => debug!(kind, "skipped incomplete record"),
            Diagnostic::OperationFailed { operation, message } => {
                warn!(operation, "BioPortal operation degraded to empty result: {message}")
            }
        }
    }
}

/// Keeps every event in memory, in arrival order.
#[derive(Debug, Default)]
pub struct RecordingSink {
    events: Mutex<Vec<Diagnostic>>,
}

impl RecordingSink {
    pub fn events(&self) -> Vec<Diagnostic> {
        match self.events.lock() {
            Ok(events) => events.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}

impl DiagnosticSink for RecordingSink {
    fn record(&self, event: Diagnostic) {
        match self.events.lock() {
            Ok(mut events) => events.push(event),
            Err(poisoned) => poisoned.into_inner().push(event),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recording_sink_keeps_arrival_order() {
        let sink = RecordingSink::default();
        sink.record(Diagnostic::RecordSkipped { kind: "term" });
        sink.record(Diagnostic::OperationFailed {
            operation: "search_ontology_terms",
            message: "boom".into(),
        });

        let events = sink.events();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0], Diagnostic::RecordSkipped { kind: "term" });
        assert!(matches!(events[1], Diagnostic::OperationFailed { .. }));
    }
}
