//! Submission connectors: the pluggable boundary between the state
//! machine and registrars, hosting providers, CDNs, search-engine
//! warning lists and blocklists.
//!
//! A connector must record what it transmitted (`email_sent` or
//! `api_call` events with channel and recipient) and must honor the
//! cancellation token, recording a single `cancelled` event when it
//! does.

pub mod blocklist;
pub mod hosting;
pub mod registrar;
pub mod search;

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::errors::{Result, TakedownError};
use crate::models::{EvidencePack, TakedownRequest, TakedownStatus, TargetKind};
use crate::shutdown::CancelToken;

pub use blocklist::BlocklistConnector;
pub use hosting::GenericHostingConnector;
pub use registrar::EmailRegistrarConnector;
pub use search::SearchWarningConnector;

/// Result of polling a provider for case progress.
#[derive(Debug, Clone)]
pub struct StatusUpdate {
    /// Either an interim waiting state or `outcome` when resolved.
    pub status: TakedownStatus,
    pub external_id: Option<String>,
    pub notes: String,
    pub next_follow_up: Option<DateTime<Utc>>,
}

/// One submission + status-polling capability for a target kind.
#[async_trait]
pub trait Connector: Send + Sync {
    /// Fixed registry key.
    fn kind(&self) -> TargetKind;

    /// Perform the outbound transmission, recording the channel and
    /// recipient in the case history.
    async fn submit(
        &self,
        cancel: &CancelToken,
        request: &mut TakedownRequest,
        evidence: &EvidencePack,
    ) -> Result<()>;

    /// Query the provider, or return a time-based heuristic when no
    /// status API exists.
    async fn check_status(
        &self,
        cancel: &CancelToken,
        request: &mut TakedownRequest,
    ) -> Result<StatusUpdate>;
}

/// Connector registry keyed by target kind.
#[derive(Clone, Default)]
pub struct ConnectorSet {
    connectors: HashMap<TargetKind, Arc<dyn Connector>>,
}

impl ConnectorSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, connector: Arc<dyn Connector>) {
        self.connectors.insert(connector.kind(), connector);
    }

    pub fn get(&self, kind: TargetKind) -> Option<Arc<dyn Connector>> {
        self.connectors.get(&kind).cloned()
    }

    pub fn is_empty(&self) -> bool {
        self.connectors.is_empty()
    }
}

/// Shared guard: bail out before any transmission when the orchestrator
/// is shutting down, leaving exactly one `cancelled` event behind.
pub(crate) fn bail_if_cancelled(
    cancel: &CancelToken,
    request: &mut TakedownRequest,
) -> Result<()> {
    if cancel.is_cancelled() {
        request.add_event("cancelled", "system", "", "orchestrator shutting down");
        return Err(TakedownError::Cancelled);
    }
    Ok(())
}
