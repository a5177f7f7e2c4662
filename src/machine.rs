//! The orchestration core: case registry, per-state handlers and the
//! worker pool that drives each case through the takedown workflow.
//!
//! Concurrency model: a readers-writer lock guards the registry; the
//! lock is never held across an await point. Workers operate on a
//! snapshot of the case and commit the mutated copy back, so callers
//! of `get_request`/`list_requests` only ever see consistent clones.
//! A per-case `in_flight` flag guarantees at most one outstanding
//! enqueue per case; re-entry requires the scheduler to observe an
//! elapsed `next_action_at`.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use parking_lot::{Mutex, RwLock};
use tokio::sync::mpsc;
use tokio::sync::Mutex as AsyncMutex;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::collector::EvidenceCollector;
use crate::connectors::{Connector, ConnectorSet};
use crate::enrichment::ContactEnricher;
use crate::errors::{Result, TakedownError};
use crate::journal::Journal;
use crate::models::{AbuseContact, EvidencePack, TakedownRequest, TakedownStatus, IOC};
use crate::routing;
use crate::scheduler;
use crate::shutdown::{CancelSource, CancelToken};

pub const DEFAULT_WORKERS: usize = 5;
pub const DEFAULT_QUEUE_CAPACITY: usize = 100;
pub const DEFAULT_TICK_INTERVAL: Duration = Duration::from_secs(60);

/// Tunables for the worker/scheduler pair.
#[derive(Debug, Clone)]
pub struct MachineConfig {
    pub workers: usize,
    pub queue_capacity: usize,
    pub tick_interval: Duration,
}

impl Default for MachineConfig {
    fn default() -> Self {
        Self {
            workers: DEFAULT_WORKERS,
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
            tick_interval: DEFAULT_TICK_INTERVAL,
        }
    }
}

/// Registry entry: the case plus its enqueue guard.
struct CaseSlot {
    request: TakedownRequest,
    in_flight: bool,
}

pub(crate) struct MachineInner {
    collector: Arc<dyn EvidenceCollector>,
    enricher: Arc<dyn ContactEnricher>,
    router: routing::Engine,
    connectors: RwLock<ConnectorSet>,
    registry: RwLock<HashMap<String, CaseSlot>>,
    iocs: RwLock<HashMap<String, IOC>>,
    evidence: RwLock<HashMap<String, EvidencePack>>,
    queue_tx: mpsc::Sender<String>,
    journal: Option<Journal>,
    pub(crate) cancel: CancelToken,
    pub(crate) config: MachineConfig,
}

/// The takedown state machine.
pub struct Machine {
    inner: Arc<MachineInner>,
    queue_rx: AsyncMutex<Option<mpsc::Receiver<String>>>,
    cancel_source: CancelSource,
    handles: Mutex<Vec<JoinHandle<()>>>,
}

impl Machine {
    pub fn new(
        collector: Arc<dyn EvidenceCollector>,
        enricher: Arc<dyn ContactEnricher>,
        router: routing::Engine,
        config: MachineConfig,
    ) -> Self {
        let (queue_tx, queue_rx) = mpsc::channel(config.queue_capacity);
        let (cancel_source, cancel) = CancelSource::new();
        let inner = MachineInner {
            collector,
            enricher,
            router,
            connectors: RwLock::new(ConnectorSet::new()),
            registry: RwLock::new(HashMap::new()),
            iocs: RwLock::new(HashMap::new()),
            evidence: RwLock::new(HashMap::new()),
            queue_tx,
            journal: None,
            cancel,
            config,
        };
        Self {
            inner: Arc::new(inner),
            queue_rx: AsyncMutex::new(Some(queue_rx)),
            cancel_source,
            handles: Mutex::new(Vec::new()),
        }
    }

    /// Attach a journal and replay whatever it holds into the
    /// registry. Must be called before `start`.
    pub fn attach_journal(&mut self, journal: Journal) -> Result<usize> {
        let restored = Journal::load(journal.path())?;
        let count = restored.len();
        self.restore(restored.into_values().collect());
        Arc::get_mut(&mut self.inner)
            .ok_or_else(|| TakedownError::internal("journal attached after start"))?
            .journal = Some(journal);
        Ok(count)
    }

    /// Insert restored or externally produced cases into the registry.
    /// Existing entries with the same case id are replaced.
    pub fn restore(&self, cases: Vec<TakedownRequest>) {
        let mut registry = self.inner.registry.write();
        for request in cases {
            registry.insert(
                request.case_id.clone(),
                CaseSlot {
                    request,
                    in_flight: false,
                },
            );
        }
    }

    pub fn register_connector(&self, connector: Arc<dyn Connector>) {
        self.inner.connectors.write().register(connector);
    }

    /// Spawn the worker pool and the scheduler tick.
    pub async fn start(&self) {
        let Some(queue_rx) = self.queue_rx.lock().await.take() else {
            warn!("machine already started");
            return;
        };
        let queue_rx = Arc::new(AsyncMutex::new(queue_rx));

        let mut handles = self.handles.lock();
        for worker_id in 0..self.inner.config.workers.max(1) {
            let inner = Arc::clone(&self.inner);
            let rx = Arc::clone(&queue_rx);
            handles.push(tokio::spawn(worker_loop(inner, worker_id, rx)));
        }
        let inner = Arc::clone(&self.inner);
        handles.push(tokio::spawn(scheduler::run(inner)));
        info!(
            workers = self.inner.config.workers.max(1),
            tick_secs = self.inner.config.tick_interval.as_secs(),
            "takedown state machine started"
        );
    }

    /// Cancel the root token, stop the scheduler and let workers exit
    /// after their current task.
    pub async fn stop(&self) {
        info!("stopping takedown state machine");
        self.cancel_source.cancel();
        let handles: Vec<JoinHandle<()>> = std::mem::take(&mut *self.handles.lock());
        for handle in handles {
            let _ = handle.await;
        }
    }

    /// Accept an IOC: create the case, record it, and push it into
    /// triage. Fails synchronously on an invalid indicator or a full
    /// queue; a full queue leaves no state behind.
    pub fn process_ioc(&self, ioc: IOC) -> Result<String> {
        self.inner.process_ioc(ioc)
    }

    /// Snapshot of one case.
    pub fn get_request(&self, case_id: &str) -> Option<TakedownRequest> {
        self.inner
            .registry
            .read()
            .get(case_id)
            .map(|slot| slot.request.clone())
    }

    /// Snapshots of every case in the registry.
    pub fn list_requests(&self) -> Vec<TakedownRequest> {
        self.inner
            .registry
            .read()
            .values()
            .map(|slot| slot.request.clone())
            .collect()
    }

    /// Run a single scheduler pass immediately. The periodic tick
    /// calls the same logic; exposed for operational flushes.
    pub fn sweep_once(&self) {
        scheduler::sweep(&self.inner);
    }
}

impl MachineInner {
    fn process_ioc(&self, ioc: IOC) -> Result<String> {
        ioc.validate()?;
        // Reserve the queue slot before touching any state so a full
        // queue rejects the indicator without a half-created case.
        let permit = self
            .queue_tx
            .try_reserve()
            .map_err(|_| TakedownError::QueueFull)?;

        let case_id = format!("tdk-{}", Uuid::new_v4());
        let mut request = TakedownRequest::new(&case_id, ioc.severity(), ioc.tags.clone());
        request.add_event(
            "case_created",
            "system",
            ioc.indicator_id.as_str(),
            format!("Processing IOC: {}", ioc.value),
        );
        request.update_status(
            TakedownStatus::Triage,
            "Transitioned from discovered to triage",
        );
        info!(%case_id, value = %ioc.value, severity = %request.priority, "case created");

        self.registry.write().insert(
            case_id.clone(),
            CaseSlot {
                request: request.clone(),
                in_flight: true,
            },
        );
        self.iocs.write().insert(case_id.clone(), ioc);
        self.journal_append(&request);
        permit.send(case_id.clone());
        Ok(case_id)
    }

    fn snapshot(&self, case_id: &str) -> Option<TakedownRequest> {
        self.registry
            .read()
            .get(case_id)
            .map(|slot| slot.request.clone())
    }

    fn connector_for(&self, request: &TakedownRequest) -> Option<Arc<dyn Connector>> {
        self.connectors.read().get(request.target.kind)
    }

    fn journal_append(&self, request: &TakedownRequest) {
        if let Some(journal) = &self.journal {
            if let Err(e) = journal.append(request) {
                error!(case_id = %request.case_id, "journal append failed: {e}");
            }
        }
    }

    /// Run one case through its handler and commit the result.
    async fn process_case(&self, case_id: &str, worker_id: usize) {
        let Some(mut request) = self.snapshot(case_id) else {
            warn!(worker_id, case_id, "case not in registry, dropping");
            return;
        };
        debug!(worker_id, case_id, status = %request.status, "processing case");

        let next = match self.dispatch(&mut request).await {
            Ok(next) => next,
            Err(e) if e.is_cancelled() => {
                debug!(worker_id, case_id, "handler cancelled");
                None
            }
            Err(e) => {
                error!(worker_id, case_id, "handler failed: {e}");
                request.add_event("error", "system", "", e.to_string());
                None
            }
        };
        self.commit(request, next);
    }

    async fn dispatch(&self, request: &mut TakedownRequest) -> Result<Option<TakedownStatus>> {
        match request.status {
            TakedownStatus::Triage => self.handle_triage(request).await,
            TakedownStatus::EvidencePack => self.handle_evidence(request).await,
            TakedownStatus::Route => self.handle_route(request).await,
            TakedownStatus::Submit => self.handle_submit(request).await,
            TakedownStatus::FollowUp => self.handle_follow_up(request).await,
            TakedownStatus::Outcome => self.handle_outcome(request).await,
            other => Err(TakedownError::internal(format!(
                "no handler for state {other}"
            ))),
        }
    }

    /// Reference triage policy: accept every case and advance.
    async fn handle_triage(
        &self,
        request: &mut TakedownRequest,
    ) -> Result<Option<TakedownStatus>> {
        request.add_event("triage_started", "system", "", "Starting triage analysis");
        Ok(Some(TakedownStatus::EvidencePack))
    }

    async fn handle_evidence(
        &self,
        request: &mut TakedownRequest,
    ) -> Result<Option<TakedownStatus>> {
        request.add_event(
            "evidence_collection_started",
            "system",
            "",
            "Starting evidence collection",
        );
        let ioc = self.iocs.read().get(&request.case_id).cloned();
        let Some(ioc) = ioc else {
            // A restored case whose indicator predates this run cannot
            // be collected again; close it rather than strand it.
            request.add_event(
                "error",
                "system",
                "",
                "originating IOC is not available; re-ingest the indicator",
            );
            return Ok(Some(TakedownStatus::Closed));
        };

        match self.collector.collect(&self.cancel, &ioc).await {
            Ok(pack) => {
                request.evidence_id = pack.evidence_id.clone();
                request.add_event(
                    "evidence_collected",
                    "system",
                    pack.evidence_id.as_str(),
                    format!("Evidence collected, risk score: {}", pack.risk.score),
                );
                self.evidence.write().insert(pack.evidence_id.clone(), pack);
                Ok(Some(TakedownStatus::Route))
            }
            Err(e) if e.is_cancelled() => Err(e),
            Err(e) => {
                // Transient: stay in evidence_pack and let the sweep
                // retry once the anchor elapses.
                request.add_event(
                    "error",
                    "system",
                    "",
                    format!("evidence collection failed: {e}"),
                );
                request.arm_retry();
                Ok(None)
            }
        }
    }

    async fn handle_route(
        &self,
        request: &mut TakedownRequest,
    ) -> Result<Option<TakedownStatus>> {
        request.add_event(
            "routing_started",
            "system",
            "",
            "Determining takedown targets",
        );

        let evidence = self.evidence.read().get(&request.evidence_id).cloned();
        let contacts = match &evidence {
            Some(pack) => match self.enricher.enrich(&self.cancel, pack).await {
                Ok(contacts) => contacts,
                Err(e) if e.is_cancelled() => return Err(e),
                Err(e) => {
                    // Non-fatal: route with whatever contacts exist;
                    // unsatisfiable actions drop out in the router.
                    warn!(case_id = %request.case_id, "enrichment failed: {e}");
                    request.add_event("enrichment_failed", "system", "", e.to_string());
                    AbuseContact::default()
                }
            },
            None => AbuseContact::default(),
        };

        let mut actions = self.router.decide(&request.tags, &contacts);
        if actions.is_empty() {
            request.add_event("no_actions", "system", "", "No valid targets found");
            return Ok(Some(TakedownStatus::Closed));
        }

        // One target per case: commit to the highest-ranked action.
        let action = actions.remove(0);
        request.target = action.target;
        request.requested_action = Some(action.action);
        request.sla = action.sla;
        request.add_event(
            "routing_completed",
            "system",
            "",
            format!(
                "Target: {} ({})",
                request.target.entity, request.target.kind
            ),
        );
        Ok(Some(TakedownStatus::Submit))
    }

    async fn handle_submit(
        &self,
        request: &mut TakedownRequest,
    ) -> Result<Option<TakedownStatus>> {
        let Some(connector) = self.connector_for(request) else {
            request.add_event(
                "no_connector",
                "system",
                "",
                format!("no connector registered for {}", request.target.kind),
            );
            return Ok(Some(TakedownStatus::Closed));
        };

        request.add_event(
            "submission_started",
            "system",
            "",
            format!("Submitting to {}", request.target.entity),
        );
        let evidence = self
            .evidence
            .read()
            .get(&request.evidence_id)
            .cloned()
            .unwrap_or_default();

        match connector.submit(&self.cancel, request, &evidence).await {
            Ok(()) => Ok(Some(TakedownStatus::Submitted)),
            Err(e) if e.is_cancelled() => Err(e),
            Err(e) => {
                request.add_event("error", "system", "", format!("submission failed: {e}"));
                request.arm_retry();
                Ok(None)
            }
        }
    }

    async fn handle_follow_up(
        &self,
        request: &mut TakedownRequest,
    ) -> Result<Option<TakedownStatus>> {
        let Some(connector) = self.connector_for(request) else {
            request.add_event(
                "no_connector",
                "system",
                "",
                format!("no connector registered for {}", request.target.kind),
            );
            return Ok(Some(TakedownStatus::Closed));
        };

        match connector.check_status(&self.cancel, request).await {
            Ok(update) => {
                if let Some(external_id) = &update.external_id {
                    request.external_case_id = external_id.clone();
                }
                let reference = request.external_case_id.clone();
                request.add_event("status_update", "connector", reference, update.notes.clone());

                match update.status {
                    TakedownStatus::Outcome => Ok(Some(TakedownStatus::Outcome)),
                    TakedownStatus::Acked => Ok(Some(TakedownStatus::Acked)),
                    _ => {
                        // Stay in follow_up; the connector's suggested
                        // poll time wins over the SLA cadence.
                        request.next_action_at = Some(
                            update.next_follow_up.unwrap_or_else(|| {
                                request.last_event_time() + request.sla.retry_interval()
                            }),
                        );
                        Ok(None)
                    }
                }
            }
            Err(e) if e.is_cancelled() => Err(e),
            Err(e) => {
                request.add_event("status_check_failed", "system", "", e.to_string());
                request.arm_retry();
                Ok(None)
            }
        }
    }

    async fn handle_outcome(
        &self,
        request: &mut TakedownRequest,
    ) -> Result<Option<TakedownStatus>> {
        request.add_event(
            "outcome_recorded",
            "system",
            request.external_case_id.clone(),
            "Provider resolved the case",
        );
        Ok(Some(TakedownStatus::Closed))
    }

    /// Store a handler-mutated snapshot and apply its transition.
    ///
    /// The `in_flight` flag stays set across a follow-on enqueue and is
    /// cleared otherwise; on a full queue the case is parked with an
    /// immediate retry anchor for the sweep to pick up.
    fn commit(&self, mut request: TakedownRequest, next: Option<TakedownStatus>) {
        let mut enqueue = false;
        if let Some(next) = next {
            let old = request.status;
            request.update_status(next, format!("Transitioned from {old} to {next}"));
            debug!(case_id = %request.case_id, %old, %next, "transition");
            enqueue = next.is_workable();
        }

        let permit = if enqueue {
            match self.queue_tx.try_reserve() {
                Ok(permit) => Some(permit),
                Err(_) => {
                    warn!(case_id = %request.case_id, "work queue full, deferring to sweep");
                    request.add_event(
                        "queue_full",
                        "system",
                        "",
                        "work queue full; scheduler sweep will retry",
                    );
                    request.next_action_at = Some(Utc::now());
                    enqueue = false;
                    None
                }
            }
        } else {
            None
        };

        let case_id = request.case_id.clone();
        {
            let mut registry = self.registry.write();
            if let Some(slot) = registry.get_mut(&case_id) {
                slot.in_flight = enqueue;
                slot.request = request.clone();
            }
        }
        self.journal_append(&request);
        if let Some(permit) = permit {
            permit.send(case_id);
        }
    }

    /// Transition a parked case and enqueue its handler. Used by the
    /// scheduler to promote waiting cases; reserves the queue slot
    /// before mutating so a full queue changes nothing.
    pub(crate) fn transition_case(&self, case_id: &str, next: TakedownStatus) -> Result<()> {
        let permit = if next.is_workable() {
            Some(
                self.queue_tx
                    .try_reserve()
                    .map_err(|_| TakedownError::QueueFull)?,
            )
        } else {
            None
        };

        let snapshot = {
            let mut registry = self.registry.write();
            let slot = registry
                .get_mut(case_id)
                .ok_or_else(|| TakedownError::UnknownCase {
                    case_id: case_id.to_string(),
                })?;
            if slot.in_flight || slot.request.status.is_terminal() {
                return Ok(());
            }
            let old = slot.request.status;
            slot.request
                .update_status(next, format!("Transitioned from {old} to {next}"));
            slot.in_flight = permit.is_some();
            slot.request.clone()
        };

        self.journal_append(&snapshot);
        if let Some(permit) = permit {
            permit.send(case_id.to_string());
        }
        Ok(())
    }

    /// Re-enqueue a case in its current state (retry path).
    pub(crate) fn requeue_case(&self, case_id: &str) -> Result<()> {
        let permit = self
            .queue_tx
            .try_reserve()
            .map_err(|_| TakedownError::QueueFull)?;

        {
            let mut registry = self.registry.write();
            let slot = registry
                .get_mut(case_id)
                .ok_or_else(|| TakedownError::UnknownCase {
                    case_id: case_id.to_string(),
                })?;
            if slot.in_flight
                || slot.request.status.is_terminal()
                || !slot.request.status.is_workable()
            {
                return Ok(());
            }
            slot.in_flight = true;
        }
        permit.send(case_id.to_string());
        Ok(())
    }

    /// Escalation check for an overdue follow-up: past the horizon the
    /// case stays parked with an `escalation_needed` event and a 24h
    /// re-arm; inside the horizon it goes back to the workers.
    pub(crate) fn follow_up_due(&self, case_id: &str) -> Result<()> {
        let escalated = {
            let mut registry = self.registry.write();
            let slot = registry
                .get_mut(case_id)
                .ok_or_else(|| TakedownError::UnknownCase {
                    case_id: case_id.to_string(),
                })?;
            if slot.in_flight {
                return Ok(());
            }
            let horizon = slot.request.sla.escalate_after_hours;
            if horizon > 0 && slot.request.age_hours() > horizon as f64 {
                let overdue = slot.request.age_hours() - horizon as f64;
                slot.request.add_event(
                    "escalation_needed",
                    "system",
                    "",
                    format!("Case overdue by {overdue:.1} hours"),
                );
                slot.request.next_action_at = Some(Utc::now() + chrono::Duration::hours(24));
                Some(slot.request.clone())
            } else {
                None
            }
        };

        match escalated {
            Some(snapshot) => {
                warn!(case_id, "SLA breached, escalation needed");
                self.journal_append(&snapshot);
                Ok(())
            }
            None => self.requeue_case(case_id),
        }
    }

    /// Due cases for one sweep: past anchor, not in flight, not closed.
    pub(crate) fn due_cases(&self) -> Vec<(String, TakedownStatus)> {
        let now = Utc::now();
        self.registry
            .read()
            .iter()
            .filter(|(_, slot)| !slot.in_flight && !slot.request.status.is_terminal())
            .filter(|(_, slot)| {
                slot.request
                    .next_action_at
                    .map(|at| at <= now)
                    .unwrap_or(false)
            })
            .map(|(case_id, slot)| (case_id.clone(), slot.request.status))
            .collect()
    }
}

/// One worker: drain the queue until shutdown.
async fn worker_loop(
    inner: Arc<MachineInner>,
    worker_id: usize,
    queue_rx: Arc<AsyncMutex<mpsc::Receiver<String>>>,
) {
    let cancel = inner.cancel.clone();
    debug!(worker_id, "worker started");
    loop {
        let next = {
            let recv = async {
                let mut rx = queue_rx.lock().await;
                rx.recv().await
            };
            tokio::select! {
                _ = cancel.cancelled() => None,
                case_id = recv => case_id,
            }
        };
        let Some(case_id) = next else {
            break;
        };
        inner.process_case(&case_id, worker_id).await;
    }
    debug!(worker_id, "worker stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Severity;
    use async_trait::async_trait;

    struct NoopCollector;
    #[async_trait]
    impl EvidenceCollector for NoopCollector {
        async fn collect(&self, _cancel: &CancelToken, ioc: &IOC) -> Result<EvidencePack> {
            Ok(EvidencePack {
                evidence_id: "ev-noop".into(),
                ioc: ioc.indicator_id.clone(),
                ..Default::default()
            })
        }
    }

    struct NoopEnricher;
    #[async_trait]
    impl ContactEnricher for NoopEnricher {
        async fn enrich(
            &self,
            _cancel: &CancelToken,
            _evidence: &EvidencePack,
        ) -> Result<AbuseContact> {
            Ok(AbuseContact::default())
        }
    }

    fn machine_with_capacity(queue_capacity: usize) -> Machine {
        Machine::new(
            Arc::new(NoopCollector),
            Arc::new(NoopEnricher),
            routing::Engine::with_default_rules(),
            MachineConfig {
                workers: 2,
                queue_capacity,
                tick_interval: Duration::from_secs(60),
            },
        )
    }

    fn sample_ioc() -> IOC {
        IOC::new(
            "ind-1",
            crate::models::IocKind::Url,
            "https://bank-login.evil.com",
            "feed:test",
            vec!["phishing".into()],
        )
    }

    #[test]
    fn defaults_match_contract() {
        let config = MachineConfig::default();
        assert_eq!(config.workers, 5);
        assert_eq!(config.queue_capacity, 100);
        assert_eq!(config.tick_interval, Duration::from_secs(60));
    }

    #[tokio::test]
    async fn process_ioc_creates_case_in_triage() {
        let machine = machine_with_capacity(8);
        let case_id = machine.process_ioc(sample_ioc()).unwrap();
        assert!(case_id.starts_with("tdk-"));

        let request = machine.get_request(&case_id).expect("case registered");
        assert_eq!(request.status, TakedownStatus::Triage);
        assert_eq!(request.priority, Severity::Medium);
        assert_eq!(request.history[0].event, "case_created");
        assert!(request
            .history
            .iter()
            .any(|e| e.event == "status_change" && e.notes.contains("triage")));
    }

    #[tokio::test]
    async fn process_ioc_rejects_invalid_indicator() {
        let machine = machine_with_capacity(8);
        let mut ioc = sample_ioc();
        ioc.value = "  ".into();
        let err = machine.process_ioc(ioc).unwrap_err();
        assert!(matches!(err, TakedownError::InvalidIoc { .. }));
        assert!(machine.list_requests().is_empty());
    }

    #[tokio::test]
    async fn queue_full_leaves_no_state_behind() {
        // Workers not started: nothing drains the queue.
        let machine = machine_with_capacity(1);
        machine.process_ioc(sample_ioc()).unwrap();

        let err = machine.process_ioc(sample_ioc()).unwrap_err();
        assert!(matches!(err, TakedownError::QueueFull));
        assert_eq!(machine.list_requests().len(), 1);
    }

    #[tokio::test]
    async fn snapshots_are_copies() {
        let machine = machine_with_capacity(8);
        let case_id = machine.process_ioc(sample_ioc()).unwrap();

        let mut snapshot = machine.get_request(&case_id).unwrap();
        snapshot.add_event("tampered", "test", "", "");
        let fresh = machine.get_request(&case_id).unwrap();
        assert!(fresh.history.iter().all(|e| e.event != "tampered"));
    }

    #[tokio::test]
    async fn transition_case_skips_in_flight() {
        let machine = machine_with_capacity(8);
        let case_id = machine.process_ioc(sample_ioc()).unwrap();

        // Still in flight from process_ioc's enqueue.
        machine
            .inner
            .transition_case(&case_id, TakedownStatus::FollowUp)
            .unwrap();
        let request = machine.get_request(&case_id).unwrap();
        assert_eq!(request.status, TakedownStatus::Triage);
    }
}
