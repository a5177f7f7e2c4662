//! End-to-end orchestration tests: the full pipeline driven through
//! the worker pool and scheduler with in-process mock collaborators.
//! No network access.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{Duration as Hours, Utc};
use parking_lot::Mutex;

use takedown::collector::EvidenceCollector;
use takedown::connectors::{Connector, StatusUpdate};
use takedown::enrichment::ContactEnricher;
use takedown::errors::Result;
use takedown::journal::Journal;
use takedown::machine::{Machine, MachineConfig};
use takedown::models::{
    defang, AbuseContact, ContactInfo, EvidencePack, HostingInfo, IocKind, RegistrarInfo,
    RiskAssessment, Severity, Sla, TakedownRequest, TakedownStatus, TakedownTarget, TargetKind,
    IOC,
};
use takedown::routing::Engine;
use takedown::shutdown::CancelToken;

/* ----------------------------- mock collaborators ----------------------------- */

struct MockCollector;

#[async_trait]
impl EvidenceCollector for MockCollector {
    async fn collect(&self, _cancel: &CancelToken, ioc: &IOC) -> Result<EvidencePack> {
        let mut pack = EvidencePack {
            evidence_id: format!("ev-{}", ioc.indicator_id),
            ioc: ioc.indicator_id.clone(),
            collected_at: Utc::now(),
            defanged: defang(&ioc.value),
            risk: RiskAssessment {
                score: 85,
                category: "phishing".into(),
                rationale: "mock collection".into(),
            },
            ..Default::default()
        };
        pack.dns.a = vec!["203.0.113.7".into()];
        Ok(pack)
    }
}

struct MockEnricher {
    contacts: AbuseContact,
}

impl MockEnricher {
    fn with_registrar_and_hosting() -> Self {
        Self {
            contacts: AbuseContact {
                domain: "evil.com".into(),
                registrar: Some(RegistrarInfo {
                    name: "GoDaddy.com, LLC".into(),
                    iana_id: Some(146),
                }),
                abuse: ContactInfo {
                    email: Some("abuse@godaddy.com".into()),
                    ..Default::default()
                },
                hosting: Some(HostingInfo {
                    asn: 64500,
                    name: "Example Host".into(),
                    abuse: ContactInfo {
                        email: Some("abuse@examplehost.com".into()),
                        ..Default::default()
                    },
                }),
                cdn: None,
                privacy: false,
            },
        }
    }
}

#[async_trait]
impl ContactEnricher for MockEnricher {
    async fn enrich(
        &self,
        _cancel: &CancelToken,
        _evidence: &EvidencePack,
    ) -> Result<AbuseContact> {
        Ok(self.contacts.clone())
    }
}

/// Connector that records submissions and replies with a canned status.
struct RecordingConnector {
    kind: TargetKind,
    submissions: Arc<Mutex<Vec<String>>>,
    status: StatusUpdate,
}

impl RecordingConnector {
    fn new(kind: TargetKind, status: StatusUpdate) -> (Arc<Self>, Arc<Mutex<Vec<String>>>) {
        let submissions = Arc::new(Mutex::new(Vec::new()));
        let connector = Arc::new(Self {
            kind,
            submissions: Arc::clone(&submissions),
            status,
        });
        (connector, submissions)
    }
}

#[async_trait]
impl Connector for RecordingConnector {
    fn kind(&self) -> TargetKind {
        self.kind
    }

    async fn submit(
        &self,
        _cancel: &CancelToken,
        request: &mut takedown::models::TakedownRequest,
        _evidence: &EvidencePack,
    ) -> Result<()> {
        self.submissions.lock().push(request.case_id.clone());
        request.add_event(
            "email_sent",
            "email",
            "abuse@examplehost.com",
            "Sent content removal request",
        );
        Ok(())
    }

    async fn check_status(
        &self,
        _cancel: &CancelToken,
        _request: &mut takedown::models::TakedownRequest,
    ) -> Result<StatusUpdate> {
        Ok(self.status.clone())
    }
}

fn pending_status() -> StatusUpdate {
    StatusUpdate {
        status: TakedownStatus::FollowUp,
        external_id: Some("TICKET-42".into()),
        notes: "still pending".into(),
        next_follow_up: Some(Utc::now() + Hours::hours(24)),
    }
}

fn resolved_status() -> StatusUpdate {
    StatusUpdate {
        status: TakedownStatus::Outcome,
        external_id: Some("TICKET-42".into()),
        notes: "content removed".into(),
        next_follow_up: None,
    }
}

fn test_machine(enricher: MockEnricher) -> Machine {
    Machine::new(
        Arc::new(MockCollector),
        Arc::new(enricher),
        Engine::with_default_rules(),
        MachineConfig {
            workers: 2,
            queue_capacity: 32,
            tick_interval: Duration::from_secs(3600),
        },
    )
}

fn phishing_ioc() -> IOC {
    IOC::new(
        "ind-1",
        IocKind::Url,
        "https://bank-login.evil.com",
        "feed:test",
        vec!["phishing".into(), "brand:TestBank".into()],
    )
}

/// Poll until the case reaches `expected` or the timeout elapses.
async fn wait_for_status(
    machine: &Machine,
    case_id: &str,
    expected: TakedownStatus,
) -> TakedownRequest {
    let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
    loop {
        if let Some(request) = machine.get_request(case_id) {
            if request.status == expected {
                return request;
            }
            if tokio::time::Instant::now() > deadline {
                panic!(
                    "case {case_id} stuck in {:?}; history: {:?}",
                    request.status,
                    request
                        .history
                        .iter()
                        .map(|e| e.event.clone())
                        .collect::<Vec<_>>()
                );
            }
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
}

/* ---------------------------------- tests ---------------------------------- */

#[tokio::test]
async fn phishing_flow_submits_to_hosting_first() {
    let machine = test_machine(MockEnricher::with_registrar_and_hosting());
    let (connector, submissions) =
        RecordingConnector::new(TargetKind::Hosting, pending_status());
    machine.register_connector(connector);
    machine.start().await;

    let case_id = machine.process_ioc(phishing_ioc()).unwrap();
    let request = wait_for_status(&machine, &case_id, TakedownStatus::Submitted).await;
    machine.stop().await;

    // Router emitted hosting+registrar+search+blocklist; the case
    // commits to hosting (kind rank 1) with the phishing hosting SLA.
    assert_eq!(request.target.kind, TargetKind::Hosting);
    assert_eq!(request.target.entity, "Example Host");
    assert_eq!(request.sla, Sla::new(48, 96, 24));
    assert_eq!(
        request.next_action_at,
        Some(request.created_at + Hours::hours(48))
    );
    assert_eq!(submissions.lock().as_slice(), [case_id.clone()]);

    let events: Vec<&str> = request.history.iter().map(|e| e.event.as_str()).collect();
    for expected in [
        "case_created",
        "triage_started",
        "evidence_collection_started",
        "evidence_collected",
        "routing_started",
        "routing_completed",
        "submission_started",
        "email_sent",
        "submitted",
    ] {
        assert!(events.contains(&expected), "missing event {expected}");
    }

    // Timestamps never regress.
    for pair in request.history.windows(2) {
        assert!(pair[0].timestamp <= pair[1].timestamp);
    }
}

#[tokio::test]
async fn c2_case_waits_out_the_twelve_hour_window() {
    let machine = test_machine(MockEnricher::with_registrar_and_hosting());
    let (connector, _) = RecordingConnector::new(TargetKind::Hosting, pending_status());
    machine.register_connector(connector);
    machine.start().await;

    let ioc = IOC::new(
        "ind-2",
        IocKind::Domain,
        "c2-panel.evil.com",
        "feed:test",
        vec!["c2".into(), "critical".into()],
    );
    let case_id = machine.process_ioc(ioc).unwrap();
    let request = wait_for_status(&machine, &case_id, TakedownStatus::Submitted).await;
    machine.stop().await;

    assert_eq!(request.priority, Severity::Critical);
    assert_eq!(request.sla, Sla::new(12, 48, 12));
    assert_eq!(
        request.next_action_at,
        Some(request.created_at + Hours::hours(12))
    );
}

#[tokio::test]
async fn unroutable_case_closes_with_no_actions() {
    let machine = test_machine(MockEnricher::with_registrar_and_hosting());
    machine.start().await;

    let ioc = IOC::new(
        "ind-3",
        IocKind::Domain,
        "weird.example",
        "feed:test",
        vec!["spam".into()],
    );
    let case_id = machine.process_ioc(ioc).unwrap();
    let request = wait_for_status(&machine, &case_id, TakedownStatus::Closed).await;
    machine.stop().await;

    assert!(request.history.iter().any(|e| e.event == "no_actions"));
    assert_eq!(request.next_action_at, None);
}

#[tokio::test]
async fn missing_connector_is_fatal_for_the_case() {
    // Hosting wins routing but no connector is registered for it.
    let machine = test_machine(MockEnricher::with_registrar_and_hosting());
    machine.start().await;

    let case_id = machine.process_ioc(phishing_ioc()).unwrap();
    let request = wait_for_status(&machine, &case_id, TakedownStatus::Closed).await;
    machine.stop().await;

    assert!(request.history.iter().any(|e| e.event == "no_connector"));
}

#[tokio::test]
async fn sweep_promotes_submitted_and_resolution_closes_the_case() {
    let machine = test_machine(MockEnricher::with_registrar_and_hosting());
    let (connector, _) = RecordingConnector::new(TargetKind::Hosting, resolved_status());
    machine.register_connector(connector);
    machine.start().await;

    // A case parked in submitted whose first-response window elapsed.
    let mut parked = TakedownRequest::new("tdk-parked", Severity::High, vec!["phishing".into()]);
    parked.sla = Sla::new(48, 96, 24);
    parked.status = TakedownStatus::Submitted;
    parked.target = TakedownTarget {
        kind: TargetKind::Hosting,
        entity: "Example Host".into(),
        email: Some("abuse@examplehost.com".into()),
        phone: None,
        webform: None,
    };
    parked.next_action_at = Some(Utc::now() - Hours::minutes(5));
    machine.restore(vec![parked]);

    machine.sweep_once();
    let request = wait_for_status(&machine, "tdk-parked", TakedownStatus::Closed).await;
    machine.stop().await;

    assert_eq!(request.external_case_id, "TICKET-42");
    let events: Vec<&str> = request.history.iter().map(|e| e.event.as_str()).collect();
    assert!(events.contains(&"status_update"));
    assert!(events.contains(&"outcome_recorded"));
    // follow_up -> outcome -> closed, each with one status_change.
    let changes = request
        .history
        .iter()
        .filter(|e| e.event == "status_change")
        .count();
    assert_eq!(changes, 3);
}

#[tokio::test]
async fn overdue_follow_up_escalates_without_transitioning() {
    // Workers idle: escalation happens in the sweep itself.
    let machine = test_machine(MockEnricher::with_registrar_and_hosting());

    let mut overdue =
        TakedownRequest::new("tdk-overdue", Severity::High, vec!["phishing".into()]);
    overdue.sla = Sla::new(48, 120, 24);
    overdue.created_at = Utc::now() - Hours::hours(121);
    overdue.status = TakedownStatus::FollowUp;
    overdue.next_action_at = Some(Utc::now() - Hours::minutes(1));
    machine.restore(vec![overdue]);

    machine.sweep_once();

    let request = machine.get_request("tdk-overdue").unwrap();
    assert_eq!(request.status, TakedownStatus::FollowUp, "no re-transition");
    let escalation = request
        .history
        .iter()
        .find(|e| e.event == "escalation_needed")
        .expect("escalation event");
    assert!(
        escalation.notes.starts_with("Case overdue by 1.0 hours"),
        "notes: {}",
        escalation.notes
    );
    let anchor = request.next_action_at.unwrap();
    let delta = anchor - Utc::now();
    assert!(delta > Hours::hours(23) && delta <= Hours::hours(24));
}

#[tokio::test]
async fn follow_up_inside_horizon_rearms_from_connector_hint() {
    let machine = test_machine(MockEnricher::with_registrar_and_hosting());
    let (connector, _) = RecordingConnector::new(TargetKind::Hosting, pending_status());
    machine.register_connector(connector);
    machine.start().await;

    let mut waiting = TakedownRequest::new("tdk-wait", Severity::High, vec!["phishing".into()]);
    waiting.sla = Sla::new(48, 96, 24);
    waiting.status = TakedownStatus::FollowUp;
    waiting.target = TakedownTarget {
        kind: TargetKind::Hosting,
        entity: "Example Host".into(),
        email: Some("abuse@examplehost.com".into()),
        phone: None,
        webform: None,
    };
    waiting.next_action_at = Some(Utc::now() - Hours::minutes(1));
    machine.restore(vec![waiting]);

    machine.sweep_once();

    // The worker polls the connector, records the ticket and re-arms
    // from the connector's suggested follow-up time.
    let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
    let request = loop {
        let request = machine.get_request("tdk-wait").unwrap();
        if request.external_case_id == "TICKET-42" {
            break request;
        }
        if tokio::time::Instant::now() > deadline {
            panic!("follow-up never polled; history: {:?}", request.history);
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    };
    machine.stop().await;

    assert_eq!(request.status, TakedownStatus::FollowUp);
    let anchor = request.next_action_at.unwrap();
    assert!(anchor > Utc::now() + Hours::hours(23));
    assert!(request.history.iter().any(|e| e.event == "status_update"));
}

#[tokio::test]
async fn journal_survives_restart() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("cases.jsonl");

    let case_id = {
        let mut machine = test_machine(MockEnricher::with_registrar_and_hosting());
        machine.attach_journal(Journal::open(&path).unwrap()).unwrap();
        let (connector, _) = RecordingConnector::new(TargetKind::Hosting, pending_status());
        machine.register_connector(connector);
        machine.start().await;

        let case_id = machine.process_ioc(phishing_ioc()).unwrap();
        wait_for_status(&machine, &case_id, TakedownStatus::Submitted).await;
        machine.stop().await;
        case_id
    };

    let mut restarted = test_machine(MockEnricher::with_registrar_and_hosting());
    let restored = restarted
        .attach_journal(Journal::open(&path).unwrap())
        .unwrap();
    assert_eq!(restored, 1);

    let request = restarted.get_request(&case_id).expect("case restored");
    assert_eq!(request.status, TakedownStatus::Submitted);
    assert!(request.history.iter().any(|e| e.event == "email_sent"));
    assert_eq!(
        request.next_action_at,
        Some(request.created_at + Hours::hours(48))
    );
}

#[tokio::test]
async fn stop_lets_workers_exit_cleanly() {
    let machine = test_machine(MockEnricher::with_registrar_and_hosting());
    machine.start().await;
    machine.stop().await;
    // A second stop is a no-op rather than a hang.
    machine.stop().await;
}
