//! The takedown case record: status, target, SLA, and the append-only
//! event history that doubles as the audit trail.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use super::ioc::Severity;

/// States a case moves through, initial to terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TakedownStatus {
    Discovered,
    Triage,
    EvidencePack,
    Route,
    Submit,
    Submitted,
    Acked,
    FollowUp,
    Outcome,
    Closed,
}

impl TakedownStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TakedownStatus::Discovered => "discovered",
            TakedownStatus::Triage => "triage",
            TakedownStatus::EvidencePack => "evidence_pack",
            TakedownStatus::Route => "route",
            TakedownStatus::Submit => "submit",
            TakedownStatus::Submitted => "submitted",
            TakedownStatus::Acked => "acked",
            TakedownStatus::FollowUp => "follow_up",
            TakedownStatus::Outcome => "outcome",
            TakedownStatus::Closed => "closed",
        }
    }

    /// Waiting states park the case on `next_action_at` until the
    /// scheduler promotes it.
    pub fn is_waiting(&self) -> bool {
        matches!(
            self,
            TakedownStatus::Submitted | TakedownStatus::Acked | TakedownStatus::FollowUp
        )
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, TakedownStatus::Closed)
    }

    /// States with a worker handler; only these are ever enqueued.
    pub fn is_workable(&self) -> bool {
        matches!(
            self,
            TakedownStatus::Triage
                | TakedownStatus::EvidencePack
                | TakedownStatus::Route
                | TakedownStatus::Submit
                | TakedownStatus::FollowUp
                | TakedownStatus::Outcome
        )
    }
}

impl std::fmt::Display for TakedownStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Action requested from the responsible party.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TakedownAction {
    SuspendDomain,
    RemoveContent,
    BlockNs,
    WarningList,
    Blocklist,
}

impl TakedownAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            TakedownAction::SuspendDomain => "suspend_domain",
            TakedownAction::RemoveContent => "remove_content",
            TakedownAction::BlockNs => "block_ns",
            TakedownAction::WarningList => "warning_list",
            TakedownAction::Blocklist => "blocklist",
        }
    }
}

impl std::fmt::Display for TakedownAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Kind of intermediary a submission is addressed to.
///
/// The numeric rank orders deduplicated router output: hosting removes
/// content fastest, blocklists are complementary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TargetKind {
    Registrar,
    Hosting,
    Cdn,
    Search,
    Blocklist,
}

impl TargetKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TargetKind::Registrar => "registrar",
            TargetKind::Hosting => "hosting",
            TargetKind::Cdn => "cdn",
            TargetKind::Search => "search",
            TargetKind::Blocklist => "blocklist",
        }
    }

    /// hosting=1 < cdn=2 < registrar=3 < search=4 < blocklist=5.
    pub fn rank(&self) -> u8 {
        match self {
            TargetKind::Hosting => 1,
            TargetKind::Cdn => 2,
            TargetKind::Registrar => 3,
            TargetKind::Search => 4,
            TargetKind::Blocklist => 5,
        }
    }
}

impl std::fmt::Display for TargetKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The party a request is submitted to.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TakedownTarget {
    pub kind: TargetKind,
    pub entity: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub webform: Option<String>,
}

impl Default for TakedownTarget {
    fn default() -> Self {
        Self {
            kind: TargetKind::Hosting,
            entity: String::new(),
            email: None,
            phone: None,
            webform: None,
        }
    }
}

/// Per-action timing contract, in whole hours.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sla {
    pub first_response_hours: i64,
    pub escalate_after_hours: i64,
    pub retry_interval_hours: i64,
}

impl Sla {
    pub const fn new(first_response: i64, escalate_after: i64, retry_interval: i64) -> Self {
        Self {
            first_response_hours: first_response,
            escalate_after_hours: escalate_after,
            retry_interval_hours: retry_interval,
        }
    }

    /// Retry interval with the pre-routing default of one hour.
    pub fn retry_interval(&self) -> Duration {
        if self.retry_interval_hours > 0 {
            Duration::hours(self.retry_interval_hours)
        } else {
            Duration::hours(1)
        }
    }
}

/// One append-only audit record. Serialized shape is the persisted
/// wire format: `{t, event, channel?, ref?, notes?}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TakedownEvent {
    #[serde(rename = "t")]
    pub timestamp: DateTime<Utc>,
    pub event: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub channel: String,
    #[serde(rename = "ref", default, skip_serializing_if = "String::is_empty")]
    pub reference: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub notes: String,
}

/// The case. Mutated solely through state-machine operations; every
/// transition lands in `history`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TakedownRequest {
    pub case_id: String,
    #[serde(default)]
    pub target: TakedownTarget,
    #[serde(default)]
    pub evidence_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub requested_action: Option<TakedownAction>,
    pub status: TakedownStatus,
    #[serde(default)]
    pub sla: Sla,
    #[serde(default)]
    pub history: Vec<TakedownEvent>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_action_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub external_case_id: String,
    pub priority: Severity,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assignee: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
}

impl TakedownRequest {
    pub fn new(case_id: impl Into<String>, priority: Severity, tags: Vec<String>) -> Self {
        let now = Utc::now();
        Self {
            case_id: case_id.into(),
            target: TakedownTarget::default(),
            evidence_id: String::new(),
            requested_action: None,
            status: TakedownStatus::Discovered,
            sla: Sla::default(),
            history: Vec::new(),
            created_at: now,
            updated_at: now,
            next_action_at: None,
            external_case_id: String::new(),
            priority,
            assignee: None,
            tags,
        }
    }

    /// Append an event to the history. History is monotonically
    /// growing; events are never rewritten or removed.
    pub fn add_event(
        &mut self,
        event: impl Into<String>,
        channel: impl Into<String>,
        reference: impl Into<String>,
        notes: impl Into<String>,
    ) {
        let now = Utc::now();
        self.history.push(TakedownEvent {
            timestamp: now,
            event: event.into(),
            channel: channel.into(),
            reference: reference.into(),
            notes: notes.into(),
        });
        self.updated_at = now;
    }

    /// Move to a new status: appends the status event, recomputes
    /// `next_action_at` from the SLA, and records exactly one
    /// `status_change` event naming both old and new.
    pub fn update_status(&mut self, new_status: TakedownStatus, notes: impl Into<String>) {
        let old_status = self.status;
        self.status = new_status;
        self.add_event(new_status.as_str(), "", "", notes);
        self.recalculate_next_action();
        if old_status != new_status {
            self.add_event(
                "status_change",
                "",
                "",
                format!("Changed from {old_status} to {new_status}"),
            );
        }
    }

    /// SLA-driven scheduling, evaluated at every status write:
    ///   * `submitted` waits out the first-response window from case
    ///     creation;
    ///   * `acked`/`follow_up` re-arm at the retry interval from the
    ///     last event, unless the case has outlived the escalation
    ///     horizon, in which case an `escalation_needed` event is
    ///     recorded and the next poll lands in 24 hours;
    ///   * working and terminal states carry no anchor.
    pub fn recalculate_next_action(&mut self) {
        match self.status {
            TakedownStatus::Submitted => {
                self.next_action_at =
                    Some(self.created_at + Duration::hours(self.sla.first_response_hours));
            }
            TakedownStatus::Acked | TakedownStatus::FollowUp => {
                let horizon = self.sla.escalate_after_hours;
                if horizon > 0 && self.age_hours() > horizon as f64 {
                    let overdue = self.age_hours() - horizon as f64;
                    self.next_action_at = Some(Utc::now() + Duration::hours(24));
                    self.add_event(
                        "escalation_needed",
                        "",
                        "",
                        format!("Case overdue by {overdue:.1} hours"),
                    );
                } else {
                    self.next_action_at = Some(self.last_event_time() + self.sla.retry_interval());
                }
            }
            _ => {
                self.next_action_at = None;
            }
        }
    }

    /// A case is overdue iff it carries an anchor in the past.
    pub fn is_overdue(&self) -> bool {
        match self.next_action_at {
            Some(at) => at < Utc::now(),
            None => false,
        }
    }

    pub fn age_hours(&self) -> f64 {
        (Utc::now() - self.created_at).num_seconds() as f64 / 3600.0
    }

    pub fn last_event_time(&self) -> DateTime<Utc> {
        self.history
            .last()
            .map(|e| e.timestamp)
            .unwrap_or(self.created_at)
    }

    /// Arm an explicit retry anchor after a transient failure while the
    /// case stays in its current (working) state. The scheduler sweep
    /// picks it up once the anchor elapses.
    pub fn arm_retry(&mut self) {
        self.next_action_at = Some(Utc::now() + self.sla.retry_interval());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn case_with_sla(sla: Sla) -> TakedownRequest {
        let mut request = TakedownRequest::new("tdk-test", Severity::High, vec!["phishing".into()]);
        request.sla = sla;
        request
    }

    #[test]
    fn add_event_grows_history_and_bumps_updated_at() {
        let mut request = case_with_sla(Sla::default());
        request.add_event("case_created", "system", "", "Processing IOC: evil.com");
        request.add_event("triage_started", "system", "", "");
        assert_eq!(request.history.len(), 2);
        assert_eq!(request.history[0].event, "case_created");
        assert!(request.updated_at >= request.created_at);
        assert_eq!(request.updated_at, request.history[1].timestamp);
    }

    #[test]
    fn update_status_records_exactly_one_status_change() {
        let mut request = case_with_sla(Sla::new(48, 120, 24));
        request.update_status(TakedownStatus::Submitted, "submission accepted");

        let changes: Vec<_> = request
            .history
            .iter()
            .filter(|e| e.event == "status_change")
            .collect();
        assert_eq!(changes.len(), 1);
        assert!(changes[0].notes.contains("discovered"));
        assert!(changes[0].notes.contains("submitted"));
    }

    #[test]
    fn submitted_anchor_is_first_response_from_creation() {
        let mut request = case_with_sla(Sla::new(12, 48, 12));
        request.update_status(TakedownStatus::Submitted, "");
        let expected = request.created_at + Duration::hours(12);
        assert_eq!(request.next_action_at, Some(expected));
    }

    #[test]
    fn working_and_terminal_states_carry_no_anchor() {
        let mut request = case_with_sla(Sla::new(48, 120, 24));
        request.update_status(TakedownStatus::Submitted, "");
        assert!(request.next_action_at.is_some());
        request.update_status(TakedownStatus::Outcome, "resolved");
        assert_eq!(request.next_action_at, None);
        request.update_status(TakedownStatus::Closed, "");
        assert_eq!(request.next_action_at, None);
    }

    #[test]
    fn follow_up_past_horizon_escalates() {
        let mut request = case_with_sla(Sla::new(48, 120, 24));
        request.created_at = Utc::now() - Duration::hours(121);
        request.status = TakedownStatus::FollowUp;
        request.recalculate_next_action();

        let escalation = request
            .history
            .iter()
            .find(|e| e.event == "escalation_needed")
            .expect("escalation event");
        assert!(escalation.notes.starts_with("Case overdue by 1.0 hours"));
        let anchor = request.next_action_at.expect("anchor");
        let delta = anchor - Utc::now();
        assert!(delta > Duration::hours(23) && delta <= Duration::hours(24));
    }

    #[test]
    fn follow_up_inside_horizon_rearms_from_last_event() {
        let mut request = case_with_sla(Sla::new(48, 120, 24));
        request.add_event("status_update", "connector", "", "still pending");
        request.status = TakedownStatus::FollowUp;
        request.recalculate_next_action();
        let expected = request.history.last().unwrap().timestamp + Duration::hours(24);
        assert_eq!(request.next_action_at, Some(expected));
    }

    #[test]
    fn overdue_iff_anchor_in_past() {
        let mut request = case_with_sla(Sla::default());
        assert!(!request.is_overdue());
        request.next_action_at = Some(Utc::now() - Duration::hours(1));
        assert!(request.is_overdue());
        request.next_action_at = Some(Utc::now() + Duration::hours(1));
        assert!(!request.is_overdue());
    }

    #[test]
    fn event_wire_format() {
        let event = TakedownEvent {
            timestamp: Utc::now(),
            event: "email_sent".into(),
            channel: "email".into(),
            reference: "abuse@godaddy.com".into(),
            notes: String::new(),
        };
        let json = serde_json::to_value(&event).unwrap();
        assert!(json.get("t").is_some());
        assert_eq!(json.get("ref").unwrap(), "abuse@godaddy.com");
        assert!(json.get("notes").is_none(), "empty notes omitted");
    }

    #[test]
    fn default_retry_interval_before_routing() {
        assert_eq!(Sla::default().retry_interval(), Duration::hours(1));
        assert_eq!(Sla::new(48, 96, 24).retry_interval(), Duration::hours(24));
    }

    #[test]
    fn target_kind_rank_order() {
        assert!(TargetKind::Hosting.rank() < TargetKind::Cdn.rank());
        assert!(TargetKind::Cdn.rank() < TargetKind::Registrar.rank());
        assert!(TargetKind::Registrar.rank() < TargetKind::Search.rank());
        assert!(TargetKind::Search.rank() < TargetKind::Blocklist.rank());
    }
}
