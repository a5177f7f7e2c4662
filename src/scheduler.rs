//! Periodic sweep: promotes waiting cases whose `next_action_at` has
//! elapsed, re-enqueues retryable working states, and flags SLA
//! breaches.
//!
//! The sweep collects due cases under a read lock and releases it
//! before acting, so ingestion is never blocked by the tick.

use std::sync::Arc;

use tokio::time::MissedTickBehavior;
use tracing::{debug, warn};

use crate::machine::MachineInner;
use crate::models::TakedownStatus;

/// Tick loop: one sweep per interval until shutdown.
pub(crate) async fn run(inner: Arc<MachineInner>) {
    let cancel = inner.cancel.clone();
    let mut ticker = tokio::time::interval(inner.config.tick_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    // The first tick completes immediately; consume it so sweeps start
    // one full interval after startup.
    ticker.tick().await;

    debug!(
        interval_secs = inner.config.tick_interval.as_secs(),
        "scheduler started"
    );
    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = ticker.tick() => sweep(&inner),
        }
    }
    debug!("scheduler stopped");
}

/// One pass over the registry.
///
/// * `submitted`/`acked` past their anchor are promoted to `follow_up`;
/// * `follow_up` past its anchor is escalation-checked, then either
///   parked with an `escalation_needed` event (past the horizon) or
///   handed back to the workers;
/// * working states carrying a retry anchor are re-enqueued.
///
/// A full queue is left for the next tick; closed and in-flight cases
/// are never touched.
pub(crate) fn sweep(inner: &Arc<MachineInner>) {
    let due = inner.due_cases();
    if due.is_empty() {
        return;
    }
    debug!(count = due.len(), "sweep found due cases");

    for (case_id, status) in due {
        let result = match status {
            TakedownStatus::Submitted | TakedownStatus::Acked => {
                inner.transition_case(&case_id, TakedownStatus::FollowUp)
            }
            TakedownStatus::FollowUp => inner.follow_up_due(&case_id),
            _ => inner.requeue_case(&case_id),
        };
        if let Err(e) = result {
            warn!(%case_id, %status, "sweep action deferred: {e}");
        }
    }
}
