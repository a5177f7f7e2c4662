//! Generic hosting connector: content-removal requests emailed to the
//! network operator's abuse desk.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tracing::info;

use crate::connectors::{bail_if_cancelled, Connector, StatusUpdate};
use crate::errors::{Result, TakedownError};
use crate::models::{EvidencePack, TakedownRequest, TakedownStatus, TargetKind};
use crate::providers;
use crate::shutdown::CancelToken;
use crate::smtp::Mailer;
use crate::templates::{self, TemplateVars};

pub struct GenericHostingConnector {
    mailer: Arc<Mailer>,
}

impl GenericHostingConnector {
    pub fn new(mailer: Arc<Mailer>) -> Self {
        Self { mailer }
    }

    fn recipient(&self, request: &TakedownRequest) -> String {
        if let Some(email) = &request.target.email {
            if !email.is_empty() {
                return email.clone();
            }
        }
        providers::operator_abuse_email(&request.target.entity)
    }
}

#[async_trait]
impl Connector for GenericHostingConnector {
    fn kind(&self) -> TargetKind {
        TargetKind::Hosting
    }

    async fn submit(
        &self,
        cancel: &CancelToken,
        request: &mut TakedownRequest,
        evidence: &EvidencePack,
    ) -> Result<()> {
        bail_if_cancelled(cancel, request)?;

        let vars = TemplateVars::from_case(request, evidence);
        let subject = templates::subject(TargetKind::Hosting, &vars);
        let body = templates::render(
            templates::body(TargetKind::Hosting, &vars.category),
            &vars,
        );

        let recipient = self.recipient(request);
        self.mailer
            .send(&recipient, &subject, &body)
            .await
            .map_err(|e| TakedownError::submission(&request.target.entity, e.to_string()))?;

        info!(case_id = %request.case_id, %recipient, "content removal request sent");
        request.add_event(
            "email_sent",
            "email",
            recipient.as_str(),
            format!("Sent content removal request to {recipient}"),
        );
        Ok(())
    }

    async fn check_status(
        &self,
        cancel: &CancelToken,
        request: &mut TakedownRequest,
    ) -> Result<StatusUpdate> {
        bail_if_cancelled(cancel, request)?;

        // Most operators have no public status API; poll on the SLA
        // cadence until a human reply closes the loop.
        let retry = request.sla.retry_interval();
        Ok(StatusUpdate {
            status: TakedownStatus::FollowUp,
            external_id: None,
            notes: format!(
                "Awaiting response from hosting provider ({}h cadence)",
                retry.num_hours()
            ),
            next_follow_up: Some(Utc::now() + retry),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Severity, TakedownTarget};
    use crate::smtp::SmtpConfig;

    #[test]
    fn recipient_falls_back_to_operator_table() {
        let connector = GenericHostingConnector::new(Arc::new(Mailer::new(SmtpConfig::default())));
        let mut request = TakedownRequest::new("tdk-2", Severity::High, vec!["c2".to_string()]);
        request.target = TakedownTarget {
            kind: TargetKind::Hosting,
            entity: "Hetzner Online GmbH".to_string(),
            email: None,
            phone: None,
            webform: None,
        };
        assert_eq!(connector.recipient(&request), "abuse@hetzner.de");

        request.target.email = Some("noc@hetzner.de".to_string());
        assert_eq!(connector.recipient(&request), "noc@hetzner.de");
    }
}
