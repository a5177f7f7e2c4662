//! Registrar connector: email submission asking the sponsoring
//! registrar to suspend the domain.
//!
//! Registry-operated ccTLDs behave differently from commercial
//! registrars; the `.br` special-casing reflects that Registro.br
//! handles brand disputes through the SACI-Adm process and never
//! removes content itself.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tracing::info;

use crate::connectors::{bail_if_cancelled, Connector, StatusUpdate};
use crate::domain_utils;
use crate::errors::{Result, TakedownError};
use crate::models::{EvidencePack, TakedownRequest, TakedownStatus, TargetKind};
use crate::providers;
use crate::shutdown::CancelToken;
use crate::smtp::Mailer;
use crate::templates::{self, TemplateVars};

pub struct EmailRegistrarConnector {
    mailer: Arc<Mailer>,
}

impl EmailRegistrarConnector {
    pub fn new(mailer: Arc<Mailer>) -> Self {
        Self { mailer }
    }

    /// Resolve the abuse desk: the enriched target email first, then
    /// the known-registrar table, then the name-derived fallback.
    fn recipient(&self, request: &TakedownRequest) -> String {
        if let Some(email) = &request.target.email {
            if !email.is_empty() {
                return email.clone();
            }
        }
        providers::registrar_abuse_email(&request.target.entity).unwrap_or_else(|| {
            format!(
                "abuse@{}",
                providers::normalized_provider_domain(&request.target.entity)
            )
        })
    }

    fn is_brand_dispute(tags: &[String]) -> bool {
        tags.iter()
            .any(|t| t.starts_with("brand") || t.contains("typosquatting"))
    }

    /// `.br` domains go through the national registry rather than a
    /// commercial abuse desk.
    async fn submit_br(
        &self,
        request: &mut TakedownRequest,
        evidence: &EvidencePack,
    ) -> Result<()> {
        if Self::is_brand_dispute(&request.tags) {
            request.add_event(
                "brand_dispute_identified",
                "system",
                "",
                "Brand dispute for .br domain - requires SACI-Adm process",
            );
            request.add_event(
                "api_call",
                "webform",
                "https://registro.br/tecnologia/provedor-de-servicos/saci-adm/",
                "SACI-Adm dossier prepared; manual portal submission required",
            );
            return Ok(());
        }

        // Registro.br only acts on registration matters; content abuse
        // is coordinated through CERT.br while hosting is notified.
        request.add_event(
            "content_abuse_identified",
            "system",
            "",
            ".br content abuse - coordinating through CERT.br",
        );
        let vars = TemplateVars::from_case(request, evidence);
        let subject = format!(
            "[Incident coordination] {} — {}",
            vars.category, vars.domain
        );
        let body = templates::render(
            templates::body(TargetKind::Registrar, &vars.category),
            &vars,
        );
        self.mailer.send("cert@cert.br", &subject, &body).await?;
        request.add_event(
            "email_sent",
            "email",
            "cert@cert.br",
            "Incident coordination notice sent to CERT.br",
        );
        Ok(())
    }
}

#[async_trait]
impl Connector for EmailRegistrarConnector {
    fn kind(&self) -> TargetKind {
        TargetKind::Registrar
    }

    async fn submit(
        &self,
        cancel: &CancelToken,
        request: &mut TakedownRequest,
        evidence: &EvidencePack,
    ) -> Result<()> {
        bail_if_cancelled(cancel, request)?;

        let domain = domain_utils::host_of(&evidence.defanged).unwrap_or_default();
        if domain.ends_with(".br") {
            return self.submit_br(request, evidence).await;
        }

        let vars = TemplateVars::from_case(request, evidence);
        let subject = templates::subject(TargetKind::Registrar, &vars);
        let body = templates::render(
            templates::body(TargetKind::Registrar, &vars.category),
            &vars,
        );

        let recipient = self.recipient(request);
        self.mailer
            .send(&recipient, &subject, &body)
            .await
            .map_err(|e| TakedownError::submission(&request.target.entity, e.to_string()))?;

        info!(case_id = %request.case_id, %recipient, "registrar takedown request sent");
        request.add_event(
            "email_sent",
            "email",
            recipient.as_str(),
            format!("Sent takedown request to {recipient}"),
        );
        Ok(())
    }

    async fn check_status(
        &self,
        cancel: &CancelToken,
        request: &mut TakedownRequest,
    ) -> Result<StatusUpdate> {
        bail_if_cancelled(cancel, request)?;

        // Registrars answer by email; without a status API the best we
        // can do is re-poll on the SLA retry cadence.
        let retry = request.sla.retry_interval();
        Ok(StatusUpdate {
            status: TakedownStatus::FollowUp,
            external_id: None,
            notes: format!(
                "Awaiting response from {} (no status API, {}h cadence)",
                request.target.entity,
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

    fn request_with_target(entity: &str, email: Option<&str>) -> TakedownRequest {
        let mut request =
            TakedownRequest::new("tdk-1", Severity::High, vec!["phishing".to_string()]);
        request.target = TakedownTarget {
            kind: TargetKind::Registrar,
            entity: entity.to_string(),
            email: email.map(|e| e.to_string()),
            phone: None,
            webform: None,
        };
        request
    }

    fn connector() -> EmailRegistrarConnector {
        EmailRegistrarConnector::new(Arc::new(Mailer::new(SmtpConfig::default())))
    }

    #[test]
    fn recipient_resolution_order() {
        let connector = connector();
        let explicit = request_with_target("GoDaddy.com, LLC", Some("abuse-desk@godaddy.com"));
        assert_eq!(connector.recipient(&explicit), "abuse-desk@godaddy.com");

        let known = request_with_target("GoDaddy.com, LLC", None);
        assert_eq!(connector.recipient(&known), "abuse@godaddy.com");

        let unknown = request_with_target("Example Registrar", None);
        assert_eq!(connector.recipient(&unknown), "abuse@exampleregistrar.com");
    }

    #[test]
    fn brand_dispute_detection() {
        assert!(EmailRegistrarConnector::is_brand_dispute(&[
            "brand:Acme".to_string()
        ]));
        assert!(EmailRegistrarConnector::is_brand_dispute(&[
            "typosquatting".to_string()
        ]));
        assert!(!EmailRegistrarConnector::is_brand_dispute(&[
            "phishing".to_string()
        ]));
    }

    #[tokio::test]
    async fn br_brand_dispute_records_saci_submission() {
        let connector = connector();
        let (_source, token) = crate::shutdown::CancelSource::new();
        let mut request = request_with_target("Registro.br", None);
        request.tags.push("brand:Acme".to_string());
        let evidence = EvidencePack {
            defanged: crate::models::defang("https://acme-bank.com.br/login"),
            ..Default::default()
        };

        connector
            .submit(&token, &mut request, &evidence)
            .await
            .expect("brand disputes do not touch SMTP");
        let events: Vec<&str> = request.history.iter().map(|e| e.event.as_str()).collect();
        assert!(events.contains(&"brand_dispute_identified"));
        assert!(events.contains(&"api_call"));
    }

    #[tokio::test]
    async fn heuristic_status_uses_sla_cadence() {
        let connector = connector();
        let (_source, token) = crate::shutdown::CancelSource::new();
        let mut request = request_with_target("GoDaddy.com, LLC", None);
        request.sla = crate::models::Sla::new(48, 120, 48);

        let update = connector.check_status(&token, &mut request).await.unwrap();
        assert_eq!(update.status, TakedownStatus::FollowUp);
        assert!(update.notes.contains("48h"));
        assert!(update.next_follow_up.is_some());
    }
}
