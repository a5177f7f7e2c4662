//! Search-engine warning-list connector (Google Safe Browsing).
//!
//! Safe Browsing has no universal public write API; when a submission
//! endpoint is configured (an internal relay or partner API) the
//! report is POSTed there, otherwise the public webform reference is
//! recorded for out-of-band completion.

use std::time::Duration;

use async_trait::async_trait;
use serde_json::json;
use tracing::info;

use crate::connectors::{bail_if_cancelled, Connector, StatusUpdate};
use crate::errors::{Result, TakedownError};
use crate::models::{refang, EvidencePack, TakedownRequest, TakedownStatus, TargetKind};
use crate::routing::SAFE_BROWSING_WEBFORM;
use crate::shutdown::CancelToken;
use crate::templates::category_of;

pub struct SearchWarningConnector {
    http: reqwest::Client,
    endpoint: Option<String>,
}

impl SearchWarningConnector {
    pub fn new(endpoint: Option<String>, timeout: Duration, user_agent: &str) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(user_agent)
            .build()
            .map_err(|e| TakedownError::configuration(format!("HTTP client: {e}")))?;
        Ok(Self { http, endpoint })
    }
}

#[async_trait]
impl Connector for SearchWarningConnector {
    fn kind(&self) -> TargetKind {
        TargetKind::Search
    }

    async fn submit(
        &self,
        cancel: &CancelToken,
        request: &mut TakedownRequest,
        evidence: &EvidencePack,
    ) -> Result<()> {
        bail_if_cancelled(cancel, request)?;

        match &self.endpoint {
            Some(endpoint) => {
                let payload = json!({
                    "url": refang(&evidence.defanged),
                    "category": category_of(&request.tags),
                    "case_id": request.case_id,
                });
                let response = self
                    .http
                    .post(endpoint)
                    .json(&payload)
                    .send()
                    .await
                    .map_err(|e| TakedownError::submission("Google Safe Browsing", e.to_string()))?;
                if !response.status().is_success() {
                    return Err(TakedownError::submission(
                        "Google Safe Browsing",
                        format!("endpoint returned status {}", response.status()),
                    ));
                }
                info!(case_id = %request.case_id, %endpoint, "warning-list report submitted");
                request.add_event(
                    "api_call",
                    "api",
                    endpoint.as_str(),
                    "Warning-list report submitted",
                );
            }
            None => {
                request.add_event(
                    "api_call",
                    "webform",
                    SAFE_BROWSING_WEBFORM,
                    "No API endpoint configured; manual webform submission required",
                );
            }
        }
        Ok(())
    }

    async fn check_status(
        &self,
        cancel: &CancelToken,
        request: &mut TakedownRequest,
    ) -> Result<StatusUpdate> {
        bail_if_cancelled(cancel, request)?;

        // Warning lists are fire-and-forget: once reported the listing
        // is Google's call, so the case resolves on our side.
        Ok(StatusUpdate {
            status: TakedownStatus::Outcome,
            external_id: None,
            notes: "Warning-list report delivered; listing decision is upstream".to_string(),
            next_follow_up: None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Severity;
    use crate::shutdown::CancelSource;

    #[tokio::test]
    async fn webform_fallback_records_reference() {
        let connector = SearchWarningConnector::new(
            None,
            Duration::from_secs(5),
            crate::rdap::USER_AGENT,
        )
        .unwrap();
        let (_source, token) = CancelSource::new();
        let mut request =
            TakedownRequest::new("tdk-3", Severity::Medium, vec!["phishing".to_string()]);
        let evidence = EvidencePack::default();

        connector
            .submit(&token, &mut request, &evidence)
            .await
            .unwrap();
        let event = request.history.last().unwrap();
        assert_eq!(event.event, "api_call");
        assert_eq!(event.channel, "webform");
        assert_eq!(event.reference, SAFE_BROWSING_WEBFORM);
    }

    #[tokio::test]
    async fn status_resolves_after_report() {
        let connector = SearchWarningConnector::new(
            None,
            Duration::from_secs(5),
            crate::rdap::USER_AGENT,
        )
        .unwrap();
        let (_source, token) = CancelSource::new();
        let mut request =
            TakedownRequest::new("tdk-4", Severity::Medium, vec!["phishing".to_string()]);
        let update = connector.check_status(&token, &mut request).await.unwrap();
        assert_eq!(update.status, TakedownStatus::Outcome);
    }
}
