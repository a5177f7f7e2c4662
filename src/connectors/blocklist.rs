//! Blocklist connector (URLhaus-style submission API).

use std::time::Duration;

use async_trait::async_trait;
use tracing::info;

use crate::connectors::{bail_if_cancelled, Connector, StatusUpdate};
use crate::errors::{Result, TakedownError};
use crate::models::{refang, EvidencePack, TakedownRequest, TakedownStatus, TargetKind};
use crate::routing::URLHAUS_WEBFORM;
use crate::shutdown::CancelToken;
use crate::templates::category_of;

pub struct BlocklistConnector {
    http: reqwest::Client,
    endpoint: Option<String>,
    api_key: Option<String>,
}

impl BlocklistConnector {
    pub fn new(
        endpoint: Option<String>,
        api_key: Option<String>,
        timeout: Duration,
        user_agent: &str,
    ) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(user_agent)
            .build()
            .map_err(|e| TakedownError::configuration(format!("HTTP client: {e}")))?;
        Ok(Self {
            http,
            endpoint,
            api_key,
        })
    }
}

#[async_trait]
impl Connector for BlocklistConnector {
    fn kind(&self) -> TargetKind {
        TargetKind::Blocklist
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
                let mut form = vec![
                    ("url".to_string(), refang(&evidence.defanged)),
                    ("threat".to_string(), category_of(&request.tags).to_string()),
                ];
                if let Some(key) = &self.api_key {
                    form.push(("token".to_string(), key.clone()));
                }
                let response = self
                    .http
                    .post(endpoint)
                    .form(&form)
                    .send()
                    .await
                    .map_err(|e| TakedownError::submission("URLhaus", e.to_string()))?;
                if !response.status().is_success() {
                    return Err(TakedownError::submission(
                        "URLhaus",
                        format!("endpoint returned status {}", response.status()),
                    ));
                }
                info!(case_id = %request.case_id, %endpoint, "blocklist submission accepted");
                request.add_event(
                    "api_call",
                    "api",
                    endpoint.as_str(),
                    "Blocklist submission accepted",
                );
            }
            None => {
                request.add_event(
                    "api_call",
                    "webform",
                    URLHAUS_WEBFORM,
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

        // Listing is immediate once the submission is accepted.
        Ok(StatusUpdate {
            status: TakedownStatus::Outcome,
            external_id: None,
            notes: "Blocklist entry submitted; listing is upstream".to_string(),
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
        let connector = BlocklistConnector::new(
            None,
            None,
            Duration::from_secs(5),
            crate::rdap::USER_AGENT,
        )
        .unwrap();
        let (_source, token) = CancelSource::new();
        let mut request =
            TakedownRequest::new("tdk-5", Severity::Medium, vec!["malware".to_string()]);
        let evidence = EvidencePack::default();

        connector
            .submit(&token, &mut request, &evidence)
            .await
            .unwrap();
        let event = request.history.last().unwrap();
        assert_eq!(event.event, "api_call");
        assert_eq!(event.reference, URLHAUS_WEBFORM);
    }

    #[tokio::test]
    async fn cancellation_short_circuits() {
        let connector = BlocklistConnector::new(
            None,
            None,
            Duration::from_secs(5),
            crate::rdap::USER_AGENT,
        )
        .unwrap();
        let (source, token) = CancelSource::new();
        source.cancel();
        let mut request =
            TakedownRequest::new("tdk-6", Severity::Medium, vec!["malware".to_string()]);
        let err = connector
            .submit(&token, &mut request, &EvidencePack::default())
            .await
            .unwrap_err();
        assert!(err.is_cancelled());
        assert_eq!(request.history.len(), 1);
        assert_eq!(request.history[0].event, "cancelled");
    }
}
