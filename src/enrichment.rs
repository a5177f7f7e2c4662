//! Contact enrichment: attribute the registrar, hosting operator and
//! CDN responsible for an indicator, working from the evidence pack.
//!
//! Enrichment is best-effort by contract: a failed sub-lookup degrades
//! the contact set instead of aborting the pipeline, and the router
//! then drops whatever actions became unsatisfiable.

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::errors::{Result, TakedownError};
use crate::models::{AbuseContact, ContactInfo, EvidencePack, HostingInfo};
use crate::providers;
use crate::rdap::RdapClient;
use crate::shutdown::CancelToken;
use crate::domain_utils;

/// Pluggable enrichment boundary.
#[async_trait]
pub trait ContactEnricher: Send + Sync {
    async fn enrich(&self, cancel: &CancelToken, evidence: &EvidencePack) -> Result<AbuseContact>;
}

/// Default enricher: RDAP for registration data, the evidence pack's
/// own DNS answers for hosting and CDN attribution.
pub struct RdapEnricher {
    rdap: RdapClient,
}

impl RdapEnricher {
    pub fn new(rdap: RdapClient) -> Self {
        Self { rdap }
    }
}

#[async_trait]
impl ContactEnricher for RdapEnricher {
    async fn enrich(&self, cancel: &CancelToken, evidence: &EvidencePack) -> Result<AbuseContact> {
        if cancel.is_cancelled() {
            return Err(TakedownError::Cancelled);
        }

        let domain = domain_utils::registrable_domain_of(&evidence.defanged).ok_or_else(|| {
            TakedownError::enrichment(&evidence.defanged, "no domain in indicator")
        })?;

        // Registration data. IP-only indicators have no registrar; a
        // failed lookup degrades to an empty registrar record.
        let mut contact = if domain.parse::<std::net::IpAddr>().is_ok() {
            AbuseContact {
                domain: domain.clone(),
                ..Default::default()
            }
        } else {
            match self.rdap.lookup_domain(&domain).await {
                Ok(contact) => contact,
                Err(e) => {
                    warn!(%domain, "RDAP lookup failed, continuing without registrar: {e}");
                    AbuseContact {
                        domain: domain.clone(),
                        ..Default::default()
                    }
                }
            }
        };

        if let Some(ip) = evidence.primary_ip() {
            let (asn, operator) = attribute_asn(ip);
            contact.hosting = Some(HostingInfo {
                asn,
                name: operator.clone(),
                abuse: ContactInfo {
                    email: Some(providers::operator_abuse_email(&operator)),
                    ..Default::default()
                },
            });
            debug!(%domain, %ip, %operator, "hosting attributed");
        }

        for cname in &evidence.dns.cname {
            if let Some(cdn) = providers::cdn_for_cname(cname) {
                contact.cdn = Some(cdn);
                break;
            }
        }

        Ok(contact)
    }
}

/// Attribute an IP to an operator. Known resolver/cloud addresses come
/// from a fixed table; everything else gets a coarse class heuristic.
/// Production deployments are expected to swap in a Team Cymru or
/// MaxMind backed implementation behind the same trait.
fn attribute_asn(ip: &str) -> (u32, String) {
    const KNOWN: [(&str, u32, &str); 3] = [
        ("8.8.8.8", 15169, "Google LLC"),
        ("1.1.1.1", 13335, "Cloudflare, Inc."),
        ("208.67.222.222", 36692, "Cisco OpenDNS"),
    ];
    for (known_ip, asn, name) in KNOWN {
        if ip == known_ip {
            return (asn, name.to_string());
        }
    }

    let first_octet: u8 = ip.split('.').next().and_then(|o| o.parse().ok()).unwrap_or(0);
    match first_octet {
        10 | 172 | 192 => (0, "Private Network".to_string()),
        1..=126 => (64496, "Generic Hosting Provider".to_string()),
        128..=191 => (64497, "International ISP".to_string()),
        _ => (64511, "Unknown Provider".to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::defang;
    use crate::shutdown::CancelSource;

    #[test]
    fn asn_attribution() {
        assert_eq!(attribute_asn("8.8.8.8"), (15169, "Google LLC".to_string()));
        assert_eq!(attribute_asn("203.0.113.7").1, "Unknown Provider");
        assert_eq!(attribute_asn("45.33.32.156").1, "Generic Hosting Provider");
    }

    #[tokio::test]
    async fn cancelled_before_lookup() {
        let (source, token) = CancelSource::new();
        source.cancel();
        let enricher =
            RdapEnricher::new(RdapClient::new(std::time::Duration::from_secs(1)).unwrap());
        let evidence = EvidencePack {
            defanged: defang("https://evil.com/x"),
            ..Default::default()
        };
        let err = enricher.enrich(&token, &evidence).await.unwrap_err();
        assert!(err.is_cancelled());
    }
}
