//! Evidence collection: DNS records, an HTTP snapshot and a heuristic
//! risk verdict, bundled into an immutable `EvidencePack`.

use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::{debug, warn};
use trust_dns_resolver::{
    config::{ResolverConfig, ResolverOpts},
    proto::rr::{Name, RData, RecordType},
    TokioAsyncResolver,
};
use uuid::Uuid;

use crate::domain_utils;
use crate::errors::{Result, TakedownError};
use crate::models::{
    defang, DnsRecords, EvidencePack, HttpSnapshot, IocKind, RiskAssessment, IOC,
};
use crate::shutdown::CancelToken;
use crate::templates::category_of;

const DNS_TIMEOUT: Duration = Duration::from_secs(5);
const BODY_CAP: usize = 1024;
const MAX_REDIRECTS: usize = 10;

static TITLE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?is)<title[^>]*>(.*?)</title>").unwrap());

/// Pluggable evidence collection boundary.
#[async_trait]
pub trait EvidenceCollector: Send + Sync {
    async fn collect(&self, cancel: &CancelToken, ioc: &IOC) -> Result<EvidencePack>;
}

/// Default collector: live DNS + HTTP against the indicator.
pub struct HttpEvidenceCollector {
    resolver: TokioAsyncResolver,
    http: reqwest::Client,
}

impl HttpEvidenceCollector {
    pub fn new(http_timeout: Duration, user_agent: &str) -> Result<Self> {
        let resolver = TokioAsyncResolver::tokio(ResolverConfig::default(), ResolverOpts::default());
        let http = reqwest::Client::builder()
            .timeout(http_timeout)
            .user_agent(user_agent)
            .redirect(reqwest::redirect::Policy::none())
            .danger_accept_invalid_certs(true)
            .build()
            .map_err(|e| TakedownError::configuration(format!("HTTP client: {e}")))?;
        Ok(Self { resolver, http })
    }

    async fn collect_dns(&self, host: &str) -> DnsRecords {
        let mut records = DnsRecords::default();
        let Ok(name) = Name::from_ascii(host) else {
            return records;
        };

        for record_type in [
            RecordType::A,
            RecordType::AAAA,
            RecordType::CNAME,
            RecordType::MX,
            RecordType::TXT,
            RecordType::NS,
            RecordType::SOA,
        ] {
            let lookup = tokio::time::timeout(
                DNS_TIMEOUT,
                self.resolver.lookup(name.clone(), record_type),
            )
            .await;
            let answer = match lookup {
                Ok(Ok(answer)) => answer,
                Ok(Err(e)) => {
                    debug!(%host, %record_type, "DNS lookup failed: {e}");
                    continue;
                }
                Err(_) => {
                    debug!(%host, %record_type, "DNS lookup timeout");
                    continue;
                }
            };

            if records.ttl.is_none() {
                records.ttl = answer.record_iter().next().map(|r| r.ttl());
            }
            for rdata in answer.iter() {
                match rdata {
                    RData::A(a) => records.a.push(a.to_string()),
                    RData::AAAA(aaaa) => records.aaaa.push(aaaa.to_string()),
                    RData::CNAME(cname) => records.cname.push(cname.to_utf8()),
                    RData::MX(mx) => records.mx.push(mx.exchange().to_utf8()),
                    RData::TXT(txt) => records.txt.push(txt.to_string()),
                    RData::NS(ns) => records.ns.push(ns.to_utf8()),
                    RData::SOA(soa) => {
                        records.soa = Some(format!(
                            "{} {}",
                            soa.mname().to_utf8(),
                            soa.rname().to_utf8()
                        ));
                    }
                    _ => {}
                }
            }
        }
        records
    }

    /// Fetch the URL following redirects manually so the full chain is
    /// preserved in the snapshot.
    async fn collect_http(&self, url: &str) -> HttpSnapshot {
        let mut snapshot = HttpSnapshot::default();
        let mut current = url.to_string();

        for _hop in 0..MAX_REDIRECTS {
            snapshot.chain.push(current.clone());
            let response = match self.http.get(&current).send().await {
                Ok(r) => r,
                Err(e) => {
                    warn!(url = %current, "HTTP fetch failed: {e}");
                    return snapshot;
                }
            };

            snapshot.status = response.status().as_u16();
            snapshot.headers = response
                .headers()
                .iter()
                .map(|(k, v)| {
                    (
                        k.as_str().to_string(),
                        v.to_str().unwrap_or_default().to_string(),
                    )
                })
                .collect();

            if response.status().is_redirection() {
                let Some(location) = snapshot.headers.get("location").cloned() else {
                    break;
                };
                current = resolve_location(&current, &location);
                continue;
            }

            if let Ok(text) = response.text().await {
                snapshot.title = TITLE_RE
                    .captures(&text)
                    .and_then(|c| c.get(1))
                    .map(|m| m.as_str().trim().to_string())
                    .filter(|t| !t.is_empty());
                let mut cap = BODY_CAP.min(text.len());
                while !text.is_char_boundary(cap) {
                    cap -= 1;
                }
                snapshot.body = Some(text[..cap].to_string());
            }
            break;
        }
        snapshot
    }
}

/// Resolve a `Location` header against the current URL; absolute
/// locations pass through, host-relative paths are rebased.
fn resolve_location(current: &str, location: &str) -> String {
    if location.contains("://") {
        return location.to_string();
    }
    let (scheme, rest) = match current.split_once("://") {
        Some(parts) => parts,
        None => return location.to_string(),
    };
    let host = rest.split('/').next().unwrap_or_default();
    if location.starts_with('/') {
        format!("{scheme}://{host}{location}")
    } else {
        format!("{scheme}://{host}/{location}")
    }
}

/// Score the indicator from its classification and observed surface.
fn assess_risk(ioc: &IOC, dns: &DnsRecords, http: &HttpSnapshot) -> RiskAssessment {
    let category = category_of(&ioc.tags).to_string();
    let mut score: u32 = match category.as_str() {
        "c2" => 70,
        "phishing" => 60,
        "malware" => 60,
        _ => 40,
    };
    let mut reasons: Vec<String> = vec![format!("classified as {category} by source feed")];

    if http.status == 200 {
        score += 10;
        reasons.push("content is live".into());
    }
    if let Some(title) = &http.title {
        let lowered = title.to_lowercase();
        for keyword in ["login", "sign in", "verify", "password", "account"] {
            if lowered.contains(keyword) {
                score += 10;
                reasons.push(format!("page title suggests credential capture ({keyword})"));
                break;
            }
        }
    }
    if http.chain.len() > 2 {
        score += 5;
        reasons.push(format!("{} redirect hops", http.chain.len() - 1));
    }
    if dns.a.is_empty() && ioc.kind != IocKind::Hash {
        score = score.saturating_sub(15);
        reasons.push("no A records resolved".into());
    }

    RiskAssessment {
        score: score.min(100) as u8,
        category,
        rationale: reasons.join("; "),
    }
}

#[async_trait]
impl EvidenceCollector for HttpEvidenceCollector {
    async fn collect(&self, cancel: &CancelToken, ioc: &IOC) -> Result<EvidencePack> {
        if cancel.is_cancelled() {
            return Err(TakedownError::Cancelled);
        }

        let host = domain_utils::host_of(&ioc.value);

        let dns = match (&host, ioc.kind) {
            (Some(host), IocKind::Url | IocKind::Domain) => self.collect_dns(host).await,
            (Some(host), IocKind::Ip) => {
                let mut records = DnsRecords::default();
                records.a = vec![host.clone()];
                records
            }
            _ => DnsRecords::default(),
        };

        if cancel.is_cancelled() {
            return Err(TakedownError::Cancelled);
        }

        let http = match ioc.kind {
            IocKind::Url => self.collect_http(&ioc.value).await,
            IocKind::Domain => {
                self.collect_http(&format!("http://{}/", ioc.value)).await
            }
            _ => HttpSnapshot::default(),
        };

        let risk = assess_risk(ioc, &dns, &http);
        Ok(EvidencePack {
            evidence_id: format!("ev-{}", Uuid::new_v4()),
            ioc: ioc.indicator_id.clone(),
            collected_at: Utc::now(),
            screenshots: Vec::new(),
            har: None,
            dns,
            http,
            tls: None,
            intel_refs: Vec::new(),
            risk,
            defanged: defang(&ioc.value),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn url_ioc(tags: &[&str]) -> IOC {
        IOC::new(
            "ind-1",
            IocKind::Url,
            "https://bank-login.evil.com/verify",
            "feed:internal",
            tags.iter().map(|s| s.to_string()).collect(),
        )
    }

    #[test]
    fn risk_scoring_boosts() {
        let ioc = url_ioc(&["phishing"]);
        let mut dns = DnsRecords::default();
        dns.a = vec!["203.0.113.7".into()];
        let http = HttpSnapshot {
            status: 200,
            title: Some("Secure Login - TestBank".into()),
            ..Default::default()
        };
        let risk = assess_risk(&ioc, &dns, &http);
        assert_eq!(risk.category, "phishing");
        assert_eq!(risk.score, 80);
        assert!(risk.rationale.contains("credential capture"));
    }

    #[test]
    fn risk_scoring_unresolved_host() {
        let ioc = url_ioc(&["malware"]);
        let risk = assess_risk(&ioc, &DnsRecords::default(), &HttpSnapshot::default());
        assert_eq!(risk.score, 45);
        assert!(risk.rationale.contains("no A records"));
    }

    #[test]
    fn location_resolution() {
        assert_eq!(
            resolve_location("https://evil.com/a", "/b"),
            "https://evil.com/b"
        );
        assert_eq!(
            resolve_location("https://evil.com/a", "https://other.com/x"),
            "https://other.com/x"
        );
        assert_eq!(resolve_location("https://evil.com/a", "b"), "https://evil.com/b");
    }

    #[test]
    fn title_regex() {
        let html = "<html><head><TITLE>\n  Verify your account \n</TITLE></head></html>";
        let title = TITLE_RE
            .captures(html)
            .and_then(|c| c.get(1))
            .map(|m| m.as_str().trim().to_string());
        assert_eq!(title.as_deref(), Some("Verify your account"));
    }
}
