//! Inbound indicators of compromise.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::errors::{Result, TakedownError};

/// Supported indicator kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IocKind {
    Url,
    Domain,
    Ip,
    Hash,
}

impl IocKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            IocKind::Url => "url",
            IocKind::Domain => "domain",
            IocKind::Ip => "ip",
            IocKind::Hash => "hash",
        }
    }
}

impl std::fmt::Display for IocKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for IocKind {
    type Err = TakedownError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "url" => Ok(IocKind::Url),
            "domain" => Ok(IocKind::Domain),
            "ip" => Ok(IocKind::Ip),
            "hash" => Ok(IocKind::Hash),
            other => Err(TakedownError::invalid_ioc(
                other,
                "unknown indicator kind (expected url, domain, ip or hash)",
            )),
        }
    }
}

/// Case priority, derived from classification tags.
///
/// Ordering is by urgency: `critical` outranks `high` outranks
/// `medium` outranks `low`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Critical,
    High,
    Medium,
    Low,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Critical => "critical",
            Severity::High => "high",
            Severity::Medium => "medium",
            Severity::Low => "low",
        }
    }

    /// Derive severity from a tag set: the first of
    /// critical/high/medium/low present wins; default is medium.
    pub fn from_tags(tags: &[String]) -> Self {
        const ORDER: [(&str, Severity); 4] = [
            ("critical", Severity::Critical),
            ("high", Severity::High),
            ("medium", Severity::Medium),
            ("low", Severity::Low),
        ];
        for (name, severity) in ORDER {
            if tags.iter().any(|t| t == name) {
                return severity;
            }
        }
        Severity::Medium
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An accepted indicator. Immutable once ingested: the orchestrator
/// only ever reads it back to drive evidence collection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IOC {
    pub indicator_id: String,
    pub kind: IocKind,
    pub value: String,
    pub first_seen: DateTime<Utc>,
    pub source: String,
    pub tags: Vec<String>,
}

impl IOC {
    pub fn new(
        indicator_id: impl Into<String>,
        kind: IocKind,
        value: impl Into<String>,
        source: impl Into<String>,
        tags: Vec<String>,
    ) -> Self {
        Self {
            indicator_id: indicator_id.into(),
            kind,
            value: value.into(),
            first_seen: Utc::now(),
            source: source.into(),
            tags,
        }
    }

    /// Basic acceptance check performed by `process_ioc` before a case
    /// is created.
    pub fn validate(&self) -> Result<()> {
        if self.value.trim().is_empty() {
            return Err(TakedownError::invalid_ioc(
                &self.value,
                "indicator value is empty",
            ));
        }
        if self.kind == IocKind::Ip && self.value.parse::<std::net::IpAddr>().is_err() {
            return Err(TakedownError::invalid_ioc(
                &self.value,
                "not a valid IP address",
            ));
        }
        Ok(())
    }

    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.iter().any(|t| t == tag)
    }

    /// Extract the brand name from a `brand:<Name>` tag, if present.
    pub fn brand(&self) -> Option<&str> {
        self.tags
            .iter()
            .find_map(|t| t.strip_prefix("brand:"))
            .filter(|b| !b.is_empty())
    }

    pub fn severity(&self) -> Severity {
        Severity::from_tags(&self.tags)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ioc_with_tags(tags: &[&str]) -> IOC {
        IOC::new(
            "ind-1",
            IocKind::Url,
            "https://bank-login.evil.com",
            "feed:internal",
            tags.iter().map(|s| s.to_string()).collect(),
        )
    }

    #[test]
    fn severity_priority_order() {
        assert_eq!(
            ioc_with_tags(&["low", "critical"]).severity(),
            Severity::Critical
        );
        assert_eq!(ioc_with_tags(&["high", "low"]).severity(), Severity::High);
        assert_eq!(ioc_with_tags(&["low"]).severity(), Severity::Low);
        assert_eq!(ioc_with_tags(&["phishing"]).severity(), Severity::Medium);
    }

    #[test]
    fn brand_extraction() {
        assert_eq!(
            ioc_with_tags(&["phishing", "brand:TestBank"]).brand(),
            Some("TestBank")
        );
        assert_eq!(ioc_with_tags(&["phishing"]).brand(), None);
        assert_eq!(ioc_with_tags(&["brand:"]).brand(), None);
    }

    #[test]
    fn kind_round_trip() {
        for kind in [IocKind::Url, IocKind::Domain, IocKind::Ip, IocKind::Hash] {
            assert_eq!(kind.as_str().parse::<IocKind>().unwrap(), kind);
        }
        assert!("registry".parse::<IocKind>().is_err());
    }

    #[test]
    fn ip_validation() {
        let mut ioc = ioc_with_tags(&["malware"]);
        ioc.kind = IocKind::Ip;
        ioc.value = "203.0.113.7".into();
        assert!(ioc.validate().is_ok());
        ioc.value = "not-an-ip".into();
        assert!(ioc.validate().is_err());
        ioc.value = "  ".into();
        assert!(ioc.validate().is_err());
    }
}
