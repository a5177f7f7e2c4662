//! Evidence packs: the immutable product of collection.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// DNS records gathered for the indicator.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DnsRecords {
    #[serde(rename = "A", default, skip_serializing_if = "Vec::is_empty")]
    pub a: Vec<String>,
    #[serde(rename = "AAAA", default, skip_serializing_if = "Vec::is_empty")]
    pub aaaa: Vec<String>,
    #[serde(rename = "CNAME", default, skip_serializing_if = "Vec::is_empty")]
    pub cname: Vec<String>,
    #[serde(rename = "MX", default, skip_serializing_if = "Vec::is_empty")]
    pub mx: Vec<String>,
    #[serde(rename = "TXT", default, skip_serializing_if = "Vec::is_empty")]
    pub txt: Vec<String>,
    #[serde(rename = "NS", default, skip_serializing_if = "Vec::is_empty")]
    pub ns: Vec<String>,
    #[serde(rename = "SOA", default, skip_serializing_if = "Option::is_none")]
    pub soa: Option<String>,
    #[serde(rename = "TTL", default, skip_serializing_if = "Option::is_none")]
    pub ttl: Option<u32>,
}

/// Snapshot of the HTTP surface at collection time.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HttpSnapshot {
    pub status: u16,
    #[serde(default)]
    pub headers: HashMap<String, String>,
    /// Redirect chain, first hop to last.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub chain: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// First 1 KiB of the response body.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub screenshot: Option<String>,
}

/// Summary of the TLS certificate presented by the host.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TlsCertificate {
    pub issuer: String,
    pub cn: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub san: Vec<String>,
    pub not_before: DateTime<Utc>,
    pub not_after: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub serial: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub algorithm: Option<String>,
}

/// Analyst-facing risk verdict attached to the pack.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RiskAssessment {
    /// 0..=100.
    pub score: u8,
    pub category: String,
    pub rationale: String,
}

/// The complete evidence pack. Immutable after creation.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EvidencePack {
    pub evidence_id: String,
    /// Back-reference to the originating indicator id.
    pub ioc: String,
    pub collected_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub screenshots: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub har: Option<String>,
    #[serde(default)]
    pub dns: DnsRecords,
    #[serde(default)]
    pub http: HttpSnapshot,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tls: Option<TlsCertificate>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub intel_refs: Vec<String>,
    #[serde(default)]
    pub risk: RiskAssessment,
    /// Defanged rendering of the indicator, safe to paste into mail.
    pub defanged: String,
}

impl EvidencePack {
    /// First resolved IPv4 address, if collection found one.
    pub fn primary_ip(&self) -> Option<&str> {
        self.dns.a.first().map(|s| s.as_str())
    }
}

/// Defang an indicator so it cannot be accidentally followed:
/// `http` → `hxxp`, `.` → `[.]`, `@` → `[@]`.
///
/// Idempotent: already-bracketed separators and already-neutered
/// schemes are left untouched, so `defang(defang(x)) == defang(x)`.
pub fn defang(input: &str) -> String {
    let chars: Vec<char> = input.chars().collect();
    let mut out = String::with_capacity(input.len() + 16);
    let mut i = 0;
    while i < chars.len() {
        let c = chars[i];
        match c {
            '.' | '@' => {
                let bracketed = i > 0
                    && chars[i - 1] == '['
                    && i + 1 < chars.len()
                    && chars[i + 1] == ']';
                if bracketed {
                    out.push(c);
                } else {
                    out.push('[');
                    out.push(c);
                    out.push(']');
                }
                i += 1;
            }
            'h' | 'H' => {
                if matches_ignore_case(&chars[i..], "http") {
                    out.push(c);
                    out.push('x');
                    out.push('x');
                    out.push('p');
                    i += 4;
                } else {
                    out.push(c);
                    i += 1;
                }
            }
            _ => {
                out.push(c);
                i += 1;
            }
        }
    }
    out
}

/// Undo `defang` so collaborators can operate on the live value.
pub fn refang(input: &str) -> String {
    input
        .replace("[.]", ".")
        .replace("[@]", "@")
        .replace("hxxp", "http")
        .replace("hXXp", "http")
}

fn matches_ignore_case(haystack: &[char], needle: &str) -> bool {
    let needle: Vec<char> = needle.chars().collect();
    haystack.len() >= needle.len()
        && haystack
            .iter()
            .zip(needle.iter())
            .all(|(a, b)| a.eq_ignore_ascii_case(b))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defang_url() {
        assert_eq!(
            defang("https://bank-login.evil.com/verify"),
            "hxxps://bank-login[.]evil[.]com/verify"
        );
        assert_eq!(defang("abuse@evil.com"), "abuse[@]evil[.]com");
        assert_eq!(defang("203.0.113.7"), "203[.]0[.]113[.]7");
    }

    #[test]
    fn defang_is_idempotent() {
        for input in [
            "https://bank-login.evil.com/verify",
            "evil.com",
            "abuse@evil.com",
            "hxxp://already[.]neutered[.]example",
        ] {
            let once = defang(input);
            assert_eq!(defang(&once), once, "double defang changed {input:?}");
        }
    }

    #[test]
    fn refang_inverts_defang() {
        let original = "https://bank-login.evil.com/verify?u=a@b.com";
        assert_eq!(refang(&defang(original)), original);
    }

    #[test]
    fn primary_ip() {
        let mut pack = EvidencePack::default();
        assert_eq!(pack.primary_ip(), None);
        pack.dns.a = vec!["203.0.113.7".into(), "203.0.113.8".into()];
        assert_eq!(pack.primary_ip(), Some("203.0.113.7"));
    }
}
