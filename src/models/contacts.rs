//! Abuse contacts discovered during enrichment.
//!
//! Nullable sub-records signal "unknown": a missing `hosting` record
//! means enrichment could not attribute the hosting provider, and the
//! router drops actions that would need it.

use serde::{Deserialize, Serialize};

use crate::providers;

/// The sponsoring registrar of the domain.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RegistrarInfo {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iana_id: Option<u32>,
}

/// A way to reach an abuse desk.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ContactInfo {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub webform: Option<String>,
}

/// The network operator hosting the content.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HostingInfo {
    pub asn: u32,
    pub name: String,
    #[serde(default)]
    pub abuse: ContactInfo,
}

/// CDN fronting the content, when one was detected.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CdnInfo {
    pub name: String,
    #[serde(default)]
    pub abuse: ContactInfo,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub webform: Option<String>,
}

/// Normalized contact set for one indicator.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AbuseContact {
    pub domain: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub registrar: Option<RegistrarInfo>,
    /// Registrar-level abuse contact (from RDAP or the fallback table).
    #[serde(default)]
    pub abuse: ContactInfo,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hosting: Option<HostingInfo>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cdn: Option<CdnInfo>,
    /// Set when a whois-privacy / proxy service fronts the registrant.
    #[serde(default)]
    pub privacy: bool,
}

impl AbuseContact {
    /// Primary registrar abuse email: the RDAP-published address when
    /// available, otherwise the known-registrar table.
    pub fn primary_abuse_email(&self) -> Option<String> {
        if let Some(email) = &self.abuse.email {
            if !email.is_empty() {
                return Some(email.clone());
            }
        }
        self.registrar
            .as_ref()
            .and_then(|r| providers::registrar_abuse_email(&r.name))
    }
}
