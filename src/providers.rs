//! Built-in abuse-contact tables for known registrars, hosting
//! operators and CDNs, plus the generic `abuse@<name>.com` fallback
//! used when an intermediary publishes nothing better.

use std::collections::HashMap;

use once_cell::sync::Lazy;

use crate::models::{CdnInfo, ContactInfo};

/// Known registrars and their canonical abuse desks.
static REGISTRAR_ABUSE: Lazy<HashMap<&'static str, &'static str>> = Lazy::new(|| {
    let mut map = HashMap::new();
    map.insert("GoDaddy.com, LLC", "abuse@godaddy.com");
    map.insert("NameCheap, Inc.", "abuse@namecheap.com");
    map.insert("Registro.br", "abuse@registro.br");
    map.insert("Amazon Registrar, Inc.", "legal@amazon.com");
    map.insert("Google LLC", "domain-abuse@google.com");
    map.insert("Cloudflare, Inc.", "abuse@cloudflare.com");
    map.insert("Network Solutions, LLC", "abuse@networksolutions.com");
    map.insert("eNom, LLC", "abuse@enom.com");
    map.insert("Tucows Domains Inc.", "abuse@tucows.com");
    map.insert("PDR Ltd.", "abuse-contact@publicdomainregistry.com");
    map
});

/// Known network operators, matched by substring against the
/// lowercased operator name reported for the hosting ASN.
static OPERATOR_ABUSE: Lazy<Vec<(&'static str, &'static str)>> = Lazy::new(|| {
    vec![
        ("google", "network-abuse@google.com"),
        ("cloudflare", "abuse@cloudflare.com"),
        ("amazon", "abuse@amazonaws.com"),
        ("microsoft", "abuse@microsoft.com"),
        ("digitalocean", "abuse@digitalocean.com"),
        ("ovh", "abuse@ovh.net"),
        ("hetzner", "abuse@hetzner.de"),
        ("vultr", "abuse@vultr.com"),
        ("linode", "abuse@linode.com"),
        ("contabo", "abuse@contabo.com"),
    ]
});

/// CDN fingerprints: CNAME substring -> provider record.
static CDN_PROVIDERS: Lazy<Vec<(&'static str, CdnInfo)>> = Lazy::new(|| {
    vec![
        (
            "cloudflare",
            cdn(
                "Cloudflare",
                "abuse@cloudflare.com",
                Some("https://abuse.cloudflare.com"),
            ),
        ),
        ("fastly", cdn("Fastly", "abuse@fastly.com", None)),
        ("akamai", cdn("Akamai", "abuse@akamai.com", None)),
        (
            "cloudfront",
            cdn("Amazon CloudFront", "abuse@amazonaws.com", None),
        ),
        (
            "edgesuite",
            cdn("Akamai", "abuse@akamai.com", None),
        ),
    ]
});

fn cdn(name: &str, email: &str, webform: Option<&str>) -> CdnInfo {
    CdnInfo {
        name: name.to_string(),
        abuse: ContactInfo {
            email: Some(email.to_string()),
            ..Default::default()
        },
        webform: webform.map(|w| w.to_string()),
    }
}

/// Canonical abuse email for a known registrar, by exact name.
pub fn registrar_abuse_email(registrar_name: &str) -> Option<String> {
    REGISTRAR_ABUSE
        .get(registrar_name)
        .map(|email| email.to_string())
}

/// Abuse email for a hosting operator: the known-operator table first,
/// then the `abuse@<normalized(name)>.com` fallback.
pub fn operator_abuse_email(operator_name: &str) -> String {
    let lowered = operator_name.to_lowercase();
    for (needle, email) in OPERATOR_ABUSE.iter() {
        if lowered.contains(needle) {
            return email.to_string();
        }
    }
    format!("abuse@{}", normalized_provider_domain(operator_name))
}

/// CDN record for a CNAME target, when it matches a known fingerprint.
pub fn cdn_for_cname(cname: &str) -> Option<CdnInfo> {
    let lowered = cname.to_lowercase();
    CDN_PROVIDERS
        .iter()
        .find(|(needle, _)| lowered.contains(needle))
        .map(|(_, info)| info.clone())
}

/// Collapse a provider name into a plausible domain: lowercase, strip
/// punctuation and corporate suffixes.
pub fn normalized_provider_domain(name: &str) -> String {
    let mut cleaned = name.to_lowercase();
    for token in [" ", ",", ".", "llc", "inc", "ltd", "corporation", "corp"] {
        cleaned = cleaned.replace(token, "");
    }
    if cleaned.is_empty() {
        return "example.com".to_string();
    }
    format!("{cleaned}.com")
}
