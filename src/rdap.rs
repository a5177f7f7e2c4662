//! RDAP client: registration data lookups feeding contact enrichment.
//!
//! Issues `GET <server>/domain/<name>` with `Accept:
//! application/rdap+json`. The TLD to server mapping is built in, with
//! the ARIN bootstrap service as the fallback for everything else.

use std::collections::HashMap;
use std::time::Duration;

use once_cell::sync::Lazy;
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use crate::errors::{Result, TakedownError};
use crate::models::{AbuseContact, RegistrarInfo};

pub const USER_AGENT: &str = "CTI-Takedown/1.0";

static TLD_SERVERS: Lazy<HashMap<&'static str, &'static str>> = Lazy::new(|| {
    let mut map = HashMap::new();
    map.insert("com", "https://rdap.verisign.com/com/v1");
    map.insert("net", "https://rdap.verisign.com/net/v1");
    map.insert("org", "https://rdap.publicinterestregistry.org");
    map.insert("br", "https://rdap.registro.br");
    map.insert("info", "https://rdap.afilias.net/rdap/afilias");
    map.insert("biz", "https://rdap.afilias.net/rdap/afilias");
    map.insert("name", "https://rdap.verisign.com/name/v1");
    map.insert("mobi", "https://rdap.afilias.net/rdap/afilias");
    map.insert("pro", "https://rdap.afilias.net/rdap/afilias");
    map.insert("travel", "https://rdap.nic.travel");
    map.insert("jobs", "https://rdap.afilias.net/rdap/afilias");
    map.insert("cat", "https://rdap.centralnic.com/cat");
    map.insert("tel", "https://rdap.centralnic.com/tel");
    map
});

const BOOTSTRAP_URL: &str = "https://rdap-bootstrap.arin.net/bootstrap";

/// Subset of an RDAP domain response we care about.
#[derive(Debug, Deserialize)]
struct RdapResponse {
    #[serde(default)]
    entities: Vec<RdapEntity>,
}

#[derive(Debug, Deserialize)]
struct RdapEntity {
    #[serde(default)]
    handle: String,
    #[serde(default)]
    roles: Vec<String>,
    /// jCard: `["vcard", [[prop, params, type, value], ...]]`.
    #[serde(rename = "vcardArray", default)]
    vcard_array: Option<Value>,
    #[serde(default)]
    entities: Vec<RdapEntity>,
    #[serde(rename = "publicIds", default)]
    public_ids: Vec<RdapPublicId>,
}

#[derive(Debug, Deserialize)]
struct RdapPublicId {
    #[serde(rename = "type", default)]
    id_type: String,
    #[serde(default)]
    identifier: String,
}

/// RDAP lookup client.
#[derive(Debug, Clone)]
pub struct RdapClient {
    http: reqwest::Client,
}

impl RdapClient {
    pub fn new(timeout: Duration) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| TakedownError::configuration(format!("HTTP client: {e}")))?;
        Ok(Self { http })
    }

    /// Look up registration data for a domain and normalize it into an
    /// `AbuseContact`. Registrar entities supply the registrar record;
    /// proxy/privacy roles set the privacy flag; the abuse email is the
    /// first vCard email mentioning "abuse".
    pub async fn lookup_domain(&self, domain: &str) -> Result<AbuseContact> {
        let domain = domain.trim().trim_end_matches('.').to_ascii_lowercase();
        let base = rdap_base_url(&domain)?;
        let url = format!("{base}/domain/{domain}");
        debug!(%domain, %url, "RDAP lookup");

        let response = self
            .http
            .get(&url)
            .header("Accept", "application/rdap+json")
            .send()
            .await
            .map_err(|e| TakedownError::rdap(&domain, format!("request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(TakedownError::rdap(
                &domain,
                format!("server returned status {status}"),
            ));
        }

        let parsed: RdapResponse = response
            .json()
            .await
            .map_err(|e| TakedownError::rdap(&domain, format!("invalid RDAP body: {e}")))?;

        let mut contact = AbuseContact {
            domain: domain.clone(),
            ..Default::default()
        };
        for entity in &parsed.entities {
            apply_entity(entity, &mut contact);
        }
        Ok(contact)
    }
}

/// Resolve the RDAP base URL for a domain from the built-in TLD table,
/// falling back to the bootstrap service.
fn rdap_base_url(domain: &str) -> Result<String> {
    let tld = domain
        .rsplit('.')
        .next()
        .filter(|t| !t.is_empty() && *t != domain)
        .ok_or_else(|| TakedownError::rdap(domain, "invalid domain format"))?;

    // The bootstrap service redirects `/domain/<name>` to the
    // authoritative server, so it composes like a direct base URL.
    Ok(match TLD_SERVERS.get(tld) {
        Some(server) => (*server).to_string(),
        None => BOOTSTRAP_URL.to_string(),
    })
}

/// Walk an entity (and its children) extracting registrar and privacy
/// signals.
fn apply_entity(entity: &RdapEntity, contact: &mut AbuseContact) {
    if has_role(&entity.roles, "registrar") {
        contact.registrar = Some(RegistrarInfo {
            name: entity_name(entity),
            iana_id: iana_id(entity),
        });
        if let Some(email) = abuse_email(entity) {
            contact.abuse.email = Some(email);
        }
    }
    if has_role(&entity.roles, "proxy") || has_role(&entity.roles, "privacy") {
        contact.privacy = true;
    }
    for child in &entity.entities {
        apply_entity(child, contact);
    }
}

fn has_role(roles: &[String], role: &str) -> bool {
    roles.iter().any(|r| r.eq_ignore_ascii_case(role))
}

fn iana_id(entity: &RdapEntity) -> Option<u32> {
    entity
        .public_ids
        .iter()
        .find(|id| id.id_type.to_ascii_lowercase().contains("iana"))
        .and_then(|id| id.identifier.parse().ok())
}

/// jCard properties as `(name, value)` pairs.
fn vcard_properties(entity: &RdapEntity) -> Vec<(String, String)> {
    let Some(Value::Array(array)) = entity.vcard_array.as_ref() else {
        return Vec::new();
    };
    let Some(Value::Array(properties)) = array.get(1) else {
        return Vec::new();
    };
    properties
        .iter()
        .filter_map(|item| {
            let entry = item.as_array()?;
            let prop = entry.first()?.as_str()?;
            let value = entry.get(3)?.as_str()?;
            Some((prop.to_ascii_lowercase(), value.to_string()))
        })
        .collect()
}

/// The entity's display name (`fn` property), or its handle.
fn entity_name(entity: &RdapEntity) -> String {
    vcard_properties(entity)
        .into_iter()
        .find(|(prop, _)| prop == "fn")
        .map(|(_, value)| value)
        .unwrap_or_else(|| entity.handle.clone())
}

/// First vCard email whose value mentions "abuse" (case-insensitive).
fn abuse_email(entity: &RdapEntity) -> Option<String> {
    vcard_properties(entity)
        .into_iter()
        .find(|(prop, value)| prop == "email" && value.to_ascii_lowercase().contains("abuse"))
        .map(|(_, value)| value)
}
