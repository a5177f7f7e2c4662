//! Host and registrable-domain extraction with Public Suffix List
//! integration, so `login.secure.example.co.uk` resolves to the
//! registrable `example.co.uk` rather than `co.uk`.

use psl::domain_str;

use crate::models::refang;

/// Pull the host out of a raw or defanged indicator value: strips the
/// scheme, credentials, port, path and trailing dot.
pub fn host_of(value: &str) -> Option<String> {
    let clean = refang(value.trim());
    let without_scheme = match clean.split_once("://") {
        Some((_, rest)) => rest,
        None => clean.as_str(),
    };
    let authority = without_scheme
        .split(['/', '?', '#'])
        .next()
        .unwrap_or_default();
    // Drop userinfo, then a port (but not the colons of an IPv6 literal).
    let host_port = authority.rsplit('@').next().unwrap_or_default();
    let host = if host_port.starts_with('[') {
        host_port
            .trim_start_matches('[')
            .split(']')
            .next()
            .unwrap_or_default()
    } else {
        host_port.split(':').next().unwrap_or_default()
    };
    let host = host.trim_end_matches('.');
    if host.is_empty() {
        None
    } else {
        Some(host.to_ascii_lowercase())
    }
}

/// PSL-backed registrable domain for a host; falls back to the last
/// two labels when the suffix is unknown. IP literals pass through.
pub fn registrable_domain(host: &str) -> String {
    if host.parse::<std::net::IpAddr>().is_ok() {
        return host.to_string();
    }
    if let Some(domain) = domain_str(host) {
        return domain.to_string();
    }
    let labels: Vec<&str> = host.trim_end_matches('.').split('.').collect();
    if labels.len() >= 2 {
        labels[labels.len() - 2..].join(".")
    } else {
        host.to_string()
    }
}

/// Convenience: host + registrable domain straight from an indicator
/// value.
pub fn registrable_domain_of(value: &str) -> Option<String> {
    host_of(value).map(|host| registrable_domain(&host))
}
