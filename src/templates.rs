//! Notification templates for outbound takedown requests.
//!
//! Bodies are plain text with `{placeholder}` substitution; the
//! placeholder vocabulary is fixed: `{case_id}`, `{evidence_id}`,
//! `{domain}`, `{ip}`, `{category}`, `{provider}`, `{first_seen}`,
//! `{risk_score}`, `{rationale}`, `{defanged_url}`.

use crate::models::{EvidencePack, TakedownRequest, TargetKind};
use crate::domain_utils;

/// Classification driving template and subject selection. Derived from
/// case tags; anything unrecognized falls back to the default set.
pub fn category_of(tags: &[String]) -> &'static str {
    for tag in tags {
        match tag.as_str() {
            "phishing" => return "phishing",
            "malware" => return "malware",
            "c2" => return "c2",
            _ => {}
        }
    }
    "abuse"
}

/// Values substituted into a template.
#[derive(Debug, Clone)]
pub struct TemplateVars {
    pub case_id: String,
    pub evidence_id: String,
    pub domain: String,
    pub ip: String,
    pub category: String,
    pub provider: String,
    pub first_seen: String,
    pub risk_score: String,
    pub rationale: String,
    pub defanged_url: String,
}

impl TemplateVars {
    /// Assemble the variable set from a case and its evidence pack.
    pub fn from_case(request: &TakedownRequest, evidence: &EvidencePack) -> Self {
        let domain = domain_utils::host_of(&evidence.defanged)
            .unwrap_or_else(|| evidence.defanged.clone());
        Self {
            case_id: request.case_id.clone(),
            evidence_id: request.evidence_id.clone(),
            domain,
            ip: evidence.primary_ip().unwrap_or("unknown").to_string(),
            category: category_of(&request.tags).to_string(),
            provider: request.target.entity.clone(),
            first_seen: evidence
                .collected_at
                .format("%Y-%m-%d %H:%M:%S UTC")
                .to_string(),
            risk_score: evidence.risk.score.to_string(),
            rationale: evidence.risk.rationale.clone(),
            defanged_url: evidence.defanged.clone(),
        }
    }
}

/// Substitute every known placeholder in `template`.
pub fn render(template: &str, vars: &TemplateVars) -> String {
    template
        .replace("{case_id}", &vars.case_id)
        .replace("{evidence_id}", &vars.evidence_id)
        .replace("{domain}", &vars.domain)
        .replace("{ip}", &vars.ip)
        .replace("{category}", &vars.category)
        .replace("{provider}", &vars.provider)
        .replace("{first_seen}", &vars.first_seen)
        .replace("{risk_score}", &vars.risk_score)
        .replace("{rationale}", &vars.rationale)
        .replace("{defanged_url}", &vars.defanged_url)
}

/// Subject line for a submission, per target kind and classification.
pub fn subject(kind: TargetKind, vars: &TemplateVars) -> String {
    let mut title = vars.category.clone();
    if let Some(first) = title.get_mut(0..1) {
        first.make_ascii_uppercase();
    }
    match kind {
        TargetKind::Registrar => format!(
            "[Urgent] Domain suspension request ({}) — {}",
            vars.category, vars.domain
        ),
        TargetKind::Hosting => format!(
            "[Abuse] {} content hosted on your network — {}",
            title, vars.ip
        ),
        TargetKind::Cdn => format!(
            "[Abuse] {} content served through your CDN — {}",
            title, vars.domain
        ),
        TargetKind::Search | TargetKind::Blocklist => format!(
            "[Report] {} — {}",
            title, vars.defanged_url
        ),
    }
}

/// Body template for a target kind + classification.
pub fn body(kind: TargetKind, category: &str) -> &'static str {
    match kind {
        TargetKind::Registrar => registrar_body(category),
        TargetKind::Hosting | TargetKind::Cdn => hosting_body(category),
        TargetKind::Search | TargetKind::Blocklist => REPORT_BODY,
    }
}

fn registrar_body(category: &str) -> &'static str {
    match category {
        "phishing" => REGISTRAR_PHISHING,
        "malware" => REGISTRAR_MALWARE,
        _ => REGISTRAR_DEFAULT,
    }
}

fn hosting_body(category: &str) -> &'static str {
    match category {
        "phishing" => HOSTING_PHISHING,
        "malware" => HOSTING_MALWARE,
        "c2" => HOSTING_C2,
        _ => HOSTING_DEFAULT,
    }
}

const REGISTRAR_PHISHING: &str = "Dear Abuse Team,

We identified phishing activity on the domain {domain}, registered
through {provider}. We request IMMEDIATE SUSPENSION per your Terms of
Service and DNS Abuse Policy.

CASE DETAILS:
- Case ID: {case_id}
- Evidence ID: {evidence_id}
- Domain (defanged): {defanged_url}
- Category: {category}
- Risk Score: {risk_score}/100
- First seen: {first_seen}
- Analysis: {rationale}

REQUESTED ACTION:
Immediate suspension of the domain for ToS violation (phishing/fraud).

IMPACT:
The domain is actively harvesting credentials from legitimate users,
causing financial damage and personal data compromise.

Please confirm receipt and provide a case number for follow-up.

Regards,
CTI Security Team";

const REGISTRAR_MALWARE: &str = "Dear Abuse Team,

We detected malware distribution via the domain {domain}, registered
through {provider}. We request suspension per your Terms of Service.

CASE DETAILS:
- Case ID: {case_id}
- Evidence ID: {evidence_id}
- Domain (defanged): {defanged_url}
- Category: {category}
- Risk Score: {risk_score}/100
- First seen: {first_seen}
- Analysis: {rationale}

REQUESTED ACTION:
Suspension of the domain for malware distribution.

Please confirm receipt and provide a case number.

Regards,
CTI Security Team";

const REGISTRAR_DEFAULT: &str = "Dear Abuse Team,

We identified malicious activity on the domain {domain}, registered
through {provider}. We request review and appropriate action per your
Terms of Service.

CASE DETAILS:
- Case ID: {case_id}
- Evidence ID: {evidence_id}
- Domain (defanged): {defanged_url}
- Category: {category}
- Risk Score: {risk_score}/100
- First seen: {first_seen}
- Analysis: {rationale}

Regards,
CTI Security Team";

const HOSTING_PHISHING: &str = "Hello Abuse Team,

We detected phishing content being served from your network.
Please REMOVE the content and notify the customer.

CASE DETAILS:
- Case ID: {case_id}
- Evidence ID: {evidence_id}
- Domain: {domain}
- IP Address: {ip}
- Provider: {provider}
- Category: Phishing
- Risk Score: {risk_score}/100
- First seen: {first_seen}

EVIDENCE:
- URLs (defanged): {defanged_url}
- Analysis: {rationale}

REQUESTED ACTION:
Immediate removal of phishing content and customer notification.

IMPACT:
The content is actively harvesting user credentials, causing financial
damage and personal data compromise.

Please provide a ticket ID and status update.

Regards,
CTI Security Team";

const HOSTING_MALWARE: &str = "Hello Abuse Team,

We detected malware distribution from your network infrastructure.
Please REMOVE the malicious content immediately.

CASE DETAILS:
- Case ID: {case_id}
- Evidence ID: {evidence_id}
- Domain: {domain}
- IP Address: {ip}
- Provider: {provider}
- Category: Malware Distribution
- Risk Score: {risk_score}/100
- First seen: {first_seen}

EVIDENCE:
- URLs (defanged): {defanged_url}
- Analysis: {rationale}

REQUESTED ACTION:
Immediate removal of the malware payload and customer notification.

Please confirm receipt and provide a ticket ID.

Regards,
CTI Security Team";

const HOSTING_C2: &str = "Hello Abuse Team,

We identified Command & Control (C2) infrastructure on your network.
Please TAKE DOWN the malicious infrastructure immediately.

CASE DETAILS:
- Case ID: {case_id}
- Evidence ID: {evidence_id}
- Domain: {domain}
- IP Address: {ip}
- Provider: {provider}
- Category: C2 Infrastructure
- Risk Score: {risk_score}/100
- First seen: {first_seen}

EVIDENCE:
- URLs (defanged): {defanged_url}
- Analysis: {rationale}

REQUESTED ACTION:
Immediate takedown of the C2 infrastructure.

URGENCY: HIGH - Active malware campaigns depend on this infrastructure.

Please confirm immediate action and provide a ticket reference.

Regards,
CTI Security Team";

const HOSTING_DEFAULT: &str = "Hello Abuse Team,

We detected malicious content hosted on your network infrastructure.
Please investigate and take appropriate action.

CASE DETAILS:
- Case ID: {case_id}
- Evidence ID: {evidence_id}
- Domain: {domain}
- IP Address: {ip}
- Provider: {provider}
- Category: {category}
- Risk Score: {risk_score}/100
- First seen: {first_seen}

EVIDENCE:
- URLs (defanged): {defanged_url}
- Analysis: {rationale}

Please investigate and take appropriate action per your AUP.

Regards,
CTI Security Team";

const REPORT_BODY: &str = "Automated report for {defanged_url}

Case ID: {case_id}
Evidence ID: {evidence_id}
Category: {category}
Risk Score: {risk_score}/100
First seen: {first_seen}
Analysis: {rationale}";

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{defang, RiskAssessment, Severity};
    use chrono::Utc;

    fn sample_vars() -> TemplateVars {
        let mut request = TakedownRequest::new(
            "tdk-0000",
            Severity::High,
            vec!["phishing".into(), "brand:TestBank".into()],
        );
        request.evidence_id = "ev-1".into();
        request.target.entity = "Example Host".into();

        let mut evidence = EvidencePack {
            evidence_id: "ev-1".into(),
            ioc: "ind-1".into(),
            collected_at: Utc::now(),
            defanged: defang("https://bank-login.evil.com/verify"),
            risk: RiskAssessment {
                score: 87,
                category: "phishing".into(),
                rationale: "credential harvesting form".into(),
            },
            ..Default::default()
        };
        evidence.dns.a = vec!["203.0.113.7".into()];

        TemplateVars::from_case(&request, &evidence)
    }

    #[test]
    fn category_derivation() {
        let tags = |list: &[&str]| list.iter().map(|s| s.to_string()).collect::<Vec<_>>();
        assert_eq!(category_of(&tags(&["phishing", "high"])), "phishing");
        assert_eq!(category_of(&tags(&["c2"])), "c2");
        assert_eq!(category_of(&tags(&["brand:Acme"])), "abuse");
    }

    #[test]
    fn render_substitutes_every_placeholder() {
        let vars = sample_vars();
        for kind in [TargetKind::Registrar, TargetKind::Hosting] {
            let rendered = render(body(kind, &vars.category), &vars);
            assert!(!rendered.contains('{'), "unfilled placeholder in {kind}");
            assert!(rendered.contains("tdk-0000"));
            assert!(rendered.contains("87/100"));
        }
    }

    #[test]
    fn vars_use_defanged_host() {
        let vars = sample_vars();
        assert_eq!(vars.domain, "bank-login.evil.com");
        assert_eq!(vars.ip, "203.0.113.7");
        assert!(vars.defanged_url.contains("[.]"));
    }

    #[test]
    fn subjects_per_kind() {
        let vars = sample_vars();
        assert!(subject(TargetKind::Registrar, &vars).contains("Domain suspension"));
        assert!(subject(TargetKind::Hosting, &vars).contains("203.0.113.7"));
        assert!(subject(TargetKind::Blocklist, &vars).starts_with("[Report] Phishing"));
    }
}
