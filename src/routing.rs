//! Declarative routing: map `(tags, contacts)` to an ordered list of
//! materialized takedown actions.
//!
//! Rules fire when every pattern in their match list is satisfied by
//! some case tag; all firing rules contribute candidates. Candidates
//! are materialized against the discovered contacts (dropped when the
//! needed sub-record is unknown, except the fixed public endpoints),
//! deduplicated to one action per target kind, and returned in kind
//! rank order so the state machine's "first action" is hosting-first.

use crate::models::{AbuseContact, Sla, TakedownAction, TakedownTarget, TargetKind};

pub const SAFE_BROWSING_ENTITY: &str = "Google Safe Browsing";
pub const SAFE_BROWSING_WEBFORM: &str =
    "https://safebrowsing.google.com/safebrowsing/report_phish/";
pub const URLHAUS_ENTITY: &str = "URLhaus";
pub const URLHAUS_WEBFORM: &str = "https://urlhaus.abuse.ch/browse/";

/// A single tag pattern: a literal tag or a `prefix*` wildcard.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TagPattern {
    Literal(String),
    Prefix(String),
}

impl TagPattern {
    /// Parse from rule notation; a trailing `*` makes a prefix pattern.
    pub fn parse(raw: &str) -> Self {
        match raw.strip_suffix('*') {
            Some(prefix) => TagPattern::Prefix(prefix.to_string()),
            None => TagPattern::Literal(raw.to_string()),
        }
    }

    pub fn matches(&self, tag: &str) -> bool {
        match self {
            TagPattern::Literal(literal) => tag == literal,
            TagPattern::Prefix(prefix) => tag.starts_with(prefix.as_str()),
        }
    }
}

/// Unmaterialized action carried by a rule.
#[derive(Debug, Clone)]
pub struct ActionTemplate {
    pub kind: TargetKind,
    pub action: TakedownAction,
    pub sla: Sla,
}

/// A routing rule: all patterns must be satisfied for the rule to fire.
#[derive(Debug, Clone)]
pub struct Rule {
    pub patterns: Vec<TagPattern>,
    pub actions: Vec<ActionTemplate>,
}

impl Rule {
    pub fn new(patterns: &[&str], actions: Vec<ActionTemplate>) -> Self {
        Self {
            patterns: patterns.iter().map(|p| TagPattern::parse(p)).collect(),
            actions,
        }
    }

    fn fires(&self, tags: &[String]) -> bool {
        self.patterns
            .iter()
            .all(|pattern| tags.iter().any(|tag| pattern.matches(tag)))
    }
}

/// A candidate action with its target filled in from the contacts.
#[derive(Debug, Clone)]
pub struct ActionDefinition {
    pub target: TakedownTarget,
    pub action: TakedownAction,
    pub sla: Sla,
}

/// The rules engine. Stateless apart from its rule list; evaluation is
/// a pure function of `(tags, contacts)`.
#[derive(Debug, Clone)]
pub struct Engine {
    rules: Vec<Rule>,
}

impl Default for Engine {
    fn default() -> Self {
        Self::with_default_rules()
    }
}

impl Engine {
    /// Engine preloaded with the standard classification rules.
    pub fn with_default_rules() -> Self {
        let template = |kind, action, sla| ActionTemplate { kind, action, sla };

        let rules = vec![
            Rule::new(
                &["phishing"],
                vec![
                    template(
                        TargetKind::Registrar,
                        TakedownAction::SuspendDomain,
                        Sla::new(48, 120, 48),
                    ),
                    template(
                        TargetKind::Hosting,
                        TakedownAction::RemoveContent,
                        Sla::new(48, 96, 24),
                    ),
                    template(
                        TargetKind::Search,
                        TakedownAction::WarningList,
                        Sla::new(24, 72, 24),
                    ),
                    template(
                        TargetKind::Blocklist,
                        TakedownAction::Blocklist,
                        Sla::new(24, 72, 24),
                    ),
                ],
            ),
            Rule::new(
                &["malware"],
                vec![
                    template(
                        TargetKind::Hosting,
                        TakedownAction::RemoveContent,
                        Sla::new(24, 72, 24),
                    ),
                    template(
                        TargetKind::Blocklist,
                        TakedownAction::Blocklist,
                        Sla::new(24, 72, 24),
                    ),
                ],
            ),
            Rule::new(
                &["c2"],
                vec![
                    template(
                        TargetKind::Hosting,
                        TakedownAction::RemoveContent,
                        Sla::new(12, 48, 12),
                    ),
                    template(
                        TargetKind::Registrar,
                        TakedownAction::SuspendDomain,
                        Sla::new(24, 72, 24),
                    ),
                ],
            ),
            Rule::new(
                &["brand:*"],
                vec![template(
                    TargetKind::Registrar,
                    TakedownAction::SuspendDomain,
                    Sla::new(72, 168, 72),
                )],
            ),
        ];

        Self { rules }
    }

    pub fn add_rule(&mut self, rule: Rule) {
        self.rules.push(rule);
    }

    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    /// Evaluate the rule list against the case tags and materialize the
    /// winners. At most one action per target kind; output is sorted by
    /// kind rank (hosting first).
    pub fn decide(&self, tags: &[String], contacts: &AbuseContact) -> Vec<ActionDefinition> {
        let mut winners: Vec<ActionDefinition> = Vec::new();

        for rule in self.rules.iter().filter(|r| r.fires(tags)) {
            for template in &rule.actions {
                if winners.iter().any(|w| w.target.kind == template.kind) {
                    continue;
                }
                if let Some(action) = materialize(template, contacts) {
                    winners.push(action);
                }
            }
        }

        winners.sort_by_key(|action| action.target.kind.rank());
        winners
    }
}

/// Fill in the target from the discovered contacts. Returns `None`
/// when the required sub-record is unknown; search and blocklist use
/// fixed public endpoints and always materialize.
fn materialize(template: &ActionTemplate, contacts: &AbuseContact) -> Option<ActionDefinition> {
    let target = match template.kind {
        TargetKind::Registrar => {
            let registrar = contacts.registrar.as_ref()?;
            TakedownTarget {
                kind: TargetKind::Registrar,
                entity: registrar.name.clone(),
                email: contacts.primary_abuse_email(),
                phone: contacts.abuse.phone.clone(),
                webform: contacts.abuse.webform.clone(),
            }
        }
        TargetKind::Hosting => {
            let hosting = contacts.hosting.as_ref()?;
            TakedownTarget {
                kind: TargetKind::Hosting,
                entity: hosting.name.clone(),
                email: hosting.abuse.email.clone(),
                phone: hosting.abuse.phone.clone(),
                webform: hosting.abuse.webform.clone(),
            }
        }
        TargetKind::Cdn => {
            let cdn = contacts.cdn.as_ref()?;
            TakedownTarget {
                kind: TargetKind::Cdn,
                entity: cdn.name.clone(),
                email: cdn.abuse.email.clone(),
                phone: cdn.abuse.phone.clone(),
                webform: cdn.webform.clone(),
            }
        }
        TargetKind::Search => TakedownTarget {
            kind: TargetKind::Search,
            entity: SAFE_BROWSING_ENTITY.to_string(),
            email: None,
            phone: None,
            webform: Some(SAFE_BROWSING_WEBFORM.to_string()),
        },
        TargetKind::Blocklist => TakedownTarget {
            kind: TargetKind::Blocklist,
            entity: URLHAUS_ENTITY.to_string(),
            email: None,
            phone: None,
            webform: Some(URLHAUS_WEBFORM.to_string()),
        },
    };

    Some(ActionDefinition {
        target,
        action: template.action,
        sla: template.sla,
    })
}
