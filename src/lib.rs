//! Takedown Orchestrator Library
//!
//! Drives the lifecycle of domain/URL/IP takedown cases: ingestion of
//! a malicious indicator, evidence collection, abuse-contact
//! discovery, submission to the responsible intermediary and
//! SLA-driven follow-up until the case resolves or escalates.
//!
//! The core is a persistent state machine (`machine`), a worker pool
//! and scheduler pair, and a declarative routing engine (`routing`).
//! Collaborators — evidence collector, RDAP enricher, per-provider
//! connectors — sit behind async traits and can be swapped out.
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use takedown::collector::HttpEvidenceCollector;
//! use takedown::enrichment::RdapEnricher;
//! use takedown::machine::{Machine, MachineConfig};
//! use takedown::models::{IocKind, IOC};
//! use takedown::rdap::RdapClient;
//! use takedown::routing::Engine;
//!
//! # async fn run() -> takedown::errors::Result<()> {
//! let timeout = std::time::Duration::from_secs(30);
//! let machine = Machine::new(
//!     Arc::new(HttpEvidenceCollector::new(timeout, takedown::rdap::USER_AGENT)?),
//!     Arc::new(RdapEnricher::new(RdapClient::new(timeout)?)),
//!     Engine::with_default_rules(),
//!     MachineConfig::default(),
//! );
//! machine.start().await;
//!
//! let ioc = IOC::new(
//!     "ind-1",
//!     IocKind::Url,
//!     "https://bank-login.evil.com",
//!     "feed:internal",
//!     vec!["phishing".into(), "brand:TestBank".into()],
//! );
//! let case_id = machine.process_ioc(ioc)?;
//! println!("tracking case {case_id}");
//! # Ok(())
//! # }
//! ```

pub mod cli;
pub mod collector;
pub mod config;
pub mod connectors;
pub mod domain_utils;
pub mod enrichment;
pub mod errors;
pub mod journal;
pub mod machine;
pub mod models;
pub mod providers;
pub mod rdap;
pub mod routing;
mod scheduler;
pub mod shutdown;
pub mod smtp;
pub mod templates;

pub use errors::{ErrorCategory, Result, TakedownError};
pub use machine::{Machine, MachineConfig};
pub use models::{
    AbuseContact, EvidencePack, IocKind, Severity, Sla, TakedownRequest, TakedownStatus,
    TargetKind, IOC,
};

// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const NAME: &str = env!("CARGO_PKG_NAME");
