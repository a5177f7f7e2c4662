//! Core data model: indicators, evidence packs, abuse contacts and the
//! takedown case record itself.
//!
//! Everything here is serde-serializable; event records follow the
//! persisted wire shape (`{t, event, channel?, ref?, notes?}` with
//! RFC 3339 UTC timestamps).

pub mod contacts;
pub mod evidence;
pub mod ioc;
pub mod takedown;

pub use contacts::{AbuseContact, CdnInfo, ContactInfo, HostingInfo, RegistrarInfo};
pub use evidence::{
    defang, refang, DnsRecords, EvidencePack, HttpSnapshot, RiskAssessment, TlsCertificate,
};
pub use ioc::{IocKind, Severity, IOC};
pub use takedown::{
    Sla, TakedownAction, TakedownEvent, TakedownRequest, TakedownStatus, TakedownTarget,
    TargetKind,
};
