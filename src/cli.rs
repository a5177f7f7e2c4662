//! Command-line interface.
//!
//! Exit codes: 0 success, 1 user error, 2 internal error.

use clap::{Parser, ValueEnum};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Action {
    /// Ingest an IOC and drive it through the pipeline.
    Submit,
    /// Print one case as JSON.
    Status,
    /// List all known cases.
    List,
    /// Run the orchestrator until interrupted.
    Daemon,
}

#[derive(Parser, Debug, Clone)]
#[command(
    author,
    version,
    about = "Automates takedown cases for malicious domains, URLs and IPs: evidence, contacts, submission and SLA-driven follow-up"
)]
pub struct Cli {
    /// What to do.
    #[arg(long, value_enum)]
    pub action: Action,

    /// Indicator value (URL, domain, IP or hash). Required for submit.
    #[arg(long)]
    pub ioc: Option<String>,

    /// Comma-separated tags, e.g. "phishing,brand:TestBank,high".
    #[arg(long)]
    pub tags: Option<String>,

    /// Case id, e.g. for --action=status.
    #[arg(long = "case")]
    pub case: Option<String>,

    /// Keep the orchestrator running after a submit.
    #[arg(long)]
    pub daemon: bool,
}

impl Cli {
    pub fn from_args() -> Self {
        Self::parse()
    }

    /// Split the --tags CSV into a tag list.
    pub fn tag_list(&self) -> Vec<String> {
        self.tags
            .as_deref()
            .unwrap_or_default()
            .split(',')
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
            .collect()
    }
}
