//! Configuration: environment variables layered under CLI flags.
//!
//! All variables are prefixed `TAKEDOWN_`. The SMTP block feeds the
//! email connectors; orchestrator tunables cover the worker pool and
//! scheduler; the HTTP block is shared by the RDAP client, the
//! evidence collector and the API connectors.

use std::time::Duration;

use crate::errors::{Result, TakedownError};
use crate::machine::MachineConfig;
use crate::smtp::SmtpConfig;

#[derive(Debug, Clone)]
pub struct HttpConfig {
    pub timeout: Duration,
    pub user_agent: String,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            user_agent: crate::rdap::USER_AGENT.to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub smtp: SmtpConfig,
    pub machine: MachineConfig,
    pub http: HttpConfig,
    /// Case journal path; empty disables persistence.
    pub journal_path: Option<String>,
    /// Optional warning-list submission endpoint.
    pub search_endpoint: Option<String>,
    /// Optional blocklist submission endpoint + API key.
    pub blocklist_endpoint: Option<String>,
    pub blocklist_api_key: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            smtp: SmtpConfig {
                port: 25,
                ..Default::default()
            },
            machine: MachineConfig::default(),
            http: HttpConfig::default(),
            journal_path: None,
            search_endpoint: None,
            blocklist_endpoint: None,
            blocklist_api_key: None,
        }
    }
}

impl Config {
    /// Load configuration from `TAKEDOWN_*` environment variables.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(host) = std::env::var("TAKEDOWN_SMTP_HOST") {
            config.smtp.host = host;
        }
        if let Some(port) = env_parse::<u16>("TAKEDOWN_SMTP_PORT") {
            config.smtp.port = port;
        }
        if let Ok(username) = std::env::var("TAKEDOWN_SMTP_USERNAME") {
            config.smtp.username = username;
        }
        if let Ok(password) = std::env::var("TAKEDOWN_SMTP_PASSWORD") {
            config.smtp.password = password;
        }
        if let Ok(from) = std::env::var("TAKEDOWN_SMTP_FROM") {
            config.smtp.from = from;
        }

        if let Some(workers) = env_parse::<usize>("TAKEDOWN_WORKERS") {
            config.machine.workers = workers;
        }
        if let Some(capacity) = env_parse::<usize>("TAKEDOWN_QUEUE_CAPACITY") {
            config.machine.queue_capacity = capacity;
        }
        if let Some(secs) = env_parse::<u64>("TAKEDOWN_TICK_SECS") {
            config.machine.tick_interval = Duration::from_secs(secs);
        }

        if let Some(secs) = env_parse::<u64>("TAKEDOWN_HTTP_TIMEOUT_SECS") {
            config.http.timeout = Duration::from_secs(secs);
        }

        if let Ok(path) = std::env::var("TAKEDOWN_JOURNAL") {
            if !path.is_empty() {
                config.journal_path = Some(path);
            }
        }
        if let Ok(endpoint) = std::env::var("TAKEDOWN_SEARCH_ENDPOINT") {
            if !endpoint.is_empty() {
                config.search_endpoint = Some(endpoint);
            }
        }
        if let Ok(endpoint) = std::env::var("TAKEDOWN_BLOCKLIST_ENDPOINT") {
            if !endpoint.is_empty() {
                config.blocklist_endpoint = Some(endpoint);
            }
        }
        if let Ok(key) = std::env::var("TAKEDOWN_BLOCKLIST_API_KEY") {
            if !key.is_empty() {
                config.blocklist_api_key = Some(key);
            }
        }

        config
    }

    /// Sanity checks before the machine starts.
    pub fn validate(&self) -> Result<()> {
        if self.machine.workers == 0 {
            return Err(TakedownError::configuration(
                "worker count must be at least 1",
            ));
        }
        if self.machine.queue_capacity == 0 {
            return Err(TakedownError::configuration(
                "queue capacity must be at least 1",
            ));
        }
        if self.machine.tick_interval.is_zero() {
            return Err(TakedownError::configuration(
                "scheduler tick interval must be greater than 0",
            ));
        }
        if self.http.timeout.is_zero() {
            return Err(TakedownError::configuration(
                "HTTP timeout must be greater than 0",
            ));
        }
        if self.smtp.is_configured() && self.smtp.port == 0 {
            return Err(TakedownError::configuration("SMTP port must be non-zero"));
        }
        Ok(())
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|raw| raw.parse().ok())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::machine::{DEFAULT_QUEUE_CAPACITY, DEFAULT_TICK_INTERVAL, DEFAULT_WORKERS};

    #[test]
    fn defaults() {
        let config = Config::default();
        assert_eq!(config.machine.workers, DEFAULT_WORKERS);
        assert_eq!(config.machine.queue_capacity, DEFAULT_QUEUE_CAPACITY);
        assert_eq!(config.machine.tick_interval, DEFAULT_TICK_INTERVAL);
        assert_eq!(config.smtp.port, 25);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn validation_rejects_zero_workers() {
        let mut config = Config::default();
        config.machine.workers = 0;
        assert!(config.validate().is_err());

        config.machine.workers = 1;
        config.machine.queue_capacity = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn env_overrides() {
        std::env::set_var("TAKEDOWN_WORKERS", "9");
        std::env::set_var("TAKEDOWN_TICK_SECS", "5");
        std::env::set_var("TAKEDOWN_SMTP_HOST", "relay.internal");

        let config = Config::from_env();
        assert_eq!(config.machine.workers, 9);
        assert_eq!(config.machine.tick_interval, Duration::from_secs(5));
        assert_eq!(config.smtp.host, "relay.internal");

        std::env::remove_var("TAKEDOWN_WORKERS");
        std::env::remove_var("TAKEDOWN_TICK_SECS");
        std::env::remove_var("TAKEDOWN_SMTP_HOST");
    }
}
