use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use uuid::Uuid;

use takedown::cli::{Action, Cli};
use takedown::collector::HttpEvidenceCollector;
use takedown::config::Config;
use takedown::connectors::{
    BlocklistConnector, EmailRegistrarConnector, GenericHostingConnector, SearchWarningConnector,
};
use takedown::enrichment::RdapEnricher;
use takedown::errors::{ErrorCategory, Result, TakedownError};
use takedown::journal::Journal;
use takedown::machine::Machine;
use takedown::models::{IocKind, TakedownStatus, IOC};
use takedown::rdap::RdapClient;
use takedown::routing::Engine;
use takedown::smtp::Mailer;

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_env("TAKEDOWN_LOG")
                .or_else(|_| tracing_subscriber::EnvFilter::try_from_default_env())
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();

    let cli = Cli::from_args();
    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            match e.category() {
                ErrorCategory::Input => ExitCode::from(1),
                _ => ExitCode::from(2),
            }
        }
    }
}

async fn run(cli: Cli) -> Result<()> {
    let config = Config::from_env();
    config.validate()?;

    match cli.action {
        Action::Submit => submit(&cli, &config).await,
        Action::Status => status(&cli, &config),
        Action::List => list(&config),
        Action::Daemon => daemon(&config).await,
    }
}

/// Ingest one IOC. Without --daemon, waits until the case reaches a
/// waiting or terminal state and prints it; with --daemon, keeps the
/// orchestrator running.
async fn submit(cli: &Cli, config: &Config) -> Result<()> {
    let Some(value) = cli.ioc.as_deref() else {
        return Err(TakedownError::configuration(
            "--ioc is required for --action=submit",
        ));
    };

    let machine = build_machine(config)?;
    machine.start().await;

    let ioc = IOC::new(
        format!("ind-{}", Uuid::new_v4()),
        infer_kind(value),
        value,
        "cli",
        cli.tag_list(),
    );
    let case_id = machine.process_ioc(ioc)?;
    println!("case created: {case_id}");

    if cli.daemon {
        wait_for_interrupt().await;
        machine.stop().await;
        return Ok(());
    }

    // Drive the case until it parks (submitted/acked/follow_up) or
    // closes, then report it.
    let deadline = tokio::time::Instant::now() + Duration::from_secs(120);
    loop {
        tokio::time::sleep(Duration::from_millis(250)).await;
        let Some(request) = machine.get_request(&case_id) else {
            break;
        };
        let parked = request.status.is_waiting()
            || request.status.is_terminal()
            || request.next_action_at.is_some();
        if parked {
            print_case(&request)?;
            break;
        }
        if tokio::time::Instant::now() > deadline {
            eprintln!("case still processing; current state:");
            print_case(&request)?;
            break;
        }
    }

    machine.stop().await;
    Ok(())
}

/// Print one case from the journal-backed registry.
fn status(cli: &Cli, config: &Config) -> Result<()> {
    let Some(case_id) = cli.case.as_deref() else {
        return Err(TakedownError::configuration(
            "--case is required for --action=status",
        ));
    };
    let cases = load_journal_cases(config)?;
    let request = cases
        .get(case_id)
        .ok_or_else(|| TakedownError::UnknownCase {
            case_id: case_id.to_string(),
        })?;
    print_case(request)
}

/// Summarize every known case.
fn list(config: &Config) -> Result<()> {
    let cases = load_journal_cases(config)?;
    let mut rows: Vec<_> = cases.values().collect();
    rows.sort_by(|a, b| a.created_at.cmp(&b.created_at));
    for request in rows {
        println!(
            "{}  {:13}  {:8}  {}  {}",
            request.case_id,
            request.status.as_str(),
            request.priority.as_str(),
            request.updated_at.format("%Y-%m-%d %H:%M:%S"),
            request.target.entity,
        );
    }
    Ok(())
}

/// Run the orchestrator until SIGINT.
async fn daemon(config: &Config) -> Result<()> {
    let machine = build_machine(config)?;
    machine.start().await;
    println!("takedown orchestrator running; press Ctrl-C to stop");
    wait_for_interrupt().await;
    machine.stop().await;

    for request in machine.list_requests() {
        if request.status != TakedownStatus::Closed {
            tracing::info!(
                case_id = %request.case_id,
                status = %request.status,
                "case parked for next run"
            );
        }
    }
    Ok(())
}

fn build_machine(config: &Config) -> Result<Machine> {
    let collector = HttpEvidenceCollector::new(config.http.timeout, &config.http.user_agent)?;
    let enricher = RdapEnricher::new(RdapClient::new(config.http.timeout)?);
    let mut machine = Machine::new(
        Arc::new(collector),
        Arc::new(enricher),
        Engine::with_default_rules(),
        config.machine.clone(),
    );

    if let Some(path) = &config.journal_path {
        let restored = machine.attach_journal(Journal::open(path)?)?;
        if restored > 0 {
            tracing::info!(count = restored, path, "journal replayed");
        }
    }

    let mailer = Arc::new(Mailer::new(config.smtp.clone()));
    machine.register_connector(Arc::new(EmailRegistrarConnector::new(Arc::clone(&mailer))));
    machine.register_connector(Arc::new(GenericHostingConnector::new(mailer)));
    machine.register_connector(Arc::new(SearchWarningConnector::new(
        config.search_endpoint.clone(),
        config.http.timeout,
        &config.http.user_agent,
    )?));
    machine.register_connector(Arc::new(BlocklistConnector::new(
        config.blocklist_endpoint.clone(),
        config.blocklist_api_key.clone(),
        config.http.timeout,
        &config.http.user_agent,
    )?));
    Ok(machine)
}

fn load_journal_cases(
    config: &Config,
) -> Result<std::collections::HashMap<String, takedown::models::TakedownRequest>> {
    let Some(path) = &config.journal_path else {
        return Err(TakedownError::configuration(
            "set TAKEDOWN_JOURNAL to inspect cases across runs",
        ));
    };
    Journal::load(path)
}

fn print_case(request: &takedown::models::TakedownRequest) -> Result<()> {
    let rendered = serde_json::to_string_pretty(request)
        .map_err(|e| TakedownError::internal(format!("case encode: {e}")))?;
    println!("{rendered}");
    Ok(())
}

/// Classify a raw indicator value.
fn infer_kind(value: &str) -> IocKind {
    if value.parse::<std::net::IpAddr>().is_ok() {
        return IocKind::Ip;
    }
    if value.contains("://") {
        return IocKind::Url;
    }
    if value.contains('.') {
        return IocKind::Domain;
    }
    IocKind::Hash
}

async fn wait_for_interrupt() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("signal handler failed: {e}");
    }
}
