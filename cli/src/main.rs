//! aigov: governance evidence CLI.
//!
//! Records governance events for a run into a hash-chained evidence log,
//! writes the run report, exports the fingerprinted audit bundle, and
//! verifies a bundle independently.
//!
//! Usage:
//!   aigov init-run r1
//!   aigov emit-event r1 data_registered --payload '{"dataset":"iris","dataset_fingerprint":"9f2c"}'
//!   aigov report r1
//!   aigov export-bundle r1
//!   aigov --mode prod verify r1
//!
//! Exit codes: 0 success (or `VERDICT VALID`), 1 failure (or `VERDICT
//! INVALID`), 2 usage error.

mod config;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use serde_json::Value;
use tracing_subscriber::EnvFilter;

use aigov_audit::{EvidenceLedger, FsEvidenceStore};
use aigov_bundle::{BundleExporter, ReportWriter};
use aigov_contracts::{
    error::{AigovError, AigovResult},
    event::NewEvent,
    mode::ExecutionMode,
};
use aigov_verify::ConsistencyVerifier;

use crate::config::AigovConfig;

// ── CLI definition ────────────────────────────────────────────────────────────

/// aigov: tamper-evident governance evidence for model promotion.
#[derive(Parser)]
#[command(
    name = "aigov",
    about = "Tamper-evident governance evidence for model promotion workflows",
    long_about = "Records governance events into a hash-chained evidence log, derives a\n\
                  fingerprinted audit bundle, and verifies bundles for consistency."
)]
struct Cli {
    /// Configuration file (defaults to ./aigov.toml when present).
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Root directory for evidence, reports and audit artifacts.
    #[arg(long, global = true)]
    docs_dir: Option<PathBuf>,

    /// Execution mode: ci or prod.
    #[arg(long, global = true)]
    mode: Option<ExecutionMode>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Append one governance event to a run's evidence log.
    EmitEvent {
        run_id: String,
        /// Event type, e.g. data_registered.
        event_type: String,
        #[arg(long, default_value = "system")]
        actor: String,
        /// Producing system; defaults to the configured system.
        #[arg(long)]
        system: Option<String>,
        /// Payload as a JSON object.
        #[arg(long)]
        payload: Option<String>,
        /// Explicit event id; generated when omitted.
        #[arg(long)]
        event_id: Option<String>,
    },
    /// Create an empty evidence log for a run.
    InitRun { run_id: String },
    /// Write the run report, or with --fill only refresh its header.
    Report {
        run_id: String,
        #[arg(long)]
        fill: bool,
    },
    /// Write the audit record, its self-hash and the manifest.
    ExportBundle { run_id: String },
    /// Verify a run's bundle and print the itemised result.
    Verify { run_id: String },
    /// Relink and rehash a run's evidence chain in place.
    RebuildChain { run_id: String },
}

// ── Entry point ───────────────────────────────────────────────────────────────

fn main() -> ExitCode {
    // Logs go to stderr; stdout carries command output. RUST_LOG=debug for detail.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .compact()
        .init();

    let cli = Cli::parse();

    match run(cli) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("error: {e}");
            if e.is_usage() {
                ExitCode::from(2)
            } else {
                ExitCode::FAILURE
            }
        }
    }
}

fn run(cli: Cli) -> AigovResult<ExitCode> {
    let mut config = AigovConfig::load(cli.config.as_deref())?;
    if let Some(docs_dir) = cli.docs_dir {
        config.docs_dir = docs_dir;
    }
    if let Some(mode) = cli.mode {
        config.mode = mode;
    }

    match cli.command {
        Command::EmitEvent {
            run_id,
            event_type,
            actor,
            system,
            payload,
            event_id,
        } => {
            let event = ledger(&config)?.append(NewEvent {
                run_id,
                event_type,
                actor,
                system: system.unwrap_or_else(|| config.system.clone()),
                payload: parse_payload(payload.as_deref())?,
                event_id,
                ts_utc: None,
            })?;
            println!("saved {}", config.layout().evidence_path(&event.run_id).display());
            println!("event_id={}", event.id);
            println!("sha256={}", event.sha256);
        }
        Command::InitRun { run_id } => {
            let log = ledger(&config)?.ensure_log(&run_id)?;
            println!("saved {}", config.layout().evidence_path(&log.run_id).display());
        }
        Command::Report { run_id, fill } => {
            let outcome = ReportWriter::new(config.layout(), config.mode).write(&run_id, fill)?;
            println!("saved {}", outcome.path.display());
            println!("bundle_sha256={}", outcome.header.bundle_sha256);
        }
        Command::ExportBundle { run_id } => {
            let outcome = BundleExporter::new(config.layout()).export(&run_id)?;
            println!("saved {}", outcome.audit_path.display());
            println!("saved {}", outcome.audit_sha_path.display());
            println!("saved {}", outcome.manifest_path.display());
            println!("bundle_sha256={}", outcome.record.bundle_sha256);
            if !outcome.policy_version_known() {
                eprintln!(
                    "note: policy_version is unknown; set policy_version in {} or \
                     AIGOV_POLICY_VERSION before emitting events, otherwise verify reports INVALID",
                    config::DEFAULT_CONFIG_FILE
                );
            }
        }
        Command::Verify { run_id } => {
            let report = ConsistencyVerifier::new(config.layout())
                .with_policy(Box::new(config.policy()?))
                .with_mode(config.mode)
                .verify(&run_id)?;
            for line in report.render_lines() {
                println!("{line}");
            }
            if !report.is_valid() {
                return Ok(ExitCode::FAILURE);
            }
        }
        Command::RebuildChain { run_id } => {
            let changed = ledger(&config)?.rebuild(&run_id)?;
            println!("saved {}", config.layout().evidence_path(&run_id).display());
            println!("relinked_events={changed}");
        }
    }

    Ok(ExitCode::SUCCESS)
}

fn ledger(config: &AigovConfig) -> AigovResult<EvidenceLedger<FsEvidenceStore>> {
    Ok(EvidenceLedger::new(FsEvidenceStore::new(config.layout()))
        .with_policy(Box::new(config.policy()?))
        .with_policy_version(config.policy_version.clone()))
}

fn parse_payload(raw: Option<&str>) -> AigovResult<serde_json::Map<String, Value>> {
    let Some(raw) = raw else {
        return Ok(serde_json::Map::new());
    };
    match serde_json::from_str::<Value>(raw) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(_) => Err(AigovError::InvalidArgument {
            reason: "--payload must be a JSON object".to_string(),
        }),
        Err(e) => Err(AigovError::InvalidArgument {
            reason: format!("--payload is not valid JSON: {e}"),
        }),
    }
}
