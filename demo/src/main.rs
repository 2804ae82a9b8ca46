//! bioledger health dashboard demo and operator CLI.
//!
//! Runs the three reference scenarios against an in-memory store, and
//! inspects or maintains a persisted ledger directory.
//!
//! Usage:
//!   cargo run -p demo -- run-all
//!   cargo run -p demo -- medication-intake
//!   cargo run -p demo -- refund-signoff
//!   cargo run -p demo -- tamper-lockdown
//!   cargo run -p demo -- append --store ./ledger --user u1 --action create --reason "profile created"
//!   cargo run -p demo -- verify --store ./ledger --detailed
//!   cargo run -p demo -- export --store ./ledger --out audit.csv
//!   cargo run -p demo -- lock-status --store ./ledger
//!   cargo run -p demo -- clear-lock --store ./ledger --operator ops-admin

use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::{Parser, Subcommand, ValueEnum};
use tracing_subscriber::EnvFilter;

use bioledger_contracts::{
    error::{LedgerError, LedgerResult},
    record::{ActionType, NewAuditEntry},
};
use bioledger_core::{traits::KvStore, FileStore, SystemClock};
use bioledger_policy::SigningPolicy;
use bioledger_ref_health::{
    export::export_ledger_csv,
    mock_data::demo_authenticator,
    scenarios::{medication_intake, refund_signoff, tamper_lockdown},
    HealthRuntime, REFERENCE_POLICY,
};
use bioledger_verify::{administrative_reset, LockStatus};

// ── CLI definition ────────────────────────────────────────────────────────────

/// bioledger: tamper-evident audit trail for a consumer health dashboard.
#[derive(Parser)]
#[command(
    name = "demo",
    about = "bioledger health dashboard demo and operator CLI",
    long_about = "Runs bioledger demo scenarios showing hash-chained audit records,\n\
                  electronic signatures with re-authentication, breach detection and\n\
                  the persisted system lock. Operator subcommands work on a ledger\n\
                  directory on disk."
)]
struct Cli {
    /// TOML configuration; the embedded reference policy when omitted.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run all three scenarios in sequence.
    RunAll,
    /// Scenario 1: medication intake logging.
    MedicationIntake,
    /// Scenario 2: refund sign-off with re-authentication.
    RefundSignoff,
    /// Scenario 3: tamper, breach, lock, restart.
    TamperLockdown,
    /// Append one audit record to a ledger directory.
    Append {
        #[arg(long)]
        store: PathBuf,
        #[arg(long)]
        user: String,
        #[arg(long, value_enum)]
        action: ActionArg,
        #[arg(long)]
        reason: Option<String>,
    },
    /// Verify the chain in a ledger directory; a breach locks it.
    Verify {
        #[arg(long)]
        store: PathBuf,
        /// Print one line per record.
        #[arg(long)]
        detailed: bool,
    },
    /// Export a ledger directory as CSV.
    Export {
        #[arg(long)]
        store: PathBuf,
        /// Output file; stdout when omitted.
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Show the persisted lock state of a ledger directory.
    LockStatus {
        #[arg(long)]
        store: PathBuf,
    },
    /// Clear a persisted lock (administrative, out of band).
    ClearLock {
        #[arg(long)]
        store: PathBuf,
        #[arg(long)]
        operator: String,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum ActionArg {
    Create,
    Read,
    Update,
    Delete,
}

impl From<ActionArg> for ActionType {
    fn from(action: ActionArg) -> Self {
        match action {
            ActionArg::Create => ActionType::Create,
            ActionArg::Read => ActionType::Read,
            ActionArg::Update => ActionType::Update,
            ActionArg::Delete => ActionType::Delete,
        }
    }
}

// ── Entry point ───────────────────────────────────────────────────────────────

fn main() {
    // Initialize structured logging.  Set RUST_LOG=debug for verbose output.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_target(false)
        .compact()
        .init();

    let cli = Cli::parse();
    let config = cli.config.as_deref();

    let result = match cli.command {
        Command::RunAll => {
            print_banner();
            run_all()
        }
        Command::MedicationIntake => {
            print_banner();
            medication_intake::run_scenario()
        }
        Command::RefundSignoff => {
            print_banner();
            refund_signoff::run_scenario()
        }
        Command::TamperLockdown => {
            print_banner();
            tamper_lockdown::run_scenario()
        }
        Command::Append {
            store,
            user,
            action,
            reason,
        } => run_append(&store, config, user, action.into(), reason),
        Command::Verify { store, detailed } => run_verify(&store, config, detailed),
        Command::Export { store, out } => run_export(&store, config, out.as_deref()),
        Command::LockStatus { store } => run_lock_status(&store, config),
        Command::ClearLock { store, operator } => run_clear_lock(&store, config, &operator),
    };

    if let Err(e) = result {
        eprintln!("Demo error: {}", e);
        std::process::exit(1);
    }
}

// ── Scenario dispatch ─────────────────────────────────────────────────────────

fn run_all() -> LedgerResult<()> {
    medication_intake::run_scenario()?;
    refund_signoff::run_scenario()?;
    tamper_lockdown::run_scenario()?;
    println!("All scenarios completed successfully.");
    Ok(())
}

// ── Operator commands ─────────────────────────────────────────────────────────

fn load_policy(config: Option<&Path>) -> LedgerResult<SigningPolicy> {
    match config {
        Some(path) => SigningPolicy::from_file(path),
        None => SigningPolicy::from_toml_str(REFERENCE_POLICY),
    }
}

fn open_runtime(store: &Path, config: Option<&Path>) -> LedgerResult<HealthRuntime> {
    let store: Arc<dyn KvStore> = Arc::new(FileStore::open(store)?);
    HealthRuntime::open(
        store,
        Arc::new(SystemClock),
        load_policy(config)?,
        Arc::new(demo_authenticator()),
    )
}

fn run_append(
    store: &Path,
    config: Option<&Path>,
    user: String,
    action: ActionType,
    reason: Option<String>,
) -> LedgerResult<()> {
    let runtime = open_runtime(store, config)?;
    if runtime.start_session()? == LockStatus::Locked {
        return Err(LedgerError::SystemLocked {
            reason: runtime.lock().get_system_lock().reason.unwrap_or_default(),
        });
    }

    let mut entry = NewAuditEntry::new(user, action);
    if let Some(reason) = reason {
        entry = entry.reason(reason);
    }
    let record = runtime.record(entry)?;
    println!("{}  {}  {}", record.id, record.action_type, record.checksum);
    Ok(())
}

fn run_verify(store: &Path, config: Option<&Path>, detailed: bool) -> LedgerResult<()> {
    let runtime = open_runtime(store, config)?;
    let report = runtime.verify_now()?;

    if detailed {
        for r in &report.results {
            println!(
                "#{:<4} {}  checksum:{}  link:{}{}",
                r.index,
                r.id,
                if r.checksum_ok { "ok" } else { "FAIL" },
                if r.prev_ok { "ok" } else { "FAIL" },
                match r.signature_ok {
                    Some(true) => "  signature:ok",
                    Some(false) => "  signature:FAIL",
                    None => "",
                }
            );
        }
    }
    println!("{}", report.message);

    if runtime.lock().is_locked() {
        let state = runtime.lock().get_system_lock();
        println!("System LOCKED: {}", state.reason.unwrap_or_default());
        std::process::exit(2);
    }
    Ok(())
}

fn run_export(store: &Path, config: Option<&Path>, out: Option<&Path>) -> LedgerResult<()> {
    let runtime = open_runtime(store, config)?;
    let csv = export_ledger_csv(runtime.ledger())?;
    match out {
        Some(path) => std::fs::write(path, csv).map_err(|e| LedgerError::Export {
            reason: format!("failed to write '{}': {}", path.display(), e),
        }),
        None => {
            print!("{}", csv);
            Ok(())
        }
    }
}

fn run_lock_status(store: &Path, config: Option<&Path>) -> LedgerResult<()> {
    let runtime = open_runtime(store, config)?;
    let state = runtime.lock().get_system_lock();
    if state.locked {
        println!("LOCKED");
        println!("  reason: {}", state.reason.unwrap_or_default());
        if let Some(ts) = state.ts {
            println!("  since:  {}", ts.to_rfc3339());
        }
    } else {
        println!("unlocked");
    }
    Ok(())
}

fn run_clear_lock(store: &Path, config: Option<&Path>, operator: &str) -> LedgerResult<()> {
    let policy = load_policy(config)?;
    let store = FileStore::open(store)?;
    administrative_reset(&store, &policy.ledger().lock_key, operator)?;
    println!("Lock cleared by {}. Re-verify before resuming use.", operator);
    Ok(())
}

// ── Banner ────────────────────────────────────────────────────────────────────

fn print_banner() {
    println!();
    println!("bioledger: Tamper-evident Audit Trail");
    println!("Health Dashboard Reference Demo");
    println!("=====================================");
    println!();
    println!("Per regulated action:");
    println!("  [1] Record canonicalized (sorted keys, fixed escaping)");
    println!("  [2] checksum = SHA-256(canonical record || prev_checksum)");
    println!("  [3] Appended by compare-and-set; concurrent writers never fork the chain");
    println!("  [4] Sign-off requires a fresh single-use re-authentication token");
    println!("  [5] Any failed verification locks the system until an operator clears it");
    println!();
}
