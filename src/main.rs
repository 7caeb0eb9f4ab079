// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! `ledger` - command line front end for the ledger vault.

use std::fs;
use std::io;
use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;
use zeroize::Zeroizing;

use ledger_vault::config::{
    passphrase_from_env, Config, ConfigError, LogFormat, DEFAULT_LOG_FILTER,
};
use ledger_vault::insights::{build_weekly_daily_series, transactions_in_week, week_totals};
use ledger_vault::money::{format_cents, parse_amount_to_cents};
use ledger_vault::storage::StorageError;
use ledger_vault::week::{current_week_start, format_ymd, iso_week_start, parse_ymd};
use ledger_vault::{
    FileSlotStore, NewTransaction, SlotPaths, Transaction, TransactionPatch, TransactionType,
    ValidationError, VaultError, VaultManager, VaultSession, VaultStatus,
};

#[derive(Parser)]
#[command(name = "ledger")]
#[command(version)]
#[command(about = "Local-first income and expense ledger with an optional encrypted vault")]
#[command(after_help = "EXAMPLES:
  ledger add 12.50 --type expense --category Food     Record an expense today
  ledger list --week 2026-03-04                       List one ISO week
  ledger week                                         Daily totals for this week
  ledger vault enable                                 Encrypt the ledger
  ledger vault export -o backup.json                  Back up the vault record")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show vault status and ledger size
    Status,

    /// List transactions, newest first
    List {
        /// Only the ISO week containing this date (YYYY-MM-DD)
        #[arg(long)]
        week: Option<String>,
    },

    /// Record a transaction
    Add {
        /// Amount, e.g. 12.50 or 1,234
        amount: String,
        /// income or expense
        #[arg(long = "type", default_value = "expense")]
        kind: TransactionType,
        #[arg(long)]
        category: String,
        /// Defaults to today
        #[arg(long)]
        date: Option<String>,
        #[arg(long)]
        note: Option<String>,
    },

    /// Change fields of a transaction
    Edit {
        id: String,
        #[arg(long)]
        amount: Option<String>,
        #[arg(long = "type")]
        kind: Option<TransactionType>,
        #[arg(long)]
        category: Option<String>,
        #[arg(long)]
        date: Option<String>,
        #[arg(long)]
        note: Option<String>,
    },

    /// Delete a transaction
    Delete { id: String },

    /// Daily income/expense series for an ISO week
    Week {
        /// Any date inside the week; defaults to the current week
        date: Option<String>,
    },

    /// Manage the encrypted vault
    Vault {
        #[command(subcommand)]
        action: VaultCommands,
    },
}

#[derive(Subcommand)]
enum VaultCommands {
    /// Encrypt the ledger under a new passphrase
    Enable,
    /// Decrypt the ledger back to plaintext storage
    Disable,
    /// Print the stored record verbatim
    Export {
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Replace storage with an exported vault record
    Import { file: PathBuf },
    /// Erase all stored data
    Reset {
        /// Skip the confirmation check
        #[arg(long)]
        yes: bool,
    },
}

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Vault(#[from] VaultError),
    #[error(transparent)]
    Storage(#[from] StorageError),
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("{0}")]
    Input(String),
}

type Session = VaultSession<FileSlotStore>;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

fn init_tracing(format: LogFormat) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr);

    match format {
        LogFormat::Json => builder.json().init(),
        LogFormat::Pretty => builder.init(),
    }
}

async fn run(cli: Cli) -> Result<(), CliError> {
    let config = Config::from_env()?;
    init_tracing(config.log_format);

    let store = FileSlotStore::open(SlotPaths::new(&config.data_dir))?;
    let manager = Arc::new(VaultManager::new(store).with_iterations(config.kdf_iterations));
    let mut session = VaultSession::open(manager).await?;
    tracing::debug!(data_dir = %config.data_dir.display(), status = ?session.status(), "Session opened");

    match cli.command {
        Commands::Status => print_status(&session),
        Commands::List { week } => {
            ensure_unlocked(&mut session).await?;
            list(&session, week.as_deref())?;
        }
        Commands::Add {
            amount,
            kind,
            category,
            date,
            note,
        } => {
            ensure_unlocked(&mut session).await?;
            let input = NewTransaction {
                amount_cents: parse_amount(&amount)?,
                date: date.unwrap_or_else(today),
                kind,
                category,
                note,
            };
            let created = session.add_transaction(input).await?;
            println!("Added {}", created.id);
        }
        Commands::Edit {
            id,
            amount,
            kind,
            category,
            date,
            note,
        } => {
            let patch = TransactionPatch {
                amount_cents: amount.as_deref().map(parse_amount).transpose()?,
                date,
                kind,
                category,
                note,
            };
            if patch.is_empty() {
                return Err(CliError::Input("nothing to change".to_string()));
            }
            ensure_unlocked(&mut session).await?;
            match session.update_transaction(&id, patch).await? {
                Some(updated) => println!("Updated {}", updated.id),
                None => return Err(CliError::Input(format!("no transaction with id {id}"))),
            }
        }
        Commands::Delete { id } => {
            ensure_unlocked(&mut session).await?;
            if !session.remove_transaction(&id).await? {
                return Err(CliError::Input(format!("no transaction with id {id}")));
            }
            println!("Deleted {id}");
        }
        Commands::Week { date } => {
            ensure_unlocked(&mut session).await?;
            week(&session, date.as_deref())?;
        }
        Commands::Vault { action } => vault(&mut session, action).await?,
    }

    Ok(())
}

async fn vault(session: &mut Session, action: VaultCommands) -> Result<(), CliError> {
    match action {
        VaultCommands::Enable => {
            if session.is_vault_enabled() {
                return Err(VaultError::AlreadyEnabled.into());
            }
            let passphrase = new_passphrase()?;
            session.enable(&passphrase).await?;
            println!("Vault enabled");
        }
        VaultCommands::Disable => {
            if !session.is_vault_enabled() {
                return Err(VaultError::NotEnabled.into());
            }
            ensure_unlocked(session).await?;
            session.disable().await?;
            println!("Vault disabled");
        }
        VaultCommands::Export { output } => {
            let Some(raw) = session.export_raw().await? else {
                return Err(CliError::Input("nothing stored yet".to_string()));
            };
            match output {
                Some(path) => {
                    fs::write(&path, raw)?;
                    println!("Exported to {}", path.display());
                }
                None => println!("{raw}"),
            }
        }
        VaultCommands::Import { file } => {
            let raw = fs::read_to_string(&file)?;
            session.import_raw(raw.trim()).await?;
            println!("Imported {}", file.display());
        }
        VaultCommands::Reset { yes } => {
            if !yes {
                return Err(CliError::Input(
                    "reset erases all data; pass --yes to confirm".to_string(),
                ));
            }
            session.reset().await?;
            println!("Storage reset");
        }
    }
    Ok(())
}

// ========== Passphrases ==========

fn read_passphrase(prompt: &str) -> Result<Zeroizing<String>, CliError> {
    if let Some(passphrase) = passphrase_from_env() {
        return Ok(passphrase);
    }
    Ok(Zeroizing::new(rpassword::prompt_password(prompt)?))
}

fn new_passphrase() -> Result<Zeroizing<String>, CliError> {
    if let Some(passphrase) = passphrase_from_env() {
        return Ok(passphrase);
    }
    let first = Zeroizing::new(rpassword::prompt_password("New vault passphrase: ")?);
    if first.is_empty() {
        return Err(CliError::Input("passphrase must not be empty".to_string()));
    }
    let second = Zeroizing::new(rpassword::prompt_password("Repeat passphrase: ")?);
    if *first != *second {
        return Err(CliError::Input("passphrases do not match".to_string()));
    }
    Ok(first)
}

async fn ensure_unlocked(session: &mut Session) -> Result<(), CliError> {
    if !session.is_locked() {
        return Ok(());
    }
    let passphrase = read_passphrase("Vault passphrase: ")?;
    if session.unlock(&passphrase).await? {
        Ok(())
    } else {
        Err(VaultError::InvalidPassphrase.into())
    }
}

// ========== Output ==========

fn parse_amount(raw: &str) -> Result<u64, CliError> {
    match parse_amount_to_cents(raw) {
        Some(cents) if cents > 0 => Ok(cents),
        _ => Err(CliError::Input(format!("invalid amount {raw:?}"))),
    }
}

fn today() -> String {
    format_ymd(chrono::Local::now().date_naive())
}

fn week_start_for(date: Option<&str>) -> Result<String, CliError> {
    match date {
        Some(date) => Ok(format_ymd(iso_week_start(parse_ymd(date)?))),
        None => Ok(current_week_start()),
    }
}

fn print_status(session: &Session) {
    let status = match session.status() {
        VaultStatus::Disabled => "disabled",
        VaultStatus::Locked => "locked",
        VaultStatus::Unlocked => "unlocked",
    };
    println!("Vault: {status}");
    if let Some(state) = session.state() {
        println!("Transactions: {}", state.transactions.len());
    }
}

fn print_transaction(t: &Transaction) {
    let signed = i64::try_from(t.amount_cents).unwrap_or(i64::MAX);
    let amount = match t.kind {
        TransactionType::Income => format_cents(signed),
        TransactionType::Expense => format_cents(-signed),
    };
    println!(
        "{}  {:<7}  {:>14}  {:<16}  {}  {}",
        t.date, t.kind, amount, t.category, t.id, t.note
    );
}

fn list(session: &Session, week: Option<&str>) -> Result<(), CliError> {
    let Some(state) = session.state() else {
        return Err(VaultError::VaultLocked.into());
    };

    match week {
        Some(date) => {
            let start = week_start_for(Some(date))?;
            for t in transactions_in_week(&state.transactions, &start)? {
                print_transaction(t);
            }
        }
        None => state.transactions.iter().for_each(print_transaction),
    }
    Ok(())
}

fn week(session: &Session, date: Option<&str>) -> Result<(), CliError> {
    let Some(state) = session.state() else {
        return Err(VaultError::VaultLocked.into());
    };
    let start = week_start_for(date)?;

    println!("Week of {start}");
    for point in build_weekly_daily_series(&state.transactions, &start)? {
        println!(
            "{}  in {:>14}  out {:>14}  net {:>14}",
            point.day,
            format_cents(i64::try_from(point.income_cents).unwrap_or(i64::MAX)),
            format_cents(i64::try_from(point.expense_cents).unwrap_or(i64::MAX)),
            format_cents(point.net_cents),
        );
    }

    let totals = week_totals(&state.transactions, &start)?;
    println!(
        "Total       in {:>14}  out {:>14}  net {:>14}",
        format_cents(i64::try_from(totals.income_cents).unwrap_or(i64::MAX)),
        format_cents(i64::try_from(totals.expense_cents).unwrap_or(i64::MAX)),
        format_cents(totals.net_cents),
    );
    Ok(())
}
