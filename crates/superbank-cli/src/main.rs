//! superbank - a command-line client for the bank's mobile API.
//!
//! Each subcommand stands in for one screen of the mobile app: login with
//! MFA, cards, history, transfers, payments, the AI assistant, credit
//! products and settings.

mod commands;

use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use superbank_core::auth::{BackendKind, Session, TokenStore};
use superbank_core::models::{CreditProduct, FavoriteKind};
use superbank_core::{ApiClient, Config};
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "superbank")]
#[command(about = "Command-line banking client")]
#[command(version)]
struct Cli {
    /// Where to keep the login token (keyring, file, memory)
    #[arg(long, global = true)]
    storage: Option<BackendKind>,

    /// Override the API base URL
    #[arg(long, global = true)]
    api_url: Option<String>,

    /// Also write logs to daily files in this directory
    #[arg(long, global = true)]
    log_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Sign in with phone, password and a confirmation code
    Login {
        #[arg(long)]
        phone: Option<String>,
    },
    /// Create a new account
    Register {
        #[arg(long)]
        phone: String,
        #[arg(long)]
        name: String,
        #[arg(long)]
        email: Option<String>,
    },
    /// Forget the stored login
    Logout,
    /// Show whether a login is stored
    Status,
    /// Balance overview: cards, recent history and profile
    Home {
        /// Number of history entries to show
        #[arg(long, default_value = "10")]
        limit: usize,
    },
    /// Manage cards
    #[command(subcommand)]
    Card(CardCommand),
    /// Full transaction history
    History {
        #[arg(long)]
        limit: Option<usize>,
    },
    /// Send money by phone, card number, or between own cards
    Transfer {
        #[arg(long)]
        amount: f64,
        #[arg(long, conflicts_with_all = ["card", "to_own"])]
        phone: Option<String>,
        #[arg(long, conflicts_with = "to_own")]
        card: Option<String>,
        /// Id of one of your own cards to move money to
        #[arg(long)]
        to_own: Option<i64>,
        /// Id of the card to debit
        #[arg(long)]
        from: Option<i64>,
    },
    /// Saved transfer recipients
    #[command(subcommand)]
    Favorites(FavoritesCommand),
    /// Pay for a service (mobile, utilities, internet, ...)
    Pay {
        service: String,
        #[arg(long)]
        amount: f64,
        /// Extra fields for the payment form, as key=value
        #[arg(long = "detail", value_parser = parse_key_value)]
        details: Vec<(String, String)>,
    },
    /// Talk to the AI assistant
    Chat {
        message: String,
        /// Carry out a transfer the assistant proposes
        #[arg(long)]
        execute: bool,
    },
    /// Send a recorded voice message to the assistant
    Voice { file: PathBuf },
    /// Loans, deposits and insurance
    #[command(subcommand)]
    Credit(CreditCommand),
    /// Show or edit the profile
    #[command(subcommand)]
    Profile(ProfileCommand),
}

#[derive(Subcommand)]
enum CardCommand {
    List,
    Create {
        #[arg(long, default_value = "KZT")]
        currency: String,
    },
    Block { id: i64 },
    Unblock { id: i64 },
}

#[derive(Subcommand)]
enum FavoritesCommand {
    List,
    Add {
        name: String,
        value: String,
        #[arg(long, default_value = "phone", value_parser = parse_favorite_kind)]
        kind: FavoriteKind,
    },
    Remove { id: i64 },
    /// Transfer to a saved recipient
    Send {
        id: i64,
        #[arg(long)]
        amount: f64,
    },
}

#[derive(Subcommand)]
enum CreditCommand {
    /// List products and rates
    Products,
    /// Estimate the monthly payment
    Quote {
        product: CreditProduct,
        #[arg(long)]
        amount: f64,
        #[arg(long, default_value = "12")]
        months: u32,
    },
    /// Submit an application
    Apply {
        product: CreditProduct,
        #[arg(long)]
        amount: f64,
        #[arg(long, default_value = "12")]
        months: u32,
        #[arg(long)]
        income: Option<f64>,
        #[arg(long)]
        property_value: Option<f64>,
        #[arg(long)]
        vehicle_price: Option<f64>,
        #[arg(long)]
        insurance_type: Option<String>,
    },
}

#[derive(Subcommand)]
enum ProfileCommand {
    Show,
    Update {
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        email: Option<String>,
        #[arg(long)]
        avatar_url: Option<String>,
    },
}

fn parse_key_value(s: &str) -> Result<(String, String), String> {
    let (key, value) = s
        .split_once('=')
        .ok_or_else(|| format!("expected key=value, got {}", s))?;
    Ok((key.trim().to_string(), value.trim().to_string()))
}

fn parse_favorite_kind(s: &str) -> Result<FavoriteKind, String> {
    match s.to_ascii_lowercase().as_str() {
        "phone" => Ok(FavoriteKind::Phone),
        "card" => Ok(FavoriteKind::Card),
        other => Err(format!("unknown recipient kind: {}", other)),
    }
}

/// Initialize the tracing subscriber for logging
fn init_tracing(log_dir: Option<&Path>) -> Option<WorkerGuard> {
    // Use RUST_LOG env var to control log level (e.g., RUST_LOG=debug)
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let stderr = fmt::layer().with_writer(io::stderr);

    match log_dir {
        Some(dir) => {
            let appender = tracing_appender::rolling::daily(dir, "superbank.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            tracing_subscriber::registry()
                .with(stderr)
                .with(fmt::layer().with_ansi(false).with_writer(writer))
                .with(filter)
                .init();
            Some(guard)
        }
        None => {
            tracing_subscriber::registry()
                .with(stderr)
                .with(filter)
                .init();
            None
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (silently ignore if not found)
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();
    let _log_guard = init_tracing(cli.log_dir.as_deref());

    let mut config = Config::load()?;
    let backend = cli.storage.unwrap_or(config.storage);
    let store = TokenStore::from_kind(backend, &config.data_dir()?)
        .with_context(|| format!("Failed to open {} credential storage", backend))?;

    let session = Arc::new(Session::new(store));
    session.restore().await;

    let base_url = cli
        .api_url
        .clone()
        .unwrap_or_else(|| config.api_base_url());
    info!(base_url = %base_url, backend = %backend, "superbank starting");
    let client = ApiClient::new(&base_url, session).context("Failed to build HTTP client")?;

    commands::run(cli.command, &client, &mut config).await
}
