//! Subcommand handlers.
//!
//! Each handler makes the API calls for one screen and prints the result.
//! Errors from the server are turned into short messages here; a 401 means
//! the stored login was cleared and the user has to sign in again.

use std::io::{self, BufRead, Write};

use anyhow::{anyhow, bail, Context, Result};
use serde_json::{Map, Value};
use superbank_core::auth::{LoginError, LoginFlow, WriteOutcome};
use superbank_core::models::{
    total_balance, Card, CreditProduct, ProductApplication, ProfileUpdate, RegisterRequest,
    ServicePayment, Transaction, TransferRequest,
};
use superbank_core::utils::{format_amount, truncate};
use superbank_core::{ApiClient, ApiError, Config};
use tracing::debug;

use crate::{CardCommand, Command, CreditCommand, FavoritesCommand, ProfileCommand};

/// Longest transaction title shown in history listings.
const TITLE_WIDTH: usize = 32;

pub async fn run(command: Command, client: &ApiClient, config: &mut Config) -> Result<()> {
    match command {
        Command::Login { phone } => login(client, config, phone).await,
        Command::Register { phone, name, email } => register(client, phone, name, email).await,
        Command::Logout => logout(client).await,
        Command::Status => {
            status(client);
            Ok(())
        }
        Command::Home { limit } => home(client, limit).await,
        Command::Card(cmd) => card(client, cmd).await,
        Command::History { limit } => history(client, limit).await,
        Command::Transfer {
            amount,
            phone,
            card,
            to_own,
            from,
        } => transfer(client, amount, phone, card, to_own, from).await,
        Command::Favorites(cmd) => favorites(client, cmd).await,
        Command::Pay {
            service,
            amount,
            details,
        } => pay(client, service, amount, details).await,
        Command::Chat { message, execute } => chat(client, &message, execute).await,
        Command::Voice { file } => {
            let audio = tokio::fs::read(&file)
                .await
                .with_context(|| format!("Failed to read {}", file.display()))?;
            let reply = client.send_voice(audio).await.map_err(explain)?;
            println!("{}", reply.reply);
            Ok(())
        }
        Command::Credit(cmd) => credit(client, cmd).await,
        Command::Profile(cmd) => profile(client, cmd).await,
    }
}

/// Turn an API error into the message a user should see.
fn explain(err: ApiError) -> anyhow::Error {
    match err {
        ApiError::Unauthorized { .. } => {
            anyhow!("Your session has ended. Run `superbank login` to sign in again.")
        }
        ApiError::Network(e) => anyhow!("Could not reach the bank: {}", e),
        other => {
            let message = other.user_message("The bank rejected the request");
            debug!(error = %other, "Request failed");
            anyhow!(message)
        }
    }
}

fn explain_login(err: LoginError) -> anyhow::Error {
    match err {
        LoginError::Api(api @ ApiError::Unauthorized { .. }) => {
            anyhow!(api.user_message("Incorrect phone or password"))
        }
        LoginError::Api(api) => explain(api),
        other => anyhow!(other),
    }
}

fn prompt(label: &str) -> Result<String> {
    print!("{}", label);
    io::stdout().flush()?;
    let mut line = String::new();
    io::stdin().lock().read_line(&mut line)?;
    Ok(line.trim().to_string())
}

fn require_login(client: &ApiClient) -> Result<()> {
    if client.session().is_authenticated() {
        Ok(())
    } else {
        bail!("Not signed in. Run `superbank login` first.")
    }
}

// ===== Session =====

async fn login(client: &ApiClient, config: &mut Config, phone: Option<String>) -> Result<()> {
    let phone = match phone.or_else(|| config.last_phone.clone()) {
        Some(phone) => phone,
        None => prompt("Phone: ")?,
    };
    let password = rpassword::prompt_password("Password: ")?;

    let mut flow = LoginFlow::new(client.clone());
    let demo_code = flow
        .submit_credentials(&phone, &password)
        .await
        .map_err(explain_login)?;
    if let Some(code) = demo_code {
        println!("Your code: {}", code);
    }

    let code = prompt("Confirmation code: ")?;
    flow.submit_code(&code).await.map_err(explain_login)?;

    config.last_phone = Some(phone);
    config.save()?;
    println!("Signed in.");
    Ok(())
}

async fn register(
    client: &ApiClient,
    phone: String,
    full_name: String,
    email: Option<String>,
) -> Result<()> {
    let password = rpassword::prompt_password("Choose a password: ")?;
    let confirm = rpassword::prompt_password("Repeat password: ")?;
    if password != confirm {
        bail!("Passwords do not match");
    }

    let request = RegisterRequest {
        phone,
        password,
        full_name,
        email,
    };
    client.register(&request).await.map_err(explain)?;
    println!("Account created. Run `superbank login` to sign in.");
    Ok(())
}

async fn logout(client: &ApiClient) -> Result<()> {
    if let WriteOutcome::Failed(reason) = client.session().end().await {
        bail!("Could not remove the stored login: {}", reason);
    }
    println!("Signed out.");
    Ok(())
}

fn status(client: &ApiClient) {
    let session = client.session();
    let state = if session.is_authenticated() {
        "signed in"
    } else {
        "signed out"
    };
    println!(
        "{} ({} storage, {})",
        state,
        session.store().backend_name(),
        client.base_url()
    );
}

// ===== Home / cards / history =====

async fn home(client: &ApiClient, limit: usize) -> Result<()> {
    require_login(client)?;
    let (cards, history, profile) = client.dashboard().await;

    // Any part may be missing; show what arrived
    match profile {
        Ok(profile) => println!("Hello, {}", profile.display_name()),
        Err(e) if e.is_unauthorized() => return Err(explain(e)),
        Err(e) => debug!(error = %e, "Profile unavailable"),
    }
    match cards {
        Ok(cards) => {
            let total = total_balance(&cards);
            println!("Total balance: {}", format_amount(total, "KZT"));
            for card in &cards {
                print_card(card);
            }
        }
        Err(e) => return Err(explain(e)),
    }
    match history {
        Ok(entries) => {
            println!();
            for tx in entries.iter().take(limit) {
                print_transaction(tx);
            }
        }
        Err(e) => eprintln!("History unavailable: {}", explain(e)),
    }
    Ok(())
}

fn print_card(card: &Card) {
    let blocked = if card.is_blocked { " [blocked]" } else { "" };
    println!(
        "  #{:<4} {}  {}{}",
        card.id,
        card.display_number(),
        format_amount(card.balance, &card.currency),
        blocked
    );
}

fn print_transaction(tx: &Transaction) {
    println!(
        "  {:<10}  {:<width$}  {:>14}  ({})",
        tx.date_display(),
        truncate(tx.title_display(), TITLE_WIDTH),
        format_amount(tx.amount, "KZT"),
        tx.category_kind().icon(),
        width = TITLE_WIDTH
    );
}

async fn card(client: &ApiClient, cmd: CardCommand) -> Result<()> {
    require_login(client)?;
    match cmd {
        CardCommand::List => {
            for card in client.cards().await.map_err(explain)? {
                print_card(&card);
            }
        }
        CardCommand::Create { currency } => {
            client.create_card(&currency).await.map_err(explain)?;
            println!("New {} card opened.", currency);
        }
        CardCommand::Block { id } => {
            client.block_card(id).await.map_err(explain)?;
            println!("Card #{} blocked.", id);
        }
        CardCommand::Unblock { id } => {
            client.unblock_card(id).await.map_err(explain)?;
            println!("Card #{} unblocked.", id);
        }
    }
    Ok(())
}

async fn history(client: &ApiClient, limit: Option<usize>) -> Result<()> {
    require_login(client)?;
    let entries = client.history().await.map_err(explain)?;
    for tx in entries.iter().take(limit.unwrap_or(usize::MAX)) {
        print_transaction(tx);
    }
    Ok(())
}

// ===== Transfers / favorites / payments =====

async fn transfer(
    client: &ApiClient,
    amount: f64,
    phone: Option<String>,
    card: Option<String>,
    to_own: Option<i64>,
    from: Option<i64>,
) -> Result<()> {
    require_login(client)?;

    let request = match (phone, card, to_own) {
        (Some(phone), None, None) => TransferRequest::to_phone(amount, &phone)?,
        (None, Some(card), None) => TransferRequest::to_card(amount, &card)?,
        (None, None, Some(to_id)) => {
            let cards = client.cards().await.map_err(explain)?;
            let from_id = from
                .or_else(|| cards.first().map(|c| c.id))
                .ok_or_else(|| anyhow!("No card to debit"))?;
            let source = cards
                .iter()
                .find(|c| c.id == from_id)
                .ok_or_else(|| anyhow!("Card #{} not found", from_id))?;
            let target = cards
                .iter()
                .find(|c| c.id == to_id)
                .ok_or_else(|| anyhow!("Card #{} not found", to_id))?;
            TransferRequest::between_own(amount, source, target)?
        }
        _ => bail!("Choose exactly one of --phone, --card or --to-own"),
    };
    let request = match from {
        Some(id) => request.from_account(id),
        None => request,
    };

    client.transfer_p2p(&request).await.map_err(explain)?;
    println!("Transfer of {} sent.", format_amount(amount, "KZT"));
    Ok(())
}

async fn favorites(client: &ApiClient, cmd: FavoritesCommand) -> Result<()> {
    require_login(client)?;
    match cmd {
        FavoritesCommand::List => {
            for fav in client.favorites().await.map_err(explain)? {
                println!("  #{:<4} {:<20} {}", fav.id, fav.name, fav.value);
            }
        }
        FavoritesCommand::Add { name, value, kind } => {
            client.add_favorite(&name, &value, kind).await.map_err(explain)?;
            println!("Saved {}.", name);
        }
        FavoritesCommand::Remove { id } => {
            client.delete_favorite(id).await.map_err(explain)?;
            println!("Removed.");
        }
        FavoritesCommand::Send { id, amount } => {
            let favorites = client.favorites().await.map_err(explain)?;
            let fav = favorites
                .iter()
                .find(|f| f.id == id)
                .ok_or_else(|| anyhow!("No saved recipient #{}", id))?;
            let request = fav.transfer(amount)?;
            client.transfer_p2p(&request).await.map_err(explain)?;
            println!("Sent {} to {}.", format_amount(amount, "KZT"), fav.name);
        }
    }
    Ok(())
}

async fn pay(
    client: &ApiClient,
    service: String,
    amount: f64,
    details: Vec<(String, String)>,
) -> Result<()> {
    require_login(client)?;
    if !amount.is_finite() || amount <= 0.0 {
        bail!("Enter an amount");
    }

    let details = if details.is_empty() {
        Value::Null
    } else {
        Value::Object(
            details
                .into_iter()
                .map(|(k, v)| (k, Value::String(v)))
                .collect::<Map<_, _>>(),
        )
    };
    let payment = ServicePayment {
        service_name: service,
        amount,
        details,
    };
    client.pay_service(&payment).await.map_err(explain)?;
    println!("Payment completed.");
    Ok(())
}

// ===== Assistant =====

async fn chat(client: &ApiClient, message: &str, execute: bool) -> Result<()> {
    require_login(client)?;
    let reply = client.chat(message).await.map_err(explain)?;
    println!("{}", reply.reply);

    let Some(intent) = reply.transfer_intent() else {
        return Ok(());
    };
    let Some(request) = intent.to_request() else {
        println!("The proposed transfer is incomplete and was not sent.");
        return Ok(());
    };
    if !execute {
        println!(
            "Proposed transfer: {} to {}. Re-run with --execute to send it.",
            format_amount(intent.amount, "KZT"),
            intent.phone
        );
        return Ok(());
    }

    match client.transfer_p2p(&request).await {
        Ok(_) => println!("Transfer of {} completed.", format_amount(intent.amount, "KZT")),
        Err(e) => println!("Transfer failed: {}", explain(e)),
    }
    Ok(())
}

// ===== Credit products =====

async fn credit(client: &ApiClient, cmd: CreditCommand) -> Result<()> {
    match cmd {
        CreditCommand::Products => {
            for product in CreditProduct::ALL {
                let rate = product
                    .annual_rate()
                    .map(|r| format!("{:.1}%", r * 100.0))
                    .unwrap_or_else(|| "-".to_string());
                println!("  {:<12} {:<16} {}", product.id(), product.title(), rate);
            }
            Ok(())
        }
        CreditCommand::Quote {
            product,
            amount,
            months,
        } => {
            let monthly = product
                .monthly_payment(amount, months)
                .ok_or_else(|| anyhow!("No estimate available for {}", product.title()))?;
            println!("{} per month", format_amount(monthly, "KZT"));
            Ok(())
        }
        CreditCommand::Apply {
            product,
            amount,
            months,
            income,
            property_value,
            vehicle_price,
            insurance_type,
        } => {
            require_login(client)?;
            let application = ProductApplication {
                term_months: months,
                income,
                property_value,
                vehicle_price,
                insurance_type,
                ..ProductApplication::new(product, amount)
            };
            client.apply_product(&application).await.map_err(explain)?;
            println!("Application received and is being processed.");
            Ok(())
        }
    }
}

// ===== Profile =====

async fn profile(client: &ApiClient, cmd: ProfileCommand) -> Result<()> {
    require_login(client)?;
    match cmd {
        ProfileCommand::Show => {
            let me = client.me().await.map_err(explain)?;
            println!("{}", me.display_name());
            if let Some(phone) = me.phone {
                println!("  phone: {}", phone);
            }
            if let Some(email) = me.email {
                println!("  email: {}", email);
            }
        }
        ProfileCommand::Update {
            name,
            email,
            avatar_url,
        } => {
            let update = ProfileUpdate {
                full_name: name,
                email,
                avatar_url,
            };
            if update.is_empty() {
                bail!("Nothing to update");
            }
            client.update_profile(&update).await.map_err(explain)?;
            println!("Profile updated.");
        }
    }
    Ok(())
}
