//! Data models for the banking API.
//!
//! This module contains the request and response types exchanged with the
//! bank server:
//!
//! - `Card`: accounts and their balances
//! - `Transaction`, `TransactionCategory`: history entries
//! - `Profile`, `ProfileUpdate`, `RegisterRequest`: the signed-in user
//! - `TransferRequest`, `Favorite`, `ServicePayment`: moving money
//! - `AssistantReply`: answers from the AI chat assistant
//! - `CreditProduct`, `ProductApplication`: loans, deposits and insurance

pub mod account;
pub mod assistant;
pub mod credit;
pub mod profile;
pub mod transaction;
pub mod transfer;

pub use account::{total_balance, Card};
pub use assistant::{AssistantReply, TransferIntent};
pub use credit::{CreditProduct, ProductApplication};
pub use profile::{LoginResponse, MfaChallenge, Profile, ProfileUpdate, RegisterRequest};
pub use transaction::{Transaction, TransactionCategory};
pub use transfer::{Favorite, FavoriteKind, NewFavorite, ServicePayment, TransferError, TransferRequest};

use serde::{Deserialize, Deserializer};
use serde_json::Value;

/// Amounts arrive either as JSON numbers or as decimal strings.
#[derive(Deserialize)]
#[serde(untagged)]
enum NumberOrString {
    Number(f64),
    Text(String),
}

impl NumberOrString {
    fn to_f64(&self) -> Option<f64> {
        match self {
            NumberOrString::Number(n) => Some(*n),
            NumberOrString::Text(s) => s.trim().parse().ok(),
        }
    }
}

/// Deserialize an amount that may be a number, a numeric string or null.
/// Anything unparseable becomes 0.
pub(crate) fn lenient_amount<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<NumberOrString>::deserialize(deserializer)?;
    Ok(value.and_then(|v| v.to_f64()).unwrap_or(0.0))
}

/// Deserialize an optional text field that some deployments send as a
/// number. Other JSON types read as absent.
pub(crate) fn lenient_text<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<Value>::deserialize(deserializer)? {
        Some(Value::String(s)) => Some(s),
        Some(Value::Number(n)) => Some(n.to_string()),
        _ => None,
    })
}
