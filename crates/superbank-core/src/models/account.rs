//! Card accounts.

use serde::{Deserialize, Serialize};

use super::lenient_amount;
use crate::utils::format::{format_card_number, mask_card_number};

/// Currency new cards are opened in unless another is requested.
pub const DEFAULT_CURRENCY: &str = "KZT";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Card {
    pub id: i64,
    #[serde(default)]
    pub card_number: Option<String>,
    #[serde(default, deserialize_with = "lenient_amount")]
    pub balance: f64,
    #[serde(default = "default_currency")]
    pub currency: String,
    #[serde(default, alias = "blocked")]
    pub is_blocked: bool,
}

fn default_currency() -> String {
    DEFAULT_CURRENCY.to_string()
}

impl Card {
    /// Last four digits, e.g. `*4821`, or a placeholder when unknown.
    pub fn masked(&self) -> String {
        match self.card_number {
            Some(ref number) => mask_card_number(number),
            None => "****".to_string(),
        }
    }

    /// Full number in groups of four.
    pub fn display_number(&self) -> String {
        match self.card_number {
            Some(ref number) => format_card_number(number),
            None => "****".to_string(),
        }
    }
}

/// Sum of all card balances, as shown on the home screen.
pub fn total_balance(cards: &[Card]) -> f64 {
    cards.iter().map(|c| c.balance).sum()
}
