//! Peer-to-peer transfers, saved recipients and service payments.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use super::Card;
use crate::utils::format::{digits_only, normalize_transfer_phone};

#[derive(Error, Debug, PartialEq)]
pub enum TransferError {
    #[error("Amount must be greater than zero")]
    InvalidAmount,

    #[error("Choose two different cards")]
    SameCard,

    #[error("Destination card has no number")]
    MissingCardNumber,

    #[error("Recipient is empty")]
    EmptyRecipient,
}

/// Body of `POST /transfers/p2p`. Exactly one of `to_phone` / `to_card` is set.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TransferRequest {
    pub amount: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub to_phone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub to_card: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub from_account_id: Option<i64>,
}

impl TransferRequest {
    fn check_amount(amount: f64) -> Result<(), TransferError> {
        if amount.is_finite() && amount > 0.0 {
            Ok(())
        } else {
            Err(TransferError::InvalidAmount)
        }
    }

    /// Transfer to a phone number in any common notation.
    pub fn to_phone(amount: f64, phone: &str) -> Result<Self, TransferError> {
        Self::check_amount(amount)?;
        let phone = normalize_transfer_phone(phone);
        if phone.is_empty() {
            return Err(TransferError::EmptyRecipient);
        }
        Ok(Self {
            amount,
            to_phone: Some(phone),
            to_card: None,
            from_account_id: None,
        })
    }

    /// Transfer to a card number; separators are stripped.
    pub fn to_card(amount: f64, card_number: &str) -> Result<Self, TransferError> {
        Self::check_amount(amount)?;
        let card = digits_only(card_number);
        if card.is_empty() {
            return Err(TransferError::EmptyRecipient);
        }
        Ok(Self {
            amount,
            to_phone: None,
            to_card: Some(card),
            from_account_id: None,
        })
    }

    /// Move money between two of the user's own cards.
    pub fn between_own(amount: f64, from: &Card, to: &Card) -> Result<Self, TransferError> {
        Self::check_amount(amount)?;
        if from.id == to.id {
            return Err(TransferError::SameCard);
        }
        let number = to
            .card_number
            .as_deref()
            .ok_or(TransferError::MissingCardNumber)?;
        Ok(Self {
            amount,
            to_phone: None,
            to_card: Some(digits_only(number)),
            from_account_id: Some(from.id),
        })
    }

    /// Debit a specific card instead of the server's default.
    pub fn from_account(mut self, account_id: i64) -> Self {
        self.from_account_id = Some(account_id);
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FavoriteKind {
    Phone,
    Card,
}

/// A saved transfer recipient.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Favorite {
    pub id: i64,
    pub name: String,
    pub value: String,
    #[serde(rename = "type", default = "default_favorite_kind")]
    pub kind: FavoriteKind,
}

fn default_favorite_kind() -> FavoriteKind {
    FavoriteKind::Phone
}

impl Favorite {
    /// Ready-made transfer request for this recipient.
    pub fn transfer(&self, amount: f64) -> Result<TransferRequest, TransferError> {
        match self.kind {
            FavoriteKind::Phone => TransferRequest::to_phone(amount, &self.value),
            FavoriteKind::Card => TransferRequest::to_card(amount, &self.value),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct NewFavorite {
    pub name: String,
    pub value: String,
    #[serde(rename = "type")]
    pub kind: FavoriteKind,
}

/// Body of `POST /services/pay`.
#[derive(Debug, Clone, Serialize)]
pub struct ServicePayment {
    pub service_name: String,
    pub amount: f64,
    #[serde(skip_serializing_if = "Value::is_null")]
    pub details: Value,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn card(id: i64, number: Option<&str>) -> Card {
        Card {
            id,
            card_number: number.map(str::to_string),
            balance: 0.0,
            currency: "KZT".into(),
            is_blocked: false,
        }
    }

    #[test]
    fn test_phone_transfer_normalizes_number() {
        let req = TransferRequest::to_phone(5000.0, "+7 (707) 123-45-67").expect("valid");
        assert_eq!(req.to_phone.as_deref(), Some("87071234567"));
        assert_eq!(req.to_card, None);

        let body = serde_json::to_value(&req.from_account(3)).expect("serialize");
        assert_eq!(
            body,
            serde_json::json!({"amount": 5000.0, "to_phone": "87071234567", "from_account_id": 3})
        );
    }

    #[test]
    fn test_card_transfer_strips_separators() {
        let req = TransferRequest::to_card(10.0, "4400 1234 5678 9010").expect("valid");
        assert_eq!(req.to_card.as_deref(), Some("4400123456789010"));
    }

    #[test]
    fn test_invalid_transfers_rejected() {
        assert_eq!(TransferRequest::to_phone(0.0, "87071234567"), Err(TransferError::InvalidAmount));
        assert_eq!(TransferRequest::to_card(-5.0, "4400"), Err(TransferError::InvalidAmount));
        assert_eq!(TransferRequest::to_card(5.0, "abc"), Err(TransferError::EmptyRecipient));

        let a = card(1, Some("4400111122223333"));
        assert_eq!(TransferRequest::between_own(5.0, &a, &a), Err(TransferError::SameCard));
        assert_eq!(
            TransferRequest::between_own(5.0, &a, &card(2, None)),
            Err(TransferError::MissingCardNumber)
        );
    }

    #[test]
    fn test_own_transfer_sets_source() {
        let from = card(1, Some("4400111122223333"));
        let to = card(2, Some("4400444455556666"));
        let req = TransferRequest::between_own(100.0, &from, &to).expect("valid");
        assert_eq!(req.from_account_id, Some(1));
        assert_eq!(req.to_card.as_deref(), Some("4400444455556666"));
    }

    #[test]
    fn test_favorite_round_trip_fields() {
        let fav: Favorite =
            serde_json::from_str(r#"{"id": 9, "name": "Mom", "value": "+77011234567", "type": "phone"}"#)
                .expect("favorite json");
        assert_eq!(fav.kind, FavoriteKind::Phone);
        let req = fav.transfer(1500.0).expect("valid");
        assert_eq!(req.to_phone.as_deref(), Some("87011234567"));
    }
}
