//! Transaction history entries.

use serde::{Deserialize, Serialize};

use super::lenient_amount;
use crate::utils::format::format_date;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transaction {
    #[serde(default)]
    pub id: Option<i64>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default, deserialize_with = "lenient_amount")]
    pub amount: f64,
    #[serde(default, rename = "type")]
    pub kind: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub date: Option<String>,
}

impl Transaction {
    pub fn title_display(&self) -> &str {
        self.title
            .as_deref()
            .or(self.category.as_deref())
            .unwrap_or("Transaction")
    }

    /// Date portion only; falls back to the legacy `date` field.
    pub fn date_display(&self) -> String {
        match (&self.created_at, &self.date) {
            (Some(created), _) => format_date(created),
            (None, Some(date)) => date.clone(),
            (None, None) => String::new(),
        }
    }

    pub fn category_kind(&self) -> TransactionCategory {
        let text = format!(
            "{} {}",
            self.title.as_deref().unwrap_or_default(),
            self.category.as_deref().unwrap_or_default()
        );
        TransactionCategory::classify(&text)
    }
}

/// Coarse grouping used to pick an icon for a history row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionCategory {
    Taxi,
    Transport,
    Education,
    Eco,
    Shopping,
    Coffee,
    Card,
}

impl TransactionCategory {
    /// Keyword match over title and category, first hit wins.
    pub fn classify(text: &str) -> Self {
        const RULES: &[(&[&str], TransactionCategory)] = &[
            (&["taxi", "яндекс", "uber"], TransactionCategory::Taxi),
            (&["bus", "transport", "proezd"], TransactionCategory::Transport),
            (&["itu", "univer", "tuition"], TransactionCategory::Education),
            (&["eco", "tree"], TransactionCategory::Eco),
            (&["magnum", "market", "shop"], TransactionCategory::Shopping),
            (&["starbucks", "coffee"], TransactionCategory::Coffee),
        ];

        let text = text.to_lowercase();
        RULES
            .iter()
            .find(|(keywords, _)| keywords.iter().any(|k| text.contains(k)))
            .map(|(_, category)| *category)
            .unwrap_or(TransactionCategory::Card)
    }

    pub fn icon(&self) -> &'static str {
        match self {
            TransactionCategory::Taxi => "taxi",
            TransactionCategory::Transport => "bus",
            TransactionCategory::Education => "school",
            TransactionCategory::Eco => "tree",
            TransactionCategory::Shopping => "cart",
            TransactionCategory::Coffee => "coffee",
            TransactionCategory::Card => "credit-card-outline",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_keywords() {
        assert_eq!(TransactionCategory::classify("Uber ride"), TransactionCategory::Taxi);
        assert_eq!(TransactionCategory::classify("Яндекс Go"), TransactionCategory::Taxi);
        assert_eq!(TransactionCategory::classify("City BUS"), TransactionCategory::Transport);
        assert_eq!(TransactionCategory::classify("AITU tuition"), TransactionCategory::Education);
        assert_eq!(TransactionCategory::classify("Magnum"), TransactionCategory::Shopping);
        assert_eq!(TransactionCategory::classify("Starbucks"), TransactionCategory::Coffee);
        assert_eq!(TransactionCategory::classify("P2P transfer"), TransactionCategory::Card);
        assert_eq!(TransactionCategory::Card.icon(), "credit-card-outline");
    }

    #[test]
    fn test_parse_history_entry() {
        let json = r#"{"id": 5, "title": "Magnum Cash&Carry", "amount": "-4500", "type": "payment", "created_at": "2025-03-14T09:26:53Z"}"#;
        let tx: Transaction = serde_json::from_str(json).expect("transaction json");
        assert_eq!(tx.amount, -4500.0);
        assert_eq!(tx.kind.as_deref(), Some("payment"));
        assert_eq!(tx.category_kind(), TransactionCategory::Shopping);
        assert_eq!(tx.date_display(), "2025-03-14");
    }

    #[test]
    fn test_legacy_date_and_missing_title() {
        let tx: Transaction = serde_json::from_str(r#"{"category": "eco", "amount": 100, "date": "12.01"}"#)
            .expect("transaction json");
        assert_eq!(tx.title_display(), "eco");
        assert_eq!(tx.date_display(), "12.01");
        assert_eq!(tx.category_kind(), TransactionCategory::Eco);
    }
}
