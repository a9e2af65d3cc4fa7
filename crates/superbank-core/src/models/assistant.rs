//! AI chat assistant replies.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::NumberOrString;
use super::TransferRequest;

/// Action name the assistant uses to propose a transfer.
const TRANSFER_ACTION: &str = "transfer";

#[derive(Debug, Clone, Serialize)]
pub(crate) struct ChatRequest<'a> {
    pub message: &'a str,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AssistantReply {
    #[serde(default)]
    pub reply: String,
    #[serde(default)]
    pub action: Option<String>,
    #[serde(default)]
    pub data: Option<Value>,
}

/// A transfer the assistant extracted from the conversation.
#[derive(Debug, Clone, PartialEq)]
pub struct TransferIntent {
    pub amount: f64,
    pub phone: String,
}

impl TransferIntent {
    pub fn to_request(&self) -> Option<TransferRequest> {
        TransferRequest::to_phone(self.amount, &self.phone).ok()
    }
}

impl AssistantReply {
    /// The proposed transfer, if the reply carries one with usable fields.
    pub fn transfer_intent(&self) -> Option<TransferIntent> {
        if self.action.as_deref() != Some(TRANSFER_ACTION) {
            return None;
        }
        let data = self.data.as_ref()?;
        let amount = serde_json::from_value::<NumberOrString>(data.get("amount")?.clone())
            .ok()?
            .to_f64()?;
        let phone = match data.get("phone")? {
            Value::String(s) => s.clone(),
            Value::Number(n) => n.to_string(),
            _ => return None,
        };
        Some(TransferIntent { amount, phone })
    }
}
