//! Utility functions for phone, card and amount formatting.

pub mod format;

// Re-export commonly used functions at module level
pub use format::{
    digits_only, format_amount, format_card_number, format_contact_phone, format_phone_input,
    mask_card_number, normalize_transfer_phone, truncate,
};
