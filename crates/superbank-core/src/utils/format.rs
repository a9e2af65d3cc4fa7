/// Country prefix every phone number is displayed with.
const PHONE_PREFIX: &str = "+7";

/// Digits kept after the country prefix.
const NATIONAL_DIGITS: usize = 10;

/// Keep only ASCII digits.
pub fn digits_only(text: &str) -> String {
    text.chars().filter(|c| c.is_ascii_digit()).collect()
}

/// Drop one leading trunk/country digit (`7` or `8`) if present.
fn strip_trunk_prefix(digits: &str) -> &str {
    digits
        .strip_prefix('7')
        .or_else(|| digits.strip_prefix('8'))
        .unwrap_or(digits)
}

/// Apply the `+7 (XXX) XXX-XX-XX` mask to partially typed input.
///
/// Meant to be called on every keystroke: the mask grows as digits arrive,
/// a leading 7 or 8 is treated as the country/trunk prefix, and anything
/// past ten national digits is dropped.
pub fn format_phone_input(text: &str) -> String {
    if text == "+" {
        return String::new();
    }

    let digits = digits_only(text);
    let national = strip_trunk_prefix(&digits);
    let national = &national[..national.len().min(NATIONAL_DIGITS)];
    let len = national.len();

    let mut formatted = PHONE_PREFIX.to_string();
    if len > 0 {
        formatted.push_str(" (");
        formatted.push_str(&national[..len.min(3)]);
    }
    if len >= 4 {
        formatted.push_str(") ");
        formatted.push_str(&national[3..len.min(6)]);
    }
    if len >= 7 {
        formatted.push('-');
        formatted.push_str(&national[6..len.min(8)]);
    }
    if len >= 9 {
        formatted.push('-');
        formatted.push_str(&national[8..len]);
    }
    formatted
}

/// Format a number picked from the address book, which may carry a
/// country code, trunk prefix or extra leading digits.
pub fn format_contact_phone(raw: &str) -> String {
    let digits = digits_only(raw);
    let national = strip_trunk_prefix(&digits);
    let start = national.len().saturating_sub(NATIONAL_DIGITS);
    format_phone_input(&format!("7{}", &national[start..]))
}

/// Normalize a phone number to the 11-digit `8XXXXXXXXXX` form the transfer
/// endpoint expects. Numbers of other lengths are passed through as digits.
pub fn normalize_transfer_phone(raw: &str) -> String {
    let digits = digits_only(raw);
    match digits.len() {
        11 if digits.starts_with('7') => format!("8{}", &digits[1..]),
        10 => format!("8{}", digits),
        _ => digits,
    }
}

/// Group card digits in fours: `4400 1234 5678 9010`.
pub fn format_card_number(text: &str) -> String {
    let digits = digits_only(text);
    digits
        .as_bytes()
        .chunks(4)
        .filter_map(|chunk| std::str::from_utf8(chunk).ok())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Show only the last four digits: `*9010`.
pub fn mask_card_number(text: &str) -> String {
    let digits = digits_only(text);
    let start = digits.len().saturating_sub(4);
    format!("*{}", &digits[start..])
}

/// Render an amount with thousands separated by spaces, e.g. `12 500.50 ₸`.
/// Whole amounts are shown without decimals.
pub fn format_amount(amount: f64, currency: &str) -> String {
    let cents = (amount.abs() * 100.0).round() as u64;
    let sign = if amount < 0.0 && cents > 0 { "-" } else { "" };
    let whole = (cents / 100).to_string();
    let fraction = cents % 100;

    let mut grouped = String::with_capacity(whole.len() + whole.len() / 3);
    for (i, c) in whole.chars().enumerate() {
        if i > 0 && (whole.len() - i) % 3 == 0 {
            grouped.push(' ');
        }
        grouped.push(c);
    }

    let symbol = match currency {
        "KZT" => "₸",
        "USD" => "$",
        "EUR" => "€",
        "RUB" => "₽",
        other => other,
    };

    if fraction == 0 {
        format!("{}{} {}", sign, grouped, symbol)
    } else {
        format!("{}{}.{:02} {}", sign, grouped, fraction, symbol)
    }
}

/// Truncate a string to a maximum length, adding ellipsis if needed
pub fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else if max_len <= 3 {
        s.chars().take(max_len).collect()
    } else {
        let truncated: String = s.chars().take(max_len - 3).collect();
        format!("{}...", truncated)
    }
}

/// Reduce a timestamp to its `YYYY-MM-DD` date
pub fn format_date(date: &str) -> String {
    if let Ok(dt) = chrono::DateTime::parse_from_rfc3339(date) {
        dt.format("%Y-%m-%d").to_string()
    } else if date.len() >= 10 && date.is_char_boundary(10) {
        date[..10].to_string()
    } else {
        date.to_string()
    }
}
