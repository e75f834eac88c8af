//! Contact field hygiene: phone normalization and name sanitization for intake and
//! message personalization.

/// Generic words that show up in the name column of purchased lead lists.
const BANNED_NAME_WORDS: &[&str] = &[
    "lead", "bronze", "silver", "gold", "platinum", "ethos", "goat", "fresh", "aged", "new",
    "facebook", "insurance", "prospect", "unknown", "meta", "client", "customer", "applicant",
    "iul", "term", "whole", "life", "mortgage", "final", "expense", "annuity", "inquiry",
];

const TIER_WORDS: &[&str] =
    &["bronze", "silver", "gold", "platinum", "fresh", "aged", "new", "goat", "ethos"];

pub const UNKNOWN_NAME: &str = "Unknown";

/// Trims and strips control characters. Empty results become `None`.
pub fn clean_text(value: &str) -> Option<String> {
    let cleaned: String = value
        .chars()
        .filter(|ch| !ch.is_control() || matches!(*ch, '\n' | '\r' | '\t'))
        .collect();
    let trimmed = cleaned.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

/// Normalizes a North American phone number to E.164.
///
/// Ten digits get a `+1` prefix, eleven digits starting with `1` get a `+`, and input
/// that already carries a `+` with at least eleven digits keeps its country code.
pub fn normalize_phone(value: &str) -> Option<String> {
    let cleaned = clean_text(value)?;
    let digits: String = cleaned.chars().filter(char::is_ascii_digit).collect();

    if digits.len() == 10 {
        return Some(format!("+1{digits}"));
    }
    if digits.len() == 11 && digits.starts_with('1') {
        return Some(format!("+{digits}"));
    }
    if cleaned.starts_with('+') && digits.len() >= 11 {
        return Some(format!("+{digits}"));
    }
    None
}

pub fn is_e164(phone: &str) -> bool {
    phone.starts_with('+')
}

pub fn normalize_email(value: &str) -> Option<String> {
    let cleaned = clean_text(value)?.to_ascii_lowercase();
    let (local, domain) = cleaned.split_once('@')?;
    let valid = !local.is_empty()
        && domain.contains('.')
        && !domain.starts_with('.')
        && !domain.ends_with('.')
        && !cleaned.chars().any(char::is_whitespace);
    valid.then_some(cleaned)
}

/// Returns a display name, or [`UNKNOWN_NAME`] when the value looks like a lead-source
/// label or contains digits.
pub fn safe_full_name(value: &str) -> String {
    let Some(cleaned) = clean_text(value) else {
        return UNKNOWN_NAME.to_string();
    };
    let collapsed = cleaned.split_whitespace().collect::<Vec<_>>().join(" ");
    let lower = collapsed.to_lowercase();

    if BANNED_NAME_WORDS.contains(&lower.as_str()) {
        return UNKNOWN_NAME.to_string();
    }

    let all_labels = lower
        .split(|ch: char| ch.is_whitespace() || ch == ',')
        .filter(|part| !part.is_empty())
        .all(|part| TIER_WORDS.contains(&part) || BANNED_NAME_WORDS.contains(&part));
    if all_labels {
        return UNKNOWN_NAME.to_string();
    }

    if collapsed.chars().filter(char::is_ascii_digit).count() >= 2 {
        return UNKNOWN_NAME.to_string();
    }

    collapsed.chars().take(200).collect()
}

/// First name suitable for a greeting, or an empty string when nothing safe remains.
pub fn safe_first_name(full_name: &str) -> String {
    let Some(first) = full_name.split_whitespace().next() else {
        return String::new();
    };
    if first.chars().any(|ch| ch.is_ascii_digit()) {
        return String::new();
    }

    let token: String = first
        .chars()
        .filter(|ch| ch.is_alphabetic() || *ch == '-' || *ch == '\'')
        .flat_map(char::to_lowercase)
        .collect();

    if token.chars().count() < 2 || BANNED_NAME_WORDS.contains(&token.as_str()) {
        return String::new();
    }

    let mut chars = token.chars();
    match chars.next() {
        Some(head) => head.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
