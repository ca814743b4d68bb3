use lazy_static::lazy_static;
use regex::Regex;
use sha2::{Digest, Sha256};

lazy_static! {
    static ref NON_DIGIT: Regex = Regex::new(r"\D").expect("static regex is valid");
}

/// Normalize a phone number to E.164.
///
/// - 10 digits: US number without country code, `+1` is prepended
/// - 11 digits starting with `1`: US number with country code
/// - more than 11 digits: international number
///
/// Anything else is rejected. Callers normalize before touching the OTP
/// engine; the engine treats its subject as opaque.
pub fn normalize_phone(phone: &str) -> Option<String> {
    let digits = NON_DIGIT.replace_all(phone, "");

    match digits.len() {
        10 => Some(format!("+1{}", digits)),
        11 if digits.starts_with('1') => Some(format!("+{}", digits)),
        n if n > 11 => Some(format!("+{}", digits)),
        _ => None,
    }
}

/// Hash a normalized phone number for lookups.
///
/// Users are found by this hash; the salt keeps the table from being a
/// plain phone-number index.
pub fn hash_phone_number(phone_number: &str, salt: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(phone_number.as_bytes());
    hasher.update(salt.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Mask a phone number for logs: first four and last four characters kept,
/// e.g. `+15551234567` -> `+155****4567`. Shorter input is fully masked.
pub fn mask_phone(phone: &str) -> String {
    let chars: Vec<char> = phone.chars().collect();
    if chars.len() < 8 {
        return "*".repeat(chars.len());
    }
    let start: String = chars[..4].iter().collect();
    let end: String = chars[chars.len() - 4..].iter().collect();
    format!("{}{}{}", start, "*".repeat(chars.len() - 8), end)
}
