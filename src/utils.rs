// Utility helpers shared by the resolver, session and API layers.

use crate::error::{AppError, Result};

const PRIVATE_KEY_HEX_LEN: usize = 64;
const ADDRESS_HEX_LEN: usize = 40;
const MAX_FRACTION_DIGITS: usize = 18;

fn is_hex(value: &str) -> bool {
    value.chars().all(|ch| ch.is_ascii_hexdigit())
}

/// Normalizes a private key to `0x` + 64 hex digits.
pub fn normalize_private_key(key: &str) -> Result<String> {
    let body = key.strip_prefix("0x").unwrap_or(key);
    if body.len() != PRIVATE_KEY_HEX_LEN || !is_hex(body) {
        return Err(AppError::InvalidInput(
            "Invalid private key (expected 64 hex characters)".to_string(),
        ));
    }
    Ok(format!("0x{}", body))
}

/// `0x` followed by exactly 40 hex characters.
pub fn is_valid_address(address: &str) -> bool {
    match address.strip_prefix("0x") {
        Some(body) => body.len() == ADDRESS_HEX_LEN && is_hex(body),
        None => false,
    }
}

/// Accepts plain positive decimals such as `1`, `0.1` or `.5`.
pub fn parse_positive_decimal(value: &str) -> Option<String> {
    if value.is_empty() || value.chars().filter(|ch| *ch == '.').count() > 1 {
        return None;
    }
    if !value.chars().all(|ch| ch.is_ascii_digit() || ch == '.') {
        return None;
    }
    let fraction = value.split_once('.').map(|(_, f)| f).unwrap_or("");
    if fraction.len() > MAX_FRACTION_DIGITS {
        return None;
    }
    if !value.chars().any(|ch| ch.is_ascii_digit() && ch != '0') {
        return None;
    }
    Some(value.to_string())
}

pub fn explorer_tx_url(explorer_base: &str, hash: &str) -> String {
    format!("{}/tx/{}", explorer_base.trim_end_matches('/'), hash)
}

pub fn format_address(address: &str) -> String {
    if address.len() <= 10 {
        return address.to_string();
    }
    format!("{}...{}", &address[..6], &address[address.len() - 4..])
}
