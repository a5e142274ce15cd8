//! Wallet address validation (EIP-55)
//!
//! Accepts a `0x`-prefixed 20-byte hex address. All-lowercase and all-uppercase
//! bodies carry no checksum and are accepted as-is; mixed case must match the
//! EIP-55 checksum exactly.

use sha3::{Digest, Keccak256};

const ADDRESS_HEX_LEN: usize = 40;

/// Check that `input` is a well-formed chain address. Never panics.
pub fn is_valid_address(input: &str) -> bool {
    let Some(body) = input.strip_prefix("0x") else {
        return false;
    };
    if body.len() != ADDRESS_HEX_LEN || !body.bytes().all(|b| b.is_ascii_hexdigit()) {
        return false;
    }

    let has_lower = body.bytes().any(|b| b.is_ascii_lowercase());
    let has_upper = body.bytes().any(|b| b.is_ascii_uppercase());
    if !(has_lower && has_upper) {
        return true;
    }

    checksum_body(body) == body
}

/// Render an address with EIP-55 checksum casing
///
/// Returns `None` if the input is not a 20-byte hex address.
pub fn to_checksum_address(input: &str) -> Option<String> {
    let body = input.strip_prefix("0x").unwrap_or(input);
    if body.len() != ADDRESS_HEX_LEN || !body.bytes().all(|b| b.is_ascii_hexdigit()) {
        return None;
    }
    Some(format!("0x{}", checksum_body(body)))
}

fn checksum_body(body: &str) -> String {
    let lower = body.to_ascii_lowercase();
    let hash = Keccak256::digest(lower.as_bytes());

    lower
        .chars()
        .enumerate()
        .map(|(i, c)| {
            if c.is_ascii_digit() {
                return c;
            }
            let byte = hash[i / 2];
            let nibble = if i % 2 == 0 { byte >> 4 } else { byte & 0x0f };
            if nibble >= 8 {
                c.to_ascii_uppercase()
            } else {
                c
            }
        })
        .collect()
}
