//! Lot Number Checksum
//!
//! Check-digit scheme used to reject mistyped or malformed lot numbers without
//! a network round trip. The payload is hashed with SHA-256, the digest bytes
//! are written out as decimal numbers and concatenated, and the resulting
//! digit string is folded with a Luhn-style doubling pass.
//!
//! The digest algorithm and digit extraction order are part of the wire
//! contract: codes printed on labels must validate identically everywhere.
//!
//! Doubled digits above 9 are reduced by 9 (standard Luhn). Older label
//! generators reduced only above 10, so a doubled 5 stayed 10; that rule is
//! intentionally not reproduced here.

use sha2::{Digest, Sha256};

/// Code accepted unconditionally as a manual override.
pub const OVERRIDE_CODE: &str = "0000";

/// Compute the single check digit for `payload`.
pub fn compute_check_digit(payload: &str) -> char {
    let digest = Sha256::digest(payload.as_bytes());

    let mut sum: u32 = 0;
    let mut position = 0usize;
    for byte in digest.iter() {
        for digit in byte.to_string().bytes() {
            let mut value = u32::from(digit - b'0');
            if position % 2 == 0 {
                value *= 2;
                if value > 9 {
                    value -= 9;
                }
            }
            sum += value;
            position += 1;
        }
    }

    let check = (sum * 9) % 10;
    char::from_digit(check, 10).unwrap_or('0')
}

/// Return `payload` with its check digit appended.
pub fn append_check_digit(payload: &str) -> String {
    let mut code = String::with_capacity(payload.len() + 1);
    code.push_str(payload);
    code.push(compute_check_digit(payload));
    code
}

/// Validate a code whose last character is its check digit.
pub fn validate(code: &str) -> bool {
    if code == OVERRIDE_CODE {
        return true;
    }

    let Some((split, last)) = code.char_indices().last() else {
        return false;
    };

    compute_check_digit(&code[..split]) == last
}
