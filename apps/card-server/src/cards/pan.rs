// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Virtual card number (PAN) generation and masking.
//!
//! The full number is only ever held in memory during card creation; the
//! store keeps the masked form.

/// Issuer prefix for generated virtual cards.
const ISSUER_PREFIX: &[u8] = &[4, 5, 3, 2, 1, 0];

/// Total length of generated card numbers, check digit included.
const PAN_LENGTH: usize = 16;

/// Generate a fresh 16-digit card number with a valid Luhn check digit.
pub fn generate_pan() -> String {
    let random = uuid::Uuid::new_v4();
    let mut digits: Vec<u8> = ISSUER_PREFIX.to_vec();
    digits.extend(
        random
            .as_bytes()
            .iter()
            .take(PAN_LENGTH - ISSUER_PREFIX.len() - 1)
            .map(|b| b % 10),
    );
    digits.push(luhn_check_digit(&digits));

    digits.iter().map(|d| char::from(b'0' + d)).collect()
}

/// Compute the Luhn check digit for a payload of decimal digits.
fn luhn_check_digit(payload: &[u8]) -> u8 {
    // The check digit will occupy the rightmost slot, so doubling starts at
    // the last payload digit.
    let sum: u32 = payload
        .iter()
        .rev()
        .enumerate()
        .map(|(i, &d)| luhn_term(u32::from(d), i % 2 == 0))
        .sum();
    ((10 - sum % 10) % 10) as u8
}

fn luhn_term(digit: u32, double: bool) -> u32 {
    if !double {
        return digit;
    }
    let doubled = digit * 2;
    if doubled > 9 {
        doubled - 9
    } else {
        doubled
    }
}

/// Luhn checksum over the digits of `number`. Non-digit characters are ignored.
pub fn luhn_valid(number: &str) -> bool {
    let digits: Vec<u32> = number.chars().filter_map(|c| c.to_digit(10)).collect();
    if digits.is_empty() {
        return false;
    }

    let sum: u32 = digits
        .iter()
        .rev()
        .enumerate()
        .map(|(i, &d)| luhn_term(d, i % 2 == 1))
        .sum();
    sum % 10 == 0
}

/// Mask all but the last four digits of a card number.
pub fn mask_pan(number: &str) -> String {
    let digits: String = number.chars().filter(|c| c.is_ascii_digit()).collect();
    if digits.len() <= 4 {
        return digits;
    }
    let visible = &digits[digits.len() - 4..];
    format!("{}{}", "*".repeat(digits.len() - 4), visible)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_numbers_pass_luhn() {
        assert!(luhn_valid("79927398713"));
        assert!(luhn_valid("4111 1111 1111 1111"));
        assert!(!luhn_valid("4111111111111112"));
        assert!(!luhn_valid(""));
        assert!(!luhn_valid("not a number"));
    }

    #[test]
    fn generated_pans_are_valid_and_prefixed() {
        for _ in 0..50 {
            let pan = generate_pan();
            assert_eq!(pan.len(), PAN_LENGTH);
            assert!(pan.starts_with("453210"));
            assert!(pan.chars().all(|c| c.is_ascii_digit()));
            assert!(luhn_valid(&pan), "generated PAN {pan} fails Luhn");
        }
    }

    #[test]
    fn mask_keeps_last_four() {
        assert_eq!(mask_pan("4532101234567890"), "************7890");
        assert_eq!(mask_pan("4532-1012-3456-7890"), "************7890");
        assert_eq!(mask_pan("1234"), "1234");
        assert_eq!(mask_pan("12"), "12");
    }
}
