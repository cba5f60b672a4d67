//! Password strength estimate
//!
//! A coarse brute-force entropy figure: length times log2 of the size of the
//! character pool the password draws from.

use std::fmt;

/// Entropy below this is reported as weak.
pub const WEAK_BELOW_BITS: u32 = 40;

/// Entropy below this (and at least [`WEAK_BELOW_BITS`]) is reported as medium.
pub const MEDIUM_BELOW_BITS: u32 = 70;

const LOWER_POOL: u32 = 26;
const UPPER_POOL: u32 = 26;
const DIGIT_POOL: u32 = 10;
const SYMBOL_POOL: u32 = 32;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Strength {
    Weak,
    Medium,
    Strong,
}

impl Strength {
    pub fn from_bits(bits: u32) -> Self {
        if bits < WEAK_BELOW_BITS {
            Strength::Weak
        } else if bits < MEDIUM_BELOW_BITS {
            Strength::Medium
        } else {
            Strength::Strong
        }
    }
}

impl fmt::Display for Strength {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Strength::Weak => "Weak",
            Strength::Medium => "Medium",
            Strength::Strong => "Strong",
        };
        f.write_str(label)
    }
}

/// Size of the character pool implied by which classes appear in `password`.
///
/// Anything outside ASCII letters and digits counts as a symbol.
pub fn charset_size(password: &str) -> u32 {
    let (mut lower, mut upper, mut digit, mut symbol) = (false, false, false, false);
    for c in password.chars() {
        match c {
            'a'..='z' => lower = true,
            'A'..='Z' => upper = true,
            '0'..='9' => digit = true,
            _ => symbol = true,
        }
    }

    [
        (lower, LOWER_POOL),
        (upper, UPPER_POOL),
        (digit, DIGIT_POOL),
        (symbol, SYMBOL_POOL),
    ]
    .iter()
    .filter(|(present, _)| *present)
    .map(|(_, pool)| pool)
    .sum()
}

/// Estimated entropy in bits, rounded to the nearest integer. 0 for an
/// empty password.
pub fn entropy_bits(password: &str) -> u32 {
    let len = password.chars().count();
    if len == 0 {
        return 0;
    }
    let pool = f64::from(charset_size(password).max(1));
    (len as f64 * pool.log2()).round() as u32
}

/// Entropy and label in one go, e.g. for a strength meter.
pub fn assess(password: &str) -> (u32, Strength) {
    let bits = entropy_bits(password);
    (bits, Strength::from_bits(bits))
}
