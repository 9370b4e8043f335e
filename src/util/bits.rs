//! # Binary Decoding Primitives
//!
//! Stateless helpers used by the block parsers to turn raw relay bytes into
//! booleans and numbers.
//!
//! ## Usage
//!
//! ```rust
//! use fastmeter_rs::util::bits::{bits_from_integer, decode_ieee754_single};
//!
//! // Least-significant bit first
//! assert_eq!(bits_from_integer(8, false, false), vec![false, false, false, true]);
//!
//! // Big-endian IEEE-754 single, rounded to 7 significant digits
//! let value = decode_ieee754_single(&123.456f32.to_be_bytes(), 7).unwrap();
//! assert_eq!(value, 123.456);
//! ```

use crate::error::RelayError;

/// Number of significant digits a single-precision float can carry.
pub const SINGLE_SIGNIFICANT_DIGITS: u32 = 7;

/// Decompose an unsigned integer into its binary digits.
///
/// The sequence is least-significant bit first and only as long as the value
/// needs (zero yields a single `false`). With `pad_to_byte` the sequence is
/// extended with `false` up to the next multiple of eight. With `reverse` the
/// final sequence is reversed, which gives most-significant bit first for
/// padded bytes.
///
/// # Examples
///
/// ```rust
/// use fastmeter_rs::util::bits::bits_from_integer;
///
/// assert_eq!(bits_from_integer(0, false, false), vec![false]);
/// assert_eq!(bits_from_integer(0b1000_0001, true, true)[0], true);
/// assert_eq!(bits_from_integer(8, true, false).len(), 8);
/// ```
pub fn bits_from_integer(value: u64, pad_to_byte: bool, reverse: bool) -> Vec<bool> {
    let width = (u64::BITS - value.leading_zeros()).max(1) as usize;
    let mut bits: Vec<bool> = (0..width).map(|i| (value >> i) & 1 == 1).collect();

    if pad_to_byte {
        bits.resize(width.div_ceil(8) * 8, false);
    }
    if reverse {
        bits.reverse();
    }
    bits
}

/// Decimal order of magnitude: 0 for zero, `floor(log10(|x|)) + 1` otherwise.
pub fn magnitude(x: f64) -> i32 {
    if x == 0.0 {
        0
    } else {
        x.abs().log10().floor() as i32 + 1
    }
}

/// Round `x` to `digits` significant decimal digits (not decimal places).
pub fn round_significant(x: f64, digits: u32) -> f64 {
    if !x.is_finite() {
        return x;
    }
    let places = digits as i32 - magnitude(x);
    if places >= 0 {
        let factor = 10f64.powi(places);
        (x * factor).round() / factor
    } else {
        let factor = 10f64.powi(-places);
        (x / factor).round() * factor
    }
}

/// Decode four big-endian bytes as an IEEE-754 single and round the result to
/// `significant_digits` total decimal digits.
///
/// Fails with [`RelayError::InvalidInput`] unless exactly four bytes are given.
pub fn decode_ieee754_single(bytes: &[u8], significant_digits: u32) -> Result<f64, RelayError> {
    let raw: [u8; 4] = bytes.try_into().map_err(|_| {
        RelayError::InvalidInput(format!(
            "IEEE-754 single needs exactly 4 bytes, got {}",
            bytes.len()
        ))
    })?;
    let value = f32::from_be_bytes(raw) as f64;
    Ok(round_significant(value, significant_digits))
}
