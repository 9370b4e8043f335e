//! # Utility Modules
//!
//! Common helpers used throughout the crate: binary decoding primitives, hex
//! encoding/decoding, and wire logging.

pub mod bits;
pub mod hex;
pub mod logging;

pub use bits::{bits_from_integer, decode_ieee754_single, round_significant};
pub use hex::{decode_hex, encode_hex, encode_hex_upper, format_hex_compact, HexError};
pub use logging::{log_frame_hex, log_frame_text};
