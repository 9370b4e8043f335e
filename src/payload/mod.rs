//! The payload module contains the parsers that turn raw relay responses
//! into typed blocks.
//!
//! Binary blocks share one framing:
//!
//! ```text
//! | command (2) | length (1) | payload ... | reserved (1) | checksum (1) |
//! ```
//!
//! `length` counts every byte of the block including the checksum, and the
//! checksum is the wrapping 8-bit sum of all preceding bytes. The relay
//! echoes requests and prints prompts around its blocks, so each parser first
//! locates its block inside the raw response with [`locate_block`].

pub mod config;
pub mod data;
pub mod definition;
pub mod dna;
pub mod id;

pub use config::{AnalogChannel, CalculationBlock, ChannelType, FastMeterConfig};
pub use data::FastMeterReading;
pub use definition::{FastMeterCommandInfo, ProtocolInfo, ProtocolKind, RelayDefinition, StatusFlagInfo};
pub use dna::{DnaDefinition, DnaRow};
pub use id::RelayIdentity;

use crate::error::ParseError;
use crate::relay::commands::{find_subsequence, CommandCode};

/// Command code and length byte.
pub const BLOCK_HEADER_LEN: usize = 3;
/// Reserved byte and checksum.
pub const BLOCK_TRAILER_LEN: usize = 2;

/// Wrapping 8-bit sum of `data`.
pub fn checksum8(data: &[u8]) -> u8 {
    data.iter().fold(0u8, |sum, b| sum.wrapping_add(*b))
}

/// Frame `payload` as a block: header, payload, reserved byte and checksum.
pub fn encode_block(code: CommandCode, payload: &[u8]) -> Vec<u8> {
    let mut block = Vec::with_capacity(payload.len() + BLOCK_HEADER_LEN + BLOCK_TRAILER_LEN);
    block.extend_from_slice(code.as_bytes());
    block.push((payload.len() + BLOCK_HEADER_LEN + BLOCK_TRAILER_LEN) as u8);
    block.extend_from_slice(payload);
    block.push(0x00);
    block.push(checksum8(&block));
    block
}

/// Offsets of every occurrence of `code` in `raw`.
fn occurrences<'a>(raw: &'a [u8], code: CommandCode) -> impl Iterator<Item = usize> + 'a {
    let mut start = 0;
    std::iter::from_fn(move || {
        let pos = start + find_subsequence(&raw[start..], code.as_bytes())?;
        start = pos + 1;
        Some(pos)
    })
}

/// Validate the framing of a block that starts at `frame[0]` and return
/// exactly its bytes.
pub fn validate_frame<'a>(
    frame: &'a [u8],
    code: CommandCode,
    block: &'static str,
) -> Result<&'a [u8], ParseError> {
    if frame.len() < BLOCK_HEADER_LEN {
        return Err(ParseError::Truncated {
            block,
            needed: BLOCK_HEADER_LEN,
            available: frame.len(),
        });
    }
    if frame[..2] != code.0 {
        return Err(ParseError::UnexpectedCommand {
            block,
            expected: code.to_string(),
            found: CommandCode([frame[0], frame[1]]).to_string(),
        });
    }

    let declared = frame[2] as usize;
    if declared < BLOCK_HEADER_LEN + BLOCK_TRAILER_LEN {
        return Err(ParseError::Malformed {
            block,
            detail: format!("declared length {declared} is shorter than the framing"),
        });
    }
    if frame.len() < declared {
        return Err(ParseError::Truncated {
            block,
            needed: declared,
            available: frame.len(),
        });
    }

    let expected = frame[declared - 1];
    let calculated = checksum8(&frame[..declared - 1]);
    if expected != calculated {
        return Err(ParseError::BadChecksum {
            block,
            expected,
            calculated,
        });
    }
    Ok(&frame[..declared])
}

/// Whether the occurrence of a command code at `rest[0]` is the relay's
/// echo of the request line rather than a block.
fn is_request_echo(rest: &[u8]) -> bool {
    rest.get(2..4) == Some(b"\r\n".as_slice())
}

/// Find the block carrying `code` inside a raw response.
///
/// Every occurrence of the code is tried in order, since the request echo
/// also starts with it. The first occurrence that frames correctly wins; if
/// none does, the error of the first occurrence that is not a request echo
/// is returned.
pub fn locate_block<'a>(
    raw: &'a [u8],
    code: CommandCode,
    block: &'static str,
) -> Result<&'a [u8], ParseError> {
    let mut echo_error = None;
    let mut block_error = None;
    for pos in occurrences(raw, code) {
        let rest = &raw[pos..];
        match validate_frame(rest, code, block) {
            Ok(frame) => return Ok(frame),
            Err(e) if is_request_echo(rest) => {
                echo_error.get_or_insert(e);
            }
            Err(e) => {
                block_error.get_or_insert(e);
            }
        }
    }
    Err(block_error
        .or(echo_error)
        .unwrap_or(ParseError::BlockNotFound { block }))
}

/// Whether `raw` holds the whole block answering `code`.
///
/// An occurrence counts once it frames correctly, or, when it is not the
/// request echo, once as many bytes as its length byte declares have arrived
/// (a corrupt block is complete too, and fails later in the parser). The
/// echo's CR would otherwise read as a length of 13.
pub fn block_available(raw: &[u8], code: CommandCode) -> bool {
    occurrences(raw, code).any(|pos| {
        let rest = &raw[pos..];
        if validate_frame(rest, code, "block").is_ok() {
            return true;
        }
        !is_request_echo(rest) && rest.len() >= BLOCK_HEADER_LEN && rest.len() >= rest[2] as usize
    })
}

/// Map a nom failure inside a located block to a [`ParseError`].
pub(crate) fn nom_error(
    block: &'static str,
) -> impl Fn(nom::Err<nom::error::Error<&[u8]>>) -> ParseError {
    move |err: nom::Err<nom::error::Error<&[u8]>>| ParseError::Malformed {
        block,
        detail: match err {
            nom::Err::Incomplete(_) => "incomplete input".to_string(),
            nom::Err::Error(e) | nom::Err::Failure(e) => {
                format!("{:?} with {} bytes left", e.code, e.input.len())
            }
        },
    }
}

/// Decoders for each relay response kind.
///
/// Sessions are generic over this trait so alternative dialects or test
/// doubles can replace [`SelBlockParser`].
pub trait BlockParser: Send + Sync {
    fn parse_relay_definition(
        &self,
        raw: &[u8],
        code: CommandCode,
    ) -> Result<RelayDefinition, ParseError>;

    fn parse_fast_meter_config(
        &self,
        raw: &[u8],
        code: CommandCode,
    ) -> Result<FastMeterConfig, ParseError>;

    fn parse_dna(&self, raw: &[u8]) -> Result<DnaDefinition, ParseError>;

    fn parse_identity(&self, raw: &[u8]) -> Result<RelayIdentity, ParseError>;

    fn parse_fast_meter_data(
        &self,
        raw: &[u8],
        code: CommandCode,
        config: &FastMeterConfig,
        dna: &DnaDefinition,
    ) -> Result<FastMeterReading, ParseError>;
}

/// Parsers for SEL relay blocks.
#[derive(Debug, Clone, Copy, Default)]
pub struct SelBlockParser;

impl BlockParser for SelBlockParser {
    fn parse_relay_definition(
        &self,
        raw: &[u8],
        code: CommandCode,
    ) -> Result<RelayDefinition, ParseError> {
        definition::parse_relay_definition(raw, code)
    }

    fn parse_fast_meter_config(
        &self,
        raw: &[u8],
        code: CommandCode,
    ) -> Result<FastMeterConfig, ParseError> {
        config::parse_fast_meter_config(raw, code)
    }

    fn parse_dna(&self, raw: &[u8]) -> Result<DnaDefinition, ParseError> {
        dna::parse_dna(raw)
    }

    fn parse_identity(&self, raw: &[u8]) -> Result<RelayIdentity, ParseError> {
        id::parse_identity(raw)
    }

    fn parse_fast_meter_data(
        &self,
        raw: &[u8],
        code: CommandCode,
        config: &FastMeterConfig,
        dna: &DnaDefinition,
    ) -> Result<FastMeterReading, ParseError> {
        data::parse_fast_meter_data(raw, code, config, dna)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CODE: CommandCode = CommandCode::new([0xA5, 0xC0]);

    fn frame(payload: &[u8]) -> Vec<u8> {
        encode_block(CODE, payload)
    }

    #[test]
    fn test_checksum_wraps() {
        assert_eq!(checksum8(&[0xFF, 0x02]), 0x01);
        assert_eq!(checksum8(&[]), 0x00);
    }

    #[test]
    fn test_locate_skips_echo() {
        let block = frame(&[1, 2, 3]);
        let mut raw = b"\xA5\xC0\r\n".to_vec();
        raw.extend_from_slice(&block);
        raw.extend_from_slice(b"\r\n=>");

        assert_eq!(locate_block(&raw, CODE, "test").unwrap(), block.as_slice());
        assert!(block_available(&raw, CODE));
    }

    #[test]
    fn test_locate_reports_bad_checksum() {
        let mut block = frame(&[1, 2, 3]);
        let last = block.len() - 1;
        block[last] ^= 0x55;
        assert!(matches!(
            locate_block(&block, CODE, "test"),
            Err(ParseError::BadChecksum { .. })
        ));
    }

    #[test]
    fn test_locate_missing_and_truncated() {
        assert_eq!(
            locate_block(b"\r\n=>", CODE, "test"),
            Err(ParseError::BlockNotFound { block: "test" })
        );

        let block = frame(&[1, 2, 3]);
        let partial = &block[..block.len() - 2];
        assert!(matches!(
            locate_block(partial, CODE, "test"),
            Err(ParseError::Truncated { .. })
        ));
        assert!(!block_available(partial, CODE));
    }

    #[test]
    fn test_echo_length_is_not_a_block() {
        let block = frame(&[1, 2, 3, 4, 0x0D, 0x0A, 0x3D, 8, 9, 10, 11, 12]);
        let mut raw = b"\xA5\xC0\r\n".to_vec();
        raw.extend_from_slice(&block);

        // A prompt-terminated read stops inside the block, 14 bytes in; the
        // echo's CR reads as a declared length of 13.
        let cut = 14;
        assert!(raw[..cut].ends_with(b"\r\n="));
        assert!(!block_available(&raw[..cut], CODE));
        assert!(!block_available(&raw[..raw.len() - 1], CODE));
        assert!(block_available(&raw, CODE));
        assert_eq!(locate_block(&raw, CODE, "test").unwrap(), block.as_slice());
    }

    #[test]
    fn test_corrupt_block_after_echo_is_complete() {
        let mut block = frame(&[1, 2, 3]);
        let last = block.len() - 1;
        block[last] ^= 0x55;
        let mut raw = b"\xA5\xC0\r\n".to_vec();
        raw.extend_from_slice(&block);

        assert!(block_available(&raw, CODE));
        assert!(matches!(
            locate_block(&raw, CODE, "test"),
            Err(ParseError::BadChecksum { expected, .. }) if expected == block[last]
        ));
    }

    #[test]
    fn test_validate_rejects_other_command() {
        let block = frame(&[]);
        let other = CommandCode::new([0xA5, 0xC1]);
        assert!(matches!(
            validate_frame(&block, other, "test"),
            Err(ParseError::UnexpectedCommand { .. })
        ));
    }
}
