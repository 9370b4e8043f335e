//! Relay definition block (`A5C0`).
//!
//! The definition tells the client which command codes the relay uses for
//! its fast-meter variants and which other SEL protocols it speaks.

use nom::{
    bytes::complete::take,
    multi::count,
    number::complete::{be_u16, be_u8},
    sequence::tuple,
    IResult,
};

use crate::constants::{FAST_MSG_CONFIG_BLOCK, FO_CONFIG_BLOCK};
use crate::error::ParseError;
use crate::payload::{locate_block, nom_error, BLOCK_HEADER_LEN, BLOCK_TRAILER_LEN};
use crate::relay::commands::CommandCode;

const BLOCK: &str = "relay definition";

/// Configuration and data command of one fast-meter message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FastMeterCommandInfo {
    pub config_command: CommandCode,
    pub command: CommandCode,
}

/// Status flag and the command it affects.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusFlagInfo {
    pub status_bit: u16,
    pub affected_command: [u8; 6],
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProtocolKind {
    Sel,
    Lmd,
    FastMessage,
    Other(u8),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProtocolInfo {
    pub kind: ProtocolKind,
    pub fast_operate: bool,
}

impl ProtocolInfo {
    /// Decode a protocol word: low byte is the protocol, bit 0 of the high
    /// byte flags Fast Operate support.
    pub fn from_word(word: u16) -> Self {
        let kind = match (word & 0x00FF) as u8 {
            0 => ProtocolKind::Sel,
            1 => ProtocolKind::Lmd,
            2 => ProtocolKind::FastMessage,
            other => ProtocolKind::Other(other),
        };
        ProtocolInfo {
            kind,
            fast_operate: word & 0x0100 != 0,
        }
    }
}

/// Parsed relay definition block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelayDefinition {
    /// Fast-meter messages in relay order: regular, demand, peak demand.
    pub fast_meter: Vec<FastMeterCommandInfo>,
    /// Fast-meter type byte following the command pairs.
    pub fast_meter_type: u8,
    pub status_flags: Vec<StatusFlagInfo>,
    pub protocols: Vec<ProtocolInfo>,
    /// Fast Operate configuration command, when Fast Operate is supported.
    pub fast_operate_command: Option<CommandCode>,
    /// Fast Message configuration command, when Fast Message is listed.
    pub fast_message_command: Option<CommandCode>,
}

fn command_code(input: &[u8]) -> IResult<&[u8], CommandCode> {
    let (input, bytes) = take(2usize)(input)?;
    Ok((input, CommandCode([bytes[0], bytes[1]])))
}

fn fast_meter_info(input: &[u8]) -> IResult<&[u8], FastMeterCommandInfo> {
    let (input, (config_command, command)) = tuple((command_code, command_code))(input)?;
    Ok((
        input,
        FastMeterCommandInfo {
            config_command,
            command,
        },
    ))
}

fn status_flag(input: &[u8]) -> IResult<&[u8], StatusFlagInfo> {
    let (input, status_bit) = be_u16(input)?;
    let (input, affected) = take(6usize)(input)?;
    let mut affected_command = [0u8; 6];
    affected_command.copy_from_slice(affected);
    Ok((
        input,
        StatusFlagInfo {
            status_bit,
            affected_command,
        },
    ))
}

fn protocol(input: &[u8]) -> IResult<&[u8], ProtocolInfo> {
    let (input, word) = be_u16(input)?;
    Ok((input, ProtocolInfo::from_word(word)))
}

/// Parse the relay definition block found in `raw`.
pub fn parse_relay_definition(raw: &[u8], code: CommandCode) -> Result<RelayDefinition, ParseError> {
    let frame = locate_block(raw, code, BLOCK)?;
    let body = &frame[BLOCK_HEADER_LEN..frame.len() - BLOCK_TRAILER_LEN];

    let (rest, (n_protocols, n_fast_meter, n_status_flags)) =
        tuple((be_u8, be_u8, be_u8))(body).map_err(nom_error(BLOCK))?;

    let expected = BLOCK_HEADER_LEN
        + 3
        + n_fast_meter as usize * 4
        + 1
        + n_status_flags as usize * 8
        + n_protocols as usize * 2
        + BLOCK_TRAILER_LEN;
    if frame.len() != expected {
        return Err(ParseError::LengthMismatch {
            block: BLOCK,
            declared: frame.len(),
            expected,
        });
    }

    let (rest, fast_meter) =
        count(fast_meter_info, n_fast_meter as usize)(rest).map_err(nom_error(BLOCK))?;
    let (rest, fast_meter_type) = be_u8(rest).map_err(nom_error(BLOCK))?;
    let (rest, status_flags) =
        count(status_flag, n_status_flags as usize)(rest).map_err(nom_error(BLOCK))?;
    let (_, protocols) = count(protocol, n_protocols as usize)(rest).map_err(nom_error(BLOCK))?;

    let fast_operate_command = protocols
        .iter()
        .any(|p| p.fast_operate)
        .then_some(CommandCode(FO_CONFIG_BLOCK));
    let fast_message_command = protocols
        .iter()
        .any(|p| p.kind == ProtocolKind::FastMessage)
        .then_some(CommandCode(FAST_MSG_CONFIG_BLOCK));

    Ok(RelayDefinition {
        fast_meter,
        fast_meter_type,
        status_flags,
        protocols,
        fast_operate_command,
        fast_message_command,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::payload::encode_block;

    const CODE: CommandCode = CommandCode::new([0xA5, 0xC0]);

    fn definition_payload() -> Vec<u8> {
        let mut payload = vec![0x02, 0x03, 0x01];
        payload.extend_from_slice(&[0xA5, 0xC1, 0xA5, 0xD1]);
        payload.extend_from_slice(&[0xA5, 0xC2, 0xA5, 0xD2]);
        payload.extend_from_slice(&[0xA5, 0xC3, 0xA5, 0xD3]);
        payload.push(0x01);
        payload.extend_from_slice(&[0x00, 0x08, 0xA5, 0x20, 0x00, 0x00, 0x00, 0x00]);
        payload.extend_from_slice(&[0x01, 0x00]);
        payload.extend_from_slice(&[0x00, 0x02]);
        payload
    }

    #[test]
    fn test_parse_definition() {
        let mut raw = b"\xA5\xC0\r\n".to_vec();
        raw.extend_from_slice(&encode_block(CODE, &definition_payload()));
        raw.extend_from_slice(b"\r\n=>");

        let definition = parse_relay_definition(&raw, CODE).unwrap();
        assert_eq!(definition.fast_meter.len(), 3);
        assert_eq!(definition.fast_meter[1].config_command, CommandCode::new([0xA5, 0xC2]));
        assert_eq!(definition.fast_meter[2].command, CommandCode::new([0xA5, 0xD3]));
        assert_eq!(definition.fast_meter_type, 0x01);
        assert_eq!(definition.status_flags[0].status_bit, 0x0008);
        assert_eq!(
            definition.protocols,
            vec![
                ProtocolInfo { kind: ProtocolKind::Sel, fast_operate: true },
                ProtocolInfo { kind: ProtocolKind::FastMessage, fast_operate: false },
            ]
        );
        assert_eq!(definition.fast_operate_command, Some(CommandCode::new([0xA5, 0xCE])));
        assert_eq!(definition.fast_message_command, Some(CommandCode::new([0xA5, 0x46])));
    }

    #[test]
    fn test_plain_sel_relay_has_no_operate_or_message() {
        let payload = [0x01, 0x01, 0x00, 0xA5, 0xC1, 0xA5, 0xD1, 0x00, 0x00, 0x00];
        let definition = parse_relay_definition(&encode_block(CODE, &payload), CODE).unwrap();
        assert_eq!(definition.fast_meter.len(), 1);
        assert_eq!(definition.fast_operate_command, None);
        assert_eq!(definition.fast_message_command, None);
    }

    #[test]
    fn test_counts_must_match_length() {
        let mut payload = definition_payload();
        payload.truncate(payload.len() - 2);
        assert!(matches!(
            parse_relay_definition(&encode_block(CODE, &payload), CODE),
            Err(ParseError::LengthMismatch { .. })
        ));
    }

    #[test]
    fn test_garbage_is_rejected() {
        assert!(parse_relay_definition(b"Invalid Access Level\r\n=", CODE).is_err());
    }
}
