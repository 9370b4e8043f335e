//! Fast-meter data blocks (`A5D1`, `A5D2`, `A5D3`).
//!
//! A data block is only meaningful together with the configuration block
//! that describes its layout and the DNA table that names its digital bits.

use chrono::{NaiveDate, NaiveDateTime};

use crate::error::ParseError;
use crate::payload::config::{ChannelType, FastMeterConfig, TIMESTAMP_LEN};
use crate::payload::dna::{DnaDefinition, PLACEHOLDER};
use crate::payload::{locate_block, BLOCK_HEADER_LEN};
use crate::relay::commands::CommandCode;
use crate::util::bits::{bits_from_integer, decode_ieee754_single, SINGLE_SIGNIFICANT_DIGITS};

const BLOCK: &str = "fast meter data";

/// One decoded fast-meter poll.
#[derive(Debug, Clone, PartialEq)]
pub struct FastMeterReading {
    /// Data command that produced the reading.
    pub command: CommandCode,
    pub status_flags: Vec<u8>,
    pub timestamp: Option<NaiveDateTime>,
    /// Channel name to value, in configuration order.
    pub analogs: Vec<(String, f64)>,
    /// Point name to state, in DNA order.
    pub digitals: Vec<(String, bool)>,
}

impl FastMeterReading {
    pub fn analog(&self, name: &str) -> Option<f64> {
        self.analogs
            .iter()
            .find(|(channel, _)| channel == name)
            .map(|(_, value)| *value)
    }

    pub fn digital(&self, name: &str) -> Option<bool> {
        self.digitals
            .iter()
            .find(|(point, _)| point == name)
            .map(|(_, state)| *state)
    }
}

fn field<'a>(frame: &'a [u8], offset: usize, len: usize, name: &'static str) -> Result<&'a [u8], ParseError> {
    frame.get(offset..offset + len).ok_or(ParseError::InvalidField {
        block: BLOCK,
        field: name,
        detail: format!("bytes {offset}..{} outside the {}-byte block", offset + len, frame.len()),
    })
}

fn single(bytes: &[u8], name: &'static str) -> Result<f64, ParseError> {
    decode_ieee754_single(bytes, SINGLE_SIGNIFICANT_DIGITS).map_err(|e| ParseError::InvalidField {
        block: BLOCK,
        field: name,
        detail: e.to_string(),
    })
}

/// Decode year, month, day, hour, minute and millisecond-of-minute.
fn decode_timestamp(bytes: &[u8]) -> Result<NaiveDateTime, ParseError> {
    let year = u16::from_be_bytes([bytes[0], bytes[1]]) as i32;
    let (month, day, hour, minute) = (bytes[2], bytes[3], bytes[4], bytes[5]);
    let millis = u16::from_be_bytes([bytes[6], bytes[7]]) as u32;

    NaiveDate::from_ymd_opt(year, month as u32, day as u32)
        .and_then(|date| {
            date.and_hms_milli_opt(hour as u32, minute as u32, millis / 1000, millis % 1000)
        })
        .ok_or_else(|| ParseError::InvalidField {
            block: BLOCK,
            field: "timestamp",
            detail: format!("{year:04}-{month:02}-{day:02} {hour:02}:{minute:02} +{millis}ms"),
        })
}

fn decode_analogs(frame: &[u8], config: &FastMeterConfig) -> Result<Vec<(String, f64)>, ParseError> {
    let mut analogs = Vec::with_capacity(config.channels.len());
    for (index, channel) in config.channels.iter().enumerate() {
        let offset = config.channel_offset(index).ok_or(ParseError::MissingField {
            block: BLOCK,
            field: "analog offset",
        })?;
        let bytes = field(frame, offset, channel.channel_type.size(), "analog channel")?;

        let value = match channel.channel_type {
            ChannelType::Int16 => {
                let raw = i16::from_be_bytes([bytes[0], bytes[1]]) as f64;
                match channel.scale_factor_type {
                    Some(_) => {
                        let scale_bytes =
                            field(frame, channel.scale_factor_offset as usize, 4, "scale factor")?;
                        raw * single(scale_bytes, "scale factor")?
                    }
                    None => raw,
                }
            }
            ChannelType::Float32 => single(bytes, "analog channel")?,
            ChannelType::Float64 => {
                let mut double = [0u8; 8];
                double.copy_from_slice(bytes);
                f64::from_be_bytes(double)
            }
            // Time-stamp channels carry no measurement.
            ChannelType::Timestamp => continue,
        };
        analogs.push((channel.name.clone(), value));
    }
    Ok(analogs)
}

fn decode_digitals(
    frame: &[u8],
    config: &FastMeterConfig,
    dna: &DnaDefinition,
) -> Result<Vec<(String, bool)>, ParseError> {
    let banks = config.digital_bank_count as usize;
    if banks == 0 {
        return Ok(Vec::new());
    }
    if dna.rows.len() < banks {
        return Err(ParseError::DnaMismatch {
            rows: dna.rows.len(),
            banks,
        });
    }
    let offset = config.digital_offset.ok_or(ParseError::MissingField {
        block: BLOCK,
        field: "digital offset",
    })? as usize;
    let bank_bytes = field(frame, offset, banks, "digital banks")?;

    let mut digitals = Vec::with_capacity(banks * 8);
    for (byte, row) in bank_bytes.iter().zip(&dna.rows) {
        let bits = bits_from_integer(*byte as u64, true, true);
        for (name, state) in row.names.iter().zip(bits) {
            if name != PLACEHOLDER {
                digitals.push((name.clone(), state));
            }
        }
    }
    Ok(digitals)
}

/// Decode the data block answering `code` in `raw`.
///
/// The block length must equal the layout `config` describes, and its
/// command must be the data command `config` is paired with; a block from
/// another command or another configuration is rejected.
pub fn parse_fast_meter_data(
    raw: &[u8],
    code: CommandCode,
    config: &FastMeterConfig,
    dna: &DnaDefinition,
) -> Result<FastMeterReading, ParseError> {
    let frame = locate_block(raw, code, BLOCK)?;
    let found = CommandCode([frame[0], frame[1]]);
    if let Some(expected) = config.data_command.filter(|expected| *expected != found) {
        return Err(ParseError::UnexpectedCommand {
            block: BLOCK,
            expected: expected.to_string(),
            found: found.to_string(),
        });
    }
    let expected = config.data_length();
    if frame.len() != expected {
        return Err(ParseError::LengthMismatch {
            block: BLOCK,
            declared: frame.len(),
            expected,
        });
    }

    let status_flags = field(
        frame,
        BLOCK_HEADER_LEN,
        config.status_flag_bytes as usize,
        "status flags",
    )?
    .to_vec();

    let timestamp = match config.timestamp_offset {
        Some(offset) => Some(decode_timestamp(field(
            frame,
            offset as usize,
            TIMESTAMP_LEN,
            "timestamp",
        )?)?),
        None => None,
    };

    Ok(FastMeterReading {
        command: code,
        status_flags,
        timestamp,
        analogs: decode_analogs(frame, config)?,
        digitals: decode_digitals(frame, config, dna)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::payload::config::parse_fast_meter_config;
    use crate::payload::dna::parse_dna;
    use crate::payload::encode_block;
    use chrono::{Datelike, Timelike};

    const CONFIG: CommandCode = CommandCode::new([0xA5, 0xC1]);
    const DATA: CommandCode = CommandCode::new([0xA5, 0xD1]);

    fn config() -> FastMeterConfig {
        let mut payload = vec![0x01, 0x02, 0x01, 0x02, 0x01, 0x01, 0x00];
        payload.extend_from_slice(&[0x00, 0x04, 0x00, 0x0A, 0x00, 0x12]);
        payload.extend_from_slice(b"IA\0\0\0\0");
        payload.extend_from_slice(&[0x00, 0x00, 0x00, 0x13]);
        payload.extend_from_slice(b"FREQ\0\0");
        payload.extend_from_slice(&[0x01, 0xFF, 0xFF, 0xFF]);
        parse_fast_meter_config(&encode_block(CONFIG, &payload), CONFIG).unwrap()
    }

    fn dna() -> DnaDefinition {
        parse_dna(b"DNA\r\n\"TRIP\",\"*\",\"IN101\",\"*\",\"*\",\"*\",\"*\",\"OUT101\",\"0A1B\"\r\n\r\n=>").unwrap()
    }

    fn data_payload() -> Vec<u8> {
        let mut payload = vec![0x40];
        payload.extend_from_slice(&250i16.to_be_bytes());
        payload.extend_from_slice(&59.98f32.to_be_bytes());
        payload.extend_from_slice(&[0x07, 0xE8, 0x03, 0x0F, 0x0C, 0x1E, 0x75, 0x30]);
        payload.push(0b1010_0001);
        payload.extend_from_slice(&0.5f32.to_be_bytes());
        payload
    }

    #[test]
    fn test_parse_reading() {
        let mut raw = b"\xA5\xD1\r\n".to_vec();
        raw.extend_from_slice(&encode_block(DATA, &data_payload()));
        raw.extend_from_slice(b"\r\n=>");

        let reading = parse_fast_meter_data(&raw, DATA, &config(), &dna()).unwrap();
        assert_eq!(reading.status_flags, vec![0x40]);
        assert_eq!(reading.analog("IA"), Some(125.0));
        assert_eq!(reading.analog("FREQ"), Some(59.98));

        let timestamp = reading.timestamp.unwrap();
        assert_eq!((timestamp.year(), timestamp.month(), timestamp.day()), (2024, 3, 15));
        assert_eq!((timestamp.hour(), timestamp.minute(), timestamp.second()), (12, 30, 30));

        assert_eq!(
            reading.digitals,
            vec![
                ("TRIP".to_string(), true),
                ("IN101".to_string(), true),
                ("OUT101".to_string(), true),
            ]
        );
    }

    #[test]
    fn test_digital_bits_msb_first() {
        let mut payload = data_payload();
        payload[15] = 0b0000_0001;
        let reading =
            parse_fast_meter_data(&encode_block(DATA, &payload), DATA, &config(), &dna()).unwrap();
        assert_eq!(reading.digital("TRIP"), Some(false));
        assert_eq!(reading.digital("OUT101"), Some(true));
    }

    #[test]
    fn test_layout_mismatch_rejected() {
        let mut payload = data_payload();
        payload.push(0x00);
        assert!(matches!(
            parse_fast_meter_data(&encode_block(DATA, &payload), DATA, &config(), &dna()),
            Err(ParseError::LengthMismatch { .. })
        ));
    }

    #[test]
    fn test_wrong_command_not_found() {
        let block = encode_block(CommandCode::new([0xA5, 0xD2]), &data_payload());
        assert_eq!(
            parse_fast_meter_data(&block, DATA, &config(), &dna()),
            Err(ParseError::BlockNotFound { block: BLOCK })
        );
    }

    #[test]
    fn test_block_for_other_data_command_rejected() {
        let demand = CommandCode::new([0xA5, 0xD2]);
        let block = encode_block(demand, &data_payload());
        let regular = config().with_data_command(DATA);

        assert_eq!(
            parse_fast_meter_data(&block, demand, &regular, &dna()),
            Err(ParseError::UnexpectedCommand {
                block: BLOCK,
                expected: "A5D1".to_string(),
                found: "A5D2".to_string(),
            })
        );
        assert!(parse_fast_meter_data(&encode_block(DATA, &data_payload()), DATA, &regular, &dna()).is_ok());
    }

    #[test]
    fn test_dna_shorter_than_banks() {
        let empty = DnaDefinition { rows: Vec::new() };
        assert_eq!(
            parse_fast_meter_data(&encode_block(DATA, &data_payload()), DATA, &config(), &empty),
            Err(ParseError::DnaMismatch { rows: 0, banks: 1 })
        );
    }

    #[test]
    fn test_invalid_timestamp() {
        let mut payload = data_payload();
        payload[9] = 13;
        assert!(matches!(
            parse_fast_meter_data(&encode_block(DATA, &payload), DATA, &config(), &dna()),
            Err(ParseError::InvalidField { field: "timestamp", .. })
        ));
    }
}
