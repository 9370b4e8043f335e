//! Fast-meter configuration blocks (`A5C1`, `A5C2`, `A5C3`).
//!
//! A configuration block describes the layout of the matching data block:
//! where the analog samples, the time stamp and the digital banks live, and
//! how each analog channel is encoded and scaled.

use nom::{
    bytes::complete::take,
    multi::count,
    number::complete::{be_u16, be_u8},
    IResult,
};

use crate::error::ParseError;
use crate::payload::{locate_block, nom_error, BLOCK_HEADER_LEN, BLOCK_TRAILER_LEN};
use crate::relay::commands::CommandCode;

const BLOCK: &str = "fast meter configuration";

/// Length of the fixed part of the configuration body.
const FIXED_FIELDS_LEN: usize = 13;
const CHANNEL_LEN: usize = 10;
const CALCULATION_BLOCK_LEN: usize = 14;
/// Year, month, day, hour, minute, millisecond of minute.
pub const TIMESTAMP_LEN: usize = 8;

/// Offset value meaning "not present".
const ABSENT: u16 = 0xFFFF;
/// Scale-factor type meaning "no scale factor".
const NO_SCALE: u8 = 0xFF;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelType {
    /// Signed 16-bit integer.
    Int16,
    /// IEEE-754 single precision.
    Float32,
    /// IEEE-754 double precision.
    Float64,
    /// 8-byte time stamp.
    Timestamp,
}

impl ChannelType {
    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            0 => Some(ChannelType::Int16),
            1 => Some(ChannelType::Float32),
            2 => Some(ChannelType::Float64),
            3 => Some(ChannelType::Timestamp),
            _ => None,
        }
    }

    /// Bytes one sample of this type occupies.
    pub fn size(self) -> usize {
        match self {
            ChannelType::Int16 => 2,
            ChannelType::Float32 => 4,
            ChannelType::Float64 => 8,
            ChannelType::Timestamp => TIMESTAMP_LEN,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnalogChannel {
    pub name: String,
    pub channel_type: ChannelType,
    /// Scale-factor type; `None` when the channel is unscaled.
    pub scale_factor_type: Option<u8>,
    /// Offset of the scale factor inside the data block.
    pub scale_factor_offset: u16,
}

/// Line quantities a relay can derive from its analog channels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CalculationBlock {
    pub line_configuration: u8,
    pub calculation_type: u8,
    pub skew_correction_offset: Option<u16>,
    pub rs_offset: Option<u16>,
    pub xs_offset: Option<u16>,
    /// Channel indices of IA, IB, IC, VA, VB, VC.
    pub channel_indices: [u8; 6],
}

/// Parsed fast-meter configuration block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FastMeterConfig {
    /// Configuration command this block answered.
    pub command: CommandCode,
    /// Data command the relay definition pairs with this configuration.
    /// Unknown until auto-configuration attaches it.
    pub data_command: Option<CommandCode>,
    pub status_flag_bytes: u8,
    pub scale_factor_location: u8,
    pub scale_factor_count: u8,
    pub samples_per_channel: u8,
    pub digital_bank_count: u8,
    pub analog_offset: Option<u16>,
    pub timestamp_offset: Option<u16>,
    pub digital_offset: Option<u16>,
    pub channels: Vec<AnalogChannel>,
    pub calculation_blocks: Vec<CalculationBlock>,
}

impl FastMeterConfig {
    pub fn with_data_command(mut self, code: CommandCode) -> Self {
        self.data_command = Some(code);
        self
    }

    /// Bytes of one sample row across all analog channels.
    pub fn sample_row_len(&self) -> usize {
        self.channels.iter().map(|c| c.channel_type.size()).sum()
    }

    /// Offset of `channel`'s first sample inside the data block.
    pub fn channel_offset(&self, channel: usize) -> Option<usize> {
        let base = self.analog_offset? as usize;
        let preceding: usize = self
            .channels
            .get(..channel)?
            .iter()
            .map(|c| c.channel_type.size())
            .sum();
        Some(base + preceding)
    }

    /// Total length of a data block laid out by this configuration.
    pub fn data_length(&self) -> usize {
        let mut end = BLOCK_HEADER_LEN + self.status_flag_bytes as usize;
        if let Some(offset) = self.analog_offset {
            end = end.max(offset as usize + self.samples_per_channel as usize * self.sample_row_len());
        }
        if let Some(offset) = self.timestamp_offset {
            end = end.max(offset as usize + TIMESTAMP_LEN);
        }
        if let Some(offset) = self.digital_offset {
            end = end.max(offset as usize + self.digital_bank_count as usize);
        }
        for channel in self.channels.iter().filter(|c| c.scale_factor_type.is_some()) {
            end = end.max(channel.scale_factor_offset as usize + 4);
        }
        end + BLOCK_TRAILER_LEN
    }
}

fn optional_offset(value: u16) -> Option<u16> {
    (value != ABSENT).then_some(value)
}

fn channel(input: &[u8]) -> IResult<&[u8], (&[u8], u8, u8, u16)> {
    let (input, name) = take(6usize)(input)?;
    let (input, channel_type) = be_u8(input)?;
    let (input, scale_type) = be_u8(input)?;
    let (input, scale_offset) = be_u16(input)?;
    Ok((input, (name, channel_type, scale_type, scale_offset)))
}

fn calculation_block(input: &[u8]) -> IResult<&[u8], CalculationBlock> {
    let (input, line_configuration) = be_u8(input)?;
    let (input, calculation_type) = be_u8(input)?;
    let (input, skew) = be_u16(input)?;
    let (input, rs) = be_u16(input)?;
    let (input, xs) = be_u16(input)?;
    let (input, indices) = take(6usize)(input)?;
    let mut channel_indices = [0u8; 6];
    channel_indices.copy_from_slice(indices);
    Ok((
        input,
        CalculationBlock {
            line_configuration,
            calculation_type,
            skew_correction_offset: optional_offset(skew),
            rs_offset: optional_offset(rs),
            xs_offset: optional_offset(xs),
            channel_indices,
        },
    ))
}

fn channel_name(raw: &[u8]) -> String {
    String::from_utf8_lossy(raw)
        .trim_matches(|c: char| c == '\0' || c.is_whitespace())
        .to_string()
}

/// Parse the configuration block answering `code` found in `raw`.
pub fn parse_fast_meter_config(raw: &[u8], code: CommandCode) -> Result<FastMeterConfig, ParseError> {
    let frame = locate_block(raw, code, BLOCK)?;
    let body = &frame[BLOCK_HEADER_LEN..frame.len() - BLOCK_TRAILER_LEN];
    if body.len() < FIXED_FIELDS_LEN {
        return Err(ParseError::Truncated {
            block: BLOCK,
            needed: FIXED_FIELDS_LEN,
            available: body.len(),
        });
    }

    let status_flag_bytes = body[0];
    let scale_factor_location = body[1];
    let scale_factor_count = body[2];
    let analog_channel_count = body[3] as usize;
    let samples_per_channel = body[4];
    let digital_bank_count = body[5];
    let calculation_block_count = body[6] as usize;

    let expected = BLOCK_HEADER_LEN
        + FIXED_FIELDS_LEN
        + analog_channel_count * CHANNEL_LEN
        + calculation_block_count * CALCULATION_BLOCK_LEN
        + BLOCK_TRAILER_LEN;
    if frame.len() != expected {
        return Err(ParseError::LengthMismatch {
            block: BLOCK,
            declared: frame.len(),
            expected,
        });
    }

    let rest = &body[7..];
    let (rest, analog_offset) = be_u16(rest).map_err(nom_error(BLOCK))?;
    let (rest, timestamp_offset) = be_u16(rest).map_err(nom_error(BLOCK))?;
    let (rest, digital_offset) = be_u16(rest).map_err(nom_error(BLOCK))?;
    let (rest, raw_channels) = count(channel, analog_channel_count)(rest).map_err(nom_error(BLOCK))?;
    let (_, calculation_blocks) =
        count(calculation_block, calculation_block_count)(rest).map_err(nom_error(BLOCK))?;

    let channels = raw_channels
        .into_iter()
        .map(|(name, type_code, scale_type, scale_offset)| {
            let channel_type = ChannelType::from_code(type_code).ok_or_else(|| ParseError::InvalidField {
                block: BLOCK,
                field: "channel type",
                detail: format!("{} has unknown type {type_code}", channel_name(name)),
            })?;
            Ok(AnalogChannel {
                name: channel_name(name),
                channel_type,
                scale_factor_type: (scale_type != NO_SCALE).then_some(scale_type),
                scale_factor_offset: scale_offset,
            })
        })
        .collect::<Result<Vec<_>, ParseError>>()?;

    Ok(FastMeterConfig {
        command: code,
        data_command: None,
        status_flag_bytes,
        scale_factor_location,
        scale_factor_count,
        samples_per_channel,
        digital_bank_count,
        analog_offset: optional_offset(analog_offset),
        timestamp_offset: optional_offset(timestamp_offset),
        digital_offset: optional_offset(digital_offset),
        channels,
        calculation_blocks,
    })
}
