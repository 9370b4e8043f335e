//! SEL Protocol Constants
//!
//! This module defines the command codes, ASCII commands, prompt markers and
//! timing defaults used by the Fast Meter client, following the SEL protocol
//! application guide.

// ----------------------------------------------------------------------------
// Binary command codes
// ----------------------------------------------------------------------------

/// Relay definition block
pub const RELAY_DEFINITION: [u8; 2] = [0xA5, 0xC0];
/// Configuration block for regular Fast Meter
pub const FM_CONFIG_BLOCK: [u8; 2] = [0xA5, 0xC1];
/// Configuration block for demand Fast Meter
pub const FM_DEMAND_CONFIG_BLOCK: [u8; 2] = [0xA5, 0xC2];
/// Configuration block for peak demand Fast Meter
pub const FM_PEAK_CONFIG_BLOCK: [u8; 2] = [0xA5, 0xC3];
/// Configuration block for Fast Operate
pub const FO_CONFIG_BLOCK: [u8; 2] = [0xA5, 0xCE];
/// Configuration block for Fast Message
pub const FAST_MSG_CONFIG_BLOCK: [u8; 2] = [0xA5, 0x46];
/// Regular Fast Meter data
pub const FAST_METER_REGULAR: [u8; 2] = [0xA5, 0xD1];
/// Demand Fast Meter data
pub const FAST_METER_DEMAND: [u8; 2] = [0xA5, 0xD2];
/// Peak demand Fast Meter data
pub const FAST_METER_PEAK_DEMAND: [u8; 2] = [0xA5, 0xD3];

// ----------------------------------------------------------------------------
// ASCII commands and markers
// ----------------------------------------------------------------------------

/// Line terminator used for every command
pub const CR: &[u8] = b"\r\n";
pub const QUIT: &[u8] = b"QUI\r\n";
pub const GO_ACC: &[u8] = b"ACC\r\n";
pub const GO_2AC: &[u8] = b"2AC\r\n";
pub const GO_CAL: &[u8] = b"CAL\r\n";
pub const ID: &[u8] = b"ID\r\n";
pub const DNA: &[u8] = b"DNA\r\n";

/// Every prompt starts on a fresh line with `=`
pub const PROMPT: &[u8] = b"\r\n=";
pub const LEVEL_0: &[u8] = b"\r\n=";
pub const LEVEL_1: &[u8] = b"\r\n=>";
pub const LEVEL_2: &[u8] = b"\r\n=>>";
pub const LEVEL_C: &[u8] = b"\r\n==>";
pub const INVALID: &[u8] = b"Invalid";

/// Factory passwords
pub const PASS_ACC: &str = "OTTER";
pub const PASS_2AC: &str = "TAIL";
pub const PASS_CAL: &str = "CLARKE";

// ----------------------------------------------------------------------------
// Timing defaults (milliseconds)
// ----------------------------------------------------------------------------

pub const DEFAULT_VERIFY_ATTEMPTS: u32 = 5;
pub const DEFAULT_INTER_ATTEMPT_DELAY_MS: u64 = 25;
pub const DEFAULT_PASSWORD_DELAY_MS: u64 = 75;
pub const DEFAULT_READ_TIMEOUT_MS: u64 = 5_000;
pub const DEFAULT_DRAIN_POLL_INTERVAL_MS: u64 = 250;
pub const DEFAULT_MAX_IDLE_READS: u32 = 10;
pub const DEFAULT_CLEAN_PROMPT_COUNT: u32 = 3;
pub const DEFAULT_MAX_CLEAN_PROMPT_PROBES: u32 = 12;

/// Serial front-port defaults
pub const DEFAULT_BAUDRATE: u32 = 9600;
