//! # Relay Error Handling
//!
//! This module defines the `RelayError` enum, which represents the different error
//! types that can occur while talking to a relay, and `ParseError`, which the block
//! parsers return when a relay response cannot be interpreted.

use std::time::Duration;
use thiserror::Error;

use crate::relay::access::AccessLevel;

/// Represents the different error types that can occur in a relay session.
#[derive(Debug, Error)]
pub enum RelayError {
    /// The probe sequence never saw the level-0 prompt within the attempt budget.
    #[error("Connection could not be verified after {attempts} attempts")]
    ConnectionUnverified { attempts: u32 },

    /// The relay answered a password exchange with its rejection marker.
    #[error("Relay rejected the password for {level}")]
    AuthenticationRejected { level: AccessLevel },

    /// An operation that needs a completed auto-configuration was invoked first.
    #[error("Client is not configured: {0}")]
    NotConfigured(&'static str),

    /// A block parser could not interpret its input.
    #[error(transparent)]
    Parse(#[from] ParseError),

    /// Indicates an error reported by the underlying byte stream.
    #[error("Transport error: {0}")]
    Transport(String),

    /// Nothing arrived from the relay before the read timeout elapsed.
    #[error("Timed out after {0:?} waiting for the relay")]
    Timeout(Duration),

    /// Indicates invalid input supplied by the caller.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// The relay never echoed the issued command.
    #[error("Command {command} was not echoed after {reads} idle reads")]
    CommandEchoMissing { command: String, reads: u32 },

    /// Indicates a settings file that could not be loaded.
    #[error("Settings error: {0}")]
    Settings(String),
}

impl From<std::io::Error> for RelayError {
    fn from(err: std::io::Error) -> Self {
        RelayError::Transport(err.to_string())
    }
}

/// Failure of a block parser.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("{block} block truncated: need {needed} bytes, have {available}")]
    Truncated {
        block: &'static str,
        needed: usize,
        available: usize,
    },

    #[error("{block} block starts with {found}, expected {expected}")]
    UnexpectedCommand {
        block: &'static str,
        expected: String,
        found: String,
    },

    #[error("{block} block length {declared} does not match layout length {expected}")]
    LengthMismatch {
        block: &'static str,
        declared: usize,
        expected: usize,
    },

    #[error("{block} block checksum mismatch: expected 0x{expected:02X}, calculated 0x{calculated:02X}")]
    BadChecksum {
        block: &'static str,
        expected: u8,
        calculated: u8,
    },

    #[error("{block} block has invalid {field}: {detail}")]
    InvalidField {
        block: &'static str,
        field: &'static str,
        detail: String,
    },

    #[error("{block} block is missing {field}")]
    MissingField {
        block: &'static str,
        field: &'static str,
    },

    #[error("{block} block not found in response")]
    BlockNotFound { block: &'static str },

    #[error("DNA table has {rows} rows but the data block carries {banks} digital banks")]
    DnaMismatch { rows: usize, banks: usize },

    #[error("{block} block is malformed: {detail}")]
    Malformed { block: &'static str, detail: String },
}
