//! Command vocabulary of a relay dialect.
//!
//! A [`CommandSet`] is an immutable value handed to a session at construction,
//! so alternative dialects and test doubles can be substituted without touching
//! process-wide state.

use std::fmt;
use std::str::FromStr;

use crate::constants;
use crate::error::RelayError;
use crate::relay::access::AccessLevel;
use crate::util::hex::{decode_hex, encode_hex_upper};

/// A two-byte binary command code such as `A5C1`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CommandCode(pub [u8; 2]);

impl CommandCode {
    pub const fn new(bytes: [u8; 2]) -> Self {
        CommandCode(bytes)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// The request as written to the relay: code followed by the line terminator.
    pub fn request(&self, terminator: &[u8]) -> Vec<u8> {
        let mut request = self.0.to_vec();
        request.extend_from_slice(terminator);
        request
    }
}

impl From<[u8; 2]> for CommandCode {
    fn from(bytes: [u8; 2]) -> Self {
        CommandCode(bytes)
    }
}

impl fmt::Display for CommandCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&encode_hex_upper(&self.0))
    }
}

impl FromStr for CommandCode {
    type Err = RelayError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bytes = decode_hex(s).map_err(|e| RelayError::InvalidInput(e.to_string()))?;
        let code: [u8; 2] = bytes.try_into().map_err(|_| {
            RelayError::InvalidInput(format!("command code must be two bytes: {s}"))
        })?;
        Ok(CommandCode(code))
    }
}

/// The byte sequences a session writes and the markers it looks for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSet {
    pub carriage_return: Vec<u8>,
    pub quit: Vec<u8>,
    pub go_acc: Vec<u8>,
    pub go_2ac: Vec<u8>,
    pub go_cal: Vec<u8>,
    pub id: Vec<u8>,
    pub dna: Vec<u8>,
    /// Delimiter every read-to-prompt waits for.
    pub prompt: Vec<u8>,
    pub level_0: Vec<u8>,
    pub level_acc: Vec<u8>,
    pub level_2ac: Vec<u8>,
    pub level_cal: Vec<u8>,
    pub invalid: Vec<u8>,
    pub relay_definition: CommandCode,
}

impl Default for CommandSet {
    fn default() -> Self {
        CommandSet {
            carriage_return: constants::CR.to_vec(),
            quit: constants::QUIT.to_vec(),
            go_acc: constants::GO_ACC.to_vec(),
            go_2ac: constants::GO_2AC.to_vec(),
            go_cal: constants::GO_CAL.to_vec(),
            id: constants::ID.to_vec(),
            dna: constants::DNA.to_vec(),
            prompt: constants::PROMPT.to_vec(),
            level_0: constants::LEVEL_0.to_vec(),
            level_acc: constants::LEVEL_1.to_vec(),
            level_2ac: constants::LEVEL_2.to_vec(),
            level_cal: constants::LEVEL_C.to_vec(),
            invalid: constants::INVALID.to_vec(),
            relay_definition: CommandCode(constants::RELAY_DEFINITION),
        }
    }
}

impl CommandSet {
    /// The "go" command that moves the relay to `level`.
    pub fn go_command(&self, level: AccessLevel) -> Option<&[u8]> {
        match level {
            AccessLevel::Zero => None,
            AccessLevel::Acc => Some(&self.go_acc),
            AccessLevel::TwoAc => Some(&self.go_2ac),
            AccessLevel::Cal => Some(&self.go_cal),
        }
    }

    /// Prompt marker of `level`.
    pub fn level_marker(&self, level: AccessLevel) -> &[u8] {
        match level {
            AccessLevel::Zero => &self.level_0,
            AccessLevel::Acc => &self.level_acc,
            AccessLevel::TwoAc => &self.level_2ac,
            AccessLevel::Cal => &self.level_cal,
        }
    }

    /// Highest privilege whose marker appears in `response`.
    ///
    /// Markers are checked from CAL down to ACC because a relay may show an
    /// elevated prompt without a fresh password exchange.
    pub fn highest_level_in(&self, response: &[u8]) -> AccessLevel {
        [AccessLevel::Cal, AccessLevel::TwoAc, AccessLevel::Acc]
            .into_iter()
            .find(|level| contains(response, self.level_marker(*level)))
            .unwrap_or(AccessLevel::Zero)
    }

    /// Whether `response` carries the rejection marker.
    pub fn is_rejection(&self, response: &[u8]) -> bool {
        contains(response, &self.invalid)
    }

    /// Whether a chunk holds nothing but line breaks and prompt characters.
    pub fn is_clean_prompt(&self, chunk: &[u8]) -> bool {
        contains(chunk, &self.level_0)
            && chunk
                .iter()
                .all(|b| matches!(b, b'\r' | b'\n' | b'=' | b'>' | b' ' | 0x00 | 0x02 | 0x03))
    }
}

/// Position of the first occurrence of `needle` in `haystack`.
pub fn find_subsequence(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    if needle.is_empty() {
        return Some(0);
    }
    haystack
        .windows(needle.len())
        .position(|window| window == needle)
}

pub fn contains(haystack: &[u8], needle: &[u8]) -> bool {
    find_subsequence(haystack, needle).is_some()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_code_display_and_parse() {
        let code = CommandCode::new([0xA5, 0xD1]);
        assert_eq!(code.to_string(), "A5D1");
        assert_eq!("a5d1".parse::<CommandCode>().unwrap(), code);
        assert!("A5".parse::<CommandCode>().is_err());
        assert_eq!(code.request(b"\r\n"), vec![0xA5, 0xD1, 0x0D, 0x0A]);
    }

    #[test]
    fn test_highest_level_wins() {
        let commands = CommandSet::default();
        assert_eq!(commands.highest_level_in(b"\r\n=\r\n="), AccessLevel::Zero);
        assert_eq!(commands.highest_level_in(b"\r\n=>\r\n="), AccessLevel::Acc);
        assert_eq!(
            commands.highest_level_in(b"\r\n=>\r\n=>>\r\n="),
            AccessLevel::TwoAc
        );
        assert_eq!(commands.highest_level_in(b"\r\n==>\r\n=>"), AccessLevel::Cal);
    }

    #[test]
    fn test_clean_prompt() {
        let commands = CommandSet::default();
        assert!(commands.is_clean_prompt(b"\r\n=>"));
        assert!(commands.is_clean_prompt(b"\r\n\r\n="));
        assert!(!commands.is_clean_prompt(b"Level 1\r\n=>"));
        assert!(!commands.is_clean_prompt(b""));
    }

    #[test]
    fn test_find_subsequence() {
        assert_eq!(find_subsequence(b"abcabc", b"ca"), Some(2));
        assert_eq!(find_subsequence(b"abc", b"abcd"), None);
        assert!(contains(b"Invalid Password", b"Invalid"));
    }
}
