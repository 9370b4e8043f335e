//! Minimal telnet layer for relay Ethernet ports.
//!
//! Relays answer on port 23 with a handful of option negotiations. The filter
//! strips every IAC sequence from the inbound stream, refuses each option, and
//! turns `IAC IAC` back into a literal `0xFF`. All other bytes pass through
//! untouched; unlike many telnet clients, NUL bytes are kept.

use bytes::BytesMut;

pub const IAC: u8 = 255;
pub const DONT: u8 = 254;
pub const DO: u8 = 253;
pub const WONT: u8 = 252;
pub const WILL: u8 = 251;
pub const SB: u8 = 250;
pub const SE: u8 = 240;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
enum State {
    #[default]
    Data,
    Iac,
    Negotiate(u8),
    Subnegotiation,
    SubnegotiationIac,
}

/// Inbound telnet decoder.
#[derive(Debug, Default)]
pub struct TelnetFilter {
    state: State,
}

impl TelnetFilter {
    /// Decode `input` into `out`, returning the negotiation replies to send.
    pub fn feed(&mut self, input: &[u8], out: &mut BytesMut) -> Vec<u8> {
        let mut replies = Vec::new();
        for &byte in input {
            self.state = match (self.state, byte) {
                (State::Data, IAC) => State::Iac,
                (State::Data, b) => {
                    out.extend_from_slice(&[b]);
                    State::Data
                }
                (State::Iac, IAC) => {
                    out.extend_from_slice(&[IAC]);
                    State::Data
                }
                (State::Iac, cmd @ (WILL | WONT | DO | DONT)) => State::Negotiate(cmd),
                (State::Iac, SB) => State::Subnegotiation,
                (State::Iac, _) => State::Data,
                (State::Negotiate(cmd), option) => {
                    match cmd {
                        DO => replies.extend_from_slice(&[IAC, WONT, option]),
                        WILL => replies.extend_from_slice(&[IAC, DONT, option]),
                        _ => {}
                    }
                    State::Data
                }
                (State::Subnegotiation, IAC) => State::SubnegotiationIac,
                (State::Subnegotiation, _) => State::Subnegotiation,
                (State::SubnegotiationIac, SE) => State::Data,
                (State::SubnegotiationIac, _) => State::Subnegotiation,
            };
        }
        replies
    }

    /// Escape outbound data (`0xFF` is doubled).
    pub fn escape(data: &[u8]) -> Vec<u8> {
        let mut escaped = Vec::with_capacity(data.len());
        for &byte in data {
            escaped.push(byte);
            if byte == IAC {
                escaped.push(IAC);
            }
        }
        escaped
    }
}
