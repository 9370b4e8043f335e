//! Relay link layer: access levels, command vocabulary and transports.

pub mod access;
pub mod commands;
pub mod connection;
pub mod mock;
pub mod serial;
pub mod tcp;
pub mod telnet;

pub use access::AccessLevel;
pub use commands::{CommandCode, CommandSet};
pub use connection::{RelayConnection, StreamConnection};
pub use mock::MockRelay;
pub use serial::{connect_serial, SerialConfig, SerialConnection};
pub use tcp::{connect_telnet, TelnetConnection, DEFAULT_TELNET_PORT};
