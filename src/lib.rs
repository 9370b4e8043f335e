//! # fastmeter-rs - A Rust Crate for SEL Fast Meter Polling
//!
//! The fastmeter-rs crate implements the client side of the SEL relay
//! command/response protocol used to poll real-time analog and digital
//! values from protective relays over telnet or a serial port.
//!
//! ## Features
//!
//! - Verify a relay connection and track its access level (0, ACC, 2AC, CAL)
//! - Elevate through the access-level ladder with password exchange
//! - Auto-configure from the relay's own definition, configuration, DNA and ID blocks
//! - Poll regular, demand and peak-demand Fast Meter data
//! - Decode binary blocks with checksum and layout validation
//! - Logging through the `log` facade and JSON settings files
//!
//! ## Usage
//!
//! ```toml
//! [dependencies]
//! fastmeter-rs = "0.1.0"
//! ```
//!
//! ```rust,no_run
//! use fastmeter_rs::{connect_tcp, AccessLevel, ClientSettings};
//!
//! # async fn run() -> Result<(), fastmeter_rs::RelayError> {
//! let mut session = connect_tcp("192.168.1.10:23", ClientSettings::default()).await?;
//! let reading = session.poll_fast_meter(AccessLevel::Acc).await?;
//! for (name, value) in &reading.analogs {
//!     println!("{name}: {value}");
//! }
//! # Ok(())
//! # }
//! ```

pub mod constants;
pub mod error;
pub mod logging;
pub mod payload;
pub mod relay;
pub mod session;
pub mod settings;
pub mod util;

pub use crate::error::{ParseError, RelayError};
pub use crate::logging::{init_logger, log_info};

pub use payload::{
    BlockParser, DnaDefinition, FastMeterConfig, FastMeterReading, RelayDefinition, RelayIdentity,
    SelBlockParser,
};
pub use relay::{
    AccessLevel, CommandCode, CommandSet, MockRelay, RelayConnection, SerialConfig,
    SerialConnection, StreamConnection, TelnetConnection,
};
pub use session::{FastMeterVariant, RelayProfile, RelaySession};
pub use settings::{ClientSettings, ElevationPolicy};
pub use util::bits::{bits_from_integer, decode_ieee754_single};

/// Connect to a relay over telnet and run the connect sequence.
///
/// # Arguments
/// * `addr` - Relay address, e.g. `"192.168.1.10:23"`
/// * `settings` - Session settings; `read_timeout` also bounds the TCP connect
///
/// # Returns
/// * `Ok(RelaySession)` - Verified (and, per settings, auto-configured) session
/// * `Err(RelayError)` - Connection or configuration failed
pub async fn connect_tcp(
    addr: &str,
    settings: ClientSettings,
) -> Result<RelaySession<TelnetConnection>, RelayError> {
    let conn = relay::connect_telnet(addr, settings.read_timeout).await?;
    RelaySession::connect(conn, CommandSet::default(), settings).await
}

/// Connect to a relay over a serial port and run the connect sequence.
///
/// # Arguments
/// * `port` - Serial port path (e.g., "/dev/ttyUSB0" on Linux, "COM3" on Windows)
/// * `baudrate` - Port speed; relay front ports default to 9600
/// * `settings` - Session settings
pub async fn connect_serial(
    port: &str,
    baudrate: u32,
    settings: ClientSettings,
) -> Result<RelaySession<SerialConnection>, RelayError> {
    let config = SerialConfig {
        baudrate,
        timeout: settings.read_timeout,
    };
    let conn = relay::connect_serial(port, &config).await?;
    RelaySession::connect(conn, CommandSet::default(), settings).await
}

/// Poll the regular fast meter of a configured session.
pub async fn poll_fast_meter<C: RelayConnection>(
    session: &mut RelaySession<C>,
    minimum_level: AccessLevel,
) -> Result<FastMeterReading, RelayError> {
    session.poll_fast_meter(minimum_level).await
}
