//! # Relay Serial Communication
//!
//! Opens a relay serial port (front or rear EIA-232 port) as a
//! [`StreamConnection`].

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio_serial::{SerialPortBuilderExt, SerialStream};

use crate::constants::DEFAULT_BAUDRATE;
use crate::error::RelayError;
use crate::relay::connection::StreamConnection;

/// Configuration for serial connection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SerialConfig {
    pub baudrate: u32,
    #[serde(with = "crate::settings::duration_ms")]
    pub timeout: Duration,
}

impl Default for SerialConfig {
    fn default() -> Self {
        SerialConfig {
            baudrate: DEFAULT_BAUDRATE,
            timeout: Duration::from_secs(5),
        }
    }
}

pub type SerialConnection = StreamConnection<SerialStream>;

/// Opens the serial port with the relay's default framing (8 data bits, no parity, 1 stop bit).
pub async fn connect_serial(port_name: &str, config: &SerialConfig) -> Result<SerialConnection, RelayError> {
    let port = tokio_serial::new(port_name, config.baudrate)
        .data_bits(tokio_serial::DataBits::Eight)
        .stop_bits(tokio_serial::StopBits::One)
        .parity(tokio_serial::Parity::None)
        .timeout(config.timeout)
        .open_native_async()
        .map_err(|e| RelayError::Transport(format!("{port_name}: {e}")))?;

    log::info!("Opened {port_name} at {} baud", config.baudrate);
    Ok(StreamConnection::new(port))
}
