use std::time::Duration;

use tokio::net::TcpStream;

use crate::error::RelayError;
use crate::relay::connection::StreamConnection;

/// Default telnet port of a relay Ethernet card.
pub const DEFAULT_TELNET_PORT: u16 = 23;

pub type TelnetConnection = StreamConnection<TcpStream>;

/// Open a telnet session to a relay, e.g. `"192.168.1.10:23"`.
pub async fn connect_telnet(addr: &str, connect_timeout: Duration) -> Result<TelnetConnection, RelayError> {
    let stream = tokio::time::timeout(connect_timeout, TcpStream::connect(addr))
        .await
        .map_err(|_| RelayError::Timeout(connect_timeout))?
        .map_err(|e| RelayError::Transport(format!("{addr}: {e}")))?;
    stream.set_nodelay(true)?;
    log::info!("Connected to relay at {addr}");
    Ok(StreamConnection::telnet(stream))
}
