//! # Relay Session
//!
//! [`RelaySession`] owns one connection to one relay and drives the whole
//! exchange over it: connection verification, the access-level ladder,
//! auto-configuration and fast-meter polling. Operations are `async` but
//! strictly sequential; a session is never shared between tasks, and every
//! relay polled concurrently needs its own session and connection.
//!
//! ```rust,no_run
//! use fastmeter_rs::relay::{connect_telnet, AccessLevel, CommandSet};
//! use fastmeter_rs::session::RelaySession;
//! use fastmeter_rs::settings::ClientSettings;
//! use std::time::Duration;
//!
//! # async fn run() -> Result<(), fastmeter_rs::RelayError> {
//! let conn = connect_telnet("192.168.1.10:23", Duration::from_secs(5)).await?;
//! let mut session = RelaySession::connect(conn, CommandSet::default(), ClientSettings::default()).await?;
//! let reading = session.poll_fast_meter(AccessLevel::Acc).await?;
//! println!("IA = {:?}", reading.analog("IA"));
//! # Ok(())
//! # }
//! ```

mod access;
mod autoconfig;
mod poll;
pub mod profile;

use std::sync::Arc;

use log::{debug, info, warn};

use crate::error::RelayError;
use crate::payload::{block_available, BlockParser, RelayIdentity, SelBlockParser};
use crate::relay::access::AccessLevel;
use crate::relay::commands::{contains, CommandCode, CommandSet};
use crate::relay::connection::RelayConnection;
use crate::settings::ClientSettings;
use crate::util::logging::log_frame_text;

pub use profile::{FastMeterVariant, RelayProfile};

/// Client session with one relay.
pub struct RelaySession<C, P = SelBlockParser> {
    conn: C,
    commands: CommandSet,
    settings: ClientSettings,
    parser: P,
    level: AccessLevel,
    profile: Option<Arc<RelayProfile>>,
}

impl<C: RelayConnection> RelaySession<C, SelBlockParser> {
    /// Wrap a connection without talking to the relay.
    ///
    /// The session believes the relay is at level 0 until it queries or
    /// changes the level.
    pub fn new(conn: C, commands: CommandSet, settings: ClientSettings) -> Self {
        Self::with_parser(conn, commands, settings, SelBlockParser)
    }

    /// Verify the connection, log out and, when the settings ask for it,
    /// auto-configure.
    pub async fn connect(
        conn: C,
        commands: CommandSet,
        settings: ClientSettings,
    ) -> Result<Self, RelayError> {
        Self::new(conn, commands, settings).start().await
    }
}

impl<C: RelayConnection, P: BlockParser> RelaySession<C, P> {
    pub fn with_parser(conn: C, commands: CommandSet, settings: ClientSettings, parser: P) -> Self {
        RelaySession {
            conn,
            commands,
            settings,
            parser,
            level: AccessLevel::Zero,
            profile: None,
        }
    }

    /// Run the connect sequence on a session built with [`Self::with_parser`].
    pub async fn start(mut self) -> Result<Self, RelayError> {
        let attempts = self.settings.verify_attempts;
        if !self
            .verify_connection(attempts, self.settings.inter_attempt_delay)
            .await?
        {
            return Err(RelayError::ConnectionUnverified { attempts });
        }
        self.logout().await?;
        if self.settings.autoconfig_on_connect {
            self.autoconfigure().await?;
        }
        Ok(self)
    }

    /// Level the session last observed at the relay prompt.
    pub fn access_level(&self) -> AccessLevel {
        self.level
    }

    /// Result of the last completed auto-configuration.
    pub fn profile(&self) -> Option<&RelayProfile> {
        self.profile.as_deref()
    }

    pub fn is_configured(&self) -> bool {
        self.profile.is_some()
    }

    pub fn identity(&self) -> Option<&RelayIdentity> {
        self.profile().map(|p| &p.identity)
    }

    pub fn commands(&self) -> &CommandSet {
        &self.commands
    }

    pub fn settings(&self) -> &ClientSettings {
        &self.settings
    }

    pub fn connection(&self) -> &C {
        &self.conn
    }

    pub fn connection_mut(&mut self) -> &mut C {
        &mut self.conn
    }

    /// End the session and return the connection.
    pub fn into_connection(self) -> C {
        self.conn
    }

    async fn send(&mut self, data: &[u8]) -> Result<(), RelayError> {
        self.conn.write(data).await
    }

    async fn pause(&self, duration: std::time::Duration) {
        if !duration.is_zero() {
            tokio::time::sleep(duration).await;
        }
    }

    async fn read_until_marker(&mut self, marker: &[u8]) -> Result<Vec<u8>, RelayError> {
        let response = self.conn.read_until(marker, self.settings.read_timeout).await?;
        log_frame_text("Rx", &response);
        Ok(response)
    }

    /// Read everything up to and including the next prompt.
    pub async fn read_to_prompt(&mut self) -> Result<Vec<u8>, RelayError> {
        let prompt = self.commands.prompt.clone();
        self.read_until_marker(&prompt).await
    }

    /// Keep reading prompt-terminated chunks until `complete` accepts the
    /// accumulated response.
    ///
    /// A read that times out or adds no bytes counts as idle; after
    /// `max_idle_reads` consecutive idle reads the wait ends with
    /// [`RelayError::CommandEchoMissing`].
    async fn read_response_until<F>(&mut self, label: &[u8], complete: F) -> Result<Vec<u8>, RelayError>
    where
        F: Fn(&[u8]) -> bool,
    {
        let mut response = Vec::new();
        let mut idle = 0;
        while !complete(&response) {
            if idle >= self.settings.max_idle_reads {
                return Err(RelayError::CommandEchoMissing {
                    command: String::from_utf8_lossy(label).into_owned(),
                    reads: idle,
                });
            }
            let before = response.len();
            match self.read_to_prompt().await {
                Ok(chunk) => response.extend_from_slice(&chunk),
                Err(RelayError::Timeout(_)) => {}
                Err(e) => return Err(e),
            }
            idle = if response.len() == before { idle + 1 } else { 0 };
        }
        Ok(response)
    }

    /// Read until the echo of `command` (without line terminators) shows up.
    pub async fn read_command_response(&mut self, command: &[u8]) -> Result<Vec<u8>, RelayError> {
        let echo: Vec<u8> = command
            .iter()
            .copied()
            .filter(|b| *b != b'\r' && *b != b'\n')
            .collect();
        self.read_response_until(&echo, |response| contains(response, &echo))
            .await
    }

    /// Read until the whole block answering `code` has arrived, or the relay
    /// rejects the request.
    ///
    /// A binary block may itself contain the prompt bytes, so a single
    /// prompt-terminated read is not enough.
    pub async fn read_block_response(&mut self, code: CommandCode) -> Result<Vec<u8>, RelayError> {
        let invalid = self.commands.invalid.clone();
        let label = code.to_string();
        self.read_response_until(label.as_bytes(), |response| {
            block_available(response, code) || contains(response, &invalid)
        })
        .await
    }

    /// Probe with carriage returns until `clean_prompt_count` consecutive
    /// replies are nothing but a prompt, then discard anything left over.
    pub async fn read_clean_prompt(&mut self) -> Result<(), RelayError> {
        let wanted = self.settings.clean_prompt_count;
        let mut clean = 0;
        let mut probes = 0;
        while clean < wanted {
            if probes >= self.settings.max_clean_prompt_probes {
                warn!("No clean prompt after {probes} probes, continuing");
                break;
            }
            probes += 1;

            let cr = self.commands.carriage_return.clone();
            self.send(&cr).await?;
            let chunk = self.read_to_prompt().await?;
            if self.commands.is_clean_prompt(&chunk) {
                clean += 1;
            } else {
                clean = 0;
            }
            self.pause(self.settings.inter_attempt_delay).await;
        }

        self.clear_input_buffer().await?;
        self.pause(self.settings.inter_attempt_delay).await;
        Ok(())
    }

    /// Drain the connection until nothing more arrives.
    pub async fn clear_input_buffer(&mut self) -> Result<(), RelayError> {
        loop {
            let discarded = self.conn.drain_available().await?;
            if discarded.is_empty() {
                return Ok(());
            }
            debug!("Discarded {} bytes", discarded.len());
            log_frame_text("Discarded", &discarded);
            self.pause(self.settings.drain_poll_interval).await;
        }
    }

    fn store_profile(&mut self, profile: RelayProfile) {
        info!("Relay {} configured", profile.identity.fid);
        self.profile = Some(Arc::new(profile));
    }
}
