//! Simulated relay for testing
//!
//! [`MockRelay`] implements [`RelayConnection`] without any I/O. It keeps an
//! access level, answers carriage returns with the prompt of that level,
//! walks the password exchange for `ACC`/`2AC`/`CAL`, and serves scripted
//! responses for any other command line. Every write is recorded so tests can
//! assert on exactly what a session transmitted.

use std::collections::{HashMap, VecDeque};
use std::time::Duration;

use async_trait::async_trait;

use crate::constants;
use crate::error::RelayError;
use crate::relay::access::AccessLevel;
use crate::relay::commands::{find_subsequence, CommandCode};
use crate::relay::connection::RelayConnection;

#[derive(Debug, Clone)]
struct Exchange {
    response: Vec<u8>,
    min_level: AccessLevel,
    echo: bool,
}

/// Scriptable stand-in for a relay.
#[derive(Debug, Clone)]
pub struct MockRelay {
    level: AccessLevel,
    passwords: HashMap<AccessLevel, String>,
    awaiting_password: Option<AccessLevel>,
    exchanges: HashMap<Vec<u8>, Exchange>,
    pending: Vec<u8>,
    rx: VecDeque<u8>,
    writes: Vec<Vec<u8>>,
    silent: bool,
    disconnected: bool,
}

impl Default for MockRelay {
    fn default() -> Self {
        Self::new()
    }
}

impl MockRelay {
    /// A relay at level 0 with factory passwords.
    pub fn new() -> Self {
        let passwords = HashMap::from([
            (AccessLevel::Acc, constants::PASS_ACC.to_string()),
            (AccessLevel::TwoAc, constants::PASS_2AC.to_string()),
            (AccessLevel::Cal, constants::PASS_CAL.to_string()),
        ]);
        MockRelay {
            level: AccessLevel::Zero,
            passwords,
            awaiting_password: None,
            exchanges: HashMap::new(),
            pending: Vec::new(),
            rx: VecDeque::new(),
            writes: Vec::new(),
            silent: false,
            disconnected: false,
        }
    }

    pub fn with_password(mut self, level: AccessLevel, password: &str) -> Self {
        self.passwords.insert(level, password.to_string());
        self
    }

    pub fn at_level(mut self, level: AccessLevel) -> Self {
        self.level = level;
        self
    }

    /// A relay that never answers.
    pub fn silent(mut self) -> Self {
        self.silent = true;
        self
    }

    /// Serve `response` whenever the binary command `code` arrives. Like a
    /// real relay, the request bytes and CR LF are echoed ahead of the block.
    pub fn respond_binary(&mut self, code: CommandCode, response: &[u8]) {
        self.exchanges.insert(
            code.as_bytes().to_vec(),
            Exchange {
                response: response.to_vec(),
                min_level: AccessLevel::Zero,
                echo: true,
            },
        );
    }

    /// Serve an ASCII command: the relay echoes the command line, prints
    /// `response` and re-prompts. Below `min_level` the relay refuses.
    pub fn respond_text(&mut self, command: &str, min_level: AccessLevel, response: &[u8]) {
        self.exchanges.insert(
            command.as_bytes().to_vec(),
            Exchange {
                response: response.to_vec(),
                min_level,
                echo: true,
            },
        );
    }

    /// Append raw bytes to what the relay will send next.
    pub fn queue_rx_data(&mut self, data: &[u8]) {
        self.rx.extend(data);
    }

    /// Make every following operation fail as if the link dropped.
    pub fn disconnect(&mut self) {
        self.disconnected = true;
    }

    pub fn level(&self) -> AccessLevel {
        self.level
    }

    /// Every buffer passed to `write`, in order.
    pub fn writes(&self) -> &[Vec<u8>] {
        &self.writes
    }

    /// Number of writes exactly equal to `data`.
    pub fn count_writes(&self, data: &[u8]) -> usize {
        self.writes.iter().filter(|w| w.as_slice() == data).count()
    }

    pub fn clear_writes(&mut self) {
        self.writes.clear();
    }

    fn push(&mut self, data: &[u8]) {
        self.rx.extend(data);
    }

    fn push_prompt(&mut self) {
        let prompt: &[u8] = match self.level {
            AccessLevel::Zero => constants::LEVEL_0,
            AccessLevel::Acc => constants::LEVEL_1,
            AccessLevel::TwoAc => constants::LEVEL_2,
            AccessLevel::Cal => constants::LEVEL_C,
        };
        self.push(prompt);
    }

    fn echo(&mut self, line: &[u8]) {
        self.push(line);
        self.push(constants::CR);
    }

    fn handle_line(&mut self, line: Vec<u8>) {
        if let Some(target) = self.awaiting_password.take() {
            let accepted = self
                .passwords
                .get(&target)
                .is_some_and(|password| password.as_bytes() == line.as_slice());
            if accepted {
                self.level = target;
                let banner = format!("\r\n\r\nLevel {}\r\n", target.number());
                self.push(banner.as_bytes());
            } else {
                self.push(b"\r\nInvalid Password\r\n");
            }
            self.push_prompt();
            return;
        }

        let go_target = match line.as_slice() {
            b"ACC" => Some(AccessLevel::Acc),
            b"2AC" => Some(AccessLevel::TwoAc),
            b"CAL" => Some(AccessLevel::Cal),
            _ => None,
        };

        if line.is_empty() {
            self.push_prompt();
        } else if line.as_slice() == b"QUI" {
            self.echo(&line);
            self.level = AccessLevel::Zero;
            self.push_prompt();
        } else if let Some(target) = go_target {
            self.echo(&line);
            if target <= self.level {
                self.level = target;
                self.push_prompt();
            } else if target == AccessLevel::Acc || self.level >= AccessLevel::Acc {
                self.awaiting_password = Some(target);
                self.push(b"Password: ? ");
            } else {
                self.push(b"\r\nInvalid Access Level\r\n");
                self.push_prompt();
            }
        } else if let Some(exchange) = self.exchanges.get(&line).cloned() {
            if exchange.echo {
                self.echo(&line);
            }
            if self.level < exchange.min_level {
                self.push(b"\r\nInvalid Access Level\r\n");
            } else {
                self.push(&exchange.response);
            }
            self.push_prompt();
        } else {
            self.echo(&line);
            self.push(b"\r\nInvalid Command\r\n");
            self.push_prompt();
        }
    }

    fn check_link(&self) -> Result<(), RelayError> {
        if self.disconnected {
            Err(RelayError::Transport("mock relay disconnected".into()))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl RelayConnection for MockRelay {
    async fn write(&mut self, data: &[u8]) -> Result<(), RelayError> {
        self.check_link()?;
        self.writes.push(data.to_vec());
        if self.silent {
            return Ok(());
        }

        self.pending.extend_from_slice(data);
        while let Some(pos) = find_subsequence(&self.pending, constants::CR) {
            let line: Vec<u8> = self.pending.drain(..pos + constants::CR.len()).take(pos).collect();
            self.handle_line(line);
        }
        Ok(())
    }

    async fn read_until(
        &mut self,
        delimiter: &[u8],
        timeout: Duration,
    ) -> Result<Vec<u8>, RelayError> {
        self.check_link()?;
        let buffered = self.rx.make_contiguous();
        let take = match find_subsequence(buffered, delimiter) {
            Some(pos) => pos + delimiter.len(),
            None if buffered.is_empty() => return Err(RelayError::Timeout(timeout)),
            None => buffered.len(),
        };
        Ok(self.rx.drain(..take).collect())
    }

    async fn drain_available(&mut self) -> Result<Vec<u8>, RelayError> {
        self.check_link()?;
        Ok(self.rx.drain(..).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const WAIT: Duration = Duration::from_millis(10);

    #[tokio::test]
    async fn test_prompt_follows_level() {
        let mut relay = MockRelay::new().at_level(AccessLevel::Acc);
        relay.write(b"\r\n").await.unwrap();
        assert_eq!(relay.drain_available().await.unwrap(), b"\r\n=>");
    }

    #[tokio::test]
    async fn test_password_exchange() {
        let mut relay = MockRelay::new();
        relay.write(b"ACC\r\n").await.unwrap();
        relay.write(b"OTTER\r\n").await.unwrap();
        assert_eq!(relay.level(), AccessLevel::Acc);

        let response = relay.drain_available().await.unwrap();
        assert!(find_subsequence(&response, b"Level 1").is_some());
        assert!(response.ends_with(b"\r\n=>"));
    }

    #[tokio::test]
    async fn test_wrong_password_keeps_level() {
        let mut relay = MockRelay::new();
        relay.write(b"ACC\r\n").await.unwrap();
        relay.write(b"WRONG\r\n").await.unwrap();
        assert_eq!(relay.level(), AccessLevel::Zero);
        let response = relay.drain_available().await.unwrap();
        assert!(find_subsequence(&response, b"Invalid").is_some());
    }

    #[tokio::test]
    async fn test_read_until_semantics() {
        let mut relay = MockRelay::new();
        assert!(matches!(
            relay.read_until(b"\r\n=", WAIT).await,
            Err(RelayError::Timeout(_))
        ));

        relay.queue_rx_data(b"abc\r\n=>");
        assert_eq!(relay.read_until(b"\r\n=", WAIT).await.unwrap(), b"abc\r\n=");
        assert_eq!(relay.read_until(b"\r\n=", WAIT).await.unwrap(), b">");
    }

    #[tokio::test]
    async fn test_refuses_below_min_level() {
        let mut relay = MockRelay::new();
        relay.respond_text("DNA", AccessLevel::Acc, b"\"EN\",\"*\"\r\n");
        relay.write(b"DNA\r\n").await.unwrap();
        let response = relay.drain_available().await.unwrap();
        assert!(find_subsequence(&response, b"Invalid Access Level").is_some());
    }

    #[tokio::test]
    async fn test_binary_request_is_echoed() {
        let code = CommandCode::new([0xA5, 0xC0]);
        let mut relay = MockRelay::new();
        relay.respond_binary(code, b"BLOCK");
        relay.write(&code.request(constants::CR)).await.unwrap();
        assert_eq!(
            relay.drain_available().await.unwrap(),
            b"\xA5\xC0\r\nBLOCK\r\n=".to_vec()
        );
    }

    #[tokio::test]
    async fn test_disconnect() {
        let mut relay = MockRelay::new();
        relay.disconnect();
        assert!(matches!(relay.write(b"\r\n").await, Err(RelayError::Transport(_))));
    }
}
