//! Connection verification and the access-level ladder.

use std::time::Duration;

use log::{debug, info, warn};
use zeroize::Zeroizing;

use crate::error::RelayError;
use crate::payload::BlockParser;
use crate::relay::access::AccessLevel;
use crate::relay::commands::contains;
use crate::relay::connection::RelayConnection;
use crate::session::RelaySession;

impl<C: RelayConnection, P: BlockParser> RelaySession<C, P> {
    /// Probe with carriage returns until the level-0 prompt answers.
    ///
    /// A probe that times out counts as a failed attempt. Returns `false`
    /// once `max_attempts` probes went unanswered.
    pub async fn verify_connection(
        &mut self,
        max_attempts: u32,
        inter_attempt_delay: Duration,
    ) -> Result<bool, RelayError> {
        let probe = self.commands.carriage_return.repeat(3);
        let level_0 = self.commands.level_0.clone();

        for attempt in 1..=max_attempts {
            self.send(&probe).await?;
            match self.read_until_marker(&level_0).await {
                Ok(response) if contains(&response, &level_0) => {
                    info!("Relay answered on attempt {attempt}");
                    return Ok(true);
                }
                Ok(_) | Err(RelayError::Timeout(_)) => {
                    debug!("No prompt on attempt {attempt}/{max_attempts}");
                }
                Err(e) => return Err(e),
            }
            self.pause(inter_attempt_delay).await;
        }

        warn!("Relay did not answer after {max_attempts} attempts");
        Ok(false)
    }

    /// Ask the relay for its current level.
    ///
    /// Two probes are sent and their replies combined, so a prompt split
    /// across reads is still recognised. The highest marker present wins.
    pub async fn query_access_level(&mut self) -> Result<(AccessLevel, &'static str), RelayError> {
        let cr = self.commands.carriage_return.clone();
        self.send(&cr).await?;
        let mut response = self.read_to_prompt().await?;
        self.send(&cr).await?;
        response.extend_from_slice(&self.read_to_prompt().await?);

        let level = self.commands.highest_level_in(&response);
        if level != self.level {
            debug!("Relay is at {level}, session believed {}", self.level);
        }
        self.level = level;
        Ok((level, level.label()))
    }

    /// Drop to level 0.
    pub async fn logout(&mut self) -> Result<(), RelayError> {
        let quit = self.commands.quit.clone();
        let level_0 = self.commands.level_0.clone();
        self.send(&quit).await?;
        self.level = AccessLevel::Zero;
        self.read_until_marker(&level_0).await?;
        self.read_clean_prompt().await?;
        info!("Logged out");
        Ok(())
    }

    /// Move the relay to `target`, one rung at a time.
    ///
    /// Every escalating rung sends its go command followed by a password:
    /// `password` for the target rung (falling back to the settings), the
    /// settings password for rungs below it. Lower targets are reached with
    /// the go command alone, and level 0 with a logout. The level is re-read
    /// from the relay before the walk and after every rung.
    ///
    /// Returns `false` when the relay rejects a password or does not show
    /// the expected prompt afterwards.
    pub async fn elevate_to(
        &mut self,
        target: AccessLevel,
        password: Option<&str>,
    ) -> Result<bool, RelayError> {
        if target == AccessLevel::Zero {
            self.logout().await?;
            return Ok(true);
        }

        self.pause(self.settings.inter_attempt_delay).await;
        let (current, _) = self.query_access_level().await?;

        if current > target {
            let go = self.go_command(target)?;
            self.send(&go).await?;
            let (now, _) = self.query_access_level().await?;
            return Ok(now == target);
        }

        for rung in current.rungs_to(target) {
            let go = self.go_command(rung)?;
            let secret = match password {
                Some(password) if rung == target => Zeroizing::new(password.to_string()),
                _ => Zeroizing::new(
                    self.settings
                        .passwords
                        .for_level(rung)
                        .unwrap_or_default()
                        .to_string(),
                ),
            };

            debug!("Requesting {rung}");
            self.send(&go).await?;
            let response = self.send_password(&secret).await?;

            if self.commands.is_rejection(&response) {
                warn!("Relay rejected the password for {rung}");
                return Ok(false);
            }
            let (now, _) = self.query_access_level().await?;
            if now < rung {
                warn!("Relay still at {now} after requesting {rung}");
                return Ok(false);
            }
        }

        info!("Relay at {target}");
        Ok(true)
    }

    /// [`Self::elevate_to`], failing with `AuthenticationRejected` instead of
    /// returning `false`.
    pub async fn require_level(
        &mut self,
        target: AccessLevel,
        password: Option<&str>,
    ) -> Result<(), RelayError> {
        if self.elevate_to(target, password).await? {
            Ok(())
        } else {
            Err(RelayError::AuthenticationRejected { level: target })
        }
    }

    fn go_command(&self, level: AccessLevel) -> Result<Vec<u8>, RelayError> {
        self.commands
            .go_command(level)
            .map(<[u8]>::to_vec)
            .ok_or_else(|| RelayError::InvalidInput(format!("no go command for {level}")))
    }

    /// Send a password line, padded by the settings delay on both sides, and
    /// read the reply up to the next prompt.
    async fn send_password(&mut self, password: &str) -> Result<Vec<u8>, RelayError> {
        let mut line = Zeroizing::new(password.as_bytes().to_vec());
        line.extend_from_slice(&self.commands.carriage_return);

        self.pause(self.settings.password_delay * 3).await;
        self.conn.write_sensitive(&line).await?;
        self.pause(self.settings.password_delay).await;

        let level_0 = self.commands.level_0.clone();
        self.read_until_marker(&level_0).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::relay::commands::CommandSet;
    use crate::relay::mock::MockRelay;
    use crate::settings::ClientSettings;

    fn session(relay: MockRelay) -> RelaySession<MockRelay> {
        RelaySession::new(relay, CommandSet::default(), ClientSettings::immediate())
    }

    #[tokio::test]
    async fn test_verify_connection() {
        let mut session = session(MockRelay::new());
        assert!(session.verify_connection(3, Duration::ZERO).await.unwrap());
    }

    #[tokio::test]
    async fn test_verify_silent_relay() {
        let mut session = session(MockRelay::new().silent());
        assert!(!session.verify_connection(3, Duration::ZERO).await.unwrap());
        assert_eq!(session.connection().count_writes(b"\r\n\r\n\r\n"), 3);
    }

    #[tokio::test]
    async fn test_query_reports_highest_marker() {
        let mut session = session(MockRelay::new().at_level(AccessLevel::TwoAc));
        assert_eq!(
            session.query_access_level().await.unwrap(),
            (AccessLevel::TwoAc, "2AC")
        );
        assert_eq!(session.access_level(), AccessLevel::TwoAc);
    }

    #[tokio::test]
    async fn test_elevate_sends_one_password() {
        let mut session = session(MockRelay::new());
        assert!(session.elevate_to(AccessLevel::Acc, Some("OTTER")).await.unwrap());
        assert_eq!(session.access_level(), AccessLevel::Acc);
        assert_eq!(session.connection().count_writes(b"OTTER\r\n"), 1);
    }

    #[tokio::test]
    async fn test_elevate_rejected() {
        let mut session = session(MockRelay::new());
        assert!(!session.elevate_to(AccessLevel::Acc, Some("BADGER")).await.unwrap());
        assert_eq!(session.access_level(), AccessLevel::Zero);
        assert!(matches!(
            session.require_level(AccessLevel::Acc, Some("BADGER")).await,
            Err(RelayError::AuthenticationRejected { level: AccessLevel::Acc })
        ));
    }

    #[tokio::test]
    async fn test_elevate_walks_ladder() {
        let mut session = session(MockRelay::new());
        assert!(session.elevate_to(AccessLevel::TwoAc, Some("TAIL")).await.unwrap());
        assert_eq!(session.connection().level(), AccessLevel::TwoAc);

        let writes = session.connection().writes();
        let acc = writes.iter().position(|w| w.as_slice() == b"ACC\r\n").unwrap();
        let two_ac = writes.iter().position(|w| w.as_slice() == b"2AC\r\n").unwrap();
        assert!(acc < two_ac);
        assert_eq!(session.connection().count_writes(b"OTTER\r\n"), 1);
        assert_eq!(session.connection().count_writes(b"TAIL\r\n"), 1);
    }

    #[tokio::test]
    async fn test_elevate_to_current_level_sends_nothing() {
        let mut session = session(MockRelay::new().at_level(AccessLevel::Acc));
        assert!(session.elevate_to(AccessLevel::Acc, None).await.unwrap());
        assert_eq!(session.connection().count_writes(b"ACC\r\n"), 0);
    }

    #[tokio::test]
    async fn test_deescalate_without_password() {
        let mut session = session(MockRelay::new().at_level(AccessLevel::TwoAc));
        assert!(session.elevate_to(AccessLevel::Acc, None).await.unwrap());
        assert_eq!(session.access_level(), AccessLevel::Acc);
        assert_eq!(session.connection().count_writes(b"OTTER\r\n"), 0);
    }

    #[tokio::test]
    async fn test_logout_resets_level() {
        let mut session = session(MockRelay::new().at_level(AccessLevel::Cal));
        session.logout().await.unwrap();
        assert_eq!(session.access_level(), AccessLevel::Zero);
        assert_eq!(session.connection().level(), AccessLevel::Zero);
    }
}
