//! Fast-meter polling.

use log::warn;

use crate::error::RelayError;
use crate::payload::{BlockParser, FastMeterReading};
use crate::relay::access::AccessLevel;
use crate::relay::connection::RelayConnection;
use crate::session::profile::FastMeterVariant;
use crate::session::RelaySession;
use crate::settings::ElevationPolicy;
use crate::util::logging::perf::PerfTimer;

impl<C: RelayConnection, P: BlockParser> RelaySession<C, P> {
    /// Poll one fast-meter variant.
    ///
    /// Fails with `NotConfigured` before touching the connection when the
    /// variant has no stored configuration.
    ///
    /// `minimum_level` may be any rung from ACC up to CAL. When the relay
    /// reports a lower level the session walks up to `minimum_level` first;
    /// a relay already at or above it is left where it is. A failed elevation
    /// is logged and ignored under [`ElevationPolicy::BestEffort`] and aborts
    /// the poll under [`ElevationPolicy::Required`]. Level 0 polls without
    /// any level check. Every call is a fresh round trip.
    pub async fn poll(
        &mut self,
        variant: FastMeterVariant,
        minimum_level: AccessLevel,
    ) -> Result<FastMeterReading, RelayError> {
        let profile = self
            .profile
            .clone()
            .ok_or(RelayError::NotConfigured("auto-configuration has not completed"))?;
        let command = profile
            .command_info(variant)
            .map(|info| info.command)
            .ok_or(RelayError::NotConfigured("relay does not define this fast meter"))?;
        let config = profile
            .config(variant)
            .ok_or(RelayError::NotConfigured("no fast meter configuration for this variant"))?;

        if minimum_level > AccessLevel::Zero {
            let (current, _) = self.query_access_level().await?;
            if current < minimum_level && !self.elevate_to(minimum_level, None).await? {
                match self.settings.elevation_policy {
                    ElevationPolicy::BestEffort => {
                        warn!("Could not reach {minimum_level}, polling anyway");
                    }
                    ElevationPolicy::Required => {
                        return Err(RelayError::AuthenticationRejected {
                            level: minimum_level,
                        });
                    }
                }
            }
        }

        self.read_clean_prompt().await?;
        let timer = PerfTimer::start("fast meter poll");
        let cr = self.commands.carriage_return.clone();
        self.send(&command.request(&cr)).await?;
        let raw = self.read_block_response(command).await?;
        let reading = self
            .parser
            .parse_fast_meter_data(&raw, command, config, &profile.dna)?;
        timer.finish();
        Ok(reading)
    }

    /// Poll the regular fast meter.
    pub async fn poll_fast_meter(
        &mut self,
        minimum_level: AccessLevel,
    ) -> Result<FastMeterReading, RelayError> {
        self.poll(FastMeterVariant::Regular, minimum_level).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::relay::commands::CommandSet;
    use crate::relay::mock::MockRelay;
    use crate::settings::ClientSettings;

    #[tokio::test]
    async fn test_poll_before_configuration_writes_nothing() {
        let mut session =
            RelaySession::new(MockRelay::new(), CommandSet::default(), ClientSettings::immediate());
        assert!(matches!(
            session.poll_fast_meter(AccessLevel::Acc).await,
            Err(RelayError::NotConfigured(_))
        ));
        assert!(session.connection().writes().is_empty());
    }
}
