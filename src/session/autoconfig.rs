//! Auto-configuration: learn the relay's dialect, layouts and identity.

use log::{debug, info, warn};

use crate::error::RelayError;
use crate::payload::{BlockParser, FastMeterConfig};
use crate::relay::access::AccessLevel;
use crate::relay::connection::RelayConnection;
use crate::session::profile::{FastMeterVariant, RelayProfile};
use crate::session::RelaySession;

impl<C: RelayConnection, P: BlockParser> RelaySession<C, P> {
    /// Run the auto-configuration sequence and return the relay's FID.
    ///
    /// 1. reach ACC if the relay is at level 0
    /// 2. read the relay definition block
    /// 3. read the configuration block of each fast-meter variant the
    ///    definition names; a variant whose block does not parse is left
    ///    unconfigured without aborting the others
    /// 4. read the DNA table
    /// 5. read the ID block
    ///
    /// Any earlier profile is discarded when the sequence starts, and the new
    /// one is stored only once every step has succeeded.
    pub async fn autoconfigure(&mut self) -> Result<String, RelayError> {
        if self.profile.take().is_some() {
            info!("Discarding previous relay profile");
        }

        let (level, _) = self.query_access_level().await?;
        if level == AccessLevel::Zero {
            self.require_level(AccessLevel::Acc, None).await?;
        }

        self.read_clean_prompt().await?;
        let code = self.commands.relay_definition;
        let cr = self.commands.carriage_return.clone();
        self.send(&code.request(&cr)).await?;
        let raw = self.read_block_response(code).await?;
        let definition = self.parser.parse_relay_definition(&raw, code)?;
        debug!(
            "Relay defines {} fast meter messages, {} protocols",
            definition.fast_meter.len(),
            definition.protocols.len()
        );

        let mut fast_meter: [Option<FastMeterConfig>; 3] = Default::default();
        for variant in FastMeterVariant::ALL {
            let Some(info) = definition.fast_meter.get(variant.index()).copied() else {
                debug!("Relay does not define {variant} fast meter");
                continue;
            };

            self.read_clean_prompt().await?;
            self.send(&info.config_command.request(&cr)).await?;
            let raw = self.read_block_response(info.config_command).await?;
            match self.parser.parse_fast_meter_config(&raw, info.config_command) {
                Ok(config) => {
                    fast_meter[variant.index()] = Some(config.with_data_command(info.command))
                }
                Err(e) => warn!("Skipping {variant} fast meter configuration: {e}"),
            }
        }

        self.read_clean_prompt().await?;
        let dna_command = self.commands.dna.clone();
        self.send(&dna_command).await?;
        let raw = self.read_command_response(&dna_command).await?;
        let dna = self.parser.parse_dna(&raw)?;

        let id_command = self.commands.id.clone();
        self.send(&id_command).await?;
        let raw = self.read_command_response(&id_command).await?;
        let identity = self.parser.parse_identity(&raw)?;

        let fid = identity.fid.clone();
        self.store_profile(RelayProfile {
            definition,
            fast_meter,
            dna,
            identity,
        });
        Ok(fid)
    }
}
