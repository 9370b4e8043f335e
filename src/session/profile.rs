//! What auto-configuration learns about a relay.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::RelayError;
use crate::payload::{DnaDefinition, FastMeterCommandInfo, FastMeterConfig, RelayDefinition, RelayIdentity};
use crate::relay::commands::CommandCode;

/// The three fast-meter messages a relay can define.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FastMeterVariant {
    Regular,
    Demand,
    PeakDemand,
}

impl FastMeterVariant {
    pub const ALL: [FastMeterVariant; 3] = [
        FastMeterVariant::Regular,
        FastMeterVariant::Demand,
        FastMeterVariant::PeakDemand,
    ];

    /// Position of the variant in the relay definition block.
    pub fn index(self) -> usize {
        match self {
            FastMeterVariant::Regular => 0,
            FastMeterVariant::Demand => 1,
            FastMeterVariant::PeakDemand => 2,
        }
    }
}

impl fmt::Display for FastMeterVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            FastMeterVariant::Regular => "regular",
            FastMeterVariant::Demand => "demand",
            FastMeterVariant::PeakDemand => "peak-demand",
        })
    }
}

impl FromStr for FastMeterVariant {
    type Err = RelayError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "regular" => Ok(FastMeterVariant::Regular),
            "demand" => Ok(FastMeterVariant::Demand),
            "peak-demand" | "peak" => Ok(FastMeterVariant::PeakDemand),
            other => Err(RelayError::InvalidInput(format!("unknown fast meter variant: {other}"))),
        }
    }
}

/// Relay dialect, layouts and identity from one complete auto-configuration.
///
/// A profile is built in full before it is stored, so a session either has
/// a complete profile or none.
#[derive(Debug, Clone)]
pub struct RelayProfile {
    pub definition: RelayDefinition,
    /// Configuration per variant, indexed by [`FastMeterVariant::index`].
    /// `None` when the relay does not define the variant or its block did not parse.
    pub fast_meter: [Option<FastMeterConfig>; 3],
    pub dna: DnaDefinition,
    pub identity: RelayIdentity,
}

impl RelayProfile {
    /// Configuration and data command of `variant`.
    pub fn command_info(&self, variant: FastMeterVariant) -> Option<&FastMeterCommandInfo> {
        self.definition.fast_meter.get(variant.index())
    }

    pub fn config(&self, variant: FastMeterVariant) -> Option<&FastMeterConfig> {
        self.fast_meter[variant.index()].as_ref()
    }

    pub fn fast_operate_command(&self) -> Option<CommandCode> {
        self.definition.fast_operate_command
    }

    pub fn fast_message_command(&self) -> Option<CommandCode> {
        self.definition.fast_message_command
    }

    pub fn fid(&self) -> &str {
        &self.identity.fid
    }
}
