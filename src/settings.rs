//! # Client Settings
//!
//! Tunables of a relay session: probe budgets, inter-send delays, read
//! timeouts, the poll elevation policy and the access-level passwords.
//! Settings deserialize from JSON; every field is optional and falls back to
//! its default.

use std::fmt;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::constants::*;
use crate::error::RelayError;
use crate::relay::access::AccessLevel;

/// What a poll does when it cannot reach its minimum access level.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ElevationPolicy {
    /// Log the failure and poll anyway.
    #[default]
    BestEffort,
    /// Abort the poll with `AuthenticationRejected`.
    Required,
}

/// Access-level passwords, wiped from memory when dropped.
///
/// Defaults are per field: a struct-level serde default would move fields
/// out of a value that implements `Drop`.
#[derive(Clone, Serialize, Deserialize, Zeroize, ZeroizeOnDrop)]
pub struct Passwords {
    #[serde(default = "default_acc")]
    pub acc: String,
    #[serde(rename = "2ac", default = "default_two_ac")]
    pub two_ac: String,
    #[serde(default = "default_cal")]
    pub cal: String,
}

fn default_acc() -> String {
    PASS_ACC.to_string()
}

fn default_two_ac() -> String {
    PASS_2AC.to_string()
}

fn default_cal() -> String {
    PASS_CAL.to_string()
}

impl Default for Passwords {
    fn default() -> Self {
        Passwords {
            acc: default_acc(),
            two_ac: default_two_ac(),
            cal: default_cal(),
        }
    }
}

impl Passwords {
    pub fn for_level(&self, level: AccessLevel) -> Option<&str> {
        match level {
            AccessLevel::Zero => None,
            AccessLevel::Acc => Some(&self.acc),
            AccessLevel::TwoAc => Some(&self.two_ac),
            AccessLevel::Cal => Some(&self.cal),
        }
    }
}

impl fmt::Debug for Passwords {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Passwords { .. }")
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientSettings {
    /// Probe attempts before a connection counts as unverified.
    pub verify_attempts: u32,
    #[serde(with = "duration_ms")]
    pub inter_attempt_delay: Duration,
    /// Pause before and after each password transmission.
    #[serde(with = "duration_ms")]
    pub password_delay: Duration,
    #[serde(with = "duration_ms")]
    pub read_timeout: Duration,
    /// Consecutive reads without new bytes before an echo wait gives up.
    pub max_idle_reads: u32,
    pub clean_prompt_count: u32,
    pub max_clean_prompt_probes: u32,
    #[serde(with = "duration_ms")]
    pub drain_poll_interval: Duration,
    pub elevation_policy: ElevationPolicy,
    pub autoconfig_on_connect: bool,
    #[serde(skip_serializing)]
    pub passwords: Passwords,
}

impl Default for ClientSettings {
    fn default() -> Self {
        ClientSettings {
            verify_attempts: DEFAULT_VERIFY_ATTEMPTS,
            inter_attempt_delay: Duration::from_millis(DEFAULT_INTER_ATTEMPT_DELAY_MS),
            password_delay: Duration::from_millis(DEFAULT_PASSWORD_DELAY_MS),
            read_timeout: Duration::from_millis(DEFAULT_READ_TIMEOUT_MS),
            max_idle_reads: DEFAULT_MAX_IDLE_READS,
            clean_prompt_count: DEFAULT_CLEAN_PROMPT_COUNT,
            max_clean_prompt_probes: DEFAULT_MAX_CLEAN_PROMPT_PROBES,
            drain_poll_interval: Duration::from_millis(DEFAULT_DRAIN_POLL_INTERVAL_MS),
            elevation_policy: ElevationPolicy::default(),
            autoconfig_on_connect: true,
            passwords: Passwords::default(),
        }
    }
}

impl ClientSettings {
    pub fn from_json_str(json: &str) -> Result<Self, RelayError> {
        serde_json::from_str(json).map_err(|e| RelayError::Settings(e.to_string()))
    }

    /// Load settings from a JSON file.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, RelayError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)
            .map_err(|e| RelayError::Settings(format!("{}: {e}", path.display())))?;
        Self::from_json_str(&json)
    }

    /// Settings with every wait set to zero, for simulated relays.
    pub fn immediate() -> Self {
        ClientSettings {
            inter_attempt_delay: Duration::ZERO,
            password_delay: Duration::ZERO,
            read_timeout: Duration::from_millis(50),
            drain_poll_interval: Duration::ZERO,
            ..Self::default()
        }
    }
}

/// Serde adapter storing a `Duration` as integer milliseconds.
pub mod duration_ms {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(duration.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}
