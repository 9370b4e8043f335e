//! Relay access levels.

use std::fmt;

use serde::{Deserialize, Serialize};

/// The relay's privilege ladder, ordered from no access to calibration.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum AccessLevel {
    /// Logged out; only the level-0 prompt is available.
    #[default]
    Zero,
    /// ACC
    Acc,
    /// 2AC
    TwoAc,
    /// CAL
    Cal,
}

impl AccessLevel {
    /// All levels in ladder order.
    pub const LADDER: [AccessLevel; 4] = [
        AccessLevel::Zero,
        AccessLevel::Acc,
        AccessLevel::TwoAc,
        AccessLevel::Cal,
    ];

    /// Numeric level as the relay documents it.
    pub fn number(self) -> u8 {
        self as u8
    }

    pub fn from_number(level: u8) -> Option<Self> {
        Self::LADDER.get(level as usize).copied()
    }

    /// Relay label for the level; empty for level 0.
    pub fn label(self) -> &'static str {
        match self {
            AccessLevel::Zero => "",
            AccessLevel::Acc => "ACC",
            AccessLevel::TwoAc => "2AC",
            AccessLevel::Cal => "CAL",
        }
    }

    /// The rung immediately below this one.
    pub fn predecessor(self) -> Option<Self> {
        match self {
            AccessLevel::Zero => None,
            other => Self::from_number(other.number() - 1),
        }
    }

    /// Rungs strictly above `self` up to and including `target`.
    pub fn rungs_to(self, target: AccessLevel) -> impl Iterator<Item = AccessLevel> {
        Self::LADDER
            .into_iter()
            .filter(move |level| *level > self && *level <= target)
    }
}

impl fmt::Display for AccessLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AccessLevel::Zero => write!(f, "level 0"),
            other => write!(f, "level {} ({})", other.number(), other.label()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ordering_and_numbers() {
        assert!(AccessLevel::Zero < AccessLevel::Acc);
        assert!(AccessLevel::TwoAc < AccessLevel::Cal);
        assert_eq!(AccessLevel::Cal.number(), 3);
        assert_eq!(AccessLevel::from_number(2), Some(AccessLevel::TwoAc));
        assert_eq!(AccessLevel::from_number(4), None);
    }

    #[test]
    fn test_rungs() {
        let rungs: Vec<_> = AccessLevel::Zero.rungs_to(AccessLevel::TwoAc).collect();
        assert_eq!(rungs, vec![AccessLevel::Acc, AccessLevel::TwoAc]);
        assert_eq!(AccessLevel::Cal.rungs_to(AccessLevel::Acc).count(), 0);
        assert_eq!(AccessLevel::TwoAc.predecessor(), Some(AccessLevel::Acc));
        assert_eq!(AccessLevel::Zero.predecessor(), None);
    }

    #[test]
    fn test_display() {
        assert_eq!(AccessLevel::Zero.to_string(), "level 0");
        assert_eq!(AccessLevel::TwoAc.to_string(), "level 2 (2AC)");
    }
}
