//! Required karma levels shown on each side of a gate.
//!
//! Six ordinary tiers plus the special `D` tier. Levels travel through save
//! data by tag and through displays as a normalized float.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum KarmaLevel {
    #[default]
    L0,
    L1,
    L2,
    L3,
    L4,
    L5,
    D,
}

impl KarmaLevel {
    const TIERS: [KarmaLevel; 6] = [
        KarmaLevel::L0,
        KarmaLevel::L1,
        KarmaLevel::L2,
        KarmaLevel::L3,
        KarmaLevel::L4,
        KarmaLevel::L5,
    ];

    /// Tier index, `-1` for `D`.
    pub fn index(self) -> i32 {
        match self {
            KarmaLevel::D => -1,
            other => Self::TIERS.iter().position(|t| *t == other).unwrap_or(0) as i32,
        }
    }

    /// Normalized value in `0.0..=1.0`. `D` reads as fully charged.
    pub fn as_float(self) -> f32 {
        match self {
            KarmaLevel::D => 1.0,
            other => other.index() as f32 / 5.0,
        }
    }

    /// Nearest ordinary tier for a normalized value; never returns `D`.
    pub fn from_float(value: f32) -> KarmaLevel {
        let clamped = if value.is_nan() { 0.0 } else { value.clamp(0.0, 1.0) };
        let bucket = ((clamped * 6.0).floor() as usize).min(5);
        Self::TIERS[bucket]
    }

    /// `-1` and `6` map to `D`; anything else is clamped into `0..=5`.
    pub fn from_index(index: i32) -> KarmaLevel {
        if index == -1 || index == 6 {
            return KarmaLevel::D;
        }
        Self::TIERS[index.clamp(0, 5) as usize]
    }

    pub fn tag(self) -> &'static str {
        match self {
            KarmaLevel::L0 => "LEVEL_0",
            KarmaLevel::L1 => "LEVEL_1",
            KarmaLevel::L2 => "LEVEL_2",
            KarmaLevel::L3 => "LEVEL_3",
            KarmaLevel::L4 => "LEVEL_4",
            KarmaLevel::L5 => "LEVEL_5",
            KarmaLevel::D => "LEVEL_D",
        }
    }

    /// Parse a save tag. Unknown tags fall back to `L0`.
    pub fn from_tag(tag: &str) -> KarmaLevel {
        match tag {
            "LEVEL_1" => KarmaLevel::L1,
            "LEVEL_2" => KarmaLevel::L2,
            "LEVEL_3" => KarmaLevel::L3,
            "LEVEL_4" => KarmaLevel::L4,
            "LEVEL_5" => KarmaLevel::L5,
            "LEVEL_D" => KarmaLevel::D,
            _ => KarmaLevel::L0,
        }
    }
}
