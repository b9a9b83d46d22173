//! Airlock timings and geometry constants.
//!
//! All durations are in host ticks (20 ticks per second in the reference
//! host). [`GateConfig::default`] yields the stock airlock; hosts may load
//! an override from JSON.
//!
//! | Field | Default | Meaning |
//! |-------|---------|---------|
//! | `prepare_threshold` | 60 | Continuous occupancy before a side commits |
//! | `wash_threshold` | 300 | Ticks with the middle gate shut before it opens |
//! | `reset_delay` | 160 | Pause before the entry gate reopens |
//! | `cooldown` | 500 | Lockout after a completed cycle |
//! | `blink_half_period` | 15 | Lamp on/off half period |
//! | `chase_step` | 10 | Ticks per chase ring step |
//! | `zone_half_side` | 6.5 | Half the side length of an occupancy square |
//! | `side1_offset` | -4.0 | Side 1 zone offset along the normal axis |
//! | `side2_offset` | 5.0 | Side 2 zone offset along the normal axis |
//! | `min_light_radius` | 15 | Smallest radius used when binding lamps |

use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const PREPARE_THRESHOLD: u32 = 60;
pub const WASH_THRESHOLD: u32 = 300;
pub const RESET_DELAY: u32 = 160;
pub const COOLDOWN: u32 = 500;
pub const BLINK_HALF_PERIOD: u32 = 15;
pub const CHASE_STEP: u32 = 10;
pub const ZONE_HALF_SIDE: f64 = 6.5;
pub const SIDE1_OFFSET: f64 = -4.0;
pub const SIDE2_OFFSET: f64 = 5.0;
pub const MIN_LIGHT_RADIUS: i32 = 15;

/// Tunable airlock parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GateConfig {
    pub prepare_threshold: u32,
    pub wash_threshold: u32,
    pub reset_delay: u32,
    pub cooldown: u32,
    pub blink_half_period: u32,
    pub chase_step: u32,
    pub zone_half_side: f64,
    pub side1_offset: f64,
    pub side2_offset: f64,
    pub min_light_radius: i32,
}

impl Default for GateConfig {
    fn default() -> Self {
        Self {
            prepare_threshold: PREPARE_THRESHOLD,
            wash_threshold: WASH_THRESHOLD,
            reset_delay: RESET_DELAY,
            cooldown: COOLDOWN,
            blink_half_period: BLINK_HALF_PERIOD,
            chase_step: CHASE_STEP,
            zone_half_side: ZONE_HALF_SIDE,
            side1_offset: SIDE1_OFFSET,
            side2_offset: SIDE2_OFFSET,
            min_light_radius: MIN_LIGHT_RADIUS,
        }
    }
}

/// Why a configuration was rejected.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("{field} must be greater than zero")]
    Zero { field: &'static str },
    #[error("zone_half_side must be positive, got {0}")]
    ZoneSize(f64),
    #[error("side offsets must place side 1 below zero and side 2 above (got {side1}, {side2})")]
    SideOffsets { side1: f64, side2: f64 },
}

impl GateConfig {
    /// Parse a JSON document. Missing fields keep their defaults.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: GateConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json(&text)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let periods = [
            ("prepare_threshold", self.prepare_threshold),
            ("blink_half_period", self.blink_half_period),
            ("chase_step", self.chase_step),
        ];
        for (field, value) in periods {
            if value == 0 {
                return Err(ConfigError::Zero { field });
            }
        }
        if !(self.zone_half_side > 0.0) {
            return Err(ConfigError::ZoneSize(self.zone_half_side));
        }
        if !(self.side1_offset < 0.0 && self.side2_offset > 0.0) {
            return Err(ConfigError::SideOffsets {
                side1: self.side1_offset,
                side2: self.side2_offset,
            });
        }
        Ok(())
    }
}
