//! Component definitions for the host world.
//!
//! Components are pure data attached to entities. Gates, lamps, emitters
//! and displays are block entities and carry a [`Block`]; occupants move
//! freely.

use karmagate_logic::effects::EffectKind;
use karmagate_logic::geometry::{BlockPos, GateAxis};
use karmagate_logic::karma::KarmaLevel;
use serde::{Deserialize, Serialize};

/// Block-aligned position of a block entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Block {
    pub pos: BlockPos,
}

/// One physical gate leaf.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GateLeaf {
    pub open: bool,
    /// Elected to run an airlock; never bound as another controller's outer gate.
    pub is_controller: bool,
    pub axis: GateAxis,
}

impl GateLeaf {
    pub fn new(axis: GateAxis, open: bool) -> Self {
        Self {
            open,
            is_controller: false,
            axis,
        }
    }
}

/// Feedback lamp. A broken lamp never lights.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Lamp {
    pub lit: bool,
    pub broken: bool,
}

/// Water, heat or steam emitter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Emitter {
    pub kind: EffectKind,
    pub enabled: bool,
}

impl Emitter {
    pub fn new(kind: EffectKind) -> Self {
        Self {
            kind,
            enabled: false,
        }
    }
}

/// Shows the karma level required to pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct KarmaDisplay {
    pub level: KarmaLevel,
}

/// Anything that counts as standing in an occupancy zone (players).
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Occupant {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Occupant {
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }
}
