//! The narrow interface the airlock needs from whatever world hosts it.
//!
//! The controller never owns gates or lamps. It addresses them by
//! [`BlockPos`] through a [`GateHost`] passed in on every call, and treats
//! anything the host cannot find as absent.

use crate::effects::EffectKind;
use crate::geometry::BlockPos;
use crate::karma::KarmaLevel;

/// Pure per-tick occupancy query.
pub trait OccupancyQuery {
    /// True if any tracked occupant's horizontal position lies inside the
    /// closed square centred on (`cx`, `cz`).
    fn any_occupant_in_square(&self, cx: f64, cz: f64, half_side: f64) -> bool;
}

pub trait GateControl {
    /// Open state of the gate at `pos`, or `None` if there is no gate there.
    fn is_gate_open(&self, pos: BlockPos) -> Option<bool>;
    fn set_gate_open(&mut self, pos: BlockPos, open: bool);
}

pub trait LampControl {
    /// Lit state of the lamp at `pos`, or `None` if there is no lamp there.
    fn is_lamp_lit(&self, pos: BlockPos) -> Option<bool>;
    fn set_lamp_lit(&mut self, pos: BlockPos, lit: bool);
}

/// A gate found near a controller during binding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GateCandidate {
    pub pos: BlockPos,
    pub is_controller: bool,
}

/// Spatial lookups used only while binding, never per tick.
pub trait SpatialIndex {
    /// Gates inside the cube of `radius` around `center`.
    fn gates_within(&self, center: BlockPos, radius: i32) -> Vec<GateCandidate>;
    /// Lamps inside the cube of `radius` around `center`.
    fn lamps_within(&self, center: BlockPos, radius: i32) -> Vec<BlockPos>;
    /// Wash emitters and karma displays inside the cube of `radius` around `center`.
    fn effects_within(&self, center: BlockPos, radius: i32) -> Vec<(BlockPos, EffectKind)>;
}

/// Water, heat and steam emitters plus the displays showing required karma.
pub trait EffectControl {
    /// Running state of the emitter at `pos`, or `None` if there is none.
    fn is_effect_enabled(&self, pos: BlockPos) -> Option<bool>;
    fn set_effect_enabled(&mut self, pos: BlockPos, enabled: bool);
    /// Level shown by the display at `pos`, or `None` if there is none.
    fn display_karma(&self, pos: BlockPos) -> Option<KarmaLevel>;
    fn set_display_karma(&mut self, pos: BlockPos, level: KarmaLevel);
}

/// Everything a controller needs from its world.
pub trait GateHost: OccupancyQuery + GateControl + LampControl + EffectControl + SpatialIndex {}

impl<T: OccupancyQuery + GateControl + LampControl + EffectControl + SpatialIndex> GateHost for T {}

/// Command a gate only if it exists and is not already in the wanted state.
///
/// Returns whether a command was issued.
pub fn command_gate<H: GateControl + ?Sized>(host: &mut H, pos: BlockPos, open: bool) -> bool {
    match host.is_gate_open(pos) {
        Some(current) if current != open => {
            host.set_gate_open(pos, open);
            true
        }
        _ => false,
    }
}

/// Command a lamp only if it exists and is not already in the wanted state.
pub fn command_lamp<H: LampControl + ?Sized>(host: &mut H, pos: BlockPos, lit: bool) -> bool {
    match host.is_lamp_lit(pos) {
        Some(current) if current != lit => {
            host.set_lamp_lit(pos, lit);
            true
        }
        _ => false,
    }
}

/// Switch an emitter only if it exists and is not already in the wanted state.
pub fn command_effect<H: EffectControl + ?Sized>(host: &mut H, pos: BlockPos, enabled: bool) -> bool {
    match host.is_effect_enabled(pos) {
        Some(current) if current != enabled => {
            host.set_effect_enabled(pos, enabled);
            true
        }
        _ => false,
    }
}

pub fn command_display<H: EffectControl + ?Sized>(host: &mut H, pos: BlockPos, level: KarmaLevel) -> bool {
    match host.display_karma(pos) {
        Some(current) if current != level => {
            host.set_display_karma(pos, level);
            true
        }
        _ => false,
    }
}
