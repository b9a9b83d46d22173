//! In-memory host for unit tests.

use std::collections::HashMap;

use crate::effects::EffectKind;
use crate::geometry::BlockPos;
use crate::host::{EffectControl, GateCandidate, GateControl, LampControl, OccupancyQuery, SpatialIndex};
use crate::karma::KarmaLevel;

#[derive(Debug, Clone, Copy)]
pub struct MockGate {
    pub open: bool,
    pub is_controller: bool,
}

#[derive(Debug, Default)]
pub struct MockHost {
    pub gates: HashMap<BlockPos, MockGate>,
    pub lamps: HashMap<BlockPos, bool>,
    /// Emitters: kind and running state.
    pub effects: HashMap<BlockPos, (EffectKind, bool)>,
    pub displays: HashMap<BlockPos, KarmaLevel>,
    pub occupants: Vec<(f64, f64)>,
    pub gate_commands: usize,
    pub lamp_commands: usize,
    pub effect_commands: usize,
    pub display_commands: usize,
}

impl MockHost {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_gate(&mut self, pos: BlockPos, open: bool) {
        self.gates.insert(
            pos,
            MockGate {
                open,
                is_controller: false,
            },
        );
    }

    pub fn add_controller_gate(&mut self, pos: BlockPos) {
        self.gates.insert(
            pos,
            MockGate {
                open: false,
                is_controller: true,
            },
        );
    }

    pub fn add_lamp(&mut self, pos: BlockPos) {
        self.lamps.insert(pos, false);
    }

    pub fn add_effect(&mut self, pos: BlockPos, kind: EffectKind) {
        if kind == EffectKind::Display {
            self.displays.insert(pos, KarmaLevel::default());
        } else {
            self.effects.insert(pos, (kind, false));
        }
    }

    pub fn running(&self, pos: BlockPos) -> bool {
        self.effects.get(&pos).map(|(_, on)| *on).unwrap_or(false)
    }

    pub fn running_effects(&self) -> Vec<BlockPos> {
        let mut running: Vec<BlockPos> = self
            .effects
            .iter()
            .filter(|(_, (_, on))| *on)
            .map(|(p, _)| *p)
            .collect();
        running.sort();
        running
    }

    pub fn shown(&self, pos: BlockPos) -> Option<KarmaLevel> {
        self.displays.get(&pos).copied()
    }

    pub fn open(&self, pos: BlockPos) -> bool {
        self.gates.get(&pos).map(|g| g.open).unwrap_or(false)
    }

    pub fn lit(&self, pos: BlockPos) -> bool {
        self.lamps.get(&pos).copied().unwrap_or(false)
    }

    pub fn lit_lamps(&self) -> Vec<BlockPos> {
        let mut lit: Vec<BlockPos> = self
            .lamps
            .iter()
            .filter(|(_, on)| **on)
            .map(|(p, _)| *p)
            .collect();
        lit.sort();
        lit
    }
}

impl OccupancyQuery for MockHost {
    fn any_occupant_in_square(&self, cx: f64, cz: f64, half_side: f64) -> bool {
        self.occupants.iter().any(|(x, z)| {
            *x >= cx - half_side && *x <= cx + half_side && *z >= cz - half_side && *z <= cz + half_side
        })
    }
}

impl GateControl for MockHost {
    fn is_gate_open(&self, pos: BlockPos) -> Option<bool> {
        self.gates.get(&pos).map(|g| g.open)
    }

    fn set_gate_open(&mut self, pos: BlockPos, open: bool) {
        if let Some(gate) = self.gates.get_mut(&pos) {
            gate.open = open;
            self.gate_commands += 1;
        }
    }
}

impl LampControl for MockHost {
    fn is_lamp_lit(&self, pos: BlockPos) -> Option<bool> {
        self.lamps.get(&pos).copied()
    }

    fn set_lamp_lit(&mut self, pos: BlockPos, lit: bool) {
        if let Some(lamp) = self.lamps.get_mut(&pos) {
            *lamp = lit;
            self.lamp_commands += 1;
        }
    }
}

impl SpatialIndex for MockHost {
    fn gates_within(&self, center: BlockPos, radius: i32) -> Vec<GateCandidate> {
        self.gates
            .iter()
            .filter(|(pos, _)| center.within_cube(pos, radius))
            .map(|(pos, gate)| GateCandidate {
                pos: *pos,
                is_controller: gate.is_controller,
            })
            .collect()
    }

    fn lamps_within(&self, center: BlockPos, radius: i32) -> Vec<BlockPos> {
        self.lamps
            .keys()
            .filter(|pos| center.within_cube(pos, radius))
            .copied()
            .collect()
    }

    fn effects_within(&self, center: BlockPos, radius: i32) -> Vec<(BlockPos, EffectKind)> {
        let emitters = self.effects.iter().map(|(pos, (kind, _))| (*pos, *kind));
        let displays = self.displays.keys().map(|pos| (*pos, EffectKind::Display));
        emitters
            .chain(displays)
            .filter(|(pos, _)| center.within_cube(pos, radius))
            .collect()
    }
}

impl EffectControl for MockHost {
    fn is_effect_enabled(&self, pos: BlockPos) -> Option<bool> {
        self.effects.get(&pos).map(|(_, on)| *on)
    }

    fn set_effect_enabled(&mut self, pos: BlockPos, enabled: bool) {
        if let Some((_, on)) = self.effects.get_mut(&pos) {
            *on = enabled;
            self.effect_commands += 1;
        }
    }

    fn display_karma(&self, pos: BlockPos) -> Option<KarmaLevel> {
        self.displays.get(&pos).copied()
    }

    fn set_display_karma(&mut self, pos: BlockPos, level: KarmaLevel) {
        if let Some(shown) = self.displays.get_mut(&pos) {
            *shown = level;
            self.display_commands += 1;
        }
    }
}
