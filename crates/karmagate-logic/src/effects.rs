//! Wash effects and karma displays bound to each side of an airlock.
//!
//! Water streams, heat coils and steam emitters run the wash. Displays show
//! the karma level required to pass from that side. Everything is split by
//! side the same way lamps are, and every command goes through the
//! idempotent helpers in [`crate::host`].

use serde::{Deserialize, Serialize};

use crate::geometry::{BlockPos, GateAxis, Side};
use crate::host::{command_display, command_effect, EffectControl, SpatialIndex};
use crate::karma::KarmaLevel;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum EffectKind {
    Water,
    Heat,
    Steam,
    /// Karma display; shows a level instead of switching on and off.
    Display,
}

impl EffectKind {
    /// Kinds that are switched on and off.
    pub const EMITTERS: [EffectKind; 3] = [EffectKind::Water, EffectKind::Heat, EffectKind::Steam];
}

/// Emitters and displays bound to one side of a gate.
#[derive(Debug, Clone)]
pub struct SideEffects {
    side: Side,
    water: Vec<BlockPos>,
    heat: Vec<BlockPos>,
    steam: Vec<BlockPos>,
    displays: Vec<BlockPos>,
}

impl SideEffects {
    pub fn new(side: Side) -> Self {
        Self {
            side,
            water: Vec::new(),
            heat: Vec::new(),
            steam: Vec::new(),
            displays: Vec::new(),
        }
    }

    pub fn side(&self) -> Side {
        self.side
    }

    /// Rebuild from the effects around `center`, keeping this side's only.
    pub fn bind<H: SpatialIndex + ?Sized>(&mut self, host: &H, center: BlockPos, axis: GateAxis, radius: i32) {
        self.water.clear();
        self.heat.clear();
        self.steam.clear();
        self.displays.clear();

        for (pos, kind) in host.effects_within(center, radius) {
            if pos == center || Side::classify(center, axis, pos) != self.side {
                continue;
            }
            self.list_mut(kind).push(pos);
        }
        for list in [&mut self.water, &mut self.heat, &mut self.steam, &mut self.displays] {
            list.sort();
            list.dedup();
        }
    }

    fn list_mut(&mut self, kind: EffectKind) -> &mut Vec<BlockPos> {
        match kind {
            EffectKind::Water => &mut self.water,
            EffectKind::Heat => &mut self.heat,
            EffectKind::Steam => &mut self.steam,
            EffectKind::Display => &mut self.displays,
        }
    }

    pub fn positions(&self, kind: EffectKind) -> &[BlockPos] {
        match kind {
            EffectKind::Water => &self.water,
            EffectKind::Heat => &self.heat,
            EffectKind::Steam => &self.steam,
            EffectKind::Display => &self.displays,
        }
    }

    pub fn len(&self) -> usize {
        self.water.len() + self.heat.len() + self.steam.len() + self.displays.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Switch every emitter of `kind`. Displays are not switched.
    pub fn set<H: EffectControl + ?Sized>(&self, host: &mut H, kind: EffectKind, enabled: bool) {
        if kind == EffectKind::Display {
            return;
        }
        for &pos in self.positions(kind) {
            command_effect(host, pos, enabled);
        }
    }

    pub fn stop_all<H: EffectControl + ?Sized>(&self, host: &mut H) {
        for kind in EffectKind::EMITTERS {
            self.set(host, kind, false);
        }
    }

    pub fn show_karma<H: EffectControl + ?Sized>(&self, host: &mut H, level: KarmaLevel) {
        for &pos in &self.displays {
            command_display(host, pos, level);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MockHost;

    const CENTER: BlockPos = BlockPos::new(0, 64, 0);

    fn host() -> MockHost {
        let mut host = MockHost::new();
        host.add_effect(BlockPos::new(1, 63, -3), EffectKind::Water);
        host.add_effect(BlockPos::new(-1, 63, -3), EffectKind::Water);
        host.add_effect(BlockPos::new(0, 62, -2), EffectKind::Heat);
        host.add_effect(BlockPos::new(0, 68, 4), EffectKind::Steam);
        host.add_effect(BlockPos::new(2, 66, 3), EffectKind::Display);
        host.add_effect(BlockPos::new(0, 64, 40), EffectKind::Water);
        host
    }

    #[test]
    fn bind_splits_by_side() {
        let host = host();
        let mut side1 = SideEffects::new(Side::Side1);
        let mut side2 = SideEffects::new(Side::Side2);
        side1.bind(&host, CENTER, GateAxis::X, 15);
        side2.bind(&host, CENTER, GateAxis::X, 15);

        assert_eq!(
            side1.positions(EffectKind::Water),
            &[BlockPos::new(-1, 63, -3), BlockPos::new(1, 63, -3)]
        );
        assert_eq!(side1.positions(EffectKind::Heat).len(), 1);
        assert!(side1.positions(EffectKind::Display).is_empty());
        // The far water stream is out of range.
        assert!(side2.positions(EffectKind::Water).is_empty());
        assert_eq!(side2.positions(EffectKind::Steam), &[BlockPos::new(0, 68, 4)]);
        assert_eq!(side2.positions(EffectKind::Display), &[BlockPos::new(2, 66, 3)]);
        assert_eq!(side1.len() + side2.len(), 5);
    }

    #[test]
    fn switching_is_idempotent() {
        let mut host = host();
        let mut side1 = SideEffects::new(Side::Side1);
        side1.bind(&host, CENTER, GateAxis::X, 15);

        side1.set(&mut host, EffectKind::Water, true);
        side1.set(&mut host, EffectKind::Water, true);
        assert_eq!(host.effect_commands, 2);
        assert!(host.running(BlockPos::new(1, 63, -3)));
        assert!(!host.running(BlockPos::new(0, 62, -2)));

        side1.stop_all(&mut host);
        assert_eq!(host.effect_commands, 4);
        assert!(host.running_effects().is_empty());
    }

    #[test]
    fn displays_only_take_levels() {
        let mut host = host();
        let display = BlockPos::new(2, 66, 3);
        let mut side2 = SideEffects::new(Side::Side2);
        side2.bind(&host, CENTER, GateAxis::X, 15);

        side2.set(&mut host, EffectKind::Display, true);
        assert_eq!(host.effect_commands, 0);

        side2.show_karma(&mut host, KarmaLevel::L4);
        side2.show_karma(&mut host, KarmaLevel::L4);
        assert_eq!(host.shown(display), Some(KarmaLevel::L4));
        assert_eq!(host.display_commands, 1);
    }

    #[test]
    fn empty_side_is_a_no_op() {
        let mut host = MockHost::new();
        let mut side = SideEffects::new(Side::Side1);
        side.bind(&host, CENTER, GateAxis::Z, 15);
        assert!(side.is_empty());
        side.stop_all(&mut host);
        side.show_karma(&mut host, KarmaLevel::D);
        assert_eq!(host.effect_commands + host.display_commands, 0);
    }
}
