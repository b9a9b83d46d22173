//! The host world: an ECS holding gates, lamps, effects and occupants,
//! exposed to controllers through the collaborator traits.
//!
//! Every applied command is recorded as a [`HostEvent`]. The log keeps the
//! most recent [`EVENT_LOG_CAPACITY`] events; older ones are dropped and
//! counted when nobody drains it.

use std::collections::{HashMap, VecDeque};

use hecs::{Component, Entity, World};
use karmagate_logic::effects::EffectKind;
use karmagate_logic::geometry::{BlockPos, GateAxis};
use karmagate_logic::host::{
    EffectControl, GateCandidate, GateControl, LampControl, OccupancyQuery, SpatialIndex,
};
use karmagate_logic::karma::KarmaLevel;
use log::debug;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::components::{Block, Emitter, GateLeaf, KarmaDisplay, Lamp, Occupant};

/// Events retained between drains.
pub const EVENT_LOG_CAPACITY: usize = 1024;

/// Errors raised by world edits.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EngineError {
    #[error("block {0} is already occupied")]
    Occupied(BlockPos),
    #[error("no gate at {0}")]
    NoGate(BlockPos),
    #[error("no lamp at {0}")]
    NoLamp(BlockPos),
    #[error("no effect at {0}")]
    NoEffect(BlockPos),
    #[error("no controller at {0}")]
    NoController(BlockPos),
    #[error("occupant {0:?} does not exist")]
    NoOccupant(Entity),
}

/// Observable state change, in the order it happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum HostEvent {
    GateOpened(BlockPos),
    GateClosed(BlockPos),
    LampLit(BlockPos),
    LampDimmed(BlockPos),
    EffectStarted(BlockPos),
    EffectStopped(BlockPos),
    KarmaShown(BlockPos, KarmaLevel),
}

/// Number of state-changing commands applied since creation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CommandCounts {
    pub gate: u64,
    pub lamp: u64,
    pub effect: u64,
    pub display: u64,
}

pub struct HostWorld {
    /// ECS world containing all entities. Block entities must go through
    /// the spawn and remove methods so the position index stays in step.
    pub(crate) world: World,
    blocks: HashMap<BlockPos, Entity>,
    events: VecDeque<HostEvent>,
    dropped_events: u64,
    counts: CommandCounts,
}

impl Default for HostWorld {
    fn default() -> Self {
        Self::new()
    }
}

impl HostWorld {
    pub fn new() -> Self {
        Self {
            world: World::new(),
            blocks: HashMap::new(),
            events: VecDeque::new(),
            dropped_events: 0,
            counts: CommandCounts::default(),
        }
    }

    // ── Spawning ─────────────────────────────────────────────────────────

    pub fn spawn_gate(
        &mut self,
        pos: BlockPos,
        axis: GateAxis,
        open: bool,
    ) -> Result<Entity, EngineError> {
        self.spawn_gate_leaf(pos, GateLeaf::new(axis, open))
    }

    pub(crate) fn spawn_gate_leaf(&mut self, pos: BlockPos, leaf: GateLeaf) -> Result<Entity, EngineError> {
        self.spawn_block(pos, leaf)
    }

    pub fn spawn_lamp(&mut self, pos: BlockPos) -> Result<Entity, EngineError> {
        self.spawn_lamp_state(pos, Lamp::default())
    }

    pub(crate) fn spawn_lamp_state(&mut self, pos: BlockPos, lamp: Lamp) -> Result<Entity, EngineError> {
        self.spawn_block(pos, lamp)
    }

    /// Spawn a stopped emitter, or a display showing L0 for
    /// [`EffectKind::Display`].
    pub fn spawn_effect(&mut self, pos: BlockPos, kind: EffectKind) -> Result<Entity, EngineError> {
        match kind {
            EffectKind::Display => self.spawn_display_state(pos, KarmaDisplay::default()),
            _ => self.spawn_emitter_state(pos, Emitter::new(kind)),
        }
    }

    pub(crate) fn spawn_emitter_state(&mut self, pos: BlockPos, emitter: Emitter) -> Result<Entity, EngineError> {
        self.spawn_block(pos, emitter)
    }

    pub(crate) fn spawn_display_state(
        &mut self,
        pos: BlockPos,
        display: KarmaDisplay,
    ) -> Result<Entity, EngineError> {
        self.spawn_block(pos, display)
    }

    fn spawn_block<C: Component>(&mut self, pos: BlockPos, component: C) -> Result<Entity, EngineError> {
        if self.blocks.contains_key(&pos) {
            return Err(EngineError::Occupied(pos));
        }
        let entity = self.world.spawn((Block { pos }, component));
        self.blocks.insert(pos, entity);
        Ok(entity)
    }

    pub fn spawn_occupant(&mut self, x: f64, y: f64, z: f64) -> Entity {
        self.world.spawn((Occupant::new(x, y, z),))
    }

    pub fn move_occupant(&mut self, entity: Entity, x: f64, y: f64, z: f64) -> Result<(), EngineError> {
        let mut occupant = self
            .world
            .get::<&mut Occupant>(entity)
            .map_err(|_| EngineError::NoOccupant(entity))?;
        *occupant = Occupant::new(x, y, z);
        Ok(())
    }

    pub fn remove_occupant(&mut self, entity: Entity) -> Result<(), EngineError> {
        if self.world.get::<&Occupant>(entity).is_err() {
            return Err(EngineError::NoOccupant(entity));
        }
        self.world
            .despawn(entity)
            .map_err(|_| EngineError::NoOccupant(entity))
    }

    /// Remove whatever block entity sits at `pos`. Returns whether one existed.
    pub fn remove_block(&mut self, pos: BlockPos) -> bool {
        match self.blocks.remove(&pos) {
            Some(entity) => self.world.despawn(entity).is_ok(),
            None => false,
        }
    }

    // ── Lookups ──────────────────────────────────────────────────────────

    pub fn gate(&self, pos: BlockPos) -> Option<GateLeaf> {
        let entity = *self.blocks.get(&pos)?;
        self.world.get::<&GateLeaf>(entity).ok().map(|g| *g)
    }

    pub fn lamp(&self, pos: BlockPos) -> Option<Lamp> {
        let entity = *self.blocks.get(&pos)?;
        self.world.get::<&Lamp>(entity).ok().map(|l| *l)
    }

    pub fn emitter(&self, pos: BlockPos) -> Option<Emitter> {
        let entity = *self.blocks.get(&pos)?;
        self.world.get::<&Emitter>(entity).ok().map(|e| *e)
    }

    pub fn display(&self, pos: BlockPos) -> Option<KarmaDisplay> {
        let entity = *self.blocks.get(&pos)?;
        self.world.get::<&KarmaDisplay>(entity).ok().map(|d| *d)
    }

    pub fn occupant(&self, entity: Entity) -> Option<Occupant> {
        self.world.get::<&Occupant>(entity).ok().map(|o| *o)
    }

    pub fn gates(&self) -> Vec<(BlockPos, GateLeaf)> {
        let mut gates: Vec<(BlockPos, GateLeaf)> = self
            .world
            .query::<(&Block, &GateLeaf)>()
            .iter()
            .map(|(_, (block, leaf))| (block.pos, *leaf))
            .collect();
        gates.sort_by_key(|(pos, _)| *pos);
        gates
    }

    pub fn lamps(&self) -> Vec<(BlockPos, Lamp)> {
        let mut lamps: Vec<(BlockPos, Lamp)> = self
            .world
            .query::<(&Block, &Lamp)>()
            .iter()
            .map(|(_, (block, lamp))| (block.pos, *lamp))
            .collect();
        lamps.sort_by_key(|(pos, _)| *pos);
        lamps
    }

    pub fn emitters(&self) -> Vec<(BlockPos, Emitter)> {
        let mut emitters: Vec<(BlockPos, Emitter)> = self
            .world
            .query::<(&Block, &Emitter)>()
            .iter()
            .map(|(_, (block, emitter))| (block.pos, *emitter))
            .collect();
        emitters.sort_by_key(|(pos, _)| *pos);
        emitters
    }

    pub fn displays(&self) -> Vec<(BlockPos, KarmaDisplay)> {
        let mut displays: Vec<(BlockPos, KarmaDisplay)> = self
            .world
            .query::<(&Block, &KarmaDisplay)>()
            .iter()
            .map(|(_, (block, display))| (block.pos, *display))
            .collect();
        displays.sort_by_key(|(pos, _)| *pos);
        displays
    }

    pub fn occupants(&self) -> Vec<Occupant> {
        self.world
            .query::<&Occupant>()
            .iter()
            .map(|(_, o)| *o)
            .collect()
    }

    pub fn lit_lamps(&self) -> Vec<BlockPos> {
        self.lamps()
            .into_iter()
            .filter(|(_, lamp)| lamp.lit)
            .map(|(pos, _)| pos)
            .collect()
    }

    pub fn running_emitters(&self) -> Vec<BlockPos> {
        self.emitters()
            .into_iter()
            .filter(|(_, emitter)| emitter.enabled)
            .map(|(pos, _)| pos)
            .collect()
    }

    // ── Edits ────────────────────────────────────────────────────────────

    pub(crate) fn set_controller_flag(&mut self, pos: BlockPos, is_controller: bool) -> Result<(), EngineError> {
        let entity = *self.blocks.get(&pos).ok_or(EngineError::NoGate(pos))?;
        let mut leaf = self
            .world
            .get::<&mut GateLeaf>(entity)
            .map_err(|_| EngineError::NoGate(pos))?;
        leaf.is_controller = is_controller;
        Ok(())
    }

    /// Mark a lamp broken (forcing it dark) or repaired.
    pub fn set_lamp_broken(&mut self, pos: BlockPos, broken: bool) -> Result<(), EngineError> {
        let entity = *self.blocks.get(&pos).ok_or(EngineError::NoLamp(pos))?;
        let was_lit = {
            let mut lamp = self
                .world
                .get::<&mut Lamp>(entity)
                .map_err(|_| EngineError::NoLamp(pos))?;
            lamp.broken = broken;
            let was_lit = lamp.lit;
            if broken {
                lamp.lit = false;
            }
            was_lit
        };
        if broken && was_lit {
            self.push_event(HostEvent::LampDimmed(pos));
        }
        Ok(())
    }

    // ── Event log ────────────────────────────────────────────────────────

    fn push_event(&mut self, event: HostEvent) {
        if self.events.len() >= EVENT_LOG_CAPACITY {
            self.events.pop_front();
            self.dropped_events += 1;
        }
        self.events.push_back(event);
    }

    /// Retained events since the last drain, oldest first.
    pub fn drain_events(&mut self) -> Vec<HostEvent> {
        self.events.drain(..).collect()
    }

    pub fn pending_events(&self) -> usize {
        self.events.len()
    }

    /// Events pushed out of a full log since creation.
    pub fn dropped_events(&self) -> u64 {
        self.dropped_events
    }

    pub fn command_counts(&self) -> CommandCounts {
        self.counts
    }
}

impl OccupancyQuery for HostWorld {
    fn any_occupant_in_square(&self, cx: f64, cz: f64, half_side: f64) -> bool {
        let (min_x, max_x) = (cx - half_side, cx + half_side);
        let (min_z, max_z) = (cz - half_side, cz + half_side);
        self.world
            .query::<&Occupant>()
            .iter()
            .any(|(_, o)| o.x >= min_x && o.x <= max_x && o.z >= min_z && o.z <= max_z)
    }
}

impl GateControl for HostWorld {
    fn is_gate_open(&self, pos: BlockPos) -> Option<bool> {
        self.gate(pos).map(|g| g.open)
    }

    fn set_gate_open(&mut self, pos: BlockPos, open: bool) {
        let Some(&entity) = self.blocks.get(&pos) else {
            return;
        };
        let changed = match self.world.get::<&mut GateLeaf>(entity) {
            Ok(mut leaf) if leaf.open != open => {
                leaf.open = open;
                true
            }
            _ => false,
        };
        if changed {
            self.counts.gate += 1;
            self.push_event(if open {
                HostEvent::GateOpened(pos)
            } else {
                HostEvent::GateClosed(pos)
            });
            debug!("gate {} -> {}", pos, if open { "OPEN" } else { "CLOSED" });
        }
    }
}

impl LampControl for HostWorld {
    fn is_lamp_lit(&self, pos: BlockPos) -> Option<bool> {
        self.lamp(pos).map(|l| l.lit)
    }

    fn set_lamp_lit(&mut self, pos: BlockPos, lit: bool) {
        let Some(&entity) = self.blocks.get(&pos) else {
            return;
        };
        let changed = match self.world.get::<&mut Lamp>(entity) {
            Ok(mut lamp) => {
                let lit = lit && !lamp.broken;
                if lamp.lit != lit {
                    lamp.lit = lit;
                    Some(lit)
                } else {
                    None
                }
            }
            Err(_) => None,
        };
        if let Some(lit) = changed {
            self.counts.lamp += 1;
            self.push_event(if lit {
                HostEvent::LampLit(pos)
            } else {
                HostEvent::LampDimmed(pos)
            });
        }
    }
}

impl SpatialIndex for HostWorld {
    fn gates_within(&self, center: BlockPos, radius: i32) -> Vec<GateCandidate> {
        self.world
            .query::<(&Block, &GateLeaf)>()
            .iter()
            .filter(|(_, (block, _))| center.within_cube(&block.pos, radius))
            .map(|(_, (block, leaf))| GateCandidate {
                pos: block.pos,
                is_controller: leaf.is_controller,
            })
            .collect()
    }

    fn lamps_within(&self, center: BlockPos, radius: i32) -> Vec<BlockPos> {
        self.world
            .query::<(&Block, &Lamp)>()
            .iter()
            .filter(|(_, (block, _))| center.within_cube(&block.pos, radius))
            .map(|(_, (block, _))| block.pos)
            .collect()
    }

    fn effects_within(&self, center: BlockPos, radius: i32) -> Vec<(BlockPos, EffectKind)> {
        let emitters = self
            .world
            .query::<(&Block, &Emitter)>()
            .iter()
            .filter(|(_, (block, _))| center.within_cube(&block.pos, radius))
            .map(|(_, (block, emitter))| (block.pos, emitter.kind))
            .collect::<Vec<_>>();
        let displays = self
            .world
            .query::<(&Block, &KarmaDisplay)>()
            .iter()
            .filter(|(_, (block, _))| center.within_cube(&block.pos, radius))
            .map(|(_, (block, _))| (block.pos, EffectKind::Display))
            .collect::<Vec<_>>();
        emitters.into_iter().chain(displays).collect()
    }
}

impl EffectControl for HostWorld {
    fn is_effect_enabled(&self, pos: BlockPos) -> Option<bool> {
        self.emitter(pos).map(|e| e.enabled)
    }

    fn set_effect_enabled(&mut self, pos: BlockPos, enabled: bool) {
        let Some(&entity) = self.blocks.get(&pos) else {
            return;
        };
        let changed = match self.world.get::<&mut Emitter>(entity) {
            Ok(mut emitter) if emitter.enabled != enabled => {
                emitter.enabled = enabled;
                Some(emitter.kind)
            }
            _ => None,
        };
        if let Some(kind) = changed {
            self.counts.effect += 1;
            self.push_event(if enabled {
                HostEvent::EffectStarted(pos)
            } else {
                HostEvent::EffectStopped(pos)
            });
            debug!("{:?} {} -> {}", kind, pos, if enabled { "ON" } else { "OFF" });
        }
    }

    fn display_karma(&self, pos: BlockPos) -> Option<KarmaLevel> {
        self.display(pos).map(|d| d.level)
    }

    fn set_display_karma(&mut self, pos: BlockPos, level: KarmaLevel) {
        let Some(&entity) = self.blocks.get(&pos) else {
            return;
        };
        let changed = match self.world.get::<&mut KarmaDisplay>(entity) {
            Ok(mut display) if display.level != level => {
                display.level = level;
                true
            }
            _ => false,
        };
        if changed {
            self.counts.display += 1;
            self.push_event(HostEvent::KarmaShown(pos, level));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blocks_cannot_overlap() {
        let mut host = HostWorld::new();
        let pos = BlockPos::new(1, 2, 3);
        host.spawn_gate(pos, GateAxis::X, true).unwrap();
        assert_eq!(host.spawn_lamp(pos), Err(EngineError::Occupied(pos)));
    }

    #[test]
    fn gate_commands_are_idempotent() {
        let mut host = HostWorld::new();
        let pos = BlockPos::new(0, 64, 0);
        host.spawn_gate(pos, GateAxis::Z, false).unwrap();

        host.set_gate_open(pos, false);
        assert_eq!(host.command_counts().gate, 0);
        host.set_gate_open(pos, true);
        host.set_gate_open(pos, true);
        assert_eq!(host.command_counts().gate, 1);
        assert_eq!(host.drain_events(), vec![HostEvent::GateOpened(pos)]);
        assert!(host.drain_events().is_empty());
    }

    #[test]
    fn broken_lamp_never_lights() {
        let mut host = HostWorld::new();
        let pos = BlockPos::new(0, 64, 0);
        host.spawn_lamp(pos).unwrap();
        host.set_lamp_lit(pos, true);
        assert_eq!(host.is_lamp_lit(pos), Some(true));

        host.set_lamp_broken(pos, true).unwrap();
        assert_eq!(host.is_lamp_lit(pos), Some(false));
        host.set_lamp_lit(pos, true);
        assert_eq!(host.is_lamp_lit(pos), Some(false));

        host.set_lamp_broken(pos, false).unwrap();
        host.set_lamp_lit(pos, true);
        assert_eq!(host.is_lamp_lit(pos), Some(true));
    }

    #[test]
    fn occupancy_square_is_closed() {
        let mut host = HostWorld::new();
        host.spawn_occupant(6.5, 70.0, -6.5);
        assert!(host.any_occupant_in_square(0.0, 0.0, 6.5));
        assert!(!host.any_occupant_in_square(0.0, 0.0, 6.4));
    }

    #[test]
    fn spatial_queries_use_cube() {
        let mut host = HostWorld::new();
        let center = BlockPos::new(0, 64, 0);
        host.spawn_gate(BlockPos::new(3, 64, 0), GateAxis::X, true).unwrap();
        host.spawn_gate(BlockPos::new(0, 64, 9), GateAxis::X, true).unwrap();
        host.spawn_lamp(BlockPos::new(-5, 69, 5)).unwrap();
        host.spawn_lamp(BlockPos::new(0, 80, 0)).unwrap();

        assert_eq!(host.gates_within(center, 5).len(), 1);
        assert_eq!(host.lamps_within(center, 5), vec![BlockPos::new(-5, 69, 5)]);
    }

    #[test]
    fn effects_switch_and_show_levels() {
        let mut host = HostWorld::new();
        let water = BlockPos::new(1, 63, -3);
        let display = BlockPos::new(2, 66, 3);
        host.spawn_effect(water, EffectKind::Water).unwrap();
        host.spawn_effect(display, EffectKind::Display).unwrap();
        assert_eq!(host.is_effect_enabled(water), Some(false));
        assert_eq!(host.display_karma(display), Some(KarmaLevel::L0));
        // Displays are not emitters and the other way round.
        assert_eq!(host.is_effect_enabled(display), None);
        assert_eq!(host.display_karma(water), None);

        host.set_effect_enabled(water, true);
        host.set_effect_enabled(water, true);
        host.set_display_karma(display, KarmaLevel::L5);
        assert_eq!(host.running_emitters(), vec![water]);
        assert_eq!(host.command_counts().effect, 1);
        assert_eq!(host.command_counts().display, 1);
        assert_eq!(
            host.drain_events(),
            vec![
                HostEvent::EffectStarted(water),
                HostEvent::KarmaShown(display, KarmaLevel::L5)
            ]
        );

        let mut found = host.effects_within(BlockPos::new(0, 64, 0), 5);
        found.sort();
        assert_eq!(
            found,
            vec![(water, EffectKind::Water), (display, EffectKind::Display)]
        );
    }

    #[test]
    fn event_log_keeps_the_newest() {
        let mut host = HostWorld::new();
        let pos = BlockPos::new(0, 64, 0);
        host.spawn_gate(pos, GateAxis::X, false).unwrap();

        let toggles = EVENT_LOG_CAPACITY + 10;
        for i in 0..toggles {
            host.set_gate_open(pos, i % 2 == 0);
        }
        assert_eq!(host.pending_events(), EVENT_LOG_CAPACITY);
        assert_eq!(host.dropped_events(), 10);

        let events = host.drain_events();
        // Toggle 10 opened the gate and is now the oldest retained.
        assert_eq!(events.first(), Some(&HostEvent::GateOpened(pos)));
        assert_eq!(events.last(), Some(&HostEvent::GateClosed(pos)));
        assert_eq!(host.pending_events(), 0);

        host.set_gate_open(pos, true);
        assert_eq!(host.drain_events(), vec![HostEvent::GateOpened(pos)]);
        assert_eq!(host.dropped_events(), 10);
    }

    #[test]
    fn missing_targets_are_ignored() {
        let mut host = HostWorld::new();
        let nowhere = BlockPos::new(9, 9, 9);
        host.set_gate_open(nowhere, true);
        host.set_lamp_lit(nowhere, true);
        host.set_effect_enabled(nowhere, true);
        host.set_display_karma(nowhere, KarmaLevel::D);
        assert_eq!(host.is_gate_open(nowhere), None);
        assert_eq!(host.is_lamp_lit(nowhere), None);
        assert_eq!(host.command_counts(), CommandCounts::default());
    }

    #[test]
    fn position_index_tracks_every_block() {
        let mut host = HostWorld::new();
        let pos = BlockPos::new(4, 64, 4);
        host.spawn_gate(pos, GateAxis::X, true).unwrap();
        assert!(host.remove_block(pos));
        assert!(!host.remove_block(pos));
        assert_eq!(host.gate(pos), None);

        host.spawn_effect(pos, EffectKind::Steam).unwrap();
        assert_eq!(host.emitter(pos).map(|e| e.kind), Some(EffectKind::Steam));
        assert_eq!(host.spawn_lamp(pos), Err(EngineError::Occupied(pos)));
        assert_eq!(host.blocks.len(), host.world.query::<&Block>().iter().count());
    }

    #[test]
    fn occupants_move_and_leave() {
        let mut host = HostWorld::new();
        let who = host.spawn_occupant(0.0, 64.0, 0.0);
        host.move_occupant(who, 2.0, 64.0, 3.0).unwrap();
        assert_eq!(host.occupant(who), Some(Occupant::new(2.0, 64.0, 3.0)));

        host.remove_occupant(who).unwrap();
        assert_eq!(host.remove_occupant(who), Err(EngineError::NoOccupant(who)));
        assert!(host.occupants().is_empty());
    }
}
