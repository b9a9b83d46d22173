//! Simulation engine - owns the host world and every airlock controller

use std::collections::BTreeMap;
use std::io::{Read, Write};

use hecs::Entity;
use karmagate_logic::config::GateConfig;
use karmagate_logic::controller::KarmaGateController;
use karmagate_logic::effects::EffectKind;
use karmagate_logic::geometry::{BlockPos, GateAxis, Side};
use karmagate_logic::karma::KarmaLevel;
use log::{info, warn};

use crate::persistence::{load_world, save_world, SaveError};
use crate::world::{EngineError, HostWorld};

/// Main simulation engine
pub struct GateEngine {
    /// Gates, lamps and occupants
    pub host: HostWorld,
    /// Controllers keyed by the position of their middle gate
    controllers: BTreeMap<BlockPos, KarmaGateController>,
    config: GateConfig,
    tick_count: u64,
}

impl Default for GateEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl GateEngine {
    /// Create an empty world with the stock airlock timings
    pub fn new() -> Self {
        Self::with_config(GateConfig::default())
    }

    pub fn with_config(config: GateConfig) -> Self {
        Self {
            host: HostWorld::new(),
            controllers: BTreeMap::new(),
            config,
            tick_count: 0,
        }
    }

    // ── World edits ──────────────────────────────────────────────────────

    pub fn spawn_gate(&mut self, pos: BlockPos, axis: GateAxis, open: bool) -> Result<Entity, EngineError> {
        self.host.spawn_gate(pos, axis, open)
    }

    pub fn spawn_lamp(&mut self, pos: BlockPos) -> Result<Entity, EngineError> {
        self.host.spawn_lamp(pos)
    }

    /// Place a wash emitter or karma display. Controllers pick it up on
    /// their next configure.
    pub fn spawn_effect(&mut self, pos: BlockPos, kind: EffectKind) -> Result<Entity, EngineError> {
        self.host.spawn_effect(pos, kind)
    }

    pub fn spawn_occupant(&mut self, x: f64, y: f64, z: f64) -> Entity {
        self.host.spawn_occupant(x, y, z)
    }

    pub fn move_occupant(&mut self, entity: Entity, x: f64, y: f64, z: f64) -> Result<(), EngineError> {
        self.host.move_occupant(entity, x, y, z)
    }

    pub fn remove_occupant(&mut self, entity: Entity) -> Result<(), EngineError> {
        self.host.remove_occupant(entity)
    }

    /// Remove a gate. A controller living on it goes with it.
    pub fn remove_gate(&mut self, pos: BlockPos) -> Result<(), EngineError> {
        if self.host.gate(pos).is_none() {
            return Err(EngineError::NoGate(pos));
        }
        self.host.remove_block(pos);
        if self.controllers.remove(&pos).is_some() {
            info!("controller {} removed with its gate", pos);
        }
        Ok(())
    }

    pub fn remove_lamp(&mut self, pos: BlockPos) -> Result<(), EngineError> {
        if self.host.lamp(pos).is_none() {
            return Err(EngineError::NoLamp(pos));
        }
        self.host.remove_block(pos);
        Ok(())
    }

    pub fn remove_effect(&mut self, pos: BlockPos) -> Result<(), EngineError> {
        if self.host.emitter(pos).is_none() && self.host.display(pos).is_none() {
            return Err(EngineError::NoEffect(pos));
        }
        self.host.remove_block(pos);
        Ok(())
    }

    pub fn break_lamp(&mut self, pos: BlockPos) -> Result<(), EngineError> {
        self.host.set_lamp_broken(pos, true)
    }

    pub fn repair_lamp(&mut self, pos: BlockPos) -> Result<(), EngineError> {
        self.host.set_lamp_broken(pos, false)
    }

    /// Operator toggle of a single gate. Returns the new open state.
    pub fn toggle_gate(&mut self, pos: BlockPos) -> Result<bool, EngineError> {
        use karmagate_logic::host::GateControl;

        let open = self
            .host
            .is_gate_open(pos)
            .ok_or(EngineError::NoGate(pos))?;
        self.host.set_gate_open(pos, !open);
        Ok(!open)
    }

    // ── Controllers ──────────────────────────────────────────────────────

    /// Operator action: elect the gate at `pos` as a controller and bind the
    /// nearest two ordinary gates within `radius`.
    ///
    /// Reconfiguring an existing controller aborts its cycle but keeps its
    /// karma levels. Returns the number of outer gates bound.
    pub fn configure_controller(&mut self, pos: BlockPos, radius: i32) -> Result<usize, EngineError> {
        let leaf = self.host.gate(pos).ok_or(EngineError::NoGate(pos))?;
        self.host.set_controller_flag(pos, true)?;

        let config = self.config.clone();
        let controller = self
            .controllers
            .entry(pos)
            .or_insert_with(|| KarmaGateController::new(pos, leaf.axis, config));
        let bound = controller.configure(&mut self.host, radius);
        if bound < 2 {
            warn!("controller {} bound only {} outer gate(s)", pos, bound);
        }
        Ok(bound)
    }

    /// Set the karma required to pass from one side of a controller and
    /// show it on that side's displays. Returns false if unchanged.
    pub fn set_karma(&mut self, pos: BlockPos, side: Side, level: KarmaLevel) -> Result<bool, EngineError> {
        let controller = self
            .controllers
            .get_mut(&pos)
            .ok_or(EngineError::NoController(pos))?;
        Ok(controller.set_karma(&mut self.host, side, level))
    }

    pub(crate) fn insert_controller(&mut self, controller: KarmaGateController) {
        self.controllers.insert(controller.pos(), controller);
    }

    pub fn controller(&self, pos: BlockPos) -> Option<&KarmaGateController> {
        self.controllers.get(&pos)
    }

    pub fn controllers(&self) -> impl Iterator<Item = &KarmaGateController> {
        self.controllers.values()
    }

    // ── Ticking ──────────────────────────────────────────────────────────

    /// Advance every controller by one world tick, in position order.
    pub fn tick(&mut self) {
        for controller in self.controllers.values_mut() {
            controller.tick(&mut self.host);
        }
        self.tick_count += 1;
    }

    pub fn run(&mut self, ticks: u32) {
        for _ in 0..ticks {
            self.tick();
        }
    }

    pub fn tick_count(&self) -> u64 {
        self.tick_count
    }

    pub(crate) fn set_tick_count(&mut self, tick_count: u64) {
        self.tick_count = tick_count;
    }

    pub fn config(&self) -> &GateConfig {
        &self.config
    }

    // ── Save / load ──────────────────────────────────────────────────────

    /// Save the whole world to a writer
    pub fn save<W: Write>(&self, writer: W) -> Result<(), SaveError> {
        save_world(writer, self)
    }

    /// Replace this engine with one loaded from a reader
    pub fn load<R: Read>(&mut self, reader: R) -> Result<(), SaveError> {
        *self = load_world(reader)?;
        Ok(())
    }
}
