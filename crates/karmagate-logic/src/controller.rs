//! The airlock controller: a tick-driven state machine that walks an
//! occupant from one side of the gate to the other.
//!
//! The controller owns the middle gate (its own block) and binds the two
//! nearest outer gates. One tick runs exactly one of these branches, in
//! priority order:
//!
//! 1. **Cooldown**: lockout after a completed cycle; everything held shut.
//! 2. **Pending reset**: cycle over, waiting to reopen the entry gate.
//! 3. **Idle**: count continuous occupancy per side; a side that reaches
//!    the prepare threshold closes its outer gate and owns the cycle.
//! 4. **Cycle**: wash with the middle gate shut, then open it and chase
//!    the lamps until the owning side's zone empties.
//!
//! Wash effects follow the phases:
//!
//! | Moment | Effects |
//! |--------|---------|
//! | One side preparing | opposite side's water on |
//! | Nobody (or both) preparing | all water off |
//! | Cycle start | entry water, heat and steam on; opposite water off |
//! | Wash done | entry water, heat and steam off |
//! | Entry zone clear | entry water on, heat and steam off |
//! | Entry gate reopens | everything off |
//!
//! ```
//! use karmagate_logic::controller::KarmaGateController;
//! use karmagate_logic::config::GateConfig;
//! use karmagate_logic::geometry::{BlockPos, GateAxis};
//!
//! let controller = KarmaGateController::new(BlockPos::new(0, 64, 0), GateAxis::X, GateConfig::default());
//! assert_eq!(controller.phase(), None);
//! assert!(!controller.is_locked());
//! ```

use log::{debug, info};

use crate::config::GateConfig;
use crate::effects::{EffectKind, SideEffects};
use crate::geometry::{side_zone, BlockPos, GateAxis, Side};
use crate::host::{
    command_gate, EffectControl, GateControl, GateHost, LampControl, OccupancyQuery, SpatialIndex,
};
use crate::karma::KarmaLevel;
use crate::lights::GateLightGroup;

/// Timers, phase and gate bindings. Everything here is reset on rebind.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ControllerState {
    pub gate1: Option<BlockPos>,
    pub gate2: Option<BlockPos>,
    pub prepare1: u32,
    pub prepare2: u32,
    pub wash_ticks: u32,
    pub cooldown_ticks: u32,
    /// Side that owns the running cycle.
    pub cycle_phase: Option<Side>,
    /// Side whose outer gate is waiting to reopen.
    pub pending_reset_side: Option<Side>,
    pub reset_delay_ticks: u32,
    /// Free-running counter that times lamp patterns.
    pub light_tick: u32,
}

#[derive(Debug, Clone)]
pub struct KarmaGateController {
    pos: BlockPos,
    axis: GateAxis,
    config: GateConfig,
    state: ControllerState,
    lights1: GateLightGroup,
    lights2: GateLightGroup,
    effects1: SideEffects,
    effects2: SideEffects,
    light_radius: i32,
    karma1: KarmaLevel,
    karma2: KarmaLevel,
}

impl KarmaGateController {
    pub fn new(pos: BlockPos, axis: GateAxis, config: GateConfig) -> Self {
        let half_period = config.blink_half_period;
        let light_radius = config.min_light_radius;
        Self {
            pos,
            axis,
            config,
            state: ControllerState::default(),
            lights1: GateLightGroup::new(Side::Side1, half_period),
            lights2: GateLightGroup::new(Side::Side2, half_period),
            effects1: SideEffects::new(Side::Side1),
            effects2: SideEffects::new(Side::Side2),
            light_radius,
            karma1: KarmaLevel::default(),
            karma2: KarmaLevel::default(),
        }
    }

    /// Rebuild a controller from saved state. Lamps and effects are rebound
    /// from the host; their state is left for the next tick to drive.
    pub(crate) fn from_parts<H: SpatialIndex + ?Sized>(
        pos: BlockPos,
        axis: GateAxis,
        config: GateConfig,
        state: ControllerState,
        light_radius: i32,
        karma: (KarmaLevel, KarmaLevel),
        host: &H,
    ) -> Self {
        let mut controller = Self::new(pos, axis, config);
        controller.state = state;
        controller.light_radius = light_radius;
        controller.karma1 = karma.0;
        controller.karma2 = karma.1;
        controller
            .lights1
            .bind_lights(host, pos, axis, controller.light_radius);
        controller
            .lights2
            .bind_lights(host, pos, axis, controller.light_radius);
        controller
            .effects1
            .bind(host, pos, axis, controller.light_radius);
        controller
            .effects2
            .bind(host, pos, axis, controller.light_radius);
        controller
    }

    // ── Binding ──────────────────────────────────────────────────────────

    /// Operator action: bind the nearest two non-controller gates within
    /// `radius`, open them, bind lamps and effects, and reset every timer.
    ///
    /// Aborts any cycle in progress. Returns the number of outer gates bound.
    pub fn configure<H: GateHost + ?Sized>(&mut self, host: &mut H, radius: i32) -> usize {
        let mut candidates: Vec<BlockPos> = host
            .gates_within(self.pos, radius)
            .into_iter()
            .filter(|c| !c.is_controller && c.pos != self.pos)
            .map(|c| c.pos)
            .collect();
        candidates.sort_by_key(|p| (p.squared_distance(&self.pos), *p));

        let gate1 = candidates.first().copied();
        let gate2 = candidates.get(1).copied();
        for gate in [gate1, gate2].into_iter().flatten() {
            command_gate(host, gate, true);
        }

        self.state = ControllerState {
            gate1,
            gate2,
            ..ControllerState::default()
        };
        command_gate(host, self.pos, false);

        self.light_radius = radius.max(self.config.min_light_radius);
        self.bind_lights(host);
        self.bind_effects(host);

        let bound = usize::from(gate1.is_some()) + usize::from(gate2.is_some());
        info!(
            "controller {} bound {} gate(s): gate1={:?}, gate2={:?}",
            self.pos, bound, gate1, gate2
        );
        bound
    }

    /// Rebind both light groups at the current light radius and switch every
    /// bound lamp off.
    pub fn bind_lights<H: SpatialIndex + LampControl + ?Sized>(&mut self, host: &mut H) {
        self.lights1
            .bind_lights(host, self.pos, self.axis, self.light_radius);
        self.lights2
            .bind_lights(host, self.pos, self.axis, self.light_radius);
        self.lights1.all_off(host);
        self.lights2.all_off(host);
        debug!(
            "controller {} lamps: side1={}, side2={}",
            self.pos,
            self.lights1.len(),
            self.lights2.len()
        );
    }

    /// Rebind both sides' emitters and displays at the light radius, stop
    /// every emitter and show the current karma levels.
    pub fn bind_effects<H: SpatialIndex + EffectControl + ?Sized>(&mut self, host: &mut H) {
        self.effects1
            .bind(host, self.pos, self.axis, self.light_radius);
        self.effects2
            .bind(host, self.pos, self.axis, self.light_radius);
        self.stop_effects(host);
        self.show_karma(host);
        debug!(
            "controller {} effects: side1={}, side2={}",
            self.pos,
            self.effects1.len(),
            self.effects2.len()
        );
    }

    // ── Tick ─────────────────────────────────────────────────────────────

    /// Advance one host tick.
    pub fn tick<H: GateHost + ?Sized>(&mut self, host: &mut H) {
        let tick = self.state.light_tick;
        self.state.light_tick = tick.wrapping_add(1);

        if self.state.cooldown_ticks > 0 {
            self.tick_cooldown(host);
            return;
        }

        if let Some(side) = self.state.pending_reset_side {
            self.tick_pending_reset(host, side);
            return;
        }

        match self.state.cycle_phase {
            None => self.tick_idle(host, tick),
            Some(side) => self.tick_cycle(host, side, tick),
        }
    }

    fn tick_cooldown<H: GateHost + ?Sized>(&mut self, host: &mut H) {
        self.state.cooldown_ticks -= 1;
        self.state.prepare1 = 0;
        self.state.prepare2 = 0;
        self.state.wash_ticks = 0;
        command_gate(host, self.pos, false);
        self.lights_off(host);

        if self.state.cooldown_ticks == 0 {
            info!("controller {} cooldown done", self.pos);
        }
    }

    fn tick_pending_reset<H: GateHost + ?Sized>(&mut self, host: &mut H, side: Side) {
        command_gate(host, self.pos, false);
        self.lights_off(host);

        if self.state.reset_delay_ticks > 0 {
            self.state.reset_delay_ticks -= 1;
            return;
        }

        if let Some(gate) = self.gate(side) {
            command_gate(host, gate, true);
        }
        self.stop_effects(host);
        self.state.pending_reset_side = None;
        self.state.cooldown_ticks = self.config.cooldown;
        info!(
            "controller {} reopened {} gate, cooldown {}",
            self.pos, side, self.config.cooldown
        );
    }

    fn tick_idle<H: GateHost + ?Sized>(&mut self, host: &mut H, tick: u32) {
        let in_side1 = self.occupied(host, Side::Side1);
        let in_side2 = self.occupied(host, Side::Side2);

        // Nobody may start a cycle while both sides are waiting.
        if in_side1 && in_side2 {
            self.state.prepare1 = 0;
            self.state.prepare2 = 0;
            self.state.wash_ticks = 0;
            command_gate(host, self.pos, false);
            self.lights_off(host);
            self.water_off(host);
            return;
        }

        let threshold = self.config.prepare_threshold;
        self.state.prepare1 = if in_side1 {
            (self.state.prepare1 + 1).min(threshold)
        } else {
            0
        };
        self.state.prepare2 = if in_side2 {
            (self.state.prepare2 + 1).min(threshold)
        } else {
            0
        };

        match (self.state.prepare1 > 0, self.state.prepare2 > 0) {
            (true, false) => {
                self.lights1.blink_bottom_top_alternate(host, tick);
                self.lights2.all_off(host);
                self.effects1.set(host, EffectKind::Water, false);
                self.effects2.set(host, EffectKind::Water, true);
            }
            (false, true) => {
                self.lights2.blink_bottom_top_alternate(host, tick);
                self.lights1.all_off(host);
                self.effects2.set(host, EffectKind::Water, false);
                self.effects1.set(host, EffectKind::Water, true);
            }
            _ => {
                self.lights_off(host);
                self.water_off(host);
            }
        }

        for side in Side::BOTH {
            if self.prepare(side) >= threshold {
                self.start_cycle(host, side);
                break;
            }
        }
    }

    fn start_cycle<H: GateHost + ?Sized>(&mut self, host: &mut H, side: Side) {
        if let Some(gate) = self.gate(side) {
            command_gate(host, gate, false);
        }
        self.state.prepare1 = 0;
        self.state.prepare2 = 0;
        self.state.wash_ticks = 0;
        command_gate(host, self.pos, false);
        self.lights_off(host);

        let entry = self.effects(side);
        for kind in EffectKind::EMITTERS {
            entry.set(host, kind, true);
        }
        self.effects(side.opposite()).set(host, EffectKind::Water, false);

        self.state.cycle_phase = Some(side);
        info!("controller {} cycle started from {}", self.pos, side);
    }

    fn tick_cycle<H: GateHost + ?Sized>(&mut self, host: &mut H, side: Side, tick: u32) {
        *self.prepare_mut(side.opposite()) = 0;

        let middle_open = host.is_gate_open(self.pos).unwrap_or(false);
        if !middle_open {
            self.state.wash_ticks = self.state.wash_ticks.saturating_add(1);
            self.lights_off(host);
            if self.state.wash_ticks > self.config.wash_threshold {
                self.effects(side).stop_all(host);
                if command_gate(host, self.pos, true) {
                    info!("controller {} wash done, middle gate open", self.pos);
                }
            }
        } else {
            self.chase(host, tick);
        }

        if !self.occupied(host, side) {
            self.end_cycle(host, side);
        }
    }

    fn end_cycle<H: GateHost + ?Sized>(&mut self, host: &mut H, side: Side) {
        command_gate(host, self.pos, false);
        let entry = self.effects(side);
        entry.set(host, EffectKind::Heat, false);
        entry.set(host, EffectKind::Steam, false);
        entry.set(host, EffectKind::Water, true);
        self.state.cycle_phase = None;
        self.state.wash_ticks = 0;
        self.state.prepare1 = 0;
        self.state.prepare2 = 0;
        self.lights_off(host);
        self.state.pending_reset_side = Some(side);
        self.state.reset_delay_ticks = self.config.reset_delay;
        info!(
            "controller {} {} zone clear, reopening in {} ticks",
            self.pos, side, self.config.reset_delay
        );
    }

    // ── Lamps ────────────────────────────────────────────────────────────

    /// Ring of lamps for the chase: side 1 bottom, side 2 bottom, side 2
    /// top, side 1 top. Unbound entries and repeats are dropped.
    pub fn chase_ring(&self) -> Vec<BlockPos> {
        let mut ring = Vec::with_capacity(4);
        let candidates = [
            self.lights1.bottom(),
            self.lights2.bottom(),
            self.lights2.top(),
            self.lights1.top(),
        ];
        for pos in candidates.into_iter().flatten() {
            if !ring.contains(&pos) {
                ring.push(pos);
            }
        }
        ring
    }

    /// Light one ring lamp per `chase_step` window and keep every other bound
    /// lamp dark. With fewer than two ring lamps both sides blink instead.
    pub fn chase<H: LampControl + ?Sized>(&self, host: &mut H, tick: u32) {
        let ring = self.chase_ring();
        if ring.len() < 2 {
            self.lights1.blink_all(host, tick);
            self.lights2.blink_all(host, tick);
            return;
        }

        let step = (tick / self.config.chase_step) as usize % ring.len();
        let lit = [ring[step]];
        self.lights1.show_only(host, &lit);
        self.lights2.show_only(host, &lit);
    }

    fn lights_off<H: LampControl + ?Sized>(&self, host: &mut H) {
        self.lights1.all_off(host);
        self.lights2.all_off(host);
    }

    // ── Effects ──────────────────────────────────────────────────────────

    fn water_off<H: EffectControl + ?Sized>(&self, host: &mut H) {
        self.effects1.set(host, EffectKind::Water, false);
        self.effects2.set(host, EffectKind::Water, false);
    }

    fn stop_effects<H: EffectControl + ?Sized>(&self, host: &mut H) {
        self.effects1.stop_all(host);
        self.effects2.stop_all(host);
    }

    /// Push both sides' karma levels to their displays.
    pub fn show_karma<H: EffectControl + ?Sized>(&self, host: &mut H) {
        self.effects1.show_karma(host, self.karma1);
        self.effects2.show_karma(host, self.karma2);
    }

    fn occupied<H: OccupancyQuery + ?Sized>(&self, host: &H, side: Side) -> bool {
        let zone = side_zone(self.pos, self.axis, side, &self.config);
        host.any_occupant_in_square(zone.cx, zone.cz, zone.half_side)
    }

    // ── Accessors ────────────────────────────────────────────────────────

    pub fn pos(&self) -> BlockPos {
        self.pos
    }

    pub fn axis(&self) -> GateAxis {
        self.axis
    }

    pub fn config(&self) -> &GateConfig {
        &self.config
    }

    pub fn state(&self) -> &ControllerState {
        &self.state
    }

    pub fn phase(&self) -> Option<Side> {
        self.state.cycle_phase
    }

    pub fn pending_reset_side(&self) -> Option<Side> {
        self.state.pending_reset_side
    }

    pub fn prepare(&self, side: Side) -> u32 {
        match side {
            Side::Side1 => self.state.prepare1,
            Side::Side2 => self.state.prepare2,
        }
    }

    fn prepare_mut(&mut self, side: Side) -> &mut u32 {
        match side {
            Side::Side1 => &mut self.state.prepare1,
            Side::Side2 => &mut self.state.prepare2,
        }
    }

    pub fn wash_ticks(&self) -> u32 {
        self.state.wash_ticks
    }

    pub fn cooldown_ticks(&self) -> u32 {
        self.state.cooldown_ticks
    }

    pub fn reset_delay_ticks(&self) -> u32 {
        self.state.reset_delay_ticks
    }

    pub fn light_tick(&self) -> u32 {
        self.state.light_tick
    }

    pub fn light_radius(&self) -> i32 {
        self.light_radius
    }

    /// True while cooling down; no cycle can start.
    pub fn is_locked(&self) -> bool {
        self.state.cooldown_ticks > 0
    }

    /// Outer gate bound to `side`: the nearest gate is side 1's.
    pub fn gate(&self, side: Side) -> Option<BlockPos> {
        match side {
            Side::Side1 => self.state.gate1,
            Side::Side2 => self.state.gate2,
        }
    }

    pub fn lights(&self, side: Side) -> &GateLightGroup {
        match side {
            Side::Side1 => &self.lights1,
            Side::Side2 => &self.lights2,
        }
    }

    pub fn effects(&self, side: Side) -> &SideEffects {
        match side {
            Side::Side1 => &self.effects1,
            Side::Side2 => &self.effects2,
        }
    }

    pub fn karma(&self, side: Side) -> KarmaLevel {
        match side {
            Side::Side1 => self.karma1,
            Side::Side2 => self.karma2,
        }
    }

    /// Set the required karma for one side and show it on that side's
    /// displays. Returns false if unchanged.
    pub fn set_karma<H: EffectControl + ?Sized>(&mut self, host: &mut H, side: Side, level: KarmaLevel) -> bool {
        let slot = match side {
            Side::Side1 => &mut self.karma1,
            Side::Side2 => &mut self.karma2,
        };
        if *slot == level {
            return false;
        }
        *slot = level;
        self.effects(side).show_karma(host, level);
        info!("controller {} {} karma -> {}", self.pos, side, level.tag());
        true
    }

    /// Open state of the bound outer gates, `None` where unbound or missing.
    pub fn outer_gate_states<H: GateControl + ?Sized>(
        &self,
        host: &H,
    ) -> (Option<bool>, Option<bool>) {
        (
            self.state.gate1.and_then(|g| host.is_gate_open(g)),
            self.state.gate2.and_then(|g| host.is_gate_open(g)),
        )
    }
}
