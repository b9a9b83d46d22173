//! Save/restore of a controller's resumable state.
//!
//! Only plain scalars and the two optional gate positions are stored.
//! Phase and side fields are string tags so that an unreadable tag can
//! fall back to idle instead of failing the whole load.

use serde::{Deserialize, Serialize};

use crate::config::GateConfig;
use crate::controller::{ControllerState, KarmaGateController};
use crate::geometry::{BlockPos, GateAxis, Side};
use crate::host::SpatialIndex;
use crate::karma::KarmaLevel;

const NONE_TAG: &str = "NONE";

/// Serializable view of a controller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ControllerSnapshot {
    pub gate1: Option<BlockPos>,
    pub gate2: Option<BlockPos>,
    pub prepare1: u32,
    pub prepare2: u32,
    pub wash_ticks: u32,
    pub cooldown_ticks: u32,
    pub lamp_blink: u32,
    pub cycle_phase: String,
    pub pending_reset_side: String,
    pub reset_delay_ticks: u32,
    pub light_radius: i32,
    pub karma_side1: String,
    pub karma_side2: String,
}

fn side_tag(side: Option<Side>) -> String {
    side.map(Side::tag).unwrap_or(NONE_TAG).to_string()
}

fn parse_side(tag: &str) -> Option<Side> {
    // "NONE" and anything unrecognised both mean idle.
    Side::from_tag(tag)
}

impl KarmaGateController {
    pub fn snapshot(&self) -> ControllerSnapshot {
        let state = self.state();
        ControllerSnapshot {
            gate1: state.gate1,
            gate2: state.gate2,
            prepare1: state.prepare1,
            prepare2: state.prepare2,
            wash_ticks: state.wash_ticks,
            cooldown_ticks: state.cooldown_ticks,
            lamp_blink: state.light_tick,
            cycle_phase: side_tag(state.cycle_phase),
            pending_reset_side: side_tag(state.pending_reset_side),
            reset_delay_ticks: state.reset_delay_ticks,
            light_radius: self.light_radius(),
            karma_side1: self.karma(Side::Side1).tag().to_string(),
            karma_side2: self.karma(Side::Side2).tag().to_string(),
        }
    }

    /// Rebuild a controller from a snapshot, rebinding lamps from `host`.
    ///
    /// Prepare counters are clamped to the configured threshold. A running
    /// cycle clears its owner's opposite counter and any pending reset, so a
    /// hand-edited save cannot put the machine in a state it could not reach
    /// by ticking.
    pub fn restore<H: SpatialIndex + ?Sized>(
        pos: BlockPos,
        axis: GateAxis,
        config: GateConfig,
        snapshot: &ControllerSnapshot,
        host: &H,
    ) -> Self {
        let threshold = config.prepare_threshold;
        let mut state = ControllerState {
            gate1: snapshot.gate1,
            gate2: snapshot.gate2,
            prepare1: snapshot.prepare1.min(threshold),
            prepare2: snapshot.prepare2.min(threshold),
            wash_ticks: snapshot.wash_ticks,
            cooldown_ticks: snapshot.cooldown_ticks,
            cycle_phase: parse_side(&snapshot.cycle_phase),
            pending_reset_side: parse_side(&snapshot.pending_reset_side),
            reset_delay_ticks: snapshot.reset_delay_ticks,
            light_tick: snapshot.lamp_blink,
        };
        if let Some(side) = state.cycle_phase {
            match side {
                Side::Side1 => state.prepare2 = 0,
                Side::Side2 => state.prepare1 = 0,
            }
            state.pending_reset_side = None;
            state.reset_delay_ticks = 0;
        }

        let light_radius = snapshot.light_radius.max(config.min_light_radius);
        let karma = (
            KarmaLevel::from_tag(&snapshot.karma_side1),
            KarmaLevel::from_tag(&snapshot.karma_side2),
        );
        KarmaGateController::from_parts(pos, axis, config, state, light_radius, karma, host)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MockHost;

    const CTRL: BlockPos = BlockPos::new(0, 64, 0);

    fn configured() -> (MockHost, KarmaGateController) {
        let mut host = MockHost::new();
        host.add_controller_gate(CTRL);
        host.add_gate(BlockPos::new(0, 64, -3), true);
        host.add_gate(BlockPos::new(0, 64, 5), true);
        host.add_lamp(BlockPos::new(-2, 62, -2));
        host.add_lamp(BlockPos::new(-2, 62, 3));
        let mut controller = KarmaGateController::new(CTRL, GateAxis::X, GateConfig::default());
        controller.configure(&mut host, 8);
        (host, controller)
    }

    #[test]
    fn snapshot_restores_mid_cycle() {
        let (mut host, mut controller) = configured();
        controller.set_karma(&mut host, Side::Side1, KarmaLevel::D);
        host.occupants.push((0.5, -6.0));
        for _ in 0..150 {
            controller.tick(&mut host);
        }
        assert_eq!(controller.phase(), Some(Side::Side1));

        let snapshot = controller.snapshot();
        assert_eq!(snapshot.cycle_phase, "SIDE1");
        assert_eq!(snapshot.pending_reset_side, "NONE");

        let restored =
            KarmaGateController::restore(CTRL, GateAxis::X, GateConfig::default(), &snapshot, &host);
        assert_eq!(restored.state(), controller.state());
        assert_eq!(restored.karma(Side::Side1), KarmaLevel::D);
        assert_eq!(restored.lights(Side::Side1).len(), 1);
        assert_eq!(restored.lights(Side::Side2).len(), 1);
        assert_eq!(restored.snapshot(), snapshot);
    }

    #[test]
    fn invalid_tags_fall_back_to_idle() {
        let (host, controller) = configured();
        let mut snapshot = controller.snapshot();
        snapshot.cycle_phase = "SIDE7".into();
        snapshot.pending_reset_side = "".into();
        snapshot.karma_side2 = "???".into();

        let restored =
            KarmaGateController::restore(CTRL, GateAxis::X, GateConfig::default(), &snapshot, &host);
        assert_eq!(restored.phase(), None);
        assert_eq!(restored.pending_reset_side(), None);
        assert_eq!(restored.karma(Side::Side2), KarmaLevel::L0);
    }

    #[test]
    fn restore_clamps_counters() {
        let (host, controller) = configured();
        let mut snapshot = controller.snapshot();
        snapshot.prepare1 = 9_000;
        snapshot.prepare2 = 12;
        snapshot.cycle_phase = "SIDE1".into();

        let restored =
            KarmaGateController::restore(CTRL, GateAxis::X, GateConfig::default(), &snapshot, &host);
        assert_eq!(restored.prepare(Side::Side1), 60);
        assert_eq!(restored.prepare(Side::Side2), 0);
    }

    #[test]
    fn running_cycle_drops_a_pending_reset() {
        let (host, controller) = configured();
        let mut snapshot = controller.snapshot();
        snapshot.cycle_phase = "SIDE1".into();
        snapshot.pending_reset_side = "SIDE2".into();
        snapshot.reset_delay_ticks = 40;

        let restored =
            KarmaGateController::restore(CTRL, GateAxis::X, GateConfig::default(), &snapshot, &host);
        assert_eq!(restored.phase(), Some(Side::Side1));
        assert_eq!(restored.pending_reset_side(), None);
        assert_eq!(restored.reset_delay_ticks(), 0);

        // A pending reset on its own is kept.
        snapshot.cycle_phase = "NONE".into();
        let restored =
            KarmaGateController::restore(CTRL, GateAxis::X, GateConfig::default(), &snapshot, &host);
        assert_eq!(restored.pending_reset_side(), Some(Side::Side2));
        assert_eq!(restored.reset_delay_ticks(), 40);
    }

    #[test]
    fn snapshot_survives_json() {
        let (_, controller) = configured();
        let snapshot = controller.snapshot();
        let json = serde_json::to_string(&snapshot).unwrap();
        let back: ControllerSnapshot = serde_json::from_str(&json).unwrap();
        assert_eq!(back, snapshot);
    }
}
