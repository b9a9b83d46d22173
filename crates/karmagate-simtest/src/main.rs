//! KarmaGate Headless Simulation Harness
//!
//! Drives airlocks through the engine and checks their observable
//! behaviour: gate order, deadlock handling, lamp timing, wash effects,
//! persistence.
//! Runs entirely in-process with no host game attached.
//!
//! Usage:
//!   cargo run -p karmagate-simtest
//!   cargo run -p karmagate-simtest -- --verbose
//!   cargo run -p karmagate-simtest -- --config gate.json --seed 7

use karmagate_core::prelude::*;
use karmagate_logic::config::GateConfig;
use karmagate_logic::effects::EffectKind;
use karmagate_logic::geometry::{BlockPos, GateAxis, Side};
use karmagate_logic::host::{EffectControl, GateControl};
use karmagate_logic::karma::KarmaLevel;
use karmagate_logic::snapshot::ControllerSnapshot;
use log::{error, info, LevelFilter};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

// ── Test harness ────────────────────────────────────────────────────────

struct TestResult {
    name: String,
    passed: bool,
    detail: String,
}

struct Options {
    verbose: bool,
    config: GateConfig,
    seed: u64,
}

fn parse_args() -> Result<Options, String> {
    let mut options = Options {
        verbose: false,
        config: GateConfig::default(),
        seed: 42,
    };
    let mut args = std::env::args().skip(1);
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--verbose" => options.verbose = true,
            "--config" => {
                let path = args.next().ok_or("--config needs a path")?;
                options.config = GateConfig::load(&path).map_err(|e| format!("{}: {}", path, e))?;
            }
            "--seed" => {
                let value = args.next().ok_or("--seed needs a number")?;
                options.seed = value
                    .parse()
                    .map_err(|e| format!("bad seed {:?}: {}", value, e))?;
            }
            other => return Err(format!("unknown argument {:?}", other)),
        }
    }
    Ok(options)
}

fn main() {
    let options = match parse_args() {
        Ok(o) => o,
        Err(e) => {
            eprintln!("karmagate-simtest: {}", e);
            std::process::exit(2);
        }
    };

    env_logger::Builder::from_default_env()
        .filter_level(if options.verbose {
            LevelFilter::Debug
        } else {
            LevelFilter::Warn
        })
        .init();

    println!("=== KarmaGate Simulation Harness ===\n");
    info!("config: {:?}", options.config);

    let verbose = options.verbose;
    let config = &options.config;
    let mut results = Vec::new();

    // 1. Full walk-through cycle
    results.extend(validate_cycle(config, verbose));

    // 2. Deadlock and overlap handling
    results.extend(validate_deadlock(config, verbose));

    // 3. Lamp timing
    results.extend(validate_lamps(config, verbose));

    // 4. Wash effects and karma displays
    results.extend(validate_effects(config, verbose));

    // 5. Randomised occupancy sweep
    results.extend(validate_random_sweep(config, options.seed, verbose));

    // 6. Save / load
    results.extend(validate_persistence(config, verbose));

    // ── Summary ──
    println!();
    let passed = results.iter().filter(|r| r.passed).count();
    let failed = results.iter().filter(|r| !r.passed).count();
    let total = results.len();

    for r in &results {
        let icon = if r.passed { "✓" } else { "✗" };
        if !r.passed || verbose {
            println!("  {} {}: {}", icon, r.name, r.detail);
        }
    }

    println!(
        "\n=== RESULT: {}/{} passed, {} failed ===",
        passed, total, failed
    );

    if failed > 0 {
        error!("{} check(s) failed", failed);
        std::process::exit(1);
    }
}

// ── Scenario fixture ────────────────────────────────────────────────────

const CTRL: BlockPos = BlockPos::new(0, 64, 0);
const GATE1: BlockPos = BlockPos::new(0, 64, -3);
const GATE2: BlockPos = BlockPos::new(0, 64, 5);
const LAMPS: [BlockPos; 4] = [
    BlockPos::new(-2, 62, -2),
    BlockPos::new(-2, 66, -2),
    BlockPos::new(-2, 62, 3),
    BlockPos::new(-2, 66, 3),
];
const EFFECTS: [(BlockPos, EffectKind); 6] = [
    (BlockPos::new(1, 63, -4), EffectKind::Water),
    (BlockPos::new(0, 62, -3), EffectKind::Heat),
    (BlockPos::new(-1, 68, -4), EffectKind::Steam),
    (BlockPos::new(2, 66, -2), EffectKind::Display),
    (BlockPos::new(1, 63, 5), EffectKind::Water),
    (BlockPos::new(2, 66, 3), EffectKind::Display),
];
const SIDE1_WATER: BlockPos = EFFECTS[0].0;
const SIDE2_WATER: BlockPos = EFFECTS[4].0;
const SIDE2_DISPLAY: BlockPos = EFFECTS[5].0;

/// Occupant positions relative to an X-aligned gate at the origin.
const SIDE1_SPOT: f64 = -6.0;
const SIDE2_SPOT: f64 = 8.0;
const OUTSIDE_SPOT: f64 = 25.0;

fn airlock(config: &GateConfig) -> GateEngine {
    let mut engine = GateEngine::with_config(config.clone());
    let spawned = engine
        .spawn_gate(CTRL, GateAxis::X, false)
        .and_then(|_| engine.spawn_gate(GATE1, GateAxis::X, false))
        .and_then(|_| engine.spawn_gate(GATE2, GateAxis::X, false));
    if let Err(e) = spawned {
        error!("fixture: {}", e);
    }
    for lamp in LAMPS {
        if let Err(e) = engine.spawn_lamp(lamp) {
            error!("fixture: {}", e);
        }
    }
    for (pos, kind) in EFFECTS {
        if let Err(e) = engine.spawn_effect(pos, kind) {
            error!("fixture: {}", e);
        }
    }
    if let Err(e) = engine.configure_controller(CTRL, 8) {
        error!("fixture: {}", e);
    }
    engine.host.drain_events();
    engine
}

fn phase(engine: &GateEngine) -> Option<Side> {
    engine.controller(CTRL).and_then(|c| c.phase())
}

fn gate_open(engine: &GateEngine, pos: BlockPos) -> bool {
    engine.host.is_gate_open(pos).unwrap_or(false)
}

// ── 1. Cycle ────────────────────────────────────────────────────────────

fn validate_cycle(config: &GateConfig, verbose: bool) -> Vec<TestResult> {
    println!("--- Airlock Cycle ---");
    let mut results = Vec::new();
    let mut engine = airlock(config);

    results.push(TestResult {
        name: "configure_opens_outer_gates".into(),
        passed: gate_open(&engine, GATE1) && gate_open(&engine, GATE2) && !gate_open(&engine, CTRL),
        detail: "gate1 and gate2 open, middle shut".into(),
    });

    let walker = engine.spawn_occupant(0.5, 64.0, SIDE1_SPOT);

    engine.run(config.prepare_threshold);
    results.push(TestResult {
        name: "prepare_commits_side1".into(),
        passed: phase(&engine) == Some(Side::Side1) && !gate_open(&engine, GATE1),
        detail: format!(
            "after {} ticks: phase={:?}, gate1 open={}",
            config.prepare_threshold,
            phase(&engine),
            gate_open(&engine, GATE1)
        ),
    });

    let mut opened_at = None;
    for t in 1..=config.wash_threshold + 5 {
        engine.tick();
        if gate_open(&engine, CTRL) {
            opened_at = Some(t);
            break;
        }
    }
    results.push(TestResult {
        name: "wash_then_middle_opens".into(),
        passed: opened_at == Some(config.wash_threshold + 1),
        detail: format!("middle opened after {:?} wash ticks", opened_at),
    });

    if let Err(e) = engine.move_occupant(walker, 0.5, 64.0, OUTSIDE_SPOT) {
        error!("move: {}", e);
    }
    engine.tick();
    engine.run(config.reset_delay + 1);
    let locked = engine.controller(CTRL).map(|c| c.is_locked()).unwrap_or(false);
    results.push(TestResult {
        name: "exit_reopens_entry_and_locks".into(),
        passed: gate_open(&engine, GATE1) && !gate_open(&engine, CTRL) && locked,
        detail: format!(
            "gate1 open={}, middle open={}, locked={}",
            gate_open(&engine, GATE1),
            gate_open(&engine, CTRL),
            locked
        ),
    });

    let events: Vec<HostEvent> = engine
        .host
        .drain_events()
        .into_iter()
        .filter(|e| matches!(e, HostEvent::GateOpened(_) | HostEvent::GateClosed(_)))
        .collect();
    let expected = vec![
        HostEvent::GateClosed(GATE1),
        HostEvent::GateOpened(CTRL),
        HostEvent::GateClosed(CTRL),
        HostEvent::GateOpened(GATE1),
    ];
    if verbose {
        println!("  gate events: {:?}", events);
    }
    results.push(TestResult {
        name: "gate_event_order".into(),
        passed: events == expected,
        detail: format!("{} gate events", events.len()),
    });

    engine.run(config.cooldown);
    results.push(TestResult {
        name: "cooldown_expires".into(),
        passed: engine.controller(CTRL).map(|c| !c.is_locked()).unwrap_or(false),
        detail: format!("unlocked after {} ticks", config.cooldown),
    });

    results
}

// ── 2. Deadlock ─────────────────────────────────────────────────────────

fn validate_deadlock(config: &GateConfig, _verbose: bool) -> Vec<TestResult> {
    println!("--- Deadlock ---");
    let mut results = Vec::new();

    let mut engine = airlock(config);
    let left = engine.spawn_occupant(0.5, 64.0, SIDE1_SPOT);
    engine.spawn_occupant(0.5, 64.0, SIDE2_SPOT);
    engine.run(config.prepare_threshold * 5);
    results.push(TestResult {
        name: "both_sides_waiting_blocks".into(),
        passed: phase(&engine).is_none() && gate_open(&engine, GATE1) && gate_open(&engine, GATE2),
        detail: format!("phase={:?}", phase(&engine)),
    });

    if let Err(e) = engine.remove_occupant(left) {
        error!("remove: {}", e);
    }
    engine.run(config.prepare_threshold);
    results.push(TestResult {
        name: "deadlock_clears_when_one_leaves".into(),
        passed: phase(&engine) == Some(Side::Side2),
        detail: format!("phase={:?}", phase(&engine)),
    });

    let mut engine = airlock(config);
    let overlap_z = (config.side1_offset + config.side2_offset) / 2.0 + 0.5;
    engine.spawn_occupant(0.5, 64.0, overlap_z);
    engine.run(config.prepare_threshold * 5);
    results.push(TestResult {
        name: "overlap_occupant_blocks".into(),
        passed: phase(&engine).is_none(),
        detail: format!("occupant at z={:.1}, phase={:?}", overlap_z, phase(&engine)),
    });

    results
}

// ── 3. Lamps ────────────────────────────────────────────────────────────

fn validate_lamps(config: &GateConfig, verbose: bool) -> Vec<TestResult> {
    println!("--- Lamps ---");
    let mut results = Vec::new();
    let mut engine = airlock(config);

    let (side1, side2) = match engine.controller(CTRL) {
        Some(c) => (c.lights(Side::Side1).len(), c.lights(Side::Side2).len()),
        None => (0, 0),
    };
    results.push(TestResult {
        name: "lamps_bound_per_side".into(),
        passed: side1 == 2 && side2 == 2,
        detail: format!("side1={}, side2={}", side1, side2),
    });

    engine.spawn_occupant(0.5, 64.0, SIDE1_SPOT);
    let side1_lamps = [LAMPS[0], LAMPS[1]];
    let mut wrong_side = 0;
    for _ in 0..config.prepare_threshold - 1 {
        engine.tick();
        wrong_side += engine
            .host
            .lit_lamps()
            .iter()
            .filter(|p| !side1_lamps.contains(p))
            .count();
    }
    results.push(TestResult {
        name: "prepare_blinks_own_side".into(),
        passed: wrong_side == 0,
        detail: format!("{} lamp-ticks lit on the other side", wrong_side),
    });

    engine.run(1 + config.wash_threshold + 1);
    let ring = engine
        .controller(CTRL)
        .map(|c| c.chase_ring())
        .unwrap_or_default();
    let mut visited = Vec::new();
    let mut single = true;
    for _ in 0..config.chase_step * ring.len() as u32 {
        engine.tick();
        let lit = engine.host.lit_lamps();
        single &= lit.len() == 1;
        if let Some(&pos) = lit.first() {
            if visited.last() != Some(&pos) {
                visited.push(pos);
            }
        }
    }
    if verbose {
        println!("  chase visited: {:?}", visited);
    }
    let mut covered = visited.clone();
    covered.sort();
    covered.dedup();
    results.push(TestResult {
        name: "chase_one_lamp_at_a_time".into(),
        passed: single && covered.len() == ring.len(),
        detail: format!("ring of {}, visited {}", ring.len(), covered.len()),
    });

    results
}

// ── 4. Effects ──────────────────────────────────────────────────────────

fn validate_effects(config: &GateConfig, verbose: bool) -> Vec<TestResult> {
    println!("--- Wash Effects ---");
    let mut results = Vec::new();
    let mut engine = airlock(config);

    let (side1, side2) = match engine.controller(CTRL) {
        Some(c) => (c.effects(Side::Side1).len(), c.effects(Side::Side2).len()),
        None => (0, 0),
    };
    results.push(TestResult {
        name: "effects_bound_per_side".into(),
        passed: side1 == 4 && side2 == 2,
        detail: format!("side1={}, side2={}", side1, side2),
    });

    engine.spawn_occupant(0.5, 64.0, SIDE1_SPOT);
    engine.tick();
    let running = engine.host.running_emitters();
    results.push(TestResult {
        name: "prepare_runs_opposite_water".into(),
        passed: running == vec![SIDE2_WATER],
        detail: format!("running: {:?}", running),
    });

    engine.run(config.prepare_threshold);
    let running = engine.host.running_emitters();
    if verbose {
        println!("  washing with: {:?}", running);
    }
    results.push(TestResult {
        name: "wash_runs_entry_effects".into(),
        passed: running.len() == 3 && running.contains(&SIDE1_WATER),
        detail: format!("{} emitters running", running.len()),
    });

    engine.run(config.wash_threshold);
    let running = engine.host.running_emitters();
    results.push(TestResult {
        name: "wash_done_stops_effects".into(),
        passed: gate_open(&engine, CTRL) && running.is_empty(),
        detail: format!("middle open={}, {} running", gate_open(&engine, CTRL), running.len()),
    });

    let shown = engine
        .set_karma(CTRL, Side::Side2, KarmaLevel::D)
        .map(|_| engine.host.display_karma(SIDE2_DISPLAY));
    results.push(TestResult {
        name: "karma_reaches_display".into(),
        passed: matches!(shown, Ok(Some(KarmaLevel::D))),
        detail: format!("side2 display shows {:?}", shown),
    });

    results
}

// ── 5. Random sweep ─────────────────────────────────────────────────────

fn validate_random_sweep(config: &GateConfig, seed: u64, verbose: bool) -> Vec<TestResult> {
    println!("--- Random Sweep (seed {}) ---", seed);
    let mut results = Vec::new();
    let mut rng = StdRng::seed_from_u64(seed);
    let mut engine = airlock(config);

    let mut occupants = Vec::new();
    let mut both_outer_shut = 0u32;
    let mut middle_with_outer = 0u32;
    let mut cycles = 0u32;
    let mut last_phase = None;

    for _ in 0..20_000 {
        match rng.gen_range(0..100) {
            0 if occupants.len() < 3 => {
                let z = rng.gen_range(-15.0..15.0);
                occupants.push(engine.spawn_occupant(rng.gen_range(-3.0..4.0), 64.0, z));
            }
            1 if !occupants.is_empty() => {
                let i = rng.gen_range(0..occupants.len());
                let who = occupants.swap_remove(i);
                if let Err(e) = engine.remove_occupant(who) {
                    error!("sweep: {}", e);
                }
            }
            2 if !occupants.is_empty() => {
                let i = rng.gen_range(0..occupants.len());
                let z = rng.gen_range(-15.0..15.0);
                if let Err(e) = engine.move_occupant(occupants[i], 0.5, 64.0, z) {
                    error!("sweep: {}", e);
                }
            }
            _ => {}
        }

        engine.tick();

        let g1 = gate_open(&engine, GATE1);
        let g2 = gate_open(&engine, GATE2);
        if !g1 && !g2 {
            both_outer_shut += 1;
        }
        let middle = gate_open(&engine, CTRL);
        if middle {
            if let Some(side) = phase(&engine) {
                let entry = match side {
                    Side::Side1 => g1,
                    Side::Side2 => g2,
                };
                if entry {
                    middle_with_outer += 1;
                }
            }
        }
        let now = phase(&engine);
        if now.is_some() && last_phase.is_none() {
            cycles += 1;
        }
        last_phase = now;
    }

    if verbose {
        println!("  {} cycles started", cycles);
    }
    results.push(TestResult {
        name: "one_outer_gate_at_most_shut".into(),
        passed: both_outer_shut == 0,
        detail: format!("{} ticks with both outer gates shut", both_outer_shut),
    });
    results.push(TestResult {
        name: "middle_never_open_with_entry".into(),
        passed: middle_with_outer == 0,
        detail: format!("{} ticks with middle and entry both open", middle_with_outer),
    });
    results.push(TestResult {
        name: "sweep_made_progress".into(),
        passed: cycles > 0,
        detail: format!("{} cycles", cycles),
    });

    results
}

// ── 6. Persistence ──────────────────────────────────────────────────────

fn validate_persistence(config: &GateConfig, _verbose: bool) -> Vec<TestResult> {
    println!("--- Persistence ---");
    let mut results = Vec::new();
    let mut engine = airlock(config);
    if let Err(e) = engine.set_karma(CTRL, Side::Side2, KarmaLevel::L3) {
        error!("fixture: {}", e);
    }
    engine.spawn_occupant(0.5, 64.0, SIDE2_SPOT);
    engine.run(config.prepare_threshold + config.wash_threshold / 2);

    let mut buffer = Vec::new();
    let saved = engine.save(&mut buffer);
    let mut loaded = GateEngine::new();
    let restored = saved.and_then(|_| loaded.load(&buffer[..]));
    results.push(TestResult {
        name: "save_load_roundtrip".into(),
        passed: restored.is_ok(),
        detail: match &restored {
            Ok(()) => format!("{} bytes", buffer.len()),
            Err(e) => e.to_string(),
        },
    });

    let same_state = engine.controller(CTRL).map(|c| c.state()) == loaded.controller(CTRL).map(|c| c.state());
    let karma = loaded.controller(CTRL).map(|c| c.karma(Side::Side2));
    results.push(TestResult {
        name: "controller_state_restored".into(),
        passed: same_state && karma == Some(KarmaLevel::L3),
        detail: format!("state equal={}, karma={:?}", same_state, karma),
    });

    engine.run(config.wash_threshold);
    loaded.run(config.wash_threshold);
    results.push(TestResult {
        name: "restored_world_runs_in_lockstep".into(),
        passed: engine.controller(CTRL).map(|c| c.state()) == loaded.controller(CTRL).map(|c| c.state())
            && engine.host.lit_lamps() == loaded.host.lit_lamps(),
        detail: format!("tick {} vs {}", engine.tick_count(), loaded.tick_count()),
    });

    let snapshot = engine.controller(CTRL).map(|c| c.snapshot());
    let json_ok = snapshot
        .as_ref()
        .and_then(|s| serde_json::to_string(s).ok())
        .and_then(|j| serde_json::from_str::<ControllerSnapshot>(&j).ok())
        == snapshot;
    results.push(TestResult {
        name: "snapshot_json_roundtrip".into(),
        passed: snapshot.is_some() && json_ok,
        detail: "controller snapshot survives JSON".into(),
    });

    results
}
