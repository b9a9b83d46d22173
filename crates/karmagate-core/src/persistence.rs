//! Save/Load functionality for persisting the gate world
//!
//! Uses bincode for compact binary serialization. Block entities are stored
//! with their positions; controllers as logic snapshots that are restored
//! against the rebuilt world.

use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;

use karmagate_logic::config::GateConfig;
use karmagate_logic::controller::KarmaGateController;
use karmagate_logic::geometry::BlockPos;
use karmagate_logic::snapshot::ControllerSnapshot;
use log::{info, warn};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::components::{Emitter, GateLeaf, KarmaDisplay, Lamp, Occupant};
use crate::engine::GateEngine;
use crate::world::EngineError;

/// Version number for save file format (increment when format changes)
const SAVE_VERSION: u32 = 2;

/// Serializable snapshot of the whole world
#[derive(Serialize, Deserialize)]
pub struct SaveData {
    pub version: u32,
    pub tick_count: u64,
    pub config: GateConfig,
    pub gates: Vec<SavedGate>,
    pub lamps: Vec<SavedLamp>,
    pub emitters: Vec<SavedEmitter>,
    pub displays: Vec<SavedDisplay>,
    pub occupants: Vec<Occupant>,
    pub controllers: Vec<SavedController>,
}

#[derive(Serialize, Deserialize)]
pub struct SavedGate {
    pub pos: BlockPos,
    pub leaf: GateLeaf,
}

#[derive(Serialize, Deserialize)]
pub struct SavedLamp {
    pub pos: BlockPos,
    pub lamp: Lamp,
}

#[derive(Serialize, Deserialize)]
pub struct SavedEmitter {
    pub pos: BlockPos,
    pub emitter: Emitter,
}

#[derive(Serialize, Deserialize)]
pub struct SavedDisplay {
    pub pos: BlockPos,
    pub display: KarmaDisplay,
}

#[derive(Serialize, Deserialize)]
pub struct SavedController {
    pub pos: BlockPos,
    pub snapshot: ControllerSnapshot,
}

/// Errors that can occur during save/load
#[derive(Debug, Error)]
pub enum SaveError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Serialization error: {0}")]
    Bincode(#[from] bincode::Error),
    #[error("Save version mismatch: expected {expected}, found {found}")]
    VersionMismatch { expected: u32, found: u32 },
    #[error("Corrupt save: {0}")]
    World(#[from] EngineError),
}

/// Save the complete world to a writer
pub fn save_world<W: Write>(writer: W, engine: &GateEngine) -> Result<(), SaveError> {
    let host = &engine.host;
    let save_data = SaveData {
        version: SAVE_VERSION,
        tick_count: engine.tick_count(),
        config: engine.config().clone(),
        gates: host
            .gates()
            .into_iter()
            .map(|(pos, leaf)| SavedGate { pos, leaf })
            .collect(),
        lamps: host
            .lamps()
            .into_iter()
            .map(|(pos, lamp)| SavedLamp { pos, lamp })
            .collect(),
        emitters: host
            .emitters()
            .into_iter()
            .map(|(pos, emitter)| SavedEmitter { pos, emitter })
            .collect(),
        displays: host
            .displays()
            .into_iter()
            .map(|(pos, display)| SavedDisplay { pos, display })
            .collect(),
        occupants: host.occupants(),
        controllers: engine
            .controllers()
            .map(|c| SavedController {
                pos: c.pos(),
                snapshot: c.snapshot(),
            })
            .collect(),
    };

    bincode::serialize_into(writer, &save_data)?;
    Ok(())
}

/// Load a world from a reader
pub fn load_world<R: Read>(reader: R) -> Result<GateEngine, SaveError> {
    let save_data: SaveData = bincode::deserialize_from(reader)?;

    if save_data.version != SAVE_VERSION {
        return Err(SaveError::VersionMismatch {
            expected: SAVE_VERSION,
            found: save_data.version,
        });
    }

    let mut engine = GateEngine::with_config(save_data.config);
    engine.set_tick_count(save_data.tick_count);

    for gate in save_data.gates {
        engine.host.spawn_gate_leaf(gate.pos, gate.leaf)?;
    }
    for lamp in save_data.lamps {
        engine.host.spawn_lamp_state(lamp.pos, lamp.lamp)?;
    }
    for saved in save_data.emitters {
        engine.host.spawn_emitter_state(saved.pos, saved.emitter)?;
    }
    for saved in save_data.displays {
        engine.host.spawn_display_state(saved.pos, saved.display)?;
    }
    for o in save_data.occupants {
        engine.host.spawn_occupant(o.x, o.y, o.z);
    }

    let mut restored = 0;
    for saved in save_data.controllers {
        let Some(leaf) = engine.host.gate(saved.pos) else {
            warn!("dropping controller {}: its gate is missing", saved.pos);
            continue;
        };
        let controller = KarmaGateController::restore(
            saved.pos,
            leaf.axis,
            engine.config().clone(),
            &saved.snapshot,
            &engine.host,
        );
        engine.insert_controller(controller);
        restored += 1;
    }

    info!(
        "loaded world at tick {} with {} controller(s)",
        engine.tick_count(),
        restored
    );
    Ok(engine)
}

pub fn save_to_file(path: impl AsRef<Path>, engine: &GateEngine) -> Result<(), SaveError> {
    let mut writer = BufWriter::new(File::create(path)?);
    save_world(&mut writer, engine)?;
    writer.flush()?;
    Ok(())
}

pub fn load_from_file(path: impl AsRef<Path>) -> Result<GateEngine, SaveError> {
    load_world(BufReader::new(File::open(path)?))
}
