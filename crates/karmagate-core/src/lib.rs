//! KarmaGate Core - airlock host world
//!
//! An ECS-backed block world that hosts KarmaGate airlock controllers.
//! Gates and lamps are block entities, occupants are free-moving points,
//! and every controller from `karmagate-logic` is driven once per tick.
//!
//! # Architecture
//!
//! The world uses an Entity Component System (ECS) via `hecs`:
//! - **Entities**: gate leaves, lamps, effect emitters, karma displays, occupants
//! - **Components**: pure data ([`components::GateLeaf`], [`components::Lamp`], ...)
//! - **Engine**: owns the world plus controllers and implements the host traits
//!
//! # Example
//!
//! ```rust,no_run
//! use karmagate_core::prelude::*;
//! use karmagate_logic::geometry::{BlockPos, GateAxis};
//!
//! let mut engine = GateEngine::new();
//! let ctrl = BlockPos::new(0, 64, 0);
//! engine.spawn_gate(ctrl, GateAxis::X, false).unwrap();
//! engine.spawn_gate(BlockPos::new(0, 64, -3), GateAxis::X, false).unwrap();
//! engine.spawn_gate(BlockPos::new(0, 64, 5), GateAxis::X, false).unwrap();
//! engine.configure_controller(ctrl, 8).unwrap();
//!
//! loop {
//!     engine.tick(); // 20 ticks per second
//! }
//! ```

pub mod components;
pub mod engine;
pub mod persistence;
pub mod world;

/// Commonly used types for convenient importing
pub mod prelude {
    pub use crate::components::*;
    pub use crate::engine::GateEngine;
    pub use crate::world::{EngineError, HostEvent, HostWorld};
}
