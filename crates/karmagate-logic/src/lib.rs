//! Pure airlock logic for KarmaGate.
//!
//! This crate holds the airlock state machine and everything it needs that
//! does not depend on a particular world or engine. The host supplies
//! occupancy, gates and lamps through the traits in [`host`]; the controller
//! only ever reads booleans and issues open/lit commands.
//!
//! # Module Overview
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | Timings and zone geometry, JSON overrides |
//! | [`controller`] | The airlock state machine |
//! | [`effects`] | Wash emitters and karma displays per side |
//! | [`geometry`] | Block positions, gate axis, sides, occupancy zones |
//! | [`host`] | Collaborator traits the host world implements |
//! | [`karma`] | Required karma level per side |
//! | [`lights`] | Per-side lamp groups and blink patterns |
//! | [`snapshot`] | Save/restore of controller state |

pub mod config;
pub mod controller;
pub mod effects;
pub mod geometry;
pub mod host;
pub mod karma;
pub mod lights;
pub mod snapshot;

#[cfg(test)]
mod testing;
