//! Deterministic simulation module
//!
//! All gameplay logic lives here. This module must be pure and deterministic:
//! - Frame-counted timers only, no wall-clock time
//! - No randomness
//! - Inputs buffered and consumed only inside `Engine::update`
//! - No rendering or platform dependencies

pub mod arena;
pub mod collision;
pub mod engine;
pub mod state;

pub use arena::Arena;
pub use collision::{GrindMap, Outcome, WallKey, resolve};
pub use engine::Engine;
pub use state::{BikeState, DamageKind, Trail, TrailSegment, TurnDirection, Waypoint};
