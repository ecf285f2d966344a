//! Gridline - a light-cycle arena arcade game
//!
//! Core modules:
//! - `sim`: Deterministic simulation (movement, trail, collisions, zone, health)
//! - `config`: Data-driven tunables for speeds, timings, radii, and rates
//!
//! Rendering, menus, and input mapping are caller concerns; the crate exposes
//! only the simulation core and its frame-delta interface.

pub mod config;
pub mod sim;

pub use config::Config;
pub use sim::{BikeState, Engine, TrailSegment, TurnDirection};

use glam::Vec3;

/// Distance between two points in the ground (x/z) plane
#[inline]
pub fn flat_distance(a: Vec3, b: Vec3) -> f32 {
    let dx = a.x - b.x;
    let dz = a.z - b.z;
    (dx * dx + dz * dz).sqrt()
}

/// Length of a vector projected onto the ground plane
#[inline]
pub fn flat_length(v: Vec3) -> f32 {
    (v.x * v.x + v.z * v.z).sqrt()
}

/// Forward direction for a bike rotation (radians). Rotation 0 faces +z;
/// positive rotation turns toward +x.
#[inline]
pub fn heading_from_rotation(rotation: f32) -> Vec3 {
    Vec3::new(rotation.sin(), 0.0, rotation.cos())
}

/// Closest point to `p` on the segment `a..b`, computed in the ground plane
/// (y is carried through as 0).
pub fn closest_point_on_segment(p: Vec3, a: Vec3, b: Vec3) -> Vec3 {
    let seg = Vec3::new(b.x - a.x, 0.0, b.z - a.z);
    let to_p = Vec3::new(p.x - a.x, 0.0, p.z - a.z);
    let len_sq = seg.x * seg.x + seg.z * seg.z;

    if len_sq < 1e-8 {
        // Degenerate segment - the waypoints coincide
        return Vec3::new(a.x, 0.0, a.z);
    }

    let t = ((to_p.x * seg.x + to_p.z * seg.z) / len_sq).clamp(0.0, 1.0);
    Vec3::new(a.x + seg.x * t, 0.0, a.z + seg.z * t)
}
