//! Shrinking safe-zone
//!
//! A single circular zone centered on the origin. Outside it the bike takes
//! continuous damage. The radius shrinks by a fixed per-frame amount derived
//! once at construction, then holds at the minimum.

use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::Config;
use crate::flat_length;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Arena {
    radius: f32,
    initial_radius: f32,
    min_radius: f32,
    shrink_per_frame: f32,
    damage_per_frame: f32,
}

impl Arena {
    pub fn new(config: &Config) -> Self {
        let shrink_per_frame = (config.ring_initial_radius - config.ring_min_radius)
            / config.ring_shrink_frames.max(1) as f32;
        Self {
            radius: config.ring_initial_radius,
            initial_radius: config.ring_initial_radius,
            min_radius: config.ring_min_radius,
            shrink_per_frame,
            // Absolute rate: 100 health over ring_depletion_frames of
            // exposure, regardless of the configured max health
            damage_per_frame: 100.0 / config.ring_depletion_frames,
        }
    }

    /// Advance the shrink by one frame, floored at the minimum radius
    pub fn shrink(&mut self) {
        self.radius = (self.radius - self.shrink_per_frame).max(self.min_radius);
    }

    /// Is this ground-plane position outside the safe zone?
    pub fn is_outside(&self, pos: Vec3) -> bool {
        flat_length(pos) > self.radius
    }

    /// Current radius / initial radius, for presentation scaling
    pub fn scale(&self) -> f32 {
        self.radius / self.initial_radius
    }

    pub fn radius(&self) -> f32 {
        self.radius
    }

    /// Health drained per frame while outside the zone
    pub fn damage_per_frame(&self) -> f32 {
        self.damage_per_frame
    }
}
