//! Simulation state and core types
//!
//! Everything the engine mutates per frame lives here. The trail pairs each
//! waypoint with its birth frame in a single struct so position and age can
//! never fall out of sync.

use std::collections::VecDeque;
use std::f32::consts::FRAC_PI_2;

use glam::Vec3;
use serde::{Deserialize, Serialize};

/// A 90-degree turn request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TurnDirection {
    Left,
    Right,
}

impl TurnDirection {
    /// Rotation delta applied when the turn fires
    #[inline]
    pub fn angle(self) -> f32 {
        match self {
            TurnDirection::Left => FRAC_PI_2,
            TurnDirection::Right => -FRAC_PI_2,
        }
    }
}

/// Source of the most recent damage, selects the regeneration rate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DamageKind {
    /// Head-on wall or trail hit (regens back quickly)
    Collision,
    /// Outside-zone exposure (regens back slowly)
    Zone,
}

/// A trail vertex: position plus the frame it was appended on
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Waypoint {
    pub pos: Vec3,
    pub frame: u64,
}

/// Render-facing trail delta: the line between two consecutive waypoints
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrailSegment {
    pub start: Vec3,
    pub end: Vec3,
}

/// The light-trail polyline. Front = oldest waypoint, back = newest.
///
/// The newest waypoint is never evicted: it anchors the live segment from
/// the trail to the bike, and keeping it makes the waypoint/segment removal
/// accounting exact (a trail of n waypoints is n - 1 drawn segments).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Trail {
    points: VecDeque<Waypoint>,
}

impl Trail {
    pub fn new() -> Self {
        Self {
            points: VecDeque::new(),
        }
    }

    /// Append a waypoint at the back
    pub fn push(&mut self, pos: Vec3, frame: u64) {
        self.points.push_back(Waypoint { pos, frame });
    }

    /// Evict waypoints older than `max_frames`, oldest first. Returns how
    /// many were removed (= how many rendered segments must be discarded).
    pub fn expire(&mut self, current_frame: u64, max_frames: u64) -> usize {
        let mut removed = 0;
        while self.points.len() > 1 {
            let oldest = match self.points.front() {
                Some(wp) => wp,
                None => break,
            };
            if current_frame.saturating_sub(oldest.frame) <= max_frames {
                break;
            }
            self.points.pop_front();
            removed += 1;
        }
        removed
    }

    /// Enforce the hard waypoint ceiling, evicting from the front.
    pub fn enforce_cap(&mut self, cap: usize) -> usize {
        let mut removed = 0;
        while self.points.len() > cap.max(1) {
            self.points.pop_front();
            removed += 1;
        }
        removed
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn newest(&self) -> Option<&Waypoint> {
        self.points.back()
    }

    pub fn oldest(&self) -> Option<&Waypoint> {
        self.points.front()
    }

    /// Frame span between the oldest and newest waypoint
    pub fn frame_span(&self) -> u64 {
        match (self.points.front(), self.points.back()) {
            (Some(a), Some(b)) => b.frame.saturating_sub(a.frame),
            _ => 0,
        }
    }

    /// Iterate waypoints oldest to newest
    pub fn iter(&self) -> impl Iterator<Item = &Waypoint> + Clone {
        self.points.iter()
    }

    pub fn clear(&mut self) {
        self.points.clear();
    }
}

/// Full bike state. Owned exclusively by the engine; getters hand out clones,
/// never references into the live state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BikeState {
    /// Ground-plane position, y fixed at 0
    pub position: Vec3,
    /// Heading in radians; multiples of pi/2 at rest, applied instantly on turn
    pub rotation: f32,
    /// False only after health hit zero and the grace period fully elapsed
    pub alive: bool,
    /// Effective forward speed as of the frame this state was read
    /// (base speed scaled by the brake multiplier)
    pub speed: f32,
    /// Frame index of the most recent applied turn
    pub last_turn_frame: u64,
    pub health: f32,
    pub max_health: f32,
    /// Lateral displacement accumulated while pressed into a surface (0..max)
    pub grind_offset: f32,
    /// Contact normal from the current grind, if any
    pub grind_normal: Option<Vec3>,
    /// Frames of deferred death remaining once health reaches zero
    pub grace_frames_remaining: u32,
    pub brake_energy: f32,
    /// Frames left before brake energy starts recharging
    pub brake_recharge_delay: u32,
    /// Braking request flag, forced off when energy is exhausted
    pub is_braking: bool,
}

impl BikeState {
    pub fn new(max_health: f32, speed: f32, brake_energy: f32) -> Self {
        Self {
            position: Vec3::ZERO,
            rotation: 0.0,
            alive: true,
            speed,
            last_turn_frame: 0,
            health: max_health,
            max_health,
            grind_offset: 0.0,
            grind_normal: None,
            grace_frames_remaining: 0,
            brake_energy,
            brake_recharge_delay: 0,
            is_braking: false,
        }
    }

    /// User-visible health fraction, clamped so the slack below zero used by
    /// the grace mechanic never shows as negative.
    pub fn health_percent(&self) -> f32 {
        (self.health / self.max_health).clamp(0.0, 1.0) * 100.0
    }
}
