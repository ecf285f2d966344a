//! Collision detection and response
//!
//! The tricky part of Gridline: resolving a moving bike against the four
//! boundary walls and its own continuously-expiring trail polyline, while
//! supporting the grind mechanic (sliding along a surface accumulates depth
//! that can eventually let the bike break through instead of sticking).
//!
//! `resolve` is a pure function of the candidate position, the trail, and the
//! grind state; the engine owns all persistent state.

use glam::Vec3;
use serde::{Deserialize, Serialize};

use super::state::Trail;
use crate::Config;
use crate::{closest_point_on_segment, flat_distance};

/// Extra clearance added when pushing the bike out of a contact
pub const PUSH_EPSILON: f32 = 1e-3;

/// Identity of a boundary wall, used to key grind depths.
///
/// Trail segments deliberately have no key here: grind-through only ever
/// engages against the four arena walls (see DESIGN.md).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WallKey {
    PosX,
    NegX,
    PosZ,
    NegZ,
}

impl WallKey {
    #[inline]
    fn index(self) -> usize {
        match self {
            WallKey::PosX => 0,
            WallKey::NegX => 1,
            WallKey::PosZ => 2,
            WallKey::NegZ => 3,
        }
    }
}

/// Per-wall grind depth recorded at first contact. Once the bike's grind
/// offset exceeds the recorded depth plus a hysteresis margin, that wall
/// stops producing contacts and the bike grinds through.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GrindMap {
    depths: [Option<f32>; 4],
}

impl GrindMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the grind offset at which contact with this wall began.
    /// Later contacts keep the original depth so the hysteresis check has a
    /// fixed reference point.
    pub fn record_contact(&mut self, key: WallKey, offset: f32) {
        let slot = &mut self.depths[key.index()];
        if slot.is_none() {
            *slot = Some(offset);
        }
    }

    /// True when the current grind offset has pushed past the recorded
    /// contact depth by more than the margin.
    pub fn bypasses(&self, key: WallKey, offset: f32, margin: f32) -> bool {
        match self.depths[key.index()] {
            Some(depth) => offset > depth + margin,
            None => false,
        }
    }

    /// Forget all recorded depths (contact episode ended, or reset).
    pub fn clear(&mut self) {
        self.depths = [None; 4];
    }
}

/// Result of resolving one candidate position
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Outcome {
    /// Whether any contact produced a correction
    pub hit: bool,
    /// Contact normal of the winning correction (zero when no hit)
    pub normal: Vec3,
    /// Corrected, boundary-clamped position
    pub position: Vec3,
}

impl Outcome {
    fn miss(position: Vec3) -> Self {
        Self {
            hit: false,
            normal: Vec3::ZERO,
            position,
        }
    }
}

/// Resolve a candidate bike position against the boundary walls and the
/// trail polyline.
///
/// The candidate itself is appended as a phantom final waypoint so that
/// self-intersection at the destination is caught; the newest
/// `trail_skip_recent` segments (phantom included) are excluded so the bike
/// never collides with the line it is still drawing.
///
/// When several contacts fire at once, the correction that moves the bike
/// furthest from the uncorrected candidate wins. The final position is
/// always clamped per-axis to the arena, regardless of contact outcome.
pub fn resolve(
    candidate: Vec3,
    trail: &Trail,
    grind_offset: f32,
    grind_map: &mut GrindMap,
    config: &Config,
) -> Outcome {
    let limit = config.clamp_limit();
    let mut contacts: Vec<(Vec3, Vec3)> = Vec::new();

    let walls = [
        (candidate.x > limit, WallKey::PosX, Vec3::NEG_X, Vec3::new(limit, 0.0, candidate.z)),
        (candidate.x < -limit, WallKey::NegX, Vec3::X, Vec3::new(-limit, 0.0, candidate.z)),
        (candidate.z > limit, WallKey::PosZ, Vec3::NEG_Z, Vec3::new(candidate.x, 0.0, limit)),
        (candidate.z < -limit, WallKey::NegZ, Vec3::Z, Vec3::new(candidate.x, 0.0, -limit)),
    ];

    for (triggered, key, normal, corrected) in walls {
        if !triggered {
            continue;
        }
        if grind_map.bypasses(key, grind_offset, config.grind_bypass_margin) {
            // Ground in deep enough: this wall no longer pushes back
            // (the final clamp still bounds the position)
            continue;
        }
        grind_map.record_contact(key, grind_offset);
        contacts.push((corrected, normal));
    }

    let waypoints = trail.len();
    if waypoints >= 1 {
        // Committed segments plus the phantom segment to the candidate
        let total_segments = waypoints;
        let tested = total_segments.saturating_sub(config.trail_skip_recent);
        let hit_dist = config.trail_hit_distance();

        let points = trail.iter().map(|w| w.pos).chain(std::iter::once(candidate));
        for (a, b) in points.clone().zip(points.skip(1)).take(tested) {
            let closest = closest_point_on_segment(candidate, a, b);
            let dist = flat_distance(candidate, closest);
            if dist >= hit_dist {
                continue;
            }

            let push_dir = if dist > 1e-5 {
                Vec3::new(
                    (candidate.x - closest.x) / dist,
                    0.0,
                    (candidate.z - closest.z) / dist,
                )
            } else {
                // Candidate sits on the segment; push out perpendicular
                segment_perpendicular(a, b)
            };

            let safe = closest + push_dir * (hit_dist + PUSH_EPSILON);
            contacts.push((Vec3::new(safe.x, 0.0, safe.z), push_dir));
        }
    }

    // Worst violation wins: keep the correction furthest from the candidate
    let winner = contacts.iter().copied().max_by(|a, b| {
        flat_distance(candidate, a.0)
            .partial_cmp(&flat_distance(candidate, b.0))
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    let mut outcome = match winner {
        Some((position, normal)) => Outcome {
            hit: true,
            normal,
            position,
        },
        None => Outcome::miss(candidate),
    };

    outcome.position = clamp_to_arena(outcome.position, limit);
    outcome
}

/// Per-axis boundary clamp, the always-applied safety net
#[inline]
pub fn clamp_to_arena(pos: Vec3, limit: f32) -> Vec3 {
    Vec3::new(pos.x.clamp(-limit, limit), 0.0, pos.z.clamp(-limit, limit))
}

fn segment_perpendicular(a: Vec3, b: Vec3) -> Vec3 {
    let seg = Vec3::new(b.x - a.x, 0.0, b.z - a.z);
    let len = flat_distance(a, b);
    if len < 1e-6 {
        return Vec3::X;
    }
    Vec3::new(-seg.z / len, 0.0, seg.x / len)
}
