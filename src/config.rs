//! Game tuning constants
//!
//! Every gameplay number lives here so balance changes never touch the
//! simulation code. All timings are integer frame counts: the simulation is
//! frame-driven and must stay independent of wall-clock rendering rate.

use serde::{Deserialize, Serialize};

/// Tunable simulation constants. `Default` is the shipped balance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Forward speed in world units per frame
    pub bike_speed: f32,
    /// Half the bike's collision width
    pub bike_half_width: f32,
    /// Arena wall position; the bike center is kept within
    /// `boundary_limit - bike_half_width` on each axis
    pub boundary_limit: f32,
    /// Minimum frames between two applied turns; earlier requests are queued
    pub turn_delay_frames: u64,

    /// Half the light-trail's collision width
    pub trail_half_width: f32,
    /// Extra clearance added to the trail collision threshold
    pub trail_safety_margin: f32,
    /// Straight-line distance that forces a new trail waypoint
    pub trail_point_spacing: f32,
    /// Waypoint lifetime in frames before eviction
    pub trail_max_frames: u64,
    /// Hard ceiling on stored waypoints, a safety net over age eviction
    pub trail_hard_cap: usize,
    /// Newest trail segments excluded from self-collision (the segment being
    /// drawn plus the ones just finished)
    pub trail_skip_recent: usize,

    pub max_health: f32,
    /// Lowest health value ever stored; small negative slack feeds the
    /// grace-period mechanic
    pub health_floor: f32,
    /// Health lost on a head-on wall/trail hit
    pub collision_damage: f32,
    /// Frames without damage before regeneration resumes
    pub regen_delay_frames: u64,
    /// Regen per frame when the last damage was a collision
    pub regen_rate_collision: f32,
    /// Regen per frame when the last damage was zone exposure (slower)
    pub regen_rate_zone: f32,
    /// Frames death is deferred after health reaches zero
    pub grace_frames: u32,

    /// Maximum lateral grind displacement
    pub grind_offset_max: f32,
    /// Grind displacement gained per frame of contact
    pub grind_growth_rate: f32,
    /// Hysteresis over the recorded contact depth before a wall lets the
    /// bike pass through
    pub grind_bypass_margin: f32,

    /// Safe-zone radius at the start of a run
    pub ring_initial_radius: f32,
    /// Radius the zone shrinks down to and then holds
    pub ring_min_radius: f32,
    /// Frames over which the zone shrinks from initial to minimum
    pub ring_shrink_frames: u64,
    /// Frames of continuous outside-zone exposure that drain 100 health;
    /// damage per frame is `100 / ring_depletion_frames` as an absolute
    /// rate, independent of `max_health`
    pub ring_depletion_frames: f32,

    pub brake_max_energy: f32,
    /// Energy spent per braking frame
    pub brake_depletion_rate: f32,
    /// Energy restored per frame once the recharge delay has elapsed
    pub brake_recharge_rate: f32,
    /// Frames after braking stops before recharge begins
    pub brake_recharge_delay_frames: u32,
    /// Speed multiplier at full brake depletion (1.0 at zero energy spent)
    pub brake_min_multiplier: f32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bike_speed: 0.065,
            bike_half_width: 0.15,
            boundary_limit: 44.975,
            turn_delay_frames: 6,

            trail_half_width: 0.1,
            trail_safety_margin: 0.05,
            trail_point_spacing: 1.0,
            trail_max_frames: 900,
            trail_hard_cap: 2048,
            trail_skip_recent: 3,

            max_health: 100.0,
            health_floor: -10.0,
            collision_damage: 20.0,
            regen_delay_frames: 90,
            regen_rate_collision: 0.5,
            regen_rate_zone: 0.15,
            grace_frames: 60,

            grind_offset_max: 0.3,
            grind_growth_rate: 0.004,
            grind_bypass_margin: 0.05,

            ring_initial_radius: 64.0,
            ring_min_radius: 5.0,
            ring_shrink_frames: 5400,
            ring_depletion_frames: 600.0,

            brake_max_energy: 100.0,
            brake_depletion_rate: 1.0,
            brake_recharge_rate: 0.5,
            brake_recharge_delay_frames: 45,
            brake_min_multiplier: 0.45,
        }
    }
}

impl Config {
    /// Parse a config from JSON. Missing fields fall back to defaults.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Serialize to pretty JSON (for writing a template config file).
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Bike center clamp limit per axis
    #[inline]
    pub fn clamp_limit(&self) -> f32 {
        self.boundary_limit - self.bike_half_width
    }

    /// Distance below which a trail segment counts as a hit
    #[inline]
    pub fn trail_hit_distance(&self) -> f32 {
        self.bike_half_width + self.trail_half_width + self.trail_safety_margin
    }
}
