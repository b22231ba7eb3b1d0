//! Steering forces shared by particle behaviors.
//!
//! Every force follows the classic steering pattern: build a desired
//! vector, rescale it to max speed, subtract the current velocity and
//! clamp the result to a force ceiling.

use crate::{
    config::SimParams,
    grid::SpatialGrid,
    particle::{Particle, Role},
    types::ParticleId,
};
use glam::Vec2;

const BASE_MAX_SPEED: f32 = 8.0;
const BASE_MAX_FORCE: f32 = 0.5;
const PERCEPTION: f32 = 30.0;
const MAX_NEIGHBORS: usize = 15;
const SEPARATION_REACH: f32 = 4.0;

const POINTER_RANGE: f32 = 150.0;
const POINTER_MIN_RANGE: f32 = 20.0;
const POINTER_BASE_FORCE: f32 = 40.0;

const RESTITUTION: f32 = 0.8;

/// Zoom-scaled speed and force ceilings.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Limits {
    pub max_speed: f32,
    pub max_force: f32,
}

impl Limits {
    pub fn for_zoom(zoom: f32) -> Self {
        Self {
            max_speed: BASE_MAX_SPEED * zoom,
            max_force: BASE_MAX_FORCE * zoom,
        }
    }
}

/// Rescales `v` to length `mag`; a zero vector stays zero.
#[inline]
pub fn with_magnitude(v: Vec2, mag: f32) -> Vec2 {
    v.normalize_or_zero() * mag
}

/// Steering force toward `desired` at full speed, clamped to `ceiling`.
#[inline]
pub fn steer(desired: Vec2, vel: Vec2, max_speed: f32, ceiling: f32) -> Vec2 {
    (with_magnitude(desired, max_speed) - vel).clamp_length_max(ceiling)
}

/// Running sum of direction contributions.
#[derive(Clone, Copy, Debug, Default)]
struct Influence {
    dir: Vec2,
    count: u32,
}

impl Influence {
    #[inline]
    fn add(&mut self, dir: Vec2) {
        self.dir += dir;
        self.count += 1;
    }

    #[inline]
    fn average(&self) -> Option<Vec2> {
        (self.count > 0).then(|| self.dir / self.count as f32)
    }
}

/// Separation, attraction and repulsion from the 3×3 grid neighborhood.
///
/// At most [`MAX_NEIGHBORS`] other particles are examined. Neighbors are
/// read live, so particles already updated this frame are seen at their
/// new positions.
///
/// ### Parameters
/// - `particles` - Whole population.
/// - `id` - Particle receiving the force.
/// - `grid` - Index built from this frame's positions.
/// - `zoom` - Scales perception and force limits.
///
/// ### Returns
/// The summed steering force, `Vec2::ZERO` when nothing is in range.
pub fn neighbor_forces(
    particles: &[Particle],
    id: ParticleId,
    grid: &SpatialGrid,
    zoom: f32,
) -> Vec2 {
    let me = &particles[id];
    let limits = Limits::for_zoom(zoom);
    let perception = PERCEPTION * zoom;

    let mut separation = Influence::default();
    let mut attraction = Influence::default();
    let mut repulsion = Influence::default();

    let mut checked = 0;
    for other_id in grid.neighbors_of(grid.cell_of(me.pos)) {
        if other_id == id {
            continue;
        }
        checked += 1;
        if checked > MAX_NEIGHBORS {
            break;
        }

        let other = &particles[other_id];
        let d = me.pos.distance(other.pos);
        // Also rejects NaN distances.
        if !(d > 0.0) {
            continue;
        }

        let combined = (me.size_offset() + other.size_offset()) * SEPARATION_REACH * zoom;
        if d < combined {
            separation.add((me.pos - other.pos).normalize_or_zero() / d);
        }

        if d < perception {
            match other.role() {
                Role::Attract => attraction.add((other.pos - me.pos).normalize_or_zero() / d),
                Role::Repel => repulsion.add((me.pos - other.pos).normalize_or_zero() / d),
                Role::Wander | Role::Stay => {}
            }
        }
    }

    let mut force = Vec2::ZERO;
    if let Some(avg) = separation.average() {
        force += steer(avg, me.vel, limits.max_speed, limits.max_force * 2.0);
    }
    if let Some(avg) = attraction.average() {
        force += steer(avg, me.vel, limits.max_speed, limits.max_force);
    }
    if let Some(avg) = repulsion.average() {
        force += steer(avg, me.vel, limits.max_speed, limits.max_force * 1.5);
    }
    force
}

/// Radial pointer force, or `None` when the pointer is out of range.
///
/// Magnitude is `40 · (1 − d/range)² · 2·reaction²`, signed by
/// [`SimParams::force_sign`]. A pointer sitting exactly on the particle
/// pushes along the particle's heading (or +X when at rest).
pub fn pointer_force(pos: Vec2, vel: Vec2, pointer: Vec2, params: &SimParams) -> Option<Vec2> {
    let range = (POINTER_RANGE * params.reaction * params.zoom).max(POINTER_MIN_RANGE);
    let offset = pos - pointer;
    let dist = offset.length();
    if !(dist < range) {
        return None;
    }

    let dir = offset
        .try_normalize()
        .or_else(|| vel.try_normalize())
        .unwrap_or(Vec2::X);

    let intensity = (1.0 - dist / range).powi(2);
    let multiplier = params.reaction * params.reaction * 2.0;
    let magnitude = POINTER_BASE_FORCE * intensity * multiplier * params.force_sign.as_f32();
    Some(dir * magnitude)
}

/// Wander-circle steering: seek a point on a circle projected ahead of the heading.
pub fn wander_force(
    pos: Vec2,
    vel: Vec2,
    theta: f32,
    radius: f32,
    distance: f32,
    limits: Limits,
    ceiling: f32,
) -> Vec2 {
    let ahead = pos + with_magnitude(vel, distance);
    let offset = Vec2::from_angle(theta + vel.to_angle()) * radius;
    steer(ahead + offset - pos, vel, limits.max_speed, ceiling)
}

/// Circular elastic boundary around a moving center.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ElasticWall {
    pub center: Vec2,
    pub radius: f32,
}

impl ElasticWall {
    pub fn new(center: Vec2, radius: f32) -> Self {
        Self { center, radius }
    }

    /// Reflects outward velocity (`v' = v − (1+e)(v·n)n`) and clamps the
    /// position onto the wall when it is outside.
    ///
    /// ### Returns
    /// `true` if the particle was outside and got clamped.
    pub fn contain(&self, pos: &mut Vec2, vel: &mut Vec2) -> bool {
        let offset = *pos - self.center;
        if !(offset.length() > self.radius) {
            return false;
        }

        let normal = offset.normalize_or_zero();
        let v_dot_n = vel.dot(normal);
        if v_dot_n > 0.0 {
            *vel -= normal * ((1.0 + RESTITUTION) * v_dot_n);
        }
        *pos = self.center + normal * self.radius;
        true
    }
}
