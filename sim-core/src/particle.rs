//! Per-particle state and the per-frame behavior pipeline.
//!
//! Each frame a particle goes through, in this fixed order:
//! 1. neighbor interaction (applied by the simulator via [`crate::steering::neighbor_forces`]),
//! 2. pointer override ([`crate::steering::pointer_force`]),
//! 3. role-driven idle behavior, skipped while the pointer holds the particle,
//! 4. integration and damping,
//! 5. wall containment and out-of-bounds recycling.

use crate::{
    color::particle_color,
    config::{KILL_BOX, PARKED_POSITION, SimParams, remap},
    shape::{Paint, RenderStyle, ShapeDraw, ShapeKind},
    steering::{self, ElasticWall, Limits},
};
use glam::Vec2;
use rand::{Rng, RngCore};
use std::f32::consts::TAU;

const POINTER_BREAK_FRAMES: u32 = 30;
const CLUMP_BREAK_FRAMES: u32 = 20;
const CLUMP_BREAK_SPEED: f32 = 5.0;

const WAVE_RATE: f32 = 0.05;
const WAVE_FREQ: f32 = 0.02;
const WAVE_AMPLITUDE: f32 = 15.0;

const GRAVITY_LOW: f32 = 0.5;
const GRAVITY_FORCES_STAY: f32 = 1.5;

const RECYCLE_MARGIN: f32 = 100.0;

/// Behavioral category of a particle.
///
/// The role decides both how the particle idles and how its neighbors
/// react to it: every particle is pulled toward nearby `Attract` particles
/// and pushed away from nearby `Repel` ones.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Role {
    /// Roams freely inside a tight elastic wall.
    Wander,
    /// Steers back to its home target; goes limp while broken.
    Stay,
    Attract,
    Repel,
}

impl Role {
    pub const ALL: [Self; 4] = [Self::Wander, Self::Stay, Self::Attract, Self::Repel];

    /// Radius of the elastic wall this role idles inside under light gravity, if any.
    pub fn wall_radius(self, zoom: f32) -> Option<f32> {
        match self {
            Self::Wander => Some(10.0 * zoom),
            Self::Attract | Self::Repel => Some(8.0 * zoom),
            Self::Stay => None,
        }
    }
}

/// Inputs shared by every idle behavior in one frame.
#[derive(Clone, Copy, Debug)]
pub struct IdleContext {
    pub target: Vec2,
    pub limits: Limits,
    pub zoom: f32,
    pub gravity: f32,
    pub stay_multiplier: f32,
}

/// Idle behavior entry: adds its steering to `acc` and may return a wall
/// that is enforced after integration.
pub type IdleBehavior = fn(&mut Particle, &IdleContext, &mut dyn RngCore) -> Option<ElasticWall>;

/// Per-role idle behavior table.
///
/// `Attract` and `Repel` fall back to the anchored `Stay` behavior under
/// heavy gravity; `Wander` keeps wandering regardless.
pub fn idle_behavior(role: Role, gravity: f32) -> IdleBehavior {
    match role {
        Role::Wander => wander_idle,
        Role::Stay => stay_idle,
        Role::Attract | Role::Repel if gravity > GRAVITY_FORCES_STAY => stay_idle,
        Role::Attract | Role::Repel => social_idle,
    }
}

fn wander_idle(p: &mut Particle, ctx: &IdleContext, rng: &mut dyn RngCore) -> Option<ElasticWall> {
    p.wander_theta += rng.random_range(-0.2..0.2);
    p.acc += steering::wander_force(
        p.pos,
        p.vel,
        p.wander_theta,
        15.0 * ctx.zoom,
        60.0 * ctx.zoom,
        ctx.limits,
        ctx.limits.max_force,
    );
    Role::Wander
        .wall_radius(ctx.zoom)
        .map(|r| ElasticWall::new(ctx.target, r))
}

fn stay_idle(p: &mut Particle, ctx: &IdleContext, _rng: &mut dyn RngCore) -> Option<ElasticWall> {
    if p.broken {
        return None;
    }

    let mut desired = ctx.target - p.pos;
    if ctx.gravity > GRAVITY_LOW {
        desired.y += ctx.gravity * 5.0 * ctx.zoom;
    }

    let arrive = 50.0 * ctx.zoom;
    let dist = desired.length();
    let speed = if dist < arrive {
        remap(dist, 0.0, arrive, 0.0, ctx.limits.max_speed)
    } else {
        ctx.limits.max_speed
    };

    let steer = steering::with_magnitude(desired, speed) - p.vel;
    p.acc += steer.clamp_length_max(ctx.limits.max_force * 2.5 * ctx.stay_multiplier);
    None
}

fn social_idle(p: &mut Particle, ctx: &IdleContext, rng: &mut dyn RngCore) -> Option<ElasticWall> {
    p.wander_theta += rng.random_range(-0.1..0.1);
    p.acc += steering::wander_force(
        p.pos,
        p.vel,
        p.wander_theta,
        10.0 * ctx.zoom,
        80.0 * ctx.zoom,
        ctx.limits,
        ctx.limits.max_force * 0.5,
    );
    Role::Attract
        .wall_radius(ctx.zoom)
        .map(|r| ElasticWall::new(ctx.target, r))
}

/// Per-frame inputs to [`Particle::update`].
#[derive(Clone, Copy, Debug)]
pub struct StepContext<'a> {
    pub params: &'a SimParams,
    /// Pointer position in world space, if the pointer is active.
    pub pointer: Option<Vec2>,
    /// Simulated time in nominal frames.
    pub frame_time: f32,
    pub viewport: Vec2,
}

/// What happened to a particle during one update.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StepOutcome {
    Moved,
    /// Held by the pointer this frame; idle behavior skipped.
    Pushed,
    /// Sitting in the artifact box; moved off-screen and frozen.
    Parked,
    /// Fell below the viewport and re-entered from the top.
    Recycled,
    /// Non-finite state was detected and reset to the home anchor.
    Reset,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Particle {
    pub(crate) pos: Vec2,
    pub(crate) vel: Vec2,
    pub(crate) acc: Vec2,

    home: Vec2,
    pub(crate) role: Role,

    pub(crate) size_offset: f32,
    hue_offset: f32,
    shape: ShapeKind,
    style: RenderStyle,
    angle: f32,
    angle_speed: f32,
    wander_theta: f32,

    broken: bool,
    break_timer: u32,
    parked: bool,
}

impl Particle {
    /// Creates a particle at rest on its home anchor with random identity.
    pub fn spawn(home: Vec2, rng: &mut impl Rng) -> Self {
        let tier: f32 = rng.random();
        let size_offset = if tier < 0.6 {
            rng.random_range(0.2..0.55)
        } else if tier < 0.9 {
            rng.random_range(0.55..1.0)
        } else {
            rng.random_range(1.0..2.4)
        };

        let hue_offset = rng.random_range(0.0..360.0);
        let shape = ShapeKind::ALL[rng.random_range(0..ShapeKind::ALL.len())];
        let style = if rng.random::<f32>() > 0.5 {
            RenderStyle::Fill
        } else {
            RenderStyle::Stroke
        };
        let role = Role::ALL[rng.random_range(0..Role::ALL.len())];

        Self {
            pos: home,
            vel: Vec2::ZERO,
            acc: Vec2::ZERO,
            home,
            role,
            size_offset,
            hue_offset,
            shape,
            style,
            angle: rng.random_range(0.0..TAU),
            angle_speed: rng.random_range(-0.05..0.05),
            wander_theta: rng.random_range(0.0..TAU),
            broken: false,
            break_timer: 0,
            parked: false,
        }
    }

    #[cfg(test)]
    pub(crate) fn with_role(mut self, role: Role) -> Self {
        self.role = role;
        self
    }

    #[inline]
    pub fn pos(&self) -> Vec2 {
        self.pos
    }

    #[inline]
    pub fn vel(&self) -> Vec2 {
        self.vel
    }

    #[inline]
    pub fn home(&self) -> Vec2 {
        self.home
    }

    #[inline]
    pub fn role(&self) -> Role {
        self.role
    }

    #[inline]
    pub fn size_offset(&self) -> f32 {
        self.size_offset
    }

    #[inline]
    pub fn hue_offset(&self) -> f32 {
        self.hue_offset
    }

    #[inline]
    pub fn shape_kind(&self) -> ShapeKind {
        self.shape
    }

    #[inline]
    pub fn render_style(&self) -> RenderStyle {
        self.style
    }

    #[inline]
    pub fn angle(&self) -> f32 {
        self.angle
    }

    #[inline]
    pub fn is_broken(&self) -> bool {
        self.broken
    }

    #[inline]
    pub fn is_parked(&self) -> bool {
        self.parked
    }

    pub fn apply_force(&mut self, force: Vec2) {
        self.acc += force;
    }

    /// The oscillating ("breathing") target around the home anchor.
    pub fn wave_target(&self, frame_time: f32, zoom: f32) -> Vec2 {
        let t = frame_time * WAVE_RATE;
        let wave = Vec2::new(
            (t + self.home.y * WAVE_FREQ).sin(),
            (t + self.home.x * WAVE_FREQ).cos(),
        );
        self.home + wave * WAVE_AMPLITUDE * zoom
    }

    /// Runs steps 2-5 of the behavior pipeline for one frame.
    ///
    /// Neighbor forces must already have been added via [`Particle::apply_force`].
    pub fn update(&mut self, ctx: &StepContext<'_>, rng: &mut dyn RngCore) -> StepOutcome {
        if self.parked {
            return StepOutcome::Parked;
        }
        if !(self.pos.is_finite() && self.vel.is_finite() && self.acc.is_finite()) {
            log::warn!("particle left finite space at home {:?}; resetting", self.home);
            self.reset_to_home();
            return StepOutcome::Reset;
        }

        let params = ctx.params;
        let zoom = params.zoom;
        let limits = Limits::for_zoom(zoom);
        let gravity = params.gravity;
        let damping = remap(gravity, 0.0, 2.0, 0.96, 0.85);
        let stay_multiplier = remap(gravity, 0.0, 2.0, 1.0, 4.0);

        self.angle += self.angle_speed;

        let mut held = false;
        if let Some(pointer) = ctx.pointer
            && let Some(force) = steering::pointer_force(self.pos, self.vel, pointer, params)
        {
            self.acc += force;
            self.broken = true;
            self.break_timer = POINTER_BREAK_FRAMES;
            held = true;
        }

        if self.pos.x < KILL_BOX && self.pos.y < KILL_BOX {
            self.park();
            return StepOutcome::Parked;
        }

        if self.vel.length() > CLUMP_BREAK_SPEED * zoom {
            self.broken = true;
            self.break_timer = CLUMP_BREAK_FRAMES;
        }
        if self.break_timer > 0 {
            self.break_timer -= 1;
        } else {
            self.broken = false;
        }

        let mut wall = None;
        if !held {
            let idle = IdleContext {
                target: self.wave_target(ctx.frame_time, zoom),
                limits,
                zoom,
                gravity,
                stay_multiplier,
            };
            wall = idle_behavior(self.role, gravity)(self, &idle, rng);

            if gravity > GRAVITY_LOW {
                self.acc += Vec2::new(0.0, gravity * 0.1);
            }
        }

        self.vel = (self.vel + self.acc).clamp_length_max(limits.max_speed);
        self.pos += self.vel;
        self.acc = Vec2::ZERO;
        self.vel *= damping;

        if let Some(wall) = wall {
            wall.contain(&mut self.pos, &mut self.vel);
        }

        if self.pos.y > ctx.viewport.y + RECYCLE_MARGIN {
            self.recycle(ctx.viewport, rng);
            return StepOutcome::Recycled;
        }

        if held {
            StepOutcome::Pushed
        } else {
            StepOutcome::Moved
        }
    }

    /// On-screen primitive for this particle under the current parameters.
    pub fn shape(&self, params: &SimParams, font_scale: f32) -> ShapeDraw {
        let color = particle_color(self.hue_offset, params.hue);
        let paint = match self.style {
            RenderStyle::Fill => Paint::Fill(color),
            RenderStyle::Stroke => Paint::Stroke {
                color,
                width: 1.5 * params.zoom,
            },
        };

        ShapeDraw {
            kind: self.shape,
            center: self.pos,
            rotation: self.angle,
            size: params.size * self.size_offset * params.zoom * font_scale,
            corner_radius: params.radius,
            paint,
        }
    }

    fn park(&mut self) {
        self.pos = Vec2::splat(PARKED_POSITION);
        self.vel = Vec2::ZERO;
        self.acc = Vec2::ZERO;
        self.parked = true;
    }

    fn reset_to_home(&mut self) {
        self.pos = self.home;
        self.vel = Vec2::ZERO;
        self.acc = Vec2::ZERO;
        self.broken = false;
        self.break_timer = 0;
    }

    fn recycle(&mut self, viewport: Vec2, rng: &mut dyn RngCore) {
        // Keep re-entry clear of the artifact box so the particle is not parked.
        let x_max = viewport.x.max(KILL_BOX + 1.0);
        self.pos = Vec2::new(
            rng.random_range(KILL_BOX..x_max),
            rng.random_range(-100.0..-10.0),
        );
        self.vel = Vec2::ZERO;
        self.acc = Vec2::ZERO;
    }
}
