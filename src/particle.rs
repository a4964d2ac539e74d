//! The simulated point and its per-step update rule.
//!
//! A [`Particle`] is plain data. The [`ParticleManager`](crate::ParticleManager)
//! owns every particle and calls [`Particle::integrate`] once per fixed step,
//! passing the shared [`Environment`].

use glam::{Vec2, Vec3};
use serde::{Deserialize, Serialize};

/// Axis-aligned world rectangle particles bounce inside.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    /// Lower-left corner.
    pub min: Vec2,
    /// Upper-right corner.
    pub max: Vec2,
}

impl Bounds {
    /// Create bounds from two corners.
    pub fn new(min: Vec2, max: Vec2) -> Self {
        Self {
            min: min.min(max),
            max: min.max(max),
        }
    }

    /// Bounds centred on the origin with the given half extents.
    pub fn centered(half_extents: Vec2) -> Self {
        let half = half_extents.abs();
        Self {
            min: -half,
            max: half,
        }
    }

    /// Whether `point` lies inside or on the edge.
    #[inline]
    pub fn contains(&self, point: Vec2) -> bool {
        point.cmpge(self.min).all() && point.cmple(self.max).all()
    }
}

/// Forces and limits shared by every particle in a pool.
#[derive(Clone, Copy, Debug, PartialEq, Default)]
pub struct Environment {
    /// Acceleration applied per unit of density.
    pub gravity: Vec2,
    /// Optional world rectangle. Particles leaving it are reflected.
    pub bounds: Option<Bounds>,
}

/// A single simulated point.
///
/// Setters mirror the fields so a freshly allocated slot can be configured
/// with a chain of calls:
///
/// ```
/// use particle_engine::{Particle, Vec2, Vec3};
///
/// let mut p = Particle::default();
/// p.set_life(2.0)
///     .set_position(Vec2::new(0.1, 0.2))
///     .set_color(Vec3::new(1.0, 0.0, 0.0))
///     .set_restitution(0.8);
/// assert_eq!(p.life(), 2.0);
/// ```
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Particle {
    position: Vec2,
    velocity: Vec2,
    life: f32,
    color: Vec3,
    mass: f32,
    density: f32,
    restitution: f32,
}

impl Default for Particle {
    fn default() -> Self {
        Self {
            position: Vec2::ZERO,
            velocity: Vec2::ZERO,
            life: 1.0,
            color: Vec3::ONE,
            mass: 1.0,
            density: 1.0,
            restitution: 0.5,
        }
    }
}

impl Particle {
    /// Create a particle at `position` with default parameters.
    pub fn at(position: Vec2) -> Self {
        Self {
            position,
            ..Default::default()
        }
    }

    #[inline]
    pub fn position(&self) -> Vec2 {
        self.position
    }

    #[inline]
    pub fn velocity(&self) -> Vec2 {
        self.velocity
    }

    /// Remaining lifetime in seconds. Zero or less means expired.
    #[inline]
    pub fn life(&self) -> f32 {
        self.life
    }

    #[inline]
    pub fn color(&self) -> Vec3 {
        self.color
    }

    /// Inertia against impulses. Has no effect on gravity.
    #[inline]
    pub fn mass(&self) -> f32 {
        self.mass
    }

    #[inline]
    pub fn density(&self) -> f32 {
        self.density
    }

    #[inline]
    pub fn restitution(&self) -> f32 {
        self.restitution
    }

    #[inline]
    pub fn is_alive(&self) -> bool {
        self.life > 0.0
    }

    pub fn set_position(&mut self, position: Vec2) -> &mut Self {
        self.position = position;
        self
    }

    pub fn set_velocity(&mut self, velocity: Vec2) -> &mut Self {
        self.velocity = velocity;
        self
    }

    pub fn set_life(&mut self, life: f32) -> &mut Self {
        self.life = life;
        self
    }

    pub fn set_color(&mut self, color: Vec3) -> &mut Self {
        self.color = color;
        self
    }

    /// Set the inertia used by [`apply_impulse`](Self::apply_impulse).
    ///
    /// Mass only scales impulses. Gravity is driven by density and
    /// component motion ignores both.
    pub fn set_mass(&mut self, mass: f32) -> &mut Self {
        self.mass = mass;
        self
    }

    /// Set how strongly gravity pulls on this particle. Zero floats.
    pub fn set_density(&mut self, density: f32) -> &mut Self {
        self.density = density;
        self
    }

    /// Fraction of speed kept when bouncing off the world bounds, clamped to [0, 1].
    pub fn set_restitution(&mut self, restitution: f32) -> &mut Self {
        self.restitution = restitution.clamp(0.0, 1.0);
        self
    }

    /// Move the particle without touching its velocity.
    #[inline]
    pub fn translate(&mut self, offset: Vec2) {
        self.position += offset;
    }

    /// Change velocity by `impulse / mass`. Massless particles ignore impulses.
    pub fn apply_impulse(&mut self, impulse: Vec2) {
        if self.mass > 0.0 {
            self.velocity += impulse / self.mass;
        }
    }

    /// Advance the particle by one step.
    ///
    /// Returns `false` when the particle expired during this step; an expired
    /// particle is not moved.
    pub fn integrate(&mut self, dt: f32, env: &Environment) -> bool {
        self.life -= dt;
        if self.life <= 0.0 {
            return false;
        }

        self.velocity += env.gravity * self.density * dt;
        self.position += self.velocity * dt;

        if let Some(bounds) = env.bounds {
            self.reflect(&bounds);
        }
        true
    }

    fn reflect(&mut self, bounds: &Bounds) {
        for axis in 0..2 {
            if self.position[axis] < bounds.min[axis] {
                self.position[axis] = bounds.min[axis];
                self.velocity[axis] = self.velocity[axis].abs() * self.restitution;
            } else if self.position[axis] > bounds.max[axis] {
                self.position[axis] = bounds.max[axis];
                self.velocity[axis] = -self.velocity[axis].abs() * self.restitution;
            }
        }
    }
}
