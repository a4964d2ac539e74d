//! Simulation builder and fixed-step runner.
//!
//! A [`Simulation`] owns the [`World`] (particle pool plus scene root), the
//! instance buffers handed to the renderer, the [`FixedTimestep`] driver and
//! the [`Timeline`] of scripted events. Each call to [`Simulation::frame`]
//! feeds one frame of wall time through the driver:
//!
//! 1. add the elapsed time to the accumulator, clamped to the ceiling
//! 2. for every whole step: fire due events, update the scene, update the pool
//! 3. leave the instance buffers holding the state after the last step
//!
//! The renderer only reads the buffers between frames, so it never sees a
//! half-finished step. There is no interpolation between steps.

use glam::{Vec2, Vec3};

use crate::component::Component;
use crate::config::SimulationConfig;
use crate::error::{PoolError, SimulationError};
use crate::manager::{InstanceBuffers, ParticleHandle, ParticleManager};
use crate::particle::{Bounds, Particle};
use crate::schedule::Timeline;
use crate::time::FixedTimestep;

/// The simulated state: particle storage and the scene graph driving it.
#[derive(Debug)]
pub struct World {
    pub particles: ParticleManager,
    /// Root of the component tree. Motionless unless given a velocity.
    pub scene: Component,
}

impl World {
    /// Advance the scene then the pool by one step and write the instances.
    pub fn step(&mut self, dt: f32, instances: &mut InstanceBuffers) -> Result<usize, PoolError> {
        self.scene.update(dt, &mut self.particles);
        self.particles.update_instances(dt, instances)
    }
}

/// What happened during one [`Simulation::frame`].
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FrameStats {
    /// Fixed steps executed this frame.
    pub steps: u32,
    /// Whether the accumulator ceiling dropped time this frame.
    pub clamped: bool,
    /// Instances the renderer should draw.
    pub instance_count: usize,
    /// Simulated seconds after this frame.
    pub sim_time: f64,
}

/// A particle simulation.
///
/// Use method chaining to configure, then drive it with
/// [`frame`](Self::frame) or hand it to [`run`](Self::run) to open a window.
///
/// ```
/// use particle_engine::{Component, Simulation, Vec2};
///
/// let mut sim = Simulation::new().with_capacity(8).with_gravity(Vec2::ZERO);
/// let p = sim.spawn_particle().unwrap();
/// sim.world_mut().particles.get_mut(p).unwrap().set_life(5.0);
///
/// let mut mover = Component::new().with_velocity(Vec2::new(0.5, 0.0));
/// let world = sim.world_mut();
/// mover.add_child(&mut world.particles, p).unwrap();
/// world.scene.add_component(mover);
///
/// let stats = sim.frame(0.1).unwrap();
/// assert_eq!(stats.instance_count, 1);
/// assert!(sim.instances().positions()[0].x > 0.0);
/// ```
#[derive(Debug)]
pub struct Simulation {
    config: SimulationConfig,
    world: World,
    instances: InstanceBuffers,
    stepper: FixedTimestep,
    timeline: Timeline,
}

impl Simulation {
    /// Create a simulation with default settings.
    pub fn new() -> Self {
        Self::assemble(SimulationConfig::default(), FixedTimestep::default())
    }

    /// Create a simulation from a config, rejecting invalid values.
    pub fn from_config(config: SimulationConfig) -> Result<Self, SimulationError> {
        config.validate()?;
        let stepper = FixedTimestep::new(config.timestep, config.max_accumulator)?;
        Ok(Self::assemble(config, stepper))
    }

    fn assemble(config: SimulationConfig, stepper: FixedTimestep) -> Self {
        let particles = ParticleManager::new(config.capacity).with_environment(config.environment());
        let instances = particles.instance_buffers();

        Self {
            config,
            world: World {
                particles,
                scene: Component::new().with_name("root"),
            },
            instances,
            stepper,
            timeline: Timeline::new(),
        }
    }

    /// Set the number of particle slots.
    ///
    /// Rebuilds the pool. Particles spawned earlier are discarded and their
    /// handles go stale; the scene is released and replaced by an empty root.
    pub fn with_capacity(mut self, capacity: usize) -> Self {
        let world = &mut self.world;
        if world.particles.particles_count() > 0 || world.scene.particle_count() > 0 {
            log::warn!(
                "resizing to {} slots discards {} live particles and resets the scene",
                capacity,
                world.particles.particles_count()
            );
            world.scene.release_children(&mut world.particles);
            world.scene = Component::new().with_name("root");
        }

        self.config.capacity = capacity;
        world.particles.resize(capacity);
        self.instances = world.particles.instance_buffers();
        self
    }

    /// Set the fixed step size and the accumulator ceiling, in seconds.
    ///
    /// Invalid pairs are logged and ignored.
    pub fn with_timestep(mut self, dt: f64, max_accumulator: f64) -> Self {
        match FixedTimestep::new(dt, max_accumulator) {
            Ok(stepper) => {
                self.config.timestep = dt;
                self.config.max_accumulator = max_accumulator;
                self.stepper = stepper;
            }
            Err(err) => log::warn!("ignoring timestep: {}", err),
        }
        self
    }

    pub fn with_gravity(mut self, gravity: Vec2) -> Self {
        self.config.gravity = gravity;
        self.world.particles.set_environment(self.config.environment());
        self
    }

    /// Set the wall rectangle, or `None` to let particles fly off.
    pub fn with_bounds(mut self, bounds: Option<Bounds>) -> Self {
        self.config.bounce_walls = bounds.is_some();
        self.config.bounds = bounds;
        self.world.particles.set_environment(self.config.environment());
        self
    }

    /// Register a one-shot event at `time` simulated seconds.
    pub fn with_event<F>(mut self, time: f64, action: F) -> Self
    where
        F: FnMut(&mut World, f64) + 'static,
    {
        self.timeline.at(time, action);
        self
    }

    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    pub fn world(&self) -> &World {
        &self.world
    }

    pub fn world_mut(&mut self) -> &mut World {
        &mut self.world
    }

    /// Instance arrays as of the end of the last completed step.
    pub fn instances(&self) -> &InstanceBuffers {
        &self.instances
    }

    pub fn timestep(&self) -> &FixedTimestep {
        &self.stepper
    }

    pub fn timeline_mut(&mut self) -> &mut Timeline {
        &mut self.timeline
    }

    /// Live particle count.
    pub fn particles_count(&self) -> usize {
        self.world.particles.particles_count()
    }

    /// Allocate a default particle.
    pub fn spawn_particle(&mut self) -> Result<ParticleHandle, PoolError> {
        self.world.particles.get_unused_particle()
    }

    /// Allocate a particle with the given state.
    pub fn spawn(&mut self, particle: Particle) -> Result<ParticleHandle, PoolError> {
        self.world.particles.spawn(particle)
    }

    /// Run as many fixed steps as `elapsed` seconds of wall time allow.
    ///
    /// # Errors
    ///
    /// Propagates [`PoolError`] from the pool update. The instance buffers are
    /// sized from the pool, so this only fails if they were replaced by hand.
    pub fn frame(&mut self, elapsed: f64) -> Result<FrameStats, SimulationError> {
        let clamped = self.stepper.accumulate(elapsed);
        let dt = self.stepper.dt();
        let mut steps = 0u32;

        while self.stepper.step() {
            let step_start = (self.stepper.steps() - 1) as f64 * dt;
            self.timeline.fire_due(step_start, &mut self.world);
            self.world.step(dt as f32, &mut self.instances)?;
            steps += 1;
        }

        Ok(FrameStats {
            steps,
            clamped,
            instance_count: self.instances.len(),
            sim_time: self.stepper.sim_time(),
        })
    }

    /// Open a window and run until it is closed or Escape is pressed.
    pub fn run(self) -> Result<(), SimulationError> {
        crate::window::run(self)
    }

    /// Position and color of every live particle, in slot order.
    pub fn snapshot(&self) -> Vec<(Vec2, Vec3)> {
        self.world
            .particles
            .iter_live()
            .map(|(_, p)| (p.position(), p.color()))
            .collect()
    }
}

impl Default for Simulation {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    const DT: f64 = 1.0 / 144.0;

    fn moving_particle(sim: &mut Simulation, velocity: Vec2) -> ParticleHandle {
        let p = sim.spawn_particle().unwrap();
        sim.world_mut().particles.get_mut(p).unwrap().set_life(100.0);
        let mut mover = Component::new().with_velocity(velocity);
        let world = sim.world_mut();
        mover.add_child(&mut world.particles, p).unwrap();
        world.scene.add_component(mover);
        p
    }

    #[test]
    fn test_frame_reports_steps() {
        let mut sim = Simulation::new().with_timestep(0.1, 1.0);
        let stats = sim.frame(0.35).unwrap();

        assert_eq!(stats.steps, 3);
        assert!(!stats.clamped);
        assert_abs_diff_eq!(stats.sim_time, 0.3, epsilon = 1e-9);
    }

    #[test]
    fn test_clamp_bounds_steps() {
        let mut sim = Simulation::new().with_timestep(DT, 0.2);
        let stats = sim.frame(10.0).unwrap();

        assert!(stats.clamped);
        assert!(f64::from(stats.steps) <= 0.2 / DT);
    }

    #[test]
    fn test_scene_moves_before_pool_writes() {
        let mut sim = Simulation::new()
            .with_timestep(0.1, 1.0)
            .with_gravity(Vec2::ZERO)
            .with_bounds(None);
        moving_particle(&mut sim, Vec2::new(1.0, 0.0));

        sim.frame(0.1).unwrap();

        assert_abs_diff_eq!(sim.instances().positions()[0].x, 0.1, epsilon = 1e-6);
    }

    #[test]
    fn test_event_fires_between_steps() {
        let mut sim = Simulation::new()
            .with_timestep(0.1, 1.0)
            .with_gravity(Vec2::ZERO)
            .with_bounds(None)
            .with_event(0.2, |world, _| {
                world.scene.release_children(&mut world.particles);
            });
        let p = moving_particle(&mut sim, Vec2::new(1.0, 0.0));

        sim.frame(0.55).unwrap();

        // Steps starting at 0.0 and 0.1 moved it; the release ran before the third.
        let x = sim.world().particles.get(p).unwrap().position().x;
        assert_abs_diff_eq!(x, 0.2, epsilon = 1e-6);
        assert_eq!(sim.world().scene.particle_count(), 0);
    }

    #[test]
    fn test_resize_after_spawn_drops_old_scene() {
        let mut sim = Simulation::new()
            .with_gravity(Vec2::ZERO)
            .with_bounds(None);
        let old = moving_particle(&mut sim, Vec2::new(1.0, 0.0));

        let mut sim = sim.with_capacity(4);
        assert_eq!(sim.particles_count(), 0);
        assert_eq!(sim.world().scene.particle_count(), 0);
        assert!(sim.world().scene.children().is_empty());
        assert!(!sim.world().particles.is_live(old));

        let fresh = sim.spawn_particle().unwrap();
        assert_ne!(fresh, old);
        sim.world_mut().particles.get_mut(fresh).unwrap().set_life(100.0);
        sim.frame(0.1).unwrap();

        assert_eq!(sim.world().particles.get(fresh).unwrap().position(), Vec2::ZERO);
        assert_eq!(sim.instances().capacity(), 4);
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        let config = SimulationConfig {
            capacity: 0,
            ..Default::default()
        };
        assert!(matches!(
            Simulation::from_config(config),
            Err(SimulationError::Config(_))
        ));
    }

    #[test]
    fn test_invalid_timestep_is_ignored() {
        let sim = Simulation::new().with_timestep(-1.0, 0.2);
        assert_abs_diff_eq!(sim.timestep().dt(), 1.0 / 144.0);
    }
}
