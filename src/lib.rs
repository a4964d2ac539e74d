//! # Particle Engine
//!
//! Fixed-step 2D particle simulation feeding an instanced renderer.
//!
//! The crate is built around three pieces:
//!
//! - a fixed-capacity [`ParticleManager`] that hands out reusable slots and
//!   writes the live particles into two flat instance arrays every step,
//! - a tree of [`Component`]s that move groups of particles with their own
//!   velocity,
//! - a [`Simulation`] that drains wall-clock time in constant steps,
//!   clamping the backlog after stalls.
//!
//! ## Quick Start
//!
//! ```
//! use particle_engine::prelude::*;
//!
//! let mut sim = Simulation::new().with_capacity(64);
//!
//! let mut grid = Component::new().with_velocity(Vec2::new(0.5, 0.0));
//! for i in 0..4 {
//!     let handle = sim.spawn_particle().unwrap();
//!     let world = sim.world_mut();
//!     world
//!         .particles
//!         .get_mut(handle)
//!         .unwrap()
//!         .set_position(Vec2::new(i as f32 * 0.2, 0.0))
//!         .set_density(0.0)
//!         .set_life(5.0);
//!     grid.add_child(&mut world.particles, handle).unwrap();
//! }
//! sim.world_mut().scene.add_component(grid);
//!
//! let stats = sim.frame(1.0 / 60.0).unwrap();
//! assert_eq!(stats.instance_count, 4);
//! assert_eq!(sim.instances().positions().len(), 4);
//! ```
//!
//! ## Running a window
//!
//! [`Simulation::run`] opens a winit window and draws the instance arrays
//! with a single instanced wgpu draw per frame:
//!
//! ```ignore
//! Simulation::from_config(SimulationConfig::load_from_file("particles.toml")?)?
//!     .run()?;
//! ```
//!
//! ## Logging
//!
//! The crate logs through the `log` facade. Pool recycling is logged at
//! `trace`, accumulator clamps and component releases at `debug`, misuse
//! such as dropping a component that still holds particles at `warn`.

pub mod component;
pub mod config;
pub mod error;
mod gpu;
pub mod manager;
pub mod particle;
pub mod schedule;
mod simulation;
pub mod time;
mod window;

pub use bytemuck;
pub use component::{Component, ComponentId};
pub use config::{SimulationConfig, WindowConfig};
pub use error::{ComponentError, ConfigError, GpuError, PoolError, SimulationError};
pub use glam::{Vec2, Vec3};
pub use manager::{InstanceBuffers, ParticleHandle, ParticleManager};
pub use particle::{Bounds, Environment, Particle};
pub use schedule::Timeline;
pub use simulation::{FrameStats, Simulation, World};
pub use time::{FixedTimestep, Time};

/// Convenient re-exports for common usage.
///
/// ```
/// use particle_engine::prelude::*;
/// ```
pub mod prelude {
    pub use crate::component::{Component, ComponentId};
    pub use crate::config::SimulationConfig;
    pub use crate::manager::{ParticleHandle, ParticleManager};
    pub use crate::particle::{Bounds, Particle};
    pub use crate::simulation::{Simulation, World};
    pub use crate::{Vec2, Vec3};
}
