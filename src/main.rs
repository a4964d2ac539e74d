//! Reference scene: a 4x4 grid of particles carried to the right by a
//! component, a static column of markers, and a timed release that lets the
//! grid drop under gravity.
//!
//! Run with: `cargo run --release -- [config.toml]`

use particle_engine::prelude::*;
use particle_engine::{PoolError, SimulationError};

/// Simulated second at which the grid lets go of its particles.
const RELEASE_AT: f64 = 5.0;

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    if let Err(err) = run() {
        log::error!("{}", err);
        std::process::exit(1);
    }
}

fn run() -> Result<(), SimulationError> {
    let config = match std::env::args().nth(1) {
        Some(path) => SimulationConfig::load_from_file(path)?,
        None => SimulationConfig::default(),
    };

    let mut sim = Simulation::from_config(config)?;
    let grid = build_grid(sim.world_mut())?;
    build_marker_column(sim.world_mut())?;
    log::info!("spawned {} particles", sim.particles_count());

    sim.timeline_mut().at(RELEASE_AT, move |world, now| {
        let Some(grid) = world.scene.remove_component(grid) else {
            return;
        };
        let released = grid.destroy(&mut world.particles);
        for handle in &released {
            if let Some(p) = world.particles.get_mut(*handle) {
                p.set_density(1.0);
            }
        }
        log::info!("released {} particles at t={:.2}s", released.len(), now);
    });

    sim.run()
}

/// Grid moving right at half a unit per second, floating until released.
fn build_grid(world: &mut World) -> Result<ComponentId, PoolError> {
    let mut grid = Component::new()
        .with_name("quad grid")
        .with_velocity(Vec2::new(0.5, 0.0));
    let offset = 0.1;

    for y in (-4..4).step_by(2) {
        for x in (-4..4).step_by(2) {
            let handle = world.particles.get_unused_particle()?;
            if let Some(p) = world.particles.get_mut(handle) {
                p.set_life(10.0)
                    .set_position(Vec2::new(
                        x as f32 / 10.0 + offset,
                        y as f32 / 10.0 + offset + 0.1,
                    ))
                    .set_density(0.0)
                    .set_restitution(0.8)
                    .set_color(Vec3::new(
                        (y as f32).abs() / 10.0,
                        (x as f32).abs() / 10.0,
                        1.0,
                    ));
            }
            if let Err(err) = grid.add_child(&mut world.particles, handle) {
                log::warn!("{}", err);
            }
        }
    }

    Ok(world.scene.add_component(grid))
}

/// Vertical column of green markers spaced 0.15 units apart at x = 5.
fn build_marker_column(world: &mut World) -> Result<(), PoolError> {
    for y in (-360..=360).step_by(15) {
        let mut marker = Particle::at(Vec2::new(5.0, y as f32 / 100.0));
        marker
            .set_life(f32::INFINITY)
            .set_color(Vec3::new(0.0, 1.0, 0.0))
            .set_density(0.0)
            .set_restitution(1.0);
        world.particles.spawn(marker)?;
    }
    Ok(())
}
