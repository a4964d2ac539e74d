//! End-to-end tests for the pool, the component tree and the fixed-step driver.
//!
//! These drive [`Simulation::frame`] with synthetic frame times so every run
//! sees exactly the same sequence of steps.

use approx::assert_abs_diff_eq;
use particle_engine::prelude::*;
use particle_engine::{ComponentError, PoolError};
use proptest::prelude::*;

const DT: f64 = 1.0 / 144.0;

/// Simulation with no gravity or walls so motion comes only from components.
fn still_world(capacity: usize) -> Simulation {
    Simulation::new()
        .with_capacity(capacity)
        .with_timestep(DT, 0.2)
        .with_gravity(Vec2::ZERO)
        .with_bounds(None)
}

fn attach_mover(sim: &mut Simulation, velocity: Vec2, life: f32) -> (ParticleHandle, ComponentId) {
    let handle = sim.spawn_particle().unwrap();
    let world = sim.world_mut();
    world.particles.get_mut(handle).unwrap().set_life(life);

    let mut mover = Component::new().with_velocity(velocity);
    mover.add_child(&mut world.particles, handle).unwrap();
    let id = world.scene.add_component(mover);
    (handle, id)
}

fn run_frames(frames: &[f64]) -> (f32, Vec<Vec<(Vec2, Vec3)>>) {
    let mut sim = still_world(4);
    let (handle, _) = attach_mover(&mut sim, Vec2::new(0.5, 0.0), 100.0);

    let snapshots = frames
        .iter()
        .map(|&elapsed| {
            sim.frame(elapsed).unwrap();
            sim.instances()
                .positions()
                .iter()
                .copied()
                .zip(sim.instances().colors().iter().copied())
                .collect()
        })
        .collect();

    let x = sim.world().particles.get(handle).unwrap().position().x;
    (x, snapshots)
}

#[test]
fn test_one_second_lands_near_half_unit_however_split() {
    let coarse = vec![0.1; 10];
    let fine = vec![0.02; 50];
    let uneven = vec![0.15, 0.05, 0.2, 0.013, 0.187, 0.1, 0.1, 0.2];
    assert_abs_diff_eq!(uneven.iter().sum::<f64>(), 1.0, epsilon = 1e-12);

    for frames in [coarse, fine, uneven] {
        let (x, _) = run_frames(&frames);
        assert_abs_diff_eq!(x, 0.5, epsilon = (0.5 * DT) as f32 + 1e-4);
    }
}

#[test]
fn test_repeated_runs_are_identical() {
    let frames = [0.016, 0.017, 0.033, 0.2, 0.001, 0.05];
    let (x_a, run_a) = run_frames(&frames);
    let (x_b, run_b) = run_frames(&frames);

    assert_eq!(x_a, x_b);
    assert_eq!(run_a, run_b);
}

#[test]
fn test_stall_is_clamped() {
    let mut sim = still_world(4);
    let (handle, _) = attach_mover(&mut sim, Vec2::new(1.0, 0.0), 100.0);

    let stats = sim.frame(10.0).unwrap();

    assert!(stats.clamped);
    assert!(f64::from(stats.steps) <= 0.2 / DT);
    let x = sim.world().particles.get(handle).unwrap().position().x;
    assert!(x <= 0.2 + 1e-4, "moved {x} after a clamped stall");
}

#[test]
fn test_exhaustion_never_aliases_live_slot() {
    let mut sim = still_world(3);
    let handles: Vec<_> = (0..3).map(|_| sim.spawn_particle().unwrap()).collect();

    assert_eq!(
        sim.spawn_particle(),
        Err(PoolError::Exhausted { capacity: 3 })
    );
    assert_eq!(sim.particles_count(), 3);
    assert!(handles.iter().all(|&h| sim.world().particles.is_live(h)));
}

#[test]
fn test_recycled_slot_does_not_leak_old_state() {
    let mut sim = still_world(1);
    let old = sim.spawn_particle().unwrap();
    sim.world_mut()
        .particles
        .get_mut(old)
        .unwrap()
        .set_life(0.5 * DT as f32)
        .set_color(Vec3::new(1.0, 0.0, 0.0))
        .set_position(Vec2::new(2.0, 2.0));

    sim.frame(DT * 1.5).unwrap();
    assert_eq!(sim.instances().len(), 0);
    assert_eq!(sim.particles_count(), 0);

    let fresh = sim.spawn_particle().unwrap();
    assert_eq!(fresh.index(), old.index());
    sim.world_mut()
        .particles
        .get_mut(fresh)
        .unwrap()
        .set_color(Vec3::new(0.0, 0.0, 1.0))
        .set_life(10.0);

    sim.frame(DT * 1.5).unwrap();
    assert_eq!(sim.instances().colors(), &[Vec3::new(0.0, 0.0, 1.0)]);
    assert_eq!(sim.instances().positions(), &[Vec2::ZERO]);
    assert!(sim.world().particles.get(old).is_none());
}

#[test]
fn test_second_component_cannot_steal_particle() {
    let mut sim = still_world(2);
    let (handle, first) = attach_mover(&mut sim, Vec2::new(1.0, 0.0), 100.0);

    let world = sim.world_mut();
    let mut rival = Component::new().with_velocity(Vec2::new(-1.0, 0.0));
    let err = rival.add_child(&mut world.particles, handle).unwrap_err();
    assert_eq!(err, ComponentError::AlreadyOwned { handle, owner: first });
    world.scene.add_component(rival);

    sim.frame(0.1).unwrap();
    let x = sim.world().particles.get(handle).unwrap().position().x;
    assert!(x > 0.0, "particle was pushed by both components");
}

#[test]
fn test_double_release_matches_single_release() {
    let mut sim = still_world(4);
    let (handle, id) = attach_mover(&mut sim, Vec2::new(1.0, 0.0), 100.0);

    let world = sim.world_mut();
    let grid = world.scene.find_mut(id).unwrap();
    let first = grid.release_children(&mut world.particles);
    let grid = world.scene.find_mut(id).unwrap();
    let second = grid.release_children(&mut world.particles);

    assert_eq!(first, vec![handle]);
    assert!(second.is_empty());
    assert_eq!(world.scene.particle_count(), 0);
    assert!(world.particles.is_live(handle));
    assert_eq!(world.particles.owner_of(handle), None);

    sim.frame(0.1).unwrap();
    assert_eq!(sim.world().particles.get(handle).unwrap().position(), Vec2::ZERO);
}

#[test]
fn test_destroying_component_keeps_particles_simulated() {
    let mut sim = still_world(4);
    let (handle, id) = attach_mover(&mut sim, Vec2::new(1.0, 0.0), 100.0);

    let world = sim.world_mut();
    let grid = world.scene.remove_component(id).unwrap();
    grid.destroy(&mut world.particles);

    let stats = sim.frame(0.1).unwrap();
    assert_eq!(stats.instance_count, 1);
    assert!(sim.world().particles.is_live(handle));
}

#[test]
fn test_render_prefix_matches_count() {
    let mut sim = still_world(16);
    for i in 0..10 {
        let h = sim.spawn_particle().unwrap();
        let life = if i % 2 == 0 { 0.05 } else { 10.0 };
        sim.world_mut().particles.get_mut(h).unwrap().set_life(life);
    }

    let stats = sim.frame(0.1).unwrap();

    assert_eq!(stats.instance_count, 5);
    assert_eq!(sim.instances().len(), sim.particles_count());
    assert_eq!(sim.instances().positions().len(), 5);
    assert_eq!(sim.instances().colors().len(), 5);
}

#[test]
fn test_scheduled_release_stops_motion() {
    let mut sim = still_world(4);
    let (handle, id) = attach_mover(&mut sim, Vec2::new(1.0, 0.0), 100.0);
    sim.timeline_mut().at(0.5, move |world, _| {
        if let Some(grid) = world.scene.remove_component(id) {
            grid.destroy(&mut world.particles);
        }
    });

    for _ in 0..10 {
        sim.frame(0.1).unwrap();
    }

    let x = sim.world().particles.get(handle).unwrap().position().x;
    assert_abs_diff_eq!(x, 0.5, epsilon = 2.0 * DT as f32);
    assert!(sim.world().scene.find(id).is_none());
}

#[test]
fn test_config_drives_pool_size() {
    let config = SimulationConfig::from_toml_str("capacity = 7").unwrap();
    let sim = Simulation::from_config(config).unwrap();
    assert_eq!(sim.world().particles.capacity(), 7);
    assert_eq!(sim.instances().capacity(), 7);
}

#[derive(Clone, Debug)]
enum Op {
    Allocate,
    Kill(usize),
    Step,
}

fn op() -> impl Strategy<Value = Op> {
    prop_oneof![
        4 => Just(Op::Allocate),
        1 => (0usize..64).prop_map(Op::Kill),
        1 => Just(Op::Step),
    ]
}

proptest! {
    #[test]
    fn prop_live_count_never_exceeds_capacity(
        capacity in 1usize..16,
        ops in proptest::collection::vec(op(), 0..128),
    ) {
        let mut pool = ParticleManager::new(capacity);
        let mut buffers = pool.instance_buffers();
        let mut handles: Vec<ParticleHandle> = Vec::new();

        for op in ops {
            match op {
                Op::Allocate => match pool.get_unused_particle() {
                    Ok(h) => {
                        prop_assert!(handles.iter().all(|&other| !pool.is_live(other) || other.index() != h.index()));
                        pool.get_mut(h).unwrap().set_life(0.05);
                        handles.push(h);
                    }
                    Err(PoolError::Exhausted { capacity: c }) => {
                        prop_assert_eq!(c, capacity);
                        prop_assert_eq!(pool.particles_count(), capacity);
                    }
                    Err(other) => prop_assert!(false, "unexpected error {:?}", other),
                },
                Op::Kill(i) => {
                    if let Some(&h) = handles.get(i) {
                        pool.kill(h);
                    }
                }
                Op::Step => {
                    let count = pool.update_instances(0.02, &mut buffers).unwrap();
                    prop_assert_eq!(count, pool.particles_count());
                    prop_assert_eq!(buffers.len(), count);
                }
            }
            prop_assert!(pool.particles_count() <= capacity);
            let live = handles.iter().filter(|&&h| pool.is_live(h)).count();
            prop_assert_eq!(live, pool.particles_count());
        }
    }
}
