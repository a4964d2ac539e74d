//! Fixed-capacity particle pool.
//!
//! The [`ParticleManager`] owns every [`Particle`] in a flat slot array that is
//! allocated once and never grows; the instance buffers on the GPU side are
//! sized from the same capacity.
//!
//! # Slots and handles
//!
//! | State | Meaning |
//! |-------|---------|
//! | unused | free for [`ParticleManager::get_unused_particle`] |
//! | live | integrated and rendered every step |
//!
//! Allocation hands out a [`ParticleHandle`]: the slot index plus the slot's
//! generation. Each time a slot is recycled its generation is bumped, so a
//! handle kept past its particle's death resolves to `None` instead of
//! aliasing whatever particle reuses the slot.
//!
//! # Example
//!
//! ```
//! use particle_engine::{ParticleManager, Vec2};
//!
//! let mut pool = ParticleManager::new(4);
//! let mut buffers = pool.instance_buffers();
//!
//! let handle = pool.get_unused_particle().unwrap();
//! pool.get_mut(handle).unwrap().set_position(Vec2::new(1.0, 0.0));
//!
//! let count = pool.update_instances(1.0 / 144.0, &mut buffers).unwrap();
//! assert_eq!(count, 1);
//! assert_eq!(buffers.positions()[0], Vec2::new(1.0, 0.0));
//! ```

use glam::{Vec2, Vec3};

use crate::component::ComponentId;
use crate::error::PoolError;
use crate::particle::{Environment, Particle};

/// Generation-checked reference to a pool slot.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ParticleHandle {
    index: u32,
    generation: u32,
}

impl ParticleHandle {
    /// Slot index in the pool.
    #[inline]
    pub fn index(&self) -> usize {
        self.index as usize
    }

    /// Generation of the slot when this handle was issued.
    #[inline]
    pub fn generation(&self) -> u32 {
        self.generation
    }
}

#[derive(Clone, Debug)]
struct Slot {
    particle: Particle,
    generation: u32,
    live: bool,
    owner: Option<ComponentId>,
}

impl Slot {
    fn empty() -> Self {
        Self {
            particle: Particle::default(),
            generation: 0,
            live: false,
            owner: None,
        }
    }

    fn recycle(&mut self) {
        self.live = false;
        self.owner = None;
        self.generation = self.generation.wrapping_add(1);
    }
}

/// Owns the particle slots and integrates them.
#[derive(Clone, Debug)]
pub struct ParticleManager {
    slots: Vec<Slot>,
    live_count: usize,
    cursor: usize,
    environment: Environment,
}

impl ParticleManager {
    /// Create a pool with `capacity` slots, all unused.
    pub fn new(capacity: usize) -> Self {
        Self {
            slots: vec![Slot::empty(); capacity],
            live_count: 0,
            cursor: 0,
            environment: Environment::default(),
        }
    }

    /// Set the forces and bounds applied during [`update`](Self::update).
    pub fn with_environment(mut self, environment: Environment) -> Self {
        self.environment = environment;
        self
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Number of live particles.
    #[inline]
    pub fn particles_count(&self) -> usize {
        self.live_count
    }

    #[inline]
    pub fn environment(&self) -> &Environment {
        &self.environment
    }

    pub fn set_environment(&mut self, environment: Environment) {
        self.environment = environment;
    }

    /// Throw away every slot and start over with `capacity` unused ones.
    ///
    /// Live particles are discarded. New slots start past the highest
    /// generation issued so far, so handles from before the resize stay
    /// stale instead of aliasing whatever lands in their old index.
    pub fn resize(&mut self, capacity: usize) {
        let generation = self
            .slots
            .iter()
            .map(|slot| slot.generation.wrapping_add(1))
            .max()
            .unwrap_or(0);
        if self.live_count > 0 {
            log::debug!(
                "resizing pool {} -> {}, discarding {} live particles",
                self.slots.len(),
                capacity,
                self.live_count
            );
        }

        self.slots = vec![
            Slot {
                generation,
                ..Slot::empty()
            };
            capacity
        ];
        self.live_count = 0;
        self.cursor = 0;
    }

    /// Claim a free slot and return its handle.
    ///
    /// The search starts at an internal cursor and wraps around the pool. The
    /// slot is reset to [`Particle::default`] so nothing from the previous
    /// occupant survives; configure it through [`get_mut`](Self::get_mut).
    ///
    /// # Errors
    ///
    /// [`PoolError::Exhausted`] when every slot is live. No live slot is ever
    /// handed out twice.
    pub fn get_unused_particle(&mut self) -> Result<ParticleHandle, PoolError> {
        let capacity = self.slots.len();
        if self.live_count >= capacity {
            return Err(PoolError::Exhausted { capacity });
        }

        for offset in 0..capacity {
            let index = (self.cursor + offset) % capacity;
            let slot = &mut self.slots[index];
            if slot.live {
                continue;
            }

            slot.live = true;
            slot.owner = None;
            slot.particle = Particle::default();
            self.live_count += 1;
            self.cursor = (index + 1) % capacity;

            return Ok(ParticleHandle {
                index: index as u32,
                generation: slot.generation,
            });
        }

        // live_count said a slot was free but none was found.
        log::warn!(
            "particle pool count out of sync: {} live of {}",
            self.live_count,
            capacity
        );
        Err(PoolError::Exhausted { capacity })
    }

    /// Allocate a slot and fill it with `particle`.
    pub fn spawn(&mut self, particle: Particle) -> Result<ParticleHandle, PoolError> {
        let handle = self.get_unused_particle()?;
        self.slots[handle.index()].particle = particle;
        Ok(handle)
    }

    fn slot(&self, handle: ParticleHandle) -> Option<&Slot> {
        self.slots
            .get(handle.index())
            .filter(|slot| slot.live && slot.generation == handle.generation)
    }

    fn slot_mut(&mut self, handle: ParticleHandle) -> Option<&mut Slot> {
        self.slots
            .get_mut(handle.index())
            .filter(|slot| slot.live && slot.generation == handle.generation)
    }

    /// Whether `handle` still refers to the particle it was issued for.
    #[inline]
    pub fn is_live(&self, handle: ParticleHandle) -> bool {
        self.slot(handle).is_some()
    }

    pub fn get(&self, handle: ParticleHandle) -> Option<&Particle> {
        self.slot(handle).map(|slot| &slot.particle)
    }

    pub fn get_mut(&mut self, handle: ParticleHandle) -> Option<&mut Particle> {
        self.slot_mut(handle).map(|slot| &mut slot.particle)
    }

    /// Component currently propagating its velocity to this particle.
    pub fn owner_of(&self, handle: ParticleHandle) -> Option<ComponentId> {
        self.slot(handle).and_then(|slot| slot.owner)
    }

    /// Record `owner` as the propagating component.
    ///
    /// Returns the existing owner instead when the slot is already claimed
    /// by someone else.
    pub(crate) fn claim(
        &mut self,
        handle: ParticleHandle,
        owner: ComponentId,
    ) -> Result<(), Option<ComponentId>> {
        let slot = self.slot_mut(handle).ok_or(None)?;
        match slot.owner {
            Some(current) if current != owner => Err(Some(current)),
            _ => {
                slot.owner = Some(owner);
                Ok(())
            }
        }
    }

    /// Drop the ownership mark if `owner` holds it. Stale handles are ignored.
    pub(crate) fn unclaim(&mut self, handle: ParticleHandle, owner: ComponentId) {
        if let Some(slot) = self.slot_mut(handle) {
            if slot.owner == Some(owner) {
                slot.owner = None;
            }
        }
    }

    /// Clear the ownership mark whoever holds it, returning the old owner.
    ///
    /// Recovers particles left claimed by a component that was dropped
    /// without releasing them.
    pub fn disown(&mut self, handle: ParticleHandle) -> Option<ComponentId> {
        self.slot_mut(handle).and_then(|slot| slot.owner.take())
    }

    /// Return a particle to the free pool right away.
    ///
    /// Returns `false` if the handle was already stale, which makes double
    /// kills harmless.
    pub fn kill(&mut self, handle: ParticleHandle) -> bool {
        match self.slot_mut(handle) {
            Some(slot) => {
                slot.recycle();
                self.live_count -= 1;
                true
            }
            None => false,
        }
    }

    /// Iterate live particles in slot order.
    pub fn iter_live(&self) -> impl Iterator<Item = (ParticleHandle, &Particle)> + '_ {
        self.slots.iter().enumerate().filter(|(_, slot)| slot.live).map(|(index, slot)| {
            (
                ParticleHandle {
                    index: index as u32,
                    generation: slot.generation,
                },
                &slot.particle,
            )
        })
    }

    /// Advance every live particle by `dt` and write the survivors out.
    ///
    /// Survivors are written in slot order to `positions[..count]` and
    /// `colors[..count]`; entries at or past `count` are left untouched.
    /// Particles whose life runs out are recycled and can be handed out by the
    /// next [`get_unused_particle`](Self::get_unused_particle) call.
    ///
    /// # Errors
    ///
    /// [`PoolError::OutputTooSmall`] if either array is shorter than the
    /// current live count. Nothing is integrated in that case.
    pub fn update(
        &mut self,
        dt: f32,
        positions: &mut [Vec2],
        colors: &mut [Vec3],
    ) -> Result<usize, PoolError> {
        if positions.len() < self.live_count || colors.len() < self.live_count {
            return Err(PoolError::OutputTooSmall {
                live: self.live_count,
                positions: positions.len(),
                colors: colors.len(),
            });
        }

        let env = self.environment;
        let mut written = 0;
        let mut recycled = 0;

        for slot in self.slots.iter_mut().filter(|slot| slot.live) {
            if slot.particle.integrate(dt, &env) {
                positions[written] = slot.particle.position();
                colors[written] = slot.particle.color();
                written += 1;
            } else {
                slot.recycle();
                recycled += 1;
            }
        }

        self.live_count -= recycled;
        if recycled > 0 {
            log::trace!("recycled {} particles, {} live", recycled, self.live_count);
        }
        debug_assert_eq!(written, self.live_count);

        Ok(written)
    }

    /// Capacity-sized output buffers for [`update_instances`](Self::update_instances).
    pub fn instance_buffers(&self) -> InstanceBuffers {
        InstanceBuffers::new(self.capacity())
    }

    /// [`update`](Self::update) into a pair of [`InstanceBuffers`].
    pub fn update_instances(
        &mut self,
        dt: f32,
        buffers: &mut InstanceBuffers,
    ) -> Result<usize, PoolError> {
        let count = self.update(dt, &mut buffers.positions, &mut buffers.colors)?;
        buffers.len = count;
        Ok(count)
    }
}

/// Per-instance arrays handed to the renderer.
///
/// Both arrays are allocated at full capacity once; only the prefix written
/// by the last update is visible through the accessors.
#[derive(Clone, Debug)]
pub struct InstanceBuffers {
    positions: Vec<Vec2>,
    colors: Vec<Vec3>,
    len: usize,
}

impl InstanceBuffers {
    /// Zeroed buffers with room for `capacity` instances.
    pub fn new(capacity: usize) -> Self {
        Self {
            positions: vec![Vec2::ZERO; capacity],
            colors: vec![Vec3::ZERO; capacity],
            len: 0,
        }
    }

    /// Number of instances to draw.
    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.positions.len()
    }

    pub fn positions(&self) -> &[Vec2] {
        &self.positions[..self.len]
    }

    pub fn colors(&self) -> &[Vec3] {
        &self.colors[..self.len]
    }

    /// Live positions as raw bytes for a vertex buffer upload.
    pub fn position_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(self.positions())
    }

    /// Live colors as raw bytes for a vertex buffer upload.
    pub fn color_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(self.colors())
    }
}
