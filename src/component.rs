//! Scene graph nodes that push groups of particles around.
//!
//! A [`Component`] owns its child components by value and refers to
//! particles through [`ParticleHandle`]s. The [`ParticleManager`] stays the
//! only owner of particle storage, so dropping a component never frees a
//! particle; it only stops the component moving it.
//!
//! # Velocity
//!
//! A component's velocity is applied to the particles attached directly to
//! it. Child components move their own particles with their own velocity;
//! nothing is inherited down the tree.
//!
//! # Ownership
//!
//! A live particle can be attached to one component at a time. Attaching it
//! to a second component fails with [`ComponentError::AlreadyOwned`] until
//! the first one releases it. A component dropped without releasing leaves
//! its mark behind; [`ParticleManager::disown`] clears it.
//!
//! ```
//! use particle_engine::{Component, ParticleManager, Vec2};
//!
//! let mut pool = ParticleManager::new(16);
//! let mut grid = Component::new().with_velocity(Vec2::new(0.5, 0.0));
//!
//! let p = pool.get_unused_particle().unwrap();
//! grid.add_child(&mut pool, p).unwrap();
//!
//! grid.update(0.1, &mut pool);
//! assert!((pool.get(p).unwrap().position().x - 0.05).abs() < 1e-6);
//!
//! let released = grid.release_children(&mut pool);
//! assert_eq!(released, vec![p]);
//! assert!(pool.is_live(p));
//! ```

use std::sync::atomic::{AtomicU64, Ordering};

use glam::Vec2;

use crate::error::ComponentError;
use crate::manager::{ParticleHandle, ParticleManager};

static NEXT_COMPONENT_ID: AtomicU64 = AtomicU64::new(1);

/// Process-unique identifier of a [`Component`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ComponentId(u64);

impl ComponentId {
    pub(crate) fn next() -> Self {
        Self(NEXT_COMPONENT_ID.fetch_add(1, Ordering::Relaxed))
    }

    /// Raw numeric value, mostly useful in logs.
    pub fn get(&self) -> u64 {
        self.0
    }
}

/// A node in the scene graph.
#[derive(Debug)]
pub struct Component {
    id: ComponentId,
    name: Option<String>,
    velocity: Vec2,
    particles: Vec<ParticleHandle>,
    children: Vec<Component>,
}

impl Default for Component {
    fn default() -> Self {
        Self::new()
    }
}

impl Component {
    /// Create an empty, motionless component.
    pub fn new() -> Self {
        Self {
            id: ComponentId::next(),
            name: None,
            velocity: Vec2::ZERO,
            particles: Vec::new(),
            children: Vec::new(),
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_velocity(mut self, velocity: Vec2) -> Self {
        self.velocity = velocity;
        self
    }

    #[inline]
    pub fn id(&self) -> ComponentId {
        self.id
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    #[inline]
    pub fn velocity(&self) -> Vec2 {
        self.velocity
    }

    /// Set the velocity applied to directly attached particles.
    pub fn set_velocity(&mut self, velocity: Vec2) {
        self.velocity = velocity;
    }

    /// Handles attached directly to this node.
    pub fn particles(&self) -> &[ParticleHandle] {
        &self.particles
    }

    pub fn children(&self) -> &[Component] {
        &self.children
    }

    /// Number of particle handles held by this node and its descendants.
    pub fn particle_count(&self) -> usize {
        self.particles.len()
            + self
                .children
                .iter()
                .map(Component::particle_count)
                .sum::<usize>()
    }

    /// Attach a live particle to this component.
    ///
    /// Attaching a particle this component already holds is a no-op.
    ///
    /// # Errors
    ///
    /// - [`ComponentError::StaleHandle`] if the particle has expired.
    /// - [`ComponentError::AlreadyOwned`] if another component holds it.
    pub fn add_child(
        &mut self,
        pool: &mut ParticleManager,
        handle: ParticleHandle,
    ) -> Result<(), ComponentError> {
        if pool.owner_of(handle) == Some(self.id) {
            return Ok(());
        }

        match pool.claim(handle, self.id) {
            Ok(()) => {
                self.particles.push(handle);
                Ok(())
            }
            Err(Some(owner)) => Err(ComponentError::AlreadyOwned { handle, owner }),
            Err(None) => Err(ComponentError::StaleHandle(handle)),
        }
    }

    /// Take ownership of `child` as a sub-node. Returns its id.
    pub fn add_component(&mut self, child: Component) -> ComponentId {
        let id = child.id;
        self.children.push(child);
        id
    }

    /// Detach the descendant with `id` and hand it back, particles still attached.
    pub fn remove_component(&mut self, id: ComponentId) -> Option<Component> {
        if let Some(pos) = self.children.iter().position(|c| c.id == id) {
            return Some(self.children.remove(pos));
        }
        self.children
            .iter_mut()
            .find_map(|child| child.remove_component(id))
    }

    /// Find this node or a descendant by id.
    pub fn find(&self, id: ComponentId) -> Option<&Component> {
        if self.id == id {
            return Some(self);
        }
        self.children.iter().find_map(|child| child.find(id))
    }

    pub fn find_mut(&mut self, id: ComponentId) -> Option<&mut Component> {
        if self.id == id {
            return Some(self);
        }
        self.children.iter_mut().find_map(|child| child.find_mut(id))
    }

    /// Move attached particles by `velocity * dt`, then update children.
    ///
    /// Handles whose particle expired since the last step are dropped.
    pub fn update(&mut self, dt: f32, pool: &mut ParticleManager) {
        let offset = self.velocity * dt;
        self.particles.retain(|&handle| match pool.get_mut(handle) {
            Some(particle) => {
                particle.translate(offset);
                true
            }
            None => false,
        });

        for child in &mut self.children {
            child.update(dt, pool);
        }
    }

    /// Detach every particle from this node and its descendants.
    ///
    /// Particles stay live in the pool and keep their state. Returns the
    /// handles that were detached; calling it again returns an empty list.
    pub fn release_children(&mut self, pool: &mut ParticleManager) -> Vec<ParticleHandle> {
        let mut released = Vec::new();
        self.release_into(pool, &mut released);
        if !released.is_empty() {
            log::debug!(
                "component {} released {} particles",
                self.label(),
                released.len()
            );
        }
        released
    }

    fn release_into(&mut self, pool: &mut ParticleManager, released: &mut Vec<ParticleHandle>) {
        for handle in self.particles.drain(..) {
            pool.unclaim(handle, self.id);
            released.push(handle);
        }
        for child in &mut self.children {
            child.release_into(pool, released);
        }
    }

    /// Release every particle and drop the component.
    pub fn destroy(mut self, pool: &mut ParticleManager) -> Vec<ParticleHandle> {
        self.release_children(pool)
    }

    fn label(&self) -> String {
        match &self.name {
            Some(name) => format!("{:?} ({})", name, self.id.get()),
            None => self.id.get().to_string(),
        }
    }
}

impl Drop for Component {
    fn drop(&mut self) {
        if !self.particles.is_empty() {
            log::warn!(
                "component {} dropped with {} attached particles; call release_children first",
                self.label(),
                self.particles.len()
            );
        }
    }
}
