//! Individual particle record and its lifecycle operations

use glam::Vec3;
use log::trace;

use crate::emitter::EmitterTable;
use crate::error::{ParticleError, Result};
use crate::handle::{EmitterId, ParticleId, PoolId, SystemId};
use crate::pool::PoolTable;

/// A single animated particle
///
/// Plain mutable state plus three non-owning back-references: the bound
/// emitter, the render pool it is a member of, and the system whose
/// allocator owns its storage. A particle with no emitter is inert:
/// [`update`](Self::update) and [`render`](Self::render) do nothing.
#[derive(Debug, Clone, PartialEq)]
pub struct Particle {
    id: ParticleId,
    system: SystemId,
    position: Vec3,
    velocity: Vec3,
    size: f32,
    /// Informational tick counter, never enforced by the core
    lifetime: i32,
    emitter: Option<EmitterId>,
    pool: Option<PoolId>,
}

impl Particle {
    pub(crate) fn new(id: ParticleId, system: SystemId) -> Self {
        Self {
            id,
            system,
            position: Vec3::ZERO,
            velocity: Vec3::ZERO,
            size: 0.0,
            lifetime: 0,
            emitter: None,
            pool: None,
        }
    }

    /// Current handle of this storage
    #[inline]
    pub fn id(&self) -> ParticleId {
        self.id
    }

    /// System whose allocator owns this storage
    #[inline]
    pub fn system(&self) -> SystemId {
        self.system
    }

    #[inline]
    pub fn position(&self) -> Vec3 {
        self.position
    }

    #[inline]
    pub fn velocity(&self) -> Vec3 {
        self.velocity
    }

    #[inline]
    pub fn size(&self) -> f32 {
        self.size
    }

    #[inline]
    pub fn lifetime(&self) -> i32 {
        self.lifetime
    }

    /// Bound emitter, if any
    #[inline]
    pub fn emitter(&self) -> Option<EmitterId> {
        self.emitter
    }

    /// Render pool this particle is a member of, if any
    #[inline]
    pub fn pool(&self) -> Option<PoolId> {
        self.pool
    }

    /// Whether an emitter is bound
    #[inline]
    pub fn is_bound(&self) -> bool {
        self.emitter.is_some()
    }

    /// Replace the bound emitter; the previous emitter is not notified
    pub fn bind(&mut self, emitter: EmitterId) {
        self.emitter = Some(emitter);
    }

    pub fn set_location(&mut self, x: f32, y: f32, z: f32) {
        self.position = Vec3::new(x, y, z);
    }

    pub fn set_speed(&mut self, x: f32, y: f32, z: f32) {
        self.velocity = Vec3::new(x, y, z);
    }

    /// Set the size; non-positive values are ignored
    pub fn set_size(&mut self, size: f32) {
        if size > 0.0 {
            self.size = size;
        }
    }

    pub fn set_lifetime(&mut self, lifetime: i32) {
        self.lifetime = lifetime;
    }

    /// Subtract from the lifetime counter without any bounds check
    pub fn reduce_lifetime(&mut self, delta: i32) {
        self.lifetime = self.lifetime.wrapping_sub(delta);
    }

    /// Move this particle into `pool`
    ///
    /// Does nothing if the particle is already a member of `pool`. Otherwise
    /// the particle leaves its current pool before joining the new one, so it
    /// is never a member of two pools at once.
    pub fn insert_into_pool(&mut self, pools: &mut PoolTable, pool: PoolId) -> Result<()> {
        if self.pool == Some(pool) {
            return Ok(());
        }
        if !pools.contains(pool) {
            return Err(ParticleError::UnknownPool(pool));
        }

        if let Some(current) = self.pool.take() {
            if let Some(previous) = pools.get_mut(current) {
                previous.remove_particle_from_pool(self.id);
            }
        }
        if let Some(next) = pools.get_mut(pool) {
            next.add_particle_to_pool(self.id);
            self.pool = Some(pool);
        }

        trace!("particle {} joined {}", self.id, pool);
        Ok(())
    }

    /// Reset to defaults and drop every binding
    ///
    /// The bound emitter gets `particle_died()` and the current pool gets
    /// `remove_particle_from_pool`. The system is not told; use
    /// [`ParticleSystem::kill`](crate::ParticleSystem::kill) to also leave the
    /// active set.
    pub fn clean(&mut self, emitters: &mut EmitterTable, pools: &mut PoolTable) {
        self.zero();

        if let Some(emitter) = self.emitter.take() {
            if let Some(emitter) = emitters.get_mut(emitter) {
                emitter.particle_died();
            }
        }
        if let Some(pool) = self.pool.take() {
            if let Some(pool) = pools.get_mut(pool) {
                pool.remove_particle_from_pool(self.id);
            }
        }
    }

    /// Draw through the bound emitter; no-op when unbound
    pub fn render(&self, emitters: &mut EmitterTable) {
        if let Some(emitter) = self.emitter.and_then(|id| emitters.get_mut(id)) {
            emitter.render(self);
        }
    }

    /// Advance one tick through the bound emitter
    ///
    /// Returns the emitter's verdict verbatim, or `false` when no emitter is
    /// bound. `false` means the particle did not survive.
    pub fn update(&mut self, emitters: &EmitterTable, delta_ms: i32) -> bool {
        match self.emitter.and_then(|id| emitters.get(id)) {
            Some(emitter) => emitter.update_particle(self, delta_ms),
            None => false,
        }
    }

    /// Leave the current pool and forget the emitter without notifying it
    pub(crate) fn detach(&mut self, pools: &mut PoolTable) {
        self.emitter = None;
        if let Some(pool) = self.pool.take() {
            if let Some(pool) = pools.get_mut(pool) {
                pool.remove_particle_from_pool(self.id);
            }
        }
    }

    /// Drop the emitter reference only (emitter unregistered)
    pub(crate) fn unbind(&mut self) {
        self.emitter = None;
    }

    /// Drop the pool reference only (pool unregistered)
    pub(crate) fn forget_pool(&mut self) {
        self.pool = None;
    }

    /// Prepare storage for its next owner under a new handle
    pub(crate) fn recycle(&mut self, id: ParticleId) {
        self.zero();
        self.emitter = None;
        self.pool = None;
        self.id = id;
    }

    fn zero(&mut self) {
        self.position = Vec3::ZERO;
        self.velocity = Vec3::ZERO;
        self.size = 0.0;
        self.lifetime = 0;
    }
}
