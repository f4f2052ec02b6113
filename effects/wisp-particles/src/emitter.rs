//! Emitter capability, the emitter table, and the spawn context
//!
//! Emitters hold all effect-specific policy: how often to spawn, how a
//! particle moves, when it dies, and how it is drawn. The core only calls
//! them through [`Emitter`].

use std::sync::atomic::{AtomicU32, Ordering};

use log::trace;

use crate::Result;
use crate::handle::{EmitterId, ParticleId, PoolId, SystemId};
use crate::particle::Particle;
use crate::pool::PoolTable;
use crate::system::ParticleStore;

/// Spawn and motion policy for a family of particles
///
/// `update_particle` is called from worker threads during the concurrent
/// pass and therefore only receives shared access to the emitter. All other
/// callbacks run on the thread that owns the [`ParticleSystem`](crate::ParticleSystem).
pub trait Emitter: Send + Sync {
    /// Once-per-frame bookkeeping (spawn timers, etc.), run before particles update
    fn update_emitter(&mut self, ctx: &mut SpawnContext<'_>, delta_ms: i32);

    /// Advance one particle; return `false` if it does not survive this tick
    fn update_particle(&self, particle: &mut Particle, delta_ms: i32) -> bool;

    /// Draw one particle
    fn render(&mut self, particle: &Particle);

    /// A particle bound to this emitter was cleaned
    fn particle_died(&mut self);
}

/// Registered emitters in registration order, keyed by [`EmitterId`]
///
/// Keys are unique across every table in the process, so a key from another
/// system never resolves here.
#[derive(Default)]
pub struct EmitterTable {
    ids: Vec<EmitterId>,
    emitters: Vec<Box<dyn Emitter>>,
}

static NEXT_EMITTER_ID: AtomicU32 = AtomicU32::new(0);

impl EmitterTable {
    /// Create an empty table
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an emitter at the end of the update order
    pub fn insert(&mut self, emitter: Box<dyn Emitter>) -> EmitterId {
        let id = EmitterId(NEXT_EMITTER_ID.fetch_add(1, Ordering::Relaxed));
        self.ids.push(id);
        self.emitters.push(emitter);
        id
    }

    /// Unregister an emitter, keeping the relative order of the rest
    pub fn remove(&mut self, id: EmitterId) -> Option<Box<dyn Emitter>> {
        let index = self.index_of(id)?;
        self.ids.remove(index);
        Some(self.emitters.remove(index))
    }

    /// Check whether a key resolves
    pub fn contains(&self, id: EmitterId) -> bool {
        self.ids.contains(&id)
    }

    /// Resolve a key for shared access
    pub fn get(&self, id: EmitterId) -> Option<&(dyn Emitter + 'static)> {
        self.index_of(id).map(|index| self.emitters[index].as_ref())
    }

    /// Resolve a key for mutation
    pub fn get_mut(&mut self, id: EmitterId) -> Option<&mut (dyn Emitter + 'static)> {
        self.index_of(id).map(|index| self.emitters[index].as_mut())
    }

    /// Keys in registration order
    pub fn ids(&self) -> impl Iterator<Item = EmitterId> + '_ {
        self.ids.iter().copied()
    }

    pub(crate) fn keys(&self) -> &[EmitterId] {
        &self.ids
    }

    /// Live keys alongside mutable emitters, both in registration order
    pub(crate) fn split_mut(&mut self) -> (&[EmitterId], &mut [Box<dyn Emitter>]) {
        (&self.ids, &mut self.emitters)
    }

    /// Number of registered emitters
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    /// Whether no emitters are registered
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    fn index_of(&self, id: EmitterId) -> Option<usize> {
        self.ids.iter().position(|key| *key == id)
    }
}

impl std::fmt::Debug for EmitterTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EmitterTable")
            .field("emitters", &self.ids().collect::<Vec<_>>())
            .finish()
    }
}

/// Access an emitter gets to the system while its `update_emitter` runs
///
/// Lets the emitter request storage, bind and pool it, and activate it. The
/// emitter table itself is not reachable from here, since the emitter being
/// updated is borrowed out of it.
pub struct SpawnContext<'a> {
    emitter: EmitterId,
    system: SystemId,
    live: &'a [EmitterId],
    store: &'a mut ParticleStore,
    pools: &'a mut PoolTable,
}

impl<'a> SpawnContext<'a> {
    pub(crate) fn new(
        emitter: EmitterId,
        system: SystemId,
        live: &'a [EmitterId],
        store: &'a mut ParticleStore,
        pools: &'a mut PoolTable,
    ) -> Self {
        Self {
            emitter,
            system,
            live,
            store,
            pools,
        }
    }

    /// Key of the emitter being updated
    pub fn emitter_id(&self) -> EmitterId {
        self.emitter
    }

    /// Get particle storage from the allocator (fresh or recycled, unbound)
    pub fn request_particle(&mut self) -> Result<Box<Particle>> {
        self.store.allocator.acquire()
    }

    /// Get particle storage already bound to the emitter being updated
    pub fn spawn(&mut self) -> Result<Box<Particle>> {
        let mut particle = self.store.allocator.acquire()?;
        particle.bind(self.emitter);
        Ok(particle)
    }

    /// Move a pending particle into a render pool
    pub fn insert_into_pool(&mut self, particle: &mut Particle, pool: PoolId) -> Result<()> {
        particle.insert_into_pool(self.pools, pool)
    }

    /// Register a pending particle into the active set
    ///
    /// The particle may be bound to any emitter registered with this system.
    pub fn activate(&mut self, particle: Box<Particle>) -> Result<ParticleId> {
        self.store.activate(self.system, particle, self.live, self.pools)
    }

    /// Return storage that will not be activated
    ///
    /// Pool membership is dropped; the bound emitter is not notified, since
    /// the particle never lived.
    pub fn discard(&mut self, mut particle: Box<Particle>) {
        particle.detach(self.pools);
        trace!("discarding unused particle {}", particle.id());
        self.store.allocator.release(particle);
    }

    /// Number of particles currently in the active set
    pub fn active_count(&self) -> usize {
        self.store.active.len()
    }
}
