//! Particle system: allocator, active set, emitters, and the frame update

use std::sync::atomic::{AtomicUsize, Ordering};

use log::{debug, trace, warn};

use crate::allocator::ParticleAllocator;
use crate::config::SystemConfig;
use crate::emitter::{Emitter, EmitterTable, SpawnContext};
use crate::error::{ParticleError, Result};
#[cfg(feature = "parallel")]
use crate::filter::FilterMode;
use crate::filter::{compact, stable_filter};
use crate::handle::{EmitterId, ParticleId, PoolId, SystemId};
use crate::particle::Particle;
use crate::pool::{PoolTable, RenderPool};

/// Allocator plus the active set it feeds
#[derive(Debug)]
pub(crate) struct ParticleStore {
    pub(crate) allocator: ParticleAllocator,
    pub(crate) active: Vec<Box<Particle>>,
}

impl ParticleStore {
    /// Move a pending particle into the active set
    ///
    /// The bound emitter must be one of `live`. On failure the storage goes
    /// back to the allocator (or is dropped when it belongs to another system)
    /// and cannot be reused by the caller.
    pub(crate) fn activate(
        &mut self,
        system: SystemId,
        mut particle: Box<Particle>,
        live: &[EmitterId],
        pools: &mut PoolTable,
    ) -> Result<ParticleId> {
        let id = particle.id();
        if particle.system() != system {
            return Err(ParticleError::ForeignParticle {
                particle: id,
                expected: system,
                actual: particle.system(),
            });
        }

        let error = match particle.emitter() {
            None => ParticleError::NoEmitterBound(id),
            Some(emitter) if !live.contains(&emitter) => ParticleError::UnknownEmitter(emitter),
            Some(_) => {
                trace!("particle {id} activated");
                self.active.push(particle);
                return Ok(id);
            }
        };

        particle.detach(pools);
        self.allocator.release(particle);
        Err(error)
    }

    fn position(&self, id: ParticleId) -> Result<usize> {
        self.active
            .iter()
            .position(|particle| particle.id() == id)
            .ok_or(ParticleError::NotActive(id))
    }
}

/// Summary of one [`ParticleSystem::update`] call
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FrameStats {
    /// Frame number, starting at 1
    pub frame: u64,
    /// Emitters updated in phase one
    pub emitters: usize,
    /// Particles evaluated in phase two
    pub processed: usize,
    /// Particles left in the active set
    pub survived: usize,
    /// Particles cleaned and returned to the allocator
    pub recycled: usize,
    /// Survivors with no bound emitter
    pub inert: usize,
    /// Whether the particle pass forked
    pub forked: bool,
}

/// Orchestrates emitters and particles frame by frame
///
/// `update` first runs every emitter in registration order, then filters the
/// active set with the fork-join pass: each particle asks its emitter whether
/// it survives, and the ones that do not are cleaned and recycled. Survivors
/// keep their relative order.
///
/// `update` and `render` both take `&mut self`, so a frame update can never
/// overlap another update or a render pass.
#[derive(Debug)]
pub struct ParticleSystem {
    id: SystemId,
    config: SystemConfig,
    store: ParticleStore,
    /// Second buffer for compaction
    scratch: Vec<Box<Particle>>,
    emitters: EmitterTable,
    pools: PoolTable,
    #[cfg(feature = "parallel")]
    workers: Option<rayon::ThreadPool>,
    frame: u64,
    last_inert: usize,
}

impl Default for ParticleSystem {
    fn default() -> Self {
        Self::assemble(SystemId::next(), SystemConfig::default())
    }
}

impl ParticleSystem {
    /// Create a system from configuration
    pub fn new(config: SystemConfig) -> Result<Self> {
        let id = SystemId::next();

        #[cfg(feature = "parallel")]
        let workers = if config.worker_threads > 0 {
            let pool = rayon::ThreadPoolBuilder::new()
                .num_threads(config.worker_threads)
                .thread_name(move |index| format!("wisp-{}-worker-{index}", id.raw()))
                .build()
                .map_err(|e| ParticleError::ThreadPool(e.to_string()))?;
            Some(pool)
        } else {
            None
        };

        #[cfg(not(feature = "parallel"))]
        if config.worker_threads > 0 {
            debug!("worker_threads ignored: built without the `parallel` feature");
        }

        #[allow(unused_mut)]
        let mut system = Self::assemble(id, config);
        #[cfg(feature = "parallel")]
        {
            system.workers = workers;
        }
        Ok(system)
    }

    fn assemble(id: SystemId, config: SystemConfig) -> Self {
        let allocator = ParticleAllocator::new(id, config.allocator.clone());
        debug!(
            "created particle {id} (threshold {}, {:?}, {} pre-built slots)",
            config.parallel_threshold,
            config.filter_mode,
            allocator.free_count()
        );

        Self {
            id,
            config,
            store: ParticleStore {
                allocator,
                active: Vec::new(),
            },
            scratch: Vec::new(),
            emitters: EmitterTable::new(),
            pools: PoolTable::new(),
            #[cfg(feature = "parallel")]
            workers: None,
            frame: 0,
            last_inert: 0,
        }
    }

    /// Register an emitter at the end of the update order
    pub fn add_emitter(&mut self, emitter: Box<dyn Emitter>) -> EmitterId {
        let id = self.emitters.insert(emitter);
        debug!("{} registered {id}", self.id);
        id
    }

    /// Unregister an emitter
    ///
    /// Active particles bound to it lose their emitter reference without a
    /// `particle_died` notification. They stay in the active set as inert
    /// particles until killed explicitly.
    pub fn remove_emitter(&mut self, id: EmitterId) -> Option<Box<dyn Emitter>> {
        let emitter = self.emitters.remove(id)?;

        let mut orphaned = 0usize;
        for particle in self.store.active.iter_mut() {
            if particle.emitter() == Some(id) {
                particle.unbind();
                orphaned += 1;
            }
        }
        if orphaned > 0 {
            warn!("removing {id} left {orphaned} active particles without an emitter");
        }
        Some(emitter)
    }

    /// Register a render pool
    pub fn add_pool(&mut self, pool: Box<dyn RenderPool>) -> PoolId {
        let id = self.pools.insert(pool);
        debug!("{} registered {id}", self.id);
        id
    }

    /// Unregister a render pool
    ///
    /// Every active member forgets the pool, then the pool is told to
    /// `clear_pool` and handed back.
    pub fn remove_pool(&mut self, id: PoolId) -> Option<Box<dyn RenderPool>> {
        let mut pool = self.pools.remove(id)?;
        for particle in self.store.active.iter_mut() {
            if particle.pool() == Some(id) {
                particle.forget_pool();
            }
        }
        pool.clear_pool();
        Some(pool)
    }

    /// Get storage for a new particle (reused when possible)
    ///
    /// The particle is not active until it is bound and passed to
    /// [`activate`](Self::activate). Its handle differs from any handle the
    /// same storage had before.
    pub fn request_particle(&mut self) -> Result<Box<Particle>> {
        self.store.allocator.acquire()
    }

    /// Add a bound particle to the active set
    pub fn activate(&mut self, particle: Box<Particle>) -> Result<ParticleId> {
        self.store
            .activate(self.id, particle, self.emitters.keys(), &mut self.pools)
    }

    /// Return storage from [`request_particle`](Self::request_particle) that
    /// will not be activated
    pub fn discard(&mut self, mut particle: Box<Particle>) {
        particle.detach(&mut self.pools);
        self.store.allocator.release(particle);
    }

    /// Put a pending (not yet active) particle into a render pool
    pub fn join_pool(&mut self, particle: &mut Particle, pool: PoolId) -> Result<()> {
        particle.insert_into_pool(&mut self.pools, pool)
    }

    /// Put an active particle into a render pool
    pub fn insert_into_pool(&mut self, id: ParticleId, pool: PoolId) -> Result<()> {
        let index = self.store.position(id)?;
        self.store.active[index].insert_into_pool(&mut self.pools, pool)
    }

    /// Run one frame: emitters in registration order, then the particle pass
    pub fn update(&mut self, delta_ms: i32) -> FrameStats {
        self.frame += 1;

        let (live, emitters) = self.emitters.split_mut();
        for (&emitter_id, emitter) in live.iter().zip(emitters.iter_mut()) {
            let mut ctx =
                SpawnContext::new(emitter_id, self.id, live, &mut self.store, &mut self.pools);
            emitter.update_emitter(&mut ctx, delta_ms);
        }

        let processed = self.store.active.len();
        let inert = AtomicUsize::new(0);
        let emitters = &self.emitters;
        let keep = |particle: &mut Box<Particle>| {
            let resolved = particle.emitter().and_then(|id| emitters.get(id));
            match resolved {
                Some(emitter) => emitter.update_particle(particle, delta_ms),
                None => {
                    // Unbound, or rebound to a key this system never issued
                    particle.unbind();
                    inert.fetch_add(1, Ordering::Relaxed);
                    true
                }
            }
        };

        let threshold = self.config.parallel_threshold;
        let mode = self.config.filter_mode;
        let active = &mut self.store.active;

        #[cfg(feature = "parallel")]
        let outcome = match (&self.workers, mode) {
            (Some(workers), FilterMode::Parallel) => {
                workers.install(|| stable_filter(active, threshold, mode, &keep))
            }
            _ => stable_filter(active, threshold, mode, &keep),
        };
        #[cfg(not(feature = "parallel"))]
        let outcome = stable_filter(active, threshold, mode, &keep);

        let ParticleStore { allocator, active } = &mut self.store;
        let emitters = &mut self.emitters;
        let pools = &mut self.pools;
        compact(active, &mut self.scratch, &outcome.rejected, |mut particle| {
            trace!("particle {} died", particle.id());
            particle.clean(emitters, pools);
            allocator.release(particle);
        });

        let stats = FrameStats {
            frame: self.frame,
            emitters: self.emitters.len(),
            processed,
            survived: self.store.active.len(),
            recycled: outcome.rejected.len(),
            inert: inert.into_inner(),
            forked: outcome.forked,
        };

        if stats.inert > self.last_inert {
            warn!(
                "{}: {} active particles have no emitter and will never die",
                self.id, stats.inert
            );
        }
        self.last_inert = stats.inert;

        debug!(
            "{} frame {}: {} emitters, {} processed, {} survived, {} recycled{}",
            self.id,
            stats.frame,
            stats.emitters,
            stats.processed,
            stats.survived,
            stats.recycled,
            if stats.forked { " (forked)" } else { "" }
        );
        stats
    }

    /// Draw every active particle through its emitter
    ///
    /// Call on the owning thread after `update` has returned.
    pub fn render(&mut self) {
        for particle in &self.store.active {
            particle.render(&mut self.emitters);
        }
    }

    /// Clean an active particle and drop it from the active set
    pub fn kill(&mut self, id: ParticleId) -> Result<()> {
        let index = self.store.position(id)?;
        self.store.active[index].clean(&mut self.emitters, &mut self.pools);
        self.recycle(id)
    }

    /// Clean an active particle in place without removing it
    ///
    /// The particle stays in the active set, unbound and inert.
    pub fn clean(&mut self, id: ParticleId) -> Result<()> {
        let index = self.store.position(id)?;
        self.store.active[index].clean(&mut self.emitters, &mut self.pools);
        Ok(())
    }

    /// Remove a particle from the active set and return it to the allocator
    ///
    /// Storage never reaches the free list with live bindings, so a particle
    /// still bound to an emitter or pool is cleaned first.
    pub fn recycle(&mut self, id: ParticleId) -> Result<()> {
        let index = self.store.position(id)?;
        let mut particle = self.store.active.remove(index);
        if particle.is_bound() || particle.pool().is_some() {
            particle.clean(&mut self.emitters, &mut self.pools);
        }
        trace!("particle {id} recycled");
        self.store.allocator.release(particle);
        Ok(())
    }

    /// Look up an active particle
    pub fn particle(&self, id: ParticleId) -> Option<&Particle> {
        self.store
            .active
            .iter()
            .find(|particle| particle.id() == id)
            .map(AsRef::as_ref)
    }

    /// Look up an active particle for mutation
    pub fn particle_mut(&mut self, id: ParticleId) -> Option<&mut Particle> {
        self.store
            .active
            .iter_mut()
            .find(|particle| particle.id() == id)
            .map(AsMut::as_mut)
    }

    /// Active particles in their current order
    pub fn active_particles(&self) -> impl Iterator<Item = &Particle> + '_ {
        self.store.active.iter().map(AsRef::as_ref)
    }

    pub fn active_count(&self) -> usize {
        self.store.active.len()
    }

    pub fn emitter_count(&self) -> usize {
        self.emitters.len()
    }

    pub fn pool_count(&self) -> usize {
        self.pools.len()
    }

    /// Resolve a registered emitter
    pub fn emitter_mut(&mut self, id: EmitterId) -> Option<&mut (dyn Emitter + 'static)> {
        self.emitters.get_mut(id)
    }

    /// Resolve a registered render pool
    pub fn pool_mut(&mut self, id: PoolId) -> Option<&mut (dyn RenderPool + 'static)> {
        self.pools.get_mut(id)
    }

    pub fn allocator(&self) -> &ParticleAllocator {
        &self.store.allocator
    }

    pub fn config(&self) -> &SystemConfig {
        &self.config
    }

    pub fn id(&self) -> SystemId {
        self.id
    }

    /// Number of completed `update` calls
    pub fn frame(&self) -> u64 {
        self.frame
    }
}
