//! Render pool capability and the table that owns registered pools

use std::sync::atomic::{AtomicU32, Ordering};

use crate::handle::{ParticleId, PoolId};

/// A grouping a particle can join so a renderer can batch-draw its members
///
/// Implemented outside this crate by the renderer. The core guarantees that a
/// particle is a member of at most one pool at a time: a move between pools
/// always removes from the old pool before adding to the new one.
pub trait RenderPool: Send {
    /// Called when a particle joins this pool
    fn add_particle_to_pool(&mut self, particle: ParticleId);

    /// Called when a particle leaves this pool (pool change or death)
    fn remove_particle_from_pool(&mut self, particle: ParticleId);

    /// Detach all members at once, without per-member notification
    fn clear_pool(&mut self);
}

/// Registered render pools, keyed by [`PoolId`]
///
/// Keys are unique across every table in the process.
#[derive(Default)]
pub struct PoolTable {
    entries: Vec<(PoolId, Box<dyn RenderPool>)>,
}

static NEXT_POOL_ID: AtomicU32 = AtomicU32::new(0);

impl PoolTable {
    /// Create an empty table
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a pool and return its key
    pub fn insert(&mut self, pool: Box<dyn RenderPool>) -> PoolId {
        let id = PoolId(NEXT_POOL_ID.fetch_add(1, Ordering::Relaxed));
        self.entries.push((id, pool));
        id
    }

    /// Unregister a pool, handing ownership back to the caller
    pub fn remove(&mut self, id: PoolId) -> Option<Box<dyn RenderPool>> {
        let index = self.entries.iter().position(|(key, _)| *key == id)?;
        Some(self.entries.remove(index).1)
    }

    /// Check whether a key resolves
    pub fn contains(&self, id: PoolId) -> bool {
        self.entries.iter().any(|(key, _)| *key == id)
    }

    /// Resolve a key for mutation
    pub fn get_mut(&mut self, id: PoolId) -> Option<&mut (dyn RenderPool + 'static)> {
        self.entries
            .iter_mut()
            .find(|(key, _)| *key == id)
            .map(|(_, pool)| pool.as_mut())
    }

    /// Number of registered pools
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no pools are registered
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl std::fmt::Debug for PoolTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PoolTable")
            .field("pools", &self.entries.iter().map(|(id, _)| *id).collect::<Vec<_>>())
            .finish()
    }
}
