//! Non-owning handles used for particle back-references
//!
//! Particles never own their emitter, render pool, or system. They store
//! these small `Copy` keys instead, and resolve them against tables owned by
//! the [`ParticleSystem`](crate::ParticleSystem) when a collaborator has to be
//! called.

use std::fmt;
use std::sync::atomic::{AtomicU32, Ordering};

#[cfg(feature = "serde-support")]
use serde::{Deserialize, Serialize};

/// Generation-checked handle to particle storage
///
/// `slot` identifies the storage owned by the allocator; `generation` is
/// bumped every time that storage is released, so a handle taken before a
/// kill never matches the particle handed out afterwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde-support", derive(Serialize, Deserialize))]
pub struct ParticleId {
    slot: u32,
    generation: u32,
}

impl ParticleId {
    pub(crate) const fn new(slot: u32, generation: u32) -> Self {
        Self { slot, generation }
    }

    /// Storage slot index inside the allocator
    #[inline]
    pub const fn slot(self) -> u32 {
        self.slot
    }

    /// Number of times the slot had been recycled when this handle was issued
    #[inline]
    pub const fn generation(self) -> u32 {
        self.generation
    }
}

impl fmt::Display for ParticleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}v{}", self.slot, self.generation)
    }
}

/// Key of an emitter registered with a particle system
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde-support", derive(Serialize, Deserialize))]
pub struct EmitterId(pub(crate) u32);

impl EmitterId {
    /// Raw key value
    pub const fn raw(self) -> u32 {
        self.0
    }
}

impl fmt::Display for EmitterId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "emitter-{}", self.0)
    }
}

/// Key of a render pool registered with a particle system
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde-support", derive(Serialize, Deserialize))]
pub struct PoolId(pub(crate) u32);

impl PoolId {
    /// Raw key value
    pub const fn raw(self) -> u32 {
        self.0
    }
}

impl fmt::Display for PoolId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "pool-{}", self.0)
    }
}

/// Process-unique identity of a particle system
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde-support", derive(Serialize, Deserialize))]
pub struct SystemId(u32);

static NEXT_SYSTEM_ID: AtomicU32 = AtomicU32::new(1);

impl SystemId {
    /// Issue a fresh id, never equal to any previously issued one
    pub(crate) fn next() -> Self {
        Self(NEXT_SYSTEM_ID.fetch_add(1, Ordering::Relaxed))
    }

    /// Raw id value
    pub const fn raw(self) -> u32 {
        self.0
    }
}

impl fmt::Display for SystemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "system-{}", self.0)
    }
}
