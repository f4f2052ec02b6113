use thiserror::Error;

use crate::handle::{EmitterId, ParticleId, PoolId, SystemId};

/// Error types for particle lifecycle and frame update operations
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParticleError {
    /// `activate` was called on a particle with no bound emitter
    #[error("Invalid state: particle {0} has no bound emitter and cannot be activated")]
    NoEmitterBound(ParticleId),

    /// The particle was produced by another system's allocator
    #[error("Invalid state: particle {particle} belongs to system {actual}, not {expected}")]
    ForeignParticle {
        particle: ParticleId,
        expected: SystemId,
        actual: SystemId,
    },

    /// The allocator reached its configured capacity and has no free storage
    #[error("Capacity exhausted: all {capacity} particle slots are in use")]
    CapacityExhausted { capacity: usize },

    /// The emitter handle does not resolve to a registered emitter
    #[error("Unknown emitter: {0}")]
    UnknownEmitter(EmitterId),

    /// The pool handle does not resolve to a registered render pool
    #[error("Unknown render pool: {0}")]
    UnknownPool(PoolId),

    /// The particle handle is not in the active set (never activated or already recycled)
    #[error("Particle {0} is not active")]
    NotActive(ParticleId),

    /// A dedicated worker pool could not be created
    #[error("Thread pool error: {0}")]
    ThreadPool(String),
}

/// Result type using ParticleError
pub type Result<T> = std::result::Result<T, ParticleError>;
