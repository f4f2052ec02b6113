//! Recycling allocator for particle storage
//!
//! Dead particles are reset and parked on a free list instead of being
//! dropped, so a steady stream of short-lived particles reaches a state where
//! no frame allocates. Storage is never freed back to the heap while the
//! allocator lives.
//!
//! The allocator is not synchronized. Only the thread that owns the
//! [`ParticleSystem`](crate::ParticleSystem) touches it, and only outside the
//! concurrent pass.

use std::collections::VecDeque;

use log::{trace, warn};

#[cfg(feature = "serde-support")]
use serde::{Deserialize, Serialize};

use crate::error::{ParticleError, Result};
use crate::handle::{ParticleId, SystemId};
use crate::particle::Particle;

/// Configuration for allocator behavior
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde-support", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde-support", serde(default))]
pub struct AllocatorConfig {
    /// Storage built up front and parked on the free list
    pub initial_capacity: usize,
    /// Upper bound on storage slots; `None` grows without limit
    pub max_particles: Option<usize>,
    /// Whether to maintain [`AllocatorStatistics`]
    pub collect_stats: bool,
}

impl Default for AllocatorConfig {
    fn default() -> Self {
        Self {
            initial_capacity: 0,
            max_particles: None,
            collect_stats: true,
        }
    }
}

impl AllocatorConfig {
    pub fn with_initial_capacity(mut self, initial_capacity: usize) -> Self {
        self.initial_capacity = initial_capacity;
        self
    }

    pub fn with_max_particles(mut self, max_particles: usize) -> Self {
        self.max_particles = Some(max_particles);
        self
    }

    pub fn with_stats(mut self, collect_stats: bool) -> Self {
        self.collect_stats = collect_stats;
        self
    }
}

/// Counters for monitoring reuse
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct AllocatorStatistics {
    /// Acquisitions served from the free list
    pub hits: u64,
    /// Acquisitions that built new storage
    pub misses: u64,
    /// Storage returned to the free list
    pub returns: u64,
    /// Acquisitions refused because the capacity was reached
    pub rejections: u64,
}

impl AllocatorStatistics {
    /// Fraction of acquisitions served from the free list (0.0 to 1.0)
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

/// Free-list object pool handing out boxed particle storage
#[derive(Debug)]
pub struct ParticleAllocator {
    system: SystemId,
    free: VecDeque<Box<Particle>>,
    /// Current generation of every slot ever built
    generations: Vec<u32>,
    stats: AllocatorStatistics,
    config: AllocatorConfig,
}

impl ParticleAllocator {
    /// Create an allocator whose storage belongs to `system`
    pub fn new(system: SystemId, config: AllocatorConfig) -> Self {
        let prewarm = config
            .max_particles
            .map_or(config.initial_capacity, |max| config.initial_capacity.min(max));

        let mut allocator = Self {
            system,
            free: VecDeque::with_capacity(prewarm),
            generations: Vec::with_capacity(prewarm),
            stats: AllocatorStatistics::default(),
            config,
        };
        for _ in 0..prewarm {
            let particle = allocator.build();
            allocator.free.push_back(particle);
        }
        allocator
    }

    /// Hand out storage, reusing a free slot before building a new one
    pub fn acquire(&mut self) -> Result<Box<Particle>> {
        if let Some(particle) = self.free.pop_front() {
            if self.config.collect_stats {
                self.stats.hits += 1;
            }
            return Ok(particle);
        }

        if let Some(capacity) = self.config.max_particles {
            if self.generations.len() >= capacity {
                if self.config.collect_stats {
                    self.stats.rejections += 1;
                }
                warn!("particle allocator for {} is at capacity ({capacity})", self.system);
                return Err(ParticleError::CapacityExhausted { capacity });
            }
        }

        if self.config.collect_stats {
            self.stats.misses += 1;
        }
        Ok(self.build())
    }

    /// Take storage back for reuse
    ///
    /// The particle is reset and re-issued under a new generation, so old
    /// handles to it stop resolving. Storage from another system's allocator
    /// is dropped.
    pub fn release(&mut self, mut particle: Box<Particle>) {
        let slot = particle.id().slot();
        let owned = particle.system() == self.system
            && (slot as usize) < self.generations.len();
        if !owned {
            warn!(
                "dropping particle {} released to the allocator of {}",
                particle.id(),
                self.system
            );
            return;
        }

        let generation = &mut self.generations[slot as usize];
        *generation = generation.wrapping_add(1);
        particle.recycle(ParticleId::new(slot, *generation));
        trace!("slot {slot} returned to the free list");

        self.free.push_back(particle);
        if self.config.collect_stats {
            self.stats.returns += 1;
        }
    }

    fn build(&mut self) -> Box<Particle> {
        let slot = self.generations.len() as u32;
        self.generations.push(0);
        Box::new(Particle::new(ParticleId::new(slot, 0), self.system))
    }

    /// Storage waiting on the free list
    pub fn free_count(&self) -> usize {
        self.free.len()
    }

    /// Storage slots built so far
    pub fn slot_count(&self) -> usize {
        self.generations.len()
    }

    /// Storage currently handed out
    pub fn in_use(&self) -> usize {
        self.generations.len() - self.free.len()
    }

    pub fn statistics(&self) -> &AllocatorStatistics {
        &self.stats
    }

    pub fn config(&self) -> &AllocatorConfig {
        &self.config
    }

    /// System that owns every particle built here
    pub fn system(&self) -> SystemId {
        self.system
    }
}
