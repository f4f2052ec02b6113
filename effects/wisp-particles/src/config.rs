//! Particle system configuration

#[cfg(feature = "serde-support")]
use serde::{Deserialize, Serialize};

use crate::allocator::AllocatorConfig;
use crate::filter::{DEFAULT_PARALLEL_THRESHOLD, FilterMode};

/// Configuration for a [`ParticleSystem`](crate::ParticleSystem)
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde-support", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde-support", serde(default))]
pub struct SystemConfig {
    /// Active sets shorter than this are filtered without forking
    pub parallel_threshold: usize,
    /// Fork-join or forced sequential particle pass
    pub filter_mode: FilterMode,
    /// Size of a private worker pool (0 = rayon's global pool)
    pub worker_threads: usize,
    /// Recycling allocator settings
    pub allocator: AllocatorConfig,
}

impl Default for SystemConfig {
    fn default() -> Self {
        Self {
            parallel_threshold: DEFAULT_PARALLEL_THRESHOLD,
            filter_mode: FilterMode::Parallel,
            worker_threads: 0,
            allocator: AllocatorConfig::default(),
        }
    }
}

impl SystemConfig {
    /// Default configuration with the particle pass forced onto the calling thread
    pub fn sequential() -> Self {
        Self::default().with_filter_mode(FilterMode::Sequential)
    }

    pub fn with_parallel_threshold(mut self, threshold: usize) -> Self {
        self.parallel_threshold = threshold;
        self
    }

    pub fn with_filter_mode(mut self, mode: FilterMode) -> Self {
        self.filter_mode = mode;
        self
    }

    pub fn with_worker_threads(mut self, threads: usize) -> Self {
        self.worker_threads = threads;
        self
    }

    pub fn with_allocator(mut self, allocator: AllocatorConfig) -> Self {
        self.allocator = allocator;
        self
    }
}
