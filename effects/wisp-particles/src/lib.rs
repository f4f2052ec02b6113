//! Pooled particle lifecycle and per-frame update engine
//!
//! This crate advances thousands of short-lived visual particles (rain, fog
//! wisps, hit effects) once per frame without allocating in steady state.
//! Effect logic lives outside the crate behind two capability traits:
//!
//! - [`Emitter`]: spawns particles, moves them, decides whether each one
//!   survives a tick, and draws them.
//! - [`RenderPool`]: a renderer-side grouping a particle can join for batching.
//!
//! # Architecture
//!
//! - [`Particle`]: plain state plus non-owning emitter/pool/system handles
//! - [`ParticleAllocator`]: free-list recycling of boxed particle storage
//! - [`ParticleSystem`]: owns the allocator, the active set, emitters and
//!   pools, and runs the two-phase frame update
//! - [`filter`]: the fork-join stable filter behind the particle pass
//!
//! # Usage
//!
//! ```rust,no_run
//! use wisp_particles::{Emitter, Particle, ParticleSystem, SpawnContext, SystemConfig};
//!
//! struct Drizzle;
//!
//! impl Emitter for Drizzle {
//!     fn update_emitter(&mut self, ctx: &mut SpawnContext<'_>, _delta_ms: i32) {
//!         if let Ok(mut drop) = ctx.spawn() {
//!             drop.set_location(0.0, 50.0, 0.0);
//!             drop.set_speed(0.0, -0.2, 0.0);
//!             drop.set_size(1.0);
//!             drop.set_lifetime(2_000);
//!             let _ = ctx.activate(drop);
//!         }
//!     }
//!
//!     fn update_particle(&self, particle: &mut Particle, delta_ms: i32) -> bool {
//!         let p = particle.position() + particle.velocity() * delta_ms as f32;
//!         particle.set_location(p.x, p.y, p.z);
//!         particle.reduce_lifetime(delta_ms);
//!         particle.lifetime() > 0
//!     }
//!
//!     fn render(&mut self, _particle: &Particle) {}
//!
//!     fn particle_died(&mut self) {}
//! }
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let mut system = ParticleSystem::new(SystemConfig::default())?;
//! system.add_emitter(Box::new(Drizzle));
//!
//! // Host game loop
//! for _ in 0..60 {
//!     let stats = system.update(16);
//!     system.render();
//!     log::debug!("{} particles alive", stats.survived);
//! }
//! # Ok(())
//! # }
//! ```

pub mod allocator;
pub mod config;
pub mod emitter;
pub mod error;
pub mod filter;
pub mod handle;
pub mod particle;
pub mod pool;
pub mod system;

// Re-export common types
pub use allocator::{AllocatorConfig, AllocatorStatistics, ParticleAllocator};
pub use config::SystemConfig;
pub use emitter::{Emitter, EmitterTable, SpawnContext};
pub use error::{ParticleError, Result};
pub use filter::{DEFAULT_PARALLEL_THRESHOLD, FilterMode, FilterOutcome};
pub use handle::{EmitterId, ParticleId, PoolId, SystemId};
pub use particle::Particle;
pub use pool::{PoolTable, RenderPool};
pub use system::{FrameStats, ParticleSystem};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
