//! Frame-loop simulation driven by a demo drift emitter

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use clap::Args;
use log::{debug, info};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use wisp_particles::{
    AllocatorConfig, Emitter, FilterMode, Particle, ParticleError, ParticleId, ParticleSystem,
    PoolId, RenderPool, SpawnContext, SystemConfig,
};

use crate::utils::{create_progress_bar, format_duration, format_percentage};

#[derive(Args, Debug, Clone)]
pub struct SimulateArgs {
    /// Number of frames to run
    #[arg(short, long, default_value_t = 600)]
    pub frames: u64,

    /// Frame delta in milliseconds
    #[arg(short, long, default_value_t = 16, value_parser = clap::value_parser!(i32).range(1..))]
    pub delta: i32,

    /// Particles spawned per frame
    #[arg(short, long, default_value_t = 40)]
    pub spawn_rate: usize,

    /// Lifetime of each spawned particle in milliseconds
    #[arg(short, long, default_value_t = 1_000, value_parser = clap::value_parser!(i32).range(1..))]
    pub lifetime: i32,

    /// Filter the active set on the calling thread only
    #[arg(long)]
    pub sequential: bool,

    /// Active-set size at which the particle pass starts forking
    #[arg(short, long, default_value_t = wisp_particles::DEFAULT_PARALLEL_THRESHOLD)]
    pub threshold: usize,

    /// Worker threads for a dedicated pool (0 = shared global pool)
    #[arg(long, default_value_t = 0)]
    pub threads: usize,

    /// Upper bound on particle storage
    #[arg(short, long)]
    pub max_particles: Option<usize>,

    /// Storage built before the first frame
    #[arg(long, default_value_t = 0)]
    pub prewarm: usize,

    /// Render pools to spread particles over (round robin)
    #[arg(long, default_value_t = 0)]
    pub pools: usize,

    /// Skip the render pass after each frame
    #[arg(long)]
    pub no_render: bool,

    /// Seed for spawn jitter
    #[arg(long, default_value_t = 0x5EED)]
    pub seed: u64,
}

impl SimulateArgs {
    fn system_config(&self) -> SystemConfig {
        let mut allocator = AllocatorConfig::default().with_initial_capacity(self.prewarm);
        if let Some(max) = self.max_particles {
            allocator = allocator.with_max_particles(max);
        }

        let mode = if self.sequential {
            FilterMode::Sequential
        } else {
            FilterMode::Parallel
        };

        SystemConfig::default()
            .with_filter_mode(mode)
            .with_parallel_threshold(self.threshold)
            .with_worker_threads(self.threads)
            .with_allocator(allocator)
    }
}

/// Counters shared between the drift emitter and the command
#[derive(Debug, Default)]
struct DriftCounters {
    spawned: AtomicUsize,
    rejected: AtomicUsize,
    died: AtomicUsize,
    drawn: AtomicUsize,
}

/// Spawns a fan of particles that rise, drift sideways and expire by lifetime
struct Drift {
    spawn_rate: usize,
    lifetime: i32,
    pools: Vec<PoolId>,
    sequence: usize,
    rng: StdRng,
    counters: Arc<DriftCounters>,
}

impl Drift {
    fn spawn_one(&mut self, ctx: &mut SpawnContext<'_>) -> Result<(), ParticleError> {
        let mut particle = ctx.spawn()?;
        let lane = (self.sequence % 16) as f32 - 7.5;
        let jitter: f32 = self.rng.random_range(-0.5..0.5);
        particle.set_location(lane + jitter, 0.0, 0.0);
        particle.set_speed(lane * 0.000_5, self.rng.random_range(0.005..0.015), 0.0);
        particle.set_size(self.rng.random_range(0.25..1.0));
        particle.set_lifetime(self.lifetime);

        if !self.pools.is_empty() {
            let pool = self.pools[self.sequence % self.pools.len()];
            if let Err(e) = ctx.insert_into_pool(&mut particle, pool) {
                ctx.discard(particle);
                return Err(e);
            }
        }

        ctx.activate(particle)?;
        self.sequence += 1;
        Ok(())
    }
}

impl Emitter for Drift {
    fn update_emitter(&mut self, ctx: &mut SpawnContext<'_>, _delta_ms: i32) {
        for attempt in 0..self.spawn_rate {
            match self.spawn_one(ctx) {
                Ok(()) => {
                    self.counters.spawned.fetch_add(1, Ordering::Relaxed);
                }
                Err(ParticleError::CapacityExhausted { .. }) => {
                    // Nothing frees up until the particle pass runs
                    let remaining = self.spawn_rate - attempt;
                    self.counters.rejected.fetch_add(remaining, Ordering::Relaxed);
                    return;
                }
                Err(e) => {
                    debug!("{}: spawn failed: {e}", ctx.emitter_id());
                    self.counters.rejected.fetch_add(1, Ordering::Relaxed);
                }
            }
        }
    }

    fn update_particle(&self, particle: &mut Particle, delta_ms: i32) -> bool {
        let p = particle.position() + particle.velocity() * delta_ms as f32;
        particle.set_location(p.x, p.y, p.z);
        particle.reduce_lifetime(delta_ms);
        particle.lifetime() > 0
    }

    fn render(&mut self, _particle: &Particle) {
        self.counters.drawn.fetch_add(1, Ordering::Relaxed);
    }

    fn particle_died(&mut self) {
        self.counters.died.fetch_add(1, Ordering::Relaxed);
    }
}

/// Tracks how many particles are currently members
///
/// `peak` is shared between pools and records the largest single pool.
#[derive(Debug, Default)]
struct CountingPool {
    members: usize,
    peak: Arc<AtomicUsize>,
}

impl RenderPool for CountingPool {
    fn add_particle_to_pool(&mut self, _particle: ParticleId) {
        self.members += 1;
        self.peak.fetch_max(self.members, Ordering::Relaxed);
    }

    fn remove_particle_from_pool(&mut self, _particle: ParticleId) {
        self.members = self.members.saturating_sub(1);
    }

    fn clear_pool(&mut self) {
        self.members = 0;
    }
}

/// Results of one simulation run
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SimulationSummary {
    pub frames: u64,
    pub spawned: usize,
    pub rejected: usize,
    pub died: usize,
    pub recycled: usize,
    pub drawn: usize,
    pub peak_active: usize,
    pub final_active: usize,
    pub forked_frames: u64,
    pub slots: usize,
    pub hit_rate: f64,
    pub peak_pool_members: usize,
    pub elapsed: Duration,
}

/// Drive a fresh system for `args.frames` frames
pub fn run(args: &SimulateArgs, show_progress: bool) -> Result<SimulationSummary> {
    let mut system =
        ParticleSystem::new(args.system_config()).context("Failed to create particle system")?;

    let pool_peak = Arc::new(AtomicUsize::new(0));
    let pools: Vec<PoolId> = (0..args.pools)
        .map(|_| {
            system.add_pool(Box::new(CountingPool {
                members: 0,
                peak: pool_peak.clone(),
            }))
        })
        .collect();

    let counters = Arc::new(DriftCounters::default());
    let emitter = system.add_emitter(Box::new(Drift {
        spawn_rate: args.spawn_rate,
        lifetime: args.lifetime,
        pools,
        sequence: 0,
        rng: StdRng::seed_from_u64(args.seed),
        counters: counters.clone(),
    }));
    info!(
        "simulating {} frames of {} ms on {} ({emitter})",
        args.frames,
        args.delta,
        system.id()
    );

    let pb = create_progress_bar(args.frames, "Simulating", !show_progress);
    let mut summary = SimulationSummary::default();
    let start = Instant::now();

    for _ in 0..args.frames {
        let stats = system.update(args.delta);
        if !args.no_render {
            system.render();
        }

        summary.frames = stats.frame;
        summary.recycled += stats.recycled;
        summary.peak_active = summary.peak_active.max(stats.survived);
        if stats.forked {
            summary.forked_frames += 1;
        }
        pb.inc(1);
    }

    summary.elapsed = start.elapsed();
    pb.finish_and_clear();

    summary.spawned = counters.spawned.load(Ordering::Relaxed);
    summary.rejected = counters.rejected.load(Ordering::Relaxed);
    summary.died = counters.died.load(Ordering::Relaxed);
    summary.drawn = counters.drawn.load(Ordering::Relaxed);
    summary.final_active = system.active_count();
    summary.slots = system.allocator().slot_count();
    summary.hit_rate = system.allocator().statistics().hit_rate();
    summary.peak_pool_members = pool_peak.load(Ordering::Relaxed);
    Ok(summary)
}

pub fn execute(args: &SimulateArgs, quiet: bool) -> Result<()> {
    let summary = run(args, !quiet)?;
    if quiet {
        return Ok(());
    }

    println!("Simulation Summary");
    println!("==================");
    println!("Frames: {}", summary.frames);
    println!(
        "Mode: {}",
        if args.sequential {
            "sequential".to_string()
        } else {
            format!("parallel (threshold {})", args.threshold)
        }
    );
    println!("Spawned: {}", summary.spawned);
    if summary.rejected > 0 {
        println!("Rejected spawns: {}", summary.rejected);
    }
    println!("Recycled: {}", summary.recycled);
    println!("Peak active: {}", summary.peak_active);
    println!("Final active: {}", summary.final_active);
    println!("Forked frames: {}", summary.forked_frames);
    println!("Storage slots: {}", summary.slots);
    println!("Allocator hit rate: {}", format_percentage(summary.hit_rate));
    if args.pools > 0 {
        println!("Peak pool members: {}", summary.peak_pool_members);
    }
    if !args.no_render {
        println!("Draw calls: {}", summary.drawn);
    }
    println!("Elapsed: {}", format_duration(summary.elapsed));
    Ok(())
}
