//! Shared emitters and pools for integration tests

#![allow(dead_code)]

use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use wisp_particles::{
    Emitter, EmitterId, Particle, ParticleId, ParticleSystem, RenderPool, SpawnContext,
};

pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Callback counters shared between a test and its emitter
#[derive(Debug, Default)]
pub struct Counters {
    pub updated: AtomicUsize,
    pub died: AtomicUsize,
    pub rendered: AtomicUsize,
    pub frames: AtomicUsize,
}

impl Counters {
    pub fn died(&self) -> usize {
        self.died.load(Ordering::SeqCst)
    }

    pub fn rendered(&self) -> usize {
        self.rendered.load(Ordering::SeqCst)
    }

    pub fn updated(&self) -> usize {
        self.updated.load(Ordering::SeqCst)
    }
}

/// Kills exactly the particles whose lifetime tag is in `doomed`
///
/// The lifetime field is used as a stable tag and is never modified, so the
/// survivor order can be read back from the active set.
pub struct Scripted {
    doomed: HashSet<i32>,
    pub counters: Arc<Counters>,
}

impl Scripted {
    pub fn new(doomed: impl IntoIterator<Item = i32>) -> (Self, Arc<Counters>) {
        let counters = Arc::new(Counters::default());
        (
            Self {
                doomed: doomed.into_iter().collect(),
                counters: counters.clone(),
            },
            counters,
        )
    }

    /// Never kills anything
    pub fn immortal() -> (Self, Arc<Counters>) {
        Self::new(std::iter::empty())
    }
}

impl Emitter for Scripted {
    fn update_emitter(&mut self, _ctx: &mut SpawnContext<'_>, _delta_ms: i32) {
        self.counters.frames.fetch_add(1, Ordering::SeqCst);
    }

    fn update_particle(&self, particle: &mut Particle, _delta_ms: i32) -> bool {
        self.counters.updated.fetch_add(1, Ordering::SeqCst);
        !self.doomed.contains(&particle.lifetime())
    }

    fn render(&mut self, _particle: &Particle) {
        self.counters.rendered.fetch_add(1, Ordering::SeqCst);
    }

    fn particle_died(&mut self) {
        self.counters.died.fetch_add(1, Ordering::SeqCst);
    }
}

/// Appends its id to a shared log on every `update_emitter`
pub struct OrderProbe {
    pub tag: u32,
    pub log: Arc<Mutex<Vec<u32>>>,
}

impl Emitter for OrderProbe {
    fn update_emitter(&mut self, _ctx: &mut SpawnContext<'_>, _delta_ms: i32) {
        self.log.lock().unwrap().push(self.tag);
    }

    fn update_particle(&self, _particle: &mut Particle, _delta_ms: i32) -> bool {
        true
    }

    fn render(&mut self, _particle: &Particle) {}

    fn particle_died(&mut self) {}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PoolEvent {
    Added(ParticleId),
    Removed(ParticleId),
    Cleared,
}

/// Render pool that records every callback
#[derive(Default)]
pub struct RecordingPool {
    pub events: Arc<Mutex<Vec<PoolEvent>>>,
}

impl RecordingPool {
    pub fn new() -> (Self, Arc<Mutex<Vec<PoolEvent>>>) {
        let pool = Self::default();
        let events = pool.events.clone();
        (pool, events)
    }
}

impl RenderPool for RecordingPool {
    fn add_particle_to_pool(&mut self, particle: ParticleId) {
        self.events.lock().unwrap().push(PoolEvent::Added(particle));
    }

    fn remove_particle_from_pool(&mut self, particle: ParticleId) {
        self.events.lock().unwrap().push(PoolEvent::Removed(particle));
    }

    fn clear_pool(&mut self) {
        self.events.lock().unwrap().push(PoolEvent::Cleared);
    }
}

/// Activate `count` particles bound to `emitter`, tagged 0..count by lifetime
pub fn populate(system: &mut ParticleSystem, emitter: EmitterId, count: usize) -> Vec<ParticleId> {
    (0..count)
        .map(|tag| {
            let mut particle = system.request_particle().unwrap();
            particle.bind(emitter);
            particle.set_size(1.0);
            particle.set_lifetime(tag as i32);
            system.activate(particle).unwrap()
        })
        .collect()
}

/// Lifetime tags of the active set, in order
pub fn tags(system: &ParticleSystem) -> Vec<i32> {
    system.active_particles().map(Particle::lifetime).collect()
}
