//! Particle lifecycle across the public system API

mod common;

use std::sync::{Arc, Mutex};

use common::{OrderProbe, PoolEvent, RecordingPool, Scripted, init_logging, populate, tags};
use pretty_assertions::assert_eq;
use wisp_particles::{AllocatorConfig, Particle, ParticleError, ParticleSystem, SystemConfig};

#[test]
fn test_request_bind_activate_kill() {
    init_logging();
    let mut system = ParticleSystem::default();
    let (emitter, counters) = Scripted::immortal();
    let emitter = system.add_emitter(Box::new(emitter));
    let (pool, events) = RecordingPool::new();
    let pool = system.add_pool(Box::new(pool));

    let mut particle = system.request_particle().unwrap();
    particle.bind(emitter);
    particle.set_location(1.0, 2.0, 3.0);
    particle.set_size(4.0);
    system.join_pool(&mut particle, pool).unwrap();
    let id = system.activate(particle).unwrap();

    assert_eq!(system.active_count(), 1);
    assert_eq!(system.particle(id).and_then(Particle::pool), Some(pool));

    system.kill(id).unwrap();
    assert_eq!(system.active_count(), 0);
    assert_eq!(counters.died(), 1);
    assert_eq!(
        *events.lock().unwrap(),
        vec![PoolEvent::Added(id), PoolEvent::Removed(id)]
    );
}

#[test]
fn test_clean_zeroes_and_notifies_once() {
    let mut system = ParticleSystem::default();
    let (emitter, counters) = Scripted::immortal();
    let emitter = system.add_emitter(Box::new(emitter));
    let (pool, events) = RecordingPool::new();
    let pool = system.add_pool(Box::new(pool));

    let mut particle = system.request_particle().unwrap();
    particle.bind(emitter);
    particle.set_location(5.0, 6.0, 7.0);
    particle.set_speed(1.0, 1.0, 1.0);
    particle.set_size(2.5);
    particle.set_lifetime(900);
    let id = system.activate(particle).unwrap();
    system.insert_into_pool(id, pool).unwrap();

    system.clean(id).unwrap();

    let particle = system.particle(id).unwrap();
    assert_eq!(particle.position(), glam::Vec3::ZERO);
    assert_eq!(particle.velocity(), glam::Vec3::ZERO);
    assert_eq!(particle.size(), 0.0);
    assert_eq!(particle.lifetime(), 0);
    assert_eq!(particle.emitter(), None);
    assert_eq!(particle.pool(), None);

    assert_eq!(counters.died(), 1);
    assert_eq!(
        *events.lock().unwrap(),
        vec![PoolEvent::Added(id), PoolEvent::Removed(id)]
    );

    // Already unbound: recycling must not notify again
    system.recycle(id).unwrap();
    assert_eq!(counters.died(), 1);
    assert_eq!(events.lock().unwrap().len(), 2);
}

#[test]
fn test_pool_transitions() {
    let mut system = ParticleSystem::default();
    let (emitter, _) = Scripted::immortal();
    let emitter = system.add_emitter(Box::new(emitter));
    let (a, a_events) = RecordingPool::new();
    let (b, b_events) = RecordingPool::new();
    let a = system.add_pool(Box::new(a));
    let b = system.add_pool(Box::new(b));

    let id = populate(&mut system, emitter, 1)[0];

    system.insert_into_pool(id, a).unwrap();
    // Same pool again is a no-op
    system.insert_into_pool(id, a).unwrap();
    system.insert_into_pool(id, b).unwrap();

    assert_eq!(
        *a_events.lock().unwrap(),
        vec![PoolEvent::Added(id), PoolEvent::Removed(id)]
    );
    assert_eq!(*b_events.lock().unwrap(), vec![PoolEvent::Added(id)]);
    assert_eq!(system.particle(id).and_then(Particle::pool), Some(b));
}

#[test]
fn test_unknown_pool_leaves_membership() {
    let mut system = ParticleSystem::default();
    let (emitter, _) = Scripted::immortal();
    let emitter = system.add_emitter(Box::new(emitter));
    let (pool, events) = RecordingPool::new();
    let pool = system.add_pool(Box::new(pool));
    let id = populate(&mut system, emitter, 1)[0];
    system.insert_into_pool(id, pool).unwrap();

    let gone = system.add_pool(Box::new(RecordingPool::default()));
    system.remove_pool(gone).unwrap();

    assert_eq!(
        system.insert_into_pool(id, gone),
        Err(ParticleError::UnknownPool(gone))
    );
    assert_eq!(system.particle(id).and_then(Particle::pool), Some(pool));
    assert_eq!(events.lock().unwrap().len(), 1);
}

#[test]
fn test_failed_activation_returns_storage() {
    let mut system = ParticleSystem::default();
    let (pool, events) = RecordingPool::new();
    let pool = system.add_pool(Box::new(pool));

    let mut particle = system.request_particle().unwrap();
    let id = particle.id();
    system.join_pool(&mut particle, pool).unwrap();

    assert_eq!(
        system.activate(particle),
        Err(ParticleError::NoEmitterBound(id))
    );
    assert_eq!(system.active_count(), 0);
    assert_eq!(system.allocator().free_count(), 1);
    // Pool membership is undone before the storage is recycled
    assert_eq!(
        *events.lock().unwrap(),
        vec![PoolEvent::Added(id), PoolEvent::Removed(id)]
    );
}

#[test]
fn test_discard_skips_death_notification() {
    let mut system = ParticleSystem::default();
    let (emitter, counters) = Scripted::immortal();
    let emitter = system.add_emitter(Box::new(emitter));

    let mut particle = system.request_particle().unwrap();
    particle.bind(emitter);
    system.discard(particle);

    assert_eq!(counters.died(), 0);
    assert_eq!(system.allocator().free_count(), 1);
}

#[test]
fn test_storage_is_reused_without_growth() {
    let mut system = ParticleSystem::default();
    let (emitter, _) = Scripted::immortal();
    let emitter = system.add_emitter(Box::new(emitter));

    let first = populate(&mut system, emitter, 8);
    for id in &first {
        system.kill(*id).unwrap();
    }
    assert_eq!(system.allocator().slot_count(), 8);

    let second = populate(&mut system, emitter, 8);
    assert_eq!(system.allocator().slot_count(), 8);
    assert_eq!(system.allocator().statistics().hits, 8);

    // Same storage, fresh handles
    for (old, new) in first.iter().zip(&second) {
        assert_ne!(old, new);
        assert!(system.particle(*old).is_none());
    }
}

#[test]
fn test_capacity_limit_rejects_requests() {
    let config =
        SystemConfig::default().with_allocator(AllocatorConfig::default().with_max_particles(3));
    let mut system = ParticleSystem::new(config).unwrap();
    let (emitter, _) = Scripted::immortal();
    let emitter = system.add_emitter(Box::new(emitter));

    let ids = populate(&mut system, emitter, 3);
    assert!(matches!(
        system.request_particle(),
        Err(ParticleError::CapacityExhausted { capacity: 3 })
    ));
    assert_eq!(system.allocator().statistics().rejections, 1);

    system.kill(ids[0]).unwrap();
    assert!(system.request_particle().is_ok());
}

#[test]
fn test_remove_emitter_leaves_inert_particles() {
    init_logging();
    let mut system = ParticleSystem::default();
    let (emitter, counters) = Scripted::new(0..4);
    let emitter = system.add_emitter(Box::new(emitter));
    populate(&mut system, emitter, 4);

    assert!(system.remove_emitter(emitter).is_some());
    assert!(system.remove_emitter(emitter).is_none());

    let stats = system.update(16);
    assert_eq!(stats.processed, 4);
    assert_eq!(stats.survived, 4);
    assert_eq!(stats.inert, 4);
    assert_eq!(stats.recycled, 0);
    assert_eq!(counters.updated(), 0);
    assert_eq!(counters.died(), 0);
}

#[test]
fn test_remove_pool_clears_members() {
    let mut system = ParticleSystem::default();
    let (emitter, _) = Scripted::immortal();
    let emitter = system.add_emitter(Box::new(emitter));
    let (pool, events) = RecordingPool::new();
    let pool = system.add_pool(Box::new(pool));

    let ids = populate(&mut system, emitter, 3);
    for id in &ids {
        system.insert_into_pool(*id, pool).unwrap();
    }

    assert!(system.remove_pool(pool).is_some());
    assert_eq!(system.pool_count(), 0);
    assert!(
        system
            .active_particles()
            .all(|particle| particle.pool().is_none())
    );

    // Killing afterwards must not reach the removed pool
    system.kill(ids[1]).unwrap();
    let events = events.lock().unwrap();
    assert_eq!(events.len(), 4);
    assert_eq!(events.last(), Some(&PoolEvent::Cleared));
}

#[test]
fn test_emitters_update_in_registration_order() {
    let log = Arc::new(Mutex::new(Vec::new()));
    let mut system = ParticleSystem::default();
    let ids: Vec<_> = (0..4)
        .map(|tag| {
            system.add_emitter(Box::new(OrderProbe {
                tag,
                log: log.clone(),
            }))
        })
        .collect();

    system.update(16);
    system.remove_emitter(ids[1]).unwrap();
    system.update(16);

    assert_eq!(*log.lock().unwrap(), vec![0, 1, 2, 3, 0, 2, 3]);
    assert_eq!(system.emitter_count(), 3);
}

#[test]
fn test_render_visits_active_particles() {
    let mut system = ParticleSystem::default();
    let (emitter, counters) = Scripted::new([1, 3]);
    let emitter = system.add_emitter(Box::new(emitter));
    populate(&mut system, emitter, 5);

    system.update(16);
    system.render();
    assert_eq!(counters.rendered(), 3);
    assert_eq!(tags(&system), vec![0, 2, 4]);
}

#[test]
fn test_stale_handles_are_rejected() {
    let mut system = ParticleSystem::default();
    let (emitter, _) = Scripted::new([0]);
    let emitter = system.add_emitter(Box::new(emitter));
    let pool = system.add_pool(Box::new(RecordingPool::default()));
    let id = populate(&mut system, emitter, 1)[0];

    system.update(16);
    assert_eq!(system.active_count(), 0);
    assert_eq!(system.kill(id), Err(ParticleError::NotActive(id)));
    assert_eq!(system.clean(id), Err(ParticleError::NotActive(id)));
    assert_eq!(
        system.insert_into_pool(id, pool),
        Err(ParticleError::NotActive(id))
    );
}

#[test]
fn test_activation_rejects_removed_emitter() {
    let mut system = ParticleSystem::default();
    let (emitter, counters) = Scripted::immortal();
    let gone = system.add_emitter(Box::new(emitter));
    system.remove_emitter(gone).unwrap();
    let (pool, events) = RecordingPool::new();
    let pool = system.add_pool(Box::new(pool));

    let mut particle = system.request_particle().unwrap();
    let id = particle.id();
    particle.bind(gone);
    system.join_pool(&mut particle, pool).unwrap();

    assert_eq!(
        system.activate(particle),
        Err(ParticleError::UnknownEmitter(gone))
    );
    assert_eq!(system.active_count(), 0);
    assert_eq!(system.allocator().free_count(), 1);
    assert_eq!(
        *events.lock().unwrap(),
        vec![PoolEvent::Added(id), PoolEvent::Removed(id)]
    );

    let stats = system.update(16);
    assert_eq!(stats.processed, 0);
    assert_eq!(counters.died(), 0);
}

#[test]
fn test_emitter_keys_do_not_cross_systems() {
    let mut first = ParticleSystem::default();
    let mut second = ParticleSystem::default();
    let (a, _) = Scripted::immortal();
    let (b, b_counters) = Scripted::immortal();
    let a = first.add_emitter(Box::new(a));
    let b = second.add_emitter(Box::new(b));
    assert_ne!(a, b);

    let mut particle = second.request_particle().unwrap();
    particle.bind(a);
    assert_eq!(
        second.activate(particle),
        Err(ParticleError::UnknownEmitter(a))
    );

    let stats = second.update(16);
    assert_eq!(stats.processed, 0);
    assert_eq!(b_counters.updated(), 0);
    assert_eq!(second.allocator().free_count(), 1);
}

#[test]
fn test_rebinding_to_unknown_emitter_leaves_particle_inert() {
    let mut system = ParticleSystem::default();
    let (emitter, counters) = Scripted::immortal();
    let emitter = system.add_emitter(Box::new(emitter));
    let (other, _) = Scripted::immortal();
    let gone = system.add_emitter(Box::new(other));
    system.remove_emitter(gone).unwrap();

    let id = populate(&mut system, emitter, 1)[0];
    system.particle_mut(id).unwrap().bind(gone);

    let stats = system.update(16);
    assert_eq!(stats.survived, 1);
    assert_eq!(stats.inert, 1);
    assert_eq!(stats.recycled, 0);
    assert_eq!(counters.updated(), 0);
    assert_eq!(counters.died(), 0);
    assert_eq!(system.particle(id).and_then(Particle::emitter), None);
}
