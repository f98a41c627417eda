//! End-to-end frame behaviour through the public `Ecs` API.

use flock_core::ecs::{ComponentMask, Ecs, Entity, SystemDescriptor};
use flock_core::EcsConfig;
use parking_lot::Mutex;
use std::collections::BTreeSet;
use std::sync::Arc;

fn parallel_config() -> EcsConfig {
    EcsConfig {
        min_chunk_len: 4,
        worker_threads: Some(4),
        ..EcsConfig::default()
    }
}

/// Record the entities a system was handed, once per invocation.
fn recorder() -> (Arc<Mutex<Vec<Vec<Entity>>>>, impl Fn(&[Entity]) + Send + Sync + Clone) {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    (seen, move |entities: &[Entity]| sink.lock().push(entities.to_vec()))
}

fn flatten(calls: &[Vec<Entity>]) -> BTreeSet<u64> {
    calls.iter().flatten().map(|e| e.id()).collect()
}

#[test]
fn query_kinds_select_expected_entities() {
    let mut ecs = Ecs::init(EcsConfig::default()).unwrap();
    let a = ecs.register_component_type(4).unwrap();
    let b = ecs.register_component_type(4).unwrap();

    let only_a = ecs.create_entity(a);
    let only_b = ecs.create_entity(b);
    let both = ecs.create_entity(a | b);
    let _bare = ecs.create_entity(ComponentMask::NONE);

    let (all_seen, all_rec) = recorder();
    let (any_seen, any_rec) = recorder();
    let (none_seen, none_rec) = recorder();
    ecs.enable_system(SystemDescriptor::new("all").all(a | b), move |ctx| all_rec(ctx.entities()))
        .unwrap();
    ecs.enable_system(SystemDescriptor::new("any").any(a | b), move |ctx| any_rec(ctx.entities()))
        .unwrap();
    ecs.enable_system(SystemDescriptor::new("none"), move |ctx| none_rec(ctx.entities()))
        .unwrap();

    ecs.run_systems(0.016);

    assert_eq!(flatten(&all_seen.lock()), BTreeSet::from([both.id()]));
    assert_eq!(
        flatten(&any_seen.lock()),
        BTreeSet::from([only_a.id(), only_b.id(), both.id()])
    );
    // a NONE system runs once with no entities
    assert_eq!(*none_seen.lock(), vec![Vec::<Entity>::new()]);
}

#[test]
fn systems_without_matches_are_not_invoked() {
    let mut ecs = Ecs::init(EcsConfig::default()).unwrap();
    let a = ecs.register_component_type(4).unwrap();
    let (seen, rec) = recorder();
    ecs.enable_system(SystemDescriptor::new("idle").all(a), move |ctx| rec(ctx.entities()))
        .unwrap();
    ecs.run_systems(0.016);
    assert!(seen.lock().is_empty());
}

#[test]
fn parallel_chunks_partition_the_match_set() {
    let mut ecs = Ecs::init(parallel_config()).unwrap();
    let pos = ecs.register_component_type(8).unwrap();
    let expected: BTreeSet<u64> = (0..103).map(|_| ecs.create_entity(pos).id()).collect();

    let (serial_seen, serial_rec) = recorder();
    let (parallel_seen, parallel_rec) = recorder();
    ecs.enable_system(SystemDescriptor::new("serial").all(pos), move |ctx| {
        serial_rec(ctx.entities())
    })
    .unwrap();
    ecs.enable_system(
        SystemDescriptor::new("parallel").all(pos).max_threads(8).order(1),
        move |ctx| {
            assert_eq!(ctx.chunk_count(), 8);
            assert!(ctx.world_mut().is_none());
            parallel_rec(ctx.entities())
        },
    )
    .unwrap();

    ecs.run_systems(0.016);

    let serial = serial_seen.lock();
    let parallel = parallel_seen.lock();
    assert_eq!(serial.len(), 1);
    assert_eq!(parallel.len(), 8);

    let total: usize = parallel.iter().map(Vec::len).sum();
    assert_eq!(total, expected.len());
    assert_eq!(flatten(&parallel), expected);
    assert_eq!(flatten(&serial), expected);
}

#[test]
fn chunk_writes_are_visible_to_the_next_system() {
    let mut ecs = Ecs::init(parallel_config()).unwrap();
    let value = ecs.register_component_type(8).unwrap();
    let entities: Vec<Entity> = (0..64).map(|_| ecs.create_entity(value)).collect();

    ecs.enable_system(
        SystemDescriptor::new("write").all(value).max_threads(4).order(10),
        move |ctx| {
            for &e in ctx.entities() {
                ctx.write(e, value, e.id());
            }
        },
    )
    .unwrap();

    let mismatches = Arc::new(Mutex::new(0usize));
    let sink = Arc::clone(&mismatches);
    ecs.enable_system(SystemDescriptor::new("check").all(value).order(20), move |ctx| {
        for &e in ctx.entities() {
            if ctx.read::<u64>(e, value) != Some(e.id()) {
                *sink.lock() += 1;
            }
        }
    })
    .unwrap();

    ecs.run_systems(0.016);
    assert_eq!(*mismatches.lock(), 0);
    for e in entities {
        assert_eq!(ecs.read::<u64>(e, value), Some(e.id()));
    }
}

#[test]
fn deferred_tasks_run_after_the_frame_in_fifo_order() {
    let mut ecs = Ecs::init(EcsConfig::default()).unwrap();
    let log = Arc::new(Mutex::new(Vec::new()));

    let first = Arc::clone(&log);
    ecs.enable_system(SystemDescriptor::new("a").order(1), move |ctx| {
        first.lock().push("system a");
        let log = Arc::clone(&first);
        ctx.defer(move |_| log.lock().push("task a"));
    })
    .unwrap();
    let second = Arc::clone(&log);
    ecs.enable_system(SystemDescriptor::new("b").order(2), move |ctx| {
        second.lock().push("system b");
        let log = Arc::clone(&second);
        ctx.defer(move |_| log.lock().push("task b"));
    })
    .unwrap();

    ecs.run_systems(0.016);
    assert_eq!(*log.lock(), vec!["system a", "system b", "task a", "task b"]);
    assert!(ecs.tasks().is_empty());
}

#[test]
fn destroyed_entities_read_as_sentinels() {
    let mut ecs = Ecs::init(EcsConfig::default()).unwrap();
    let a = ecs.register_component_type(8).unwrap();
    let e = ecs.create_entity(a);
    ecs.write(e, a, 99u64);

    ecs.enable_system(SystemDescriptor::new("reaper").all(a), |ctx| {
        for &e in ctx.entities() {
            ctx.defer(move |world| {
                world.destroy_entity(e);
            });
        }
    })
    .unwrap();
    ecs.run_systems(0.016);

    assert_eq!(ecs.component_mask(e), ComponentMask::NONE);
    assert!(ecs.component_ptr(e, a).is_none());
    assert_eq!(ecs.read::<u64>(e, a), None);
    assert!(!ecs.destroy_entity(e));
    assert!(!ecs.attach_components(e, a));

    // the slot is reused under a new id
    let reused = ecs.create_entity(a);
    assert_ne!(reused, e);
    assert_eq!(ecs.read::<u64>(reused, a), Some(0));
}

#[test]
fn execution_order_is_ascending() {
    let mut ecs = Ecs::init(EcsConfig::default()).unwrap();
    let log = Arc::new(Mutex::new(Vec::new()));
    for order in [420, 100, -100, 300] {
        let log = Arc::clone(&log);
        ecs.enable_system(
            SystemDescriptor::new(format!("order {order}")).order(order),
            move |_| log.lock().push(order),
        )
        .unwrap();
    }
    ecs.run_systems(0.016);
    ecs.run_systems(0.016);
    assert_eq!(*log.lock(), vec![-100, 100, 300, 420, -100, 100, 300, 420]);
}

#[test]
fn inline_structural_changes_reach_later_systems() {
    let mut ecs = Ecs::init(EcsConfig::default()).unwrap();
    let a = ecs.register_component_type(4).unwrap();

    ecs.enable_system(SystemDescriptor::new("spawn").order(1), move |ctx| {
        let world = ctx.world_mut().expect("inline dispatch");
        world.create_entity(a);
    })
    .unwrap();
    let (seen, rec) = recorder();
    ecs.enable_system(SystemDescriptor::new("observe").all(a).order(2), move |ctx| {
        rec(ctx.entities())
    })
    .unwrap();

    ecs.run_systems(0.016);
    ecs.run_systems(0.016);
    let seen = seen.lock();
    assert_eq!(seen.len(), 2);
    assert_eq!(seen[0].len(), 1);
    assert_eq!(seen[1].len(), 2);
}

#[test]
fn disabling_mid_session_stops_dispatch() {
    let mut ecs = Ecs::init(EcsConfig::default()).unwrap();
    let calls = Arc::new(Mutex::new(0));
    let sink = Arc::clone(&calls);
    ecs.enable_system(SystemDescriptor::new("tick"), move |_| *sink.lock() += 1)
        .unwrap();

    ecs.run_systems(0.016);
    assert!(ecs.disable_system_by_name("tick"));
    ecs.run_systems(0.016);
    assert_eq!(*calls.lock(), 1);
    assert_eq!(ecs.system_count(), 0);
}

#[test]
fn primary_pointer_tracks_lowest_queried_component() {
    let mut ecs = Ecs::init(EcsConfig::default()).unwrap();
    let low = ecs.register_component_type(8).unwrap();
    let high = ecs.register_component_type(8).unwrap();
    let e = ecs.create_entity(low | high);
    ecs.write(e, low, 7u64);

    let seen = Arc::new(Mutex::new(None));
    let sink = Arc::clone(&seen);
    ecs.enable_system(SystemDescriptor::new("peek").all(low | high), move |ctx| {
        let ptr = ctx.primary_ptrs()[0].expect("entity has the component");
        // SAFETY: inline dispatch, nothing else touches the store
        let value = unsafe { ptr.cast::<u64>().read() };
        *sink.lock() = Some(value);
    })
    .unwrap();

    ecs.run_systems(0.016);
    assert_eq!(*seen.lock(), Some(7));
}

#[test]
fn parallel_chunks_can_defer_structural_work() {
    let mut ecs = Ecs::init(parallel_config()).unwrap();
    let doomed = ecs.register_component_type(8).unwrap();
    let spawned = ecs.register_component_type(8).unwrap();
    for _ in 0..40 {
        ecs.create_entity(doomed);
    }

    let chunks_seen = Arc::new(Mutex::new(0usize));
    let sink = Arc::clone(&chunks_seen);
    ecs.enable_system(
        SystemDescriptor::new("reap").all(doomed).max_threads(4),
        move |ctx| {
            assert_eq!(ctx.chunk_count(), 4);
            *sink.lock() += 1;
            for &e in ctx.entities() {
                ctx.defer(move |world| {
                    world.destroy_entity(e);
                    world.create_entity(spawned);
                });
            }
        },
    )
    .unwrap();

    ecs.run_systems_only(0.016);
    assert_eq!(*chunks_seen.lock(), 4);
    assert_eq!(ecs.tasks().len(), 40);
    assert_eq!(ecs.world().entity_count(), 40);

    assert_eq!(ecs.run_tasks(), 40);
    assert!(ecs.tasks().is_empty());
    let masks: Vec<ComponentMask> = ecs.world().iter().map(|(_, mask)| mask).collect();
    assert_eq!(masks.len(), 40);
    assert!(masks.iter().all(|&mask| mask == spawned));

    // the next full frame finds nothing to reap and leaves no work behind
    ecs.run_systems(0.016);
    assert_eq!(*chunks_seen.lock(), 4);
    assert!(ecs.tasks().is_empty());
}

#[test]
fn deferred_work_from_chunks_runs_within_the_same_frame() {
    let mut ecs = Ecs::init(parallel_config()).unwrap();
    let a = ecs.register_component_type(8).unwrap();
    for _ in 0..32 {
        ecs.create_entity(a);
    }

    let ran = Arc::new(Mutex::new(0usize));
    let sink = Arc::clone(&ran);
    ecs.enable_system(SystemDescriptor::new("count").all(a).max_threads(4), move |ctx| {
        let ran = Arc::clone(&sink);
        let n = ctx.len();
        ctx.defer(move |_| *ran.lock() += n);
    })
    .unwrap();

    ecs.run_systems(0.016);
    assert_eq!(*ran.lock(), 32);
    assert!(ecs.tasks().is_empty());
}
