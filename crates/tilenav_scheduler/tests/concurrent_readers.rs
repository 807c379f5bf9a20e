//! Readers never observe a partially published navmesh.

mod common;

use std::sync::{
    Barrier,
    atomic::{AtomicBool, AtomicUsize, Ordering},
};

use common::{events, eventually, spawn_box, wait_for_update};
use glam::Vec3A;
use tilenav::NavmeshSettings;
use tilenav_scheduler::NavmeshRegistry;

#[test]
fn readers_keep_finding_paths_while_the_navmesh_is_rebuilt() {
    const READERS: usize = 4;
    let registry = NavmeshRegistry::new();
    let navmesh = spawn_box(
        &registry,
        Vec3A::new(4.0, 0.5, 4.0),
        NavmeshSettings::default(),
    );
    assert!(navmesh.request_update_blocking());

    let query = navmesh.path_query();
    let start = Vec3A::new(-3.0, 0.5, 3.0);
    let end = Vec3A::new(3.0, 0.5, -3.0);
    let started = Barrier::new(READERS + 1);
    let done = AtomicBool::new(false);
    let reads = AtomicUsize::new(0);

    std::thread::scope(|scope| {
        for _ in 0..READERS {
            scope.spawn(|| {
                started.wait();
                let mut last_generation = 0;
                while !done.load(Ordering::Acquire) {
                    assert_eq!(query.find_path(start, end).len(), 2);
                    let guard = navmesh.handle().acquire_read();
                    assert_eq!(guard.mesh().unwrap().polygon_count(), 2);
                    assert!(guard.generation() >= last_generation);
                    last_generation = guard.generation();
                    reads.fetch_add(1, Ordering::AcqRel);
                }
            });
        }
        started.wait();
        for _ in 0..20 {
            // every publish happens while readers are busy
            let before = reads.load(Ordering::Acquire);
            assert!(eventually(|| reads.load(Ordering::Acquire) > before));
            assert!(navmesh.request_update_blocking());
        }
        done.store(true, Ordering::Release);
    });

    assert_eq!(navmesh.handle().generation(), 21);
    assert!(reads.load(Ordering::Acquire) >= 20);
}

#[test]
fn readers_keep_finding_paths_during_async_rebuilds() {
    let registry = NavmeshRegistry::new();
    let navmesh = spawn_box(
        &registry,
        Vec3A::new(4.0, 0.5, 4.0),
        NavmeshSettings::default(),
    );
    let events = events(&navmesh);
    assert!(navmesh.request_update_blocking());
    wait_for_update(&events, navmesh.id());

    let query = navmesh.path_query();
    let start = Vec3A::new(-3.0, 0.5, 3.0);
    let end = Vec3A::new(3.0, 0.5, -3.0);
    for _ in 0..10 {
        assert!(navmesh.request_update_async());
        assert_eq!(query.find_path(start, end).len(), 2);
        wait_for_update(&events, navmesh.id());
    }
    assert_eq!(navmesh.handle().generation(), 11);
}
