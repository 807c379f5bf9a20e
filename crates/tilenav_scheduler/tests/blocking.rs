//! Blocking requests never wait for a build that is already running.

mod common;

use std::sync::Arc;

use common::{Gate, events, spawn_gated_box, wait_for_update};
use tilenav_scheduler::{NavmeshEvent, NavmeshRegistry, SchedulerState};

#[test]
fn blocking_request_is_refused_while_an_async_build_runs() {
    let registry = NavmeshRegistry::new();
    let gate = Gate::closed();
    let navmesh = spawn_gated_box(&registry, gate.clone());
    let events = events(&navmesh);

    assert!(navmesh.request_update_async());
    assert!(!navmesh.request_update_blocking());
    assert!(navmesh.is_building());
    assert_eq!(navmesh.handle().generation(), 0);
    assert!(navmesh.handle().acquire_read().mesh().is_none());

    gate.open();
    wait_for_update(&events, navmesh.id());
    assert_eq!(navmesh.handle().generation(), 1);

    assert!(navmesh.request_update_blocking());
    assert_eq!(navmesh.handle().generation(), 2);
    assert_eq!(navmesh.state(), SchedulerState::Idle);
}

#[test]
fn blocking_request_publishes_before_returning() {
    let registry = NavmeshRegistry::new();
    let gate = Gate::closed();
    gate.open();
    let navmesh = spawn_gated_box(&registry, gate);
    let events = events(&navmesh);

    assert!(navmesh.request_update_blocking());
    let guard = navmesh.handle().acquire_read();
    assert_eq!(guard.generation(), 1);
    assert_eq!(guard.mesh().unwrap().polygon_count(), 2);
    // the notification was delivered on this thread before returning
    wait_for_update(&events, navmesh.id());
}

#[test]
fn an_observer_may_request_another_update() {
    let registry = NavmeshRegistry::new();
    let gate = Gate::closed();
    gate.open();
    let navmesh = Arc::new(spawn_gated_box(&registry, gate));
    let events = events(&navmesh);

    let weak = Arc::downgrade(&navmesh);
    navmesh.observe(move |event| {
        let Some(navmesh) = weak.upgrade() else {
            return;
        };
        if matches!(event, NavmeshEvent::Updated(_)) && navmesh.handle().generation() == 1 {
            // the scheduler is idle again by the time observers hear about the update
            assert!(navmesh.request_update_blocking());
        }
    });

    assert!(navmesh.request_update_blocking());
    wait_for_update(&events, navmesh.id());
    wait_for_update(&events, navmesh.id());
    assert_eq!(navmesh.handle().generation(), 2);
}
