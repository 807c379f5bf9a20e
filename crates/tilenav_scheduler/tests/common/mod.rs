//! Helpers shared by the integration tests.
#![allow(dead_code)]

use std::{
    sync::{
        Arc, Condvar, Mutex,
        mpsc::{Receiver, RecvTimeoutError, channel},
    },
    time::{Duration, Instant},
};

use glam::{Affine3A, Vec3A};
use tilenav::{
    AffectorGeometry, ColliderShape, MeshTile, NavmeshSettings, TileBuildConfig, TileBuildError,
    TileBuilder, TileGeometry, TriangleTileBuilder,
};
use tilenav_scheduler::{NavigationMesh, NavmeshEvent, NavmeshId, NavmeshRegistry};

/// How long tests wait for something that is expected to happen.
pub const TIMEOUT: Duration = Duration::from_secs(10);
/// How long tests wait to make sure something does not happen.
pub const QUIET_PERIOD: Duration = Duration::from_millis(300);

/// Blocks builders until it is opened.
#[derive(Debug, Default)]
pub struct Gate {
    open: Mutex<bool>,
    changed: Condvar,
}

impl Gate {
    pub fn closed() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn open(&self) {
        *self.open.lock().unwrap() = true;
        self.changed.notify_all();
    }

    fn wait(&self) {
        let mut open = self.open.lock().unwrap();
        while !*open {
            open = self.changed.wait(open).unwrap();
        }
    }
}

/// A [`TriangleTileBuilder`] that waits for a [`Gate`] before building each tile.
#[derive(Debug)]
pub struct GatedBuilder {
    pub gate: Arc<Gate>,
}

impl TileBuilder for GatedBuilder {
    fn build(
        &self,
        geometry: &TileGeometry,
        config: &TileBuildConfig,
    ) -> Result<MeshTile, TileBuildError> {
        self.gate.wait();
        TriangleTileBuilder::default().build(geometry, config)
    }
}

/// A box centered on the origin, as the only piece of world geometry.
pub fn box_geometry(half_extents: Vec3A) -> Arc<AffectorGeometry> {
    let geometry = AffectorGeometry::new();
    assert!(geometry.insert_collider(
        Affine3A::IDENTITY,
        &ColliderShape::Cuboid { half_extents },
        1,
    ));
    Arc::new(geometry)
}

/// A navmesh over a unit box whose builds wait for `gate`.
pub fn spawn_gated_box(registry: &NavmeshRegistry, gate: Arc<Gate>) -> NavigationMesh {
    registry.spawn(
        NavmeshSettings::default(),
        box_geometry(Vec3A::ONE),
        Arc::new(GatedBuilder { gate }),
    )
}

/// A navmesh over a box with the given settings.
pub fn spawn_box(
    registry: &NavmeshRegistry,
    half_extents: Vec3A,
    settings: NavmeshSettings,
) -> NavigationMesh {
    registry.spawn(
        settings,
        box_geometry(half_extents),
        Arc::new(TriangleTileBuilder::default()),
    )
}

/// Forwards every event of the navmesh into a channel.
pub fn events(navmesh: &NavigationMesh) -> Receiver<NavmeshEvent> {
    let (sender, receiver) = channel();
    navmesh.observe(move |event| {
        // the receiver is gone once the test is over
        let _ = sender.send(*event);
    });
    receiver
}

/// Waits for the next [`NavmeshEvent::Updated`], skipping other events.
pub fn wait_for_update(events: &Receiver<NavmeshEvent>, id: NavmeshId) {
    let deadline = Instant::now() + TIMEOUT;
    loop {
        let remaining = deadline.saturating_duration_since(Instant::now());
        match events.recv_timeout(remaining) {
            Ok(NavmeshEvent::Updated(updated)) => {
                assert_eq!(updated, id);
                return;
            }
            Ok(NavmeshEvent::BuildStarted(_)) => continue,
            Err(err) => panic!("Navmesh was not updated in time: {err}"),
        }
    }
}

/// Counts the `Updated` events that arrive within [`QUIET_PERIOD`].
pub fn count_further_updates(events: &Receiver<NavmeshEvent>) -> usize {
    let deadline = Instant::now() + QUIET_PERIOD;
    let mut updates = 0;
    loop {
        let remaining = deadline.saturating_duration_since(Instant::now());
        match events.recv_timeout(remaining) {
            Ok(NavmeshEvent::Updated(_)) => updates += 1,
            Ok(NavmeshEvent::BuildStarted(_)) => {}
            Err(RecvTimeoutError::Timeout | RecvTimeoutError::Disconnected) => return updates,
        }
    }
}

/// Polls `condition` until it holds or [`TIMEOUT`] passes.
pub fn eventually(mut condition: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + TIMEOUT;
    while Instant::now() < deadline {
        if condition() {
            return true;
        }
        std::thread::sleep(Duration::from_millis(5));
    }
    condition()
}
