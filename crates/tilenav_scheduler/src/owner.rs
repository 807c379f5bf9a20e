//! Navmesh owners and the state they share with running builds.

use std::sync::{
    Arc, Mutex, PoisonError, RwLock,
    atomic::{AtomicBool, Ordering},
};

use tilenav::{GeometryProvider, NavmeshSettings, PathSolver, TileBuilder};
use tracing::debug;

use crate::{
    events::{NavmeshEvent, ObserverId, Observers},
    handle::NavMeshHandle,
    path::PathQuery,
    registry::{NavmeshId, NavmeshRegistry},
    scheduler::{BuildKind, BuildReport, SchedulerState, UpdateScheduler},
};

/// The state of a navmesh shared between its owner and the builds running for it.
///
/// Builds only ever hold a weak reference to this, so dropping the owner is enough to
/// stop a running build from publishing.
pub(crate) struct NavmeshShared {
    pub(crate) id: NavmeshId,
    settings: RwLock<NavmeshSettings>,
    pub(crate) provider: Arc<dyn GeometryProvider>,
    pub(crate) builder: Arc<dyn TileBuilder>,
    pub(crate) solver: Arc<dyn PathSolver>,
    pub(crate) handle: NavMeshHandle,
    pub(crate) scheduler: Arc<UpdateScheduler>,
    pub(crate) observers: Observers,
    torn_down: AtomicBool,
    last_report: Mutex<Option<BuildReport>>,
}

impl NavmeshShared {
    pub(crate) fn new(
        id: NavmeshId,
        settings: NavmeshSettings,
        provider: Arc<dyn GeometryProvider>,
        builder: Arc<dyn TileBuilder>,
        solver: Arc<dyn PathSolver>,
    ) -> Self {
        Self {
            id,
            settings: RwLock::new(settings),
            provider,
            builder,
            solver,
            handle: NavMeshHandle::default(),
            scheduler: Arc::new(UpdateScheduler::default()),
            observers: Observers::default(),
            torn_down: AtomicBool::new(false),
            last_report: Mutex::new(None),
        }
    }

    pub(crate) fn settings(&self) -> NavmeshSettings {
        self.settings
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub(crate) fn is_torn_down(&self) -> bool {
        self.torn_down.load(Ordering::Acquire)
    }

    pub(crate) fn store_report(&self, report: BuildReport) {
        *self
            .last_report
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Some(report);
    }

    pub(crate) fn notify(&self, event: NavmeshEvent) {
        self.observers.notify(event);
    }
}

/// A navmesh owner: the object builds are requested for and notifications are about.
///
/// Created through [`NavmeshRegistry::spawn`]. Dropping it tears the navmesh down:
/// its id becomes stale, and a build that is still running for it neither publishes
/// nor notifies.
pub struct NavigationMesh {
    shared: Arc<NavmeshShared>,
    registry: NavmeshRegistry,
}

impl NavigationMesh {
    pub(crate) fn new(shared: Arc<NavmeshShared>, registry: NavmeshRegistry) -> Self {
        Self { shared, registry }
    }

    /// The id of this navmesh within its registry.
    pub fn id(&self) -> NavmeshId {
        self.shared.id
    }

    /// The settings the next build will use.
    pub fn settings(&self) -> NavmeshSettings {
        self.shared.settings()
    }

    /// Replaces the settings. A build that is already running keeps the settings it started with.
    pub fn set_settings(&self, settings: NavmeshSettings) {
        if let Err(err) = settings.validate() {
            debug!(id = ?self.id(), "Using suspicious navmesh settings: {err}");
        }
        *self
            .shared
            .settings
            .write()
            .unwrap_or_else(PoisonError::into_inner) = settings;
    }

    /// The handle holding the published navmesh.
    pub fn handle(&self) -> &NavMeshHandle {
        &self.shared.handle
    }

    /// Requests a rebuild on the async compute task pool and returns immediately.
    ///
    /// If a build is already running, no additional build is started: the request is
    /// satisfied by the running one, which fires a single [`NavmeshEvent::Updated`] when it is done.
    /// Always returns `true`.
    pub fn request_update_async(&self) -> bool {
        self.shared.request_update(BuildKind::Async)
    }

    /// Rebuilds on the calling thread and returns once the new navmesh is published and
    /// observers were notified.
    ///
    /// Returns `false` without building or waiting if a build is already running.
    pub fn request_update_blocking(&self) -> bool {
        self.shared.request_update(BuildKind::Blocking)
    }

    /// Whether a build is running right now.
    pub fn state(&self) -> SchedulerState {
        self.shared.scheduler.state()
    }

    /// Shorthand for `state() == SchedulerState::Building`.
    pub fn is_building(&self) -> bool {
        self.state() == SchedulerState::Building
    }

    /// Registers a function that is called for every [`NavmeshEvent`] of this navmesh.
    ///
    /// Observers are called on the thread that ran the build, after the build released all
    /// its locks. They may call back into the navmesh, including requesting another update.
    pub fn observe(
        &self,
        observer: impl Fn(&NavmeshEvent) + Send + Sync + 'static,
    ) -> ObserverId {
        self.shared.observers.insert(observer)
    }

    /// Removes an observer. Returns `false` if it was already removed.
    pub fn unobserve(&self, observer: ObserverId) -> bool {
        self.shared.observers.remove(observer)
    }

    /// Statistics of the last build that published a navmesh.
    pub fn last_report(&self) -> Option<BuildReport> {
        self.shared
            .last_report
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// A [`PathQuery`] targeting this navmesh.
    pub fn path_query(&self) -> PathQuery {
        PathQuery::new(self.registry.clone(), self.id())
    }
}

impl std::fmt::Debug for NavigationMesh {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NavigationMesh")
            .field("id", &self.id())
            .field("state", &self.state())
            .field("generation", &self.handle().generation())
            .field("observers", &self.shared.observers)
            .finish()
    }
}

impl Drop for NavigationMesh {
    fn drop(&mut self) {
        self.shared.torn_down.store(true, Ordering::Release);
        self.registry.remove(self.id());
        debug!(id = ?self.id(), building = self.is_building(), "Tore down navmesh");
    }
}

#[cfg(test)]
mod tests {
    use glam::Vec3A;
    use tilenav::{AffectorGeometry, ColliderShape, TriangleTileBuilder};

    use super::*;

    fn box_navmesh(registry: &NavmeshRegistry) -> NavigationMesh {
        let geometry = AffectorGeometry::new();
        geometry.insert_collider(
            glam::Affine3A::IDENTITY,
            &ColliderShape::Cuboid {
                half_extents: Vec3A::new(4.0, 0.5, 4.0),
            },
            1,
        );
        registry.spawn(
            NavmeshSettings::default(),
            Arc::new(geometry),
            Arc::new(TriangleTileBuilder::default()),
        )
    }

    #[test]
    fn blocking_update_publishes_and_reports() {
        let registry = NavmeshRegistry::new();
        let navmesh = box_navmesh(&registry);
        assert!(navmesh.last_report().is_none());
        assert!(navmesh.request_update_blocking());
        assert_eq!(navmesh.state(), SchedulerState::Idle);
        assert_eq!(navmesh.handle().generation(), 1);

        let report = navmesh.last_report().unwrap();
        assert_eq!(report.tiles_collected, 1);
        assert_eq!(report.tiles_built, 1);
        assert_eq!(report.tiles_failed, 0);
        assert_eq!(report.polygons, 2);
        assert_eq!(report.generation, 1);
    }

    #[test]
    fn settings_apply_to_the_next_build() {
        let registry = NavmeshRegistry::new();
        let navmesh = box_navmesh(&registry);
        navmesh.set_settings(NavmeshSettings {
            tile_size: 4.0,
            ..Default::default()
        });
        assert_eq!(navmesh.settings().tile_size, 4.0);
        assert!(navmesh.request_update_blocking());
        let report = navmesh.last_report().unwrap();
        assert_eq!(report.tiles_collected, 4);
        assert_eq!(report.polygons, 2);
    }

    #[test]
    fn observers_see_both_events_in_order() {
        let registry = NavmeshRegistry::new();
        let navmesh = box_navmesh(&registry);
        let events = Arc::new(Mutex::new(Vec::new()));
        let sink = events.clone();
        let observer = navmesh.observe(move |event| sink.lock().unwrap().push(*event));
        navmesh.request_update_blocking();
        assert_eq!(
            *events.lock().unwrap(),
            vec![
                NavmeshEvent::BuildStarted(navmesh.id()),
                NavmeshEvent::Updated(navmesh.id())
            ]
        );

        assert!(navmesh.unobserve(observer));
        navmesh.request_update_blocking();
        assert_eq!(events.lock().unwrap().len(), 2);
    }
}
