//! Coordinating navmesh builds.
//!
//! Every navmesh has an [`UpdateScheduler`] that allows at most one build at a time.
//! A build runs through these steps:
//! - fire [`NavmeshEvent::BuildStarted`]
//! - collect the geometry of all tiles from the [`GeometryProvider`]
//! - build every tile with the [`TileBuilder`], skipping tiles that fail
//! - stitch the tiles into a [`NavMesh`] and publish it, unless the owner was torn down
//! - go back to [`SchedulerState::Idle`]
//! - fire [`NavmeshEvent::Updated`], unless the owner was torn down

use std::sync::{
    Arc, Weak,
    atomic::{AtomicU8, Ordering},
};

use bevy_tasks::{AsyncComputeTaskPool, TaskPool};
use tilenav::{GeometryProvider, MeshTile, NavMesh, NavmeshSettings, PathSolver, TileBuilder};
use tracing::{debug, info, info_span, trace, warn};

use crate::{
    events::NavmeshEvent,
    owner::NavmeshShared,
    registry::{NavmeshId, live},
};

/// Whether a navmesh is being built.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[repr(u8)]
pub enum SchedulerState {
    /// No build is running. Requests start a new build.
    #[default]
    Idle = 0,
    /// A build is running. Async requests join it, blocking requests are refused.
    Building = 1,
}

impl SchedulerState {
    fn from_u8(value: u8) -> Self {
        match value {
            0 => SchedulerState::Idle,
            _ => SchedulerState::Building,
        }
    }
}

/// Guarantees that at most one build per navmesh is in flight.
#[derive(Debug, Default)]
pub struct UpdateScheduler {
    state: AtomicU8,
}

impl UpdateScheduler {
    /// The current state.
    pub fn state(&self) -> SchedulerState {
        SchedulerState::from_u8(self.state.load(Ordering::Acquire))
    }

    /// Moves from `Idle` to `Building`. Of any number of racing callers, exactly one wins.
    pub(crate) fn try_begin(&self) -> bool {
        self.state
            .compare_exchange(
                SchedulerState::Idle as u8,
                SchedulerState::Building as u8,
                Ordering::AcqRel,
                Ordering::Acquire,
            )
            .is_ok()
    }

    pub(crate) fn finish(&self) {
        self.state.store(SchedulerState::Idle as u8, Ordering::Release);
    }
}

/// Puts the scheduler back to `Idle` when the build ends, including by panic.
struct FinishOnDrop<'a>(&'a UpdateScheduler);

impl Drop for FinishOnDrop<'_> {
    fn drop(&mut self) {
        self.0.finish();
    }
}

/// How a build was requested.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub enum BuildKind {
    /// The build runs on the caller's thread.
    Blocking,
    /// The build runs on the async compute task pool.
    Async,
}

/// A request that won the race for the scheduler and is about to be built.
#[derive(Debug, Clone, PartialEq)]
pub struct BuildRequest {
    /// The navmesh to build.
    pub owner: NavmeshId,
    /// The tile size the geometry is collected with.
    pub tile_size: f32,
    /// The border size the geometry is collected with. Never negative.
    pub border_size: f32,
    /// How the build was requested.
    pub kind: BuildKind,
}

/// Statistics of a build that published a navmesh.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub struct BuildReport {
    /// The number of tiles the geometry provider returned.
    pub tiles_collected: usize,
    /// The number of tiles that were built successfully.
    pub tiles_built: usize,
    /// The number of tiles that failed to build and were left out.
    pub tiles_failed: usize,
    /// The number of polygons of the published navmesh.
    pub polygons: usize,
    /// The generation the navmesh was published as.
    pub generation: u64,
}

impl NavmeshShared {
    pub(crate) fn request_update(self: &Arc<Self>, kind: BuildKind) -> bool {
        if !self.scheduler.try_begin() {
            return match kind {
                BuildKind::Async => {
                    trace!(id = ?self.id, "Build in flight, coalescing async request");
                    true
                }
                BuildKind::Blocking => {
                    debug!(id = ?self.id, "Build in flight, refusing blocking request");
                    false
                }
            };
        }
        let cycle = BuildCycle::new(self, kind);
        match kind {
            BuildKind::Blocking => {
                cycle.run();
            }
            BuildKind::Async => {
                AsyncComputeTaskPool::get_or_init(TaskPool::new)
                    .spawn(async move {
                        cycle.run();
                    })
                    .detach();
            }
        }
        true
    }
}

/// Everything a single build needs. Holds the owner only through a liveness token.
struct BuildCycle {
    request: BuildRequest,
    settings: NavmeshSettings,
    provider: Arc<dyn GeometryProvider>,
    builder: Arc<dyn TileBuilder>,
    solver: Arc<dyn PathSolver>,
    scheduler: Arc<UpdateScheduler>,
    owner: Weak<NavmeshShared>,
}

impl BuildCycle {
    fn new(shared: &Arc<NavmeshShared>, kind: BuildKind) -> Self {
        let settings = shared.settings();
        Self {
            request: BuildRequest {
                owner: shared.id,
                tile_size: settings.tile_size,
                border_size: settings.border_size.max(0.0),
                kind,
            },
            settings,
            provider: shared.provider.clone(),
            builder: shared.builder.clone(),
            solver: shared.solver.clone(),
            scheduler: shared.scheduler.clone(),
            owner: Arc::downgrade(shared),
        }
    }

    /// Runs the build. Must only be called after winning [`UpdateScheduler::try_begin`].
    fn run(self) -> Option<BuildReport> {
        let id = self.request.owner;
        let span = info_span!("navmesh_build", ?id, kind = ?self.request.kind);
        let _enter = span.enter();

        let report = {
            let _finish = FinishOnDrop(&self.scheduler);
            self.notify(NavmeshEvent::BuildStarted(id))?;
            self.build_and_publish()?
        };

        self.notify(NavmeshEvent::Updated(id))?;
        Some(report)
    }

    /// Notifies the observers, unless the owner is gone.
    fn notify(&self, event: NavmeshEvent) -> Option<()> {
        let Some(owner) = live(&self.owner) else {
            debug!(?event, "Navmesh was torn down, dropping event");
            return None;
        };
        owner.notify(event);
        Some(())
    }

    fn build_and_publish(&self) -> Option<BuildReport> {
        let BuildRequest {
            tile_size,
            border_size,
            ..
        } = self.request;
        let geometry = self.provider.collect(tile_size, border_size);
        let tiles_collected = geometry.len();
        debug!(tiles_collected, tile_size, border_size, "Collected geometry");

        let mut tiles_failed = 0;
        let tiles: Vec<MeshTile> = geometry
            .iter()
            .filter_map(|tile_geometry| {
                match self.builder.build(tile_geometry, &self.settings.build) {
                    Ok(tile) => Some(tile),
                    Err(err) => {
                        let coord = tile_geometry.coord;
                        warn!(?coord, "Failed to build tile, skipping it: {err}");
                        tiles_failed += 1;
                        None
                    }
                }
            })
            .collect();
        drop(geometry);
        let tiles_built = tiles.len();
        let mesh = NavMesh::from_tiles(tiles);
        let polygons = mesh.polygon_count();

        let Some(owner) = live(&self.owner) else {
            debug!("Navmesh was torn down during the build, discarding the result");
            return None;
        };
        let generation = owner
            .handle
            .publish(mesh, self.settings.query.clone(), self.solver.clone());
        let report = BuildReport {
            tiles_collected,
            tiles_built,
            tiles_failed,
            polygons,
            generation,
        };
        owner.store_report(report.clone());
        info!(tiles_built, tiles_failed, polygons, generation, "Published navmesh");
        Some(report)
    }
}
