//! Identity of navmesh owners.

use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard, Weak};

use slotmap::{SlotMap, new_key_type};
use tilenav::{AStarSolver, GeometryProvider, NavmeshSettings, PathSolver, TileBuilder};
use tracing::debug;

use crate::owner::{NavigationMesh, NavmeshShared};

new_key_type! {
    /// Identifies a [`NavigationMesh`] within a [`NavmeshRegistry`].
    ///
    /// Ids are never reused: the id of a dropped navmesh stays stale forever.
    /// [`NavmeshId::default`] never refers to a navmesh.
    pub struct NavmeshId;
}

/// Creates navmesh owners and resolves their ids.
///
/// Cloning the registry is cheap; clones share the same set of navmeshes.
/// The registry only holds weak references, dropping a [`NavigationMesh`] tears it down.
#[derive(Debug, Clone, Default)]
pub struct NavmeshRegistry {
    entries: Arc<RwLock<SlotMap<NavmeshId, Weak<NavmeshShared>>>>,
}

impl NavmeshRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a navmesh that solves paths with [`AStarSolver`].
    ///
    /// Nothing is built until an update is requested.
    pub fn spawn(
        &self,
        settings: NavmeshSettings,
        provider: Arc<dyn GeometryProvider>,
        builder: Arc<dyn TileBuilder>,
    ) -> NavigationMesh {
        self.spawn_with_solver(settings, provider, builder, Arc::new(AStarSolver::default()))
    }

    /// Creates a navmesh with a custom [`PathSolver`].
    pub fn spawn_with_solver(
        &self,
        settings: NavmeshSettings,
        provider: Arc<dyn GeometryProvider>,
        builder: Arc<dyn TileBuilder>,
        solver: Arc<dyn PathSolver>,
    ) -> NavigationMesh {
        if let Err(err) = settings.validate() {
            debug!("Spawning navmesh with suspicious settings: {err}");
        }
        let mut entries = self.write();
        let id = entries.insert(Weak::new());
        let shared = Arc::new(NavmeshShared::new(id, settings, provider, builder, solver));
        entries[id] = Arc::downgrade(&shared);
        drop(entries);
        debug!(?id, "Spawned navmesh");
        NavigationMesh::new(shared, self.clone())
    }

    /// Whether `id` refers to a navmesh that is still alive.
    pub fn contains(&self, id: NavmeshId) -> bool {
        self.get(id).is_some()
    }

    /// The number of navmeshes that are alive.
    pub fn len(&self) -> usize {
        self.read()
            .values()
            .filter(|entry| live(entry).is_some())
            .count()
    }

    /// Whether no navmesh is alive.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The ids of all navmeshes that are alive.
    pub fn ids(&self) -> Vec<NavmeshId> {
        self.read()
            .iter()
            .filter(|(_, entry)| live(entry).is_some())
            .map(|(id, _)| id)
            .collect()
    }

    pub(crate) fn get(&self, id: NavmeshId) -> Option<Arc<NavmeshShared>> {
        self.read().get(id).and_then(live)
    }

    pub(crate) fn remove(&self, id: NavmeshId) {
        self.write().remove(id);
    }

    fn read(&self) -> RwLockReadGuard<'_, SlotMap<NavmeshId, Weak<NavmeshShared>>> {
        self.entries.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, SlotMap<NavmeshId, Weak<NavmeshShared>>> {
        self.entries.write().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Upgrades a liveness token, unless the navmesh behind it was torn down.
pub(crate) fn live(token: &Weak<NavmeshShared>) -> Option<Arc<NavmeshShared>> {
    token.upgrade().filter(|shared| !shared.is_torn_down())
}
