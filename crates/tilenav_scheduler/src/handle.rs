//! The published navmesh of an owner and scoped read access to it.

use std::sync::{
    Arc, PoisonError, RwLock,
    atomic::{AtomicU64, Ordering},
};

use tilenav::{NavMesh, NavMeshQuery, PathSolver, QueryConfig};

/// A navmesh that was published, together with the query object built for it.
#[derive(Debug)]
pub struct PublishedMesh {
    query: NavMeshQuery,
    generation: u64,
}

impl PublishedMesh {
    /// The published navmesh.
    pub fn mesh(&self) -> &NavMesh {
        self.query.mesh()
    }

    /// The query object of the published navmesh.
    pub fn query(&self) -> &NavMeshQuery {
        &self.query
    }

    /// The publish counter value of this navmesh. The first published navmesh has generation 1.
    pub fn generation(&self) -> u64 {
        self.generation
    }
}

/// Holds the currently published navmesh of an owner.
///
/// There is a single writer, the update scheduler, and any number of readers.
/// Publishing swaps an [`Arc`], so a reader sees either the old or the new navmesh, never a mix.
#[derive(Debug, Default)]
pub struct NavMeshHandle {
    current: RwLock<Option<Arc<PublishedMesh>>>,
    generation: AtomicU64,
}

impl NavMeshHandle {
    /// Returns a guard giving read access to the navmesh that is published right now.
    ///
    /// The guard keeps its snapshot alive for as long as it exists, even if a newer navmesh
    /// gets published in the meantime. It never blocks the publisher.
    pub fn acquire_read(&self) -> NavMeshReadGuard {
        let snapshot = self
            .current
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        NavMeshReadGuard { snapshot }
    }

    /// The number of navmeshes published so far.
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::Acquire)
    }

    /// Whether a navmesh was ever published.
    pub fn is_published(&self) -> bool {
        self.generation() > 0
    }

    /// Replaces the published navmesh and returns its generation.
    ///
    /// The query object is built before the lock is taken, so readers are only excluded for
    /// the duration of the swap.
    pub(crate) fn publish(
        &self,
        mesh: NavMesh,
        config: QueryConfig,
        solver: Arc<dyn PathSolver>,
    ) -> u64 {
        let query = NavMeshQuery::with_solver(Arc::new(mesh), config, solver);
        let mut current = self.current.write().unwrap_or_else(PoisonError::into_inner);
        let generation = self.generation.fetch_add(1, Ordering::AcqRel) + 1;
        let previous = current.replace(Arc::new(PublishedMesh { query, generation }));
        drop(current);
        // an old snapshot without outstanding guards is freed here, outside the lock
        drop(previous);
        generation
    }
}

/// Scoped read access to a published navmesh, obtained through [`NavMeshHandle::acquire_read`].
///
/// Dropping the guard releases the snapshot.
#[derive(Debug, Clone)]
pub struct NavMeshReadGuard {
    snapshot: Option<Arc<PublishedMesh>>,
}

impl NavMeshReadGuard {
    /// The navmesh, or `None` if nothing was published yet.
    pub fn mesh(&self) -> Option<&NavMesh> {
        self.snapshot.as_deref().map(PublishedMesh::mesh)
    }

    /// The query object of the navmesh, or `None` if nothing was published yet.
    pub fn query(&self) -> Option<&NavMeshQuery> {
        self.snapshot.as_deref().map(PublishedMesh::query)
    }

    /// The generation of the snapshot, or 0 if nothing was published yet.
    pub fn generation(&self) -> u64 {
        self.snapshot
            .as_deref()
            .map_or(0, PublishedMesh::generation)
    }

    /// Whether the guard holds a published navmesh.
    pub fn is_published(&self) -> bool {
        self.snapshot.is_some()
    }
}
