//! Path requests against the navmesh of a chosen owner.

use glam::Vec3A;
use thiserror::Error;
use tilenav::PathError;
use tracing::debug;

use crate::registry::{NavmeshId, NavmeshRegistry};

/// Answers path requests against the published navmesh of one owner.
///
/// The target can be changed at any time; the change applies to the next request.
#[derive(Debug, Clone)]
pub struct PathQuery {
    registry: NavmeshRegistry,
    target: NavmeshId,
}

/// Reasons [`PathQuery::try_find_path`] found no path.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PathQueryError {
    /// The target id does not refer to a living navmesh.
    #[error("Navmesh {0:?} does not exist")]
    UnknownOwner(NavmeshId),
    /// The target navmesh has not published anything yet.
    #[error("Navmesh {0:?} has not been built yet")]
    NotPublished(NavmeshId),
    /// The published navmesh has no path between the points.
    #[error(transparent)]
    Path(#[from] PathError),
}

impl PathQuery {
    /// Creates a query targeting the given navmesh.
    pub fn new(registry: NavmeshRegistry, target: NavmeshId) -> Self {
        Self { registry, target }
    }

    /// Changes the navmesh paths are searched on.
    pub fn set_target_owner(&mut self, target: NavmeshId) {
        self.target = target;
    }

    /// The navmesh paths are searched on.
    pub fn target_owner(&self) -> NavmeshId {
        self.target
    }

    /// Finds a path from `start` to `end` on the published navmesh of the target.
    ///
    /// Returns an empty path if there is none, for whatever reason. Use
    /// [`PathQuery::try_find_path`] to learn the reason.
    pub fn find_path(&self, start: Vec3A, end: Vec3A) -> Vec<Vec3A> {
        match self.try_find_path(start, end) {
            Ok(path) => path,
            Err(err) => {
                debug!(target = ?self.target, %start, %end, "No path found: {err}");
                Vec::new()
            }
        }
    }

    /// Finds a path from `start` to `end` on the published navmesh of the target.
    pub fn try_find_path(&self, start: Vec3A, end: Vec3A) -> Result<Vec<Vec3A>, PathQueryError> {
        let guard = self
            .registry
            .get(self.target)
            .ok_or(PathQueryError::UnknownOwner(self.target))?
            .handle
            .acquire_read();
        let query = guard
            .query()
            .ok_or(PathQueryError::NotPublished(self.target))?;
        Ok(query.find_path(start, end)?)
    }
}
