//! Locating points on a [`NavMesh`] and finding paths between them.

use std::{fmt::Debug, sync::Arc};

use glam::Vec3A;
use thiserror::Error;

use crate::{
    config::QueryConfig,
    math::{Aabb3d, closest_point_on_segment_xz, triangle_height_at},
    navmesh::{NavMesh, NavPolygon, PolyRef},
    solver::AStarSolver,
};

/// A point on the navmesh together with the polygon it lies on.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PathEndpoint {
    /// The polygon containing [`PathEndpoint::position`].
    pub polygon: PolyRef,
    /// The point, projected onto the polygon.
    pub position: Vec3A,
}

/// Finds a route between two located points of a [`NavMesh`].
///
/// Implementations are shared between threads and must not keep per-query state in `self`.
pub trait PathSolver: Send + Sync + Debug {
    /// Returns the waypoints from `start` to `end`, both included.
    ///
    /// Solvers must not expand more than `max_nodes` polygons.
    fn solve(
        &self,
        mesh: &NavMesh,
        start: PathEndpoint,
        end: PathEndpoint,
        max_nodes: usize,
    ) -> Result<Vec<Vec3A>, PathError>;
}

/// Reasons a path could not be found.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PathError {
    /// The start or end point is NaN or infinite.
    #[error("Path endpoints must be finite")]
    NonFiniteInput,
    /// The navmesh has no polygons.
    #[error("The navmesh is empty")]
    EmptyMesh,
    /// No polygon was found near the start point.
    #[error("No polygon near the start point {0}")]
    StartNotOnMesh(Vec3A),
    /// No polygon was found near the end point.
    #[error("No polygon near the end point {0}")]
    EndNotOnMesh(Vec3A),
    /// The start and end polygons are not connected.
    #[error("No route between polygon {start:?} and polygon {end:?}")]
    NoRoute {
        /// The polygon of the start point.
        start: PolyRef,
        /// The polygon of the end point.
        end: PolyRef,
    },
    /// The search gave up before reaching the end polygon.
    #[error("Gave up after expanding {max_nodes} polygons")]
    NodeBudgetExhausted {
        /// The budget that was exhausted.
        max_nodes: usize,
    },
}

/// Read-only queries against one [`NavMesh`].
///
/// Cheap to clone; clones share the mesh and the solver.
#[derive(Debug, Clone)]
pub struct NavMeshQuery {
    mesh: Arc<NavMesh>,
    config: QueryConfig,
    solver: Arc<dyn PathSolver>,
}

impl NavMeshQuery {
    /// Creates a query that solves paths with [`AStarSolver`].
    pub fn new(mesh: Arc<NavMesh>, config: QueryConfig) -> Self {
        Self::with_solver(mesh, config, Arc::new(AStarSolver))
    }

    /// Creates a query with a custom [`PathSolver`].
    pub fn with_solver(
        mesh: Arc<NavMesh>,
        config: QueryConfig,
        solver: Arc<dyn PathSolver>,
    ) -> Self {
        Self {
            mesh,
            config,
            solver,
        }
    }

    /// The mesh this query runs against.
    pub fn mesh(&self) -> &NavMesh {
        &self.mesh
    }

    /// The configuration of this query.
    pub fn config(&self) -> &QueryConfig {
        &self.config
    }

    /// Finds the point on the navmesh closest to `point`, searching within
    /// [`QueryConfig::search_extents`].
    pub fn find_nearest_polygon(&self, point: Vec3A) -> Option<PathEndpoint> {
        self.find_nearest_polygon_within(point, self.config.search_extents)
    }

    /// Finds the point on the navmesh closest to `point`, searching within the box of the given
    /// half extents around it.
    ///
    /// A polygon whose xz-projection contains the point wins over one that only has an edge
    /// nearby, as long as it is closer in 3D.
    pub fn find_nearest_polygon_within(
        &self,
        point: Vec3A,
        extents: Vec3A,
    ) -> Option<PathEndpoint> {
        if !point.is_finite() {
            return None;
        }
        let search = Aabb3d::new(point, extents);
        let mut nearest: Option<(f32, PathEndpoint)> = None;
        for tile in self
            .mesh
            .tiles()
            .iter()
            .filter(|tile| tile.bounds.intersects_xz(&search))
        {
            for (polygon_ref, polygon) in self
                .mesh
                .tile_polygons(tile)
                .filter(|(_, polygon)| polygon.bounds.intersects(&search))
            {
                let closest = closest_point_on_polygon(polygon, point);
                let distance = closest.distance_squared(point);
                if nearest
                    .as_ref()
                    .is_none_or(|(best, _)| distance < *best)
                {
                    nearest = Some((
                        distance,
                        PathEndpoint {
                            polygon: polygon_ref,
                            position: closest,
                        },
                    ));
                }
            }
        }
        nearest.map(|(_, endpoint)| endpoint)
    }

    /// Finds a path from `start` to `end`.
    ///
    /// The first waypoint is `start` projected onto the navmesh, the last one is `end`
    /// projected onto the navmesh.
    pub fn find_path(&self, start: Vec3A, end: Vec3A) -> Result<Vec<Vec3A>, PathError> {
        if !start.is_finite() || !end.is_finite() {
            return Err(PathError::NonFiniteInput);
        }
        if self.mesh.is_empty() {
            return Err(PathError::EmptyMesh);
        }
        let start_endpoint = self
            .find_nearest_polygon(start)
            .ok_or(PathError::StartNotOnMesh(start))?;
        let end_endpoint = self
            .find_nearest_polygon(end)
            .ok_or(PathError::EndNotOnMesh(end))?;
        self.solver.solve(
            &self.mesh,
            start_endpoint,
            end_endpoint,
            self.config.max_nodes,
        )
    }
}

fn closest_point_on_polygon(polygon: &NavPolygon, point: Vec3A) -> Vec3A {
    if let Some(height) = triangle_height_at(&polygon.vertices, point) {
        return Vec3A::new(point.x, height, point.z);
    }
    (0..3)
        .map(|edge| {
            let (a, b) = polygon.edge(edge);
            closest_point_on_segment_xz(point, a, b)
        })
        .min_by(|a, b| {
            a.distance_squared(point)
                .total_cmp(&b.distance_squared(point))
        })
        .unwrap_or(polygon.vertices[0])
}
