#![doc = include_str!("../../../readme.md")]

mod area;
mod config;
pub mod geometry;
pub(crate) mod math;
mod navmesh;
mod query;
mod solver;
mod tile;
mod trimesh;

pub use area::AreaType;
pub use config::{NavmeshSettings, QueryConfig, SettingsError, TileBuildConfig};
pub use geometry::{
    Affector, AffectorGeometry, FlatGeometry, GeometryProvider, TileGeometry, split_into_tiles,
};
pub use math::{Aabb3d, closest_point_on_segment_xz, tri_area_2d, triangle_height_at};
pub use navmesh::{NavMesh, NavPolygon, NavTile, PolyRef};
pub use query::{NavMeshQuery, PathEndpoint, PathError, PathSolver};
pub use solver::AStarSolver;
pub use tile::{MeshTile, TileBuildError, TileBuilder, TilePolygon, TriangleTileBuilder};
pub use trimesh::{ColliderShape, ToTriMesh, TriMesh};
