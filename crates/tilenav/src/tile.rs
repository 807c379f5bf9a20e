//! Turning the geometry of one tile into a [`MeshTile`].

use std::{borrow::Cow, collections::HashMap};

use glam::{UVec2, UVec3, Vec3A};
use thiserror::Error;

use crate::{
    area::AreaType,
    config::TileBuildConfig,
    geometry::TileGeometry,
    math::{Aabb3d, TriangleIndices as _, TriangleVertices as _},
};

/// The navigable surface of a single tile.
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub struct MeshTile {
    /// The position of the tile in the tile grid.
    pub coord: UVec2,
    /// The region owned by the tile.
    pub bounds: Aabb3d,
    /// The vertices referenced by [`MeshTile::polygons`], in world space.
    pub vertices: Vec<Vec3A>,
    /// The walkable polygons of the tile.
    pub polygons: Vec<TilePolygon>,
}

/// A walkable polygon of a [`MeshTile`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub struct TilePolygon {
    /// Indices into [`MeshTile::vertices`], wound so that the polygon faces up.
    pub vertices: [u32; 3],
    /// The area type of the polygon. Always walkable.
    pub area: AreaType,
}

impl MeshTile {
    /// Creates a tile without any polygons.
    pub fn empty(coord: UVec2, bounds: Aabb3d) -> Self {
        Self {
            coord,
            bounds,
            vertices: Vec::new(),
            polygons: Vec::new(),
        }
    }

    /// Whether the tile has no walkable polygons.
    pub fn is_empty(&self) -> bool {
        self.polygons.is_empty()
    }

    /// Returns the world space corners of a polygon.
    pub fn polygon_vertices(&self, polygon: &TilePolygon) -> [Vec3A; 3] {
        polygon.vertices.map(|i| self.vertices[i as usize])
    }
}

/// Builds a [`MeshTile`] from the geometry of one tile.
///
/// Builders must be pure: the same geometry and config always produce the same tile.
/// They are called from background threads.
pub trait TileBuilder: Send + Sync {
    /// Builds the tile. An empty geometry produces an empty tile, not an error.
    fn build(
        &self,
        geometry: &TileGeometry,
        config: &TileBuildConfig,
    ) -> Result<MeshTile, TileBuildError>;
}

/// Errors that can occur while building a single tile.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TileBuildError {
    /// A triangle references a vertex that does not exist.
    #[error(
        "Triangle {triangle} references vertex {index}, but the tile only has {vertex_count} vertices"
    )]
    IndexOutOfBounds {
        /// The offending triangle.
        triangle: usize,
        /// The offending index.
        index: u32,
        /// The number of vertices in the tile.
        vertex_count: usize,
    },
    /// A non-indexed triangle list has a vertex count that is not a multiple of 3.
    #[error("A flat triangle list needs a multiple of 3 vertices, got {vertex_count}")]
    MalformedTriangleList {
        /// The number of vertices in the tile.
        vertex_count: usize,
    },
    /// There are area types, but not one per triangle.
    #[error("Expected one area type per triangle ({triangles}), got {area_types}")]
    AreaTypeMismatch {
        /// The number of triangles.
        triangles: usize,
        /// The number of area types.
        area_types: usize,
    },
    /// A vertex is NaN or infinite.
    #[error("Vertex {index} is not finite")]
    NonFiniteVertex {
        /// The index of the vertex.
        index: usize,
    },
    /// The tile has more vertices than can be indexed.
    #[error("Tile has {vertex_count} vertices, more than can be indexed")]
    TooManyVertices {
        /// The number of vertices in the tile.
        vertex_count: usize,
    },
}

/// The default [`TileBuilder`]: keeps every walkable triangle owned by the tile as a polygon.
///
/// A triangle is walkable if its slope is within [`TileBuildConfig::walkable_slope_angle`]
/// and its area is at least [`TileBuildConfig::min_triangle_area`]. Walkable triangles keep
/// their area type if it is already walkable and get [`AreaType::DEFAULT_WALKABLE`] otherwise.
#[derive(Debug, Clone, Copy, Default)]
#[non_exhaustive]
pub struct TriangleTileBuilder;

impl TileBuilder for TriangleTileBuilder {
    fn build(
        &self,
        geometry: &TileGeometry,
        config: &TileBuildConfig,
    ) -> Result<MeshTile, TileBuildError> {
        let triangles = triangle_indices(geometry)?;
        if !geometry.area_types.is_empty() && geometry.area_types.len() != triangles.len() {
            return Err(TileBuildError::AreaTypeMismatch {
                triangles: triangles.len(),
                area_types: geometry.area_types.len(),
            });
        }
        if let Some(index) = geometry.vertices.iter().position(|v| !v.is_finite()) {
            return Err(TileBuildError::NonFiniteVertex { index });
        }

        let threshold_cos = config.walkable_slope_angle.cos();
        let mut tile = MeshTile::empty(geometry.coord, geometry.interior);
        let mut remap = HashMap::new();
        for (i, indices) in triangles.iter().enumerate() {
            let triangle = indices.vertices(&geometry.vertices);
            if triangle.area() < config.min_triangle_area {
                continue;
            }
            if triangle.normal().y <= threshold_cos {
                continue;
            }
            if !geometry.interior.contains_xz_half_open(triangle.centroid()) {
                continue;
            }
            let area = geometry.area_types.get(i).copied().unwrap_or_default();
            let area = if area.is_walkable() {
                area
            } else {
                AreaType::DEFAULT_WALKABLE
            };
            let vertices = indices.to_array().map(|index| {
                *remap.entry(index).or_insert_with(|| {
                    tile.vertices.push(geometry.vertices[index as usize]);
                    (tile.vertices.len() - 1) as u32
                })
            });
            tile.polygons.push(TilePolygon { vertices, area });
        }
        Ok(tile)
    }
}

/// Returns the triangles of the geometry as indices, validating them along the way.
fn triangle_indices(geometry: &TileGeometry) -> Result<Cow<'_, [UVec3]>, TileBuildError> {
    let vertex_count = geometry.vertices.len();
    if vertex_count > u32::MAX as usize {
        return Err(TileBuildError::TooManyVertices { vertex_count });
    }
    match &geometry.indices {
        Some(indices) => {
            for (triangle, indices) in indices.iter().enumerate() {
                if let Some(index) = indices
                    .to_array()
                    .into_iter()
                    .find(|index| *index as usize >= vertex_count)
                {
                    return Err(TileBuildError::IndexOutOfBounds {
                        triangle,
                        index,
                        vertex_count,
                    });
                }
            }
            Ok(Cow::Borrowed(indices))
        }
        None => {
            if vertex_count % 3 != 0 {
                return Err(TileBuildError::MalformedTriangleList { vertex_count });
            }
            let indices = (0..vertex_count as u32 / 3)
                .map(|i| UVec3::new(i * 3, i * 3 + 1, i * 3 + 2))
                .collect();
            Ok(Cow::Owned(indices))
        }
    }
}
