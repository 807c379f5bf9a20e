//! The navmesh assembled from all built tiles.

use std::{collections::HashMap, ops::Range};

use glam::{UVec2, Vec3A};

use crate::{
    area::AreaType,
    math::{Aabb3d, TriangleVertices as _},
    tile::MeshTile,
};

/// Vertices closer than this are considered the same vertex when stitching polygons together.
const STITCH_QUANTUM: f32 = 1e-4;

/// A reference to a polygon of a [`NavMesh`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub struct PolyRef(pub u32);

impl PolyRef {
    /// The index of the polygon in [`NavMesh::polygons`].
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// A walkable polygon of a [`NavMesh`], together with its connectivity.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub struct NavPolygon {
    /// The tile the polygon was built in.
    pub tile: UVec2,
    /// The corners of the polygon in world space, wound so that the polygon faces up.
    pub vertices: [Vec3A; 3],
    /// The polygon across each edge, if any. Edge `i` runs from `vertices[i]` to `vertices[(i + 1) % 3]`.
    pub neighbours: [Option<PolyRef>; 3],
    /// The area type of the polygon.
    pub area: AreaType,
    /// The bounds of the polygon.
    pub bounds: Aabb3d,
}

impl NavPolygon {
    /// The two endpoints of the given edge.
    #[inline]
    pub fn edge(&self, edge: usize) -> (Vec3A, Vec3A) {
        (self.vertices[edge], self.vertices[(edge + 1) % 3])
    }

    /// The center of the polygon.
    #[inline]
    pub fn centroid(&self) -> Vec3A {
        self.vertices.centroid()
    }
}

/// Summary of a tile that contributed to a [`NavMesh`].
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub struct NavTile {
    /// The position of the tile in the tile grid.
    pub coord: UVec2,
    /// The region owned by the tile, grown to contain all of its polygons.
    pub bounds: Aabb3d,
    /// The range of [`NavMesh::polygons`] that belongs to this tile.
    pub polygons: Range<u32>,
}

/// A navmesh made of the polygons of many tiles, stitched together along shared edges.
///
/// A `NavMesh` is immutable once built. Updating the world produces a new one.
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub struct NavMesh {
    tiles: Vec<NavTile>,
    polygons: Vec<NavPolygon>,
}

type QuantizedVertex = [i64; 3];

fn quantize(vertex: Vec3A) -> QuantizedVertex {
    (vertex / STITCH_QUANTUM).round().to_array().map(|v| v as i64)
}

fn edge_key(a: Vec3A, b: Vec3A) -> (QuantizedVertex, QuantizedVertex) {
    let (a, b) = (quantize(a), quantize(b));
    if a <= b { (a, b) } else { (b, a) }
}

impl NavMesh {
    /// Assembles a navmesh from built tiles.
    ///
    /// Polygons sharing an edge are linked, whether they live in the same tile or not.
    /// An edge shared by more than two polygons is left unlinked.
    pub fn from_tiles(tiles: impl IntoIterator<Item = MeshTile>) -> Self {
        let mut navmesh = Self::default();
        for tile in tiles {
            let start = navmesh.polygons.len() as u32;
            navmesh
                .polygons
                .extend(tile.polygons.iter().map(|polygon| {
                    let vertices = tile.polygon_vertices(polygon);
                    NavPolygon {
                        tile: tile.coord,
                        vertices,
                        neighbours: [None; 3],
                        area: polygon.area,
                        bounds: vertices.aabb(),
                    }
                }));
            let end = navmesh.polygons.len() as u32;
            // polygons are kept whole, so they may reach past the region the tile owns
            let bounds = navmesh.polygons[start as usize..end as usize]
                .iter()
                .fold(tile.bounds, |bounds, polygon| bounds.merge(&polygon.bounds));
            navmesh.tiles.push(NavTile {
                coord: tile.coord,
                bounds,
                polygons: start..end,
            });
        }
        navmesh.stitch();
        navmesh
    }

    fn stitch(&mut self) {
        let mut edges: HashMap<_, Vec<(usize, usize)>> = HashMap::new();
        for (polygon_index, polygon) in self.polygons.iter().enumerate() {
            for edge in 0..3 {
                let (a, b) = polygon.edge(edge);
                edges
                    .entry(edge_key(a, b))
                    .or_default()
                    .push((polygon_index, edge));
            }
        }
        let mut links = 0;
        for shared in edges.values() {
            let &[(first, first_edge), (second, second_edge)] = shared.as_slice() else {
                continue;
            };
            if first == second {
                continue;
            }
            self.polygons[first].neighbours[first_edge] = Some(PolyRef(second as u32));
            self.polygons[second].neighbours[second_edge] = Some(PolyRef(first as u32));
            links += 1;
        }
        tracing::trace!(
            tiles = self.tiles.len(),
            polygons = self.polygons.len(),
            links,
            "Stitched navmesh"
        );
    }

    /// The number of tiles that contributed to the navmesh, including empty ones.
    pub fn tile_count(&self) -> usize {
        self.tiles.len()
    }

    /// The number of polygons in the navmesh.
    pub fn polygon_count(&self) -> usize {
        self.polygons.len()
    }

    /// Whether the navmesh has no polygons to walk on.
    pub fn is_empty(&self) -> bool {
        self.polygons.is_empty()
    }

    /// All polygons of the navmesh. [`PolyRef`]s index into this.
    pub fn polygons(&self) -> &[NavPolygon] {
        &self.polygons
    }

    /// Looks up a polygon.
    pub fn polygon(&self, polygon: PolyRef) -> Option<&NavPolygon> {
        self.polygons.get(polygon.index())
    }

    /// All tiles of the navmesh.
    pub fn tiles(&self) -> &[NavTile] {
        &self.tiles
    }

    /// The polygons belonging to the given tile.
    pub fn tile_polygons(&self, tile: &NavTile) -> impl Iterator<Item = (PolyRef, &NavPolygon)> {
        let range = tile.polygons.start as usize..tile.polygons.end as usize;
        self.polygons[range]
            .iter()
            .zip(tile.polygons.clone())
            .map(|(polygon, index)| (PolyRef(index), polygon))
    }

    /// The bounds of all polygons, or `None` if the navmesh is empty.
    pub fn bounds(&self) -> Option<Aabb3d> {
        self.polygons
            .iter()
            .map(|polygon| polygon.bounds)
            .reduce(|acc, bounds| acc.merge(&bounds))
    }
}
