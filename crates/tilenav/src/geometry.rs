//! Collecting world geometry and splitting it into tiles.

use std::{
    collections::{BTreeMap, HashMap},
    sync::{PoisonError, RwLock},
};

use glam::{Affine3A, UVec2, UVec3, Vec3A};
use tracing::{debug, warn};

use crate::{
    area::AreaType,
    math::{Aabb3d, TriangleIndices as _, TriangleVertices as _},
    trimesh::{ColliderShape, ToTriMesh as _, TriMesh},
};

/// Upper bound on the number of tiles a single collection may produce.
/// Protects against accidentally tiny tile sizes.
pub const MAX_TILES: u64 = 1 << 16;

/// The raw geometry of a single tile, as handed to a [`TileBuilder`](crate::TileBuilder).
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub struct TileGeometry {
    /// The position of the tile in the tile grid.
    pub coord: UVec2,
    /// The region covered by the geometry, including the border.
    pub bounds: Aabb3d,
    /// The region owned by the tile, excluding the border.
    ///
    /// Builders only keep triangles whose centroid lies in here, so that a triangle
    /// overlapping several tiles ends up in exactly one of them.
    pub interior: Aabb3d,
    /// The vertex positions in world space.
    pub vertices: Vec<Vec3A>,
    /// The triangles. `None` means the vertices form a flat triangle list,
    /// i.e. every three consecutive vertices are a triangle.
    pub indices: Option<Vec<UVec3>>,
    /// The area type of each triangle. May be empty, in which case every triangle is
    /// treated as [`AreaType::NOT_WALKABLE`] and left to the builder to classify.
    pub area_types: Vec<AreaType>,
}

impl TileGeometry {
    /// Wraps a whole trimesh into a single tile whose bounds are the trimesh's AABB.
    /// Returns `None` for an empty trimesh.
    pub fn from_trimesh(coord: UVec2, trimesh: TriMesh) -> Option<Self> {
        let aabb = trimesh.compute_aabb()?;
        Some(Self {
            coord,
            bounds: aabb,
            // Centroids of triangles with any xz extent lie strictly below the max.
            interior: aabb,
            vertices: trimesh.vertices,
            indices: Some(trimesh.indices),
            area_types: trimesh.area_types,
        })
    }

    /// Number of triangles described by the geometry, whether indexed or not.
    pub fn triangle_count(&self) -> usize {
        match &self.indices {
            Some(indices) => indices.len(),
            None => self.vertices.len() / 3,
        }
    }

    /// Whether the geometry contains no triangles at all.
    pub fn is_empty(&self) -> bool {
        self.triangle_count() == 0
    }
}

/// Supplies the geometry a navmesh is built from.
///
/// Implementations are queried from whichever thread runs the build, so they must be thread safe.
pub trait GeometryProvider: Send + Sync {
    /// Collects the world geometry, split into square tiles of `tile_size` world units.
    /// Each tile additionally includes geometry up to `border_size` into its neighbours.
    ///
    /// A `tile_size <= 0` yields no tiles. This is not an error.
    fn collect(&self, tile_size: f32, border_size: f32) -> Vec<TileGeometry>;
}

impl<F> GeometryProvider for F
where
    F: Fn(f32, f32) -> Vec<TileGeometry> + Send + Sync,
{
    fn collect(&self, tile_size: f32, border_size: f32) -> Vec<TileGeometry> {
        self(tile_size, border_size)
    }
}

/// A piece of world geometry that affects the navmesh.
#[derive(Debug, Clone, PartialEq)]
pub struct Affector {
    /// Local-to-world transform of the geometry.
    pub transform: Affine3A,
    /// The geometry in local space.
    pub trimesh: TriMesh,
}

/// A [`GeometryProvider`] backed by a list of [`Affector`]s, typically created from colliders.
///
/// The list can be edited at any time; a running build works on the affectors it saw
/// when it started collecting.
#[derive(Debug, Default)]
pub struct AffectorGeometry {
    affectors: RwLock<Vec<Affector>>,
}

impl AffectorGeometry {
    /// Creates an empty geometry source.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a trimesh placed at `transform`.
    ///
    /// Returns `false` and leaves the geometry untouched if a triangle references a vertex
    /// the trimesh does not have.
    pub fn insert(&self, transform: Affine3A, trimesh: TriMesh) -> bool {
        if let Some(triangle) = trimesh.find_invalid_triangle() {
            warn!(
                triangle,
                vertices = trimesh.vertices.len(),
                "Trimesh references a missing vertex. Skipping."
            );
            return false;
        }
        self.write().push(Affector { transform, trimesh });
        true
    }

    /// Adds a collider placed at `transform`.
    ///
    /// Returns `false` if the collider cannot be converted into valid triangles.
    /// Such a collider simply does not contribute to the navmesh.
    pub fn insert_collider(
        &self,
        transform: Affine3A,
        collider: &ColliderShape,
        subdivisions: u32,
    ) -> bool {
        let Some(trimesh) = collider.to_trimesh(subdivisions) else {
            warn!("Failed to convert collider to trimesh. Skipping.");
            return false;
        };
        self.insert(transform, trimesh)
    }

    /// Removes all affectors.
    pub fn clear(&self) {
        self.write().clear();
    }

    /// Number of affectors.
    pub fn len(&self) -> usize {
        self.read().len()
    }

    /// Whether there are no affectors.
    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    /// Combines all affectors into a single world-space trimesh.
    pub fn world_trimesh(&self) -> TriMesh {
        self.read()
            .iter()
            .fold(TriMesh::default(), |mut world, affector| {
                let mut trimesh = affector.trimesh.clone();
                trimesh.transform(&affector.transform);
                world.extend(trimesh);
                world
            })
    }

    /// Computes the world-space AABB of all affectors.
    /// Returns `None` if there is no geometry.
    pub fn compute_aabb(&self) -> Option<Aabb3d> {
        self.world_trimesh().compute_aabb()
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, Vec<Affector>> {
        self.affectors.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, Vec<Affector>> {
        self.affectors.write().unwrap_or_else(PoisonError::into_inner)
    }
}

impl GeometryProvider for AffectorGeometry {
    fn collect(&self, tile_size: f32, border_size: f32) -> Vec<TileGeometry> {
        let world = self.world_trimesh();
        split_into_tiles(&world, tile_size, border_size)
    }
}

/// A [`GeometryProvider`] that serves a fixed, already tiled set of geometry.
///
/// The tile size requested by the build is ignored, except that a size `<= 0`
/// still yields nothing.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FlatGeometry(pub Vec<TileGeometry>);

impl GeometryProvider for FlatGeometry {
    fn collect(&self, tile_size: f32, _border_size: f32) -> Vec<TileGeometry> {
        if !(tile_size > 0.0) {
            return Vec::new();
        }
        self.0.clone()
    }
}

/// Splits a world-space trimesh into square tiles on the xz-plane.
///
/// The tile grid starts at the trimesh's AABB minimum. Only tiles that receive at least one
/// triangle are returned, ordered by z, then x. A triangle is handed to every tile whose
/// bounds, grown by `border_size`, overlap the triangle's bounds.
pub fn split_into_tiles(trimesh: &TriMesh, tile_size: f32, border_size: f32) -> Vec<TileGeometry> {
    // Also catches NaN
    if !(tile_size > 0.0) {
        debug!("Tile size {tile_size} is not positive, collecting no geometry.");
        return Vec::new();
    }
    let border_size = border_size.max(0.0);
    let Some(aabb) = trimesh.compute_aabb() else {
        return Vec::new();
    };

    let size = aabb.size();
    let tiles_x = ((size.x / tile_size).ceil() as u64).max(1);
    let tiles_z = ((size.z / tile_size).ceil() as u64).max(1);
    if tiles_x.saturating_mul(tiles_z) > MAX_TILES {
        warn!(
            "Tile size {tile_size} would split the world into {tiles_x}x{tiles_z} tiles, \
             more than the maximum of {MAX_TILES}. Collecting no geometry."
        );
        return Vec::new();
    }
    let (tiles_x, tiles_z) = (tiles_x as u32, tiles_z as u32);

    let tile_index = |value: f32, origin: f32, count: u32| -> u32 {
        (((value - origin) / tile_size).floor().max(0.0) as u32).min(count - 1)
    };

    let vertex_count = trimesh.vertices.len();
    let mut buckets: BTreeMap<(u32, u32), TileBucket> = BTreeMap::new();
    for (i, indices) in trimesh.indices.iter().enumerate() {
        if indices.max_element() as usize >= vertex_count {
            warn!(
                triangle = i,
                vertex_count,
                "Triangle references a missing vertex. Skipping."
            );
            continue;
        }
        let triangle_aabb = indices.vertices(&trimesh.vertices).aabb().expand_xz(border_size);
        let min_x = tile_index(triangle_aabb.min.x, aabb.min.x, tiles_x);
        let max_x = tile_index(triangle_aabb.max.x, aabb.min.x, tiles_x);
        let min_z = tile_index(triangle_aabb.min.z, aabb.min.z, tiles_z);
        let max_z = tile_index(triangle_aabb.max.z, aabb.min.z, tiles_z);
        let area = trimesh.area_types.get(i).copied().unwrap_or_default();
        for z in min_z..=max_z {
            for x in min_x..=max_x {
                buckets
                    .entry((z, x))
                    .or_default()
                    .push(trimesh, *indices, area);
            }
        }
    }

    buckets
        .into_iter()
        .map(|((z, x), bucket)| {
            let interior_min = Vec3A::new(
                aabb.min.x + x as f32 * tile_size,
                aabb.min.y,
                aabb.min.z + z as f32 * tile_size,
            );
            let mut interior_max = Vec3A::new(
                aabb.min.x + (x + 1) as f32 * tile_size,
                aabb.max.y,
                aabb.min.z + (z + 1) as f32 * tile_size,
            );
            // the last row and column own everything up to the world's edge
            if x + 1 == tiles_x {
                interior_max.x = interior_max.x.max(aabb.max.x);
            }
            if z + 1 == tiles_z {
                interior_max.z = interior_max.z.max(aabb.max.z);
            }
            let interior = Aabb3d {
                min: interior_min,
                max: interior_max,
            };
            TileGeometry {
                coord: UVec2::new(x, z),
                bounds: interior.expand_xz(border_size),
                interior,
                vertices: bucket.vertices,
                indices: Some(bucket.indices),
                area_types: bucket.area_types,
            }
        })
        .collect()
}

#[derive(Default)]
struct TileBucket {
    remap: HashMap<u32, u32>,
    vertices: Vec<Vec3A>,
    indices: Vec<UVec3>,
    area_types: Vec<AreaType>,
}

impl TileBucket {
    fn push(&mut self, trimesh: &TriMesh, indices: UVec3, area: AreaType) {
        let local = indices.to_array().map(|index| {
            *self.remap.entry(index).or_insert_with(|| {
                self.vertices.push(trimesh.vertices[index as usize]);
                (self.vertices.len() - 1) as u32
            })
        });
        self.indices.push(UVec3::from_array(local));
        self.area_types.push(area);
    }
}
