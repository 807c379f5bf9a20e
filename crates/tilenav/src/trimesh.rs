//! Triangle meshes used as navmesh input, and the conversion of collider shapes into them.

use std::f32::consts::TAU;

use glam::{Affine3A, UVec3, Vec3A};

use crate::{area::AreaType, math::Aabb3d};

/// An indexed triangle mesh. This is what colliders are turned into before being tiled.
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub struct TriMesh {
    /// The vertices composing the mesh.
    /// Follows the convention of a triangle list.
    pub vertices: Vec<Vec3A>,

    /// The indices composing the mesh.
    /// Follows the convention of a triangle list.
    pub indices: Vec<UVec3>,

    /// The area types of the trimesh. Each index corresponds 1:1 to the [`TriMesh::indices`].
    pub area_types: Vec<AreaType>,
}

impl TriMesh {
    /// Extends the trimesh with the vertices and indices of another trimesh.
    /// The indices of `other` will be offset by the number of vertices in `self`.
    pub fn extend(&mut self, other: TriMesh) {
        assert!(
            self.vertices.len() + other.vertices.len() <= u32::MAX as usize,
            "Cannot extend a trimesh beyond 2^32 vertices"
        );
        let next_vertex_index = self.vertices.len() as u32;
        self.vertices.extend(other.vertices);
        self.indices
            .extend(other.indices.iter().map(|i| *i + next_vertex_index));
        self.area_types.extend(other.area_types);
    }

    /// Computes the AABB of the trimesh.
    /// Returns `None` if the trimesh is empty.
    pub fn compute_aabb(&self) -> Option<Aabb3d> {
        Aabb3d::from_verts(&self.vertices)
    }

    /// Applies a transform to every vertex of the trimesh.
    pub fn transform(&mut self, transform: &Affine3A) {
        self.vertices.iter_mut().for_each(|v| {
            *v = transform.transform_point3a(*v);
        });
    }

    /// Returns the index of the first triangle that references a vertex past the end of
    /// [`TriMesh::vertices`], if any.
    pub fn find_invalid_triangle(&self) -> Option<usize> {
        let vertex_count = self.vertices.len();
        self.indices
            .iter()
            .position(|indices| indices.max_element() as usize >= vertex_count)
    }
}

/// A physics-agnostic description of a collider shape.
///
/// Hosts translate their physics engine's colliders into this before handing them to
/// [`AffectorGeometry`](crate::AffectorGeometry).
#[derive(Debug, Clone, PartialEq)]
pub enum ColliderShape {
    /// A box centered on the origin.
    Cuboid {
        /// Half of the box's extent along each axis.
        half_extents: Vec3A,
    },
    /// A cylinder centered on the origin, aligned with the y-axis.
    Cylinder {
        /// Half of the cylinder's height.
        half_height: f32,
        /// The cylinder's radius.
        radius: f32,
    },
    /// A single triangle.
    Triangle([Vec3A; 3]),
    /// An arbitrary triangle mesh.
    TriMesh {
        /// The vertices of the mesh.
        vertices: Vec<Vec3A>,
        /// The triangles of the mesh.
        indices: Vec<UVec3>,
    },
    /// A set of shapes, each with its own local transform.
    Compound(Vec<(Affine3A, ColliderShape)>),
    /// An infinite plane. Cannot be turned into a trimesh.
    HalfSpace {
        /// The outward normal of the plane.
        normal: Vec3A,
    },
}

/// Convenience trait that allows a collider to be converted into a [`TriMesh`].
pub trait ToTriMesh {
    /// Converts the collider into a [`TriMesh`].
    ///
    /// # Arguments
    ///
    /// * `subdivisions` - The number of subdivisions to use for curved shapes such as cylinders.
    ///
    /// # Returns
    ///
    /// A [`TriMesh`] if the shape is supported, otherwise `None`.
    /// [`ColliderShape::HalfSpace`] is not supported.
    /// All triangles are wound so that their normals point out of the shape.
    fn to_trimesh(&self, subdivisions: u32) -> Option<TriMesh>;
}

impl ToTriMesh for ColliderShape {
    fn to_trimesh(&self, subdivisions: u32) -> Option<TriMesh> {
        let (vertices, indices) = match self {
            ColliderShape::Cuboid { half_extents } => cuboid(*half_extents),
            ColliderShape::Cylinder {
                half_height,
                radius,
            } => cylinder(*half_height, *radius, subdivisions),
            ColliderShape::Triangle(triangle) => (triangle.to_vec(), vec![UVec3::new(0, 1, 2)]),
            ColliderShape::TriMesh { vertices, indices } => (vertices.clone(), indices.clone()),
            ColliderShape::Compound(shapes) => {
                return Some(compound_trimesh(shapes, subdivisions));
            }
            ColliderShape::HalfSpace { .. } => return None,
        };
        let indices_len = indices.len();
        Some(TriMesh {
            vertices,
            indices,
            area_types: vec![AreaType::NOT_WALKABLE; indices_len],
        })
    }
}

fn cuboid(half_extents: Vec3A) -> (Vec<Vec3A>, Vec<UVec3>) {
    let [x, y, z] = half_extents.to_array();
    let vertices = vec![
        Vec3A::new(-x, -y, -z),
        Vec3A::new(x, -y, -z),
        Vec3A::new(x, y, -z),
        Vec3A::new(-x, y, -z),
        Vec3A::new(-x, -y, z),
        Vec3A::new(x, -y, z),
        Vec3A::new(x, y, z),
        Vec3A::new(-x, y, z),
    ];
    let indices = [
        // top
        [3, 7, 6],
        [3, 6, 2],
        // bottom
        [0, 1, 5],
        [0, 5, 4],
        // +z
        [4, 5, 6],
        [4, 6, 7],
        // -z
        [0, 2, 1],
        [0, 3, 2],
        // +x
        [1, 2, 6],
        [1, 6, 5],
        // -x
        [0, 4, 7],
        [0, 7, 3],
    ]
    .into_iter()
    .map(UVec3::from_array)
    .collect();
    (vertices, indices)
}

fn cylinder(half_height: f32, radius: f32, subdivisions: u32) -> (Vec<Vec3A>, Vec<UVec3>) {
    let segments = subdivisions.max(3);
    let mut vertices = Vec::with_capacity(segments as usize * 2 + 2);
    for i in 0..segments {
        let angle = TAU * i as f32 / segments as f32;
        let (sin, cos) = angle.sin_cos();
        vertices.push(Vec3A::new(radius * cos, half_height, radius * sin));
        vertices.push(Vec3A::new(radius * cos, -half_height, radius * sin));
    }
    let top_center = vertices.len() as u32;
    vertices.push(Vec3A::new(0.0, half_height, 0.0));
    let bottom_center = top_center + 1;
    vertices.push(Vec3A::new(0.0, -half_height, 0.0));

    let mut indices = Vec::with_capacity(segments as usize * 4);
    for i in 0..segments {
        let next = (i + 1) % segments;
        let (top, bottom) = (i * 2, i * 2 + 1);
        let (next_top, next_bottom) = (next * 2, next * 2 + 1);
        indices.push(UVec3::new(top_center, next_top, top));
        indices.push(UVec3::new(bottom_center, bottom, next_bottom));
        indices.push(UVec3::new(bottom, top, next_top));
        indices.push(UVec3::new(bottom, next_top, next_bottom));
    }
    (vertices, indices)
}

fn compound_trimesh(shapes: &[(Affine3A, ColliderShape)], subdivisions: u32) -> TriMesh {
    shapes
        .iter()
        .fold(TriMesh::default(), |mut compound, (transform, shape)| {
            let Some(mut trimesh) = shape.to_trimesh(subdivisions) else {
                return compound;
            };
            trimesh.transform(transform);
            compound.extend(trimesh);
            compound
        })
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;

    use super::*;
    use crate::math::{TriangleIndices as _, TriangleVertices as _};

    #[test]
    fn converts_cuboid() {
        let collider = ColliderShape::Cuboid {
            half_extents: Vec3A::new(1.0, 2.0, 3.0),
        };
        let trimesh = collider.to_trimesh(1).unwrap();
        assert_eq!(trimesh.vertices.len(), 8);
        assert_eq!(trimesh.indices.len(), 12);
        assert_eq!(trimesh.area_types.len(), 12);
    }

    #[test]
    fn cuboid_triangles_face_outward() {
        let collider = ColliderShape::Cuboid {
            half_extents: Vec3A::ONE,
        };
        let trimesh = collider.to_trimesh(1).unwrap();
        for indices in &trimesh.indices {
            let triangle = indices.vertices(&trimesh.vertices);
            let normal = triangle.normal();
            assert!(
                normal.dot(triangle.centroid()) > 0.0,
                "triangle {indices} faces inward"
            );
        }
    }

    #[test]
    fn finds_triangles_referencing_missing_vertices() {
        let collider = ColliderShape::Cuboid {
            half_extents: Vec3A::ONE,
        };
        let mut trimesh = collider.to_trimesh(1).unwrap();
        assert_eq!(trimesh.find_invalid_triangle(), None);
        trimesh.indices.push(UVec3::new(0, 1, 8));
        assert_eq!(trimesh.find_invalid_triangle(), Some(12));
    }

    #[test]
    fn cylinder_triangles_face_outward() {
        let collider = ColliderShape::Cylinder {
            half_height: 1.0,
            radius: 2.0,
        };
        let trimesh = collider.to_trimesh(8).unwrap();
        assert_eq!(trimesh.vertices.len(), 18);
        assert_eq!(trimesh.indices.len(), 32);
        for indices in &trimesh.indices {
            let triangle = indices.vertices(&trimesh.vertices);
            assert!(triangle.normal().dot(triangle.centroid()) > 0.0);
        }
    }

    #[test]
    fn half_space_is_not_supported() {
        let collider = ColliderShape::HalfSpace { normal: Vec3A::Y };
        assert!(collider.to_trimesh(1).is_none());
    }

    #[test]
    fn compound_applies_child_transforms() {
        let cuboid = ColliderShape::Cuboid {
            half_extents: Vec3A::splat(0.5),
        };
        let collider = ColliderShape::Compound(vec![
            (Affine3A::from_translation([10.0, 0.0, 0.0].into()), cuboid.clone()),
            (Affine3A::IDENTITY, ColliderShape::HalfSpace { normal: Vec3A::Y }),
            (Affine3A::from_translation([-10.0, 0.0, 0.0].into()), cuboid),
        ]);
        let trimesh = collider.to_trimesh(1).unwrap();
        assert_eq!(trimesh.vertices.len(), 16);
        assert_eq!(trimesh.indices.len(), 24);
        assert!(trimesh.indices.iter().all(|i| i.max_element() < 16));
        let aabb = trimesh.compute_aabb().unwrap();
        assert_relative_eq!(aabb.min.x, -10.5);
        assert_relative_eq!(aabb.max.x, 10.5);
    }
}
