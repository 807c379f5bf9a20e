//! Geometric helpers shared by tiling, tile building and path queries.
//!
//! Everything here works in world units with +Y as the up axis. "xz" helpers
//! project onto the ground plane and ignore height.

use glam::{UVec3, Vec3A};

/// An axis-aligned bounding box in world units.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub struct Aabb3d {
    /// The minimum corner.
    pub min: Vec3A,
    /// The maximum corner.
    pub max: Vec3A,
}

impl Aabb3d {
    /// Creates an AABB from its center and half size.
    #[inline]
    pub fn new(center: impl Into<Vec3A>, half_size: impl Into<Vec3A>) -> Self {
        let center = center.into();
        let half_size = half_size.into();
        Self {
            min: center - half_size,
            max: center + half_size,
        }
    }

    /// Computes the AABB enclosing all given vertices.
    /// Returns `None` if `verts` is empty.
    pub fn from_verts(verts: &[Vec3A]) -> Option<Self> {
        let mut iter = verts.iter();
        let first = *iter.next()?;
        let (min, max) = iter.fold((first, first), |(min, max), point| {
            (point.min(min), point.max(max))
        });
        Some(Self { min, max })
    }

    /// The smallest AABB containing both `self` and `other`.
    #[inline]
    pub fn merge(&self, other: &Self) -> Self {
        Self {
            min: self.min.min(other.min),
            max: self.max.max(other.max),
        }
    }

    /// The extent of the AABB along each axis.
    #[inline]
    pub fn size(&self) -> Vec3A {
        self.max - self.min
    }

    /// Grows the AABB by `amount` on the x and z axes. Height is left untouched.
    #[inline]
    pub fn expand_xz(&self, amount: f32) -> Self {
        let offset = Vec3A::new(amount, 0.0, amount);
        Self {
            min: self.min - offset,
            max: self.max + offset,
        }
    }

    /// Whether the two AABBs overlap, touching boundaries included.
    #[inline]
    pub fn intersects(&self, other: &Self) -> bool {
        self.min.cmple(other.max).all() && other.min.cmple(self.max).all()
    }

    /// Whether the projections of the two AABBs onto the xz-plane overlap.
    #[inline]
    pub fn intersects_xz(&self, other: &Self) -> bool {
        self.min.x <= other.max.x
            && other.min.x <= self.max.x
            && self.min.z <= other.max.z
            && other.min.z <= self.max.z
    }

    /// Half-open containment test on the xz-plane: `min <= p < max`.
    ///
    /// Adjacent tiles share their boundary, so a point on it belongs to exactly one of them.
    #[inline]
    pub fn contains_xz_half_open(&self, point: Vec3A) -> bool {
        point.x >= self.min.x
            && point.x < self.max.x
            && point.z >= self.min.z
            && point.z < self.max.z
    }
}

pub(crate) trait TriangleIndices {
    fn vertices(&self, vertices: &[Vec3A]) -> [Vec3A; 3];
}

impl TriangleIndices for UVec3 {
    #[inline]
    fn vertices(&self, vertices: &[Vec3A]) -> [Vec3A; 3] {
        [
            vertices[self[0] as usize],
            vertices[self[1] as usize],
            vertices[self[2] as usize],
        ]
    }
}

pub(crate) trait TriangleVertices {
    fn aabb(&self) -> Aabb3d;
    fn normal(&self) -> Vec3A;
    fn centroid(&self) -> Vec3A;
    fn area(&self) -> f32;
}

impl TriangleVertices for [Vec3A; 3] {
    #[inline]
    fn aabb(&self) -> Aabb3d {
        let min = self[0].min(self[1]).min(self[2]);
        let max = self[0].max(self[1]).max(self[2]);
        Aabb3d { min, max }
    }

    #[inline]
    fn normal(&self) -> Vec3A {
        let ab = self[1] - self[0];
        let ac = self[2] - self[0];
        ab.cross(ac).normalize_or_zero()
    }

    #[inline]
    fn centroid(&self) -> Vec3A {
        (self[0] + self[1] + self[2]) / 3.0
    }

    #[inline]
    fn area(&self) -> f32 {
        let ab = self[1] - self[0];
        let ac = self[2] - self[0];
        ab.cross(ac).length() * 0.5
    }
}

/// Twice the signed area of the triangle `abc` projected onto the xz-plane.
///
/// Positive when `abc` is wound the same way as an upward facing triangle.
#[inline]
pub fn tri_area_2d(a: Vec3A, b: Vec3A, c: Vec3A) -> f32 {
    let ab_x = b.x - a.x;
    let ab_z = b.z - a.z;
    let ac_x = c.x - a.x;
    let ac_z = c.z - a.z;
    ac_x * ab_z - ab_x * ac_z
}

/// Returns the height of the triangle at the xz-position of `point`,
/// or `None` if the point lies outside the triangle's xz-projection.
pub fn triangle_height_at(triangle: &[Vec3A; 3], point: Vec3A) -> Option<f32> {
    const EPSILON: f32 = 1e-6;
    let [a, b, c] = *triangle;
    let v0 = c - a;
    let v1 = b - a;
    let v2 = point - a;

    let denom = v0.x * v1.z - v0.z * v1.x;
    if denom.abs() < EPSILON {
        return None;
    }
    let u = (v1.z * v2.x - v1.x * v2.z) / denom;
    let v = (v0.x * v2.z - v0.z * v2.x) / denom;

    if u >= -EPSILON && v >= -EPSILON && u + v <= 1.0 + EPSILON {
        Some(a.y + v0.y * u + v1.y * v)
    } else {
        None
    }
}

/// Closest point to `point` on the segment `a`-`b`, measured on the xz-plane.
/// The height of the result is interpolated along the segment.
pub fn closest_point_on_segment_xz(point: Vec3A, a: Vec3A, b: Vec3A) -> Vec3A {
    let dx = b.x - a.x;
    let dz = b.z - a.z;
    let length_squared = dx * dx + dz * dz;
    let t = if length_squared > 0.0 {
        (((point.x - a.x) * dx + (point.z - a.z) * dz) / length_squared).clamp(0.0, 1.0)
    } else {
        0.0
    };
    a + (b - a) * t
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;

    use super::*;

    fn up_triangle() -> [Vec3A; 3] {
        [
            Vec3A::new(0.0, 1.0, 0.0),
            Vec3A::new(0.0, 1.0, 2.0),
            Vec3A::new(2.0, 1.0, 0.0),
        ]
    }

    #[test]
    fn up_facing_triangle_has_positive_y_normal_and_area() {
        let triangle = up_triangle();
        assert_relative_eq!(triangle.normal().y, 1.0);
        assert!(tri_area_2d(triangle[0], triangle[1], triangle[2]) > 0.0);
        assert_relative_eq!(triangle.area(), 2.0);
    }

    #[test]
    fn height_is_found_inside_the_projection_only() {
        let triangle = up_triangle();
        assert_eq!(
            triangle_height_at(&triangle, Vec3A::new(0.5, -10.0, 0.5)),
            Some(1.0)
        );
        assert_eq!(triangle_height_at(&triangle, Vec3A::new(3.0, 1.0, 3.0)), None);
    }

    #[test]
    fn closest_point_on_segment_is_clamped() {
        let a = Vec3A::new(0.0, 0.0, 0.0);
        let b = Vec3A::new(2.0, 2.0, 0.0);
        let point = closest_point_on_segment_xz(Vec3A::new(5.0, 0.0, 1.0), a, b);
        assert_eq!(point, b);
        let point = closest_point_on_segment_xz(Vec3A::new(1.0, 0.0, 1.0), a, b);
        assert_relative_eq!(point.x, 1.0);
        assert_relative_eq!(point.y, 1.0);
    }

    #[test]
    fn half_open_containment_splits_shared_boundary() {
        let left = Aabb3d {
            min: Vec3A::new(0.0, 0.0, 0.0),
            max: Vec3A::new(1.0, 1.0, 1.0),
        };
        let right = Aabb3d {
            min: Vec3A::new(1.0, 0.0, 0.0),
            max: Vec3A::new(2.0, 1.0, 1.0),
        };
        let boundary = Vec3A::new(1.0, 0.5, 0.5);
        assert!(!left.contains_xz_half_open(boundary));
        assert!(right.contains_xz_half_open(boundary));
    }
}
