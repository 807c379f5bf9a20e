//! Area ids attached to triangles and polygons.

/// The area id of a triangle or polygon.
///
/// Id 0 is reserved for geometry that cannot be walked on. Any other id marks walkable geometry;
/// hosts may use distinct ids to tag surfaces (water, road, ...).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub struct AreaType(pub u8);

impl From<u8> for AreaType {
    fn from(value: u8) -> Self {
        AreaType(value)
    }
}

impl AreaType {
    /// The area type 0. Triangles with this area type are not walkable.
    pub const NOT_WALKABLE: Self = Self(0);
    /// Default area type for walkable triangles.
    pub const DEFAULT_WALKABLE: Self = Self(63);

    /// Whether the area can be walked on.
    #[inline]
    pub fn is_walkable(self) -> bool {
        self != Self::NOT_WALKABLE
    }
}
