//! Settings for building and querying navmeshes.

use glam::Vec3A;
use thiserror::Error;

/// Specifies the settings to use when building and querying a tiled navmesh.
///
/// The default values are chosen to be reasonable for an agent resembling an adult human,
/// assuming a world that uses meters as units.
///
/// Settings are never rejected by the build itself: a non-positive `tile_size` is a
/// legitimate request for an empty navmesh. Use [`NavmeshSettings::validate`] to catch
/// values that are most likely mistakes.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serialize", serde(default))]
pub struct NavmeshSettings {
    /// The width/depth of a tile on the xz-plane. `[Limit: > 0] [Units: wu]`
    ///
    /// Smaller tiles mean less work per tile and more tiles overall.
    /// A value `<= 0` yields an empty navmesh.
    pub tile_size: f32,

    /// The distance by which the geometry gathered for a tile reaches into its neighbours. `[Limit: >= 0] [Units: wu]`
    ///
    /// Triangles are still owned by exactly one tile; the border only controls which
    /// geometry a builder gets to see.
    pub border_size: f32,

    /// Settings forwarded to the [`TileBuilder`](crate::TileBuilder).
    pub build: TileBuildConfig,

    /// Settings used by the [`NavMeshQuery`](crate::NavMeshQuery) of every published navmesh.
    pub query: QueryConfig,
}

impl Default for NavmeshSettings {
    fn default() -> Self {
        Self {
            // 32 cells of 0.3 wu
            tile_size: 9.6,
            // agent radius plus a few cells of padding
            border_size: 1.5,
            build: TileBuildConfig::default(),
            query: QueryConfig::default(),
        }
    }
}

impl NavmeshSettings {
    /// Checks the settings for values that are almost certainly mistakes.
    pub fn validate(&self) -> Result<(), SettingsError> {
        if !self.tile_size.is_finite() {
            return Err(SettingsError::NonFiniteTileSize(self.tile_size));
        }
        if !self.border_size.is_finite() || self.border_size < 0.0 {
            return Err(SettingsError::InvalidBorderSize(self.border_size));
        }
        self.build.validate()?;
        self.query.validate()
    }
}

/// Parameters of a single tile build.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serialize", serde(default))]
pub struct TileBuildConfig {
    /// The maximum slope that is considered walkable. `[Limits: 0 <= value < 0.5*π] [Units: Radians]`
    ///
    /// Triangles whose normal differs from the up axis by more than this are dropped.
    pub walkable_slope_angle: f32,

    /// Triangles with a smaller area are considered degenerate and dropped. `[Limit: >= 0] [Units: wu²]`
    pub min_triangle_area: f32,
}

impl Default for TileBuildConfig {
    fn default() -> Self {
        Self {
            walkable_slope_angle: 45.0_f32.to_radians(),
            min_triangle_area: 1e-6,
        }
    }
}

impl TileBuildConfig {
    /// Checks the config for values that are almost certainly mistakes.
    pub fn validate(&self) -> Result<(), SettingsError> {
        if !(0.0..std::f32::consts::FRAC_PI_2).contains(&self.walkable_slope_angle) {
            return Err(SettingsError::InvalidSlope(self.walkable_slope_angle));
        }
        if !self.min_triangle_area.is_finite() || self.min_triangle_area < 0.0 {
            return Err(SettingsError::InvalidMinTriangleArea(self.min_triangle_area));
        }
        Ok(())
    }
}

/// Parameters of path queries.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serialize", serde(default))]
pub struct QueryConfig {
    /// Half extents of the box searched around a point when locating it on the navmesh. `[Limit: > 0] [Units: wu]`
    ///
    /// The vertical extent is usually the largest, so that points slightly above or
    /// inside the walkable surface are still found.
    pub search_extents: Vec3A,

    /// The maximum number of polygons a single path search may expand. `[Limit: > 0]`
    pub max_nodes: usize,
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            search_extents: Vec3A::new(2.0, 4.0, 2.0),
            max_nodes: 2048,
        }
    }
}

impl QueryConfig {
    /// Checks the config for values that are almost certainly mistakes.
    pub fn validate(&self) -> Result<(), SettingsError> {
        if !self.search_extents.is_finite() || self.search_extents.cmple(Vec3A::ZERO).any() {
            return Err(SettingsError::InvalidSearchExtents(self.search_extents));
        }
        if self.max_nodes == 0 {
            return Err(SettingsError::ZeroMaxNodes);
        }
        Ok(())
    }
}

/// Errors returned by [`NavmeshSettings::validate`].
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SettingsError {
    /// The tile size is NaN or infinite.
    #[error("Tile size must be finite, got {0}")]
    NonFiniteTileSize(f32),
    /// The border size is negative or not finite.
    #[error("Border size must be finite and >= 0, got {0}")]
    InvalidBorderSize(f32),
    /// The walkable slope angle is out of range.
    #[error("Walkable slope angle must be in [0, π/2) radians, got {0}")]
    InvalidSlope(f32),
    /// The minimum triangle area is negative or not finite.
    #[error("Minimum triangle area must be finite and >= 0, got {0}")]
    InvalidMinTriangleArea(f32),
    /// At least one search extent is not positive.
    #[error("Search extents must be finite and > 0, got {0}")]
    InvalidSearchExtents(Vec3A),
    /// The node budget is zero.
    #[error("The node budget of a path search must be > 0")]
    ZeroMaxNodes,
}
