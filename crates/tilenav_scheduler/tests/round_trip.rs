//! From collider shapes to a path across the published navmesh.

mod common;

use std::sync::Arc;

use approx::assert_relative_eq;
use common::spawn_box;
use glam::{Affine3A, UVec3, Vec3A};
use tilenav::{
    AffectorGeometry, ColliderShape, NavmeshSettings, ToTriMesh as _, TriangleTileBuilder,
};
use tilenav_scheduler::{NavigationMesh, NavmeshRegistry};

const START: Vec3A = Vec3A::new(-0.5, 0.0, 0.5);
const END: Vec3A = Vec3A::new(0.5, 0.0, -0.5);

#[test]
fn a_box_becomes_a_walkable_navmesh() {
    let trimesh = ColliderShape::Cuboid {
        half_extents: Vec3A::ONE,
    }
    .to_trimesh(1)
    .unwrap();
    assert_eq!(trimesh.vertices.len(), 8);
    assert_eq!(trimesh.indices.len(), 12);

    let registry = NavmeshRegistry::new();
    let navmesh = spawn_box(&registry, Vec3A::ONE, NavmeshSettings::default());
    assert!(navmesh.request_update_blocking());
    {
        let guard = navmesh.handle().acquire_read();
        let mesh = guard.mesh().unwrap();
        assert_eq!(mesh.tile_count(), 1);
        // only the two triangles of the top face are walkable
        assert_eq!(mesh.polygon_count(), 2);
        assert!(mesh.polygons().iter().all(|polygon| polygon.bounds.min.y == 1.0));
    }

    let path = navmesh.path_query().find_path(START, END);
    assert_eq!(path.len(), 2);
    assert_relative_eq!(path[0].x, START.x);
    assert_relative_eq!(path[0].y, 1.0);
    assert_relative_eq!(path[0].z, START.z);
    assert_relative_eq!(path[1].x, END.x);
    assert_relative_eq!(path[1].y, 1.0);
    assert_relative_eq!(path[1].z, END.z);
}

#[test]
fn paths_cross_tile_boundaries() {
    let registry = NavmeshRegistry::new();
    let navmesh = spawn_box(
        &registry,
        Vec3A::ONE,
        NavmeshSettings {
            tile_size: 1.0,
            ..Default::default()
        },
    );
    assert!(navmesh.request_update_blocking());
    let report = navmesh.last_report().unwrap();
    assert_eq!(report.tiles_collected, 4);
    assert_eq!(report.tiles_built, 4);
    assert_eq!(report.polygons, 2);
    {
        let guard = navmesh.handle().acquire_read();
        let mesh = guard.mesh().unwrap();
        assert_ne!(mesh.polygons()[0].tile, mesh.polygons()[1].tile);
    }

    let path = navmesh.path_query().find_path(START, END);
    assert_eq!(path.len(), 2);
}

/// A flat grid of `size` x `size` unit cells at height 0, leaving out the given cells.
fn grid(size: u32, missing: impl Fn(u32, u32) -> bool) -> ColliderShape {
    let row = size + 1;
    let vertices = (0..row)
        .flat_map(|x| (0..row).map(move |z| Vec3A::new(x as f32, 0.0, z as f32)))
        .collect();
    let index = |x: u32, z: u32| x * row + z;
    let indices = (0..size)
        .flat_map(|x| (0..size).map(move |z| (x, z)))
        .filter(|(x, z)| !missing(*x, *z))
        .flat_map(|(x, z)| {
            let (v00, v01) = (index(x, z), index(x, z + 1));
            let (v11, v10) = (index(x + 1, z + 1), index(x + 1, z));
            [UVec3::new(v00, v01, v11), UVec3::new(v00, v11, v10)]
        })
        .collect();
    ColliderShape::TriMesh { vertices, indices }
}

fn spawn_grid(registry: &NavmeshRegistry, shape: &ColliderShape, tile_size: f32) -> NavigationMesh {
    let geometry = AffectorGeometry::new();
    assert!(geometry.insert_collider(Affine3A::IDENTITY, shape, 1));
    registry.spawn(
        NavmeshSettings {
            tile_size,
            border_size: 0.5,
            ..Default::default()
        },
        Arc::new(geometry),
        Arc::new(TriangleTileBuilder::default()),
    )
}

#[test]
fn open_grid_yields_a_straight_path() {
    let registry = NavmeshRegistry::new();
    let navmesh = spawn_grid(&registry, &grid(8, |_, _| false), 2.0);
    assert!(navmesh.request_update_blocking());
    let report = navmesh.last_report().unwrap();
    assert_eq!(report.tiles_built, 16);
    assert_eq!(report.polygons, 128);

    let start = Vec3A::new(0.5, 0.0, 0.5);
    let end = Vec3A::new(7.5, 0.0, 0.5);
    let path = navmesh.path_query().find_path(start, end);
    assert_eq!(path, vec![start, end]);
}

#[test]
fn paths_go_around_walls() {
    let registry = NavmeshRegistry::new();
    // a wall at x = 4 with a gap at the far end
    let navmesh = spawn_grid(&registry, &grid(8, |x, z| x == 4 && z < 7), 2.0);
    assert!(navmesh.request_update_blocking());

    let start = Vec3A::new(1.0, 0.0, 1.0);
    let end = Vec3A::new(7.0, 0.0, 1.0);
    let path = navmesh.path_query().find_path(start, end);
    assert!(path.len() > 2, "path {path:?} goes through the wall");
    assert_eq!(path[0], start);
    assert_eq!(*path.last().unwrap(), end);
    assert!(path.iter().any(|waypoint| waypoint.z >= 7.0 - 1e-3));
    let length: f32 = path.windows(2).map(|pair| pair[0].distance(pair[1])).sum();
    assert!(length > start.distance(end) + 5.0);
}
