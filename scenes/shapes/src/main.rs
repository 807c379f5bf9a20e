//! A test scene that only uses primitive shapes.

use std::{
    sync::{Arc, mpsc},
    time::Duration,
};

use anyhow::{Context as _, bail};
use glam::{Affine3A, Vec3, Vec3A};
use tilenav::{AffectorGeometry, ColliderShape, NavmeshSettings, TriangleTileBuilder};
use tilenav_scheduler::{NavmeshEvent, NavmeshRegistry};
use tracing::info;
use tracing_subscriber::EnvFilter;

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let geometry = Arc::new(setup());
    let settings = NavmeshSettings {
        tile_size: 10.0,
        ..Default::default()
    };
    settings.validate().context("invalid navmesh settings")?;

    let registry = NavmeshRegistry::new();
    let navmesh = registry.spawn(
        settings,
        geometry.clone(),
        Arc::new(TriangleTileBuilder::default()),
    );

    let (sender, receiver) = mpsc::channel();
    navmesh.observe(move |event| {
        let _ = sender.send(*event);
    });

    // Ask twice; the second request joins the build started by the first one.
    navmesh.request_update_async();
    navmesh.request_update_async();

    loop {
        match receiver.recv_timeout(Duration::from_secs(30))? {
            NavmeshEvent::BuildStarted(id) => info!(?id, "Started building navmesh"),
            NavmeshEvent::Updated(id) => {
                info!(?id, "Navmesh is ready");
                break;
            }
        }
    }
    let report = navmesh
        .last_report()
        .context("navmesh was updated without a report")?;
    info!(?report, "Build report");

    let query = navmesh.path_query();
    let start = Vec3A::new(-20.0, 0.0, -20.0);
    let end = Vec3A::new(20.0, 0.0, 20.0);
    let path = query.try_find_path(start, end)?;
    if path.is_empty() {
        bail!("no path from {start} to {end}");
    }
    for (i, waypoint) in path.iter().enumerate() {
        info!("waypoint {i}: {waypoint}");
    }

    // Walking onto the tall cube is impossible: its top is not connected to the ground.
    let on_top = Vec3A::new(0.0, 2.0, 0.0);
    let unreachable = query.find_path(start, on_top);
    info!(
        reachable = !unreachable.is_empty(),
        "Path onto the top of the cube"
    );

    Ok(())
}

fn setup() -> AffectorGeometry {
    let geometry = AffectorGeometry::new();
    let shapes = [
        (
            "Ground",
            Affine3A::IDENTITY,
            ColliderShape::Cuboid {
                half_extents: Vec3A::new(25.0, 0.05, 25.0),
            },
        ),
        (
            "Cube",
            Affine3A::from_translation(Vec3::new(0.0, 1.0, 0.0)),
            ColliderShape::Cuboid {
                half_extents: Vec3A::new(1.5, 1.0, 0.5),
            },
        ),
        (
            "Cube",
            Affine3A::from_translation(Vec3::new(5.0, 1.0, 5.0)),
            ColliderShape::Cuboid {
                half_extents: Vec3A::new(0.5, 1.0, 1.5),
            },
        ),
        (
            "Cylinder",
            Affine3A::from_translation(Vec3::new(-5.0, 1.0, 5.0)),
            ColliderShape::Cylinder {
                half_height: 1.0,
                radius: 1.0,
            },
        ),
        (
            "Ramp",
            Affine3A::from_translation(Vec3::new(10.0, 0.5, -10.0))
                * Affine3A::from_rotation_z(20.0_f32.to_radians()),
            ColliderShape::Cuboid {
                half_extents: Vec3A::new(3.0, 0.1, 2.0),
            },
        ),
        (
            "Sky",
            Affine3A::IDENTITY,
            ColliderShape::HalfSpace { normal: Vec3A::NEG_Y },
        ),
    ];
    for (name, transform, shape) in shapes {
        if !geometry.insert_collider(transform, &shape, 16) {
            info!(name, "Skipped collider that cannot become navmesh geometry");
        }
    }
    geometry
}
