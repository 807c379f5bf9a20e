//! The default [`PathSolver`]: A* over polygon adjacency followed by string pulling.

use std::{cmp::Ordering, collections::BinaryHeap};

use glam::Vec3A;

use crate::{
    math::tri_area_2d,
    navmesh::{NavMesh, PolyRef},
    query::{PathEndpoint, PathError, PathSolver},
};

/// Finds the corridor of polygons with A*, using the distance between polygon centers as cost,
/// then straightens it with the funnel algorithm.
#[derive(Debug, Clone, Copy, Default)]
#[non_exhaustive]
pub struct AStarSolver;

impl PathSolver for AStarSolver {
    fn solve(
        &self,
        mesh: &NavMesh,
        start: PathEndpoint,
        end: PathEndpoint,
        max_nodes: usize,
    ) -> Result<Vec<Vec3A>, PathError> {
        let corridor = find_corridor(mesh, start, end, max_nodes)?;
        let portals = portals(mesh, &corridor, start.position, end.position);
        Ok(string_pull(&portals))
    }
}

#[derive(Debug, Clone, Copy)]
struct OpenNode {
    estimate: f32,
    polygon: PolyRef,
}

impl PartialEq for OpenNode {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for OpenNode {}

impl PartialOrd for OpenNode {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for OpenNode {
    // reversed so that the binary heap pops the lowest estimate first
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .estimate
            .total_cmp(&self.estimate)
            .then_with(|| other.polygon.cmp(&self.polygon))
    }
}

fn find_corridor(
    mesh: &NavMesh,
    start: PathEndpoint,
    end: PathEndpoint,
    max_nodes: usize,
) -> Result<Vec<PolyRef>, PathError> {
    if start.polygon == end.polygon {
        return Ok(vec![start.polygon]);
    }
    let polygons = mesh.polygons();
    let position = |polygon: PolyRef| {
        if polygon == start.polygon {
            start.position
        } else if polygon == end.polygon {
            end.position
        } else {
            polygons[polygon.index()].centroid()
        }
    };

    let mut cost = vec![f32::INFINITY; polygons.len()];
    let mut parent: Vec<Option<PolyRef>> = vec![None; polygons.len()];
    let mut closed = vec![false; polygons.len()];
    let mut open = BinaryHeap::new();

    cost[start.polygon.index()] = 0.0;
    open.push(OpenNode {
        estimate: start.position.distance(end.position),
        polygon: start.polygon,
    });

    let mut expanded = 0;
    while let Some(OpenNode { polygon, .. }) = open.pop() {
        if closed[polygon.index()] {
            continue;
        }
        if polygon == end.polygon {
            let mut corridor = vec![polygon];
            let mut current = polygon;
            while let Some(previous) = parent[current.index()] {
                corridor.push(previous);
                current = previous;
            }
            corridor.reverse();
            return Ok(corridor);
        }
        if expanded >= max_nodes {
            return Err(PathError::NodeBudgetExhausted { max_nodes });
        }
        expanded += 1;
        closed[polygon.index()] = true;

        let from = position(polygon);
        for neighbour in polygons[polygon.index()].neighbours.iter().flatten() {
            if closed[neighbour.index()] {
                continue;
            }
            let to = position(*neighbour);
            let neighbour_cost = cost[polygon.index()] + from.distance(to);
            if neighbour_cost < cost[neighbour.index()] {
                cost[neighbour.index()] = neighbour_cost;
                parent[neighbour.index()] = Some(polygon);
                open.push(OpenNode {
                    estimate: neighbour_cost + to.distance(end.position),
                    polygon: *neighbour,
                });
            }
        }
    }
    Err(PathError::NoRoute {
        start: start.polygon,
        end: end.polygon,
    })
}

/// Returns the `(left, right)` portals along the corridor, framed by the start and end points.
fn portals(mesh: &NavMesh, corridor: &[PolyRef], start: Vec3A, end: Vec3A) -> Vec<(Vec3A, Vec3A)> {
    let polygons = mesh.polygons();
    let mut portals = Vec::with_capacity(corridor.len() + 1);
    portals.push((start, start));
    for pair in corridor.windows(2) {
        let [from, to] = [pair[0], pair[1]];
        let from = &polygons[from.index()];
        let Some(edge) = from
            .neighbours
            .iter()
            .position(|neighbour| *neighbour == Some(to))
        else {
            continue;
        };
        portals.push(from.edge(edge));
    }
    portals.push((end, end));
    portals
}

fn nearly_equal(a: Vec3A, b: Vec3A) -> bool {
    const EPSILON: f32 = 1e-3;
    a.distance_squared(b) < EPSILON * EPSILON
}

fn push_waypoint(path: &mut Vec<Vec3A>, point: Vec3A) {
    if path.last().is_none_or(|last| !nearly_equal(*last, point)) {
        path.push(point);
    }
}

/// The "simple stupid funnel algorithm".
///
/// Portals are given as `(left, right)` pairs. The first and last portal are the degenerate
/// portals made of the start and end point.
fn string_pull(portals: &[(Vec3A, Vec3A)]) -> Vec<Vec3A> {
    let Some(&(start, _)) = portals.first() else {
        return Vec::new();
    };
    let mut path = vec![start];

    let mut apex = start;
    let mut portal_left = start;
    let mut portal_right = start;
    let mut left_index = 0;
    let mut right_index = 0;

    let mut i = 1;
    while i < portals.len() {
        let (left, right) = portals[i];

        if tri_area_2d(apex, portal_right, right) <= 0.0 {
            if nearly_equal(apex, portal_right) || tri_area_2d(apex, portal_left, right) > 0.0 {
                portal_right = right;
                right_index = i;
            } else {
                // right crossed over left: the left vertex becomes the new apex
                push_waypoint(&mut path, portal_left);
                apex = portal_left;
                let apex_index = left_index;
                portal_right = apex;
                right_index = apex_index;
                i = apex_index + 1;
                continue;
            }
        }

        if tri_area_2d(apex, portal_left, left) >= 0.0 {
            if nearly_equal(apex, portal_left) || tri_area_2d(apex, portal_right, left) < 0.0 {
                portal_left = left;
                left_index = i;
            } else {
                // left crossed over right: the right vertex becomes the new apex
                push_waypoint(&mut path, portal_right);
                apex = portal_right;
                let apex_index = right_index;
                portal_left = apex;
                left_index = apex_index;
                i = apex_index + 1;
                continue;
            }
        }

        i += 1;
    }

    if let Some(&(end, _)) = portals.last() {
        push_waypoint(&mut path, end);
    }
    path
}
