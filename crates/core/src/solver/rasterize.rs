//! Stamping swept areas into the arrival-time map
//!
//! Each front edge `prev → node` sweeps the quadrilateral
//! `[prev_old, node_old, node_new, prev_new]` during a sub-step. Cells whose centers
//! fall inside it receive a time interpolated between the sub-step bounds from their
//! distances to the old and new edge. Cells within half a cell of the new edge or of
//! the node trajectory receive the sub-step end time, so thin sweeps narrower than a
//! cell still leave a continuous trace.
//!
//! Only the front line is traced. Node depth is not used to widen the stamp: the
//! burning zone behind the line is recovered from arrival times and
//! `burningDuration` (see [`crate::physics::HeatFluxBasic`]).

use crate::core_types::Vec2;
use crate::front::geometry::{distance_to_segment_sq, point_in_polygon};
use crate::grid::ArrivalTimeMap;

/// Cell index range covering the box `[lo, hi]`
fn cell_range(map: &ArrivalTimeMap, lo: Vec2, hi: Vec2) -> Option<(usize, usize, usize, usize)> {
    let (nx, ny) = map.dimensions();
    let origin = map.origin();
    let size = map.cell_size();
    let to_index = |v: f64, n: usize| -> Option<usize> {
        let v = v.floor();
        if v < 0.0 {
            Some(0)
        } else if v >= n as f64 {
            None
        } else {
            Some(v as usize)
        }
    };
    if hi.x < origin.x || hi.y < origin.y {
        return None;
    }
    let i0 = to_index((lo.x - origin.x) / size, nx)?;
    let j0 = to_index((lo.y - origin.y) / size, ny)?;
    let i1 = to_index((hi.x - origin.x) / size, nx).unwrap_or(nx - 1);
    let j1 = to_index((hi.y - origin.y) / size, ny).unwrap_or(ny - 1);
    Some((i0, i1, j0, j1))
}

fn bounds(points: &[Vec2], pad: f64) -> (Vec2, Vec2) {
    let mut lo = Vec2::repeat(f64::INFINITY);
    let mut hi = Vec2::repeat(f64::NEG_INFINITY);
    for p in points {
        lo = lo.inf(p);
        hi = hi.sup(p);
    }
    (lo - Vec2::repeat(pad), hi + Vec2::repeat(pad))
}

/// Stamp every cell whose center lies inside `polygon`
///
/// Used when a front ignites: its interior is burned at its creation time.
pub fn stamp_polygon(map: &ArrivalTimeMap, polygon: &[Vec2], time: f64) -> usize {
    if polygon.len() < 3 {
        return polygon.iter().filter(|p| map.stamp_at(p, time)).count();
    }
    let (lo, hi) = bounds(polygon, 0.0);
    let Some((i0, i1, j0, j1)) = cell_range(map, lo, hi) else {
        return 0;
    };
    let mut stamped = 0;
    for j in j0..=j1 {
        for i in i0..=i1 {
            if point_in_polygon(&map.cell_center(i, j), polygon) && map.stamp(i, j, time) {
                stamped += 1;
            }
        }
    }
    // Fronts thinner than a cell still mark the cells under their nodes
    for p in polygon {
        if map.stamp_at(p, time) {
            stamped += 1;
        }
    }
    stamped
}

/// Stamp cells within `radius` of segment `a → b`
pub fn stamp_segment(map: &ArrivalTimeMap, a: &Vec2, b: &Vec2, radius: f64, time: f64) {
    let (lo, hi) = bounds(&[*a, *b], radius);
    let Some((i0, i1, j0, j1)) = cell_range(map, lo, hi) else {
        return;
    };
    let r2 = radius * radius;
    for j in j0..=j1 {
        for i in i0..=i1 {
            if distance_to_segment_sq(&map.cell_center(i, j), a, b) <= r2 {
                map.stamp(i, j, time);
            }
        }
    }
    map.stamp_at(b, time);
}

/// Old and new positions of the two ends of an edge
#[derive(Debug, Clone, Copy)]
pub struct SweptEdge {
    pub prev_old: Vec2,
    pub node_old: Vec2,
    pub node_new: Vec2,
    pub prev_new: Vec2,
}

/// Stamp the area swept by an edge between `t0` and `t1`
pub fn stamp_swept_edge(map: &ArrivalTimeMap, edge: &SweptEdge, t0: f64, t1: f64) {
    let quad = [edge.prev_old, edge.node_old, edge.node_new, edge.prev_new];
    let (lo, hi) = bounds(&quad, 0.0);
    if let Some((i0, i1, j0, j1)) = cell_range(map, lo, hi) {
        for j in j0..=j1 {
            for i in i0..=i1 {
                let center = map.cell_center(i, j);
                if !point_in_polygon(&center, &quad) {
                    continue;
                }
                let from_old = distance_to_segment_sq(&center, &edge.prev_old, &edge.node_old).sqrt();
                let to_new = distance_to_segment_sq(&center, &edge.prev_new, &edge.node_new).sqrt();
                let span = from_old + to_new;
                let fraction = if span > 0.0 { from_old / span } else { 1.0 };
                map.stamp(i, j, t0 + fraction * (t1 - t0));
            }
        }
    }
    let half_cell = 0.5 * map.cell_size();
    stamp_segment(map, &edge.prev_new, &edge.node_new, half_cell, t1);
    stamp_segment(map, &edge.node_old, &edge.node_new, half_cell, t1);
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn map() -> ArrivalTimeMap {
        ArrivalTimeMap::new(Vec2::zeros(), Vec2::new(20.0, 20.0), 1.0).unwrap()
    }

    #[test]
    fn test_polygon_interior() {
        let map = map();
        let square = [
            Vec2::new(8.0, 2.0),
            Vec2::new(2.0, 2.0),
            Vec2::new(2.0, 8.0),
            Vec2::new(8.0, 8.0),
        ];
        stamp_polygon(&map, &square, 0.0);
        // 36 interior centers plus the corner cells under the nodes
        assert_eq!(map.burned_cells(), 36 + 3);
        assert_eq!(map.query(4, 4), 0.0);
        assert_eq!(map.query(10, 10), f64::INFINITY);
    }

    #[test]
    fn test_swept_edge_interpolates_time() {
        let map = map();
        // Horizontal edge at y = 2 moving up to y = 12 over [0, 10]
        let edge = SweptEdge {
            prev_old: Vec2::new(15.0, 2.0),
            node_old: Vec2::new(5.0, 2.0),
            node_new: Vec2::new(5.0, 12.0),
            prev_new: Vec2::new(15.0, 12.0),
        };
        stamp_swept_edge(&map, &edge, 0.0, 10.0);
        // Cell (9, 6) has its center at y = 6.5, 4.5 m into the 10 m sweep
        assert_relative_eq!(map.query(9, 6), 4.5, epsilon = 1e-9);
        assert_eq!(map.query(9, 15), f64::INFINITY);
    }

    #[test]
    fn test_thin_sweep_leaves_trace() {
        let map = map();
        let edge = SweptEdge {
            prev_old: Vec2::new(3.0, 10.0),
            node_old: Vec2::new(3.0, 10.1),
            node_new: Vec2::new(3.0, 10.2),
            prev_new: Vec2::new(3.0, 10.1),
        };
        stamp_swept_edge(&map, &edge, 0.0, 1.0);
        assert_eq!(map.query(3, 10), 1.0);
    }
}
