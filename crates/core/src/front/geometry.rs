//! Planar geometry on front chains
//!
//! Fronts are oriented clockwise: the burned side lies to the right of the direction
//! of travel, and the outward normal of a tangent `t` is `(-t.y, t.x)`.

use crate::core_types::{cross, Vec2};

/// Unit outward normal at a node from its neighbors
///
/// Falls back to the zero vector for degenerate (coincident) neighbors.
pub fn outward_normal(prev: &Vec2, next: &Vec2) -> Vec2 {
    let tangent = next - prev;
    let norm = tangent.norm();
    if norm <= f64::EPSILON {
        return Vec2::zeros();
    }
    Vec2::new(-tangent.y, tangent.x) / norm
}

/// Signed curvature through three consecutive nodes (1/m)
///
/// Positive where the front is convex (bulging outward), negative in re-entrant parts.
pub fn curvature(prev: &Vec2, node: &Vec2, next: &Vec2) -> f64 {
    let e1 = node - prev;
    let e2 = next - node;
    let denom = e1.norm() * e2.norm() * (e1 + e2).norm();
    if denom <= f64::EPSILON {
        return 0.0;
    }
    -2.0 * cross(&e1, &e2) / denom
}

/// Shoelace area; negative for clockwise rings
pub fn signed_area(points: &[Vec2]) -> f64 {
    if points.len() < 3 {
        return 0.0;
    }
    let n = points.len();
    0.5 * (0..n)
        .map(|i| cross(&points[i], &points[(i + 1) % n]))
        .sum::<f64>()
}

/// Polyline length, including the closing edge when `closed`
pub fn perimeter(points: &[Vec2], closed: bool) -> f64 {
    let open: f64 = points.windows(2).map(|w| (w[1] - w[0]).norm()).sum();
    match (closed, points.first(), points.last()) {
        (true, Some(first), Some(last)) if points.len() > 2 => open + (first - last).norm(),
        _ => open,
    }
}

/// Crossing parameters `(s, t)` of segments `p0→p1` and `q0→q1`
///
/// Only proper crossings (both parameters strictly inside `(0, 1)`) are reported;
/// parallel and touching segments return `None`.
pub fn segment_intersection(p0: &Vec2, p1: &Vec2, q0: &Vec2, q1: &Vec2) -> Option<(f64, f64)> {
    let r = p1 - p0;
    let s = q1 - q0;
    let denom = cross(&r, &s);
    if denom.abs() <= f64::EPSILON * r.norm() * s.norm() {
        return None;
    }
    let qp = q0 - p0;
    let t = cross(&qp, &s) / denom;
    let u = cross(&qp, &r) / denom;
    (t > 0.0 && t < 1.0 && u > 0.0 && u < 1.0).then_some((t, u))
}

/// Even-odd point-in-polygon test
pub fn point_in_polygon(p: &Vec2, polygon: &[Vec2]) -> bool {
    let n = polygon.len();
    if n < 3 {
        return false;
    }
    let mut inside = false;
    let mut j = n - 1;
    for i in 0..n {
        let (a, b) = (polygon[i], polygon[j]);
        if (a.y > p.y) != (b.y > p.y) {
            let x = a.x + (p.y - a.y) * (b.x - a.x) / (b.y - a.y);
            if p.x < x {
                inside = !inside;
            }
        }
        j = i;
    }
    inside
}

/// Squared distance from `p` to segment `a→b`
pub fn distance_to_segment_sq(p: &Vec2, a: &Vec2, b: &Vec2) -> f64 {
    let ab = b - a;
    let len_sq = ab.norm_squared();
    if len_sq <= f64::EPSILON {
        return (p - a).norm_squared();
    }
    let t = ((p - a).dot(&ab) / len_sq).clamp(0.0, 1.0);
    (p - (a + ab * t)).norm_squared()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn cw_square() -> Vec<Vec2> {
        vec![
            Vec2::new(10.0, 0.0),
            Vec2::new(0.0, 0.0),
            Vec2::new(0.0, 10.0),
            Vec2::new(10.0, 10.0),
        ]
    }

    #[test]
    fn test_clockwise_normal_points_outward() {
        let sq = cw_square();
        // Bottom edge midpoint, neighbors (10,0) -> (0,0)
        let n = outward_normal(&sq[0], &sq[1]);
        assert_relative_eq!(n, Vec2::new(0.0, -1.0));
    }

    #[test]
    fn test_curvature_sign_and_circle() {
        let sq = cw_square();
        assert!(curvature(&sq[0], &sq[1], &sq[2]) > 0.0);
        assert!(curvature(&sq[2], &sq[1], &sq[0]) < 0.0);

        // Three CW points on a circle of radius 50
        let r = 50.0;
        let at = |a: f64| Vec2::new(r * a.cos(), r * a.sin());
        let k = curvature(&at(0.1), &at(0.0), &at(-0.1));
        assert_relative_eq!(k, 1.0 / r, max_relative = 1e-9);
    }

    #[test]
    fn test_area_and_perimeter() {
        let sq = cw_square();
        assert_relative_eq!(signed_area(&sq), -100.0);
        assert_relative_eq!(perimeter(&sq, true), 40.0);
        assert_relative_eq!(perimeter(&sq, false), 30.0);
    }

    #[test]
    fn test_segment_crossing() {
        let hit = segment_intersection(
            &Vec2::new(0.0, 0.0),
            &Vec2::new(2.0, 2.0),
            &Vec2::new(0.0, 2.0),
            &Vec2::new(2.0, 0.0),
        );
        let (s, t) = hit.unwrap();
        assert_relative_eq!(s, 0.5);
        assert_relative_eq!(t, 0.5);

        // Shared endpoint is not a crossing
        assert!(segment_intersection(
            &Vec2::new(0.0, 0.0),
            &Vec2::new(1.0, 0.0),
            &Vec2::new(1.0, 0.0),
            &Vec2::new(1.0, 1.0),
        )
        .is_none());
    }

    #[test]
    fn test_point_in_polygon_and_distance() {
        let sq = cw_square();
        assert!(point_in_polygon(&Vec2::new(5.0, 5.0), &sq));
        assert!(!point_in_polygon(&Vec2::new(15.0, 5.0), &sq));
        assert_relative_eq!(
            distance_to_segment_sq(&Vec2::new(5.0, 3.0), &sq[0], &sq[1]),
            9.0
        );
    }
}
