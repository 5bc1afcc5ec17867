//! Vector type aliases for world positions and velocities.

use nalgebra::{Vector2, Vector3};

/// 2D vector in world meters, used for all front geometry.
pub type Vec2 = Vector2<f64>;

/// 3D vector carried on nodes (`loc=(x,y,z)`); propagation happens in the xy plane.
pub type Vec3 = Vector3<f64>;

/// Planar part of a node location
#[inline]
pub fn planar(v: &Vec3) -> Vec2 {
    Vec2::new(v.x, v.y)
}

/// 2D cross product (z component of the 3D cross product)
#[inline]
pub fn cross(a: &Vec2, b: &Vec2) -> f64 {
    a.x * b.y - a.y * b.x
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cross_sign() {
        let east = Vec2::new(1.0, 0.0);
        let north = Vec2::new(0.0, 1.0);
        assert_eq!(cross(&east, &north), 1.0);
        assert_eq!(cross(&north, &east), -1.0);
    }

    #[test]
    fn test_planar_drops_z() {
        let p = planar(&Vec3::new(3.0, 4.0, 120.0));
        assert_eq!(p, Vec2::new(3.0, 4.0));
    }
}
