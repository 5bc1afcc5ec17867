//! Axis-aligned simulation domain

use crate::core_types::{ReferenceTime, Vec2};
use crate::error::{FireError, Result};
use serde::{Deserialize, Serialize};

/// Rectangle holding every front and raster sample point.
///
/// Width and height are strictly positive.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Domain {
    sw: Vec2,
    ne: Vec2,
    reference: ReferenceTime,
    start_time: f64,
}

impl Domain {
    /// Create a domain from its south-west and north-east corners
    pub fn new(sw: Vec2, ne: Vec2, start_time: f64) -> Result<Self> {
        Self::with_reference(sw, ne, start_time, ReferenceTime::default())
    }

    pub fn with_reference(
        sw: Vec2,
        ne: Vec2,
        start_time: f64,
        reference: ReferenceTime,
    ) -> Result<Self> {
        let extent = ne - sw;
        if !(extent.x.is_finite() && extent.y.is_finite()) || extent.x <= 0.0 || extent.y <= 0.0 {
            return Err(FireError::config(format!(
                "domain extent must be strictly positive, got {:.3} x {:.3}",
                extent.x, extent.y
            )));
        }
        if !start_time.is_finite() {
            return Err(FireError::config("domain start time must be finite"));
        }
        Ok(Self {
            sw,
            ne,
            reference,
            start_time,
        })
    }

    /// Create a domain from an origin and a width/height extent
    pub fn from_extent(origin: Vec2, width: f64, height: f64, start_time: f64) -> Result<Self> {
        Self::new(origin, origin + Vec2::new(width, height), start_time)
    }

    pub fn sw(&self) -> Vec2 {
        self.sw
    }

    pub fn ne(&self) -> Vec2 {
        self.ne
    }

    pub fn width(&self) -> f64 {
        self.ne.x - self.sw.x
    }

    pub fn height(&self) -> f64 {
        self.ne.y - self.sw.y
    }

    pub fn reference(&self) -> ReferenceTime {
        self.reference
    }

    pub fn start_time(&self) -> f64 {
        self.start_time
    }

    pub fn contains(&self, p: &Vec2) -> bool {
        p.x >= self.sw.x && p.x <= self.ne.x && p.y >= self.sw.y && p.y <= self.ne.y
    }

    /// Project a point onto the domain rectangle
    pub fn clamp(&self, p: &Vec2) -> Vec2 {
        Vec2::new(
            p.x.clamp(self.sw.x, self.ne.x),
            p.y.clamp(self.sw.y, self.ne.y),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_domain_rejects_degenerate_extent() {
        assert!(Domain::new(Vec2::new(0.0, 0.0), Vec2::new(0.0, 10.0), 0.0).is_err());
        assert!(Domain::new(Vec2::new(0.0, 0.0), Vec2::new(10.0, -1.0), 0.0).is_err());
    }

    #[test]
    fn test_domain_clamp() {
        let domain = Domain::from_extent(Vec2::new(100.0, 200.0), 50.0, 20.0, 0.0).unwrap();
        assert_eq!(domain.width(), 50.0);
        assert!(domain.contains(&Vec2::new(120.0, 210.0)));
        assert!(!domain.contains(&Vec2::new(99.0, 210.0)));
        assert_eq!(domain.clamp(&Vec2::new(0.0, 500.0)), Vec2::new(100.0, 220.0));
    }
}
