//! Burn map: earliest fire-arrival time per cell
//!
//! Each cell holds the earliest simulation time at which a front swept over its
//! center, or `+∞` while unburned. Stamping is a `min` reduction, so values only
//! ever decrease and concurrent writers from parallel node updates never race.
//!
//! # Encoding
//!
//! Times are stored in `AtomicU64` using an order-preserving mapping of the IEEE-754
//! bit pattern (sign bit flipped for positives, all bits flipped for negatives), so
//! `fetch_min` on the integer is `min` on the float.

use crate::core_types::Vec2;
use crate::error::{FireError, Result};
use std::sync::atomic::{AtomicU64, Ordering};

/// Layer name of the arrival-time map
pub const BURN_MAP: &str = "BMap";

const SIGN_BIT: u64 = 1 << 63;

#[inline]
fn encode(t: f64) -> u64 {
    let bits = t.to_bits();
    if bits & SIGN_BIT == 0 {
        bits | SIGN_BIT
    } else {
        !bits
    }
}

#[inline]
fn decode(v: u64) -> f64 {
    if v & SIGN_BIT == 0 {
        f64::from_bits(!v)
    } else {
        f64::from_bits(v & !SIGN_BIT)
    }
}

/// Arrival-time raster over the fire domain
#[derive(Debug)]
pub struct ArrivalTimeMap {
    origin: Vec2,
    cell_size: f64,
    nx: usize,
    ny: usize,
    cells: Vec<AtomicU64>,
}

impl ArrivalTimeMap {
    /// Create an unburned map covering `extent` from `origin` with square cells
    pub fn new(origin: Vec2, extent: Vec2, cell_size: f64) -> Result<Self> {
        if !(cell_size.is_finite() && cell_size > 0.0) {
            return Err(FireError::config(format!(
                "burn map resolution must be positive, got {cell_size}"
            )));
        }
        let nx = (extent.x / cell_size).ceil().max(1.0) as usize;
        let ny = (extent.y / cell_size).ceil().max(1.0) as usize;
        let unburned = encode(f64::INFINITY);
        let cells = (0..nx * ny).map(|_| AtomicU64::new(unburned)).collect();
        Ok(Self {
            origin,
            cell_size,
            nx,
            ny,
            cells,
        })
    }

    pub fn dimensions(&self) -> (usize, usize) {
        (self.nx, self.ny)
    }

    pub fn cell_size(&self) -> f64 {
        self.cell_size
    }

    pub fn origin(&self) -> Vec2 {
        self.origin
    }

    /// Cell containing `p`, `None` outside the map
    pub fn cell_of(&self, p: &Vec2) -> Option<(usize, usize)> {
        let fx = (p.x - self.origin.x) / self.cell_size;
        let fy = (p.y - self.origin.y) / self.cell_size;
        if fx < 0.0 || fy < 0.0 {
            return None;
        }
        let (ix, iy) = (fx.floor() as usize, fy.floor() as usize);
        (ix < self.nx && iy < self.ny).then_some((ix, iy))
    }

    pub fn cell_center(&self, ix: usize, iy: usize) -> Vec2 {
        Vec2::new(
            self.origin.x + (ix as f64 + 0.5) * self.cell_size,
            self.origin.y + (iy as f64 + 0.5) * self.cell_size,
        )
    }

    /// Lower the arrival time of a cell to `min(current, time)`
    ///
    /// Returns `true` when the stored value decreased.
    #[inline]
    pub fn stamp(&self, ix: usize, iy: usize, time: f64) -> bool {
        if ix >= self.nx || iy >= self.ny || time.is_nan() {
            return false;
        }
        let encoded = encode(time);
        let previous = self.cells[iy * self.nx + ix].fetch_min(encoded, Ordering::Relaxed);
        encoded < previous
    }

    /// Stamp the cell containing `p`
    pub fn stamp_at(&self, p: &Vec2, time: f64) -> bool {
        self.cell_of(p)
            .is_some_and(|(ix, iy)| self.stamp(ix, iy, time))
    }

    /// Arrival time of a cell, `+∞` when unburned or out of range
    pub fn query(&self, ix: usize, iy: usize) -> f64 {
        if ix >= self.nx || iy >= self.ny {
            return f64::INFINITY;
        }
        decode(self.cells[iy * self.nx + ix].load(Ordering::Relaxed))
    }

    pub fn query_at(&self, p: &Vec2) -> f64 {
        self.cell_of(p)
            .map_or(f64::INFINITY, |(ix, iy)| self.query(ix, iy))
    }

    /// Dense row-major copy (x fastest) of the current arrival times
    pub fn snapshot(&self) -> Vec<f64> {
        self.cells
            .iter()
            .map(|cell| decode(cell.load(Ordering::Relaxed)))
            .collect()
    }

    pub fn burned_cells(&self) -> usize {
        let unburned = encode(f64::INFINITY);
        self.cells
            .iter()
            .filter(|cell| cell.load(Ordering::Relaxed) != unburned)
            .count()
    }

    /// Burned area in square meters (cell count × cell area)
    pub fn burned_area(&self) -> f64 {
        self.burned_cells() as f64 * self.cell_size * self.cell_size
    }
}
