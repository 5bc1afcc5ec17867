//! Core types and utilities

pub mod time;
pub mod vec;

pub use time::ReferenceTime;
pub use vec::{cross, planar, Vec2, Vec3};
