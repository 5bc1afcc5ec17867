//! Layer registration
//!
//! Raster data is copied into Rust-owned memory; callers may free their buffers
//! once the call returns.

use forefire_core::{RasterGeometry, Vec2};
use std::os::raw::c_char;
use std::slice;
use std::sync::Arc;

use crate::error::{BindingError, ForeFireErrorCode};
use crate::helpers::{instance_from_ptr, run, str_arg, with_simulation_mut};
use crate::instance::ForeFireInstance;

/// Placement of a raster in domain coordinates.
///
/// `nt` is the number of time frames (1 for a static layer) spanning `timespan`
/// seconds from `t0`. Data is row-major with x fastest, then y, then t.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RasterExtent {
    pub origin_x: f64,
    pub origin_y: f64,
    pub width: f64,
    pub height: f64,
    pub nx: usize,
    pub ny: usize,
    pub nt: usize,
    pub t0: f64,
    pub timespan: f64,
}

impl RasterExtent {
    fn geometry(&self) -> Result<RasterGeometry, BindingError> {
        if self.nx == 0 || self.ny == 0 || self.nt == 0 {
            return Err(BindingError::invalid_parameter(format!(
                "raster dimensions must be positive, got {}x{}x{}",
                self.nx, self.ny, self.nt
            )));
        }
        let geometry = RasterGeometry::new(
            Vec2::new(self.origin_x, self.origin_y),
            Vec2::new(self.width, self.height),
            self.nx,
            self.ny,
        );
        Ok(if self.nt > 1 {
            geometry.with_frames(self.nt, self.t0, self.timespan)
        } else {
            geometry
        })
    }

    fn len(&self) -> Result<usize, BindingError> {
        self.nx
            .checked_mul(self.ny)
            .and_then(|n| n.checked_mul(self.nt))
            .ok_or_else(|| BindingError::invalid_parameter("raster size overflows".to_string()))
    }
}

/// Copy `len` values from a caller buffer.
///
/// # Safety
/// `data` must be non-null and readable for `len` values.
unsafe fn copy_buffer<T: Copy>(data: *const T, len: usize) -> Result<Arc<[T]>, BindingError> {
    if data.is_null() {
        return Err(BindingError::null_pointer("data"));
    }
    // SAFETY: non-null, and readable for `len` values per the caller's contract.
    Ok(Arc::from(unsafe { slice::from_raw_parts(data, len) }))
}

/// Register a layer by type.
///
/// - `"propagation"`: select the rate-of-spread model `name`, stored under `key`
/// - `"data"`: a uniform layer `name` reading the parameter `key` when sampled
///
/// # Safety
/// `ptr` must come from `forefire_new`; the strings must be NUL-terminated.
#[no_mangle]
pub unsafe extern "C" fn forefire_add_layer(
    ptr: *const ForeFireInstance,
    kind: *const c_char,
    name: *const c_char,
    key: *const c_char,
) -> ForeFireErrorCode {
    run(|| {
        let instance = instance_from_ptr(ptr)?;
        let kind = str_arg(kind, "kind")?;
        let name = str_arg(name, "name")?;
        let key = str_arg(key, "key")?;
        with_simulation_mut(instance, |sim| Ok(sim.add_layer(kind, name, key)?))
    })
}

/// Register a continuous raster (altitude, wind components, ...).
///
/// # Safety
/// `ptr` must come from `forefire_new`; `name` must be NUL-terminated; `extent`
/// must be readable; `data` must hold `nx * ny * nt` values.
#[no_mangle]
pub unsafe extern "C" fn forefire_add_scalar_layer(
    ptr: *const ForeFireInstance,
    name: *const c_char,
    extent: *const RasterExtent,
    data: *const f64,
) -> ForeFireErrorCode {
    run(|| {
        let instance = instance_from_ptr(ptr)?;
        let name = str_arg(name, "name")?;
        // SAFETY: readable when non-null per the contract.
        let extent = unsafe { extent.as_ref() }.ok_or_else(|| BindingError::null_pointer("extent"))?;
        let geometry = extent.geometry()?;
        // SAFETY: `data` holds `extent.len()` values per the contract.
        let values = unsafe { copy_buffer(data, extent.len()?) }?;
        with_simulation_mut(instance, |sim| {
            Ok(sim.add_scalar_layer(name, geometry, values)?)
        })
    })
}

/// Register a categorical raster (fuel indices, usually named `fuel`).
///
/// # Safety
/// Same contract as `forefire_add_scalar_layer`, with `i32` data.
#[no_mangle]
pub unsafe extern "C" fn forefire_add_index_layer(
    ptr: *const ForeFireInstance,
    name: *const c_char,
    extent: *const RasterExtent,
    data: *const i32,
) -> ForeFireErrorCode {
    run(|| {
        let instance = instance_from_ptr(ptr)?;
        let name = str_arg(name, "name")?;
        // SAFETY: readable when non-null per the contract.
        let extent = unsafe { extent.as_ref() }.ok_or_else(|| BindingError::null_pointer("extent"))?;
        let geometry = extent.geometry()?;
        // SAFETY: `data` holds `extent.len()` values per the contract.
        let values = unsafe { copy_buffer(data, extent.len()?) }?;
        with_simulation_mut(instance, |sim| Ok(sim.add_index_layer(name, geometry, values)?))
    })
}
