use forefire_core::AdvanceReport;
use std::os::raw::c_char;
use std::slice;
use tracing::debug;

use crate::error::{BindingError, ForeFireErrorCode};
use crate::helpers::{instance_from_ptr, run, str_arg, with_simulation, with_simulation_mut, write_out};
use crate::instance::ForeFireInstance;

/// FFI-friendly summary of one `forefire_advance_to` call.
/// Keep this layout stable for C/C++ consumers.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct AdvanceSummary {
    /// Simulation time reached (s).
    pub achieved_time: f64,
    pub substeps: usize,
    /// Nodes frozen after repeated invalid rates.
    pub frozen_nodes: usize,
    /// Fronts dropped on a topology or resolution error.
    pub terminated_fronts: usize,
    /// Rates that hit the `minSpeed`/`maxSpeed` bounds.
    pub clamped_rates: usize,
    pub invalid_rates: usize,
    pub lookup_failures: usize,
    pub splits: usize,
    pub merges: usize,
    /// Stopped early by `forefire_interrupt`.
    pub interrupted: bool,
}

impl From<&AdvanceReport> for AdvanceSummary {
    fn from(report: &AdvanceReport) -> Self {
        Self {
            achieved_time: report.achieved_time,
            substeps: report.substeps,
            frozen_nodes: report.frozen_nodes,
            terminated_fronts: report.terminated_fronts,
            clamped_rates: report.clamped_rates,
            invalid_rates: report.invalid_rates,
            lookup_failures: report.lookup_failures,
            splits: report.splits,
            merges: report.merges,
            interrupted: report.interrupted,
        }
    }
}

/// Advance every front to `target` seconds.
///
/// `out_summary` may be null when the caller does not need the summary.
///
/// # Safety
/// `ptr` must come from `forefire_new`; `out_summary` must be null or writable.
#[no_mangle]
pub unsafe extern "C" fn forefire_advance_to(
    ptr: *const ForeFireInstance,
    target: f64,
    out_summary: *mut AdvanceSummary,
) -> ForeFireErrorCode {
    run(|| {
        let instance = instance_from_ptr(ptr)?;
        let report = with_simulation_mut(instance, |sim| Ok(sim.advance_to(target)?))?;
        debug!(
            "Advanced to t={} in {} sub-steps ({} clamped, {} lookup failures)",
            report.achieved_time, report.substeps, report.clamped_rates, report.lookup_failures
        );
        if out_summary.is_null() {
            return Ok(());
        }
        write_out(out_summary, "out_summary", AdvanceSummary::from(&report))
    })
}

/// Current simulation time (s).
///
/// # Safety
/// `ptr` must come from `forefire_new`; `out_time` must be writable.
#[no_mangle]
pub unsafe extern "C" fn forefire_get_time(
    ptr: *const ForeFireInstance,
    out_time: *mut f64,
) -> ForeFireErrorCode {
    run(|| {
        let instance = instance_from_ptr(ptr)?;
        let time = with_simulation(instance, |sim| Ok(sim.time()))?;
        write_out(out_time, "out_time", time)
    })
}

/// Burned area (m²) according to the arrival-time map.
///
/// # Safety
/// `ptr` must come from `forefire_new`; `out_area` must be writable.
#[no_mangle]
pub unsafe extern "C" fn forefire_get_burned_area(
    ptr: *const ForeFireInstance,
    out_area: *mut f64,
) -> ForeFireErrorCode {
    run(|| {
        let instance = instance_from_ptr(ptr)?;
        let area = with_simulation(instance, |sim| Ok(sim.burned_area()))?;
        write_out(out_area, "out_area", area)
    })
}

/// Number of active fronts.
///
/// # Safety
/// `ptr` must come from `forefire_new`; `out_count` must be writable.
#[no_mangle]
pub unsafe extern "C" fn forefire_get_front_count(
    ptr: *const ForeFireInstance,
    out_count: *mut usize,
) -> ForeFireErrorCode {
    run(|| {
        let instance = instance_from_ptr(ptr)?;
        let count = with_simulation(instance, |sim| Ok(sim.front_arena().active_fronts().count()))?;
        write_out(out_count, "out_count", count)
    })
}

/// Shape of an exportable array (`BMap`, `heatFlux` or a registered raster layer).
///
/// # Safety
/// `ptr` must come from `forefire_new`; `name` must be NUL-terminated; `out_nx` and
/// `out_ny` must be writable.
#[no_mangle]
pub unsafe extern "C" fn forefire_get_array_shape(
    ptr: *const ForeFireInstance,
    name: *const c_char,
    out_nx: *mut usize,
    out_ny: *mut usize,
) -> ForeFireErrorCode {
    run(|| {
        let instance = instance_from_ptr(ptr)?;
        let name = str_arg(name, "name")?;
        let (nx, ny) = with_simulation(instance, |sim| Ok(sim.array_shape(name)?))?;
        write_out(out_nx, "out_nx", nx)?;
        write_out(out_ny, "out_ny", ny)
    })
}

/// Copy an array into `buffer`, row-major with x fastest.
///
/// `BMap` cells hold arrival times, infinity where unburned. Fails with
/// `BufferTooSmall` (and writes nothing) if `capacity` is too small;
/// `out_written` then holds the required length.
///
/// # Safety
/// `ptr` must come from `forefire_new`; `name` must be NUL-terminated; `buffer` must
/// be writable for `capacity` values; `out_written` must be writable.
#[no_mangle]
pub unsafe extern "C" fn forefire_get_double_array(
    ptr: *const ForeFireInstance,
    name: *const c_char,
    buffer: *mut f64,
    capacity: usize,
    out_written: *mut usize,
) -> ForeFireErrorCode {
    run(|| {
        let instance = instance_from_ptr(ptr)?;
        let name = str_arg(name, "name")?;
        let values = with_simulation(instance, |sim| Ok(sim.get_double_array(name)?))?;
        write_out(out_written, "out_written", values.len())?;
        if values.len() > capacity {
            return Err(BindingError::buffer_too_small(values.len(), capacity));
        }
        if buffer.is_null() {
            return Err(BindingError::null_pointer("buffer"));
        }
        // SAFETY: non-null and writable for `capacity >= values.len()` values.
        unsafe { slice::from_raw_parts_mut(buffer, values.len()) }.copy_from_slice(&values);
        Ok(())
    })
}
