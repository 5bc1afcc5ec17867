//! Parameter get/set
//!
//! Setting `fuelsTable` parses and installs the fuel table; setting
//! `outOfBoundsPolicy` switches the layer clamp policy. Both fail without changing
//! the simulation on bad input.

use std::os::raw::c_char;

use crate::error::{BindingError, ForeFireErrorCode};
use crate::helpers::{instance_from_ptr, run, str_arg, with_simulation, with_simulation_mut, write_out};
use crate::instance::ForeFireInstance;

/// Set a numeric parameter.
///
/// # Safety
/// `ptr` must come from `forefire_new`; `key` must be a NUL-terminated string.
#[no_mangle]
pub unsafe extern "C" fn forefire_set_double(
    ptr: *const ForeFireInstance,
    key: *const c_char,
    value: f64,
) -> ForeFireErrorCode {
    run(|| {
        let instance = instance_from_ptr(ptr)?;
        let key = str_arg(key, "key")?;
        with_simulation_mut(instance, |sim| Ok(sim.set_f64(key, value)?))
    })
}

/// Set an integer parameter.
///
/// # Safety
/// Same contract as `forefire_set_double`.
#[no_mangle]
pub unsafe extern "C" fn forefire_set_int(
    ptr: *const ForeFireInstance,
    key: *const c_char,
    value: i64,
) -> ForeFireErrorCode {
    run(|| {
        let instance = instance_from_ptr(ptr)?;
        let key = str_arg(key, "key")?;
        with_simulation_mut(instance, |sim| Ok(sim.set_int(key, value)?))
    })
}

/// Set a string parameter.
///
/// # Safety
/// `ptr` must come from `forefire_new`; `key` and `value` must be NUL-terminated
/// strings.
#[no_mangle]
pub unsafe extern "C" fn forefire_set_string(
    ptr: *const ForeFireInstance,
    key: *const c_char,
    value: *const c_char,
) -> ForeFireErrorCode {
    run(|| {
        let instance = instance_from_ptr(ptr)?;
        let key = str_arg(key, "key")?;
        let value = str_arg(value, "value")?;
        with_simulation_mut(instance, |sim| Ok(sim.set_string(key, value)?))
    })
}

/// Read a numeric parameter into `out_value`.
///
/// # Safety
/// `ptr` must come from `forefire_new`; `key` must be a NUL-terminated string and
/// `out_value` writable.
#[no_mangle]
pub unsafe extern "C" fn forefire_get_double(
    ptr: *const ForeFireInstance,
    key: *const c_char,
    out_value: *mut f64,
) -> ForeFireErrorCode {
    run(|| {
        let instance = instance_from_ptr(ptr)?;
        let key = str_arg(key, "key")?;
        let value = with_simulation(instance, |sim| Ok(sim.get_f64(key)?))?;
        write_out(out_value, "out_value", value)
    })
}

/// Read an integer parameter into `out_value`.
///
/// # Safety
/// Same contract as `forefire_get_double`.
#[no_mangle]
pub unsafe extern "C" fn forefire_get_int(
    ptr: *const ForeFireInstance,
    key: *const c_char,
    out_value: *mut i64,
) -> ForeFireErrorCode {
    run(|| {
        let instance = instance_from_ptr(ptr)?;
        let key = str_arg(key, "key")?;
        let value = with_simulation(instance, |sim| Ok(sim.get_int(key)?))?;
        write_out(out_value, "out_value", value)
    })
}

/// Read a parameter as text.
///
/// `out_value` receives a pointer owned by the instance, valid until the next
/// `forefire_get_string` call on it. **DO NOT FREE THIS POINTER**.
///
/// # Safety
/// `ptr` must come from `forefire_new`; `key` must be a NUL-terminated string and
/// `out_value` writable.
#[no_mangle]
pub unsafe extern "C" fn forefire_get_string(
    ptr: *const ForeFireInstance,
    key: *const c_char,
    out_value: *mut *const c_char,
) -> ForeFireErrorCode {
    run(|| {
        let instance = instance_from_ptr(ptr)?;
        let key = str_arg(key, "key")?;
        if out_value.is_null() {
            return Err(BindingError::null_pointer("out_value"));
        }
        let text = with_simulation(instance, |sim| Ok(sim.get_string(key)?))?;
        let cached = ForeFireInstance::cache(&instance.string_value, text)?;
        write_out(out_value, "out_value", cached)
    })
}
