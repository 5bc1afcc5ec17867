use crate::error::{with_last_error_mut, BindingError, ForeFireError, ForeFireErrorCode};
use crate::instance::ForeFireInstance;
use forefire_core::Simulation;
use std::ffi::{CStr, CString};
use std::os::raw::c_char;
use tracing::{error, warn};

/// Record `error` as this thread's last error.
pub(crate) fn set_last_error(error: &impl ForeFireError) {
    with_last_error_mut(|(cstring, code)| {
        *cstring = CString::new(error.msg()).ok();
        *code = error.code();
    });
}

/// Clear the last error after a successful call.
pub(crate) fn clear_last_error() {
    with_last_error_mut(|(cstring, code)| {
        *cstring = None;
        *code = ForeFireErrorCode::Ok;
    });
}

/// Record an immediate error and return its code.
#[inline]
pub(crate) fn track_error(error: &impl ForeFireError) -> ForeFireErrorCode {
    set_last_error(error);
    error.code()
}

/// Run a fallible binding body and turn its outcome into an error code.
pub(crate) fn run<F>(body: F) -> ForeFireErrorCode
where
    F: FnOnce() -> Result<(), BindingError>,
{
    match body() {
        Ok(()) => {
            clear_last_error();
            ForeFireErrorCode::Ok
        }
        Err(err) => {
            warn!("Binding call failed ({:?}): {}", err.code(), err.msg());
            track_error(&err)
        }
    }
}

/// Borrow an instance from a raw pointer.
pub(crate) fn instance_from_ptr<'a>(
    ptr: *const ForeFireInstance,
) -> Result<&'a ForeFireInstance, BindingError> {
    // SAFETY: callers pass pointers obtained from `forefire_new` that have not been
    // destroyed; null is rejected here.
    unsafe { ptr.as_ref() }.ok_or_else(|| BindingError::null_pointer("instance"))
}

/// Borrow a C string argument as UTF-8.
pub(crate) fn str_arg<'a>(ptr: *const c_char, name: &str) -> Result<&'a str, BindingError> {
    if ptr.is_null() {
        return Err(BindingError::null_pointer(name));
    }
    // SAFETY: non-null and NUL-terminated per the calling contract.
    unsafe { CStr::from_ptr(ptr) }
        .to_str()
        .map_err(|_| BindingError::invalid_string(name))
}

/// Write `value` through an out-pointer.
pub(crate) fn write_out<T>(out: *mut T, name: &str, value: T) -> Result<(), BindingError> {
    if out.is_null() {
        return Err(BindingError::null_pointer(name));
    }
    // SAFETY: non-null and writable per the calling contract.
    unsafe { out.write(value) };
    Ok(())
}

/// Run `func` with shared access to the simulation.
pub(crate) fn with_simulation<F, T>(instance: &ForeFireInstance, func: F) -> Result<T, BindingError>
where
    F: FnOnce(&Simulation) -> Result<T, BindingError>,
{
    let sim = instance.sim.read().map_err(|_| {
        error!("Simulation lock poisoned");
        BindingError::lock_poisoned("RwLock")
    })?;
    func(&sim)
}

/// Run `func` with exclusive access to the simulation.
pub(crate) fn with_simulation_mut<F, T>(
    instance: &ForeFireInstance,
    func: F,
) -> Result<T, BindingError>
where
    F: FnOnce(&mut Simulation) -> Result<T, BindingError>,
{
    let mut sim = instance.sim.write().map_err(|_| {
        error!("Simulation lock poisoned");
        BindingError::lock_poisoned("RwLock")
    })?;
    func(&mut sim)
}
