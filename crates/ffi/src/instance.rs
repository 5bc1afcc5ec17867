use forefire_core::Simulation;
use std::ffi::CString;
use std::os::raw::c_char;
use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Mutex, RwLock};
use tracing::debug;

use crate::error::{BindingError, ForeFireErrorCode};
use crate::helpers::{clear_last_error, track_error};

/// A fire simulation owned by a foreign caller.
///
/// # Thread Safety
/// The simulation sits behind an `RwLock`: queries take a shared lock and may run
/// concurrently, while parameter changes, layer registration and commands take the
/// exclusive lock. A long `goTo` can be cut short from another thread with
/// `forefire_interrupt`, which does not take the lock.
///
/// # Usage
/// ```c
/// ForeFireInstance* ff = NULL;
/// if (forefire_new(&ff) != Ok) {
///     return;
/// }
/// forefire_set_string(ff, "fuelsTable", table_text);
/// forefire_execute(ff, "FireDomain[sw=(0,0,0);ne=(1000,1000,0);t=0]", NULL);
/// forefire_execute(ff, "startFire[loc=(500,500,0);t=0]", NULL);
/// forefire_execute(ff, "goTo[t=600]", NULL);
/// forefire_destroy(ff);
/// ```
pub struct ForeFireInstance {
    pub(crate) sim: RwLock<Simulation>,
    /// Interrupt flag shared with the simulation, reachable without the lock.
    pub(crate) interrupt: Arc<AtomicBool>,
    /// Output of the last `forefire_execute` call, kept alive for the caller.
    pub(crate) output: Mutex<CString>,
    /// Value of the last `forefire_get_string` call.
    pub(crate) string_value: Mutex<CString>,
}

impl ForeFireInstance {
    pub(crate) fn new() -> Box<Self> {
        let sim = Simulation::new();
        Box::new(Self {
            interrupt: sim.interrupt_handle(),
            sim: RwLock::new(sim),
            output: Mutex::new(CString::default()),
            string_value: Mutex::new(CString::default()),
        })
    }

    /// Store `text` in `slot` and return a pointer to it
    ///
    /// The pointer stays valid until the slot is written again.
    pub(crate) fn cache(slot: &Mutex<CString>, text: String) -> Result<*const c_char, BindingError> {
        let cstring = CString::new(text).map_err(|_| BindingError::invalid_string("output"))?;
        let mut guard = slot
            .lock()
            .map_err(|_| BindingError::lock_poisoned("Mutex"))?;
        *guard = cstring;
        Ok(guard.as_ptr())
    }
}

/// Create a new simulation with default parameters and the built-in models.
///
/// Returns `Ok` with the instance in `out_instance`, or `NullPointer` if
/// `out_instance` is null.
///
/// # Safety
///
/// - `out_instance` must be a valid, non-null pointer to writable memory.
/// - The caller owns the returned instance and MUST call `forefire_destroy`
///   exactly once.
#[no_mangle]
pub unsafe extern "C" fn forefire_new(out_instance: *mut *mut ForeFireInstance) -> ForeFireErrorCode {
    if out_instance.is_null() {
        return track_error(&BindingError::null_pointer("out_instance"));
    }
    let instance = ForeFireInstance::new();
    let instance: *mut ForeFireInstance = Box::into_raw(instance);
    // SAFETY: checked non-null above; writable per the contract.
    unsafe {
        *out_instance = instance;
    }
    debug!("Created instance {:p}", instance);
    clear_last_error();
    ForeFireErrorCode::Ok
}

/// Destroy an instance created by `forefire_new`. Null is a no-op.
///
/// # Safety
/// - The pointer MUST have been created by `forefire_new` and not destroyed yet.
/// - The pointer must not be used afterwards, and no other thread may still be
///   using it.
#[no_mangle]
pub unsafe extern "C" fn forefire_destroy(ptr: *mut ForeFireInstance) {
    if ptr.is_null() {
        return;
    }
    debug!("Destroying instance {:p}", ptr);
    // SAFETY: created by `Box::into_raw` in `forefire_new` and not yet freed.
    unsafe {
        drop(Box::from_raw(ptr));
    }
}

