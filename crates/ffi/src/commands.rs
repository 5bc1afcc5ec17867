use std::os::raw::c_char;
use std::sync::atomic::Ordering;
use tracing::{debug, info};

use crate::error::ForeFireErrorCode;
use crate::helpers::{instance_from_ptr, run, str_arg, with_simulation_mut, write_out};
use crate::instance::ForeFireInstance;

/// Execute one command line (`FireDomain[...]`, `startFire[...]`, `goTo[t=...]`,
/// `print[]`, ...).
///
/// When `out_output` is non-null it receives the command's textual output, owned
/// by the instance and valid until the next `forefire_execute` call on it.
/// **DO NOT FREE THIS POINTER**.
///
/// # Safety
/// `ptr` must come from `forefire_new`; `command` must be NUL-terminated;
/// `out_output` must be null or writable.
#[no_mangle]
pub unsafe extern "C" fn forefire_execute(
    ptr: *const ForeFireInstance,
    command: *const c_char,
    out_output: *mut *const c_char,
) -> ForeFireErrorCode {
    run(|| {
        let instance = instance_from_ptr(ptr)?;
        let command = str_arg(command, "command")?;
        debug!("Executing '{}'", command);
        let output = with_simulation_mut(instance, |sim| Ok(sim.execute(command)?))?;
        let cached = ForeFireInstance::cache(&instance.output, output)?;
        if out_output.is_null() {
            return Ok(());
        }
        write_out(out_output, "out_output", cached)
    })
}

/// Ask a running `goTo` to stop after its current sub-step.
///
/// Does not take the simulation lock, so it can be called from another thread while
/// `forefire_execute` runs.
///
/// # Safety
/// `ptr` must come from `forefire_new`.
#[no_mangle]
pub unsafe extern "C" fn forefire_interrupt(ptr: *const ForeFireInstance) -> ForeFireErrorCode {
    run(|| {
        let instance = instance_from_ptr(ptr)?;
        instance.interrupt.store(true, Ordering::SeqCst);
        info!("Interrupt requested");
        Ok(())
    })
}
