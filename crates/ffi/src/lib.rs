//! C ABI for the fire-front propagation engine
//!
//! Every fallible function returns a [`ForeFireErrorCode`] and records a message
//! readable through [`forefire_get_last_error`] on the calling thread. The C header
//! is generated by `cbindgen` at build time.

mod commands;
mod error;
mod helpers;
mod instance;
mod layers;
mod params;
mod queries;

pub use commands::{forefire_execute, forefire_interrupt};
pub use error::{forefire_get_last_error, forefire_get_last_error_code, ForeFireErrorCode};
pub use instance::{forefire_destroy, forefire_new, ForeFireInstance};
pub use layers::{forefire_add_index_layer, forefire_add_layer, forefire_add_scalar_layer, RasterExtent};
pub use params::{
    forefire_get_double, forefire_get_int, forefire_get_string, forefire_set_double,
    forefire_set_int, forefire_set_string,
};
pub use queries::{
    forefire_advance_to, forefire_get_array_shape, forefire_get_burned_area,
    forefire_get_double_array, forefire_get_front_count, forefire_get_time, AdvanceSummary,
};

#[cfg(test)]
mod tests {
    use super::*;
    use std::ffi::{CStr, CString};
    use std::os::raw::c_char;
    use std::ptr;
    use tracing_subscriber::EnvFilter;

    #[ctor::ctor]
    fn init_tracing() {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    }

    fn c(s: &str) -> CString {
        CString::new(s).unwrap()
    }

    fn new_instance() -> *mut ForeFireInstance {
        let mut ff = ptr::null_mut();
        assert_eq!(unsafe { forefire_new(&mut ff) }, ForeFireErrorCode::Ok);
        assert!(!ff.is_null());
        ff
    }

    fn execute(ff: *const ForeFireInstance, line: &str) -> ForeFireErrorCode {
        unsafe { forefire_execute(ff, c(line).as_ptr(), ptr::null_mut()) }
    }

    fn last_error() -> String {
        let msg = forefire_get_last_error();
        assert!(!msg.is_null());
        unsafe { CStr::from_ptr(msg) }.to_string_lossy().into_owned()
    }

    #[test]
    fn test_null_arguments_are_rejected() {
        assert_eq!(
            unsafe { forefire_new(ptr::null_mut()) },
            ForeFireErrorCode::NullPointer
        );
        assert_eq!(forefire_get_last_error_code(), ForeFireErrorCode::NullPointer);
        assert_eq!(last_error(), "Parameter 'out_instance' cannot be null");

        let ff = new_instance();
        assert_eq!(
            unsafe { forefire_set_double(ff, ptr::null(), 1.0) },
            ForeFireErrorCode::NullPointer
        );
        assert_eq!(
            unsafe { forefire_get_time(ptr::null(), ptr::null_mut()) },
            ForeFireErrorCode::NullPointer
        );
        unsafe { forefire_destroy(ff) };
        unsafe { forefire_destroy(ptr::null_mut()) };
    }

    #[test]
    fn test_parameters_round_trip() {
        let ff = new_instance();
        let key = c("perimeterResolution");
        assert_eq!(
            unsafe { forefire_set_double(ff, key.as_ptr(), 4.5) },
            ForeFireErrorCode::Ok
        );
        let mut value = 0.0;
        assert_eq!(
            unsafe { forefire_get_double(ff, key.as_ptr(), &mut value) },
            ForeFireErrorCode::Ok
        );
        assert_eq!(value, 4.5);
        assert!(forefire_get_last_error().is_null());

        let key = c("maxInvalidRateStreak");
        assert_eq!(unsafe { forefire_set_int(ff, key.as_ptr(), 7) }, ForeFireErrorCode::Ok);
        let mut int = 0;
        assert_eq!(
            unsafe { forefire_get_int(ff, key.as_ptr(), &mut int) },
            ForeFireErrorCode::Ok
        );
        assert_eq!(int, 7);

        let key = c("propagationModel");
        let model = c("WindDriven");
        assert_eq!(
            unsafe { forefire_set_string(ff, key.as_ptr(), model.as_ptr()) },
            ForeFireErrorCode::Ok
        );
        let mut out: *const c_char = ptr::null();
        assert_eq!(
            unsafe { forefire_get_string(ff, key.as_ptr(), &mut out) },
            ForeFireErrorCode::Ok
        );
        assert_eq!(unsafe { CStr::from_ptr(out) }.to_str().unwrap(), "WindDriven");

        let key = c("noSuchKey");
        assert_eq!(
            unsafe { forefire_get_double(ff, key.as_ptr(), &mut value) },
            ForeFireErrorCode::Configuration
        );
        unsafe { forefire_destroy(ff) };
    }

    #[test]
    fn test_run_and_export_burn_map() {
        let ff = new_instance();
        let key = c("fuelsTable");
        let table = c("Index;vv_coeff\n1;1.0");
        assert_eq!(
            unsafe { forefire_set_string(ff, key.as_ptr(), table.as_ptr()) },
            ForeFireErrorCode::Ok
        );
        for line in [
            "setParameters[perimeterResolution=4;minimalPropagativeFrontDepth=4;bmapResolution=1]",
            "FireDomain[sw=(0,0,0);ne=(60,40,0);t=0]",
            "startFire[loc=(30,20,0);t=0]",
        ] {
            assert_eq!(execute(ff, line), ForeFireErrorCode::Ok, "{line}");
        }

        let mut summary = AdvanceSummary::default();
        assert_eq!(
            unsafe { forefire_advance_to(ff, 5.0, &mut summary) },
            ForeFireErrorCode::Ok
        );
        assert_eq!(summary.achieved_time, 5.0);
        assert!(summary.substeps > 0);
        assert!(!summary.interrupted);

        let name = c("BMap");
        let (mut nx, mut ny) = (0, 0);
        assert_eq!(
            unsafe { forefire_get_array_shape(ff, name.as_ptr(), &mut nx, &mut ny) },
            ForeFireErrorCode::Ok
        );
        assert_eq!((nx, ny), (60, 40));

        let mut written = 0;
        let mut small = vec![0.0; 10];
        assert_eq!(
            unsafe {
                forefire_get_double_array(ff, name.as_ptr(), small.as_mut_ptr(), small.len(), &mut written)
            },
            ForeFireErrorCode::BufferTooSmall
        );
        assert_eq!(written, 2400);

        let mut map = vec![0.0; written];
        assert_eq!(
            unsafe {
                forefire_get_double_array(ff, name.as_ptr(), map.as_mut_ptr(), map.len(), &mut written)
            },
            ForeFireErrorCode::Ok
        );
        assert_eq!(map[20 * nx + 30], 0.0);
        assert!(map[0].is_infinite());

        let mut area = 0.0;
        assert_eq!(
            unsafe { forefire_get_burned_area(ff, &mut area) },
            ForeFireErrorCode::Ok
        );
        assert_eq!(area, map.iter().filter(|t| t.is_finite()).count() as f64);

        let mut out: *const c_char = ptr::null();
        let print = c("print[]");
        assert_eq!(
            unsafe { forefire_execute(ff, print.as_ptr(), &mut out) },
            ForeFireErrorCode::Ok
        );
        let text = unsafe { CStr::from_ptr(out) }.to_str().unwrap();
        assert!(text.starts_with("FireDomain[sw=(0,0,0);ne=(60,40,0);t=5]"));
        unsafe { forefire_destroy(ff) };
    }

    #[test]
    fn test_layers_and_errors() {
        let ff = new_instance();
        assert_eq!(
            execute(ff, "FireDomain[sw=(0,0,0);ne=(10,10,0);t=0]"),
            ForeFireErrorCode::Ok
        );
        let extent = RasterExtent {
            origin_x: 0.0,
            origin_y: 0.0,
            width: 10.0,
            height: 10.0,
            nx: 2,
            ny: 2,
            nt: 1,
            t0: 0.0,
            timespan: 0.0,
        };
        let altitude = [0.0, 1.0, 2.0, 3.0];
        let name = c("altitude");
        assert_eq!(
            unsafe { forefire_add_scalar_layer(ff, name.as_ptr(), &extent, altitude.as_ptr()) },
            ForeFireErrorCode::Ok
        );
        let fuel = [1, 1, 2, 2];
        let fuel_name = c("fuel");
        assert_eq!(
            unsafe { forefire_add_index_layer(ff, fuel_name.as_ptr(), &extent, fuel.as_ptr()) },
            ForeFireErrorCode::Ok
        );
        let mut buffer = [0.0; 4];
        let mut written = 0;
        assert_eq!(
            unsafe {
                forefire_get_double_array(ff, fuel_name.as_ptr(), buffer.as_mut_ptr(), 4, &mut written)
            },
            ForeFireErrorCode::Ok
        );
        assert_eq!(buffer, [1.0, 1.0, 2.0, 2.0]);

        let bad = RasterExtent { nx: 0, ..extent };
        assert_eq!(
            unsafe { forefire_add_scalar_layer(ff, name.as_ptr(), &bad, altitude.as_ptr()) },
            ForeFireErrorCode::InvalidParameter
        );

        let (kind, model, key) = (c("propagation"), c("Nope"), c("propagationModel"));
        assert_eq!(
            unsafe { forefire_add_layer(ff, kind.as_ptr(), model.as_ptr(), key.as_ptr()) },
            ForeFireErrorCode::UnknownModel
        );
        assert_eq!(execute(ff, "explode[]"), ForeFireErrorCode::Command);
        assert!(last_error().contains("explode"));

        let missing = c("nothing");
        assert_eq!(
            unsafe { forefire_get_double_array(ff, missing.as_ptr(), buffer.as_mut_ptr(), 4, &mut written) },
            ForeFireErrorCode::UnknownLayer
        );
        unsafe { forefire_destroy(ff) };
    }

    #[test]
    fn test_heat_flux_export() {
        let ff = new_instance();
        let (key, table) = (c("fuelsTable"), c("Index;vv_coeff\n1;1.0"));
        assert_eq!(
            unsafe { forefire_set_string(ff, key.as_ptr(), table.as_ptr()) },
            ForeFireErrorCode::Ok
        );
        for line in [
            "setParameters[perimeterResolution=4;minimalPropagativeFrontDepth=4;bmapResolution=1]",
            "setParameters[nominalHeatFlux=2000;burningDuration=50]",
            "FireDomain[sw=(0,0,0);ne=(20,20,0);t=0]",
            "startFire[loc=(10,10,0);t=0]",
        ] {
            assert_eq!(execute(ff, line), ForeFireErrorCode::Ok, "{line}");
        }
        let name = c("heatFlux");
        let mut buffer = vec![0.0; 400];
        let mut written = 0;
        assert_eq!(
            unsafe { forefire_get_double_array(ff, name.as_ptr(), buffer.as_mut_ptr(), 400, &mut written) },
            ForeFireErrorCode::UnknownLayer
        );

        let (kind, model, key) = (c("flux"), c("heatFluxBasic"), c("defaultHeatType"));
        assert_eq!(
            unsafe { forefire_add_layer(ff, kind.as_ptr(), model.as_ptr(), key.as_ptr()) },
            ForeFireErrorCode::Ok
        );
        assert_eq!(
            unsafe { forefire_advance_to(ff, 1.0, ptr::null_mut()) },
            ForeFireErrorCode::Ok
        );
        assert_eq!(
            unsafe { forefire_get_double_array(ff, name.as_ptr(), buffer.as_mut_ptr(), 400, &mut written) },
            ForeFireErrorCode::Ok
        );
        assert_eq!(written, 400);
        // Ignition cell at (10, 10) releases the nominal flux
        assert_eq!(buffer[10 * 20 + 10], 2000.0);
        assert!(buffer.iter().all(|&f| f == 0.0 || f == 2000.0));
        unsafe { forefire_destroy(ff) };
    }

    #[test]
    fn test_interrupt_flag_reaches_simulation() {
        let ff = new_instance();
        for line in [
            "setParameters[perimeterResolution=4;minimalPropagativeFrontDepth=4;bmapResolution=1]",
            "FireDomain[sw=(0,0,0);ne=(50,50,0);t=0]",
        ] {
            assert_eq!(execute(ff, line), ForeFireErrorCode::Ok);
        }
        assert_eq!(unsafe { forefire_interrupt(ff) }, ForeFireErrorCode::Ok);
        let mut summary = AdvanceSummary::default();
        assert_eq!(
            unsafe { forefire_advance_to(ff, 10.0, &mut summary) },
            ForeFireErrorCode::Ok
        );
        assert!(summary.interrupted);
        assert_eq!(summary.achieved_time, 0.0);
        unsafe { forefire_destroy(ff) };
    }
}
