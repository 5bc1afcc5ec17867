use forefire_core::FireError;
use std::cell::RefCell;
use std::ffi::CString;
use std::os::raw::c_char;
use std::ptr;

/// Common interface for FFI error types.
///
/// - `code()` - the error code passed across the FFI boundary
/// - `msg()` - the message kept for `forefire_get_last_error`
pub(crate) trait ForeFireError {
    fn code(&self) -> ForeFireErrorCode;

    fn msg(&self) -> &str;
}

/// Error raised inside the binding, carrying a code and a message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct BindingError {
    code: ForeFireErrorCode,
    msg: String,
}

impl BindingError {
    /// Null pointer passed where non-null required.
    pub fn null_pointer(param_name: &str) -> Self {
        Self {
            code: ForeFireErrorCode::NullPointer,
            msg: format!("Parameter '{param_name}' cannot be null"),
        }
    }

    /// Lock poisoned by a panic in another thread.
    pub fn lock_poisoned(lock_name: &str) -> Self {
        Self {
            code: ForeFireErrorCode::LockPoisoned,
            msg: format!("Lock '{lock_name}' was poisoned by a panic in another thread"),
        }
    }

    /// String argument that is not valid UTF-8 (or holds an interior NUL on output).
    pub fn invalid_string(param_name: &str) -> Self {
        Self {
            code: ForeFireErrorCode::InvalidString,
            msg: format!("Parameter '{param_name}' is not a valid UTF-8 C string"),
        }
    }

    /// Caller buffer too small for the requested array.
    pub fn buffer_too_small(needed: usize, given: usize) -> Self {
        Self {
            code: ForeFireErrorCode::BufferTooSmall,
            msg: format!("Buffer holds {given} values, {needed} required"),
        }
    }

    /// Numeric argument out of its valid range.
    pub fn invalid_parameter(message: String) -> Self {
        Self {
            code: ForeFireErrorCode::InvalidParameter,
            msg: message,
        }
    }
}

impl ForeFireError for BindingError {
    fn code(&self) -> ForeFireErrorCode {
        self.code
    }

    fn msg(&self) -> &str {
        &self.msg
    }
}

impl From<FireError> for BindingError {
    fn from(error: FireError) -> Self {
        let code = match &error {
            FireError::Configuration(_) => ForeFireErrorCode::Configuration,
            FireError::UnknownLayer(_) => ForeFireErrorCode::UnknownLayer,
            FireError::UnknownFuelIndex(_) => ForeFireErrorCode::UnknownFuelIndex,
            FireError::UnknownCoefficient(_) => ForeFireErrorCode::UnknownCoefficient,
            FireError::InvalidRate { .. } => ForeFireErrorCode::InvalidRate,
            FireError::Topology { .. } => ForeFireErrorCode::Topology,
            FireError::OutOfBounds { .. } => ForeFireErrorCode::OutOfBounds,
            FireError::UnknownModel(_) => ForeFireErrorCode::UnknownModel,
            FireError::Command(_) => ForeFireErrorCode::Command,
        };
        Self {
            code,
            msg: error.to_string(),
        }
    }
}

/// FFI error codes returned by every fallible binding function.
/// Follows standard C convention: 0 = success, non-zero = error.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ForeFireErrorCode {
    /// Operation completed successfully.
    Ok = 0,

    /// Null pointer passed where non-null required.
    NullPointer = 1,

    /// Internal lock poisoned by a panic.
    LockPoisoned = 2,

    /// String argument is not valid UTF-8.
    InvalidString = 3,

    /// Output buffer too small.
    BufferTooSmall = 4,

    /// Numeric argument out of range.
    InvalidParameter = 5,

    /// Bad or missing simulation parameter, or no domain defined yet.
    Configuration = 10,

    /// Layer name never registered.
    UnknownLayer = 11,

    /// Fuel index absent from the fuel table.
    UnknownFuelIndex = 12,

    /// Coefficient absent from the fuel table.
    UnknownCoefficient = 13,

    /// Rate-of-spread model produced NaN or infinity.
    InvalidRate = 14,

    /// Malformed front chain.
    Topology = 15,

    /// Raster access outside a layer with the strict clamp policy.
    OutOfBounds = 16,

    /// Propagation model name not registered.
    UnknownModel = 17,

    /// Command string could not be parsed or executed.
    Command = 18,
}

impl From<BindingError> for ForeFireErrorCode {
    fn from(error: BindingError) -> Self {
        error.code
    }
}

thread_local! {
    /// Most recent FFI error on this thread (message, code).
    /// The CString is kept here so the pointer handed out stays valid.
    static LAST_ERROR: RefCell<(Option<CString>, ForeFireErrorCode)> =
        const { RefCell::new((None, ForeFireErrorCode::Ok)) };
}

pub(crate) fn with_last_error<F, R>(f: F) -> R
where
    F: FnOnce(&(Option<CString>, ForeFireErrorCode)) -> R,
{
    LAST_ERROR.with_borrow(f)
}

pub(crate) fn with_last_error_mut<F, R>(f: F) -> R
where
    F: FnOnce(&mut (Option<CString>, ForeFireErrorCode)) -> R,
{
    LAST_ERROR.with_borrow_mut(f)
}

/// Retrieve the most recent FFI error message as a null-terminated C string.
///
/// Returns `null` if the last call on this thread succeeded.
///
/// The pointer is valid until the next binding call on this thread.
/// **DO NOT FREE THIS POINTER** - it is managed internally.
///
/// Example:
/// ```c
/// if (forefire_execute(ff, "goTo[t=60]", &out) != Ok) {
///     const char* error = forefire_get_last_error();
///     if (error) {
///         printf("goTo failed: %s\n", error);
///     }
/// }
/// ```
#[no_mangle]
pub extern "C" fn forefire_get_last_error() -> *const c_char {
    with_last_error(|(cstring, _code)| cstring.as_ref().map_or(ptr::null(), |cs| cs.as_ptr()))
}

/// Retrieve the most recent FFI error code on this thread.
#[no_mangle]
pub extern "C" fn forefire_get_last_error_code() -> ForeFireErrorCode {
    with_last_error(|(_cstring, code)| *code)
}
