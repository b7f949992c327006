//! Numeric status codes shared by the shell and helper libraries

/// Success
pub const NO_ERROR: u32 = 0;

pub const ERROR_FILE_NOT_FOUND: u32 = 2;

pub const ERROR_OUTOFMEMORY: u32 = 14;

/// Generic failure, used for panicking callbacks and I/O errors
pub const ERROR_GEN_FAILURE: u32 = 31;

pub const ERROR_INVALID_PARAMETER: u32 = 87;

/// First netsh-specific status code
pub const NETSH_ERROR_BASE: u32 = 15000;

/// `InitHelperDll` could not be resolved in the library
pub const ERROR_ENTRY_PT_NOT_FOUND: u32 = NETSH_ERROR_BASE + 5;

/// The helper library could not be loaded
pub const ERROR_DLL_LOAD_FAILED: u32 = NETSH_ERROR_BASE + 6;

pub const ERROR_HELPER_ALREADY_REGISTERED: u32 = NETSH_ERROR_BASE + 18;

/// Short human-readable description of a status code
pub fn describe(code: u32) -> &'static str {
    match code {
        NO_ERROR => "The operation completed successfully.",
        ERROR_FILE_NOT_FOUND => "The system cannot find the file specified.",
        ERROR_OUTOFMEMORY => "Not enough memory is available to complete this operation.",
        ERROR_GEN_FAILURE => "A device attached to the system is not functioning.",
        ERROR_INVALID_PARAMETER => "The parameter is incorrect.",
        ERROR_ENTRY_PT_NOT_FOUND => "The helper library does not export InitHelperDll.",
        ERROR_DLL_LOAD_FAILED => "The helper library could not be loaded.",
        ERROR_HELPER_ALREADY_REGISTERED => "The helper is already registered.",
        _ => "Unknown error.",
    }
}
