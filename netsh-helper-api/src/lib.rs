//! netsh-helper-api - the contract between the network shell and its helpers
//!
//! A helper library is a native dynamic library that exports one C entry
//! point, `InitHelperDll`. When the shell loads the library it calls that
//! entry point once; the library registers one or more helpers, each
//! identified by a [`HelperId`], optionally nested under a helper that is
//! already registered. After all libraries are loaded the shell runs every
//! helper's start routine.
//!
//! # Example
//!
//! ```ignore
//! use netsh_helper_api::abi::{HelperHostTable, RawGuid, RawHelperAttributes};
//! use netsh_helper_api::{HelperError, HelperId, export_init_helper_dll};
//!
//! const MY_HELPER: HelperId = HelperId::from_u128(0x1234);
//!
//! unsafe extern "C" fn start(_parent: *const RawGuid, _version: u32) -> u32 {
//!     0
//! }
//!
//! fn init(_version: u32, host: &HelperHostTable<'_>) -> Result<(), HelperError> {
//!     let mut attributes = RawHelperAttributes::new(RawGuid::from(MY_HELPER));
//!     attributes.start = Some(start);
//!     host.register_helper(None, &attributes)
//! }
//!
//! export_init_helper_dll!(init);
//! ```

pub mod abi;
pub mod error;
pub mod status;
pub mod types;

pub use error::{HelperError, check_status};
pub use types::{HelperAttributes, HelperId, StartFn, StopFn};

/// Protocol version passed to `InitHelperDll`
pub const NETSH_VERSION: u32 = 5;

/// Symbol every helper library must export
pub const INIT_HELPER_DLL_SYMBOL: &str = "InitHelperDll";

/// Receives helper registrations while a library's entry point runs.
///
/// The shell hands an implementation of this trait to the entry point of
/// the library currently loading; every helper registered through it is
/// attributed to that library.
pub trait HelperRegistrar {
    /// Register a helper as a root (`parent == None`) or as a child of an
    /// already registered helper
    fn register_helper(
        &mut self,
        parent: Option<HelperId>,
        attributes: HelperAttributes,
    ) -> Result<(), HelperError>;
}

/// Export an init function as the library's `InitHelperDll` entry point.
///
/// The init function has the signature
/// `fn(u32, &HelperHostTable<'_>) -> Result<(), HelperError>` and receives
/// the protocol version the shell was built against.
///
/// # Usage
///
/// ```ignore
/// netsh_helper_api::export_init_helper_dll!(init);
/// ```
#[macro_export]
macro_rules! export_init_helper_dll {
    ($init:path) => {
        #[allow(non_snake_case)]
        #[unsafe(no_mangle)]
        pub unsafe extern "C" fn InitHelperDll(
            netsh_version: u32,
            host: *const $crate::abi::RawHostTable,
        ) -> u32 {
            let Some(host) = (unsafe { $crate::abi::HelperHostTable::from_raw(host) }) else {
                return $crate::status::ERROR_INVALID_PARAMETER;
            };
            match $init(netsh_version, &host) {
                Ok(()) => $crate::status::NO_ERROR,
                Err(e) => e.status_code(),
            }
        }
    };
}
