//! C ABI structures exchanged with helper libraries.
//!
//! A helper library exports `InitHelperDll` with the [`InitHelperDllFn`]
//! signature. The shell calls it with [`NETSH_VERSION`](crate::NETSH_VERSION)
//! and a pointer to a [`RawHostTable`]; the library registers its helpers by
//! calling back through that table before `InitHelperDll` returns. The table
//! is only valid for the duration of that call.

use std::any::Any;
use std::ffi::c_void;
use std::ptr;
use std::sync::Arc;

use crate::error::{HelperError, check_status};
use crate::types::{HelperAttributes, HelperId};

/// GUID in its C field layout
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawGuid {
    pub data1: u32,
    pub data2: u16,
    pub data3: u16,
    pub data4: [u8; 8],
}

impl From<HelperId> for RawGuid {
    fn from(id: HelperId) -> Self {
        let (data1, data2, data3, data4) = id.as_uuid().as_fields();
        Self {
            data1,
            data2,
            data3,
            data4: *data4,
        }
    }
}

impl From<RawGuid> for HelperId {
    fn from(raw: RawGuid) -> Self {
        HelperId::from_fields(raw.data1, raw.data2, raw.data3, raw.data4)
    }
}

/// `start(parent, version)`; the shell always passes a null parent and version 0
pub type RawStartFn = unsafe extern "C" fn(parent: *const RawGuid, version: u32) -> u32;

pub type RawStopFn = unsafe extern "C" fn(reserved: u32) -> u32;

/// Helper attributes as passed by a helper library
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct RawHelperAttributes {
    pub version: u32,
    pub reserved: u32,
    pub guid_helper: RawGuid,
    pub start: Option<RawStartFn>,
    pub stop: Option<RawStopFn>,
}

impl RawHelperAttributes {
    pub const fn new(guid_helper: RawGuid) -> Self {
        Self {
            version: 0,
            reserved: 0,
            guid_helper,
            start: None,
            stop: None,
        }
    }
}

pub type RawRegisterHelperFn = unsafe extern "C" fn(
    context: *mut c_void,
    parent: *const RawGuid,
    attributes: *const RawHelperAttributes,
) -> u32;

/// Callback table handed to `InitHelperDll`
#[repr(C)]
pub struct RawHostTable {
    /// Opaque host state, passed back unchanged to `register_helper`
    pub context: *mut c_void,
    pub register_helper: RawRegisterHelperFn,
}

/// Signature of the `InitHelperDll` entry point
pub type InitHelperDllFn = unsafe extern "C" fn(netsh_version: u32, host: *const RawHostTable) -> u32;

/// Keeps the code behind raw callbacks mapped; typically the loaded library
pub type CallbackOwner = Arc<dyn Any + Send + Sync>;

impl HelperAttributes {
    /// Copy raw attributes into their owned form.
    ///
    /// Every callback built here holds a clone of `owner`, so the code the
    /// function pointers refer to stays mapped for as long as the returned
    /// attributes, or any clone of them, are alive.
    ///
    /// # Safety
    ///
    /// The start and stop function pointers must stay callable for as long as
    /// `owner` is alive.
    pub unsafe fn from_raw(raw: &RawHelperAttributes, owner: CallbackOwner) -> Self {
        let mut attributes = HelperAttributes::new(HelperId::from(raw.guid_helper));
        if let Some(start) = raw.start {
            let owner = Arc::clone(&owner);
            attributes.start = Some(Arc::new(move || {
                let _owner = &owner;
                check_status(unsafe { start(ptr::null(), 0) })
            }));
        }
        if let Some(stop) = raw.stop {
            attributes.stop = Some(Arc::new(move || {
                let _owner = &owner;
                check_status(unsafe { stop(0) })
            }));
        }
        attributes
    }
}

/// Library-side view of the host callback table
pub struct HelperHostTable<'a> {
    raw: &'a RawHostTable,
}

impl<'a> HelperHostTable<'a> {
    /// Wrap the pointer received by `InitHelperDll`.
    ///
    /// # Safety
    ///
    /// `host` must be null or point to a table that outlives `'a`.
    pub unsafe fn from_raw(host: *const RawHostTable) -> Option<Self> {
        unsafe { host.as_ref() }.map(|raw| Self { raw })
    }

    /// Register a helper, optionally under an already registered parent
    pub fn register_helper(
        &self,
        parent: Option<HelperId>,
        attributes: &RawHelperAttributes,
    ) -> Result<(), HelperError> {
        let parent = parent.map(RawGuid::from);
        let parent_ptr = parent
            .as_ref()
            .map_or(ptr::null(), |guid| guid as *const RawGuid);
        let code = unsafe { (self.raw.register_helper)(self.raw.context, parent_ptr, attributes) };
        check_status(code)
    }
}
