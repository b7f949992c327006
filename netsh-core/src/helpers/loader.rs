//! Dynamic library loading behind a narrow seam
//!
//! [`PluginLoader`] maps a library path to a [`ModuleHandle`]; the handle
//! resolves the `InitHelperDll` symbol to an [`EntryPoint`]. [`NativeLoader`]
//! backs this with `libloading`; tests substitute scripted loaders.

use std::ffi::c_void;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use libloading::{Library, Symbol};
use netsh_helper_api::abi::{
    CallbackOwner, InitHelperDllFn, RawGuid, RawHelperAttributes, RawHostTable,
};
use netsh_helper_api::status::{ERROR_INVALID_PARAMETER, NO_ERROR};
use netsh_helper_api::{HelperAttributes, HelperError, HelperId, HelperRegistrar, check_status};
use thiserror::Error;

/// Errors from loading a library or resolving its entry point
#[derive(Error, Debug)]
pub enum LoaderError {
    #[error("{0}")]
    Library(#[from] libloading::Error),

    #[error("Library not found: {0}")]
    NotFound(PathBuf),

    #[error("Symbol not found: {0}")]
    SymbolNotFound(String),
}

/// Loads helper libraries by path
pub trait PluginLoader {
    fn load(&self, path: &Path) -> Result<Box<dyn ModuleHandle>, LoaderError>;
}

/// A loaded library. Dropping the handle releases it; native libraries stay
/// mapped until the last callback registered from them is dropped too.
pub trait ModuleHandle {
    fn resolve(&self, symbol: &str) -> Result<Box<dyn EntryPoint + '_>, LoaderError>;
}

/// The `InitHelperDll` entry point of a loaded library
pub trait EntryPoint {
    fn invoke(
        &self,
        netsh_version: u32,
        registrar: &mut dyn HelperRegistrar,
    ) -> Result<(), HelperError>;
}

/// Loader backed by the platform's dynamic linker
#[derive(Debug, Default, Clone, Copy)]
pub struct NativeLoader;

impl PluginLoader for NativeLoader {
    fn load(&self, path: &Path) -> Result<Box<dyn ModuleHandle>, LoaderError> {
        // SAFETY: Loading runs the library's initializers. Only libraries the
        // user added, or that were persisted by an earlier add, get here.
        let library = unsafe { Library::new(path)? };
        Ok(Box::new(NativeModule {
            library: Arc::new(library),
        }))
    }
}

struct NativeModule {
    library: Arc<Library>,
}

impl ModuleHandle for NativeModule {
    fn resolve(&self, symbol: &str) -> Result<Box<dyn EntryPoint + '_>, LoaderError> {
        // SAFETY: Helper libraries export InitHelperDll with the
        // InitHelperDllFn signature; that is the contract of the helper API.
        let init: Symbol<'_, InitHelperDllFn> = unsafe { self.library.get(symbol.as_bytes())? };
        Ok(Box::new(NativeEntryPoint {
            init,
            library: Arc::clone(&self.library),
        }))
    }
}

struct NativeEntryPoint<'lib> {
    init: Symbol<'lib, InitHelperDllFn>,
    library: Arc<Library>,
}

/// What `RawHostTable::context` points to during `InitHelperDll`
struct RegistrationContext<'a> {
    registrar: &'a mut dyn HelperRegistrar,
    /// Handed to every callback registered, keeping the library mapped
    owner: CallbackOwner,
}

impl EntryPoint for NativeEntryPoint<'_> {
    fn invoke(
        &self,
        netsh_version: u32,
        registrar: &mut dyn HelperRegistrar,
    ) -> Result<(), HelperError> {
        let mut context = RegistrationContext {
            registrar,
            owner: Arc::clone(&self.library) as CallbackOwner,
        };
        let table = RawHostTable {
            context: (&mut context as *mut RegistrationContext<'_>).cast::<c_void>(),
            register_helper: register_helper_trampoline,
        };

        // SAFETY: `table` and the context it points to outlive the call;
        // the library must not keep the table after InitHelperDll returns.
        let status = unsafe { (*self.init)(netsh_version, &table) };
        check_status(status)
    }
}

/// Called by a helper library from inside `InitHelperDll`
unsafe extern "C" fn register_helper_trampoline(
    context: *mut c_void,
    parent: *const RawGuid,
    attributes: *const RawHelperAttributes,
) -> u32 {
    // SAFETY: `context` is the RegistrationContext placed in the table by
    // NativeEntryPoint::invoke, which is still on the stack.
    let context = unsafe { context.cast::<RegistrationContext<'_>>().as_mut() };
    let raw = unsafe { attributes.as_ref() };
    let (Some(context), Some(raw)) = (context, raw) else {
        return ERROR_INVALID_PARAMETER;
    };

    let parent = unsafe { parent.as_ref() }.map(|guid| HelperId::from(*guid));
    // SAFETY: the callbacks live in the library that `owner` keeps mapped.
    let attributes = unsafe { HelperAttributes::from_raw(raw, Arc::clone(&context.owner)) };

    match context.registrar.register_helper(parent, attributes) {
        Ok(()) => NO_ERROR,
        Err(e) => e.status_code(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Recorder {
        registered: Vec<(Option<HelperId>, HelperId)>,
        kept: Vec<HelperAttributes>,
    }

    impl HelperRegistrar for Recorder {
        fn register_helper(
            &mut self,
            parent: Option<HelperId>,
            attributes: HelperAttributes,
        ) -> Result<(), HelperError> {
            if self.registered.iter().any(|(_, id)| *id == attributes.id) {
                return Err(HelperError::AlreadyRegistered { id: attributes.id });
            }
            self.registered.push((parent, attributes.id));
            self.kept.push(attributes);
            Ok(())
        }
    }

    unsafe extern "C" fn noop_start(_parent: *const RawGuid, _version: u32) -> u32 {
        NO_ERROR
    }

    fn context(recorder: &mut Recorder, owner: CallbackOwner) -> RegistrationContext<'_> {
        RegistrationContext {
            registrar: recorder,
            owner,
        }
    }

    #[test]
    fn test_native_loader_missing_library() {
        let result = NativeLoader.load(Path::new("/nonexistent/netsh/helper.so"));
        assert!(matches!(result, Err(LoaderError::Library(_))));
    }

    #[test]
    fn test_trampoline_forwards_registration() {
        let mut recorder = Recorder::default();
        let mut ctx = context(&mut recorder, Arc::new(()));
        let raw_ctx = (&mut ctx as *mut RegistrationContext<'_>).cast::<c_void>();

        let root = RawGuid::from(HelperId::from_u128(1));
        let child = RawHelperAttributes::new(RawGuid::from(HelperId::from_u128(2)));
        let root_attrs = RawHelperAttributes::new(root);

        let first = unsafe { register_helper_trampoline(raw_ctx, std::ptr::null(), &root_attrs) };
        let second = unsafe { register_helper_trampoline(raw_ctx, &root, &child) };
        let duplicate =
            unsafe { register_helper_trampoline(raw_ctx, std::ptr::null(), &root_attrs) };
        drop(ctx);

        assert_eq!(first, NO_ERROR);
        assert_eq!(second, NO_ERROR);
        assert_eq!(
            duplicate,
            netsh_helper_api::status::ERROR_HELPER_ALREADY_REGISTERED
        );
        assert_eq!(
            recorder.registered,
            vec![
                (None, HelperId::from_u128(1)),
                (Some(HelperId::from_u128(1)), HelperId::from_u128(2)),
            ]
        );
    }

    #[test]
    fn test_trampoline_rejects_null_attributes() {
        let mut recorder = Recorder::default();
        let mut ctx = context(&mut recorder, Arc::new(()));
        let raw_ctx = (&mut ctx as *mut RegistrationContext<'_>).cast::<c_void>();

        let status =
            unsafe { register_helper_trampoline(raw_ctx, std::ptr::null(), std::ptr::null()) };
        drop(ctx);
        assert_eq!(status, ERROR_INVALID_PARAMETER);
        assert!(recorder.registered.is_empty());
    }

    #[test]
    fn test_registered_callbacks_hold_library_owner() {
        let owner: CallbackOwner = Arc::new(());
        let mut recorder = Recorder::default();
        let mut ctx = context(&mut recorder, Arc::clone(&owner));
        let raw_ctx = (&mut ctx as *mut RegistrationContext<'_>).cast::<c_void>();

        let mut raw = RawHelperAttributes::new(RawGuid::from(HelperId::from_u128(7)));
        raw.start = Some(noop_start);
        let status = unsafe { register_helper_trampoline(raw_ctx, std::ptr::null(), &raw) };
        drop(ctx);
        assert_eq!(status, NO_ERROR);

        let start = recorder.kept[0].start.clone().unwrap();
        recorder.kept.clear();
        assert_eq!(Arc::strong_count(&owner), 2);

        assert!(start().is_ok());
        drop(start);
        assert_eq!(Arc::strong_count(&owner), 1);
    }
}
