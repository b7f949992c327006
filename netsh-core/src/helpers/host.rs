//! HelperHost - owns the loaded modules and the helper forest

use std::panic::AssertUnwindSafe;
use std::path::{Path, PathBuf};

use netsh_helper_api::{
    HelperAttributes, HelperError, HelperId, HelperRegistrar, INIT_HELPER_DLL_SYMBOL,
    NETSH_VERSION,
};

use super::error::HelperHostError;
use super::forest::{HelperEntry, HelperForest, StartSummary};
use super::loader::{NativeLoader, PluginLoader};
use super::modules::{HelperModule, ModuleId, ModuleList};
use super::store::{ReferenceStore, TomlReferenceStore};

/// Configuration for HelperHost
#[derive(Debug, Clone)]
pub struct HelperHostConfig {
    /// Persisted helper list (`~/.config/netsh/helpers.toml`)
    pub store_path: PathBuf,
}

impl Default for HelperHostConfig {
    fn default() -> Self {
        Self {
            store_path: netsh_paths::helper_store_path(),
        }
    }
}

/// Loads helper libraries, tracks the helpers they register, and starts,
/// stops and removes them.
///
/// The module currently running its `InitHelperDll` is held in a single slot
/// for the duration of that one call; helpers registered meanwhile are
/// attributed to it.
pub struct HelperHost {
    modules: ModuleList,
    forest: HelperForest,
    current_module: Option<ModuleId>,
    loader: Box<dyn PluginLoader>,
    store: Box<dyn ReferenceStore>,
}

/// Registrar handed to an entry point while its module loads
struct ModuleRegistrar<'a> {
    forest: &'a mut HelperForest,
    current_module: &'a Option<ModuleId>,
}

impl HelperRegistrar for ModuleRegistrar<'_> {
    fn register_helper(
        &mut self,
        parent: Option<HelperId>,
        attributes: HelperAttributes,
    ) -> Result<(), HelperError> {
        self.forest
            .register(parent, attributes, *self.current_module)
            .map(|_| ())
    }
}

impl HelperHost {
    /// Create a host that loads native libraries and persists to the
    /// configured TOML file
    pub fn new(config: HelperHostConfig) -> Self {
        Self::with_parts(
            Box::new(NativeLoader),
            Box::new(TomlReferenceStore::new(config.store_path)),
        )
    }

    pub fn with_parts(loader: Box<dyn PluginLoader>, store: Box<dyn ReferenceStore>) -> Self {
        Self {
            modules: ModuleList::new(),
            forest: HelperForest::new(),
            current_module: None,
            loader,
            store,
        }
    }

    pub fn modules(&self) -> &ModuleList {
        &self.modules
    }

    pub fn forest(&self) -> &HelperForest {
        &self.forest
    }

    /// Module whose entry point is running, if any
    pub fn current_module(&self) -> Option<ModuleId> {
        self.current_module
    }

    pub fn find_helper(&self, id: HelperId) -> Option<&HelperEntry> {
        self.forest.find(id)
    }

    /// Short name of the module a helper is attributed to, empty if none
    pub fn module_short_name(&self, module: Option<ModuleId>) -> &str {
        module
            .and_then(|id| self.modules.get(id))
            .map_or("", HelperModule::short_name)
    }

    /// Register a helper on behalf of the module currently loading, or of
    /// no module when called outside a load
    pub fn register_helper(
        &mut self,
        parent: Option<HelperId>,
        attributes: HelperAttributes,
    ) -> Result<(), HelperHostError> {
        self.forest
            .register(parent, attributes, self.current_module)
            .map(|_| ())
            .map_err(HelperHostError::from)
    }

    /// Load a helper library and run its `InitHelperDll`.
    ///
    /// Loads never nest: this takes `&mut self`, and the entry point only
    /// sees a registrar, never the host.
    ///
    /// The module is linked at the head of the list before its entry point
    /// runs. Any failure unlinks it again, removes whatever helpers it had
    /// registered, and releases the library. With `persist`, a successful
    /// load is recorded in the reference store; a store failure is logged
    /// and does not fail the load.
    pub fn load_helper_dll(
        &mut self,
        path: &Path,
        persist: bool,
    ) -> Result<ModuleId, HelperHostError> {
        if path.as_os_str().is_empty() {
            return Err(HelperHostError::InvalidArgument(
                "helper library path is empty".to_string(),
            ));
        }
        debug_assert!(self.current_module.is_none());

        let id = self.modules.push_front(HelperModule::new(path))?;

        if let Err(e) = self.init_module(id, path) {
            tracing::debug!(path = %path.display(), error = %e, "Unwinding failed helper load");
            self.forest.remove_module_helpers(id);
            self.modules.unlink(id);
            return Err(e);
        }

        if let Some(module) = self.modules.get(id) {
            tracing::info!(
                module = %module.short_name(),
                path = %path.display(),
                "Helper library loaded"
            );
            if persist && let Err(e) = self.store.set(module.value_name(), path) {
                tracing::warn!(
                    module = %module.short_name(),
                    error = %e,
                    "Failed to persist helper library"
                );
            }
        }

        Ok(id)
    }

    fn init_module(&mut self, id: ModuleId, path: &Path) -> Result<(), HelperHostError> {
        let handle = self
            .loader
            .load(path)
            .map_err(|source| HelperHostError::ModuleNotFound {
                path: path.to_path_buf(),
                source,
            })?;

        let Self {
            modules,
            forest,
            current_module,
            ..
        } = self;

        let module = modules.get_mut(id).ok_or_else(|| HelperHostError::NotFound {
            name: path.display().to_string(),
        })?;
        module.set_handle(handle);
        let Some(handle) = module.handle() else {
            return Err(HelperHostError::NotFound {
                name: path.display().to_string(),
            });
        };

        let entry = handle
            .resolve(INIT_HELPER_DLL_SYMBOL)
            .map_err(|source| HelperHostError::EntryPointMissing {
                path: path.to_path_buf(),
                source,
            })?;

        *current_module = Some(id);
        let result = {
            let mut registrar = ModuleRegistrar {
                forest: &mut *forest,
                current_module: &*current_module,
            };
            std::panic::catch_unwind(AssertUnwindSafe(|| {
                entry.invoke(NETSH_VERSION, &mut registrar)
            }))
        };
        *current_module = None;

        tracing::debug!(path = %path.display(), ok = matches!(result, Ok(Ok(()))), "InitHelperDll returned");

        match result {
            Ok(Ok(())) => Ok(()),
            Ok(Err(source)) => Err(HelperHostError::InitFailed {
                path: path.to_path_buf(),
                source,
            }),
            Err(_) => {
                tracing::error!(path = %path.display(), "Helper library panicked in InitHelperDll");
                Err(HelperHostError::InitFailed {
                    path: path.to_path_buf(),
                    source: HelperError::Panicked,
                })
            }
        }
    }

    /// Run every pending start routine in the forest
    pub fn start_helpers(&mut self) -> StartSummary {
        let summary = self.forest.start_all();
        tracing::debug!(
            attempted = summary.attempted,
            started = summary.started,
            "Helper start pass complete"
        );
        summary
    }

    /// Load every persisted library, then start all helpers once.
    ///
    /// A library that fails to load is logged and skipped. Returns the number
    /// of libraries loaded.
    pub fn load_all_persisted(&mut self) -> usize {
        let references = match self.store.enumerate() {
            Ok(references) => references,
            Err(e) => {
                tracing::warn!(error = %e, "Failed to read persisted helper list");
                Vec::new()
            }
        };

        let mut loaded = 0;
        for (name, path) in references {
            tracing::debug!(helper_dll = %name, path = %path.display(), "Loading persisted helper library");
            match self.load_helper_dll(&path, false) {
                Ok(_) => loaded += 1,
                Err(e) => {
                    tracing::warn!(helper_dll = %name, error = %e, "Failed to load persisted helper library");
                }
            }
        }

        self.start_helpers();
        loaded
    }

    /// Delete a loaded library by short name.
    ///
    /// Helpers the library registered are stopped and removed with their
    /// subtrees, the persisted reference is removed (best effort), and the
    /// library is released. Returns the number of helpers removed.
    pub fn delete_helper_dll(&mut self, short_name: &str) -> Result<usize, HelperHostError> {
        let not_found = || HelperHostError::NotFound {
            name: short_name.to_string(),
        };

        let id = self.modules.find_by_short_name(short_name).ok_or_else(not_found)?;
        let removed = self.forest.remove_module_helpers(id);
        let module = self.modules.unlink(id).ok_or_else(not_found)?;

        if let Err(e) = self.store.delete(module.value_name()) {
            tracing::warn!(
                module = %module.short_name(),
                error = %e,
                "Failed to remove persisted helper library"
            );
        }

        tracing::info!(module = %module.short_name(), helpers = removed, "Helper library deleted");
        Ok(removed)
    }

    /// Stop and drop every helper, then release every library
    pub fn unload_all(&mut self) {
        let helpers = self.forest.clear();
        let mut modules = 0;
        while let Some(module) = self.modules.pop_front() {
            tracing::debug!(module = %module.short_name(), "Releasing helper library");
            modules += 1;
        }
        if helpers > 0 || modules > 0 {
            tracing::debug!(helpers, modules, "Helpers unloaded");
        }
    }
}

impl Drop for HelperHost {
    fn drop(&mut self) {
        self.unload_all();
    }
}
