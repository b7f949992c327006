//! Helper registry for netsh
//!
//! This module provides the infrastructure for loading and managing helpers:
//!
//! - [`HelperHost`]: Loads helper libraries and owns the helpers they register
//! - [`HelperForest`]: The hierarchy of registered helpers, walked depth first
//! - [`ModuleList`]: The loaded helper libraries, newest first
//! - [`ReferenceStore`]: The persisted list of libraries to load at startup
//! - [`HelperHostError`]: Error types for helper operations
//!
//! # Helper Libraries
//!
//! A helper library exports `InitHelperDll`. While it runs, the library calls
//! back into the host to register helpers; each helper names an optional
//! parent helper, so several libraries can build one tree between them.
//! Registered helpers are started in depth-first order.
//!
//! # Example
//!
//! ```ignore
//! use netsh_core::helpers::{HelperHost, HelperHostConfig};
//!
//! let mut host = HelperHost::new(HelperHostConfig::default());
//!
//! // Load every persisted library and start its helpers
//! host.load_all_persisted();
//!
//! // Commands return a numeric status
//! let status = host.add_helper(&["/usr/lib/netsh/ifmon.so"]);
//! host.show_helpers(Some(&host.helper_contexts()), &mut std::io::stdout());
//! ```

mod commands;
mod context;
mod display;
mod error;
mod forest;
mod host;
mod loader;
mod modules;
mod stack;
mod store;

pub use commands::{ROOT_CONTEXT, status_of};
pub use context::ContextEntry;
pub use display::{HelperTable, MAX_INDENT_DEPTH, format_row};
pub use error::HelperHostError;
pub use forest::{DepthFirst, HelperEntry, HelperForest, HelperIdx, StartSummary};
pub use host::{HelperHost, HelperHostConfig};
pub use loader::{EntryPoint, LoaderError, ModuleHandle, NativeLoader, PluginLoader};
pub use modules::{HelperModule, ModuleId, ModuleList};
pub use stack::TraversalStack;
pub use store::{HelperReferences, MemoryReferenceStore, ReferenceStore, TomlReferenceStore};
