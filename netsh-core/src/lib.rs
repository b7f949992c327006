//! netsh-core: Helper registry for the netsh shell
//!
//! This crate loads helper libraries and keeps track of the helpers they
//! register:
//!
//! - **Helper host** - [`HelperHost`] loads libraries, runs their entry
//!   points, and starts, stops and deletes their helpers
//! - **Helper forest** - [`HelperForest`] holds helpers as a hierarchy keyed
//!   by [`netsh_helper_api::HelperId`]
//! - **Persistence** - [`ReferenceStore`] records which libraries to load at
//!   startup
//! - **Commands** - `add helper`, `delete helper` and `show helper`, each
//!   returning a numeric status
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────┐
//! │                 HelperHost                   │
//! │  ┌──────────────┐      ┌──────────────────┐  │
//! │  │  ModuleList  │◄─────│   HelperForest   │  │
//! │  │ (libraries)  │ owner│    (helpers)     │  │
//! │  └──────┬───────┘      └──────────────────┘  │
//! │         │ PluginLoader                       │
//! │  ┌──────▼───────┐      ┌──────────────────┐  │
//! │  │ ModuleHandle │      │  ReferenceStore  │  │
//! │  └──────────────┘      └──────────────────┘  │
//! └──────────────────────────────────────────────┘
//! ```

pub mod helpers;

pub use helpers::{
    ContextEntry, HelperForest, HelperHost, HelperHostConfig, HelperHostError, ReferenceStore,
};
