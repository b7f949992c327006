//! Helper host error types

use std::path::PathBuf;

use netsh_helper_api::HelperError;
use netsh_helper_api::status;
use thiserror::Error;

use super::loader::LoaderError;

/// Errors that can occur while loading, registering or removing helpers
#[derive(Error, Debug)]
pub enum HelperHostError {
    /// A list or arena could not grow
    #[error("Out of memory")]
    OutOfMemory,

    /// The dynamic library could not be loaded
    #[error("Failed to load helper library {path}: {source}")]
    ModuleNotFound {
        path: PathBuf,
        #[source]
        source: LoaderError,
    },

    /// The library does not export `InitHelperDll`
    #[error("Helper library {path} has no entry point: {source}")]
    EntryPointMissing {
        path: PathBuf,
        #[source]
        source: LoaderError,
    },

    /// `InitHelperDll` reported failure
    #[error("Helper library {path} failed to initialize: {source}")]
    InitFailed {
        path: PathBuf,
        #[source]
        source: HelperError,
    },

    /// A single helper registration was rejected
    #[error("Helper registration failed: {0}")]
    Registration(#[from] HelperError),

    /// No loaded helper library has this short name
    #[error("Helper library '{name}' not found")]
    NotFound { name: String },

    /// Malformed command arguments
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Persisted helper list could not be parsed or written
    #[error("Helper store error: {0}")]
    Store(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl HelperHostError {
    /// Status code reported by the command surface
    pub fn status_code(&self) -> u32 {
        match self {
            Self::OutOfMemory => status::ERROR_OUTOFMEMORY,
            Self::ModuleNotFound { .. } => status::ERROR_DLL_LOAD_FAILED,
            Self::EntryPointMissing { .. } => status::ERROR_ENTRY_PT_NOT_FOUND,
            Self::InitFailed { source, .. } => source.status_code(),
            Self::Registration(e) => e.status_code(),
            Self::NotFound { .. } => status::ERROR_FILE_NOT_FOUND,
            Self::InvalidArgument(_) => status::ERROR_INVALID_PARAMETER,
            Self::Store(_) | Self::Io(_) => status::ERROR_GEN_FAILURE,
        }
    }
}
