//! Error types shared by helper authors and the shell

use thiserror::Error;

use crate::status;
use crate::types::HelperId;

/// Errors a helper registration or helper callback can produce
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum HelperError {
    /// A helper with the same id is already in the registry
    #[error("Helper {id} is already registered")]
    AlreadyRegistered { id: HelperId },

    /// The requested parent helper has not been registered
    #[error("Parent helper {parent} is not registered")]
    ParentNotFound { parent: HelperId },

    /// The registry could not grow
    #[error("Out of memory")]
    OutOfMemory,

    /// Malformed arguments crossed the ABI boundary
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    /// A helper callback panicked instead of returning
    #[error("Helper callback panicked")]
    Panicked,

    /// A helper callback returned a non-zero status
    #[error("Helper returned status {0}")]
    Status(u32),
}

impl HelperError {
    /// Numeric status reported across the C ABI
    pub fn status_code(&self) -> u32 {
        match self {
            Self::AlreadyRegistered { .. } => status::ERROR_HELPER_ALREADY_REGISTERED,
            Self::ParentNotFound { .. } | Self::InvalidParameter(_) => {
                status::ERROR_INVALID_PARAMETER
            }
            Self::OutOfMemory => status::ERROR_OUTOFMEMORY,
            Self::Panicked => status::ERROR_GEN_FAILURE,
            Self::Status(code) => *code,
        }
    }
}

/// Convert a status returned by a helper callback into a `Result`
pub fn check_status(code: u32) -> Result<(), HelperError> {
    if code == status::NO_ERROR {
        Ok(())
    } else {
        Err(HelperError::Status(code))
    }
}
