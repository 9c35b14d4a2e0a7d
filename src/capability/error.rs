//! Capability discovery error types.

use thiserror::Error;

use crate::module::ModuleError;

/// Result type for capability operations.
pub type CapabilityResult<T> = Result<T, CapabilityError>;

/// Errors that can occur while discovering or instantiating capabilities.
#[derive(Debug, Error)]
pub enum CapabilityError {
    /// The type table names a constructor the catalog does not know.
    #[error("No constructor registered for '{symbol}' (type '{type_name}')")]
    UnknownFactory { type_name: String, symbol: String },

    /// The constructor reported a failure.
    #[error("Failed to construct '{type_name}': {message}")]
    Construction { type_name: String, message: String },

    /// The constructor panicked.
    #[error("Constructor of '{type_name}' panicked: {message}")]
    Panicked { type_name: String, message: String },

    /// Module loading failed.
    #[error(transparent)]
    Module(#[from] ModuleError),
}
