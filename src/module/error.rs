//! Module loading error types.

use std::path::PathBuf;
use thiserror::Error;

/// Result type for module operations.
pub type ModuleResult<T> = Result<T, ModuleError>;

/// Errors that can occur while resolving or loading modules.
#[derive(Debug, Error)]
pub enum ModuleError {
    /// A resolver was created without any search root.
    #[error("At least one search root must be supplied")]
    NoSearchRoots,

    /// The reference text could not be interpreted.
    #[error("Invalid module reference: '{0}'")]
    InvalidReference(String),

    /// A version string is not a dotted numeric version.
    #[error("Invalid module version: '{0}'")]
    InvalidVersion(String),

    /// No default location or resolution hook could supply the module.
    #[error("Could not locate module '{reference}'")]
    NotFound { reference: String },

    /// Module file does not exist.
    #[error("Module file not found: {0}")]
    FileNotFound(PathBuf),

    /// The module image is malformed.
    #[error("Invalid module image {path}: {message}")]
    InvalidImage { path: PathBuf, message: String },

    /// A dependency declared by the module could not be loaded.
    #[error("Module '{module}' depends on '{dependency}' which could not be loaded: {source}")]
    MissingDependency {
        module: String,
        dependency: String,
        #[source]
        source: Box<ModuleError>,
    },

    /// Loading the module re-entered itself through its dependency chain.
    #[error("Dependency cycle detected while loading {0}")]
    DependencyCycle(PathBuf),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl ModuleError {
    /// Whether the error means the module simply could not be found.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. } | Self::FileNotFound(_))
    }
}
