//! Module loading and resolution.
//!
//! Analyzer packages ship their rules as *modules*: `.rmod` image files that
//! declare an identity, the modules they depend on and a table of exported
//! types. This module provides the pieces needed to get them into memory:
//!
//! - [`ModuleHost`] owns every loaded module and probes its default
//!   directories when a reference needs to be satisfied.
//! - [`ModuleResolver`] is a resolution hook that searches a set of roots
//!   recursively whenever the host's default probing comes up empty.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use rulesmith::core::TracingLogger;
//! use rulesmith::module::{ModuleHost, ModuleResolver};
//!
//! let host = ModuleHost::new();
//! let resolver = ModuleResolver::new(Arc::new(TracingLogger), ["./analyzers"]).unwrap();
//! let _scope = resolver.install(&host);
//!
//! let module = host.load("Analyzers.Common, Version=1.0.0.0").unwrap();
//! println!("{}", module.identity());
//! ```

mod error;
mod host;
mod image;
mod reference;
mod resolver;
mod version;

pub use error::{ModuleError, ModuleResult};
pub use host::{
    HookRegistration, LoadedModule, ModuleHost, ModuleIdentity, ResolveHook, ResolveRequest,
};
pub use image::{Marker, ModuleHeader, ModuleImage, TypeImage, TypeKind};
pub use reference::{file_name_from_reference, ModuleReference};
pub use resolver::{ModuleResolver, ResolverScope};
pub use version::ModuleVersion;

/// File extension of module images.
pub const MODULE_EXTENSION: &str = "rmod";
