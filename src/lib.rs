#![allow(clippy::format_push_string)]
#![allow(clippy::unused_self)]
#![allow(clippy::needless_pass_by_value)]
#![allow(clippy::trivially_copy_pass_by_ref)]
#![allow(clippy::cast_possible_truncation)]

//! # rulesmith
//!
//! Building blocks for generating SonarQube plugins from third-party analyzer
//! packages.
//!
//! An analyzer package ships one or more *modules*. rulesmith loads those
//! modules, finds the analyzer types they export and turns the diagnostics
//! those analyzers declare into SonarQube rules.
//!
//! ## Components
//!
//! - [`module`]: module images, the module host and the recursive resolver
//!   that finds dependencies the host cannot locate on its own
//! - [`capability`]: discovery and construction of analyzers for a language
//! - [`rules`]: rule records generated from analyzer diagnostics
//! - [`core`]: logging, configuration and the bounded process runner
//!
//! ## Quick Start
//!
//! ```bash
//! # Find a module under a set of roots
//! rulesmith resolve "Contoso.Analyzers, Version=1.0.0.0" --root ./packages
//!
//! # List the C# analyzers a module exports
//! rulesmith inspect ./packages/Contoso.Analyzers.rmod --language cs
//! ```

#![forbid(unsafe_code)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
// Allow common patterns that are intentional in this codebase
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::similar_names)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_const_for_fn)]
#![allow(clippy::doc_markdown)]
#![allow(clippy::redundant_else)]
#![allow(clippy::if_not_else)]
#![allow(clippy::manual_let_else)]
#![allow(clippy::derivable_impls)]
#![allow(clippy::return_self_not_must_use)]
#![allow(clippy::option_if_let_else)]
#![allow(clippy::significant_drop_tightening)]
#![allow(clippy::map_unwrap_or)]
#![allow(clippy::match_same_arms)]
#![allow(clippy::missing_fields_in_debug)]
#![allow(clippy::uninlined_format_args)]
#![allow(clippy::unnecessary_map_or)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::redundant_closure_for_method_calls)]
#![allow(clippy::use_self)]

pub mod capability;
pub mod core;
pub mod module;
pub mod rules;

// Re-export commonly used types
pub use capability::{CapabilityInstance, CapabilityScanner, FactoryCatalog, Language};
pub use core::{Config, Logger, ProcessResult, ProcessRunner, ProcessRunnerArgs};
pub use module::{ModuleError, ModuleHost, ModuleResolver, ModuleResult};
pub use rules::{Rule, RuleGenerator};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Application name
pub const APP_NAME: &str = "rulesmith";
