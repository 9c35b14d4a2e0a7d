//! Analyzer discovery.
//!
//! Modules advertise analyzers through their type table. A type provides a
//! facet of the analysis capability when it is a public, concrete class with
//! a parameterless constructor, derives from the analyzer contract and
//! carries the analyzer marker naming the facet's language:
//!
//! ```toml
//! [[types]]
//! name = "Contoso.Analyzers.NamingAnalyzer"
//! bases = ["DiagnosticAnalyzer"]
//! factory = "contoso::naming"
//!
//! [[types.markers]]
//! name = "DiagnosticAnalyzer"
//! arguments = ["C#", "Visual Basic"]
//! ```

mod analyzer;
mod catalog;
mod error;
mod facet;
mod scanner;

pub use analyzer::{DiagnosticAnalyzer, DiagnosticDescriptor, DiagnosticSeverity};
pub use catalog::{AnalyzerFactory, FactoryCatalog};
pub use error::{CapabilityError, CapabilityResult};
pub use facet::{
    CapabilityDescriptor, Exclusion, Facet, Language, ANALYZER_CONTRACT, ANALYZER_MARKER,
};
pub use scanner::{CapabilityInstance, CapabilityScanner, EligibleType};
