//! The analysis capability contract.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Default severity of a diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DiagnosticSeverity {
    /// Not surfaced to the user.
    Hidden,
    /// Informational.
    Info,
    /// Warning.
    Warning,
    /// Error.
    Error,
}

impl fmt::Display for DiagnosticSeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Hidden => "Hidden",
            Self::Info => "Info",
            Self::Warning => "Warning",
            Self::Error => "Error",
        };
        f.write_str(name)
    }
}

/// Description of one diagnostic an analyzer can report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiagnosticDescriptor {
    /// Diagnostic id, e.g. `CA1001`.
    pub id: String,
    /// Short title.
    pub title: String,
    /// Longer description. May be empty.
    #[serde(default)]
    pub description: String,
    /// Category, e.g. `Design`.
    #[serde(default)]
    pub category: String,
    /// Severity reported unless configured otherwise.
    pub default_severity: DiagnosticSeverity,
    /// Whether the diagnostic is on by default.
    #[serde(default = "default_enabled")]
    pub enabled_by_default: bool,
    /// Link to documentation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub help_link: Option<String>,
    /// Free-form tags.
    #[serde(default)]
    pub custom_tags: Vec<String>,
}

fn default_enabled() -> bool {
    true
}

impl DiagnosticDescriptor {
    /// Create an enabled descriptor with no description, category or tags.
    pub fn new(
        id: impl Into<String>,
        title: impl Into<String>,
        severity: DiagnosticSeverity,
    ) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            description: String::new(),
            category: String::new(),
            default_severity: severity,
            enabled_by_default: true,
            help_link: None,
            custom_tags: Vec::new(),
        }
    }

    /// Set the description.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Set the category.
    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = category.into();
        self
    }

    /// Set the help link.
    pub fn with_help_link(mut self, link: impl Into<String>) -> Self {
        self.help_link = Some(link.into());
        self
    }

    /// Add a custom tag.
    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.custom_tags.push(tag.into());
        self
    }
}

/// A constructed analyzer.
///
/// Implementations are created through a
/// [`FactoryCatalog`](super::FactoryCatalog) and must be constructible
/// without arguments.
pub trait DiagnosticAnalyzer: Send + Sync {
    /// Diagnostics this analyzer can report.
    fn supported_diagnostics(&self) -> Vec<DiagnosticDescriptor>;
}
