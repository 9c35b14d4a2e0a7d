//! Module image parsing and validation.
//!
//! A module image is the on-disk form of a module: a TOML document that
//! declares the module identity, the modules it depends on, and the table
//! of types it exports.
//!
//! ```toml
//! [module]
//! name = "RoslynAnalyzer11"
//! version = "1.1.0.0"
//! dependencies = ["Analyzers.Common, Version=1.0.0.0, Culture=neutral, PublicKeyToken=null"]
//!
//! [[types]]
//! name = "RoslynAnalyzer11.CSharpAnalyzer"
//! bases = ["DiagnosticAnalyzer"]
//! factory = "roslyn11::csharp_analyzer"
//!
//! [[types.markers]]
//! name = "DiagnosticAnalyzer"
//! arguments = ["C#"]
//! ```

use std::collections::HashSet;
use std::path::Path;

use serde::{Deserialize, Serialize};

use super::{ModuleError, ModuleResult, ModuleVersion};

/// Parsed module image.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModuleImage {
    /// Module header.
    pub module: ModuleHeader,
    /// Exported type table, in declaration order.
    #[serde(default)]
    pub types: Vec<TypeImage>,
}

/// Module header section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModuleHeader {
    /// Module name.
    pub name: String,
    /// Module version.
    pub version: ModuleVersion,
    /// References of modules this module needs at load time.
    #[serde(default)]
    pub dependencies: Vec<String>,
}

/// Kind of an exported type.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TypeKind {
    /// A class. The only kind that can be instantiated by the scanner.
    #[default]
    Class,
    /// An interface or trait-like contract.
    Interface,
    /// A value type.
    Struct,
    /// An enumeration.
    Enum,
}

/// A declarative marker attached to a type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Marker {
    /// Marker name.
    pub name: String,
    /// Positional marker arguments.
    #[serde(default)]
    pub arguments: Vec<String>,
}

/// An entry of the exported type table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeImage {
    /// Fully qualified type name.
    pub name: String,
    /// Type kind.
    #[serde(default)]
    pub kind: TypeKind,
    /// Whether the type is abstract.
    #[serde(default, rename = "abstract")]
    pub is_abstract: bool,
    /// Whether the type is visible outside its module.
    #[serde(default = "default_exported")]
    pub exported: bool,
    /// Whether the type has open generic parameters.
    #[serde(default)]
    pub generic: bool,
    /// Every contract the type derives from, directly or transitively.
    #[serde(default)]
    pub bases: Vec<String>,
    /// Declarative markers.
    #[serde(default)]
    pub markers: Vec<Marker>,
    /// Entry symbol of the no-argument constructor.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub factory: Option<String>,
}

fn default_exported() -> bool {
    true
}

impl ModuleImage {
    /// Create an image with no types.
    pub fn new(name: impl Into<String>, version: ModuleVersion) -> Self {
        Self {
            module: ModuleHeader { name: name.into(), version, dependencies: Vec::new() },
            types: Vec::new(),
        }
    }

    /// Add a dependency reference.
    pub fn with_dependency(mut self, reference: impl Into<String>) -> Self {
        self.module.dependencies.push(reference.into());
        self
    }

    /// Add an exported type.
    pub fn with_type(mut self, ty: TypeImage) -> Self {
        self.types.push(ty);
        self
    }

    /// Parse an image from TOML.
    pub fn from_toml(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    /// Read and validate an image file.
    pub fn from_file(path: &Path) -> ModuleResult<Self> {
        if !path.is_file() {
            return Err(ModuleError::FileNotFound(path.to_path_buf()));
        }

        let content = std::fs::read_to_string(path)?;
        let image = Self::from_toml(&content).map_err(|e| ModuleError::InvalidImage {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;

        image.validate().map_err(|message| ModuleError::InvalidImage {
            path: path.to_path_buf(),
            message,
        })?;

        Ok(image)
    }

    /// Serialize to TOML.
    pub fn to_toml(&self) -> Result<String, toml::ser::Error> {
        toml::to_string_pretty(self)
    }

    /// Write the image to `path`.
    pub fn write_to(&self, path: &Path) -> ModuleResult<()> {
        let content = self.to_toml().map_err(|e| ModuleError::InvalidImage {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Check structural rules the TOML schema cannot express.
    pub fn validate(&self) -> Result<(), String> {
        if self.module.name.trim().is_empty() {
            return Err("Module name is required".to_string());
        }

        if self.module.dependencies.iter().any(|d| d.trim().is_empty()) {
            return Err("Dependency references cannot be empty".to_string());
        }

        let mut seen = HashSet::new();
        for ty in &self.types {
            if ty.name.trim().is_empty() {
                return Err("Type names cannot be empty".to_string());
            }
            if !seen.insert(ty.name.as_str()) {
                return Err(format!("Type '{}' is declared more than once", ty.name));
            }
        }

        Ok(())
    }
}

impl TypeImage {
    /// A public, concrete, non-generic class with no bases or markers.
    pub fn class(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: TypeKind::Class,
            is_abstract: false,
            exported: true,
            generic: false,
            bases: Vec::new(),
            markers: Vec::new(),
            factory: None,
        }
    }

    /// Add a base contract.
    pub fn extends(mut self, base: impl Into<String>) -> Self {
        self.bases.push(base.into());
        self
    }

    /// Attach a marker.
    pub fn marked<I, S>(mut self, name: impl Into<String>, arguments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.markers.push(Marker {
            name: name.into(),
            arguments: arguments.into_iter().map(Into::into).collect(),
        });
        self
    }

    /// Set the constructor entry symbol.
    pub fn factory(mut self, symbol: impl Into<String>) -> Self {
        self.factory = Some(symbol.into());
        self
    }

    /// Mark the type abstract.
    pub fn abstract_type(mut self) -> Self {
        self.is_abstract = true;
        self
    }

    /// Hide the type from the export table.
    pub fn internal(mut self) -> Self {
        self.exported = false;
        self
    }

    /// Change the type kind.
    pub fn kind(mut self, kind: TypeKind) -> Self {
        self.kind = kind;
        self
    }

    /// Mark the type as having open generic parameters.
    pub fn generic(mut self) -> Self {
        self.generic = true;
        self
    }

    /// Whether the type derives from `contract`.
    pub fn derives_from(&self, contract: &str) -> bool {
        self.bases.iter().any(|b| b == contract)
    }

    /// Every marker applied under `name`, in declaration order.
    ///
    /// A marker may be written with or without the conventional `Attribute`
    /// suffix.
    pub fn markers_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a Marker> + 'a {
        self.markers.iter().filter(move |m| {
            m.name == name || m.name.strip_suffix("Attribute").is_some_and(|stem| stem == name)
        })
    }
}
