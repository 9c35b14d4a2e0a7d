//! Facets of the analysis capability and the requirements they impose.

use std::fmt;
use std::hash::Hash;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::module::{TypeImage, TypeKind};

/// Requirements a type must meet to provide a facet of a capability.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CapabilityDescriptor {
    /// Base contract the type must derive from.
    pub contract: String,
    /// Marker the type must carry.
    pub marker: String,
    /// Argument the marker must carry, if any.
    pub marker_argument: Option<String>,
}

/// Why a type does not qualify for a capability.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Exclusion {
    /// The type is internal to its module.
    NotExported,
    /// The type is abstract.
    Abstract,
    /// The type is not a class.
    NotAClass,
    /// The type has open generic parameters.
    Generic,
    /// The type declares no constructor.
    NoFactory,
    /// The type does not derive from the contract.
    MissingContract,
    /// The type does not carry the marker.
    MissingMarker,
    /// The marker is present but without the required argument.
    MarkerArgumentMismatch,
}

impl fmt::Display for Exclusion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let reason = match self {
            Self::NotExported => "not exported",
            Self::Abstract => "abstract",
            Self::NotAClass => "not a class",
            Self::Generic => "has open generic parameters",
            Self::NoFactory => "no parameterless constructor",
            Self::MissingContract => "does not derive from the contract",
            Self::MissingMarker => "missing marker",
            Self::MarkerArgumentMismatch => "marker does not target this facet",
        };
        f.write_str(reason)
    }
}

impl CapabilityDescriptor {
    /// Check `ty` against every requirement, returning the first one it
    /// fails.
    pub fn check(&self, ty: &TypeImage) -> Result<(), Exclusion> {
        if !ty.exported {
            return Err(Exclusion::NotExported);
        }
        if ty.is_abstract {
            return Err(Exclusion::Abstract);
        }
        if ty.kind != TypeKind::Class {
            return Err(Exclusion::NotAClass);
        }
        if ty.generic {
            return Err(Exclusion::Generic);
        }
        if ty.factory.as_deref().map_or(true, |s| s.trim().is_empty()) {
            return Err(Exclusion::NoFactory);
        }
        if !ty.derives_from(&self.contract) {
            return Err(Exclusion::MissingContract);
        }

        let mut markers = ty.markers_named(&self.marker).peekable();
        if markers.peek().is_none() {
            return Err(Exclusion::MissingMarker);
        }
        // The marker may be applied once per language.
        if let Some(required) = &self.marker_argument {
            if !markers.any(|m| m.arguments.iter().any(|a| a == required)) {
                return Err(Exclusion::MarkerArgumentMismatch);
            }
        }

        Ok(())
    }

    /// Whether `ty` meets every requirement.
    pub fn matches(&self, ty: &TypeImage) -> bool {
        self.check(ty).is_ok()
    }
}

/// A selectable facet of a capability.
pub trait Facet: Copy + Eq + Hash + fmt::Display {
    /// Requirements for this facet.
    fn descriptor(&self) -> CapabilityDescriptor;
}

/// Contract every analyzer type derives from.
pub const ANALYZER_CONTRACT: &str = "DiagnosticAnalyzer";

/// Marker that declares which languages an analyzer targets.
pub const ANALYZER_MARKER: &str = "DiagnosticAnalyzer";

/// Source language an analyzer targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Language {
    /// C#.
    #[serde(rename = "cs", alias = "csharp")]
    CSharp,
    /// Visual Basic.
    #[serde(rename = "vb", alias = "visualbasic")]
    VisualBasic,
}

impl Language {
    /// Every supported language.
    pub const ALL: [Self; 2] = [Self::CSharp, Self::VisualBasic];

    /// The name analyzers use in their marker.
    pub fn marker_name(self) -> &'static str {
        match self {
            Self::CSharp => "C#",
            Self::VisualBasic => "Visual Basic",
        }
    }

    /// Short identifier used in configuration and on the command line.
    pub fn short_name(self) -> &'static str {
        match self {
            Self::CSharp => "cs",
            Self::VisualBasic => "vb",
        }
    }
}

impl Facet for Language {
    fn descriptor(&self) -> CapabilityDescriptor {
        CapabilityDescriptor {
            contract: ANALYZER_CONTRACT.to_string(),
            marker: ANALYZER_MARKER.to_string(),
            marker_argument: Some(self.marker_name().to_string()),
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.marker_name())
    }
}

impl FromStr for Language {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "cs" | "c#" | "csharp" => Ok(Self::CSharp),
            "vb" | "visual basic" | "visualbasic" => Ok(Self::VisualBasic),
            other => Err(format!("Unknown language '{other}' (expected 'cs' or 'vb')")),
        }
    }
}
