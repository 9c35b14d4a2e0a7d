//! Module reference parsing.
//!
//! A reference arrives in one of three shapes:
//!
//! - a short name: `Analyzers.Common`
//! - a full reference: `Analyzers.Common, Version=1.2.0.0, Culture=neutral, PublicKeyToken=null`
//! - a file name: `Analyzers.Common.rmod`
//!
//! Resolution always searches by file name, so every shape is normalized to
//! `<name>.rmod` first.

use std::fmt;

use super::{ModuleError, ModuleResult, ModuleVersion, MODULE_EXTENSION};

/// A parsed request for a module.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleReference {
    text: String,
    name: String,
    version: Option<ModuleVersion>,
}

impl ModuleReference {
    /// Parse reference text.
    ///
    /// Metadata fields other than `Version` are ignored. A `Version` field
    /// that does not parse is treated as if no version was requested.
    pub fn parse(text: &str) -> ModuleResult<Self> {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return Err(ModuleError::InvalidReference(text.to_string()));
        }

        if let Some(stem) = strip_module_extension(trimmed) {
            if stem.is_empty() {
                return Err(ModuleError::InvalidReference(text.to_string()));
            }
            return Ok(Self { text: text.to_string(), name: stem.to_string(), version: None });
        }

        let mut fields = trimmed.split(',');
        let name = fields.next().unwrap_or_default().trim();
        if name.is_empty() {
            return Err(ModuleError::InvalidReference(text.to_string()));
        }

        let version = fields
            .filter_map(|field| field.split_once('='))
            .find(|(key, _)| key.trim().eq_ignore_ascii_case("version"))
            .and_then(|(_, value)| value.parse().ok());

        Ok(Self { text: text.to_string(), name: name.to_string(), version })
    }

    /// The original reference text.
    pub fn text(&self) -> &str {
        &self.text
    }

    /// The logical module name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The requested version, if one was embedded.
    pub fn version(&self) -> Option<ModuleVersion> {
        self.version
    }

    /// File names to search for, most specific first.
    ///
    /// The first entry is always the legacy candidate produced by
    /// [`file_name_from_reference`]. The second, when different, is the
    /// display name with the extension appended, which is what matches
    /// names containing spaces.
    pub fn candidate_file_names(&self) -> Vec<String> {
        let legacy = file_name_from_reference(&self.text);
        let display = format!("{}.{}", self.name, MODULE_EXTENSION);

        if legacy == display {
            vec![legacy]
        } else {
            vec![legacy, display]
        }
    }

    /// Whether a module with `version` satisfies this request.
    ///
    /// Equal or greater versions are accepted.
    pub fn accepts(&self, version: ModuleVersion) -> bool {
        self.version.map_or(true, |requested| version >= requested)
    }
}

impl fmt::Display for ModuleReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

/// Turn reference text into the file name to search for.
///
/// Text already ending in `.rmod` is used verbatim. Otherwise, if the text
/// contains a space, only the first space-delimited token is kept and its
/// last character is dropped (`"Name, Version=..."` becomes `Name`). The
/// extension is then appended.
///
/// The trailing-character rule strips the comma of the full reference
/// format and is kept as-is even though `"foo bar"` therefore becomes
/// `fo.rmod`.
pub fn file_name_from_reference(input: &str) -> String {
    if strip_module_extension(input).is_some() {
        return input.to_string();
    }

    let stem = if input.contains(' ') {
        let first = input.split(' ').next().unwrap_or_default();
        match first.char_indices().last() {
            Some((index, _)) => &first[..index],
            None => first,
        }
    } else {
        input
    };

    format!("{stem}.{MODULE_EXTENSION}")
}

fn strip_module_extension(text: &str) -> Option<&str> {
    text.strip_suffix(MODULE_EXTENSION).and_then(|rest| rest.strip_suffix('.'))
}
