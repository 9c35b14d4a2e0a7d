//! Fixtures shared by the integration tests.

#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::sync::Arc;

use rulesmith::capability::{
    DiagnosticAnalyzer, DiagnosticDescriptor, DiagnosticSeverity, FactoryCatalog,
    ANALYZER_CONTRACT, ANALYZER_MARKER,
};
use rulesmith::core::CapturingLogger;
use rulesmith::module::{ModuleImage, ModuleVersion, TypeImage};

/// A fresh capturing logger.
pub fn capture() -> Arc<CapturingLogger> {
    Arc::new(CapturingLogger::new())
}

/// Parse a version literal.
pub fn version(text: &str) -> ModuleVersion {
    text.parse().unwrap()
}

/// Write `image` to `dir/file_name`, creating `dir` if needed.
pub fn write_image(dir: &Path, file_name: &str, image: &ModuleImage) -> PathBuf {
    std::fs::create_dir_all(dir).unwrap();
    let path = dir.join(file_name);
    image.write_to(&path).unwrap();
    path
}

/// Write an empty module named after `file_name`'s stem.
pub fn write_simple_module(dir: &Path, file_name: &str, module_version: &str) -> PathBuf {
    let name = file_name.trim_end_matches(".rmod");
    write_image(dir, file_name, &ModuleImage::new(name, version(module_version)))
}

/// A concrete analyzer type targeting `languages`.
pub fn analyzer_type(name: &str, languages: &[&str], factory: &str) -> TypeImage {
    TypeImage::class(name)
        .extends(ANALYZER_CONTRACT)
        .marked(ANALYZER_MARKER, languages.iter().copied())
        .factory(factory)
}

/// Analyzer reporting one warning diagnostic with a fixed id.
pub struct FixedAnalyzer {
    id: &'static str,
}

impl FixedAnalyzer {
    pub fn new(id: &'static str) -> Self {
        Self { id }
    }
}

impl DiagnosticAnalyzer for FixedAnalyzer {
    fn supported_diagnostics(&self) -> Vec<DiagnosticDescriptor> {
        let title = format!("{} title", self.id);
        vec![DiagnosticDescriptor::new(self.id, title, DiagnosticSeverity::Warning)
            .with_description(format!("{} description", self.id))
            .with_category("Naming")]
    }
}

/// Catalog binding `symbol` to a [`FixedAnalyzer`] reporting `id` for
/// every `(symbol, id)` pair.
pub fn catalog(entries: &[(&str, &'static str)]) -> Arc<FactoryCatalog> {
    let mut catalog = FactoryCatalog::new();
    for &(symbol, id) in entries {
        catalog.register(symbol, move || {
            Ok(Box::new(FixedAnalyzer { id }) as Box<dyn DiagnosticAnalyzer>)
        });
    }
    Arc::new(catalog)
}
