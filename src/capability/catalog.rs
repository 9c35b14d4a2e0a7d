//! Constructor binding for module types.
//!
//! Module images only name the entry symbol of a type's constructor. The
//! catalog maps those symbols to host-side functions that build the analyzer.

use std::collections::HashMap;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use super::{CapabilityError, CapabilityResult, DiagnosticAnalyzer};

/// A constructor bound to an entry symbol.
pub type AnalyzerFactory =
    Arc<dyn Fn() -> Result<Box<dyn DiagnosticAnalyzer>, String> + Send + Sync>;

/// Table of constructors keyed by entry symbol.
#[derive(Clone, Default)]
pub struct FactoryCatalog {
    factories: HashMap<String, AnalyzerFactory>,
}

impl fmt::Debug for FactoryCatalog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut symbols: Vec<&str> = self.factories.keys().map(String::as_str).collect();
        symbols.sort_unstable();
        f.debug_struct("FactoryCatalog").field("symbols", &symbols).finish()
    }
}

impl FactoryCatalog {
    /// Create an empty catalog.
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind `symbol` to a fallible constructor. Rebinding replaces the
    /// previous constructor.
    pub fn register<F>(&mut self, symbol: impl Into<String>, factory: F)
    where
        F: Fn() -> Result<Box<dyn DiagnosticAnalyzer>, String> + Send + Sync + 'static,
    {
        self.factories.insert(symbol.into(), Arc::new(factory));
    }

    /// Bind `symbol` to `T::default`.
    pub fn register_default<T>(&mut self, symbol: impl Into<String>)
    where
        T: DiagnosticAnalyzer + Default + 'static,
    {
        self.register(symbol, || Ok(Box::new(T::default()) as Box<dyn DiagnosticAnalyzer>));
    }

    /// Whether `symbol` is bound.
    pub fn contains(&self, symbol: &str) -> bool {
        self.factories.contains_key(symbol)
    }

    /// Number of bound symbols.
    pub fn len(&self) -> usize {
        self.factories.len()
    }

    /// Whether the catalog is empty.
    pub fn is_empty(&self) -> bool {
        self.factories.is_empty()
    }

    /// Construct the type `type_name` through `symbol`.
    ///
    /// A constructor that panics is reported as [`CapabilityError::Panicked`].
    pub fn create(
        &self,
        type_name: &str,
        symbol: &str,
    ) -> CapabilityResult<Box<dyn DiagnosticAnalyzer>> {
        let factory = self.factories.get(symbol).ok_or_else(|| CapabilityError::UnknownFactory {
            type_name: type_name.to_string(),
            symbol: symbol.to_string(),
        })?;

        match panic::catch_unwind(AssertUnwindSafe(|| factory())) {
            Ok(Ok(analyzer)) => Ok(analyzer),
            Ok(Err(message)) => {
                Err(CapabilityError::Construction { type_name: type_name.to_string(), message })
            }
            Err(payload) => Err(CapabilityError::Panicked {
                type_name: type_name.to_string(),
                message: panic_message(payload.as_ref()),
            }),
        }
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}
