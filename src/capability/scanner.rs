//! Discovery of analyzer types inside modules.
//!
//! The scanner loads a set of module files into a [`ModuleHost`], filters the
//! exported types of each module down to those that qualify for a facet and
//! constructs them through a [`FactoryCatalog`].

use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use super::{CapabilityDescriptor, DiagnosticAnalyzer, Facet, FactoryCatalog};
use crate::core::Logger;
use crate::module::{
    LoadedModule, ModuleHost, ModuleIdentity, ModuleResolver, ResolverScope, TypeImage,
};

/// A constructed analyzer together with where it came from.
pub struct CapabilityInstance {
    type_name: String,
    module: ModuleIdentity,
    module_path: PathBuf,
    analyzer: Box<dyn DiagnosticAnalyzer>,
}

impl CapabilityInstance {
    /// Fully qualified type name.
    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    /// Identity of the declaring module.
    pub fn module(&self) -> &ModuleIdentity {
        &self.module
    }

    /// Path of the declaring module.
    pub fn module_path(&self) -> &Path {
        &self.module_path
    }

    /// The analyzer.
    pub fn analyzer(&self) -> &dyn DiagnosticAnalyzer {
        self.analyzer.as_ref()
    }
}

impl fmt::Debug for CapabilityInstance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CapabilityInstance")
            .field("type_name", &self.type_name)
            .field("module", &self.module)
            .field("module_path", &self.module_path)
            .finish_non_exhaustive()
    }
}

/// A type that qualifies for a facet, before construction.
#[derive(Debug, Clone)]
pub struct EligibleType {
    /// Declaring module.
    pub module: Arc<LoadedModule>,
    /// The type table entry.
    pub ty: TypeImage,
}

/// Qualifying types grouped by the requirements they met.
#[derive(Default)]
struct CapabilityRegistry {
    entries: HashMap<CapabilityDescriptor, Vec<EligibleType>>,
}

impl CapabilityRegistry {
    fn register(&mut self, descriptor: &CapabilityDescriptor, candidate: EligibleType) {
        self.entries.entry(descriptor.clone()).or_default().push(candidate);
    }

    fn candidates(&self, descriptor: &CapabilityDescriptor) -> Vec<EligibleType> {
        self.entries.get(descriptor).cloned().unwrap_or_default()
    }
}

/// Finds and constructs analyzers in module files.
///
/// A scanner keeps no state between calls.
pub struct CapabilityScanner {
    host: ModuleHost,
    catalog: Arc<FactoryCatalog>,
    logger: Arc<dyn Logger>,
    search_folders: Vec<PathBuf>,
}

impl fmt::Debug for CapabilityScanner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CapabilityScanner")
            .field("host", &self.host)
            .field("catalog", &self.catalog)
            .field("search_folders", &self.search_folders)
            .finish_non_exhaustive()
    }
}

impl CapabilityScanner {
    /// Create a scanner that loads modules into `host`.
    pub fn new(host: ModuleHost, catalog: Arc<FactoryCatalog>, logger: Arc<dyn Logger>) -> Self {
        Self { host, catalog, logger, search_folders: Vec::new() }
    }

    /// Additional folders searched for module dependencies.
    pub fn with_search_folders<I, P>(mut self, folders: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        self.search_folders.extend(folders.into_iter().map(Into::into));
        self
    }

    /// The module host used for loading.
    pub fn host(&self) -> &ModuleHost {
        &self.host
    }

    /// Construct every analyzer for `facet` found in `module_paths`.
    pub fn discover<F, P>(&self, facet: F, module_paths: &[P]) -> Vec<CapabilityInstance>
    where
        F: Facet,
        P: AsRef<Path>,
    {
        self.discover_many(&[facet], module_paths).remove(&facet).unwrap_or_default()
    }

    /// Construct analyzers for several facets from a single load of
    /// `module_paths`.
    ///
    /// Every requested facet has an entry in the result, possibly empty.
    pub fn discover_many<F, P>(
        &self,
        facets: &[F],
        module_paths: &[P],
    ) -> HashMap<F, Vec<CapabilityInstance>>
    where
        F: Facet,
        P: AsRef<Path>,
    {
        let registry = self.scan(facets, module_paths);
        let mut results = HashMap::new();

        for facet in facets {
            if results.contains_key(facet) {
                continue;
            }
            let instances: Vec<CapabilityInstance> = registry
                .candidates(&facet.descriptor())
                .into_iter()
                .filter_map(|candidate| self.instantiate(candidate))
                .collect();

            self.logger.debug(format_args!(
                "Discovered {} analyzer(s) for {}",
                instances.len(),
                facet
            ));
            results.insert(*facet, instances);
        }

        results
    }

    /// Types in `module_paths` that qualify for `facet`, without
    /// constructing them.
    pub fn eligible_types<F, P>(&self, facet: F, module_paths: &[P]) -> Vec<EligibleType>
    where
        F: Facet,
        P: AsRef<Path>,
    {
        self.scan(&[facet], module_paths).candidates(&facet.descriptor())
    }

    fn scan<F, P>(&self, facets: &[F], module_paths: &[P]) -> CapabilityRegistry
    where
        F: Facet,
        P: AsRef<Path>,
    {
        let mut registry = CapabilityRegistry::default();
        if module_paths.is_empty() {
            return registry;
        }

        let mut descriptors: Vec<CapabilityDescriptor> = Vec::new();
        for facet in facets {
            let descriptor = facet.descriptor();
            if !descriptors.contains(&descriptor) {
                descriptors.push(descriptor);
            }
        }

        let modules = self.load_modules(module_paths);
        for module in &modules {
            self.register_types(&mut registry, &descriptors, module);
        }

        registry
    }

    fn load_modules<P: AsRef<Path>>(&self, module_paths: &[P]) -> Vec<Arc<LoadedModule>> {
        let _scope = self.open_resolver_scope(module_paths);
        let mut modules: Vec<Arc<LoadedModule>> = Vec::new();

        for path in module_paths {
            let path = path.as_ref();
            match self.host.load_file(path) {
                Ok(module) => {
                    if modules.iter().any(|m| Arc::ptr_eq(m, &module)) {
                        continue;
                    }
                    self.logger.debug(format_args!(
                        "Loaded module {} from {}",
                        module.identity(),
                        path.display()
                    ));
                    modules.push(module);
                }
                Err(e) => {
                    self.logger
                        .warn(format_args!("Could not load module {}: {}", path.display(), e));
                }
            }
        }

        modules
    }

    /// Opens a resolver over the search folders and the directories holding
    /// the supplied modules, for the duration of one call.
    fn open_resolver_scope<P: AsRef<Path>>(
        &self,
        module_paths: &[P],
    ) -> Option<ResolverScope> {
        let mut roots = self.search_folders.clone();
        for path in module_paths {
            let parent = match path.as_ref().parent() {
                Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
                _ => PathBuf::from("."),
            };
            if !roots.contains(&parent) {
                roots.push(parent);
            }
        }

        match ModuleResolver::new(Arc::clone(&self.logger), roots) {
            Ok(resolver) => Some(resolver.install(&self.host)),
            Err(e) => {
                self.logger.warn(format_args!("Dependency resolution disabled: {}", e));
                None
            }
        }
    }

    fn register_types(
        &self,
        registry: &mut CapabilityRegistry,
        descriptors: &[CapabilityDescriptor],
        module: &Arc<LoadedModule>,
    ) {
        for descriptor in descriptors {
            for ty in module.types() {
                match descriptor.check(ty) {
                    Ok(()) => registry.register(
                        descriptor,
                        EligibleType { module: Arc::clone(module), ty: ty.clone() },
                    ),
                    Err(reason) => self.logger.debug(format_args!(
                        "Skipping {} in {}: {}",
                        ty.name,
                        module.name(),
                        reason
                    )),
                }
            }
        }
    }

    fn instantiate(&self, candidate: EligibleType) -> Option<CapabilityInstance> {
        let EligibleType { module, ty } = candidate;
        let symbol = ty.factory.as_deref().unwrap_or_default();

        match self.catalog.create(&ty.name, symbol) {
            Ok(analyzer) => Some(CapabilityInstance {
                type_name: ty.name,
                module: module.identity().clone(),
                module_path: module.path().to_path_buf(),
                analyzer,
            }),
            Err(e) => {
                self.logger.warn(format_args!(
                    "Could not instantiate {} from {}: {}",
                    ty.name,
                    module.name(),
                    e
                ));
                None
            }
        }
    }
}
