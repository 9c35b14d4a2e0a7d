//! Module host: the registry of loaded modules.
//!
//! The host satisfies a module reference in a fixed order: modules already
//! loaded, then its default probe directories, then every registered
//! [`ResolveHook`] in registration order.

use std::collections::HashSet;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use std::thread::{self, ThreadId};

use parking_lot::{Mutex, RwLock};

use crate::core::{Logger, TracingLogger};

use super::{ModuleError, ModuleImage, ModuleReference, ModuleResult, ModuleVersion, TypeImage};

/// Name and version of a module.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ModuleIdentity {
    /// Module name.
    pub name: String,
    /// Module version.
    pub version: ModuleVersion,
}

impl ModuleIdentity {
    /// Create an identity.
    pub fn new(name: impl Into<String>, version: ModuleVersion) -> Self {
        Self { name: name.into(), version }
    }
}

impl fmt::Display for ModuleIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}, Version={}", self.name, self.version)
    }
}

/// A module that has been loaded into a host.
///
/// Modules are never unloaded; the host hands out shared handles.
#[derive(Debug)]
pub struct LoadedModule {
    identity: ModuleIdentity,
    path: PathBuf,
    dependencies: Vec<String>,
    types: Vec<TypeImage>,
}

impl LoadedModule {
    /// Module identity.
    pub fn identity(&self) -> &ModuleIdentity {
        &self.identity
    }

    /// Module name.
    pub fn name(&self) -> &str {
        &self.identity.name
    }

    /// Module version.
    pub fn version(&self) -> ModuleVersion {
        self.identity.version
    }

    /// Canonical path the module was loaded from.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Dependency references declared by the module.
    pub fn dependencies(&self) -> &[String] {
        &self.dependencies
    }

    /// Every entry of the type table, in declaration order.
    pub fn types(&self) -> &[TypeImage] {
        &self.types
    }

    /// Types visible outside the module.
    pub fn exported_types(&self) -> impl Iterator<Item = &TypeImage> {
        self.types.iter().filter(|t| t.exported)
    }
}

/// A reference the host could not satisfy by default means.
#[derive(Debug, Clone, Copy)]
pub struct ResolveRequest<'a> {
    /// The requested module.
    pub reference: &'a ModuleReference,
    /// The module whose dependency triggered the request, if any.
    pub requesting: Option<&'a ModuleIdentity>,
}

/// Fallback consulted when the host cannot find a module on its own.
///
/// Hooks may be invoked from any thread and may call back into the host.
pub trait ResolveHook: Send + Sync {
    /// Try to supply the requested module.
    ///
    /// Returning `None` lets the next hook try.
    fn resolve(&self, host: &ModuleHost, request: &ResolveRequest<'_>)
        -> Option<Arc<LoadedModule>>;
}

type HookEntry = (u64, Arc<dyn ResolveHook>);

struct HostInner {
    modules: RwLock<Vec<Arc<LoadedModule>>>,
    probe_dirs: RwLock<Vec<PathBuf>>,
    hooks: RwLock<Vec<HookEntry>>,
    next_hook_id: AtomicU64,
    /// Paths being loaded, per loading thread.
    loading: Mutex<HashSet<(ThreadId, PathBuf)>>,
    logger: RwLock<Arc<dyn Logger>>,
}

impl HostInner {
    fn logger(&self) -> Arc<dyn Logger> {
        self.logger.read().clone()
    }
}

/// Registry of loaded modules.
///
/// Cloning a host yields another handle to the same registry.
#[derive(Clone)]
pub struct ModuleHost {
    inner: Arc<HostInner>,
}

impl fmt::Debug for ModuleHost {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModuleHost")
            .field("modules", &self.inner.modules.read().len())
            .field("probe_dirs", &*self.inner.probe_dirs.read())
            .field("hooks", &self.hook_count())
            .finish()
    }
}

impl Default for ModuleHost {
    fn default() -> Self {
        Self::new()
    }
}

impl ModuleHost {
    /// Create a host that probes the directory of the running executable.
    pub fn new() -> Self {
        let probe_dirs = std::env::current_exe()
            .ok()
            .and_then(|exe| exe.parent().map(Path::to_path_buf))
            .into_iter()
            .collect();
        Self::with_probe_dirs(probe_dirs)
    }

    /// Create a host with an explicit list of default probe directories.
    pub fn with_probe_dirs(probe_dirs: Vec<PathBuf>) -> Self {
        Self {
            inner: Arc::new(HostInner {
                modules: RwLock::new(Vec::new()),
                probe_dirs: RwLock::new(probe_dirs),
                hooks: RwLock::new(Vec::new()),
                next_hook_id: AtomicU64::new(1),
                loading: Mutex::new(HashSet::new()),
                logger: RwLock::new(Arc::new(TracingLogger)),
            }),
        }
    }

    /// Send host log records to `logger` instead of `tracing`.
    ///
    /// Applies to every handle of this host.
    pub fn with_logger(self, logger: Arc<dyn Logger>) -> Self {
        *self.inner.logger.write() = logger;
        self
    }

    /// Default probe directories.
    pub fn probe_dirs(&self) -> Vec<PathBuf> {
        self.inner.probe_dirs.read().clone()
    }

    /// Register a resolution hook.
    ///
    /// The hook stays registered until the returned handle is deregistered
    /// or dropped.
    pub fn register_hook(&self, hook: Arc<dyn ResolveHook>) -> HookRegistration {
        let id = self.inner.next_hook_id.fetch_add(1, Ordering::Relaxed);
        self.inner.hooks.write().push((id, hook));
        self.inner.logger().debug(format_args!("Registered resolve hook #{}", id));

        HookRegistration { host: Arc::downgrade(&self.inner), id, active: AtomicBool::new(true) }
    }

    /// Number of registered hooks.
    pub fn hook_count(&self) -> usize {
        self.inner.hooks.read().len()
    }

    /// Snapshot of every loaded module, in load order.
    pub fn loaded_modules(&self) -> Vec<Arc<LoadedModule>> {
        self.inner.modules.read().clone()
    }

    /// Load a module by reference text.
    pub fn load(&self, reference: &str) -> ModuleResult<Arc<LoadedModule>> {
        self.load_for(reference, None)
    }

    /// Load a module on behalf of `requesting`.
    pub fn load_for(
        &self,
        reference: &str,
        requesting: Option<&ModuleIdentity>,
    ) -> ModuleResult<Arc<LoadedModule>> {
        let reference = ModuleReference::parse(reference)?;

        if let Some(module) = self.find_loaded(&reference) {
            return Ok(module);
        }

        if let Some(module) = self.probe_default_dirs(&reference) {
            return Ok(module);
        }

        // Snapshot so hooks can re-enter the host without deadlocking.
        let hooks: Vec<Arc<dyn ResolveHook>> =
            self.inner.hooks.read().iter().map(|(_, hook)| Arc::clone(hook)).collect();

        let request = ResolveRequest { reference: &reference, requesting };
        for hook in hooks {
            if let Some(module) = hook.resolve(self, &request) {
                return Ok(module);
            }
        }

        Err(ModuleError::NotFound { reference: reference.text().to_string() })
    }

    /// Load the module image at `path`.
    ///
    /// Loading the same file twice returns the same handle.
    pub fn load_file(&self, path: &Path) -> ModuleResult<Arc<LoadedModule>> {
        let canonical = canonicalize(path)?;
        if let Some(module) = self.find_by_path(&canonical) {
            return Ok(module);
        }

        let image = ModuleImage::from_file(&canonical)?;
        self.load_image(canonical, image)
    }

    fn find_loaded(&self, reference: &ModuleReference) -> Option<Arc<LoadedModule>> {
        self.inner
            .modules
            .read()
            .iter()
            .find(|m| {
                m.name().eq_ignore_ascii_case(reference.name()) && reference.accepts(m.version())
            })
            .cloned()
    }

    fn find_by_path(&self, path: &Path) -> Option<Arc<LoadedModule>> {
        self.inner.modules.read().iter().find(|m| m.path == path).cloned()
    }

    /// First probe-directory candidate that loads. Failures fall through to
    /// the next candidate and finally to the hooks.
    fn probe_default_dirs(&self, reference: &ModuleReference) -> Option<Arc<LoadedModule>> {
        let logger = self.inner.logger();
        let dirs = self.probe_dirs();
        let candidates = reference.candidate_file_names();

        for dir in &dirs {
            for candidate in &candidates {
                let path = dir.join(candidate);
                if !path.is_file() {
                    continue;
                }

                let Ok(image) = ModuleImage::from_file(&path) else {
                    logger.debug(format_args!(
                        "Skipping unreadable module image {}",
                        path.display()
                    ));
                    continue;
                };

                if !image.module.name.eq_ignore_ascii_case(reference.name())
                    || !reference.accepts(image.module.version)
                {
                    continue;
                }

                let loaded = canonicalize(&path).and_then(|canonical| {
                    match self.find_by_path(&canonical) {
                        Some(module) => Ok(module),
                        None => self.load_image(canonical, image),
                    }
                });
                match loaded {
                    Ok(module) => return Some(module),
                    Err(e) => logger.debug(format_args!(
                        "Failed to load probed module {}: {}",
                        path.display(),
                        e
                    )),
                }
            }
        }

        None
    }

    fn load_image(&self, path: PathBuf, image: ModuleImage) -> ModuleResult<Arc<LoadedModule>> {
        let _loading = LoadingGuard::enter(&self.inner, &path)?;

        let identity = ModuleIdentity::new(image.module.name, image.module.version);
        for dependency in &image.module.dependencies {
            self.load_for(dependency, Some(&identity)).map_err(|source| {
                ModuleError::MissingDependency {
                    module: identity.to_string(),
                    dependency: dependency.clone(),
                    source: Box::new(source),
                }
            })?;
        }

        let module = Arc::new(LoadedModule {
            identity,
            path,
            dependencies: image.module.dependencies,
            types: image.types,
        });

        let mut modules = self.inner.modules.write();
        if let Some(existing) = modules.iter().find(|m| m.path == module.path) {
            return Ok(Arc::clone(existing));
        }
        self.inner.logger().debug(format_args!(
            "Loaded module {} from {}",
            module.identity,
            module.path.display()
        ));
        modules.push(Arc::clone(&module));

        Ok(module)
    }
}

fn canonicalize(path: &Path) -> ModuleResult<PathBuf> {
    std::fs::canonicalize(path).map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            ModuleError::FileNotFound(path.to_path_buf())
        } else {
            ModuleError::Io(e)
        }
    })
}

/// Marks a path as being loaded by the current thread for as long as it
/// lives.
///
/// Another thread loading the same path is not a cycle; whichever finishes
/// second gets the first one's module.
struct LoadingGuard<'a> {
    inner: &'a HostInner,
    key: (ThreadId, PathBuf),
}

impl<'a> LoadingGuard<'a> {
    fn enter(inner: &'a HostInner, path: &Path) -> ModuleResult<Self> {
        let key = (thread::current().id(), path.to_path_buf());
        if !inner.loading.lock().insert(key.clone()) {
            return Err(ModuleError::DependencyCycle(path.to_path_buf()));
        }
        Ok(Self { inner, key })
    }
}

impl Drop for LoadingGuard<'_> {
    fn drop(&mut self) {
        self.inner.loading.lock().remove(&self.key);
    }
}

/// Handle for a registered [`ResolveHook`].
///
/// Dropping the handle deregisters the hook.
#[derive(Debug)]
pub struct HookRegistration {
    host: Weak<HostInner>,
    id: u64,
    active: AtomicBool,
}

impl HookRegistration {
    /// Remove the hook from the host. Calling this more than once is a no-op.
    pub fn deregister(&self) {
        if !self.active.swap(false, Ordering::AcqRel) {
            return;
        }
        if let Some(inner) = self.host.upgrade() {
            inner.hooks.write().retain(|(id, _)| *id != self.id);
            inner.logger().debug(format_args!("Deregistered resolve hook #{}", self.id));
        }
    }

    /// Whether the hook is still registered.
    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::Acquire)
    }
}

impl Drop for HookRegistration {
    fn drop(&mut self) {
        self.deregister();
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::AtomicUsize;
    use std::time::Duration;

    use tempfile::TempDir;

    use super::*;
    use crate::core::{CapturingLogger, LogLevel};

    struct CountingHook {
        calls: AtomicUsize,
        answer: Option<Arc<LoadedModule>>,
    }

    impl ResolveHook for CountingHook {
        fn resolve(
            &self,
            _host: &ModuleHost,
            _request: &ResolveRequest<'_>,
        ) -> Option<Arc<LoadedModule>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.answer.clone()
        }
    }

    fn write_image(dir: &Path, file: &str, image: &ModuleImage) -> PathBuf {
        let path = dir.join(file);
        image.write_to(&path).unwrap();
        path
    }

    #[test]
    fn test_load_file_is_cached_by_path() {
        let dir = TempDir::new().unwrap();
        let path = write_image(
            dir.path(),
            "Alpha.rmod",
            &ModuleImage::new("Alpha", ModuleVersion::new(1, 0, 0, 0)),
        );

        let host = ModuleHost::with_probe_dirs(Vec::new());
        let first = host.load_file(&path).unwrap();
        let second = host.load_file(&path).unwrap();

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(host.loaded_modules().len(), 1);
        assert_eq!(first.identity().to_string(), "Alpha, Version=1.0.0.0");
    }

    #[test]
    fn test_load_probes_default_dirs() {
        let dir = TempDir::new().unwrap();
        let image = ModuleImage::new("Beta", ModuleVersion::new(2, 0, 0, 0));
        write_image(dir.path(), "Beta.rmod", &image);

        let host = ModuleHost::with_probe_dirs(vec![dir.path().to_path_buf()]);
        let module = host.load("Beta, Version=1.5.0.0").unwrap();
        assert_eq!(module.name(), "Beta");

        // Already loaded modules satisfy later requests by name.
        let again = host.load("Beta").unwrap();
        assert!(Arc::ptr_eq(&module, &again));
    }

    #[test]
    fn test_probe_skips_lower_version() {
        let dir = TempDir::new().unwrap();
        let image = ModuleImage::new("Gamma", ModuleVersion::new(1, 0, 0, 0));
        write_image(dir.path(), "Gamma.rmod", &image);

        let host = ModuleHost::with_probe_dirs(vec![dir.path().to_path_buf()]);
        let err = host.load("Gamma, Version=2.0.0.0").unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn test_hooks_run_in_order_until_one_answers() {
        let dir = TempDir::new().unwrap();
        let path = write_image(
            dir.path(),
            "Delta.rmod",
            &ModuleImage::new("Delta", ModuleVersion::new(1, 0, 0, 0)),
        );

        let host = ModuleHost::with_probe_dirs(Vec::new());
        let loaded = host.load_file(&path).unwrap();

        let empty = Arc::new(CountingHook { calls: AtomicUsize::new(0), answer: None });
        let answering =
            Arc::new(CountingHook { calls: AtomicUsize::new(0), answer: Some(loaded) });
        let unused = Arc::new(CountingHook { calls: AtomicUsize::new(0), answer: None });

        let _a = host.register_hook(empty.clone());
        let _b = host.register_hook(answering.clone());
        let _c = host.register_hook(unused.clone());

        let module = host.load("Epsilon").unwrap();
        assert_eq!(module.name(), "Delta");
        assert_eq!(empty.calls.load(Ordering::SeqCst), 1);
        assert_eq!(answering.calls.load(Ordering::SeqCst), 1);
        assert_eq!(unused.calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_registration_drop_deregisters() {
        let host = ModuleHost::with_probe_dirs(Vec::new());
        let hook = Arc::new(CountingHook { calls: AtomicUsize::new(0), answer: None });

        let registration = host.register_hook(hook.clone());
        assert_eq!(host.hook_count(), 1);

        registration.deregister();
        registration.deregister();
        assert!(!registration.is_active());
        assert_eq!(host.hook_count(), 0);

        {
            let _scoped = host.register_hook(hook.clone());
            assert_eq!(host.hook_count(), 1);
        }
        assert_eq!(host.hook_count(), 0);

        assert!(host.load("Anything").is_err());
        assert_eq!(hook.calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_missing_dependency_fails_load() {
        let dir = TempDir::new().unwrap();
        let path = write_image(
            dir.path(),
            "Needy.rmod",
            &ModuleImage::new("Needy", ModuleVersion::new(1, 0, 0, 0))
                .with_dependency("Absent, Version=1.0.0.0"),
        );

        let host = ModuleHost::with_probe_dirs(Vec::new());
        let err = host.load_file(&path).unwrap_err();

        match err {
            ModuleError::MissingDependency { module, dependency, source } => {
                assert_eq!(module, "Needy, Version=1.0.0.0");
                assert_eq!(dependency, "Absent, Version=1.0.0.0");
                assert!(source.is_not_found());
            }
            other => panic!("unexpected error: {other}"),
        }
        assert!(host.loaded_modules().is_empty());
    }

    #[test]
    fn test_dependency_cycle_is_detected() {
        let dir = TempDir::new().unwrap();
        write_image(
            dir.path(),
            "Left.rmod",
            &ModuleImage::new("Left", ModuleVersion::new(1, 0, 0, 0)).with_dependency("Right"),
        );
        write_image(
            dir.path(),
            "Right.rmod",
            &ModuleImage::new("Right", ModuleVersion::new(1, 0, 0, 0)).with_dependency("Left"),
        );

        let logger = Arc::new(CapturingLogger::new());
        let host =
            ModuleHost::with_probe_dirs(vec![dir.path().to_path_buf()]).with_logger(logger.clone());
        let err = host.load_file(&dir.path().join("Left.rmod")).unwrap_err();

        assert!(matches!(err, ModuleError::MissingDependency { .. }));
        assert!(logger.contains(LogLevel::Debug, "Dependency cycle detected"));
        assert!(host.loaded_modules().is_empty());
    }

    /// Loads `Helper` from a fixed path after a delay.
    struct SlowHook {
        helper: PathBuf,
        delay: Duration,
    }

    impl ResolveHook for SlowHook {
        fn resolve(
            &self,
            host: &ModuleHost,
            request: &ResolveRequest<'_>,
        ) -> Option<Arc<LoadedModule>> {
            if request.reference.name() != "Helper" {
                return None;
            }
            thread::sleep(self.delay);
            host.load_file(&self.helper).ok()
        }
    }

    #[test]
    fn test_concurrent_loads_of_same_module() {
        let modules = TempDir::new().unwrap();
        let deps = TempDir::new().unwrap();
        let helper = write_image(
            deps.path(),
            "Helper.rmod",
            &ModuleImage::new("Helper", ModuleVersion::new(1, 0, 0, 0)),
        );
        let main = write_image(
            modules.path(),
            "Main.rmod",
            &ModuleImage::new("Main", ModuleVersion::new(1, 0, 0, 0)).with_dependency("Helper"),
        );

        let host = ModuleHost::with_probe_dirs(Vec::new());
        let _registration =
            host.register_hook(Arc::new(SlowHook { helper, delay: Duration::from_millis(300) }));

        let first = {
            let (host, main) = (host.clone(), main.clone());
            thread::spawn(move || host.load_file(&main))
        };
        thread::sleep(Duration::from_millis(100));
        let second = host.load_file(&main);
        let first = first.join().unwrap();

        let (first, second) = (first.unwrap(), second.unwrap());
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(host.loaded_modules().len(), 2);
    }

    #[test]
    fn test_host_logs_through_its_logger() {
        let dir = TempDir::new().unwrap();
        let path = write_image(
            dir.path(),
            "Logged.rmod",
            &ModuleImage::new("Logged", ModuleVersion::new(1, 0, 0, 0)),
        );

        let logger = Arc::new(CapturingLogger::new());
        let host = ModuleHost::with_probe_dirs(Vec::new()).with_logger(logger.clone());
        let hook = Arc::new(CountingHook { calls: AtomicUsize::new(0), answer: None });
        host.register_hook(hook).deregister();
        host.load_file(&path).unwrap();

        assert!(logger.contains(LogLevel::Debug, "Registered resolve hook"));
        assert!(logger.contains(LogLevel::Debug, "Deregistered resolve hook"));
        assert!(logger.contains(LogLevel::Debug, "Loaded module Logged, Version=1.0.0.0"));
    }

    #[test]
    fn test_load_file_missing() {
        let host = ModuleHost::with_probe_dirs(Vec::new());
        let err = host.load_file(Path::new("/nonexistent/Missing.rmod")).unwrap_err();
        assert!(matches!(err, ModuleError::FileNotFound(_)));
    }
}
