//! Recursive module search across a list of roots.
//!
//! The resolver is installed as a [`ResolveHook`] on a [`ModuleHost`]. When
//! the host cannot find a module by default means, every root is walked in
//! registration order looking for a file whose name matches the reference.
//! The first candidate whose version is equal to or higher than the
//! requested one is loaded.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use walkdir::WalkDir;

use super::host::{HookRegistration, LoadedModule, ModuleHost, ResolveHook, ResolveRequest};
use super::{ModuleError, ModuleImage, ModuleReference, ModuleResult};
use crate::core::Logger;

/// Resolution hook that searches a set of directories recursively.
pub struct ModuleResolver {
    logger: Arc<dyn Logger>,
    roots: Vec<PathBuf>,
    calls: AtomicUsize,
}

impl fmt::Debug for ModuleResolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModuleResolver")
            .field("roots", &self.roots)
            .field("calls", &self.times_called())
            .finish_non_exhaustive()
    }
}

impl ModuleResolver {
    /// Create a resolver over `roots`.
    ///
    /// Relative roots are made absolute against the current directory, and
    /// the directory of the running executable is searched last. Roots do
    /// not need to exist.
    pub fn new<I, P>(logger: Arc<dyn Logger>, roots: I) -> ModuleResult<Self>
    where
        I: IntoIterator<Item = P>,
        P: AsRef<Path>,
    {
        let mut resolved = Vec::new();
        for root in roots {
            resolved.push(std::path::absolute(root.as_ref())?);
        }

        if resolved.is_empty() {
            return Err(ModuleError::NoSearchRoots);
        }

        if let Some(exe_dir) =
            std::env::current_exe().ok().and_then(|exe| exe.parent().map(Path::to_path_buf))
        {
            if !resolved.contains(&exe_dir) {
                resolved.push(exe_dir);
            }
        }

        Ok(Self { logger, roots: resolved, calls: AtomicUsize::new(0) })
    }

    /// Search roots in the order they are walked.
    pub fn roots(&self) -> &[PathBuf] {
        &self.roots
    }

    /// How many resolution requests this resolver has handled.
    pub fn times_called(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Every file under the roots whose name matches `reference`.
    ///
    /// Files are returned root by root, and in file-name order within a root.
    pub fn find_candidates(&self, reference: &ModuleReference) -> Vec<PathBuf> {
        let names = reference.candidate_file_names();
        let mut found = Vec::new();

        for root in &self.roots {
            let matches = WalkDir::new(root)
                .sort_by_file_name()
                .into_iter()
                .filter_map(Result::ok)
                .filter(|entry| entry.file_type().is_file())
                .filter(|entry| {
                    let file_name = entry.file_name().to_string_lossy();
                    names.iter().any(|name| file_names_match(&file_name, name))
                })
                .map(walkdir::DirEntry::into_path);

            for path in matches {
                if !found.contains(&path) {
                    found.push(path);
                }
            }
        }

        found
    }

    /// Try to find and load the requested module.
    pub fn resolve(
        &self,
        host: &ModuleHost,
        request: &ResolveRequest<'_>,
    ) -> Option<Arc<LoadedModule>> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        let reference = request.reference;
        let requester =
            request.requesting.map_or_else(|| "<unknown>".to_string(), ToString::to_string);
        self.logger.debug(format_args!(
            "Resolving module '{}' requested by {}",
            reference, requester
        ));

        for path in self.find_candidates(reference) {
            let image = match ModuleImage::from_file(&path) {
                Ok(image) => image,
                Err(e) => {
                    self.logger.debug(format_args!(
                        "Skipping candidate {}: {}",
                        path.display(),
                        e
                    ));
                    continue;
                }
            };

            let found = image.module.version;
            match reference.version() {
                None => self.logger.debug(format_args!(
                    "Accepting {} (version {}): no version was requested",
                    path.display(),
                    found
                )),
                Some(requested) if found == requested => self.logger.debug(format_args!(
                    "Accepting {}: exact version match {}",
                    path.display(),
                    found
                )),
                Some(requested) if found > requested => self.logger.debug(format_args!(
                    "Accepting {}: version {} is newer than requested {}",
                    path.display(),
                    found,
                    requested
                )),
                Some(requested) => {
                    self.logger.debug(format_args!(
                        "Rejecting {}: version {} is older than requested {}",
                        path.display(),
                        found,
                        requested
                    ));
                    continue;
                }
            }

            match host.load_file(&path) {
                Ok(module) => {
                    self.logger.debug(format_args!(
                        "Resolved '{}' to {}",
                        reference,
                        module.path().display()
                    ));
                    return Some(module);
                }
                Err(e) => {
                    self.logger.debug(format_args!(
                        "Failed to load candidate {}: {}",
                        path.display(),
                        e
                    ));
                }
            }
        }

        self.logger.debug(format_args!("Unable to resolve module '{}'", reference));
        None
    }

    /// Register this resolver with `host` for the lifetime of the returned
    /// scope.
    pub fn install(self, host: &ModuleHost) -> ResolverScope {
        let resolver = Arc::new(self);
        let registration = host.register_hook(resolver.clone());
        ResolverScope { resolver, registration }
    }
}

impl ResolveHook for ModuleResolver {
    fn resolve(
        &self,
        host: &ModuleHost,
        request: &ResolveRequest<'_>,
    ) -> Option<Arc<LoadedModule>> {
        Self::resolve(self, host, request)
    }
}

#[cfg(any(windows, target_os = "macos"))]
fn file_names_match(found: &str, wanted: &str) -> bool {
    found.eq_ignore_ascii_case(wanted)
}

#[cfg(not(any(windows, target_os = "macos")))]
fn file_names_match(found: &str, wanted: &str) -> bool {
    found == wanted
}

/// An installed [`ModuleResolver`].
///
/// The resolver is deregistered from the host when the scope is dropped or
/// closed, whichever happens first.
#[derive(Debug)]
pub struct ResolverScope {
    resolver: Arc<ModuleResolver>,
    registration: HookRegistration,
}

impl ResolverScope {
    /// The installed resolver.
    pub fn resolver(&self) -> &ModuleResolver {
        &self.resolver
    }

    /// Deregister the resolver. Safe to call more than once.
    pub fn close(&self) {
        self.registration.deregister();
    }

    /// Whether the resolver is still registered.
    pub fn is_active(&self) -> bool {
        self.registration.is_active()
    }
}
