//! Path containment checks.
//!
//! # Responsibilities
//! - Canonicalize candidate paths (symlinks, `.` and `..`)
//! - Admit only paths equal to or below an allowed root
//!
//! # Design Decisions
//! - Comparison is component-wise, so `/shared-tmpX` never matches `/shared-tmp`
//! - Any resolution error denies (fail closed)
//! - A missing tail below an existing directory resolves lexically, so a
//!   missing upload is reported as "file not found" rather than a denial

use std::io;
use std::path::{Component, Path, PathBuf};

/// Immutable set of canonical allowed directories.
#[derive(Debug, Clone, Default)]
pub struct AllowedRootSet {
    roots: Vec<PathBuf>,
}

impl AllowedRootSet {
    /// Canonicalize the configured roots. Roots that do not resolve are kept
    /// in their lexically normalized absolute form so they start matching
    /// once the directory is created.
    pub fn new<I, P>(roots: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: AsRef<Path>,
    {
        let mut resolved = Vec::new();
        for root in roots {
            let root = root.as_ref();
            match resolve(root) {
                Ok(path) => resolved.push(path),
                Err(e) => {
                    tracing::warn!(root = %root.display(), error = %e, "Ignoring unresolvable allowed root");
                }
            }
        }
        resolved.dedup();
        Self { roots: resolved }
    }

    pub fn roots(&self) -> &[PathBuf] {
        &self.roots
    }

    pub fn is_empty(&self) -> bool {
        self.roots.is_empty()
    }

    /// The resolved form of `candidate` when it canonically lies within one
    /// of the roots. Callers must use the returned path from here on, never
    /// the caller-supplied one.
    pub fn authorize(&self, candidate: &Path) -> Option<PathBuf> {
        match resolve(candidate) {
            Ok(path) if self.roots.iter().any(|root| path.starts_with(root)) => Some(path),
            Ok(_) => None,
            Err(e) => {
                tracing::debug!(path = %candidate.display(), error = %e, "Path resolution failed");
                None
            }
        }
    }

    /// True when `candidate` canonically lies within one of the roots.
    pub fn is_allowed(&self, candidate: &Path) -> bool {
        self.authorize(candidate).is_some()
    }
}

/// Resolve `path` to an absolute path with symlinks expanded for every
/// existing prefix. Components that do not exist yet are applied lexically.
fn resolve(path: &Path) -> io::Result<PathBuf> {
    if path.as_os_str().is_empty() {
        return Err(io::Error::new(io::ErrorKind::InvalidInput, "empty path"));
    }
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()?.join(path)
    };

    let mut resolved = PathBuf::new();
    for component in absolute.components() {
        match component {
            Component::Prefix(_) | Component::RootDir => resolved.push(component),
            Component::CurDir => {}
            Component::ParentDir => {
                resolved.pop();
            }
            Component::Normal(name) => {
                resolved.push(name);
                match resolved.canonicalize() {
                    Ok(canonical) => resolved = canonical,
                    Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                    Err(e) => return Err(e),
                }
            }
        }
    }
    Ok(resolved)
}
