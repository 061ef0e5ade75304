//! Conversions between filesystem paths and the canonical URI form documents
//! and build files are keyed by.
//!
//! Every `Handle`/`BuildFile` in the store is addressed by a [`Uri`], never a
//! bare path, so that the same document reached via different relative paths
//! always maps to one cache entry.

use crate::error::{Result, StoreError};
use std::path::{Path, PathBuf};

/// A canonical `file://` URI.
///
/// Cheap to clone (wraps an `Arc<str>`-backed `Url`) and usable as a map key.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Uri(url::Url);

impl Uri {
    pub fn from_file_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.is_absolute() {
            return Err(StoreError::NotAbsolute(path.to_path_buf()));
        }
        // `dunce` strips the `\\?\` prefix Windows sometimes adds, so URIs
        // stay stable across APIs that do and don't canonicalize.
        let cleaned = dunce::simplified(path);
        url::Url::from_file_path(cleaned)
            .map(Uri)
            .map_err(|()| StoreError::InvalidUri {
                uri: path.display().to_string(),
                reason: "not representable as a file URI".into(),
            })
    }

    pub fn parse(s: &str) -> Result<Self> {
        url::Url::parse(s)
            .map(Uri)
            .map_err(|e| StoreError::InvalidUri { uri: s.to_string(), reason: e.to_string() })
    }

    pub fn to_file_path(&self) -> Result<PathBuf> {
        self.0.to_file_path().map_err(|()| StoreError::InvalidUri {
            uri: self.0.to_string(),
            reason: "not a file:// URI".into(),
        })
    }

    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }

    /// Directory containing this URI's path, as a URI.
    pub fn parent(&self) -> Option<Uri> {
        let mut url = self.0.clone();
        url.path_segments_mut().ok()?.pop();
        Some(Uri(url))
    }

    /// Resolves `relative` (a `./`, `../`, or bare filename import string)
    /// against the directory of `self`.
    pub fn resolve_relative(&self, relative: &str) -> Result<Uri> {
        let base_dir = self.to_file_path()?;
        let base_dir = base_dir.parent().ok_or_else(|| StoreError::InvalidUri {
            uri: self.as_str().to_string(),
            reason: "no parent directory".into(),
        })?;
        let joined = normalize_join(base_dir.to_path_buf(), relative);
        Uri::from_file_path(joined)
    }

    /// Joins a file name onto this URI treated as a directory.
    pub fn join_file(&self, dir: &Path, file_name: &str) -> Result<Uri> {
        Uri::from_file_path(dir.join(file_name))
    }

    pub fn is_std(&self) -> bool {
        self.0.path().contains("/std/")
    }

    pub fn is_build_file(&self) -> bool {
        self.0.path().ends_with("/build.zig")
    }

    pub fn is_builtin(&self) -> bool {
        self.0.path().ends_with("/builtin.zig")
    }

    /// `true` for `.zig` sources parsed in the "source" grammar; `false` for
    /// `.zon` data-literal documents.
    pub fn is_source_extension(&self) -> bool {
        self.0.path().ends_with(".zig")
    }
}

impl std::fmt::Display for Uri {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Joins `relative` onto `base_dir`, collapsing `.` and `..` segments without
/// touching the filesystem (the target may not exist yet).
fn normalize_join(base_dir: PathBuf, relative: &str) -> PathBuf {
    let mut components: Vec<std::path::Component<'_>> = base_dir.components().collect();
    for part in Path::new(relative).components() {
        match part {
            std::path::Component::CurDir => {}
            std::path::Component::ParentDir => {
                components.pop();
            }
            other => components.push(other),
        }
    }
    components.iter().collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_through_file_path() {
        let uri = Uri::from_file_path("/p/a.zig").unwrap();
        assert_eq!(uri.to_file_path().unwrap(), PathBuf::from("/p/a.zig"));
    }

    #[test]
    fn resolves_relative_imports() {
        let uri = Uri::from_file_path("/p/sub/a.zig").unwrap();
        let resolved = uri.resolve_relative("../b.zig").unwrap();
        assert_eq!(resolved.to_file_path().unwrap(), PathBuf::from("/p/b.zig"));
    }

    #[test]
    fn detects_std_build_and_builtin_uris() {
        assert!(Uri::from_file_path("/z/lib/std/std.zig").unwrap().is_std());
        assert!(Uri::from_file_path("/p/build.zig").unwrap().is_build_file());
        assert!(Uri::from_file_path("/p/builtin.zig").unwrap().is_builtin());
    }
}
