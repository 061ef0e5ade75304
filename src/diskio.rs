//! Loading a document's bytes from disk for `getOrLoadHandle` (§4.4), with
//! the `max_document_size` cap and the WASI preopen-directory fallback.

use crate::config::StoreConfig;
use crate::error::{Result, StoreError};
use crate::uri::Uri;
use std::path::{Path, PathBuf};

/// Candidate directories consulted, in order, before the plain filesystem
/// path on WASI targets without libc (§4.4).
#[cfg(all(target_os = "wasi", not(target_env = "p1")))]
const WASI_PREOPENS: &[&str] = &["/lib", "/cache"];

/// Reads `uri`'s file contents, enforcing `max_document_size`. On WASI
/// without libc, `/lib` and `/cache` preopens are tried before the path as
/// given, matching the spec's resolution order for that target.
pub fn load_document(uri: &Uri, config: &StoreConfig) -> Result<Vec<u8>> {
    let path = uri.to_file_path()?;
    let resolved = resolve_read_path(&path);

    let metadata = std::fs::metadata(&resolved)?;
    if metadata.len() > config.max_document_size {
        return Err(StoreError::DocumentTooLarge {
            uri: uri.clone(),
            size: metadata.len(),
            limit: config.max_document_size,
        });
    }

    std::fs::read(&resolved).map_err(StoreError::from)
}

#[cfg(all(target_os = "wasi", not(target_env = "p1")))]
fn resolve_read_path(path: &Path) -> PathBuf {
    for preopen in WASI_PREOPENS {
        let candidate = Path::new(preopen).join(path.strip_prefix("/").unwrap_or(path));
        if candidate.exists() {
            return candidate;
        }
    }
    path.to_path_buf()
}

#[cfg(not(all(target_os = "wasi", not(target_env = "p1"))))]
fn resolve_read_path(path: &Path) -> PathBuf {
    path.to_path_buf()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn oversized_document_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("big.zig");
        std::fs::write(&file, vec![0u8; 1024]).unwrap();

        let mut config = StoreConfig::new();
        config.max_document_size = 10;

        let uri = Uri::from_file_path(&file).unwrap();
        let err = load_document(&uri, &config).unwrap_err();
        assert!(matches!(err, StoreError::DocumentTooLarge { .. }));
    }

    #[test]
    fn reads_file_contents() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("a.zig");
        std::fs::write(&file, b"const x = 1;").unwrap();

        let uri = Uri::from_file_path(&file).unwrap();
        let bytes = load_document(&uri, &StoreConfig::new()).unwrap();
        assert_eq!(bytes, b"const x = 1;");
    }
}
