//! Store-wide configuration and the JSON schemas exchanged with
//! `build.zig`/`zls.build.json` on disk.

use serde::Deserialize;
use std::path::PathBuf;

/// Immutable configuration supplied once at store construction (§6 "Input:
/// configuration"). Every field is optional; absence disables the feature
/// that depends on it rather than erroring.
#[derive(Clone, Debug, Default)]
pub struct StoreConfig {
    pub zig_exe_path: Option<PathBuf>,
    pub build_runner_path: Option<PathBuf>,
    pub zig_lib_dir: Option<PathBuf>,
    pub global_cache_dir: Option<PathBuf>,
    pub builtin_path: Option<PathBuf>,
    /// Caps a single `build.zig` invocation's captured stdout/stderr.
    pub max_build_output_bytes: usize,
    /// Caps the size of a document loaded from disk.
    pub max_document_size: u64,
    /// Client capability flags gating optional refresh notifications (§4.3).
    pub client_supports_semantic_tokens_refresh: bool,
    pub client_supports_inlay_hints_refresh: bool,
    /// Runs build-file invalidations synchronously on the invalidator's
    /// thread instead of dispatching to the worker pool (§4.3 "in
    /// single-threaded deployments it runs synchronously").
    pub single_threaded_build_runner: bool,
}

impl StoreConfig {
    pub const DEFAULT_MAX_BUILD_OUTPUT_BYTES: usize = 16 * 1024 * 1024;
    pub const DEFAULT_MAX_DOCUMENT_SIZE: u64 = u32::MAX as u64;

    pub fn new() -> Self {
        Self {
            max_build_output_bytes: Self::DEFAULT_MAX_BUILD_OUTPUT_BYTES,
            max_document_size: Self::DEFAULT_MAX_DOCUMENT_SIZE,
            ..Default::default()
        }
    }
}

/// One package entry published by a `build.zig` run's `packages[]`.
#[derive(Clone, Debug, Deserialize)]
pub struct PackageEntry {
    pub name: String,
    pub path: PathBuf,
}

/// One transitive build-root entry published by `deps_build_roots[]`.
#[derive(Clone, Debug, Deserialize)]
pub struct DepsBuildRoot {
    pub name: String,
    pub path: PathBuf,
}

/// The parsed `stdout` of a successful `build.zig` run (§6 persistent
/// formats). Unknown fields are ignored, per spec.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct RawBuildConfig {
    #[serde(default)]
    pub packages: Vec<PackageEntry>,
    #[serde(default)]
    pub include_dirs: Vec<PathBuf>,
    #[serde(default)]
    pub c_macros: Vec<String>,
    #[serde(default)]
    pub deps_build_roots: Vec<DepsBuildRoot>,
}

/// Dynamic configuration produced by executing a build description,
/// published into [`crate::build_file::BuildFile`] once resolved. Package
/// paths have already been made absolute relative to the build file's
/// directory.
#[derive(Clone, Debug, Default)]
pub struct BuildConfig {
    pub packages: Vec<PackageEntry>,
    pub include_dirs: Vec<PathBuf>,
    pub c_macros: Vec<String>,
    pub deps_build_roots: Vec<DepsBuildRoot>,
}

impl BuildConfig {
    pub fn from_raw(raw: RawBuildConfig, build_file_dir: &std::path::Path) -> Self {
        Self {
            packages: raw
                .packages
                .into_iter()
                .map(|p| PackageEntry { name: p.name, path: build_file_dir.join(p.path) })
                .collect(),
            include_dirs: raw.include_dirs,
            c_macros: raw.c_macros,
            deps_build_roots: raw
                .deps_build_roots
                .into_iter()
                .map(|d| DepsBuildRoot { name: d.name, path: build_file_dir.join(d.path) })
                .collect(),
        }
    }
}

/// The optional static companion config read from `zls.build.json`, a
/// sibling of `build.zig`.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct BuildAssociatedConfig {
    #[serde(default)]
    pub build_options: Vec<String>,
    pub relative_builtin_path: Option<PathBuf>,
}

impl BuildAssociatedConfig {
    pub const FILE_NAME: &'static str = "zls.build.json";

    /// Loads the companion config next to `build_zig_dir`. Absence is
    /// expected and logged at debug level, never treated as an error (§7).
    pub fn load(build_zig_dir: &std::path::Path) -> Option<Self> {
        let path = build_zig_dir.join(Self::FILE_NAME);
        match std::fs::read(&path) {
            Ok(bytes) => match serde_json::from_slice(&bytes) {
                Ok(cfg) => Some(cfg),
                Err(e) => {
                    tracing::debug!(?path, error = %e, "zls.build.json present but invalid");
                    None
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(?path, "no zls.build.json (expected)");
                None
            }
            Err(e) => {
                tracing::debug!(?path, error = %e, "failed reading zls.build.json");
                None
            }
        }
    }
}
