//! The top-level container: concurrent URI-keyed maps, lifecycle
//! operations, reachability GC, and build-file/progress orchestration
//! (§3 `Store`, §4.4-§4.6).

use crate::build_file::{BuildFile, CompletionAction, InvalidateAction};
use crate::collaborators::{
    BuildOutcome, CTranslator, Diagnostics, DiagnosticKind, ErrorBundle, LanguageTools,
    ProgressSink, TranslateOutcome, TranslateRequest,
};
use crate::config::{BuildAssociatedConfig, BuildConfig, PackageEntry, StoreConfig};
use crate::error::{Result, StoreError};
use crate::handle::Handle;
use crate::hash::Hash;
use crate::resolver::{resolve_import, ImportContext};
use crate::runner;
use crate::uri::Uri;
use crate::diskio;
use indexmap::IndexMap;
use std::collections::{HashMap, HashSet};
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, RwLock};

/// Cached outcome of a `@cImport` translation, keyed by the hash of its
/// generated C source (§3).
#[derive(Clone)]
pub enum CImportResult {
    Success(Uri),
    Failure(ErrorBundle),
}

struct Maps<T: LanguageTools> {
    handles: IndexMap<Uri, Arc<Handle<T>>>,
    build_files: IndexMap<Uri, Arc<BuildFile>>,
    cimports: HashMap<Hash, CImportResult>,
}

impl<T: LanguageTools> Default for Maps<T> {
    fn default() -> Self {
        Self { handles: IndexMap::new(), build_files: IndexMap::new(), cimports: HashMap::new() }
    }
}

/// The document store. Always used behind an `Arc` so that background
/// build-file runs can hold a reference back into it.
pub struct Store<T: LanguageTools> {
    maps: RwLock<Maps<T>>,
    builds_in_progress: AtomicUsize,
    tools: Arc<T>,
    translator: Arc<dyn CTranslator>,
    diagnostics: Arc<dyn Diagnostics>,
    progress: Arc<dyn ProgressSink>,
    config: StoreConfig,
}

impl<T: LanguageTools + 'static> Store<T> {
    pub fn new(
        tools: T,
        translator: Arc<dyn CTranslator>,
        diagnostics: Arc<dyn Diagnostics>,
        progress: Arc<dyn ProgressSink>,
        config: StoreConfig,
    ) -> Arc<Self> {
        Arc::new(Self {
            maps: RwLock::new(Maps::default()),
            builds_in_progress: AtomicUsize::new(0),
            tools: Arc::new(tools),
            translator,
            diagnostics,
            progress,
            config,
        })
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    // ---------------------------------------------------------------
    // document lifecycle (§4.4, §6)
    // ---------------------------------------------------------------

    /// Not thread-safe with respect to the same URI (§6): a client protocol
    /// violation if two opens for the same document race.
    pub fn open_document(self: &Arc<Self>, uri: Uri, text: Vec<u8>) {
        let (handle, import_strings) = Handle::new(uri.clone(), text, true, self.tools.as_ref());
        let handle = Arc::new(handle);
        {
            let mut maps = self.maps.write().unwrap();
            maps.handles.insert(uri.clone(), handle.clone());
        }
        self.refresh_imports_and_build_file(&handle, import_strings);

        if uri.is_build_file() && !uri.is_std() {
            let bf = self.ensure_build_file(uri.clone());
            self.dispatch_build_file_invalidate(bf);
        }
    }

    pub fn get_handle(&self, uri: &Uri) -> Option<Arc<Handle<T>>> {
        self.maps.read().unwrap().handles.get(uri).cloned()
    }

    pub fn get_build_file(&self, uri: &Uri) -> Option<Arc<BuildFile>> {
        self.maps.read().unwrap().build_files.get(uri).cloned()
    }

    /// Loads and caches a handle for `uri` if it isn't already known
    /// (`getOrLoadHandle`, §4.4).
    pub fn get_or_load_handle(self: &Arc<Self>, uri: &Uri) -> Result<Arc<Handle<T>>> {
        if let Some(h) = self.get_handle(uri) {
            return Ok(h);
        }
        let bytes = diskio::load_document(uri, &self.config)?;
        let (handle, import_strings) = Handle::new(uri.clone(), bytes, false, self.tools.as_ref());
        let handle = Arc::new(handle);
        let (canonical, inserted) = {
            let mut maps = self.maps.write().unwrap();
            match maps.handles.get(uri) {
                Some(existing) => (existing.clone(), false),
                None => {
                    maps.handles.insert(uri.clone(), handle.clone());
                    (handle, true)
                }
            }
        };
        if inserted {
            self.refresh_imports_and_build_file(&canonical, import_strings);
        }
        Ok(canonical)
    }

    pub fn refresh_document(self: &Arc<Self>, uri: &Uri, new_text: Vec<u8>) {
        let Some(handle) = self.get_handle(uri) else {
            tracing::warn!(%uri, "refresh on a document the store doesn't know about");
            return;
        };
        let import_strings = handle.set_source(new_text, self.tools.as_ref());
        self.recompute_import_uris(&handle, &import_strings);

        if uri.is_build_file() && !uri.is_std() {
            let bf = self.ensure_build_file(uri.clone());
            self.dispatch_build_file_invalidate(bf);
        }
    }

    /// No-op if `uri` is open; otherwise removes it. Returns whether a
    /// removal occurred (§4.4).
    pub fn refresh_document_from_file_system(&self, uri: &Uri) -> bool {
        {
            let maps = self.maps.read().unwrap();
            match maps.handles.get(uri) {
                Some(h) if h.is_open() => return false,
                None => return false,
                Some(_) => {}
            }
        }
        let mut maps = self.maps.write().unwrap();
        match maps.handles.get(uri) {
            Some(h) if h.is_open() => false,
            Some(_) => maps.handles.shift_remove(uri).is_some(),
            None => false,
        }
    }

    /// Toggles `open` to `false`, then opportunistically GCs (§4.4): the
    /// write lock is acquired non-blocking, so a contended close defers GC
    /// to the next successful attempt.
    pub fn close_document(&self, uri: &Uri) {
        if let Some(h) = self.get_handle(uri) {
            h.set_open(false);
        }
        if let Ok(mut maps) = self.maps.try_write() {
            self.gc_locked(&mut maps);
        }
    }

    // ---------------------------------------------------------------
    // imports, associated build files (§4.2, §4.5, §4.7)
    // ---------------------------------------------------------------

    fn refresh_imports_and_build_file(self: &Arc<Self>, handle: &Arc<Handle<T>>, import_strings: Vec<String>) {
        if !handle.uri.is_std() {
            let candidates = self.discover_and_ensure_build_files(&handle.uri);
            if !candidates.is_empty() {
                handle.set_unresolved_candidates(candidates);
            }
        }
        self.try_resolve_associated_build_file(handle);
        self.recompute_import_uris(handle, &import_strings);
    }

    fn try_resolve_associated_build_file(self: &Arc<Self>, handle: &Arc<Handle<T>>) -> Option<Uri> {
        let doc_uri = handle.uri.clone();
        handle.resolve_associated_build_file(|candidate| self.is_dependency_of(candidate, &doc_uri))
    }

    /// §4.5: is `doc_uri` a dependency of `build_file_uri`?
    fn is_dependency_of(self: &Arc<Self>, build_file_uri: &Uri, doc_uri: &Uri) -> Option<bool> {
        let bf = self.get_build_file(build_file_uri)?;
        let config = bf.config()?;

        let mut visited: HashSet<Uri> = HashSet::new();
        let mut stack: Vec<Uri> =
            config.packages.iter().filter_map(|p| Uri::from_file_path(&p.path).ok()).collect();

        while let Some(current) = stack.pop() {
            if current == *doc_uri {
                return Some(true);
            }
            if !visited.insert(current.clone()) {
                continue;
            }
            if current.is_std() {
                continue;
            }
            let Ok(handle) = self.get_or_load_handle(&current) else { continue };
            if let Some(resolved) = handle.associated_build_file_snapshot() {
                if resolved == *build_file_uri {
                    return Some(true);
                }
            }
            stack.extend(handle.import_uris());
        }
        Some(false)
    }

    /// Ancestor-directory walk for `build.zig` candidates (§4.4). Returns
    /// URIs with the outermost ancestor first (highest priority).
    fn discover_and_ensure_build_files(self: &Arc<Self>, doc_uri: &Uri) -> Vec<Uri> {
        let Ok(path) = doc_uri.to_file_path() else { return Vec::new() };
        let mut nearest_first = Vec::new();
        let mut dir = path.parent().map(PathBuf::from);
        while let Some(d) = dir {
            let candidate = d.join("build.zig");
            if candidate.is_file() {
                if let Ok(build_uri) = Uri::from_file_path(&candidate) {
                    self.ensure_build_file(build_uri.clone());
                    nearest_first.push(build_uri);
                }
            }
            dir = d.parent().map(PathBuf::from);
        }
        nearest_first.reverse();
        nearest_first
    }

    /// Resolves or creates the `BuildFile` for `uri`, scheduling its first
    /// run if this call created it (§9 "Ancestor-walk side effects").
    fn ensure_build_file(self: &Arc<Self>, uri: Uri) -> Arc<BuildFile> {
        if let Some(bf) = self.get_build_file(&uri) {
            return bf;
        }

        let dir = uri.to_file_path().ok().and_then(|p| p.parent().map(PathBuf::from));
        let assoc = dir.as_deref().and_then(BuildAssociatedConfig::load);
        let builtin_uri = assoc
            .as_ref()
            .and_then(|a| a.relative_builtin_path.as_ref())
            .zip(dir.as_deref())
            .and_then(|(rel, dir)| Uri::from_file_path(dir.join(rel)).ok());
        let candidate = Arc::new(BuildFile::new(uri.clone(), builtin_uri, assoc));

        let (canonical, inserted) = {
            let mut maps = self.maps.write().unwrap();
            match maps.build_files.get(&uri) {
                Some(existing) => (existing.clone(), false),
                None => {
                    maps.build_files.insert(uri, candidate.clone());
                    (candidate, true)
                }
            }
        };
        if inserted {
            self.dispatch_build_file_invalidate(canonical.clone());
        }
        canonical
    }

    fn recompute_import_uris(self: &Arc<Self>, handle: &Arc<Handle<T>>, import_strings: &[String]) {
        let associated = handle.associated_build_file_snapshot();

        let packages: Option<Vec<PackageEntry>> = if handle.uri.is_build_file() {
            self.get_build_file(&handle.uri).and_then(|bf| bf.config()).map(|cfg| {
                cfg.deps_build_roots
                    .into_iter()
                    .map(|d| PackageEntry { name: d.name, path: d.path })
                    .collect()
            })
        } else {
            associated
                .as_ref()
                .and_then(|bf_uri| self.get_build_file(bf_uri))
                .and_then(|bf| bf.config())
                .map(|cfg| cfg.packages)
        };

        let builtin = associated.as_ref().and_then(|bf_uri| self.get_build_file(bf_uri)).and_then(|bf| bf.builtin_uri.clone());

        let mut resolved = Vec::with_capacity(import_strings.len());
        for s in import_strings {
            let ctx = ImportContext {
                handle_uri: &handle.uri,
                build_file_builtin: builtin.as_ref(),
                packages: packages.as_deref(),
            };
            match resolve_import(s, &ctx, &self.config) {
                Some(uri) => resolved.push(uri),
                None => tracing::trace!(import = %s, uri = %handle.uri, "import did not resolve"),
            }
        }
        handle.set_import_uris(resolved);
    }

    // ---------------------------------------------------------------
    // build-file runs (§4.3)
    // ---------------------------------------------------------------

    fn dispatch_build_file_invalidate(self: &Arc<Self>, build_file: Arc<BuildFile>) {
        if let InvalidateAction::StartRun = build_file.invalidate() {
            self.dispatch_build_run(build_file);
        }
    }

    fn dispatch_build_run(self: &Arc<Self>, build_file: Arc<BuildFile>) {
        self.begin_build();
        let this = Arc::clone(self);
        let work = move || this.execute_build_run(build_file);
        if self.config.single_threaded_build_runner {
            work();
        } else {
            rayon::spawn(work);
        }
    }

    fn execute_build_run(self: &Arc<Self>, build_file: Arc<BuildFile>) {
        let dir = match build_file.uri.to_file_path().ok().and_then(|p| p.parent().map(PathBuf::from)) {
            Some(dir) => dir,
            None => {
                tracing::error!(uri = %build_file.uri, "build file has no parent directory");
                match build_file.run_completed(None) {
                    CompletionAction::Idle => self.end_build(BuildOutcome::Failed),
                    CompletionAction::RunAgain => self.dispatch_build_run(build_file),
                }
                return;
            }
        };

        let (new_config, outcome) =
            match runner::run_build(&self.config, &build_file.uri, &dir, build_file.build_associated_config.as_ref()) {
                Ok(cfg) => (Some(cfg), BuildOutcome::Success),
                Err(StoreError::RunFailed { build_file: uri, stderr, .. }) => {
                    let tag = diagnostic_tag(&uri);
                    let bundle = ErrorBundle::from_stderr(&stderr);
                    self.diagnostics.push_error_bundle(&tag, build_file.version(), &dir, &bundle);
                    self.diagnostics.publish();
                    (None, BuildOutcome::Failed)
                }
                Err(e) => {
                    tracing::error!(error = %e, uri = %build_file.uri, "build run failed");
                    (None, BuildOutcome::Failed)
                }
            };

        match build_file.run_completed(new_config) {
            CompletionAction::Idle => self.end_build(outcome),
            CompletionAction::RunAgain => self.dispatch_build_run(build_file),
        }
    }

    fn begin_build(&self) {
        if self.builds_in_progress.fetch_add(1, Ordering::SeqCst) == 0 {
            self.progress.write_json_message(progress_message("begin", None));
        }
    }

    fn end_build(&self, outcome: BuildOutcome) {
        if self.builds_in_progress.fetch_sub(1, Ordering::SeqCst) == 1 {
            self.progress.write_json_message(progress_message("end", Some(outcome)));
            if outcome == BuildOutcome::Success {
                if self.config.client_supports_semantic_tokens_refresh {
                    self.progress
                        .write_json_message(serde_json::json!({"method": "workspace/semanticTokens/refresh"}));
                }
                if self.config.client_supports_inlay_hints_refresh {
                    self.progress
                        .write_json_message(serde_json::json!({"method": "workspace/inlayHint/refresh"}));
                }
            }
        }
    }

    // ---------------------------------------------------------------
    // cimport resolution (§6)
    // ---------------------------------------------------------------

    pub fn resolve_c_import(&self, handle: &Handle<T>, node_index: usize) -> Option<Uri> {
        let hash = handle.cimport_hash(node_index)?;
        if let Some(cached) = self.maps.read().unwrap().cimports.get(&hash).cloned() {
            return match cached {
                CImportResult::Success(uri) => Some(uri),
                CImportResult::Failure(_) => None,
            };
        }

        let build_config = handle
            .associated_build_file_snapshot()
            .and_then(|bf_uri| self.get_build_file(&bf_uri))
            .and_then(|bf| bf.config());
        let include_dirs = build_config.as_ref().map(|c| c.include_dirs.clone()).unwrap_or_default();
        let c_macros = build_config.as_ref().map(|c| c.c_macros.clone()).unwrap_or_default();
        let c_source = handle.cimport_source(node_index)?;

        let request = TranslateRequest {
            config: build_config.as_ref(),
            include_dirs: &include_dirs,
            c_macros: &c_macros,
            c_source: &c_source,
        };

        match self.translator.translate(request) {
            TranslateOutcome::Success(uri) => {
                self.maps.write().unwrap().cimports.insert(hash, CImportResult::Success(uri.clone()));
                Some(uri)
            }
            TranslateOutcome::Failure(bundle) => {
                self.maps.write().unwrap().cimports.insert(hash, CImportResult::Failure(bundle.clone()));
                self.diagnostics.push_single_document(DiagnosticKind::CImport, &handle.uri, &bundle);
                self.diagnostics.publish();
                None
            }
            TranslateOutcome::Null => None,
        }
    }

    // ---------------------------------------------------------------
    // dependency/include-dir/macro queries (§6)
    // ---------------------------------------------------------------

    pub fn collect_dependencies(&self, handle: &Handle<T>, out: &mut Vec<Uri>) {
        let maps = self.maps.read().unwrap();
        collect_dependencies_locked(&maps, handle, out);
    }

    /// Returns `false` (incomplete data) if the associated build config is
    /// still pending.
    pub fn collect_include_dirs(&self, handle: &Handle<T>, out: &mut Vec<PathBuf>) -> bool {
        match self.resolved_build_config(handle) {
            Some(cfg) => {
                out.extend(cfg.include_dirs);
                true
            }
            None => false,
        }
    }

    pub fn collect_c_macros(&self, handle: &Handle<T>, out: &mut Vec<String>) -> bool {
        match self.resolved_build_config(handle) {
            Some(cfg) => {
                out.extend(cfg.c_macros);
                true
            }
            None => false,
        }
    }

    fn resolved_build_config(&self, handle: &Handle<T>) -> Option<BuildConfig> {
        let bf_uri = handle.associated_build_file_snapshot()?;
        self.get_build_file(&bf_uri)?.config()
    }

    // ---------------------------------------------------------------
    // reachability GC (§4.6)
    // ---------------------------------------------------------------

    fn gc_locked(&self, maps: &mut Maps<T>) {
        // 1. documents
        let mut reachable: HashSet<Uri> = HashSet::new();
        let mut frontier: Vec<Uri> = Vec::new();
        for (uri, handle) in maps.handles.iter() {
            if handle.is_open() && reachable.insert(uri.clone()) {
                frontier.push(uri.clone());
            }
        }
        while let Some(uri) = frontier.pop() {
            let Some(handle) = maps.handles.get(&uri).cloned() else { continue };
            let mut deps = Vec::new();
            collect_dependencies_locked(maps, &handle, &mut deps);
            for dep in deps {
                if reachable.insert(dep.clone()) {
                    frontier.push(dep);
                }
            }
        }
        let removed_docs = maps.handles.len() - maps.handles.iter().filter(|(u, _)| reachable.contains(*u)).count();
        maps.handles.retain(|uri, _| reachable.contains(uri));
        if removed_docs > 0 {
            tracing::debug!(removed_docs, "gc: documents");
        }

        // 2. cimport results
        let mut reachable_hashes: HashSet<Hash> = HashSet::new();
        for (_, handle) in maps.handles.iter() {
            reachable_hashes.extend(handle.cimport_hashes());
        }
        maps.cimports.retain(|hash, _| reachable_hashes.contains(hash));

        // 3. build files
        let mut reachable_bf: HashSet<Uri> = HashSet::new();
        let mut bf_frontier: Vec<Uri> = Vec::new();
        for (uri, handle) in maps.handles.iter() {
            if uri.is_build_file() && reachable_bf.insert(uri.clone()) {
                bf_frontier.push(uri.clone());
            }
            if let Some(bf_uri) = handle.associated_build_file_snapshot() {
                if reachable_bf.insert(bf_uri.clone()) {
                    bf_frontier.push(bf_uri);
                }
            }
        }
        while let Some(uri) = bf_frontier.pop() {
            let Some(bf) = maps.build_files.get(&uri).cloned() else { continue };
            if let Some(cfg) = bf.config() {
                for dep in &cfg.deps_build_roots {
                    if let Ok(u) = Uri::from_file_path(&dep.path) {
                        if reachable_bf.insert(u.clone()) {
                            bf_frontier.push(u);
                        }
                    }
                }
            }
        }
        maps.build_files.retain(|uri, _| reachable_bf.contains(uri));
    }
}

fn collect_dependencies_locked<T: LanguageTools>(maps: &Maps<T>, handle: &Handle<T>, out: &mut Vec<Uri>) {
    out.extend(handle.import_uris());
    for hash in handle.cimport_hashes() {
        if let Some(CImportResult::Success(uri)) = maps.cimports.get(&hash) {
            out.push(uri.clone());
        }
    }
    if let Some(bf_uri) = handle.associated_build_file_snapshot() {
        if let Some(bf) = maps.build_files.get(&bf_uri) {
            if let Some(cfg) = bf.config() {
                for pkg in &cfg.packages {
                    if let Ok(u) = Uri::from_file_path(&pkg.path) {
                        out.push(u);
                    }
                }
            }
        }
    }
}

fn diagnostic_tag(uri: &Uri) -> String {
    format!("build:{}", blake3::hash(uri.as_str().as_bytes()).to_hex())
}

fn progress_message(kind: &str, outcome: Option<BuildOutcome>) -> serde_json::Value {
    let mut value = serde_json::json!({ "kind": kind });
    if kind == "begin" {
        value["title"] = serde_json::json!("Running build.zig");
    }
    if let Some(outcome) = outcome {
        value["outcome"] = serde_json::json!(match outcome {
            BuildOutcome::Success => "success",
            BuildOutcome::Failed => "failed",
        });
    }
    serde_json::json!({
        "method": "$/progress",
        "params": { "token": "zigls/build", "value": value },
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collaborators::NullSink;
    use std::sync::atomic::AtomicUsize as StdAtomicUsize;

    #[derive(Default)]
    struct FakeTools {
        parse_calls: StdAtomicUsize,
    }

    impl LanguageTools for FakeTools {
        type Tree = String;
        type Scope = ();
        type IrSource = ();
        type IrData = ();
        type CImportNode = usize;

        fn parse(&self, text: &[u8], _mode: crate::collaborators::ParseMode) -> String {
            self.parse_calls.fetch_add(1, Ordering::SeqCst);
            String::from_utf8_lossy(text).into_owned()
        }
        fn build_scope(&self, _tree: &String) {}
        fn build_ir_source(&self, _tree: &String) {}
        fn build_ir_data(&self, _tree: &String) {}

        fn collect_imports(&self, tree: &String) -> Vec<String> {
            extract_import_strings(tree)
        }
        fn collect_cimports(&self, tree: &String) -> Vec<usize> {
            tree.match_indices("@cImport(").map(|(i, _)| i).collect()
        }
        fn cimport_source_text(&self, node: &usize) -> Vec<u8> {
            format!("cimport-at-{node}").into_bytes()
        }
    }

    fn extract_import_strings(tree: &str) -> Vec<String> {
        let mut out = Vec::new();
        let needle = "@import(\"";
        let mut rest = tree;
        while let Some(start) = rest.find(needle) {
            rest = &rest[start + needle.len()..];
            if let Some(end) = rest.find('"') {
                out.push(rest[..end].to_string());
                rest = &rest[end + 1..];
            } else {
                break;
            }
        }
        out
    }

    struct NullTranslator;
    impl CTranslator for NullTranslator {
        fn translate(&self, _request: TranslateRequest<'_>) -> TranslateOutcome {
            TranslateOutcome::Null
        }
    }

    struct FailingTranslator;
    impl CTranslator for FailingTranslator {
        fn translate(&self, _request: TranslateRequest<'_>) -> TranslateOutcome {
            TranslateOutcome::Failure(ErrorBundle { messages: vec!["bad C source".into()] })
        }
    }

    fn new_store(config: StoreConfig) -> Arc<Store<FakeTools>> {
        Store::new(
            FakeTools::default(),
            Arc::new(NullTranslator),
            Arc::new(NullSink),
            Arc::new(NullSink),
            config,
        )
    }

    #[test]
    fn single_open_resolves_std() {
        let tmp = tempfile::tempdir().unwrap();
        let lib_dir = tmp.path().join("lib");
        std::fs::create_dir_all(lib_dir.join("std")).unwrap();
        std::fs::write(lib_dir.join("std").join("std.zig"), b"").unwrap();

        let mut config = StoreConfig::new();
        config.zig_lib_dir = Some(lib_dir.clone());
        let store = new_store(config);

        let uri = Uri::from_file_path(tmp.path().join("a.zig")).unwrap();
        store.open_document(uri.clone(), b"const std = @import(\"std\");".to_vec());

        let handle = store.get_handle(&uri).unwrap();
        let imports = handle.import_uris();
        assert_eq!(imports.len(), 1);
        assert_eq!(imports[0].to_file_path().unwrap(), lib_dir.join("std").join("std.zig"));
    }

    #[test]
    fn ancestor_priority_outermost_first() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::write(tmp.path().join("build.zig"), b"").unwrap();
        let sub = tmp.path().join("sub");
        std::fs::create_dir_all(&sub).unwrap();
        std::fs::write(sub.join("build.zig"), b"").unwrap();

        let store = new_store(StoreConfig::new());
        let doc_uri = Uri::from_file_path(sub.join("x.zig")).unwrap();
        let candidates = store.discover_and_ensure_build_files(&doc_uri);

        let outer = Uri::from_file_path(tmp.path().join("build.zig")).unwrap();
        let inner = Uri::from_file_path(sub.join("build.zig")).unwrap();
        assert_eq!(candidates, vec![outer, inner]);
    }

    #[test]
    fn close_then_gc_prunes_unreferenced_dependency() {
        let tmp = tempfile::tempdir().unwrap();
        let b_path = tmp.path().join("b.zig");
        std::fs::write(&b_path, b"").unwrap();

        let store = new_store(StoreConfig::new());
        let a_uri = Uri::from_file_path(tmp.path().join("a.zig")).unwrap();
        let b_uri = Uri::from_file_path(&b_path).unwrap();

        store.open_document(a_uri.clone(), b"@import(\"b.zig\");".to_vec());
        // a language feature resolving A's import loads B on demand
        store.get_or_load_handle(&b_uri).unwrap();
        assert!(store.get_handle(&b_uri).is_some());

        store.close_document(&a_uri);

        assert!(store.get_handle(&a_uri).is_none());
        assert!(store.get_handle(&b_uri).is_none());
    }

    #[test]
    fn refresh_preserves_open_flag_and_bumps_version() {
        let store = new_store(StoreConfig::new());
        let uri = Uri::from_file_path("/p/a.zig").unwrap();
        store.open_document(uri.clone(), b"const x = 1;".to_vec());

        let handle = store.get_handle(&uri).unwrap();
        assert!(handle.is_open());
        assert_eq!(handle.version(), 1);

        store.refresh_document(&uri, b"const x = 2;".to_vec());
        assert!(handle.is_open());
        assert_eq!(handle.version(), 2);
    }

    #[test]
    fn cimport_failure_is_sticky_per_hash() {
        let store = Arc::new(Store {
            maps: RwLock::new(Maps::default()),
            builds_in_progress: AtomicUsize::new(0),
            tools: Arc::new(FakeTools::default()),
            translator: Arc::new(FailingTranslator),
            diagnostics: Arc::new(NullSink),
            progress: Arc::new(NullSink),
            config: StoreConfig::new(),
        });

        let uri = Uri::from_file_path("/p/a.zig").unwrap();
        store.open_document(uri.clone(), b"@cImport(int x;)".to_vec());
        let handle = store.get_handle(&uri).unwrap();

        assert!(store.resolve_c_import(&handle, 0).is_none());
        assert!(store.resolve_c_import(&handle, 0).is_none());
        assert_eq!(store.maps.read().unwrap().cimports.len(), 1);
    }
}
