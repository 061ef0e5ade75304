//! Per-document state: source text, parse tree, derived artifacts, and the
//! associated-build-file resolution state machine (§3, §4.1, §4.2).

use crate::collaborators::{LanguageTools, ParseMode};
use crate::hash::Hash;
use crate::status::{Derivative, DerivativeStatus, Status};
use crate::uri::Uri;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Condvar, Mutex};

/// One `@cImport` node found in a handle's tree, with the C source it
/// generates and that source's identity hash.
pub struct CImportEntry<N> {
    pub node: N,
    pub hash: Hash,
    pub c_source: Vec<u8>,
}

/// State of `Handle::associated_build_file` (§4.2).
pub enum AssociatedBuildFile {
    None,
    Unresolved { potential: Vec<Uri>, already_rejected: Vec<bool> },
    Resolved(Uri),
}

impl AssociatedBuildFile {
    pub fn resolved(&self) -> Option<&Uri> {
        match self {
            AssociatedBuildFile::Resolved(uri) => Some(uri),
            _ => None,
        }
    }
}

/// The mutex-guarded half of a [`Handle`]: everything that changes together
/// on `setSource`, plus the build-file resolution state and the derivative
/// slots. A single mutex/condvar pair covers all of it, per §3's "Per-handle
/// mutex + condition variable: guards the producer-coordination protocol for
/// derived artifacts and the associated-build-file state machine."
struct Inner<T: LanguageTools> {
    source: Vec<u8>,
    tree: Arc<T::Tree>,
    import_uris: Vec<Uri>,
    cimports: Vec<CImportEntry<T::CImportNode>>,
    scope: Option<Arc<T::Scope>>,
    ir_source: Option<Arc<T::IrSource>>,
    ir_data: Option<Arc<T::IrData>>,
    associated_build_file: AssociatedBuildFile,
}

pub struct Handle<T: LanguageTools> {
    pub uri: Uri,
    version: AtomicU64,
    status: Status,
    inner: Mutex<Inner<T>>,
    condvar: Condvar,
}

impl<T: LanguageTools> Handle<T> {
    /// Parses `text` and extracts its imports before taking any lock, per
    /// §4.1's edit-path ordering rationale.
    pub fn new(uri: Uri, text: Vec<u8>, open: bool, tools: &T) -> (Self, Vec<String>) {
        let mode = ParseMode::for_uri(&uri);
        let tree = tools.parse(&text, mode);
        let import_strings = tools.collect_imports(&tree);
        let cimport_nodes = tools.collect_cimports(&tree);
        let cimports = cimport_nodes
            .into_iter()
            .map(|node| {
                let c_source = tools.cimport_source_text(&node);
                let hash = Hash::of_c_source(&c_source);
                CImportEntry { node, hash, c_source }
            })
            .collect();

        let inner = Inner {
            source: text,
            tree: Arc::new(tree),
            import_uris: Vec::new(),
            cimports,
            scope: None,
            ir_source: None,
            ir_data: None,
            associated_build_file: AssociatedBuildFile::None,
        };

        let handle = Self {
            uri,
            version: AtomicU64::new(1),
            status: Status::new(open),
            inner: Mutex::new(inner),
            condvar: Condvar::new(),
        };
        (handle, import_strings)
    }

    pub fn version(&self) -> u64 {
        self.version.load(Ordering::Acquire)
    }

    pub fn is_open(&self) -> bool {
        self.status.is_open()
    }

    /// Toggles the open flag, returning the previous value (§4.1).
    pub fn set_open(&self, open: bool) -> bool {
        self.status.set_open(open)
    }

    pub fn derivative_status(&self, d: Derivative) -> DerivativeStatus {
        self.status.status(d)
    }

    /// Replaces the handle's source and tree (`setSource`, §4.1). Parsing
    /// happens in the caller before this is invoked, so the mutex is held
    /// only for the pointer/version swap itself.
    pub fn set_source(&self, text: Vec<u8>, tools: &T) -> Vec<String> {
        let mode = ParseMode::for_uri(&self.uri);
        let tree = tools.parse(&text, mode);
        let import_strings = tools.collect_imports(&tree);
        let cimport_nodes = tools.collect_cimports(&tree);
        let cimports = cimport_nodes
            .into_iter()
            .map(|node| {
                let c_source = tools.cimport_source_text(&node);
                let hash = Hash::of_c_source(&c_source);
                CImportEntry { node, hash, c_source }
            })
            .collect();

        {
            let mut inner = self.inner.lock().unwrap();
            inner.source = text;
            inner.tree = Arc::new(tree);
            inner.import_uris.clear();
            inner.cimports = cimports;
            inner.scope = None;
            inner.ir_source = None;
            inner.ir_data = None;
        }
        self.status.reset_derivatives_preserving_open();
        self.version.fetch_add(1, Ordering::AcqRel);
        self.condvar.notify_all();
        import_strings
    }

    pub fn set_import_uris(&self, uris: Vec<Uri>) {
        self.inner.lock().unwrap().import_uris = uris;
    }

    pub fn import_uris(&self) -> Vec<Uri> {
        self.inner.lock().unwrap().import_uris.clone()
    }

    pub fn tree(&self) -> Arc<T::Tree> {
        self.inner.lock().unwrap().tree.clone()
    }

    pub fn cimport_hash(&self, index: usize) -> Option<Hash> {
        self.inner.lock().unwrap().cimports.get(index).map(|e| e.hash)
    }

    pub fn cimport_count(&self) -> usize {
        self.inner.lock().unwrap().cimports.len()
    }

    pub fn cimport_hashes(&self) -> Vec<Hash> {
        self.inner.lock().unwrap().cimports.iter().map(|e| e.hash).collect()
    }

    pub fn cimport_source(&self, index: usize) -> Option<Vec<u8>> {
        self.inner.lock().unwrap().cimports.get(index).map(|e| e.c_source.clone())
    }

    /// Implements the lazy, at-most-once production protocol of §4.1: the
    /// `status` bit is the authoritative, lock-free-readable signal of
    /// whether a value exists; the mutex+condvar coordinate the (at most
    /// one) producer and any waiters. The published `Arc` is cloned out
    /// under the same short lock that guards the rest of `Inner`, so a
    /// contended read is still just a pointer copy, never a recomputation.
    fn get_or_produce<X: Send + Sync + 'static>(
        &self,
        d: Derivative,
        slot: impl Fn(&mut Inner<T>) -> &mut Option<Arc<X>>,
        produce: impl FnOnce(&T::Tree) -> X,
    ) -> Arc<X> {
        let mut guard = self.inner.lock().unwrap();
        loop {
            if let Some(v) = slot(&mut *guard) {
                return v.clone();
            }
            if self.status.try_claim(d) {
                let tree = guard.tree.clone();
                drop(guard);
                let value = Arc::new(produce(&tree));
                guard = self.inner.lock().unwrap();
                *slot(&mut *guard) = Some(value.clone());
                drop(guard);
                self.status.publish(d);
                self.condvar.notify_all();
                return value;
            }
            guard = self.condvar.wait(guard).unwrap();
        }
    }

    pub fn get_scope(&self, tools: &T) -> Arc<T::Scope> {
        self.get_or_produce(Derivative::Scope, |inner| &mut inner.scope, |tree| tools.build_scope(tree))
    }

    pub fn get_ir_source(&self, tools: &T) -> Arc<T::IrSource> {
        self.get_or_produce(
            Derivative::IrSource,
            |inner| &mut inner.ir_source,
            |tree| tools.build_ir_source(tree),
        )
    }

    pub fn get_ir_data(&self, tools: &T) -> Arc<T::IrData> {
        self.get_or_produce(
            Derivative::IrData,
            |inner| &mut inner.ir_data,
            |tree| tools.build_ir_data(tree),
        )
    }

    // --- associated build file (§4.2) ---

    /// Snapshot without triggering resolution; used by GC's dependency
    /// collection to avoid reentrant locking against the resolver.
    pub fn associated_build_file_snapshot(&self) -> Option<Uri> {
        self.inner.lock().unwrap().associated_build_file.resolved().cloned()
    }

    pub fn set_unresolved_candidates(&self, potential: Vec<Uri>) {
        let mut inner = self.inner.lock().unwrap();
        if matches!(inner.associated_build_file, AssociatedBuildFile::None) {
            let already_rejected = vec![false; potential.len()];
            inner.associated_build_file = AssociatedBuildFile::Unresolved { potential, already_rejected };
        }
    }

    /// Runs one pass of the resolution loop described in §4.2. `membership`
    /// answers "is this handle a dependency of build file `uri`?" with a
    /// tri-valued `Option<bool>` (`None` = unknown).
    ///
    /// `membership` is invoked without `inner` held: it is wired back to the
    /// store's dependency-membership query, which takes the store lock and
    /// other handles' mutexes. Holding this handle's mutex across that call
    /// would let a thread acquire the store lock while already holding a
    /// handle mutex, the reverse of §5's lock order, so the candidate list
    /// is snapshotted, queried unlocked, and the outcome committed in a
    /// second critical section — the same reason GC's dependency collection
    /// uses `associated_build_file_snapshot` instead of this method.
    pub fn resolve_associated_build_file(
        &self,
        membership: impl Fn(&Uri) -> Option<bool>,
    ) -> Option<Uri> {
        let candidates = {
            let mut inner = self.inner.lock().unwrap();
            let (potential, already_rejected) = match &mut inner.associated_build_file {
                AssociatedBuildFile::Resolved(uri) => return Some(uri.clone()),
                AssociatedBuildFile::None => return None,
                AssociatedBuildFile::Unresolved { potential, already_rejected } => {
                    (potential, already_rejected)
                }
            };

            if potential.len() == 1 {
                let uri = potential[0].clone();
                inner.associated_build_file = AssociatedBuildFile::Resolved(uri.clone());
                return Some(uri);
            }

            potential
                .iter()
                .cloned()
                .zip(already_rejected.iter().copied())
                .collect::<Vec<_>>()
        };

        let mut any_inconclusive = false;
        let mut resolved = None;
        let mut newly_rejected = vec![false; candidates.len()];
        for (i, (uri, already_rejected)) in candidates.iter().enumerate() {
            if *already_rejected {
                continue;
            }
            match membership(uri) {
                Some(true) => {
                    resolved = Some(uri.clone());
                    break;
                }
                Some(false) => newly_rejected[i] = true,
                None => any_inconclusive = true,
            }
        }

        let mut inner = self.inner.lock().unwrap();
        let (potential, already_rejected) = match &mut inner.associated_build_file {
            AssociatedBuildFile::Resolved(uri) => return Some(uri.clone()),
            AssociatedBuildFile::None => return None,
            AssociatedBuildFile::Unresolved { potential, already_rejected } => {
                (potential, already_rejected)
            }
        };
        debug_assert_eq!(potential.len(), already_rejected.len());

        for (bit, newly) in already_rejected.iter_mut().zip(newly_rejected.iter()) {
            *bit |= *newly;
        }

        if let Some(uri) = resolved {
            inner.associated_build_file = AssociatedBuildFile::Resolved(uri.clone());
            Some(uri)
        } else if !any_inconclusive && already_rejected.iter().all(|r| *r) {
            inner.associated_build_file = AssociatedBuildFile::None;
            None
        } else {
            None
        }
    }
}

