//! Interfaces to the external collaborators named in §6: the parser, scope
//! builder, IR generators, import/cimport collectors, C translator,
//! diagnostics sink and progress transport. The store only ever calls
//! through these traits; it never knows how a tree is parsed or an IR is
//! shaped.

use crate::config::BuildConfig;
use crate::uri::Uri;
use std::path::Path;

/// Which grammar a document's text should be parsed with, chosen by the
/// caller from the document's URI extension (§6).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ParseMode {
    Source,
    DataLiteral,
}

impl ParseMode {
    pub fn for_uri(uri: &Uri) -> Self {
        if uri.is_source_extension() { ParseMode::Source } else { ParseMode::DataLiteral }
    }
}

/// A bundle of diagnostic messages, the common currency between the C
/// translator, build-file runner, and diagnostics sink. The format of an
/// individual message is owned by the collaborators that produce and
/// consume it; the store treats it as opaque payload.
#[derive(Clone, Debug, Default)]
pub struct ErrorBundle {
    pub messages: Vec<String>,
}

impl ErrorBundle {
    pub fn from_stderr(stderr: &[u8]) -> Self {
        let text = String::from_utf8_lossy(stderr);
        Self { messages: text.lines().map(str::to_owned).collect() }
    }
}

/// The pure, total functions that derive artifacts from a parsed tree.
///
/// Implementations are expected to be cheap to share (`Arc<dyn LanguageTools>`
/// typically) since every [`crate::store::Store`] holds exactly one.
pub trait LanguageTools: Send + Sync {
    type Tree: Send + Sync + 'static;
    type Scope: Send + Sync + 'static;
    type IrSource: Send + Sync + 'static;
    type IrData: Send + Sync + 'static;
    type CImportNode: Send + Sync + Clone + 'static;

    fn parse(&self, text: &[u8], mode: ParseMode) -> Self::Tree;
    fn build_scope(&self, tree: &Self::Tree) -> Self::Scope;
    fn build_ir_source(&self, tree: &Self::Tree) -> Self::IrSource;
    fn build_ir_data(&self, tree: &Self::Tree) -> Self::IrData;

    /// Ordered list of textual import arguments to `@import(...)`.
    fn collect_imports(&self, tree: &Self::Tree) -> Vec<String>;
    /// Every `@cImport(...)` node in the tree, in source order.
    fn collect_cimports(&self, tree: &Self::Tree) -> Vec<Self::CImportNode>;
    /// Renders a `@cImport` node's body into the C source text to translate.
    fn cimport_source_text(&self, node: &Self::CImportNode) -> Vec<u8>;
}

/// Outcome of invoking the C translator on one `@cImport`'s generated
/// source, mirroring §6's `success(uri) | failure(error_bundle) | null`.
pub enum TranslateOutcome {
    Success(Uri),
    Failure(ErrorBundle),
    /// The translator declined (e.g. unsupported target); not cached,
    /// retried on every call.
    Null,
}

pub struct TranslateRequest<'a> {
    pub config: Option<&'a BuildConfig>,
    pub include_dirs: &'a [std::path::PathBuf],
    pub c_macros: &'a [String],
    pub c_source: &'a [u8],
}

pub trait CTranslator: Send + Sync {
    fn translate(&self, request: TranslateRequest<'_>) -> TranslateOutcome;
}

#[derive(Clone, Copy, Debug)]
pub enum DiagnosticKind {
    CImport,
    Build,
}

/// Sink for diagnostics produced outside the normal per-edit analysis path:
/// build failures and cimport translation failures.
pub trait Diagnostics: Send + Sync {
    fn push_error_bundle(&self, tag: &str, version: u64, cwd: &Path, bundle: &ErrorBundle);
    fn push_single_document(&self, kind: DiagnosticKind, uri: &Uri, bundle: &ErrorBundle);
    fn publish(&self);
}

/// Outcome of one build-file run, reported once per coalesced group (§4.3).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BuildOutcome {
    Success,
    Failed,
}

/// Transport for `$/progress`-shaped notifications, gated by client
/// capability flags carried in [`crate::config::StoreConfig`].
pub trait ProgressSink: Send + Sync {
    fn write_json_message(&self, message: serde_json::Value);
}

/// A [`ProgressSink`] and [`Diagnostics`] that discard everything; useful as
/// a default for embedders that don't care about progress/diagnostics, and
/// in tests that only assert on store-internal state.
pub struct NullSink;

impl ProgressSink for NullSink {
    fn write_json_message(&self, _message: serde_json::Value) {}
}

impl Diagnostics for NullSink {
    fn push_error_bundle(&self, _tag: &str, _version: u64, _cwd: &Path, _bundle: &ErrorBundle) {}
    fn push_single_document(&self, _kind: DiagnosticKind, _uri: &Uri, _bundle: &ErrorBundle) {}
    fn publish(&self) {}
}
