//! Per-build-description state and the external-run coalescing state
//! machine (§3 `BuildFile`, §4.3).

use crate::config::{BuildAssociatedConfig, BuildConfig};
use crate::uri::Uri;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

/// `{idle, running, running_but_invalidated}` from §4.3.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum RunState {
    Idle,
    Running,
    RunningButInvalidated,
}

struct Inner {
    config: Option<BuildConfig>,
    state: RunState,
}

pub struct BuildFile {
    pub uri: Uri,
    /// Override for the language-builtin module, set once from the static
    /// companion config if present.
    pub builtin_uri: Option<Uri>,
    pub build_associated_config: Option<BuildAssociatedConfig>,
    version: AtomicU64,
    inner: Mutex<Inner>,
}

/// What the caller of [`BuildFile::invalidate`] should do, decided under the
/// build-file mutex so at most one run is ever in flight (§4.3 table).
pub enum InvalidateAction {
    /// No run currently in flight; the caller should run it now (on a
    /// worker thread if a pool is available, synchronously otherwise).
    StartRun,
    /// A run is already in flight; it has been flagged to re-run on
    /// completion. The caller does nothing further.
    Coalesced,
}

/// What the caller of [`BuildFile::run_completed`] should do next.
pub enum CompletionAction {
    /// No further invalidation arrived while this run was in flight.
    Idle,
    /// At least one invalidation arrived during the run; start another one
    /// with the (discarded) result of this one.
    RunAgain,
}

impl BuildFile {
    pub fn new(uri: Uri, builtin_uri: Option<Uri>, build_associated_config: Option<BuildAssociatedConfig>) -> Self {
        Self {
            uri,
            builtin_uri,
            build_associated_config,
            version: AtomicU64::new(0),
            inner: Mutex::new(Inner { config: None, state: RunState::Idle }),
        }
    }

    pub fn version(&self) -> u64 {
        self.version.load(Ordering::Acquire)
    }

    /// Reads the current config under the mutex. Returns `None` if no run
    /// has ever succeeded.
    pub fn config(&self) -> Option<BuildConfig> {
        self.inner.lock().unwrap().config.clone()
    }

    /// §4.3's transition table, collapsed into a two-outcome decision for
    /// the caller.
    pub fn invalidate(&self) -> InvalidateAction {
        let mut inner = self.inner.lock().unwrap();
        match inner.state {
            RunState::Idle => {
                inner.state = RunState::Running;
                InvalidateAction::StartRun
            }
            RunState::Running => {
                inner.state = RunState::RunningButInvalidated;
                InvalidateAction::Coalesced
            }
            RunState::RunningButInvalidated => InvalidateAction::Coalesced,
        }
    }

    /// Called by the runner when an external run finishes. On success,
    /// publishes `new_config` (replacing the old one atomically under the
    /// mutex) and bumps `version`; on failure, the previous config is kept
    /// live (§7 "Build failures keep the previous config live").
    pub fn run_completed(&self, new_config: Option<BuildConfig>) -> CompletionAction {
        let mut inner = self.inner.lock().unwrap();
        let published = new_config.is_some();
        if let Some(cfg) = new_config {
            inner.config = Some(cfg);
        }
        let action = match inner.state {
            RunState::Running => {
                inner.state = RunState::Idle;
                CompletionAction::Idle
            }
            RunState::RunningButInvalidated => {
                inner.state = RunState::Running;
                CompletionAction::RunAgain
            }
            RunState::Idle => unreachable!("run_completed without a matching invalidate"),
        };
        drop(inner);
        if published {
            self.version.fetch_add(1, Ordering::AcqRel);
        }
        action
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn uri() -> Uri {
        Uri::from_file_path("/p/build.zig").unwrap()
    }

    #[test]
    fn single_invalidate_runs_once_and_idles() {
        let bf = BuildFile::new(uri(), None, None);
        assert!(matches!(bf.invalidate(), InvalidateAction::StartRun));
        assert!(matches!(bf.run_completed(Some(BuildConfig::default())), CompletionAction::Idle));
        assert_eq!(bf.version(), 1);
    }

    #[test]
    fn invalidations_during_run_coalesce_into_one_more_run() {
        let bf = BuildFile::new(uri(), None, None);
        assert!(matches!(bf.invalidate(), InvalidateAction::StartRun));
        assert!(matches!(bf.invalidate(), InvalidateAction::Coalesced));
        assert!(matches!(bf.invalidate(), InvalidateAction::Coalesced));
        // first run completes: exactly one more run is scheduled
        assert!(matches!(bf.run_completed(Some(BuildConfig::default())), CompletionAction::RunAgain));
        assert!(matches!(bf.run_completed(Some(BuildConfig::default())), CompletionAction::Idle));
        assert_eq!(bf.version(), 2);
    }

    #[test]
    fn failed_run_keeps_previous_config_live() {
        let bf = BuildFile::new(uri(), None, None);
        bf.invalidate();
        bf.run_completed(Some(BuildConfig::default()));
        assert!(bf.config().is_some());
        let version_before = bf.version();

        bf.invalidate();
        bf.run_completed(None);
        assert!(bf.config().is_some());
        assert_eq!(bf.version(), version_before);
    }
}
