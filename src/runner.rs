//! Spawns the external build-description runner and turns its output into
//! a [`BuildConfig`] or an error, per §4.3 "Config production".

use crate::config::{BuildAssociatedConfig, BuildConfig, RawBuildConfig, StoreConfig};
use crate::error::{Result, StoreError};
use crate::uri::Uri;
use std::io::Read;
use std::path::Path;
use std::process::{Command, Stdio};

/// Reads at most `cap` bytes from `reader`, matching the spec's hard output
/// cap (16 MiB default) on captured stdout/stderr.
fn read_capped(mut reader: impl Read, cap: usize) -> Vec<u8> {
    let mut buf = Vec::with_capacity(cap.min(64 * 1024));
    let _ = reader.by_ref().take(cap as u64).read_to_end(&mut buf);
    buf
}

/// Runs `zig_exe_path build --build-runner <build_runner_path>` (plus any
/// `build_options` from the static companion config) in `build_file_dir`,
/// capturing stdout/stderr with the configured cap.
pub fn run_build(
    store_config: &StoreConfig,
    build_file_uri: &Uri,
    build_file_dir: &Path,
    build_associated: Option<&BuildAssociatedConfig>,
) -> Result<BuildConfig> {
    let zig_exe = store_config.zig_exe_path.as_ref().ok_or(StoreError::NoZigExe)?;
    let runner = store_config.build_runner_path.as_ref().ok_or(StoreError::NoBuildRunner)?;

    let mut cmd = Command::new(zig_exe);
    cmd.current_dir(build_file_dir)
        .arg("build")
        .arg("--build-runner")
        .arg(runner)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());

    if let Some(assoc) = build_associated {
        for opt in &assoc.build_options {
            cmd.arg(opt);
        }
    }

    tracing::debug!(?cmd, "running build description");
    let mut child = cmd.spawn()?;
    let mut stdout_pipe = child.stdout.take().expect("piped stdout");
    let mut stderr_pipe = child.stderr.take().expect("piped stderr");
    let cap = store_config.max_build_output_bytes;

    let stdout_handle = std::thread::spawn(move || read_capped(&mut stdout_pipe, cap));
    let stderr_handle = std::thread::spawn(move || read_capped(&mut stderr_pipe, cap));

    let status = child.wait()?;
    let stdout = stdout_handle.join().unwrap_or_default();
    let stderr = stderr_handle.join().unwrap_or_default();

    if !status.success() {
        tracing::warn!(%build_file_uri, %status, "build description exited non-zero");
        return Err(StoreError::RunFailed { build_file: build_file_uri.clone(), status, stderr });
    }

    let raw: RawBuildConfig = serde_json::from_slice(&stdout)
        .map_err(|source| StoreError::InvalidBuildConfig { build_file: build_file_uri.clone(), source })?;
    let _ = stderr; // non-empty stderr on success is not itself an error
    Ok(BuildConfig::from_raw(raw, build_file_dir))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_zig_exe_is_reported() {
        let cfg = StoreConfig::new();
        let uri = Uri::from_file_path("/p/build.zig").unwrap();
        let err = run_build(&cfg, &uri, Path::new("/p"), None).unwrap_err();
        assert!(matches!(err, StoreError::NoZigExe));
    }
}
