// SPDX-License-Identifier: MIT OR Apache-2.0
//! Start-up script execution.
//!
//! Before the listener binds, every regular file in the configured scripts
//! directory runs through a POSIX shell, in sorted order.  The first
//! non-zero exit halts daemon start-up.

use std::path::{Path, PathBuf};
use tracing::info;

/// Failures while running start-up scripts.
#[derive(Debug, thiserror::Error)]
pub enum StartupError {
    /// A script exited with a non-zero status.
    #[error("start-up script '{script}' returned non-zero exit status: {status}")]
    Script {
        /// Path of the offending script.
        script: String,
        /// Its exit status, `-1` when killed by a signal.
        status: i32,
    },

    /// Listing or spawning failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Run every regular file in `dir` in sorted order.
///
/// A missing directory counts as zero scripts.  Returns how many scripts
/// ran.
///
/// # Errors
///
/// [`StartupError::Script`] on the first non-zero exit status,
/// [`StartupError::Io`] when the directory cannot be listed or a script
/// cannot be spawned.
pub fn run_all_scripts(dir: &Path) -> Result<usize, StartupError> {
    if !dir.is_dir() {
        return Ok(0);
    }
    let mut scripts: Vec<PathBuf> = std::fs::read_dir(dir)?
        .filter_map(Result::ok)
        .map(|entry| entry.path())
        .filter(|path| path.is_file())
        .collect();
    scripts.sort();

    let mut count = 0;
    for script in scripts {
        info!(script = %script.display(), "running start-up script");
        let status = std::process::Command::new("/bin/sh").arg(&script).status()?;
        let code = status.code().unwrap_or(-1);
        if code != 0 {
            return Err(StartupError::Script {
                script: script.display().to_string(),
                status: code,
            });
        }
        count += 1;
    }
    Ok(count)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn missing_directory_runs_nothing() {
        assert_eq!(run_all_scripts(Path::new("/no/such/dir")).unwrap(), 0);
    }

    #[test]
    fn scripts_run_in_sorted_order() {
        let dir = tempfile::tempdir().unwrap();
        let marker = dir.path().join("marker");
        fs::write(
            dir.path().join("10-first.sh"),
            format!("printf 1 >> {}\n", marker.display()),
        )
        .unwrap();
        fs::write(
            dir.path().join("20-second.sh"),
            format!("printf 2 >> {}\n", marker.display()),
        )
        .unwrap();
        assert_eq!(run_all_scripts(dir.path()).unwrap(), 2);
        assert_eq!(fs::read_to_string(marker).unwrap(), "12");
    }

    #[test]
    fn first_failure_halts_with_the_script_name() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("00-ok.sh"), "exit 0\n").unwrap();
        fs::write(dir.path().join("10-bad.sh"), "exit 3\n").unwrap();
        fs::write(dir.path().join("20-late.sh"), "exit 0\n").unwrap();
        let err = run_all_scripts(dir.path()).unwrap_err();
        let StartupError::Script { script, status } = err else {
            panic!("expected a script failure");
        };
        assert!(script.ends_with("10-bad.sh"));
        assert_eq!(status, 3);
    }

    #[test]
    fn subdirectories_are_skipped() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir(dir.path().join("not-a-script")).unwrap();
        assert_eq!(run_all_scripts(dir.path()).unwrap(), 0);
    }
}
