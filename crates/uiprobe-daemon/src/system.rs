// SPDX-License-Identifier: MIT OR Apache-2.0
//! Filesystem and subprocess operations exposed to controllers.
//!
//! All three operations are best-effort: any failure collapses into a
//! `false` status with empty placeholders, logged with context.  Paths are
//! exposed to the caller unmodified; no sandboxing is applied.

use std::path::Path;
use std::process::Stdio;
use tokio::process::Command;
use tracing::{error, info, warn};

/// Read a whole file.
///
/// Returns `(true, contents)` on success, `(false, "")` on any error,
/// including a missing file.
pub async fn get_file(path: &str) -> (bool, String) {
    if !Path::new(path).exists() {
        warn!(path, "attempt of getting a non-existent system file");
        return (false, String::new());
    }
    match tokio::fs::read_to_string(path).await {
        Ok(data) => (true, data),
        Err(err) => {
            error!(path, error = %err, "get system file failure");
            (false, String::new())
        }
    }
}

/// Write a whole file, creating intermediate directories as needed.
pub async fn put_file(path: &str, data: &str) -> bool {
    if let Some(parent) = Path::new(path).parent()
        && !parent.as_os_str().is_empty()
        && !parent.exists()
    {
        info!(path, "creating intermediate directories of file path");
        if let Err(err) = tokio::fs::create_dir_all(parent).await {
            error!(path, error = %err, "put system file failure");
            return false;
        }
    }
    match tokio::fs::write(path, data).await {
        Ok(()) => true,
        Err(err) => {
            error!(path, error = %err, "put system file failure");
            false
        }
    }
}

/// Run a command through the system shell.
///
/// With `wait`, captures both output streams and maps exit code zero to a
/// `true` status.  Without it, the command is left running and the status
/// only reflects whether it could be spawned.
pub async fn exec_command(command: &str, wait: bool) -> (bool, String, String) {
    if !wait {
        let spawned = Command::new("sh")
            .arg("-c")
            .arg(command)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn();
        return match spawned {
            Ok(_) => (true, String::new(), String::new()),
            Err(err) => {
                error!(command, error = %err, "execute system command failure");
                (false, String::new(), String::new())
            }
        };
    }
    match Command::new("sh")
        .arg("-c")
        .arg(command)
        .stdin(Stdio::null())
        .output()
        .await
    {
        Ok(output) => {
            let code = output.status.code().unwrap_or(-1);
            info!(command, code, "system command finished");
            (
                output.status.success(),
                String::from_utf8_lossy(&output.stdout).into_owned(),
                String::from_utf8_lossy(&output.stderr).into_owned(),
            )
        }
        Err(err) => {
            error!(command, error = %err, "execute system command failure");
            (false, String::new(), String::new())
        }
    }
}
