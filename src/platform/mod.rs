use std::ffi::OsString;
use std::io::Read;
use std::path::PathBuf;
use std::process::{Command, Stdio};
use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use wait_timeout::ChildExt;

#[derive(Debug, Clone)]
pub struct CommandOutput {
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
}

/// Runs `cmd` to completion. With `timeout` set, the child is killed once the
/// bound elapses; with `None` it may run indefinitely.
pub fn run_command(cmd: &str, args: &[OsString], timeout: Option<Duration>) -> Result<CommandOutput> {
    let mut command = Command::new(cmd);
    command
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());

    log::debug!("spawn: {cmd} ({} args)", args.len());
    let mut child = command
        .spawn()
        .with_context(|| format!("failed to start process: {cmd}"))?;

    // Drain pipes on separate threads so a chatty child cannot block on a full pipe.
    let stdout_reader = child.stdout.take().map(|mut out| {
        std::thread::spawn(move || {
            let mut buf = String::new();
            let _ = out.read_to_string(&mut buf);
            buf
        })
    });
    let stderr_reader = child.stderr.take().map(|mut err| {
        std::thread::spawn(move || {
            let mut buf = String::new();
            let _ = err.read_to_string(&mut buf);
            buf
        })
    });

    let status = match timeout {
        Some(timeout) => match child
            .wait_timeout(timeout)
            .with_context(|| format!("failed to wait for process: {cmd}"))?
        {
            Some(status) => status,
            None => {
                let _ = child.kill();
                let _ = child.wait();
                return Err(anyhow!("timed out after {timeout:?}: {cmd}"));
            }
        },
        None => child
            .wait()
            .with_context(|| format!("failed to wait for process: {cmd}"))?,
    };

    let stdout = stdout_reader
        .and_then(|h| h.join().ok())
        .unwrap_or_default();
    let stderr = stderr_reader
        .and_then(|h| h.join().ok())
        .unwrap_or_default();

    Ok(CommandOutput {
        exit_code: status.code().unwrap_or(-1),
        stdout,
        stderr,
    })
}

pub fn effective_home_dir() -> Result<PathBuf> {
    std::env::var_os("HOME")
        .or_else(|| std::env::var_os("USERPROFILE"))
        .map(PathBuf::from)
        .ok_or_else(|| anyhow!("HOME is not set"))
}

/// Entries of the process runtime classpath (`CLASSPATH`), split on the
/// platform path separator.
pub fn runtime_classpath() -> Vec<String> {
    let Some(raw) = std::env::var_os("CLASSPATH") else {
        return Vec::new();
    };
    split_classpath(&raw)
}

pub fn split_classpath(raw: &std::ffi::OsStr) -> Vec<String> {
    std::env::split_paths(raw)
        .map(|p| p.display().to_string())
        .filter(|s| !s.trim().is_empty())
        .collect()
}
