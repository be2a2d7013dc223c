//! Shell execution and interrupt handling.

use std::borrow::Cow;
use std::ffi::OsStr;
use std::io::IsTerminal;
use std::path::{Path, PathBuf};
use std::process::{Command, ExitStatus, Stdio};
use std::sync::atomic::{AtomicBool, Ordering};

use anyhow::{Context, Result};
use tracing::debug;

use crate::ExitCode;
use crate::env::Environment;

/// Exit code and captured standard output of a finished command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShellOutput {
    pub code: ExitCode,
    pub stdout: String,
}

/// Runs command lines synchronously on behalf of scripts.
pub trait Shell {
    /// Run with inherited stdio; returns the exit code.
    fn run(&mut self, command: &str, env: &Environment) -> Result<ExitCode>;

    /// Run with stdout piped back to the caller.
    fn capture(&mut self, command: &str, env: &Environment) -> Result<ShellOutput>;
}

/// [`Shell`] backed by the platform command interpreter.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemShell;

impl SystemShell {
    fn command(line: &str, env: &Environment) -> Command {
        let mut cmd = if cfg!(windows) {
            let mut cmd = Command::new("cmd");
            cmd.args(["/C", line]);
            cmd
        } else {
            let mut cmd = Command::new("sh");
            cmd.args(["-c", line]);
            cmd
        };
        cmd.envs(env.vars.iter().map(|(k, v)| (k.as_str(), v.as_str())))
            .current_dir(&env.current_dir);
        cmd
    }
}

impl Shell for SystemShell {
    fn run(&mut self, command: &str, env: &Environment) -> Result<ExitCode> {
        debug!(command, "running shell command");
        let status = Self::command(command, env)
            .stdin(Stdio::inherit())
            .stdout(Stdio::inherit())
            .status()
            .with_context(|| format!("failed to run `{command}`"))?;
        Ok(exit_code(status))
    }

    fn capture(&mut self, command: &str, env: &Environment) -> Result<ShellOutput> {
        debug!(command, "capturing shell command");
        let output = Self::command(command, env)
            .stdin(Stdio::inherit())
            .stdout(Stdio::piped())
            .output()
            .with_context(|| format!("failed to run `{command}`"))?;
        Ok(ShellOutput {
            code: exit_code(output.status),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
        })
    }
}

fn exit_code(status: ExitStatus) -> ExitCode {
    status.code().unwrap_or_else(|| terminated_by_signal(status))
}

#[cfg(unix)]
fn terminated_by_signal(exit_status: ExitStatus) -> i32 {
    use std::os::unix::process::ExitStatusExt;
    if let Some(signal) = ExitStatusExt::signal(&exit_status) {
        128 + signal
    } else if ExitStatusExt::core_dumped(&exit_status) {
        255
    } else {
        -1
    }
}

#[cfg(not(unix))]
fn terminated_by_signal(_exit_status: ExitStatus) -> i32 {
    -1
}

/// Resolve a command path the way a typical shell would.
///
/// Absolute paths and multi-component relative paths are checked as they
/// are; a single component is searched for in each directory of
/// `search_paths` (a `PATH`-style list). An empty path is never found.
pub fn find_command_path<'a>(search_paths: &OsStr, path: &'a Path) -> Option<Cow<'a, Path>> {
    if path.is_absolute() {
        return find_by_path(path).map(Cow::Borrowed);
    }

    let search_in_current_dir = cfg!(not(unix)) || path.starts_with("./");
    if search_in_current_dir && path.exists() {
        return Some(Cow::Borrowed(path));
    }

    let mut components = path.components();
    match (components.next(), components.next()) {
        (None, None) => None,
        (Some(x), None) => find_in_path(search_paths, x.as_os_str()).map(Cow::Owned),
        _ => find_by_path(path).map(Cow::Borrowed),
    }
}

fn find_in_path(search_paths: &OsStr, cmd: &OsStr) -> Option<PathBuf> {
    std::env::split_paths(search_paths)
        .map(|dir| dir.join(cmd))
        .find(|path| path.exists())
}

fn find_by_path(path: &Path) -> Option<&Path> {
    if path.exists() { Some(path) } else { None }
}

static INTERRUPTED: AtomicBool = AtomicBool::new(false);

/// Record a pending interrupt (what the SIGINT handler does).
pub fn raise_interrupt() {
    INTERRUPTED.store(true, Ordering::SeqCst);
}

/// Consume a pending interrupt, if any.
pub fn take_interrupt() -> bool {
    INTERRUPTED.swap(false, Ordering::SeqCst)
}

/// Turn Ctrl-C into a pending-interrupt flag instead of killing the process.
///
/// Running scripts poll the flag between statements, so Ctrl-C aborts the
/// current command and the interactive loop redisplays its prompt. A child
/// started by [`SystemShell`] still receives the signal itself.
pub fn install_interrupt_handler() -> Result<()> {
    ctrlc::set_handler(raise_interrupt).context("failed to install the Ctrl-C handler")
}

/// Whether standard output is attached to a terminal.
pub fn stdout_is_tty() -> bool {
    std::io::stdout().is_terminal()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    #[cfg(unix)]
    fn absolute_existing() {
        let path = Path::new("/bin/sh");
        let found = find_command_path(OsStr::new("/bin"), path).unwrap();
        assert_eq!(found.as_ref(), path);
    }

    #[test]
    #[cfg(unix)]
    fn single_component_found_in_path() {
        let found = find_command_path(OsStr::new("/nonexistent:/bin"), Path::new("sh"))
            .expect("sh should be found in /bin");
        assert!(found.as_ref().starts_with("/bin"));
    }

    #[test]
    #[cfg(unix)]
    fn single_component_not_found() {
        assert!(find_command_path(OsStr::new("/bin"), Path::new("zzz-nonexisting")).is_none());
    }

    #[test]
    fn empty_path_is_none() {
        assert!(find_command_path(OsStr::new("/bin"), Path::new("")).is_none());
    }

    #[test]
    #[cfg(unix)]
    fn relative_with_components() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("bin")).unwrap();
        std::fs::File::create(dir.path().join("bin").join("tool")).unwrap();
        let path = dir.path().join("bin/tool");
        assert!(find_command_path(OsStr::new(""), &path).is_some());
    }

    #[test]
    #[cfg(unix)]
    fn run_reports_exit_code() {
        let env = Environment::new();
        let code = SystemShell.run("exit 3", &env).unwrap();
        assert_eq!(code, 3);
    }

    #[test]
    #[cfg(unix)]
    fn capture_collects_stdout() {
        let mut env = Environment::new();
        env.set_var("ZZZ_GREETING", "hi");
        let out = SystemShell.capture("echo $ZZZ_GREETING", &env).unwrap();
        assert_eq!(out, ShellOutput { code: 0, stdout: "hi\n".into() });
    }

    #[test]
    #[cfg(unix)]
    fn signal_exit_is_offset() {
        let env = Environment::new();
        let code = SystemShell.run("kill -TERM $$", &env).unwrap();
        assert_eq!(code, 128 + 15);
    }

    #[test]
    fn interrupt_flag_is_consumed() {
        raise_interrupt();
        assert!(take_interrupt());
        assert!(!take_interrupt());
    }
}
