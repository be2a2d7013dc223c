//! Checking and installing what a script's directive line requires.

use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use tracing::{debug, info};

use crate::console::Console;
use crate::env::Environment;
use crate::external::{Shell, SystemShell, find_command_path};

/// Package managers tried, in order, to install missing native dependencies.
pub const PACKAGE_MANAGERS: [&str; 5] = ["apt", "apt-get", "pkg", "yum", "dnf"];

/// File extension of script libraries.
pub const LIBRARY_EXTENSION: &str = "zzz";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DependencyKind {
    /// An executable looked up on `PATH`.
    Native,
    /// A script library looked up in the library directories.
    Library,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dependency {
    pub name: String,
    pub kind: DependencyKind,
}

impl Dependency {
    pub fn native(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: DependencyKind::Native,
        }
    }

    pub fn library(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: DependencyKind::Library,
        }
    }
}

/// Decides whether dependencies are present and installs the missing ones.
pub trait RequirementChecker {
    fn is_present(&self, dependency: &Dependency) -> bool;

    fn install(&mut self, missing: &[Dependency]) -> Result<()>;

    /// Install whatever in `dependencies` is not present yet.
    fn require(&mut self, dependencies: &[Dependency]) -> Result<()> {
        let missing: Vec<Dependency> = dependencies
            .iter()
            .filter(|dep| !self.is_present(dep))
            .cloned()
            .collect();
        if missing.is_empty() {
            return Ok(());
        }
        self.install(&missing)
    }
}

/// Treats every dependency as present.
#[derive(Debug, Default, Clone, Copy)]
pub struct AssumePresent;

impl RequirementChecker for AssumePresent {
    fn is_present(&self, _: &Dependency) -> bool {
        true
    }

    fn install(&mut self, _: &[Dependency]) -> Result<()> {
        Ok(())
    }
}

/// Asks the user before anything gets installed.
pub trait Consent {
    fn confirm(&mut self, question: &str) -> bool;
}

/// Reads the answer from standard input; an empty answer means yes.
#[derive(Debug, Default, Clone, Copy)]
pub struct StdinConsent;

impl Consent for StdinConsent {
    fn confirm(&mut self, question: &str) -> bool {
        print!("{question} [Y/n]: ");
        let _ = io::stdout().flush();
        let mut answer = String::new();
        if io::stdin().lock().read_line(&mut answer).is_err() {
            return false;
        }
        matches!(answer.trim().to_ascii_lowercase().as_str(), "" | "y" | "yes")
    }
}

/// Looks native dependencies up on `PATH` and libraries in the library
/// directories; installs native ones with the first package manager found.
pub struct SystemChecker {
    lib_dirs: Vec<PathBuf>,
    env: Environment,
    platform: &'static str,
    shell: Box<dyn Shell>,
    console: Console,
    consent: Box<dyn Consent>,
}

impl SystemChecker {
    pub fn from_env(lib_dirs: Vec<PathBuf>) -> Self {
        Self {
            lib_dirs,
            env: Environment::new(),
            platform: current_platform(),
            shell: Box::new(SystemShell),
            console: Console::stdout(),
            consent: Box::new(StdinConsent),
        }
    }

    pub fn with_env(mut self, env: Environment) -> Self {
        self.env = env;
        self
    }

    pub fn with_shell(mut self, shell: Box<dyn Shell>) -> Self {
        self.shell = shell;
        self
    }

    pub fn with_console(mut self, console: Console) -> Self {
        self.console = console;
        self
    }

    pub fn with_consent(mut self, consent: Box<dyn Consent>) -> Self {
        self.consent = consent;
        self
    }

    pub fn with_platform(mut self, platform: &'static str) -> Self {
        self.platform = platform;
        self
    }

    fn find_executable(&self, name: &str) -> Option<PathBuf> {
        find_command_path(&self.env.search_path(), Path::new(name)).map(|p| p.into_owned())
    }
}

impl RequirementChecker for SystemChecker {
    fn is_present(&self, dependency: &Dependency) -> bool {
        let found = match dependency.kind {
            DependencyKind::Native => self.find_executable(&dependency.name),
            DependencyKind::Library => find_library(&self.lib_dirs, &dependency.name),
        };
        debug!(
            name = %dependency.name,
            kind = ?dependency.kind,
            found = ?found,
            "dependency lookup"
        );
        found.is_some()
    }

    fn install(&mut self, missing: &[Dependency]) -> Result<()> {
        let (native, libraries): (Vec<&Dependency>, Vec<&Dependency>) = missing
            .iter()
            .partition(|dep| dep.kind == DependencyKind::Native);

        if !libraries.is_empty() {
            let names: Vec<&str> = libraries.iter().map(|d| d.name.as_str()).collect();
            bail!(
                "missing script libraries: {} (looked in {} director{})",
                names.join(", "),
                self.lib_dirs.len(),
                if self.lib_dirs.len() == 1 { "y" } else { "ies" }
            );
        }
        if native.is_empty() {
            return Ok(());
        }

        let names: Vec<&str> = native.iter().map(|d| d.name.as_str()).collect();
        let packages = names.join(" ");
        self.console
            .print_panel("Script Required Packages", &packages)?;
        if !self.consent.confirm("Install?") {
            bail!("installation of required packages declined");
        }
        if self.platform != "linux" {
            bail!("automatic install is not supported on {}", self.platform);
        }

        let manager = PACKAGE_MANAGERS
            .iter()
            .find(|pm| self.find_executable(pm).is_some())
            .context("no supported package manager found")?;
        let command = format!("sudo {manager} install -y {packages}");
        info!(%command, "installing required packages");
        let code = self.shell.run(&command, &self.env)?;
        if code != 0 {
            bail!("`{command}` failed with exit code {code}");
        }
        Ok(())
    }
}

impl std::fmt::Debug for SystemChecker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SystemChecker")
            .field("lib_dirs", &self.lib_dirs)
            .field("platform", &self.platform)
            .finish_non_exhaustive()
    }
}

/// First `<name>.zzz` file found in `dirs`.
pub fn find_library(dirs: &[PathBuf], name: &str) -> Option<PathBuf> {
    dirs.iter()
        .map(|dir| dir.join(format!("{name}.{LIBRARY_EXTENSION}")))
        .find(|path| path.is_file())
}

/// The running platform as named in directive lines.
pub fn current_platform() -> &'static str {
    match std::env::consts::OS {
        "macos" => "darwin",
        other => other,
    }
}
