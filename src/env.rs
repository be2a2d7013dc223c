use std::collections::HashMap;
use std::env as stdenv;
use std::ffi::OsString;
use std::path::{Path, PathBuf};

/// Process context a script runs in.
///
/// `vars` overlay the inherited environment for lookups and for every child
/// the shell spawns; `current_dir` is where children run and where relative
/// script paths resolve.
#[derive(Debug, Clone, Default)]
pub struct Environment {
    pub vars: HashMap<String, String>,
    pub current_dir: PathBuf,
}

impl Environment {
    /// Snapshot of the current process.
    pub fn new() -> Self {
        let vars = stdenv::vars().collect();
        let current_dir = stdenv::current_dir().unwrap_or_else(|_| PathBuf::from("."));
        Self { vars, current_dir }
    }

    /// Empty overlay rooted at `dir`; lookups still fall through to the process.
    pub fn rooted(dir: impl Into<PathBuf>) -> Self {
        Self {
            vars: HashMap::new(),
            current_dir: dir.into(),
        }
    }

    pub fn with_var(mut self, key: impl Into<String>, val: impl Into<String>) -> Self {
        self.set_var(key, val);
        self
    }

    pub fn get_var(&self, key: &str) -> Option<String> {
        self.vars
            .get(key)
            .cloned()
            .or_else(|| stdenv::var(key).ok())
    }

    pub fn set_var(&mut self, key: impl Into<String>, val: impl Into<String>) {
        self.vars.insert(key.into(), val.into());
    }

    /// `PATH` as seen by spawned children, empty when unset.
    pub fn search_path(&self) -> OsString {
        self.get_var("PATH").map(OsString::from).unwrap_or_default()
    }

    /// `path` made absolute against `current_dir`.
    pub fn resolve(&self, path: impl AsRef<Path>) -> PathBuf {
        let path = path.as_ref();
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.current_dir.join(path)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::Environment;

    #[test]
    fn overlay_wins_over_process() {
        let env = Environment::rooted("/tmp").with_var("ZZZ_SOME_RANDOM_ENV_VAR_12345", "x");
        assert_eq!(env.get_var("ZZZ_SOME_RANDOM_ENV_VAR_12345").as_deref(), Some("x"));
        assert_eq!(Environment::rooted("/tmp").get_var("ZZZ_SOME_RANDOM_ENV_VAR_12345"), None);
    }

    #[test]
    fn reads_from_process_env() {
        let env = Environment::new();
        assert!(env.get_var("PATH").is_some());
        assert!(!env.search_path().is_empty());
    }

    #[test]
    fn relative_paths_resolve_against_current_dir() {
        let env = Environment::rooted("/work");
        assert_eq!(env.resolve("a/b.zzz"), std::path::Path::new("/work/a/b.zzz"));
        assert_eq!(env.resolve("/abs.zzz"), std::path::Path::new("/abs.zzz"));
    }
}
