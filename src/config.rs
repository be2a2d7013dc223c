//! On-disk configuration and the startup context passed to every component.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;
use tracing::debug;

use crate::env::Environment;
use crate::requirements::LIBRARY_EXTENSION;

/// Environment variable overriding the `~/.zzz` home directory.
pub const HOME_VAR: &str = "ZZZ_HOME";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Read { path: PathBuf, source: io::Error },
    #[error("invalid config {path}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error("failed to create {path}: {source}")]
    CreateDir { path: PathBuf, source: io::Error },
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct CliConfig {
    /// Print the banner and script header before running.
    pub intro: bool,
    /// Clear the screen before running.
    pub clear: bool,
}

impl Default for CliConfig {
    fn default() -> Self {
        Self {
            intro: true,
            clear: false,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Config {
    pub cli: CliConfig,
    /// Replaces the prompt of every script that keeps the default one.
    pub prompt: Option<String>,
    pub lib_dirs: Vec<PathBuf>,
}

impl Config {
    /// Load `path`; a missing file yields the defaults.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = match fs::read_to_string(path) {
            Ok(text) => text,
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "no config file, using defaults");
                return Ok(Self::default());
            }
            Err(source) => {
                return Err(ConfigError::Read {
                    path: path.to_path_buf(),
                    source,
                });
            }
        };
        let config = serde_json::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        debug!(path = %path.display(), ?config, "loaded config");
        Ok(config)
    }
}

/// Directory layout under the zzz home.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Paths {
    base: PathBuf,
}

impl Paths {
    pub fn from_base(base: impl Into<PathBuf>) -> Self {
        Self { base: base.into() }
    }

    pub fn base_dir(&self) -> &Path {
        &self.base
    }

    pub fn scripts_dir(&self) -> PathBuf {
        self.base.join("scripts")
    }

    pub fn data_dir(&self) -> PathBuf {
        self.base.join("data")
    }

    pub fn lib_dir(&self) -> PathBuf {
        self.base.join("lib")
    }

    pub fn config_file(&self) -> PathBuf {
        self.base.join("config.json")
    }

    fn ensure(&self) -> Result<(), ConfigError> {
        for dir in [self.scripts_dir(), self.data_dir(), self.lib_dir()] {
            fs::create_dir_all(&dir)
                .map_err(|source| ConfigError::CreateDir { path: dir, source })?;
        }
        Ok(())
    }
}

pub fn default_paths(env: &Environment) -> Paths {
    let base = env.get_var(HOME_VAR).map(PathBuf::from).unwrap_or_else(|| {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".zzz")
    });
    Paths::from_base(base)
}

/// Everything resolved once at startup.
#[derive(Debug, Clone)]
pub struct Context {
    pub paths: Paths,
    pub config: Config,
    pub env: Environment,
}

impl Context {
    /// Create the home layout if needed and load its config file.
    pub fn load(paths: Paths, env: Environment) -> Result<Self, ConfigError> {
        paths.ensure()?;
        let config = Config::load(&paths.config_file())?;
        Ok(Self { paths, config, env })
    }

    pub fn from_env() -> Result<Self, ConfigError> {
        let env = Environment::new();
        Self::load(default_paths(&env), env)
    }

    /// `@name` names a script in the scripts directory; anything else is a
    /// path relative to the working directory.
    pub fn resolve_script(&self, path: &str) -> PathBuf {
        match path.strip_prefix('@') {
            Some(name) => self
                .paths
                .scripts_dir()
                .join(format!("{name}.{LIBRARY_EXTENSION}")),
            None => self.env.resolve(path),
        }
    }

    /// The home `lib/` directory followed by the configured extra ones.
    pub fn library_dirs(&self) -> Vec<PathBuf> {
        std::iter::once(self.paths.lib_dir())
            .chain(self.config.lib_dirs.iter().cloned())
            .collect()
    }
}
