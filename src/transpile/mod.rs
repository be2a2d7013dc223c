//! Desugaring of the terse script notation into host source.
//!
//! A script is processed line by line. An optional [directive](directive) on
//! the first line declares dependencies, allowed platforms and whether
//! desugaring runs at all. Every other line is either a mode switch
//! (`/-/<tag>`), which selects DSL or passthrough mode for the lines after it,
//! or content, which is rewritten by [`line::transform`] in DSL mode and copied
//! verbatim otherwise. One input line always yields exactly one output line,
//! so host-language errors keep pointing at the right line.

pub mod directive;
pub mod line;
pub mod macros;

use thiserror::Error;
use tracing::{debug, info};

pub use directive::{DirectiveError, DirectiveOptions};
pub use macros::{MacroFn, MacroRegistry};

use crate::requirements::{self, RequirementChecker, SystemChecker};
use line::LineError;

/// Prefix of a line that switches the language mode.
pub const MODE_SWITCH: &str = "/-/";

#[derive(Debug, Error)]
pub enum TranspileError {
    #[error("line {line}: {reason}: `{text}`")]
    Syntax {
        line: usize,
        text: String,
        reason: &'static str,
    },
    #[error("line {line}: macro not found: {name}")]
    MacroNotFound { line: usize, name: String },
    #[error("line 1: invalid directive: {0}")]
    Directive(#[from] DirectiveError),
    #[error("this script cannot run on {current} (allowed: {})", allowed.join(", "))]
    PlatformUnsupported {
        current: String,
        allowed: Vec<String>,
    },
    #[error("{0:#}")]
    Dependency(anyhow::Error),
}

/// Language mode of the lines being transpiled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mode {
    Dsl,
    /// Any other tag; lines are copied unchanged.
    Passthrough(String),
}

impl Mode {
    pub fn from_tag(tag: &str) -> Self {
        match tag {
            "dsl" | "zzz" => Mode::Dsl,
            other => Mode::Passthrough(other.to_string()),
        }
    }
}

/// Result of [`Transpiler::compile_script`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Compiled {
    pub source: String,
    pub options: DirectiveOptions,
    /// Number of input lines dropped from the front of `source`; add it to
    /// line numbers reported against `source`.
    pub line_offset: usize,
}

pub struct Transpiler {
    macros: MacroRegistry,
    checker: Box<dyn RequirementChecker>,
    platform: String,
}

impl Default for Transpiler {
    fn default() -> Self {
        Self::new(Box::new(SystemChecker::from_env(Vec::new())))
    }
}

impl Transpiler {
    pub fn new(checker: Box<dyn RequirementChecker>) -> Self {
        Self {
            macros: MacroRegistry::default(),
            checker,
            platform: requirements::current_platform().to_string(),
        }
    }

    /// Pretend to run on `platform` instead of the current one.
    pub fn with_platform(mut self, platform: impl Into<String>) -> Self {
        self.platform = platform.into();
        self
    }

    pub fn with_macros(mut self, macros: MacroRegistry) -> Self {
        self.macros = macros;
        self
    }

    pub fn macros_mut(&mut self) -> &mut MacroRegistry {
        &mut self.macros
    }

    /// Transpile a whole script and return the joined host source.
    pub fn compile<S: AsRef<str>>(&mut self, lines: &[S]) -> Result<String, TranspileError> {
        self.compile_script(lines).map(|compiled| compiled.source)
    }

    /// Like [`compile`](Self::compile), also returning the directive options.
    pub fn compile_script<S: AsRef<str>>(
        &mut self,
        lines: &[S],
    ) -> Result<Compiled, TranspileError> {
        let Some(first) = lines.first().map(AsRef::as_ref) else {
            return Ok(Compiled {
                source: String::new(),
                options: DirectiveOptions::default(),
                line_offset: 0,
            });
        };

        if !directive::is_directive(first) {
            return Ok(Compiled {
                source: self.transpile_lines(lines, 0)?,
                options: DirectiveOptions::default(),
                line_offset: 0,
            });
        }

        let options = directive::parse(first)?;
        let rest = &lines[1..];
        if !options.precompile {
            debug!("precompile disabled, passing source through");
            let source = rest.iter().map(AsRef::as_ref).collect::<Vec<_>>().join("\n");
            return Ok(Compiled {
                source,
                options,
                line_offset: 1,
            });
        }

        self.check_platform(&options.platforms)?;
        let dependencies = options.dependencies();
        if !dependencies.is_empty() {
            info!(count = dependencies.len(), "checking script requirements");
            self.checker
                .require(&dependencies)
                .map_err(TranspileError::Dependency)?;
        }

        Ok(Compiled {
            source: self.transpile_lines(rest, 1)?,
            options,
            line_offset: 1,
        })
    }

    fn check_platform(&self, allowed: &[String]) -> Result<(), TranspileError> {
        if allowed.is_empty() || allowed.iter().any(|p| *p == self.platform) {
            return Ok(());
        }
        Err(TranspileError::PlatformUnsupported {
            current: self.platform.clone(),
            allowed: allowed.to_vec(),
        })
    }

    fn transpile_lines<S: AsRef<str>>(
        &self,
        lines: &[S],
        offset: usize,
    ) -> Result<String, TranspileError> {
        let mut mode = Mode::Dsl;
        let mut out = Vec::with_capacity(lines.len());
        for (index, raw) in lines.iter().enumerate() {
            let raw = raw.as_ref().trim_end_matches(['\n', '\r']);
            let number = index + 1 + offset;

            if let Some(tag) = raw.strip_prefix(MODE_SWITCH) {
                let tag = tag.trim();
                debug!(line = number, tag, "switching language mode");
                mode = Mode::from_tag(tag);
                out.push(format!("# LANG START [{tag}]"));
                continue;
            }
            if raw.trim().is_empty() {
                out.push(String::new());
                continue;
            }
            let compiled = match mode {
                Mode::Passthrough(_) => raw.to_string(),
                Mode::Dsl => line::transform(raw, &self.macros).map_err(|err| match err {
                    LineError::Syntax(reason) => TranspileError::Syntax {
                        line: number,
                        text: raw.to_string(),
                        reason,
                    },
                    LineError::MacroNotFound(name) => {
                        TranspileError::MacroNotFound { line: number, name }
                    }
                })?,
            };
            out.push(compiled);
        }
        Ok(out.join("\n"))
    }
}

impl std::fmt::Debug for Transpiler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Transpiler")
            .field("macros", &self.macros)
            .field("platform", &self.platform)
            .finish_non_exhaustive()
    }
}
