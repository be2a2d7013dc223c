//! The optional `#!key=value; key=value` first line of a script.

use thiserror::Error;
use tracing::{debug, warn};

use crate::requirements::Dependency;
use crate::value::{Value, ValueType};

pub const MARKER: &str = "#!";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DirectiveError {
    #[error("expected `key=value`, got `{0}`")]
    MissingValue(String),
    #[error("`{key}` expects {expected}, got `{value}`")]
    BadValue {
        key: String,
        expected: &'static str,
        value: String,
    },
}

/// Options declared by a script's directive line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectiveOptions {
    pub native: Vec<String>,
    pub libraries: Vec<String>,
    /// Empty means any platform.
    pub platforms: Vec<String>,
    pub precompile: bool,
}

impl Default for DirectiveOptions {
    fn default() -> Self {
        Self {
            native: Vec::new(),
            libraries: Vec::new(),
            platforms: Vec::new(),
            precompile: true,
        }
    }
}

impl DirectiveOptions {
    /// Every declared dependency, native ones first.
    pub fn dependencies(&self) -> Vec<Dependency> {
        self.native
            .iter()
            .map(|name| Dependency::native(name.as_str()))
            .chain(self.libraries.iter().map(|name| Dependency::library(name.as_str())))
            .collect()
    }
}

pub fn is_directive(line: &str) -> bool {
    line.starts_with(MARKER)
}

/// Parse a directive line. Unknown keys are ignored with a warning.
pub fn parse(line: &str) -> Result<DirectiveOptions, DirectiveError> {
    let body = line.strip_prefix(MARKER).unwrap_or(line).trim();
    let mut options = DirectiveOptions::default();

    for part in body.split(';').map(str::trim).filter(|p| !p.is_empty()) {
        let Some((key, value)) = part.split_once('=') else {
            return Err(DirectiveError::MissingValue(part.to_string()));
        };
        let (key, value) = (key.trim(), value.trim());
        match key {
            "require" => {
                for name in parse_list(value) {
                    match name.strip_prefix('!') {
                        Some(lib) => options.libraries.push(lib.to_string()),
                        None => options.native.push(name),
                    }
                }
            }
            "platform" => options.platforms = parse_list(value),
            "precompile" => {
                options.precompile = match ValueType::Bool.parse(value) {
                    Ok(Value::Bool(b)) => b,
                    _ => {
                        return Err(DirectiveError::BadValue {
                            key: key.to_string(),
                            expected: "a boolean",
                            value: value.to_string(),
                        });
                    }
                }
            }
            other => warn!(key = other, "ignoring unknown directive key"),
        }
    }
    debug!(?options, "parsed directive");
    Ok(options)
}

/// `["a", 'b']`, `[a, b]` or `a, b`.
fn parse_list(raw: &str) -> Vec<String> {
    let inner = raw
        .strip_prefix('[')
        .and_then(|r| r.strip_suffix(']'))
        .unwrap_or(raw);
    inner
        .split(',')
        .map(|item| item.trim().trim_matches(|c| c == '"' || c == '\''))
        .filter(|item| !item.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn full_directive() {
        let options =
            parse(r#"#!require=["git", "!utils"]; platform=["linux", "darwin"]; precompile=True"#)
                .unwrap();
        assert_eq!(options.native, ["git"]);
        assert_eq!(options.libraries, ["utils"]);
        assert_eq!(options.platforms, ["linux", "darwin"]);
        assert!(options.precompile);
    }

    #[test]
    fn bare_lists_and_lowercase_bool() {
        let options = parse("#! require=curl, jq; precompile=false").unwrap();
        assert_eq!(options.native, ["curl", "jq"]);
        assert!(!options.precompile);
    }

    #[test]
    fn unknown_keys_are_ignored() {
        assert_eq!(parse("#!color=blue").unwrap(), DirectiveOptions::default());
    }

    #[test]
    fn malformed_parts() {
        assert_eq!(
            parse("#!precompile"),
            Err(DirectiveError::MissingValue("precompile".into()))
        );
        assert!(matches!(
            parse("#!precompile=maybe"),
            Err(DirectiveError::BadValue { .. })
        ));
    }
}
