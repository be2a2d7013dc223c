//! Desugaring of a single DSL line into host source.

use std::sync::LazyLock;

use regex::Regex;

use super::macros::MacroRegistry;

/// `<var> in <start>..<end>` with an optional trailing `:` already removed.
static RANGE_LOOP: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?P<var>[A-Za-z_]\w*)\s+in\s+(?P<start>.+?)\.\.(?P<end>.+)$")
        .expect("range loop pattern is valid")
});

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LineError {
    Syntax(&'static str),
    MacroNotFound(String),
}

fn escape(text: &str) -> String {
    text.replace('\\', "\\\\").replace('"', "\\\"")
}

/// `text` as an f-string literal. Unescaped `"` are escaped; existing
/// backslash escapes and `{expr}` interpolation are kept.
pub(crate) fn fstring(text: &str) -> String {
    let mut out = String::from("f\"");
    let mut escaped = false;
    for c in text.chars() {
        if c == '"' && !escaped {
            out.push('\\');
        }
        escaped = c == '\\' && !escaped;
        out.push(c);
    }
    if escaped {
        out.push('\\');
    }
    out.push('"');
    out
}

fn header(content: &str) -> &str {
    let content = content.trim();
    content.strip_suffix(':').map(str::trim_end).unwrap_or(content)
}

/// Transform one DSL line; the first matching rule wins and the input's
/// leading whitespace is copied onto the output.
pub fn transform(raw: &str, macros: &MacroRegistry) -> Result<String, LineError> {
    let stripped = raw.trim();
    let indent = &raw[..raw.len() - raw.trim_start().len()];

    if stripped.starts_with("//") {
        return Ok(raw.replacen("//", "#", 1));
    }

    let body = if let Some(rest) = stripped.strip_prefix("<<< ") {
        format!("print({})", rest.trim())
    } else if let Some(rest) = stripped.strip_prefix("<< ") {
        format!("print({})", fstring(rest.trim()))
    } else if let Some(rest) = stripped.strip_prefix("< ") {
        format!("print(\"{}\")", escape(rest.trim()))
    } else if let Some(rest) = stripped.strip_prefix(">> ") {
        let (target, value) = rest
            .trim()
            .split_once(char::is_whitespace)
            .ok_or(LineError::Syntax("invalid assignment, expected `>> name value`"))?;
        format!("{target} = {}", value.trim_start())
    } else if let Some(signature) = stripped.strip_prefix("fn ") {
        match signature.split_once("->") {
            Some((sig, expr)) => format!("def {}: return {}", sig.trim(), expr.trim()),
            None => format!("def {}", signature.trim()),
        }
    } else if let Some(rest) = stripped.strip_prefix("?! ") {
        format!("elif {}:", header(rest))
    } else if stripped.starts_with("?:") {
        "else:".to_string()
    } else if let Some(rest) = stripped.strip_prefix('?') {
        format!("if {}:", header(rest))
    } else if let Some(rest) = stripped.strip_prefix("for ") {
        let rest = rest.trim();
        if rest.contains("..") {
            let caps = RANGE_LOOP
                .captures(header(rest))
                .ok_or(LineError::Syntax("invalid range loop, expected `for i in a..b:`"))?;
            format!(
                "for {} in range({}, {} + 1):",
                &caps["var"],
                caps["start"].trim(),
                caps["end"].trim()
            )
        } else {
            format!("for {rest}")
        }
    } else if let Some(rest) = stripped.strip_prefix("loop:") {
        format!("while True:{rest}")
    } else if let Some(rest) = stripped.strip_prefix('$') {
        format!("sh({})", fstring(rest.trim()))
    } else if let Some(rest) = stripped.strip_prefix(':') {
        let tokens: Vec<&str> = rest.split_whitespace().collect();
        let (name, args) = tokens
            .split_first()
            .ok_or(LineError::Syntax("invalid macro, expected `:name args...`"))?;
        let handler = macros
            .get(name)
            .ok_or_else(|| LineError::MacroNotFound(name.to_string()))?;
        handler(raw, args)
    } else {
        return Ok(raw.to_string());
    };

    Ok(format!("{indent}{body}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn t(line: &str) -> String {
        transform(line, &MacroRegistry::default()).unwrap()
    }

    #[test]
    fn prints() {
        assert_eq!(t("< say \"hi\""), r#"print("say \"hi\"")"#);
        assert_eq!(t("<< hi {name}"), r#"print(f"hi {name}")"#);
        assert_eq!(t("  <<< a + b"), "  print(a + b)");
    }

    #[test]
    fn assignment() {
        assert_eq!(t(">> x 1+2"), "x = 1+2");
        assert_eq!(t("    >> total  a + b"), "    total = a + b");
        assert_eq!(
            transform(">> novalue", &MacroRegistry::default()),
            Err(LineError::Syntax("invalid assignment, expected `>> name value`"))
        );
    }

    #[test]
    fn functions() {
        assert_eq!(t("fn add(a, b) -> a + b"), "def add(a, b): return a + b");
        assert_eq!(t("fn greet(name):"), "def greet(name):");
    }

    #[test]
    fn conditionals() {
        assert_eq!(t("? a > b"), "if a > b:");
        assert_eq!(t("?! a < b"), "elif a < b:");
        assert_eq!(t("?:"), "else:");
        assert_eq!(t("  ? ok:"), "  if ok:");
    }

    #[test]
    fn loops() {
        assert_eq!(t("for i in 1..3:"), "for i in range(1, 3 + 1):");
        assert_eq!(t("for index in a..b"), "for index in range(a, b + 1):");
        assert_eq!(t("for x in items:"), "for x in items:");
        assert_eq!(t("loop:"), "while True:");
        assert!(transform("for 1..3:", &MacroRegistry::default()).is_err());
    }

    #[test]
    fn comments_shell_and_macros() {
        assert_eq!(t("  // note"), "  # note");
        assert_eq!(t("$ ls {dir}"), r#"sh(f"ls {dir}")"#);
        assert_eq!(t(":say hello {who}"), r#"print(f"hello {who}")"#);
        assert_eq!(
            t(r#"$ git commit -m "msg {n}""#),
            r#"sh(f"git commit -m \"msg {n}\"")"#
        );
        assert_eq!(t(r#"<< said \"hi\" {d["k"]}"#), r#"print(f"said \"hi\" {d[\"k\"]}")"#);
        assert_eq!(t(r#":say "quoted" \n"#), r#"print(f"\"quoted\" \n")"#);
        assert_eq!(t(r"$ echo trailing\"), r#"sh(f"echo trailing\\")"#);
        assert_eq!(
            transform(":shout x", &MacroRegistry::default()),
            Err(LineError::MacroNotFound("shout".into()))
        );
    }

    #[test]
    fn other_lines_pass_through() {
        assert_eq!(t("    x = compute(1)"), "    x = compute(1)");
        assert_eq!(t("return <x>"), "return <x>");
    }
}
