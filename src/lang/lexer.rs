//! Tokenizer for one logical line of host source.

use thiserror::Error;

/// Reserved words of the host language.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Keyword {
    Def,
    Return,
    If,
    Elif,
    Else,
    For,
    In,
    While,
    Break,
    Continue,
    Pass,
    And,
    Or,
    Not,
    True,
    False,
    None,
}

impl Keyword {
    fn lookup(word: &str) -> Option<Self> {
        Some(match word {
            "def" => Keyword::Def,
            "return" => Keyword::Return,
            "if" => Keyword::If,
            "elif" => Keyword::Elif,
            "else" => Keyword::Else,
            "for" => Keyword::For,
            "in" => Keyword::In,
            "while" => Keyword::While,
            "break" => Keyword::Break,
            "continue" => Keyword::Continue,
            "pass" => Keyword::Pass,
            "and" => Keyword::And,
            "or" => Keyword::Or,
            "not" => Keyword::Not,
            "True" => Keyword::True,
            "False" => Keyword::False,
            "None" => Keyword::None,
            _ => return None,
        })
    }
}

/// A piece of an interpolated string literal.
#[derive(Debug, Clone, PartialEq)]
pub enum FPart {
    Lit(String),
    /// Source text of an embedded `{expr}`.
    Expr(String),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    Name(String),
    Int(i64),
    Float(f64),
    Str(String),
    FStr(Vec<FPart>),
    Kw(Keyword),
    /// Operator or punctuation, e.g. `+`, `//`, `->`, `(`.
    Op(&'static str),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LexError {
    #[error("unterminated string literal")]
    UnterminatedString,
    #[error("unexpected character {ch:?} at column {column}")]
    UnexpectedChar { ch: char, column: usize },
    #[error("unbalanced braces in f-string")]
    BadFString,
    #[error("invalid number literal {0:?}")]
    BadNumber(String),
}

// Longest first so that `**` wins over `*`.
const OPERATORS: &[&str] = &[
    "**", "//", "==", "!=", "<=", ">=", "+=", "-=", "->", "+", "-", "*", "/", "%", "<", ">", "=",
    "(", ")", "[", "]", "{", "}", ",", ":", ".",
];

struct LineLexer {
    input: Vec<char>,
    pos: usize,
}

impl LineLexer {
    fn new(line: &str) -> Self {
        Self {
            input: line.chars().collect(),
            pos: 0,
        }
    }

    fn read_char(&mut self) -> Option<char> {
        let ch = self.input.get(self.pos).copied();
        if ch.is_some() {
            self.pos += 1;
        }
        ch
    }

    fn peek_char(&self) -> Option<char> {
        self.input.get(self.pos).copied()
    }

    fn peek_nth(&self, n: usize) -> Option<char> {
        self.input.get(self.pos + n).copied()
    }

    fn make_tokens(mut self) -> Result<Vec<Token>, LexError> {
        let mut out = Vec::new();
        while let Some(ch) = self.peek_char() {
            match ch {
                ' ' | '\t' | '\r' => {
                    self.pos += 1;
                }
                '#' => break,
                '0'..='9' => out.push(self.handle_number()?),
                '.' if self.peek_nth(1).is_some_and(|c| c.is_ascii_digit()) => {
                    out.push(self.handle_number()?)
                }
                '"' | '\'' => {
                    self.pos += 1;
                    out.push(Token::Str(self.handle_string(ch)?));
                }
                'f' if matches!(self.peek_nth(1), Some('"' | '\'')) => {
                    let quote = self.peek_nth(1).unwrap_or('"');
                    self.pos += 2;
                    let raw = self.handle_string(quote)?;
                    out.push(Token::FStr(split_fstring(&raw)?));
                }
                c if c.is_alphabetic() || c == '_' => out.push(self.handle_word()),
                _ => out.push(self.handle_operator(ch)?),
            }
        }
        Ok(out)
    }

    fn handle_number(&mut self) -> Result<Token, LexError> {
        let start = self.pos;
        let mut is_float = false;
        while let Some(c) = self.peek_char() {
            match c {
                '0'..='9' | '_' => {}
                '.' if !is_float && self.peek_nth(1).is_none_or(|n| n != '.') => is_float = true,
                'e' | 'E' if matches!(self.peek_nth(1), Some('0'..='9' | '-' | '+')) => {
                    is_float = true;
                    self.pos += 1;
                }
                _ => break,
            }
            self.pos += 1;
        }
        let text: String = self.input[start..self.pos]
            .iter()
            .filter(|c| **c != '_')
            .collect();
        let bad = || LexError::BadNumber(text.clone());
        if is_float {
            text.parse().map(Token::Float).map_err(|_| bad())
        } else {
            text.parse().map(Token::Int).map_err(|_| bad())
        }
    }

    fn handle_word(&mut self) -> Token {
        let start = self.pos;
        while self
            .peek_char()
            .is_some_and(|c| c.is_alphanumeric() || c == '_')
        {
            self.pos += 1;
        }
        let word: String = self.input[start..self.pos].iter().collect();
        match Keyword::lookup(&word) {
            Some(kw) => Token::Kw(kw),
            None => Token::Name(word),
        }
    }

    /// Reads up to the closing `quote`; the opening quote is already consumed.
    fn handle_string(&mut self, quote: char) -> Result<String, LexError> {
        let mut buf = String::new();
        loop {
            match self.read_char() {
                None => return Err(LexError::UnterminatedString),
                Some(c) if c == quote => return Ok(buf),
                Some('\\') => match self.read_char() {
                    Some('n') => buf.push('\n'),
                    Some('t') => buf.push('\t'),
                    Some('r') => buf.push('\r'),
                    Some('0') => buf.push('\0'),
                    Some(c @ ('\\' | '"' | '\'')) => buf.push(c),
                    Some(c) => {
                        buf.push('\\');
                        buf.push(c);
                    }
                    None => return Err(LexError::UnterminatedString),
                },
                Some(c) => buf.push(c),
            }
        }
    }

    fn handle_operator(&mut self, ch: char) -> Result<Token, LexError> {
        let rest: String = self.input[self.pos..].iter().take(2).collect();
        for op in OPERATORS {
            if rest.starts_with(op) {
                self.pos += op.chars().count();
                return Ok(Token::Op(*op));
            }
        }
        Err(LexError::UnexpectedChar {
            ch,
            column: self.pos + 1,
        })
    }
}

/// Split the body of an f-string into literal text and `{expr}` sources.
fn split_fstring(raw: &str) -> Result<Vec<FPart>, LexError> {
    let mut parts = Vec::new();
    let mut lit = String::new();
    let mut chars = raw.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '{' if chars.peek() == Some(&'{') => {
                chars.next();
                lit.push('{');
            }
            '}' if chars.peek() == Some(&'}') => {
                chars.next();
                lit.push('}');
            }
            '{' => {
                if !lit.is_empty() {
                    parts.push(FPart::Lit(std::mem::take(&mut lit)));
                }
                let mut depth = 1;
                let mut expr = String::new();
                let mut quote: Option<char> = None;
                loop {
                    let c = chars.next().ok_or(LexError::BadFString)?;
                    match (quote, c) {
                        (Some(q), c) if c == q => quote = None,
                        (Some(_), _) => {}
                        (None, '"' | '\'') => quote = Some(c),
                        (None, '{') => depth += 1,
                        (None, '}') => {
                            depth -= 1;
                            if depth == 0 {
                                break;
                            }
                        }
                        _ => {}
                    }
                    expr.push(c);
                }
                if expr.trim().is_empty() {
                    return Err(LexError::BadFString);
                }
                parts.push(FPart::Expr(expr));
            }
            '}' => return Err(LexError::BadFString),
            c => lit.push(c),
        }
    }
    if !lit.is_empty() {
        parts.push(FPart::Lit(lit));
    }
    Ok(parts)
}

/// Tokenize one line (without its indentation) of host source.
pub fn tokenize(line: &str) -> Result<Vec<Token>, LexError> {
    LineLexer::new(line).make_tokens()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn assignment_line() {
        let tokens = tokenize("x = 1+2.5").unwrap();
        assert_eq!(
            tokens,
            vec![
                Token::Name("x".into()),
                Token::Op("="),
                Token::Int(1),
                Token::Op("+"),
                Token::Float(2.5),
            ]
        );
    }

    #[test]
    fn keywords_and_comments() {
        let tokens = tokenize("if not done: # trailing").unwrap();
        assert_eq!(
            tokens,
            vec![
                Token::Kw(Keyword::If),
                Token::Kw(Keyword::Not),
                Token::Name("done".into()),
                Token::Op(":"),
            ]
        );
    }

    #[test]
    fn longest_operator_wins() {
        let tokens = tokenize("a ** b // c -> d").unwrap();
        let ops: Vec<_> = tokens
            .into_iter()
            .filter_map(|t| match t {
                Token::Op(op) => Some(op),
                _ => None,
            })
            .collect();
        assert_eq!(ops, vec!["**", "//", "->"]);
    }

    #[test]
    fn string_escapes() {
        assert_eq!(
            tokenize(r#"'it\'s' "a\tb""#).unwrap(),
            vec![Token::Str("it's".into()), Token::Str("a\tb".into())]
        );
    }

    #[test]
    fn fstring_parts() {
        let tokens = tokenize(r#"f"hi {name}, {{literal}} {d['k']}""#).unwrap();
        assert_eq!(
            tokens,
            vec![Token::FStr(vec![
                FPart::Lit("hi ".into()),
                FPart::Expr("name".into()),
                FPart::Lit(", {literal} ".into()),
                FPart::Expr("d['k']".into()),
            ])]
        );
    }

    #[test]
    fn unterminated_string() {
        assert_eq!(tokenize("'abc"), Err(LexError::UnterminatedString));
    }

    #[test]
    fn unexpected_character() {
        assert_eq!(
            tokenize("a @ b"),
            Err(LexError::UnexpectedChar { ch: '@', column: 3 })
        );
    }
}
