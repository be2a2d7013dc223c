//! Indentation-structured statement parser and precedence-climbing
//! expression parser.

use std::collections::HashSet;
use std::rc::Rc;

use thiserror::Error;

use super::ast::{BinOp, Expr, FSegment, FuncDef, ParamDecl, Stmt, StmtKind, Target, UnaryOp};
use super::lexer::{FPart, Keyword, Token, tokenize};
use crate::args::ParamKind;
use crate::value::Value;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("line {line}: {reason}")]
pub struct ParseError {
    pub line: usize,
    pub reason: String,
}

impl ParseError {
    fn new(line: usize, reason: impl Into<String>) -> Self {
        Self {
            line,
            reason: reason.into(),
        }
    }
}

struct SourceLine {
    number: usize,
    indent: usize,
    tokens: Vec<Token>,
}

fn indent_width(line: &str) -> usize {
    line.chars()
        .take_while(|c| *c == ' ' || *c == '\t')
        .map(|c| if c == '\t' { 4 } else { 1 })
        .sum()
}

/// Parse a whole program. `line_offset` is added to every reported line
/// number, so callers that dropped leading lines still report original ones.
pub fn parse_program(source: &str, line_offset: usize) -> Result<Vec<Stmt>, ParseError> {
    let mut lines = Vec::new();
    for (index, raw) in source.lines().enumerate() {
        let number = index + 1 + line_offset;
        let tokens = tokenize(raw.trim()).map_err(|e| ParseError::new(number, e.to_string()))?;
        if tokens.is_empty() {
            continue;
        }
        lines.push(SourceLine {
            number,
            indent: indent_width(raw),
            tokens,
        });
    }

    let mut parser = BlockParser { lines, pos: 0 };
    let base = parser.lines.first().map_or(0, |l| l.indent);
    let program = parser.parse_block(base)?;
    match parser.lines.get(parser.pos) {
        Some(line) => Err(ParseError::new(
            line.number,
            "unindent does not match any outer level",
        )),
        None => Ok(program),
    }
}

/// Parse a single expression, e.g. the body of an f-string segment.
pub fn parse_expression(source: &str, line: usize) -> Result<Expr, ParseError> {
    let tokens = tokenize(source.trim()).map_err(|e| ParseError::new(line, e.to_string()))?;
    let mut cursor = ExprCursor::new(&tokens, line);
    let expr = cursor.parse_expr()?;
    cursor.expect_end()?;
    Ok(expr)
}

struct BlockParser {
    lines: Vec<SourceLine>,
    pos: usize,
}

impl BlockParser {
    fn parse_block(&mut self, indent: usize) -> Result<Vec<Stmt>, ParseError> {
        let mut body = Vec::new();
        while let Some(line) = self.lines.get(self.pos) {
            if line.indent < indent {
                break;
            }
            if line.indent > indent {
                return Err(ParseError::new(line.number, "unexpected indent"));
            }
            body.push(self.parse_statement()?);
        }
        Ok(body)
    }

    fn parse_statement(&mut self) -> Result<Stmt, ParseError> {
        let line = &self.lines[self.pos];
        let number = line.number;
        match line.tokens.first() {
            Some(Token::Kw(Keyword::If)) => self.parse_if(),
            Some(Token::Kw(Keyword::For)) => self.parse_for(),
            Some(Token::Kw(Keyword::While)) => self.parse_while(),
            Some(Token::Kw(Keyword::Def)) => self.parse_def(),
            Some(Token::Kw(Keyword::Elif)) => Err(ParseError::new(number, "'elif' without 'if'")),
            Some(Token::Kw(Keyword::Else)) => Err(ParseError::new(number, "'else' without 'if'")),
            _ => {
                let tokens = &self.lines[self.pos].tokens;
                let mut cursor = ExprCursor::new(tokens, number);
                let kind = cursor.parse_simple()?;
                cursor.expect_end()?;
                self.pos += 1;
                Ok(Stmt { line: number, kind })
            }
        }
    }

    /// Parse what follows a header's `:`: the rest of the line as a
    /// single-line suite, or the deeper-indented lines below it.
    fn parse_suite(
        &mut self,
        cursor: &mut ExprCursor<'_>,
        header_indent: usize,
    ) -> Result<Vec<Stmt>, ParseError> {
        let number = cursor.line;
        if !cursor.at_end() {
            let kind = cursor.parse_simple()?;
            cursor.expect_end()?;
            self.pos += 1;
            return Ok(vec![Stmt { line: number, kind }]);
        }
        self.pos += 1;
        match self.lines.get(self.pos) {
            Some(next) if next.indent > header_indent => {
                let indent = next.indent;
                self.parse_block(indent)
            }
            _ => Err(ParseError::new(number, "expected an indented block")),
        }
    }

    fn header(&self) -> (Vec<Token>, usize, usize) {
        let line = &self.lines[self.pos];
        (line.tokens.clone(), line.number, line.indent)
    }

    fn parse_if(&mut self) -> Result<Stmt, ParseError> {
        let (tokens, number, indent) = self.header();
        let mut cursor = ExprCursor::new(&tokens, number);
        cursor.consume();
        let cond = cursor.parse_expr()?;
        cursor.expect_op(":")?;
        let body = self.parse_suite(&mut cursor, indent)?;
        let mut branches = vec![(cond, body)];
        let mut orelse = Vec::new();

        while let Some(line) = self.lines.get(self.pos) {
            if line.indent != indent {
                break;
            }
            match line.tokens.first() {
                Some(Token::Kw(Keyword::Elif)) => {
                    let (tokens, number, _) = self.header();
                    let mut cursor = ExprCursor::new(&tokens, number);
                    cursor.consume();
                    let cond = cursor.parse_expr()?;
                    cursor.expect_op(":")?;
                    let body = self.parse_suite(&mut cursor, indent)?;
                    branches.push((cond, body));
                }
                Some(Token::Kw(Keyword::Else)) => {
                    let (tokens, number, _) = self.header();
                    let mut cursor = ExprCursor::new(&tokens, number);
                    cursor.consume();
                    cursor.expect_op(":")?;
                    orelse = self.parse_suite(&mut cursor, indent)?;
                    break;
                }
                _ => break,
            }
        }
        Ok(Stmt {
            line: number,
            kind: StmtKind::If { branches, orelse },
        })
    }

    fn parse_for(&mut self) -> Result<Stmt, ParseError> {
        let (tokens, number, indent) = self.header();
        let mut cursor = ExprCursor::new(&tokens, number);
        cursor.consume();
        let var = cursor.expect_name()?;
        cursor.expect_kw(Keyword::In)?;
        let iter = cursor.parse_expr()?;
        cursor.expect_op(":")?;
        let body = self.parse_suite(&mut cursor, indent)?;
        Ok(Stmt {
            line: number,
            kind: StmtKind::For { var, iter, body },
        })
    }

    fn parse_while(&mut self) -> Result<Stmt, ParseError> {
        let (tokens, number, indent) = self.header();
        let mut cursor = ExprCursor::new(&tokens, number);
        cursor.consume();
        let cond = cursor.parse_expr()?;
        cursor.expect_op(":")?;
        let body = self.parse_suite(&mut cursor, indent)?;
        Ok(Stmt {
            line: number,
            kind: StmtKind::While { cond, body },
        })
    }

    fn parse_def(&mut self) -> Result<Stmt, ParseError> {
        let (tokens, number, indent) = self.header();
        let mut cursor = ExprCursor::new(&tokens, number);
        cursor.consume();
        let name = cursor.expect_name()?;
        cursor.expect_op("(")?;
        let params = cursor.parse_params()?;
        cursor.expect_op(":")?;
        let body = self.parse_suite(&mut cursor, indent)?;
        let doc = match body.first().map(|s| &s.kind) {
            Some(StmtKind::Expr(Expr::Const(Value::Str(doc)))) => Some(doc.trim().to_string()),
            _ => None,
        };
        Ok(Stmt {
            line: number,
            kind: StmtKind::Def(Rc::new(FuncDef {
                name,
                params,
                doc,
                body,
            })),
        })
    }
}

/// Cursor over the tokens of one line.
struct ExprCursor<'a> {
    tokens: &'a [Token],
    pos: usize,
    line: usize,
}

impl<'a> ExprCursor<'a> {
    fn new(tokens: &'a [Token], line: usize) -> Self {
        Self {
            tokens,
            pos: 0,
            line,
        }
    }

    fn error(&self, reason: impl Into<String>) -> ParseError {
        ParseError::new(self.line, reason)
    }

    fn peek(&self) -> Option<&'a Token> {
        self.tokens.get(self.pos)
    }

    fn peek_n(&self, n: usize) -> Option<&'a Token> {
        self.tokens.get(self.pos + n)
    }

    fn consume(&mut self) -> Option<&'a Token> {
        let token = self.tokens.get(self.pos);
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn at_end(&self) -> bool {
        self.pos >= self.tokens.len()
    }

    fn is_op(&self, op: &str) -> bool {
        matches!(self.peek(), Some(Token::Op(o)) if *o == op)
    }

    fn is_kw(&self, kw: Keyword) -> bool {
        matches!(self.peek(), Some(Token::Kw(k)) if *k == kw)
    }

    fn eat_op(&mut self, op: &str) -> bool {
        let found = self.is_op(op);
        if found {
            self.pos += 1;
        }
        found
    }

    fn unexpected(&self) -> ParseError {
        match self.peek() {
            Some(token) => self.error(format!("unexpected {}", describe(token))),
            None => self.error("unexpected end of line"),
        }
    }

    fn expect_op(&mut self, op: &str) -> Result<(), ParseError> {
        if self.eat_op(op) {
            Ok(())
        } else {
            Err(match self.peek() {
                Some(token) => self.error(format!("expected '{op}', found {}", describe(token))),
                None => self.error(format!("expected '{op}'")),
            })
        }
    }

    fn expect_kw(&mut self, kw: Keyword) -> Result<(), ParseError> {
        if self.is_kw(kw) {
            self.pos += 1;
            Ok(())
        } else {
            Err(self.unexpected())
        }
    }

    fn expect_name(&mut self) -> Result<String, ParseError> {
        match self.peek() {
            Some(Token::Name(name)) => {
                self.pos += 1;
                Ok(name.clone())
            }
            _ => Err(self.unexpected()),
        }
    }

    fn expect_end(&self) -> Result<(), ParseError> {
        if self.at_end() {
            Ok(())
        } else {
            Err(self.unexpected())
        }
    }

    fn parse_simple(&mut self) -> Result<StmtKind, ParseError> {
        match self.peek() {
            Some(Token::Kw(Keyword::Return)) => {
                self.pos += 1;
                if self.at_end() {
                    Ok(StmtKind::Return(None))
                } else {
                    Ok(StmtKind::Return(Some(self.parse_expr()?)))
                }
            }
            Some(Token::Kw(Keyword::Break)) => {
                self.pos += 1;
                Ok(StmtKind::Break)
            }
            Some(Token::Kw(Keyword::Continue)) => {
                self.pos += 1;
                Ok(StmtKind::Continue)
            }
            Some(Token::Kw(Keyword::Pass)) => {
                self.pos += 1;
                Ok(StmtKind::Pass)
            }
            _ => {
                let expr = self.parse_expr()?;
                let aug = match self.peek() {
                    Some(Token::Op("=")) => None,
                    Some(Token::Op("+=")) => Some(BinOp::Add),
                    Some(Token::Op("-=")) => Some(BinOp::Sub),
                    _ => return Ok(StmtKind::Expr(expr)),
                };
                self.pos += 1;
                let target = self.to_target(expr)?;
                let value = self.parse_expr()?;
                Ok(match aug {
                    Some(op) => StmtKind::AugAssign(target, op, value),
                    None => StmtKind::Assign(target, value),
                })
            }
        }
    }

    fn to_target(&self, expr: Expr) -> Result<Target, ParseError> {
        match expr {
            Expr::Name(name) => Ok(Target::Name(name)),
            Expr::Index(base, index) => Ok(Target::Index(*base, *index)),
            _ => Err(self.error("cannot assign to expression")),
        }
    }

    /// Parameter list after the opening parenthesis, through the closing one.
    fn parse_params(&mut self) -> Result<Vec<ParamDecl>, ParseError> {
        let mut params: Vec<ParamDecl> = Vec::new();
        while !self.eat_op(")") {
            let kind = if self.eat_op("**") {
                ParamKind::Keywords
            } else if self.eat_op("*") {
                ParamKind::Variadic
            } else {
                ParamKind::Required
            };
            let name = self.expect_name()?;
            let annotation = if self.eat_op(":") {
                Some(self.parse_expr()?)
            } else {
                None
            };
            let default = if kind == ParamKind::Required && self.eat_op("=") {
                Some(self.parse_expr()?)
            } else {
                None
            };
            let kind = if default.is_some() { ParamKind::Defaulted } else { kind };
            params.push(ParamDecl {
                name,
                kind,
                annotation,
                default,
            });
            if !self.eat_op(",") {
                self.expect_op(")")?;
                break;
            }
        }
        self.check_params(&params)?;
        Ok(params)
    }

    fn check_params(&self, params: &[ParamDecl]) -> Result<(), ParseError> {
        let mut names = HashSet::new();
        let mut rank = 0;
        for param in params {
            if !names.insert(param.name.as_str()) {
                return Err(self.error(format!("duplicate parameter '{}'", param.name)));
            }
            let this = match param.kind {
                ParamKind::Required => 0,
                ParamKind::Defaulted => 1,
                ParamKind::Variadic => 2,
                ParamKind::Keywords => 3,
            };
            let misplaced = this < rank || (this == rank && this >= 2);
            if misplaced {
                return Err(self.error(format!("parameter '{}' is out of order", param.name)));
            }
            rank = this;
        }
        Ok(())
    }

    fn parse_expr(&mut self) -> Result<Expr, ParseError> {
        self.parse_or()
    }

    fn parse_or(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.parse_and()?;
        while self.is_kw(Keyword::Or) {
            self.pos += 1;
            let right = self.parse_and()?;
            left = Expr::Or(Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn parse_and(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.parse_not()?;
        while self.is_kw(Keyword::And) {
            self.pos += 1;
            let right = self.parse_not()?;
            left = Expr::And(Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn parse_not(&mut self) -> Result<Expr, ParseError> {
        if self.is_kw(Keyword::Not) {
            self.pos += 1;
            let operand = self.parse_not()?;
            return Ok(Expr::Unary(UnaryOp::Not, Box::new(operand)));
        }
        self.parse_comparison()
    }

    fn comparison_op(&mut self) -> Option<BinOp> {
        let op = match (self.peek(), self.peek_n(1)) {
            (Some(Token::Op("==")), _) => BinOp::Eq,
            (Some(Token::Op("!=")), _) => BinOp::Ne,
            (Some(Token::Op("<")), _) => BinOp::Lt,
            (Some(Token::Op("<=")), _) => BinOp::Le,
            (Some(Token::Op(">")), _) => BinOp::Gt,
            (Some(Token::Op(">=")), _) => BinOp::Ge,
            (Some(Token::Kw(Keyword::In)), _) => BinOp::In,
            (Some(Token::Kw(Keyword::Not)), Some(Token::Kw(Keyword::In))) => {
                self.pos += 1;
                BinOp::NotIn
            }
            _ => return None,
        };
        self.pos += 1;
        Some(op)
    }

    fn parse_comparison(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.parse_sum()?;
        while let Some(op) = self.comparison_op() {
            let right = self.parse_sum()?;
            left = Expr::Binary(op, Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn parse_sum(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.parse_term()?;
        loop {
            let op = match self.peek() {
                Some(Token::Op("+")) => BinOp::Add,
                Some(Token::Op("-")) => BinOp::Sub,
                _ => return Ok(left),
            };
            self.pos += 1;
            let right = self.parse_term()?;
            left = Expr::Binary(op, Box::new(left), Box::new(right));
        }
    }

    fn parse_term(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.parse_unary()?;
        loop {
            let op = match self.peek() {
                Some(Token::Op("*")) => BinOp::Mul,
                Some(Token::Op("/")) => BinOp::Div,
                Some(Token::Op("//")) => BinOp::FloorDiv,
                Some(Token::Op("%")) => BinOp::Mod,
                _ => return Ok(left),
            };
            self.pos += 1;
            let right = self.parse_unary()?;
            left = Expr::Binary(op, Box::new(left), Box::new(right));
        }
    }

    fn parse_unary(&mut self) -> Result<Expr, ParseError> {
        let op = match self.peek() {
            Some(Token::Op("-")) => UnaryOp::Neg,
            Some(Token::Op("+")) => UnaryOp::Pos,
            _ => return self.parse_power(),
        };
        self.pos += 1;
        let operand = self.parse_unary()?;
        Ok(Expr::Unary(op, Box::new(operand)))
    }

    fn parse_power(&mut self) -> Result<Expr, ParseError> {
        let base = self.parse_postfix()?;
        if self.eat_op("**") {
            let exponent = self.parse_unary()?;
            return Ok(Expr::Binary(BinOp::Pow, Box::new(base), Box::new(exponent)));
        }
        Ok(base)
    }

    fn parse_postfix(&mut self) -> Result<Expr, ParseError> {
        let mut expr = self.parse_atom()?;
        loop {
            if self.eat_op("(") {
                let (args, kwargs) = self.parse_call_args()?;
                expr = Expr::Call {
                    func: Box::new(expr),
                    args,
                    kwargs,
                };
            } else if self.eat_op("[") {
                let index = self.parse_expr()?;
                self.expect_op("]")?;
                expr = Expr::Index(Box::new(expr), Box::new(index));
            } else {
                return Ok(expr);
            }
        }
    }

    fn parse_call_args(&mut self) -> Result<(Vec<Expr>, Vec<(String, Expr)>), ParseError> {
        let mut args = Vec::new();
        let mut kwargs: Vec<(String, Expr)> = Vec::new();
        while !self.eat_op(")") {
            match (self.peek(), self.peek_n(1)) {
                (Some(Token::Name(name)), Some(Token::Op("="))) => {
                    self.pos += 2;
                    if kwargs.iter().any(|(k, _)| k == name) {
                        return Err(self.error(format!("keyword argument repeated: {name}")));
                    }
                    kwargs.push((name.clone(), self.parse_expr()?));
                }
                _ if !kwargs.is_empty() => {
                    return Err(self.error("positional argument follows keyword argument"));
                }
                _ => args.push(self.parse_expr()?),
            }
            if !self.eat_op(",") {
                self.expect_op(")")?;
                break;
            }
        }
        Ok((args, kwargs))
    }

    fn parse_atom(&mut self) -> Result<Expr, ParseError> {
        let token = self.consume().ok_or_else(|| self.error("unexpected end of line"))?;
        let expr = match token {
            Token::Int(i) => Expr::Const(Value::Int(*i)),
            Token::Float(f) => Expr::Const(Value::Float(*f)),
            Token::Str(s) => {
                let mut text = s.clone();
                while let Some(Token::Str(next)) = self.peek() {
                    text.push_str(next);
                    self.pos += 1;
                }
                Expr::Const(Value::Str(text))
            }
            Token::FStr(parts) => self.fstring(parts)?,
            Token::Name(name) => Expr::Name(name.clone()),
            Token::Kw(Keyword::True) => Expr::Const(Value::Bool(true)),
            Token::Kw(Keyword::False) => Expr::Const(Value::Bool(false)),
            Token::Kw(Keyword::None) => Expr::Const(Value::None),
            Token::Op("(") => {
                let inner = self.parse_expr()?;
                self.expect_op(")")?;
                inner
            }
            Token::Op("[") => {
                let mut items = Vec::new();
                while !self.eat_op("]") {
                    items.push(self.parse_expr()?);
                    if !self.eat_op(",") {
                        self.expect_op("]")?;
                        break;
                    }
                }
                Expr::List(items)
            }
            Token::Op("{") => {
                let mut entries = Vec::new();
                while !self.eat_op("}") {
                    let key = self.parse_expr()?;
                    self.expect_op(":")?;
                    let value = self.parse_expr()?;
                    entries.push((key, value));
                    if !self.eat_op(",") {
                        self.expect_op("}")?;
                        break;
                    }
                }
                Expr::Dict(entries)
            }
            other => return Err(self.error(format!("unexpected {}", describe(other)))),
        };
        Ok(expr)
    }

    fn fstring(&self, parts: &[FPart]) -> Result<Expr, ParseError> {
        let segments = parts
            .iter()
            .map(|part| match part {
                FPart::Lit(text) => Ok(FSegment::Lit(text.clone())),
                FPart::Expr(src) => parse_expression(src, self.line).map(FSegment::Expr),
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Expr::FString(segments))
    }
}

fn describe(token: &Token) -> String {
    match token {
        Token::Name(name) => format!("name '{name}'"),
        Token::Int(i) => format!("number {i}"),
        Token::Float(f) => format!("number {f}"),
        Token::Str(_) | Token::FStr(_) => "string".to_string(),
        Token::Kw(kw) => format!("keyword '{}'", format!("{kw:?}").to_lowercase()),
        Token::Op(op) => format!("'{op}'"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(src: &str) -> Vec<Stmt> {
        parse_program(src, 0).unwrap()
    }

    #[test]
    fn precedence() {
        let expr = parse_expression("1 + 2 * 3 ** 2", 1).unwrap();
        let expected = Expr::Binary(
            BinOp::Add,
            Box::new(Expr::Const(Value::Int(1))),
            Box::new(Expr::Binary(
                BinOp::Mul,
                Box::new(Expr::Const(Value::Int(2))),
                Box::new(Expr::Binary(
                    BinOp::Pow,
                    Box::new(Expr::Const(Value::Int(3))),
                    Box::new(Expr::Const(Value::Int(2))),
                )),
            )),
        );
        assert_eq!(expr, expected);
    }

    #[test]
    fn if_elif_else_chain() {
        let program = parse("if a:\n    x = 1\nelif b:\n    x = 2\nelse:\n    x = 3\ny = x");
        assert_eq!(program.len(), 2);
        match &program[0].kind {
            StmtKind::If { branches, orelse } => {
                assert_eq!(branches.len(), 2);
                assert_eq!(orelse.len(), 1);
                assert_eq!(orelse[0].line, 6);
            }
            other => panic!("unexpected {other:?}"),
        }
        assert_eq!(program[1].line, 7);
    }

    #[test]
    fn single_line_def() {
        let program = parse("def add(a, b=2): return a + b");
        let StmtKind::Def(def) = &program[0].kind else {
            panic!("expected def");
        };
        assert_eq!(def.name, "add");
        assert_eq!(def.params[1].kind, ParamKind::Defaulted);
        assert!(matches!(def.body[0].kind, StmtKind::Return(Some(_))));
    }

    #[test]
    fn params_with_annotations_and_variadics() {
        let program = parse("def f(a: int, b: str = 'x', *rest, **extra):\n    pass");
        let StmtKind::Def(def) = &program[0].kind else {
            panic!("expected def");
        };
        let kinds: Vec<ParamKind> = def.params.iter().map(|p| p.kind).collect();
        assert_eq!(
            kinds,
            [
                ParamKind::Required,
                ParamKind::Defaulted,
                ParamKind::Variadic,
                ParamKind::Keywords
            ]
        );
        assert_eq!(def.params[0].annotation, Some(Expr::Name("int".into())));
    }

    #[test]
    fn doc_string_is_kept() {
        let program = parse("def greet(name):\n    \"Say hello.\"\n    print(name)");
        let StmtKind::Def(def) = &program[0].kind else {
            panic!("expected def");
        };
        assert_eq!(def.doc.as_deref(), Some("Say hello."));
    }

    #[test]
    fn misordered_params_rejected() {
        let err = parse_program("def f(a=1, b):\n    pass", 0).unwrap_err();
        assert_eq!(err.line, 1);
        let err = parse_program("def f(*a, *b):\n    pass", 0).unwrap_err();
        assert!(err.reason.contains("out of order"));
    }

    #[test]
    fn line_offset_applies() {
        let err = parse_program("x = 1\ny = (", 1).unwrap_err();
        assert_eq!(err.line, 3);
    }

    #[test]
    fn missing_block() {
        let err = parse_program("while True:\nx = 1", 0).unwrap_err();
        assert_eq!(err.reason, "expected an indented block");
    }

    #[test]
    fn unexpected_indent() {
        let err = parse_program("x = 1\n    y = 2", 0).unwrap_err();
        assert_eq!(err.line, 2);
    }

    #[test]
    fn keyword_arguments_and_not_in() {
        let expr = parse_expression("f(1, k=2) not in xs", 1).unwrap();
        let Expr::Binary(BinOp::NotIn, left, _) = expr else {
            panic!("expected 'not in'");
        };
        let Expr::Call { args, kwargs, .. } = *left else {
            panic!("expected call");
        };
        assert_eq!(args.len(), 1);
        assert_eq!(kwargs[0].0, "k");
    }

    #[test]
    fn positional_after_keyword_rejected() {
        let err = parse_expression("f(k=1, 2)", 4).unwrap_err();
        assert_eq!(err.line, 4);
    }
}
