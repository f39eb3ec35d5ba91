/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Hand-written recursive descent parser for the parameter file grammar:
//!
//! ```text
//! document    := declaration*
//! declaration := IDENT '=' value ';'
//! value       := NUMBER | list
//! list        := '[' ( value ( ',' value )* ','? )? ']'
//! ```
//!
//! The parser knows nothing about which names are meaningful; it produces a
//! flat list of [`Declaration`]s and leaves interpretation to the decoder.

use super::lexer::{tokenize, Spanned, Token};
use crate::error::FormatError;

/// Lists nested deeper than this are rejected (the deepest legal one, `c`,
/// has three levels).
const MAX_NESTING: usize = 8;

const DOCUMENT: &str = "<document>";

/// A parsed right-hand side.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Number(f64),
    List(Vec<Value>),
}

/// `name = value;` together with the 1-based line it starts on.
#[derive(Debug, Clone, PartialEq)]
pub struct Declaration {
    pub name: String,
    pub value: Value,
    pub line: usize,
}

/// Parse every declaration in `source`.
///
/// # Errors
/// Returns [`FormatError::Syntax`] for the first lexing or grammar error,
/// naming the declaration it occurred in together with line and column.
pub fn parse_document(source: &str) -> Result<Vec<Declaration>, FormatError> {
    let tokens = tokenize(source);
    let mut stream = TokenStream::new(source, &tokens);
    let mut declarations = Vec::new();

    while !stream.at_end() {
        declarations.push(stream.declaration()?);
    }

    Ok(declarations)
}

// ── Token stream ──────────────────────────────────────────────────────────────

struct TokenStream<'src> {
    source: &'src str,
    tokens: &'src [Spanned],
    pos: usize,
    /// Name of the declaration currently being parsed, for error context.
    context: String,
}

impl<'src> TokenStream<'src> {
    fn new(source: &'src str, tokens: &'src [Spanned]) -> Self {
        Self {
            source,
            tokens,
            pos: 0,
            context: DOCUMENT.to_string(),
        }
    }

    fn at_end(&self) -> bool {
        self.pos >= self.tokens.len()
    }

    /// Current token.  `Ok(None)` at end of input; a lexing error is reported
    /// as soon as the parser looks at it.
    fn peek(&self) -> Result<Option<&'src Token>, FormatError> {
        match self.tokens.get(self.pos) {
            None => Ok(None),
            Some((Ok(token), _)) => Ok(Some(token)),
            Some((Err(()), span)) => {
                let text = &self.source[span.clone()];
                Err(self.error_at(span.start, format!("unexpected input '{text}'")))
            }
        }
    }

    fn advance(&mut self) -> Result<Option<&'src Token>, FormatError> {
        let token = self.peek()?;
        if token.is_some() {
            self.pos += 1;
        }
        Ok(token)
    }

    /// Consume `expected` or fail with "expected X, found Y".
    fn expect(&mut self, expected: Token) -> Result<(), FormatError> {
        match self.peek()? {
            Some(token) if *token == expected => {
                self.pos += 1;
                Ok(())
            }
            found => Err(self.unexpected(&expected.describe(), found)),
        }
    }

    // ── Grammar ───────────────────────────────────────────────────────────────

    fn declaration(&mut self) -> Result<Declaration, FormatError> {
        self.context = DOCUMENT.to_string();
        let line = self.current_line();

        let name = match self.peek()? {
            Some(Token::Ident(name)) => name.clone(),
            found => return Err(self.unexpected("a declaration name", found)),
        };
        self.pos += 1;
        self.context = name.clone();

        self.expect(Token::Assign)?;
        let value = self.value(0)?;
        self.expect(Token::Semicolon)?;

        Ok(Declaration { name, value, line })
    }

    fn value(&mut self, depth: usize) -> Result<Value, FormatError> {
        match self.peek()? {
            Some(Token::Number(n)) => {
                self.pos += 1;
                Ok(Value::Number(*n))
            }
            Some(Token::LBracket) => self.list(depth + 1),
            found => Err(self.unexpected("a number or '['", found)),
        }
    }

    fn list(&mut self, depth: usize) -> Result<Value, FormatError> {
        if depth > MAX_NESTING {
            return Err(self.error_here(format!(
                "lists nested deeper than {MAX_NESTING} levels"
            )));
        }
        self.expect(Token::LBracket)?;

        let mut items = Vec::new();
        if matches!(self.peek()?, Some(Token::RBracket)) {
            self.pos += 1;
            return Ok(Value::List(items));
        }

        loop {
            items.push(self.value(depth)?);
            match self.advance()? {
                Some(Token::Comma) => {
                    // trailing comma
                    if matches!(self.peek()?, Some(Token::RBracket)) {
                        self.pos += 1;
                        break;
                    }
                }
                Some(Token::RBracket) => break,
                found => {
                    // report at the offending token, not after it
                    if found.is_some() {
                        self.pos -= 1;
                    }
                    return Err(self.unexpected("',' or ']'", found));
                }
            }
        }

        Ok(Value::List(items))
    }

    // ── Error helpers ─────────────────────────────────────────────────────────

    fn unexpected(&self, expected: &str, found: Option<&Token>) -> FormatError {
        let message = match found {
            Some(token) => format!("expected {expected}, found {}", token.describe()),
            None => format!("expected {expected}, found end of input"),
        };
        self.error_here(message)
    }

    fn error_here(&self, message: String) -> FormatError {
        let offset = self
            .tokens
            .get(self.pos)
            .map(|(_, span)| span.start)
            .unwrap_or(self.source.len());
        self.error_at(offset, message)
    }

    fn error_at(&self, offset: usize, message: String) -> FormatError {
        let (line, column) = line_column(self.source, offset);
        FormatError::Syntax {
            declaration: self.context.clone(),
            line,
            column,
            message,
        }
    }

    fn current_line(&self) -> usize {
        let offset = self
            .tokens
            .get(self.pos)
            .map(|(_, span)| span.start)
            .unwrap_or(self.source.len());
        line_column(self.source, offset).0
    }
}

/// 1-based line and column (in characters) of a byte offset.
fn line_column(source: &str, offset: usize) -> (usize, usize) {
    let before = &source[..offset.min(source.len())];
    let line = before.matches('\n').count() + 1;
    let line_start = before.rfind('\n').map(|i| i + 1).unwrap_or(0);
    let column = before[line_start..].chars().count() + 1;
    (line, column)
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn syntax(err: FormatError) -> (String, usize, usize, String) {
        match err {
            FormatError::Syntax {
                declaration,
                line,
                column,
                message,
            } => (declaration, line, column, message),
            other => panic!("expected a syntax error, got {other:?}"),
        }
    }

    #[test]
    fn parses_nested_lists_with_trailing_commas() {
        let decls = parse_document("c = [\n  [\n    [1, 2],\n  ],\n];").unwrap();
        assert_eq!(decls.len(), 1);
        assert_eq!(decls[0].name, "c");
        assert_eq!(
            decls[0].value,
            Value::List(vec![Value::List(vec![Value::List(vec![
                Value::Number(1.0),
                Value::Number(2.0)
            ])])])
        );
    }

    #[test]
    fn records_declaration_lines() {
        let decls = parse_document("// hdr\n\np = 1;\ne = 2;").unwrap();
        assert_eq!(decls[0].line, 3);
        assert_eq!(decls[1].line, 4);
    }

    #[test]
    fn empty_list_is_a_value() {
        let decls = parse_document("r = [];").unwrap();
        assert_eq!(decls[0].value, Value::List(vec![]));
    }

    #[test]
    fn unbalanced_bracket_names_declaration() {
        let (decl, line, _, message) = syntax(parse_document("r = [1, 2;\nh = [3];").unwrap_err());
        assert_eq!(decl, "r");
        assert_eq!(line, 1);
        assert!(message.contains("expected ',' or ']'"), "{message}");
    }

    #[test]
    fn missing_semicolon_is_reported() {
        let (decl, line, column, message) = syntax(parse_document("p = 1\ne = 2;").unwrap_err());
        assert_eq!(decl, "p");
        assert_eq!((line, column), (2, 1));
        assert!(message.contains("expected ';'"), "{message}");
    }

    #[test]
    fn non_numeric_token_is_rejected() {
        let (decl, _, column, message) = syntax(parse_document("h = [1, abc];").unwrap_err());
        assert_eq!(decl, "h");
        assert_eq!(column, 9);
        assert!(message.contains("identifier 'abc'"), "{message}");
    }

    #[test]
    fn comma_only_list_is_rejected() {
        assert!(parse_document("r = [,];").is_err());
    }

    #[test]
    fn lexing_error_is_attributed_to_declaration() {
        let (decl, _, _, message) = syntax(parse_document("m = 4 $;").unwrap_err());
        assert_eq!(decl, "m");
        assert!(message.contains("'$'"), "{message}");
    }

    #[test]
    fn infinite_literal_is_attributed_to_declaration() {
        let (decl, line, column, message) =
            syntax(parse_document("p = 1;\nr = [1.5, 1e400];").unwrap_err());
        assert_eq!(decl, "r");
        assert_eq!((line, column), (2, 11));
        assert!(message.contains("'1e400'"), "{message}");
    }

    #[test]
    fn truncated_input_reports_end_of_input() {
        let (_, _, _, message) = syntax(parse_document("c = [[[1.0").unwrap_err());
        assert!(message.contains("end of input"), "{message}");
    }

    #[test]
    fn excessive_nesting_is_rejected() {
        let src = format!("c = {}1{};", "[".repeat(12), "]".repeat(12));
        let (_, _, _, message) = syntax(parse_document(&src).unwrap_err());
        assert!(message.contains("nested deeper"), "{message}");
    }

    #[test]
    fn line_column_counts_characters() {
        assert_eq!(line_column("ab\ncd", 0), (1, 1));
        assert_eq!(line_column("ab\ncd", 4), (2, 2));
        assert_eq!(line_column("día\nx", 5), (2, 1));
    }
}
