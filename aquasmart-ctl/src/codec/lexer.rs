/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Tokens of the parameter file format.
//!
//! Whitespace (including newlines inside list literals) and `//` line
//! comments are skipped by the lexer and never reach the parser.

use std::ops::Range;

use logos::Logos;

#[derive(Logos, Debug, Clone, PartialEq)]
#[logos(skip r"[ \t\r\n\f]+")]
#[logos(skip r"//[^\n]*")]
pub enum Token {
    /// Declaration name: `c`, `p`, `n_0`, `r`, ...
    #[regex(r"[A-Za-z_][A-Za-z0-9_]*", |lex| lex.slice().to_owned())]
    Ident(String),

    /// Decimal floating point, optional sign and exponent.  Literals that
    /// overflow to infinity are lexing errors.
    #[regex(
        r"[+-]?([0-9]+(\.[0-9]*)?|\.[0-9]+)([eE][+-]?[0-9]+)?",
        |lex| lex.slice().parse::<f64>().ok().filter(|v: &f64| v.is_finite())
    )]
    Number(f64),

    #[token("=")]
    Assign,

    #[token(";")]
    Semicolon,

    #[token("[")]
    LBracket,

    #[token("]")]
    RBracket,

    #[token(",")]
    Comma,
}

impl Token {
    /// Short human description used in syntax errors.
    pub fn describe(&self) -> String {
        match self {
            Token::Ident(name) => format!("identifier '{name}'"),
            Token::Number(value) => format!("number {value}"),
            Token::Assign => "'='".to_string(),
            Token::Semicolon => "';'".to_string(),
            Token::LBracket => "'['".to_string(),
            Token::RBracket => "']'".to_string(),
            Token::Comma => "','".to_string(),
        }
    }
}

/// A lexed token, or `Err(())` for input the lexer could not match, paired
/// with its byte span in the source.
pub type Spanned = (Result<Token, ()>, Range<usize>);

/// Tokenize the whole document.  Lexing errors are kept in place so the
/// parser can report them against the declaration they occur in.
pub fn tokenize(source: &str) -> Vec<Spanned> {
    Token::lexer(source).spanned().collect()
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn tokens(source: &str) -> Vec<Token> {
        tokenize(source)
            .into_iter()
            .map(|(tok, _)| tok.unwrap())
            .collect()
    }

    #[test]
    fn scalar_declaration() {
        assert_eq!(
            tokens("n_0 = 0.40;"),
            vec![
                Token::Ident("n_0".into()),
                Token::Assign,
                Token::Number(0.40),
                Token::Semicolon,
            ]
        );
    }

    #[test]
    fn comments_and_newlines_are_skipped() {
        let src = "// header\nr = [1.5,\n  2.5]; // trailing\n";
        assert_eq!(
            tokens(src),
            vec![
                Token::Ident("r".into()),
                Token::Assign,
                Token::LBracket,
                Token::Number(1.5),
                Token::Comma,
                Token::Number(2.5),
                Token::RBracket,
                Token::Semicolon,
            ]
        );
    }

    #[test]
    fn numbers_accept_sign_exponent_and_bare_fraction() {
        assert_eq!(
            tokens("-3 1e3 2.5E-1 .5 7."),
            vec![
                Token::Number(-3.0),
                Token::Number(1000.0),
                Token::Number(0.25),
                Token::Number(0.5),
                Token::Number(7.0),
            ]
        );
    }

    #[test]
    fn scalar_named_e_is_an_identifier() {
        assert_eq!(tokens("e")[0], Token::Ident("e".into()));
    }

    #[test]
    fn overflowing_literal_is_an_error() {
        let lexed = tokenize("1e400 -1e400 1e300");
        assert!(lexed[0].0.is_err());
        assert!(lexed[1].0.is_err());
        assert_eq!(lexed[2].0, Ok(Token::Number(1e300)));
    }

    #[test]
    fn unknown_characters_produce_errors() {
        let lexed = tokenize("p = 1 # 2;");
        assert!(lexed.iter().any(|(tok, _)| tok.is_err()));
    }
}
