//! Source text to token stream.
//!
//! - Newlines are tokens (they terminate statements) except inside `()` and `[]`.
//! - `//` comments run to end of line.
//! - The first malformed lexeme aborts lexing with a [`ScriptError::Syntax`].

use crate::error::{ScriptError, ScriptResult};
use crate::token::{Span, Token, TokenKind, keyword};

/// Tokenize a complete snippet. The stream always ends with [`TokenKind::Eof`].
pub fn tokenize(source: &str) -> ScriptResult<Vec<Token>> {
    Lexer::new(source).lex()
}

struct Lexer<'src> {
    source: &'src [u8],
    pos: usize,
    line: u32,
    col: u32,
    /// Open delimiters; newlines are suppressed while the innermost is `(` or `[`.
    nesting: Vec<u8>,
}

impl<'src> Lexer<'src> {
    fn new(source: &'src str) -> Self {
        Self {
            source: source.as_bytes(),
            pos: 0,
            line: 1,
            col: 1,
            nesting: Vec::new(),
        }
    }

    fn lex(mut self) -> ScriptResult<Vec<Token>> {
        let mut tokens = Vec::new();
        loop {
            let token = self.scan()?;
            let is_eof = token.kind == TokenKind::Eof;
            tokens.push(token);
            if is_eof {
                break;
            }
        }
        Ok(tokens)
    }

    // ── Character helpers ─────────────────────────────────────────────

    fn peek(&self) -> Option<u8> {
        self.source.get(self.pos).copied()
    }

    fn peek_at(&self, offset: usize) -> Option<u8> {
        self.source.get(self.pos + offset).copied()
    }

    fn advance(&mut self) -> Option<u8> {
        let ch = self.peek()?;
        self.pos += 1;
        if ch == b'\n' {
            self.line += 1;
            self.col = 1;
        } else {
            self.col += 1;
        }
        Some(ch)
    }

    fn span(&self) -> Span {
        Span::new(self.line, self.col)
    }

    fn newlines_suppressed(&self) -> bool {
        matches!(self.nesting.last(), Some(b'(' | b'['))
    }

    fn skip_trivia(&mut self) {
        loop {
            match self.peek() {
                Some(b' ' | b'\t' | b'\r') => {
                    self.advance();
                }
                Some(b'\n') if self.newlines_suppressed() => {
                    self.advance();
                }
                Some(b'/') if self.peek_at(1) == Some(b'/') => {
                    while let Some(ch) = self.peek() {
                        if ch == b'\n' {
                            break;
                        }
                        self.advance();
                    }
                }
                _ => break,
            }
        }
    }

    // ── Scanning ──────────────────────────────────────────────────────

    fn scan(&mut self) -> ScriptResult<Token> {
        self.skip_trivia();
        let start = self.span();
        let Some(ch) = self.advance() else {
            return Ok(Token::new(TokenKind::Eof, start));
        };

        let kind = match ch {
            b'\n' => TokenKind::Newline,
            b'"' | b'\'' => self.scan_string(ch, start)?,
            b'0'..=b'9' => self.scan_number(start)?,
            b'a'..=b'z' | b'A'..=b'Z' | b'_' => self.scan_identifier(),

            b'+' => self.with_eq(TokenKind::Plus, TokenKind::PlusEq),
            b'-' => self.with_eq(TokenKind::Minus, TokenKind::MinusEq),
            b'*' => self.with_eq(TokenKind::Star, TokenKind::StarEq),
            b'/' => self.with_eq(TokenKind::Slash, TokenKind::SlashEq),
            b'%' => TokenKind::Percent,
            b'<' => self.with_eq(TokenKind::Less, TokenKind::LessEq),
            b'>' => self.with_eq(TokenKind::Greater, TokenKind::GreaterEq),
            b'=' => match self.peek() {
                Some(b'=') => {
                    self.advance();
                    TokenKind::EqEq
                }
                Some(b'>') => {
                    self.advance();
                    TokenKind::FatArrow
                }
                _ => TokenKind::Eq,
            },
            b'!' => {
                if self.peek() == Some(b'=') {
                    self.advance();
                    TokenKind::BangEq
                } else {
                    return Err(ScriptError::syntax(
                        start,
                        "unexpected character `!`; use `not` for negation",
                    ));
                }
            }

            b'.' => TokenKind::Dot,
            b',' => TokenKind::Comma,
            b':' => TokenKind::Colon,
            b';' => TokenKind::Semicolon,
            b'(' | b'[' | b'{' => {
                self.nesting.push(ch);
                match ch {
                    b'(' => TokenKind::LParen,
                    b'[' => TokenKind::LBracket,
                    _ => TokenKind::LBrace,
                }
            }
            b')' | b']' | b'}' => {
                let expected = match ch {
                    b')' => b'(',
                    b']' => b'[',
                    _ => b'{',
                };
                if self.nesting.pop() != Some(expected) {
                    return Err(ScriptError::syntax(
                        start,
                        format!("unbalanced `{}`", ch as char),
                    ));
                }
                match ch {
                    b')' => TokenKind::RParen,
                    b']' => TokenKind::RBracket,
                    _ => TokenKind::RBrace,
                }
            }

            other => {
                return Err(ScriptError::syntax(
                    start,
                    format!("unexpected character `{}`", other as char),
                ));
            }
        };

        Ok(Token::new(kind, start))
    }

    fn with_eq(&mut self, plain: TokenKind, compound: TokenKind) -> TokenKind {
        if self.peek() == Some(b'=') {
            self.advance();
            compound
        } else {
            plain
        }
    }

    fn scan_identifier(&mut self) -> TokenKind {
        let start = self.pos - 1;
        while matches!(
            self.peek(),
            Some(b'a'..=b'z' | b'A'..=b'Z' | b'0'..=b'9' | b'_')
        ) {
            self.advance();
        }
        let text = String::from_utf8_lossy(&self.source[start..self.pos]);
        keyword(&text).unwrap_or_else(|| TokenKind::Ident(text.into_owned()))
    }

    fn scan_number(&mut self, start: Span) -> ScriptResult<TokenKind> {
        let begin = self.pos - 1;
        let mut is_float = false;

        self.consume_digits();
        if self.peek() == Some(b'.') && matches!(self.peek_at(1), Some(b'0'..=b'9')) {
            is_float = true;
            self.advance();
            self.consume_digits();
        }
        if matches!(self.peek(), Some(b'e' | b'E')) {
            let sign = usize::from(matches!(self.peek_at(1), Some(b'+' | b'-')));
            if matches!(self.peek_at(1 + sign), Some(b'0'..=b'9')) {
                is_float = true;
                for _ in 0..=sign {
                    self.advance();
                }
                self.consume_digits();
            }
        }

        let text: String = String::from_utf8_lossy(&self.source[begin..self.pos])
            .chars()
            .filter(|ch| *ch != '_')
            .collect();

        if is_float {
            text.parse::<f64>()
                .map(TokenKind::Float)
                .map_err(|err| ScriptError::syntax(start, format!("invalid number `{text}`: {err}")))
        } else {
            text.parse::<i64>()
                .map(TokenKind::Int)
                .map_err(|err| ScriptError::syntax(start, format!("invalid integer `{text}`: {err}")))
        }
    }

    fn consume_digits(&mut self) {
        while matches!(self.peek(), Some(b'0'..=b'9' | b'_')) {
            self.advance();
        }
    }

    fn scan_string(&mut self, quote: u8, start: Span) -> ScriptResult<TokenKind> {
        let mut bytes = Vec::new();
        loop {
            let Some(ch) = self.advance() else {
                return Err(ScriptError::syntax(start, "unterminated string literal"));
            };
            match ch {
                b'\n' => {
                    return Err(ScriptError::syntax(start, "unterminated string literal"));
                }
                b'\\' => {
                    let escape_span = self.span();
                    let escaped = match self.advance() {
                        Some(b'n') => b'\n',
                        Some(b't') => b'\t',
                        Some(b'r') => b'\r',
                        Some(b'0') => b'\0',
                        Some(b'\\') => b'\\',
                        Some(b'"') => b'"',
                        Some(b'\'') => b'\'',
                        Some(other) => {
                            return Err(ScriptError::syntax(
                                escape_span,
                                format!("unknown escape `\\{}`", other as char),
                            ));
                        }
                        None => {
                            return Err(ScriptError::syntax(start, "unterminated string literal"));
                        }
                    };
                    bytes.push(escaped);
                }
                ch if ch == quote => break,
                ch => bytes.push(ch),
            }
        }
        String::from_utf8(bytes)
            .map(TokenKind::Str)
            .map_err(|_| ScriptError::syntax(start, "string literal is not valid UTF-8"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(source: &str) -> Vec<TokenKind> {
        tokenize(source)
            .expect("lex")
            .into_iter()
            .map(|token| token.kind)
            .collect()
    }

    #[test]
    fn lexes_assignment_with_newline() {
        assert_eq!(
            kinds("x = 1\n"),
            vec![
                TokenKind::Ident("x".into()),
                TokenKind::Eq,
                TokenKind::Int(1),
                TokenKind::Newline,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn newlines_inside_parens_are_dropped() {
        assert_eq!(
            kinds("f(1,\n2)"),
            vec![
                TokenKind::Ident("f".into()),
                TokenKind::LParen,
                TokenKind::Int(1),
                TokenKind::Comma,
                TokenKind::Int(2),
                TokenKind::RParen,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn newlines_inside_braces_are_kept() {
        let tokens = kinds("{\n}");
        assert_eq!(tokens[1], TokenKind::Newline);
    }

    #[test]
    fn floats_and_exponents() {
        assert_eq!(kinds("2.5")[0], TokenKind::Float(2.5));
        assert_eq!(kinds("1e3")[0], TokenKind::Float(1000.0));
        assert_eq!(kinds("1_000")[0], TokenKind::Int(1000));
    }

    #[test]
    fn string_escapes_and_quotes() {
        assert_eq!(kinds(r#""a\n\"b""#)[0], TokenKind::Str("a\n\"b".into()));
        assert_eq!(kinds("'<&>'")[0], TokenKind::Str("<&>".into()));
    }

    #[test]
    fn comments_are_skipped() {
        assert_eq!(
            kinds("1 // one\n"),
            vec![TokenKind::Int(1), TokenKind::Newline, TokenKind::Eof]
        );
    }

    #[test]
    fn compound_operators() {
        assert_eq!(
            kinds("a += 1 => == !="),
            vec![
                TokenKind::Ident("a".into()),
                TokenKind::PlusEq,
                TokenKind::Int(1),
                TokenKind::FatArrow,
                TokenKind::EqEq,
                TokenKind::BangEq,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn unterminated_string_reports_position() {
        let err = tokenize("x = \"abc").expect_err("should fail");
        match err {
            ScriptError::Syntax { span, .. } => assert_eq!(span, Span::new(1, 5)),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn unbalanced_delimiters_fail() {
        assert!(tokenize("(]").is_err());
    }
}
