// Ripple lexer -- tokenizer for the Ripple graph DSL.

mod cursor;

use cursor::Cursor;
use ripple_common::token::{keyword_from_str, Token, TokenKind};

/// The Ripple lexer. Converts source text into a stream of tokens.
///
/// Implements `Iterator<Item = Token>` so callers can consume tokens lazily
/// or collect them with [`Lexer::tokenize`]. Whitespace and comments are
/// emitted as trivia tokens so the parser can build a lossless syntax tree.
pub struct Lexer<'src> {
    cursor: Cursor<'src>,
    emitted_eof: bool,
}

impl<'src> Lexer<'src> {
    pub fn new(source: &'src str) -> Self {
        Self {
            cursor: Cursor::new(source),
            emitted_eof: false,
        }
    }

    /// Tokenize the entire source, including the final `Eof` token.
    pub fn tokenize(source: &str) -> Vec<Token> {
        Lexer::new(source).collect()
    }

    fn produce_token(&mut self) -> Token {
        let start = self.cursor.pos();

        let Some(c) = self.cursor.peek() else {
            return Token::new(TokenKind::Eof, start, start);
        };

        match c {
            // ── Trivia ──────────────────────────────────────────────────
            ' ' | '\t' | '\n' | '\r' => {
                self.cursor
                    .eat_while(|c| matches!(c, ' ' | '\t' | '\n' | '\r'));
                Token::new(TokenKind::Whitespace, start, self.cursor.pos())
            }

            // `%` comment, `%{ %}` block comment, `%!` test marker
            '%' => self.lex_percent(start),

            // ── Single-character delimiters ─────────────────────────────
            '(' => self.single(TokenKind::LParen, start),
            ')' => self.single(TokenKind::RParen, start),
            '[' => self.single(TokenKind::LBracket, start),
            ']' => self.single(TokenKind::RBracket, start),
            '{' => self.single(TokenKind::LBrace, start),
            '}' => self.single(TokenKind::RBrace, start),
            ',' => self.single(TokenKind::Comma, start),
            ';' => self.single(TokenKind::Semicolon, start),
            ':' => self.single(TokenKind::Colon, start),
            '#' => self.single(TokenKind::NumberSign, start),
            '^' => self.single(TokenKind::Caret, start),
            '\'' => self.single(TokenKind::Transpose, start),
            '\\' => self.single(TokenKind::Backslash, start),
            '*' => self.single(TokenKind::Star, start),
            '/' => self.single(TokenKind::Slash, start),

            // ── Multi-character operators ───────────────────────────────
            '=' => self.lex_eq(start),
            '!' => self.lex_bang(start),
            '<' => self.lex_angle(start, TokenKind::LAngle, TokenKind::Le),
            '>' => self.lex_angle(start, TokenKind::RAngle, TokenKind::Ge),
            '+' => self.lex_plus(start),
            '-' => self.lex_minus(start),
            '.' => self.lex_period(start),

            // ── Literals ────────────────────────────────────────────────
            '0'..='9' => self.lex_number(start),
            '"' => self.lex_string(start),

            // ── Identifiers, keywords, and `min=`-family reductions ─────
            c if is_ident_start(c) => self.lex_ident(start),

            _ => {
                self.cursor.advance();
                Token::new(TokenKind::Error, start, self.cursor.pos())
            }
        }
    }

    fn single(&mut self, kind: TokenKind, start: u32) -> Token {
        self.cursor.advance();
        Token::new(kind, start, self.cursor.pos())
    }

    /// `%` -> line comment, `%{` -> block comment, `%!` -> test marker.
    fn lex_percent(&mut self, start: u32) -> Token {
        self.cursor.advance(); // consume '%'
        match self.cursor.peek() {
            Some('!') => {
                self.cursor.advance();
                Token::new(TokenKind::Test, start, self.cursor.pos())
            }
            Some('{') => self.lex_block_comment(start),
            _ => {
                self.cursor.eat_while(|c| c != '\n');
                Token::new(TokenKind::Comment, start, self.cursor.pos())
            }
        }
    }

    /// Block comment `%{ ... %}`. Unterminated comments become `Error`.
    fn lex_block_comment(&mut self, start: u32) -> Token {
        self.cursor.advance(); // consume '{'
        loop {
            match self.cursor.peek() {
                None => return Token::new(TokenKind::Error, start, self.cursor.pos()),
                Some('%') if self.cursor.peek_next() == Some('}') => {
                    self.cursor.advance();
                    self.cursor.advance();
                    return Token::new(TokenKind::Comment, start, self.cursor.pos());
                }
                Some(_) => {
                    self.cursor.advance();
                }
            }
        }
    }

    /// `=` -> `Assign`, `==` -> `Eq`
    fn lex_eq(&mut self, start: u32) -> Token {
        self.cursor.advance();
        if self.cursor.peek() == Some('=') {
            self.cursor.advance();
            Token::new(TokenKind::Eq, start, self.cursor.pos())
        } else {
            Token::new(TokenKind::Assign, start, self.cursor.pos())
        }
    }

    /// `!=` -> `Ne`; a bare `!` is an error token.
    fn lex_bang(&mut self, start: u32) -> Token {
        self.cursor.advance();
        if self.cursor.peek() == Some('=') {
            self.cursor.advance();
            Token::new(TokenKind::Ne, start, self.cursor.pos())
        } else {
            Token::new(TokenKind::Error, start, self.cursor.pos())
        }
    }

    /// `<` / `<=` and `>` / `>=`.
    fn lex_angle(&mut self, start: u32, bare: TokenKind, with_eq: TokenKind) -> Token {
        self.cursor.advance();
        if self.cursor.peek() == Some('=') {
            self.cursor.advance();
            Token::new(with_eq, start, self.cursor.pos())
        } else {
            Token::new(bare, start, self.cursor.pos())
        }
    }

    /// `+` -> `Plus`, `+=` -> `PlusReduce`
    fn lex_plus(&mut self, start: u32) -> Token {
        self.cursor.advance();
        if self.cursor.peek() == Some('=') {
            self.cursor.advance();
            Token::new(TokenKind::PlusReduce, start, self.cursor.pos())
        } else {
            Token::new(TokenKind::Plus, start, self.cursor.pos())
        }
    }

    /// `-` -> `Minus`, `->` -> `RArrow`
    fn lex_minus(&mut self, start: u32) -> Token {
        self.cursor.advance();
        if self.cursor.peek() == Some('>') {
            self.cursor.advance();
            Token::new(TokenKind::RArrow, start, self.cursor.pos())
        } else {
            Token::new(TokenKind::Minus, start, self.cursor.pos())
        }
    }

    /// `.` -> `Period`, `.*` -> `DotStar`, `./` -> `DotSlash`
    fn lex_period(&mut self, start: u32) -> Token {
        self.cursor.advance();
        match self.cursor.peek() {
            Some('*') => {
                self.cursor.advance();
                Token::new(TokenKind::DotStar, start, self.cursor.pos())
            }
            Some('/') => {
                self.cursor.advance();
                Token::new(TokenKind::DotSlash, start, self.cursor.pos())
            }
            _ => Token::new(TokenKind::Period, start, self.cursor.pos()),
        }
    }

    /// Decimal integer or float. A `.` makes a float only when followed by a
    /// digit, so `x[1].field` still lexes the period separately. Scientific
    /// notation (`1e5`, `2.5e-3`) produces a float.
    fn lex_number(&mut self, start: u32) -> Token {
        self.cursor.eat_while(|c| c.is_ascii_digit());

        let mut is_float = false;
        if self.cursor.peek() == Some('.')
            && self.cursor.peek_next().is_some_and(|c| c.is_ascii_digit())
        {
            is_float = true;
            self.cursor.advance(); // '.'
            self.cursor.eat_while(|c| c.is_ascii_digit());
        }

        if matches!(self.cursor.peek(), Some('e' | 'E')) {
            let after_e = self.cursor.peek_next();
            let digit_after = |c: Option<char>| c.is_some_and(|c| c.is_ascii_digit());
            if digit_after(after_e) || matches!(after_e, Some('+' | '-')) {
                is_float = true;
                self.cursor.advance(); // 'e'
                if matches!(self.cursor.peek(), Some('+' | '-')) {
                    self.cursor.advance();
                }
                self.cursor.eat_while(|c| c.is_ascii_digit());
            }
        }

        let kind = if is_float {
            TokenKind::FloatLiteral
        } else {
            TokenKind::IntLiteral
        };
        Token::new(kind, start, self.cursor.pos())
    }

    /// Double-quoted string with `\` escapes. Unterminated -> `Error`.
    fn lex_string(&mut self, start: u32) -> Token {
        self.cursor.advance(); // opening '"'
        loop {
            match self.cursor.peek() {
                None | Some('\n') => {
                    return Token::new(TokenKind::Error, start, self.cursor.pos());
                }
                Some('"') => {
                    self.cursor.advance();
                    return Token::new(TokenKind::StringLiteral, start, self.cursor.pos());
                }
                Some('\\') => {
                    self.cursor.advance();
                    self.cursor.advance();
                }
                Some(_) => {
                    self.cursor.advance();
                }
            }
        }
    }

    /// Identifier, keyword, or a reduction operator spelled as
    /// `min=`/`max=`/`asyncMin=`/`asyncMax=` (the `=` must be adjacent and
    /// not part of `==`).
    fn lex_ident(&mut self, start: u32) -> Token {
        self.cursor.advance();
        self.cursor.eat_while(is_ident_continue);
        let text = self.cursor.slice(start, self.cursor.pos());

        let reduce_kind = match text {
            "min" => Some(TokenKind::MinReduce),
            "max" => Some(TokenKind::MaxReduce),
            "asyncMin" => Some(TokenKind::AsyncMinReduce),
            "asyncMax" => Some(TokenKind::AsyncMaxReduce),
            _ => None,
        };
        if let Some(kind) = reduce_kind {
            if self.cursor.peek() == Some('=') && self.cursor.peek_next() != Some('=') {
                self.cursor.advance(); // '='
                return Token::new(kind, start, self.cursor.pos());
            }
        }

        let kind = keyword_from_str(text).unwrap_or(TokenKind::Ident);
        Token::new(kind, start, self.cursor.pos())
    }
}

impl<'src> Iterator for Lexer<'src> {
    type Item = Token;

    fn next(&mut self) -> Option<Token> {
        if self.emitted_eof {
            return None;
        }
        let token = self.produce_token();
        if token.kind == TokenKind::Eof {
            self.emitted_eof = true;
        }
        Some(token)
    }
}

fn is_ident_start(c: char) -> bool {
    c.is_alphabetic() || c == '_'
}

fn is_ident_continue(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(source: &str) -> Vec<TokenKind> {
        Lexer::tokenize(source)
            .into_iter()
            .map(|t| t.kind)
            .filter(|k| !k.is_trivia())
            .collect()
    }

    #[test]
    fn lex_const_decl() {
        assert_eq!(
            kinds("const x : int = 5;"),
            vec![
                TokenKind::Const,
                TokenKind::Ident,
                TokenKind::Colon,
                TokenKind::Int,
                TokenKind::Assign,
                TokenKind::IntLiteral,
                TokenKind::Semicolon,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn lex_apply_chain() {
        assert_eq!(
            kinds("edges.from(src).apply(f);"),
            vec![
                TokenKind::Ident,
                TokenKind::Period,
                TokenKind::From,
                TokenKind::LParen,
                TokenKind::Ident,
                TokenKind::RParen,
                TokenKind::Period,
                TokenKind::Apply,
                TokenKind::LParen,
                TokenKind::Ident,
                TokenKind::RParen,
                TokenKind::Semicolon,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn lex_reduce_operators() {
        assert_eq!(
            kinds("a += b; c min= d; e asyncMax= f;"),
            vec![
                TokenKind::Ident,
                TokenKind::PlusReduce,
                TokenKind::Ident,
                TokenKind::Semicolon,
                TokenKind::Ident,
                TokenKind::MinReduce,
                TokenKind::Ident,
                TokenKind::Semicolon,
                TokenKind::Ident,
                TokenKind::AsyncMaxReduce,
                TokenKind::Ident,
                TokenKind::Semicolon,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn min_followed_by_comparison_stays_ident() {
        // `min == x` must not lex as `min=` `= x`.
        assert_eq!(
            kinds("min == x"),
            vec![TokenKind::Ident, TokenKind::Eq, TokenKind::Ident, TokenKind::Eof]
        );
    }

    #[test]
    fn lex_elementwise_and_transpose() {
        assert_eq!(
            kinds("a .* b ./ c' ^ d \\ e"),
            vec![
                TokenKind::Ident,
                TokenKind::DotStar,
                TokenKind::Ident,
                TokenKind::DotSlash,
                TokenKind::Ident,
                TokenKind::Transpose,
                TokenKind::Caret,
                TokenKind::Ident,
                TokenKind::Backslash,
                TokenKind::Ident,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn lex_label_delimiters() {
        assert_eq!(
            kinds("#s1# while"),
            vec![
                TokenKind::NumberSign,
                TokenKind::Ident,
                TokenKind::NumberSign,
                TokenKind::While,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn lex_floats() {
        assert_eq!(
            kinds("1.5 2 0.25e-3 7e2"),
            vec![
                TokenKind::FloatLiteral,
                TokenKind::IntLiteral,
                TokenKind::FloatLiteral,
                TokenKind::FloatLiteral,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn float_dot_requires_digit() {
        // The period only joins a float when a digit follows, so `1.relabel`
        // lexes as an int, a period, and a bare identifier.
        assert_eq!(
            kinds("1.relabel"),
            vec![
                TokenKind::IntLiteral,
                TokenKind::Period,
                TokenKind::Ident,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn lex_comments_and_test_marker() {
        assert_eq!(
            kinds("% a comment\n%{ block %} %! f() == 4;"),
            vec![
                TokenKind::Test,
                TokenKind::Ident,
                TokenKind::LParen,
                TokenKind::RParen,
                TokenKind::Eq,
                TokenKind::IntLiteral,
                TokenKind::Semicolon,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn trivia_preserves_source_text() {
        let source = "const  x = 1; % trailing\n";
        let tokens = Lexer::tokenize(source);
        let rebuilt: String = tokens
            .iter()
            .map(|t| &source[t.span.start as usize..t.span.end as usize])
            .collect();
        assert_eq!(rebuilt, source);
    }

    #[test]
    fn lex_string_literal() {
        assert_eq!(
            kinds(r#"load ("graph.el")"#),
            vec![
                TokenKind::Load,
                TokenKind::LParen,
                TokenKind::StringLiteral,
                TokenKind::RParen,
                TokenKind::Eof,
            ]
        );
    }
}
