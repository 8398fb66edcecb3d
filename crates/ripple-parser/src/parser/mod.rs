//! Event-based parser for Ripple.
//!
//! The parser consumes the lexer's token stream and produces events
//! (Open/Close/Advance) that are converted into a rowan green tree by
//! [`Parser::build_tree`]. Parse functions call `open()` to start a node,
//! `advance()` to consume tokens, and `close()` to finish a node with its
//! actual kind; `open_before()` wraps a previously completed node (used for
//! left-associative operators and the postfix method chain).
//!
//! # Error recovery
//!
//! `expect()` failure records a [`ParseError`] and sets an error flag. Each
//! production has a recovery point that calls [`Parser::recover_to`] with a
//! skip-set: skipped tokens are wrapped in an `ERROR_NODE`, the flag is
//! cleared, and parsing continues at the synchronizing token. Statement
//! productions skip to `;`, block productions to `end`/`elif`/`else`, and
//! the program loop to the next top-level keyword.
//!
//! # Symbol table
//!
//! The parser carries a [`SymbolTable`] because identifier categories drive
//! parsing decisions (tuple reads, call-vs-variable, generic calls).
//! Productions that open scopes record the depth on entry and truncate on
//! exit, so the table stays balanced across error recovery.

pub(crate) mod expressions;
pub(crate) mod items;
pub(crate) mod stmts;
pub(crate) mod types;

use ripple_common::span::Span;
use ripple_common::token::Token;

use crate::error::ParseError;
use crate::symbols::{IdentKind, SymbolTable};
use crate::syntax_kind::SyntaxKind;

/// A parser event, later replayed into a rowan green tree.
#[derive(Debug)]
enum Event {
    /// Start a CST node. `kind` is TOMBSTONE until patched by `close()`.
    Open {
        kind: SyntaxKind,
        forward_parent: Option<usize>,
    },
    /// Finish the current CST node.
    Close,
    /// Consume the current token.
    Advance,
}

/// Marker for a started but not-yet-closed node.
#[derive(Debug, Clone, Copy)]
pub(crate) struct MarkOpened {
    index: usize,
}

/// Marker for a completed node, usable with `open_before()`.
#[derive(Debug, Clone, Copy)]
pub(crate) struct MarkClosed {
    index: usize,
}

pub(crate) struct Parser<'src> {
    tokens: Vec<Token>,
    pos: usize,
    events: Vec<Event>,
    source: &'src str,
    errors: Vec<ParseError>,
    has_error: bool,
    pub(crate) symbols: SymbolTable,
}

impl<'src> Parser<'src> {
    pub(crate) fn new(tokens: Vec<Token>, source: &'src str) -> Self {
        let mut symbols = SymbolTable::new();
        seed_intrinsic_functions(&mut symbols);
        Self {
            tokens,
            pos: 0,
            events: Vec::new(),
            source,
            errors: Vec::new(),
            has_error: false,
            symbols,
        }
    }

    // ── Lookahead ──────────────────────────────────────────────────────

    /// Kind of the current significant token (trivia skipped).
    pub(crate) fn current(&self) -> SyntaxKind {
        self.nth(0)
    }

    /// Kind of the Nth significant token ahead; `EOF` past the end.
    pub(crate) fn nth(&self, n: usize) -> SyntaxKind {
        let mut pos = self.pos;
        let mut remaining = n;
        while pos < self.tokens.len() {
            let kind = self.tokens[pos].kind;
            if kind.is_trivia() {
                pos += 1;
                continue;
            }
            if remaining == 0 {
                return SyntaxKind::from(kind);
            }
            remaining -= 1;
            pos += 1;
        }
        SyntaxKind::EOF
    }

    /// Text of the current significant token.
    pub(crate) fn current_text(&self) -> &str {
        self.nth_text(0)
    }

    /// Text of the Nth significant token ahead.
    pub(crate) fn nth_text(&self, n: usize) -> &str {
        let mut pos = self.pos;
        let mut remaining = n;
        while pos < self.tokens.len() {
            if self.tokens[pos].kind.is_trivia() {
                pos += 1;
                continue;
            }
            if remaining == 0 {
                let span = &self.tokens[pos].span;
                return &self.source[span.start as usize..span.end as usize];
            }
            remaining -= 1;
            pos += 1;
        }
        ""
    }

    /// Span of the current significant token.
    pub(crate) fn current_span(&self) -> Span {
        let mut pos = self.pos;
        while pos < self.tokens.len() && self.tokens[pos].kind.is_trivia() {
            pos += 1;
        }
        if pos < self.tokens.len() {
            self.tokens[pos].span
        } else {
            let end = self.source.len() as u32;
            Span::new(end, end)
        }
    }

    pub(crate) fn at(&self, kind: SyntaxKind) -> bool {
        self.current() == kind
    }

    pub(crate) fn at_any(&self, kinds: &[SyntaxKind]) -> bool {
        kinds.contains(&self.current())
    }

    // ── Node management ────────────────────────────────────────────────

    pub(crate) fn open(&mut self) -> MarkOpened {
        let mark = MarkOpened {
            index: self.events.len(),
        };
        self.events.push(Event::Open {
            kind: SyntaxKind::TOMBSTONE,
            forward_parent: None,
        });
        mark
    }

    /// Start a node BEFORE a previously completed one, wrapping it.
    ///
    /// Uses the "forward parent" technique: the completed node's Open event
    /// is linked forward to the new event instead of physically inserting
    /// into the event list.
    pub(crate) fn open_before(&mut self, completed: MarkClosed) -> MarkOpened {
        let mark = MarkOpened {
            index: self.events.len(),
        };
        self.events.push(Event::Open {
            kind: SyntaxKind::TOMBSTONE,
            forward_parent: None,
        });
        if let Event::Open { forward_parent, .. } = &mut self.events[completed.index] {
            *forward_parent = Some(mark.index);
        }
        mark
    }

    pub(crate) fn close(&mut self, m: MarkOpened, kind: SyntaxKind) -> MarkClosed {
        if let Event::Open { kind: slot, .. } = &mut self.events[m.index] {
            *slot = kind;
        }
        self.events.push(Event::Close);
        MarkClosed { index: m.index }
    }

    // ── Token consumption ──────────────────────────────────────────────

    /// Consume the current significant token, emitting Advance events for
    /// any trivia in front of it so trivia lands in the CST.
    pub(crate) fn advance(&mut self) {
        while self.pos < self.tokens.len() && self.tokens[self.pos].kind.is_trivia() {
            self.events.push(Event::Advance);
            self.pos += 1;
        }
        if self.pos < self.tokens.len() {
            self.events.push(Event::Advance);
            self.pos += 1;
        }
    }

    /// Consume the current token wrapped in an ERROR_NODE.
    pub(crate) fn advance_with_error(&mut self, message: &str) {
        let m = self.open();
        self.error(message);
        self.advance();
        self.close(m, SyntaxKind::ERROR_NODE);
    }

    /// Consume `kind` or record an error (flag set, no token consumed).
    pub(crate) fn expect(&mut self, kind: SyntaxKind) -> bool {
        if self.at(kind) {
            self.advance();
            true
        } else {
            self.error(&format!(
                "expected {} but got {}",
                kind_name(kind),
                kind_name(self.current())
            ));
            false
        }
    }

    /// Consume `kind` if present; no error otherwise.
    pub(crate) fn eat(&mut self, kind: SyntaxKind) -> bool {
        if self.at(kind) {
            self.advance();
            true
        } else {
            false
        }
    }

    // ── Error reporting and recovery ───────────────────────────────────

    pub(crate) fn error(&mut self, message: &str) {
        let span = self.current_span();
        self.errors.push(ParseError::new(message, span));
        self.has_error = true;
    }

    pub(crate) fn has_error(&self) -> bool {
        self.has_error
    }

    /// Resynchronize after an error: skip tokens (wrapped in an ERROR_NODE)
    /// until one of `kinds` or EOF is current, then clear the error flag so
    /// parsing continues. Does nothing when no error is pending.
    pub(crate) fn recover_to(&mut self, kinds: &[SyntaxKind]) {
        if !self.has_error {
            return;
        }
        if !self.at_any(kinds) && !self.at(SyntaxKind::EOF) {
            let m = self.open();
            while !self.at_any(kinds) && !self.at(SyntaxKind::EOF) {
                self.advance();
            }
            self.close(m, SyntaxKind::ERROR_NODE);
        }
        self.has_error = false;
    }

    /// Close out a production that ends with `kind`: on the success path
    /// this is a plain `expect`; with an error pending it skips to `kind`
    /// and consumes it (the "skip to `;` and eat it" pattern).
    pub(crate) fn recover_past(&mut self, kind: SyntaxKind) {
        if self.has_error {
            self.recover_to(&[kind]);
            self.eat(kind);
        } else {
            self.expect(kind);
        }
    }

    // ── Tree building ──────────────────────────────────────────────────

    /// Replay the events into a rowan `GreenNode`, following forward-parent
    /// links so `open_before()` wrappers nest correctly.
    pub(crate) fn build_tree(mut self) -> (rowan::GreenNode, Vec<ParseError>) {
        let mut builder = rowan::GreenNodeBuilder::new();
        let mut token_pos: usize = 0;
        let mut forward_parents: Vec<(usize, SyntaxKind)> = Vec::new();

        let mut i = 0;
        while i < self.events.len() {
            match self.events[i] {
                Event::Open {
                    kind,
                    forward_parent,
                } => {
                    if forward_parent.is_some() {
                        forward_parents.clear();
                        let mut current = i;
                        loop {
                            let (fk, fp) = match self.events[current] {
                                Event::Open {
                                    kind,
                                    forward_parent,
                                } => (kind, forward_parent),
                                _ => unreachable!("forward parent must be an Open event"),
                            };
                            forward_parents.push((current, fk));
                            match fp {
                                Some(next) => current = next,
                                None => break,
                            }
                        }
                        // Tombstone the wrapper events so they are skipped
                        // when reached in order, then open outermost-first.
                        for &(fp_idx, _) in forward_parents.iter().skip(1) {
                            if let Event::Open {
                                kind, forward_parent, ..
                            } = &mut self.events[fp_idx]
                            {
                                *kind = SyntaxKind::TOMBSTONE;
                                *forward_parent = None;
                            }
                        }
                        if let Event::Open { forward_parent, .. } = &mut self.events[i] {
                            *forward_parent = None;
                        }
                        for &(_, fk) in forward_parents.iter().rev() {
                            if fk != SyntaxKind::TOMBSTONE {
                                builder.start_node(rowan::SyntaxKind(fk as u16));
                            }
                        }
                    } else if kind != SyntaxKind::TOMBSTONE {
                        builder.start_node(rowan::SyntaxKind(kind as u16));
                    }
                }
                Event::Close => {
                    builder.finish_node();
                }
                Event::Advance => {
                    if token_pos < self.tokens.len() {
                        let token = &self.tokens[token_pos];
                        let syntax_kind = SyntaxKind::from(token.kind);
                        let text =
                            &self.source[token.span.start as usize..token.span.end as usize];
                        builder.token(rowan::SyntaxKind(syntax_kind as u16), text);
                        token_pos += 1;
                    }
                }
            }
            i += 1;
        }

        (builder.finish(), self.errors)
    }
}

/// Functions the runtime library provides for plain call position; the
/// parser must know them so `max(a, b)` parses as a call.
fn seed_intrinsic_functions(symbols: &mut SymbolTable) {
    for name in [
        "fabs",
        "startTimer",
        "stopTimer",
        "atoi",
        "floor",
        "log",
        "to_double",
        "max",
        "writeMin",
        "getRandomOutNgh",
        "getRandomInNgh",
        "serialMinimumSpanningTree",
    ] {
        symbols.insert(name, IdentKind::Function);
    }
}

/// Human-readable token-kind names for error messages.
fn kind_name(kind: SyntaxKind) -> &'static str {
    match kind {
        SyntaxKind::IDENT => "an identifier",
        SyntaxKind::INT_LITERAL => "an integer literal",
        SyntaxKind::FLOAT_LITERAL => "a float literal",
        SyntaxKind::STRING_LITERAL => "a string literal",
        SyntaxKind::SEMICOLON => "`;`",
        SyntaxKind::COLON => "`:`",
        SyntaxKind::COMMA => "`,`",
        SyntaxKind::PERIOD => "`.`",
        SyntaxKind::ASSIGN => "`=`",
        SyntaxKind::EQ => "`==`",
        SyntaxKind::L_PAREN => "`(`",
        SyntaxKind::R_PAREN => "`)`",
        SyntaxKind::L_BRACKET => "`[`",
        SyntaxKind::R_BRACKET => "`]`",
        SyntaxKind::L_BRACE => "`{`",
        SyntaxKind::R_BRACE => "`}`",
        SyntaxKind::L_ANGLE => "`<`",
        SyntaxKind::R_ANGLE => "`>`",
        SyntaxKind::R_ARROW => "`->`",
        SyntaxKind::NUMBER_SIGN => "`#`",
        SyntaxKind::END_KW => "`end`",
        SyntaxKind::DO_KW => "`do`",
        SyntaxKind::IN_KW => "`in`",
        SyntaxKind::TO_KW => "`to`",
        SyntaxKind::FUNC_KW => "`func`",
        SyntaxKind::WHILE_KW => "`while`",
        SyntaxKind::EOF => "end of file",
        _ => "a different token",
    }
}

// ── Top-level parsing ──────────────────────────────────────────────────

/// Skip-set for the program loop: the tokens that can begin a program
/// element.
const PROGRAM_ELEMENT_START: &[SyntaxKind] = &[
    SyntaxKind::TEST_KW,
    SyntaxKind::FUNC_KW,
    SyntaxKind::EXPORT_KW,
    SyntaxKind::ELEMENT_KW,
    SyntaxKind::EXTERN_KW,
    SyntaxKind::CONST_KW,
];

/// Parse a complete program: a sequence of program elements.
pub(crate) fn parse_program(p: &mut Parser) {
    let root = p.open();

    while !p.at(SyntaxKind::EOF) {
        match p.current() {
            SyntaxKind::TEST_KW => items::parse_test_decl(p),
            SyntaxKind::FUNC_KW | SyntaxKind::EXPORT_KW => items::parse_func_decl(p),
            SyntaxKind::ELEMENT_KW => items::parse_element_type_decl(p),
            SyntaxKind::EXTERN_KW => items::parse_extern_func_or_decl(p),
            SyntaxKind::CONST_KW => items::parse_const_decl(p),
            _ => {
                p.advance_with_error("expected a program element");
            }
        }
        // Program-level resynchronization: skip to the next element keyword.
        p.recover_to(PROGRAM_ELEMENT_START);
    }
    p.advance(); // EOF token

    p.close(root, SyntaxKind::PROGRAM);
}

#[cfg(test)]
mod tests {
    use super::*;
    use ripple_lexer::Lexer;

    #[test]
    fn smoke_test_build_tree() {
        let source = "const x = 5;";
        let tokens = Lexer::tokenize(source);
        let mut parser = Parser::new(tokens, source);

        let root = parser.open();
        let decl = parser.open();
        parser.advance(); // const
        parser.advance(); // x
        parser.advance(); // =
        parser.advance(); // 5
        parser.advance(); // ;
        parser.close(decl, SyntaxKind::CONST_DECL);
        parser.advance(); // Eof
        parser.close(root, SyntaxKind::PROGRAM);

        let (green, errors) = parser.build_tree();
        assert!(errors.is_empty());

        let root_node = crate::cst::SyntaxNode::new_root(green);
        assert_eq!(root_node.kind(), SyntaxKind::PROGRAM);
        // Trivia is carried along, so the tree reproduces the source.
        assert_eq!(root_node.text().to_string(), source);
        let children: Vec<_> = root_node.children().collect();
        assert_eq!(children.len(), 1);
        assert_eq!(children[0].kind(), SyntaxKind::CONST_DECL);
    }

    #[test]
    fn lookahead_skips_trivia() {
        let source = "edges % comment\n  .apply";
        let tokens = Lexer::tokenize(source);
        let parser = Parser::new(tokens, source);
        assert_eq!(parser.current(), SyntaxKind::IDENT);
        assert_eq!(parser.nth(1), SyntaxKind::PERIOD);
        assert_eq!(parser.nth(2), SyntaxKind::APPLY_KW);
        assert_eq!(parser.nth(3), SyntaxKind::EOF);
        assert_eq!(parser.current_text(), "edges");
        assert_eq!(parser.nth_text(2), "apply");
    }

    #[test]
    fn expect_records_error() {
        let source = "const x";
        let tokens = Lexer::tokenize(source);
        let mut parser = Parser::new(tokens, source);
        assert!(parser.expect(SyntaxKind::CONST_KW));
        assert!(!parser.has_error());
        assert!(!parser.expect(SyntaxKind::CONST_KW));
        assert!(parser.has_error());
    }

    #[test]
    fn recover_to_wraps_skipped_tokens() {
        let source = "@ @ ;";
        let tokens = Lexer::tokenize(source);
        let mut parser = Parser::new(tokens, source);

        let root = parser.open();
        parser.error("bad start");
        parser.recover_to(&[SyntaxKind::SEMICOLON]);
        assert!(!parser.has_error());
        assert!(parser.at(SyntaxKind::SEMICOLON));
        parser.advance();
        parser.advance(); // Eof
        parser.close(root, SyntaxKind::PROGRAM);

        let (green, errors) = parser.build_tree();
        assert_eq!(errors.len(), 1);
        let root_node = crate::cst::SyntaxNode::new_root(green);
        assert!(root_node
            .children()
            .any(|n| n.kind() == SyntaxKind::ERROR_NODE));
    }

    #[test]
    fn open_before_wraps_completed_node() {
        let source = "f(4)";
        let tokens = Lexer::tokenize(source);
        let mut parser = Parser::new(tokens, source);

        let root = parser.open();
        let name = parser.open();
        parser.advance(); // f
        let name_closed = parser.close(name, SyntaxKind::VAR_EXPR);
        let call = parser.open_before(name_closed);
        parser.advance(); // (
        parser.advance(); // 4
        parser.advance(); // )
        parser.close(call, SyntaxKind::CALL_EXPR);
        parser.advance(); // Eof
        parser.close(root, SyntaxKind::PROGRAM);

        let (green, errors) = parser.build_tree();
        assert!(errors.is_empty());
        let root_node = crate::cst::SyntaxNode::new_root(green);
        let call_node = root_node.children().next().unwrap();
        assert_eq!(call_node.kind(), SyntaxKind::CALL_EXPR);
        assert_eq!(
            call_node.children().next().unwrap().kind(),
            SyntaxKind::VAR_EXPR
        );
    }
}
