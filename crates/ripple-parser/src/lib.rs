//! Ripple parser: recursive-descent parser producing a lossless CST.
//!
//! Transforms the token stream from `ripple-lexer` into a rowan-based
//! concrete syntax tree. Whitespace and comments are preserved, so the
//! tree's text reproduces the input byte for byte; the typed AST layer in
//! [`ast`] is the FIR the rest of the compiler works against.

pub mod ast;
pub mod cst;
pub mod error;
mod parser;
pub mod symbols;
pub mod syntax_kind;

pub use cst::{SyntaxElement, SyntaxNode, SyntaxToken};
pub use error::ParseError;
pub use syntax_kind::SyntaxKind;

use ripple_lexer::Lexer;

/// Result of parsing a Ripple source file.
pub struct Parse {
    green: rowan::GreenNode,
    errors: Vec<ParseError>,
}

impl Parse {
    /// The syntax tree root.
    pub fn syntax(&self) -> SyntaxNode {
        SyntaxNode::new_root(self.green.clone())
    }

    /// The typed program root.
    pub fn program(&self) -> ast::item::Program {
        ast::AstNode::cast(self.syntax()).expect("the parser always produces a PROGRAM root")
    }

    pub fn errors(&self) -> &[ParseError] {
        &self.errors
    }

    pub fn ok(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Parse a Ripple source file into a CST.
pub fn parse(source: &str) -> Parse {
    let tokens = Lexer::tokenize(source);
    let mut p = parser::Parser::new(tokens, source);
    parser::parse_program(&mut p);
    let (green, errors) = p.build_tree();
    Parse { green, errors }
}

/// Render a syntax tree as an indented kind dump, for tests and debugging.
pub fn debug_tree(node: &SyntaxNode) -> String {
    let mut out = String::new();
    debug_tree_rec(node, 0, &mut out);
    out
}

fn debug_tree_rec(node: &SyntaxNode, depth: usize, out: &mut String) {
    use std::fmt::Write;
    let _ = writeln!(out, "{}{:?}", "  ".repeat(depth), node.kind());
    for child in node.children_with_tokens() {
        match child {
            rowan::NodeOrToken::Node(n) => debug_tree_rec(&n, depth + 1, out),
            rowan::NodeOrToken::Token(t) => {
                if !t.kind().is_trivia() {
                    let _ = writeln!(
                        out,
                        "{}{:?} {:?}",
                        "  ".repeat(depth + 1),
                        t.kind(),
                        t.text()
                    );
                }
            }
        }
    }
}
