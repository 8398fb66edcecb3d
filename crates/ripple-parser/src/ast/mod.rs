//! Typed AST layer on top of the rowan CST -- the compiler's FIR.
//!
//! Each wrapper is a newtype over `SyntaxNode` with typed accessors that
//! navigate children by kind; `cast()` is a single kind check. The lowering
//! pass and the tests work against this layer rather than raw syntax nodes.

pub mod expr;
pub mod item;
pub mod stmt;
pub mod types;

use crate::cst::{SyntaxNode, SyntaxToken};
use crate::syntax_kind::SyntaxKind;

/// Trait for typed AST nodes wrapping a rowan `SyntaxNode`.
pub trait AstNode: Sized {
    /// Try to cast a generic node into this typed wrapper.
    fn cast(node: SyntaxNode) -> Option<Self>;

    /// The underlying syntax node.
    fn syntax(&self) -> &SyntaxNode;
}

/// Generate the boilerplate for a typed AST wrapper.
macro_rules! ast_node {
    ($name:ident, $kind:ident) => {
        #[derive(Debug, Clone)]
        pub struct $name {
            pub(crate) syntax: SyntaxNode,
        }

        impl AstNode for $name {
            fn cast(node: SyntaxNode) -> Option<Self> {
                if node.kind() == SyntaxKind::$kind {
                    Some(Self { syntax: node })
                } else {
                    None
                }
            }

            fn syntax(&self) -> &SyntaxNode {
                &self.syntax
            }
        }
    };
}

pub(crate) use ast_node;

/// First child node castable to `N`.
pub fn child_node<N: AstNode>(parent: &SyntaxNode) -> Option<N> {
    parent.children().find_map(N::cast)
}

/// All child nodes castable to `N`.
pub fn child_nodes<'a, N: AstNode + 'a>(parent: &'a SyntaxNode) -> impl Iterator<Item = N> + 'a {
    parent.children().filter_map(N::cast)
}

/// First child token of the given kind.
pub fn child_token(parent: &SyntaxNode, kind: SyntaxKind) -> Option<SyntaxToken> {
    parent
        .children_with_tokens()
        .filter_map(|it| it.into_token())
        .find(|it| it.kind() == kind)
}

/// All child IDENT tokens, in order.
pub fn ident_tokens(parent: &SyntaxNode) -> impl Iterator<Item = SyntaxToken> {
    parent
        .children_with_tokens()
        .filter_map(|it| it.into_token())
        .filter(|it| it.kind() == SyntaxKind::IDENT)
}
