//! Rowan-based concrete syntax tree types for Ripple.
//!
//! `RippleLanguage` connects [`SyntaxKind`] to rowan's generic tree
//! infrastructure; the aliases below are what the rest of the compiler uses.

use crate::syntax_kind::SyntaxKind;

/// Marker type for Ripple's language in rowan's generic tree system.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum RippleLanguage {}

impl rowan::Language for RippleLanguage {
    type Kind = SyntaxKind;

    fn kind_from_raw(raw: rowan::SyntaxKind) -> Self::Kind {
        // SyntaxKind is #[repr(u16)] with contiguous values; rowan only hands
        // back kinds previously produced by kind_to_raw.
        unsafe { std::mem::transmute::<u16, SyntaxKind>(raw.0) }
    }

    fn kind_to_raw(kind: Self::Kind) -> rowan::SyntaxKind {
        rowan::SyntaxKind(kind as u16)
    }
}

/// A CST node (interior node with children).
pub type SyntaxNode = rowan::SyntaxNode<RippleLanguage>;

/// A CST token (leaf with text).
pub type SyntaxToken = rowan::SyntaxToken<RippleLanguage>;

/// Either a node or a token.
pub type SyntaxElement = rowan::SyntaxElement<RippleLanguage>;
