//! Typed AST nodes for type annotations.

use crate::ast::{ast_node, child_node, child_nodes, AstNode};
use crate::cst::{SyntaxNode, SyntaxToken};
use crate::syntax_kind::SyntaxKind;

/// Any type node.
#[derive(Debug, Clone)]
pub enum Type {
    Scalar(ScalarType),
    NdTensor(NdTensorType),
    Element(ElementType),
    VertexSet(VertexSetType),
    EdgeSet(EdgeSetType),
    List(ListType),
    Set(SetType),
    Grid(GridSetType),
    NamedTuple(NamedTupleType),
    UnnamedTuple(UnnamedTupleType),
    PriorityQueue(PriorityQueueType),
    Opaque(OpaqueType),
}

impl Type {
    pub fn cast(node: SyntaxNode) -> Option<Self> {
        use SyntaxKind::*;
        let ty = match node.kind() {
            SCALAR_TYPE => Type::Scalar(ScalarType { syntax: node }),
            ND_TENSOR_TYPE => Type::NdTensor(NdTensorType { syntax: node }),
            ELEMENT_TYPE => Type::Element(ElementType { syntax: node }),
            VERTEX_SET_TYPE => Type::VertexSet(VertexSetType { syntax: node }),
            EDGE_SET_TYPE => Type::EdgeSet(EdgeSetType { syntax: node }),
            LIST_TYPE => Type::List(ListType { syntax: node }),
            SET_TYPE => Type::Set(SetType { syntax: node }),
            GRID_SET_TYPE => Type::Grid(GridSetType { syntax: node }),
            NAMED_TUPLE_TYPE => Type::NamedTuple(NamedTupleType { syntax: node }),
            UNNAMED_TUPLE_TYPE => Type::UnnamedTuple(UnnamedTupleType { syntax: node }),
            PRIORITY_QUEUE_TYPE => Type::PriorityQueue(PriorityQueueType { syntax: node }),
            OPAQUE_TYPE => Type::Opaque(OpaqueType { syntax: node }),
            _ => return None,
        };
        Some(ty)
    }

    pub fn syntax(&self) -> &SyntaxNode {
        match self {
            Type::Scalar(n) => &n.syntax,
            Type::NdTensor(n) => &n.syntax,
            Type::Element(n) => &n.syntax,
            Type::VertexSet(n) => &n.syntax,
            Type::EdgeSet(n) => &n.syntax,
            Type::List(n) => &n.syntax,
            Type::Set(n) => &n.syntax,
            Type::Grid(n) => &n.syntax,
            Type::NamedTuple(n) => &n.syntax,
            Type::UnnamedTuple(n) => &n.syntax,
            Type::PriorityQueue(n) => &n.syntax,
            Type::Opaque(n) => &n.syntax,
        }
    }
}

/// The scalar kinds of the DSL.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScalarKind {
    Int,
    UInt,
    UInt64,
    Float,
    Double,
    Bool,
    Complex,
    String,
}

ast_node!(ScalarType, SCALAR_TYPE);

impl ScalarType {
    pub fn token(&self) -> Option<SyntaxToken> {
        self.syntax
            .children_with_tokens()
            .filter_map(|it| it.into_token())
            .find(|t| !t.kind().is_trivia())
    }

    pub fn kind(&self) -> Option<ScalarKind> {
        let kind = match self.token()?.kind() {
            SyntaxKind::INT_KW => ScalarKind::Int,
            SyntaxKind::UINT_KW => ScalarKind::UInt,
            SyntaxKind::UINT_64_KW => ScalarKind::UInt64,
            SyntaxKind::FLOAT_KW => ScalarKind::Float,
            SyntaxKind::DOUBLE_KW => ScalarKind::Double,
            SyntaxKind::BOOL_KW => ScalarKind::Bool,
            SyntaxKind::COMPLEX_KW => ScalarKind::Complex,
            SyntaxKind::STRING_KW => ScalarKind::String,
            _ => return None,
        };
        Some(kind)
    }
}

ast_node!(NdTensorType, ND_TENSOR_TYPE);

impl NdTensorType {
    /// The element anchor (`{Vertex}`) marking a property array.
    pub fn element(&self) -> Option<ElementType> {
        child_node(&self.syntax)
    }

    /// Index sets between the brackets, as written.
    pub fn index_sets(&self) -> Vec<IndexSet> {
        child_nodes::<IndexSetNode>(&self.syntax)
            .map(|n| n.value())
            .collect()
    }

    /// The nested block type: another tensor type or a scalar.
    pub fn block(&self) -> Option<Type> {
        self.syntax.children().find_map(Type::cast)
    }

    /// The innermost scalar of the block nesting.
    pub fn scalar(&self) -> Option<ScalarType> {
        match self.block()? {
            Type::Scalar(s) => Some(s),
            Type::NdTensor(t) => t.scalar(),
            _ => None,
        }
    }

    pub fn transposed(&self) -> bool {
        crate::ast::child_token(&self.syntax, SyntaxKind::TRANSPOSE).is_some()
    }
}

/// A resolved index set in a type position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IndexSet {
    /// A literal length.
    Range(i64),
    /// A named set.
    Set(String),
}

/// Internal wrapper that casts either index-set node kind.
#[derive(Debug, Clone)]
pub struct IndexSetNode {
    syntax: SyntaxNode,
}

impl AstNode for IndexSetNode {
    fn cast(node: SyntaxNode) -> Option<Self> {
        if matches!(
            node.kind(),
            SyntaxKind::RANGE_INDEX_SET | SyntaxKind::SET_INDEX_SET
        ) {
            Some(Self { syntax: node })
        } else {
            None
        }
    }

    fn syntax(&self) -> &SyntaxNode {
        &self.syntax
    }
}

impl IndexSetNode {
    pub fn value(&self) -> IndexSet {
        let text = self.syntax.text().to_string();
        if self.syntax.kind() == SyntaxKind::RANGE_INDEX_SET {
            IndexSet::Range(text.trim().parse().unwrap_or(0))
        } else {
            IndexSet::Set(text.trim().to_string())
        }
    }
}

ast_node!(ElementType, ELEMENT_TYPE);

impl ElementType {
    pub fn name(&self) -> Option<String> {
        crate::ast::child_token(&self.syntax, SyntaxKind::IDENT).map(|t| t.text().to_string())
    }
}

ast_node!(VertexSetType, VERTEX_SET_TYPE);

impl VertexSetType {
    pub fn element(&self) -> Option<ElementType> {
        child_node(&self.syntax)
    }
}

ast_node!(EdgeSetType, EDGE_SET_TYPE);

impl EdgeSetType {
    /// The edge element type inside the braces.
    pub fn edge_element(&self) -> Option<ElementType> {
        child_node(&self.syntax)
    }

    /// The source endpoint element type.
    pub fn src_element(&self) -> Option<ElementType> {
        child_nodes(&self.syntax).nth(1)
    }

    /// The destination endpoint element type.
    pub fn dst_element(&self) -> Option<ElementType> {
        child_nodes(&self.syntax).nth(2)
    }

    /// The optional weight scalar.
    pub fn weight(&self) -> Option<ScalarType> {
        child_node(&self.syntax)
    }
}

ast_node!(ListType, LIST_TYPE);

impl ListType {
    pub fn element_ty(&self) -> Option<Type> {
        self.syntax.children().find_map(Type::cast)
    }
}

ast_node!(SetType, SET_TYPE);

impl SetType {
    pub fn element(&self) -> Option<ElementType> {
        child_node(&self.syntax)
    }

    /// Whether this is the homogeneous `set{E}(V * n)` form.
    pub fn is_homogeneous(&self) -> bool {
        crate::ast::child_token(&self.syntax, SyntaxKind::STAR).is_some()
    }

    pub fn endpoints(&self) -> Vec<String> {
        self.syntax
            .children()
            .filter(|n| n.kind() == SyntaxKind::ENDPOINT)
            .map(|n| n.text().to_string().trim().to_string())
            .collect()
    }
}

ast_node!(GridSetType, GRID_SET_TYPE);

impl GridSetType {
    pub fn element(&self) -> Option<ElementType> {
        child_node(&self.syntax)
    }

    pub fn dimensions(&self) -> Option<i64> {
        crate::ast::child_token(&self.syntax, SyntaxKind::INT_LITERAL)
            .and_then(|t| t.text().parse().ok())
    }
}

ast_node!(NamedTupleType, NAMED_TUPLE_TYPE);

impl NamedTupleType {
    pub fn elements(&self) -> impl Iterator<Item = TupleElement> + '_ {
        child_nodes(&self.syntax)
    }
}

ast_node!(TupleElement, TUPLE_ELEMENT);

impl TupleElement {
    pub fn name(&self) -> Option<String> {
        crate::ast::child_token(&self.syntax, SyntaxKind::IDENT).map(|t| t.text().to_string())
    }

    pub fn element(&self) -> Option<ElementType> {
        child_node(&self.syntax)
    }
}

ast_node!(UnnamedTupleType, UNNAMED_TUPLE_TYPE);

impl UnnamedTupleType {
    pub fn element(&self) -> Option<ElementType> {
        child_node(&self.syntax)
    }

    pub fn length(&self) -> Option<i64> {
        self.syntax
            .children()
            .find(|n| n.kind() == SyntaxKind::TUPLE_LENGTH)
            .and_then(|n| n.text().to_string().trim().parse().ok())
    }
}

ast_node!(PriorityQueueType, PRIORITY_QUEUE_TYPE);

impl PriorityQueueType {
    pub fn element(&self) -> Option<ElementType> {
        child_node(&self.syntax)
    }

    pub fn priority(&self) -> Option<ScalarType> {
        child_node(&self.syntax)
    }
}

ast_node!(OpaqueType, OPAQUE_TYPE);
