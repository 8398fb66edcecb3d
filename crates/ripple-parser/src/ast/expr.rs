//! Typed AST nodes for expressions, including the graph operations: the
//! apply family, where/filter, from/to filters, allocation expressions, and
//! tensor reads.

use crate::ast::types::{ElementType, NdTensorType, ScalarType, Type};
use crate::ast::{ast_node, child_node, child_token, ident_tokens, AstNode};
use crate::cst::{SyntaxNode, SyntaxToken};
use crate::syntax_kind::SyntaxKind;

/// Any expression node.
#[derive(Debug, Clone)]
pub enum Expr {
    Literal(Literal),
    TensorLiteral(TensorLiteral),
    Var(VarExpr),
    RangeConst(RangeConst),
    Paren(ParenExpr),
    Binary(BinaryExpr),
    EqChain(EqExpr),
    Not(NotExpr),
    Neg(NegExpr),
    Transpose(TransposeExpr),
    TensorRead(TensorReadExpr),
    FieldRead(FieldReadExpr),
    MethodCall(MethodCallExpr),
    Call(CallExpr),
    Apply(ApplyExpr),
    Where(WhereExpr),
    FromFilter(FromFilter),
    ToFilter(ToFilter),
    Intersection(IntersectionExpr),
    Load(LoadExpr),
    Map(MapExpr),
    VertexSetAlloc(VertexSetAllocExpr),
    ListAlloc(ListAllocExpr),
    VectorAlloc(VectorAllocExpr),
    PriorityQueueAlloc(PriorityQueueAllocExpr),
    UnnamedTupleRead(UnnamedTupleReadExpr),
    NamedTupleRead(NamedTupleReadExpr),
}

impl Expr {
    pub fn cast(node: SyntaxNode) -> Option<Self> {
        use SyntaxKind::*;
        let expr = match node.kind() {
            LITERAL => Expr::Literal(Literal { syntax: node }),
            TENSOR_LITERAL => Expr::TensorLiteral(TensorLiteral { syntax: node }),
            VAR_EXPR => Expr::Var(VarExpr { syntax: node }),
            RANGE_CONST => Expr::RangeConst(RangeConst { syntax: node }),
            PAREN_EXPR => Expr::Paren(ParenExpr { syntax: node }),
            BINARY_EXPR => Expr::Binary(BinaryExpr { syntax: node }),
            EQ_EXPR => Expr::EqChain(EqExpr { syntax: node }),
            NOT_EXPR => Expr::Not(NotExpr { syntax: node }),
            NEG_EXPR => Expr::Neg(NegExpr { syntax: node }),
            TRANSPOSE_EXPR => Expr::Transpose(TransposeExpr { syntax: node }),
            TENSOR_READ_EXPR => Expr::TensorRead(TensorReadExpr { syntax: node }),
            FIELD_READ_EXPR => Expr::FieldRead(FieldReadExpr { syntax: node }),
            METHOD_CALL_EXPR => Expr::MethodCall(MethodCallExpr { syntax: node }),
            CALL_EXPR => Expr::Call(CallExpr { syntax: node }),
            APPLY_EXPR => Expr::Apply(ApplyExpr { syntax: node }),
            WHERE_EXPR => Expr::Where(WhereExpr { syntax: node }),
            FROM_FILTER => Expr::FromFilter(FromFilter { syntax: node }),
            TO_FILTER => Expr::ToFilter(ToFilter { syntax: node }),
            INTERSECTION_EXPR => Expr::Intersection(IntersectionExpr { syntax: node }),
            LOAD_EXPR => Expr::Load(LoadExpr { syntax: node }),
            MAP_EXPR => Expr::Map(MapExpr { syntax: node }),
            VERTEX_SET_ALLOC_EXPR => {
                Expr::VertexSetAlloc(VertexSetAllocExpr { syntax: node })
            }
            LIST_ALLOC_EXPR => Expr::ListAlloc(ListAllocExpr { syntax: node }),
            VECTOR_ALLOC_EXPR => Expr::VectorAlloc(VectorAllocExpr { syntax: node }),
            PRIORITY_QUEUE_ALLOC_EXPR => {
                Expr::PriorityQueueAlloc(PriorityQueueAllocExpr { syntax: node })
            }
            UNNAMED_TUPLE_READ_EXPR => {
                Expr::UnnamedTupleRead(UnnamedTupleReadExpr { syntax: node })
            }
            NAMED_TUPLE_READ_EXPR => {
                Expr::NamedTupleRead(NamedTupleReadExpr { syntax: node })
            }
            _ => return None,
        };
        Some(expr)
    }

    pub fn syntax(&self) -> &SyntaxNode {
        match self {
            Expr::Literal(n) => &n.syntax,
            Expr::TensorLiteral(n) => &n.syntax,
            Expr::Var(n) => &n.syntax,
            Expr::RangeConst(n) => &n.syntax,
            Expr::Paren(n) => &n.syntax,
            Expr::Binary(n) => &n.syntax,
            Expr::EqChain(n) => &n.syntax,
            Expr::Not(n) => &n.syntax,
            Expr::Neg(n) => &n.syntax,
            Expr::Transpose(n) => &n.syntax,
            Expr::TensorRead(n) => &n.syntax,
            Expr::FieldRead(n) => &n.syntax,
            Expr::MethodCall(n) => &n.syntax,
            Expr::Call(n) => &n.syntax,
            Expr::Apply(n) => &n.syntax,
            Expr::Where(n) => &n.syntax,
            Expr::FromFilter(n) => &n.syntax,
            Expr::ToFilter(n) => &n.syntax,
            Expr::Intersection(n) => &n.syntax,
            Expr::Load(n) => &n.syntax,
            Expr::Map(n) => &n.syntax,
            Expr::VertexSetAlloc(n) => &n.syntax,
            Expr::ListAlloc(n) => &n.syntax,
            Expr::VectorAlloc(n) => &n.syntax,
            Expr::PriorityQueueAlloc(n) => &n.syntax,
            Expr::UnnamedTupleRead(n) => &n.syntax,
            Expr::NamedTupleRead(n) => &n.syntax,
        }
    }
}

// ── Leaves ───────────────────────────────────────────────────────────────

ast_node!(Literal, LITERAL);

impl Literal {
    /// The literal token (INT_LITERAL, FLOAT_LITERAL, STRING_LITERAL,
    /// TRUE_KW, FALSE_KW, or a sign followed by a number inside tensor
    /// literals).
    pub fn token(&self) -> Option<SyntaxToken> {
        self.syntax
            .children_with_tokens()
            .filter_map(|it| it.into_token())
            .find(|t| !t.kind().is_trivia())
    }
}

ast_node!(TensorLiteral, TENSOR_LITERAL);

impl TensorLiteral {
    pub fn elements(&self) -> impl Iterator<Item = Expr> + '_ {
        self.syntax.children().filter_map(Expr::cast)
    }
}

ast_node!(VarExpr, VAR_EXPR);

impl VarExpr {
    pub fn name(&self) -> Option<String> {
        child_token(&self.syntax, SyntaxKind::IDENT).map(|t| t.text().to_string())
    }
}

ast_node!(RangeConst, RANGE_CONST);

impl RangeConst {
    pub fn name(&self) -> Option<String> {
        child_token(&self.syntax, SyntaxKind::IDENT).map(|t| t.text().to_string())
    }
}

ast_node!(ParenExpr, PAREN_EXPR);

impl ParenExpr {
    pub fn inner(&self) -> Option<Expr> {
        self.syntax.children().find_map(Expr::cast)
    }
}

// ── Operators ────────────────────────────────────────────────────────────

ast_node!(BinaryExpr, BINARY_EXPR);

impl BinaryExpr {
    pub fn lhs(&self) -> Option<Expr> {
        self.syntax.children().find_map(Expr::cast)
    }

    pub fn rhs(&self) -> Option<Expr> {
        self.syntax.children().filter_map(Expr::cast).nth(1)
    }

    pub fn op(&self) -> Option<SyntaxToken> {
        self.syntax
            .children_with_tokens()
            .filter_map(|it| it.into_token())
            .find(|t| {
                matches!(
                    t.kind(),
                    SyntaxKind::OR_KW
                        | SyntaxKind::AND_KW
                        | SyntaxKind::XOR_KW
                        | SyntaxKind::PLUS
                        | SyntaxKind::MINUS
                        | SyntaxKind::STAR
                        | SyntaxKind::SLASH
                        | SyntaxKind::BACKSLASH
                        | SyntaxKind::DOT_STAR
                        | SyntaxKind::DOT_SLASH
                        | SyntaxKind::CARET
                )
            })
    }
}

ast_node!(EqExpr, EQ_EXPR);

impl EqExpr {
    /// All operands of the comparison chain. Always `ops().len() + 1`.
    pub fn operands(&self) -> Vec<Expr> {
        self.syntax.children().filter_map(Expr::cast).collect()
    }

    /// The comparison operator tokens, in order.
    pub fn ops(&self) -> Vec<SyntaxToken> {
        self.syntax
            .children_with_tokens()
            .filter_map(|it| it.into_token())
            .filter(|t| {
                matches!(
                    t.kind(),
                    SyntaxKind::EQ
                        | SyntaxKind::NEQ
                        | SyntaxKind::L_ANGLE
                        | SyntaxKind::R_ANGLE
                        | SyntaxKind::LE
                        | SyntaxKind::GE
                )
            })
            .collect()
    }
}

ast_node!(NotExpr, NOT_EXPR);

impl NotExpr {
    pub fn operand(&self) -> Option<Expr> {
        self.syntax.children().find_map(Expr::cast)
    }
}

ast_node!(NegExpr, NEG_EXPR);

impl NegExpr {
    pub fn operand(&self) -> Option<Expr> {
        self.syntax.children().find_map(Expr::cast)
    }

    /// True for `-`, false for unary `+`.
    pub fn negated(&self) -> bool {
        child_token(&self.syntax, SyntaxKind::MINUS).is_some()
    }
}

ast_node!(TransposeExpr, TRANSPOSE_EXPR);

impl TransposeExpr {
    pub fn operand(&self) -> Option<Expr> {
        self.syntax.children().find_map(Expr::cast)
    }
}

// ── Reads, calls, and the method chain ───────────────────────────────────

ast_node!(TensorReadExpr, TENSOR_READ_EXPR);

impl TensorReadExpr {
    pub fn tensor(&self) -> Option<Expr> {
        self.syntax.children().find_map(Expr::cast)
    }

    pub fn indices(&self) -> Vec<Expr> {
        self.syntax.children().filter_map(Expr::cast).skip(1).collect()
    }
}

ast_node!(FieldReadExpr, FIELD_READ_EXPR);

impl FieldReadExpr {
    pub fn receiver(&self) -> Option<Expr> {
        self.syntax.children().find_map(Expr::cast)
    }

    pub fn field(&self) -> Option<String> {
        ident_tokens(&self.syntax).last().map(|t| t.text().to_string())
    }
}

ast_node!(MethodCallExpr, METHOD_CALL_EXPR);

impl MethodCallExpr {
    pub fn receiver(&self) -> Option<Expr> {
        self.syntax.children().find_map(Expr::cast)
    }

    pub fn method_name(&self) -> Option<String> {
        ident_tokens(&self.syntax).next().map(|t| t.text().to_string())
    }

    pub fn args(&self) -> Vec<Expr> {
        arg_list_exprs(&self.syntax)
    }
}

ast_node!(CallExpr, CALL_EXPR);

impl CallExpr {
    /// The receiver expression when this call appears in a `.` chain.
    pub fn receiver(&self) -> Option<Expr> {
        self.syntax.children().find_map(Expr::cast)
    }

    pub fn callee(&self) -> Option<String> {
        ident_tokens(&self.syntax).next().map(|t| t.text().to_string())
    }

    /// Generic index-set arguments of `f<V, E>(…)`.
    pub fn generic_args(&self) -> Vec<String> {
        self.syntax
            .children()
            .filter(|n| {
                matches!(
                    n.kind(),
                    SyntaxKind::SET_INDEX_SET | SyntaxKind::RANGE_INDEX_SET
                )
            })
            .map(|n| n.text().to_string())
            .collect()
    }

    pub fn args(&self) -> Vec<Expr> {
        arg_list_exprs(&self.syntax)
    }
}

/// Expressions inside a node's ARG_LIST child.
fn arg_list_exprs(parent: &SyntaxNode) -> Vec<Expr> {
    parent
        .children()
        .find(|n| n.kind() == SyntaxKind::ARG_LIST)
        .map(|list| list.children().filter_map(Expr::cast).collect())
        .unwrap_or_default()
}

// ── The apply family ─────────────────────────────────────────────────────

/// Which apply operation a chain ends in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplyKind {
    /// `apply` and `applyModified`.
    Regular,
    UpdatePriority,
    UpdatePriorityExtern,
}

ast_node!(ApplyExpr, APPLY_EXPR);

impl ApplyExpr {
    pub fn kind(&self) -> ApplyKind {
        if child_token(&self.syntax, SyntaxKind::APPLY_UPDATE_PRIORITY_KW).is_some() {
            ApplyKind::UpdatePriority
        } else if child_token(&self.syntax, SyntaxKind::APPLY_UPDATE_PRIORITY_EXTERN_KW)
            .is_some()
        {
            ApplyKind::UpdatePriorityExtern
        } else {
            ApplyKind::Regular
        }
    }

    /// Whether this is the `applyModified` form.
    pub fn is_modified(&self) -> bool {
        child_token(&self.syntax, SyntaxKind::APPLY_MODIFIED_KW).is_some()
    }

    /// The applied function name.
    pub fn input_function(&self) -> Option<String> {
        ident_tokens(&self.syntax).next().map(|t| t.text().to_string())
    }

    /// The change-tracking field of `applyModified`.
    pub fn change_tracking_field(&self) -> Option<String> {
        if !self.is_modified() {
            return None;
        }
        ident_tokens(&self.syntax).nth(1).map(|t| t.text().to_string())
    }

    /// The optional deduplication hint of `applyModified`: `Some(true)` for
    /// a literal `true`, `Some(false)` for `false`, `None` when absent.
    pub fn disable_deduplication(&self) -> Option<bool> {
        if child_token(&self.syntax, SyntaxKind::TRUE_KW).is_some() {
            Some(true)
        } else if child_token(&self.syntax, SyntaxKind::FALSE_KW).is_some() {
            Some(false)
        } else {
            None
        }
    }

    /// The receiver with any from/to filter wrappers stripped.
    pub fn target(&self) -> Option<Expr> {
        let mut expr = self.syntax.children().find_map(Expr::cast)?;
        loop {
            expr = match expr {
                Expr::FromFilter(f) => f.inner()?,
                Expr::ToFilter(f) => f.inner()?,
                other => return Some(other),
            };
        }
    }

    /// The source filter buffered by a `from`/`srcFilter` link in this
    /// chain. When several are present the outermost (last written) wins.
    pub fn from_func(&self) -> Option<String> {
        self.find_filter(SyntaxKind::FROM_FILTER)
    }

    /// The destination filter buffered by `to`/`dstFilter`.
    pub fn to_func(&self) -> Option<String> {
        self.find_filter(SyntaxKind::TO_FILTER)
    }

    fn find_filter(&self, kind: SyntaxKind) -> Option<String> {
        let mut expr = self.syntax.children().find_map(Expr::cast)?;
        loop {
            let (node, inner) = match expr {
                Expr::FromFilter(ref f) => (f.syntax.clone(), f.inner()),
                Expr::ToFilter(ref f) => (f.syntax.clone(), f.inner()),
                _ => return None,
            };
            if node.kind() == kind {
                return FromFilter::filter_func_of(&node);
            }
            expr = inner?;
        }
    }
}

ast_node!(WhereExpr, WHERE_EXPR);

impl WhereExpr {
    pub fn target(&self) -> Option<Expr> {
        self.syntax.children().find_map(Expr::cast)
    }

    /// The predicate function name.
    pub fn input_func(&self) -> Option<String> {
        ident_tokens(&self.syntax).next().map(|t| t.text().to_string())
    }
}

ast_node!(FromFilter, FROM_FILTER);

impl FromFilter {
    pub fn inner(&self) -> Option<Expr> {
        self.syntax.children().find_map(Expr::cast)
    }

    pub fn input_func(&self) -> Option<String> {
        Self::filter_func_of(&self.syntax)
    }

    fn filter_func_of(node: &SyntaxNode) -> Option<String> {
        ident_tokens(node).next().map(|t| t.text().to_string())
    }
}

ast_node!(ToFilter, TO_FILTER);

impl ToFilter {
    pub fn inner(&self) -> Option<Expr> {
        self.syntax.children().find_map(Expr::cast)
    }

    pub fn input_func(&self) -> Option<String> {
        ident_tokens(&self.syntax).next().map(|t| t.text().to_string())
    }
}

// ── Graph expression forms ───────────────────────────────────────────────

ast_node!(IntersectionExpr, INTERSECTION_EXPR);

impl IntersectionExpr {
    /// `a, b, num_a, num_b [, reference]` in order.
    pub fn args(&self) -> Vec<Expr> {
        self.syntax.children().filter_map(Expr::cast).collect()
    }
}

ast_node!(LoadExpr, LOAD_EXPR);

impl LoadExpr {
    pub fn path(&self) -> Option<Expr> {
        self.syntax.children().find_map(Expr::cast)
    }
}

ast_node!(MapExpr, MAP_EXPR);

impl MapExpr {
    pub fn func(&self) -> Option<String> {
        ident_tokens(&self.syntax).next().map(|t| t.text().to_string())
    }

    /// The target set and, when present, the `through` set.
    pub fn index_sets(&self) -> Vec<String> {
        self.syntax
            .children()
            .filter(|n| {
                matches!(
                    n.kind(),
                    SyntaxKind::SET_INDEX_SET | SyntaxKind::RANGE_INDEX_SET
                )
            })
            .map(|n| n.text().to_string())
            .collect()
    }

    pub fn is_reduced(&self) -> bool {
        child_token(&self.syntax, SyntaxKind::REDUCE_KW).is_some()
    }

    pub fn args(&self) -> Vec<Expr> {
        arg_list_exprs(&self.syntax)
    }
}

// ── Allocation expressions ───────────────────────────────────────────────

ast_node!(VertexSetAllocExpr, VERTEX_SET_ALLOC_EXPR);

impl VertexSetAllocExpr {
    pub fn element_type(&self) -> Option<ElementType> {
        child_node(&self.syntax)
    }

    pub fn num_elements(&self) -> Option<Expr> {
        self.syntax.children().find_map(Expr::cast)
    }
}

ast_node!(ListAllocExpr, LIST_ALLOC_EXPR);

impl ListAllocExpr {
    pub fn element_ty(&self) -> Option<Type> {
        self.syntax.children().find_map(Type::cast)
    }

    pub fn num_elements(&self) -> Option<Expr> {
        self.syntax.children().find_map(Expr::cast)
    }
}

ast_node!(VectorAllocExpr, VECTOR_ALLOC_EXPR);

impl VectorAllocExpr {
    /// The vector block type the allocation was written as.
    pub fn vector_type(&self) -> Option<NdTensorType> {
        child_node(&self.syntax)
    }
}

ast_node!(PriorityQueueAllocExpr, PRIORITY_QUEUE_ALLOC_EXPR);

impl PriorityQueueAllocExpr {
    pub fn element_type(&self) -> Option<ElementType> {
        child_node(&self.syntax)
    }

    pub fn priority_type(&self) -> Option<ScalarType> {
        child_node(&self.syntax)
    }

    /// The six expression arguments (dup_within, dup_across, bucket_ord,
    /// priority_ord, init_bucket, start_node); the vector function is an
    /// identifier and comes from [`Self::vector_function`].
    pub fn args(&self) -> Vec<Expr> {
        self.syntax.children().filter_map(Expr::cast).collect()
    }

    pub fn vector_function(&self) -> Option<String> {
        ident_tokens(&self.syntax).next().map(|t| t.text().to_string())
    }
}

// ── Tuple reads ──────────────────────────────────────────────────────────

ast_node!(UnnamedTupleReadExpr, UNNAMED_TUPLE_READ_EXPR);

impl UnnamedTupleReadExpr {
    pub fn tuple(&self) -> Option<VarExpr> {
        child_node(&self.syntax)
    }

    pub fn index(&self) -> Option<Expr> {
        self.syntax.children().filter_map(Expr::cast).nth(1)
    }
}

ast_node!(NamedTupleReadExpr, NAMED_TUPLE_READ_EXPR);

impl NamedTupleReadExpr {
    pub fn tuple(&self) -> Option<VarExpr> {
        child_node(&self.syntax)
    }

    pub fn elem(&self) -> Option<String> {
        ident_tokens(&self.syntax).last().map(|t| t.text().to_string())
    }
}
