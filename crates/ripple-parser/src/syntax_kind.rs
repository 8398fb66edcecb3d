//! SyntaxKind enum for the Ripple CST.
//!
//! A superset of `TokenKind` (mapped to SCREAMING_SNAKE_CASE) plus composite
//! node kinds produced by the parser. The first two values are sentinels
//! used by the event-based parser.

use ripple_common::token::TokenKind;

/// Every kind of syntax element in the Ripple CST.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(u16)]
#[allow(non_camel_case_types)]
pub enum SyntaxKind {
    // ── Sentinels ──────────────────────────────────────────────────────
    /// Placeholder kind for unfinished parser events.
    TOMBSTONE = 0,
    /// Wrapper for tokens skipped during error recovery.
    ERROR_NODE = 1,

    // ── Keywords ───────────────────────────────────────────────────────
    AND_KW,
    APPLY_KW,
    APPLY_MODIFIED_KW,
    APPLY_UPDATE_PRIORITY_KW,
    APPLY_UPDATE_PRIORITY_EXTERN_KW,
    BOOL_KW,
    BREAK_KW,
    COMPLEX_KW,
    CONST_KW,
    DELETE_KW,
    DO_KW,
    DOUBLE_KW,
    DST_FILTER_KW,
    EDGESET_KW,
    ELEMENT_KW,
    ELIF_KW,
    ELSE_KW,
    END_KW,
    EXPORT_KW,
    EXTERN_KW,
    FALSE_KW,
    FILTER_KW,
    FLOAT_KW,
    FOR_KW,
    FROM_KW,
    FUNC_KW,
    GRID_KW,
    IF_KW,
    IN_KW,
    INOUT_KW,
    INT_KW,
    INTERSECTION_KW,
    LIST_KW,
    LOAD_KW,
    MAP_KW,
    MATRIX_KW,
    NEW_KW,
    NOT_KW,
    OPAQUE_KW,
    OR_KW,
    PRINT_KW,
    PRINTLN_KW,
    PRIORITY_QUEUE_KW,
    REDUCE_KW,
    SET_KW,
    SRC_FILTER_KW,
    STRING_KW,
    TENSOR_KW,
    TEST_KW,
    THROUGH_KW,
    TO_KW,
    TRUE_KW,
    UINT_KW,
    UINT_64_KW,
    VAR_KW,
    VECTOR_KW,
    VERTEXSET_KW,
    WHERE_KW,
    WHILE_KW,
    XOR_KW,

    // ── Operators ──────────────────────────────────────────────────────
    /// `=`
    ASSIGN,
    /// `==`
    EQ,
    /// `!=`
    NEQ,
    /// `<=`
    LE,
    /// `>=`
    GE,
    /// `<`
    L_ANGLE,
    /// `>`
    R_ANGLE,
    PLUS,
    MINUS,
    STAR,
    SLASH,
    BACKSLASH,
    DOT_STAR,
    DOT_SLASH,
    CARET,
    /// `'`
    TRANSPOSE,
    R_ARROW,
    NUMBER_SIGN,
    PLUS_REDUCE,
    MIN_REDUCE,
    MAX_REDUCE,
    ASYNC_MIN_REDUCE,
    ASYNC_MAX_REDUCE,
    PERIOD,
    COMMA,
    SEMICOLON,
    COLON,

    // ── Delimiters ─────────────────────────────────────────────────────
    L_PAREN,
    R_PAREN,
    L_BRACKET,
    R_BRACKET,
    L_BRACE,
    R_BRACE,

    // ── Literals and identifiers ───────────────────────────────────────
    IDENT,
    INT_LITERAL,
    FLOAT_LITERAL,
    STRING_LITERAL,

    // ── Trivia and special ─────────────────────────────────────────────
    WHITESPACE,
    COMMENT,
    EOF,
    ERROR,

    // ── Composite: program elements ────────────────────────────────────
    /// Root node of a parsed source file.
    PROGRAM,
    /// `element Vertex ... end`
    ELEMENT_TYPE_DECL,
    /// A field inside an element declaration: `rank : vector{Vertex}(float);`
    FIELD_DECL,
    /// `extern vertices : vertexset{Vertex};`
    EXTERN_DECL,
    /// `[export|extern] func name<G>(args) -> (results) body end`
    FUNC_DECL,
    /// `<T, 0:N>` on a function declaration.
    GENERIC_PARAM_LIST,
    /// One generic parameter, possibly range-tagged (`0 : N`).
    GENERIC_PARAM,
    /// `(a : int, b : float)`
    PARAM_LIST,
    /// One `name : type` binding in a parameter or result list.
    PARAM,
    /// `-> (y : int)` result bindings.
    RESULT_LIST,
    /// `const name [: type] [= init];`
    CONST_DECL,
    /// `var name [: type] [= init];`
    VAR_DECL,
    /// `%! func(args) == expected;`
    TEST_DECL,
    /// A name in a definition position.
    NAME,

    // ── Composite: statements ──────────────────────────────────────────
    STMT_BLOCK,
    /// `# label # stmt`
    LABELED_STMT,
    /// The `# ident #` part of a labeled statement.
    STMT_LABEL,
    IF_STMT,
    /// `else ...` or `elif ...` continuation of an if statement.
    ELSE_CLAUSE,
    WHILE_STMT,
    /// `do body end while cond`
    DO_WHILE_STMT,
    /// `for i in lo:hi body end`
    FOR_STMT,
    /// The `lo:hi` domain of a for statement.
    RANGE_DOMAIN,
    PRINT_STMT,
    BREAK_STMT,
    /// `delete expr;`
    DELETE_STMT,
    EXPR_STMT,
    /// `lhs1, lhs2 = expr;`
    ASSIGN_STMT,
    /// `lhs += expr;` and the min=/max=/async variants.
    REDUCE_STMT,

    // ── Composite: expressions ─────────────────────────────────────────
    /// Two-operand expression with the operator token in between.
    BINARY_EXPR,
    /// N-ary equality/relational chain: `a < b <= c`.
    EQ_EXPR,
    /// `not expr`
    NOT_EXPR,
    /// Unary `-`/`+` sign.
    NEG_EXPR,
    /// Postfix `'`.
    TRANSPOSE_EXPR,
    /// `tensor[indices]`
    TENSOR_READ_EXPR,
    /// `expr.field`
    FIELD_READ_EXPR,
    /// `expr.method(args)`
    METHOD_CALL_EXPR,
    /// `f(args)` or `f<V>(args)` or `expr.f(args)` when `f` is a declared
    /// function.
    CALL_EXPR,
    /// The apply family: `expr.apply(f)`, `.applyModified(f, field[, b])`,
    /// `.applyUpdatePriority(f)`, `.applyUpdatePriorityExtern(f)`.
    APPLY_EXPR,
    /// `expr.where(p)` / `expr.filter(p)`
    WHERE_EXPR,
    /// `expr.from(f)` / `expr.srcFilter(f)` -- absorbed by a following apply.
    FROM_FILTER,
    /// `expr.to(f)` / `expr.dstFilter(f)` -- absorbed by a following apply.
    TO_FILTER,
    /// `intersection(a, b, na, nb [, ref])`
    INTERSECTION_EXPR,
    /// `load (path)`
    LOAD_EXPR,
    /// `map f to S [through T] [reduce +]`
    MAP_EXPR,
    /// `new vertexset{Elt}([n])`
    VERTEX_SET_ALLOC_EXPR,
    /// `new list{T}([n])`
    LIST_ALLOC_EXPR,
    /// `new vector[...]{Elt}(scalar)()`
    VECTOR_ALLOC_EXPR,
    /// `new priority_queue{Elt}(prio)(...)`
    PRIORITY_QUEUE_ALLOC_EXPR,
    PAREN_EXPR,
    /// Identifier used as an expression.
    VAR_EXPR,
    /// Identifier bound to a range generic parameter.
    RANGE_CONST,
    /// Int/float/bool/string literal.
    LITERAL,
    /// Dense tensor literal `[1, 2; 3, 4]`, possibly nested.
    TENSOR_LITERAL,
    /// `t(0)` where `t` is tuple-typed.
    UNNAMED_TUPLE_READ_EXPR,
    /// `t.elem` where `t` is tuple-typed.
    NAMED_TUPLE_READ_EXPR,
    ARG_LIST,

    // ── Composite: types ───────────────────────────────────────────────
    SCALAR_TYPE,
    /// tensor/vector/matrix block type, with optional element anchor.
    ND_TENSOR_TYPE,
    /// A bare identifier used as an element type.
    ELEMENT_TYPE,
    /// `vertexset{Vertex}`
    VERTEX_SET_TYPE,
    /// `edgeset{Edge}(Vertex, Vertex [, weight])`
    EDGE_SET_TYPE,
    /// `list{T}`
    LIST_TYPE,
    /// `set{E}(endpoints)` -- homogeneous or heterogeneous.
    SET_TYPE,
    /// `grid[d]{E}(S)`
    GRID_SET_TYPE,
    /// `(a : A, b : B)`
    NAMED_TUPLE_TYPE,
    /// `(E * n)`
    UNNAMED_TUPLE_TYPE,
    /// One `name : element` entry of a named tuple type.
    TUPLE_ELEMENT,
    /// The integer length of an unnamed tuple type.
    TUPLE_LENGTH,
    /// `priority_queue{Elt}(prio)`
    PRIORITY_QUEUE_TYPE,
    OPAQUE_TYPE,
    /// Integer index set in a tensor type.
    RANGE_INDEX_SET,
    /// Named index set (a set-valued identifier).
    SET_INDEX_SET,
    /// One endpoint of an unstructured set type.
    ENDPOINT,
}

impl SyntaxKind {
    /// Whether this kind is trivia (preserved in the CST, invisible to the
    /// parser's lookahead).
    pub fn is_trivia(self) -> bool {
        matches!(self, SyntaxKind::WHITESPACE | SyntaxKind::COMMENT)
    }
}

impl From<TokenKind> for SyntaxKind {
    fn from(kind: TokenKind) -> Self {
        match kind {
            TokenKind::And => SyntaxKind::AND_KW,
            TokenKind::Apply => SyntaxKind::APPLY_KW,
            TokenKind::ApplyModified => SyntaxKind::APPLY_MODIFIED_KW,
            TokenKind::ApplyUpdatePriority => SyntaxKind::APPLY_UPDATE_PRIORITY_KW,
            TokenKind::ApplyUpdatePriorityExtern => {
                SyntaxKind::APPLY_UPDATE_PRIORITY_EXTERN_KW
            }
            TokenKind::Bool => SyntaxKind::BOOL_KW,
            TokenKind::Break => SyntaxKind::BREAK_KW,
            TokenKind::Complex => SyntaxKind::COMPLEX_KW,
            TokenKind::Const => SyntaxKind::CONST_KW,
            TokenKind::Delete => SyntaxKind::DELETE_KW,
            TokenKind::Do => SyntaxKind::DO_KW,
            TokenKind::Double => SyntaxKind::DOUBLE_KW,
            TokenKind::DstFilter => SyntaxKind::DST_FILTER_KW,
            TokenKind::EdgeSet => SyntaxKind::EDGESET_KW,
            TokenKind::Element => SyntaxKind::ELEMENT_KW,
            TokenKind::Elif => SyntaxKind::ELIF_KW,
            TokenKind::Else => SyntaxKind::ELSE_KW,
            TokenKind::End => SyntaxKind::END_KW,
            TokenKind::Export => SyntaxKind::EXPORT_KW,
            TokenKind::Extern => SyntaxKind::EXTERN_KW,
            TokenKind::False => SyntaxKind::FALSE_KW,
            TokenKind::Filter => SyntaxKind::FILTER_KW,
            TokenKind::Float => SyntaxKind::FLOAT_KW,
            TokenKind::For => SyntaxKind::FOR_KW,
            TokenKind::From => SyntaxKind::FROM_KW,
            TokenKind::Func => SyntaxKind::FUNC_KW,
            TokenKind::Grid => SyntaxKind::GRID_KW,
            TokenKind::If => SyntaxKind::IF_KW,
            TokenKind::In => SyntaxKind::IN_KW,
            TokenKind::InOut => SyntaxKind::INOUT_KW,
            TokenKind::Int => SyntaxKind::INT_KW,
            TokenKind::Intersection => SyntaxKind::INTERSECTION_KW,
            TokenKind::List => SyntaxKind::LIST_KW,
            TokenKind::Load => SyntaxKind::LOAD_KW,
            TokenKind::Map => SyntaxKind::MAP_KW,
            TokenKind::Matrix => SyntaxKind::MATRIX_KW,
            TokenKind::New => SyntaxKind::NEW_KW,
            TokenKind::Not => SyntaxKind::NOT_KW,
            TokenKind::Opaque => SyntaxKind::OPAQUE_KW,
            TokenKind::Or => SyntaxKind::OR_KW,
            TokenKind::Print => SyntaxKind::PRINT_KW,
            TokenKind::Println => SyntaxKind::PRINTLN_KW,
            TokenKind::PriorityQueue => SyntaxKind::PRIORITY_QUEUE_KW,
            TokenKind::Reduce => SyntaxKind::REDUCE_KW,
            TokenKind::Set => SyntaxKind::SET_KW,
            TokenKind::SrcFilter => SyntaxKind::SRC_FILTER_KW,
            TokenKind::StringKw => SyntaxKind::STRING_KW,
            TokenKind::Tensor => SyntaxKind::TENSOR_KW,
            TokenKind::Test => SyntaxKind::TEST_KW,
            TokenKind::Through => SyntaxKind::THROUGH_KW,
            TokenKind::To => SyntaxKind::TO_KW,
            TokenKind::True => SyntaxKind::TRUE_KW,
            TokenKind::Uint => SyntaxKind::UINT_KW,
            TokenKind::Uint64 => SyntaxKind::UINT_64_KW,
            TokenKind::Var => SyntaxKind::VAR_KW,
            TokenKind::Vector => SyntaxKind::VECTOR_KW,
            TokenKind::VertexSet => SyntaxKind::VERTEXSET_KW,
            TokenKind::Where => SyntaxKind::WHERE_KW,
            TokenKind::While => SyntaxKind::WHILE_KW,
            TokenKind::Xor => SyntaxKind::XOR_KW,
            TokenKind::Assign => SyntaxKind::ASSIGN,
            TokenKind::Eq => SyntaxKind::EQ,
            TokenKind::Ne => SyntaxKind::NEQ,
            TokenKind::Le => SyntaxKind::LE,
            TokenKind::Ge => SyntaxKind::GE,
            TokenKind::LAngle => SyntaxKind::L_ANGLE,
            TokenKind::RAngle => SyntaxKind::R_ANGLE,
            TokenKind::Plus => SyntaxKind::PLUS,
            TokenKind::Minus => SyntaxKind::MINUS,
            TokenKind::Star => SyntaxKind::STAR,
            TokenKind::Slash => SyntaxKind::SLASH,
            TokenKind::Backslash => SyntaxKind::BACKSLASH,
            TokenKind::DotStar => SyntaxKind::DOT_STAR,
            TokenKind::DotSlash => SyntaxKind::DOT_SLASH,
            TokenKind::Caret => SyntaxKind::CARET,
            TokenKind::Transpose => SyntaxKind::TRANSPOSE,
            TokenKind::RArrow => SyntaxKind::R_ARROW,
            TokenKind::NumberSign => SyntaxKind::NUMBER_SIGN,
            TokenKind::PlusReduce => SyntaxKind::PLUS_REDUCE,
            TokenKind::MinReduce => SyntaxKind::MIN_REDUCE,
            TokenKind::MaxReduce => SyntaxKind::MAX_REDUCE,
            TokenKind::AsyncMinReduce => SyntaxKind::ASYNC_MIN_REDUCE,
            TokenKind::AsyncMaxReduce => SyntaxKind::ASYNC_MAX_REDUCE,
            TokenKind::Period => SyntaxKind::PERIOD,
            TokenKind::Comma => SyntaxKind::COMMA,
            TokenKind::Semicolon => SyntaxKind::SEMICOLON,
            TokenKind::Colon => SyntaxKind::COLON,
            TokenKind::LParen => SyntaxKind::L_PAREN,
            TokenKind::RParen => SyntaxKind::R_PAREN,
            TokenKind::LBracket => SyntaxKind::L_BRACKET,
            TokenKind::RBracket => SyntaxKind::R_BRACKET,
            TokenKind::LBrace => SyntaxKind::L_BRACE,
            TokenKind::RBrace => SyntaxKind::R_BRACE,
            TokenKind::Ident => SyntaxKind::IDENT,
            TokenKind::IntLiteral => SyntaxKind::INT_LITERAL,
            TokenKind::FloatLiteral => SyntaxKind::FLOAT_LITERAL,
            TokenKind::StringLiteral => SyntaxKind::STRING_LITERAL,
            TokenKind::Whitespace => SyntaxKind::WHITESPACE,
            TokenKind::Comment => SyntaxKind::COMMENT,
            TokenKind::Eof => SyntaxKind::EOF,
            TokenKind::Error => SyntaxKind::ERROR,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sentinels_are_first_values() {
        assert_eq!(SyntaxKind::TOMBSTONE as u16, 0);
        assert_eq!(SyntaxKind::ERROR_NODE as u16, 1);
    }

    #[test]
    fn trivia_kinds_identified() {
        assert!(SyntaxKind::WHITESPACE.is_trivia());
        assert!(SyntaxKind::COMMENT.is_trivia());
        assert!(!SyntaxKind::IDENT.is_trivia());
        assert!(!SyntaxKind::PROGRAM.is_trivia());
    }

    #[test]
    fn token_kinds_convert() {
        assert_eq!(SyntaxKind::from(TokenKind::Func), SyntaxKind::FUNC_KW);
        assert_eq!(SyntaxKind::from(TokenKind::ApplyModified), SyntaxKind::APPLY_MODIFIED_KW);
        assert_eq!(SyntaxKind::from(TokenKind::MinReduce), SyntaxKind::MIN_REDUCE);
        assert_eq!(SyntaxKind::from(TokenKind::Transpose), SyntaxKind::TRANSPOSE);
        assert_eq!(SyntaxKind::from(TokenKind::Eof), SyntaxKind::EOF);
    }
}
