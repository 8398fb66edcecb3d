//! Mid-level IR (MIR) definitions.
//!
//! The MIR is a reduced tree parallel to the syntax-level FIR: scalar and
//! set types, arithmetic, tensor reads, control flow, calls, reductions and
//! compare-and-swap, and a small closed family of graph apply nodes.
//! Backends operate on this tree only; the frontend's identifier categories
//! have already been resolved away by lowering.

pub mod context;
pub mod direction;
pub mod hoist;
pub mod lower;
pub mod visit;

use std::fmt;

// ── Types ─────────────────────────────────────────────────────────────

/// Scalar kinds of the DSL.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScalarKind {
    Int,
    UInt,
    UInt64,
    Float,
    Double,
    Bool,
    String,
}

impl fmt::Display for ScalarKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ScalarKind::Int => "int",
            ScalarKind::UInt => "uint",
            ScalarKind::UInt64 => "uint_64",
            ScalarKind::Float => "float",
            ScalarKind::Double => "double",
            ScalarKind::Bool => "bool",
            ScalarKind::String => "string",
        };
        write!(f, "{s}")
    }
}

/// A MIR type.
#[derive(Debug, Clone, PartialEq)]
pub enum MirType {
    Scalar(ScalarKind),
    /// A reference to a declared element type.
    Element(String),
    VertexSet {
        element: String,
    },
    EdgeSet {
        element: String,
        src: String,
        dst: String,
        weight: Option<ScalarKind>,
    },
    /// A tensor; with an element anchor it is a per-element property array.
    Vector {
        element: Option<String>,
        scalar: Box<MirType>,
        size: Option<i64>,
    },
    List(Box<MirType>),
    PriorityQueue {
        element: String,
        priority: ScalarKind,
    },
    /// Named (`field` set) or positional tuple of element types.
    Tuple(Vec<(Option<String>, String)>),
    Opaque,
}

impl MirType {
    /// Whether this is an element-anchored vector, i.e. a property array.
    pub fn is_property_array(&self) -> bool {
        matches!(
            self,
            MirType::Vector {
                element: Some(_),
                ..
            }
        )
    }
}

/// A typed variable binding (parameter, result, field).
#[derive(Debug, Clone, PartialEq)]
pub struct MirVar {
    pub name: String,
    pub ty: MirType,
    /// Parameters marked `inout` are passed by reference.
    pub is_inout: bool,
}

impl MirVar {
    pub fn new(name: impl Into<String>, ty: MirType) -> Self {
        Self {
            name: name.into(),
            ty,
            is_inout: false,
        }
    }

    pub fn inout(name: impl Into<String>, ty: MirType) -> Self {
        Self {
            name: name.into(),
            ty,
            is_inout: true,
        }
    }
}

// ── Expressions ───────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
    Pow,
    And,
    Or,
    Xor,
}

impl fmt::Display for BinOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            BinOp::Add => "+",
            BinOp::Sub => "-",
            BinOp::Mul => "*",
            BinOp::Div => "/",
            BinOp::Pow => "^",
            BinOp::And => "&&",
            BinOp::Or => "||",
            BinOp::Xor => "^",
        };
        write!(f, "{s}")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Neg,
    Not,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CmpOp {
    Eq,
    Ne,
    Lt,
    Gt,
    Le,
    Ge,
}

impl fmt::Display for CmpOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            CmpOp::Eq => "==",
            CmpOp::Ne => "!=",
            CmpOp::Lt => "<",
            CmpOp::Gt => ">",
            CmpOp::Le => "<=",
            CmpOp::Ge => ">=",
        };
        write!(f, "{s}")
    }
}

/// How an edgeset apply traverses the graph. Left unresolved by lowering
/// and filled in by the direction-choice pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Unresolved,
    Push,
    Pull,
}

/// Which apply operation was written.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplyKind {
    Regular,
    UpdatePriority,
    UpdatePriorityExtern,
}

/// An edgeset apply: run `input_function` over the edges of `target`, with
/// optional source/destination filters and change tracking.
#[derive(Debug, Clone, PartialEq)]
pub struct EdgeSetApply {
    pub target: Box<MirExpr>,
    pub input_function: String,
    /// Source filter: a predicate function or a frontier vertexset name.
    pub from_func: Option<String>,
    /// Destination filter function name.
    pub to_func: Option<String>,
    /// Property array whose writes populate the output frontier.
    pub change_tracking_field: Option<String>,
    pub disable_deduplication: bool,
    pub kind: ApplyKind,
    pub direction: Direction,
}

/// Index of a tuple read.
#[derive(Debug, Clone, PartialEq)]
pub enum TupleIndex {
    Named(String),
    Positional(Box<MirExpr>),
}

#[derive(Debug, Clone, PartialEq)]
pub enum MirExpr {
    IntLit(i64),
    FloatLit(f64),
    BoolLit(bool),
    StringLit(String),
    Var(String),
    Binary {
        op: BinOp,
        lhs: Box<MirExpr>,
        rhs: Box<MirExpr>,
    },
    Unary {
        op: UnaryOp,
        operand: Box<MirExpr>,
    },
    /// N-ary comparison chain; `operands.len() == ops.len() + 1`.
    Compare {
        operands: Vec<MirExpr>,
        ops: Vec<CmpOp>,
    },
    TensorRead {
        target: Box<MirExpr>,
        indices: Vec<MirExpr>,
    },
    TupleRead {
        tuple: Box<MirExpr>,
        index: TupleIndex,
    },
    Call {
        name: String,
        args: Vec<MirExpr>,
    },
    VertexSetAlloc {
        element: String,
        num_elements: Option<Box<MirExpr>>,
    },
    ListAlloc {
        element_ty: MirType,
        num_elements: Option<Box<MirExpr>>,
    },
    VectorAlloc {
        element: Option<String>,
        scalar: Box<MirType>,
        size: Option<i64>,
    },
    PriorityQueueAlloc {
        element: String,
        priority: ScalarKind,
        dup_within_bucket: Box<MirExpr>,
        dup_across_bucket: Box<MirExpr>,
        vector_function: String,
        bucket_ordering: Box<MirExpr>,
        priority_ordering: Box<MirExpr>,
        init_bucket: Box<MirExpr>,
        starting_node: Box<MirExpr>,
    },
    Intersection {
        a: Box<MirExpr>,
        b: Box<MirExpr>,
        num_a: Box<MirExpr>,
        num_b: Box<MirExpr>,
        reference: Option<Box<MirExpr>>,
    },
    /// Run a predicate over a vertexset producing a new vertexset.
    VertexSetApply {
        target: Box<MirExpr>,
        input_function: String,
    },
    /// Deduplicate the vertexset produced by the inner expression.
    VertexSetDedup {
        target: Box<MirExpr>,
    },
    EdgeSetApply(EdgeSetApply),
}

// ── Statements ────────────────────────────────────────────────────────

/// Reduction operators lowered from `+=`, `min=`, `max=`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReduceOp {
    Sum,
    Min,
    Max,
}

/// The compare-and-swap flavors lowered from `asyncMin=` / `asyncMax=`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CasOp {
    Min,
    Max,
}

/// A statement: base fields (the user label) by composition, the node
/// itself as a tagged kind.
#[derive(Debug, Clone, PartialEq)]
pub struct Stmt {
    pub label: Option<String>,
    pub kind: StmtKind,
}

impl Stmt {
    pub fn new(kind: StmtKind) -> Self {
        Self { label: None, kind }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum StmtKind {
    VarDecl {
        name: String,
        ty: Option<MirType>,
        init: Option<MirExpr>,
        is_const: bool,
    },
    Assign {
        targets: Vec<MirExpr>,
        value: MirExpr,
    },
    Reduce {
        target: MirExpr,
        value: MirExpr,
        op: ReduceOp,
    },
    CompareAndSwap {
        target: MirExpr,
        value: MirExpr,
        op: CasOp,
    },
    For {
        loop_var: String,
        lower: MirExpr,
        upper: MirExpr,
        body: Vec<Stmt>,
    },
    While {
        cond: MirExpr,
        body: Vec<Stmt>,
    },
    DoWhile {
        body: Vec<Stmt>,
        cond: MirExpr,
    },
    If {
        cond: MirExpr,
        then_body: Vec<Stmt>,
        else_body: Option<Vec<Stmt>>,
    },
    Print {
        args: Vec<MirExpr>,
        newline: bool,
    },
    Break,
    Expr(MirExpr),
    /// Runtime choice between two traversal alternatives, typically one
    /// push and one pull launch.
    HybridGpu {
        condition: MirExpr,
        push_stmt: Box<Stmt>,
        pull_stmt: Box<Stmt>,
    },
}

// ── Functions ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub struct MirFunction {
    pub name: String,
    pub params: Vec<MirVar>,
    pub results: Vec<MirVar>,
    /// `None` iff the function is external.
    pub body: Option<Vec<Stmt>>,
    pub exported: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn property_array_detection() {
        let prop = MirType::Vector {
            element: Some("Vertex".into()),
            scalar: Box::new(MirType::Scalar(ScalarKind::Float)),
            size: None,
        };
        assert!(prop.is_property_array());

        let plain = MirType::Vector {
            element: None,
            scalar: Box::new(MirType::Scalar(ScalarKind::Int)),
            size: Some(8),
        };
        assert!(!plain.is_property_array());
    }

    #[test]
    fn compare_invariant_shape() {
        let cmp = MirExpr::Compare {
            operands: vec![MirExpr::Var("a".into()), MirExpr::IntLit(0)],
            ops: vec![CmpOp::Eq],
        };
        if let MirExpr::Compare { operands, ops } = &cmp {
            assert_eq!(operands.len(), ops.len() + 1);
        }
    }
}
