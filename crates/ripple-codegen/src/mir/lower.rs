//! FIR to MIR lowering.
//!
//! A single walk over the typed AST. Program elements land in the
//! [`MirContext`] (element types, globals, functions); statements and
//! expressions become the MIR tree. Identifier categories were resolved by
//! the parser and are not rechecked here; what is checked are the semantic
//! facts the symbol table can no longer answer -- unknown tuple receivers
//! and unresolved reduction targets -- which produce diagnostics and a
//! placeholder node so the walk continues.
//!
//! Method names in the fixed intrinsic set are renamed to `builtin_<name>`
//! here and nowhere else, so re-lowering printed output can never
//! double-prefix.

use ripple_common::span::Span;
use ripple_parser::ast::expr as fir;
use ripple_parser::ast::item::{self, Item};
use ripple_parser::ast::stmt as fir_stmt;
use ripple_parser::ast::types as fir_ty;
use ripple_parser::ast::AstNode;
use ripple_parser::{Parse, SyntaxNode};
use rustc_hash::FxHashSet;
use std::fmt;

use super::context::{BackendConfig, ElementTypeDef, GlobalVar, MirContext};
use super::{
    ApplyKind, BinOp, CasOp, CmpOp, Direction, EdgeSetApply, MirExpr, MirFunction, MirType,
    MirVar, ReduceOp, ScalarKind, Stmt, StmtKind, TupleIndex, UnaryOp,
};

/// The methods reserved by the runtime library. Calls to these in method
/// position are renamed to `builtin_<name>`.
const INTRINSIC_METHODS: &[&str] = &[
    "sum",
    "getVertices",
    "getOutDegrees",
    "getOutDegreesUint",
    "getOutDegree",
    "getNgh",
    "relabel",
    "getVertexSetSize",
    "addVertex",
    "append",
    "pop",
    "transpose",
];

/// A problem found while lowering. Lowering accumulates these and keeps
/// walking.
#[derive(Debug, Clone, PartialEq)]
pub struct LoweringDiagnostic {
    pub message: String,
    pub span: Span,
}

impl fmt::Display for LoweringDiagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

/// Lower a parsed program into a MIR context.
pub fn lower(parse: &Parse, config: BackendConfig) -> (MirContext, Vec<LoweringDiagnostic>) {
    let mut lowerer = Lowerer {
        ctx: MirContext::new(config),
        diagnostics: Vec::new(),
        label_stack: Vec::new(),
        scopes: vec![FxHashSet::default()],
    };
    lowerer.lower_program(&parse.program());
    (lowerer.ctx, lowerer.diagnostics)
}

struct Lowerer {
    ctx: MirContext,
    diagnostics: Vec<LoweringDiagnostic>,
    /// Innermost-last stack of statement labels.
    label_stack: Vec<String>,
    /// Names known to be declared, for the semantic checks lowering owns.
    scopes: Vec<FxHashSet<String>>,
}

fn span_of(node: &SyntaxNode) -> Span {
    let range = node.text_range();
    Span::new(range.start().into(), range.end().into())
}

impl Lowerer {
    fn diag(&mut self, node: &SyntaxNode, message: impl Into<String>) {
        self.diagnostics.push(LoweringDiagnostic {
            message: message.into(),
            span: span_of(node),
        });
    }

    /// Placeholder expression used to keep walking after a diagnostic.
    fn placeholder(&mut self, node: &SyntaxNode, message: impl Into<String>) -> MirExpr {
        self.diag(node, message);
        MirExpr::IntLit(0)
    }

    fn declare(&mut self, name: &str) {
        self.scopes
            .last_mut()
            .expect("lowerer always has a root scope")
            .insert(name.to_string());
    }

    fn is_declared(&self, name: &str) -> bool {
        self.scopes.iter().rev().any(|s| s.contains(name))
    }

    // ── Program elements ───────────────────────────────────────────────

    fn lower_program(&mut self, program: &item::Program) {
        for element in program.items() {
            match element {
                Item::Element(decl) => self.lower_element_decl(&decl),
                Item::Extern(decl) => self.lower_extern_decl(&decl),
                Item::Const(decl) => self.lower_global_const(&decl),
                Item::Func(decl) => self.lower_func_decl(&decl),
                // Test elements drive the DSL's own test harness; the GPU
                // midend does not lower them.
                Item::Test(_) => {}
            }
        }
    }

    fn lower_element_decl(&mut self, decl: &item::ElementTypeDecl) {
        let Some(name) = decl.name() else {
            return;
        };
        let mut fields = Vec::new();
        for field in decl.fields() {
            let (Some(field_name), Some(ty)) = (field.name(), field.ty()) else {
                continue;
            };
            let ty = self.lower_type(&ty);
            self.declare(&field_name);
            fields.push(MirVar::new(field_name, ty));
        }
        self.declare(&name);
        self.ctx.add_element_type(ElementTypeDef { name, fields });
    }

    fn lower_extern_decl(&mut self, decl: &item::ExternDecl) {
        let Some(name) = decl.name() else {
            return;
        };
        let ty = match decl.ty() {
            Some(ty) => self.lower_type(&ty),
            None => return,
        };
        self.declare(&name);
        self.ctx.add_global(GlobalVar {
            name,
            ty,
            init: None,
            is_const: false,
        });
    }

    fn lower_global_const(&mut self, decl: &item::ConstDecl) {
        let Some(name) = decl.name() else {
            return;
        };
        let ty = match decl.ty() {
            Some(ty) => self.lower_type(&ty),
            None => {
                self.diag(
                    AstNode::syntax(decl),
                    format!("global constant `{name}` needs a type annotation"),
                );
                return;
            }
        };
        let init = decl.init().map(|e| self.lower_expr(&e));
        self.declare(&name);
        self.ctx.add_global(GlobalVar {
            name,
            ty,
            init,
            is_const: true,
        });
    }

    fn lower_func_decl(&mut self, decl: &item::FuncDecl) {
        let Some(name) = decl.name() else {
            return;
        };
        self.declare(&name);

        let params: Vec<MirVar> = decl
            .params()
            .iter()
            .filter_map(|p| {
                let name = p.name()?;
                let ty = self.lower_type(&p.ty()?);
                Some(if p.is_inout() {
                    MirVar::inout(name, ty)
                } else {
                    MirVar::new(name, ty)
                })
            })
            .collect();
        let results: Vec<MirVar> = decl
            .results()
            .iter()
            .filter_map(|p| {
                let name = p.name()?;
                let ty = self.lower_type(&p.ty()?);
                Some(MirVar::new(name, ty))
            })
            .collect();

        let body = if decl.is_external() {
            None
        } else {
            self.scopes.push(FxHashSet::default());
            for var in params.iter().chain(results.iter()) {
                self.declare(&var.name);
            }
            let stmts = decl
                .body()
                .map(|block| self.lower_block(&block))
                .unwrap_or_default();
            self.scopes.pop();
            Some(stmts)
        };

        self.ctx.add_function(MirFunction {
            name,
            params,
            results,
            body,
            exported: decl.is_exported(),
        });
    }

    // ── Statements ─────────────────────────────────────────────────────

    fn lower_block(&mut self, block: &fir_stmt::StmtBlock) -> Vec<Stmt> {
        block
            .stmts()
            .filter_map(|stmt| self.lower_stmt(&stmt))
            .collect()
    }

    fn lower_stmt(&mut self, stmt: &fir_stmt::Stmt) -> Option<Stmt> {
        let lowered = match stmt {
            fir_stmt::Stmt::Labeled(labeled) => {
                let label = labeled.label();
                if let Some(label) = &label {
                    self.label_stack.push(label.clone());
                }
                let mut inner = labeled.stmt().and_then(|s| self.lower_stmt(&s));
                if label.is_some() {
                    self.label_stack.pop();
                }
                if let Some(inner) = &mut inner {
                    inner.label = label;
                }
                return inner;
            }

            fir_stmt::Stmt::VarDecl(decl) => self.lower_local_var(decl),
            fir_stmt::Stmt::ConstDecl(decl) => self.lower_local_const(decl),

            fir_stmt::Stmt::Assign(assign) => {
                let targets: Vec<MirExpr> = assign
                    .targets()
                    .iter()
                    .map(|t| self.lower_expr(t))
                    .collect();
                for target in &assign.targets() {
                    if let fir::Expr::Var(v) = target {
                        if let Some(name) = v.name() {
                            self.declare(&name);
                        }
                    }
                }
                let value = assign
                    .value()
                    .map(|v| self.lower_expr(&v))
                    .unwrap_or(MirExpr::IntLit(0));
                Some(StmtKind::Assign { targets, value })
            }

            fir_stmt::Stmt::Reduce(reduce) => self.lower_reduce(reduce),

            fir_stmt::Stmt::If(if_stmt) => {
                let cond = self.lower_cond(if_stmt.cond(), AstNode::syntax(if_stmt));
                let then_body = if_stmt
                    .then_block()
                    .map(|b| self.lower_block(&b))
                    .unwrap_or_default();
                let else_body = if_stmt.else_clause().map(|clause| {
                    if let Some(elif) = clause.elif() {
                        self.lower_stmt(&fir_stmt::Stmt::If(elif))
                            .map(|s| vec![s])
                            .unwrap_or_default()
                    } else {
                        clause
                            .block()
                            .map(|b| self.lower_block(&b))
                            .unwrap_or_default()
                    }
                });
                Some(StmtKind::If {
                    cond,
                    then_body,
                    else_body,
                })
            }

            fir_stmt::Stmt::While(while_stmt) => {
                let cond = self.lower_cond(while_stmt.cond(), AstNode::syntax(while_stmt));
                let body = while_stmt
                    .body()
                    .map(|b| self.lower_block(&b))
                    .unwrap_or_default();
                Some(StmtKind::While { cond, body })
            }

            fir_stmt::Stmt::DoWhile(do_while) => {
                let body = do_while
                    .body()
                    .map(|b| self.lower_block(&b))
                    .unwrap_or_default();
                let cond = self.lower_cond(do_while.cond(), AstNode::syntax(do_while));
                Some(StmtKind::DoWhile { body, cond })
            }

            fir_stmt::Stmt::For(for_stmt) => {
                let Some(loop_var) = for_stmt.loop_var() else {
                    return None;
                };
                let domain = for_stmt.domain();
                let lower = domain
                    .as_ref()
                    .and_then(|d| d.lower())
                    .map(|e| self.lower_expr(&e))
                    .unwrap_or(MirExpr::IntLit(0));
                let upper = domain
                    .as_ref()
                    .and_then(|d| d.upper())
                    .map(|e| self.lower_expr(&e))
                    .unwrap_or(MirExpr::IntLit(0));
                self.declare(&loop_var);
                let body = for_stmt
                    .body()
                    .map(|b| self.lower_block(&b))
                    .unwrap_or_default();
                Some(StmtKind::For {
                    loop_var,
                    lower,
                    upper,
                    body,
                })
            }

            fir_stmt::Stmt::Print(print) => {
                let args = print.args().map(|e| self.lower_expr(&e)).collect();
                Some(StmtKind::Print {
                    args,
                    newline: print.newline(),
                })
            }

            fir_stmt::Stmt::Break(_) => Some(StmtKind::Break),

            fir_stmt::Stmt::Delete(delete) => {
                let arg = delete
                    .target()
                    .map(|e| self.lower_expr(&e))
                    .unwrap_or(MirExpr::IntLit(0));
                Some(StmtKind::Expr(MirExpr::Call {
                    name: "deleteObject".to_string(),
                    args: vec![arg],
                }))
            }

            fir_stmt::Stmt::Expr(expr_stmt) => expr_stmt
                .expr()
                .map(|e| StmtKind::Expr(self.lower_expr(&e))),
        };

        lowered.map(|kind| Stmt {
            label: self.label_stack.last().cloned(),
            kind,
        })
    }

    fn lower_local_var(&mut self, decl: &item::VarDecl) -> Option<StmtKind> {
        let name = decl.name()?;
        let ty = decl.ty().map(|t| self.lower_type(&t));
        let init = decl.init().map(|e| self.lower_expr(&e));
        self.declare(&name);
        Some(StmtKind::VarDecl {
            name,
            ty,
            init,
            is_const: false,
        })
    }

    fn lower_local_const(&mut self, decl: &item::ConstDecl) -> Option<StmtKind> {
        let name = decl.name()?;
        let ty = decl.ty().map(|t| self.lower_type(&t));
        let init = decl.init().map(|e| self.lower_expr(&e));
        self.declare(&name);
        Some(StmtKind::VarDecl {
            name,
            ty,
            init,
            is_const: true,
        })
    }

    fn lower_reduce(&mut self, reduce: &fir_stmt::ReduceStmt) -> Option<StmtKind> {
        use ripple_parser::SyntaxKind;

        let target_ast = reduce.target()?;
        if let fir::Expr::Var(v) = &target_ast {
            if let Some(name) = v.name() {
                if !self.is_declared(&name) {
                    self.diag(
                        target_ast.syntax(),
                        format!("reduction target `{name}` does not resolve to a declared name"),
                    );
                }
            }
        }
        let target = self.lower_expr(&target_ast);
        let value = reduce
            .value()
            .map(|e| self.lower_expr(&e))
            .unwrap_or(MirExpr::IntLit(0));

        let kind = match reduce.op().map(|t| t.kind()) {
            Some(SyntaxKind::PLUS_REDUCE) => StmtKind::Reduce {
                target,
                value,
                op: ReduceOp::Sum,
            },
            Some(SyntaxKind::MIN_REDUCE) => StmtKind::Reduce {
                target,
                value,
                op: ReduceOp::Min,
            },
            Some(SyntaxKind::MAX_REDUCE) => StmtKind::Reduce {
                target,
                value,
                op: ReduceOp::Max,
            },
            // The async reductions are unordered racy writes: they lower to
            // compare-and-swap statements.
            Some(SyntaxKind::ASYNC_MIN_REDUCE) => StmtKind::CompareAndSwap {
                target,
                value,
                op: CasOp::Min,
            },
            Some(SyntaxKind::ASYNC_MAX_REDUCE) => StmtKind::CompareAndSwap {
                target,
                value,
                op: CasOp::Max,
            },
            _ => unreachable!("the parser only builds reduce statements with a reduce operator"),
        };
        Some(kind)
    }

    fn lower_cond(&mut self, cond: Option<fir::Expr>, parent: &SyntaxNode) -> MirExpr {
        match cond {
            Some(e) => self.lower_expr(&e),
            None => self.placeholder(parent, "missing condition expression"),
        }
    }

    // ── Expressions ────────────────────────────────────────────────────

    fn lower_expr(&mut self, expr: &fir::Expr) -> MirExpr {
        use ripple_parser::SyntaxKind;

        match expr {
            fir::Expr::Literal(lit) => self.lower_literal(lit),

            fir::Expr::TensorLiteral(lit) => {
                let args = lit.elements().map(|e| self.lower_expr(&e)).collect();
                MirExpr::Call {
                    name: "builtin_denseVector".to_string(),
                    args,
                }
            }

            fir::Expr::Var(v) => match v.name() {
                Some(name) => MirExpr::Var(name),
                None => self.placeholder(v.syntax(), "variable reference without a name"),
            },

            // A range generic constant reads as a variable in MIR.
            fir::Expr::RangeConst(r) => match r.name() {
                Some(name) => MirExpr::Var(name),
                None => self.placeholder(r.syntax(), "range constant without a name"),
            },

            fir::Expr::Paren(p) => match p.inner() {
                Some(inner) => self.lower_expr(&inner),
                None => self.placeholder(p.syntax(), "empty parenthesized expression"),
            },

            fir::Expr::Binary(b) => self.lower_binary(b),

            fir::Expr::EqChain(eq) => {
                let operands = eq.operands().iter().map(|e| self.lower_expr(e)).collect();
                let ops = eq
                    .ops()
                    .iter()
                    .map(|t| match t.kind() {
                        SyntaxKind::EQ => CmpOp::Eq,
                        SyntaxKind::NEQ => CmpOp::Ne,
                        SyntaxKind::L_ANGLE => CmpOp::Lt,
                        SyntaxKind::R_ANGLE => CmpOp::Gt,
                        SyntaxKind::LE => CmpOp::Le,
                        SyntaxKind::GE => CmpOp::Ge,
                        other => unreachable!("not a comparison operator: {other:?}"),
                    })
                    .collect();
                MirExpr::Compare { operands, ops }
            }

            fir::Expr::Not(n) => {
                let operand = n
                    .operand()
                    .map(|e| self.lower_expr(&e))
                    .unwrap_or(MirExpr::BoolLit(false));
                MirExpr::Unary {
                    op: UnaryOp::Not,
                    operand: Box::new(operand),
                }
            }

            fir::Expr::Neg(n) => {
                let operand = n
                    .operand()
                    .map(|e| self.lower_expr(&e))
                    .unwrap_or(MirExpr::IntLit(0));
                if n.negated() {
                    MirExpr::Unary {
                        op: UnaryOp::Neg,
                        operand: Box::new(operand),
                    }
                } else {
                    // Unary plus is the identity.
                    operand
                }
            }

            fir::Expr::Transpose(t) => {
                let operand = t
                    .operand()
                    .map(|e| self.lower_expr(&e))
                    .unwrap_or(MirExpr::IntLit(0));
                MirExpr::Call {
                    name: "builtin_transpose".to_string(),
                    args: vec![operand],
                }
            }

            fir::Expr::TensorRead(read) => {
                let target = read
                    .tensor()
                    .map(|e| self.lower_expr(&e))
                    .unwrap_or(MirExpr::IntLit(0));
                let indices = read.indices().iter().map(|e| self.lower_expr(e)).collect();
                MirExpr::TensorRead {
                    target: Box::new(target),
                    indices,
                }
            }

            // `v.rank` is a read of the `rank` property array at index `v`.
            fir::Expr::FieldRead(read) => {
                let receiver = read
                    .receiver()
                    .map(|e| self.lower_expr(&e))
                    .unwrap_or(MirExpr::IntLit(0));
                match read.field() {
                    Some(field) => MirExpr::TensorRead {
                        target: Box::new(MirExpr::Var(field)),
                        indices: vec![receiver],
                    },
                    None => self.placeholder(read.syntax(), "field read without a field"),
                }
            }

            fir::Expr::MethodCall(call) => {
                let receiver = call
                    .receiver()
                    .map(|e| self.lower_expr(&e))
                    .unwrap_or(MirExpr::IntLit(0));
                let name = match call.method_name() {
                    Some(name) => rename_intrinsic(&name),
                    None => {
                        return self.placeholder(call.syntax(), "method call without a name")
                    }
                };
                let mut args = vec![receiver];
                args.extend(call.args().iter().map(|e| self.lower_expr(e)));
                MirExpr::Call { name, args }
            }

            fir::Expr::Call(call) => {
                let name = match call.callee() {
                    Some(name) => name,
                    None => return self.placeholder(call.syntax(), "call without a callee"),
                };
                let mut args = Vec::new();
                // In chain position the receiver becomes the first argument.
                if let Some(receiver) = call.receiver() {
                    args.push(self.lower_expr(&receiver));
                }
                args.extend(call.args().iter().map(|e| self.lower_expr(e)));
                MirExpr::Call { name, args }
            }

            fir::Expr::Apply(apply) => self.lower_apply(apply),

            fir::Expr::Where(where_expr) => {
                let target = where_expr
                    .target()
                    .map(|e| self.lower_expr(&e))
                    .unwrap_or(MirExpr::IntLit(0));
                match where_expr.input_func() {
                    Some(input_function) => MirExpr::VertexSetApply {
                        target: Box::new(target),
                        input_function,
                    },
                    None => {
                        self.placeholder(where_expr.syntax(), "filter without a predicate")
                    }
                }
            }

            // A from/to filter whose chain never reached an apply: the
            // filter is dropped and the receiver flows through.
            fir::Expr::FromFilter(filter) => match filter.inner() {
                Some(inner) => self.lower_expr(&inner),
                None => self.placeholder(filter.syntax(), "filter without a receiver"),
            },
            fir::Expr::ToFilter(filter) => match filter.inner() {
                Some(inner) => self.lower_expr(&inner),
                None => self.placeholder(filter.syntax(), "filter without a receiver"),
            },

            fir::Expr::Intersection(ix) => {
                let args = ix.args();
                if args.len() < 4 {
                    return self.placeholder(
                        ix.syntax(),
                        "intersection takes at least four arguments",
                    );
                }
                let mut lowered: Vec<MirExpr> =
                    args.iter().map(|e| self.lower_expr(e)).collect();
                let reference = if lowered.len() > 4 {
                    Some(Box::new(lowered.remove(4)))
                } else {
                    None
                };
                let num_b = Box::new(lowered.remove(3));
                let num_a = Box::new(lowered.remove(2));
                let b = Box::new(lowered.remove(1));
                let a = Box::new(lowered.remove(0));
                MirExpr::Intersection {
                    a,
                    b,
                    num_a,
                    num_b,
                    reference,
                }
            }

            fir::Expr::Load(load) => {
                let path = load
                    .path()
                    .map(|e| self.lower_expr(&e))
                    .unwrap_or(MirExpr::StringLit(String::new()));
                MirExpr::Call {
                    name: "loadEdgeSet".to_string(),
                    args: vec![path],
                }
            }

            fir::Expr::Map(map) => self.placeholder(
                map.syntax(),
                "map expressions are not supported by the GPU backend",
            ),

            fir::Expr::VertexSetAlloc(alloc) => {
                let element = alloc
                    .element_type()
                    .and_then(|e| e.name())
                    .unwrap_or_default();
                let num_elements = alloc
                    .num_elements()
                    .map(|e| Box::new(self.lower_expr(&e)));
                MirExpr::VertexSetAlloc {
                    element,
                    num_elements,
                }
            }

            fir::Expr::ListAlloc(alloc) => {
                let element_ty = alloc
                    .element_ty()
                    .map(|t| self.lower_type(&t))
                    .unwrap_or(MirType::Opaque);
                let num_elements = alloc
                    .num_elements()
                    .map(|e| Box::new(self.lower_expr(&e)));
                MirExpr::ListAlloc {
                    element_ty,
                    num_elements,
                }
            }

            fir::Expr::VectorAlloc(alloc) => match alloc.vector_type() {
                Some(vec_ty) => {
                    let lowered = self.lower_nd_tensor(&vec_ty);
                    match lowered {
                        MirType::Vector {
                            element,
                            scalar,
                            size,
                        } => MirExpr::VectorAlloc {
                            element,
                            scalar,
                            size,
                        },
                        _ => self.placeholder(
                            alloc.syntax(),
                            "vector allocation with a non-vector type",
                        ),
                    }
                }
                None => self.placeholder(alloc.syntax(), "vector allocation without a type"),
            },

            fir::Expr::PriorityQueueAlloc(alloc) => self.lower_priority_queue_alloc(alloc),

            fir::Expr::UnnamedTupleRead(read) => {
                let tuple_name = read.tuple().and_then(|t| t.name());
                if let Some(name) = &tuple_name {
                    if !self.is_declared(name) {
                        self.diag(
                            read.syntax(),
                            format!("use of undeclared tuple `{name}`"),
                        );
                    }
                }
                let tuple = MirExpr::Var(tuple_name.unwrap_or_default());
                let index = read
                    .index()
                    .map(|e| self.lower_expr(&e))
                    .unwrap_or(MirExpr::IntLit(0));
                MirExpr::TupleRead {
                    tuple: Box::new(tuple),
                    index: TupleIndex::Positional(Box::new(index)),
                }
            }

            fir::Expr::NamedTupleRead(read) => {
                let tuple_name = read.tuple().and_then(|t| t.name());
                if let Some(name) = &tuple_name {
                    if !self.is_declared(name) {
                        self.diag(
                            read.syntax(),
                            format!("use of undeclared tuple `{name}`"),
                        );
                    }
                }
                let tuple = MirExpr::Var(tuple_name.unwrap_or_default());
                match read.elem() {
                    Some(elem) => MirExpr::TupleRead {
                        tuple: Box::new(tuple),
                        index: TupleIndex::Named(elem),
                    },
                    None => self.placeholder(read.syntax(), "tuple read without an element"),
                }
            }
        }
    }

    fn lower_literal(&mut self, lit: &fir::Literal) -> MirExpr {
        use ripple_parser::SyntaxKind;

        // Tensor-literal elements may carry a sign token before the number.
        let tokens: Vec<_> = lit
            .syntax()
            .children_with_tokens()
            .filter_map(|it| it.into_token())
            .filter(|t| !t.kind().is_trivia())
            .collect();
        let (sign, value_token) = match tokens.first().map(|t| t.kind()) {
            Some(SyntaxKind::MINUS) => (-1i64, tokens.get(1)),
            Some(SyntaxKind::PLUS) => (1, tokens.get(1)),
            _ => (1, tokens.first()),
        };
        let Some(token) = value_token else {
            return self.placeholder(lit.syntax(), "empty literal");
        };

        match token.kind() {
            SyntaxKind::INT_LITERAL => match token.text().parse::<i64>() {
                Ok(v) => MirExpr::IntLit(sign * v),
                Err(_) => self.placeholder(lit.syntax(), "integer literal out of range"),
            },
            SyntaxKind::FLOAT_LITERAL => match token.text().parse::<f64>() {
                Ok(v) => MirExpr::FloatLit(sign as f64 * v),
                Err(_) => self.placeholder(lit.syntax(), "malformed float literal"),
            },
            SyntaxKind::TRUE_KW => MirExpr::BoolLit(true),
            SyntaxKind::FALSE_KW => MirExpr::BoolLit(false),
            SyntaxKind::STRING_LITERAL => {
                MirExpr::StringLit(unescape_string(token.text()))
            }
            other => {
                let msg = format!("unexpected literal token {other:?}");
                self.placeholder(lit.syntax(), msg)
            }
        }
    }

    fn lower_binary(&mut self, b: &fir::BinaryExpr) -> MirExpr {
        use ripple_parser::SyntaxKind;

        let lhs = b
            .lhs()
            .map(|e| self.lower_expr(&e))
            .unwrap_or(MirExpr::IntLit(0));
        let rhs = b
            .rhs()
            .map(|e| self.lower_expr(&e))
            .unwrap_or(MirExpr::IntLit(0));

        let op = match b.op().map(|t| t.kind()) {
            Some(SyntaxKind::PLUS) => BinOp::Add,
            Some(SyntaxKind::MINUS) => BinOp::Sub,
            Some(SyntaxKind::STAR) | Some(SyntaxKind::DOT_STAR) => BinOp::Mul,
            Some(SyntaxKind::SLASH) | Some(SyntaxKind::DOT_SLASH) => BinOp::Div,
            Some(SyntaxKind::CARET) => BinOp::Pow,
            Some(SyntaxKind::AND_KW) => BinOp::And,
            Some(SyntaxKind::OR_KW) => BinOp::Or,
            Some(SyntaxKind::XOR_KW) => BinOp::Xor,
            Some(SyntaxKind::BACKSLASH) => {
                self.diag(
                    b.syntax(),
                    "left division is not supported by the GPU backend",
                );
                BinOp::Div
            }
            _ => {
                return self.placeholder(b.syntax(), "binary expression without an operator")
            }
        };

        MirExpr::Binary {
            op,
            lhs: Box::new(lhs),
            rhs: Box::new(rhs),
        }
    }

    fn lower_apply(&mut self, apply: &fir::ApplyExpr) -> MirExpr {
        let target = apply
            .target()
            .map(|e| self.lower_expr(&e))
            .unwrap_or(MirExpr::IntLit(0));
        let Some(input_function) = apply.input_function() else {
            return self.placeholder(apply.syntax(), "apply without a function");
        };

        let kind = match apply.kind() {
            fir::ApplyKind::Regular => ApplyKind::Regular,
            fir::ApplyKind::UpdatePriority => ApplyKind::UpdatePriority,
            fir::ApplyKind::UpdatePriorityExtern => ApplyKind::UpdatePriorityExtern,
        };

        let change_tracking_field = apply.change_tracking_field();
        let disable_deduplication = apply.disable_deduplication().unwrap_or(false);

        let lowered = MirExpr::EdgeSetApply(EdgeSetApply {
            target: Box::new(target),
            input_function,
            from_func: apply.from_func(),
            to_func: apply.to_func(),
            change_tracking_field: change_tracking_field.clone(),
            disable_deduplication,
            kind,
            direction: Direction::Unresolved,
        });

        // Change-tracked applies produce a frontier that is deduplicated
        // unless the hint turns it off.
        if change_tracking_field.is_some() && !disable_deduplication {
            MirExpr::VertexSetDedup {
                target: Box::new(lowered),
            }
        } else {
            lowered
        }
    }

    fn lower_priority_queue_alloc(&mut self, alloc: &fir::PriorityQueueAllocExpr) -> MirExpr {
        let element = alloc
            .element_type()
            .and_then(|e| e.name())
            .unwrap_or_default();
        let priority = alloc
            .priority_type()
            .and_then(|s| s.kind())
            .map(|k| self.lower_scalar_kind(k, alloc.syntax()))
            .unwrap_or(ScalarKind::Int);
        let args = alloc.args();
        if args.len() < 6 {
            return self.placeholder(
                alloc.syntax(),
                "priority queue allocation takes seven arguments",
            );
        }
        let Some(vector_function) = alloc.vector_function() else {
            return self.placeholder(
                alloc.syntax(),
                "priority queue allocation without a vector function",
            );
        };
        let mut lowered: Vec<MirExpr> = args.iter().map(|e| self.lower_expr(e)).collect();
        let starting_node = Box::new(lowered.remove(5));
        let init_bucket = Box::new(lowered.remove(4));
        let priority_ordering = Box::new(lowered.remove(3));
        let bucket_ordering = Box::new(lowered.remove(2));
        let dup_across_bucket = Box::new(lowered.remove(1));
        let dup_within_bucket = Box::new(lowered.remove(0));
        MirExpr::PriorityQueueAlloc {
            element,
            priority,
            dup_within_bucket,
            dup_across_bucket,
            vector_function,
            bucket_ordering,
            priority_ordering,
            init_bucket,
            starting_node,
        }
    }

    // ── Types ──────────────────────────────────────────────────────────

    fn lower_type(&mut self, ty: &fir_ty::Type) -> MirType {
        match ty {
            fir_ty::Type::Scalar(s) => match s.kind() {
                Some(kind) => {
                    MirType::Scalar(self.lower_scalar_kind(kind, AstNode::syntax(s)))
                }
                None => MirType::Scalar(ScalarKind::Int),
            },
            fir_ty::Type::NdTensor(t) => self.lower_nd_tensor(t),
            fir_ty::Type::Element(e) => MirType::Element(e.name().unwrap_or_default()),
            fir_ty::Type::VertexSet(vs) => MirType::VertexSet {
                element: vs.element().and_then(|e| e.name()).unwrap_or_default(),
            },
            fir_ty::Type::EdgeSet(es) => MirType::EdgeSet {
                element: es.edge_element().and_then(|e| e.name()).unwrap_or_default(),
                src: es.src_element().and_then(|e| e.name()).unwrap_or_default(),
                dst: es.dst_element().and_then(|e| e.name()).unwrap_or_default(),
                weight: es.weight().and_then(|s| s.kind()).map(|k| {
                    self.lower_scalar_kind(k, AstNode::syntax(es))
                }),
            },
            fir_ty::Type::List(l) => {
                let inner = l
                    .element_ty()
                    .map(|t| self.lower_type(&t))
                    .unwrap_or(MirType::Opaque);
                MirType::List(Box::new(inner))
            }
            fir_ty::Type::Set(s) => {
                // Unstructured sets behave as edgesets with unnamed endpoint
                // roles in this backend.
                let element = s.element().and_then(|e| e.name()).unwrap_or_default();
                let endpoints = s.endpoints();
                let src = endpoints.first().cloned().unwrap_or_default();
                let dst = endpoints.get(1).cloned().unwrap_or_else(|| src.clone());
                MirType::EdgeSet {
                    element,
                    src,
                    dst,
                    weight: None,
                }
            }
            fir_ty::Type::Grid(g) => {
                self.diag(
                    AstNode::syntax(g),
                    "grid sets are not supported by the GPU backend",
                );
                MirType::Opaque
            }
            fir_ty::Type::NamedTuple(t) => MirType::Tuple(
                t.elements()
                    .map(|e| {
                        (
                            e.name(),
                            e.element().and_then(|el| el.name()).unwrap_or_default(),
                        )
                    })
                    .collect(),
            ),
            fir_ty::Type::UnnamedTuple(t) => {
                let element = t.element().and_then(|e| e.name()).unwrap_or_default();
                let length = t.length().unwrap_or(0).max(0) as usize;
                MirType::Tuple(vec![(None, element); length])
            }
            fir_ty::Type::PriorityQueue(pq) => MirType::PriorityQueue {
                element: pq.element().and_then(|e| e.name()).unwrap_or_default(),
                priority: pq
                    .priority()
                    .and_then(|s| s.kind())
                    .map(|k| self.lower_scalar_kind(k, AstNode::syntax(pq)))
                    .unwrap_or(ScalarKind::Int),
            },
            fir_ty::Type::Opaque(_) => MirType::Opaque,
        }
    }

    fn lower_nd_tensor(&mut self, t: &fir_ty::NdTensorType) -> MirType {
        let element = t.element().and_then(|e| e.name());
        let scalar = match t.block() {
            Some(fir_ty::Type::Scalar(s)) => match s.kind() {
                Some(kind) => {
                    MirType::Scalar(self.lower_scalar_kind(kind, AstNode::syntax(&s)))
                }
                None => MirType::Scalar(ScalarKind::Int),
            },
            Some(fir_ty::Type::NdTensor(inner)) => self.lower_nd_tensor(&inner),
            _ => MirType::Scalar(ScalarKind::Int),
        };
        let size = t.index_sets().into_iter().find_map(|is| match is {
            fir_ty::IndexSet::Range(n) => Some(n),
            fir_ty::IndexSet::Set(_) => None,
        });
        MirType::Vector {
            element,
            scalar: Box::new(scalar),
            size,
        }
    }

    fn lower_scalar_kind(
        &mut self,
        kind: fir_ty::ScalarKind,
        node: &SyntaxNode,
    ) -> ScalarKind {
        match kind {
            fir_ty::ScalarKind::Int => ScalarKind::Int,
            fir_ty::ScalarKind::UInt => ScalarKind::UInt,
            fir_ty::ScalarKind::UInt64 => ScalarKind::UInt64,
            fir_ty::ScalarKind::Float => ScalarKind::Float,
            fir_ty::ScalarKind::Double => ScalarKind::Double,
            fir_ty::ScalarKind::Bool => ScalarKind::Bool,
            fir_ty::ScalarKind::String => ScalarKind::String,
            fir_ty::ScalarKind::Complex => {
                self.diag(node, "complex scalars are not supported by the GPU backend");
                ScalarKind::Double
            }
        }
    }
}

/// Rename an intrinsic method to its runtime-library symbol. Happens here
/// and nowhere else.
fn rename_intrinsic(name: &str) -> String {
    if INTRINSIC_METHODS.contains(&name) {
        format!("builtin_{name}")
    } else {
        name.to_string()
    }
}

/// Strip quotes and process the escape sequences of a string literal.
fn unescape_string(text: &str) -> String {
    let inner = text
        .strip_prefix('"')
        .and_then(|s| s.strip_suffix('"'))
        .unwrap_or(text);
    let mut out = String::with_capacity(inner.len());
    let mut chars = inner.chars();
    while let Some(c) = chars.next() {
        if c == '\\' {
            match chars.next() {
                Some('n') => out.push('\n'),
                Some('t') => out.push('\t'),
                Some('"') => out.push('"'),
                Some('\\') => out.push('\\'),
                Some(other) => {
                    out.push('\\');
                    out.push(other);
                }
                None => out.push('\\'),
            }
        } else {
            out.push(c);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn intrinsic_rename_applies_once() {
        assert_eq!(rename_intrinsic("getOutDegree"), "builtin_getOutDegree");
        assert_eq!(rename_intrinsic("userMethod"), "userMethod");
        // A name already carrying the prefix is not in the set, so it can
        // never be renamed twice.
        assert_eq!(
            rename_intrinsic("builtin_getOutDegree"),
            "builtin_getOutDegree"
        );
    }

    #[test]
    fn unescape_handles_common_sequences() {
        assert_eq!(unescape_string("\"a\\nb\""), "a\nb");
        assert_eq!(unescape_string("\"say \\\"hi\\\"\""), "say \"hi\"");
        assert_eq!(unescape_string("\"plain\""), "plain");
    }
}
