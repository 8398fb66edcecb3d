//! MIR visitor framework.
//!
//! A trait with one hook per interesting node kind and default
//! implementations that traverse structurally via the `walk_*` functions.
//! Passes override only the hooks they care about; calling the matching
//! `walk_*` from an override continues the traversal underneath.

use super::{EdgeSetApply, MirExpr, MirFunction, MirType, Stmt, StmtKind};

pub trait MirVisitor: Sized {
    fn visit_function(&mut self, func: &MirFunction) {
        walk_function(self, func);
    }

    fn visit_stmt(&mut self, stmt: &Stmt) {
        walk_stmt(self, stmt);
    }

    fn visit_expr(&mut self, expr: &MirExpr) {
        walk_expr(self, expr);
    }

    /// A variable reference.
    fn visit_var_expr(&mut self, _name: &str) {}

    /// A local variable declaration.
    fn visit_var_decl(
        &mut self,
        _name: &str,
        _ty: Option<&MirType>,
        _init: Option<&MirExpr>,
    ) {
    }

    fn visit_assign(&mut self, _targets: &[MirExpr], _value: &MirExpr) {}

    fn visit_reduce(&mut self, _target: &MirExpr, _value: &MirExpr) {}

    fn visit_compare_and_swap(&mut self, _target: &MirExpr, _value: &MirExpr) {}

    fn visit_edge_set_apply(&mut self, _apply: &EdgeSetApply) {}

    fn visit_call(&mut self, _name: &str, _args: &[MirExpr]) {}
}

pub fn walk_function<V: MirVisitor>(v: &mut V, func: &MirFunction) {
    if let Some(body) = &func.body {
        for stmt in body {
            v.visit_stmt(stmt);
        }
    }
}

pub fn walk_stmts<V: MirVisitor>(v: &mut V, stmts: &[Stmt]) {
    for stmt in stmts {
        v.visit_stmt(stmt);
    }
}

pub fn walk_stmt<V: MirVisitor>(v: &mut V, stmt: &Stmt) {
    match &stmt.kind {
        StmtKind::VarDecl {
            name, ty, init, ..
        } => {
            v.visit_var_decl(name, ty.as_ref(), init.as_ref());
            if let Some(init) = init {
                v.visit_expr(init);
            }
        }
        StmtKind::Assign { targets, value } => {
            v.visit_assign(targets, value);
            for t in targets {
                v.visit_expr(t);
            }
            v.visit_expr(value);
        }
        StmtKind::Reduce { target, value, .. } => {
            v.visit_reduce(target, value);
            v.visit_expr(target);
            v.visit_expr(value);
        }
        StmtKind::CompareAndSwap { target, value, .. } => {
            v.visit_compare_and_swap(target, value);
            v.visit_expr(target);
            v.visit_expr(value);
        }
        StmtKind::For {
            lower,
            upper,
            body,
            ..
        } => {
            v.visit_expr(lower);
            v.visit_expr(upper);
            walk_stmts(v, body);
        }
        StmtKind::While { cond, body } => {
            v.visit_expr(cond);
            walk_stmts(v, body);
        }
        StmtKind::DoWhile { body, cond } => {
            walk_stmts(v, body);
            v.visit_expr(cond);
        }
        StmtKind::If {
            cond,
            then_body,
            else_body,
        } => {
            v.visit_expr(cond);
            walk_stmts(v, then_body);
            if let Some(else_body) = else_body {
                walk_stmts(v, else_body);
            }
        }
        StmtKind::Print { args, .. } => {
            for arg in args {
                v.visit_expr(arg);
            }
        }
        StmtKind::Break => {}
        StmtKind::Expr(expr) => v.visit_expr(expr),
        StmtKind::HybridGpu {
            condition,
            push_stmt,
            pull_stmt,
        } => {
            v.visit_expr(condition);
            v.visit_stmt(push_stmt);
            v.visit_stmt(pull_stmt);
        }
    }
}

pub fn walk_expr<V: MirVisitor>(v: &mut V, expr: &MirExpr) {
    match expr {
        MirExpr::IntLit(_)
        | MirExpr::FloatLit(_)
        | MirExpr::BoolLit(_)
        | MirExpr::StringLit(_) => {}
        MirExpr::Var(name) => v.visit_var_expr(name),
        MirExpr::Binary { lhs, rhs, .. } => {
            v.visit_expr(lhs);
            v.visit_expr(rhs);
        }
        MirExpr::Unary { operand, .. } => v.visit_expr(operand),
        MirExpr::Compare { operands, .. } => {
            for operand in operands {
                v.visit_expr(operand);
            }
        }
        MirExpr::TensorRead { target, indices } => {
            v.visit_expr(target);
            for index in indices {
                v.visit_expr(index);
            }
        }
        MirExpr::TupleRead { tuple, index } => {
            v.visit_expr(tuple);
            if let super::TupleIndex::Positional(index) = index {
                v.visit_expr(index);
            }
        }
        MirExpr::Call { name, args } => {
            v.visit_call(name, args);
            for arg in args {
                v.visit_expr(arg);
            }
        }
        MirExpr::VertexSetAlloc { num_elements, .. } => {
            if let Some(n) = num_elements {
                v.visit_expr(n);
            }
        }
        MirExpr::ListAlloc { num_elements, .. } => {
            if let Some(n) = num_elements {
                v.visit_expr(n);
            }
        }
        MirExpr::VectorAlloc { .. } => {}
        MirExpr::PriorityQueueAlloc {
            dup_within_bucket,
            dup_across_bucket,
            bucket_ordering,
            priority_ordering,
            init_bucket,
            starting_node,
            ..
        } => {
            v.visit_expr(dup_within_bucket);
            v.visit_expr(dup_across_bucket);
            v.visit_expr(bucket_ordering);
            v.visit_expr(priority_ordering);
            v.visit_expr(init_bucket);
            v.visit_expr(starting_node);
        }
        MirExpr::Intersection {
            a,
            b,
            num_a,
            num_b,
            reference,
        } => {
            v.visit_expr(a);
            v.visit_expr(b);
            v.visit_expr(num_a);
            v.visit_expr(num_b);
            if let Some(r) = reference {
                v.visit_expr(r);
            }
        }
        MirExpr::VertexSetApply { target, .. } => v.visit_expr(target),
        MirExpr::VertexSetDedup { target } => v.visit_expr(target),
        MirExpr::EdgeSetApply(apply) => {
            // The from/to filters are names, not expressions; passes that
            // track them (hoisting, usage analysis) do so in this hook.
            v.visit_edge_set_apply(apply);
            v.visit_expr(&apply.target);
        }
    }
}
