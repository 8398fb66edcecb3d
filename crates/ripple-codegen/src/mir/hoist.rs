//! Kernel variable extraction.
//!
//! Walks a statement region destined to become a device kernel and collects
//! the variables the kernel must receive from the host (`hoisted_vars`) and
//! the declarations that must be lifted to kernel-local storage
//! (`hoisted_decls`).
//!
//! `hoisted_vars` is deduplicated by name with first-seen order; names
//! declared inside the region, and names in the caller-supplied skip set
//! (function parameters, globals, declared predicate functions), are
//! excluded. `hoisted_decls` preserves discovery order because later
//! declarations may depend on earlier ones.
//!
//! The from/to filters of an edgeset apply are carried as names, not
//! expressions, so the extractor registers them as variable uses itself; a
//! frontier vertexset referenced only as a filter still reaches the
//! kernel. Callers put declared function names in the skip set so
//! predicate filters are not mistaken for frontiers.

use rustc_hash::FxHashSet;

use super::visit::{walk_stmt, MirVisitor};
use super::{EdgeSetApply, MirExpr, MirType, Stmt};

#[derive(Debug, Clone, PartialEq)]
pub struct HoistedDecl {
    pub name: String,
    pub ty: Option<MirType>,
    pub init: Option<MirExpr>,
}

#[derive(Debug, Default)]
pub struct KernelVariableExtractor {
    /// Names never hoisted: function parameters, globals, and declared
    /// functions.
    skip: FxHashSet<String>,
    /// Names declared inside the region so far.
    declared: FxHashSet<String>,
    seen: FxHashSet<String>,
    hoisted_vars: Vec<String>,
    hoisted_decls: Vec<HoistedDecl>,
}

impl KernelVariableExtractor {
    pub fn new(skip: impl IntoIterator<Item = String>) -> Self {
        Self {
            skip: skip.into_iter().collect(),
            ..Self::default()
        }
    }

    /// Extract from a statement region.
    pub fn extract(mut self, stmts: &[Stmt]) -> (Vec<String>, Vec<HoistedDecl>) {
        for stmt in stmts {
            self.visit_stmt(stmt);
        }
        // A use may precede its declaration only across loop iterations, in
        // which case the decl still lives inside the region and the name
        // must not be hoisted.
        let declared = self.declared;
        let hoisted = self
            .hoisted_vars
            .into_iter()
            .filter(|name| !declared.contains(name))
            .collect();
        (hoisted, self.hoisted_decls)
    }
}

impl MirVisitor for KernelVariableExtractor {
    fn visit_var_expr(&mut self, name: &str) {
        if self.skip.contains(name) || self.seen.contains(name) {
            return;
        }
        self.seen.insert(name.to_string());
        self.hoisted_vars.push(name.to_string());
    }

    fn visit_var_decl(
        &mut self,
        name: &str,
        ty: Option<&MirType>,
        init: Option<&MirExpr>,
    ) {
        self.declared.insert(name.to_string());
        self.hoisted_decls.push(HoistedDecl {
            name: name.to_string(),
            ty: ty.cloned(),
            init: init.cloned(),
        });
    }

    fn visit_edge_set_apply(&mut self, apply: &EdgeSetApply) {
        // Filter names are strings on the apply node, not Var expressions;
        // they reference host state all the same.
        for name in [&apply.from_func, &apply.to_func].into_iter().flatten() {
            self.visit_var_expr(name);
        }
    }

    fn visit_stmt(&mut self, stmt: &Stmt) {
        // For-loop variables are declarations local to the region even
        // though they are not VarDecl statements.
        if let crate::mir::StmtKind::For { loop_var, .. } = &stmt.kind {
            self.declared.insert(loop_var.clone());
        }
        walk_stmt(self, stmt);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mir::{MirExpr, ScalarKind, Stmt, StmtKind};

    fn var(name: &str) -> MirExpr {
        MirExpr::Var(name.to_string())
    }

    #[test]
    fn outer_vars_are_hoisted_once_in_first_seen_order() {
        let region = vec![
            Stmt::new(StmtKind::Expr(MirExpr::Binary {
                op: crate::mir::BinOp::Add,
                lhs: Box::new(var("b")),
                rhs: Box::new(var("a")),
            })),
            Stmt::new(StmtKind::Expr(var("b"))),
        ];
        let (vars, decls) = KernelVariableExtractor::new([]).extract(&region);
        assert_eq!(vars, vec!["b".to_string(), "a".to_string()]);
        assert!(decls.is_empty());
    }

    #[test]
    fn inner_decls_are_recorded_not_hoisted() {
        let region = vec![
            Stmt::new(StmtKind::VarDecl {
                name: "x".into(),
                ty: Some(crate::mir::MirType::Scalar(ScalarKind::Int)),
                init: Some(MirExpr::IntLit(0)),
                is_const: false,
            }),
            Stmt::new(StmtKind::Expr(var("x"))),
            Stmt::new(StmtKind::Expr(var("y"))),
        ];
        let (vars, decls) = KernelVariableExtractor::new([]).extract(&region);
        assert_eq!(vars, vec!["y".to_string()]);
        assert_eq!(decls.len(), 1);
        assert_eq!(decls[0].name, "x");
    }

    #[test]
    fn use_before_decl_within_region_is_not_hoisted() {
        // Happens across loop iterations: the use precedes the declaration
        // textually, but the declaration is inside the region.
        let region = vec![
            Stmt::new(StmtKind::Expr(var("t"))),
            Stmt::new(StmtKind::VarDecl {
                name: "t".into(),
                ty: None,
                init: None,
                is_const: false,
            }),
        ];
        let (vars, _decls) = KernelVariableExtractor::new([]).extract(&region);
        assert!(vars.is_empty());
    }

    #[test]
    fn skip_set_excludes_params_and_globals() {
        let region = vec![Stmt::new(StmtKind::Expr(MirExpr::Binary {
            op: crate::mir::BinOp::Add,
            lhs: Box::new(var("param")),
            rhs: Box::new(var("local")),
        }))];
        let (vars, _) =
            KernelVariableExtractor::new(["param".to_string()]).extract(&region);
        assert_eq!(vars, vec!["local".to_string()]);
    }

    #[test]
    fn apply_filter_names_are_hoisted() {
        use crate::mir::{ApplyKind, Direction, EdgeSetApply};

        let apply = EdgeSetApply {
            target: Box::new(var("edges")),
            input_function: "updateEdge".into(),
            from_func: Some("frontier".into()),
            to_func: Some("only_roots".into()),
            change_tracking_field: None,
            disable_deduplication: false,
            kind: ApplyKind::Regular,
            direction: Direction::Push,
        };
        let region = vec![Stmt::new(StmtKind::Expr(MirExpr::EdgeSetApply(apply)))];

        // The edgeset and the predicate function are skip-set names; the
        // frontier appears only as a filter and must still be hoisted.
        let (vars, _) = KernelVariableExtractor::new([
            "edges".to_string(),
            "only_roots".to_string(),
        ])
        .extract(&region);
        assert_eq!(vars, vec!["frontier".to_string()]);
    }

    #[test]
    fn extraction_is_idempotent() {
        let region = vec![Stmt::new(StmtKind::Expr(var("a")))];
        let first = KernelVariableExtractor::new([]).extract(&region);
        let second = KernelVariableExtractor::new([]).extract(&region);
        assert_eq!(first, second);
    }
}
