//! Traversal direction choice.
//!
//! Lowering leaves every edgeset apply's direction `Unresolved`; this pass
//! fills it in from the backend configuration, keyed by the innermost
//! statement label. The default is push. A `hybrid` choice rewrites the
//! statement into a `HybridGpu` node carrying a frontier-size predicate and
//! the push and pull alternatives.

use super::context::{DirectionChoice, MirContext};
use super::{CmpOp, Direction, MirExpr, Stmt, StmtKind};

pub fn resolve_directions(ctx: &mut MirContext) {
    let config = ctx.config.clone();
    for global in &mut ctx.globals {
        if let Some(init) = &mut global.init {
            resolve_expr(init, Direction::Push);
        }
    }
    for func in &mut ctx.functions {
        if let Some(body) = &mut func.body {
            for stmt in body {
                resolve_stmt(stmt, &config, None);
            }
        }
    }
}

fn resolve_stmt(
    stmt: &mut Stmt,
    config: &super::context::BackendConfig,
    inherited: Option<&str>,
) {
    let label_owned = stmt.label.clone();
    let label = label_owned.as_deref().or(inherited);

    let choice = label
        .and_then(|l| config.directions.get(l))
        .copied()
        .unwrap_or(DirectionChoice::Push);

    // Hybrid rewrites a bare apply statement into the two-alternative form.
    if let DirectionChoice::Hybrid { threshold } = choice {
        if let StmtKind::Expr(MirExpr::EdgeSetApply(apply)) = &stmt.kind {
            let mut push = apply.clone();
            push.direction = Direction::Push;
            let mut pull = apply.clone();
            pull.direction = Direction::Pull;

            let frontier_size = match &apply.from_func {
                Some(from) => MirExpr::Call {
                    name: "builtin_getVertexSetSize".to_string(),
                    args: vec![MirExpr::Var(from.clone())],
                },
                None => MirExpr::Call {
                    name: "builtin_getVertexSetSize".to_string(),
                    args: vec![MirExpr::Call {
                        name: "builtin_getVertices".to_string(),
                        args: vec![(*apply.target).clone()],
                    }],
                },
            };
            let condition = MirExpr::Compare {
                operands: vec![frontier_size, MirExpr::IntLit(threshold)],
                ops: vec![CmpOp::Gt],
            };

            stmt.kind = StmtKind::HybridGpu {
                condition,
                push_stmt: Box::new(Stmt::new(StmtKind::Expr(MirExpr::EdgeSetApply(push)))),
                pull_stmt: Box::new(Stmt::new(StmtKind::Expr(MirExpr::EdgeSetApply(pull)))),
            };
            return;
        }
    }

    let direction = match choice {
        DirectionChoice::Pull => Direction::Pull,
        _ => Direction::Push,
    };

    match &mut stmt.kind {
        StmtKind::VarDecl { init: Some(e), .. } | StmtKind::Expr(e) => {
            resolve_expr(e, direction);
        }
        StmtKind::Assign { targets, value } => {
            for t in targets {
                resolve_expr(t, direction);
            }
            resolve_expr(value, direction);
        }
        StmtKind::Reduce { target, value, .. }
        | StmtKind::CompareAndSwap { target, value, .. } => {
            resolve_expr(target, direction);
            resolve_expr(value, direction);
        }
        StmtKind::For {
            lower,
            upper,
            body,
            ..
        } => {
            resolve_expr(lower, direction);
            resolve_expr(upper, direction);
            for s in body {
                resolve_stmt(s, config, label);
            }
        }
        StmtKind::While { cond, body } => {
            resolve_expr(cond, direction);
            for s in body {
                resolve_stmt(s, config, label);
            }
        }
        StmtKind::DoWhile { body, cond } => {
            for s in body {
                resolve_stmt(s, config, label);
            }
            resolve_expr(cond, direction);
        }
        StmtKind::If {
            cond,
            then_body,
            else_body,
        } => {
            resolve_expr(cond, direction);
            for s in then_body {
                resolve_stmt(s, config, label);
            }
            if let Some(else_body) = else_body {
                for s in else_body {
                    resolve_stmt(s, config, label);
                }
            }
        }
        StmtKind::Print { args, .. } => {
            for a in args {
                resolve_expr(a, direction);
            }
        }
        StmtKind::HybridGpu {
            push_stmt,
            pull_stmt,
            ..
        } => {
            resolve_stmt(push_stmt, config, label);
            resolve_stmt(pull_stmt, config, label);
        }
        StmtKind::VarDecl { init: None, .. } | StmtKind::Break => {}
    }
}

/// Set the direction on every unresolved apply inside `expr`.
fn resolve_expr(expr: &mut MirExpr, direction: Direction) {
    match expr {
        MirExpr::EdgeSetApply(apply) => {
            if apply.direction == Direction::Unresolved {
                apply.direction = direction;
            }
            resolve_expr(&mut apply.target, direction);
        }
        MirExpr::Binary { lhs, rhs, .. } => {
            resolve_expr(lhs, direction);
            resolve_expr(rhs, direction);
        }
        MirExpr::Unary { operand, .. } => resolve_expr(operand, direction),
        MirExpr::Compare { operands, .. } => {
            for o in operands {
                resolve_expr(o, direction);
            }
        }
        MirExpr::TensorRead { target, indices } => {
            resolve_expr(target, direction);
            for i in indices {
                resolve_expr(i, direction);
            }
        }
        MirExpr::TupleRead { tuple, .. } => resolve_expr(tuple, direction),
        MirExpr::Call { args, .. } => {
            for a in args {
                resolve_expr(a, direction);
            }
        }
        MirExpr::VertexSetApply { target, .. }
        | MirExpr::VertexSetDedup { target } => resolve_expr(target, direction),
        MirExpr::VertexSetAlloc { num_elements, .. }
        | MirExpr::ListAlloc { num_elements, .. } => {
            if let Some(n) = num_elements {
                resolve_expr(n, direction);
            }
        }
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mir::context::BackendConfig;
    use crate::mir::{ApplyKind, EdgeSetApply, MirFunction};

    fn apply_stmt(label: Option<&str>) -> Stmt {
        let apply = EdgeSetApply {
            target: Box::new(MirExpr::Var("edges".into())),
            input_function: "updateEdge".into(),
            from_func: Some("frontier".into()),
            to_func: None,
            change_tracking_field: None,
            disable_deduplication: false,
            kind: ApplyKind::Regular,
            direction: Direction::Unresolved,
        };
        Stmt {
            label: label.map(String::from),
            kind: StmtKind::Expr(MirExpr::EdgeSetApply(apply)),
        }
    }

    fn ctx_with(stmt: Stmt, config: BackendConfig) -> MirContext {
        let mut ctx = MirContext::new(config);
        ctx.add_function(MirFunction {
            name: "main".into(),
            params: vec![],
            results: vec![],
            body: Some(vec![stmt]),
            exported: false,
        });
        ctx
    }

    #[test]
    fn default_direction_is_push() {
        let mut ctx = ctx_with(apply_stmt(None), BackendConfig::default());
        resolve_directions(&mut ctx);
        match &ctx.functions[0].body.as_ref().unwrap()[0].kind {
            StmtKind::Expr(MirExpr::EdgeSetApply(a)) => {
                assert_eq!(a.direction, Direction::Push);
            }
            other => panic!("unexpected statement {other:?}"),
        }
    }

    #[test]
    fn labeled_override_selects_pull() {
        let mut config = BackendConfig::default();
        config
            .directions
            .insert("s1".to_string(), DirectionChoice::Pull);
        let mut ctx = ctx_with(apply_stmt(Some("s1")), config);
        resolve_directions(&mut ctx);
        match &ctx.functions[0].body.as_ref().unwrap()[0].kind {
            StmtKind::Expr(MirExpr::EdgeSetApply(a)) => {
                assert_eq!(a.direction, Direction::Pull);
            }
            other => panic!("unexpected statement {other:?}"),
        }
    }

    #[test]
    fn hybrid_rewrites_into_two_alternatives() {
        let mut config = BackendConfig::default();
        config.directions.insert(
            "s1".to_string(),
            DirectionChoice::Hybrid { threshold: 1000 },
        );
        let mut ctx = ctx_with(apply_stmt(Some("s1")), config);
        resolve_directions(&mut ctx);
        match &ctx.functions[0].body.as_ref().unwrap()[0].kind {
            StmtKind::HybridGpu {
                condition,
                push_stmt,
                pull_stmt,
            } => {
                assert!(matches!(condition, MirExpr::Compare { .. }));
                match (&push_stmt.kind, &pull_stmt.kind) {
                    (
                        StmtKind::Expr(MirExpr::EdgeSetApply(push)),
                        StmtKind::Expr(MirExpr::EdgeSetApply(pull)),
                    ) => {
                        assert_eq!(push.direction, Direction::Push);
                        assert_eq!(pull.direction, Direction::Pull);
                    }
                    other => panic!("unexpected alternatives {other:?}"),
                }
            }
            other => panic!("expected a hybrid statement, got {other:?}"),
        }
    }
}
