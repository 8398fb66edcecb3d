//! Fused-kernel code generation.
//!
//! A `while` loop whose label is named in the backend configuration is
//! compiled into a single `__global__` kernel containing the whole loop:
//! every variable that appears in the loop body is renamed into a
//! `__local_` namespace so host-visible globals are never aliased,
//! declarations found in the region are lifted to kernel-local storage,
//! print statements go through the device-safe variant, and edgeset apply
//! bodies are emitted inline within the kernel rather than as separate
//! launches, separated by grid synchronization.
//!
//! Hoisted variables are passed by value at the launch and act as
//! read-only per-launch snapshots.

use rustc_hash::{FxHashMap, FxHashSet};

use crate::mir::context::MirContext;
use crate::mir::hoist::{HoistedDecl, KernelVariableExtractor};
use crate::mir::visit::{walk_expr, MirVisitor};
use crate::mir::{MirExpr, MirType, Stmt, StmtKind};

use super::kernel::{emit_traversal, gen_device_stmt, kernel_params};
use super::{render_expr, render_type, CodegenError, ExprEnv, SourceWriter};

/// Everything shared between the kernel emission and the host launch: the
/// edgeset parameters, the hoisted variables, and the lifted declarations.
pub(crate) struct FusedRegion {
    pub graphs: Vec<String>,
    pub hoisted: Vec<String>,
    pub decls: Vec<HoistedDecl>,
}

/// Analyze a fused while region (condition plus body).
pub(crate) fn fused_region(ctx: &MirContext, cond: &MirExpr, body: &[Stmt]) -> FusedRegion {
    let graphs = collect_graph_vars(body);
    // The extractor treats apply filter names as variable uses; declared
    // function names go into the skip set so a predicate filter is never
    // hoisted as if it were a frontier (the same distinction
    // `kernel_params` makes when shaping kernel signatures).
    let skip: Vec<String> = ctx
        .globals
        .iter()
        .map(|g| g.name.clone())
        .chain(ctx.functions.iter().map(|f| f.name.clone()))
        .chain(graphs.iter().cloned())
        .collect();

    // The condition is part of the region; splice it in front so its
    // variables are hoisted in a deterministic order.
    let mut region: Vec<Stmt> = vec![Stmt::new(StmtKind::Expr(cond.clone()))];
    region.extend_from_slice(body);
    let (hoisted, decls) = KernelVariableExtractor::new(skip).extract(&region);

    FusedRegion {
        graphs,
        hoisted,
        decls,
    }
}

/// The launch arguments for a fused kernel, in kernel-parameter order.
pub(crate) fn fused_launch_args(
    ctx: &MirContext,
    cond: &MirExpr,
    body: &[Stmt],
) -> Vec<String> {
    let region = fused_region(ctx, cond, body);
    region
        .graphs
        .into_iter()
        .chain(region.hoisted)
        .collect()
}

/// Edgeset variables targeted by applies inside the region, first-seen
/// order.
fn collect_graph_vars(body: &[Stmt]) -> Vec<String> {
    struct Graphs(Vec<String>);
    impl MirVisitor for Graphs {
        fn visit_expr(&mut self, expr: &MirExpr) {
            if let MirExpr::EdgeSetApply(apply) = expr {
                if let MirExpr::Var(name) = &*apply.target {
                    if !self.0.iter().any(|g| g == name) {
                        self.0.push(name.clone());
                    }
                }
            }
            walk_expr(self, expr);
        }
    }
    let mut graphs = Graphs(Vec::new());
    for stmt in body {
        graphs.visit_stmt(stmt);
    }
    graphs.0
}

/// Find fused while loops in a function body and generate their kernels.
pub(crate) fn gen_fused_kernels_in(
    ctx: &MirContext,
    stmts: &[Stmt],
    types: &FxHashMap<String, MirType>,
    w: &mut SourceWriter,
) -> Result<(), CodegenError> {
    for stmt in stmts {
        match &stmt.kind {
            StmtKind::While { cond, body } => {
                let fused = stmt
                    .label
                    .as_ref()
                    .filter(|l| ctx.config.fused_kernels.contains(*l));
                if let Some(label) = fused {
                    gen_fused_kernel(ctx, label, cond, body, types, w)?;
                    w.blank();
                } else {
                    gen_fused_kernels_in(ctx, body, types, w)?;
                }
            }
            StmtKind::For { body, .. } | StmtKind::DoWhile { body, .. } => {
                gen_fused_kernels_in(ctx, body, types, w)?;
            }
            StmtKind::If {
                then_body,
                else_body,
                ..
            } => {
                gen_fused_kernels_in(ctx, then_body, types, w)?;
                if let Some(else_body) = else_body {
                    gen_fused_kernels_in(ctx, else_body, types, w)?;
                }
            }
            _ => {}
        }
    }
    Ok(())
}

fn gen_fused_kernel(
    ctx: &MirContext,
    label: &str,
    cond: &MirExpr,
    body: &[Stmt],
    types: &FxHashMap<String, MirType>,
    w: &mut SourceWriter,
) -> Result<(), CodegenError> {
    let region = fused_region(ctx, cond, body);

    // Everything local to the kernel lives in the __local_ namespace.
    let mut local_names: FxHashSet<String> = FxHashSet::default();
    for name in region.hoisted.iter() {
        local_names.insert(name.clone());
    }
    for decl in &region.decls {
        local_names.insert(decl.name.clone());
    }

    let mut sig = Vec::new();
    for graph in &region.graphs {
        sig.push(format!("ripple::GraphT {graph}"));
    }
    for name in &region.hoisted {
        let ty = types.get(name).ok_or_else(|| {
            CodegenError::new(format!(
                "cannot determine the type of `{name}` hoisted into fused kernel `{label}`"
            ))
        })?;
        sig.push(format!("{} __local_{name}", render_type(ty)));
    }

    w.line(&format!(
        "__global__ void {label}_fused_kernel({}) {{",
        sig.join(", ")
    ));
    w.indent();

    // Region declarations are lifted to kernel scope, in discovery order.
    for decl in &region.decls {
        let ty = decl
            .ty
            .clone()
            .or_else(|| types.get(&decl.name).cloned())
            .ok_or_else(|| {
                CodegenError::new(format!(
                    "cannot determine the type of `{}` declared in fused kernel `{label}`",
                    decl.name
                ))
            })?;
        w.line(&format!("{} __local_{};", render_type(&ty), decl.name));
    }

    let env = ExprEnv::fused(ctx, &local_names);
    w.line(&format!("while ({}) {{", render_expr(&env, cond)?));
    w.indent();
    for stmt in body {
        emit_fused_stmt(ctx, &env, stmt, w)?;
    }
    w.line("ripple::grid_sync();");
    w.dedent();
    w.line("}");

    w.dedent();
    w.line("}");
    Ok(())
}

/// Statement emission inside a fused kernel: declarations become
/// assignments into the lifted locals, applies are inlined, everything
/// else follows the device rules.
fn emit_fused_stmt(
    ctx: &MirContext,
    env: &ExprEnv,
    stmt: &Stmt,
    w: &mut SourceWriter,
) -> Result<(), CodegenError> {
    match &stmt.kind {
        StmtKind::VarDecl { name, init, .. } => {
            // The declaration itself was lifted to kernel scope.
            match init {
                Some(init) if is_apply_value(init) => {
                    emit_inline_apply(ctx, env, init, Some(format!("__local_{name}")), w)?;
                }
                Some(init) => {
                    w.line(&format!(
                        "__local_{name} = {};",
                        render_expr(env, init)?
                    ));
                }
                None => {}
            }
        }

        StmtKind::Assign { targets, value } if targets.len() == 1 => {
            if is_apply_value(value) {
                let target = render_expr(env, &targets[0])?;
                emit_inline_apply(ctx, env, value, Some(target), w)?;
            } else {
                w.line(&format!(
                    "{} = {};",
                    render_expr(env, &targets[0])?,
                    render_expr(env, value)?
                ));
            }
        }

        StmtKind::Expr(expr) if is_apply_value(expr) => {
            emit_inline_apply(ctx, env, expr, None, w)?;
        }

        StmtKind::Print { args, .. } => {
            let rendered: Vec<String> = args
                .iter()
                .map(|a| render_expr(env, a))
                .collect::<Result<_, _>>()?;
            w.line(&format!("ripple::device_print({});", rendered.join(", ")));
        }

        StmtKind::While { cond, body } => {
            w.line(&format!("while ({}) {{", render_expr(env, cond)?));
            w.indent();
            for s in body {
                emit_fused_stmt(ctx, env, s, w)?;
            }
            w.dedent();
            w.line("}");
        }

        StmtKind::If {
            cond,
            then_body,
            else_body,
        } => {
            w.line(&format!("if ({}) {{", render_expr(env, cond)?));
            w.indent();
            for s in then_body {
                emit_fused_stmt(ctx, env, s, w)?;
            }
            w.dedent();
            if let Some(else_body) = else_body {
                w.line("} else {");
                w.indent();
                for s in else_body {
                    emit_fused_stmt(ctx, env, s, w)?;
                }
                w.dedent();
            }
            w.line("}");
        }

        // The remaining forms behave exactly as in device functions. Fused
        // bodies execute in push style, so shared writes stay atomic.
        _ => gen_device_stmt(ctx, env, stmt, true, w)?,
    }
    Ok(())
}

/// Inline an edgeset apply inside the fused kernel: the traversal loops
/// are emitted in place, followed by a grid synchronization so iteration
/// effects are visible before the next statement.
fn emit_inline_apply(
    ctx: &MirContext,
    env: &ExprEnv,
    expr: &MirExpr,
    assign_to: Option<String>,
    w: &mut SourceWriter,
) -> Result<(), CodegenError> {
    let (dedup, apply) = match expr {
        MirExpr::VertexSetDedup { target } => match &**target {
            MirExpr::EdgeSetApply(apply) => (true, apply),
            _ => {
                return Err(CodegenError::new(
                    "dedup of something other than an edgeset apply",
                ))
            }
        },
        MirExpr::EdgeSetApply(apply) => (false, apply),
        _ => unreachable!("caller checked is_apply_value"),
    };

    let graph = match &*apply.target {
        MirExpr::Var(name) => name.clone(),
        _ => {
            return Err(CodegenError::new(
                "fused kernels require the apply target to be an edgeset variable",
            ))
        }
    };
    let params = kernel_params(ctx, apply);

    if params.has_output {
        w.line(&format!(
            "ripple::VertexFrontier __output_frontier = ripple::device_new_frontier({graph});"
        ));
    }

    let tid = "threadIdx.x + blockIdx.x * blockDim.x";
    emit_traversal(ctx, env, apply, &params, tid, &graph, w)?;
    w.line("ripple::grid_sync();");

    if params.has_output {
        if dedup {
            w.line("ripple::dedup_frontier_device(__output_frontier);");
        }
        if let Some(target) = assign_to {
            w.line(&format!("{target} = __output_frontier;"));
        }
    } else if assign_to.is_some() {
        return Err(CodegenError::new(
            "an apply without change tracking produces no frontier to assign",
        ));
    }
    Ok(())
}

fn is_apply_value(expr: &MirExpr) -> bool {
    match expr {
        MirExpr::EdgeSetApply(_) => true,
        MirExpr::VertexSetDedup { target } => {
            matches!(&**target, MirExpr::EdgeSetApply(_))
        }
        _ => false,
    }
}
