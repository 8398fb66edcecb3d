//! Device-side code generation: `__device__` function declarations and the
//! `__global__` kernel shells for edgeset applies.
//!
//! The kernel plan walks every function body in declaration order and
//! assigns one kernel per apply site (hybrid statements contribute two, in
//! push-then-pull order). The host generator walks statements in the same
//! order, so kernel indices line up by construction. Applies inside fused
//! while loops are excluded here; the fused generator emits them inline.

use rustc_hash::FxHashSet;

use crate::mir::context::MirContext;
use crate::mir::{
    CasOp, Direction, EdgeSetApply, MirExpr, MirFunction, ReduceOp, Stmt, StmtKind,
};

use super::{render_expr, render_type, CodegenError, ExprEnv, SourceWriter};

/// One kernel to be generated for an apply site.
#[derive(Debug, Clone)]
pub(crate) struct KernelSpec {
    pub name: String,
    pub apply: EdgeSetApply,
}

/// Everything the generators need to know about apply sites and device
/// functions.
#[derive(Debug, Default)]
pub(crate) struct KernelPlan {
    pub kernels: Vec<KernelSpec>,
    /// Functions that must be emitted as `__device__`, in first-use order.
    pub device_fns: Vec<String>,
    /// Device functions reachable from a push-direction traversal; their
    /// shared writes need atomics.
    pub push_used: FxHashSet<String>,
}

impl KernelPlan {
    pub(crate) fn build(ctx: &MirContext) -> Result<Self, CodegenError> {
        let mut plan = KernelPlan::default();

        for global in &ctx.globals {
            if let Some(init) = &global.init {
                if contains_apply(init) {
                    return Err(CodegenError::new(format!(
                        "global `{}` is initialized by an edgeset apply; applies only run \
                         inside functions",
                        global.name
                    )));
                }
            }
        }

        for func in &ctx.functions {
            if let Some(body) = &func.body {
                for stmt in body {
                    plan.collect_stmt(ctx, stmt)?;
                }
            }
        }

        // A function that must run on the device cannot itself launch.
        for name in &plan.device_fns {
            if let Some(func) = ctx.function(name) {
                if let Some(body) = &func.body {
                    let mut nested = KernelPlan::default();
                    for stmt in body {
                        nested.collect_stmt(ctx, stmt)?;
                    }
                    if !nested.kernels.is_empty() {
                        return Err(CodegenError::new(format!(
                            "device function `{name}` contains an edgeset apply"
                        )));
                    }
                }
            }
        }

        Ok(plan)
    }

    fn collect_stmt(&mut self, ctx: &MirContext, stmt: &Stmt) -> Result<(), CodegenError> {
        match &stmt.kind {
            StmtKind::VarDecl { init: Some(e), .. } | StmtKind::Expr(e) => {
                self.collect_expr(ctx, e)?;
            }
            StmtKind::Assign { targets, value } => {
                for t in targets {
                    self.collect_expr(ctx, t)?;
                }
                self.collect_expr(ctx, value)?;
            }
            StmtKind::Reduce { target, value, .. }
            | StmtKind::CompareAndSwap { target, value, .. } => {
                self.collect_expr(ctx, target)?;
                self.collect_expr(ctx, value)?;
            }
            StmtKind::For {
                lower,
                upper,
                body,
                ..
            } => {
                self.collect_expr(ctx, lower)?;
                self.collect_expr(ctx, upper)?;
                for s in body {
                    self.collect_stmt(ctx, s)?;
                }
            }
            StmtKind::While { cond, body } => {
                let fused = stmt
                    .label
                    .as_ref()
                    .map(|l| ctx.config.fused_kernels.contains(l))
                    .unwrap_or(false);
                self.collect_expr(ctx, cond)?;
                if fused {
                    // The fused generator owns this region; record its
                    // device functions but plan no standalone kernels.
                    let mut collector = DeviceFnCollector {
                        ctx,
                        plan: self,
                        push: true,
                    };
                    for s in body {
                        collector.collect_stmt(s);
                    }
                } else {
                    for s in body {
                        self.collect_stmt(ctx, s)?;
                    }
                }
            }
            StmtKind::DoWhile { body, cond } => {
                for s in body {
                    self.collect_stmt(ctx, s)?;
                }
                self.collect_expr(ctx, cond)?;
            }
            StmtKind::If {
                cond,
                then_body,
                else_body,
            } => {
                self.collect_expr(ctx, cond)?;
                for s in then_body {
                    self.collect_stmt(ctx, s)?;
                }
                if let Some(else_body) = else_body {
                    for s in else_body {
                        self.collect_stmt(ctx, s)?;
                    }
                }
            }
            StmtKind::Print { args, .. } => {
                for a in args {
                    self.collect_expr(ctx, a)?;
                }
            }
            StmtKind::HybridGpu {
                push_stmt,
                pull_stmt,
                ..
            } => {
                self.collect_stmt(ctx, push_stmt)?;
                self.collect_stmt(ctx, pull_stmt)?;
            }
            StmtKind::VarDecl { init: None, .. } | StmtKind::Break => {}
        }
        Ok(())
    }

    fn collect_expr(&mut self, ctx: &MirContext, expr: &MirExpr) -> Result<(), CodegenError> {
        match expr {
            MirExpr::EdgeSetApply(apply) => {
                if apply.direction == Direction::Unresolved {
                    return Err(CodegenError::new(format!(
                        "apply of `{}` reached code generation with an unresolved \
                         traversal direction",
                        apply.input_function
                    )));
                }
                self.register_apply_fns(ctx, apply);
                let index = self.kernels.len() + 1;
                self.kernels.push(KernelSpec {
                    name: format!("{}_kernel_{index}", ctx.config.module_name),
                    apply: apply.clone(),
                });
                Ok(())
            }
            MirExpr::VertexSetDedup { target } => self.collect_expr(ctx, target),
            MirExpr::VertexSetApply { input_function, .. } => {
                self.add_device_fn(input_function, true);
                Ok(())
            }
            MirExpr::Binary { lhs, rhs, .. } => {
                self.collect_expr(ctx, lhs)?;
                self.collect_expr(ctx, rhs)
            }
            MirExpr::Unary { operand, .. } => self.collect_expr(ctx, operand),
            MirExpr::Compare { operands, .. } => {
                for o in operands {
                    self.collect_expr(ctx, o)?;
                }
                Ok(())
            }
            MirExpr::TensorRead { target, indices } => {
                self.collect_expr(ctx, target)?;
                for i in indices {
                    self.collect_expr(ctx, i)?;
                }
                Ok(())
            }
            MirExpr::TupleRead { tuple, .. } => self.collect_expr(ctx, tuple),
            MirExpr::Call { args, .. } => {
                for a in args {
                    self.collect_expr(ctx, a)?;
                }
                Ok(())
            }
            MirExpr::VertexSetAlloc { num_elements, .. }
            | MirExpr::ListAlloc { num_elements, .. } => {
                if let Some(n) = num_elements {
                    self.collect_expr(ctx, n)?;
                }
                Ok(())
            }
            _ => Ok(()),
        }
    }

    /// Record the device functions an apply reaches, with the direction
    /// they are used in.
    fn register_apply_fns(&mut self, ctx: &MirContext, apply: &EdgeSetApply) {
        let push = apply.direction == Direction::Push;
        self.add_device_fn(&apply.input_function, push);
        for filter in [&apply.from_func, &apply.to_func].into_iter().flatten() {
            if ctx.function(filter).is_some() {
                self.add_device_fn(filter, push);
            }
        }
    }

    fn add_device_fn(&mut self, name: &str, push: bool) {
        if !self.device_fns.iter().any(|f| f == name) {
            self.device_fns.push(name.to_string());
        }
        if push {
            self.push_used.insert(name.to_string());
        }
    }
}

/// Collects device functions from a fused region without planning kernels.
struct DeviceFnCollector<'a, 'b> {
    ctx: &'a MirContext,
    plan: &'b mut KernelPlan,
    push: bool,
}

impl DeviceFnCollector<'_, '_> {
    fn collect_stmt(&mut self, stmt: &Stmt) {
        use crate::mir::visit::{walk_stmt, MirVisitor};

        struct V<'a, 'b, 'c>(&'c mut DeviceFnCollector<'a, 'b>);
        impl MirVisitor for V<'_, '_, '_> {
            fn visit_edge_set_apply(&mut self, apply: &EdgeSetApply) {
                let push = self.0.push;
                self.0.plan.add_device_fn(&apply.input_function, push);
                for filter in [&apply.from_func, &apply.to_func].into_iter().flatten() {
                    if self.0.ctx.function(filter).is_some() {
                        self.0.plan.add_device_fn(filter, push);
                    }
                }
            }
        }
        let mut v = V(self);
        v.visit_stmt(stmt);
    }
}

/// Whether an expression contains an edgeset apply anywhere.
pub(crate) fn contains_apply(expr: &MirExpr) -> bool {
    use crate::mir::visit::{walk_expr, MirVisitor};

    struct Finder(bool);
    impl MirVisitor for Finder {
        fn visit_edge_set_apply(&mut self, _apply: &EdgeSetApply) {
            self.0 = true;
        }
    }
    let mut finder = Finder(false);
    walk_expr(&mut finder, expr);
    finder.0
}

// ── Device function emission ───────────────────────────────────────────

/// Emit every device function declaration.
pub(crate) fn gen_device_functions(
    ctx: &MirContext,
    plan: &KernelPlan,
    w: &mut SourceWriter,
) -> Result<(), CodegenError> {
    for name in &plan.device_fns {
        let func = ctx.function(name).ok_or_else(|| {
            CodegenError::new(format!(
                "apply references `{name}`, which is not a declared function"
            ))
        })?;
        gen_device_function(ctx, func, plan.push_used.contains(name), w)?;
        w.blank();
    }
    Ok(())
}

fn gen_device_function(
    ctx: &MirContext,
    func: &MirFunction,
    used_in_push: bool,
    w: &mut SourceWriter,
) -> Result<(), CodegenError> {
    let module = &ctx.config.module_name;
    let ret = match func.results.len() {
        0 => "void".to_string(),
        1 => render_type(&func.results[0].ty),
        n => {
            return Err(CodegenError::new(format!(
                "function `{}` declares {n} results; the backend supports at most one",
                func.name
            )))
        }
    };
    let params: Vec<String> = func
        .params
        .iter()
        .map(|p| {
            let amp = if p.is_inout { "&" } else { "" };
            format!("{} {amp}{}", render_type(&p.ty), p.name)
        })
        .collect();
    w.line(&format!(
        "{ret} __device__ {module}_{}({}) {{",
        func.name,
        params.join(", ")
    ));
    w.indent();

    for result in &func.results {
        w.line(&format!("{} {};", render_type(&result.ty), result.name));
    }

    let body = func.body.as_ref().ok_or_else(|| {
        CodegenError::new(format!(
            "external function `{}` cannot be used as a device function",
            func.name
        ))
    })?;
    let env = ExprEnv::device(ctx);
    for stmt in body {
        gen_device_stmt(ctx, &env, stmt, used_in_push, w)?;
    }

    if let Some(result) = func.results.first() {
        w.line(&format!("return {};", result.name));
    }
    w.dedent();
    w.line("}");
    Ok(())
}

/// Emit one statement inside device code.
///
/// Writes to shared memory (tensor reads) become atomic accumulations or
/// CAS calls; in pull-only functions parallelism is per-destination and
/// plain writes are allowed.
pub(crate) fn gen_device_stmt(
    ctx: &MirContext,
    env: &ExprEnv,
    stmt: &Stmt,
    used_in_push: bool,
    w: &mut SourceWriter,
) -> Result<(), CodegenError> {
    match &stmt.kind {
        StmtKind::VarDecl { name, ty, init, .. } => {
            let rendered_ty = ty
                .as_ref()
                .map(render_type)
                .unwrap_or_else(|| "auto".to_string());
            match init {
                Some(init) => w.line(&format!(
                    "{rendered_ty} {} = {};",
                    env.var_name(name),
                    render_expr(env, init)?
                )),
                None => w.line(&format!("{rendered_ty} {};", env.var_name(name))),
            }
        }

        StmtKind::Assign { targets, value } => {
            if targets.len() != 1 {
                return Err(CodegenError::new(
                    "multi-target assignment is not supported inside device code",
                ));
            }
            let value_text = render_expr(env, value)?;
            let target = &targets[0];
            if is_shared_write(target) && used_in_push {
                // Another thread may write the same destination; make the
                // store atomic.
                w.line(&format!(
                    "ripple::atomic_store(&{}, {});",
                    render_expr(env, target)?,
                    value_text
                ));
            } else {
                w.line(&format!("{} = {};", render_expr(env, target)?, value_text));
            }
        }

        StmtKind::Reduce { target, value, op } => {
            let value_text = render_expr(env, value)?;
            let target_text = render_expr(env, target)?;
            if is_shared_write(target) {
                let call = match op {
                    ReduceOp::Sum => "ripple::atomicAdd",
                    ReduceOp::Min => "ripple::atomicMin",
                    ReduceOp::Max => "ripple::atomicMax",
                };
                w.line(&format!("{call}(&{target_text}, {value_text});"));
            } else {
                match op {
                    ReduceOp::Sum => w.line(&format!("{target_text} += {value_text};")),
                    ReduceOp::Min => w.line(&format!(
                        "{target_text} = min({target_text}, {value_text});"
                    )),
                    ReduceOp::Max => w.line(&format!(
                        "{target_text} = max({target_text}, {value_text});"
                    )),
                }
            }
        }

        StmtKind::CompareAndSwap { target, value, op } => {
            let call = match op {
                CasOp::Min => "ripple::writeMin",
                CasOp::Max => "ripple::writeMax",
            };
            w.line(&format!(
                "{call}(&{}, {});",
                render_expr(env, target)?,
                render_expr(env, value)?
            ));
        }

        StmtKind::For {
            loop_var,
            lower,
            upper,
            body,
        } => {
            let var = env.var_name(loop_var);
            w.line(&format!(
                "for (int32_t {var} = {}; {var} < {}; {var}++) {{",
                render_expr(env, lower)?,
                render_expr(env, upper)?
            ));
            w.indent();
            for s in body {
                gen_device_stmt(ctx, env, s, used_in_push, w)?;
            }
            w.dedent();
            w.line("}");
        }

        StmtKind::While { cond, body } => {
            w.line(&format!("while ({}) {{", render_expr(env, cond)?));
            w.indent();
            for s in body {
                gen_device_stmt(ctx, env, s, used_in_push, w)?;
            }
            w.dedent();
            w.line("}");
        }

        StmtKind::DoWhile { body, cond } => {
            w.line("do {");
            w.indent();
            for s in body {
                gen_device_stmt(ctx, env, s, used_in_push, w)?;
            }
            w.dedent();
            w.line(&format!("}} while ({});", render_expr(env, cond)?));
        }

        StmtKind::If {
            cond,
            then_body,
            else_body,
        } => {
            w.line(&format!("if ({}) {{", render_expr(env, cond)?));
            w.indent();
            for s in then_body {
                gen_device_stmt(ctx, env, s, used_in_push, w)?;
            }
            w.dedent();
            if let Some(else_body) = else_body {
                w.line("} else {");
                w.indent();
                for s in else_body {
                    gen_device_stmt(ctx, env, s, used_in_push, w)?;
                }
                w.dedent();
            }
            w.line("}");
        }

        StmtKind::Print { args, .. } => {
            let rendered: Vec<String> = args
                .iter()
                .map(|a| render_expr(env, a))
                .collect::<Result<_, _>>()?;
            w.line(&format!("ripple::device_print({});", rendered.join(", ")));
        }

        StmtKind::Break => w.line("break;"),

        StmtKind::Expr(expr) => {
            w.line(&format!("{};", render_expr(env, expr)?));
        }

        StmtKind::HybridGpu { .. } => {
            return Err(CodegenError::new(
                "hybrid traversal statement inside device code",
            ));
        }
    }
    Ok(())
}

/// Whether a write target may be written by more than one work unit: any
/// tensor (property array) element.
fn is_shared_write(target: &MirExpr) -> bool {
    matches!(target, MirExpr::TensorRead { .. })
}

// ── Kernel shell emission ──────────────────────────────────────────────

/// Which extra parameters a kernel takes, derived from the apply node. The
/// host launch derives its arguments from the same data.
pub(crate) struct KernelParams {
    /// The frontier argument: a vertexset variable used as source filter.
    pub frontier: Option<String>,
    /// Whether the kernel produces an output frontier (change tracking).
    pub has_output: bool,
}

pub(crate) fn kernel_params(ctx: &MirContext, apply: &EdgeSetApply) -> KernelParams {
    let frontier = apply
        .from_func
        .as_ref()
        .filter(|name| ctx.function(name).is_none())
        .cloned();
    KernelParams {
        frontier,
        has_output: apply.change_tracking_field.is_some(),
    }
}

/// Emit every planned kernel shell.
pub(crate) fn gen_kernels(
    ctx: &MirContext,
    plan: &KernelPlan,
    w: &mut SourceWriter,
) -> Result<(), CodegenError> {
    for spec in &plan.kernels {
        gen_kernel_shell(ctx, spec, w)?;
        w.blank();
    }
    Ok(())
}

fn gen_kernel_shell(
    ctx: &MirContext,
    spec: &KernelSpec,
    w: &mut SourceWriter,
) -> Result<(), CodegenError> {
    let apply = &spec.apply;
    let params = kernel_params(ctx, apply);

    let mut sig = vec!["ripple::GraphT graph".to_string()];
    if params.frontier.is_some() {
        sig.push("ripple::VertexFrontier frontier".to_string());
    }
    if params.has_output {
        sig.push("ripple::VertexFrontier __output_frontier".to_string());
    }

    w.line(&format!("__global__ void {}({}) {{", spec.name, sig.join(", ")));
    w.indent();
    w.line("int32_t tid = blockIdx.x * blockDim.x + threadIdx.x;");

    let env = ExprEnv::device(ctx);
    emit_traversal(ctx, &env, apply, &params, "tid", "graph", w)?;

    w.dedent();
    w.line("}");
    Ok(())
}

/// Emit the edge traversal loop for an apply. Shared by the standalone
/// kernel shells and the fused-kernel generator (which passes its own
/// thread index expression and renamed frontier).
pub(crate) fn emit_traversal(
    ctx: &MirContext,
    env: &ExprEnv,
    apply: &EdgeSetApply,
    params: &KernelParams,
    tid: &str,
    graph: &str,
    w: &mut SourceWriter,
) -> Result<(), CodegenError> {
    let module = &ctx.config.module_name;
    let from_pred = apply
        .from_func
        .as_ref()
        .filter(|name| ctx.function(name).is_some());
    // Standalone kernels receive the frontier as a parameter; fused code
    // reads the renamed local directly.
    let frontier = match (&params.frontier, env.local_names) {
        (Some(name), Some(_)) => env.var_name(name),
        (Some(_), None) => "frontier".to_string(),
        (None, _) => String::new(),
    };

    match apply.direction {
        Direction::Push => {
            if params.frontier.is_some() {
                w.line(&format!(
                    "for (int32_t idx = {tid}; idx < ripple::frontier_size({frontier}); \
                     idx += gridDim.x * blockDim.x) {{"
                ));
                w.indent();
                w.line(&format!(
                    "int32_t src = ripple::frontier_vertex({frontier}, idx);"
                ));
            } else {
                w.line(&format!(
                    "for (int32_t src = {tid}; src < {graph}.num_vertices; \
                     src += gridDim.x * blockDim.x) {{"
                ));
                w.indent();
            }
            if let Some(pred) = from_pred {
                w.line(&format!("if (!{module}_{pred}(src)) continue;"));
            }
            w.line(&format!(
                "for (int32_t eid = {graph}.row_offsets[src]; \
                 eid < {graph}.row_offsets[src + 1]; eid++) {{"
            ));
            w.indent();
            w.line(&format!("int32_t dst = {graph}.col_indices[eid];"));
            if let Some(to) = &apply.to_func {
                w.line(&format!("if (!{module}_{to}(dst)) continue;"));
            }
            emit_apply_body(ctx, apply, graph, w)?;
            w.dedent();
            w.line("}");
            w.dedent();
            w.line("}");
        }
        Direction::Pull => {
            w.line(&format!(
                "for (int32_t dst = {tid}; dst < {graph}.num_vertices; \
                 dst += gridDim.x * blockDim.x) {{"
            ));
            w.indent();
            if let Some(to) = &apply.to_func {
                w.line(&format!("if (!{module}_{to}(dst)) continue;"));
            }
            w.line(&format!(
                "for (int32_t eid = {graph}.col_offsets[dst]; \
                 eid < {graph}.col_offsets[dst + 1]; eid++) {{"
            ));
            w.indent();
            w.line(&format!("int32_t src = {graph}.row_indices[eid];"));
            if params.frontier.is_some() {
                w.line(&format!(
                    "if (!ripple::in_frontier({frontier}, src)) continue;"
                ));
            }
            if let Some(pred) = from_pred {
                w.line(&format!("if (!{module}_{pred}(src)) continue;"));
            }
            emit_apply_body(ctx, apply, graph, w)?;
            w.dedent();
            w.line("}");
            w.dedent();
            w.line("}");
        }
        Direction::Unresolved => {
            return Err(CodegenError::new(
                "apply reached kernel emission with an unresolved direction",
            ));
        }
    }
    Ok(())
}

/// The per-edge work: call the apply function, and with change tracking
/// enqueue destinations whose tracked field changed.
fn emit_apply_body(
    ctx: &MirContext,
    apply: &EdgeSetApply,
    graph: &str,
    w: &mut SourceWriter,
) -> Result<(), CodegenError> {
    let module = &ctx.config.module_name;
    let func = ctx.function(&apply.input_function).ok_or_else(|| {
        CodegenError::new(format!(
            "apply references `{}`, which is not a declared function",
            apply.input_function
        ))
    })?;
    let call = match func.params.len() {
        2 => format!("{module}_{}(src, dst);", func.name),
        // Weighted apply functions take the edge weight as a third argument.
        3 => format!("{module}_{}(src, dst, {graph}.weights[eid]);", func.name),
        n => {
            return Err(CodegenError::new(format!(
                "apply function `{}` takes {n} parameters; expected 2 or 3",
                func.name
            )))
        }
    };

    match &apply.change_tracking_field {
        Some(field) => {
            let scalar = ctx.property_scalar(field).ok_or_else(|| {
                CodegenError::new(format!(
                    "change tracking field `{field}` is not a property array"
                ))
            })?;
            w.line(&format!(
                "{} __old_val = {field}[dst];",
                render_type(scalar)
            ));
            w.line(&call);
            w.line(&format!("if ({field}[dst] != __old_val) {{"));
            w.indent();
            w.line("ripple::enqueue_sparse(__output_frontier, dst);");
            w.dedent();
            w.line("}");
        }
        None => w.line(&call),
    }
    Ok(())
}
