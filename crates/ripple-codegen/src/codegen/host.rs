//! Host-side code generation.
//!
//! Emits the ordinary program flow with `__host__` function labels. Device
//! state is reached only through explicit points: property-array reads are
//! preceded by device-to-host copies and writes followed by host-to-device
//! copies; edgeset applies become kernel launches ordered by
//! `cudaDeviceSynchronize`; fused while loops become a single kernel
//! launch; hybrid statements branch between a pull and a push launch on the
//! runtime predicate.

use rustc_hash::FxHashMap;

use crate::mir::context::MirContext;
use crate::mir::visit::{walk_expr, MirVisitor};
use crate::mir::{
    CasOp, MirExpr, MirFunction, MirType, ReduceOp, ScalarKind, Stmt, StmtKind,
};

use super::kernel::{self, contains_apply, kernel_params, KernelPlan};
use super::{fused, render_expr, render_type, CodegenError, ExprEnv, SourceWriter};

pub(crate) struct CodeGenHost<'a> {
    ctx: &'a MirContext,
    plan: KernelPlan,
    w: SourceWriter,
    /// Index of the next kernel launch; stays in lockstep with the plan's
    /// traversal order.
    next_kernel: usize,
}

impl<'a> CodeGenHost<'a> {
    pub(crate) fn new(ctx: &'a MirContext) -> Result<Self, CodegenError> {
        let plan = KernelPlan::build(ctx)?;
        Ok(Self {
            ctx,
            plan,
            w: SourceWriter::new(),
            next_kernel: 0,
        })
    }

    pub(crate) fn generate(mut self) -> Result<String, CodegenError> {
        self.gen_includes();
        self.gen_globals();

        kernel::gen_device_functions(self.ctx, &self.plan, &mut self.w)?;
        kernel::gen_kernels(self.ctx, &self.plan, &mut self.w)?;
        self.gen_fused_kernels()?;

        let host_fns: Vec<&MirFunction> = self
            .ctx
            .functions
            .iter()
            .filter(|f| !self.plan.device_fns.iter().any(|d| d == &f.name))
            .collect();
        for func in host_fns {
            if func.body.is_some() {
                self.gen_host_function(func)?;
                self.w.blank();
            }
        }

        if self.ctx.function("main").is_some() {
            let module = &self.ctx.config.module_name;
            self.w.line("int main(int argc, char *argv[]) {");
            self.w.indent();
            self.w.line(&format!("{module}_main();"));
            self.w.line("return 0;");
            self.w.dedent();
            self.w.line("}");
        }

        Ok(self.w.finish())
    }

    fn gen_includes(&mut self) {
        self.w.line("#include \"ripple_gpu_runtime.h\"");
        self.w.blank();
    }

    /// Global declarations: property arrays live on the device with a host
    /// shadow; everything else is a plain host global.
    fn gen_globals(&mut self) {
        for global in &self.ctx.globals {
            match &global.ty {
                MirType::Vector {
                    element: Some(_),
                    scalar,
                    ..
                } => {
                    let t = render_type(scalar);
                    self.w
                        .line(&format!("__device__ {t} *{};", global.name));
                    self.w.line(&format!("{t} *__host_{};", global.name));
                }
                other => {
                    self.w
                        .line(&format!("{} {};", render_type(other), global.name));
                }
            }
        }
        self.w.blank();
    }

    /// Fused kernels are generated ahead of the host functions that launch
    /// them.
    fn gen_fused_kernels(&mut self) -> Result<(), CodegenError> {
        for func in &self.ctx.functions {
            if self.plan.device_fns.iter().any(|d| d == &func.name) {
                continue;
            }
            let Some(body) = &func.body else { continue };
            let types = collect_local_types(self.ctx, func);
            let mut out = SourceWriter::new();
            fused::gen_fused_kernels_in(self.ctx, body, &types, &mut out)?;
            self.w.raw(&out.finish());
        }
        Ok(())
    }

    // ── Host functions ─────────────────────────────────────────────────

    fn gen_host_function(&mut self, func: &MirFunction) -> Result<(), CodegenError> {
        let module = &self.ctx.config.module_name;
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
        self.w.line(&format!(
            "{ret} __host__ {module}_{}({}) {{",
            func.name,
            params.join(", ")
        ));
        self.w.indent();

        for result in &func.results {
            self.w
                .line(&format!("{} {};", render_type(&result.ty), result.name));
        }

        // The program's entry point performs global setup.
        if func.name == "main" {
            self.gen_global_init()?;
        }

        let body = func.body.as_ref().expect("caller checked for a body");
        for stmt in body {
            self.emit_stmt(stmt)?;
        }

        if let Some(result) = func.results.first() {
            self.w.line(&format!("return {};", result.name));
        }
        self.w.dedent();
        self.w.line("}");
        Ok(())
    }

    /// Initialization of globals: edgeset loads, property-array allocation
    /// and fills, scalar constants.
    fn gen_global_init(&mut self) -> Result<(), CodegenError> {
        let env = ExprEnv::host(self.ctx);
        for global in &self.ctx.globals {
            match &global.ty {
                MirType::Vector {
                    element: Some(element),
                    scalar,
                    ..
                } => {
                    let t = render_type(scalar);
                    let name = &global.name;
                    self.w.line(&format!(
                        "ripple::alloc_property<{t}>(&{name}, ripple::num_elements(\"{element}\"));"
                    ));
                    self.w.line(&format!(
                        "__host_{name} = ripple::alloc_host_shadow<{t}>(ripple::num_elements(\"{element}\"));"
                    ));
                    if let Some(init) = &global.init {
                        self.w.line(&format!(
                            "ripple::fill_property({name}, {});",
                            render_expr(&env, init)?
                        ));
                    }
                }
                _ => {
                    if let Some(init) = &global.init {
                        self.w.line(&format!(
                            "{} = {};",
                            global.name,
                            render_expr(&env, init)?
                        ));
                    }
                }
            }
        }
        Ok(())
    }

    // ── Statements ─────────────────────────────────────────────────────

    fn emit_stmt(&mut self, stmt: &Stmt) -> Result<(), CodegenError> {
        let env = ExprEnv::host(self.ctx);
        match &stmt.kind {
            StmtKind::VarDecl { name, ty, init, .. } => match init {
                Some(init) if is_apply_value(init) => {
                    self.w
                        .line(&format!("ripple::VertexFrontier {name};"));
                    self.emit_apply_launch(init, Some(name.clone()))?;
                }
                Some(init) => {
                    self.reject_buried_apply(init)?;
                    self.emit_read_copies_for(&[init.clone()])?;
                    let rendered_ty = ty
                        .as_ref()
                        .map(render_type)
                        .unwrap_or_else(|| "auto".to_string());
                    let text = render_expr(&env, init)?;
                    self.w.line(&format!("{rendered_ty} {name} = {text};"));
                }
                None => {
                    let rendered_ty = ty
                        .as_ref()
                        .map(render_type)
                        .unwrap_or_else(|| "int32_t".to_string());
                    self.w.line(&format!("{rendered_ty} {name};"));
                }
            },

            StmtKind::Assign { targets, value } => {
                if targets.len() != 1 {
                    return Err(CodegenError::new(
                        "multi-target assignment requires a tuple-returning call, which \
                         this backend does not generate",
                    ));
                }
                let target = &targets[0];
                if is_apply_value(value) {
                    let target_text = render_expr(&env, target)?;
                    self.emit_apply_launch(value, Some(target_text))?;
                } else {
                    self.reject_buried_apply(value)?;
                    self.emit_read_copies_for(&[value.clone(), target.clone()])?;
                    self.w.line(&format!(
                        "{} = {};",
                        render_expr(&env, target)?,
                        render_expr(&env, value)?
                    ));
                    self.emit_write_copy_for(target);
                }
            }

            StmtKind::Reduce { target, value, op } => {
                self.emit_read_copies_for(&[target.clone(), value.clone()])?;
                let t = render_expr(&env, target)?;
                let v = render_expr(&env, value)?;
                match op {
                    ReduceOp::Sum => self.w.line(&format!("{t} += {v};")),
                    ReduceOp::Min => self.w.line(&format!("{t} = std::min({t}, {v});")),
                    ReduceOp::Max => self.w.line(&format!("{t} = std::max({t}, {v});")),
                }
                self.emit_write_copy_for(target);
            }

            // Host code runs single threaded; the async reductions collapse
            // to their plain forms.
            StmtKind::CompareAndSwap { target, value, op } => {
                self.emit_read_copies_for(&[target.clone(), value.clone()])?;
                let t = render_expr(&env, target)?;
                let v = render_expr(&env, value)?;
                match op {
                    CasOp::Min => self.w.line(&format!("{t} = std::min({t}, {v});")),
                    CasOp::Max => self.w.line(&format!("{t} = std::max({t}, {v});")),
                }
                self.emit_write_copy_for(target);
            }

            StmtKind::For {
                loop_var,
                lower,
                upper,
                body,
            } => {
                self.w.line(&format!(
                    "for (int32_t {loop_var} = {}; {loop_var} < {}; {loop_var}++) {{",
                    render_expr(&env, lower)?,
                    render_expr(&env, upper)?
                ));
                self.w.indent();
                for s in body {
                    self.emit_stmt(s)?;
                }
                self.w.dedent();
                self.w.line("}");
            }

            StmtKind::While { cond, body } => {
                let fused_label = stmt
                    .label
                    .as_ref()
                    .filter(|l| self.ctx.config.fused_kernels.contains(*l));
                if let Some(label) = fused_label {
                    self.emit_fused_launch(label, cond, body)?;
                } else {
                    self.w
                        .line(&format!("while ({}) {{", render_expr(&env, cond)?));
                    self.w.indent();
                    for s in body {
                        self.emit_stmt(s)?;
                    }
                    self.w.dedent();
                    self.w.line("}");
                }
            }

            StmtKind::DoWhile { body, cond } => {
                self.w.line("do {");
                self.w.indent();
                for s in body {
                    self.emit_stmt(s)?;
                }
                self.w.dedent();
                self.w
                    .line(&format!("}} while ({});", render_expr(&env, cond)?));
            }

            StmtKind::If {
                cond,
                then_body,
                else_body,
            } => {
                self.emit_read_copies_for(&[cond.clone()])?;
                self.w.line(&format!("if ({}) {{", render_expr(&env, cond)?));
                self.w.indent();
                for s in then_body {
                    self.emit_stmt(s)?;
                }
                self.w.dedent();
                if let Some(else_body) = else_body {
                    self.w.line("} else {");
                    self.w.indent();
                    for s in else_body {
                        self.emit_stmt(s)?;
                    }
                    self.w.dedent();
                }
                self.w.line("}");
            }

            StmtKind::Print { args, newline } => {
                self.emit_read_copies_for(args)?;
                let rendered: Vec<String> = args
                    .iter()
                    .map(|a| render_expr(&env, a))
                    .collect::<Result<_, _>>()?;
                let mut line = format!("std::cout << {}", rendered.join(" << \" \" << "));
                if *newline {
                    line.push_str(" << std::endl");
                }
                line.push(';');
                self.w.line(&line);
            }

            StmtKind::Break => self.w.line("break;"),

            StmtKind::Expr(expr) => {
                if is_apply_value(expr) {
                    self.emit_apply_launch(expr, None)?;
                } else {
                    self.reject_buried_apply(expr)?;
                    self.emit_read_copies_for(&[expr.clone()])?;
                    self.w.line(&format!("{};", render_expr(&env, expr)?));
                }
            }

            StmtKind::HybridGpu {
                condition,
                push_stmt,
                pull_stmt,
            } => {
                // The plan counted the push site first; buffer in that
                // order, then branch to pull on a large frontier.
                let push_text = self.emit_stmt_to_string(push_stmt)?;
                let pull_text = self.emit_stmt_to_string(pull_stmt)?;
                self.w
                    .line(&format!("if ({}) {{", render_expr(&env, condition)?));
                self.w.raw(&pull_text);
                self.w.line("} else {");
                self.w.raw(&push_text);
                self.w.line("}");
            }
        }
        Ok(())
    }

    fn emit_stmt_to_string(&mut self, stmt: &Stmt) -> Result<String, CodegenError> {
        let indent = self.w.indent_level() + 1;
        let saved = std::mem::replace(&mut self.w, SourceWriter::with_indent(indent));
        let result = self.emit_stmt(stmt);
        let buffered = std::mem::replace(&mut self.w, saved);
        result?;
        Ok(buffered.finish())
    }

    // ── Kernel launches ────────────────────────────────────────────────

    fn emit_apply_launch(
        &mut self,
        expr: &MirExpr,
        assign_to: Option<String>,
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
            _ => {
                return Err(CodegenError::new(
                    "launch requested for a non-apply expression",
                ))
            }
        };

        let spec = self
            .plan
            .kernels
            .get(self.next_kernel)
            .ok_or_else(|| {
                CodegenError::new("host generator ran ahead of the kernel plan")
            })?
            .clone();
        self.next_kernel += 1;

        let env = ExprEnv::host(self.ctx);
        let params = kernel_params(self.ctx, apply);
        let graph = render_expr(&env, &apply.target)?;

        let mut args = vec![graph.clone()];
        if let Some(frontier) = &params.frontier {
            args.push(frontier.clone());
        }

        if params.has_output {
            self.w.line("{");
            self.w.indent();
            self.w.line(&format!(
                "ripple::VertexFrontier __output_frontier = ripple::new_vertex_frontier({graph});"
            ));
            args.push("__output_frontier".to_string());
            self.w.line(&format!(
                "{}<<<ripple::NUM_BLOCKS, ripple::BLOCK_SIZE>>>({});",
                spec.name,
                args.join(", ")
            ));
            self.w.line("cudaDeviceSynchronize();");
            if dedup {
                self.w.line("ripple::dedup_frontier(__output_frontier);");
            }
            if let Some(target) = assign_to {
                self.w.line(&format!("{target} = __output_frontier;"));
            }
            self.w.dedent();
            self.w.line("}");
        } else {
            if assign_to.is_some() {
                return Err(CodegenError::new(
                    "an apply without change tracking produces no frontier to assign",
                ));
            }
            self.w.line(&format!(
                "{}<<<ripple::NUM_BLOCKS, ripple::BLOCK_SIZE>>>({});",
                spec.name,
                args.join(", ")
            ));
            self.w.line("cudaDeviceSynchronize();");
        }
        Ok(())
    }

    fn emit_fused_launch(
        &mut self,
        label: &str,
        cond: &MirExpr,
        body: &[Stmt],
    ) -> Result<(), CodegenError> {
        let args = fused::fused_launch_args(self.ctx, cond, body);
        self.w.line(&format!(
            "{label}_fused_kernel<<<ripple::NUM_BLOCKS, ripple::BLOCK_SIZE>>>({});",
            args.join(", ")
        ));
        self.w.line("cudaDeviceSynchronize();");
        Ok(())
    }

    // ── Device/host copies ─────────────────────────────────────────────

    /// Emit device-to-host copies for every property array read by the
    /// given expressions.
    fn emit_read_copies_for(&mut self, exprs: &[MirExpr]) -> Result<(), CodegenError> {
        let mut reads = Vec::new();
        for expr in exprs {
            collect_property_reads(self.ctx, expr, &mut reads);
        }
        for name in reads {
            self.w.line(&format!(
                "ripple::copy_device_to_host(__host_{name}, {name});"
            ));
        }
        Ok(())
    }

    /// Emit a host-to-device copy when the write target is a property
    /// array element.
    fn emit_write_copy_for(&mut self, target: &MirExpr) {
        if let MirExpr::TensorRead { target, .. } = target {
            if let MirExpr::Var(name) = &**target {
                if self.ctx.is_property_array(name) {
                    self.w.line(&format!(
                        "ripple::copy_host_to_device({name}, __host_{name});"
                    ));
                }
            }
        }
    }
}

/// Whether the expression is an apply (optionally dedup-wrapped) usable as
/// a whole statement value.
fn is_apply_value(expr: &MirExpr) -> bool {
    match expr {
        MirExpr::EdgeSetApply(_) => true,
        MirExpr::VertexSetDedup { target } => {
            matches!(&**target, MirExpr::EdgeSetApply(_))
        }
        _ => false,
    }
}

impl CodeGenHost<'_> {
    /// An apply buried inside a larger expression cannot be turned into a
    /// launch; reject instead of emitting unsound code.
    fn reject_buried_apply(&self, expr: &MirExpr) -> Result<(), CodegenError> {
        if contains_apply(expr) {
            return Err(CodegenError::new(
                "an edgeset apply must be the entire right-hand side of its statement",
            ));
        }
        Ok(())
    }
}

/// Property arrays read (through tensor reads) anywhere in an expression.
fn collect_property_reads(ctx: &MirContext, expr: &MirExpr, out: &mut Vec<String>) {
    struct Reads<'a> {
        ctx: &'a MirContext,
        out: &'a mut Vec<String>,
    }
    impl MirVisitor for Reads<'_> {
        fn visit_expr(&mut self, expr: &MirExpr) {
            if let MirExpr::TensorRead { target, .. } = expr {
                if let MirExpr::Var(name) = &**target {
                    if self.ctx.is_property_array(name)
                        && !self.out.iter().any(|n| n == name)
                    {
                        self.out.push(name.clone());
                    }
                }
            }
            walk_expr(self, expr);
        }
    }
    let mut reads = Reads { ctx, out };
    reads.visit_expr(expr);
}

/// Types of a function's locals, for hoisting into fused kernels. Declared
/// types win; initializers give a rough type when the declaration has none.
pub(crate) fn collect_local_types(
    ctx: &MirContext,
    func: &MirFunction,
) -> FxHashMap<String, MirType> {
    let mut types = FxHashMap::default();
    for var in func.params.iter().chain(func.results.iter()) {
        types.insert(var.name.clone(), var.ty.clone());
    }
    if let Some(body) = &func.body {
        collect_decl_types(ctx, body, &mut types);
    }
    types
}

fn collect_decl_types(
    ctx: &MirContext,
    stmts: &[Stmt],
    types: &mut FxHashMap<String, MirType>,
) {
    for stmt in stmts {
        match &stmt.kind {
            StmtKind::VarDecl { name, ty, init, .. } => {
                let inferred = ty
                    .clone()
                    .or_else(|| init.as_ref().and_then(rough_type));
                if let Some(t) = inferred {
                    types.insert(name.clone(), t);
                }
            }
            StmtKind::For {
                loop_var, body, ..
            } => {
                types.insert(loop_var.clone(), MirType::Scalar(ScalarKind::Int));
                collect_decl_types(ctx, body, types);
            }
            StmtKind::While { body, .. } | StmtKind::DoWhile { body, .. } => {
                collect_decl_types(ctx, body, types);
            }
            StmtKind::If {
                then_body,
                else_body,
                ..
            } => {
                collect_decl_types(ctx, then_body, types);
                if let Some(else_body) = else_body {
                    collect_decl_types(ctx, else_body, types);
                }
            }
            _ => {}
        }
    }
}

/// A shallow type guess for untyped declarations whose initializer makes
/// the type obvious.
fn rough_type(init: &MirExpr) -> Option<MirType> {
    match init {
        MirExpr::IntLit(_) => Some(MirType::Scalar(ScalarKind::Int)),
        MirExpr::FloatLit(_) => Some(MirType::Scalar(ScalarKind::Double)),
        MirExpr::BoolLit(_) => Some(MirType::Scalar(ScalarKind::Bool)),
        MirExpr::StringLit(_) => Some(MirType::Scalar(ScalarKind::String)),
        MirExpr::VertexSetAlloc { element, .. } => Some(MirType::VertexSet {
            element: element.clone(),
        }),
        MirExpr::EdgeSetApply(_) | MirExpr::VertexSetDedup { .. } => {
            Some(MirType::VertexSet {
                element: String::new(),
            })
        }
        MirExpr::VertexSetApply { .. } => Some(MirType::VertexSet {
            element: String::new(),
        }),
        _ => None,
    }
}
