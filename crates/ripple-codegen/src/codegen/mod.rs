//! Code generation: MIR to CUDA-flavored C++ source.
//!
//! Three generators share this module's writer and expression renderer: the
//! host generator ([`host`]), the device kernel generator ([`kernel`]), and
//! the fused-kernel generator ([`fused`]). The host/device split shows up
//! as the function label (`__host__` vs `__device__`), the treatment of
//! property-array accesses (copied through host shadows on the host,
//! direct and atomic on the device), and variable naming (fused kernels
//! rename everything into a `__local_` namespace).
//!
//! Code generation aborts on the first structural inconsistency; it never
//! guesses.

pub mod fused;
pub mod host;
pub mod kernel;

use std::fmt;

use rustc_hash::FxHashSet;

use crate::mir::context::MirContext;
use crate::mir::{BinOp, MirExpr, MirType, ScalarKind, TupleIndex, UnaryOp};

/// A structural inconsistency found while generating code.
#[derive(Debug, Clone, PartialEq)]
pub struct CodegenError {
    pub message: String,
}

impl CodegenError {
    pub(crate) fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl fmt::Display for CodegenError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for CodegenError {}

/// Generate the complete output program for a resolved MIR context.
///
/// Expects the direction-choice pass to have run; an unresolved apply is a
/// structural error.
pub fn generate(ctx: &MirContext) -> Result<String, CodegenError> {
    host::CodeGenHost::new(ctx)?.generate()
}

// ── Output writer ──────────────────────────────────────────────────────

/// Indent-managed output buffer shared by all generators.
#[derive(Debug, Default)]
pub(crate) struct SourceWriter {
    out: String,
    indent: usize,
}

impl SourceWriter {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn with_indent(indent: usize) -> Self {
        Self {
            out: String::new(),
            indent,
        }
    }

    pub(crate) fn indent(&mut self) {
        self.indent += 1;
    }

    pub(crate) fn dedent(&mut self) {
        self.indent = self.indent.saturating_sub(1);
    }

    pub(crate) fn indent_level(&self) -> usize {
        self.indent
    }

    /// Write one indented line.
    pub(crate) fn line(&mut self, text: &str) {
        for _ in 0..self.indent {
            self.out.push('\t');
        }
        self.out.push_str(text);
        self.out.push('\n');
    }

    pub(crate) fn blank(&mut self) {
        self.out.push('\n');
    }

    /// Append pre-rendered text verbatim.
    pub(crate) fn raw(&mut self, text: &str) {
        self.out.push_str(text);
    }

    pub(crate) fn finish(self) -> String {
        self.out
    }
}

// ── Expression rendering ───────────────────────────────────────────────

/// Context for rendering an expression.
pub(crate) struct ExprEnv<'a> {
    pub ctx: &'a MirContext,
    /// Whether we are inside device code.
    pub device: bool,
    /// On the host, property-array reads go through the `__host_` shadow.
    pub shadow_properties: bool,
    /// Names to be rewritten into the fused kernel's `__local_` namespace.
    pub local_names: Option<&'a FxHashSet<String>>,
}

impl<'a> ExprEnv<'a> {
    pub(crate) fn host(ctx: &'a MirContext) -> Self {
        Self {
            ctx,
            device: false,
            shadow_properties: true,
            local_names: None,
        }
    }

    pub(crate) fn device(ctx: &'a MirContext) -> Self {
        Self {
            ctx,
            device: true,
            shadow_properties: false,
            local_names: None,
        }
    }

    pub(crate) fn fused(ctx: &'a MirContext, local_names: &'a FxHashSet<String>) -> Self {
        Self {
            ctx,
            device: true,
            shadow_properties: false,
            local_names: Some(local_names),
        }
    }

    pub(crate) fn var_name(&self, name: &str) -> String {
        match self.local_names {
            Some(locals) if locals.contains(name) => format!("__local_{name}"),
            _ => name.to_string(),
        }
    }
}

/// Render a MIR type as an output-language type.
pub(crate) fn render_type(ty: &MirType) -> String {
    match ty {
        MirType::Scalar(kind) => render_scalar(*kind).to_string(),
        // Element values are vertex/edge ids.
        MirType::Element(_) => "int32_t".to_string(),
        MirType::VertexSet { .. } => "ripple::VertexFrontier".to_string(),
        MirType::EdgeSet { .. } => "ripple::GraphT".to_string(),
        MirType::Vector { scalar, .. } => format!("{} *", render_type(scalar)),
        MirType::List(inner) => format!("ripple::List<{}> *", render_type(inner)),
        MirType::PriorityQueue { priority, .. } => {
            format!("ripple::PriorityQueue<{}> *", render_scalar(*priority))
        }
        MirType::Tuple(_) | MirType::Opaque => "void *".to_string(),
    }
}

pub(crate) fn render_scalar(kind: ScalarKind) -> &'static str {
    match kind {
        ScalarKind::Int => "int32_t",
        ScalarKind::UInt => "uint32_t",
        ScalarKind::UInt64 => "uint64_t",
        ScalarKind::Float => "float",
        ScalarKind::Double => "double",
        ScalarKind::Bool => "bool",
        ScalarKind::String => "const char *",
    }
}

/// Render the callee of a MIR call: user functions get the module prefix,
/// everything else belongs to the runtime library namespace.
pub(crate) fn render_callee(ctx: &MirContext, name: &str) -> String {
    if ctx.function(name).is_some() {
        format!("{}_{}", ctx.config.module_name, name)
    } else {
        format!("ripple::{name}")
    }
}

pub(crate) fn render_expr(env: &ExprEnv, expr: &MirExpr) -> Result<String, CodegenError> {
    match expr {
        MirExpr::IntLit(v) => Ok(v.to_string()),
        MirExpr::FloatLit(v) => {
            let mut s = v.to_string();
            if !s.contains('.') && !s.contains('e') && !s.contains("inf") && !s.contains("NaN")
            {
                s.push_str(".0");
            }
            Ok(s)
        }
        MirExpr::BoolLit(v) => Ok(if *v { "true" } else { "false" }.to_string()),
        MirExpr::StringLit(v) => Ok(format!("{v:?}")),
        MirExpr::Var(name) => Ok(env.var_name(name)),

        MirExpr::Binary { op, lhs, rhs } => {
            let l = render_expr(env, lhs)?;
            let r = render_expr(env, rhs)?;
            Ok(match op {
                BinOp::Pow => format!("pow({l}, {r})"),
                BinOp::Xor => format!("({l} != {r})"),
                other => format!("({l} {other} {r})"),
            })
        }

        MirExpr::Unary { op, operand } => {
            let o = render_expr(env, operand)?;
            Ok(match op {
                UnaryOp::Neg => format!("(-{o})"),
                UnaryOp::Not => format!("(!{o})"),
            })
        }

        // An n-ary chain `a < b <= c` becomes `((a < b) && (b <= c))`.
        MirExpr::Compare { operands, ops } => {
            if operands.len() != ops.len() + 1 {
                return Err(CodegenError::new(
                    "comparison chain with mismatched operand and operator counts",
                ));
            }
            let rendered: Vec<String> = operands
                .iter()
                .map(|o| render_expr(env, o))
                .collect::<Result<_, _>>()?;
            let mut parts = Vec::with_capacity(ops.len());
            for (i, op) in ops.iter().enumerate() {
                parts.push(format!("({} {} {})", rendered[i], op, rendered[i + 1]));
            }
            if parts.len() == 1 {
                Ok(parts.pop().expect("one comparison"))
            } else {
                Ok(format!("({})", parts.join(" && ")))
            }
        }

        MirExpr::TensorRead { target, indices } => {
            let base = match (&**target, env.shadow_properties) {
                (MirExpr::Var(name), true) if env.ctx.is_property_array(name) => {
                    format!("__host_{name}")
                }
                _ => render_expr(env, target)?,
            };
            let rendered: Vec<String> = indices
                .iter()
                .map(|i| render_expr(env, i))
                .collect::<Result<_, _>>()?;
            Ok(format!("{base}[{}]", rendered.join("][")))
        }

        MirExpr::TupleRead { tuple, index } => {
            let t = render_expr(env, tuple)?;
            Ok(match index {
                TupleIndex::Named(field) => format!("{t}.{field}"),
                TupleIndex::Positional(i) => format!("{t}[{}]", render_expr(env, i)?),
            })
        }

        MirExpr::Call { name, args } => {
            let rendered: Vec<String> = args
                .iter()
                .map(|a| render_expr(env, a))
                .collect::<Result<_, _>>()?;
            Ok(format!(
                "{}({})",
                render_callee(env.ctx, name),
                rendered.join(", ")
            ))
        }

        MirExpr::VertexSetAlloc { num_elements, .. } => {
            let n = match num_elements {
                Some(n) => render_expr(env, n)?,
                None => "0".to_string(),
            };
            Ok(format!("ripple::new_vertex_frontier({n})"))
        }

        MirExpr::ListAlloc {
            element_ty,
            num_elements,
        } => {
            let n = match num_elements {
                Some(n) => render_expr(env, n)?,
                None => "0".to_string(),
            };
            Ok(format!(
                "ripple::new_list<{}>({n})",
                render_type(element_ty)
            ))
        }

        MirExpr::VectorAlloc { scalar, size, .. } => {
            let n = size.map(|n| n.to_string()).unwrap_or_else(|| "0".to_string());
            Ok(format!(
                "ripple::alloc_vector<{}>({n})",
                render_type(scalar)
            ))
        }

        MirExpr::PriorityQueueAlloc {
            priority,
            dup_within_bucket,
            dup_across_bucket,
            vector_function,
            bucket_ordering,
            priority_ordering,
            init_bucket,
            starting_node,
            ..
        } => Ok(format!(
            "ripple::new_priority_queue<{}>({}, {}, {}, {}, {}, {}, {})",
            render_scalar(*priority),
            render_expr(env, dup_within_bucket)?,
            render_expr(env, dup_across_bucket)?,
            env.var_name(vector_function),
            render_expr(env, bucket_ordering)?,
            render_expr(env, priority_ordering)?,
            render_expr(env, init_bucket)?,
            render_expr(env, starting_node)?,
        )),

        MirExpr::Intersection {
            a,
            b,
            num_a,
            num_b,
            reference,
        } => {
            let mut args = vec![
                render_expr(env, a)?,
                render_expr(env, b)?,
                render_expr(env, num_a)?,
                render_expr(env, num_b)?,
            ];
            if let Some(r) = reference {
                args.push(render_expr(env, r)?);
            }
            Ok(format!("ripple::intersection({})", args.join(", ")))
        }

        MirExpr::VertexSetApply {
            target,
            input_function,
        } => {
            let t = render_expr(env, target)?;
            Ok(format!(
                "ripple::vertex_set_apply<{}_{}>({t})",
                env.ctx.config.module_name, input_function
            ))
        }

        // Apply launches are handled at statement level by the host
        // generator; reaching one here means the tree is malformed.
        MirExpr::VertexSetDedup { .. } | MirExpr::EdgeSetApply(_) => Err(CodegenError::new(
            "edgeset apply in a position the host generator cannot launch from",
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mir::context::BackendConfig;
    use crate::mir::CmpOp;

    fn empty_ctx() -> MirContext {
        MirContext::new(BackendConfig::default())
    }

    #[test]
    fn writer_indents_with_tabs() {
        let mut w = SourceWriter::new();
        w.line("a");
        w.indent();
        w.line("b");
        w.dedent();
        w.line("c");
        assert_eq!(w.finish(), "a\n\tb\nc\n");
    }

    #[test]
    fn renders_binary_and_compare() {
        let ctx = empty_ctx();
        let env = ExprEnv::host(&ctx);
        let e = MirExpr::Binary {
            op: BinOp::Add,
            lhs: Box::new(MirExpr::Var("x".into())),
            rhs: Box::new(MirExpr::IntLit(1)),
        };
        assert_eq!(render_expr(&env, &e).unwrap(), "(x + 1)");

        let chain = MirExpr::Compare {
            operands: vec![
                MirExpr::Var("a".into()),
                MirExpr::Var("b".into()),
                MirExpr::Var("c".into()),
            ],
            ops: vec![CmpOp::Lt, CmpOp::Le],
        };
        assert_eq!(
            render_expr(&env, &chain).unwrap(),
            "((a < b) && (b <= c))"
        );
    }

    #[test]
    fn runtime_calls_use_namespace() {
        let ctx = empty_ctx();
        let env = ExprEnv::host(&ctx);
        let e = MirExpr::Call {
            name: "builtin_getVertices".into(),
            args: vec![MirExpr::Var("edges".into())],
        };
        assert_eq!(
            render_expr(&env, &e).unwrap(),
            "ripple::builtin_getVertices(edges)"
        );
    }

    #[test]
    fn fused_env_renames_locals() {
        let ctx = empty_ctx();
        let mut locals = FxHashSet::default();
        locals.insert("x".to_string());
        let env = ExprEnv::fused(&ctx, &locals);
        assert_eq!(
            render_expr(&env, &MirExpr::Var("x".into())).unwrap(),
            "__local_x"
        );
        assert_eq!(
            render_expr(&env, &MirExpr::Var("rank".into())).unwrap(),
            "rank"
        );
    }
}
