//! Code generation integration tests: run the full pipeline on small
//! programs and check the shape of the emitted source -- function labels,
//! kernels for both traversal directions, write discipline inside kernel
//! regions, host/device copies, hybrid branches, and fused kernels.

use std::collections::HashSet;

use ripple_codegen::mir::context::BackendConfig;
use ripple_codegen::mir::hoist::KernelVariableExtractor;
use ripple_codegen::mir::visit::{walk_expr, MirVisitor};
use ripple_codegen::mir::{Direction, EdgeSetApply, MirExpr, Stmt, StmtKind};
use ripple_codegen::{generate, lower, resolve_directions, DirectionChoice, MirContext};

const PRELUDE: &str = "element Vertex end\n\
    element Edge end\n\
    const edges : edgeset{Edge}(Vertex, Vertex) = load (\"graph.el\");\n\
    const parent : vector{Vertex}(int) = -1;\n";

fn config() -> BackendConfig {
    BackendConfig {
        module_name: "m".to_string(),
        ..BackendConfig::default()
    }
}

fn compile_with(source: &str, config: BackendConfig) -> String {
    let parse = ripple_parser::parse(source);
    assert!(parse.ok(), "parse errors: {:?}", parse.errors());
    let (mut ctx, diags) = lower(&parse, config);
    assert!(diags.is_empty(), "lowering diagnostics: {diags:?}");
    resolve_directions(&mut ctx);
    generate(&ctx).expect("code generation failed")
}

fn compile(source: &str) -> String {
    compile_with(source, config())
}

// ── Host functions ─────────────────────────────────────────────────────

#[test]
fn host_function_shape() {
    // `func f(x:int)->(y:int) y = x + 1; end` under module_name = "m".
    let out = compile("func f(x : int) -> (y : int) y = x + 1; end");
    assert!(out.contains("int32_t __host__ m_f(int32_t x) {"), "{out}");
    assert!(out.contains("int32_t y;"), "{out}");
    assert!(out.contains("y = (x + 1);"), "{out}");
    assert!(out.contains("return y;"), "{out}");
}

#[test]
fn includes_and_globals() {
    let out = compile(&format!("{PRELUDE}func main() ; end"));
    assert!(out.contains("#include \"ripple_gpu_runtime.h\""));
    assert!(out.contains("ripple::GraphT edges;"), "{out}");
    assert!(out.contains("__device__ int32_t *parent;"), "{out}");
    assert!(out.contains("int32_t *__host_parent;"), "{out}");
    // Globals are initialized at the top of main.
    assert!(
        out.contains("edges = ripple::loadEdgeSet(\"graph.el\");"),
        "{out}"
    );
    assert!(out.contains("ripple::fill_property(parent, (-1));"), "{out}");
    // The generated entry point wraps the DSL main.
    assert!(out.contains("int main(int argc, char *argv[]) {"), "{out}");
    assert!(out.contains("m_main();"), "{out}");
}

// ── Kernels: push and pull ─────────────────────────────────────────────

fn bfs_like(apply_stmt: &str) -> String {
    format!(
        "{PRELUDE}\
         func updateEdge(src : Vertex, dst : Vertex)\n\
             parent[dst] min= parent[src];\n\
         end\n\
         func main()\n\
             var frontier : vertexset{{Vertex}} = new vertexset{{Vertex}}(0);\n\
             {apply_stmt}\n\
         end\n"
    )
}

#[test]
fn push_kernel_iterates_frontier_sources() {
    let out = compile(&bfs_like(
        "frontier = edges.from(frontier).applyModified(updateEdge, parent, true);",
    ));
    assert!(
        out.contains(
            "__global__ void m_kernel_1(ripple::GraphT graph, \
             ripple::VertexFrontier frontier, ripple::VertexFrontier __output_frontier) {"
        ),
        "{out}"
    );
    // Push: iterate frontier sources and their outgoing edges.
    assert!(out.contains("graph.row_offsets[src]"), "{out}");
    assert!(out.contains("int32_t dst = graph.col_indices[eid];"), "{out}");
    // The device apply function uses an atomic reduction.
    assert!(
        out.contains("void __device__ m_updateEdge(int32_t src, int32_t dst) {"),
        "{out}"
    );
    assert!(
        out.contains("ripple::atomicMin(&parent[dst], parent[src]);"),
        "{out}"
    );
    // Change tracking enqueues touched destinations.
    assert!(out.contains("int32_t __old_val = parent[dst];"), "{out}");
    assert!(
        out.contains("ripple::enqueue_sparse(__output_frontier, dst);"),
        "{out}"
    );
    // The host launches and synchronizes, then consumes the frontier.
    assert!(
        out.contains(
            "m_kernel_1<<<ripple::NUM_BLOCKS, ripple::BLOCK_SIZE>>>\
             (edges, frontier, __output_frontier);"
        ),
        "{out}"
    );
    assert!(out.contains("cudaDeviceSynchronize();"), "{out}");
    assert!(out.contains("frontier = __output_frontier;"), "{out}");
}

#[test]
fn pull_kernel_scans_incoming_edges() {
    let mut config = config();
    config
        .directions
        .insert("s1".to_string(), DirectionChoice::Pull);
    let out = compile_with(
        &bfs_like(
            "#s1# frontier = edges.from(frontier).applyModified(updateEdge, parent, true);",
        ),
        config,
    );
    // Pull: iterate destinations, scan incoming edges for frontier sources.
    assert!(out.contains("graph.col_offsets[dst]"), "{out}");
    assert!(out.contains("int32_t src = graph.row_indices[eid];"), "{out}");
    assert!(
        out.contains("if (!ripple::in_frontier(frontier, src)) continue;"),
        "{out}"
    );
}

#[test]
fn push_assign_to_property_is_atomic_pull_only_is_plain() {
    let program = |label: &str| {
        format!(
            "{PRELUDE}\
             func mark(src : Vertex, dst : Vertex)\n\
                 parent[dst] = src;\n\
             end\n\
             func main()\n\
                 var frontier : vertexset{{Vertex}} = new vertexset{{Vertex}}(0);\n\
                 {label} frontier = edges.from(frontier).applyModified(mark, parent, true);\n\
             end\n"
        )
    };

    // Default push: another thread may write the same destination.
    let push = compile(&program(""));
    assert!(
        push.contains("ripple::atomic_store(&parent[dst], src);"),
        "{push}"
    );

    // Pull parallelism is per destination; the plain write is sound.
    let mut cfg = config();
    cfg.directions
        .insert("s1".to_string(), DirectionChoice::Pull);
    let pull = compile_with(&program("#s1#"), cfg);
    assert!(pull.contains("parent[dst] = src;"), "{pull}");
}

#[test]
fn filter_functions_become_device_predicates() {
    let out = compile(&format!(
        "{PRELUDE}\
         func updateEdge(src : Vertex, dst : Vertex) parent[dst] min= parent[src]; end\n\
         func only_roots(v : Vertex) -> (r : bool) r = parent[v] == (0 - 1); end\n\
         func main()\n\
             edges.from(only_roots).to(only_roots).apply(updateEdge);\n\
         end\n"
    ));
    assert!(
        out.contains("bool __device__ m_only_roots(int32_t v) {"),
        "{out}"
    );
    assert!(out.contains("if (!m_only_roots(src)) continue;"), "{out}");
    assert!(out.contains("if (!m_only_roots(dst)) continue;"), "{out}");
}

// ── Hybrid statements ──────────────────────────────────────────────────

#[test]
fn hybrid_emits_runtime_choice_between_two_kernels() {
    let mut cfg = config();
    cfg.directions.insert(
        "s1".to_string(),
        DirectionChoice::Hybrid { threshold: 1000 },
    );
    let out = compile_with(
        &bfs_like("#s1# edges.from(frontier).applyModified(updateEdge, parent, true);"),
        cfg,
    );
    assert!(
        out.contains("if ((ripple::builtin_getVertexSetSize(frontier) > 1000)) {"),
        "{out}"
    );
    // Two kernels: the push site first, then the pull site.
    assert!(out.contains("__global__ void m_kernel_1("), "{out}");
    assert!(out.contains("__global__ void m_kernel_2("), "{out}");
    assert!(out.contains("graph.row_offsets[src]"), "{out}");
    assert!(out.contains("graph.col_offsets[dst]"), "{out}");
}

// ── Host/device copies ─────────────────────────────────────────────────

#[test]
fn host_property_access_is_bracketed_by_copies() {
    let out = compile(&format!(
        "{PRELUDE}func main()\n\
             print parent[0];\n\
             parent[0] = 5;\n\
         end\n"
    ));
    assert!(
        out.contains("ripple::copy_device_to_host(__host_parent, parent);"),
        "{out}"
    );
    assert!(out.contains("std::cout << __host_parent[0]"), "{out}");
    assert!(
        out.contains("ripple::copy_host_to_device(parent, __host_parent);"),
        "{out}"
    );
    assert!(out.contains("__host_parent[0] = 5;"), "{out}");
}

// ── Fused kernels ──────────────────────────────────────────────────────

fn fused_program() -> String {
    format!(
        "{PRELUDE}\
         func updateEdge(src : Vertex, dst : Vertex)\n\
             parent[dst] min= parent[src];\n\
         end\n\
         func main()\n\
             var frontier : vertexset{{Vertex}} = new vertexset{{Vertex}}(0);\n\
             var steps : int = 0;\n\
             #loop# while steps < 10\n\
                 frontier = edges.from(frontier).applyModified(updateEdge, parent, true);\n\
                 steps += 1;\n\
             end\n\
         end\n"
    )
}

#[test]
fn fused_while_becomes_one_kernel() {
    let mut cfg = config();
    cfg.fused_kernels.insert("loop".to_string());
    let out = compile_with(&fused_program(), cfg);

    // One kernel carrying the whole loop; variables are renamed into the
    // __local_ namespace and hoisted variables arrive as parameters.
    assert!(
        out.contains(
            "__global__ void loop_fused_kernel(ripple::GraphT edges, \
             int32_t __local_steps, ripple::VertexFrontier __local_frontier) {"
        ),
        "{out}"
    );
    assert!(out.contains("while ((__local_steps < 10)) {"), "{out}");
    assert!(out.contains("__local_steps += 1;"), "{out}");
    assert!(out.contains("__local_frontier = __output_frontier;"), "{out}");
    // The apply body is inlined, not launched.
    assert!(out.contains("edges.row_offsets[src]"), "{out}");
    assert!(out.contains("ripple::grid_sync();"), "{out}");
    assert!(!out.contains("m_kernel_1"), "{out}");
    // The host launches the fused kernel once.
    assert!(
        out.contains(
            "loop_fused_kernel<<<ripple::NUM_BLOCKS, ripple::BLOCK_SIZE>>>\
             (edges, steps, frontier);"
        ),
        "{out}"
    );
}

#[test]
fn unfused_program_keeps_while_on_host() {
    let out = compile(&fused_program());
    assert!(out.contains("while ((steps < 10)) {"), "{out}");
    assert!(out.contains("m_kernel_1"), "{out}");
    assert!(!out.contains("fused_kernel"), "{out}");
}

/// Like [`fused_program`], but the frontier is never reassigned inside the
/// loop: its only appearance in the region is as a `from` filter name.
fn filter_only_fused_program() -> String {
    format!(
        "{PRELUDE}\
         func updateEdge(src : Vertex, dst : Vertex)\n\
             parent[dst] min= parent[src];\n\
         end\n\
         func main()\n\
             var frontier : vertexset{{Vertex}} = new vertexset{{Vertex}}(5);\n\
             var steps : int = 0;\n\
             #loop# while steps < 10\n\
                 edges.from(frontier).applyModified(updateEdge, parent, true);\n\
                 steps += 1;\n\
             end\n\
         end\n"
    )
}

#[test]
fn fused_kernel_receives_filter_only_frontier() {
    // A frontier referenced only as an apply filter still has to arrive as
    // a kernel parameter and be read under its __local_ name; a bare
    // `frontier` inside the kernel would be an undeclared identifier.
    let mut cfg = config();
    cfg.fused_kernels.insert("loop".to_string());
    let out = compile_with(&filter_only_fused_program(), cfg);

    assert!(
        out.contains(
            "__global__ void loop_fused_kernel(ripple::GraphT edges, \
             int32_t __local_steps, ripple::VertexFrontier __local_frontier) {"
        ),
        "{out}"
    );
    assert!(
        out.contains("ripple::frontier_size(__local_frontier)"),
        "{out}"
    );
    assert!(
        !out.contains("ripple::frontier_size(frontier)"),
        "unrenamed frontier leaked into the fused kernel:\n{out}"
    );
    assert!(
        out.contains(
            "loop_fused_kernel<<<ripple::NUM_BLOCKS, ripple::BLOCK_SIZE>>>\
             (edges, steps, frontier);"
        ),
        "{out}"
    );
}

// ── Kernel-region hoisting property ────────────────────────────────────

/// Every variable referenced in a kernel region -- including frontiers
/// that appear only as apply filter names -- is accounted for: hoisted,
/// declared inside the region, a skip-set name, or a for-loop variable.
#[test]
fn kernel_region_variables_are_all_accounted_for() {
    for source in [fused_program(), filter_only_fused_program()] {
        let parse = ripple_parser::parse(&source);
        assert!(parse.ok());
        let (ctx, _) = lower(&parse, config());
        let body = ctx.function("main").unwrap().body.clone().unwrap();
        let region = match &body[2].kind {
            StmtKind::While { body, .. } => body.clone(),
            other => panic!("expected the while loop, got {other:?}"),
        };

        let skip: Vec<String> = ctx
            .globals
            .iter()
            .map(|g| g.name.clone())
            .chain(ctx.functions.iter().map(|f| f.name.clone()))
            .collect();
        let (hoisted, decls) = KernelVariableExtractor::new(skip.clone()).extract(&region);

        struct Vars(Vec<String>);
        impl MirVisitor for Vars {
            fn visit_var_expr(&mut self, name: &str) {
                self.0.push(name.to_string());
            }
            fn visit_edge_set_apply(&mut self, apply: &EdgeSetApply) {
                for name in [&apply.from_func, &apply.to_func].into_iter().flatten() {
                    self.0.push(name.clone());
                }
            }
            fn visit_expr(&mut self, expr: &MirExpr) {
                walk_expr(self, expr);
            }
        }
        let mut vars = Vars(Vec::new());
        for stmt in &region {
            vars.visit_stmt(stmt);
        }
        assert!(
            vars.0.contains(&"frontier".to_string()),
            "the region must reference the frontier"
        );

        let loop_vars: Vec<String> = collect_loop_vars(&region);
        for name in vars.0 {
            let accounted = hoisted.contains(&name)
                || decls.iter().any(|d| d.name == name)
                || skip.contains(&name)
                || loop_vars.contains(&name);
            assert!(accounted, "variable `{name}` is not accounted for");
        }
    }
}

fn collect_loop_vars(stmts: &[Stmt]) -> Vec<String> {
    let mut out = Vec::new();
    for stmt in stmts {
        if let StmtKind::For { loop_var, body, .. } = &stmt.kind {
            out.push(loop_var.clone());
            out.extend(collect_loop_vars(body));
        }
    }
    out
}

// ── Kernel write discipline ────────────────────────────────────────────

/// Walks the resolved MIR and the direction flags, enumerates every write
/// statement inside a kernel region (device apply/filter function bodies
/// and fused loop bodies), and checks each one: compare-and-swap
/// statements become CAS calls, shared reductions become atomics, plain
/// tensor assignments reachable from a push traversal become atomic
/// stores, pull-only tensor assignments must be destination-indexed, and
/// everything else must be a thread-exclusive local.
#[test]
fn every_kernel_write_is_cas_atomic_or_exclusive() {
    let contended = format!(
        "{PRELUDE}\
         func mark(src : Vertex, dst : Vertex)\n\
             var best : int = 0;\n\
             best += 1;\n\
             parent[dst] min= parent[src];\n\
             parent[dst] = src;\n\
             parent[dst] asyncMax= best;\n\
         end\n\
         func main()\n\
             var frontier : vertexset{{Vertex}} = new vertexset{{Vertex}}(0);\n\
             #s1# frontier = edges.from(frontier).applyModified(mark, parent, true);\n\
         end\n"
    );

    // Push is the default direction.
    check_kernel_writes(&contended, config());

    let mut pull = config();
    pull.directions
        .insert("s1".to_string(), DirectionChoice::Pull);
    check_kernel_writes(&contended, pull);

    // The same contended writes, fused into a single kernel.
    let fused = format!(
        "{PRELUDE}\
         func mark(src : Vertex, dst : Vertex)\n\
             parent[dst] min= parent[src];\n\
             parent[dst] = src;\n\
         end\n\
         func main()\n\
             var frontier : vertexset{{Vertex}} = new vertexset{{Vertex}}(0);\n\
             var steps : int = 0;\n\
             #loop# while steps < 10\n\
                 frontier = edges.from(frontier).applyModified(mark, parent, true);\n\
                 steps += 1;\n\
             end\n\
         end\n"
    );
    let mut cfg = config();
    cfg.fused_kernels.insert("loop".to_string());
    check_kernel_writes(&fused, cfg);
}

fn check_kernel_writes(source: &str, config: BackendConfig) {
    let parse = ripple_parser::parse(source);
    assert!(parse.ok(), "parse errors: {:?}", parse.errors());
    let (mut ctx, diags) = lower(&parse, config);
    assert!(diags.is_empty(), "lowering diagnostics: {diags:?}");
    resolve_directions(&mut ctx);
    let out = generate(&ctx).expect("code generation failed");

    // Which device functions each traversal direction reaches.
    struct Usage<'a> {
        ctx: &'a MirContext,
        push: HashSet<String>,
        pull: HashSet<String>,
    }
    impl MirVisitor for Usage<'_> {
        fn visit_edge_set_apply(&mut self, apply: &EdgeSetApply) {
            let names = std::iter::once(&apply.input_function)
                .chain(apply.from_func.iter())
                .chain(apply.to_func.iter());
            for name in names {
                if self.ctx.function(name).is_none() {
                    continue;
                }
                match apply.direction {
                    Direction::Pull => self.pull.insert(name.clone()),
                    _ => self.push.insert(name.clone()),
                };
            }
        }
    }
    let mut usage = Usage {
        ctx: &ctx,
        push: HashSet::new(),
        pull: HashSet::new(),
    };
    for func in &ctx.functions {
        usage.visit_function(func);
    }

    let mut fused_bodies = Vec::new();
    for func in &ctx.functions {
        if let Some(body) = &func.body {
            collect_fused_bodies(&ctx, body, &mut fused_bodies);
        }
    }

    let mut writes = 0usize;
    for name in usage.push.iter().chain(usage.pull.iter()) {
        let func = ctx.function(name).expect("device function is declared");
        let dst_param = func.params.get(1).map(|p| p.name.clone());
        check_region_writes(
            func.body.as_deref().unwrap_or(&[]),
            usage.push.contains(name),
            dst_param.as_deref(),
            &out,
            &mut writes,
        );
    }
    for body in &fused_bodies {
        // Host statements moved into a fused kernel run on every thread;
        // their tensor writes follow the push rules.
        check_region_writes(body, true, None, &out, &mut writes);
    }
    assert!(writes > 0, "expected the program to exercise kernel writes");
}

/// Fused while bodies are kernel regions of their own.
fn collect_fused_bodies(ctx: &MirContext, stmts: &[Stmt], out: &mut Vec<Vec<Stmt>>) {
    for stmt in stmts {
        match &stmt.kind {
            StmtKind::While { body, .. } => {
                let fused = stmt
                    .label
                    .as_ref()
                    .map(|l| ctx.config.fused_kernels.contains(l))
                    .unwrap_or(false);
                if fused {
                    out.push(body.clone());
                }
                collect_fused_bodies(ctx, body, out);
            }
            StmtKind::For { body, .. } | StmtKind::DoWhile { body, .. } => {
                collect_fused_bodies(ctx, body, out);
            }
            StmtKind::If {
                then_body,
                else_body,
                ..
            } => {
                collect_fused_bodies(ctx, then_body, out);
                if let Some(else_body) = else_body {
                    collect_fused_bodies(ctx, else_body, out);
                }
            }
            _ => {}
        }
    }
}

/// Check every write statement in a kernel region, recursing into nested
/// control flow.
fn check_region_writes(
    stmts: &[Stmt],
    used_in_push: bool,
    dst_param: Option<&str>,
    out: &str,
    writes: &mut usize,
) {
    for stmt in stmts {
        match &stmt.kind {
            StmtKind::Assign { targets, .. } => {
                for target in targets {
                    *writes += 1;
                    let Some((array, index)) = tensor_write(target) else {
                        // A non-tensor target is a thread-exclusive local.
                        continue;
                    };
                    if used_in_push {
                        assert!(
                            out.contains(&format!(
                                "ripple::atomic_store(&{array}[{index}],"
                            )),
                            "push-reachable write to {array}[{index}] is not atomic:\n{out}"
                        );
                    } else {
                        // Pull parallelism is per destination; the write
                        // must index the destination parameter.
                        assert_eq!(
                            Some(index.as_str()),
                            dst_param,
                            "pull write to {array}[{index}] is not destination-exclusive"
                        );
                    }
                }
            }
            StmtKind::Reduce { target, .. } => {
                *writes += 1;
                if let Some((array, index)) = tensor_write(target) {
                    let atomic = ["ripple::atomicAdd", "ripple::atomicMin", "ripple::atomicMax"]
                        .iter()
                        .any(|call| out.contains(&format!("{call}(&{array}[{index}],")));
                    assert!(
                        atomic,
                        "shared reduction on {array}[{index}] is not atomic:\n{out}"
                    );
                }
            }
            StmtKind::CompareAndSwap { target, .. } => {
                *writes += 1;
                if let Some((array, index)) = tensor_write(target) {
                    let cas = ["ripple::writeMin", "ripple::writeMax"]
                        .iter()
                        .any(|call| out.contains(&format!("{call}(&{array}[{index}],")));
                    assert!(cas, "CAS on {array}[{index}] not emitted as a CAS call:\n{out}");
                }
            }
            StmtKind::For { body, .. }
            | StmtKind::While { body, .. }
            | StmtKind::DoWhile { body, .. } => {
                check_region_writes(body, used_in_push, dst_param, out, writes);
            }
            StmtKind::If {
                then_body,
                else_body,
                ..
            } => {
                check_region_writes(then_body, used_in_push, dst_param, out, writes);
                if let Some(else_body) = else_body {
                    check_region_writes(else_body, used_in_push, dst_param, out, writes);
                }
            }
            _ => {}
        }
    }
}

/// `Some((array, index))` when the target writes one property-array slot.
fn tensor_write(target: &MirExpr) -> Option<(String, String)> {
    let MirExpr::TensorRead { target, indices } = target else {
        return None;
    };
    let MirExpr::Var(array) = &**target else {
        return None;
    };
    let [MirExpr::Var(index)] = indices.as_slice() else {
        return None;
    };
    Some((array.clone(), index.clone()))
}

// ── Structural aborts ──────────────────────────────────────────────────

#[test]
fn unresolved_direction_aborts_generation() {
    let parse = ripple_parser::parse(&bfs_like(
        "edges.from(frontier).applyModified(updateEdge, parent, true);",
    ));
    assert!(parse.ok());
    let (ctx, _) = lower(&parse, config());
    // Direction pass deliberately not run.
    let err = generate(&ctx).expect_err("generation must abort");
    assert!(err.message.contains("unresolved"), "{err}");
}

#[test]
fn buried_apply_aborts_generation() {
    let parse = ripple_parser::parse(&bfs_like(
        "var n = 1 + edges.from(frontier).applyModified(updateEdge, parent, true);",
    ));
    assert!(parse.ok());
    let (mut ctx, _) = lower(&parse, config());
    resolve_directions(&mut ctx);
    let err = generate(&ctx).expect_err("generation must abort");
    assert!(
        err.message.contains("right-hand side"),
        "unexpected error: {err}"
    );
}
