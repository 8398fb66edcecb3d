//! Lowering integration tests: parse real programs and check the MIR that
//! comes out -- apply nodes and their fields, the intrinsic rename, filter
//! drop behavior, reductions, and context registration.

use ripple_codegen::mir::context::BackendConfig;
use ripple_codegen::mir::{
    ApplyKind, CasOp, Direction, MirExpr, MirType, ReduceOp, ScalarKind, Stmt, StmtKind,
};
use ripple_codegen::{lower, MirContext};

const PRELUDE: &str = "element Vertex end\n\
    element Edge end\n\
    const edges : edgeset{Edge}(Vertex, Vertex) = load (\"graph.el\");\n\
    const parent : vector{Vertex}(int) = -1;\n\
    func updateEdge(src : Vertex, dst : Vertex)\n\
        parent[dst] min= parent[src];\n\
    end\n\
    func src_filter(v : Vertex) -> (r : bool) r = true; end\n";

fn lower_main(stmts: &str) -> (MirContext, Vec<Stmt>) {
    let source = format!("{PRELUDE}func main() {stmts} end\n");
    let parse = ripple_parser::parse(&source);
    assert!(parse.ok(), "parse errors: {:?}", parse.errors());
    let (ctx, diags) = lower(&parse, BackendConfig::default());
    assert!(diags.is_empty(), "lowering diagnostics: {diags:?}");
    let body = ctx
        .function("main")
        .expect("main lowered")
        .body
        .clone()
        .expect("main has a body");
    (ctx, body)
}

fn expr_of(stmt: &Stmt) -> &MirExpr {
    match &stmt.kind {
        StmtKind::Expr(e) => e,
        StmtKind::VarDecl { init: Some(e), .. } => e,
        StmtKind::Assign { value, .. } => value,
        other => panic!("statement has no main expression: {other:?}"),
    }
}

// ── Context registration ───────────────────────────────────────────────

#[test]
fn program_elements_land_in_the_context() {
    let (ctx, _) = lower_main(";");
    assert_eq!(ctx.element_types.len(), 2);
    assert_eq!(ctx.element_types[0].name, "Vertex");

    let edges = ctx.global("edges").expect("edges registered");
    assert!(matches!(
        &edges.ty,
        MirType::EdgeSet { src, dst, .. } if src == "Vertex" && dst == "Vertex"
    ));
    assert!(matches!(
        edges.init,
        Some(MirExpr::Call { ref name, .. }) if name == "loadEdgeSet"
    ));

    assert!(ctx.is_property_array("parent"));
    assert_eq!(
        ctx.property_scalar("parent"),
        Some(&MirType::Scalar(ScalarKind::Int))
    );

    assert!(ctx.function("updateEdge").is_some());
    assert!(ctx.function("main").is_some());
}

#[test]
fn extern_function_has_no_body() {
    let parse = ripple_parser::parse("extern func ext(a : int) -> (r : int);");
    assert!(parse.ok());
    let (ctx, diags) = lower(&parse, BackendConfig::default());
    assert!(diags.is_empty());
    let func = ctx.function("ext").unwrap();
    assert!(func.body.is_none());
    assert_eq!(func.params.len(), 1);
    assert_eq!(func.results.len(), 1);
}

// ── Apply lowering ─────────────────────────────────────────────────────

#[test]
fn regular_apply_lowers_to_one_edge_set_apply() {
    let (_, body) = lower_main("edges.from(src_filter).apply(updateEdge);");
    let apply = match expr_of(&body[0]) {
        MirExpr::EdgeSetApply(a) => a,
        other => panic!("expected an edgeset apply, got {other:?}"),
    };
    assert_eq!(apply.kind, ApplyKind::Regular);
    assert_eq!(apply.input_function, "updateEdge");
    assert_eq!(apply.from_func.as_deref(), Some("src_filter"));
    assert_eq!(apply.to_func, None);
    assert_eq!(apply.change_tracking_field, None);
    assert_eq!(apply.direction, Direction::Unresolved);
    assert!(matches!(&*apply.target, MirExpr::Var(v) if v == "edges"));
}

#[test]
fn apply_modified_carries_tracking_field_and_hint() {
    let (_, body) = lower_main("edges.applyModified(updateEdge, parent, true);");
    // `true` disables deduplication, so no dedup wrapper.
    let apply = match expr_of(&body[0]) {
        MirExpr::EdgeSetApply(a) => a,
        other => panic!("expected a bare edgeset apply, got {other:?}"),
    };
    assert_eq!(apply.change_tracking_field.as_deref(), Some("parent"));
    assert!(apply.disable_deduplication);
}

#[test]
fn apply_modified_default_gets_dedup_wrapper() {
    let (_, body) = lower_main("edges.applyModified(updateEdge, parent);");
    match expr_of(&body[0]) {
        MirExpr::VertexSetDedup { target } => match &**target {
            MirExpr::EdgeSetApply(apply) => {
                assert!(!apply.disable_deduplication);
                assert_eq!(apply.change_tracking_field.as_deref(), Some("parent"));
            }
            other => panic!("expected the apply inside the dedup, got {other:?}"),
        },
        other => panic!("expected a dedup wrapper, got {other:?}"),
    }
}

#[test]
fn dangling_from_filter_is_silently_dropped() {
    let (_, body) = lower_main("edges.from(src_filter);");
    // The filter vanishes; the receiver flows through unchanged.
    assert!(matches!(expr_of(&body[0]), MirExpr::Var(v) if v == "edges"));
}

#[test]
fn where_lowers_to_vertex_set_apply() {
    let (_, body) = lower_main("var active = edges.where(src_filter);");
    match expr_of(&body[0]) {
        MirExpr::VertexSetApply { input_function, .. } => {
            assert_eq!(input_function, "src_filter");
        }
        other => panic!("expected a vertexset apply, got {other:?}"),
    }
}

// ── Intrinsics and calls ───────────────────────────────────────────────

#[test]
fn intrinsic_method_renamed_with_receiver_prepended() {
    let (_, body) = lower_main("var d = edges.getOutDegree(3);");
    match expr_of(&body[0]) {
        MirExpr::Call { name, args } => {
            assert_eq!(name, "builtin_getOutDegree");
            assert_eq!(args.len(), 2);
            assert!(matches!(&args[0], MirExpr::Var(v) if v == "edges"));
        }
        other => panic!("expected a call, got {other:?}"),
    }
}

#[test]
fn printed_source_relowers_without_double_prefix() {
    let source =
        format!("{PRELUDE}func main() var d = edges.getOutDegree(3); end\n");
    let first = ripple_parser::parse(&source);
    let printed = first.syntax().text().to_string();
    let reparse = ripple_parser::parse(&printed);
    let (ctx, diags) = lower(&reparse, BackendConfig::default());
    assert!(diags.is_empty());
    let body = ctx.function("main").unwrap().body.clone().unwrap();
    match expr_of(&body[0]) {
        MirExpr::Call { name, .. } => assert_eq!(name, "builtin_getOutDegree"),
        other => panic!("expected a call, got {other:?}"),
    }
}

#[test]
fn user_method_is_not_renamed() {
    let (_, body) = lower_main("var d = edges.customMethod();");
    match expr_of(&body[0]) {
        MirExpr::Call { name, .. } => assert_eq!(name, "customMethod"),
        other => panic!("expected a call, got {other:?}"),
    }
}

#[test]
fn delete_lowers_to_delete_object_call() {
    let (_, body) = lower_main("delete edges;");
    match expr_of(&body[0]) {
        MirExpr::Call { name, args } => {
            assert_eq!(name, "deleteObject");
            assert_eq!(args.len(), 1);
        }
        other => panic!("expected a call, got {other:?}"),
    }
}

// ── Field reads and reductions ─────────────────────────────────────────

#[test]
fn field_read_becomes_tensor_read() {
    let (_, body) = lower_main("var p = edges.out_degrees;");
    match expr_of(&body[0]) {
        MirExpr::TensorRead { target, indices } => {
            assert!(matches!(&**target, MirExpr::Var(v) if v == "out_degrees"));
            assert_eq!(indices.len(), 1);
        }
        other => panic!("expected a tensor read, got {other:?}"),
    }
}

#[test]
fn reduce_operators_lower_to_reduce_and_cas() {
    let (_, body) = lower_main(
        "var x = 0; x += 1; x min= 2; x max= 3; x asyncMin= 4; x asyncMax= 5;",
    );
    assert!(matches!(
        body[1].kind,
        StmtKind::Reduce { op: ReduceOp::Sum, .. }
    ));
    assert!(matches!(
        body[2].kind,
        StmtKind::Reduce { op: ReduceOp::Min, .. }
    ));
    assert!(matches!(
        body[3].kind,
        StmtKind::Reduce { op: ReduceOp::Max, .. }
    ));
    assert!(matches!(
        body[4].kind,
        StmtKind::CompareAndSwap { op: CasOp::Min, .. }
    ));
    assert!(matches!(
        body[5].kind,
        StmtKind::CompareAndSwap { op: CasOp::Max, .. }
    ));
}

#[test]
fn unknown_reduce_target_is_diagnosed_and_lowering_continues() {
    let source = format!("{PRELUDE}func main() mystery += 1; print 1; end\n");
    let parse = ripple_parser::parse(&source);
    assert!(parse.ok(), "parse errors: {:?}", parse.errors());
    let (ctx, diags) = lower(&parse, BackendConfig::default());
    assert_eq!(diags.len(), 1);
    assert!(diags[0].message.contains("mystery"));
    // The walk continued past the problem.
    let body = ctx.function("main").unwrap().body.clone().unwrap();
    assert_eq!(body.len(), 2);
}

// ── Labels ─────────────────────────────────────────────────────────────

#[test]
fn statement_labels_flow_into_mir() {
    let (_, body) = lower_main(
        "var finished = 0; #outer# while finished == 0 finished = 1; end",
    );
    assert_eq!(body[1].label.as_deref(), Some("outer"));
    // Statements inside a labeled region inherit the innermost label, so
    // backend config can address them.
    match &body[1].kind {
        StmtKind::While { body: inner, .. } => {
            assert_eq!(inner[0].label.as_deref(), Some("outer"));
        }
        other => panic!("expected a while, got {other:?}"),
    }
}

// ── Scenario 1 shape at the MIR level ──────────────────────────────────

#[test]
fn vertexset_alloc_global() {
    let source = "element vertex end\n\
                  const V : vertexset{vertex} = new vertexset{vertex}(5);";
    let parse = ripple_parser::parse(source);
    assert!(parse.ok());
    let (ctx, diags) = lower(&parse, BackendConfig::default());
    assert!(diags.is_empty());
    let global = ctx.global("V").unwrap();
    assert!(matches!(
        &global.ty,
        MirType::VertexSet { element } if element == "vertex"
    ));
    match &global.init {
        Some(MirExpr::VertexSetAlloc {
            element,
            num_elements: Some(n),
        }) => {
            assert_eq!(element, "vertex");
            assert!(matches!(&**n, MirExpr::IntLit(5)));
        }
        other => panic!("expected a vertexset allocation, got {other:?}"),
    }
}

#[test]
fn n_ary_compare_keeps_invariant() {
    let (_, body) = lower_main("var a = 1; var b = 2; var c = 3; var x = a < b <= c;");
    match expr_of(&body[3]) {
        MirExpr::Compare { operands, ops } => {
            assert_eq!(operands.len(), ops.len() + 1);
            assert_eq!(operands.len(), 3);
        }
        other => panic!("expected a comparison chain, got {other:?}"),
    }
}
