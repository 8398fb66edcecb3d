//! Parser integration tests.
//!
//! Each test parses a program, navigates the typed AST, and asserts tree
//! structure: declaration shapes, apply-chain filter attachment, statement
//! labels, precedence, and error recovery behavior.

use ripple_parser::ast::expr::{ApplyKind, Expr};
use ripple_parser::ast::item::Item;
use ripple_parser::ast::stmt::Stmt;
use ripple_parser::ast::types::Type;
use ripple_parser::{parse, SyntaxKind};

/// The first function's statements.
fn func_stmts(source: &str) -> Vec<Stmt> {
    let parsed = parse(source);
    assert!(
        parsed.ok(),
        "unexpected parse errors: {:?}",
        parsed.errors()
    );
    let program = parsed.program();
    let func = program
        .items()
        .filter_map(|item| match item {
            Item::Func(f) => Some(f),
            _ => None,
        })
        .last()
        .expect("expected a function");
    func.body().expect("expected a body").stmts().collect()
}

/// Wrap a statement in a minimal program that declares `edges` and the
/// functions used by apply chains.
fn graph_stmt(stmt: &str) -> Vec<Stmt> {
    let source = format!(
        "element Vertex end\n\
         element Edge end\n\
         const edges : edgeset{{Edge}}(Vertex, Vertex) = load (\"graph.el\");\n\
         func updateEdge(src : Vertex, dst : Vertex) end\n\
         func src_filter(v : Vertex) -> (r : bool) r = true; end\n\
         func main() {stmt} end\n"
    );
    let parsed = parse(&source);
    assert!(
        parsed.ok(),
        "unexpected parse errors: {:?}",
        parsed.errors()
    );
    let program = parsed.program();
    let main = program
        .items()
        .filter_map(|item| match item {
            Item::Func(f) => Some(f),
            _ => None,
        })
        .find(|f| f.name().as_deref() == Some("main"))
        .expect("expected main");
    main.body().expect("expected a body").stmts().collect()
}

// ── Round trip ─────────────────────────────────────────────────────────

#[test]
fn cst_is_lossless() {
    let source = "element Vertex end\n\
                  const n : int = 5; % comment\n\
                  func main()\n    var x = n + 1;\nend\n";
    let parsed = parse(source);
    assert!(parsed.ok());
    assert_eq!(parsed.syntax().text().to_string(), source);
}

#[test]
fn reparse_of_printed_tree_is_structurally_equal() {
    let source = "func f(x : int) -> (y : int) y = x + 1; end\n";
    let first = parse(source);
    assert!(first.ok());
    let printed = first.syntax().text().to_string();
    let second = parse(&printed);
    assert!(second.ok());
    assert_eq!(
        ripple_parser::debug_tree(&first.syntax()),
        ripple_parser::debug_tree(&second.syntax())
    );
}

// ── Declarations ───────────────────────────────────────────────────────

#[test]
fn const_vertexset_alloc() {
    // Scenario: `const V : vertexset{vertex} = new vertexset{vertex}(5);`
    let source = "element vertex end\nconst V : vertexset{vertex} = new vertexset{vertex}(5);";
    let parsed = parse(source);
    assert!(parsed.ok(), "errors: {:?}", parsed.errors());

    let decl = parsed
        .program()
        .items()
        .find_map(|item| match item {
            Item::Const(c) => Some(c),
            _ => None,
        })
        .expect("expected a const declaration");
    assert_eq!(decl.name().as_deref(), Some("V"));

    match decl.ty() {
        Some(Type::VertexSet(vs)) => {
            assert_eq!(
                vs.element().and_then(|e| e.name()).as_deref(),
                Some("vertex")
            );
        }
        other => panic!("expected a vertexset type, got {other:?}"),
    }

    match decl.init() {
        Some(Expr::VertexSetAlloc(alloc)) => {
            assert_eq!(
                alloc.element_type().and_then(|e| e.name()).as_deref(),
                Some("vertex")
            );
            let num = alloc.num_elements().expect("expected a size");
            assert_eq!(num.syntax().text().to_string(), "5");
        }
        other => panic!("expected a vertexset allocation, got {other:?}"),
    }
}

#[test]
fn func_decl_shape() {
    let parsed = parse("export func f<T, 0:N>(a : int, inout b : float) -> (r : bool) end");
    assert!(parsed.ok(), "errors: {:?}", parsed.errors());
    let func = parsed
        .program()
        .items()
        .find_map(|item| match item {
            Item::Func(f) => Some(f),
            _ => None,
        })
        .unwrap();
    assert_eq!(func.name().as_deref(), Some("f"));
    assert!(func.is_exported());
    assert!(!func.is_external());

    let generics: Vec<_> = func.generic_params().collect();
    assert_eq!(generics.len(), 2);
    assert!(!generics[0].is_range());
    assert!(generics[1].is_range());
    assert_eq!(generics[1].name().as_deref(), Some("N"));

    let params = func.params();
    assert_eq!(params.len(), 2);
    assert_eq!(params[0].name().as_deref(), Some("a"));
    assert!(params[1].is_inout());

    let results = func.results();
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].name().as_deref(), Some("r"));
    assert!(func.body().is_some());
}

#[test]
fn extern_func_has_no_body() {
    let parsed = parse("extern func ext(a : int) -> (r : int);");
    assert!(parsed.ok(), "errors: {:?}", parsed.errors());
    let func = parsed
        .program()
        .items()
        .find_map(|item| match item {
            Item::Func(f) => Some(f),
            _ => None,
        })
        .unwrap();
    assert!(func.is_external());
    assert!(func.body().is_none());
}

#[test]
fn element_decl_fields() {
    let parsed = parse(
        "element Vertex\n  rank : vector{Vertex}(float);\n  deg : vector{Vertex}(int);\nend",
    );
    assert!(parsed.ok(), "errors: {:?}", parsed.errors());
    let elem = parsed
        .program()
        .items()
        .find_map(|item| match item {
            Item::Element(e) => Some(e),
            _ => None,
        })
        .unwrap();
    assert_eq!(elem.name().as_deref(), Some("Vertex"));
    let fields: Vec<_> = elem.fields().collect();
    assert_eq!(fields.len(), 2);
    assert_eq!(fields[0].name().as_deref(), Some("rank"));
    match fields[1].ty() {
        Some(Type::NdTensor(t)) => {
            assert_eq!(t.element().and_then(|e| e.name()).as_deref(), Some("Vertex"));
        }
        other => panic!("expected a vector type, got {other:?}"),
    }
}

// ── The apply chain ────────────────────────────────────────────────────

#[test]
fn apply_with_from_filter() {
    // Scenario: `edges.from(src).apply(updateEdge);`
    let stmts = graph_stmt("edges.from(src_filter).apply(updateEdge);");
    let expr_stmt = match &stmts[0] {
        Stmt::Expr(e) => e,
        other => panic!("expected an expression statement, got {other:?}"),
    };
    let apply = match expr_stmt.expr() {
        Some(Expr::Apply(a)) => a,
        other => panic!("expected an apply expression, got {other:?}"),
    };
    assert_eq!(apply.kind(), ApplyKind::Regular);
    assert_eq!(apply.input_function().as_deref(), Some("updateEdge"));
    assert_eq!(apply.from_func().as_deref(), Some("src_filter"));
    assert_eq!(apply.to_func(), None);
    match apply.target() {
        Some(Expr::Var(v)) => assert_eq!(v.name().as_deref(), Some("edges")),
        other => panic!("expected the edges variable as target, got {other:?}"),
    }
}

#[test]
fn apply_with_both_filters() {
    let stmts =
        graph_stmt("edges.from(src_filter).to(src_filter).apply(updateEdge);");
    let apply = match &stmts[0] {
        Stmt::Expr(e) => match e.expr() {
            Some(Expr::Apply(a)) => a,
            other => panic!("expected apply, got {other:?}"),
        },
        other => panic!("expected an expression statement, got {other:?}"),
    };
    assert_eq!(apply.from_func().as_deref(), Some("src_filter"));
    assert_eq!(apply.to_func().as_deref(), Some("src_filter"));
}

#[test]
fn apply_modified_fields() {
    // Scenario: `edges.applyModified(f, Parent, true);`
    let stmts = graph_stmt("edges.applyModified(updateEdge, Parent, true);");
    let apply = match &stmts[0] {
        Stmt::Expr(e) => match e.expr() {
            Some(Expr::Apply(a)) => a,
            other => panic!("expected apply, got {other:?}"),
        },
        other => panic!("expected an expression statement, got {other:?}"),
    };
    assert_eq!(apply.kind(), ApplyKind::Regular);
    assert!(apply.is_modified());
    assert_eq!(apply.input_function().as_deref(), Some("updateEdge"));
    assert_eq!(apply.change_tracking_field().as_deref(), Some("Parent"));
    assert_eq!(apply.disable_deduplication(), Some(true));
}

#[test]
fn apply_modified_rejects_non_bool_hint() {
    let parsed = parse(
        "func main(e : int) e.applyModified(f, Parent, 42); end",
    );
    assert!(!parsed.ok(), "expected a parse error");
}

#[test]
fn apply_update_priority_kind() {
    let stmts = graph_stmt("edges.applyUpdatePriority(updateEdge);");
    let apply = match &stmts[0] {
        Stmt::Expr(e) => match e.expr() {
            Some(Expr::Apply(a)) => a,
            other => panic!("expected apply, got {other:?}"),
        },
        other => panic!("expected an expression statement, got {other:?}"),
    };
    assert_eq!(apply.kind(), ApplyKind::UpdatePriority);
}

#[test]
fn dangling_from_is_kept_in_tree() {
    // A chain that ends without an apply leaves the filter node in place;
    // lowering drops it.
    let stmts = graph_stmt("edges.from(src_filter);");
    match &stmts[0] {
        Stmt::Expr(e) => match e.expr() {
            Some(Expr::FromFilter(f)) => {
                assert_eq!(f.input_func().as_deref(), Some("src_filter"));
            }
            other => panic!("expected a dangling from filter, got {other:?}"),
        },
        other => panic!("expected an expression statement, got {other:?}"),
    }
}

#[test]
fn where_expr_shape() {
    let stmts = graph_stmt("var active = edges.where(src_filter);");
    let decl = match &stmts[0] {
        Stmt::VarDecl(d) => d,
        other => panic!("expected a var declaration, got {other:?}"),
    };
    match decl.init() {
        Some(Expr::Where(w)) => {
            assert_eq!(w.input_func().as_deref(), Some("src_filter"));
        }
        other => panic!("expected a where expression, got {other:?}"),
    }
}

#[test]
fn method_call_keeps_user_name() {
    // Intrinsic renaming happens at lowering, not in the parser.
    let stmts = graph_stmt("var d = edges.getOutDegrees();");
    let decl = match &stmts[0] {
        Stmt::VarDecl(d) => d,
        other => panic!("expected a var declaration, got {other:?}"),
    };
    match decl.init() {
        Some(Expr::MethodCall(m)) => {
            assert_eq!(m.method_name().as_deref(), Some("getOutDegrees"));
            assert!(m.args().is_empty());
        }
        other => panic!("expected a method call, got {other:?}"),
    }
}

#[test]
fn chained_call_to_declared_function_is_call_expr() {
    // `src_filter` is a declared function, so `.src_filter(…)` parses as a
    // call rather than a method.
    let stmts = graph_stmt("var x = edges.src_filter(1);");
    let decl = match &stmts[0] {
        Stmt::VarDecl(d) => d,
        other => panic!("expected a var declaration, got {other:?}"),
    };
    match decl.init() {
        Some(Expr::Call(c)) => {
            assert_eq!(c.callee().as_deref(), Some("src_filter"));
            assert!(c.receiver().is_some());
        }
        other => panic!("expected a call, got {other:?}"),
    }
}

// ── Statements ─────────────────────────────────────────────────────────

#[test]
fn while_stmt_label() {
    // Scenario: `#outer# while (finished == 0) … end`
    let stmts = func_stmts(
        "func main() var finished = 0; #outer# while (finished == 0) finished = 1; end end",
    );
    let labeled = match &stmts[1] {
        Stmt::Labeled(l) => l,
        other => panic!("expected a labeled statement, got {other:?}"),
    };
    assert_eq!(labeled.label().as_deref(), Some("outer"));
    match labeled.stmt() {
        Some(Stmt::While(w)) => {
            assert_eq!(w.stmt_label().as_deref(), Some("outer"));
            assert!(w.cond().is_some());
            assert!(w.body().is_some());
        }
        other => panic!("expected a while statement, got {other:?}"),
    }
}

#[test]
fn if_elif_else_chain() {
    let stmts = func_stmts(
        "func main(x : int) if x == 0 print 1; elif x == 1 print 2; else print 3; end end",
    );
    let if_stmt = match &stmts[0] {
        Stmt::If(i) => i,
        other => panic!("expected an if statement, got {other:?}"),
    };
    let else_clause = if_stmt.else_clause().expect("expected an else clause");
    let elif = else_clause.elif().expect("expected an elif chain");
    assert!(elif.else_clause().is_some());
}

#[test]
fn for_and_do_while() {
    let stmts = func_stmts(
        "func main() for i in 0:10 print i; end do print 1; end while false end",
    );
    match &stmts[0] {
        Stmt::For(f) => {
            assert_eq!(f.loop_var().as_deref(), Some("i"));
            let dom = f.domain().unwrap();
            assert!(dom.lower().is_some());
            assert!(dom.upper().is_some());
        }
        other => panic!("expected a for statement, got {other:?}"),
    }
    match &stmts[1] {
        Stmt::DoWhile(d) => {
            assert!(d.body().is_some());
            assert!(d.cond().is_some());
        }
        other => panic!("expected a do-while statement, got {other:?}"),
    }
}

#[test]
fn assign_and_reduce_stmts() {
    let stmts = func_stmts(
        "func main(arr : vector{V}(int), v : int) arr[v] += 1; x = 4; end",
    );
    match &stmts[0] {
        Stmt::Reduce(r) => {
            assert_eq!(r.op().unwrap().kind(), SyntaxKind::PLUS_REDUCE);
            assert!(matches!(r.target(), Some(Expr::TensorRead(_))));
            assert!(r.value().is_some());
        }
        other => panic!("expected a reduce statement, got {other:?}"),
    }
    match &stmts[1] {
        Stmt::Assign(a) => {
            assert_eq!(a.targets().len(), 1);
            assert!(a.value().is_some());
        }
        other => panic!("expected an assignment, got {other:?}"),
    }
}

#[test]
fn n_ary_comparison_chain() {
    let stmts = func_stmts("func main(a : int, b : int, c : int) var x = a < b <= c; end");
    let decl = match &stmts[0] {
        Stmt::VarDecl(d) => d,
        other => panic!("expected a var declaration, got {other:?}"),
    };
    match decl.init() {
        Some(Expr::EqChain(eq)) => {
            // operands.len() == ops.len() + 1
            assert_eq!(eq.operands().len(), 3);
            assert_eq!(eq.ops().len(), 2);
            assert_eq!(eq.ops()[0].kind(), SyntaxKind::L_ANGLE);
            assert_eq!(eq.ops()[1].kind(), SyntaxKind::LE);
        }
        other => panic!("expected a comparison chain, got {other:?}"),
    }
}

#[test]
fn precedence_mul_over_add() {
    let stmts = func_stmts("func main(a : int, b : int, c : int) var x = a + b * c; end");
    let decl = match &stmts[0] {
        Stmt::VarDecl(d) => d,
        other => panic!("expected a var declaration, got {other:?}"),
    };
    let add = match decl.init() {
        Some(Expr::Binary(b)) => b,
        other => panic!("expected a binary expression, got {other:?}"),
    };
    assert_eq!(add.op().unwrap().kind(), SyntaxKind::PLUS);
    match add.rhs() {
        Some(Expr::Binary(mul)) => {
            assert_eq!(mul.op().unwrap().kind(), SyntaxKind::STAR);
        }
        other => panic!("expected the multiplication on the right, got {other:?}"),
    }
}

#[test]
fn tuple_reads_disambiguated() {
    let stmts = func_stmts(
        "func main(t : (a : V, b : V), u : (V * 2)) var x = t.a; var y = u(0); end",
    );
    match &stmts[0] {
        Stmt::VarDecl(d) => match d.init() {
            Some(Expr::NamedTupleRead(read)) => {
                assert_eq!(read.elem().as_deref(), Some("a"));
            }
            other => panic!("expected a named tuple read, got {other:?}"),
        },
        other => panic!("expected a var declaration, got {other:?}"),
    }
    match &stmts[1] {
        Stmt::VarDecl(d) => {
            assert!(matches!(d.init(), Some(Expr::UnnamedTupleRead(_))));
        }
        other => panic!("expected a var declaration, got {other:?}"),
    }
}

#[test]
fn generic_call_vs_comparison() {
    let stmts = func_stmts(
        "func add<T>(a : int) -> (r : int) r = a; end\n\
         func main(f : int, v : int) var x = add<T>(1); var y = f < v; end",
    );
    match &stmts[0] {
        Stmt::VarDecl(d) => match d.init() {
            Some(Expr::Call(c)) => {
                assert_eq!(c.callee().as_deref(), Some("add"));
                assert_eq!(c.generic_args(), vec!["T".to_string()]);
            }
            other => panic!("expected a generic call, got {other:?}"),
        },
        other => panic!("expected a var declaration, got {other:?}"),
    }
    match &stmts[1] {
        Stmt::VarDecl(d) => {
            assert!(matches!(d.init(), Some(Expr::EqChain(_))));
        }
        other => panic!("expected a var declaration, got {other:?}"),
    }
}

// ── Error recovery ─────────────────────────────────────────────────────

#[test]
fn statement_recovery_continues_parsing() {
    let parsed = parse("func main() var x = ; var y = 2; end");
    assert!(!parsed.ok());
    // The second statement still parses.
    let func = parsed
        .program()
        .items()
        .find_map(|item| match item {
            Item::Func(f) => Some(f),
            _ => None,
        })
        .unwrap();
    let decls: Vec<_> = func
        .body()
        .unwrap()
        .stmts()
        .filter(|s| matches!(s, Stmt::VarDecl(_)))
        .collect();
    assert_eq!(decls.len(), 2);
}

#[test]
fn malformed_statement_consumes_input() {
    // Recovery always makes progress; the parser terminates and reports.
    let parsed = parse("func main() ] ] ; print 1; end");
    assert!(!parsed.ok());
    assert!(!parsed.errors().is_empty());
}

#[test]
fn program_level_recovery_finds_next_element() {
    let parsed = parse("garbage tokens here\nconst n : int = 1;");
    assert!(!parsed.ok());
    let consts: Vec<_> = parsed
        .program()
        .items()
        .filter(|item| matches!(item, Item::Const(_)))
        .collect();
    assert_eq!(consts.len(), 1);
}

#[test]
fn load_and_intersection_exprs() {
    let stmts = graph_stmt(
        "var x = intersection(edges, edges, 1, 2); var g = load (\"other.el\");",
    );
    match &stmts[0] {
        Stmt::VarDecl(d) => match d.init() {
            Some(Expr::Intersection(i)) => assert_eq!(i.args().len(), 4),
            other => panic!("expected an intersection, got {other:?}"),
        },
        other => panic!("expected a var declaration, got {other:?}"),
    }
    match &stmts[1] {
        Stmt::VarDecl(d) => {
            assert!(matches!(d.init(), Some(Expr::Load(_))));
        }
        other => panic!("expected a var declaration, got {other:?}"),
    }
}
