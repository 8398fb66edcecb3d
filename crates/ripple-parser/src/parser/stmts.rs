//! Statement parsers.
//!
//! Statements end with `;` except the block forms (`if`, `while`, `do`,
//! `for`), which end with `end`. Any statement may be prefixed by
//! `# label #` to attach a user label. Recovery skip-sets: statement-level
//! productions skip to `;`, block bodies stop at `end`/`elif`/`else`.

use crate::symbols::IdentKind;
use crate::syntax_kind::SyntaxKind;

use super::{expressions, items, Parser};

/// Tokens that terminate a statement block.
const BLOCK_END: &[SyntaxKind] = &[
    SyntaxKind::END_KW,
    SyntaxKind::ELIF_KW,
    SyntaxKind::ELSE_KW,
    SyntaxKind::EOF,
];

/// The reduction-operator tokens.
pub(super) const REDUCE_OPS: &[SyntaxKind] = &[
    SyntaxKind::PLUS_REDUCE,
    SyntaxKind::MIN_REDUCE,
    SyntaxKind::MAX_REDUCE,
    SyntaxKind::ASYNC_MIN_REDUCE,
    SyntaxKind::ASYNC_MAX_REDUCE,
];

/// `{stmt}` until `end` / `elif` / `else` / EOF.
///
/// Guarantees progress: a statement that fails without consuming anything
/// is skipped one token at a time inside an error node.
pub(crate) fn parse_stmt_block(p: &mut Parser) {
    let m = p.open();
    while !p.at_any(BLOCK_END) {
        let before = p.current_span();
        parse_stmt(p);
        p.recover_to(&[
            SyntaxKind::SEMICOLON,
            SyntaxKind::END_KW,
            SyntaxKind::ELIF_KW,
            SyntaxKind::ELSE_KW,
        ]);
        if !p.at_any(BLOCK_END) && p.current_span() == before {
            p.advance_with_error("expected a statement");
        }
    }
    p.close(m, SyntaxKind::STMT_BLOCK);
}

/// Dispatch a single statement on its first token.
pub(crate) fn parse_stmt(p: &mut Parser) {
    match p.current() {
        SyntaxKind::VAR_KW => items::parse_var_decl(p),
        SyntaxKind::CONST_KW => items::parse_const_decl(p),
        SyntaxKind::IF_KW => parse_if_stmt(p),
        SyntaxKind::WHILE_KW => parse_while_stmt(p),
        SyntaxKind::DO_KW => parse_do_while_stmt(p),
        SyntaxKind::FOR_KW => parse_for_stmt(p),
        SyntaxKind::PRINT_KW | SyntaxKind::PRINTLN_KW => parse_print_stmt(p),
        SyntaxKind::BREAK_KW => parse_break_stmt(p),
        SyntaxKind::DELETE_KW => parse_delete_stmt(p),
        SyntaxKind::NUMBER_SIGN => parse_labeled_stmt(p),
        _ => parse_expr_or_assign_stmt(p),
    }
}

/// `# label # stmt`
fn parse_labeled_stmt(p: &mut Parser) {
    let m = p.open();
    let label = p.open();
    p.advance(); // #
    p.expect(SyntaxKind::IDENT);
    p.expect(SyntaxKind::NUMBER_SIGN);
    p.close(label, SyntaxKind::STMT_LABEL);
    if !p.has_error() {
        parse_stmt(p);
    }
    p.close(m, SyntaxKind::LABELED_STMT);
}

/// `if cond body else_clause end`
fn parse_if_stmt(p: &mut Parser) {
    let m = p.open();
    let depth = p.symbols.depth();
    p.advance(); // IF_KW

    expressions::parse_expr(p);

    p.symbols.scope();
    if !p.has_error() {
        parse_stmt_block(p);
    }
    p.symbols.truncate(depth);

    p.recover_to(&[SyntaxKind::ELIF_KW, SyntaxKind::ELSE_KW, SyntaxKind::END_KW]);
    parse_else_clause(p);

    p.recover_past(SyntaxKind::END_KW);
    p.close(m, SyntaxKind::IF_STMT);
}

/// `[('else' stmt_block) | ('elif' expr stmt_block else_clause)]`
fn parse_else_clause(p: &mut Parser) {
    match p.current() {
        SyntaxKind::ELSE_KW => {
            let m = p.open();
            let depth = p.symbols.depth();
            p.advance(); // else
            p.symbols.scope();
            parse_stmt_block(p);
            p.symbols.truncate(depth);
            p.close(m, SyntaxKind::ELSE_CLAUSE);
        }
        SyntaxKind::ELIF_KW => {
            // An elif chain is a nested if statement inside the else clause.
            let outer = p.open();
            let m = p.open();
            let depth = p.symbols.depth();
            p.advance(); // elif
            expressions::parse_expr(p);
            p.symbols.scope();
            if !p.has_error() {
                parse_stmt_block(p);
            }
            p.symbols.truncate(depth);
            p.recover_to(&[SyntaxKind::ELIF_KW, SyntaxKind::ELSE_KW, SyntaxKind::END_KW]);
            parse_else_clause(p);
            p.close(m, SyntaxKind::IF_STMT);
            p.close(outer, SyntaxKind::ELSE_CLAUSE);
        }
        _ => {}
    }
}

/// `while cond body end`
fn parse_while_stmt(p: &mut Parser) {
    let m = p.open();
    let depth = p.symbols.depth();
    p.advance(); // WHILE_KW

    expressions::parse_expr(p);

    p.symbols.scope();
    if !p.has_error() {
        parse_stmt_block(p);
    }
    p.symbols.truncate(depth);

    p.recover_past(SyntaxKind::END_KW);
    p.close(m, SyntaxKind::WHILE_STMT);
}

/// `do body end while cond`
fn parse_do_while_stmt(p: &mut Parser) {
    let m = p.open();
    let depth = p.symbols.depth();
    p.advance(); // DO_KW

    p.symbols.scope();
    parse_stmt_block(p);
    p.symbols.truncate(depth);

    p.recover_to(&[SyntaxKind::END_KW]);
    p.expect(SyntaxKind::END_KW);
    if !p.has_error() {
        p.expect(SyntaxKind::WHILE_KW);
    }
    if !p.has_error() {
        expressions::parse_expr(p);
    }
    p.recover_to(&[SyntaxKind::SEMICOLON, SyntaxKind::END_KW]);
    p.eat(SyntaxKind::SEMICOLON);
    p.close(m, SyntaxKind::DO_WHILE_STMT);
}

/// `for ident in lo:hi body end`
fn parse_for_stmt(p: &mut Parser) {
    let m = p.open();
    let depth = p.symbols.depth();
    p.advance(); // FOR_KW

    let loop_var = items::parse_name(p);
    if !p.has_error() {
        p.expect(SyntaxKind::IN_KW);
    }
    if !p.has_error() {
        parse_range_domain(p);
    }

    p.symbols.scope();
    if let Some(name) = loop_var {
        p.symbols.insert(&name, IdentKind::Other);
    }
    if !p.has_error() {
        parse_stmt_block(p);
    }
    p.symbols.truncate(depth);

    p.recover_past(SyntaxKind::END_KW);
    p.close(m, SyntaxKind::FOR_STMT);
}

/// `lower : upper`
fn parse_range_domain(p: &mut Parser) {
    let m = p.open();
    expressions::parse_expr(p);
    if !p.has_error() {
        p.expect(SyntaxKind::COLON);
    }
    if !p.has_error() {
        expressions::parse_expr(p);
    }
    p.close(m, SyntaxKind::RANGE_DOMAIN);
}

/// `('print' | 'println') expr {',' expr} ;`
fn parse_print_stmt(p: &mut Parser) {
    let m = p.open();
    p.advance(); // PRINT_KW or PRINTLN_KW
    loop {
        expressions::parse_expr(p);
        if p.has_error() || !p.eat(SyntaxKind::COMMA) {
            break;
        }
    }
    p.recover_past(SyntaxKind::SEMICOLON);
    p.close(m, SyntaxKind::PRINT_STMT);
}

/// `break ;`
fn parse_break_stmt(p: &mut Parser) {
    let m = p.open();
    p.advance(); // BREAK_KW
    p.recover_past(SyntaxKind::SEMICOLON);
    p.close(m, SyntaxKind::BREAK_STMT);
}

/// `delete expr ;` -- sugar for a `deleteObject` call, desugared at
/// lowering.
fn parse_delete_stmt(p: &mut Parser) {
    let m = p.open();
    p.advance(); // DELETE_KW
    expressions::parse_expr(p);
    p.recover_past(SyntaxKind::SEMICOLON);
    p.close(m, SyntaxKind::DELETE_STMT);
}

/// `[expr {',' expr} '='] expr ;` or `expr reduce_op expr ;` or a bare
/// expression statement.
///
/// Assignment targets that are plain identifiers not yet in scope are
/// registered so later statements can refer to them.
fn parse_expr_or_assign_stmt(p: &mut Parser) {
    let m = p.open();

    // Empty statement: a lone `;`.
    if p.eat(SyntaxKind::SEMICOLON) {
        p.close(m, SyntaxKind::EXPR_STMT);
        return;
    }

    let mut lhs_names: Vec<Option<String>> = vec![pending_simple_lhs(p)];
    expressions::parse_expr(p);

    let node = if p.has_error() {
        SyntaxKind::EXPR_STMT
    } else {
        match p.current() {
            SyntaxKind::COMMA | SyntaxKind::ASSIGN => {
                while p.eat(SyntaxKind::COMMA) {
                    lhs_names.push(pending_simple_lhs(p));
                    expressions::parse_expr(p);
                    if p.has_error() {
                        break;
                    }
                }
                if !p.has_error() {
                    p.expect(SyntaxKind::ASSIGN);
                }
                if !p.has_error() {
                    expressions::parse_expr(p);
                    for name in lhs_names.iter().flatten() {
                        if !p.symbols.contains(name) {
                            p.symbols.insert(name, IdentKind::Other);
                        }
                    }
                }
                SyntaxKind::ASSIGN_STMT
            }
            kind if REDUCE_OPS.contains(&kind) => {
                p.advance(); // reduce op
                expressions::parse_expr(p);
                for name in lhs_names.iter().flatten() {
                    if !p.symbols.contains(name) {
                        p.symbols.insert(name, IdentKind::Other);
                    }
                }
                SyntaxKind::REDUCE_STMT
            }
            _ => SyntaxKind::EXPR_STMT,
        }
    };

    p.recover_past(SyntaxKind::SEMICOLON);
    p.close(m, node);
}

/// When the upcoming expression is a bare identifier immediately followed by
/// `,`, `=`, or a reduction operator, return its text: it is an assignment
/// target eligible for implicit registration.
fn pending_simple_lhs(p: &Parser) -> Option<String> {
    if p.at(SyntaxKind::IDENT)
        && (matches!(p.nth(1), SyntaxKind::COMMA | SyntaxKind::ASSIGN)
            || REDUCE_OPS.contains(&p.nth(1)))
    {
        Some(p.current_text().to_string())
    } else {
        None
    }
}
