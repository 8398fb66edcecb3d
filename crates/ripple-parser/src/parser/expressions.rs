//! Expression parsers.
//!
//! Layered precedence climbing following the DSL grammar, lowest first:
//! `or` < `and` < `xor` < equality/relational (N-ary) < additive <
//! multiplicative < unary sign < exponent (right-associative) < transpose <
//! tensor read `[...]` < the `.` method chain. An expression can instead
//! start with `map`, `new`, `load`, or `intersection`.
//!
//! The `.` chain is where the graph operations live: `from`/`to` filters
//! wrap the receiver and are absorbed by the next `apply` family member in
//! the chain; `where`/`filter` produce a vertexset filter; other
//! identifiers become method calls, declared-function calls, or field
//! reads.

use crate::symbols::IdentKind;
use crate::syntax_kind::SyntaxKind;

use super::types::{parse_element_type, parse_scalar_type, parse_type, parse_vector_block_type};
use super::{MarkClosed, Parser};

/// Parse an expression.
pub(crate) fn parse_expr(p: &mut Parser) -> Option<MarkClosed> {
    match p.current() {
        SyntaxKind::MAP_KW => parse_map_expr(p),
        SyntaxKind::NEW_KW => parse_new_expr(p),
        SyntaxKind::LOAD_KW => parse_load_expr(p),
        SyntaxKind::INTERSECTION_KW => parse_intersection_expr(p),
        _ => parse_or_expr(p),
    }
}

// ── Binary precedence layers ───────────────────────────────────────────

fn parse_binary_layer(
    p: &mut Parser,
    ops: &[SyntaxKind],
    next: fn(&mut Parser) -> Option<MarkClosed>,
) -> Option<MarkClosed> {
    let mut lhs = next(p)?;
    while p.at_any(ops) && !p.has_error() {
        let m = p.open_before(lhs);
        p.advance(); // operator
        next(p);
        lhs = p.close(m, SyntaxKind::BINARY_EXPR);
    }
    Some(lhs)
}

fn parse_or_expr(p: &mut Parser) -> Option<MarkClosed> {
    parse_binary_layer(p, &[SyntaxKind::OR_KW], parse_and_expr)
}

fn parse_and_expr(p: &mut Parser) -> Option<MarkClosed> {
    parse_binary_layer(p, &[SyntaxKind::AND_KW], parse_xor_expr)
}

fn parse_xor_expr(p: &mut Parser) -> Option<MarkClosed> {
    parse_binary_layer(p, &[SyntaxKind::XOR_KW], parse_eq_expr)
}

const CMP_OPS: &[SyntaxKind] = &[
    SyntaxKind::EQ,
    SyntaxKind::NEQ,
    SyntaxKind::L_ANGLE,
    SyntaxKind::R_ANGLE,
    SyntaxKind::LE,
    SyntaxKind::GE,
];

/// N-ary equality/relational chain: `a < b <= c` is one EQ_EXPR node with
/// three operands and two operator tokens.
fn parse_eq_expr(p: &mut Parser) -> Option<MarkClosed> {
    let lhs = parse_term(p)?;
    if !p.at_any(CMP_OPS) {
        return Some(lhs);
    }
    let m = p.open_before(lhs);
    while p.at_any(CMP_OPS) && !p.has_error() {
        p.advance(); // comparison operator
        parse_term(p);
    }
    Some(p.close(m, SyntaxKind::EQ_EXPR))
}

/// `('not' term) | add_expr`
fn parse_term(p: &mut Parser) -> Option<MarkClosed> {
    if p.at(SyntaxKind::NOT_KW) {
        let m = p.open();
        p.advance(); // not
        parse_term(p);
        return Some(p.close(m, SyntaxKind::NOT_EXPR));
    }
    parse_add_expr(p)
}

fn parse_add_expr(p: &mut Parser) -> Option<MarkClosed> {
    parse_binary_layer(p, &[SyntaxKind::PLUS, SyntaxKind::MINUS], parse_mul_expr)
}

fn parse_mul_expr(p: &mut Parser) -> Option<MarkClosed> {
    parse_binary_layer(
        p,
        &[
            SyntaxKind::STAR,
            SyntaxKind::SLASH,
            SyntaxKind::BACKSLASH,
            SyntaxKind::DOT_STAR,
            SyntaxKind::DOT_SLASH,
        ],
        parse_neg_expr,
    )
}

/// `(('+' | '-') neg_expr) | exp_expr`
fn parse_neg_expr(p: &mut Parser) -> Option<MarkClosed> {
    if p.at(SyntaxKind::MINUS) || p.at(SyntaxKind::PLUS) {
        let m = p.open();
        p.advance(); // sign
        parse_neg_expr(p);
        return Some(p.close(m, SyntaxKind::NEG_EXPR));
    }
    parse_exp_expr(p)
}

/// `transpose_expr ['^' exp_expr]` -- right-associative.
fn parse_exp_expr(p: &mut Parser) -> Option<MarkClosed> {
    let lhs = parse_transpose_expr(p)?;
    if p.at(SyntaxKind::CARET) {
        let m = p.open_before(lhs);
        p.advance(); // ^
        parse_exp_expr(p);
        return Some(p.close(m, SyntaxKind::BINARY_EXPR));
    }
    Some(lhs)
}

/// `tensor_read_expr {'''}`
fn parse_transpose_expr(p: &mut Parser) -> Option<MarkClosed> {
    let mut lhs = parse_tensor_read_expr(p)?;
    while p.at(SyntaxKind::TRANSPOSE) {
        let m = p.open_before(lhs);
        p.advance(); // '
        lhs = p.close(m, SyntaxKind::TRANSPOSE_EXPR);
    }
    Some(lhs)
}

/// `chain_expr {'[' [expr {',' expr}] ']'}`
fn parse_tensor_read_expr(p: &mut Parser) -> Option<MarkClosed> {
    let mut lhs = parse_chain_expr(p)?;
    while p.at(SyntaxKind::L_BRACKET) && !p.has_error() {
        let m = p.open_before(lhs);
        p.advance(); // [
        if !p.at(SyntaxKind::R_BRACKET) {
            loop {
                parse_expr(p);
                if p.has_error() || !p.eat(SyntaxKind::COMMA) {
                    break;
                }
            }
        }
        p.expect(SyntaxKind::R_BRACKET);
        lhs = p.close(m, SyntaxKind::TENSOR_READ_EXPR);
    }
    Some(lhs)
}

// ── The `.` method chain ───────────────────────────────────────────────

/// `factor {'.' chain_op}` where chain_op is one of the filter/apply/where
/// forms, a method or declared-function call, or a field read.
fn parse_chain_expr(p: &mut Parser) -> Option<MarkClosed> {
    let mut lhs = parse_factor(p)?;

    while p.at(SyntaxKind::PERIOD) && !p.has_error() {
        match p.nth(1) {
            SyntaxKind::FROM_KW | SyntaxKind::SRC_FILTER_KW => {
                lhs = parse_filter(p, lhs, SyntaxKind::FROM_FILTER);
            }
            SyntaxKind::TO_KW | SyntaxKind::DST_FILTER_KW => {
                lhs = parse_filter(p, lhs, SyntaxKind::TO_FILTER);
            }
            SyntaxKind::APPLY_KW
            | SyntaxKind::APPLY_UPDATE_PRIORITY_KW
            | SyntaxKind::APPLY_UPDATE_PRIORITY_EXTERN_KW => {
                let m = p.open_before(lhs);
                p.advance(); // .
                p.advance(); // apply keyword
                p.expect(SyntaxKind::L_PAREN);
                p.expect(SyntaxKind::IDENT);
                p.expect(SyntaxKind::R_PAREN);
                lhs = p.close(m, SyntaxKind::APPLY_EXPR);
            }
            SyntaxKind::APPLY_MODIFIED_KW => {
                lhs = parse_apply_modified(p, lhs);
            }
            SyntaxKind::WHERE_KW | SyntaxKind::FILTER_KW => {
                let m = p.open_before(lhs);
                p.advance(); // .
                p.advance(); // where/filter
                p.expect(SyntaxKind::L_PAREN);
                p.expect(SyntaxKind::IDENT);
                p.expect(SyntaxKind::R_PAREN);
                lhs = p.close(m, SyntaxKind::WHERE_EXPR);
            }
            SyntaxKind::IDENT => {
                let is_call = p.nth(2) == SyntaxKind::L_PAREN;
                let is_declared_function =
                    p.symbols.get(p.nth_text(1)) == Some(IdentKind::Function);
                let m = p.open_before(lhs);
                p.advance(); // .
                p.advance(); // ident
                if is_call {
                    parse_arg_list(p);
                    // A name the symbol table knows as a function is a call
                    // to that function; anything else is a method on the
                    // receiver.
                    let kind = if is_declared_function {
                        SyntaxKind::CALL_EXPR
                    } else {
                        SyntaxKind::METHOD_CALL_EXPR
                    };
                    lhs = p.close(m, kind);
                } else {
                    lhs = p.close(m, SyntaxKind::FIELD_READ_EXPR);
                }
            }
            _ => {
                p.error("expected a method, filter, or field after `.`");
                break;
            }
        }
    }

    Some(lhs)
}

/// `.from(f)` / `.to(f)` and their srcFilter/dstFilter spellings. The
/// filter node wraps the receiver; a following apply absorbs it.
fn parse_filter(p: &mut Parser, lhs: MarkClosed, kind: SyntaxKind) -> MarkClosed {
    let m = p.open_before(lhs);
    p.advance(); // .
    p.advance(); // from/to/srcFilter/dstFilter
    p.expect(SyntaxKind::L_PAREN);
    p.expect(SyntaxKind::IDENT);
    p.expect(SyntaxKind::R_PAREN);
    p.close(m, kind)
}

/// `.applyModified(f, field [, true|false])` -- the optional third argument
/// must be a boolean literal.
fn parse_apply_modified(p: &mut Parser, lhs: MarkClosed) -> MarkClosed {
    let m = p.open_before(lhs);
    p.advance(); // .
    p.advance(); // applyModified
    p.expect(SyntaxKind::L_PAREN);
    p.expect(SyntaxKind::IDENT); // apply function
    p.expect(SyntaxKind::COMMA);
    p.expect(SyntaxKind::IDENT); // change tracking field
    if p.eat(SyntaxKind::COMMA) {
        if p.at(SyntaxKind::TRUE_KW) || p.at(SyntaxKind::FALSE_KW) {
            p.advance();
        } else {
            p.error("applyModified takes a boolean literal as its deduplication argument");
        }
    }
    if !p.has_error() {
        p.expect(SyntaxKind::R_PAREN);
    }
    p.close(m, SyntaxKind::APPLY_EXPR)
}

// ── Factors ────────────────────────────────────────────────────────────

/// Primary expressions: parenthesized, identifier (with tuple/function/
/// generic disambiguation), or literal.
fn parse_factor(p: &mut Parser) -> Option<MarkClosed> {
    match p.current() {
        SyntaxKind::L_PAREN => {
            let m = p.open();
            p.advance(); // (
            parse_expr(p);
            p.expect(SyntaxKind::R_PAREN);
            Some(p.close(m, SyntaxKind::PAREN_EXPR))
        }

        SyntaxKind::IDENT => parse_ident_factor(p),

        SyntaxKind::INT_LITERAL
        | SyntaxKind::FLOAT_LITERAL
        | SyntaxKind::STRING_LITERAL
        | SyntaxKind::TRUE_KW
        | SyntaxKind::FALSE_KW => {
            let m = p.open();
            p.advance();
            Some(p.close(m, SyntaxKind::LITERAL))
        }

        SyntaxKind::L_BRACKET => Some(parse_dense_tensor_literal(p)),

        _ => {
            p.error("expected an expression");
            None
        }
    }
}

/// An identifier in factor position. The symbol table decides between a
/// generic or plain call, a range constant, a tuple read, and a variable.
fn parse_ident_factor(p: &mut Parser) -> Option<MarkClosed> {
    // Generic call `f<V>(…)` vs comparison `f < v`: a bounded peek past the
    // `<` looks for `>` followed by `(`, or a `,` separating index sets.
    if p.nth(1) == SyntaxKind::L_ANGLE {
        let looks_generic = p.nth(3) == SyntaxKind::COMMA
            || (p.nth(3) == SyntaxKind::R_ANGLE && p.nth(4) == SyntaxKind::L_PAREN);
        if looks_generic {
            return Some(parse_call_expr(p));
        }
    }

    match p.symbols.get(p.current_text()) {
        Some(IdentKind::Function) if p.nth(1) == SyntaxKind::L_PAREN => {
            Some(parse_call_expr(p))
        }
        Some(IdentKind::RangeGenericParam) => {
            let m = p.open();
            p.advance();
            Some(p.close(m, SyntaxKind::RANGE_CONST))
        }
        Some(IdentKind::Tuple) if p.nth(1) == SyntaxKind::L_PAREN => {
            // Unnamed tuple read: `t(0)`.
            let m = p.open();
            let var = p.open();
            p.advance(); // tuple name
            p.close(var, SyntaxKind::VAR_EXPR);
            p.advance(); // (
            parse_expr(p);
            p.expect(SyntaxKind::R_PAREN);
            Some(p.close(m, SyntaxKind::UNNAMED_TUPLE_READ_EXPR))
        }
        Some(IdentKind::Tuple) if p.nth(1) == SyntaxKind::PERIOD => {
            // Named tuple read: `t.elem`.
            let m = p.open();
            let var = p.open();
            p.advance(); // tuple name
            p.close(var, SyntaxKind::VAR_EXPR);
            p.advance(); // .
            p.expect(SyntaxKind::IDENT);
            Some(p.close(m, SyntaxKind::NAMED_TUPLE_READ_EXPR))
        }
        _ => {
            let m = p.open();
            p.advance();
            Some(p.close(m, SyntaxKind::VAR_EXPR))
        }
    }
}

/// `ident ['<' index_sets '>'] '(' [args] ')'`
fn parse_call_expr(p: &mut Parser) -> MarkClosed {
    let m = p.open();
    p.advance(); // function name
    if p.eat(SyntaxKind::L_ANGLE) {
        loop {
            parse_index_set(p);
            if p.has_error() || !p.eat(SyntaxKind::COMMA) {
                break;
            }
        }
        p.expect(SyntaxKind::R_ANGLE);
    }
    parse_arg_list(p);
    p.close(m, SyntaxKind::CALL_EXPR)
}

/// `'(' [expr {',' expr}] ')'`
pub(crate) fn parse_arg_list(p: &mut Parser) {
    let m = p.open();
    p.expect(SyntaxKind::L_PAREN);
    if !p.at(SyntaxKind::R_PAREN) && !p.has_error() {
        loop {
            parse_expr(p);
            if p.has_error() || !p.eat(SyntaxKind::COMMA) {
                break;
            }
        }
    }
    if !p.has_error() {
        p.expect(SyntaxKind::R_PAREN);
    }
    p.close(m, SyntaxKind::ARG_LIST);
}

/// An index set in generic-argument position: an integer range or a named
/// set.
fn parse_index_set(p: &mut Parser) {
    match p.current() {
        SyntaxKind::INT_LITERAL => {
            let m = p.open();
            p.advance();
            p.close(m, SyntaxKind::RANGE_INDEX_SET);
        }
        SyntaxKind::IDENT => {
            let m = p.open();
            p.advance();
            p.close(m, SyntaxKind::SET_INDEX_SET);
        }
        _ => p.error("expected an index set"),
    }
}

// ── Graph expression forms ─────────────────────────────────────────────

/// `map f ['<' index_sets '>'] ['(' args ')'] to S ['through' T]
/// ['reduce' '+']`
fn parse_map_expr(p: &mut Parser) -> Option<MarkClosed> {
    let m = p.open();
    p.advance(); // map
    p.expect(SyntaxKind::IDENT);
    if p.eat(SyntaxKind::L_ANGLE) {
        loop {
            parse_index_set(p);
            if p.has_error() || !p.eat(SyntaxKind::COMMA) {
                break;
            }
        }
        p.expect(SyntaxKind::R_ANGLE);
    }
    if p.at(SyntaxKind::L_PAREN) {
        parse_arg_list(p);
    }
    if !p.has_error() {
        p.expect(SyntaxKind::TO_KW);
        parse_index_set(p);
    }
    if p.eat(SyntaxKind::THROUGH_KW) {
        parse_index_set(p);
    }
    if p.eat(SyntaxKind::REDUCE_KW) {
        p.expect(SyntaxKind::PLUS);
    }
    Some(p.close(m, SyntaxKind::MAP_EXPR))
}

/// The allocator: `new vertexset{Elt}([n])`, `new list{T}([n])`,
/// `new priority_queue{Elt}(prio)(…)`, `new vector[…]{Elt}(scalar)()`.
fn parse_new_expr(p: &mut Parser) -> Option<MarkClosed> {
    let m = p.open();
    p.advance(); // new

    let kind = match p.current() {
        SyntaxKind::VERTEXSET_KW => {
            p.advance();
            p.expect(SyntaxKind::L_BRACE);
            parse_element_type(p);
            p.expect(SyntaxKind::R_BRACE);
            p.expect(SyntaxKind::L_PAREN);
            if !p.at(SyntaxKind::R_PAREN) && !p.has_error() {
                parse_expr(p);
            }
            if !p.has_error() {
                p.expect(SyntaxKind::R_PAREN);
            }
            SyntaxKind::VERTEX_SET_ALLOC_EXPR
        }
        SyntaxKind::LIST_KW => {
            p.advance();
            p.expect(SyntaxKind::L_BRACE);
            parse_type(p);
            p.expect(SyntaxKind::R_BRACE);
            p.expect(SyntaxKind::L_PAREN);
            if !p.at(SyntaxKind::R_PAREN) && !p.has_error() {
                parse_expr(p);
            }
            if !p.has_error() {
                p.expect(SyntaxKind::R_PAREN);
            }
            SyntaxKind::LIST_ALLOC_EXPR
        }
        SyntaxKind::PRIORITY_QUEUE_KW => {
            p.advance();
            p.expect(SyntaxKind::L_BRACE);
            parse_element_type(p);
            p.expect(SyntaxKind::R_BRACE);
            p.expect(SyntaxKind::L_PAREN);
            parse_scalar_type(p);
            p.expect(SyntaxKind::R_PAREN);
            // (dup_within, dup_across, vector_fn, bucket_ord, priority_ord,
            //  init_bucket, start_node)
            p.expect(SyntaxKind::L_PAREN);
            for i in 0..7 {
                if p.has_error() {
                    break;
                }
                if i == 2 {
                    p.expect(SyntaxKind::IDENT); // the vector function
                } else {
                    parse_expr(p);
                }
                if i < 6 && !p.has_error() {
                    p.expect(SyntaxKind::COMMA);
                }
            }
            if !p.has_error() {
                p.expect(SyntaxKind::R_PAREN);
            }
            SyntaxKind::PRIORITY_QUEUE_ALLOC_EXPR
        }
        SyntaxKind::VECTOR_KW => {
            // The vector form reuses the vector block type grammar; length
            // and element anchor come from the type.
            parse_vector_block_type(p);
            p.expect(SyntaxKind::L_PAREN);
            p.expect(SyntaxKind::R_PAREN);
            SyntaxKind::VECTOR_ALLOC_EXPR
        }
        _ => {
            p.error("expected vertexset, list, vector, or priority_queue after `new`");
            SyntaxKind::VERTEX_SET_ALLOC_EXPR
        }
    };

    Some(p.close(m, kind))
}

/// `load '(' expr ')'`
fn parse_load_expr(p: &mut Parser) -> Option<MarkClosed> {
    let m = p.open();
    p.advance(); // load
    p.expect(SyntaxKind::L_PAREN);
    parse_expr(p);
    if !p.has_error() {
        p.expect(SyntaxKind::R_PAREN);
    }
    Some(p.close(m, SyntaxKind::LOAD_EXPR))
}

/// `intersection '(' a ',' b ',' na ',' nb [',' ref] ')'`
fn parse_intersection_expr(p: &mut Parser) -> Option<MarkClosed> {
    let m = p.open();
    p.advance(); // intersection
    p.expect(SyntaxKind::L_PAREN);
    for i in 0..4 {
        if p.has_error() {
            break;
        }
        parse_expr(p);
        if i < 3 && !p.has_error() {
            p.expect(SyntaxKind::COMMA);
        }
    }
    if p.eat(SyntaxKind::COMMA) {
        parse_expr(p);
    }
    if !p.has_error() {
        p.expect(SyntaxKind::R_PAREN);
    }
    Some(p.close(m, SyntaxKind::INTERSECTION_EXPR))
}

// ── Dense tensor literals ──────────────────────────────────────────────

/// `'[' … ']'` with nested bracket literals, signed numbers, optional
/// commas, and `;` row separators.
fn parse_dense_tensor_literal(p: &mut Parser) -> MarkClosed {
    let m = p.open();
    p.advance(); // [
    while !p.at(SyntaxKind::R_BRACKET) && !p.at(SyntaxKind::EOF) && !p.has_error() {
        match p.current() {
            SyntaxKind::L_BRACKET => {
                parse_dense_tensor_literal(p);
            }
            SyntaxKind::COMMA | SyntaxKind::SEMICOLON => {
                p.advance();
            }
            SyntaxKind::PLUS | SyntaxKind::MINUS => {
                let lit = p.open();
                p.advance(); // sign
                if p.at(SyntaxKind::INT_LITERAL) || p.at(SyntaxKind::FLOAT_LITERAL) {
                    p.advance();
                } else {
                    p.error("expected a number in tensor literal");
                }
                p.close(lit, SyntaxKind::LITERAL);
            }
            SyntaxKind::INT_LITERAL | SyntaxKind::FLOAT_LITERAL => {
                let lit = p.open();
                p.advance();
                p.close(lit, SyntaxKind::LITERAL);
            }
            _ => {
                p.error("expected a tensor literal element");
            }
        }
    }
    if !p.has_error() {
        p.expect(SyntaxKind::R_BRACKET);
    }
    p.close(m, SyntaxKind::TENSOR_LITERAL)
}
