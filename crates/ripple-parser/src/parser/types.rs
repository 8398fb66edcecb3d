//! Type parsers.
//!
//! The type grammar covers scalars, tensor/vector/matrix block types with
//! optional element anchors, element types, vertexsets, edgesets with
//! endpoint element types and an optional weight, lists, unstructured sets,
//! grids, named/unnamed tuples, priority queues, and `opaque`.

use crate::syntax_kind::SyntaxKind;

use super::Parser;

pub(super) const SCALAR_TYPE_START: &[SyntaxKind] = &[
    SyntaxKind::INT_KW,
    SyntaxKind::UINT_KW,
    SyntaxKind::UINT_64_KW,
    SyntaxKind::FLOAT_KW,
    SyntaxKind::DOUBLE_KW,
    SyntaxKind::BOOL_KW,
    SyntaxKind::COMPLEX_KW,
    SyntaxKind::STRING_KW,
];

/// Parse a type, returning the kind of node produced (used by callers that
/// classify the declared name, e.g. tuple-typed parameters).
pub(crate) fn parse_type(p: &mut Parser) -> Option<SyntaxKind> {
    let kind = match p.current() {
        SyntaxKind::IDENT => {
            parse_element_type(p);
            SyntaxKind::ELEMENT_TYPE
        }
        SyntaxKind::SET_KW => parse_set_type(p),
        SyntaxKind::EDGESET_KW => parse_edge_set_type(p),
        SyntaxKind::VERTEXSET_KW => parse_vertex_set_type(p),
        SyntaxKind::LIST_KW => parse_list_type(p),
        SyntaxKind::GRID_KW => parse_grid_set_type(p),
        SyntaxKind::L_PAREN => parse_tuple_type(p),
        SyntaxKind::TENSOR_KW | SyntaxKind::MATRIX_KW | SyntaxKind::VECTOR_KW => {
            parse_tensor_type(p)
        }
        SyntaxKind::OPAQUE_KW => {
            let m = p.open();
            p.advance();
            p.close(m, SyntaxKind::OPAQUE_TYPE);
            SyntaxKind::OPAQUE_TYPE
        }
        SyntaxKind::PRIORITY_QUEUE_KW => parse_priority_queue_type(p),
        kind if SCALAR_TYPE_START.contains(&kind) => {
            parse_scalar_type(p);
            SyntaxKind::SCALAR_TYPE
        }
        _ => {
            p.error("expected a type");
            return None;
        }
    };
    Some(kind)
}

/// A bare identifier naming an element type.
pub(crate) fn parse_element_type(p: &mut Parser) {
    let m = p.open();
    p.expect(SyntaxKind::IDENT);
    p.close(m, SyntaxKind::ELEMENT_TYPE);
}

/// `'int' | 'uint' | 'uint_64' | 'float' | 'double' | 'bool' | 'complex'
/// | 'string'`
pub(crate) fn parse_scalar_type(p: &mut Parser) {
    let m = p.open();
    if p.at_any(SCALAR_TYPE_START) {
        p.advance();
    } else {
        p.error("expected a scalar type");
    }
    p.close(m, SyntaxKind::SCALAR_TYPE);
}

/// `vertexset '{' element '}'`
fn parse_vertex_set_type(p: &mut Parser) -> SyntaxKind {
    let m = p.open();
    p.advance(); // vertexset
    p.expect(SyntaxKind::L_BRACE);
    parse_element_type(p);
    p.expect(SyntaxKind::R_BRACE);
    p.close(m, SyntaxKind::VERTEX_SET_TYPE);
    SyntaxKind::VERTEX_SET_TYPE
}

/// `edgeset '{' element '}' '(' src ',' dst [',' weight_scalar] ')'`
fn parse_edge_set_type(p: &mut Parser) -> SyntaxKind {
    let m = p.open();
    p.advance(); // edgeset
    p.expect(SyntaxKind::L_BRACE);
    parse_element_type(p);
    p.expect(SyntaxKind::R_BRACE);
    p.expect(SyntaxKind::L_PAREN);
    if !p.has_error() {
        parse_element_type(p); // source endpoint
        p.expect(SyntaxKind::COMMA);
        parse_element_type(p); // destination endpoint
        if p.eat(SyntaxKind::COMMA) {
            parse_scalar_type(p); // weight
        }
        p.expect(SyntaxKind::R_PAREN);
    }
    p.close(m, SyntaxKind::EDGE_SET_TYPE);
    SyntaxKind::EDGE_SET_TYPE
}

/// `list '{' type '}'`
fn parse_list_type(p: &mut Parser) -> SyntaxKind {
    let m = p.open();
    p.advance(); // list
    p.expect(SyntaxKind::L_BRACE);
    parse_type(p);
    p.expect(SyntaxKind::R_BRACE);
    p.close(m, SyntaxKind::LIST_TYPE);
    SyntaxKind::LIST_TYPE
}

/// `set '{' element '}' ['(' (endpoint '*' length | endpoints) ')']`
///
/// A `*` after the first endpoint makes the set homogeneous with a tuple
/// length; otherwise the endpoints are a comma list.
fn parse_set_type(p: &mut Parser) -> SyntaxKind {
    let m = p.open();
    p.advance(); // set
    p.expect(SyntaxKind::L_BRACE);
    parse_element_type(p);
    p.expect(SyntaxKind::R_BRACE);
    if p.eat(SyntaxKind::L_PAREN) {
        parse_endpoint(p);
        if p.eat(SyntaxKind::STAR) {
            parse_tuple_length(p);
        } else {
            while p.eat(SyntaxKind::COMMA) {
                parse_endpoint(p);
            }
        }
        p.expect(SyntaxKind::R_PAREN);
    }
    p.close(m, SyntaxKind::SET_TYPE);
    SyntaxKind::SET_TYPE
}

/// `grid '[' INT ']' '{' element '}' '(' point_set ')'`
fn parse_grid_set_type(p: &mut Parser) -> SyntaxKind {
    let m = p.open();
    p.advance(); // grid
    p.expect(SyntaxKind::L_BRACKET);
    p.expect(SyntaxKind::INT_LITERAL);
    p.expect(SyntaxKind::R_BRACKET);
    p.expect(SyntaxKind::L_BRACE);
    parse_element_type(p);
    p.expect(SyntaxKind::R_BRACE);
    p.expect(SyntaxKind::L_PAREN);
    if p.at(SyntaxKind::IDENT) {
        let inner = p.open();
        p.advance();
        p.close(inner, SyntaxKind::SET_INDEX_SET);
    } else {
        p.error("expected the underlying point set");
    }
    p.expect(SyntaxKind::R_PAREN);
    p.close(m, SyntaxKind::GRID_SET_TYPE);
    SyntaxKind::GRID_SET_TYPE
}

/// `priority_queue '{' element '}' '(' priority_scalar ')'`
fn parse_priority_queue_type(p: &mut Parser) -> SyntaxKind {
    let m = p.open();
    p.advance(); // priority_queue
    p.expect(SyntaxKind::L_BRACE);
    parse_element_type(p);
    p.expect(SyntaxKind::R_BRACE);
    p.expect(SyntaxKind::L_PAREN);
    parse_scalar_type(p);
    p.expect(SyntaxKind::R_PAREN);
    p.close(m, SyntaxKind::PRIORITY_QUEUE_TYPE);
    SyntaxKind::PRIORITY_QUEUE_TYPE
}

/// Named tuple `(a : A, b : B)` or unnamed tuple `(E * n)`; which one is
/// decided by whether a `:` follows the first identifier.
fn parse_tuple_type(p: &mut Parser) -> SyntaxKind {
    if p.nth(2) == SyntaxKind::COLON {
        let m = p.open();
        p.advance(); // (
        loop {
            parse_tuple_element(p);
            if p.has_error() || !p.eat(SyntaxKind::COMMA) {
                break;
            }
        }
        p.expect(SyntaxKind::R_PAREN);
        p.close(m, SyntaxKind::NAMED_TUPLE_TYPE);
        SyntaxKind::NAMED_TUPLE_TYPE
    } else {
        let m = p.open();
        p.advance(); // (
        parse_element_type(p);
        p.expect(SyntaxKind::STAR);
        parse_tuple_length(p);
        p.expect(SyntaxKind::R_PAREN);
        p.close(m, SyntaxKind::UNNAMED_TUPLE_TYPE);
        SyntaxKind::UNNAMED_TUPLE_TYPE
    }
}

/// `name ':' element`
fn parse_tuple_element(p: &mut Parser) {
    let m = p.open();
    p.expect(SyntaxKind::IDENT);
    p.expect(SyntaxKind::COLON);
    if !p.has_error() {
        parse_element_type(p);
    }
    p.close(m, SyntaxKind::TUPLE_ELEMENT);
}

fn parse_tuple_length(p: &mut Parser) {
    let m = p.open();
    p.expect(SyntaxKind::INT_LITERAL);
    p.close(m, SyntaxKind::TUPLE_LENGTH);
}

/// An endpoint of an unstructured set type.
fn parse_endpoint(p: &mut Parser) {
    let m = p.open();
    if p.at(SyntaxKind::IDENT) {
        let inner = p.open();
        p.advance();
        p.close(inner, SyntaxKind::SET_INDEX_SET);
    } else {
        p.error("expected an endpoint set");
    }
    p.close(m, SyntaxKind::ENDPOINT);
}

// ── Tensor block types ─────────────────────────────────────────────────

/// `tensor_type: scalar | matrix_block | (vector_block | tensor_block)
/// [''']`
pub(crate) fn parse_tensor_type(p: &mut Parser) -> SyntaxKind {
    match p.current() {
        kind if SCALAR_TYPE_START.contains(&kind) => {
            parse_scalar_type(p);
            SyntaxKind::SCALAR_TYPE
        }
        SyntaxKind::MATRIX_KW => parse_matrix_block_type(p),
        SyntaxKind::VECTOR_KW => {
            parse_vector_block_type(p);
            SyntaxKind::ND_TENSOR_TYPE
        }
        SyntaxKind::TENSOR_KW => parse_tensor_block_type(p),
        _ => {
            p.error("expected a tensor type");
            SyntaxKind::SCALAR_TYPE
        }
    }
}

/// `vector ['[' index_set ']'] ['{' element '}'] '(' (vector_block |
/// scalar) ')' [''']`
///
/// The element anchor (`{Vertex}`) marks the vector as a property array of
/// that element type.
pub(crate) fn parse_vector_block_type(p: &mut Parser) {
    let m = p.open();
    p.advance(); // vector
    if p.eat(SyntaxKind::L_BRACKET) {
        parse_index_set(p);
        p.expect(SyntaxKind::R_BRACKET);
    }
    if p.eat(SyntaxKind::L_BRACE) {
        parse_element_type(p);
        p.expect(SyntaxKind::R_BRACE);
    }
    p.expect(SyntaxKind::L_PAREN);
    if p.at(SyntaxKind::VECTOR_KW) {
        parse_vector_block_type(p);
    } else {
        parse_scalar_type(p);
    }
    p.expect(SyntaxKind::R_PAREN);
    p.eat(SyntaxKind::TRANSPOSE);
    p.close(m, SyntaxKind::ND_TENSOR_TYPE);
}

/// `matrix ['[' index_set ',' index_set ']'] '(' (matrix_block | scalar)
/// ')'`
fn parse_matrix_block_type(p: &mut Parser) -> SyntaxKind {
    let m = p.open();
    p.advance(); // matrix
    if p.eat(SyntaxKind::L_BRACKET) {
        parse_index_set(p);
        p.expect(SyntaxKind::COMMA);
        parse_index_set(p);
        p.expect(SyntaxKind::R_BRACKET);
    }
    p.expect(SyntaxKind::L_PAREN);
    if p.at(SyntaxKind::MATRIX_KW) {
        parse_matrix_block_type(p);
    } else {
        parse_scalar_type(p);
    }
    p.expect(SyntaxKind::R_PAREN);
    p.eat(SyntaxKind::TRANSPOSE);
    p.close(m, SyntaxKind::ND_TENSOR_TYPE);
    SyntaxKind::ND_TENSOR_TYPE
}

/// `tensor ['[' index_sets ']'] '(' (tensor_block | scalar) ')'`
fn parse_tensor_block_type(p: &mut Parser) -> SyntaxKind {
    let m = p.open();
    p.advance(); // tensor
    if p.eat(SyntaxKind::L_BRACKET) {
        loop {
            parse_index_set(p);
            if p.has_error() || !p.eat(SyntaxKind::COMMA) {
                break;
            }
        }
        p.expect(SyntaxKind::R_BRACKET);
    }
    p.expect(SyntaxKind::L_PAREN);
    if p.at(SyntaxKind::TENSOR_KW) {
        parse_tensor_block_type(p);
    } else {
        parse_scalar_type(p);
    }
    p.expect(SyntaxKind::R_PAREN);
    p.eat(SyntaxKind::TRANSPOSE);
    p.close(m, SyntaxKind::ND_TENSOR_TYPE);
    SyntaxKind::ND_TENSOR_TYPE
}

/// `INT_LITERAL | ident` in index-set position within a type.
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
