//! Program-element parsers: element type declarations, extern declarations,
//! function declarations, const declarations, and tests.

use crate::symbols::IdentKind;
use crate::syntax_kind::SyntaxKind;

use super::types::{parse_tensor_type, parse_type};
use super::{expressions, stmts, Parser};

/// Parse the current identifier into a NAME node, returning its text.
///
/// Records an error (without consuming) when the current token is not an
/// identifier.
pub(super) fn parse_name(p: &mut Parser) -> Option<String> {
    if p.at(SyntaxKind::IDENT) {
        let text = p.current_text().to_string();
        let m = p.open();
        p.advance();
        p.close(m, SyntaxKind::NAME);
        Some(text)
    } else {
        p.error(&format!(
            "expected an identifier but got {:?}",
            p.current()
        ));
        None
    }
}

// ── Element type declarations ────────────────────────────────────────────

/// `element Vertex field* end`
pub(crate) fn parse_element_type_decl(p: &mut Parser) {
    let m = p.open();
    p.advance(); // ELEMENT_KW

    parse_name(p);

    // Fields until `end`.
    while p.at(SyntaxKind::IDENT) && !p.has_error() {
        parse_field_decl(p);
    }

    p.recover_past(SyntaxKind::END_KW);
    p.close(m, SyntaxKind::ELEMENT_TYPE_DECL);
}

/// `name : tensor_type ;`
fn parse_field_decl(p: &mut Parser) {
    let m = p.open();
    let name = parse_name(p);
    p.expect(SyntaxKind::COLON);
    if !p.has_error() {
        parse_tensor_type(p);
    }
    if let Some(name) = name {
        p.symbols.insert(&name, IdentKind::Other);
    }
    p.recover_to(&[SyntaxKind::SEMICOLON, SyntaxKind::END_KW]);
    p.eat(SyntaxKind::SEMICOLON);
    p.close(m, SyntaxKind::FIELD_DECL);
}

// ── Extern declarations ──────────────────────────────────────────────────

/// Dispatch `extern func …;` vs `extern name : type;`.
pub(crate) fn parse_extern_func_or_decl(p: &mut Parser) {
    if p.nth(1) == SyntaxKind::FUNC_KW {
        parse_func_decl(p);
    } else {
        parse_extern_decl(p);
    }
}

/// `extern name : type ;`
fn parse_extern_decl(p: &mut Parser) {
    let m = p.open();
    p.advance(); // EXTERN_KW

    if let Some(name) = parse_name(p) {
        p.expect(SyntaxKind::COLON);
        let type_kind = if p.has_error() { None } else { parse_type(p) };
        let kind = match type_kind {
            Some(SyntaxKind::NAMED_TUPLE_TYPE) | Some(SyntaxKind::UNNAMED_TUPLE_TYPE) => {
                IdentKind::Tuple
            }
            _ => IdentKind::Other,
        };
        p.symbols.insert(&name, kind);
    }

    p.recover_past(SyntaxKind::SEMICOLON);
    p.close(m, SyntaxKind::EXTERN_DECL);
}

// ── Function declarations ────────────────────────────────────────────────

/// `[export] func name generic_params arguments results body end`, or the
/// external form `extern func name generic_params arguments results ;`.
///
/// Opens one scope for generics + arguments + results and a nested scope
/// for the body; the symbol-table depth is restored on every exit path.
pub(crate) fn parse_func_decl(p: &mut Parser) {
    let m = p.open();
    let depth = p.symbols.depth();

    let is_extern = p.eat(SyntaxKind::EXTERN_KW);
    p.eat(SyntaxKind::EXPORT_KW);
    p.expect(SyntaxKind::FUNC_KW);

    if let Some(name) = parse_name(p) {
        p.symbols.insert(&name, IdentKind::Function);
    }

    p.symbols.scope();

    if !p.has_error() {
        parse_generic_params(p);
        parse_param_list(p);
        parse_results(p);
    }

    if is_extern {
        p.recover_past(SyntaxKind::SEMICOLON);
    } else {
        p.symbols.scope();
        if !p.has_error() {
            stmts::parse_stmt_block(p);
        }
        p.recover_past(SyntaxKind::END_KW);
    }

    p.symbols.truncate(depth);
    p.close(m, SyntaxKind::FUNC_DECL);
}

/// `['<' generic_param {',' generic_param} '>']`
fn parse_generic_params(p: &mut Parser) {
    if !p.at(SyntaxKind::L_ANGLE) {
        return;
    }
    let m = p.open();
    p.advance(); // <
    loop {
        parse_generic_param(p);
        if !p.eat(SyntaxKind::COMMA) {
            break;
        }
    }
    p.expect(SyntaxKind::R_ANGLE);
    p.close(m, SyntaxKind::GENERIC_PARAM_LIST);
}

/// `[0 ':'] ident` -- the `0 :` prefix marks a range generic parameter.
fn parse_generic_param(p: &mut Parser) {
    let m = p.open();
    let is_range = p.at(SyntaxKind::INT_LITERAL)
        && p.current_text() == "0"
        && p.nth(1) == SyntaxKind::COLON;
    if is_range {
        p.advance(); // 0
        p.advance(); // :
    }
    if p.at(SyntaxKind::IDENT) {
        let name = p.current_text().to_string();
        let kind = if is_range {
            IdentKind::RangeGenericParam
        } else {
            IdentKind::GenericParam
        };
        p.symbols.insert(&name, kind);
        p.advance();
    } else {
        p.error("expected a generic parameter name");
    }
    p.close(m, SyntaxKind::GENERIC_PARAM);
}

/// `'(' [param {',' param}] ')'`
fn parse_param_list(p: &mut Parser) {
    let m = p.open();
    p.expect(SyntaxKind::L_PAREN);
    if !p.at(SyntaxKind::R_PAREN) && !p.has_error() {
        loop {
            parse_param(p);
            if !p.eat(SyntaxKind::COMMA) {
                break;
            }
        }
    }
    p.expect(SyntaxKind::R_PAREN);
    p.close(m, SyntaxKind::PARAM_LIST);
}

/// `['inout'] name ':' type` -- a parameter or result binding.
///
/// Registers the name as TUPLE when the type is a tuple type, OTHER
/// otherwise; that category drives tuple-read disambiguation later.
fn parse_param(p: &mut Parser) {
    let m = p.open();
    p.eat(SyntaxKind::INOUT_KW);
    let name = parse_name(p);
    p.expect(SyntaxKind::COLON);
    let type_kind = if p.has_error() { None } else { parse_type(p) };
    if let Some(name) = name {
        let kind = match type_kind {
            Some(SyntaxKind::NAMED_TUPLE_TYPE) | Some(SyntaxKind::UNNAMED_TUPLE_TYPE) => {
                IdentKind::Tuple
            }
            _ => IdentKind::Other,
        };
        p.symbols.insert(&name, kind);
    }
    p.close(m, SyntaxKind::PARAM);
}

/// `['->' (param | '(' param {',' param} ')')]`
fn parse_results(p: &mut Parser) {
    if !p.at(SyntaxKind::R_ARROW) {
        return;
    }
    let m = p.open();
    p.advance(); // ->
    if p.eat(SyntaxKind::L_PAREN) {
        loop {
            parse_param(p);
            if !p.eat(SyntaxKind::COMMA) {
                break;
            }
        }
        p.expect(SyntaxKind::R_PAREN);
    } else {
        parse_param(p);
    }
    p.close(m, SyntaxKind::RESULT_LIST);
}

// ── Const declarations (top level and statement position) ────────────────

/// `const name [: type] [= expr] ;`
pub(crate) fn parse_const_decl(p: &mut Parser) {
    parse_var_or_const(p, SyntaxKind::CONST_DECL);
}

/// `var name [: type [= expr]] | name = expr ;`
pub(crate) fn parse_var_decl(p: &mut Parser) {
    parse_var_or_const(p, SyntaxKind::VAR_DECL);
}

fn parse_var_or_const(p: &mut Parser, node: SyntaxKind) {
    let m = p.open();
    p.advance(); // CONST_KW or VAR_KW

    let name = parse_name(p);

    if !p.has_error() {
        if p.eat(SyntaxKind::COLON) {
            parse_type(p);
            if p.eat(SyntaxKind::ASSIGN) {
                expressions::parse_expr(p);
            }
        } else if node == SyntaxKind::VAR_DECL {
            // An untyped var requires an initializer.
            p.expect(SyntaxKind::ASSIGN);
            if !p.has_error() {
                expressions::parse_expr(p);
            }
        } else if p.eat(SyntaxKind::ASSIGN) {
            expressions::parse_expr(p);
        }
    }

    if let Some(name) = name {
        p.symbols.insert(&name, IdentKind::Other);
    }

    p.recover_past(SyntaxKind::SEMICOLON);
    p.close(m, node);
}

// ── Tests ────────────────────────────────────────────────────────────────

/// `%! func '(' [args] ')' '==' expected ;`
pub(crate) fn parse_test_decl(p: &mut Parser) {
    let m = p.open();
    p.advance(); // TEST_KW

    parse_name(p);
    if !p.has_error() {
        expressions::parse_arg_list(p);
        p.expect(SyntaxKind::EQ);
    }
    if !p.has_error() {
        expressions::parse_expr(p);
    }

    p.recover_past(SyntaxKind::SEMICOLON);
    p.close(m, SyntaxKind::TEST_DECL);
}

#[cfg(test)]
mod tests {
    use super::super::parse_program;
    use super::Parser;
    use ripple_lexer::Lexer;

    fn depth_after(source: &str) -> (usize, usize) {
        let tokens = Lexer::tokenize(source);
        let mut p = Parser::new(tokens, source);
        let before = p.symbols.depth();
        parse_program(&mut p);
        (before, p.symbols.depth())
    }

    #[test]
    fn scope_balance_on_valid_program() {
        let (before, after) =
            depth_after("func f(x : int) -> (y : int) y = x + 1; end func g() end");
        assert_eq!(before, after);
    }

    #[test]
    fn scope_balance_on_malformed_function() {
        // The body never closes properly; the symbol table must still come
        // back to its original depth.
        let (before, after) = depth_after("func f(x : int) y = ");
        assert_eq!(before, after);
    }

    #[test]
    fn scope_balance_on_malformed_header() {
        let (before, after) = depth_after("func f(x : ) end");
        assert_eq!(before, after);
    }

    #[test]
    fn function_name_visible_after_decl() {
        let source = "func f() end func g() f(); end";
        let tokens = Lexer::tokenize(source);
        let mut p = Parser::new(tokens, source);
        parse_program(&mut p);
        let (_green, errors) = p.build_tree();
        assert!(errors.is_empty(), "errors: {errors:?}");
    }
}
