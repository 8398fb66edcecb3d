//! Typed AST nodes for program elements: element type declarations, extern
//! declarations, functions, constants, and tests.

use crate::ast::stmt::StmtBlock;
use crate::ast::types::Type;
use crate::ast::{ast_node, child_node, child_nodes, child_token, AstNode};
use crate::cst::SyntaxNode;
use crate::syntax_kind::SyntaxKind;

// ── Program root ─────────────────────────────────────────────────────────

ast_node!(Program, PROGRAM);

impl Program {
    pub fn items(&self) -> impl Iterator<Item = Item> + '_ {
        self.syntax.children().filter_map(Item::cast)
    }
}

/// Any top-level program element.
#[derive(Debug, Clone)]
pub enum Item {
    Element(ElementTypeDecl),
    Extern(ExternDecl),
    Func(FuncDecl),
    Const(ConstDecl),
    Test(TestDecl),
}

impl Item {
    pub fn cast(node: SyntaxNode) -> Option<Self> {
        match node.kind() {
            SyntaxKind::ELEMENT_TYPE_DECL => {
                Some(Item::Element(ElementTypeDecl { syntax: node }))
            }
            SyntaxKind::EXTERN_DECL => Some(Item::Extern(ExternDecl { syntax: node })),
            SyntaxKind::FUNC_DECL => Some(Item::Func(FuncDecl { syntax: node })),
            SyntaxKind::CONST_DECL => Some(Item::Const(ConstDecl { syntax: node })),
            SyntaxKind::TEST_DECL => Some(Item::Test(TestDecl { syntax: node })),
            _ => None,
        }
    }
}

// ── Names ────────────────────────────────────────────────────────────────

ast_node!(Name, NAME);

impl Name {
    pub fn text(&self) -> Option<String> {
        child_token(&self.syntax, SyntaxKind::IDENT).map(|t| t.text().to_string())
    }
}

// ── Element type declarations ────────────────────────────────────────────

ast_node!(ElementTypeDecl, ELEMENT_TYPE_DECL);

impl ElementTypeDecl {
    pub fn name(&self) -> Option<String> {
        child_node::<Name>(&self.syntax)?.text()
    }

    pub fn fields(&self) -> impl Iterator<Item = FieldDecl> + '_ {
        child_nodes(&self.syntax)
    }
}

ast_node!(FieldDecl, FIELD_DECL);

impl FieldDecl {
    pub fn name(&self) -> Option<String> {
        child_node::<Name>(&self.syntax)?.text()
    }

    pub fn ty(&self) -> Option<Type> {
        self.syntax.children().find_map(Type::cast)
    }
}

// ── Extern declarations ──────────────────────────────────────────────────

ast_node!(ExternDecl, EXTERN_DECL);

impl ExternDecl {
    pub fn name(&self) -> Option<String> {
        child_node::<Name>(&self.syntax)?.text()
    }

    pub fn ty(&self) -> Option<Type> {
        self.syntax.children().find_map(Type::cast)
    }
}

// ── Function declarations ────────────────────────────────────────────────

ast_node!(FuncDecl, FUNC_DECL);

impl FuncDecl {
    pub fn name(&self) -> Option<String> {
        child_node::<Name>(&self.syntax)?.text()
    }

    /// Whether the declaration carries `export`.
    pub fn is_exported(&self) -> bool {
        child_token(&self.syntax, SyntaxKind::EXPORT_KW).is_some()
    }

    /// Whether this is `extern func … ;`. External functions have no body.
    pub fn is_external(&self) -> bool {
        child_token(&self.syntax, SyntaxKind::EXTERN_KW).is_some()
    }

    pub fn generic_params(&self) -> impl Iterator<Item = GenericParam> + '_ {
        self.syntax
            .children()
            .filter(|n| n.kind() == SyntaxKind::GENERIC_PARAM_LIST)
            .flat_map(|list| list.children())
            .filter_map(GenericParam::cast)
    }

    pub fn params(&self) -> Vec<Param> {
        self.syntax
            .children()
            .find(|n| n.kind() == SyntaxKind::PARAM_LIST)
            .map(|list| list.children().filter_map(Param::cast).collect())
            .unwrap_or_default()
    }

    pub fn results(&self) -> Vec<Param> {
        self.syntax
            .children()
            .find(|n| n.kind() == SyntaxKind::RESULT_LIST)
            .map(|list| list.children().filter_map(Param::cast).collect())
            .unwrap_or_default()
    }

    /// The function body; `None` iff the function is external.
    pub fn body(&self) -> Option<StmtBlock> {
        child_node(&self.syntax)
    }
}

ast_node!(GenericParam, GENERIC_PARAM);

impl GenericParam {
    pub fn name(&self) -> Option<String> {
        child_token(&self.syntax, SyntaxKind::IDENT).map(|t| t.text().to_string())
    }

    /// Whether this is a range generic (`0 : N`).
    pub fn is_range(&self) -> bool {
        child_token(&self.syntax, SyntaxKind::INT_LITERAL).is_some()
    }
}

ast_node!(Param, PARAM);

impl Param {
    pub fn name(&self) -> Option<String> {
        child_node::<Name>(&self.syntax)?.text()
    }

    pub fn is_inout(&self) -> bool {
        child_token(&self.syntax, SyntaxKind::INOUT_KW).is_some()
    }

    pub fn ty(&self) -> Option<Type> {
        self.syntax.children().find_map(Type::cast)
    }
}

// ── Const and var declarations ───────────────────────────────────────────

ast_node!(ConstDecl, CONST_DECL);

impl ConstDecl {
    pub fn name(&self) -> Option<String> {
        child_node::<Name>(&self.syntax)?.text()
    }

    pub fn ty(&self) -> Option<Type> {
        self.syntax.children().find_map(Type::cast)
    }

    pub fn init(&self) -> Option<crate::ast::expr::Expr> {
        self.syntax.children().find_map(crate::ast::expr::Expr::cast)
    }
}

ast_node!(VarDecl, VAR_DECL);

impl VarDecl {
    pub fn name(&self) -> Option<String> {
        child_node::<Name>(&self.syntax)?.text()
    }

    pub fn ty(&self) -> Option<Type> {
        self.syntax.children().find_map(Type::cast)
    }

    pub fn init(&self) -> Option<crate::ast::expr::Expr> {
        self.syntax.children().find_map(crate::ast::expr::Expr::cast)
    }
}

// ── Tests ────────────────────────────────────────────────────────────────

ast_node!(TestDecl, TEST_DECL);

impl TestDecl {
    pub fn func_name(&self) -> Option<String> {
        child_node::<Name>(&self.syntax)?.text()
    }

    pub fn args(&self) -> Vec<crate::ast::expr::Expr> {
        self.syntax
            .children()
            .find(|n| n.kind() == SyntaxKind::ARG_LIST)
            .map(|list| {
                list.children()
                    .filter_map(crate::ast::expr::Expr::cast)
                    .collect()
            })
            .unwrap_or_default()
    }

    /// The expected value on the right of `==`.
    pub fn expected(&self) -> Option<crate::ast::expr::Expr> {
        self.syntax.children().find_map(crate::ast::expr::Expr::cast)
    }
}
