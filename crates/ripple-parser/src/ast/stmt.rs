//! Typed AST nodes for statements.

use crate::ast::expr::Expr;
use crate::ast::item::{ConstDecl, Name, VarDecl};
use crate::ast::{ast_node, child_node, child_token, AstNode};
use crate::cst::{SyntaxNode, SyntaxToken};
use crate::syntax_kind::SyntaxKind;

/// Any statement node.
#[derive(Debug, Clone)]
pub enum Stmt {
    VarDecl(VarDecl),
    ConstDecl(ConstDecl),
    If(IfStmt),
    While(WhileStmt),
    DoWhile(DoWhileStmt),
    For(ForStmt),
    Print(PrintStmt),
    Break(BreakStmt),
    Delete(DeleteStmt),
    Expr(ExprStmt),
    Assign(AssignStmt),
    Reduce(ReduceStmt),
    Labeled(LabeledStmt),
}

impl Stmt {
    pub fn cast(node: SyntaxNode) -> Option<Self> {
        match node.kind() {
            SyntaxKind::VAR_DECL => Some(Stmt::VarDecl(VarDecl { syntax: node })),
            SyntaxKind::CONST_DECL => Some(Stmt::ConstDecl(ConstDecl { syntax: node })),
            SyntaxKind::IF_STMT => Some(Stmt::If(IfStmt { syntax: node })),
            SyntaxKind::WHILE_STMT => Some(Stmt::While(WhileStmt { syntax: node })),
            SyntaxKind::DO_WHILE_STMT => Some(Stmt::DoWhile(DoWhileStmt { syntax: node })),
            SyntaxKind::FOR_STMT => Some(Stmt::For(ForStmt { syntax: node })),
            SyntaxKind::PRINT_STMT => Some(Stmt::Print(PrintStmt { syntax: node })),
            SyntaxKind::BREAK_STMT => Some(Stmt::Break(BreakStmt { syntax: node })),
            SyntaxKind::DELETE_STMT => Some(Stmt::Delete(DeleteStmt { syntax: node })),
            SyntaxKind::EXPR_STMT => Some(Stmt::Expr(ExprStmt { syntax: node })),
            SyntaxKind::ASSIGN_STMT => Some(Stmt::Assign(AssignStmt { syntax: node })),
            SyntaxKind::REDUCE_STMT => Some(Stmt::Reduce(ReduceStmt { syntax: node })),
            SyntaxKind::LABELED_STMT => Some(Stmt::Labeled(LabeledStmt { syntax: node })),
            _ => None,
        }
    }

    pub fn syntax(&self) -> &SyntaxNode {
        match self {
            Stmt::VarDecl(n) => AstNode::syntax(n),
            Stmt::ConstDecl(n) => AstNode::syntax(n),
            Stmt::If(n) => &n.syntax,
            Stmt::While(n) => &n.syntax,
            Stmt::DoWhile(n) => &n.syntax,
            Stmt::For(n) => &n.syntax,
            Stmt::Print(n) => &n.syntax,
            Stmt::Break(n) => &n.syntax,
            Stmt::Delete(n) => &n.syntax,
            Stmt::Expr(n) => &n.syntax,
            Stmt::Assign(n) => &n.syntax,
            Stmt::Reduce(n) => &n.syntax,
            Stmt::Labeled(n) => &n.syntax,
        }
    }

    /// The user label attached to this statement, if any.
    ///
    /// Labels are `LABELED_STMT` wrappers in the tree; any statement wrapped
    /// by one reports that label.
    pub fn stmt_label(&self) -> Option<String> {
        if let Stmt::Labeled(labeled) = self {
            return labeled.label();
        }
        let parent = self.syntax().parent()?;
        if parent.kind() == SyntaxKind::LABELED_STMT {
            LabeledStmt { syntax: parent }.label()
        } else {
            None
        }
    }
}

// ── Statement blocks and labels ──────────────────────────────────────────

ast_node!(StmtBlock, STMT_BLOCK);

impl StmtBlock {
    pub fn stmts(&self) -> impl Iterator<Item = Stmt> + '_ {
        self.syntax.children().filter_map(Stmt::cast)
    }
}

ast_node!(LabeledStmt, LABELED_STMT);

impl LabeledStmt {
    /// The label text between the `#` delimiters.
    pub fn label(&self) -> Option<String> {
        self.syntax
            .children()
            .find(|n| n.kind() == SyntaxKind::STMT_LABEL)
            .and_then(|n| child_token(&n, SyntaxKind::IDENT))
            .map(|t| t.text().to_string())
    }

    /// The wrapped statement.
    pub fn stmt(&self) -> Option<Stmt> {
        self.syntax.children().find_map(Stmt::cast)
    }
}

// ── Control flow ─────────────────────────────────────────────────────────

ast_node!(IfStmt, IF_STMT);

impl IfStmt {
    pub fn cond(&self) -> Option<Expr> {
        self.syntax.children().find_map(Expr::cast)
    }

    pub fn then_block(&self) -> Option<StmtBlock> {
        child_node(&self.syntax)
    }

    pub fn else_clause(&self) -> Option<ElseClause> {
        child_node(&self.syntax)
    }
}

ast_node!(ElseClause, ELSE_CLAUSE);

impl ElseClause {
    /// Plain `else` body.
    pub fn block(&self) -> Option<StmtBlock> {
        child_node(&self.syntax)
    }

    /// `elif` chain, represented as a nested if statement.
    pub fn elif(&self) -> Option<IfStmt> {
        child_node(&self.syntax)
    }
}

ast_node!(WhileStmt, WHILE_STMT);

impl WhileStmt {
    pub fn cond(&self) -> Option<Expr> {
        self.syntax.children().find_map(Expr::cast)
    }

    pub fn body(&self) -> Option<StmtBlock> {
        child_node(&self.syntax)
    }

    pub fn stmt_label(&self) -> Option<String> {
        Stmt::While(self.clone()).stmt_label()
    }
}

ast_node!(DoWhileStmt, DO_WHILE_STMT);

impl DoWhileStmt {
    pub fn body(&self) -> Option<StmtBlock> {
        child_node(&self.syntax)
    }

    /// The trailing condition after `end while`.
    pub fn cond(&self) -> Option<Expr> {
        self.syntax.children().find_map(Expr::cast)
    }
}

ast_node!(ForStmt, FOR_STMT);

impl ForStmt {
    pub fn loop_var(&self) -> Option<String> {
        child_node::<Name>(&self.syntax)?.text()
    }

    pub fn domain(&self) -> Option<RangeDomain> {
        child_node(&self.syntax)
    }

    pub fn body(&self) -> Option<StmtBlock> {
        child_node(&self.syntax)
    }
}

ast_node!(RangeDomain, RANGE_DOMAIN);

impl RangeDomain {
    pub fn lower(&self) -> Option<Expr> {
        self.syntax.children().find_map(Expr::cast)
    }

    pub fn upper(&self) -> Option<Expr> {
        self.syntax.children().filter_map(Expr::cast).nth(1)
    }
}

// ── Simple statements ────────────────────────────────────────────────────

ast_node!(PrintStmt, PRINT_STMT);

impl PrintStmt {
    pub fn args(&self) -> impl Iterator<Item = Expr> + '_ {
        self.syntax.children().filter_map(Expr::cast)
    }

    /// True for `println`, false for `print`.
    pub fn newline(&self) -> bool {
        child_token(&self.syntax, SyntaxKind::PRINTLN_KW).is_some()
    }
}

ast_node!(BreakStmt, BREAK_STMT);

ast_node!(DeleteStmt, DELETE_STMT);

impl DeleteStmt {
    pub fn target(&self) -> Option<Expr> {
        self.syntax.children().find_map(Expr::cast)
    }
}

ast_node!(ExprStmt, EXPR_STMT);

impl ExprStmt {
    pub fn expr(&self) -> Option<Expr> {
        self.syntax.children().find_map(Expr::cast)
    }
}

ast_node!(AssignStmt, ASSIGN_STMT);

impl AssignStmt {
    /// Assignment targets: every expression child but the last.
    pub fn targets(&self) -> Vec<Expr> {
        let mut exprs: Vec<Expr> = self.syntax.children().filter_map(Expr::cast).collect();
        exprs.pop();
        exprs
    }

    /// The assigned value: the last expression child.
    pub fn value(&self) -> Option<Expr> {
        self.syntax.children().filter_map(Expr::cast).last()
    }
}

ast_node!(ReduceStmt, REDUCE_STMT);

impl ReduceStmt {
    pub fn target(&self) -> Option<Expr> {
        self.syntax.children().find_map(Expr::cast)
    }

    pub fn value(&self) -> Option<Expr> {
        self.syntax.children().filter_map(Expr::cast).nth(1)
    }

    /// The reduction operator token (`+=`, `min=`, `max=`, `asyncMin=`,
    /// `asyncMax=`).
    pub fn op(&self) -> Option<SyntaxToken> {
        self.syntax
            .children_with_tokens()
            .filter_map(|it| it.into_token())
            .find(|t| {
                matches!(
                    t.kind(),
                    SyntaxKind::PLUS_REDUCE
                        | SyntaxKind::MIN_REDUCE
                        | SyntaxKind::MAX_REDUCE
                        | SyntaxKind::ASYNC_MIN_REDUCE
                        | SyntaxKind::ASYNC_MAX_REDUCE
                )
            })
    }
}
