//! Static scope resolution: computes, for every variable reference, the
//! number of enclosing scopes to walk at runtime (or marks it global).
//!
//! This mirrors the book's separate resolver pass rather than folding scope
//! analysis into the interpreter itself, so that closures capture the right
//! environment frame without the interpreter needing to search outward on
//! every lookup.

use ahash::AHashMap;

use crate::{
    ast::{Expr, ExprId, FunctionDecl, Stmt},
    diagnostics::CompileError,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FunctionKind {
    None,
    Function,
    Initializer,
    Method,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ClassKind {
    None,
    Class,
    Subclass,
}

/// The resolver's output: a map from expression identity to lexical depth.
/// An expression absent from the map resolves as a global at runtime.
#[derive(Debug, Default, Clone)]
pub struct Resolved(AHashMap<ExprId, usize>);

impl Resolved {
    #[must_use]
    pub fn depth(&self, id: ExprId) -> Option<usize> {
        self.0.get(&id).copied()
    }
}

struct Scope(AHashMap<String, bool>);

pub struct Resolver {
    scopes: Vec<Scope>,
    resolved: Resolved,
    errors: Vec<CompileError>,
    current_function: FunctionKind,
    current_class: ClassKind,
}

/// Resolves every variable reference in `statements`, returning the depth
/// table and any static-semantic errors found along the way.
#[must_use]
pub fn resolve(statements: &[Stmt<'_>]) -> (Resolved, Vec<CompileError>) {
    let mut resolver = Resolver {
        scopes: Vec::new(),
        resolved: Resolved::default(),
        errors: Vec::new(),
        current_function: FunctionKind::None,
        current_class: ClassKind::None,
    };
    resolver.resolve_statements(statements);
    (resolver.resolved, resolver.errors)
}

impl Resolver {
    fn resolve_statements(&mut self, statements: &[Stmt<'_>]) {
        for stmt in statements {
            self.resolve_stmt(stmt);
        }
    }

    fn resolve_stmt(&mut self, stmt: &Stmt<'_>) {
        match stmt {
            Stmt::Expression(expr) | Stmt::Print(expr) => self.resolve_expr(expr),
            Stmt::Var { name, initializer } => {
                self.declare(name.lexeme, name.line);
                if let Some(init) = initializer {
                    self.resolve_expr(init);
                }
                self.define(name.lexeme);
            }
            Stmt::Block(statements) => {
                self.begin_scope();
                self.resolve_statements(statements);
                self.end_scope();
            }
            Stmt::If { condition, then_branch, else_branch } => {
                self.resolve_expr(condition);
                self.resolve_stmt(then_branch);
                if let Some(else_branch) = else_branch {
                    self.resolve_stmt(else_branch);
                }
            }
            Stmt::While { condition, body } => {
                self.resolve_expr(condition);
                self.resolve_stmt(body);
            }
            Stmt::Function(decl) => {
                self.declare(decl.name.lexeme, decl.name.line);
                self.define(decl.name.lexeme);
                self.resolve_function(decl, FunctionKind::Function);
            }
            Stmt::Return { keyword, value } => {
                if self.current_function == FunctionKind::None {
                    self.errors.push(CompileError::new(keyword.line, "Can't return from top-level code."));
                }
                if let Some(value) = value {
                    if self.current_function == FunctionKind::Initializer {
                        self.errors
                            .push(CompileError::new(keyword.line, "Can't return a value from an initializer."));
                    }
                    self.resolve_expr(value);
                }
            }
            Stmt::Class { name, superclass, methods } => self.resolve_class(name, superclass, methods),
        }
    }

    fn resolve_class(
        &mut self,
        name: &crate::token::Token<'_>,
        superclass: &Option<Expr<'_>>,
        methods: &[std::rc::Rc<FunctionDecl<'_>>],
    ) {
        let enclosing_class = self.current_class;
        self.current_class = ClassKind::Class;

        self.declare(name.lexeme, name.line);
        self.define(name.lexeme);

        if let Some(superclass_expr @ Expr::Variable { name: super_name, .. }) = superclass {
            if super_name.lexeme == name.lexeme {
                self.errors.push(CompileError::new(super_name.line, "A class can't inherit from itself."));
            }
            self.current_class = ClassKind::Subclass;
            self.resolve_expr(superclass_expr);
            self.begin_scope();
            self.declare_in_current_scope("super");
        }

        self.begin_scope();
        self.declare_in_current_scope("this");

        let mut seen = std::collections::HashSet::new();
        for method in methods {
            if !seen.insert(method.name.lexeme) {
                self.errors
                    .push(CompileError::new(method.name.line, "Already a method with this name in this class."));
            }
            let kind = if method.name.lexeme == "init" { FunctionKind::Initializer } else { FunctionKind::Method };
            self.resolve_function(method, kind);
        }

        self.end_scope();
        if superclass.is_some() {
            self.end_scope();
        }
        self.current_class = enclosing_class;
    }

    fn resolve_function(&mut self, decl: &FunctionDecl<'_>, kind: FunctionKind) {
        let enclosing_function = self.current_function;
        self.current_function = kind;
        self.begin_scope();
        for param in &decl.params {
            self.declare(param.lexeme, param.line);
            self.define(param.lexeme);
        }
        self.resolve_statements(&decl.body);
        self.end_scope();
        self.current_function = enclosing_function;
    }

    fn resolve_expr(&mut self, expr: &Expr<'_>) {
        match expr {
            Expr::Literal { .. } => {}
            Expr::Variable { id, name } => {
                if let Some(scope) = self.scopes.last() {
                    if scope.0.get(name.lexeme) == Some(&false) {
                        self.errors.push(CompileError::new(
                            name.line,
                            "Can't read local variable in its own initializer.",
                        ));
                    }
                }
                self.resolve_local(*id, name.lexeme);
            }
            Expr::Assign { id, name, value } => {
                self.resolve_expr(value);
                self.resolve_local(*id, name.lexeme);
            }
            Expr::Unary { right, .. } => self.resolve_expr(right),
            Expr::Binary { left, right, .. } | Expr::Logical { left, right, .. } => {
                self.resolve_expr(left);
                self.resolve_expr(right);
            }
            Expr::Grouping { expr, .. } => self.resolve_expr(expr),
            Expr::Call { callee, args, .. } => {
                self.resolve_expr(callee);
                for arg in args {
                    self.resolve_expr(arg);
                }
            }
            Expr::Get { object, .. } => self.resolve_expr(object),
            Expr::Set { object, value, .. } => {
                self.resolve_expr(value);
                self.resolve_expr(object);
            }
            Expr::This { id, keyword } => {
                if self.current_class == ClassKind::None {
                    self.errors.push(CompileError::new(keyword.line, "Can't use 'this' outside of a class."));
                    return;
                }
                self.resolve_local(*id, "this");
            }
            Expr::Super { id, keyword, .. } => {
                match self.current_class {
                    ClassKind::None => {
                        self.errors.push(CompileError::new(keyword.line, "Can't use 'super' outside of a class."));
                        return;
                    }
                    ClassKind::Class => {
                        self.errors
                            .push(CompileError::new(keyword.line, "Can't use 'super' in a class with no superclass."));
                        return;
                    }
                    ClassKind::Subclass => {}
                }
                self.resolve_local(*id, "super");
            }
        }
    }

    fn resolve_local(&mut self, id: ExprId, name: &str) {
        for (depth, scope) in self.scopes.iter().rev().enumerate() {
            if scope.0.contains_key(name) {
                self.resolved.0.insert(id, depth);
                return;
            }
        }
        // Not found in any scope: treated as global at runtime.
    }

    fn declare(&mut self, name: &str, line: u32) {
        let Some(scope) = self.scopes.last_mut() else { return };
        if scope.0.contains_key(name) {
            self.errors.push(CompileError::new(line, "Already a variable with this name in this scope."));
        }
        scope.0.insert(name.to_owned(), false);
    }

    fn define(&mut self, name: &str) {
        if let Some(scope) = self.scopes.last_mut() {
            scope.0.insert(name.to_owned(), true);
        }
    }

    /// Marks `name` as defined in the innermost scope, for the implicit
    /// `this`/`super` bindings a class or method body introduces.
    fn declare_in_current_scope(&mut self, name: &str) {
        self.scopes
            .last_mut()
            .expect("begin_scope was just called")
            .0
            .insert(name.to_owned(), true);
    }

    fn begin_scope(&mut self) {
        self.scopes.push(Scope(AHashMap::new()));
    }

    fn end_scope(&mut self) {
        self.scopes.pop();
    }
}
