//! Recursive tree-walking evaluator for the tier-A pipeline.
//!
//! Non-local `return` is implemented as a `Signal` value threaded back out of
//! `exec_stmt`/`exec_block`, checked after every sub-statement runs — the
//! explicit "pending return" strategy rather than leaning on a host-language
//! exception, since Rust's `?`/early-return already gives us that control
//! flow without needing `panic`/`catch_unwind`.

use std::{cell::RefCell, rc::Rc, time::{SystemTime, UNIX_EPOCH}};

use ahash::AHashMap;

use crate::{
    ast::{Expr, LiteralValue, Stmt},
    diagnostics::RuntimeError,
    environment::Environment,
    io::PrintWriter,
    resolver::Resolved,
    token::TokenKind,
    value::{LoxClass, LoxFunction, LoxInstance, NativeFunction, Value},
};

enum Signal<'src> {
    None,
    Return(Value<'src>),
}

pub struct Interpreter<'a> {
    resolved: &'a Resolved,
    output: &'a mut dyn PrintWriter,
}

/// Builds a fresh global environment with the language's native bindings.
#[must_use]
pub fn globals<'src>() -> Environment<'src> {
    let env = Environment::new(None);
    env.define(
        "clock",
        Value::NativeFunction(Rc::new(NativeFunction { name: "clock", arity: 0, func: native_clock })),
    );
    env
}

fn native_clock<'src>(_args: &[Value<'src>]) -> Value<'src> {
    let secs = SystemTime::now().duration_since(UNIX_EPOCH).map(|d| d.as_secs_f64()).unwrap_or(0.0);
    Value::Number(secs)
}

/// Executes `statements` against `globals`, using the resolver's depth table.
pub fn interpret<'src>(
    statements: &[Stmt<'src>],
    resolved: &Resolved,
    globals: &Environment<'src>,
    output: &mut dyn PrintWriter,
) -> Result<(), RuntimeError> {
    let mut interpreter = Interpreter { resolved, output };
    for stmt in statements {
        interpreter.exec_stmt(stmt, globals)?;
    }
    Ok(())
}

impl<'a> Interpreter<'a> {
    fn exec_stmt<'src>(&mut self, stmt: &Stmt<'src>, env: &Environment<'src>) -> Result<Signal<'src>, RuntimeError> {
        match stmt {
            Stmt::Expression(expr) => {
                self.eval(expr, env)?;
                Ok(Signal::None)
            }
            Stmt::Print(expr) => {
                let value = self.eval(expr, env)?;
                self.output.print_line(&value.to_string());
                Ok(Signal::None)
            }
            Stmt::Var { name, initializer } => {
                let value = match initializer {
                    Some(expr) => self.eval(expr, env)?,
                    None => Value::Nil,
                };
                env.define(name.lexeme, value);
                Ok(Signal::None)
            }
            Stmt::Block(statements) => {
                let block_env = Environment::new(Some(env.clone()));
                self.exec_block(statements, &block_env)
            }
            Stmt::If { condition, then_branch, else_branch } => {
                if self.eval(condition, env)?.is_truthy() {
                    self.exec_stmt(then_branch, env)
                } else if let Some(else_branch) = else_branch {
                    self.exec_stmt(else_branch, env)
                } else {
                    Ok(Signal::None)
                }
            }
            Stmt::While { condition, body } => {
                while self.eval(condition, env)?.is_truthy() {
                    match self.exec_stmt(body, env)? {
                        Signal::None => {}
                        signal @ Signal::Return(_) => return Ok(signal),
                    }
                }
                Ok(Signal::None)
            }
            Stmt::Function(decl) => {
                let function =
                    Value::Function(Rc::new(LoxFunction { decl: decl.clone(), closure: env.clone(), is_initializer: false }));
                env.define(decl.name.lexeme, function);
                Ok(Signal::None)
            }
            Stmt::Return { value, .. } => {
                let value = match value {
                    Some(expr) => self.eval(expr, env)?,
                    None => Value::Nil,
                };
                Ok(Signal::Return(value))
            }
            Stmt::Class { name, superclass, methods } => self.exec_class(name, superclass, methods, env),
        }
    }

    fn exec_class<'src>(
        &mut self,
        name: &crate::token::Token<'src>,
        superclass: &Option<Expr<'src>>,
        method_decls: &[Rc<crate::ast::FunctionDecl<'src>>],
        env: &Environment<'src>,
    ) -> Result<Signal<'src>, RuntimeError> {
        env.define(name.lexeme, Value::Nil);

        let superclass_value = match superclass {
            Some(expr) => match self.eval(expr, env)? {
                Value::Class(class) => Some(class),
                _ => return Err(RuntimeError::new(name.line, "Superclass must be a class.")),
            },
            None => None,
        };

        let method_env = match &superclass_value {
            Some(class) => {
                let method_env = Environment::new(Some(env.clone()));
                method_env.define("super", Value::Class(class.clone()));
                method_env
            }
            None => env.clone(),
        };

        let mut methods = AHashMap::new();
        for decl in method_decls {
            let is_initializer = decl.name.lexeme == "init";
            let function = Rc::new(LoxFunction { decl: decl.clone(), closure: method_env.clone(), is_initializer });
            methods.insert(decl.name.lexeme.to_owned(), function);
        }

        let class = Rc::new(LoxClass { name: name.lexeme.to_owned(), superclass: superclass_value, methods });
        env.define(name.lexeme, Value::Class(class));
        Ok(Signal::None)
    }

    fn exec_block<'src>(&mut self, statements: &[Stmt<'src>], env: &Environment<'src>) -> Result<Signal<'src>, RuntimeError> {
        for stmt in statements {
            match self.exec_stmt(stmt, env)? {
                Signal::None => {}
                signal @ Signal::Return(_) => return Ok(signal),
            }
        }
        Ok(Signal::None)
    }

    #[expect(clippy::too_many_lines)]
    fn eval<'src>(&mut self, expr: &Expr<'src>, env: &Environment<'src>) -> Result<Value<'src>, RuntimeError> {
        match expr {
            Expr::Literal { value, .. } => Ok(match value {
                LiteralValue::Nil => Value::Nil,
                LiteralValue::Bool(b) => Value::Bool(*b),
                LiteralValue::Number(n) => Value::Number(*n),
                LiteralValue::String(s) => Value::String(Rc::from(s.as_str())),
            }),
            Expr::Grouping { expr, .. } => self.eval(expr, env),
            Expr::Variable { id, name } => self.lookup(*id, name, env),
            Expr::Assign { id, name, value } => {
                let value = self.eval(value, env)?;
                match self.resolved.depth(*id) {
                    Some(depth) => env.assign_at(depth, name.lexeme, value.clone()),
                    None => {
                        if !env.assign_global(name.lexeme, value.clone()) {
                            return Err(RuntimeError::new(name.line, format!("Undefined variable '{}'.", name.lexeme)));
                        }
                    }
                }
                Ok(value)
            }
            Expr::Unary { op, right, .. } => {
                let right = self.eval(right, env)?;
                match op.kind {
                    TokenKind::Minus => match right {
                        Value::Number(n) => Ok(Value::Number(-n)),
                        _ => Err(RuntimeError::new(op.line, "Operand must be a number.")),
                    },
                    TokenKind::Bang => Ok(Value::Bool(!right.is_truthy())),
                    _ => unreachable!("parser only emits Minus/Bang as unary operators"),
                }
            }
            Expr::Logical { left, op, right } => {
                let left = self.eval(left, env)?;
                let short_circuits = if op.kind == TokenKind::Or { left.is_truthy() } else { !left.is_truthy() };
                if short_circuits { Ok(left) } else { self.eval(right, env) }
            }
            Expr::Binary { left, op, right, .. } => {
                let left = self.eval(left, env)?;
                let right = self.eval(right, env)?;
                self.binary_op(op, left, right)
            }
            Expr::Call { callee, paren, args, .. } => {
                let callee = self.eval(callee, env)?;
                let mut values = Vec::with_capacity(args.len());
                for arg in args {
                    values.push(self.eval(arg, env)?);
                }
                self.call(callee, values, paren.line)
            }
            Expr::Get { object, name, .. } => {
                let object = self.eval(object, env)?;
                match object {
                    Value::Instance(instance) => get_property(&instance, name.lexeme)
                        .ok_or_else(|| RuntimeError::new(name.line, format!("Undefined property '{}'.", name.lexeme))),
                    _ => Err(RuntimeError::new(name.line, "Only instances have properties.")),
                }
            }
            Expr::Set { object, name, value, .. } => {
                let object = self.eval(object, env)?;
                let Value::Instance(instance) = object else {
                    return Err(RuntimeError::new(name.line, "Only instances have fields."));
                };
                let value = self.eval(value, env)?;
                instance.borrow_mut().fields.insert(name.lexeme.to_owned(), value.clone());
                Ok(value)
            }
            Expr::This { id, keyword } => self.lookup(*id, keyword, env),
            Expr::Super { id, keyword, method } => {
                let distance = self.resolved.depth(*id).expect("resolver always resolves a well-formed 'super'");
                let Value::Class(superclass) = env.get_at(distance, "super") else {
                    unreachable!("resolver only binds 'super' to a class value")
                };
                let Value::Instance(instance) = env.get_at(distance - 1, "this") else {
                    unreachable!("'this' is always bound one scope inside 'super'")
                };
                let Some(bound) = superclass.find_method(method.lexeme) else {
                    return Err(RuntimeError::new(keyword.line, format!("Undefined property '{}'.", method.lexeme)));
                };
                Ok(Value::Function(bound.bind(instance)))
            }
        }
    }

    fn lookup<'src>(&self, id: crate::ast::ExprId, name: &crate::token::Token<'src>, env: &Environment<'src>) -> Result<Value<'src>, RuntimeError> {
        match self.resolved.depth(id) {
            Some(depth) => Ok(env.get_at(depth, name.lexeme)),
            None => env
                .get_global(name.lexeme)
                .ok_or_else(|| RuntimeError::new(name.line, format!("Undefined variable '{}'.", name.lexeme))),
        }
    }

    fn binary_op<'src>(&self, op: &crate::token::Token<'src>, left: Value<'src>, right: Value<'src>) -> Result<Value<'src>, RuntimeError> {
        use Value::{Number, String as Str};
        match op.kind {
            TokenKind::Plus => match (left, right) {
                (Number(a), Number(b)) => Ok(Number(a + b)),
                (Str(a), Str(b)) => Ok(Str(Rc::from(format!("{a}{b}")))),
                _ => Err(RuntimeError::new(op.line, "Operands must be two numbers or two strings.")),
            },
            TokenKind::Minus => numeric(op, left, right, |a, b| Number(a - b)),
            TokenKind::Star => numeric(op, left, right, |a, b| Number(a * b)),
            TokenKind::Slash => numeric(op, left, right, |a, b| Number(a / b)),
            TokenKind::Greater => numeric(op, left, right, |a, b| Value::Bool(a > b)),
            TokenKind::GreaterEqual => numeric(op, left, right, |a, b| Value::Bool(a >= b)),
            TokenKind::Less => numeric(op, left, right, |a, b| Value::Bool(a < b)),
            TokenKind::LessEqual => numeric(op, left, right, |a, b| Value::Bool(a <= b)),
            TokenKind::EqualEqual => Ok(Value::Bool(left == right)),
            TokenKind::BangEqual => Ok(Value::Bool(left != right)),
            _ => unreachable!("parser only emits arithmetic/comparison/equality tokens as binary operators"),
        }
    }

    fn call<'src>(&mut self, callee: Value<'src>, args: Vec<Value<'src>>, line: u32) -> Result<Value<'src>, RuntimeError> {
        match callee {
            Value::NativeFunction(native) => {
                check_arity(line, native.arity, args.len())?;
                Ok((native.func)(&args))
            }
            Value::Function(function) => {
                check_arity(line, function.decl.params.len(), args.len())?;
                self.call_function(&function, args)
            }
            Value::Class(class) => {
                check_arity(line, class.arity(), args.len())?;
                let instance = Rc::new(RefCell::new(LoxInstance::new(class.clone())));
                if let Some(init) = class.find_method("init") {
                    let bound = init.bind(instance.clone());
                    self.call_function(&bound, args)?;
                }
                Ok(Value::Instance(instance))
            }
            _ => Err(RuntimeError::new(line, "Can only call functions and classes.")),
        }
    }

    fn call_function<'src>(&mut self, function: &Rc<LoxFunction<'src>>, args: Vec<Value<'src>>) -> Result<Value<'src>, RuntimeError> {
        let call_env = Environment::new(Some(function.closure.clone()));
        for (param, value) in function.decl.params.iter().zip(args) {
            call_env.define(param.lexeme, value);
        }
        let signal = self.exec_block(&function.decl.body, &call_env)?;
        if function.is_initializer {
            return Ok(function.closure.get_at(0, "this"));
        }
        Ok(match signal {
            Signal::Return(value) => value,
            Signal::None => Value::Nil,
        })
    }
}

fn get_property<'src>(instance: &Rc<RefCell<LoxInstance<'src>>>, name: &str) -> Option<Value<'src>> {
    let borrowed = instance.borrow();
    if let Some(value) = borrowed.fields.get(name) {
        return Some(value.clone());
    }
    let method = borrowed.class.find_method(name)?;
    drop(borrowed);
    Some(Value::Function(method.bind(instance.clone())))
}

fn check_arity(line: u32, expected: usize, got: usize) -> Result<(), RuntimeError> {
    if expected == got {
        Ok(())
    } else {
        Err(RuntimeError::new(line, format!("Expected {expected} arguments but got {got}.")))
    }
}

fn numeric<'src>(
    op: &crate::token::Token<'src>,
    left: Value<'src>,
    right: Value<'src>,
    f: impl FnOnce(f64, f64) -> Value<'src>,
) -> Result<Value<'src>, RuntimeError> {
    match (left, right) {
        (Value::Number(a), Value::Number(b)) => Ok(f(a, b)),
        _ => Err(RuntimeError::new(op.line, "Operands must be numbers.")),
    }
}
