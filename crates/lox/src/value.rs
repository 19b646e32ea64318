//! Runtime values for the tree-walker.
//!
//! A sealed enum rather than a trait-object hierarchy, per the book's own
//! preference for sum types over a visitor/virtual-dispatch class tree:
//! every kind of callable (native function, user function, class-as-
//! constructor) gets its own variant instead of a shared `dyn Callable`.

use std::{cell::RefCell, fmt, rc::Rc};

use ahash::AHashMap;

use crate::{ast::FunctionDecl, environment::Environment};

#[derive(Debug, Clone)]
pub enum Value<'src> {
    Nil,
    Bool(bool),
    Number(f64),
    String(Rc<str>),
    NativeFunction(Rc<NativeFunction>),
    Function(Rc<LoxFunction<'src>>),
    Class(Rc<LoxClass<'src>>),
    Instance(Rc<RefCell<LoxInstance<'src>>>),
}

impl<'src> Value<'src> {
    /// `nil` and `false` are falsey; everything else, including `0` and `""`, is truthy.
    #[must_use]
    pub fn is_truthy(&self) -> bool {
        !matches!(self, Self::Nil | Self::Bool(false))
    }

    #[must_use]
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Nil => "nil",
            Self::Bool(_) => "boolean",
            Self::Number(_) => "number",
            Self::String(_) => "string",
            Self::NativeFunction(_) | Self::Function(_) | Self::Class(_) => "callable",
            Self::Instance(_) => "instance",
        }
    }
}

/// Value equality: same-variant comparison, `NaN != NaN`, no cross-variant equality.
impl PartialEq for Value<'_> {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Nil, Self::Nil) => true,
            (Self::Bool(a), Self::Bool(b)) => a == b,
            (Self::Number(a), Self::Number(b)) => a == b,
            (Self::String(a), Self::String(b)) => a == b,
            (Self::Instance(a), Self::Instance(b)) => Rc::ptr_eq(a, b),
            (Self::Function(a), Self::Function(b)) => Rc::ptr_eq(a, b),
            (Self::Class(a), Self::Class(b)) => Rc::ptr_eq(a, b),
            (Self::NativeFunction(a), Self::NativeFunction(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl fmt::Display for Value<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Nil => write!(f, "nil"),
            Self::Bool(b) => write!(f, "{b}"),
            Self::Number(n) => {
                let mut buf = ryu::Buffer::new();
                let formatted = buf.format(*n);
                // ryu always emits a decimal point; Lox prints whole numbers without one.
                if let Some(stripped) = formatted.strip_suffix(".0") {
                    write!(f, "{stripped}")
                } else {
                    write!(f, "{formatted}")
                }
            }
            Self::String(s) => write!(f, "{s}"),
            Self::NativeFunction(_) => write!(f, "<native fn>"),
            Self::Function(func) => write!(f, "<fn {}>", func.decl.name.lexeme),
            Self::Class(class) => write!(f, "{}", class.name),
            Self::Instance(instance) => write!(f, "{} instance", instance.borrow().class.name),
        }
    }
}

/// A builtin such as `clock()`.
pub struct NativeFunction {
    pub name: &'static str,
    pub arity: usize,
    pub func: fn(&[Value<'_>]) -> Value<'_>,
}

impl fmt::Debug for NativeFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NativeFunction").field("name", &self.name).finish()
    }
}

/// A user-defined function or method, closing over the environment in effect
/// at its declaration site.
#[derive(Debug)]
pub struct LoxFunction<'src> {
    pub decl: Rc<FunctionDecl<'src>>,
    pub closure: Environment<'src>,
    pub is_initializer: bool,
}

impl<'src> LoxFunction<'src> {
    /// Produces the bound method used for `instance.method`: a new function
    /// sharing this one's body but closing over a frame with `this` defined.
    #[must_use]
    pub fn bind(self: &Rc<Self>, instance: Rc<RefCell<LoxInstance<'src>>>) -> Rc<LoxFunction<'src>> {
        let env = Environment::new(Some(self.closure.clone()));
        env.define("this", Value::Instance(instance));
        Rc::new(LoxFunction { decl: self.decl.clone(), closure: env, is_initializer: self.is_initializer })
    }
}

/// A class value, usable as a constructor. Single inheritance: at most one
/// `superclass` link.
#[derive(Debug)]
pub struct LoxClass<'src> {
    pub name: String,
    pub superclass: Option<Rc<LoxClass<'src>>>,
    pub methods: AHashMap<String, Rc<LoxFunction<'src>>>,
}

impl<'src> LoxClass<'src> {
    /// Finds a method by linear search up the superclass chain.
    #[must_use]
    pub fn find_method(&self, name: &str) -> Option<Rc<LoxFunction<'src>>> {
        if let Some(method) = self.methods.get(name) {
            return Some(method.clone());
        }
        self.superclass.as_ref().and_then(|superclass| superclass.find_method(name))
    }

    #[must_use]
    pub fn arity(&self) -> usize {
        self.find_method("init").map_or(0, |init| init.decl.params.len())
    }
}

#[derive(Debug)]
pub struct LoxInstance<'src> {
    pub class: Rc<LoxClass<'src>>,
    pub fields: AHashMap<String, Value<'src>>,
}

impl<'src> LoxInstance<'src> {
    #[must_use]
    pub fn new(class: Rc<LoxClass<'src>>) -> Self {
        Self { class, fields: AHashMap::new() }
    }
}
