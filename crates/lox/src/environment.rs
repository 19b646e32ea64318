//! Lexical scope frames for the tree-walker.
//!
//! A frame is shared (`Rc<RefCell<_>>`) because closures keep it alive past
//! the syntactic scope that created it; `get_at`/`assign_at` take the depth
//! the resolver already computed so lookups never have to search outward.

use std::{cell::RefCell, rc::Rc};

use ahash::AHashMap;

use crate::value::Value;

#[derive(Debug)]
struct Frame<'src> {
    values: AHashMap<String, Value<'src>>,
    enclosing: Option<Environment<'src>>,
}

/// A reference-counted, interior-mutable scope frame.
#[derive(Debug, Clone)]
pub struct Environment<'src>(Rc<RefCell<Frame<'src>>>);

impl<'src> Environment<'src> {
    #[must_use]
    pub fn new(enclosing: Option<Environment<'src>>) -> Self {
        Self(Rc::new(RefCell::new(Frame { values: AHashMap::new(), enclosing })))
    }

    pub fn define(&self, name: &str, value: Value<'src>) {
        self.0.borrow_mut().values.insert(name.to_owned(), value);
    }

    fn ancestor(&self, distance: usize) -> Environment<'src> {
        let mut env = self.clone();
        for _ in 0..distance {
            let next = env.0.borrow().enclosing.clone().expect("resolver-computed depth exceeds scope chain length");
            env = next;
        }
        env
    }

    #[must_use]
    pub fn get_at(&self, distance: usize, name: &str) -> Value<'src> {
        self.ancestor(distance)
            .0
            .borrow()
            .values
            .get(name)
            .cloned()
            .expect("resolver guarantees the name is defined at this depth")
    }

    pub fn assign_at(&self, distance: usize, name: &str, value: Value<'src>) {
        self.ancestor(distance).0.borrow_mut().values.insert(name.to_owned(), value);
    }

    /// Looks up a name starting at this frame and walking outward, for
    /// unresolved (global) references.
    pub fn get_global(&self, name: &str) -> Option<Value<'src>> {
        let frame = self.0.borrow();
        if let Some(value) = frame.values.get(name) {
            return Some(value.clone());
        }
        frame.enclosing.as_ref().and_then(|e| e.get_global(name))
    }

    /// Assigns to an already-defined name, searching outward; returns `false`
    /// if the name is undefined anywhere in the chain.
    pub fn assign_global(&self, name: &str, value: Value<'src>) -> bool {
        let mut frame = self.0.borrow_mut();
        if frame.values.contains_key(name) {
            frame.values.insert(name.to_owned(), value);
            return true;
        }
        match &frame.enclosing {
            Some(enclosing) => {
                let enclosing = enclosing.clone();
                drop(frame);
                enclosing.assign_global(name, value)
            }
            None => false,
        }
    }
}
