//! Heap object model for the bytecode tier.
//!
//! The book tracks every heap object through an intrusive singly-linked list
//! rooted in the VM so it can walk and free them at shutdown with no tracing
//! collector. Safe Rust has no cheap way to build that list without `unsafe`
//! pointer juggling, so `Heap` here plays the same role with an owned `Vec`:
//! every string ever allocated is pushed once and kept alive until the VM
//! itself drops, which is exactly the lifetime the intrusive list gave it.

use std::rc::Rc;

/// FNV-1a, matching the hashing scheme used for both string interning and
/// the globals table.
#[must_use]
pub fn fnv1a(bytes: &[u8]) -> u32 {
    let mut hash: u32 = 2_166_136_261;
    for &b in bytes {
        hash ^= u32::from(b);
        hash = hash.wrapping_mul(16_777_619);
    }
    hash
}

/// A heap-allocated Lox string: an owned buffer plus its precomputed hash.
#[derive(Debug)]
pub struct ObjString {
    pub chars: Box<str>,
    pub hash: u32,
}

impl ObjString {
    #[must_use]
    fn new(chars: Box<str>) -> Self {
        let hash = fnv1a(chars.as_bytes());
        Self { chars, hash }
    }
}

impl PartialEq for ObjString {
    fn eq(&self, other: &Self) -> bool {
        std::ptr::eq(self, other)
    }
}
impl Eq for ObjString {}

/// Owns every object ever allocated during a VM's run, standing in for the
/// book's `vm.objects` linked list.
#[derive(Debug, Default)]
pub struct Heap {
    objects: Vec<Rc<ObjString>>,
}

impl Heap {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocates a new, un-interned string object and keeps it alive for the
    /// lifetime of the heap.
    pub fn alloc_string(&mut self, chars: Box<str>) -> Rc<ObjString> {
        let obj = Rc::new(ObjString::new(chars));
        self.objects.push(obj.clone());
        obj
    }
}
