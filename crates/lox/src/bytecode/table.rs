//! Open-addressed, linear-probing hash table backing both string interning
//! and the VM's globals table.
//!
//! Mirrors clox's `table.c` exactly: tombstones preserve probe chains across
//! deletes, capacity is always a power of two, and growth happens before the
//! load factor would exceed 0.75.

use std::rc::Rc;

use super::object::{ObjString, fnv1a};

const MAX_LOAD: f64 = 0.75;

enum Slot<V> {
    Empty,
    Tombstone,
    Occupied(Rc<ObjString>, V),
}

pub struct Table<V> {
    entries: Vec<Slot<V>>,
    /// Occupied slots plus tombstones; tracked separately from a plain
    /// occupied count because tombstones also count against the load factor.
    count: usize,
}

impl<V> Default for Table<V> {
    fn default() -> Self {
        Self { entries: Vec::new(), count: 0 }
    }
}

impl<V> Table<V> {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.iter().filter(|s| matches!(s, Slot::Occupied(..))).count()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn capacity(&self) -> usize {
        self.entries.len()
    }

    /// Probes for `key`, returning the index of either the matching occupied
    /// slot, or the first tombstone/empty slot where it could be inserted.
    fn find_entry(entries: &[Slot<V>], key: &Rc<ObjString>) -> usize {
        let capacity = entries.len();
        let mut index = (key.hash as usize) & (capacity - 1);
        let mut tombstone: Option<usize> = None;
        loop {
            match &entries[index] {
                Slot::Empty => return tombstone.unwrap_or(index),
                Slot::Tombstone => tombstone = tombstone.or(Some(index)),
                Slot::Occupied(k, _) if Rc::ptr_eq(k, key) => return index,
                Slot::Occupied(..) => {}
            }
            index = (index + 1) & (capacity - 1);
        }
    }

    fn grow(&mut self) {
        let new_capacity = if self.capacity() < 8 { 8 } else { self.capacity() * 2 };
        let mut new_entries: Vec<Slot<V>> = (0..new_capacity).map(|_| Slot::Empty).collect();
        let mut new_count = 0;
        for slot in std::mem::take(&mut self.entries) {
            if let Slot::Occupied(key, value) = slot {
                let index = Self::find_entry(&new_entries, &key);
                new_entries[index] = Slot::Occupied(key, value);
                new_count += 1;
            }
        }
        self.entries = new_entries;
        self.count = new_count;
    }

    /// Inserts or overwrites `key`. Returns `true` if this was a new key.
    pub fn set(&mut self, key: Rc<ObjString>, value: V) -> bool {
        if self.capacity() == 0 || (self.count + 1) as f64 > self.capacity() as f64 * MAX_LOAD {
            self.grow();
        }
        let index = Self::find_entry(&self.entries, &key);
        let is_new = !matches!(self.entries[index], Slot::Occupied(..));
        let was_tombstone = matches!(self.entries[index], Slot::Tombstone);
        if is_new && !was_tombstone {
            self.count += 1;
        }
        self.entries[index] = Slot::Occupied(key, value);
        is_new
    }

    #[must_use]
    pub fn get(&self, key: &Rc<ObjString>) -> Option<&V> {
        if self.capacity() == 0 {
            return None;
        }
        match &self.entries[Self::find_entry(&self.entries, key)] {
            Slot::Occupied(_, value) => Some(value),
            _ => None,
        }
    }

    pub fn get_mut(&mut self, key: &Rc<ObjString>) -> Option<&mut V> {
        if self.capacity() == 0 {
            return None;
        }
        let index = Self::find_entry(&self.entries, key);
        match &mut self.entries[index] {
            Slot::Occupied(_, value) => Some(value),
            _ => None,
        }
    }

    /// Deletes `key`, leaving a tombstone so later probes over this slot
    /// still terminate correctly. Returns `true` if the key was present.
    pub fn delete(&mut self, key: &Rc<ObjString>) -> bool {
        if self.capacity() == 0 {
            return false;
        }
        let index = Self::find_entry(&self.entries, key);
        if matches!(self.entries[index], Slot::Occupied(..)) {
            self.entries[index] = Slot::Tombstone;
            true
        } else {
            false
        }
    }

    /// Content-based lookup used by the interner before a candidate string
    /// has been allocated as an `ObjString`: avoids allocating just to probe.
    #[must_use]
    pub fn find_string(&self, chars: &str, hash: u32) -> Option<Rc<ObjString>> {
        if self.capacity() == 0 {
            return None;
        }
        let capacity = self.capacity();
        let mut index = (hash as usize) & (capacity - 1);
        loop {
            match &self.entries[index] {
                Slot::Empty => return None,
                Slot::Occupied(key, _) if key.hash == hash && &*key.chars == chars => return Some(key.clone()),
                Slot::Tombstone | Slot::Occupied(..) => {}
            }
            index = (index + 1) & (capacity - 1);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(s: &str) -> Rc<ObjString> {
        Rc::new(ObjString { hash: fnv1a(s.as_bytes()), chars: s.into() })
    }

    #[test]
    fn insert_get_delete_reinsert() {
        let mut table: Table<i32> = Table::new();
        let a = key("a");
        assert!(table.set(a.clone(), 1));
        assert_eq!(table.get(&a), Some(&1));
        assert!(table.delete(&a));
        assert_eq!(table.get(&a), None);
        assert!(table.set(a.clone(), 2));
        assert_eq!(table.get(&a), Some(&2));
    }

    #[test]
    fn grows_past_load_factor_and_keeps_all_keys() {
        let mut table: Table<usize> = Table::new();
        let keys: Vec<_> = (0..200).map(|i| key(&format!("key{i}"))).collect();
        for (i, k) in keys.iter().enumerate() {
            table.set(k.clone(), i);
        }
        for (i, k) in keys.iter().enumerate() {
            assert_eq!(table.get(k), Some(&i));
        }
    }

    #[test]
    fn find_string_matches_by_content_not_identity() {
        let mut table: Table<()> = Table::new();
        let a = key("hello");
        let hash = a.hash;
        table.set(a, ());
        assert!(table.find_string("hello", hash).is_some());
        assert!(table.find_string("world", fnv1a(b"world")).is_none());
    }
}
