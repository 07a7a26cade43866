//! Identifier interning.
//!
//! Names map to dense ids in first-seen order. The table outlives a single
//! assembly so that ids stay stable across runs of the same session.

use crate::virtual_machine::errors::VMError;
use crate::virtual_machine::vm::builtins::Builtin;
use std::collections::HashMap;

/// Number of leading characters of an oversized name kept for diagnostics.
const NAME_PREFIX_LEN: usize = 16;

/// Capacity-bounded name -> id table.
#[derive(Debug, Clone)]
pub struct SymbolTable {
    names: Vec<String>,
    ids: HashMap<String, usize>,
    capacity: usize,
    max_name_len: usize,
}

impl SymbolTable {
    /// Creates an empty table.
    pub fn new(capacity: usize, max_name_len: usize) -> Self {
        Self {
            names: Vec::new(),
            ids: HashMap::new(),
            capacity,
            max_name_len,
        }
    }

    /// Creates a table with the built-in routine names interned at their ids.
    ///
    /// Built-ins are always present, even if `capacity` is smaller than their count.
    pub fn with_builtins(capacity: usize, max_name_len: usize) -> Self {
        let mut table = Self::new(capacity.max(Builtin::ALL.len()), max_name_len);
        for builtin in Builtin::ALL {
            table.insert(builtin.name());
        }
        table
    }

    /// Returns the id for `name`, interning it if unseen.
    ///
    /// `offset` is the source position reported on failure.
    pub fn intern(&mut self, name: &str, offset: usize) -> Result<usize, VMError> {
        if let Some(&id) = self.ids.get(name) {
            return Ok(id);
        }
        if name.len() > self.max_name_len {
            return Err(VMError::NameTooLong {
                prefix: name.chars().take(NAME_PREFIX_LEN).collect(),
                limit: self.max_name_len,
                offset,
            });
        }
        if self.names.len() >= self.capacity {
            return Err(VMError::SymbolTableOverflow {
                capacity: self.capacity,
                offset,
            });
        }
        Ok(self.insert(name))
    }

    fn insert(&mut self, name: &str) -> usize {
        let id = self.names.len();
        self.names.push(name.to_string());
        self.ids.insert(name.to_string(), id);
        id
    }

    pub fn id(&self, name: &str) -> Option<usize> {
        self.ids.get(name).copied()
    }

    pub fn name(&self, id: usize) -> Option<&str> {
        self.names.get(id).map(String::as_str)
    }

    pub(crate) fn len(&self) -> usize {
        self.names.len()
    }

    /// Forgets every name with an id `>= len`.
    pub(crate) fn truncate(&mut self, len: usize) {
        for name in self.names.drain(len.min(self.names.len())..) {
            self.ids.remove(&name);
        }
    }

    /// Iterates `(id, name)` in id order.
    pub fn iter(&self) -> impl Iterator<Item = (usize, &str)> {
        self.names.iter().map(String::as_str).enumerate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtins_are_interned_first() {
        let table = SymbolTable::with_builtins(16, 255);
        assert_eq!(table.id("top"), Some(0));
        assert_eq!(table.id("say"), Some(1));
        assert_eq!(table.id("hlt"), Some(2));
        assert_eq!(table.len(), 3);
        let names: Vec<(usize, &str)> = table.iter().collect();
        assert_eq!(names, [(0, "top"), (1, "say"), (2, "hlt")]);
    }

    #[test]
    fn intern_is_first_seen_order_and_idempotent() {
        let mut table = SymbolTable::new(16, 255);
        assert_eq!(table.intern("b", 0).unwrap(), 0);
        assert_eq!(table.intern("a", 0).unwrap(), 1);
        assert_eq!(table.intern("b", 0).unwrap(), 0);
        assert_eq!(table.name(1), Some("a"));
        assert_eq!(table.len(), 2);
    }

    #[test]
    fn name_length_limit() {
        let mut table = SymbolTable::new(16, 4);
        assert!(table.intern("abcd", 0).is_ok());
        assert_eq!(
            table.intern("abcde", 7),
            Err(VMError::NameTooLong {
                prefix: "abcde".to_string(),
                limit: 4,
                offset: 7
            })
        );
    }

    #[test]
    fn long_name_prefix_is_truncated() {
        let mut table = SymbolTable::new(16, 255);
        let name = "x".repeat(256);
        match table.intern(&name, 0) {
            Err(VMError::NameTooLong { prefix, limit, .. }) => {
                assert_eq!(prefix.len(), NAME_PREFIX_LEN);
                assert_eq!(limit, 255);
            }
            other => panic!("expected NameTooLong, got {other:?}"),
        }
    }

    #[test]
    fn capacity_overflow() {
        let mut table = SymbolTable::new(2, 255);
        table.intern("a", 0).unwrap();
        table.intern("b", 0).unwrap();
        assert_eq!(table.intern("a", 0).unwrap(), 0);
        assert_eq!(
            table.intern("c", 9),
            Err(VMError::SymbolTableOverflow {
                capacity: 2,
                offset: 9
            })
        );
    }

    #[test]
    fn truncate_forgets_names() {
        let mut table = SymbolTable::with_builtins(16, 255);
        table.intern("foo", 0).unwrap();
        table.intern("bar", 0).unwrap();
        table.truncate(3);
        assert_eq!(table.id("foo"), None);
        assert_eq!(table.id("top"), Some(0));
        assert_eq!(table.intern("bar", 0).unwrap(), 3);
    }

    #[test]
    fn builtins_survive_tiny_capacity() {
        let mut table = SymbolTable::with_builtins(0, 255);
        assert_eq!(table.len(), 3);
        assert!(matches!(
            table.intern("x", 0),
            Err(VMError::SymbolTableOverflow { .. })
        ));
    }
}
