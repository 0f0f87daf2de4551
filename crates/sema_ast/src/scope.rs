//! Ordered, hash-indexed declaration storage of one block scope.
//!
//! The ordered child list defines shadowing precedence and overload order; the
//! index maps a name hash to the overload list sharing that name. Both live
//! behind one lock and are only ever mutated together, so a reader never sees
//! an index entry without its child (or the reverse). An index entry is
//! dropped as soon as its overload list becomes empty.
//!
//! A scope never locks another scope while holding its own lock.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard, Weak};

use crate::declarations::{ASTDeclaration, DeclRef};
use crate::{Name, NameHash};

#[derive(Default)]
struct ScopeTable {
  children: Vec<DeclRef>,
  index: HashMap<NameHash, Vec<DeclRef>>,
}

pub struct Scope {
  owner: RwLock<Weak<ASTDeclaration>>,
  table: RwLock<ScopeTable>,
}

impl Scope {
  pub fn new(owner: Weak<ASTDeclaration>) -> Self {
    Self {
      owner: RwLock::new(owner),
      table: RwLock::new(ScopeTable::default()),
    }
  }

  fn read(&self) -> RwLockReadGuard<'_, ScopeTable> {
    self.table.read().unwrap_or_else(PoisonError::into_inner)
  }

  fn write(&self) -> RwLockWriteGuard<'_, ScopeTable> {
    self.table.write().unwrap_or_else(PoisonError::into_inner)
  }

  pub fn owner(&self) -> Option<DeclRef> {
    self.owner.read().unwrap_or_else(PoisonError::into_inner).upgrade()
  }

  /// Moves the scope under a new owner and re-parents every child to it.
  pub fn set_owner(
    &self,
    owner: Weak<ASTDeclaration>,
  ) {
    *self.owner.write().unwrap_or_else(PoisonError::into_inner) = owner.clone();
    for child in self.children() {
      child.set_parent(owner.clone());
    }
  }

  fn owner_handle(&self) -> Weak<ASTDeclaration> {
    self.owner.read().unwrap_or_else(PoisonError::into_inner).clone()
  }

  /// Appends `decl` and sets its parent to this scope's owner.
  pub fn add(
    &self,
    decl: DeclRef,
  ) {
    decl.set_parent(self.owner_handle());

    let mut table = self.write();
    table.index.entry(decl.name.hash_value()).or_default().push(decl.clone());
    table.children.push(decl);
  }

  /// Inserts `decl` at `position` of the ordered list, keeping its overload list in list order.
  pub fn insert(
    &self,
    position: usize,
    decl: DeclRef,
  ) {
    decl.set_parent(self.owner_handle());

    let mut table = self.write();
    let position = position.min(table.children.len());
    let hash = decl.name.hash_value();
    table.children.insert(position, decl);

    let overloads: Vec<DeclRef> = table
      .children
      .iter()
      .filter(|c| c.name.hash_value() == hash)
      .cloned()
      .collect();
    table.index.insert(hash, overloads);
  }

  /// Removes `decl` (by identity). Returns false if it was not a child of this scope.
  pub fn remove(
    &self,
    decl: &DeclRef,
  ) -> bool {
    let mut table = self.write();
    let Some(position) = table.children.iter().position(|c| Arc::ptr_eq(c, decl)) else {
      return false;
    };
    table.children.remove(position);

    let hash = decl.name.hash_value();
    let now_empty = match table.index.get_mut(&hash) {
      Some(overloads) => {
        overloads.retain(|c| !Arc::ptr_eq(c, decl));
        overloads.is_empty()
      },
      None => false,
    };
    if now_empty {
      table.index.remove(&hash);
    }

    true
  }

  pub fn clear(&self) {
    let mut table = self.write();
    table.children.clear();
    table.index.clear();
  }

  /// Overload list for `name`, possibly empty.
  pub fn lookup(
    &self,
    name: &Name,
  ) -> Vec<DeclRef> {
    self
      .read()
      .index
      .get(&name.hash_value())
      .map(|overloads| overloads.iter().filter(|d| d.name == *name).cloned().collect())
      .unwrap_or_default()
  }

  pub fn lookup_hash(
    &self,
    hash: NameHash,
  ) -> Vec<DeclRef> {
    self.read().index.get(&hash).cloned().unwrap_or_default()
  }

  pub fn contains(
    &self,
    name: &Name,
  ) -> bool {
    self.read().index.contains_key(&name.hash_value())
  }

  pub fn has_multiple_overloads(
    &self,
    name: &Name,
  ) -> bool {
    self
      .read()
      .index
      .get(&name.hash_value())
      .map(|overloads| overloads.len() > 1)
      .unwrap_or(false)
  }

  /// Snapshot of the ordered children; safe to iterate while writers keep mutating.
  pub fn children(&self) -> Vec<DeclRef> {
    self.read().children.clone()
  }

  pub fn len(&self) -> usize {
    self.read().children.len()
  }

  pub fn is_empty(&self) -> bool {
    self.read().children.is_empty()
  }

  pub fn index_len(&self) -> usize {
    self.read().index.len()
  }
}

#[cfg(test)]
mod tests {
  use std::thread;

  use proptest::prelude::*;

  use super::*;
  use crate::types::ASTType;
  use crate::Span;

  fn var(name: &str) -> DeclRef {
    ASTDeclaration::variable(name, Some(ASTType::identifier("int")), None, Span::default())
  }

  fn setup() -> (DeclRef, Scope) {
    let module = ASTDeclaration::module("test.scope", vec![], Span::default());
    let scope = Scope::new(Arc::downgrade(&module));
    (module, scope)
  }

  #[test]
  fn test_add_sets_parent() {
    let (module, scope) = setup();
    let x = var("x");
    scope.add(x.clone());

    let parent = x.parent().unwrap();
    assert!(Arc::ptr_eq(&parent, &module));
  }

  #[test]
  fn test_overloads_keep_insertion_order() {
    let (_module, scope) = setup();
    let a = var("f");
    let b = var("g");
    let c = var("f");
    scope.add(a.clone());
    scope.add(b);
    scope.add(c.clone());

    let overloads = scope.lookup(&Name::new("f"));
    assert_eq!(overloads.len(), 2);
    assert!(Arc::ptr_eq(&overloads[0], &a));
    assert!(Arc::ptr_eq(&overloads[1], &c));
    assert!(scope.has_multiple_overloads(&Name::new("f")));
    assert!(!scope.has_multiple_overloads(&Name::new("g")));
  }

  #[test]
  fn test_remove_last_overload_drops_index_entry() {
    let (_module, scope) = setup();
    let x = var("x");
    scope.add(x.clone());
    assert_eq!(scope.index_len(), 1);

    assert!(scope.remove(&x));
    assert!(!scope.contains(&Name::new("x")));
    assert_eq!(scope.index_len(), 0);
    assert!(!scope.remove(&x));
  }

  #[test]
  fn test_insert_keeps_overloads_in_list_order() {
    let (_module, scope) = setup();
    let first = var("x");
    let second = var("x");
    scope.add(first.clone());
    scope.insert(0, second.clone());

    let overloads = scope.lookup(&Name::new("x"));
    assert!(Arc::ptr_eq(&overloads[0], &second));
    assert!(Arc::ptr_eq(&overloads[1], &first));
  }

  #[test]
  fn test_concurrent_readers_and_writer() {
    let (_module, scope) = setup();
    let scope = Arc::new(scope);
    let names = ["a", "b", "c", "d"];

    let writer = {
      let scope = scope.clone();
      thread::spawn(move || {
        for i in 0..200 {
          let d = var(names[i % names.len()]);
          scope.add(d.clone());
          if i % 3 == 0 {
            scope.remove(&d);
          }
        }
      })
    };

    let reader = {
      let scope = scope.clone();
      thread::spawn(move || {
        for _ in 0..200 {
          for child in scope.children() {
            let _ = scope.lookup(&child.name);
          }
        }
      })
    };

    writer.join().unwrap();
    reader.join().unwrap();

    for name in names {
      let name = Name::new(name);
      let from_index = scope.lookup(&name).len();
      let from_list = scope.children().iter().filter(|c| c.name == name).count();
      assert_eq!(from_index, from_list);
    }
  }

  #[derive(Debug, Clone)]
  enum Op {
    Add(usize),
    Insert(usize, usize),
    Remove(usize),
  }

  fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
      (0usize..4).prop_map(Op::Add),
      (0usize..4, 0usize..8).prop_map(|(n, p)| Op::Insert(n, p)),
      (0usize..16).prop_map(Op::Remove),
    ]
  }

  proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn lookup_matches_enumeration(ops in prop::collection::vec(op_strategy(), 0..40)) {
      let names = ["x", "y", "z", "w"];
      let (_module, scope) = setup();

      for op in ops {
        match op {
          Op::Add(n) => scope.add(var(names[n])),
          Op::Insert(n, p) => scope.insert(p, var(names[n])),
          Op::Remove(i) => {
            let children = scope.children();
            if !children.is_empty() {
              let victim = children[i % children.len()].clone();
              prop_assert!(scope.remove(&victim));
            }
          },
        }
      }

      let children = scope.children();
      for name in names {
        let name = Name::new(name);
        let expected: Vec<DeclRef> = children.iter().filter(|c| c.name == name).cloned().collect();
        let actual = scope.lookup(&name);
        prop_assert_eq!(expected.len(), actual.len());
        for (e, a) in expected.iter().zip(actual.iter()) {
          prop_assert!(Arc::ptr_eq(e, a));
        }
        prop_assert_eq!(scope.contains(&name), !expected.is_empty());
      }
    }
  }
}
