//! Package/module tree above module granularity.
//!
//! Every package node keeps its sub-packages and modules in maps behind their
//! own locks. Enumerations hand out snapshots so readers can iterate while a
//! writer appends or removes entries.

use std::collections::{BTreeMap, VecDeque};
use std::fmt;
use std::sync::{Arc, PoisonError, RwLock, Weak};

use crate::declarations::DeclRef;

pub const ROOT_PACKAGE_NAME: &str = "<root>";

pub struct ModulePackage {
  pub name: String,
  parent: Weak<ModulePackage>,
  packages: RwLock<BTreeMap<String, Arc<ModulePackage>>>,
  modules: RwLock<BTreeMap<String, DeclRef>>,
}

impl ModulePackage {
  pub fn new_root() -> Arc<Self> {
    Arc::new(Self {
      name: ROOT_PACKAGE_NAME.to_string(),
      parent: Weak::new(),
      packages: RwLock::new(BTreeMap::new()),
      modules: RwLock::new(BTreeMap::new()),
    })
  }

  pub fn is_root(&self) -> bool {
    self.parent.upgrade().is_none()
  }

  pub fn parent(&self) -> Option<Arc<ModulePackage>> {
    self.parent.upgrade()
  }

  /// Dotted path from the root, empty for the root itself.
  pub fn path(&self) -> String {
    let mut parts = Vec::new();
    if !self.is_root() {
      parts.push(self.name.clone());
    }

    let mut current = self.parent();
    while let Some(package) = current {
      if package.is_root() {
        break;
      }
      parts.push(package.name.clone());
      current = package.parent();
    }

    parts.reverse();
    parts.join(".")
  }

  pub fn root(self: &Arc<Self>) -> Arc<ModulePackage> {
    let mut current = self.clone();
    while let Some(parent) = current.parent() {
      current = parent;
    }
    current
  }

  pub fn get_or_create_sub_package(
    self: &Arc<Self>,
    name: &str,
  ) -> Arc<ModulePackage> {
    let mut packages = self.packages.write().unwrap_or_else(PoisonError::into_inner);
    packages
      .entry(name.to_string())
      .or_insert_with(|| {
        Arc::new(ModulePackage {
          name: name.to_string(),
          parent: Arc::downgrade(self),
          packages: RwLock::new(BTreeMap::new()),
          modules: RwLock::new(BTreeMap::new()),
        })
      })
      .clone()
  }

  /// Walks (creating as needed) a dotted package path.
  pub fn get_or_create_package_path(
    self: &Arc<Self>,
    path: &str,
  ) -> Arc<ModulePackage> {
    let mut current = self.clone();
    for part in path.split('.').filter(|p| !p.is_empty()) {
      current = current.get_or_create_sub_package(part);
    }
    current
  }

  /// Files `module` under the packages named by its dotted path, replacing any
  /// module already registered there. Returns the package that now holds it.
  pub fn add_module(
    self: &Arc<Self>,
    module: DeclRef,
  ) -> Option<Arc<ModulePackage>> {
    let path = module.as_module()?.path.clone();
    let (package_path, name) = match path.rsplit_once('.') {
      Some((package_path, name)) => (package_path.to_string(), name.to_string()),
      None => (String::new(), path),
    };

    let package = self.get_or_create_package_path(&package_path);
    package
      .modules
      .write()
      .unwrap_or_else(PoisonError::into_inner)
      .insert(name, module);
    Some(package)
  }

  /// Removes the module at a dotted path relative to this package.
  pub fn remove_module(
    self: &Arc<Self>,
    path: &str,
  ) -> Option<DeclRef> {
    let (package, name) = self.split_module_path(path)?;
    let removed = package
      .modules
      .write()
      .unwrap_or_else(PoisonError::into_inner)
      .remove(&name);
    removed
  }

  pub fn remove_package(
    &self,
    name: &str,
  ) -> Option<Arc<ModulePackage>> {
    self.packages.write().unwrap_or_else(PoisonError::into_inner).remove(name)
  }

  pub fn get_sub_package(
    self: &Arc<Self>,
    path: &str,
  ) -> Option<Arc<ModulePackage>> {
    let mut current = self.clone();
    for part in path.split('.').filter(|p| !p.is_empty()) {
      let next = current.packages.read().unwrap_or_else(PoisonError::into_inner).get(part).cloned()?;
      current = next;
    }
    Some(current)
  }

  /// Module at a dotted path relative to this package.
  pub fn get_module(
    self: &Arc<Self>,
    path: &str,
  ) -> Option<DeclRef> {
    let (package, name) = self.split_module_path(path)?;
    let module = package
      .modules
      .read()
      .unwrap_or_else(PoisonError::into_inner)
      .get(&name)
      .cloned();
    module
  }

  fn split_module_path(
    self: &Arc<Self>,
    path: &str,
  ) -> Option<(Arc<ModulePackage>, String)> {
    match path.rsplit_once('.') {
      Some((package_path, name)) => Some((self.get_sub_package(package_path)?, name.to_string())),
      None => Some((self.clone(), path.to_string())),
    }
  }

  pub fn packages(&self) -> Vec<Arc<ModulePackage>> {
    self
      .packages
      .read()
      .unwrap_or_else(PoisonError::into_inner)
      .values()
      .cloned()
      .collect()
  }

  pub fn modules(&self) -> Vec<DeclRef> {
    self
      .modules
      .read()
      .unwrap_or_else(PoisonError::into_inner)
      .values()
      .cloned()
      .collect()
  }

  /// Every module in this package and below, breadth first.
  pub fn all_modules(self: &Arc<Self>) -> Vec<DeclRef> {
    let mut out = Vec::new();
    let mut queue = VecDeque::from([self.clone()]);
    while let Some(package) = queue.pop_front() {
      out.extend(package.modules());
      queue.extend(package.packages());
    }
    out
  }

  /// Whether `module` (by identity) is filed somewhere below this package.
  pub fn contains_module(
    self: &Arc<Self>,
    module: &DeclRef,
  ) -> bool {
    let Some(path) = module.as_module().map(|m| m.path.clone()) else {
      return false;
    };
    self
      .get_module(&path)
      .map(|found| Arc::ptr_eq(&found, module))
      .unwrap_or(false)
  }
}

impl fmt::Debug for ModulePackage {
  fn fmt(
    &self,
    f: &mut fmt::Formatter<'_>,
  ) -> fmt::Result {
    write!(f, "package {}", if self.is_root() { ROOT_PACKAGE_NAME.to_string() } else { self.path() })
  }
}

impl PartialEq for ModulePackage {
  fn eq(
    &self,
    other: &Self,
  ) -> bool {
    std::ptr::eq(self, other)
  }
}

impl Eq for ModulePackage {}

/// Root packages visible to one resolution request, in priority order.
#[derive(Debug, Clone, Default)]
pub struct ParseCacheView {
  roots: Vec<Arc<ModulePackage>>,
}

impl ParseCacheView {
  pub fn new(roots: Vec<Arc<ModulePackage>>) -> Self {
    Self { roots }
  }

  pub fn root_packages(&self) -> &[Arc<ModulePackage>] {
    &self.roots
  }

  /// First module registered under `path` across all roots.
  pub fn module(
    &self,
    path: &str,
  ) -> Option<DeclRef> {
    self.roots.iter().find_map(|root| root.get_module(path))
  }

  pub fn package(
    &self,
    path: &str,
  ) -> Option<Arc<ModulePackage>> {
    self.roots.iter().find_map(|root| root.get_sub_package(path))
  }

  /// Roots that hold `module`; every root when none does.
  pub fn roots_surrounding(
    &self,
    module: &DeclRef,
  ) -> Vec<Arc<ModulePackage>> {
    let surrounding: Vec<Arc<ModulePackage>> = self
      .roots
      .iter()
      .filter(|root| root.contains_module(module))
      .cloned()
      .collect();

    if surrounding.is_empty() {
      self.roots.clone()
    } else {
      surrounding
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::declarations::ASTDeclaration;
  use crate::Span;

  fn module(path: &str) -> DeclRef {
    ASTDeclaration::module(path, vec![], Span::default())
  }

  #[test]
  fn test_add_module_creates_packages() {
    let root = ModulePackage::new_root();
    let m = module("std.algorithm.sorting");
    let package = root.add_module(m.clone()).unwrap();

    assert_eq!(package.path(), "std.algorithm");
    assert!(Arc::ptr_eq(&root.get_module("std.algorithm.sorting").unwrap(), &m));
    assert_eq!(root.get_sub_package("std").unwrap().packages().len(), 1);
    assert!(root.contains_module(&m));
  }

  #[test]
  fn test_remove_module_and_package() {
    let root = ModulePackage::new_root();
    root.add_module(module("a.b"));
    root.add_module(module("a.c"));

    assert!(root.remove_module("a.b").is_some());
    assert!(root.get_module("a.b").is_none());
    assert_eq!(root.get_sub_package("a").unwrap().modules().len(), 1);

    assert!(root.remove_package("a").is_some());
    assert!(root.all_modules().is_empty());
  }

  #[test]
  fn test_all_modules_is_breadth_first() {
    let root = ModulePackage::new_root();
    root.add_module(module("x.y.deep"));
    root.add_module(module("top"));
    root.add_module(module("x.mid"));

    let names: Vec<String> = root.all_modules().iter().map(|m| m.name.to_string()).collect();
    assert_eq!(names, vec!["top", "mid", "deep"]);
  }

  #[test]
  fn test_roots_surrounding() {
    let first = ModulePackage::new_root();
    let second = ModulePackage::new_root();
    let m = module("app.main");
    second.add_module(m.clone());

    let view = ParseCacheView::new(vec![first.clone(), second.clone()]);
    let roots = view.roots_surrounding(&m);
    assert_eq!(roots.len(), 1);
    assert!(Arc::ptr_eq(&roots[0], &second));

    let stray = module("nowhere");
    assert_eq!(view.roots_surrounding(&stray).len(), 2);
  }
}
