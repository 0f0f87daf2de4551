//! Raw name search across all parsed modules, ignoring scoping rules.

use std::collections::{HashSet, VecDeque};
use std::sync::Arc;

use sema_ast::statements::{ASTStatement, ASTStatementKind};
use sema_ast::{ASTBlock, DeclRef, ModulePackage, Name, NodeId, ParseCacheView};

#[derive(Debug, Clone)]
pub enum SymbolMatch {
  Declaration(DeclRef),
  Package(Arc<ModulePackage>),
}

/// Every declaration or package called `name`: first inside `module`, then
/// breadth first through the packages around it.
pub fn search_nodes_by_name(
  name: &Name,
  module: &DeclRef,
  cache: &ParseCacheView,
) -> Vec<SymbolMatch> {
  let mut found = Vec::new();
  let mut seen: HashSet<NodeId> = HashSet::new();

  collect_declarations(module, name, &mut seen, &mut found);

  let mut queue: VecDeque<Arc<ModulePackage>> = cache.roots_surrounding(module).into_iter().collect();
  while let Some(package) = queue.pop_front() {
    for sub in package.packages() {
      if sub.name == name.as_str() {
        found.push(SymbolMatch::Package(sub.clone()));
      }
      queue.push_back(sub);
    }
    for other in package.modules() {
      if seen.contains(&other.id) {
        continue;
      }
      collect_declarations(&other, name, &mut seen, &mut found);
    }
  }

  found
}

/// Module-level declarations called `name`: in `module` first, then in every
/// module below the root packages around it. Nothing nested inside a module
/// is considered.
pub fn search_module_members(
  name: &Name,
  module: &DeclRef,
  cache: &ParseCacheView,
) -> Vec<DeclRef> {
  let mut found = module.scope().lookup(name);
  let mut seen: HashSet<NodeId> = HashSet::from([module.id]);

  for root in cache.roots_surrounding(module) {
    for other in root.all_modules() {
      if seen.insert(other.id) {
        found.extend(other.scope().lookup(name));
      }
    }
  }
  found
}

fn collect_declarations(
  decl: &DeclRef,
  name: &Name,
  seen: &mut HashSet<NodeId>,
  found: &mut Vec<SymbolMatch>,
) {
  if !seen.insert(decl.id) {
    return;
  }
  if &decl.name == name && !decl.is_module() {
    found.push(SymbolMatch::Declaration(decl.clone()));
  }

  for child in decl.scope().children() {
    collect_declarations(&child, name, seen, found);
  }
  if let Some(function) = decl.as_function() {
    for param in &function.params {
      collect_declarations(param, name, seen, found);
    }
    if let Some(body) = &function.body {
      collect_block(body, name, seen, found);
    }
  }
}

fn collect_block(
  block: &ASTBlock,
  name: &Name,
  seen: &mut HashSet<NodeId>,
  found: &mut Vec<SymbolMatch>,
) {
  for local in block.scope().children() {
    collect_declarations(&local, name, seen, found);
  }
  for stmt in block.statements() {
    collect_statement(stmt, name, seen, found);
  }
}

fn collect_statement(
  stmt: &ASTStatement,
  name: &Name,
  seen: &mut HashSet<NodeId>,
  found: &mut Vec<SymbolMatch>,
) {
  match &stmt.kind {
    ASTStatementKind::Block(block) => collect_block(block, name, seen, found),
    _ => {
      for sub in stmt.sub_statements() {
        collect_statement(sub, name, seen, found);
      }
    },
  }
}
