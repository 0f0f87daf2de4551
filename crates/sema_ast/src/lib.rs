//! Syntax tree and symbol storage consumed by the resolution core.
//!
//! The tree is produced by an external parser. The core only relies on four
//! capabilities of a node: its source span, whether it is a block scope
//! (ordered children plus a name index), its sub-expressions and its
//! sub-statements.

use std::sync::atomic::{AtomicU32, Ordering};
use serde::{Deserialize, Serialize};

pub mod declarations;
pub mod expressions;
pub mod metadata;
pub mod name;
pub mod package;
pub mod scope;
pub mod span;
pub mod statements;
pub mod types;

pub use declarations::{ASTDeclaration, DeclRef};
pub use expressions::ASTExpression;
pub use name::{Name, NameHash};
pub use package::{ModulePackage, ParseCacheView};
pub use scope::Scope;
pub use span::Span;
pub use statements::{ASTBlock, ASTStatement};
pub use types::ASTType;

#[derive(Default, Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct BytePosition(pub u32);

impl std::fmt::Display for BytePosition {
  fn fmt(
    &self,
    f: &mut std::fmt::Formatter<'_>,
  ) -> std::fmt::Result {
    write!(f, "{}", self.0)
  }
}

/// Identity of a syntax node, used as memoization key by the resolver.
#[repr(transparent)]
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug)]
pub struct NodeId(pub u32);

static NEXT_NODE_ID: AtomicU32 = AtomicU32::new(1);

impl NodeId {
  pub fn fresh() -> Self {
    NodeId(NEXT_NODE_ID.fetch_add(1, Ordering::Relaxed))
  }
}

impl std::fmt::Display for NodeId {
  fn fmt(
    &self,
    f: &mut std::fmt::Formatter<'_>,
  ) -> std::fmt::Result {
    write!(f, "#{}", self.0)
  }
}
