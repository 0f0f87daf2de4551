use std::fmt;
use std::sync::{Arc, Weak};

use crate::declarations::{ASTDeclaration, DeclRef};
use crate::expressions::ASTExpression;
use crate::{BytePosition, Name, Scope, Span};

/// `{ ... }`: an ordered statement list plus the scope of the declarations it introduces.
pub struct ASTBlock {
  pub span: Span,
  pub statements: Vec<ASTStatement>,
  scope: Scope,
}

pub struct ASTStatement {
  pub span: Span,
  pub kind: ASTStatementKind,
}

pub enum ASTStatementKind {
  Block(Arc<ASTBlock>),
  Declaration(DeclRef),
  Expression(ASTExpression),
  Return(Option<ASTExpression>),
  If {
    condition: ASTExpression,
    then: Box<ASTStatement>,
    otherwise: Option<Box<ASTStatement>>,
  },
  While {
    condition: ASTExpression,
    body: Box<ASTStatement>,
  },
  DoWhile {
    body: Box<ASTStatement>,
    condition: ASTExpression,
  },
  For {
    init: Option<Box<ASTStatement>>,
    condition: Option<ASTExpression>,
    increment: Option<ASTExpression>,
    body: Box<ASTStatement>,
  },
  Foreach {
    variables: Vec<DeclRef>,
    aggregate: ASTExpression,
    body: Box<ASTStatement>,
  },
  Switch {
    subject: ASTExpression,
    body: Box<ASTStatement>,
  },
  Try {
    body: Box<ASTStatement>,
    catches: Vec<ASTStatement>,
    finally: Option<Box<ASTStatement>>,
  },
  Throw(ASTExpression),
  ScopeGuard(Box<ASTStatement>),
  Asm,
  Break,
  Continue,
  Goto(Name),
  StaticAssert {
    condition: ASTExpression,
    message: Option<ASTExpression>,
  },
}

impl ASTBlock {
  /// Builds a block; declaration statements are registered in its scope in order.
  pub fn new(
    span: Span,
    statements: Vec<ASTStatement>,
  ) -> Arc<Self> {
    let scope = Scope::new(Weak::new());
    for stmt in &statements {
      if let ASTStatementKind::Declaration(decl) = &stmt.kind {
        scope.add(decl.clone());
      }
    }

    Arc::new(Self {
      span,
      statements,
      scope,
    })
  }

  pub fn scope(&self) -> &Scope {
    &self.scope
  }

  /// Hands this block and every nested block to `owner`, re-parenting their locals.
  pub fn adopt(
    &self,
    owner: &Weak<ASTDeclaration>,
  ) {
    self.scope.set_owner(owner.clone());
    for stmt in &self.statements {
      stmt.adopt(owner);
    }
  }

  /// Blocks enclosing `pos`, innermost first. Empty if `pos` lies outside this block.
  pub fn chain_at(
    self: &Arc<Self>,
    pos: BytePosition,
  ) -> Vec<Arc<ASTBlock>> {
    let mut chain = Vec::new();
    if self.span.contains(pos) {
      collect_blocks(self, pos, &mut chain);
    }
    chain.reverse();
    chain
  }

  pub fn statements(&self) -> &[ASTStatement] {
    &self.statements
  }
}

fn collect_blocks(
  block: &Arc<ASTBlock>,
  pos: BytePosition,
  out: &mut Vec<Arc<ASTBlock>>,
) {
  out.push(block.clone());
  for stmt in &block.statements {
    if stmt.span.contains(pos) || stmt.nested_block_contains(pos) {
      stmt.collect_blocks(pos, out);
      return;
    }
  }
}

impl ASTStatement {
  pub fn new(
    span: Span,
    kind: ASTStatementKind,
  ) -> Self {
    Self { span, kind }
  }

  pub fn block(block: Arc<ASTBlock>) -> Self {
    Self {
      span: block.span,
      kind: ASTStatementKind::Block(block),
    }
  }

  pub fn declaration(decl: DeclRef) -> Self {
    Self {
      span: decl.span,
      kind: ASTStatementKind::Declaration(decl),
    }
  }

  pub fn expression(expr: ASTExpression) -> Self {
    Self {
      span: expr.span,
      kind: ASTStatementKind::Expression(expr),
    }
  }

  pub fn ret(
    span: Span,
    value: Option<ASTExpression>,
  ) -> Self {
    Self {
      span,
      kind: ASTStatementKind::Return(value),
    }
  }

  /// `foreach (vars; aggregate) body`; the loop variables are visible at the top of a block body.
  pub fn foreach(
    span: Span,
    variables: Vec<DeclRef>,
    aggregate: ASTExpression,
    body: ASTStatement,
  ) -> Self {
    if let ASTStatementKind::Block(block) = &body.kind {
      for (i, var) in variables.iter().enumerate() {
        block.scope().insert(i, var.clone());
      }
    }

    Self {
      span,
      kind: ASTStatementKind::Foreach {
        variables,
        aggregate,
        body: Box::new(body),
      },
    }
  }

  /// Direct sub-statements in source order.
  pub fn sub_statements(&self) -> Vec<&ASTStatement> {
    match &self.kind {
      ASTStatementKind::Block(block) => block.statements.iter().collect(),
      ASTStatementKind::If { then, otherwise, .. } => {
        let mut out: Vec<&ASTStatement> = vec![&**then];
        out.extend(otherwise.as_deref());
        out
      },
      ASTStatementKind::While { body, .. }
      | ASTStatementKind::DoWhile { body, .. }
      | ASTStatementKind::Foreach { body, .. }
      | ASTStatementKind::Switch { body, .. }
      | ASTStatementKind::ScopeGuard(body) => vec![&**body],
      ASTStatementKind::For { init, body, .. } => {
        let mut out: Vec<&ASTStatement> = init.as_deref().into_iter().collect();
        out.push(&**body);
        out
      },
      ASTStatementKind::Try { body, catches, finally } => {
        let mut out: Vec<&ASTStatement> = vec![&**body];
        out.extend(catches.iter());
        out.extend(finally.as_deref());
        out
      },
      ASTStatementKind::Declaration(_)
      | ASTStatementKind::Expression(_)
      | ASTStatementKind::Return(_)
      | ASTStatementKind::Throw(_)
      | ASTStatementKind::Asm
      | ASTStatementKind::Break
      | ASTStatementKind::Continue
      | ASTStatementKind::Goto(_)
      | ASTStatementKind::StaticAssert { .. } => Vec::new(),
    }
  }

  /// Expressions owned directly by this statement.
  pub fn expressions(&self) -> Vec<&ASTExpression> {
    match &self.kind {
      ASTStatementKind::Expression(expr) | ASTStatementKind::Throw(expr) => vec![expr],
      ASTStatementKind::Return(value) => value.iter().collect(),
      ASTStatementKind::If { condition, .. }
      | ASTStatementKind::While { condition, .. }
      | ASTStatementKind::DoWhile { condition, .. } => vec![condition],
      ASTStatementKind::For {
        condition, increment, ..
      } => condition.iter().chain(increment.iter()).collect(),
      ASTStatementKind::Foreach { aggregate, .. } => vec![aggregate],
      ASTStatementKind::Switch { subject, .. } => vec![subject],
      ASTStatementKind::StaticAssert { condition, message } => {
        std::iter::once(condition).chain(message.iter()).collect()
      },
      _ => Vec::new(),
    }
  }

  fn nested_block_contains(
    &self,
    pos: BytePosition,
  ) -> bool {
    match &self.kind {
      ASTStatementKind::Block(block) => block.span.contains(pos),
      _ => false,
    }
  }

  fn collect_blocks(
    &self,
    pos: BytePosition,
    out: &mut Vec<Arc<ASTBlock>>,
  ) {
    if let ASTStatementKind::Block(block) = &self.kind {
      collect_blocks(block, pos, out);
      return;
    }

    for sub in self.sub_statements() {
      if sub.span.contains(pos) || sub.nested_block_contains(pos) {
        sub.collect_blocks(pos, out);
        return;
      }
    }
  }

  fn adopt(
    &self,
    owner: &Weak<ASTDeclaration>,
  ) {
    match &self.kind {
      ASTStatementKind::Block(block) => block.adopt(owner),
      ASTStatementKind::Declaration(decl) => decl.set_parent(owner.clone()),
      ASTStatementKind::Foreach { variables, body, .. } => {
        for var in variables {
          var.set_parent(owner.clone());
        }
        body.adopt(owner);
      },
      _ => {
        for sub in self.sub_statements() {
          sub.adopt(owner);
        }
      },
    }
  }
}

impl fmt::Debug for ASTBlock {
  fn fmt(
    &self,
    f: &mut fmt::Formatter<'_>,
  ) -> fmt::Result {
    f.debug_struct("ASTBlock")
      .field("span", &self.span)
      .field("statements", &self.statements.len())
      .field("declarations", &self.scope.len())
      .finish()
  }
}

impl fmt::Debug for ASTStatement {
  fn fmt(
    &self,
    f: &mut fmt::Formatter<'_>,
  ) -> fmt::Result {
    let kind = match &self.kind {
      ASTStatementKind::Block(_) => "Block",
      ASTStatementKind::Declaration(_) => "Declaration",
      ASTStatementKind::Expression(_) => "Expression",
      ASTStatementKind::Return(_) => "Return",
      ASTStatementKind::If { .. } => "If",
      ASTStatementKind::While { .. } => "While",
      ASTStatementKind::DoWhile { .. } => "DoWhile",
      ASTStatementKind::For { .. } => "For",
      ASTStatementKind::Foreach { .. } => "Foreach",
      ASTStatementKind::Switch { .. } => "Switch",
      ASTStatementKind::Try { .. } => "Try",
      ASTStatementKind::Throw(_) => "Throw",
      ASTStatementKind::ScopeGuard(_) => "ScopeGuard",
      ASTStatementKind::Asm => "Asm",
      ASTStatementKind::Break => "Break",
      ASTStatementKind::Continue => "Continue",
      ASTStatementKind::Goto(_) => "Goto",
      ASTStatementKind::StaticAssert { .. } => "StaticAssert",
    };
    write!(f, "{}@{}", kind, self.span)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::types::ASTType;

  #[test]
  fn test_block_registers_declarations() {
    let x = ASTDeclaration::variable("x", Some(ASTType::identifier("int")), None, Span::new(2, 8));
    let block = ASTBlock::new(Span::new(0, 20), vec![ASTStatement::declaration(x.clone())]);

    let found = block.scope().lookup(&Name::new("x"));
    assert_eq!(found.len(), 1);
    assert!(Arc::ptr_eq(&found[0], &x));
  }

  #[test]
  fn test_chain_at_nested_blocks() {
    let inner = ASTBlock::new(Span::new(10, 30), vec![]);
    let outer = ASTBlock::new(Span::new(0, 40), vec![ASTStatement::block(inner.clone())]);

    let chain = outer.chain_at(BytePosition(15));
    assert_eq!(chain.len(), 2);
    assert!(Arc::ptr_eq(&chain[0], &inner));
    assert!(Arc::ptr_eq(&chain[1], &outer));

    assert_eq!(outer.chain_at(BytePosition(35)).len(), 1);
    assert!(outer.chain_at(BytePosition(50)).is_empty());
  }

  #[test]
  fn test_chain_descends_through_control_flow() {
    let body = ASTBlock::new(Span::new(12, 30), vec![]);
    let loop_ = ASTStatement::new(
      Span::new(5, 30),
      ASTStatementKind::While {
        condition: ASTExpression::bool(true),
        body: Box::new(ASTStatement::block(body.clone())),
      },
    );
    let outer = ASTBlock::new(Span::new(0, 40), vec![loop_]);

    let chain = outer.chain_at(BytePosition(20));
    assert_eq!(chain.len(), 2);
    assert!(Arc::ptr_eq(&chain[0], &body));
  }
}
