use std::fmt;
use std::sync::Arc;

use ordered_float::OrderedFloat;

use crate::types::{ASTTemplateArgument, ASTTemplateInstance, ASTType, PrimitiveKind};
use crate::{Name, NodeId, Span};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ASTExpression {
  pub id: NodeId,
  pub span: Span,
  pub kind: ASTExpressionKind,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ASTLiteral {
  Integer { value: i64, kind: PrimitiveKind },
  Float { value: OrderedFloat<f64>, kind: PrimitiveKind },
  String(Arc<str>),
  Char(char),
  Bool(bool),
  Null,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ASTUnaryOperator {
  Negate,
  Plus,
  Not,
  Complement,
  Dereference,
  AddressOf,
  Increment,
  Decrement,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ASTBinaryOperator {
  Add,
  Subtract,
  Multiply,
  Divide,
  Modulo,
  Concat,
  Equal,
  NotEqual,
  Less,
  LessEqual,
  Greater,
  GreaterEqual,
  And,
  Or,
  BitAnd,
  BitOr,
  BitXor,
  ShiftLeft,
  ShiftRight,
  Assign,
}

impl ASTBinaryOperator {
  pub fn is_comparison(&self) -> bool {
    matches!(
      self,
      ASTBinaryOperator::Equal
        | ASTBinaryOperator::NotEqual
        | ASTBinaryOperator::Less
        | ASTBinaryOperator::LessEqual
        | ASTBinaryOperator::Greater
        | ASTBinaryOperator::GreaterEqual
    )
  }

  pub fn is_logical(&self) -> bool {
    matches!(self, ASTBinaryOperator::And | ASTBinaryOperator::Or)
  }

  pub fn symbol(&self) -> &'static str {
    match self {
      ASTBinaryOperator::Add => "+",
      ASTBinaryOperator::Subtract => "-",
      ASTBinaryOperator::Multiply => "*",
      ASTBinaryOperator::Divide => "/",
      ASTBinaryOperator::Modulo => "%",
      ASTBinaryOperator::Concat => "~",
      ASTBinaryOperator::Equal => "==",
      ASTBinaryOperator::NotEqual => "!=",
      ASTBinaryOperator::Less => "<",
      ASTBinaryOperator::LessEqual => "<=",
      ASTBinaryOperator::Greater => ">",
      ASTBinaryOperator::GreaterEqual => ">=",
      ASTBinaryOperator::And => "&&",
      ASTBinaryOperator::Or => "||",
      ASTBinaryOperator::BitAnd => "&",
      ASTBinaryOperator::BitOr => "|",
      ASTBinaryOperator::BitXor => "^",
      ASTBinaryOperator::ShiftLeft => "<<",
      ASTBinaryOperator::ShiftRight => ">>",
      ASTBinaryOperator::Assign => "=",
    }
  }
}

/// Right-hand side of `base.member`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ASTAccessTarget {
  Identifier(Name),
  TemplateInstance(ASTTemplateInstance),
}

impl ASTAccessTarget {
  pub fn name(&self) -> &Name {
    match self {
      ASTAccessTarget::Identifier(name) => name,
      ASTAccessTarget::TemplateInstance(instance) => &instance.name,
    }
  }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ASTExpressionKind {
  Identifier(Name),
  Literal(ASTLiteral),
  TemplateInstance(ASTTemplateInstance),
  MemberAccess {
    base: Box<ASTExpression>,
    member: ASTAccessTarget,
  },
  Call {
    callee: Box<ASTExpression>,
    args: Vec<ASTExpression>,
  },
  Index {
    base: Box<ASTExpression>,
    indices: Vec<ASTExpression>,
  },
  Slice {
    base: Box<ASTExpression>,
    lower: Option<Box<ASTExpression>>,
    upper: Option<Box<ASTExpression>>,
  },
  New {
    ty: ASTType,
    args: Vec<ASTExpression>,
  },
  Cast {
    target: Option<ASTType>,
    operand: Box<ASTExpression>,
  },
  Unary {
    op: ASTUnaryOperator,
    operand: Box<ASTExpression>,
  },
  Binary {
    op: ASTBinaryOperator,
    lhs: Box<ASTExpression>,
    rhs: Box<ASTExpression>,
  },
  Conditional {
    condition: Box<ASTExpression>,
    then: Box<ASTExpression>,
    otherwise: Box<ASTExpression>,
  },
  Paren(Box<ASTExpression>),
  Type(ASTType),
  This,
  Super,
  ArrayLiteral(Vec<ASTExpression>),
  AssocArrayLiteral(Vec<(ASTExpression, ASTExpression)>),
}

impl ASTExpression {
  pub fn new(kind: ASTExpressionKind) -> Self {
    Self {
      id: NodeId::fresh(),
      span: Span::default(),
      kind,
    }
  }

  pub fn at(
    mut self,
    span: Span,
  ) -> Self {
    self.span = span;
    self
  }

  pub fn identifier(name: &str) -> Self {
    Self::new(ASTExpressionKind::Identifier(Name::new(name)))
  }

  pub fn int(value: i64) -> Self {
    Self::new(ASTExpressionKind::Literal(ASTLiteral::Integer {
      value,
      kind: PrimitiveKind::Int,
    }))
  }

  pub fn float(value: f64) -> Self {
    Self::new(ASTExpressionKind::Literal(ASTLiteral::Float {
      value: OrderedFloat(value),
      kind: PrimitiveKind::Double,
    }))
  }

  pub fn string(value: &str) -> Self {
    Self::new(ASTExpressionKind::Literal(ASTLiteral::String(Arc::from(value))))
  }

  pub fn bool(value: bool) -> Self {
    Self::new(ASTExpressionKind::Literal(ASTLiteral::Bool(value)))
  }

  pub fn null() -> Self {
    Self::new(ASTExpressionKind::Literal(ASTLiteral::Null))
  }

  pub fn template_instance(
    name: &str,
    args: Vec<ASTTemplateArgument>,
  ) -> Self {
    Self::new(ASTExpressionKind::TemplateInstance(ASTTemplateInstance::new(name, args)))
  }

  pub fn member(
    base: ASTExpression,
    member: &str,
  ) -> Self {
    Self::new(ASTExpressionKind::MemberAccess {
      base: Box::new(base),
      member: ASTAccessTarget::Identifier(Name::new(member)),
    })
  }

  pub fn member_template(
    base: ASTExpression,
    instance: ASTTemplateInstance,
  ) -> Self {
    Self::new(ASTExpressionKind::MemberAccess {
      base: Box::new(base),
      member: ASTAccessTarget::TemplateInstance(instance),
    })
  }

  pub fn call(
    callee: ASTExpression,
    args: Vec<ASTExpression>,
  ) -> Self {
    Self::new(ASTExpressionKind::Call {
      callee: Box::new(callee),
      args,
    })
  }

  pub fn index(
    base: ASTExpression,
    indices: Vec<ASTExpression>,
  ) -> Self {
    Self::new(ASTExpressionKind::Index {
      base: Box::new(base),
      indices,
    })
  }

  pub fn new_instance(
    ty: ASTType,
    args: Vec<ASTExpression>,
  ) -> Self {
    Self::new(ASTExpressionKind::New { ty, args })
  }

  pub fn cast(
    target: ASTType,
    operand: ASTExpression,
  ) -> Self {
    Self::new(ASTExpressionKind::Cast {
      target: Some(target),
      operand: Box::new(operand),
    })
  }

  pub fn unary(
    op: ASTUnaryOperator,
    operand: ASTExpression,
  ) -> Self {
    Self::new(ASTExpressionKind::Unary {
      op,
      operand: Box::new(operand),
    })
  }

  pub fn binary(
    op: ASTBinaryOperator,
    lhs: ASTExpression,
    rhs: ASTExpression,
  ) -> Self {
    Self::new(ASTExpressionKind::Binary {
      op,
      lhs: Box::new(lhs),
      rhs: Box::new(rhs),
    })
  }

  pub fn conditional(
    condition: ASTExpression,
    then: ASTExpression,
    otherwise: ASTExpression,
  ) -> Self {
    Self::new(ASTExpressionKind::Conditional {
      condition: Box::new(condition),
      then: Box::new(then),
      otherwise: Box::new(otherwise),
    })
  }

  pub fn array(elements: Vec<ASTExpression>) -> Self {
    Self::new(ASTExpressionKind::ArrayLiteral(elements))
  }

  pub fn type_expression(ty: ASTType) -> Self {
    Self::new(ASTExpressionKind::Type(ty))
  }

  /// Direct sub-expressions in source order.
  pub fn sub_expressions(&self) -> Vec<&ASTExpression> {
    match &self.kind {
      ASTExpressionKind::Identifier(_)
      | ASTExpressionKind::Literal(_)
      | ASTExpressionKind::TemplateInstance(_)
      | ASTExpressionKind::Type(_)
      | ASTExpressionKind::This
      | ASTExpressionKind::Super => Vec::new(),
      ASTExpressionKind::MemberAccess { base, .. } => vec![&**base],
      ASTExpressionKind::Call { callee, args } => std::iter::once(&**callee).chain(args.iter()).collect(),
      ASTExpressionKind::Index { base, indices } => std::iter::once(&**base).chain(indices.iter()).collect(),
      ASTExpressionKind::Slice { base, lower, upper } => {
        let mut out: Vec<&ASTExpression> = vec![&**base];
        out.extend(lower.as_deref());
        out.extend(upper.as_deref());
        out
      },
      ASTExpressionKind::New { args, .. } => args.iter().collect(),
      ASTExpressionKind::Cast { operand, .. }
      | ASTExpressionKind::Unary { operand, .. }
      | ASTExpressionKind::Paren(operand) => vec![&**operand],
      ASTExpressionKind::Binary { lhs, rhs, .. } => vec![&**lhs, &**rhs],
      ASTExpressionKind::Conditional {
        condition,
        then,
        otherwise,
      } => vec![&**condition, &**then, &**otherwise],
      ASTExpressionKind::ArrayLiteral(elements) => elements.iter().collect(),
      ASTExpressionKind::AssocArrayLiteral(pairs) => pairs.iter().flat_map(|(k, v)| [k, v]).collect(),
    }
  }

  /// Whether the identifier `name` occurs anywhere inside this expression.
  pub fn mentions(
    &self,
    name: &Name,
  ) -> bool {
    match &self.kind {
      ASTExpressionKind::Identifier(n) => n == name,
      ASTExpressionKind::TemplateInstance(instance) => {
        instance.name == *name
          || instance.args.iter().any(|arg| match arg {
            ASTTemplateArgument::Type(ty) => ty.mentions(name),
            ASTTemplateArgument::Value(expr) => expr.mentions(name),
          })
      },
      ASTExpressionKind::Type(ty) => ty.mentions(name),
      _ => self.sub_expressions().iter().any(|e| e.mentions(name)),
    }
  }

  /// Innermost call, `new` or template instance whose span holds `pos`.
  pub fn innermost_call_at(
    &self,
    pos: crate::BytePosition,
  ) -> Option<&ASTExpression> {
    if !self.span.contains(pos) {
      return None;
    }

    for sub in self.sub_expressions() {
      if let Some(found) = sub.innermost_call_at(pos) {
        return Some(found);
      }
    }

    match &self.kind {
      ASTExpressionKind::Call { .. } | ASTExpressionKind::New { .. } | ASTExpressionKind::TemplateInstance(_) => {
        Some(self)
      },
      _ => None,
    }
  }
}

impl fmt::Display for ASTLiteral {
  fn fmt(
    &self,
    f: &mut fmt::Formatter<'_>,
  ) -> fmt::Result {
    match self {
      ASTLiteral::Integer { value, .. } => write!(f, "{}", value),
      ASTLiteral::Float { value, .. } => write!(f, "{}", value),
      ASTLiteral::String(s) => write!(f, "{:?}", s),
      ASTLiteral::Char(c) => write!(f, "{:?}", c),
      ASTLiteral::Bool(b) => write!(f, "{}", b),
      ASTLiteral::Null => write!(f, "null"),
    }
  }
}

fn write_list(
  f: &mut fmt::Formatter<'_>,
  items: &[ASTExpression],
) -> fmt::Result {
  for (i, item) in items.iter().enumerate() {
    if i > 0 {
      write!(f, ", ")?;
    }
    write!(f, "{}", item)?;
  }
  Ok(())
}

impl fmt::Display for ASTExpression {
  fn fmt(
    &self,
    f: &mut fmt::Formatter<'_>,
  ) -> fmt::Result {
    match &self.kind {
      ASTExpressionKind::Identifier(name) => write!(f, "{}", name),
      ASTExpressionKind::Literal(literal) => write!(f, "{}", literal),
      ASTExpressionKind::TemplateInstance(instance) => write!(f, "{}", instance),
      ASTExpressionKind::MemberAccess { base, member } => match member {
        ASTAccessTarget::Identifier(name) => write!(f, "{}.{}", base, name),
        ASTAccessTarget::TemplateInstance(instance) => write!(f, "{}.{}", base, instance),
      },
      ASTExpressionKind::Call { callee, args } => {
        write!(f, "{}(", callee)?;
        write_list(f, args)?;
        write!(f, ")")
      },
      ASTExpressionKind::Index { base, indices } => {
        write!(f, "{}[", base)?;
        write_list(f, indices)?;
        write!(f, "]")
      },
      ASTExpressionKind::Slice { base, lower, upper } => {
        write!(f, "{}[", base)?;
        if let Some(lower) = lower {
          write!(f, "{}", lower)?;
        }
        write!(f, "..")?;
        if let Some(upper) = upper {
          write!(f, "{}", upper)?;
        }
        write!(f, "]")
      },
      ASTExpressionKind::New { ty, args } => {
        write!(f, "new {}(", ty)?;
        write_list(f, args)?;
        write!(f, ")")
      },
      ASTExpressionKind::Cast { target, operand } => match target {
        Some(target) => write!(f, "cast({}) {}", target, operand),
        None => write!(f, "cast() {}", operand),
      },
      ASTExpressionKind::Unary { op, operand } => {
        let symbol = match op {
          ASTUnaryOperator::Negate => "-",
          ASTUnaryOperator::Plus => "+",
          ASTUnaryOperator::Not => "!",
          ASTUnaryOperator::Complement => "~",
          ASTUnaryOperator::Dereference => "*",
          ASTUnaryOperator::AddressOf => "&",
          ASTUnaryOperator::Increment => "++",
          ASTUnaryOperator::Decrement => "--",
        };
        write!(f, "{}{}", symbol, operand)
      },
      ASTExpressionKind::Binary { op, lhs, rhs } => write!(f, "{} {} {}", lhs, op.symbol(), rhs),
      ASTExpressionKind::Conditional {
        condition,
        then,
        otherwise,
      } => write!(f, "{} ? {} : {}", condition, then, otherwise),
      ASTExpressionKind::Paren(inner) => write!(f, "({})", inner),
      ASTExpressionKind::Type(ty) => write!(f, "{}", ty),
      ASTExpressionKind::This => write!(f, "this"),
      ASTExpressionKind::Super => write!(f, "super"),
      ASTExpressionKind::ArrayLiteral(elements) => {
        write!(f, "[")?;
        write_list(f, elements)?;
        write!(f, "]")
      },
      ASTExpressionKind::AssocArrayLiteral(pairs) => {
        write!(f, "[")?;
        for (i, (k, v)) in pairs.iter().enumerate() {
          if i > 0 {
            write!(f, ", ")?;
          }
          write!(f, "{}: {}", k, v)?;
        }
        write!(f, "]")
      },
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::BytePosition;

  #[test]
  fn test_display_call_chain() {
    let expr = ASTExpression::call(ASTExpression::member(ASTExpression::string("abc"), "reverse"), vec![]);
    assert_eq!(expr.to_string(), "\"abc\".reverse()");
  }

  #[test]
  fn test_sub_expressions_order() {
    let expr = ASTExpression::binary(ASTBinaryOperator::Add, ASTExpression::int(1), ASTExpression::int(2));
    let subs = expr.sub_expressions();
    assert_eq!(subs.len(), 2);
    assert_eq!(subs[0].to_string(), "1");
    assert_eq!(subs[1].to_string(), "2");
  }

  #[test]
  fn test_innermost_call_at() {
    let inner = ASTExpression::call(ASTExpression::identifier("g").at(Span::new(6, 7)), vec![]).at(Span::new(6, 9));
    let outer = ASTExpression::call(ASTExpression::identifier("f").at(Span::new(0, 1)), vec![inner]).at(Span::new(0, 10));

    let found = outer.innermost_call_at(BytePosition(8)).unwrap();
    assert_eq!(found.to_string(), "g()");
    let found = outer.innermost_call_at(BytePosition(2)).unwrap();
    assert_eq!(found.to_string(), "f(g())");
  }
}
