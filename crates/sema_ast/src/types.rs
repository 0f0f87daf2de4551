use std::fmt;

use serde::{Deserialize, Serialize};

use crate::expressions::ASTExpression;
use crate::metadata::ParamAttributes;
use crate::{Name, NodeId, Span};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PrimitiveKind {
  Void,
  Bool,
  Byte,
  UByte,
  Short,
  UShort,
  Int,
  UInt,
  Long,
  ULong,
  Char,
  WChar,
  DChar,
  Float,
  Double,
  Real,
}

impl PrimitiveKind {
  pub fn keyword(&self) -> &'static str {
    match self {
      PrimitiveKind::Void => "void",
      PrimitiveKind::Bool => "bool",
      PrimitiveKind::Byte => "byte",
      PrimitiveKind::UByte => "ubyte",
      PrimitiveKind::Short => "short",
      PrimitiveKind::UShort => "ushort",
      PrimitiveKind::Int => "int",
      PrimitiveKind::UInt => "uint",
      PrimitiveKind::Long => "long",
      PrimitiveKind::ULong => "ulong",
      PrimitiveKind::Char => "char",
      PrimitiveKind::WChar => "wchar",
      PrimitiveKind::DChar => "dchar",
      PrimitiveKind::Float => "float",
      PrimitiveKind::Double => "double",
      PrimitiveKind::Real => "real",
    }
  }

  pub fn from_keyword(keyword: &str) -> Option<Self> {
    let kind = match keyword {
      "void" => PrimitiveKind::Void,
      "bool" => PrimitiveKind::Bool,
      "byte" => PrimitiveKind::Byte,
      "ubyte" => PrimitiveKind::UByte,
      "short" => PrimitiveKind::Short,
      "ushort" => PrimitiveKind::UShort,
      "int" => PrimitiveKind::Int,
      "uint" => PrimitiveKind::UInt,
      "long" => PrimitiveKind::Long,
      "ulong" => PrimitiveKind::ULong,
      "char" => PrimitiveKind::Char,
      "wchar" => PrimitiveKind::WChar,
      "dchar" => PrimitiveKind::DChar,
      "float" => PrimitiveKind::Float,
      "double" => PrimitiveKind::Double,
      "real" => PrimitiveKind::Real,
      _ => return None,
    };

    Some(kind)
  }

  pub fn is_integral(&self) -> bool {
    !matches!(
      self,
      PrimitiveKind::Void | PrimitiveKind::Float | PrimitiveKind::Double | PrimitiveKind::Real
    )
  }

  pub fn is_floating(&self) -> bool {
    matches!(self, PrimitiveKind::Float | PrimitiveKind::Double | PrimitiveKind::Real)
  }

  pub fn is_character(&self) -> bool {
    matches!(self, PrimitiveKind::Char | PrimitiveKind::WChar | PrimitiveKind::DChar)
  }

  /// Storage width in bits; `bool` counts as one.
  pub fn size_bits(&self) -> u32 {
    match self {
      PrimitiveKind::Void => 0,
      PrimitiveKind::Bool => 1,
      PrimitiveKind::Byte | PrimitiveKind::UByte | PrimitiveKind::Char => 8,
      PrimitiveKind::Short | PrimitiveKind::UShort | PrimitiveKind::WChar => 16,
      PrimitiveKind::Int | PrimitiveKind::UInt | PrimitiveKind::DChar | PrimitiveKind::Float => 32,
      PrimitiveKind::Long | PrimitiveKind::ULong | PrimitiveKind::Double => 64,
      PrimitiveKind::Real => 80,
    }
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TypeModifier {
  Const,
  Immutable,
  Shared,
  Inout,
  Scope,
}

impl TypeModifier {
  pub fn keyword(&self) -> &'static str {
    match self {
      TypeModifier::Const => "const",
      TypeModifier::Immutable => "immutable",
      TypeModifier::Shared => "shared",
      TypeModifier::Inout => "inout",
      TypeModifier::Scope => "scope",
    }
  }
}

/// A type declaration as written in source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ASTType {
  pub id: NodeId,
  pub span: Span,
  pub kind: ASTTypeKind,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ASTTypeKind {
  /// `a.b.C`: `C` with `inner` pointing at the qualifier `a.b`. A leading dot makes it module scoped.
  Identifier {
    name: Name,
    inner: Option<Box<ASTType>>,
    module_scoped: bool,
  },
  Primitive(PrimitiveKind),
  Array {
    element: Box<ASTType>,
    key: ASTArrayKey,
  },
  Pointer(Box<ASTType>),
  Delegate(ASTDelegateType),
  /// `const(T)`, `immutable T`; a bare `const` without a type leaves `inner` empty.
  Attributed {
    modifier: TypeModifier,
    inner: Option<Box<ASTType>>,
  },
  TypeOf(Box<ASTExpression>),
  Vector(Box<ASTType>),
  TemplateInstance(ASTTemplateInstance),
  Variadic(Option<Box<ASTType>>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ASTArrayKey {
  Dynamic,
  Fixed(Box<ASTExpression>),
  Associative(Box<ASTType>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ASTDelegateType {
  pub return_type: Box<ASTType>,
  pub params: Vec<ASTDelegateParam>,
  pub is_function: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ASTDelegateParam {
  pub ty: ASTType,
  pub attributes: ParamAttributes,
}

/// `Name!(args)`, either in type or in expression position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ASTTemplateInstance {
  pub id: NodeId,
  pub span: Span,
  pub name: Name,
  pub inner: Option<Box<ASTType>>,
  pub args: Vec<ASTTemplateArgument>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ASTTemplateArgument {
  Type(ASTType),
  Value(ASTExpression),
}

impl ASTTemplateInstance {
  pub fn new(
    name: &str,
    args: Vec<ASTTemplateArgument>,
  ) -> Self {
    Self {
      id: NodeId::fresh(),
      span: Span::default(),
      name: Name::new(name),
      inner: None,
      args,
    }
  }

  pub fn at(
    mut self,
    span: Span,
  ) -> Self {
    self.span = span;
    self
  }
}

impl ASTType {
  pub fn new(kind: ASTTypeKind) -> Self {
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

  /// Primitive keywords become primitive nodes, anything else an identifier.
  pub fn identifier(name: &str) -> Self {
    match PrimitiveKind::from_keyword(name) {
      Some(kind) => Self::primitive(kind),
      None => Self::new(ASTTypeKind::Identifier {
        name: Name::new(name),
        inner: None,
        module_scoped: false,
      }),
    }
  }

  pub fn qualified(
    inner: ASTType,
    name: &str,
  ) -> Self {
    Self::new(ASTTypeKind::Identifier {
      name: Name::new(name),
      inner: Some(Box::new(inner)),
      module_scoped: false,
    })
  }

  pub fn module_scoped(name: &str) -> Self {
    Self::new(ASTTypeKind::Identifier {
      name: Name::new(name),
      inner: None,
      module_scoped: true,
    })
  }

  pub fn primitive(kind: PrimitiveKind) -> Self {
    Self::new(ASTTypeKind::Primitive(kind))
  }

  pub fn array(element: ASTType) -> Self {
    Self::new(ASTTypeKind::Array {
      element: Box::new(element),
      key: ASTArrayKey::Dynamic,
    })
  }

  pub fn fixed_array(
    element: ASTType,
    length: ASTExpression,
  ) -> Self {
    Self::new(ASTTypeKind::Array {
      element: Box::new(element),
      key: ASTArrayKey::Fixed(Box::new(length)),
    })
  }

  pub fn assoc_array(
    value: ASTType,
    key: ASTType,
  ) -> Self {
    Self::new(ASTTypeKind::Array {
      element: Box::new(value),
      key: ASTArrayKey::Associative(Box::new(key)),
    })
  }

  pub fn pointer(target: ASTType) -> Self {
    Self::new(ASTTypeKind::Pointer(Box::new(target)))
  }

  pub fn delegate(
    return_type: ASTType,
    params: Vec<ASTDelegateParam>,
    is_function: bool,
  ) -> Self {
    Self::new(ASTTypeKind::Delegate(ASTDelegateType {
      return_type: Box::new(return_type),
      params,
      is_function,
    }))
  }

  pub fn attributed(
    modifier: TypeModifier,
    inner: ASTType,
  ) -> Self {
    Self::new(ASTTypeKind::Attributed {
      modifier,
      inner: Some(Box::new(inner)),
    })
  }

  pub fn type_of(expression: ASTExpression) -> Self {
    Self::new(ASTTypeKind::TypeOf(Box::new(expression)))
  }

  pub fn vector(element: ASTType) -> Self {
    Self::new(ASTTypeKind::Vector(Box::new(element)))
  }

  pub fn template_instance(
    name: &str,
    args: Vec<ASTTemplateArgument>,
  ) -> Self {
    Self::new(ASTTypeKind::TemplateInstance(ASTTemplateInstance::new(name, args)))
  }

  /// The innermost identifier name, if this is a plain or qualified identifier.
  pub fn identifier_name(&self) -> Option<&Name> {
    match &self.kind {
      ASTTypeKind::Identifier { name, .. } => Some(name),
      ASTTypeKind::TemplateInstance(instance) => Some(&instance.name),
      _ => None,
    }
  }

  /// True for an unqualified identifier named `name`.
  pub fn is_bare_identifier(
    &self,
    name: &Name,
  ) -> bool {
    matches!(
      &self.kind,
      ASTTypeKind::Identifier { name: n, inner: None, module_scoped: false } if n == name
    )
  }

  /// Whether any identifier in this declaration names `name`.
  pub fn mentions(
    &self,
    name: &Name,
  ) -> bool {
    match &self.kind {
      ASTTypeKind::Identifier { name: n, inner, .. } => {
        n == name || inner.as_ref().map(|i| i.mentions(name)).unwrap_or(false)
      },
      ASTTypeKind::Primitive(_) => false,
      ASTTypeKind::Array { element, key } => {
        element.mentions(name)
          || match key {
            ASTArrayKey::Dynamic => false,
            ASTArrayKey::Fixed(expr) => expr.mentions(name),
            ASTArrayKey::Associative(key) => key.mentions(name),
          }
      },
      ASTTypeKind::Pointer(inner) | ASTTypeKind::Vector(inner) => inner.mentions(name),
      ASTTypeKind::Delegate(delegate) => {
        delegate.return_type.mentions(name) || delegate.params.iter().any(|p| p.ty.mentions(name))
      },
      ASTTypeKind::Attributed { inner, .. } | ASTTypeKind::Variadic(inner) => {
        inner.as_ref().map(|i| i.mentions(name)).unwrap_or(false)
      },
      ASTTypeKind::TypeOf(expr) => expr.mentions(name),
      ASTTypeKind::TemplateInstance(instance) => instance.args.iter().any(|arg| match arg {
        ASTTemplateArgument::Type(ty) => ty.mentions(name),
        ASTTemplateArgument::Value(expr) => expr.mentions(name),
      }),
    }
  }
}

impl ASTDelegateParam {
  pub fn new(ty: ASTType) -> Self {
    Self {
      ty,
      attributes: ParamAttributes::NONE,
    }
  }

  pub fn with_attributes(
    ty: ASTType,
    attributes: ParamAttributes,
  ) -> Self {
    Self { ty, attributes }
  }
}

impl fmt::Display for ASTTemplateInstance {
  fn fmt(
    &self,
    f: &mut fmt::Formatter<'_>,
  ) -> fmt::Result {
    if let Some(inner) = &self.inner {
      write!(f, "{}.", inner)?;
    }
    write!(f, "{}!(", self.name)?;
    for (i, arg) in self.args.iter().enumerate() {
      if i > 0 {
        write!(f, ", ")?;
      }
      match arg {
        ASTTemplateArgument::Type(ty) => write!(f, "{}", ty)?,
        ASTTemplateArgument::Value(expr) => write!(f, "{}", expr)?,
      }
    }
    write!(f, ")")
  }
}

impl fmt::Display for ASTType {
  fn fmt(
    &self,
    f: &mut fmt::Formatter<'_>,
  ) -> fmt::Result {
    match &self.kind {
      ASTTypeKind::Identifier {
        name,
        inner,
        module_scoped,
      } => {
        if *module_scoped {
          write!(f, ".")?;
        }
        if let Some(inner) = inner {
          write!(f, "{}.", inner)?;
        }
        write!(f, "{}", name)
      },
      ASTTypeKind::Primitive(kind) => write!(f, "{}", kind.keyword()),
      ASTTypeKind::Array { element, key } => match key {
        ASTArrayKey::Dynamic => write!(f, "{}[]", element),
        ASTArrayKey::Fixed(length) => write!(f, "{}[{}]", element, length),
        ASTArrayKey::Associative(key) => write!(f, "{}[{}]", element, key),
      },
      ASTTypeKind::Pointer(inner) => write!(f, "{}*", inner),
      ASTTypeKind::Delegate(delegate) => {
        let keyword = if delegate.is_function { "function" } else { "delegate" };
        write!(f, "{} {}(", delegate.return_type, keyword)?;
        for (i, param) in delegate.params.iter().enumerate() {
          if i > 0 {
            write!(f, ", ")?;
          }
          write!(f, "{}", param.ty)?;
        }
        write!(f, ")")
      },
      ASTTypeKind::Attributed { modifier, inner } => match inner {
        Some(inner) => write!(f, "{}({})", modifier.keyword(), inner),
        None => write!(f, "{}", modifier.keyword()),
      },
      ASTTypeKind::TypeOf(expr) => write!(f, "typeof({})", expr),
      ASTTypeKind::Vector(inner) => write!(f, "__vector({})", inner),
      ASTTypeKind::TemplateInstance(instance) => write!(f, "{}", instance),
      ASTTypeKind::Variadic(inner) => match inner {
        Some(inner) => write!(f, "{}...", inner),
        None => write!(f, "..."),
      },
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_identifier_maps_primitive_keywords() {
    assert!(matches!(ASTType::identifier("int").kind, ASTTypeKind::Primitive(PrimitiveKind::Int)));
    assert!(matches!(ASTType::identifier("T").kind, ASTTypeKind::Identifier { .. }));
  }

  #[test]
  fn test_display_nested_type() {
    let ty = ASTType::pointer(ASTType::array(ASTType::attributed(
      TypeModifier::Immutable,
      ASTType::identifier("char"),
    )));
    assert_eq!(ty.to_string(), "immutable(char)[]*");
  }

  #[test]
  fn test_mentions_walks_patterns() {
    let t = Name::new("T");
    let pattern = ASTType::array(ASTType::identifier("T"));
    assert!(pattern.mentions(&t));
    assert!(!ASTType::array(ASTType::identifier("U")).mentions(&t));
    assert!(ASTType::identifier("T").is_bare_identifier(&t));
    assert!(!ASTType::qualified(ASTType::identifier("m"), "T").is_bare_identifier(&t));
  }
}
